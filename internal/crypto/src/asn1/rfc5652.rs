// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined by [RFC 5652] (Cryptographic Message Syntax).
//!
//! Only the subset needed to read a time stamp token is modeled.
//!
//! [RFC 5652]: https://datatracker.ietf.org/doc/html/rfc5652

use bcder::{
    decode::{Constructed, DecodeError, Source},
    Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag,
};

use super::{split_der_values, AlgorithmIdentifier};

/// The signed-data content type.
///
/// 1.2.840.113549.1.7.2
pub const OID_ID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// The content-type signed attribute.
///
/// 1.2.840.113549.1.9.3
pub const OID_CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);

/// The message-digest signed attribute.
///
/// 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// Content info.
///
/// ```ASN.1
/// ContentInfo ::= SEQUENCE {
///   contentType ContentType,
///   content [0] EXPLICIT ANY DEFINED BY contentType }
/// ```
///
/// Only signed-data content is accepted.
#[derive(Clone, Debug)]
pub struct ContentInfo {
    pub signed_data: SignedData,
}

impl ContentInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let content_type = Oid::take_from(cons)?;
            if content_type != OID_ID_SIGNED_DATA {
                return Err(cons.content_err("content type is not signed-data"));
            }

            let signed_data = cons.take_constructed_if(Tag::CTX_0, SignedData::take_from)?;

            Ok(Self { signed_data })
        })
    }

    pub fn decode_der(data: &[u8]) -> Result<Self, DecodeError<std::convert::Infallible>> {
        Constructed::decode(data, Mode::Ber, Self::take_from)
    }
}

/// Signed data.
///
/// ```ASN.1
/// SignedData ::= SEQUENCE {
///   version CMSVersion,
///   digestAlgorithms DigestAlgorithmIdentifiers,
///   encapContentInfo EncapsulatedContentInfo,
///   certificates [0] IMPLICIT CertificateSet OPTIONAL,
///   crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///   signerInfos SignerInfos }
/// ```
#[derive(Clone, Debug)]
pub struct SignedData {
    pub content_info: EncapsulatedContentInfo,
    pub certificates: Option<Captured>,
    pub signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Integer::take_from(cons)?;
            cons.take_set(|cons| cons.skip_all())?;

            let content_info = EncapsulatedContentInfo::take_from(cons)?;
            let certificates =
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| cons.capture_all())?;
            cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?;

            let signer_infos = cons.take_set(|cons| {
                let mut infos = Vec::new();
                while let Some(info) = SignerInfo::take_opt_from(cons)? {
                    infos.push(info);
                }
                Ok(infos)
            })?;

            Ok(Self {
                content_info,
                certificates,
                signer_infos,
            })
        })
    }

    /// Returns the DER encoding of each embedded certificate.
    ///
    /// Entries that are not plain certificates (attribute certificates and
    /// the like) are returned too; callers discard what fails to parse.
    pub fn certificate_ders(&self) -> Result<Vec<Vec<u8>>, der::Error> {
        match &self.certificates {
            Some(certs) => split_der_values(certs.as_slice()),
            None => Ok(Vec::new()),
        }
    }
}

/// Encapsulated content info.
///
/// ```ASN.1
/// EncapsulatedContentInfo ::= SEQUENCE {
///   eContentType ContentType,
///   eContent [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct EncapsulatedContentInfo {
    pub content_type: Oid,
    pub content: Option<OctetString>,
}

impl EncapsulatedContentInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let content_type = Oid::take_from(cons)?;
            let content =
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| OctetString::take_from(cons))?;

            Ok(Self {
                content_type,
                content,
            })
        })
    }
}

/// Signer info.
///
/// ```ASN.1
/// SignerInfo ::= SEQUENCE {
///   version CMSVersion,
///   sid SignerIdentifier,
///   digestAlgorithm DigestAlgorithmIdentifier,
///   signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///   signatureAlgorithm SignatureAlgorithmIdentifier,
///   signature SignatureValue,
///   unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct SignerInfo {
    pub sid: SignerIdentifier,
    pub digest_algorithm: AlgorithmIdentifier,
    pub signed_attributes: Option<SignedAttributes>,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature: OctetString,
}

impl SignerInfo {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            Integer::take_from(cons)?;
            let sid = SignerIdentifier::take_from(cons)?;
            let digest_algorithm = AlgorithmIdentifier::take_from(cons)?;
            let signed_attributes =
                cons.take_opt_constructed_if(Tag::CTX_0, SignedAttributes::from_content)?;
            let signature_algorithm = AlgorithmIdentifier::take_from(cons)?;
            let signature = OctetString::take_from(cons)?;
            cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?;

            Ok(Self {
                sid,
                digest_algorithm,
                signed_attributes,
                signature_algorithm,
                signature,
            })
        })
    }
}

/// Identifies the certificate of the signer.
///
/// ```ASN.1
/// SignerIdentifier ::= CHOICE {
///   issuerAndSerialNumber IssuerAndSerialNumber,
///   subjectKeyIdentifier [0] SubjectKeyIdentifier }
///
/// IssuerAndSerialNumber ::= SEQUENCE {
///   issuer Name,
///   serialNumber CertificateSerialNumber }
/// ```
#[derive(Clone, Debug)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber {
        /// Full DER encoding of the issuer `Name`.
        issuer: Captured,
        serial_number: Integer,
    },
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        if let Some(ski) = cons.take_opt_primitive_if(Tag::CTX_0, |prim| prim.take_all())? {
            return Ok(Self::SubjectKeyIdentifier(ski.to_vec()));
        }

        cons.take_sequence(|cons| {
            let issuer = cons.capture_one()?;
            let serial_number = Integer::take_from(cons)?;

            Ok(Self::IssuerAndSerialNumber {
                issuer,
                serial_number,
            })
        })
    }
}

/// Signed attributes.
///
/// Keeps the raw content octets alongside the decoded attributes because
/// the signature covers their DER encoding re-tagged as a `SET OF`.
#[derive(Clone, Debug)]
pub struct SignedAttributes {
    pub raw: Captured,
    pub attributes: Vec<Attribute>,
}

impl SignedAttributes {
    fn from_content<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        let raw = cons.capture_all()?;

        let attributes = Constructed::decode(raw.as_slice(), Mode::Ber, |cons| {
            let mut attributes = Vec::new();
            while let Some(attr) = Attribute::take_opt_from(cons)? {
                attributes.push(attr);
            }
            Ok(attributes)
        })
        .map_err(|_| cons.content_err("invalid signed attributes"))?;

        Ok(Self { raw, attributes })
    }

    /// Returns all values of the attribute with the given type.
    pub fn values_of(&self, attr_type: &ConstOid) -> Option<&[Vec<u8>]> {
        self.attributes
            .iter()
            .find(|attr| attr.attr_type == *attr_type)
            .map(|attr| attr.values.as_slice())
    }

    /// Returns the DER bytes the signer actually signed.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, der::Error> {
        super::reconstruct_der_bytes(0x31, self.raw.as_slice())
    }
}

/// Attribute.
///
/// ```ASN.1
/// Attribute ::= SEQUENCE {
///   attrType OBJECT IDENTIFIER,
///   attrValues SET OF AttributeValue }
/// ```
#[derive(Clone, Debug)]
pub struct Attribute {
    pub attr_type: Oid,
    /// Full DER encoding of each value.
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let attr_type = Oid::take_from(cons)?;
            let raw_values = cons.take_set(|cons| cons.capture_all())?;
            let values = split_der_values(raw_values.as_slice())
                .map_err(|_| cons.content_err("invalid attribute values"))?;

            Ok(Self { attr_type, values })
        })
    }
}
