// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(missing_docs)]

//! Holds Rust struct definitions for the ASN.1 structures found in time
//! stamp tokens.

// Derived from a subset of the cryptographic-message-syntax crate located at:
// https://github.com/indygreg/cryptography-rs/tree/main/cryptographic-message-syntax/src/asn1

use std::io::Write;

use bcder::{
    decode::{Constructed, DecodeError, Source},
    encode::{self, PrimitiveContent, Values},
    Oid, Tag,
};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use der::{Decode, Encode};

use crate::hash::DigestAlgorithm;

pub mod rfc3161;
pub mod rfc5652;

/// Reconstructs a DER value (tag + length + content) from its content
/// octets.
pub(crate) fn reconstruct_der_bytes(tag: u8, content: &[u8]) -> Result<Vec<u8>, der::Error> {
    let der_tag = der::Tag::try_from(tag)?;
    let header = der::Header::new(der_tag, content.len())?;

    let mut der_bytes = Vec::new();
    header.encode_to_vec(&mut der_bytes)?;
    der_bytes.extend_from_slice(content);
    Ok(der_bytes)
}

/// Splits the concatenated encodings of several DER values, as found inside
/// an implicitly tagged `SET OF`.
pub(crate) fn split_der_values(mut data: &[u8]) -> Result<Vec<Vec<u8>>, der::Error> {
    let mut values = Vec::new();

    while !data.is_empty() {
        let mut reader = der::SliceReader::new(data)?;
        let header = der::Header::decode(&mut reader)?;

        let header_len: usize = header.encoded_len()?.try_into()?;
        let content_len: usize = header.length.try_into()?;
        let total = header_len + content_len;

        if data.len() < total {
            Err(der::Tag::Sequence.length_error())?;
        }

        values.push(data[..total].to_vec());
        data = &data[total..];
    }

    Ok(values)
}

/// Algorithm identifier.
///
/// ```ASN.1
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///      algorithm               OBJECT IDENTIFIER,
///      parameters              ANY DEFINED BY algorithm OPTIONAL  }
/// ```
///
/// Parameters are skipped; none of the supported digests define any.
#[derive(Clone, Debug)]
pub struct AlgorithmIdentifier {
    pub algorithm: Oid,
}

impl AlgorithmIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = Oid::take_from(cons)?;
            cons.skip_all()?;

            Ok(Self { algorithm })
        })
    }

    /// Returns the digest algorithm named by this identifier, if it is one
    /// this crate supports.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_oid(self.algorithm.as_ref())
    }
}

impl Values for AlgorithmIdentifier {
    fn encoded_len(&self, mode: bcder::Mode) -> usize {
        encode::sequence(self.algorithm.encode_ref()).encoded_len(mode)
    }

    fn write_encoded<W: Write>(
        &self,
        mode: bcder::Mode,
        target: &mut W,
    ) -> Result<(), std::io::Error> {
        encode::sequence(self.algorithm.encode_ref()).write_encoded(mode, target)
    }
}

impl From<DigestAlgorithm> for AlgorithmIdentifier {
    fn from(digest: DigestAlgorithm) -> Self {
        AlgorithmIdentifier {
            algorithm: Oid(Bytes::from_static(digest.oid())),
        }
    }
}

/// Generalized time, decoded to a UTC timestamp.
///
/// Fractional seconds are accepted; only the `Z` time zone is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GeneralizedTime(pub DateTime<Utc>);

impl GeneralizedTime {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(Tag::GENERALIZED_TIME, |prim| {
            let bytes = prim.take_all()?;

            std::str::from_utf8(bytes.as_ref())
                .ok()
                .and_then(parse_generalized_time)
                .map(GeneralizedTime)
                .ok_or_else(|| prim.content_err("invalid GeneralizedTime"))
        })
    }
}

fn parse_generalized_time(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn generalized_time_formats() {
        assert_eq!(
            parse_generalized_time("20240102030405Z"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(
            parse_generalized_time("20240102030405.25Z").map(|t| t.timestamp()),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap().timestamp())
        );
        assert_eq!(parse_generalized_time("20240102030405+0100"), None);
    }

    #[test]
    fn split_values() {
        let values = split_der_values(&[0x02, 0x01, 0x05, 0x04, 0x02, 0xaa, 0xbb]).unwrap();
        assert_eq!(values, vec![vec![0x02, 0x01, 0x05], vec![0x04, 0x02, 0xaa, 0xbb]]);

        assert!(split_der_values(&[0x04, 0x05, 0x01]).is_err());
    }

    #[test]
    fn reconstruct_set() {
        let der = reconstruct_der_bytes(0x31, &[0x05, 0x00]).unwrap();
        assert_eq!(der, vec![0x31, 0x02, 0x05, 0x00]);

        let long = vec![0u8; 200];
        let der = reconstruct_der_bytes(0x31, &long).unwrap();
        assert_eq!(&der[..3], &[0x31, 0x81, 200]);
    }
}
