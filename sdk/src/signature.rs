// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use std::fmt;

use asic_crypto::certificate::Certificate;
use chrono::{DateTime, Utc};

use crate::{
    signature_tst::TimestampSignature, validation_results::SignatureValidation, Container,
    Context, Error, Result,
};

/// Contract for XML advanced electronic signatures (XAdES).
///
/// This crate does not implement XAdES. An external engine provides it
/// through [`AdvancedSignatureParser`] and [`Signer::sign_advanced`].
///
/// [`Signer::sign_advanced`]: crate::Signer::sign_advanced
pub trait AdvancedSignature: Send + Sync {
    /// Signature identifier, usually `"S<n>"`.
    fn id(&self) -> String;

    /// Signing time claimed by the signer.
    fn claimed_signing_time(&self) -> Option<DateTime<Utc>>;

    /// Signing time attested by a trusted third party.
    fn trusted_signing_time(&self) -> Option<DateTime<Utc>>;

    /// Certificate of the signer.
    fn signing_certificate(&self) -> Option<Certificate>;

    /// Signature algorithm URI.
    fn signature_method(&self) -> String;

    /// Signature profile, such as `"BES"` or `"LT"`.
    fn profile(&self) -> String;

    /// Data the signature value must be computed over.
    fn data_to_sign(&self) -> Result<Vec<u8>>;

    /// Sets the signature value computed by the signer.
    fn set_signature_value(&mut self, value: &[u8]) -> Result<()>;

    /// Validates the signature against `container`.
    fn validate(&self, container: &Container, ctx: &Context) -> SignatureValidation;

    /// Encodes the signature document.
    fn save(&self) -> Result<Vec<u8>>;
}

/// Parses stored XML advanced signature documents.
pub trait AdvancedSignatureParser: Send + Sync {
    /// Parses one signature document.
    fn parse(&self, data: &[u8]) -> Result<Box<dyn AdvancedSignature>>;
}

/// A signature held by a [`Container`].
pub enum Signature {
    /// An RFC 3161 time stamp token used as a signature.
    TimeStamp(TimestampSignature),

    /// An XML advanced electronic signature handled by an external engine.
    Advanced(Box<dyn AdvancedSignature>),
}

impl Signature {
    /// Returns the signature identifier.
    ///
    /// For time stamps this is the token serial number in decimal.
    pub fn id(&self) -> String {
        match self {
            Self::TimeStamp(tst) => tst.id(),
            Self::Advanced(sig) => sig.id(),
        }
    }

    pub fn claimed_signing_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimeStamp(tst) => tst.claimed_signing_time(),
            Self::Advanced(sig) => sig.claimed_signing_time(),
        }
    }

    pub fn trusted_signing_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimeStamp(tst) => tst.trusted_signing_time(),
            Self::Advanced(sig) => sig.trusted_signing_time(),
        }
    }

    pub fn signing_certificate(&self) -> Option<Certificate> {
        match self {
            Self::TimeStamp(tst) => tst.signing_certificate().cloned(),
            Self::Advanced(sig) => sig.signing_certificate(),
        }
    }

    /// Returns the digest or signature algorithm URI.
    pub fn signature_method(&self) -> String {
        match self {
            Self::TimeStamp(tst) => tst.signature_method(),
            Self::Advanced(sig) => sig.signature_method(),
        }
    }

    pub fn profile(&self) -> String {
        match self {
            Self::TimeStamp(tst) => tst.profile().to_string(),
            Self::Advanced(sig) => sig.profile(),
        }
    }

    /// Validates this signature against the content of `container`.
    pub fn validate(&self, container: &Container, ctx: &Context) -> SignatureValidation {
        match self {
            Self::TimeStamp(tst) => tst.validate(container, ctx),
            Self::Advanced(sig) => sig.validate(container, ctx),
        }
    }

    /// Encodes the signature for storage.
    pub fn save(&self) -> Result<Vec<u8>> {
        match self {
            Self::TimeStamp(tst) => Ok(tst.save().to_vec()),
            Self::Advanced(sig) => sig.save(),
        }
    }

    /// Sets the signature value of a prepared signature.
    ///
    /// Time stamp signatures are fixed when created and always fail with
    /// [`Error::NotImplemented`].
    pub fn set_signature_value(&mut self, value: &[u8]) -> Result<()> {
        match self {
            Self::TimeStamp(tst) => tst.set_signature_value(value),
            Self::Advanced(sig) => sig.set_signature_value(value),
        }
    }

    /// Returns the time stamp signature, if this is one.
    pub fn as_time_stamp(&self) -> Option<&TimestampSignature> {
        match self {
            Self::TimeStamp(tst) => Some(tst),
            Self::Advanced(_) => None,
        }
    }

    /// Returns the bytes of a stored document owned by this signature, such
    /// as its token or archive manifest.
    pub(crate) fn document(&self, name: &str) -> Option<&[u8]> {
        match self {
            Self::TimeStamp(tst) => tst.document(name),
            Self::Advanced(_) => None,
        }
    }
}

impl From<TimestampSignature> for Signature {
    fn from(tst: TimestampSignature) -> Self {
        Self::TimeStamp(tst)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeStamp(tst) => f.debug_tuple("TimeStamp").field(tst).finish(),
            Self::Advanced(sig) => f
                .debug_struct("Advanced")
                .field("id", &sig.id())
                .field("profile", &sig.profile())
                .finish(),
        }
    }
}

/// Parses stored signature bytes into the matching variant.
///
/// Bytes that decode as a time stamp token become
/// [`Signature::TimeStamp`]; anything else is handed to the registered
/// XML signature engine.
pub(crate) fn parse_signature(data: &[u8], ctx: &Context) -> Result<Signature> {
    if let Ok(tst) = TimestampSignature::from_bytes(data) {
        return Ok(tst.into());
    }

    match ctx.signature_parser() {
        Some(parser) => Ok(Signature::Advanced(parser.parse(data)?)),
        None if looks_like_xml(data) => Err(Error::NotImplemented(
            "no XML advanced signature engine registered".into(),
        )),
        None => Err(Error::ParseError(
            "signature is neither a time stamp token nor XML".into(),
        )),
    }
}

fn looks_like_xml(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xef\xbb\xbf").unwrap_or(data);
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'<')
}
