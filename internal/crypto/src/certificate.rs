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

//! X.509 certificates as carried inside time stamp tokens and trust lists.

use std::fmt;

use chrono::{DateTime, Utc};
use pem::{EncodeConfig, LineEnding};
use thiserror::Error;
use x509_parser::{
    extensions::ParsedExtension, num_bigint::BigUint, parse_x509_certificate, pem::Pem,
};

/// A parsed X.509 certificate.
///
/// The fields needed for chain building and signer matching are extracted
/// once, so a `Certificate` can be shared freely between threads.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
    serial: Vec<u8>,
    not_before: i64,
    not_after: i64,
    spki: Vec<u8>,
    subject_key_id: Option<Vec<u8>>,
    tbs: Vec<u8>,
    signature_algorithm: Vec<u8>,
    signature_value: Vec<u8>,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = parse_x509_certificate(der)
            .map_err(|e| CertificateError::InvalidCertificate(e.to_string()))?;

        let subject_key_id = cert.extensions().iter().find_map(|ext| {
            match ext.parsed_extension() {
                ParsedExtension::SubjectKeyIdentifier(kid) => Some(kid.0.to_vec()),
                _ => None,
            }
        });

        Ok(Self {
            der: der.to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            serial: cert.raw_serial().to_vec(),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            spki: cert.public_key().raw.to_vec(),
            subject_key_id,
            tbs: cert.tbs_certificate.as_ref().to_vec(),
            signature_algorithm: cert.signature_algorithm.algorithm.as_bytes().to_vec(),
            signature_value: cert.signature_value.as_ref().to_vec(),
        })
    }

    /// Parses every `CERTIFICATE` block in a PEM buffer.
    ///
    /// Blocks with other labels are skipped.
    pub fn from_pem(pem: &[u8]) -> Result<Vec<Self>, CertificateError> {
        let mut certs = Vec::new();

        for block in Pem::iter_from_buffer(pem) {
            let block = block.map_err(|e| CertificateError::InvalidPem(e.to_string()))?;
            if block.label == "CERTIFICATE" {
                certs.push(Self::from_der(&block.contents)?);
            }
        }

        Ok(certs)
    }

    /// Returns the DER encoding of this certificate.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Returns this certificate in PEM form.
    pub fn to_pem(&self) -> String {
        der_to_pem(&self.der)
    }

    /// Returns the subject distinguished name, e.g. `CN=Test TSA`.
    pub fn subject_name(&self) -> &str {
        &self.subject
    }

    /// Returns the issuer distinguished name.
    pub fn issuer_name(&self) -> &str {
        &self.issuer
    }

    /// Returns the serial number in decimal.
    pub fn serial_number(&self) -> String {
        BigUint::from_bytes_be(&self.serial).to_string()
    }

    pub(crate) fn raw_serial(&self) -> &[u8] {
        &self.serial
    }

    pub(crate) fn raw_subject(&self) -> &[u8] {
        &self.subject_raw
    }

    pub(crate) fn raw_issuer(&self) -> &[u8] {
        &self.issuer_raw
    }

    /// Returns the start of the validity period.
    pub fn not_before(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.not_before, 0).unwrap_or_default()
    }

    /// Returns the end of the validity period.
    pub fn not_after(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.not_after, 0).unwrap_or_default()
    }

    /// Returns `true` if `time` falls within the validity period.
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        let t = time.timestamp();
        self.not_before <= t && t <= self.not_after
    }

    /// Returns the DER-encoded `SubjectPublicKeyInfo`.
    pub fn public_key_der(&self) -> &[u8] {
        &self.spki
    }

    /// Returns the subject key identifier extension, if present.
    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.subject_key_id.as_deref()
    }

    /// Returns `true` if the subject and issuer names are identical.
    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    pub(crate) fn tbs(&self) -> &[u8] {
        &self.tbs
    }

    pub(crate) fn signature_algorithm(&self) -> &[u8] {
        &self.signature_algorithm
    }

    pub(crate) fn signature_value(&self) -> &[u8] {
        &self.signature_value
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial_number())
            .finish()
    }
}

pub(crate) fn der_to_pem(der: &[u8]) -> String {
    let block = pem::Pem::new("CERTIFICATE", der);
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Describes errors that can occur when reading certificates.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// The DER data is not a valid X.509 certificate.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The PEM data could not be decoded.
    #[error("invalid PEM data: {0}")]
    InvalidPem(String),
}
