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

//! Trust anchors and certificate chain checking for time stamp signers.

use chrono::{DateTime, Utc};
use log::debug;
use thiserror::Error;

use crate::{
    certificate::{Certificate, CertificateError},
    raw_signature::validator_for_certificate_sig_alg,
};

/// A set of certificates that are trusted to issue time stamp signers.
#[derive(Clone, Debug, Default)]
pub struct TrustAnchors {
    anchors: Vec<Certificate>,
}

impl TrustAnchors {
    /// Creates an empty trust store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a trust store from a PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self, TrustError> {
        let mut anchors = Self::new();
        anchors.add_pem(pem)?;
        Ok(anchors)
    }

    /// Adds every certificate in a PEM bundle, returning how many were added.
    pub fn add_pem(&mut self, pem: &[u8]) -> Result<usize, TrustError> {
        let certs = Certificate::from_pem(pem)?;
        let count = certs.len();
        for cert in certs {
            self.add_certificate(cert);
        }
        Ok(count)
    }

    /// Adds a single trusted certificate. Duplicates are ignored.
    pub fn add_certificate(&mut self, cert: Certificate) {
        if !self.anchors.contains(&cert) {
            self.anchors.push(cert);
        }
    }

    /// Returns the number of trusted certificates.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns `true` if no certificates are trusted.
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Iterates over the trusted certificates.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.anchors.iter()
    }

    /// Checks that `cert` chains to one of the anchors.
    ///
    /// `intermediates` are the other certificates shipped with the token.
    /// Every certificate on the path must be valid at `time`.
    pub fn verify_chain(
        &self,
        cert: &Certificate,
        intermediates: &[Certificate],
        time: DateTime<Utc>,
    ) -> Result<(), TrustError> {
        if self.anchors.is_empty() {
            return Err(TrustError::NoTrustAnchors);
        }

        let mut current = cert;

        for _ in 0..=intermediates.len() {
            if !current.is_valid_at(time) {
                return Err(TrustError::ExpiredCertificate);
            }

            if self.anchors.contains(current) {
                return Ok(());
            }

            if let Some(anchor) = self
                .anchors
                .iter()
                .find(|anchor| is_issued_by(current, anchor))
            {
                if !anchor.is_valid_at(time) {
                    return Err(TrustError::ExpiredCertificate);
                }
                debug!(
                    "certificate {} chains to trust anchor {}",
                    cert.subject_name(),
                    anchor.subject_name()
                );
                return Ok(());
            }

            match intermediates
                .iter()
                .find(|candidate| *candidate != current && is_issued_by(current, candidate))
            {
                Some(issuer) => current = issuer,
                None => break,
            }
        }

        Err(TrustError::Untrusted)
    }
}

/// Returns `true` if `issuer` is named as the issuer of `cert` and its key
/// verifies the signature on `cert`.
pub(crate) fn is_issued_by(cert: &Certificate, issuer: &Certificate) -> bool {
    if cert.raw_issuer() != issuer.raw_subject() {
        return false;
    }

    let Some(validator) = validator_for_certificate_sig_alg(cert.signature_algorithm()) else {
        debug!(
            "unsupported certificate signature algorithm on {}",
            cert.subject_name()
        );
        return false;
    };

    validator
        .validate(cert.signature_value(), cert.tbs(), issuer.public_key_der())
        .is_ok()
}

/// Describes errors that can occur when checking certificate trust.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TrustError {
    /// No trust anchors have been configured.
    #[error("no trust anchors configured")]
    NoTrustAnchors,

    /// The certificate does not chain to a trust anchor.
    #[error("certificate is not trusted")]
    Untrusted,

    /// A certificate on the path was not valid at the time of use.
    #[error("certificate was not valid at the time of signing")]
    ExpiredCertificate,

    /// A certificate could not be parsed.
    #[error(transparent)]
    CertificateError(#[from] CertificateError),
}
