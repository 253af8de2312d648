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

use asic_crypto::{
    certificate::Certificate,
    hash::{is_weak_digest, DigestAlgorithm, DigestError},
    time_stamp::{TimeStampError, TimeStampToken},
};
use asic_status_tracker::{log_item, validation_codes, StatusTracker};
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    manifest::DigestManifest, package::PackageEntry, validation_results::SignatureValidation,
    Container, Context, Error, Result, Signer,
};

/// Profile reported by time stamp signatures.
pub const ASIC_TST_PROFILE: &str = "TimeStampToken";

/// Where ASiC-S keeps a lone time stamp token.
pub const DEFAULT_TOKEN_NAME: &str = "META-INF/timestamp.tst";

struct ArchiveManifest {
    name: String,
    xml: Vec<u8>,
    manifest: DigestManifest,
}

/// An RFC 3161 time stamp token used as a signature.
///
/// Without a manifest the token covers the first data file of the
/// container. When read together with an ASiC archive manifest, the token
/// covers the manifest and the manifest lists the digests of the files it
/// protects.
///
/// The identifier is the token serial number, not a sequential `"S<n>"`
/// id.
pub struct TimestampSignature {
    der: Vec<u8>,
    token: std::result::Result<TimeStampToken, TimeStampError>,
    token_name: Option<String>,
    archive_manifest: Option<ArchiveManifest>,
}

impl TimestampSignature {
    /// Parses a DER encoded time stamp token.
    ///
    /// Fails with [`Error::ParseError`] if the bytes are not a token.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let token = TimeStampToken::from_der(data).map_err(|e| match e {
            TimeStampError::DecodeError(msg) => Error::ParseError(msg),
            e => Error::ParseError(e.to_string()),
        })?;

        Ok(Self::from_token(token))
    }

    /// Reads a token stored as `name`.
    ///
    /// A token that fails to parse is kept, and reported by
    /// [`TimestampSignature::validate`].
    pub(crate) fn from_storage(name: &str, data: Vec<u8>) -> Self {
        let token = TimeStampToken::from_der(&data);
        if let Err(err) = &token {
            debug!("{name}: unreadable time stamp token: {err}");
        }

        Self {
            der: data,
            token,
            token_name: Some(name.to_string()),
            archive_manifest: None,
        }
    }

    /// Attaches the archive manifest covered by this token.
    pub(crate) fn with_manifest(mut self, name: &str, xml: Vec<u8>) -> Result<Self> {
        let manifest = DigestManifest::from_xml(&xml)?;
        self.archive_manifest = Some(ArchiveManifest {
            name: name.to_string(),
            xml,
            manifest,
        });
        Ok(self)
    }

    /// Requests a token over the first data file of `container`.
    pub fn create(container: &Container, signer: &dyn Signer, ctx: &Context) -> Result<Self> {
        let data_file = container
            .data_files()
            .first()
            .ok_or_else(|| Error::ContainerState("no data files to sign".into()))?;

        let alg = match signer.digest_algorithm() {
            Some(alg) => alg,
            None => ctx.settings().time_stamp.digest_algorithm()?,
        };

        let provider = signer
            .time_stamp_provider()
            .or_else(|| ctx.time_stamp_provider())
            .ok_or(Error::MissingTimeStampAuthority)?;

        let user_agent = signer.user_agent().unwrap_or_else(|| ctx.user_agent());

        let digest = data_file.calc_digest(alg)?;
        let token = TimeStampToken::request(provider, &digest, alg, &user_agent)?;

        info!(
            "time stamp {} issued for {} at {}",
            token.serial_number(),
            data_file.name(),
            token.gen_time()
        );

        Ok(Self::from_token(token))
    }

    fn from_token(token: TimeStampToken) -> Self {
        Self {
            der: token.as_der().to_vec(),
            token: Ok(token),
            token_name: None,
            archive_manifest: None,
        }
    }

    /// Returns the token serial number in decimal, or an empty string if
    /// the token could not be parsed.
    pub fn id(&self) -> String {
        self.token
            .as_ref()
            .map(TimeStampToken::serial_number)
            .unwrap_or_default()
    }

    /// Returns the parsed token.
    pub fn token(&self) -> Option<&TimeStampToken> {
        self.token.as_ref().ok()
    }

    pub fn claimed_signing_time(&self) -> Option<DateTime<Utc>> {
        self.token().map(TimeStampToken::gen_time)
    }

    /// Same as the claimed time: both come from the token.
    pub fn trusted_signing_time(&self) -> Option<DateTime<Utc>> {
        self.claimed_signing_time()
    }

    pub fn signing_certificate(&self) -> Option<&Certificate> {
        self.token().and_then(TimeStampToken::signer_certificate)
    }

    /// Returns the digest method URI of the message imprint.
    pub fn signature_method(&self) -> String {
        self.token()
            .map(TimeStampToken::digest_method)
            .unwrap_or_default()
    }

    pub fn profile(&self) -> &'static str {
        ASIC_TST_PROFILE
    }

    /// Returns the digest covered by the token.
    pub fn message_imprint(&self) -> &[u8] {
        self.token()
            .map(TimeStampToken::message_imprint)
            .unwrap_or_default()
    }

    /// Returns the archive manifest covered by this token, if any.
    pub fn manifest(&self) -> Option<&DigestManifest> {
        self.archive_manifest.as_ref().map(|a| &a.manifest)
    }

    /// Returns the name of the file the token covers directly when it is
    /// not the first data file.
    pub fn current_file(&self) -> Option<&str> {
        self.archive_manifest.as_ref().map(|a| a.name.as_str())
    }

    /// Computes the digest the token's message imprint should equal.
    pub fn data_to_sign(&self, container: &Container) -> Result<Vec<u8>> {
        let token = self
            .token
            .as_ref()
            .map_err(|e| Error::ParseError(e.to_string()))?;

        let alg = token
            .digest_algorithm()
            .ok_or_else(|| DigestError::UnsupportedAlgorithm(token.digest_method()))?;

        match self.current_file() {
            Some(name) => container.file_digest(name, alg),
            None => container
                .data_files()
                .first()
                .ok_or_else(|| Error::FileNotFound("container has no data files".into()))?
                .calc_digest(alg),
        }
    }

    /// Returns the stored token bytes.
    pub fn save(&self) -> &[u8] {
        &self.der
    }

    /// Always fails: the signature value is the token itself.
    pub fn set_signature_value(&mut self, _value: &[u8]) -> Result<()> {
        Err(Error::NotImplemented(
            "a time stamp signature value cannot be replaced".into(),
        ))
    }

    /// Validates the token and, if present, every manifest reference.
    ///
    /// All problems are collected unless `verify.stop_on_first_error` is
    /// set. Calling this again on the same container gives the same result.
    pub fn validate(&self, container: &Container, ctx: &Context) -> SignatureValidation {
        let id = self.id();
        let mut tracker =
            StatusTracker::with_error_behavior(ctx.settings().verify.error_behavior());
        tracker.push_signature_id(id.clone());

        if self.check(container, ctx, &mut tracker).is_err() {
            debug!("validation of time stamp '{id}' stopped at first error");
        }

        SignatureValidation::from_tracker(id, tracker)
    }

    fn check(&self, container: &Container, ctx: &Context, tracker: &mut StatusTracker) -> Result<()> {
        let token = match &self.token {
            Ok(token) => token,
            Err(err) => {
                log_item!(self.label(), "failed to parse time stamp token", "validate")
                    .validation_status(validation_codes::TIMESTAMP_MALFORMED)
                    .failure(tracker, Error::ParseError(err.to_string()))?;
                return Ok(());
            }
        };

        let verified = match self.data_to_sign(container) {
            Ok(expected) => self.verify_token(token, &expected, ctx, tracker)?,
            Err(err) => {
                let status = match err {
                    Error::DigestError(DigestError::UnsupportedAlgorithm(_)) => {
                        validation_codes::ALGORITHM_UNSUPPORTED
                    }
                    _ => validation_codes::SIGNATURE_DATA_MISSING,
                };
                log_item!(self.label(), "time-stamped data could not be digested", "validate")
                    .validation_status(status)
                    .failure(tracker, err)?;
                false
            }
        };

        if verified && !ctx.settings().verify.ignore_weak_digest_warnings {
            let method = token.digest_method();
            if is_weak_digest(&method) {
                log_item!(
                    self.label(),
                    format!("time stamp digest method {method} is weak"),
                    "validate"
                )
                .validation_status(validation_codes::REFERENCE_DIGEST_WEAK)
                .error(Error::ReferenceDigestWeak {
                    method: method.clone(),
                })
                .warning(tracker);
            }
        }

        if let Some(archive) = &self.archive_manifest {
            check_references(&archive.manifest, container, tracker)?;
        }

        Ok(())
    }

    // Ok(true) if the token verified
    fn verify_token(
        &self,
        token: &TimeStampToken,
        expected: &[u8],
        ctx: &Context,
        tracker: &mut StatusTracker,
    ) -> Result<bool> {
        let verify_trust = ctx.settings().trust.verify_trust;

        let result = match (verify_trust, ctx.trust_anchors()) {
            (false, _) => token.verify(expected, None),
            (true, Some(anchors)) => token.verify(expected, Some(anchors)),
            // trust store still warming up
            (true, None) => token
                .verify(expected, None)
                .and(Err(TimeStampError::Untrusted)),
        };

        match result {
            Ok(()) => {
                log_item!(self.label(), "time stamp validated", "verify_token")
                    .validation_status(validation_codes::TIMESTAMP_VALIDATED)
                    .success(tracker);
                if verify_trust {
                    log_item!(self.label(), "time stamp authority trusted", "verify_token")
                        .validation_status(validation_codes::TIMESTAMP_TRUSTED)
                        .success(tracker);
                }
                Ok(true)
            }
            Err(err) => {
                let (status, description) = match err {
                    TimeStampError::InvalidData => (
                        validation_codes::TIMESTAMP_MISMATCH,
                        "time stamp does not match the signed data",
                    ),
                    TimeStampError::Untrusted => (
                        validation_codes::TIMESTAMP_UNTRUSTED,
                        "time stamp authority is not trusted",
                    ),
                    TimeStampError::ExpiredCertificate => (
                        validation_codes::TIMESTAMP_OUTSIDE_VALIDITY,
                        "time stamp certificate was not valid at signing time",
                    ),
                    TimeStampError::UnsupportedAlgorithm => (
                        validation_codes::ALGORITHM_UNSUPPORTED,
                        "time stamp uses an unsupported algorithm",
                    ),
                    _ => (
                        validation_codes::TIMESTAMP_MALFORMED,
                        "time stamp could not be verified",
                    ),
                };

                log_item!(self.label(), description, "verify_token")
                    .validation_status(status)
                    .failure(tracker, Error::TimestampVerification(err))?;
                Ok(false)
            }
        }
    }

    fn label(&self) -> String {
        match (self.token.is_ok(), &self.token_name) {
            (true, _) | (false, None) => self.id(),
            (false, Some(name)) => name.clone(),
        }
    }

    pub(crate) fn document(&self, name: &str) -> Option<&[u8]> {
        if self.token_name.as_deref() == Some(name) {
            return Some(&self.der);
        }
        self.archive_manifest
            .as_ref()
            .filter(|a| a.name == name)
            .map(|a| a.xml.as_slice())
    }

    /// Returns the archive entry name the token was read from, if any.
    pub(crate) fn stored_name(&self) -> Option<&str> {
        self.token_name.as_deref()
    }

    /// Returns the archive entries for this signature.
    pub(crate) fn entries(&self, default_token_name: &str) -> Vec<PackageEntry> {
        let mut entries = vec![PackageEntry::new(
            self.token_name.as_deref().unwrap_or(default_token_name),
            self.der.clone(),
        )];
        if let Some(archive) = &self.archive_manifest {
            entries.push(PackageEntry::new(archive.name.as_str(), archive.xml.clone()));
        }
        entries
    }
}

fn check_references(
    manifest: &DigestManifest,
    container: &Container,
    tracker: &mut StatusTracker,
) -> Result<()> {
    let first_file = container.data_files().first();

    for reference in &manifest.references {
        let name = reference.file_name();

        let alg = match reference.digest_method.parse::<DigestAlgorithm>() {
            Ok(alg) => alg,
            Err(err) => {
                log_item!(
                    reference.uri.clone(),
                    format!("unsupported digest method {}", reference.digest_method),
                    "check_references"
                )
                .validation_status(validation_codes::ALGORITHM_UNSUPPORTED)
                .failure(tracker, Error::from(err))?;
                continue;
            }
        };

        let digest = match first_file {
            Some(file) if file.name() == name => file.calc_digest(alg),
            _ => container.file_digest(&name, alg),
        };

        match digest {
            Ok(digest) if digest == reference.digest_value => {
                log_item!(reference.uri.clone(), "reference digest matches", "check_references")
                    .validation_status(validation_codes::REFERENCE_DIGEST_MATCH)
                    .success(tracker);
            }
            Ok(_) => {
                log_item!(
                    reference.uri.clone(),
                    format!("reference {name} digest does not match"),
                    "check_references"
                )
                .validation_status(validation_codes::REFERENCE_DIGEST_MISMATCH)
                .failure(
                    tracker,
                    Error::ReferenceDigestMismatch {
                        uri: reference.uri.clone(),
                    },
                )?;
            }
            Err(err) => {
                log_item!(
                    reference.uri.clone(),
                    format!("reference {name} could not be read"),
                    "check_references"
                )
                .validation_status(validation_codes::REFERENCE_MISSING)
                .failure(tracker, err)?;
            }
        }
    }

    Ok(())
}

impl fmt::Debug for TimestampSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampSignature")
            .field("id", &self.id())
            .field("token_name", &self.token_name)
            .field("signature_method", &self.signature_method())
            .field("claimed_signing_time", &self.claimed_signing_time())
            .field("current_file", &self.current_file())
            .finish()
    }
}
