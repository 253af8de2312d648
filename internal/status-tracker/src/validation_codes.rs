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

//! Validation status codes reported while validating signatures in an ASiC
//! container.
//!
//! Codes are grouped by the item they describe: the time stamp token of a
//! signature, or a data object reference listed in a digest manifest.

use crate::LogKind;

// -- success codes --

/// The time stamp token is well-formed, its signature verifies and its
/// message imprint matches the signed data.
pub const TIMESTAMP_VALIDATED: &str = "timeStamp.validated";

/// The time stamp signing certificate chains to a configured trust anchor.
pub const TIMESTAMP_TRUSTED: &str = "timeStamp.trusted";

/// The digest of a referenced data object matches the digest declared in the
/// manifest.
pub const REFERENCE_DIGEST_MATCH: &str = "reference.digestMatch";

// -- warning codes --

/// The time stamp was created with a digest algorithm that is no longer
/// considered strong (SHA-1, SHA-224).
///
/// Callers may suppress this warning through settings.
pub const REFERENCE_DIGEST_WEAK: &str = "reference.digestWeak";

// -- failure codes --

/// The time stamp token could not be parsed.
pub const TIMESTAMP_MALFORMED: &str = "timeStamp.malformed";

/// The message imprint or signature of the time stamp token does not match
/// the signed data.
pub const TIMESTAMP_MISMATCH: &str = "timeStamp.mismatch";

/// The time stamp signing certificate does not chain to a trust anchor, or
/// no trust anchors are available.
pub const TIMESTAMP_UNTRUSTED: &str = "timeStamp.untrusted";

/// The time stamp was created outside the validity period of its signing
/// certificate.
pub const TIMESTAMP_OUTSIDE_VALIDITY: &str = "timeStamp.outsideValidity";

/// The digest of a referenced data object does not match the digest
/// declared in the manifest.
pub const REFERENCE_DIGEST_MISMATCH: &str = "reference.digestMismatch";

/// A manifest references a file that is not present in the container.
pub const REFERENCE_MISSING: &str = "reference.missing";

/// A digest algorithm named by the token or a manifest is not supported.
pub const ALGORITHM_UNSUPPORTED: &str = "algorithm.unsupported";

/// The data covered by the signature could not be located or read.
pub const SIGNATURE_DATA_MISSING: &str = "signature.dataMissing";

/// Returns `true` if the status code is a known success status code.
///
/// Returns `false` if the status code is a known warning or failure status
/// code or is unknown.
///
/// ## Examples
///
/// ```
/// use asic_status_tracker::validation_codes::*;
///
/// assert!(is_success(TIMESTAMP_VALIDATED));
/// assert!(!is_success(REFERENCE_DIGEST_MISMATCH));
/// ```
pub fn is_success(status_code: &str) -> bool {
    matches!(log_kind(status_code), LogKind::Success)
}

/// Returns the [`LogKind`] for a given status code.
///
/// Unknown codes are treated as failures.
pub fn log_kind(status_code: &str) -> LogKind {
    match status_code {
        TIMESTAMP_VALIDATED | TIMESTAMP_TRUSTED | REFERENCE_DIGEST_MATCH => LogKind::Success,
        REFERENCE_DIGEST_WEAK => LogKind::Warning,
        _ => LogKind::Failure,
    }
}
