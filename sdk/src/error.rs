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

use asic_crypto::{hash::DigestError, time_stamp::TimeStampError};
use asic_status_tracker::LogItem;
use thiserror::Error;

/// `Error` enumerates errors returned by most operations in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // --- signature and time stamp errors ---
    /// Signature or time stamp bytes could not be decoded.
    #[error("unable to parse: {0}")]
    ParseError(String),

    #[error(transparent)]
    DigestError(#[from] DigestError),

    /// The time stamp token did not verify against the expected data.
    #[error("time stamp verification failed: {0}")]
    TimestampVerification(#[source] TimeStampError),

    /// A manifest reference does not match the referenced content.
    #[error("reference {uri} digest does not match")]
    ReferenceDigestMismatch { uri: String },

    /// A weak digest algorithm was used. This is advisory.
    #[error("digest method {method} is weak")]
    ReferenceDigestWeak { method: String },

    /// One or more checks failed while validating a signature.
    ///
    /// `causes` lists every problem found, in the order the checks ran.
    #[error("validation of signature '{signature_id}' failed with {} cause(s)", causes.len())]
    TimestampValidation {
        signature_id: String,
        causes: Vec<LogItem>,
    },

    // --- container errors ---
    #[error("invalid container state: {0}")]
    ContainerState(String),

    #[error("feature implementation incomplete: {0}")]
    NotImplemented(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("type is unsupported")]
    UnsupportedType,

    #[error("bad parameter: {0}")]
    BadParam(String),

    // --- time stamp authority errors ---
    #[error("no time stamp authority configured")]
    MissingTimeStampAuthority,

    /// The time stamp authority could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The time stamp authority answered with an error or an unusable token.
    #[error("time stamp authority error: {0}")]
    TimestampAuthority(String),

    // --- third-party errors ---
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    ZipError(#[from] zip::result::ZipError),

    #[error(transparent)]
    XmlError(#[from] quick_xml::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),
}

/// A specialized `Result` type for container operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<TimeStampError> for Error {
    fn from(err: TimeStampError) -> Self {
        match err {
            TimeStampError::DecodeError(msg) => Self::ParseError(msg),
            TimeStampError::HttpConnectionError(msg) => Self::Network(msg),
            TimeStampError::IoError(err) => Self::IoError(err),
            TimeStampError::NoProvider => Self::MissingTimeStampAuthority,
            err @ (TimeStampError::HttpErrorResponse(..)
            | TimeStampError::Rejected(_)
            | TimeStampError::NonceMismatch
            | TimeStampError::InternalError(_)) => Self::TimestampAuthority(err.to_string()),
            err => Self::TimestampVerification(err),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlError(err.into())
    }
}

impl From<quick_xml::escape::EscapeError> for Error {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::XmlError(err.into())
    }
}
