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

//! Digest computation and classification of digest algorithms.
//!
//! Algorithms are identified the way they appear in signed containers: by
//! their XML-DSig URI in manifests and by their OID inside time stamp
//! tokens. Short names such as `SHA256` are accepted in configuration.

use std::{
    fmt::{self, Display, Formatter},
    io::Read,
    str::FromStr,
};

use log::debug;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use thiserror::Error;

// Size of each chunk read when hashing a stream.
const HASH_BUF_SIZE: usize = 64 * 1024;

/// XML-DSig identifier for SHA-1.
pub const URI_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

/// XML-DSig identifier for SHA-224.
pub const URI_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";

/// XML-DSig identifier for SHA-256.
pub const URI_SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// XML-DSig identifier for SHA-384.
pub const URI_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";

/// XML-DSig identifier for SHA-512.
pub const URI_SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

/// A digest algorithm supported by this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum DigestAlgorithm {
    /// SHA-1 (weak)
    Sha1,

    /// SHA-224 (weak)
    Sha224,

    /// SHA-256
    Sha256,

    /// SHA-384
    Sha384,

    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    const ALL: [DigestAlgorithm; 5] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Looks up an algorithm by its XML-DSig URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.uri() == uri)
    }

    /// Looks up an algorithm by the content bytes of its DER-encoded OID.
    pub fn from_oid(oid: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == oid)
    }

    /// Returns the XML-DSig URI for this algorithm.
    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha1 => URI_SHA1,
            Self::Sha224 => URI_SHA224,
            Self::Sha256 => URI_SHA256,
            Self::Sha384 => URI_SHA384,
            Self::Sha512 => URI_SHA512,
        }
    }

    /// Returns the content bytes of this algorithm's DER-encoded OID.
    pub fn oid(self) -> &'static [u8] {
        match self {
            Self::Sha1 => &[43, 14, 3, 2, 26],
            Self::Sha224 => &[96, 134, 72, 1, 101, 3, 4, 2, 4],
            Self::Sha256 => &[96, 134, 72, 1, 101, 3, 4, 2, 1],
            Self::Sha384 => &[96, 134, 72, 1, 101, 3, 4, 2, 2],
            Self::Sha512 => &[96, 134, 72, 1, 101, 3, 4, 2, 3],
        }
    }

    /// Returns the dotted form of this algorithm's OID.
    pub fn oid_str(self) -> &'static str {
        match self {
            Self::Sha1 => "1.3.14.3.2.26",
            Self::Sha224 => "2.16.840.1.101.3.4.2.4",
            Self::Sha256 => "2.16.840.1.101.3.4.2.1",
            Self::Sha384 => "2.16.840.1.101.3.4.2.2",
            Self::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Returns the conventional name (`SHA-256`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Length of a digest value in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns `true` if this algorithm is no longer considered strong
    /// enough for new signatures.
    ///
    /// Weak algorithms are still accepted when validating; they only produce
    /// an advisory warning.
    pub fn is_weak(self) -> bool {
        matches!(self, Self::Sha1 | Self::Sha224)
    }

    /// Computes the digest of a byte slice.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = Hasher::new(self);
        hasher.update(data);
        hasher.finalize()
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DigestError;

    /// Accepts an XML-DSig URI, a dotted OID or a name such as `sha256`,
    /// `SHA-256` or `SHA256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(alg) = Self::from_uri(s) {
            return Ok(alg);
        }

        if let Some(alg) = Self::ALL.into_iter().find(|alg| alg.oid_str() == s) {
            return Ok(alg);
        }

        let normalized = s.to_ascii_lowercase().replace('-', "");
        match normalized.as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(DigestError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = DigestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DigestAlgorithm> for String {
    fn from(alg: DigestAlgorithm) -> Self {
        alg.uri().to_string()
    }
}

/// Incremental digest computation for any [`DigestAlgorithm`].
#[derive(Clone)]
pub enum Hasher {
    /// SHA-1 state
    Sha1(Sha1),

    /// SHA-224 state
    Sha224(Sha224),

    /// SHA-256 state
    Sha256(Sha256),

    /// SHA-384 state
    Sha384(Sha384),

    /// SHA-512 state
    Sha512(Sha512),
}

impl Hasher {
    /// Starts a new digest computation.
    pub fn new(alg: DigestAlgorithm) -> Self {
        match alg {
            DigestAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            DigestAlgorithm::Sha224 => Self::Sha224(Sha224::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Self::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    /// Feeds more data into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha224(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consumes the hasher and returns the digest value.
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha224(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha384(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Computes the digest of `data` with the given algorithm.
pub fn hash_by_alg(alg: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    alg.digest(data)
}

/// Computes the digest of everything that can be read from `reader`.
pub fn hash_stream_by_alg<R: Read + ?Sized>(
    alg: DigestAlgorithm,
    reader: &mut R,
) -> Result<Vec<u8>, DigestError> {
    let mut hasher = Hasher::new(alg);
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    let mut total = 0usize;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n;
    }

    debug!("hashed {total} bytes with {}", alg.name());
    Ok(hasher.finalize())
}

/// Computes the digest of `data` with the algorithm named by `algorithm_id`
/// (URI, dotted OID or name).
pub fn digest(algorithm_id: &str, data: &[u8]) -> Result<Vec<u8>, DigestError> {
    Ok(algorithm_id.parse::<DigestAlgorithm>()?.digest(data))
}

/// Returns `true` if `algorithm_id` names a weak digest algorithm.
///
/// Unknown identifiers are not classified as weak; they fail later when a
/// digest is actually computed.
pub fn is_weak_digest(algorithm_id: &str) -> bool {
    algorithm_id
        .parse::<DigestAlgorithm>()
        .map(DigestAlgorithm::is_weak)
        .unwrap_or(false)
}

/// Describes errors that can occur while computing a digest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DigestError {
    /// The algorithm identifier is not recognized.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The input could not be read.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
