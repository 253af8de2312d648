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

use thiserror::Error;

use super::{
    oids::*,
    validators::{EcdsaValidator, Ed25519Validator, RsaLegacyValidator},
};

/// A `RawSignatureValidator` implementation checks a signature encoded using a
/// specific signature algorithm and a private/public key pair.
///
/// IMPORTANT: This signature is typically embedded in a wrapper provided by
/// another signature mechanism. Here that wrapper is usually a CMS
/// `SignerInfo` or an X.509 certificate.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the public key `public_key`.
    ///
    /// `public_key` is a DER-encoded `SubjectPublicKeyInfo`.
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Return a built-in signature validator for the requested signature
/// algorithm as identified by OID, as found in a CMS `SignerInfo`.
///
/// `hash_alg` is the signer's digest algorithm. It is only consulted
/// when the signature algorithm does not name its own hash.
pub fn validator_for_sig_and_hash_algs(
    sig_alg: &[u8],
    hash_alg: &[u8],
) -> Option<Box<dyn RawSignatureValidator>> {
    if sig_alg == RSA_OID.as_bytes() {
        return rsa_validator_for_hash(hash_alg);
    }

    if let Some(validator) = validator_for_certificate_sig_alg(sig_alg) {
        return Some(validator);
    }

    if sig_alg == EC_PUBLICKEY_OID.as_bytes() {
        if hash_alg == SHA256_OID.as_bytes() {
            return Some(Box::new(EcdsaValidator::Es256));
        } else if hash_alg == SHA384_OID.as_bytes() {
            return Some(Box::new(EcdsaValidator::Es384));
        } else if hash_alg == SHA512_OID.as_bytes() {
            return Some(Box::new(EcdsaValidator::Es512));
        }
    }

    None
}

/// Return a built-in signature validator for an algorithm that names both the
/// signature scheme and its hash, as used in certificate signatures.
///
/// RSA-PSS is not supported.
pub fn validator_for_certificate_sig_alg(sig_alg: &[u8]) -> Option<Box<dyn RawSignatureValidator>> {
    if sig_alg == SHA1_WITH_RSAENCRYPTION_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Sha1))
    } else if sig_alg == SHA224_WITH_RSAENCRYPTION_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa224))
    } else if sig_alg == SHA256_WITH_RSAENCRYPTION_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa256))
    } else if sig_alg == SHA384_WITH_RSAENCRYPTION_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa384))
    } else if sig_alg == SHA512_WITH_RSAENCRYPTION_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa512))
    } else if sig_alg == ECDSA_WITH_SHA256_OID.as_bytes() {
        Some(Box::new(EcdsaValidator::Es256))
    } else if sig_alg == ECDSA_WITH_SHA384_OID.as_bytes() {
        Some(Box::new(EcdsaValidator::Es384))
    } else if sig_alg == ECDSA_WITH_SHA512_OID.as_bytes() {
        Some(Box::new(EcdsaValidator::Es512))
    } else if sig_alg == ED25519_OID.as_bytes() {
        Some(Box::new(Ed25519Validator {}))
    } else {
        None
    }
}

fn rsa_validator_for_hash(hash_alg: &[u8]) -> Option<Box<dyn RawSignatureValidator>> {
    if hash_alg == SHA1_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Sha1))
    } else if hash_alg == SHA224_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa224))
    } else if hash_alg == SHA256_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa256))
    } else if hash_alg == SHA384_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa384))
    } else if hash_alg == SHA512_OID.as_bytes() {
        Some(Box::new(RsaLegacyValidator::Rsa512))
    } else {
        None
    }
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,
}
