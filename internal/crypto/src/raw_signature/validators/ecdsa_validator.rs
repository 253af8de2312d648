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

use ecdsa::signature::hazmat::PrehashVerifier;
use p256::{
    ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey},
    pkcs8::DecodePublicKey,
};
use p384::ecdsa::{Signature as P384Signature, VerifyingKey as P384VerifyingKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::raw_signature::{RawSignatureValidationError, RawSignatureValidator};

/// An `EcdsaValidator` can validate raw signatures with one of the ECDSA
/// signature algorithms.
///
/// The curve (P-256 or P-384) is taken from the public key. Signatures may
/// be DER encoded or in fixed-size P1363 form.
pub(crate) enum EcdsaValidator {
    /// ECDSA with SHA-256
    Es256,

    /// ECDSA with SHA-384
    Es384,

    /// ECDSA with SHA-512
    Es512,
}

impl RawSignatureValidator for EcdsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let digest = match self {
            Self::Es256 => Sha256::digest(data).to_vec(),
            Self::Es384 => Sha384::digest(data).to_vec(),
            Self::Es512 => Sha512::digest(data).to_vec(),
        };

        let result = {
            if let Ok(vk) = P256VerifyingKey::from_public_key_der(public_key) {
                let signature = P256Signature::from_der(sig)
                    .or_else(|_| P256Signature::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                vk.verify_prehash(&digest, &signature)
            } else {
                let vk = P384VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                let signature = P384Signature::from_der(sig)
                    .or_else(|_| P384Signature::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                vk.verify_prehash(&digest, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
