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

use bcder::{decode::Constructed, Mode, OctetString, Oid};
use log::debug;

use crate::{
    asn1::{
        rfc3161::OID_CONTENT_TYPE_TST_INFO,
        rfc5652::{SignerInfo, OID_CONTENT_TYPE, OID_MESSAGE_DIGEST},
    },
    raw_signature::{validator_for_sig_and_hash_algs, RawSignatureValidationError},
    time_stamp::{TimeStampError, TimeStampToken},
    trust::TrustAnchors,
};

/// Checks the token against `expected_digest`.
///
/// Each `SignerInfo` is tried in turn; the token is accepted as soon as one
/// verifies. Otherwise the error from the last signer is returned.
pub(crate) fn verify_time_stamp(
    token: &TimeStampToken,
    expected_digest: &[u8],
    trust: Option<&TrustAnchors>,
) -> Result<(), TimeStampError> {
    let signer_infos = &token.signed_data().signer_infos;
    if signer_infos.is_empty() {
        return Err(TimeStampError::DecodeError(
            "token has no signer info".to_string(),
        ));
    }

    let mut last_err = TimeStampError::InvalidData;

    for signer_info in signer_infos {
        match verify_signer_info(token, signer_info, expected_digest, trust) {
            Ok(()) => return Ok(()),
            Err(err) => {
                debug!("time stamp signer rejected: {err}");
                last_err = err;
            }
        }
    }

    Err(last_err)
}

fn verify_signer_info(
    token: &TimeStampToken,
    signer_info: &SignerInfo,
    expected_digest: &[u8],
    trust: Option<&TrustAnchors>,
) -> Result<(), TimeStampError> {
    let cert = token
        .find_certificate(&signer_info.sid)
        .ok_or(TimeStampError::Untrusted)?;

    let gen_time = token.gen_time();
    if !cert.is_valid_at(gen_time) {
        return Err(TimeStampError::ExpiredCertificate);
    }

    let hash_alg = signer_info
        .digest_algorithm
        .digest_algorithm()
        .ok_or(TimeStampError::UnsupportedAlgorithm)?;

    let signed_bytes = match &signer_info.signed_attributes {
        Some(attrs) => {
            if let Some(values) = attrs.values_of(&OID_CONTENT_TYPE) {
                let [value] = values else {
                    return Err(TimeStampError::DecodeError(
                        "content-type attribute must have exactly one value".to_string(),
                    ));
                };
                let content_type = Constructed::decode(value.as_slice(), Mode::Ber, Oid::take_from)
                    .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;
                if content_type != OID_CONTENT_TYPE_TST_INFO {
                    return Err(TimeStampError::InvalidData);
                }
            }

            let values = attrs.values_of(&OID_MESSAGE_DIGEST).ok_or_else(|| {
                TimeStampError::DecodeError("message-digest attribute is missing".to_string())
            })?;
            let [value] = values else {
                return Err(TimeStampError::DecodeError(
                    "message-digest attribute must have exactly one value".to_string(),
                ));
            };

            let message_digest =
                Constructed::decode(value.as_slice(), Mode::Ber, OctetString::take_from)
                    .map_err(|e| TimeStampError::DecodeError(e.to_string()))?
                    .to_bytes();

            if message_digest.as_ref() != hash_alg.digest(token.tst_info_der()).as_slice() {
                return Err(TimeStampError::InvalidData);
            }

            attrs.signed_bytes()?
        }
        None => token.tst_info_der().to_vec(),
    };

    let validator = validator_for_sig_and_hash_algs(
        signer_info.signature_algorithm.algorithm.as_ref(),
        signer_info.digest_algorithm.algorithm.as_ref(),
    )
    .ok_or(TimeStampError::UnsupportedAlgorithm)?;

    validator
        .validate(
            &signer_info.signature.to_bytes(),
            &signed_bytes,
            cert.public_key_der(),
        )
        .map_err(|err| match err {
            RawSignatureValidationError::UnsupportedAlgorithm => {
                TimeStampError::UnsupportedAlgorithm
            }
            _ => TimeStampError::InvalidData,
        })?;

    if token.message_imprint() != expected_digest {
        return Err(TimeStampError::InvalidData);
    }

    if let Some(trust) = trust {
        let others: Vec<_> = token
            .certificates()
            .iter()
            .filter(|other| *other != cert)
            .cloned()
            .collect();

        trust.verify_chain(cert, &others, gen_time)?;
    }

    Ok(())
}
