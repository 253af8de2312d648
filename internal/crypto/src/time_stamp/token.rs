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

use std::{fmt, time::Duration};

use bcder::{decode::Constructed, Mode};
use chrono::{DateTime, Utc};
use log::debug;
use x509_parser::num_bigint::BigUint;

use crate::{
    asn1::{
        rfc3161::{TstInfo, OID_CONTENT_TYPE_TST_INFO},
        rfc5652::{ContentInfo, SignedData, SignerIdentifier},
    },
    certificate::Certificate,
    hash::DigestAlgorithm,
    time_stamp::{response::TimeStampResponse, verify, TimeStampError, TimeStampProvider},
    trust::TrustAnchors,
};

/// A parsed [RFC 3161] `TimeStampToken`.
///
/// The token keeps its original encoding, so saving it again is lossless.
///
/// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
#[derive(Clone)]
pub struct TimeStampToken {
    der: Vec<u8>,
    signed_data: SignedData,
    tst_info: TstInfo,
    tst_info_der: Vec<u8>,
    message_imprint: Vec<u8>,
    certificates: Vec<Certificate>,
}

impl TimeStampToken {
    /// Parses a token.
    ///
    /// Accepts either a bare `TimeStampToken` (a CMS `ContentInfo`) or a
    /// complete `TimeStampResp`, in which case the embedded token is kept.
    pub fn from_der(data: &[u8]) -> Result<Self, TimeStampError> {
        if let Ok(content_info) = ContentInfo::decode_der(data) {
            return Self::from_content_info(data.to_vec(), content_info);
        }

        let response = TimeStampResponse::from_der(data).map_err(|_| {
            TimeStampError::DecodeError("not a time stamp token or response".to_string())
        })?;

        if !response.is_success() {
            return Err(TimeStampError::Rejected(response.status_text()));
        }

        let token = response.token_der().ok_or_else(|| {
            TimeStampError::DecodeError("time stamp response carries no token".to_string())
        })?;

        let content_info =
            ContentInfo::decode_der(token).map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

        Self::from_content_info(token.to_vec(), content_info)
    }

    fn from_content_info(der: Vec<u8>, content_info: ContentInfo) -> Result<Self, TimeStampError> {
        let signed_data = content_info.signed_data;
        let econtent = &signed_data.content_info;

        if econtent.content_type != OID_CONTENT_TYPE_TST_INFO {
            return Err(TimeStampError::DecodeError(
                "signed content is not TSTInfo".to_string(),
            ));
        }

        let tst_info_der = econtent
            .content
            .as_ref()
            .ok_or_else(|| TimeStampError::DecodeError("TSTInfo is missing".to_string()))?
            .to_bytes()
            .to_vec();

        let tst_info = Constructed::decode(tst_info_der.as_slice(), Mode::Ber, TstInfo::take_from)
            .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

        let certificates = signed_data
            .certificate_ders()?
            .iter()
            .filter_map(|der| match Certificate::from_der(der) {
                Ok(cert) => Some(cert),
                Err(err) => {
                    debug!("skipping embedded certificate: {err}");
                    None
                }
            })
            .collect();

        let message_imprint = tst_info.message_imprint.hashed_message.to_bytes().to_vec();

        Ok(Self {
            der,
            signed_data,
            tst_info,
            tst_info_der,
            message_imprint,
            certificates,
        })
    }

    /// Requests a new token for `digest` from `provider`.
    ///
    /// The returned token is checked to actually cover `digest`.
    pub fn request<P>(
        provider: &P,
        digest: &[u8],
        alg: DigestAlgorithm,
        user_agent: &str,
    ) -> Result<Self, TimeStampError>
    where
        P: TimeStampProvider + ?Sized,
    {
        let bytes = provider
            .send_time_stamp_request(digest, alg, user_agent)
            .ok_or(TimeStampError::NoProvider)??;

        let token = Self::from_der(&bytes)?;

        if token.digest_algorithm() != Some(alg) || token.message_imprint() != digest {
            debug!("time stamp service returned a token over a different digest");
            return Err(TimeStampError::InvalidData);
        }

        Ok(token)
    }

    /// Returns the encoded token.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the serial number assigned by the authority, in decimal.
    pub fn serial_number(&self) -> String {
        BigUint::from_bytes_be(self.tst_info.serial_number.as_slice()).to_string()
    }

    /// Returns the time at which the token was issued.
    pub fn gen_time(&self) -> DateTime<Utc> {
        self.tst_info.gen_time.0
    }

    /// Returns the algorithm of the message imprint, if supported.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.tst_info.message_imprint.hash_algorithm.digest_algorithm()
    }

    /// Returns the algorithm of the message imprint as a URI, falling back to
    /// the dotted OID for algorithms this crate does not implement.
    pub fn digest_method(&self) -> String {
        match self.digest_algorithm() {
            Some(alg) => alg.uri().to_string(),
            None => self.tst_info.message_imprint.hash_algorithm.algorithm.to_string(),
        }
    }

    /// Returns the digest that was time-stamped.
    pub fn message_imprint(&self) -> &[u8] {
        &self.message_imprint
    }

    /// Returns the TSA policy under which the token was issued.
    pub fn policy(&self) -> String {
        self.tst_info.policy.to_string()
    }

    /// Returns the accuracy the authority claims for `gen_time`, if stated.
    pub fn accuracy(&self) -> Option<Duration> {
        self.tst_info.accuracy.and_then(|accuracy| accuracy.to_duration())
    }

    /// Returns the certificates embedded in the token.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Returns the certificate of the first signer that can be located.
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signed_data
            .signer_infos
            .iter()
            .find_map(|info| self.find_certificate(&info.sid))
    }

    /// Verifies the token signature and that it covers `expected_digest`.
    ///
    /// With `trust` set, the signer must also chain to one of the anchors.
    pub fn verify(
        &self,
        expected_digest: &[u8],
        trust: Option<&TrustAnchors>,
    ) -> Result<(), TimeStampError> {
        verify::verify_time_stamp(self, expected_digest, trust)
    }

    pub(crate) fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub(crate) fn tst_info_der(&self) -> &[u8] {
        &self.tst_info_der
    }

    pub(crate) fn find_certificate(&self, sid: &SignerIdentifier) -> Option<&Certificate> {
        match sid {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => self.certificates.iter().find(|cert| {
                cert.raw_issuer() == issuer.as_slice()
                    && strip_leading_zeros(cert.raw_serial())
                        == strip_leading_zeros(serial_number.as_slice())
            }),
            SignerIdentifier::SubjectKeyIdentifier(ski) => self
                .certificates
                .iter()
                .find(|cert| cert.subject_key_identifier() == Some(ski.as_slice())),
        }
    }
}

impl fmt::Debug for TimeStampToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeStampToken")
            .field("serial_number", &self.serial_number())
            .field("gen_time", &self.gen_time())
            .field("digest_method", &self.digest_method())
            .field("message_imprint", &hex::encode(&self.message_imprint))
            .finish()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
