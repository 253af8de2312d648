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

use bcder::{encode::Values, Integer, OctetString};
use rand::{thread_rng, Rng};

use crate::{
    asn1::rfc3161::{MessageImprint, TimeStampReq},
    hash::DigestAlgorithm,
    time_stamp::TimeStampError,
};

/// A `TimeStampProvider` implementation can contact a [RFC 3161] time stamp
/// service and obtain a token over a precomputed digest.
///
/// Implementations that only know a URL get the HTTP exchange for free from
/// [`Self::send_time_stamp_request()`]. In-process authorities override that
/// method instead.
///
/// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
pub trait TimeStampProvider {
    /// Return the URL for time stamp service.
    fn time_stamp_service_url(&self) -> Option<String> {
        None
    }

    /// Additional request headers to pass to the time stamp service.
    ///
    /// IMPORTANT: You should not include the "Content-type" header here.
    /// That is provided by default.
    fn time_stamp_request_headers(&self) -> Option<Vec<(String, String)>> {
        None
    }

    /// Request a [RFC 3161] time stamp over a digest.
    ///
    /// Returns the raw bytes of the response. These may be a complete
    /// `TimeStampResp` or a bare `TimeStampToken`.
    ///
    /// The default implementation will send the request to the URL
    /// provided by [`Self::time_stamp_service_url()`], if any.
    ///
    /// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
    fn send_time_stamp_request(
        &self,
        digest: &[u8],
        alg: DigestAlgorithm,
        user_agent: &str,
    ) -> Option<Result<Vec<u8>, TimeStampError>> {
        let url = self.time_stamp_service_url()?;

        Some(time_stamp_request(digest, alg).and_then(|request| {
            super::default_rfc3161_request(
                &url,
                self.time_stamp_request_headers(),
                user_agent,
                &request,
            )
        }))
    }
}

/// Encodes a time stamp request as DER, ready to be sent as an
/// `application/timestamp-query` body.
pub fn default_rfc3161_message(
    digest: &[u8],
    alg: DigestAlgorithm,
) -> Result<Vec<u8>, TimeStampError> {
    let request = time_stamp_request(digest, alg)?;

    let mut body = Vec::<u8>::new();
    request
        .encode_ref()
        .write_encoded(bcder::Mode::Der, &mut body)?;

    Ok(body)
}

/// Builds a version 1 request with a random nonce that asks for the signer
/// certificate to be included.
pub(crate) fn time_stamp_request(
    digest: &[u8],
    alg: DigestAlgorithm,
) -> Result<TimeStampReq, TimeStampError> {
    if digest.len() != alg.output_len() {
        return Err(TimeStampError::InternalError(format!(
            "digest length {} does not match {}",
            digest.len(),
            alg.name()
        )));
    }

    let mut random = [0u8; 8];
    thread_rng().try_fill(&mut random).map_err(|_| {
        TimeStampError::InternalError("Unable to generate random number".to_string())
    })?;

    Ok(TimeStampReq {
        version: Integer::from(1_u8),
        message_imprint: MessageImprint {
            hash_algorithm: alg.into(),
            hashed_message: OctetString::new(bytes::Bytes::copy_from_slice(digest)),
        },
        req_policy: None,
        nonce: Some(Integer::from(u64::from_le_bytes(random))),
        cert_req: Some(true),
    })
}
