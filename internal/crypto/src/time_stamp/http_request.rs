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

use std::io::Read;

use bcder::encode::Values;
use log::debug;

use crate::{
    asn1::rfc3161::TimeStampReq,
    time_stamp::{response::TimeStampResponse, TimeStampError, TimeStampProvider},
};

const HTTP_CONTENT_TYPE_REQUEST: &str = "application/timestamp-query";
const HTTP_CONTENT_TYPE_RESPONSE: &str = "application/timestamp-reply";

/// A [`TimeStampProvider`] that talks to an [RFC 3161] service over HTTP(S).
///
/// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
#[derive(Clone, Debug)]
pub struct HttpTimeStampProvider {
    url: String,
    headers: Vec<(String, String)>,
}

impl HttpTimeStampProvider {
    /// Creates a provider for the service at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a header to every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the service URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TimeStampProvider for HttpTimeStampProvider {
    fn time_stamp_service_url(&self) -> Option<String> {
        Some(self.url.clone())
    }

    fn time_stamp_request_headers(&self) -> Option<Vec<(String, String)>> {
        (!self.headers.is_empty()).then(|| self.headers.clone())
    }
}

/// Sends `request` to an [RFC 3161] service.
///
/// If successful, responds with the raw bytestream of the response after
/// checking that the service granted the request and echoed the nonce.
///
/// [RFC 3161]: https://datatracker.ietf.org/doc/html/rfc3161
pub(crate) fn default_rfc3161_request(
    url: &str,
    headers: Option<Vec<(String, String)>>,
    user_agent: &str,
    request: &TimeStampReq,
) -> Result<Vec<u8>, TimeStampError> {
    let mut body = Vec::<u8>::new();
    request
        .encode_ref()
        .write_encoded(bcder::Mode::Der, &mut body)?;

    let mut req = ureq::post(url).set("User-Agent", user_agent);

    if let Some(headers) = headers {
        for (ref name, ref value) in headers {
            req = req.set(name.as_str(), value.as_str());
        }
    }

    debug!("sending time stamp request to {url}");

    let response = match req
        .set("Content-Type", HTTP_CONTENT_TYPE_REQUEST)
        .send_bytes(&body)
    {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            return Err(TimeStampError::HttpErrorResponse(
                status,
                response.content_type().to_string(),
            ));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(TimeStampError::HttpConnectionError(err.to_string()));
        }
    };

    if response.status() != 200 || response.content_type() != HTTP_CONTENT_TYPE_RESPONSE {
        return Err(TimeStampError::HttpErrorResponse(
            response.status(),
            response.content_type().to_string(),
        ));
    }

    let len = response
        .header("Content-Length")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(20000);

    let mut response_bytes: Vec<u8> = Vec::with_capacity(len);

    response
        .into_reader()
        .take(1000000)
        .read_to_end(&mut response_bytes)?;

    let res = TimeStampResponse::from_der(&response_bytes)?;

    if !res.is_success() {
        return Err(TimeStampError::Rejected(res.status_text()));
    }

    // Verify nonce was reflected, if present.
    if let Some(tst_info) = res.tst_info()? {
        if tst_info.nonce != request.nonce {
            return Err(TimeStampError::NonceMismatch);
        }
    }

    Ok(response_bytes)
}
