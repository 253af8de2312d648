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

use bcder::{decode::Constructed, Mode};

use crate::{
    asn1::{
        rfc3161::{PkiStatus, TimeStampResp, TstInfo, OID_CONTENT_TYPE_TST_INFO},
        rfc5652::ContentInfo,
    },
    time_stamp::TimeStampError,
};

/// A decoded `TimeStampResp` as returned by a time stamp service.
pub(crate) struct TimeStampResponse(pub TimeStampResp);

impl std::ops::Deref for TimeStampResponse {
    type Target = TimeStampResp;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TimeStampResponse {
    pub(crate) fn from_der(data: &[u8]) -> Result<Self, TimeStampError> {
        Constructed::decode(data, Mode::Ber, TimeStampResp::take_from)
            .map(Self)
            .map_err(|e| TimeStampError::DecodeError(e.to_string()))
    }

    /// Return `true` if the request was granted.
    pub(crate) fn is_success(&self) -> bool {
        self.0.status.status.is_granted()
    }

    /// Describes the status for error reporting.
    pub(crate) fn status_text(&self) -> String {
        let status = match self.0.status.status {
            PkiStatus::Granted => "granted",
            PkiStatus::GrantedWithMods => "granted with modifications",
            PkiStatus::Rejection => "rejection",
            PkiStatus::Waiting => "waiting",
            PkiStatus::RevocationWarning => "revocation warning",
            PkiStatus::RevocationNotification => "revocation notification",
        };

        let mut text = status.to_string();

        if let Some(texts) = &self.0.status.status_string {
            if !texts.is_empty() {
                text.push_str(&format!(" ({})", texts.join("; ")));
            }
        }

        if let Some(info) = &self.0.status.fail_info {
            let bits = info.octet_slice().unwrap_or_default();
            text.push_str(&format!(", failure info 0x{}", hex::encode(bits)));
        }

        text
    }

    /// Returns the encoded `TimeStampToken`, if one was issued.
    pub(crate) fn token_der(&self) -> Option<&[u8]> {
        self.0.time_stamp_token.as_ref().map(|token| token.as_slice())
    }

    /// Decodes the `TSTInfo` carried by the token, if any.
    pub(crate) fn tst_info(&self) -> Result<Option<TstInfo>, TimeStampError> {
        let Some(token) = self.token_der() else {
            return Ok(None);
        };

        let content_info =
            ContentInfo::decode_der(token).map_err(|e| TimeStampError::DecodeError(e.to_string()))?;
        let econtent = &content_info.signed_data.content_info;

        if econtent.content_type != OID_CONTENT_TYPE_TST_INFO {
            return Ok(None);
        }

        match &econtent.content {
            Some(content) => Ok(Some(
                Constructed::decode(content.to_bytes(), Mode::Ber, TstInfo::take_from)
                    .map_err(|e| TimeStampError::DecodeError(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }
}
