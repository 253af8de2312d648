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

use asic_status_tracker::{LogItem, LogKind, StatusTracker};

use crate::{Error, Result};

/// Overall outcome of validating one signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Every check passed.
    Valid,

    /// No check failed, but advisory warnings were recorded.
    ValidWithWarnings,

    /// At least one check failed.
    Invalid,
}

/// Result of validating one signature.
///
/// `causes` lists every failure and warning in the order the checks ran;
/// `successes` lists the checks that passed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureValidation {
    signature_id: String,
    causes: Vec<LogItem>,
    successes: Vec<LogItem>,
}

impl SignatureValidation {
    /// Collects the outcome recorded in `tracker`.
    pub fn from_tracker(signature_id: impl Into<String>, tracker: StatusTracker) -> Self {
        let (successes, causes) = tracker
            .into_logged_items()
            .into_iter()
            .filter(|item| item.kind != LogKind::Informational)
            .partition(|item| item.kind == LogKind::Success);

        Self {
            signature_id: signature_id.into(),
            causes,
            successes,
        }
    }

    pub fn signature_id(&self) -> &str {
        &self.signature_id
    }

    pub fn causes(&self) -> &[LogItem] {
        &self.causes
    }

    pub fn successes(&self) -> &[LogItem] {
        &self.successes
    }

    /// Returns the failure causes, skipping warnings.
    pub fn failures(&self) -> impl Iterator<Item = &LogItem> {
        self.causes
            .iter()
            .filter(|item| item.kind == LogKind::Failure)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogItem> {
        self.causes
            .iter()
            .filter(|item| item.kind == LogKind::Warning)
    }

    /// Returns `true` if any cause or success carries `status`.
    pub fn has_status(&self, status: &str) -> bool {
        self.causes
            .iter()
            .chain(self.successes.iter())
            .any(|item| item.validation_status.as_deref() == Some(status))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Returns `true` if no cause at all was recorded.
    pub fn is_valid(&self) -> bool {
        self.causes.is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        if self.has_failures() {
            Verdict::Invalid
        } else if self.causes.is_empty() {
            Verdict::Valid
        } else {
            Verdict::ValidWithWarnings
        }
    }

    /// Converts to `Err(Error::TimestampValidation)` if any cause was
    /// recorded, warnings included.
    pub fn into_result(self) -> Result<()> {
        if self.causes.is_empty() {
            Ok(())
        } else {
            Err(Error::TimestampValidation {
                signature_id: self.signature_id,
                causes: self.causes,
            })
        }
    }
}
