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

use std::{borrow::Cow, fmt::Debug};

use crate::StatusTracker;

/// Creates a [`LogItem`] describing a check made at the call site.
///
/// The crate name, version, source file and line are captured from the
/// calling crate.
///
/// ## Example
///
/// ```
/// # use asic_status_tracker::{log_item, LogKind};
/// let item = log_item!("S0", "time stamp validated", "validate");
///
/// assert_eq!(item.kind, LogKind::Informational);
/// assert_eq!(item.label, "S0");
/// ```
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem {
            kind: $crate::LogKind::Informational,
            label: $label.into(),
            crate_name: env!("CARGO_PKG_NAME").into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            file: file!().into(),
            function: $function.into(),
            line: line!(),
            description: $description.into(),
            ..Default::default()
        }
    }};
}

/// Detailed information about one check made during validation.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogItem {
    /// Kind of log item.
    pub kind: LogKind,

    /// Item being checked, typically a signature id or a reference URI
    pub label: Cow<'static, str>,

    /// Description of the condition
    pub description: Cow<'static, str>,

    /// Crate where the condition was detected
    pub crate_name: Cow<'static, str>,

    /// Version of the crate
    pub crate_version: Cow<'static, str>,

    /// Source file where the condition was detected
    pub file: Cow<'static, str>,

    /// Function where the condition was detected
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected
    pub line: u32,

    /// Error value rendered with [`Debug`]
    pub err_val: Option<Cow<'static, str>>,

    /// Validation status code (see [`validation_codes`](crate::validation_codes))
    pub validation_status: Option<Cow<'static, str>>,

    /// Id of the signature being validated when this item was logged
    pub signature_id: Option<Cow<'static, str>>,
}

impl Default for LogItem {
    fn default() -> Self {
        LogItem {
            kind: LogKind::Success,
            label: Cow::Borrowed(""),
            description: Cow::Borrowed(""),
            crate_name: env!("CARGO_PKG_NAME").into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            file: Cow::Borrowed(""),
            function: Cow::Borrowed(""),
            line: 0,
            err_val: None,
            validation_status: None,
            signature_id: None,
        }
    }
}

impl LogItem {
    /// Adds a validation status code.
    ///
    /// ## Example
    ///
    /// ```
    /// # use asic_status_tracker::{log_item, validation_codes::TIMESTAMP_MISMATCH};
    /// let item = log_item!("S0", "imprint differs", "validate").validation_status(TIMESTAMP_MISMATCH);
    ///
    /// assert_eq!(item.validation_status.as_deref(), Some("timeStamp.mismatch"));
    /// ```
    #[must_use]
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            ..self
        }
    }

    /// Captures an error value as the `err_val` of this item without
    /// reporting it to a tracker.
    #[must_use]
    pub fn error<E: Debug>(self, err: E) -> Self {
        LogItem {
            err_val: Some(format!("{err:?}").into()),
            ..self
        }
    }

    /// Sets the signature id explicitly.
    #[must_use]
    pub fn set_signature_id<S: Into<String>>(self, id: S) -> Self {
        LogItem {
            signature_id: Some(id.into().into()),
            ..self
        }
    }

    /// Set the log item kind to [`LogKind::Success`] and add it to the
    /// [`StatusTracker`].
    pub fn success(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Success;
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Informational`] and add it to the
    /// [`StatusTracker`].
    pub fn informational(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Informational;
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Warning`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Warnings are recorded as causes but never stop validation.
    pub fn warning(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Warning;
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// If the tracker is configured to stop on the first error, this
    /// returns `Err(err)`. Otherwise it returns `Ok(err)` so the caller can
    /// carry on.
    pub fn failure<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) -> Result<E, E> {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        tracker.add_error(self, err)
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Ignores the tracker's [`ErrorBehavior`](crate::ErrorBehavior).
    pub fn failure_no_throw<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Always returns the passed error value so it can propagate out of a
    /// closure.
    pub fn failure_as_err<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) -> E {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        match tracker.add_error(self, err) {
            Ok(e) => e,
            Err(e) => e,
        }
    }
}

/// Classifies a [`LogItem`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogKind {
    /// This [`LogItem`] describes a success condition.
    Success,

    /// This [`LogItem`] describes an informational condition.
    Informational,

    /// This [`LogItem`] describes an advisory condition, such as use of a
    /// weak digest algorithm.
    Warning,

    /// This [`LogItem`] describes a failure or error condition.
    Failure,
}
