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

use std::fmt::Debug;

use log::{debug, info, warn};

use crate::{LogItem, LogKind};

/// A `StatusTracker` is used while validating a signature to control
/// error-handling behavior and to aggregate log items as they are
/// generated.
#[derive(Debug, Default)]
pub struct StatusTracker {
    error_behavior: ErrorBehavior,
    logged_items: Vec<LogItem>,
    signature_ids: Vec<String>,
}

impl StatusTracker {
    /// Returns a [`StatusTracker`] with the specified [`ErrorBehavior`].
    pub fn with_error_behavior(error_behavior: ErrorBehavior) -> Self {
        Self {
            error_behavior,
            logged_items: vec![],
            signature_ids: vec![],
        }
    }

    /// Returns the configured [`ErrorBehavior`].
    pub fn error_behavior(&self) -> ErrorBehavior {
        self.error_behavior
    }

    /// Returns the current list of validation log items, in the order they
    /// were logged.
    pub fn logged_items(&self) -> &[LogItem] {
        &self.logged_items
    }

    /// Consumes the tracker and returns its log items.
    pub fn into_logged_items(self) -> Vec<LogItem> {
        self.logged_items
    }

    /// Appends the contents of another [`StatusTracker`] to this one.
    pub fn append(&mut self, other: &StatusTracker) {
        for log_item in other.logged_items() {
            self.add_non_error(log_item.clone());
        }
    }

    /// Adds a non-error [`LogItem`] to this status tracker.
    ///
    /// Primarily intended for use by [`LogItem::success()`],
    /// [`LogItem::informational()`] or [`LogItem::warning()`].
    pub fn add_non_error(&mut self, log_item: LogItem) {
        let log_item = self.tag(log_item);

        match log_item.kind {
            LogKind::Warning => warn!("{}: {}", log_item.label, log_item.description),
            _ => info!("{}: {}", log_item.label, log_item.description),
        }

        self.logged_items.push(log_item);
    }

    /// Adds an error-case [`LogItem`] to this status tracker.
    ///
    /// Will return `Err(err)` if configured to stop immediately on errors or
    /// `Ok(err)` if configured to continue on errors. _(See
    /// [`ErrorBehavior`].)_
    ///
    /// Primarily intended for use by [`LogItem::failure()`].
    pub fn add_error<E>(&mut self, log_item: LogItem, err: E) -> Result<E, E> {
        let log_item = self.tag(log_item);
        debug!(
            "{}: {} ({})",
            log_item.label,
            log_item.description,
            log_item.err_val.as_deref().unwrap_or_default()
        );

        self.logged_items.push(log_item);

        match self.error_behavior {
            ErrorBehavior::StopOnFirstError => Err(err),
            ErrorBehavior::ContinueWhenPossible => Ok(err),
        }
    }

    /// Returns the [`LogItem`]s that have error conditions (`err_val` is
    /// populated).
    pub fn filter_errors(&self) -> impl Iterator<Item = &LogItem> {
        self.logged_items()
            .iter()
            .filter(|item| item.err_val.is_some())
    }

    /// Returns the [`LogItem`]s of a given [`LogKind`].
    pub fn filter_kind(&self, kind: LogKind) -> impl Iterator<Item = &LogItem> {
        self.logged_items()
            .iter()
            .filter(move |item| item.kind == kind)
    }

    /// Returns `true` if the validation log contains a specific status code.
    pub fn has_status(&self, val: &str) -> bool {
        self.logged_items()
            .iter()
            .any(|vi| vi.validation_status.as_deref() == Some(val))
    }

    /// Returns `true` if the validation log contains a specific error.
    pub fn has_error<E: Debug>(&self, err: E) -> bool {
        let err_type = format!("{:?}", &err);
        self.logged_items()
            .iter()
            .any(|vi| vi.err_val.as_deref() == Some(err_type.as_str()))
    }

    /// Returns `true` if the validation log contains any error.
    pub fn has_any_error(&self) -> bool {
        self.filter_errors().next().is_some()
    }

    /// Keeps track of the signature currently being validated.
    ///
    /// The id is added to any log items that are created until it is
    /// popped.
    pub fn push_signature_id<S: Into<String>>(&mut self, id: S) {
        self.signature_ids.push(id.into());
    }

    /// Removes the current signature id, if any.
    pub fn pop_signature_id(&mut self) -> Option<String> {
        self.signature_ids.pop()
    }

    fn tag(&self, mut log_item: LogItem) -> LogItem {
        if log_item.signature_id.is_none() {
            if let Some(id) = self.signature_ids.last() {
                log_item.signature_id = Some(id.to_string().into());
            }
        }
        log_item
    }
}

/// `ErrorBehavior` configures the behavior of [`StatusTracker`] when its
/// [`add_error`] function is called.
///
/// [`add_error`]: StatusTracker::add_error
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorBehavior {
    /// If an error is encountered, stop validation immediately.
    StopOnFirstError,

    /// If an error is encountered, log it and continue validation as much as
    /// possible.
    #[default]
    ContinueWhenPossible,
}
