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

use std::borrow::Cow;

use crate::{log_item, validation_codes::REFERENCE_DIGEST_WEAK, LogItem, LogKind, StatusTracker};

#[test]
fn r#macro() {
    let log = log_item!("S0", "time stamp validated", "validate");

    assert_eq!(
        log,
        LogItem {
            kind: LogKind::Informational,
            label: Cow::Borrowed("S0"),
            description: Cow::Borrowed("time stamp validated"),
            crate_name: env!("CARGO_PKG_NAME").into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            file: Cow::Borrowed(file!()),
            function: Cow::Borrowed("validate"),
            line: log.line,
            err_val: None,
            validation_status: None,
            signature_id: None,
        }
    );

    assert!(log.line > 2);
}

#[test]
fn macro_from_string() {
    let uri = "document%201.txt".to_string();
    let log = log_item!(uri, "reference checked", "validate");

    assert_eq!(log.label, Cow::<str>::Owned("document%201.txt".to_string()));
    assert_eq!(log.description, "reference checked");
}

#[test]
fn error() {
    let log = log_item!("S0", "bad data", "validate").error("sample error message");

    assert_eq!(
        log.err_val,
        Some(Cow::Borrowed("\"sample error message\""))
    );
    assert_eq!(log.kind, LogKind::Informational);
}

#[test]
fn warning() {
    let mut tracker = StatusTracker::default();

    log_item!("S0", "weak digest", "validate")
        .validation_status(REFERENCE_DIGEST_WEAK)
        .warning(&mut tracker);

    let item = &tracker.logged_items()[0];
    assert_eq!(item.kind, LogKind::Warning);
    assert_eq!(item.validation_status.as_deref(), Some(REFERENCE_DIGEST_WEAK));
    assert!(item.err_val.is_none());
    assert!(!tracker.has_any_error());
}

#[test]
fn failure_as_err() {
    let mut tracker = StatusTracker::default();

    let err = log_item!("S0", "failed", "validate").failure_as_err(&mut tracker, "oops");

    assert_eq!(err, "oops");
    assert_eq!(tracker.logged_items()[0].kind, LogKind::Failure);
    assert!(tracker.has_error("oops"));
}

#[test]
fn explicit_signature_id_wins() {
    let mut tracker = StatusTracker::default();
    tracker.push_signature_id("S1");

    log_item!("a.txt", "matched", "validate")
        .set_signature_id("S7")
        .success(&mut tracker);

    assert_eq!(tracker.logged_items()[0].signature_id.as_deref(), Some("S7"));
}
