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

use crate::{
    log_item,
    validation_codes::{REFERENCE_DIGEST_MISMATCH, TIMESTAMP_VALIDATED},
    ErrorBehavior, LogKind, StatusTracker,
};

#[derive(Debug, Eq, PartialEq)]
struct SampleError {}

#[test]
fn default_continues_on_error() {
    let mut tracker = StatusTracker::default();
    assert_eq!(tracker.error_behavior(), ErrorBehavior::ContinueWhenPossible);

    let r = log_item!("a.txt", "digest differs", "validate")
        .validation_status(REFERENCE_DIGEST_MISMATCH)
        .failure(&mut tracker, SampleError {});
    assert_eq!(r, Ok(SampleError {}));

    let r = log_item!("b.txt", "digest differs", "validate")
        .validation_status(REFERENCE_DIGEST_MISMATCH)
        .failure(&mut tracker, SampleError {});
    assert_eq!(r, Ok(SampleError {}));

    assert_eq!(tracker.filter_errors().count(), 2);
    assert!(tracker.has_status(REFERENCE_DIGEST_MISMATCH));
    assert!(tracker.has_error(SampleError {}));
}

#[test]
fn stop_on_first_error() {
    let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

    let r = log_item!("a.txt", "digest differs", "validate").failure(&mut tracker, SampleError {});

    assert_eq!(r, Err(SampleError {}));
    assert_eq!(tracker.logged_items().len(), 1);
}

#[test]
fn failure_no_throw_ignores_behavior() {
    let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

    log_item!("S0", "bad", "validate").failure_no_throw(&mut tracker, SampleError {});

    assert!(tracker.has_any_error());
    assert_eq!(tracker.logged_items()[0].kind, LogKind::Failure);
}

#[test]
fn signature_id_stack() {
    let mut tracker = StatusTracker::default();

    tracker.push_signature_id("S0");
    log_item!("S0", "ok", "validate")
        .validation_status(TIMESTAMP_VALIDATED)
        .success(&mut tracker);
    assert_eq!(tracker.pop_signature_id().as_deref(), Some("S0"));

    log_item!("S1", "ok", "validate").success(&mut tracker);

    let items = tracker.logged_items();
    assert_eq!(items[0].signature_id.as_deref(), Some("S0"));
    assert_eq!(items[1].signature_id, None);
    assert_eq!(tracker.filter_kind(LogKind::Success).count(), 2);
}

#[test]
fn append() {
    let mut first = StatusTracker::default();
    log_item!("S0", "ok", "validate").success(&mut first);

    let mut second = StatusTracker::default();
    log_item!("S1", "ok", "validate").success(&mut second);

    first.append(&second);
    assert_eq!(first.into_logged_items().len(), 2);
}
