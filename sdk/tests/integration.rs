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

mod common;

use std::{fs, sync::mpsc, thread};

use asic::{
    crypto::{hash::DigestAlgorithm, test_utils::TestTimeStampAuthority, time_stamp::TimeStampToken},
    status_tracker::validation_codes,
    Container, Error, Signature, Verdict, ASIC_TST_PROFILE,
};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_sign_save_open_validate() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let doc = dir.path().join("report.txt");
    fs::write(&doc, b"quarterly report").unwrap();

    let path = dir.path().join("report.asics");
    let mut container = Container::create(&path, &ctx).unwrap();
    assert_eq!(container.format_name(), "ASiC-S");

    container.add_data_file(&doc, "text/plain").unwrap();
    let signature = container.sign(&common::signer(), &ctx).unwrap();
    assert_eq!(signature.profile(), ASIC_TST_PROFILE);
    assert_eq!(
        signature.claimed_signing_time(),
        Some(TestTimeStampAuthority::default_gen_time())
    );
    let id = signature.id();

    container.save().unwrap();

    let opened = Container::open(&path, &ctx).unwrap();
    assert_eq!(opened.media_type(), common::ASIC_S);
    assert_eq!(opened.data_files().len(), 1);
    assert_eq!(opened.data_files()[0].name(), "report.txt");
    assert_eq!(opened.data_files()[0].bytes().unwrap(), b"quarterly report");
    assert_eq!(opened.signatures().len(), 1);
    assert_eq!(opened.signatures()[0].id(), id);

    let results = opened.validate(&ctx);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].signature_id(), id);
    assert!(results[0].is_valid());
    assert_eq!(results[0].verdict(), Verdict::Valid);
    assert!(results[0].has_status(validation_codes::TIMESTAMP_VALIDATED));
    assert!(results[0].has_status(validation_codes::TIMESTAMP_TRUSTED));
}

#[test]
fn test_saved_token_parses_back() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"some content".to_vec())
        .unwrap();
    let signature = container.sign(&common::signer(), &ctx).unwrap();

    let tst = signature.as_time_stamp().unwrap();
    let token = TimeStampToken::from_der(tst.save()).unwrap();

    // the id of a time stamp signature is the token serial, not "S<n>"
    assert_eq!(token.serial_number(), "305419896");
    assert_eq!(token.serial_number(), signature.id());
    assert_eq!(token.digest_method(), signature.signature_method());
    assert_eq!(token.digest_method(), DigestAlgorithm::Sha256.uri());
    assert_eq!(
        token.message_imprint(),
        DigestAlgorithm::Sha256.digest(b"some content")
    );
    assert_eq!(token.message_imprint(), tst.message_imprint());
}

#[test]
fn test_data_files_locked_after_signing() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
        .unwrap();
    container.sign(&common::signer(), &ctx).unwrap();

    let other = dir.path().join("b.txt");
    fs::write(&other, b"b").unwrap();

    assert!(matches!(
        container.add_data_file(&other, "text/plain"),
        Err(Error::ContainerState(_))
    ));
    assert!(matches!(
        container.add_data_file_from_stream(&mut &b"b"[..], "b.txt", "text/plain", &ctx),
        Err(Error::ContainerState(_))
    ));
    assert!(matches!(
        container.remove_data_file(0),
        Err(Error::ContainerState(_))
    ));
}

#[test]
fn test_add_stored_time_stamp() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let tsa = TestTimeStampAuthority::new();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"stamped".to_vec())
        .unwrap();

    let token = tsa.issue(
        DigestAlgorithm::Sha256,
        &DigestAlgorithm::Sha256.digest(b"stamped"),
    );
    container
        .add_ades_signature_from_stream(&mut token.as_slice(), &ctx)
        .unwrap();

    assert!(matches!(container.signatures()[0], Signature::TimeStamp(_)));
    assert!(container.validate(&ctx)[0].is_valid());

    // ASiC-S holds one signature
    assert!(matches!(
        container.add_ades_signature(&token, &ctx),
        Err(Error::ContainerState(_))
    ));

    container.remove_signature(0).unwrap();
    container.remove_data_file(0).unwrap();
    assert!(matches!(
        container.add_ades_signature(&token, &ctx),
        Err(Error::ContainerState(_))
    ));
}

#[test]
fn test_validate_is_idempotent() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
        .unwrap();
    container
        .sign(
            &common::signer().with_digest_algorithm(DigestAlgorithm::Sha1),
            &ctx,
        )
        .unwrap();

    let first = container.validate(&ctx);
    let second = container.validate(&ctx);
    assert!(!first[0].causes().is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_validation() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", vec![42; 64 * 1024])
        .unwrap();
    container.sign(&common::signer(), &ctx).unwrap();

    let expected = container.validate(&ctx);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| container.validate(&ctx)))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_asice_round_trip_keeps_media_types() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.asice");

    let mut container = Container::create(&path, &ctx).unwrap();
    assert_eq!(container.format_name(), "ASiC-E");
    container
        .add_data_file_from_bytes("notes.txt", "text/plain", b"notes".to_vec())
        .unwrap();
    container
        .add_data_file_from_bytes("data/table.csv", "text/csv", b"a,b\n1,2\n".to_vec())
        .unwrap();
    container.save().unwrap();

    let opened = Container::open(&path, &ctx).unwrap();
    assert_eq!(opened.format_name(), "ASiC-E");
    assert!(opened.signatures().is_empty());

    let files: Vec<_> = opened
        .data_files()
        .iter()
        .map(|f| (f.name(), f.media_type()))
        .collect();
    assert_eq!(
        files,
        vec![("notes.txt", "text/plain"), ("data/table.csv", "text/csv")]
    );
}

#[test]
fn test_asice_fresh_token_skips_stored_names() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let tsa = TestTimeStampAuthority::new();
    let path = dir.path().join("stamped.asice");

    let imprint = DigestAlgorithm::Sha256.digest(b"stamped");
    let stored = tsa.issue(DigestAlgorithm::Sha256, &imprint);
    common::write_package(
        &path,
        common::ASIC_E,
        &[
            ("a.txt", &b"stamped"[..]),
            ("META-INF/timestamp1.tst", stored.as_slice()),
        ],
    );

    let mut container = Container::open(&path, &ctx).unwrap();
    assert_eq!(container.signatures().len(), 1);

    let fresh = tsa.issue(DigestAlgorithm::Sha256, &imprint);
    container.add_ades_signature(&fresh, &ctx).unwrap();

    let copy = dir.path().join("copy.asice");
    container.save_as(&copy).unwrap();

    let archive = zip::ZipArchive::new(fs::File::open(&copy).unwrap()).unwrap();
    let mut tokens: Vec<_> = archive
        .file_names()
        .filter(|name| name.ends_with(".tst"))
        .collect();
    tokens.sort();
    assert_eq!(
        tokens,
        vec!["META-INF/timestamp0.tst", "META-INF/timestamp1.tst"]
    );

    let reopened = Container::open(&copy, &ctx).unwrap();
    let mut ids: Vec<_> = reopened.signatures().iter().map(|s| s.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["305419896", "305419897"]);
    assert!(reopened.validate(&ctx).iter().all(|v| v.is_valid()));
}

#[test]
fn test_save_as_moves_container() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("first.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
        .unwrap();
    container.sign(&common::signer(), &ctx).unwrap();

    let second = dir.path().join("second.asics");
    container.save_as(&second).unwrap();
    assert_eq!(container.path(), Some(second.as_path()));
    assert!(!dir.path().join("first.asics").exists());

    let opened = Container::open(&second, &ctx).unwrap();
    assert!(opened.validate(&ctx)[0].is_valid());
}

#[test]
fn test_initialize_calls_back_once() {
    common::init_logging();

    let (tx, rx) = mpsc::channel();
    let ctx = asic::initialize(
        "test-app",
        Some("test-agent/1.0"),
        Some(Box::new(move |result| {
            tx.send(result.is_ok()).unwrap();
        })),
    )
    .unwrap();

    ctx.wait_until_ready().unwrap();
    assert!(rx.recv().unwrap());
    assert!(rx.try_recv().is_err());

    assert_eq!(ctx.app_info(), "test-app");
    assert_eq!(ctx.user_agent(), "test-agent/1.0");

    asic::terminate(ctx);
}

#[test]
fn test_default_user_agent() {
    let ctx = asic::initialize("test-app", None, None).unwrap();
    assert_eq!(
        ctx.user_agent(),
        format!("test-app asic-rs/{}", asic::version())
    );
}
