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

use asic::{
    crypto::{hash::DigestAlgorithm, test_utils::TestTimeStampAuthority},
    manifest::{reference_for, DigestManifest},
    status_tracker::{validation_codes, LogKind},
    Container, Error, SignatureValidation, TimeStampSigner, Verdict,
};
use serde_json::json;
use tempfile::{tempdir, TempDir};

const SHA256: DigestAlgorithm = DigestAlgorithm::Sha256;

fn statuses(result: &SignatureValidation) -> Vec<&str> {
    result
        .causes()
        .iter()
        .filter_map(|item| item.validation_status.as_deref())
        .collect()
}

fn signed_container(ctx: &asic::Context, dir: &TempDir, signer: &TimeStampSigner) -> Container {
    let mut container = Container::create(dir.path().join("signed.asics"), ctx).unwrap();
    container
        .add_data_file_from_bytes("doc.txt", "text/plain", b"document".to_vec())
        .unwrap();
    container.sign(signer, ctx).unwrap();
    container
}

// An ASiC-S container with a plain time stamp over `content` and an archive
// manifest whose reference to that time stamp carries a wrong digest. The
// manifest's own time stamp is issued over `manifest_imprint_of`, or over
// the manifest itself.
fn write_archive_container(dir: &TempDir, manifest_imprint_of: Option<&[u8]>) -> std::path::PathBuf {
    let tsa = TestTimeStampAuthority::new();
    let content = b"contract text";

    let token = tsa.issue(SHA256, &SHA256.digest(content));

    let manifest = DigestManifest {
        sig_reference: Some("META-INF/timestamp002.tst".into()),
        references: vec![
            reference_for("contract.txt", SHA256, SHA256.digest(content)),
            reference_for("META-INF/timestamp.tst", SHA256, SHA256.digest(b"not the token")),
        ],
    };
    let xml = manifest.to_xml();

    let imprint = SHA256.digest(manifest_imprint_of.unwrap_or(xml.as_bytes()));
    let archive_token = tsa.issue(SHA256, &imprint);

    let path = dir.path().join("archive.asics");
    common::write_package(
        &path,
        common::ASIC_S,
        &[
            ("contract.txt", &content[..]),
            ("META-INF/timestamp.tst", token.as_slice()),
            ("META-INF/ASiCArchiveManifest.xml", xml.as_bytes()),
            ("META-INF/timestamp002.tst", archive_token.as_slice()),
        ],
    );
    path
}

#[test]
fn test_time_stamp_over_other_content() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let tsa = TestTimeStampAuthority::new();

    let path = dir.path().join("tampered.asics");
    let token = tsa.issue(SHA256, &SHA256.digest(b"original"));
    common::write_package(
        &path,
        common::ASIC_S,
        &[
            ("doc.txt", &b"replaced"[..]),
            ("META-INF/timestamp.tst", token.as_slice()),
        ],
    );

    let container = Container::open(&path, &ctx).unwrap();
    let result = &container.validate(&ctx)[0];

    assert_eq!(result.verdict(), Verdict::Invalid);
    assert_eq!(statuses(result), vec![validation_codes::TIMESTAMP_MISMATCH]);
    assert!(!result.has_status(validation_codes::TIMESTAMP_VALIDATED));

    match result.clone().into_result() {
        Err(Error::TimestampValidation {
            signature_id,
            causes,
        }) => {
            assert_eq!(signature_id, result.signature_id());
            assert_eq!(causes.len(), 1);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_weak_digest_warning() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let signer = common::signer().with_digest_algorithm(DigestAlgorithm::Sha1);
    let container = signed_container(&ctx, &dir, &signer);

    let result = &container.validate(&ctx)[0];
    assert_eq!(result.verdict(), Verdict::ValidWithWarnings);
    assert!(!result.has_failures());
    assert!(!result.is_valid());
    assert_eq!(statuses(result), vec![validation_codes::REFERENCE_DIGEST_WEAK]);
    assert_eq!(result.warnings().count(), 1);
    assert!(result.has_status(validation_codes::TIMESTAMP_VALIDATED));
    assert!(result.clone().into_result().is_err());
}

#[test]
fn test_weak_digest_not_reported_for_mismatched_token() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let tsa = TestTimeStampAuthority::new();
    let sha1 = DigestAlgorithm::Sha1;

    let path = dir.path().join("tampered-sha1.asics");
    let token = tsa.issue(sha1, &sha1.digest(b"original"));
    common::write_package(
        &path,
        common::ASIC_S,
        &[
            ("doc.txt", &b"replaced"[..]),
            ("META-INF/timestamp.tst", token.as_slice()),
        ],
    );

    let container = Container::open(&path, &ctx).unwrap();
    let result = &container.validate(&ctx)[0];

    assert_eq!(result.verdict(), Verdict::Invalid);
    assert_eq!(statuses(result), vec![validation_codes::TIMESTAMP_MISMATCH]);
    assert!(!result.has_status(validation_codes::REFERENCE_DIGEST_WEAK));
    assert_eq!(result.warnings().count(), 0);
}

#[test]
fn test_weak_digest_warning_suppressed() {
    let ctx = common::trusted_context(json!({
        "verify": { "ignore_weak_digest_warnings": true }
    }));
    let dir = tempdir().unwrap();
    let signer = common::signer().with_digest_algorithm(DigestAlgorithm::Sha1);
    let container = signed_container(&ctx, &dir, &signer);

    let result = &container.validate(&ctx)[0];
    assert_eq!(result.verdict(), Verdict::Valid);
    assert!(result.is_valid());
    assert!(result.clone().into_result().is_ok());
}

#[test]
fn test_manifest_reference_mismatch() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let path = write_archive_container(&dir, None);

    let container = Container::open(&path, &ctx).unwrap();
    assert_eq!(container.signatures().len(), 2);

    let results = container.validate(&ctx);
    assert!(results[0].is_valid());

    let archive = &results[1];
    assert!(archive.has_status(validation_codes::TIMESTAMP_VALIDATED));
    assert!(archive.has_status(validation_codes::REFERENCE_DIGEST_MATCH));

    let failures: Vec<_> = archive.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].label, "META-INF/timestamp.tst");
    assert_eq!(
        failures[0].validation_status.as_deref(),
        Some(validation_codes::REFERENCE_DIGEST_MISMATCH)
    );
    assert!(failures[0]
        .err_val
        .as_deref()
        .is_some_and(|err| err.contains("META-INF/timestamp.tst")));
}

#[test]
fn test_archive_manifest_survives_save() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let path = write_archive_container(&dir, None);

    let mut container = Container::open(&path, &ctx).unwrap();
    let copy = dir.path().join("copy.asics");
    container.save_as(&copy).unwrap();

    let reopened = Container::open(&copy, &ctx).unwrap();
    let archive = reopened.signatures()[1].as_time_stamp().unwrap();
    assert_eq!(archive.current_file(), Some("META-INF/ASiCArchiveManifest.xml"));
    assert_eq!(archive.manifest().unwrap().references.len(), 2);
    assert_eq!(reopened.validate(&ctx), container.validate(&ctx));
}

#[test]
fn test_failures_are_accumulated() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();
    let path = write_archive_container(&dir, Some(&b"something else"[..]));

    let container = Container::open(&path, &ctx).unwrap();
    let archive = &container.validate(&ctx)[1];

    assert_eq!(
        statuses(archive),
        vec![
            validation_codes::TIMESTAMP_MISMATCH,
            validation_codes::REFERENCE_DIGEST_MISMATCH
        ]
    );
    assert!(archive.has_status(validation_codes::REFERENCE_DIGEST_MATCH));
}

#[test]
fn test_stop_on_first_error() {
    let ctx = common::trusted_context(json!({
        "verify": { "stop_on_first_error": true }
    }));
    let dir = tempdir().unwrap();
    let path = write_archive_container(&dir, Some(&b"something else"[..]));

    let container = Container::open(&path, &ctx).unwrap();
    let archive = &container.validate(&ctx)[1];

    assert_eq!(statuses(archive), vec![validation_codes::TIMESTAMP_MISMATCH]);
    assert!(archive.successes().is_empty());
}

#[test]
fn test_malformed_token() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let path = dir.path().join("broken.asics");
    common::write_package(
        &path,
        common::ASIC_S,
        &[
            ("doc.txt", &b"doc"[..]),
            ("META-INF/timestamp.tst", &b"not a token"[..]),
        ],
    );

    let mut container = Container::open(&path, &ctx).unwrap();
    let result = &container.validate(&ctx)[0];

    assert_eq!(statuses(result), vec![validation_codes::TIMESTAMP_MALFORMED]);
    assert_eq!(result.causes()[0].label, "META-INF/timestamp.tst");
    assert_eq!(result.causes()[0].kind, LogKind::Failure);
    assert!(result.successes().is_empty());

    container.remove_signature(0).unwrap();
    assert!(matches!(
        container.add_ades_signature(b"not a token", &ctx),
        Err(Error::ParseError(_))
    ));
}

#[test]
fn test_untrusted_authority() {
    let ctx = common::context(json!({}));
    let dir = tempdir().unwrap();
    let container = signed_container(&ctx, &dir, &common::signer());

    let result = &container.validate(&ctx)[0];
    assert_eq!(statuses(result), vec![validation_codes::TIMESTAMP_UNTRUSTED]);
}

#[test]
fn test_trust_check_disabled() {
    let ctx = common::context(json!({ "trust": { "verify_trust": false } }));
    let dir = tempdir().unwrap();
    let container = signed_container(&ctx, &dir, &common::signer());

    let result = &container.validate(&ctx)[0];
    assert!(result.is_valid());
    assert!(result.has_status(validation_codes::TIMESTAMP_VALIDATED));
    assert!(!result.has_status(validation_codes::TIMESTAMP_TRUSTED));
}

#[test]
fn test_missing_time_stamp_authority() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let mut container = Container::create(dir.path().join("a.asics"), &ctx).unwrap();
    container
        .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
        .unwrap();

    assert!(matches!(
        container.sign(&TimeStampSigner::new(), &ctx),
        Err(Error::MissingTimeStampAuthority)
    ));
    assert!(container.signatures().is_empty());
}

#[test]
fn test_signed_asice_needs_signature_parser() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    let path = dir.path().join("signed.asice");
    common::write_package(
        &path,
        common::ASIC_E,
        &[
            ("doc.txt", &b"doc"[..]),
            ("META-INF/signatures0.xml", &b"<XAdESSignatures/>"[..]),
        ],
    );

    assert!(matches!(
        Container::open(&path, &ctx),
        Err(Error::NotImplemented(_))
    ));
}

#[test]
fn test_missing_container() {
    let ctx = common::trusted_context(json!({}));
    let dir = tempdir().unwrap();

    assert!(matches!(
        Container::open(dir.path().join("missing.asics"), &ctx),
        Err(Error::FileNotFound(_))
    ));
}
