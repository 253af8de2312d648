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

use bcder::{decode::Constructed, Integer, Mode, Oid, Tag};
use httpmock::prelude::*;

use crate::{
    asn1::rfc3161::MessageImprint,
    hash::DigestAlgorithm,
    test_utils::TestTimeStampAuthority,
    time_stamp::{
        default_rfc3161_message, default_rfc3161_request, time_stamp_request,
        HttpTimeStampProvider, TimeStampError, TimeStampToken,
    },
};

const REPLY: &str = "application/timestamp-reply";

fn digest() -> Vec<u8> {
    DigestAlgorithm::Sha256.digest(b"http test")
}

/// Returns the imprint, nonce and `certReq` flag of an encoded `TimeStampReq`.
fn read_request(body: &[u8]) -> (MessageImprint, Option<Integer>, Option<bool>) {
    Constructed::decode(body, Mode::Der, |cons| {
        cons.take_sequence(|cons| {
            Integer::take_from(cons)?;
            let imprint = MessageImprint::take_from(cons)?;
            Oid::take_opt_from(cons)?;
            let nonce =
                cons.take_opt_primitive_if(Tag::INTEGER, |prim| Integer::from_primitive(prim))?;
            let cert_req = cons.take_opt_bool()?;
            Ok((imprint, nonce, cert_req))
        })
    })
    .unwrap()
}

#[test]
fn request_message() {
    let body = default_rfc3161_message(&digest(), DigestAlgorithm::Sha256).unwrap();
    let (imprint, nonce, cert_req) = read_request(&body);

    assert_eq!(
        imprint.hash_algorithm.digest_algorithm(),
        Some(DigestAlgorithm::Sha256)
    );
    assert_eq!(
        imprint.hashed_message.to_bytes().as_ref(),
        digest().as_slice()
    );
    assert!(nonce.is_some());
    assert_eq!(cert_req, Some(true));
}

#[test]
fn request_rejects_wrong_digest_length() {
    let err = default_rfc3161_message(&[0u8; 20], DigestAlgorithm::Sha256).unwrap_err();
    assert!(matches!(err, TimeStampError::InternalError(_)));
}

#[test]
fn granted() {
    let _ = env_logger::builder().is_test(true).try_init();

    let tsa = TestTimeStampAuthority::new();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/tsa")
            .header("content-type", "application/timestamp-query")
            .header("user-agent", "http-test/1.0");
        then.status(200)
            .header("content-type", REPLY)
            .body(tsa.issue_response(DigestAlgorithm::Sha256, &digest(), None));
    });

    let mut request = time_stamp_request(&digest(), DigestAlgorithm::Sha256).unwrap();
    request.nonce = None;

    let bytes = default_rfc3161_request(&server.url("/tsa"), None, "http-test/1.0", &request)
        .unwrap();
    mock.assert();

    let token = TimeStampToken::from_der(&bytes).unwrap();
    assert_eq!(token.message_imprint(), digest().as_slice());
}

#[test]
fn extra_headers_are_sent() {
    let tsa = TestTimeStampAuthority::new();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/tsa").header("x-api-key", "secret");
        then.status(200)
            .header("content-type", REPLY)
            .body(tsa.issue_response(DigestAlgorithm::Sha256, &digest(), Some(1)));
    });

    let provider = HttpTimeStampProvider::new(server.url("/tsa")).with_header("x-api-key", "secret");
    let err =
        TimeStampToken::request(&provider, &digest(), DigestAlgorithm::Sha256, "test").unwrap_err();
    mock.assert();

    // The canned response cannot echo the random nonce.
    assert!(matches!(err, TimeStampError::NonceMismatch));
}

#[test]
fn http_error_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/tsa");
        then.status(500).header("content-type", "text/plain").body("boom");
    });

    let provider = HttpTimeStampProvider::new(server.url("/tsa"));
    let err =
        TimeStampToken::request(&provider, &digest(), DigestAlgorithm::Sha256, "test").unwrap_err();

    let TimeStampError::HttpErrorResponse(status, content_type) = err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(status, 500);
    assert_eq!(content_type, "text/plain");
}

#[test]
fn wrong_content_type() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/tsa");
        then.status(200).header("content-type", "text/html").body("<html/>");
    });

    let provider = HttpTimeStampProvider::new(server.url("/tsa"));
    let err =
        TimeStampToken::request(&provider, &digest(), DigestAlgorithm::Sha256, "test").unwrap_err();

    assert!(matches!(err, TimeStampError::HttpErrorResponse(200, _)));
}

#[test]
fn rejected_by_service() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/tsa");
        then.status(200)
            .header("content-type", REPLY)
            .body(TestTimeStampAuthority::rejection_response());
    });

    let provider = HttpTimeStampProvider::new(server.url("/tsa"));
    let err =
        TimeStampToken::request(&provider, &digest(), DigestAlgorithm::Sha256, "test").unwrap_err();

    assert!(matches!(err, TimeStampError::Rejected(_)));
}

#[test]
fn connection_refused() {
    let provider = HttpTimeStampProvider::new("http://127.0.0.1:1/tsa");
    let err =
        TimeStampToken::request(&provider, &digest(), DigestAlgorithm::Sha256, "test").unwrap_err();

    assert!(matches!(err, TimeStampError::HttpConnectionError(_)));
}
