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

//! An in-process RFC 3161 time stamp authority for tests.
//!
//! Tokens are signed with a fixed Ed25519 key, so test fixtures stay
//! reproducible without network access.

#![allow(clippy::unwrap_used)]

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use bcder::{
    encode::{self, PrimitiveContent, Values},
    BitString, Captured, ConstOid, Mode, OctetString, Oid, Tag,
};
use chrono::{DateTime, TimeZone, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::{
    certificate::der_to_pem,
    hash::DigestAlgorithm,
    time_stamp::{TimeStampError, TimeStampProvider},
};

const OID_ED25519: ConstOid = Oid(&[43, 101, 112]);
const OID_SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);
const OID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);
const OID_TST_INFO: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 1, 4]);
const OID_CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);
const OID_MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);
const OID_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);
const OID_SUBJECT_KEY_ID: ConstOid = Oid(&[85, 29, 14]);
const OID_TSA_POLICY: ConstOid = Oid(&[42, 3, 4]);

const NOT_BEFORE: &str = "200101000000Z";
const NOT_AFTER: &str = "491231235959Z";

const TSA_NAME: &str = "Test TSA";
const ROOT_NAME: &str = "Test Root CA";
const TSA_CERT_SERIAL: u64 = 0x1001;
const ROOT_CERT_SERIAL: u64 = 0x01;

/// Knobs for producing unusual tokens.
#[derive(Clone, Debug)]
pub struct TokenOptions {
    /// Serial number; defaults to the next one from the authority.
    pub serial: Option<u64>,

    /// Issue time; defaults to 2024-01-02T03:04:05Z.
    pub gen_time: Option<DateTime<Utc>>,

    /// Nonce to echo.
    pub nonce: Option<u64>,

    /// Accuracy to state, to millisecond precision.
    pub accuracy: Option<Duration>,

    /// Identify the signer by subject key identifier instead of issuer and
    /// serial number.
    pub identify_by_key_id: bool,

    /// Embed the signer certificate (and root, if any).
    pub include_certificates: bool,

    /// Flip a bit in the signature value.
    pub corrupt_signature: bool,

    /// Number of values in the message-digest attribute.
    pub message_digest_values: usize,
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            serial: None,
            gen_time: None,
            nonce: None,
            accuracy: None,
            identify_by_key_id: false,
            include_certificates: true,
            corrupt_signature: false,
            message_digest_values: 1,
        }
    }
}

/// A time stamp authority that signs tokens locally.
pub struct TestTimeStampAuthority {
    signing_key: SigningKey,
    certificate: Captured,
    issuer_name: Captured,
    key_id: Vec<u8>,
    root_certificate: Option<Captured>,
    next_serial: AtomicU64,
}

impl TestTimeStampAuthority {
    /// Creates an authority with a self-signed certificate.
    pub fn new() -> Self {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let certificate = build_certificate(
            TSA_CERT_SERIAL,
            TSA_NAME,
            TSA_NAME,
            &signing_key.verifying_key(),
            &signing_key,
        );

        Self::from_parts(signing_key, certificate, TSA_NAME, None)
    }

    /// Creates an authority whose certificate is issued by a separate root.
    pub fn with_root() -> Self {
        let root_key = SigningKey::from_bytes(&[9u8; 32]);
        let root_certificate = build_certificate(
            ROOT_CERT_SERIAL,
            ROOT_NAME,
            ROOT_NAME,
            &root_key.verifying_key(),
            &root_key,
        );

        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let certificate = build_certificate(
            TSA_CERT_SERIAL,
            ROOT_NAME,
            TSA_NAME,
            &signing_key.verifying_key(),
            &root_key,
        );

        Self::from_parts(signing_key, certificate, ROOT_NAME, Some(root_certificate))
    }

    fn from_parts(
        signing_key: SigningKey,
        certificate: Captured,
        issuer: &str,
        root_certificate: Option<Captured>,
    ) -> Self {
        let key_id = key_id(&signing_key.verifying_key());

        Self {
            signing_key,
            certificate,
            issuer_name: name(issuer),
            key_id,
            root_certificate,
            next_serial: AtomicU64::new(0x1234_5678),
        }
    }

    /// Returns the signer certificate in DER form.
    pub fn certificate_der(&self) -> &[u8] {
        self.certificate.as_slice()
    }

    /// Returns the signer certificate in PEM form.
    pub fn certificate_pem(&self) -> String {
        der_to_pem(self.certificate.as_slice())
    }

    /// Returns the root certificate in PEM form, if there is one.
    pub fn root_certificate_pem(&self) -> Option<String> {
        self.root_certificate
            .as_ref()
            .map(|root| der_to_pem(root.as_slice()))
    }

    /// Returns the PEM to configure as the trust anchor for this authority.
    pub fn trust_anchor_pem(&self) -> String {
        self.root_certificate_pem()
            .unwrap_or_else(|| self.certificate_pem())
    }

    /// The issue time used when none is requested.
    pub fn default_gen_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    /// Issues a token over `imprint`, which was computed with `alg`.
    pub fn issue(&self, alg: DigestAlgorithm, imprint: &[u8]) -> Vec<u8> {
        self.issue_with(alg, imprint, &TokenOptions::default())
    }

    /// Issues a token with explicit options.
    pub fn issue_with(
        &self,
        alg: DigestAlgorithm,
        imprint: &[u8],
        options: &TokenOptions,
    ) -> Vec<u8> {
        self.token(alg, imprint, options).into_bytes().to_vec()
    }

    fn token(&self, alg: DigestAlgorithm, imprint: &[u8], options: &TokenOptions) -> Captured {
        let serial = options
            .serial
            .unwrap_or_else(|| self.next_serial.fetch_add(1, Ordering::Relaxed));
        let gen_time = options
            .gen_time
            .unwrap_or_else(Self::default_gen_time)
            .format("%Y%m%d%H%M%SZ")
            .to_string();

        let tst_info = encode::sequence((
            1u8.encode(),
            OID_TSA_POLICY.encode(),
            encode::sequence((
                encode::sequence((Oid(alg.oid()).encode(), ().encode())),
                OctetString::encode_slice(imprint),
            )),
            serial.encode(),
            gen_time.as_bytes().encode_as(Tag::GENERALIZED_TIME),
            options.accuracy.map(|accuracy| {
                let millis = accuracy.subsec_millis();
                encode::sequence((
                    accuracy.as_secs().encode(),
                    (millis > 0).then(|| millis.encode_as(Tag::CTX_0)),
                ))
            }),
            options.nonce.map(|nonce| nonce.encode()),
        ))
        .to_captured(Mode::Der);

        let message_digest = DigestAlgorithm::Sha256.digest(tst_info.as_slice());
        let digest_values: Vec<_> = (0..options.message_digest_values)
            .map(|_| OctetString::encode_slice(message_digest.as_slice()))
            .collect();

        let attrs = (
            encode::sequence((
                OID_CONTENT_TYPE.encode(),
                encode::set(OID_TST_INFO.encode()),
            )),
            encode::sequence((OID_MESSAGE_DIGEST.encode(), encode::set(digest_values))),
        )
            .to_captured(Mode::Der);

        let signed_attrs = encode::set(&attrs).to_captured(Mode::Der);
        let mut signature = self
            .signing_key
            .sign(signed_attrs.as_slice())
            .to_bytes()
            .to_vec();
        if options.corrupt_signature {
            signature[0] ^= 0x01;
        }

        let sid = if options.identify_by_key_id {
            OctetString::encode_slice_as(self.key_id.as_slice(), Tag::CTX_0)
                .to_captured(Mode::Der)
        } else {
            encode::sequence((&self.issuer_name, TSA_CERT_SERIAL.encode())).to_captured(Mode::Der)
        };

        let signer_info = encode::sequence((
            1u8.encode(),
            sid,
            encode::sequence(OID_SHA256.encode()),
            encode::sequence_as(Tag::CTX_0, attrs),
            encode::sequence(OID_ED25519.encode()),
            OctetString::encode_slice(signature),
        ));

        let certificates = options.include_certificates.then(|| {
            encode::sequence_as(
                Tag::CTX_0,
                (&self.certificate, self.root_certificate.as_ref()),
            )
        });

        let signed_data = encode::sequence((
            3u8.encode(),
            encode::set(encode::sequence(OID_SHA256.encode())),
            encode::sequence((
                OID_TST_INFO.encode(),
                encode::sequence_as(Tag::CTX_0, OctetString::encode_slice(tst_info.as_slice())),
            )),
            certificates,
            encode::set(signer_info),
        ));

        let content_info = encode::sequence((
            OID_SIGNED_DATA.encode(),
            encode::sequence_as(Tag::CTX_0, signed_data),
        ));

        content_info.to_captured(Mode::Der)
    }

    /// Wraps a fresh token in a granted `TimeStampResp`.
    pub fn issue_response(
        &self,
        alg: DigestAlgorithm,
        imprint: &[u8],
        nonce: Option<u64>,
    ) -> Vec<u8> {
        let token = self.token(
            alg,
            imprint,
            &TokenOptions {
                nonce,
                ..Default::default()
            },
        );

        encode::sequence((encode::sequence(0u8.encode()), token))
            .to_captured(Mode::Der)
            .into_bytes()
            .to_vec()
    }

    /// Returns a `TimeStampResp` that rejects the request with `badAlg`.
    pub fn rejection_response() -> Vec<u8> {
        encode::sequence(encode::sequence((
            2u8.encode(),
            encode::sequence(
                "unsupported algorithm"
                    .as_bytes()
                    .encode_as(Tag::UTF8_STRING),
            ),
            BitString::encode_slice([0x80u8], 0),
        )))
        .to_captured(Mode::Der)
        .into_bytes()
        .to_vec()
    }
}

impl Default for TestTimeStampAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeStampProvider for TestTimeStampAuthority {
    fn send_time_stamp_request(
        &self,
        digest: &[u8],
        alg: DigestAlgorithm,
        _user_agent: &str,
    ) -> Option<Result<Vec<u8>, TimeStampError>> {
        Some(Ok(self.issue(alg, digest)))
    }
}

fn name(common_name: &str) -> Captured {
    encode::sequence(encode::set(encode::sequence((
        OID_COMMON_NAME.encode(),
        common_name.as_bytes().encode_as(Tag::UTF8_STRING),
    ))))
    .to_captured(Mode::Der)
}

fn key_id(key: &VerifyingKey) -> Vec<u8> {
    DigestAlgorithm::Sha1.digest(key.as_bytes())
}

fn build_certificate(
    serial: u64,
    issuer: &str,
    subject: &str,
    subject_key: &VerifyingKey,
    issuer_key: &SigningKey,
) -> Captured {
    let subject_key_id = key_id(subject_key);

    let tbs = encode::sequence((
        encode::sequence_as(Tag::CTX_0, 2u8.encode()),
        serial.encode(),
        encode::sequence(OID_ED25519.encode()),
        name(issuer),
        encode::sequence((
            NOT_BEFORE.as_bytes().encode_as(Tag::UTC_TIME),
            NOT_AFTER.as_bytes().encode_as(Tag::UTC_TIME),
        )),
        name(subject),
        encode::sequence((
            encode::sequence(OID_ED25519.encode()),
            BitString::encode_slice(subject_key.as_bytes(), 0),
        )),
        encode::sequence_as(
            Tag::CTX_3,
            encode::sequence(encode::sequence((
                OID_SUBJECT_KEY_ID.encode(),
                OctetString::encode_wrapped(
                    Mode::Der,
                    OctetString::encode_slice(subject_key_id.as_slice()),
                ),
            ))),
        ),
    ))
    .to_captured(Mode::Der);

    let signature = issuer_key.sign(tbs.as_slice()).to_bytes();

    encode::sequence((
        tbs,
        encode::sequence(OID_ED25519.encode()),
        BitString::encode_slice(signature, 0),
    ))
    .to_captured(Mode::Der)
}
