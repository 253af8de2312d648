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

use std::io::Cursor;

use crate::hash::{
    digest, hash_stream_by_alg, is_weak_digest, DigestAlgorithm, DigestError, Hasher, URI_SHA1,
    URI_SHA224, URI_SHA256, URI_SHA384, URI_SHA512,
};

#[test]
fn sha1() {
    let hash = DigestAlgorithm::Sha1.digest(b"test message");
    assert_eq!(
        hash,
        [
            53, 238, 131, 134, 65, 13, 65, 209, 75, 63, 119, 159, 201, 95, 70, 149, 244, 133, 22,
            130
        ]
    );
}

#[test]
fn sha256_by_uri() {
    let hash = digest(URI_SHA256, b"abc").unwrap();
    assert_eq!(
        hex::encode(hash),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn output_lengths() {
    for (uri, len) in [
        (URI_SHA1, 20),
        (URI_SHA224, 28),
        (URI_SHA256, 32),
        (URI_SHA384, 48),
        (URI_SHA512, 64),
    ] {
        let alg = DigestAlgorithm::from_uri(uri).unwrap();
        assert_eq!(alg.output_len(), len);
        assert_eq!(digest(uri, b"").unwrap().len(), len);
    }
}

#[test]
fn unknown_algorithm() {
    let err = digest("http://example.com/md5", b"abc").unwrap_err();
    assert!(matches!(err, DigestError::UnsupportedAlgorithm(ref id) if id == "http://example.com/md5"));
}

#[test]
fn parse_identifiers() {
    assert_eq!("SHA-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
    assert_eq!("sha384".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha384);
    assert_eq!(
        "2.16.840.1.101.3.4.2.3".parse::<DigestAlgorithm>().unwrap(),
        DigestAlgorithm::Sha512
    );
    assert_eq!(URI_SHA1.parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
    assert!("md5".parse::<DigestAlgorithm>().is_err());
}

#[test]
fn oids_round_trip() {
    for alg in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Sha512] {
        assert_eq!(DigestAlgorithm::from_oid(alg.oid()), Some(alg));
    }
    assert_eq!(DigestAlgorithm::from_oid(&[1, 2, 3]), None);
}

#[test]
fn weak_digests() {
    assert!(is_weak_digest(URI_SHA1));
    assert!(is_weak_digest(URI_SHA224));
    assert!(!is_weak_digest(URI_SHA256));
    assert!(!is_weak_digest(URI_SHA512));
    assert!(!is_weak_digest("urn:unknown"));
}

#[test]
fn stream_matches_slice() {
    // Larger than one read buffer.
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let streamed = hash_stream_by_alg(DigestAlgorithm::Sha384, &mut Cursor::new(&data)).unwrap();
    assert_eq!(streamed, DigestAlgorithm::Sha384.digest(&data));

    let mut hasher = Hasher::new(DigestAlgorithm::Sha384);
    for chunk in data.chunks(7777) {
        hasher.update(chunk);
    }
    assert_eq!(hasher.finalize(), streamed);
}

#[test]
fn string_conversions() {
    let alg = DigestAlgorithm::try_from("sha-512".to_string()).unwrap();
    assert_eq!(alg, DigestAlgorithm::Sha512);
    assert_eq!(String::from(alg), URI_SHA512);
    assert_eq!(alg.to_string(), URI_SHA512);

    assert!(DigestAlgorithm::try_from("whirlpool".to_string()).is_err());
}
