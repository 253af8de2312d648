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

#![allow(dead_code)]

use std::{fs::File, io::Write, path::Path};

use asic::{crypto::test_utils::TestTimeStampAuthority, Context, TimeStampSigner};
use serde_json::{json, Value};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const ASIC_S: &str = "application/vnd.etsi.asic-s+zip";
pub const ASIC_E: &str = "application/vnd.etsi.asic-e+zip";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Context trusting the test time stamp authority, with `settings` merged
/// in.
pub fn trusted_context(mut settings: Value) -> Context {
    settings["trust"]["trust_anchors"] = json!(TestTimeStampAuthority::new().trust_anchor_pem());
    context(settings)
}

pub fn context(settings: Value) -> Context {
    init_logging();

    Context::new("asic-tests")
        .with_settings(settings)
        .unwrap()
        .initialize(None)
        .unwrap()
}

/// Signer backed by the test time stamp authority.
pub fn signer() -> TimeStampSigner {
    TimeStampSigner::new().with_provider(TestTimeStampAuthority::new())
}

/// Writes an archive with a `mimetype` entry followed by `entries`.
pub fn write_package(path: &Path, mimetype: &str, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());

    zip.start_file(
        "mimetype",
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
    )
    .unwrap();
    zip.write_all(mimetype.as_bytes()).unwrap();

    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap();
}
