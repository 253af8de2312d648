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

use std::path::Path;

use log::debug;

use super::{has_extension, is_signature_document, read_advanced_signature, ContainerFormat};
use crate::{
    manifest::{uri_to_file_name, DigestManifest},
    package::{Package, PackageEntry},
    signature_tst::{TimestampSignature, DEFAULT_TOKEN_NAME},
    Container, Context, Error, Result, Signature, Signer,
};

const MEDIA_TYPE: &str = "application/vnd.etsi.asic-s+zip";
const EXTENSIONS: &[&str] = &["asics", "scs"];
const ARCHIVE_MANIFEST_PREFIX: &str = "META-INF/ASiCArchiveManifest";

/// Associated Signature Container Simple: one data file signed by a time
/// stamp token (or a single XAdES signature).
///
/// Renewed time stamps are stored as archive manifests: each
/// `META-INF/ASiCArchiveManifest*.xml` lists digests of the data file and
/// earlier tokens, and its `SigReference` names the token covering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsicS;

impl AsicS {
    fn read_archive_manifest(
        &self,
        package: &mut Package,
        manifest_name: &str,
    ) -> Result<TimestampSignature> {
        let manifest_entry = package
            .take_entry(manifest_name)
            .ok_or_else(|| Error::FileNotFound(manifest_name.to_string()))?;

        let manifest = DigestManifest::from_xml(&manifest_entry.data)?;
        let token_name = manifest
            .sig_reference
            .as_deref()
            .map(uri_to_file_name)
            .ok_or_else(|| Error::ParseError(format!("{manifest_name} has no SigReference")))?;

        let token = package.take_entry(&token_name).ok_or_else(|| {
            Error::ParseError(format!(
                "time stamp {token_name} referenced by {manifest_name} is missing"
            ))
        })?;

        debug!("{manifest_name}: covered by {token_name}");

        TimestampSignature::from_storage(&token_name, token.data)
            .with_manifest(manifest_name, manifest_entry.data)
    }
}

impl ContainerFormat for AsicS {
    fn name(&self) -> &str {
        "ASiC-S"
    }

    fn media_type(&self) -> &str {
        MEDIA_TYPE
    }

    fn max_data_files(&self) -> Option<usize> {
        Some(1)
    }

    fn max_signatures(&self) -> Option<usize> {
        Some(1)
    }

    fn accepts_new(&self, path: &Path) -> bool {
        has_extension(path, EXTENSIONS)
    }

    fn accepts_package(&self, path: &Path, package: &Package) -> bool {
        match package.mimetype() {
            Some(mimetype) => mimetype == MEDIA_TYPE,
            None => has_extension(path, EXTENSIONS),
        }
    }

    fn read_signatures(&self, package: &mut Package, ctx: &Context) -> Result<Vec<Signature>> {
        let mut signatures = Vec::new();

        if let Some(entry) = package.take_entry(DEFAULT_TOKEN_NAME) {
            signatures.push(TimestampSignature::from_storage(&entry.name, entry.data).into());
        }

        let mut manifest_names: Vec<String> = package
            .entry_names()
            .into_iter()
            .filter(|name| name.starts_with(ARCHIVE_MANIFEST_PREFIX) && name.ends_with(".xml"))
            .collect();
        manifest_names.sort();

        for manifest_name in manifest_names {
            signatures.push(self.read_archive_manifest(package, &manifest_name)?.into());
        }

        for name in package.entry_names() {
            if is_signature_document(&name) {
                if let Some(entry) = package.take_entry(&name) {
                    signatures.push(read_advanced_signature(&name, &entry.data, ctx)?);
                }
            }
        }

        Ok(signatures)
    }

    fn write_signatures(&self, container: &Container) -> Result<Vec<PackageEntry>> {
        let mut entries = Vec::new();

        for signature in container.signatures() {
            match signature {
                Signature::TimeStamp(tst) => entries.extend(tst.entries(DEFAULT_TOKEN_NAME)),
                Signature::Advanced(sig) => {
                    entries.push(PackageEntry::new("META-INF/signatures.xml", sig.save()?))
                }
            }
        }

        Ok(entries)
    }

    fn new_signature(
        &self,
        container: &Container,
        signer: &dyn Signer,
        ctx: &Context,
    ) -> Result<Signature> {
        Ok(TimestampSignature::create(container, signer, ctx)?.into())
    }
}
