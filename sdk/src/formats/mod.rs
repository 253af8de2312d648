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

//! Container formats.
//!
//! A [`ContainerFormat`] decides which containers it handles and how
//! signatures are stored in them. Formats are registered on a
//! [`Context`](crate::Context) and probed in registration order; ASiC-E is
//! used when no registered format claims a container.

use std::{fmt, path::Path, sync::Arc};

use crate::{
    package::{Package, PackageEntry},
    Container, Context, Result, Signature, Signer,
};

mod asic_e;
pub use asic_e::AsicE;

mod asic_s;
pub use asic_s::AsicS;

/// A concrete container format.
pub trait ContainerFormat: Send + Sync {
    /// Short name, such as `"ASiC-S"`.
    fn name(&self) -> &str;

    /// Media type written to the `mimetype` entry.
    fn media_type(&self) -> &str;

    /// Maximum number of data files, if limited.
    fn max_data_files(&self) -> Option<usize> {
        None
    }

    /// Maximum number of signatures that can be added, if limited.
    fn max_signatures(&self) -> Option<usize> {
        None
    }

    /// Returns `true` if a new container at `path` should use this format.
    fn accepts_new(&self, path: &Path) -> bool;

    /// Returns `true` if the archive read from `path` is of this format.
    fn accepts_package(&self, path: &Path, package: &Package) -> bool;

    /// Takes the signatures (and any format metadata) out of `package`.
    ///
    /// Entries left in the package are preserved as-is on save.
    fn read_signatures(&self, package: &mut Package, ctx: &Context) -> Result<Vec<Signature>>;

    /// Encodes the signatures and format metadata of `container`.
    fn write_signatures(&self, container: &Container) -> Result<Vec<PackageEntry>>;

    /// Creates a new signature over the data files of `container`.
    fn new_signature(
        &self,
        container: &Container,
        signer: &dyn Signer,
        ctx: &Context,
    ) -> Result<Signature>;
}

/// Ordered list of registered container formats.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn ContainerFormat>>,
    default: Arc<dyn ContainerFormat>,
}

impl FormatRegistry {
    pub(crate) fn new() -> Self {
        Self {
            formats: Vec::new(),
            default: Arc::new(AsicE),
        }
    }

    pub(crate) fn register(&mut self, format: Arc<dyn ContainerFormat>) {
        self.formats.push(format);
    }

    pub(crate) fn clear(&mut self) {
        self.formats.clear();
    }

    /// Returns the registered formats in probe order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContainerFormat>> {
        self.formats.iter()
    }

    /// Returns the fallback format.
    pub fn default_format(&self) -> &Arc<dyn ContainerFormat> {
        &self.default
    }

    pub(crate) fn for_new(&self, path: &Path) -> Arc<dyn ContainerFormat> {
        let format = self
            .formats
            .iter()
            .find(|format| format.accepts_new(path))
            .unwrap_or(&self.default);
        Arc::clone(format)
    }

    pub(crate) fn for_package(&self, path: &Path, package: &Package) -> Arc<dyn ContainerFormat> {
        let format = self
            .formats
            .iter()
            .find(|format| format.accepts_package(path, package))
            .unwrap_or(&self.default);
        Arc::clone(format)
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field(
                "formats",
                &self.formats.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("default", &self.default.name())
            .finish()
    }
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

// XAdES documents are stored as META-INF/*signatures*.xml
pub(crate) fn is_signature_document(name: &str) -> bool {
    let file_name = crate::package::entry_file_name(name);
    file_name.contains("signatures") && file_name.ends_with(".xml")
}

/// Hands a stored XAdES document to the registered engine.
pub(crate) fn read_advanced_signature(
    name: &str,
    data: &[u8],
    ctx: &Context,
) -> Result<Signature> {
    let parser = ctx.signature_parser().ok_or_else(|| {
        crate::Error::NotImplemented(format!(
            "{name}: reading XAdES signatures requires a signature parser"
        ))
    })?;
    Ok(Signature::Advanced(parser.parse(data)?))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_registry_order_and_fallback() {
        let mut registry = FormatRegistry::new();
        assert_eq!(registry.for_new(Path::new("a.asics")).name(), "ASiC-E");

        registry.register(Arc::new(AsicS));
        assert_eq!(registry.for_new(Path::new("a.asics")).name(), "ASiC-S");
        assert_eq!(registry.for_new(Path::new("A.SCS")).name(), "ASiC-S");
        assert_eq!(registry.for_new(Path::new("a.bdoc")).name(), "ASiC-E");
        assert_eq!(registry.for_new(&PathBuf::from("noext")).name(), "ASiC-E");

        registry.clear();
        assert_eq!(registry.iter().count(), 0);
    }

    #[test]
    fn test_signature_document_names() {
        assert!(is_signature_document("META-INF/signatures0.xml"));
        assert!(is_signature_document("META-INF/signatures.xml"));
        assert!(!is_signature_document("META-INF/manifest.xml"));
        assert!(!is_signature_document("META-INF/ASiCArchiveManifest.xml"));
    }
}
