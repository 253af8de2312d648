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

use std::{
    collections::HashSet,
    fmt,
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};

use asic_crypto::hash::DigestAlgorithm;
use log::{debug, info};

use crate::{
    data_file::DataFile,
    formats::ContainerFormat,
    package::{Package, PackageEntry, META_INF, MIMETYPE},
    signature::{self, Signature},
    validation_results::SignatureValidation,
    Context, Error, Result, Signer,
};

/// A signed document container.
///
/// A container owns its data files and signatures. Once it holds a
/// signature its data files can no longer be added or removed.
///
/// # Example
///
/// ```no_run
/// # fn main() -> asic::Result<()> {
/// let ctx = asic::initialize("my-app", None, None)?;
///
/// let container = asic::Container::open("signed.asics", &ctx)?;
/// for result in container.validate(&ctx) {
///     println!("{}: {:?}", result.signature_id(), result.verdict());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Container {
    path: Option<PathBuf>,
    format: Arc<dyn ContainerFormat>,
    data_files: Vec<DataFile>,
    signatures: Vec<Signature>,
    entries: Vec<PackageEntry>,
}

impl Container {
    /// Creates an empty container that will be stored at `path`.
    ///
    /// The format is chosen from the file extension. Nothing is written
    /// until [`Container::save`] is called.
    pub fn create<P: AsRef<Path>>(path: P, ctx: &Context) -> Result<Self> {
        let path = path.as_ref();
        let format = ctx.formats().for_new(path);

        debug!("creating {} container {}", format.name(), path.display());

        Ok(Self {
            path: Some(path.to_path_buf()),
            format,
            data_files: Vec::new(),
            signatures: Vec::new(),
            entries: Vec::new(),
        })
    }

    /// Opens an existing container and reads its signatures.
    pub fn open<P: AsRef<Path>>(path: P, ctx: &Context) -> Result<Self> {
        let path = path.as_ref();
        let mut package = Package::read(path, ctx)?;

        let format = ctx.formats().for_package(path, &package);
        let signatures = format.read_signatures(&mut package, ctx)?;
        let (data_files, entries) = package.into_parts();

        if let Some(max) = format.max_data_files() {
            if data_files.len() > max {
                return Err(Error::ParseError(format!(
                    "{} container holds {} data files, at most {max} allowed",
                    format.name(),
                    data_files.len()
                )));
            }
        }

        info!(
            "opened {} container {}: {} data file(s), {} signature(s)",
            format.name(),
            path.display(),
            data_files.len(),
            signatures.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            format,
            data_files,
            signatures,
            entries,
        })
    }

    /// Returns the path this container is stored at.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the name of the container format, such as `"ASiC-S"`.
    pub fn format_name(&self) -> &str {
        self.format.name()
    }

    /// Returns the media type written to the `mimetype` entry.
    pub fn media_type(&self) -> &str {
        self.format.media_type()
    }

    pub fn data_files(&self) -> &[DataFile] {
        &self.data_files
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Adds a file from disk. The data file takes the file's name.
    ///
    /// Fails with [`Error::ContainerState`] if the container is signed,
    /// already holds a file with that name, or `path` cannot be read.
    pub fn add_data_file<P: AsRef<Path>>(&mut self, path: P, media_type: &str) -> Result<()> {
        self.ensure_unsigned()?;
        let data_file = DataFile::from_path(path.as_ref(), media_type)?;
        self.push_data_file(data_file)
    }

    /// Adds a file read from `reader`.
    ///
    /// A read error fails with [`Error::ContainerState`].
    pub fn add_data_file_from_stream<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        name: &str,
        media_type: &str,
        ctx: &Context,
    ) -> Result<()> {
        self.ensure_unsigned()?;
        check_data_file_name(name)?;
        self.ensure_new_name(name)?;

        let data_file =
            DataFile::from_stream(reader, name, media_type, ctx).map_err(|err| match err {
                Error::IoError(err) => {
                    Error::ContainerState(format!("cannot read data for {name}: {err}"))
                }
                err => err,
            })?;
        self.push_data_file(data_file)
    }

    /// Adds a file held in memory.
    pub fn add_data_file_from_bytes(
        &mut self,
        name: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> Result<()> {
        self.ensure_unsigned()?;
        self.push_data_file(DataFile::from_bytes(name, media_type, data))
    }

    pub fn remove_data_file(&mut self, index: usize) -> Result<()> {
        self.ensure_unsigned()?;
        if index >= self.data_files.len() {
            return Err(Error::BadParam(format!("no data file at index {index}")));
        }

        let removed = self.data_files.remove(index);
        debug!("removed data file {}", removed.name());
        Ok(())
    }

    /// Adds a stored signature: a DER time stamp token or an XAdES
    /// document understood by the registered signature parser.
    pub fn add_ades_signature(&mut self, data: &[u8], ctx: &Context) -> Result<()> {
        self.ensure_can_add_signature()?;

        let signature = signature::parse_signature(data, ctx)?;
        debug!("added {} signature {}", signature.profile(), signature.id());
        self.signatures.push(signature);
        Ok(())
    }

    pub fn add_ades_signature_from_stream<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        ctx: &Context,
    ) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.add_ades_signature(&data, ctx)
    }

    /// Creates a new signature with `signer` and appends it.
    ///
    /// Time stamp signatures are complete when this returns. XAdES
    /// signatures still need their signature value, see
    /// [`Container::sign`].
    pub fn prepare_signature(
        &mut self,
        signer: &dyn Signer,
        ctx: &Context,
    ) -> Result<&mut Signature> {
        self.ensure_can_add_signature()?;

        let signature = self.format.new_signature(self, signer, ctx)?;
        self.signatures.push(signature);

        self.signatures
            .last_mut()
            .ok_or_else(|| Error::ContainerState("signature was not added".into()))
    }

    /// Creates and completes a new signature with `signer`.
    ///
    /// If the signature value cannot be set the new signature is removed
    /// again.
    pub fn sign(&mut self, signer: &dyn Signer, ctx: &Context) -> Result<&Signature> {
        let completed = match self.prepare_signature(signer, ctx)? {
            Signature::Advanced(sig) => sig
                .data_to_sign()
                .and_then(|data| signer.signature_value(&data))
                .and_then(|value| sig.set_signature_value(&value)),
            Signature::TimeStamp(_) => Ok(()),
        };

        if let Err(err) = completed {
            self.signatures.pop();
            return Err(err);
        }

        let signature = self
            .signatures
            .last()
            .ok_or_else(|| Error::ContainerState("signature was not added".into()))?;
        info!("signed with {} signature {}", signature.profile(), signature.id());
        Ok(signature)
    }

    pub fn remove_signature(&mut self, index: usize) -> Result<()> {
        if index >= self.signatures.len() {
            return Err(Error::BadParam(format!("no signature at index {index}")));
        }

        let removed = self.signatures.remove(index);
        debug!("removed signature {}", removed.id());
        Ok(())
    }

    /// Returns the smallest `n` such that no signature has the id `"S<n>"`.
    pub fn new_signature_id(&self) -> u32 {
        let ids: HashSet<String> = self.signatures.iter().map(Signature::id).collect();
        (0..u32::MAX)
            .find(|n| !ids.contains(&format!("S{n}")))
            .unwrap_or(u32::MAX)
    }

    /// Writes the container back to its path.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::BadParam("container has no path".into()))?;
        self.write(path)
    }

    /// Writes the container to `path`, which becomes its new location.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn write(&self, path: &Path) -> Result<()> {
        if self.data_files.is_empty() {
            return Err(Error::ContainerState("container has no data files".into()));
        }

        let generated = self.format.write_signatures(self)?;

        let mut entries: Vec<PackageEntry> = self
            .entries
            .iter()
            .filter(|entry| !generated.iter().any(|g| g.name == entry.name))
            .cloned()
            .collect();
        entries.extend(generated);

        Package::write(path, self.media_type(), &self.data_files, &entries)?;

        info!("saved {} container {}", self.format_name(), path.display());
        Ok(())
    }

    pub(crate) fn preserved_entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Validates every signature.
    ///
    /// Validation does not modify the container, so several threads may
    /// validate the same container at once.
    pub fn validate(&self, ctx: &Context) -> Vec<SignatureValidation> {
        self.signatures
            .iter()
            .map(|signature| signature.validate(self, ctx))
            .collect()
    }

    /// Computes the digest of a file stored in the container.
    ///
    /// `name` may be a data file, a preserved `META-INF/` entry or a
    /// stored signature document such as a time stamp token.
    pub fn file_digest(&self, name: &str, alg: DigestAlgorithm) -> Result<Vec<u8>> {
        if let Some(data_file) = self.data_files.iter().find(|f| f.name() == name) {
            return data_file.calc_digest(alg);
        }

        if let Some(entry) = self.entries.iter().find(|e| e.name == name) {
            return Ok(alg.digest(&entry.data));
        }

        self.signatures
            .iter()
            .find_map(|signature| signature.document(name))
            .map(|data| alg.digest(data))
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    fn ensure_unsigned(&self) -> Result<()> {
        if self.signatures.is_empty() {
            Ok(())
        } else {
            Err(Error::ContainerState(
                "data files cannot change while the container is signed".into(),
            ))
        }
    }

    fn ensure_new_name(&self, name: &str) -> Result<()> {
        if self.data_files.iter().any(|f| f.name() == name) {
            return Err(Error::ContainerState(format!(
                "data file {name} already exists"
            )));
        }
        Ok(())
    }

    fn push_data_file(&mut self, data_file: DataFile) -> Result<()> {
        check_data_file_name(data_file.name())?;
        self.ensure_new_name(data_file.name())?;

        if let Some(max) = self.format.max_data_files() {
            if self.data_files.len() >= max {
                return Err(Error::ContainerState(format!(
                    "{} containers hold at most {max} data file(s)",
                    self.format.name()
                )));
            }
        }

        debug!("added data file {}", data_file.name());
        self.data_files.push(data_file);
        Ok(())
    }

    fn ensure_can_add_signature(&self) -> Result<()> {
        if self.data_files.is_empty() {
            return Err(Error::ContainerState(
                "cannot sign a container without data files".into(),
            ));
        }

        if let Some(max) = self.format.max_signatures() {
            if self.signatures.len() >= max {
                return Err(Error::ContainerState(format!(
                    "{} containers hold at most {max} signature(s)",
                    self.format.name()
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("format", &self.format.name())
            .field("data_files", &self.data_files)
            .field("signatures", &self.signatures)
            .finish()
    }
}

fn check_data_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.ends_with('/')
        || name.split(['/', '\\']).any(|segment| segment == "..")
        || name.starts_with(META_INF)
        || name == MIMETYPE;

    if invalid {
        Err(Error::BadParam(format!("invalid data file name {name:?}")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use asic_crypto::certificate::Certificate;
    use asic_status_tracker::StatusTracker;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{formats::AsicE, AdvancedSignature};

    struct MockSignature {
        id: String,
    }

    impl AdvancedSignature for MockSignature {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn claimed_signing_time(&self) -> Option<DateTime<Utc>> {
            None
        }

        fn trusted_signing_time(&self) -> Option<DateTime<Utc>> {
            None
        }

        fn signing_certificate(&self) -> Option<Certificate> {
            None
        }

        fn signature_method(&self) -> String {
            "http://www.w3.org/2001/04/xmlenc#sha256".into()
        }

        fn profile(&self) -> String {
            "BES".into()
        }

        fn data_to_sign(&self) -> Result<Vec<u8>> {
            Ok(b"signed info".to_vec())
        }

        fn set_signature_value(&mut self, _value: &[u8]) -> Result<()> {
            Ok(())
        }

        fn validate(&self, _container: &Container, _ctx: &Context) -> SignatureValidation {
            SignatureValidation::from_tracker(self.id.clone(), StatusTracker::default())
        }

        fn save(&self) -> Result<Vec<u8>> {
            Ok(format!("<signature id=\"{}\"/>", self.id).into_bytes())
        }
    }

    fn container() -> Container {
        Container {
            path: None,
            format: Arc::new(AsicE),
            data_files: Vec::new(),
            signatures: Vec::new(),
            entries: Vec::new(),
        }
    }

    fn mock(id: &str) -> Signature {
        Signature::Advanced(Box::new(MockSignature { id: id.into() }))
    }

    #[test]
    fn test_new_signature_id() {
        let mut container = container();
        assert_eq!(container.new_signature_id(), 0);

        container.signatures.push(mock("S0"));
        container.signatures.push(mock("S2"));
        assert_eq!(container.new_signature_id(), 1);

        container.signatures.push(mock("S1"));
        assert_eq!(container.new_signature_id(), 3);

        container.signatures.push(mock("id-S4"));
        assert_eq!(container.new_signature_id(), 3);
    }

    #[test]
    fn test_data_files_locked_once_signed() {
        let mut container = container();
        container
            .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
            .unwrap();
        container.signatures.push(mock("S0"));

        assert!(matches!(
            container.add_data_file_from_bytes("b.txt", "text/plain", b"b".to_vec()),
            Err(Error::ContainerState(_))
        ));
        assert!(matches!(
            container.remove_data_file(0),
            Err(Error::ContainerState(_))
        ));

        container.remove_signature(0).unwrap();
        container.remove_data_file(0).unwrap();
        assert!(container.data_files().is_empty());
    }

    #[test]
    fn test_signature_needs_data_files() {
        let ctx = Context::default();
        let mut container = container();

        assert!(matches!(
            container.add_ades_signature(b"<signature/>", &ctx),
            Err(Error::ContainerState(_))
        ));
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let mut container = container();
        container
            .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
            .unwrap();

        assert!(matches!(
            container.add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec()),
            Err(Error::ContainerState(_))
        ));

        for name in ["", "/abs", "dir/", "../up", "a/../b", "META-INF/x", "mimetype"] {
            assert!(
                matches!(
                    container.add_data_file_from_bytes(name, "text/plain", Vec::new()),
                    Err(Error::BadParam(_))
                ),
                "{name:?} accepted"
            );
        }

        assert!(matches!(container.remove_data_file(5), Err(Error::BadParam(_))));
        assert!(matches!(container.remove_signature(0), Err(Error::BadParam(_))));
    }

    #[test]
    fn test_unreadable_source() {
        struct BrokenReader;

        impl Read for BrokenReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("device gone"))
            }
        }

        let ctx = Context::default();
        let dir = tempfile::tempdir().unwrap();
        let mut container = container();

        match container.add_data_file(dir.path().join("missing.txt"), "text/plain") {
            Err(Error::ContainerState(msg)) => assert!(msg.contains("missing.txt")),
            other => panic!("unexpected result {other:?}"),
        }

        match container.add_data_file_from_stream(&mut BrokenReader, "b.txt", "text/plain", &ctx)
        {
            Err(Error::ContainerState(msg)) => assert!(msg.contains("device gone")),
            other => panic!("unexpected result {other:?}"),
        }

        assert!(container.data_files().is_empty());
    }

    #[test]
    fn test_file_digest() {
        let mut container = container();
        container
            .add_data_file_from_bytes("a.txt", "text/plain", b"hello".to_vec())
            .unwrap();
        container
            .entries
            .push(PackageEntry::new("META-INF/extra.xml", b"<x/>".to_vec()));

        let alg = DigestAlgorithm::Sha256;
        assert_eq!(
            container.file_digest("a.txt", alg).unwrap(),
            alg.digest(b"hello")
        );
        assert_eq!(
            container.file_digest("META-INF/extra.xml", alg).unwrap(),
            alg.digest(b"<x/>")
        );
        assert!(matches!(
            container.file_digest("missing.txt", alg),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_sign_completes_advanced_signature() {
        struct MockSigner;

        impl Signer for MockSigner {
            fn sign_advanced(
                &self,
                signature_id: &str,
                _container: &Container,
                _ctx: &Context,
            ) -> Result<Box<dyn AdvancedSignature>> {
                Ok(Box::new(MockSignature {
                    id: signature_id.into(),
                }))
            }

            fn signature_value(&self, data_to_sign: &[u8]) -> Result<Vec<u8>> {
                Ok(data_to_sign.to_vec())
            }
        }

        let ctx = Context::default();
        let mut container = container();
        container
            .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
            .unwrap();

        assert_eq!(container.sign(&MockSigner, &ctx).unwrap().id(), "S0");
        assert_eq!(container.sign(&MockSigner, &ctx).unwrap().id(), "S1");
        assert_eq!(container.signatures().len(), 2);
    }

    #[test]
    fn test_failed_sign_removes_signature() {
        struct NoValueSigner;

        impl Signer for NoValueSigner {
            fn sign_advanced(
                &self,
                signature_id: &str,
                _container: &Container,
                _ctx: &Context,
            ) -> Result<Box<dyn AdvancedSignature>> {
                Ok(Box::new(MockSignature {
                    id: signature_id.into(),
                }))
            }
        }

        let ctx = Context::default();
        let mut container = container();
        container
            .add_data_file_from_bytes("a.txt", "text/plain", b"a".to_vec())
            .unwrap();

        assert!(matches!(
            container.sign(&NoValueSigner, &ctx),
            Err(Error::NotImplemented(_))
        ));
        assert!(container.signatures().is_empty());
    }
}
