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
    collections::HashMap,
    fmt,
    fs::File,
    io::{self, BufReader, Cursor, Read, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use asic_crypto::hash::{hash_stream_by_alg, DigestAlgorithm};
use log::debug;
use tempfile::NamedTempFile;

use crate::{Context, Error, Result};

/// Media type used when a data file's type is unknown.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

enum Source {
    Memory(Vec<u8>),
    Path(PathBuf),
    Temp(NamedTempFile),
}

/// A document held by a [`Container`](crate::Container).
///
/// Content is read on demand, so large files opened from disk or spilled to
/// a temporary file are never loaded into memory at once. Digests are
/// cached per algorithm.
pub struct DataFile {
    name: String,
    media_type: String,
    size: u64,
    source: Source,
    digests: Mutex<HashMap<DigestAlgorithm, Vec<u8>>>,
}

impl DataFile {
    /// Refers to a file on disk. The data file takes the file's name.
    pub(crate) fn from_path(path: &Path, media_type: &str) -> Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|err| {
            Error::ContainerState(format!("cannot read {}: {err}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(Error::ContainerState(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| Error::BadParam(format!("no file name in {}", path.display())))?;

        Ok(Self::new(
            name,
            media_type,
            metadata.len(),
            Source::Path(path.to_path_buf()),
        ))
    }

    pub(crate) fn from_bytes(name: &str, media_type: &str, data: Vec<u8>) -> Self {
        Self::new(
            name.to_string(),
            media_type,
            data.len() as u64,
            Source::Memory(data),
        )
    }

    /// Reads a stream to its end. Content beyond the configured memory
    /// threshold goes to a temporary file.
    pub(crate) fn from_stream<R: Read + ?Sized>(
        reader: &mut R,
        name: &str,
        media_type: &str,
        ctx: &Context,
    ) -> Result<Self> {
        let threshold = ctx.settings().core.memory_threshold();

        let mut head = Vec::new();
        (&mut *reader)
            .take(threshold.saturating_add(1))
            .read_to_end(&mut head)?;

        if head.len() as u64 <= threshold {
            return Ok(Self::from_bytes(name, media_type, head));
        }

        let mut temp = tempfile::Builder::new()
            .prefix("asic-data-")
            .tempfile_in(ctx.temp_dir()?)?;
        temp.write_all(&head)?;
        let size = head.len() as u64 + io::copy(reader, &mut temp)?;
        temp.flush()?;

        debug!("{name}: {size} bytes stored in {}", temp.path().display());

        Ok(Self::new(
            name.to_string(),
            media_type,
            size,
            Source::Temp(temp),
        ))
    }

    fn new(name: String, media_type: &str, size: u64, source: Source) -> Self {
        Self {
            name,
            media_type: media_type.to_string(),
            size,
            source,
            digests: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the name of this file inside the container.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the media type, such as `"text/plain"`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub(crate) fn set_media_type(&mut self, media_type: &str) {
        self.media_type = media_type.to_string();
    }

    /// Returns the content length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if the content is held in memory.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.source, Source::Memory(_))
    }

    /// Opens the content for reading.
    pub fn reader(&self) -> Result<Box<dyn Read + '_>> {
        Ok(match &self.source {
            Source::Memory(data) => Box::new(Cursor::new(data.as_slice())),
            Source::Path(path) => Box::new(BufReader::new(File::open(path)?)),
            Source::Temp(temp) => Box::new(BufReader::new(temp.reopen()?)),
        })
    }

    /// Reads the whole content.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.size as usize);
        self.reader()?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Writes the content to `path`.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        io::copy(&mut self.reader()?, &mut file)?;
        Ok(())
    }

    /// Returns the digest of the content, computing it on first use.
    pub fn calc_digest(&self, alg: DigestAlgorithm) -> Result<Vec<u8>> {
        let mut digests = self.digests.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(digest) = digests.get(&alg) {
            return Ok(digest.clone());
        }

        let digest = hash_stream_by_alg(alg, &mut self.reader()?)?;
        digests.insert(alg, digest.clone());
        Ok(digest)
    }
}

impl fmt::Debug for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .field("in_memory", &self.is_in_memory())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_memory_file() {
        let file = DataFile::from_bytes("a.txt", "text/plain", b"hello".to_vec());
        assert_eq!(file.name(), "a.txt");
        assert_eq!(file.media_type(), "text/plain");
        assert_eq!(file.size(), 5);
        assert_eq!(file.bytes().unwrap(), b"hello");
        assert!(file.is_in_memory());
    }

    #[test]
    fn test_digest_is_cached() {
        let file = DataFile::from_bytes("a.txt", "text/plain", b"hello".to_vec());

        let first = file.calc_digest(DigestAlgorithm::Sha256).unwrap();
        assert_eq!(first, DigestAlgorithm::Sha256.digest(b"hello"));
        assert_eq!(file.calc_digest(DigestAlgorithm::Sha256).unwrap(), first);
        assert_eq!(file.digests.lock().unwrap().len(), 1);

        assert_eq!(
            file.calc_digest(DigestAlgorithm::Sha1).unwrap(),
            DigestAlgorithm::Sha1.digest(b"hello")
        );
    }

    #[test]
    fn test_path_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, b"on disk").unwrap();

        let file = DataFile::from_path(&path, "text/plain").unwrap();
        assert_eq!(file.name(), "doc.txt");
        assert_eq!(file.size(), 7);
        assert!(!file.is_in_memory());
        assert_eq!(file.bytes().unwrap(), b"on disk");

        match DataFile::from_path(&dir.path().join("missing.txt"), "text/plain") {
            Err(Error::ContainerState(msg)) => assert!(msg.contains("missing.txt")),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            DataFile::from_path(dir.path(), "text/plain"),
            Err(Error::ContainerState(_))
        ));
    }

    #[test]
    fn test_stream_spills_to_temp_file() {
        let ctx = Context::new("test")
            .with_settings(r#"{"core": {"backing_store_memory_threshold_in_mb": 0}}"#)
            .unwrap();

        let data = vec![0x5a; 4096];
        let file =
            DataFile::from_stream(&mut Cursor::new(&data), "big.bin", DEFAULT_MEDIA_TYPE, &ctx)
                .unwrap();

        assert!(!file.is_in_memory());
        assert_eq!(file.size(), 4096);
        assert_eq!(file.bytes().unwrap(), data);

        let dir = tempfile::tempdir().unwrap();
        let copy = dir.path().join("copy.bin");
        file.save_as(&copy).unwrap();
        assert_eq!(std::fs::read(copy).unwrap(), data);
    }

    #[test]
    fn test_small_stream_stays_in_memory() {
        let ctx = Context::new("test");
        let file = DataFile::from_stream(
            &mut Cursor::new(b"small"),
            "small.txt",
            "text/plain",
            &ctx,
        )
        .unwrap();
        assert!(file.is_in_memory());
        assert_eq!(file.bytes().unwrap(), b"small");
    }
}
