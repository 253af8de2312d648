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

//! ZIP storage shared by the ASiC formats.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use log::debug;
use tempfile::NamedTempFile;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    data_file::{DataFile, DEFAULT_MEDIA_TYPE},
    Context, Error, Result,
};

pub(crate) const MIMETYPE: &str = "mimetype";
pub(crate) const META_INF: &str = "META-INF/";

/// A file stored under `META-INF/`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageEntry {
    /// Full path inside the archive.
    pub name: String,

    /// Entry content.
    pub data: Vec<u8>,
}

impl PackageEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// The contents of an ASiC archive as read from disk.
///
/// Formats take the entries they understand (signatures, manifests) out of
/// the package while opening; the rest is preserved when the container is
/// saved.
#[derive(Debug, Default)]
pub struct Package {
    mimetype: Option<String>,
    data_files: Vec<DataFile>,
    entries: Vec<PackageEntry>,
}

impl Package {
    /// Reads an archive. Data file content may spill to temporary files.
    pub(crate) fn read(path: &Path, ctx: &Context) -> Result<Self> {
        let file =
            File::open(path).map_err(|_| Error::FileNotFound(path.display().to_string()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let mut package = Package::default();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            if name == MIMETYPE {
                let mut mimetype = String::new();
                entry.read_to_string(&mut mimetype)?;
                package.mimetype = Some(mimetype.trim().to_string());
            } else if name.starts_with(META_INF) {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                package.entries.push(PackageEntry::new(name, data));
            } else {
                let data_file = DataFile::from_stream(&mut entry, &name, DEFAULT_MEDIA_TYPE, ctx)?;
                package.data_files.push(data_file);
            }
        }

        debug!(
            "read {}: {} data file(s), {} META-INF entries",
            path.display(),
            package.data_files.len(),
            package.entries.len()
        );

        Ok(package)
    }

    /// Writes an archive atomically: content goes to a temporary file next
    /// to `path` which then replaces it.
    pub(crate) fn write(
        path: &Path,
        media_type: &str,
        data_files: &[DataFile],
        entries: &[PackageEntry],
    ) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)?;

        let mut writer = ZipWriter::new(BufWriter::new(temp));

        // mimetype must be first and uncompressed so it can be sniffed
        writer.start_file(
            MIMETYPE,
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )?;
        writer.write_all(media_type.as_bytes())?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for data_file in data_files {
            writer.start_file(data_file.name(), options)?;
            std::io::copy(&mut data_file.reader()?, &mut writer)?;
        }

        for entry in entries {
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }

        let temp = writer
            .finish()?
            .into_inner()
            .map_err(|e| Error::IoError(e.into_error()))?;
        temp.persist(path).map_err(|e| Error::IoError(e.error))?;

        debug!("wrote {}", path.display());
        Ok(())
    }

    /// Returns the content of the `mimetype` entry.
    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    /// Returns the data files found in the archive.
    pub fn data_files(&self) -> &[DataFile] {
        &self.data_files
    }

    /// Sets the media type of a data file, as declared by a manifest.
    pub fn set_media_type(&mut self, name: &str, media_type: &str) {
        if let Some(data_file) = self.data_files.iter_mut().find(|f| f.name() == name) {
            data_file.set_media_type(media_type);
        }
    }

    /// Returns the names of the remaining `META-INF/` entries.
    pub fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Removes an entry so it is not preserved as-is.
    pub fn take_entry(&mut self, name: &str) -> Option<PackageEntry> {
        let index = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(index))
    }

    pub(crate) fn into_parts(self) -> (Vec<DataFile>, Vec<PackageEntry>) {
        (self.data_files, self.entries)
    }
}

/// Returns the final path segment of an archive entry name.
pub(crate) fn entry_file_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
