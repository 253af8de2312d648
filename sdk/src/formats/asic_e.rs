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

use std::{collections::HashSet, path::Path};

use log::debug;
use quick_xml::{escape::escape, events::Event, Reader};

use super::{has_extension, is_signature_document, read_advanced_signature, ContainerFormat};
use crate::{
    manifest::attribute,
    package::{entry_file_name, Package, PackageEntry},
    signature_tst::TimestampSignature,
    Container, Context, Result, Signature, Signer,
};

const MEDIA_TYPE: &str = "application/vnd.etsi.asic-e+zip";
const EXTENSIONS: &[&str] = &["asice", "sce", "bdoc"];
const MANIFEST: &str = "META-INF/manifest.xml";
const MANIFEST_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";

/// Associated Signature Container Extended: any number of data files,
/// signed by XAdES signatures listed in an OpenDocument manifest.
///
/// XAdES itself is provided by an external engine registered with
/// [`Context::with_signature_parser`](crate::Context::with_signature_parser).
/// This is the fallback format when no other format claims a container.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsicE;

impl ContainerFormat for AsicE {
    fn name(&self) -> &str {
        "ASiC-E"
    }

    fn media_type(&self) -> &str {
        MEDIA_TYPE
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
        if let Some(manifest) = package.take_entry(MANIFEST) {
            for (full_path, media_type) in read_manifest(&manifest.data)? {
                package.set_media_type(&full_path, &media_type);
            }
        }

        let mut signatures = Vec::new();
        for name in package.entry_names() {
            let file_name = entry_file_name(&name);

            if is_signature_document(&name) {
                if let Some(entry) = package.take_entry(&name) {
                    signatures.push(read_advanced_signature(&name, &entry.data, ctx)?);
                }
            } else if file_name.starts_with("timestamp") && file_name.ends_with(".tst") {
                if let Some(entry) = package.take_entry(&name) {
                    signatures.push(TimestampSignature::from_storage(&name, entry.data).into());
                }
            }
        }

        debug!("{} signature(s) in ASiC-E container", signatures.len());
        Ok(signatures)
    }

    fn write_signatures(&self, container: &Container) -> Result<Vec<PackageEntry>> {
        let mut entries = vec![PackageEntry::new(
            MANIFEST,
            write_manifest(container).into_bytes(),
        )];

        // Stored tokens keep their names, fresh ones take the first free slot.
        let mut taken: HashSet<String> = container
            .preserved_entry_names()
            .chain(container.signatures().iter().filter_map(|signature| {
                signature.as_time_stamp().and_then(TimestampSignature::stored_name)
            }))
            .map(str::to_string)
            .collect();
        let mut next_token = 0;

        for (index, signature) in container.signatures().iter().enumerate() {
            match signature {
                Signature::Advanced(sig) => entries.push(PackageEntry::new(
                    format!("META-INF/signatures{index}.xml"),
                    sig.save()?,
                )),
                Signature::TimeStamp(tst) => {
                    let name = match tst.stored_name() {
                        Some(name) => name.to_string(),
                        None => loop {
                            let name = format!("META-INF/timestamp{next_token}.tst");
                            next_token += 1;
                            if taken.insert(name.clone()) {
                                break name;
                            }
                        },
                    };
                    entries.extend(tst.entries(&name));
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
        let signature_id = format!("S{}", container.new_signature_id());
        Ok(Signature::Advanced(signer.sign_advanced(
            &signature_id,
            container,
            ctx,
        )?))
    }
}

// (full-path, media-type) pairs for data files
fn read_manifest(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut files = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"file-entry" =>
            {
                let full_path = attribute(e, b"full-path")?;
                let media_type = attribute(e, b"media-type")?;
                if let (Some(full_path), Some(media_type)) = (full_path, media_type) {
                    if full_path != "/" {
                        files.push((full_path, media_type));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(files)
}

fn write_manifest(container: &Container) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\" ?>\n\
         <manifest:manifest xmlns:manifest=\"{MANIFEST_NS}\" manifest:version=\"1.2\">\n\
         <manifest:file-entry manifest:full-path=\"/\" manifest:media-type=\"{MEDIA_TYPE}\"/>\n"
    );

    for data_file in container.data_files() {
        xml.push_str(&format!(
            "<manifest:file-entry manifest:full-path=\"{}\" manifest:media-type=\"{}\"/>\n",
            escape(data_file.name()),
            escape(data_file.media_type())
        ));
    }

    xml.push_str("</manifest:manifest>\n");
    xml
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_written_manifest_reads_back() {
        let mut container = Container::create("bundle.asice", &Context::default()).unwrap();
        container
            .add_data_file_from_bytes("a & b.txt", "text/plain", b"a".to_vec())
            .unwrap();

        let xml = write_manifest(&container);
        assert!(xml.lines().all(|line| !line.starts_with(' ')));
        assert_eq!(
            read_manifest(xml.as_bytes()).unwrap(),
            vec![("a & b.txt".to_string(), "text/plain".to_string())]
        );
    }

    #[test]
    fn test_read_manifest() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
  <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.etsi.asic-e+zip"/>
  <manifest:file-entry manifest:full-path="a &amp; b.txt" manifest:media-type="text/plain"/>
  <manifest:file-entry manifest:full-path="c.pdf" manifest:media-type="application/pdf"></manifest:file-entry>
</manifest:manifest>"#;

        assert_eq!(
            read_manifest(xml.as_bytes()).unwrap(),
            vec![
                ("a & b.txt".to_string(), "text/plain".to_string()),
                ("c.pdf".to_string(), "application/pdf".to_string()),
            ]
        );
    }
}
