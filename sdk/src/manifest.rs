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

//! ASiC digest manifests.
//!
//! An archive manifest (`META-INF/ASiCArchiveManifest*.xml`) lists the
//! expected digest of each file covered by a time stamp. The time stamp
//! itself covers the manifest, named by its `SigReference`.

use std::borrow::Cow;

use asic_crypto::{base64, hash::DigestAlgorithm};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quick_xml::{
    escape::escape,
    events::{BytesStart, Event},
    Reader,
};

use crate::{Error, Result};

const ASIC_NS: &str = "http://uri.etsi.org/02918/v1.2.1#";
const DSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
const TIMESTAMP_MIME_TYPE: &str = "application/vnd.etsi.timestamp-token";

// characters left as-is when a file name becomes a URI
const URI_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// One `DataObjectReference` entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DigestReference {
    /// Reference URI as stored in the manifest.
    pub uri: String,

    /// Digest algorithm URI.
    pub digest_method: String,

    /// Expected digest value.
    pub digest_value: Vec<u8>,

    /// Media type, if given.
    pub mime_type: Option<String>,
}

impl DigestReference {
    /// Returns the container file name this reference points to.
    pub fn file_name(&self) -> String {
        uri_to_file_name(&self.uri)
    }
}

/// A parsed archive manifest.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DigestManifest {
    /// URI of the time stamp covering this manifest.
    pub sig_reference: Option<String>,

    /// Digest references in document order.
    pub references: Vec<DigestReference>,
}

#[derive(Default)]
struct PartialReference {
    uri: String,
    mime_type: Option<String>,
    digest_method: Option<String>,
    digest_value: String,
}

impl DigestManifest {
    /// Parses manifest XML.
    ///
    /// Namespace prefixes are ignored; elements are matched by local name.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut manifest = DigestManifest::default();
        let mut current: Option<PartialReference> = None;
        let mut in_digest_value = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"DataObjectReference" => current = Some(start_reference(e)?),
                    b"DigestMethod" => set_digest_method(current.as_mut(), e)?,
                    b"DigestValue" => in_digest_value = current.is_some(),
                    b"SigReference" => manifest.sig_reference = attribute(e, b"URI")?,
                    _ => {}
                },
                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"DataObjectReference" => {
                        manifest.references.push(finish_reference(start_reference(e)?)?)
                    }
                    b"DigestMethod" => set_digest_method(current.as_mut(), e)?,
                    b"SigReference" => manifest.sig_reference = attribute(e, b"URI")?,
                    _ => {}
                },
                Event::Text(e) => {
                    if in_digest_value {
                        if let Some(reference) = current.as_mut() {
                            reference.digest_value.push_str(&e.unescape()?);
                        }
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"DigestValue" => in_digest_value = false,
                    b"DataObjectReference" => {
                        if let Some(reference) = current.take() {
                            manifest.references.push(finish_reference(reference)?);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(manifest)
    }

    /// Serializes this manifest as an `asic:ASiCManifest` document.
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<asic:ASiCManifest xmlns:asic="{ASIC_NS}" xmlns:ds="{DSIG_NS}">
"#
        );

        if let Some(sig_reference) = &self.sig_reference {
            xml.push_str(&format!(
                "<asic:SigReference URI=\"{}\" MimeType=\"{TIMESTAMP_MIME_TYPE}\"/>\n",
                escape(sig_reference.as_str())
            ));
        }

        for reference in &self.references {
            let mime_type = reference
                .mime_type
                .as_deref()
                .map(|mime_type| format!(" MimeType=\"{}\"", escape(mime_type)))
                .unwrap_or_default();

            xml.push_str(&format!(
                "<asic:DataObjectReference URI=\"{}\"{mime_type}>\n\
                 <ds:DigestMethod Algorithm=\"{}\"/>\n\
                 <ds:DigestValue>{}</ds:DigestValue>\n\
                 </asic:DataObjectReference>\n",
                escape(reference.uri.as_str()),
                escape(reference.digest_method.as_str()),
                base64::encode(&reference.digest_value),
            ));
        }

        xml.push_str("</asic:ASiCManifest>\n");
        xml
    }
}

fn start_reference(e: &BytesStart<'_>) -> Result<PartialReference> {
    let uri = attribute(e, b"URI")?
        .ok_or_else(|| Error::ParseError("DataObjectReference without URI".into()))?;

    Ok(PartialReference {
        uri,
        mime_type: attribute(e, b"MimeType")?,
        ..Default::default()
    })
}

fn set_digest_method(current: Option<&mut PartialReference>, e: &BytesStart<'_>) -> Result<()> {
    if let Some(reference) = current {
        reference.digest_method = attribute(e, b"Algorithm")?;
    }
    Ok(())
}

fn finish_reference(reference: PartialReference) -> Result<DigestReference> {
    let digest_method = reference.digest_method.ok_or_else(|| {
        Error::ParseError(format!("reference {} has no DigestMethod", reference.uri))
    })?;

    let digest_value = base64::decode_wrapped(&reference.digest_value).map_err(|e| {
        Error::ParseError(format!("reference {} has a bad DigestValue: {e}", reference.uri))
    })?;

    if digest_value.is_empty() {
        return Err(Error::ParseError(format!(
            "reference {} has no DigestValue",
            reference.uri
        )));
    }

    Ok(DigestReference {
        uri: reference.uri,
        digest_method,
        digest_value,
        mime_type: reference.mime_type,
    })
}

pub(crate) fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Maps a stored reference URI to a container file name by decoding
/// percent escapes.
pub fn uri_to_file_name(uri: &str) -> String {
    let uri = uri.strip_prefix("./").unwrap_or(uri);
    percent_decode_str(uri).decode_utf8_lossy().into_owned()
}

/// Maps a container file name to the URI stored in manifests.
pub fn file_name_to_uri(name: &str) -> Cow<'_, str> {
    utf8_percent_encode(name, URI_SET).into()
}

/// Builds a reference for content with the given algorithm.
pub fn reference_for(name: &str, alg: DigestAlgorithm, digest: Vec<u8>) -> DigestReference {
    DigestReference {
        uri: file_name_to_uri(name).into_owned(),
        digest_method: alg.uri().to_string(),
        digest_value: digest,
        mime_type: None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<asic:ASiCManifest xmlns:asic="http://uri.etsi.org/02918/v1.2.1#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
  <asic:SigReference URI="META-INF/timestamp002.tst" MimeType="application/vnd.etsi.timestamp-token"/>
  <asic:DataObjectReference URI="META-INF/timestamp.tst" MimeType="application/vnd.etsi.timestamp-token">
    <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
    <ds:DigestValue>AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=</ds:DigestValue>
  </asic:DataObjectReference>
  <asic:DataObjectReference URI="my%20document.txt">
    <ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"></ds:DigestMethod>
    <ds:DigestValue>
      AAECAwQFBgcICQoLDA0O
      DxAREhM=
    </ds:DigestValue>
  </asic:DataObjectReference>
</asic:ASiCManifest>"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = DigestManifest::from_xml(MANIFEST.as_bytes()).unwrap();

        assert_eq!(
            manifest.sig_reference.as_deref(),
            Some("META-INF/timestamp002.tst")
        );
        assert_eq!(manifest.references.len(), 2);

        let first = &manifest.references[0];
        assert_eq!(first.uri, "META-INF/timestamp.tst");
        assert_eq!(first.digest_method, "http://www.w3.org/2001/04/xmlenc#sha256");
        assert_eq!(first.digest_value, (0u8..32).collect::<Vec<_>>());
        assert_eq!(
            first.mime_type.as_deref(),
            Some("application/vnd.etsi.timestamp-token")
        );

        let second = &manifest.references[1];
        assert_eq!(second.file_name(), "my document.txt");
        assert_eq!(second.digest_value, (0u8..20).collect::<Vec<_>>());
        assert_eq!(second.mime_type, None);
    }

    #[test]
    fn test_missing_digest() {
        let xml = r#"<ASiCManifest><DataObjectReference URI="a.txt"><DigestMethod Algorithm="x"/></DataObjectReference></ASiCManifest>"#;
        assert!(matches!(
            DigestManifest::from_xml(xml.as_bytes()),
            Err(Error::ParseError(_))
        ));

        let xml = r#"<ASiCManifest><DataObjectReference URI="a.txt"/></ASiCManifest>"#;
        assert!(matches!(
            DigestManifest::from_xml(xml.as_bytes()),
            Err(Error::ParseError(_))
        ));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            DigestManifest::from_xml(b"<a><b></a>"),
            Err(Error::XmlError(_))
        ));
    }

    #[test]
    fn test_written_manifest_parses() {
        let manifest = DigestManifest {
            sig_reference: Some("META-INF/timestamp.tst".into()),
            references: vec![reference_for(
                "a & b.txt",
                DigestAlgorithm::Sha256,
                DigestAlgorithm::Sha256.digest(b"x"),
            )],
        };

        let xml = manifest.to_xml();
        assert!(xml.contains("URI=\"a%20%26%20b.txt\""));
        assert!(xml.lines().all(|line| !line.starts_with(' ')));
        assert_eq!(DigestManifest::from_xml(xml.as_bytes()).unwrap(), manifest);
        assert_eq!(manifest.references[0].file_name(), "a & b.txt");
    }

    #[test]
    fn test_uri_mapping() {
        assert_eq!(uri_to_file_name("./dir/a%C3%A4.txt"), "dir/aä.txt");
        assert_eq!(uri_to_file_name("plain.txt"), "plain.txt");
        assert_eq!(file_name_to_uri("dir/aä.txt"), "dir/a%C3%A4.txt");
    }
}
