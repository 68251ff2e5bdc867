//! XMP metadata packet handling.
//!
//! Reads the subset of properties the validators and the remediation
//! engine care about (dc:title, dc:creator, dc:description, pdf:Keywords,
//! pdfuaid and pdfaid identification) and writes packets back. Writing
//! regenerates the packet from the parsed properties, so unknown content
//! is not preserved; the engine reads first, then mirrors.

use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Dict, Object};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Properties of an XMP packet relevant to accessibility conformance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmpPacket {
    /// dc:title (first lang-alt entry)
    pub title: Option<String>,
    /// dc:creator entries in order
    pub creators: Vec<String>,
    /// dc:description (first lang-alt entry)
    pub description: Option<String>,
    /// pdf:Keywords
    pub keywords: Option<String>,
    /// pdfuaid:part ("1" for PDF/UA-1)
    pub pdfua_part: Option<String>,
    /// pdfuaid:conformance ("A")
    pub pdfua_conformance: Option<String>,
    /// pdfaid:part ("1" for PDF/A-1)
    pub pdfa_part: Option<String>,
    /// pdfaid:conformance ("A" or "B")
    pub pdfa_conformance: Option<String>,
}

impl XmpPacket {
    /// Parse a packet, tolerating unknown elements and malformed tails.
    ///
    /// Properties may appear as child elements or as attributes of
    /// `rdf:Description`; both forms are read.
    pub fn parse(data: &[u8]) -> Self {
        let mut packet = XmpPacket::default();
        let text = String::from_utf8_lossy(data);
        let mut reader = Reader::from_str(&text);
        reader.trim_text(true);

        let mut path: Vec<String> = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name.ends_with("Description") {
                        packet.read_description_attributes(&e);
                    }
                    path.push(name);
                },
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if name.ends_with("Description") {
                        packet.read_description_attributes(&e);
                    }
                },
                Ok(Event::Text(t)) => {
                    if let Ok(text) = t.unescape() {
                        packet.assign_text(&path, text.trim());
                    }
                },
                Ok(Event::End(_)) => {
                    path.pop();
                },
                Ok(Event::Eof) => break,
                Err(err) => {
                    log::debug!("XMP parse stopped early: {}", err);
                    break;
                },
                _ => {},
            }
        }
        packet
    }

    fn read_description_attributes(&mut self, e: &quick_xml::events::BytesStart<'_>) {
        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "pdfuaid:part" => self.pdfua_part.get_or_insert(value),
                "pdfuaid:conformance" => self.pdfua_conformance.get_or_insert(value),
                "pdfaid:part" => self.pdfa_part.get_or_insert(value),
                "pdfaid:conformance" => self.pdfa_conformance.get_or_insert(value),
                "pdf:Keywords" => self.keywords.get_or_insert(value),
                _ => continue,
            };
        }
    }

    fn assign_text(&mut self, path: &[String], text: &str) {
        if text.is_empty() {
            return;
        }
        let in_property = |property: &str| path.iter().any(|p| p == property);

        if in_property("dc:title") {
            self.title.get_or_insert_with(|| text.to_string());
        } else if in_property("dc:creator") {
            self.creators.push(text.to_string());
        } else if in_property("dc:description") {
            self.description.get_or_insert_with(|| text.to_string());
        } else if in_property("pdf:Keywords") {
            self.keywords.get_or_insert_with(|| text.to_string());
        } else if in_property("pdfuaid:part") {
            self.pdfua_part.get_or_insert_with(|| text.to_string());
        } else if in_property("pdfuaid:conformance") {
            self.pdfua_conformance.get_or_insert_with(|| text.to_string());
        } else if in_property("pdfaid:part") {
            self.pdfa_part.get_or_insert_with(|| text.to_string());
        } else if in_property("pdfaid:conformance") {
            self.pdfa_conformance.get_or_insert_with(|| text.to_string());
        }
    }

    /// Non-empty dc:title check used by the 2.4.2 and 01-002 rules.
    pub fn has_title(&self) -> bool {
        self.title.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }

    /// Serialize to a full packet. Optional properties are emitted only
    /// when present; the pdfaid namespace only when PDF/A identification
    /// is set.
    pub fn to_xml(&self) -> String {
        let mut namespaces = String::from(
            "\n    xmlns:dc=\"http://purl.org/dc/elements/1.1/\"\
             \n    xmlns:pdf=\"http://ns.adobe.com/pdf/1.3/\"\
             \n    xmlns:pdfuaid=\"http://www.aiim.org/pdfua/ns/id/\"",
        );
        if self.pdfa_part.is_some() {
            namespaces.push_str("\n    xmlns:pdfaid=\"http://www.aiim.org/pdfa/ns/id/\"");
        }

        let mut properties = String::new();
        if let Some(title) = &self.title {
            properties.push_str(&format!(
                "\n    <dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:title>",
                escape_xml(title)
            ));
        }
        if !self.creators.is_empty() {
            properties.push_str("\n    <dc:creator><rdf:Seq>");
            for creator in &self.creators {
                properties.push_str(&format!("<rdf:li>{}</rdf:li>", escape_xml(creator)));
            }
            properties.push_str("</rdf:Seq></dc:creator>");
        }
        if let Some(description) = &self.description {
            properties.push_str(&format!(
                "\n    <dc:description><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:description>",
                escape_xml(description)
            ));
        }
        if let Some(keywords) = &self.keywords {
            properties.push_str(&format!(
                "\n    <pdf:Keywords>{}</pdf:Keywords>",
                escape_xml(keywords)
            ));
        }
        if let Some(part) = &self.pdfua_part {
            properties.push_str(&format!("\n    <pdfuaid:part>{}</pdfuaid:part>", escape_xml(part)));
        }
        if let Some(conformance) = &self.pdfua_conformance {
            properties.push_str(&format!(
                "\n    <pdfuaid:conformance>{}</pdfuaid:conformance>",
                escape_xml(conformance)
            ));
        }
        if let Some(part) = &self.pdfa_part {
            properties.push_str(&format!("\n    <pdfaid:part>{}</pdfaid:part>", escape_xml(part)));
        }
        if let Some(conformance) = &self.pdfa_conformance {
            properties.push_str(&format!(
                "\n    <pdfaid:conformance>{}</pdfaid:conformance>",
                escape_xml(conformance)
            ));
        }

        format!(
            "<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n\
             <x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
             \u{20}<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
             \u{20} <rdf:Description rdf:about=\"\"{namespaces}>{properties}\n\
             \u{20} </rdf:Description>\n\
             \u{20}</rdf:RDF>\n\
             </x:xmpmeta>\n\
             <?xpacket end=\"w\"?>"
        )
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Read and parse the document's XMP packet, if any.
pub fn read_document_xmp(doc: &PdfDocument) -> Option<XmpPacket> {
    let stream = doc.metadata_stream()?;
    let data = match stream.decode_stream_data() {
        Ok(data) => data,
        Err(err) => {
            log::debug!("failed to decode metadata stream: {}", err);
            stream.raw_stream_data()?.to_vec()
        },
    };
    Some(XmpPacket::parse(&data))
}

/// Serialize `packet` into the catalog's Metadata stream, creating the
/// stream object when the document has none.
pub fn write_document_xmp(doc: &mut PdfDocument, packet: &XmpPacket) -> Result<()> {
    let xml = packet.to_xml();
    let mut dict = Dict::new();
    dict.insert("Type".to_string(), Object::name("Metadata"));
    dict.insert("Subtype".to_string(), Object::name("XML"));
    let stream = Object::Stream {
        dict,
        data: bytes::Bytes::from(xml.into_bytes()),
    };

    let existing = doc
        .catalog()?
        .get("Metadata")
        .and_then(|o| o.as_reference());
    match existing {
        Some(r) => doc.set_object(r, stream),
        None => {
            let r = doc.make_indirect(stream);
            doc.catalog_mut()?
                .insert("Metadata".to_string(), Object::Reference(r));
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about=""
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:pdf="http://ns.adobe.com/pdf/1.3/"
    xmlns:pdfuaid="http://www.aiim.org/pdfua/ns/id/">
    <dc:title><rdf:Alt><rdf:li xml:lang="x-default">Annual Report</rdf:li></rdf:Alt></dc:title>
    <dc:creator><rdf:Seq><rdf:li>A. Author</rdf:li></rdf:Seq></dc:creator>
    <pdfuaid:part>1</pdfuaid:part>
    <pdfuaid:conformance>A</pdfuaid:conformance>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    #[test]
    fn test_parse_sample_packet() {
        let packet = XmpPacket::parse(SAMPLE.as_bytes());
        assert_eq!(packet.title.as_deref(), Some("Annual Report"));
        assert_eq!(packet.creators, vec!["A. Author".to_string()]);
        assert_eq!(packet.pdfua_part.as_deref(), Some("1"));
        assert_eq!(packet.pdfua_conformance.as_deref(), Some("A"));
        assert!(packet.pdfa_part.is_none());
        assert!(packet.has_title());
    }

    #[test]
    fn test_parse_attribute_form() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
          <rdf:Description rdf:about="" pdfaid:part="1" pdfaid:conformance="B"/>
        </rdf:RDF>"#;
        let packet = XmpPacket::parse(xml.as_bytes());
        assert_eq!(packet.pdfa_part.as_deref(), Some("1"));
        assert_eq!(packet.pdfa_conformance.as_deref(), Some("B"));
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        let packet = XmpPacket::parse(b"\x00\x01 not xml at all");
        assert!(!packet.has_title());
        assert!(packet.pdfua_part.is_none());
    }

    #[test]
    fn test_roundtrip_through_serialization() {
        let packet = XmpPacket {
            title: Some("Quarterly <Review>".to_string()),
            creators: vec!["Team".to_string()],
            description: Some("Figures & tables".to_string()),
            keywords: Some("finance, charts".to_string()),
            pdfua_part: Some("1".to_string()),
            pdfua_conformance: Some("A".to_string()),
            pdfa_part: Some("1".to_string()),
            pdfa_conformance: Some("B".to_string()),
        };
        let reparsed = XmpPacket::parse(packet.to_xml().as_bytes());
        assert_eq!(reparsed, packet);
    }

    #[test]
    fn test_write_and_read_document_xmp() {
        let mut doc = PdfDocument::new();
        assert!(read_document_xmp(&doc).is_none());

        let packet = XmpPacket {
            title: Some("Attached".to_string()),
            pdfua_part: Some("1".to_string()),
            ..Default::default()
        };
        write_document_xmp(&mut doc, &packet).unwrap();

        let read_back = read_document_xmp(&doc).unwrap();
        assert_eq!(read_back.title.as_deref(), Some("Attached"));
        assert_eq!(read_back.pdfua_part.as_deref(), Some("1"));

        // The stream carries the conventional Metadata type keys.
        let stream = doc.metadata_stream().unwrap();
        let dict = stream.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Metadata"));
        assert_eq!(dict.get("Subtype").unwrap().as_name(), Some("XML"));
    }
}
