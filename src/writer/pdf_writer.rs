//! Full-file PDF writer.
//!
//! Emits a complete revision: header, every loaded object, a classic xref
//! table, and a trailer. The destination is replaced atomically via a
//! temporary file and rename, so a crashed save never leaves a truncated
//! document behind.

use crate::document::{PdfDocument, SaveOptions};
use crate::error::Result;
use crate::object::{flate_encode, Object};
use crate::writer::ObjectSerializer;
use std::io::Write;
use std::path::Path;

/// Streams smaller than this are not worth compressing.
const COMPRESS_THRESHOLD: usize = 64;

/// Serialize `doc` into `dest`, replacing it atomically.
pub fn save_document(doc: &PdfDocument, dest: &Path, options: &SaveOptions) -> Result<()> {
    if options.linearize {
        log::debug!("linearization requested but not supported; writing standard file");
    }

    let mut out: Vec<u8> = Vec::new();
    let (major, minor) = doc.effective_version();
    writeln!(out, "%PDF-{}.{}", major, minor)?;
    // Binary marker comment so transports treat the file as binary.
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let serializer = ObjectSerializer::new();
    let objects = doc.objects_for_writer();
    let max_id = objects.keys().max().copied().unwrap_or(0);

    let mut offsets: Vec<Option<(usize, u16)>> = vec![None; (max_id + 1) as usize];
    for (&id, (gen, obj)) in objects {
        offsets[id as usize] = Some((out.len(), *gen));
        let to_write = prepare_stream(obj, options);
        match &to_write {
            Some(rewritten) => out.extend_from_slice(&serializer.serialize_indirect(id, *gen, rewritten)),
            None => out.extend_from_slice(&serializer.serialize_indirect(id, *gen, obj)),
        }
    }

    let xref_offset = out.len();
    writeln!(out, "xref")?;
    writeln!(out, "0 {}", max_id + 1)?;
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for entry in offsets.iter().skip(1) {
        match entry {
            Some((offset, gen)) => {
                write!(out, "{:010} {:05} n\r\n", offset, gen)?;
            },
            None => {
                out.extend_from_slice(b"0000000000 65535 f\r\n");
            },
        }
    }

    writeln!(out, "trailer")?;
    let mut trailer = doc.trailer().clone();
    trailer.insert("Size".to_string(), Object::Integer(max_id as i64 + 1));
    trailer.shift_remove("Prev");
    trailer.shift_remove("XRefStm");
    out.extend_from_slice(&serializer.serialize(&Object::Dictionary(trailer)));
    writeln!(out, "\nstartxref\n{}\n%%EOF", xref_offset)?;

    // Atomic replace: write a sibling temp file, then rename over dest.
    let tmp_path = dest.with_extension("part");
    std::fs::write(&tmp_path, &out)?;
    if let Err(err) = std::fs::rename(&tmp_path, dest) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Compress an unfiltered stream when the options ask for it.
///
/// Streams that already carry a filter are preserved byte-for-byte, and
/// XMP metadata streams stay uncompressed so conformance processors can
/// read them without a filter chain.
fn prepare_stream(obj: &Object, options: &SaveOptions) -> Option<Object> {
    if !options.compress_streams {
        return None;
    }
    let Object::Stream { dict, data } = obj else {
        return None;
    };
    if dict.contains_key("Filter") || data.len() < COMPRESS_THRESHOLD {
        return None;
    }
    if dict.get("Type").and_then(|o| o.as_name()) == Some("Metadata") {
        return None;
    }

    let compressed = flate_encode(data);
    if compressed.len() >= data.len() {
        return None;
    }
    let mut new_dict = dict.clone();
    new_dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
    Some(Object::Stream {
        dict: new_dict,
        data: bytes::Bytes::from(compressed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::object::Dict;

    #[test]
    fn test_save_and_reopen_roundtrip() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        doc.catalog_mut()
            .unwrap()
            .insert("Lang".to_string(), Object::text("en-US"));
        doc.docinfo_mut()
            .insert("Title".to_string(), Object::text("Roundtrip"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let reopened = PdfDocument::open(&path).unwrap();
        assert_eq!(reopened.pages().len(), 1);
        assert_eq!(
            reopened.catalog().unwrap().get("Lang").unwrap().as_text().unwrap(),
            "en-US"
        );
        assert_eq!(
            reopened.docinfo().unwrap().get("Title").unwrap().as_text().unwrap(),
            "Roundtrip"
        );
        let _ = page;
    }

    #[test]
    fn test_save_compresses_bare_streams() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let payload = b"BT /F1 12 Tf (Hello hello hello hello hello hello hello) Tj ET".to_vec();
        let stream = doc.add_object(Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from(payload.clone()),
        });
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Contents".to_string(), Object::Reference(stream));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compressed.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let reopened = PdfDocument::open(&path).unwrap();
        let pages = reopened.pages();
        let content = reopened.page_content(pages[0]);
        assert!(String::from_utf8_lossy(&content).contains("Hello hello"));

        // The stored stream now carries FlateDecode.
        let stored = reopened.get(stream).unwrap();
        assert_eq!(
            stored.as_dict().unwrap().get("Filter").and_then(|f| f.as_name()),
            Some("FlateDecode")
        );
    }

    #[test]
    fn test_filtered_streams_preserved_verbatim() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::Name("ASCIIHexDecode".to_string()));
        let raw = b"48656C6C6F203D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D3D>".to_vec();
        let stream = doc.add_object(Object::Stream {
            dict,
            data: bytes::Bytes::from(raw.clone()),
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preserved.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let reopened = PdfDocument::open(&path).unwrap();
        let stored = reopened.get(stream).unwrap();
        assert_eq!(stored.raw_stream_data().unwrap(), &raw[..]);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let doc = PdfDocument::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clean.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("part").exists());
    }
}
