//! Cross-reference table parsing.
//!
//! Handles classic `xref` tables, PDF 1.5 cross-reference streams (with
//! PNG predictors), `/Prev` chains, and a last-resort reconstruction scan
//! for documents whose xref offsets are broken.

use crate::error::{Error, Result};
use crate::lexer::{self, Token};
use crate::object::{Dict, Object};
use crate::parser;
use std::collections::HashMap;

/// Where an object's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free entry (unused object number)
    Free,
    /// Uncompressed object at a byte offset in the file
    InFile {
        /// Byte offset of the `id gen obj` header
        offset: usize,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    InStream {
        /// Object number of the containing `/Type /ObjStm` stream
        stream_id: u32,
        /// Index within the stream
        index: u32,
    },
}

/// Parsed cross-reference data plus the merged trailer dictionary.
#[derive(Debug, Default)]
pub struct XrefTable {
    /// Object number → location. First-seen wins across `/Prev` chains,
    /// so newer revisions shadow older ones.
    pub entries: HashMap<u32, XrefEntry>,
    /// Merged trailer dictionary (newest revision's keys win)
    pub trailer: Dict,
}

impl XrefTable {
    fn merge_entry(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    fn merge_trailer(&mut self, dict: &Dict) {
        for (k, v) in dict {
            if !self.trailer.contains_key(k) {
                self.trailer.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Locate the `startxref` offset near the end of the file.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];
    let pos = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or(Error::InvalidXref)?;
    let after = &tail[pos + b"startxref".len()..];
    let (_, token) = lexer::next_token(after).map_err(|_| Error::InvalidXref)?;
    match token {
        Token::Integer(offset) if offset >= 0 => Ok(offset as usize),
        _ => Err(Error::InvalidXref),
    }
}

/// Parse the cross-reference data for a document, following `/Prev`
/// chains. Falls back to a reconstruction scan when the table is broken.
pub fn parse_xref(data: &[u8]) -> Result<XrefTable> {
    match parse_xref_strict(data) {
        Ok(table) if table.trailer.contains_key("Root") => Ok(table),
        Ok(_) => {
            log::debug!("xref parsed but trailer lacks /Root, reconstructing");
            reconstruct_xref(data)
        },
        Err(err) => {
            log::debug!("xref parse failed ({}), reconstructing", err);
            reconstruct_xref(data)
        },
    }
}

fn parse_xref_strict(data: &[u8]) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut offset = Some(find_startxref(data)?);
    let mut seen_offsets = Vec::new();

    while let Some(off) = offset {
        if off >= data.len() || seen_offsets.contains(&off) {
            break;
        }
        seen_offsets.push(off);

        let section = &data[off..];
        let trailer = if section_starts_with_xref_keyword(section) {
            parse_classic_section(section, &mut table)?
        } else {
            parse_stream_section(data, off, &mut table)?
        };

        offset = trailer
            .get("Prev")
            .and_then(|o| o.as_integer())
            .map(|v| v as usize);

        // Hybrid files point at an xref stream via /XRefStm.
        if let Some(hybrid) = trailer.get("XRefStm").and_then(|o| o.as_integer()) {
            let hybrid = hybrid as usize;
            if hybrid < data.len() && !seen_offsets.contains(&hybrid) {
                seen_offsets.push(hybrid);
                let _ = parse_stream_section(data, hybrid, &mut table)?;
            }
        }

        table.merge_trailer(&trailer);
    }

    if table.entries.is_empty() {
        return Err(Error::InvalidXref);
    }
    Ok(table)
}

fn section_starts_with_xref_keyword(section: &[u8]) -> bool {
    let trimmed = lexer::skip_ws(section);
    trimmed.starts_with(b"xref")
}

/// Classic table: `xref` keyword, subsections of `start count` headers and
/// fixed-width 20-byte entries, then `trailer << ... >>`.
fn parse_classic_section(section: &[u8], table: &mut XrefTable) -> Result<Dict> {
    let mut input = lexer::skip_ws(section);
    input = &input[b"xref".len()..];

    loop {
        input = lexer::skip_ws(input);
        if input.starts_with(b"trailer") {
            input = &input[b"trailer".len()..];
            let (obj, _) = parser::parse_object(input)?;
            return match obj {
                Object::Dictionary(d) => Ok(d),
                _ => Err(Error::InvalidXref),
            };
        }

        let (rest, start_tok) = lexer::next_token(input).map_err(|_| Error::InvalidXref)?;
        let (rest, count_tok) = lexer::next_token(rest).map_err(|_| Error::InvalidXref)?;
        let (Token::Integer(start), Token::Integer(count)) = (start_tok, count_tok) else {
            return Err(Error::InvalidXref);
        };

        input = lexer::skip_ws(rest);
        for i in 0..count {
            if input.len() < 18 {
                return Err(Error::InvalidXref);
            }
            let line = &input[..18];
            let offset: usize = std::str::from_utf8(&line[0..10])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(Error::InvalidXref)?;
            let gen: u16 = std::str::from_utf8(&line[11..16])
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(Error::InvalidXref)?;
            let kind = line[17];
            let id = (start + i) as u32;
            match kind {
                b'n' => table.merge_entry(id, XrefEntry::InFile { offset, gen }),
                b'f' => table.merge_entry(id, XrefEntry::Free),
                _ => return Err(Error::InvalidXref),
            }
            // Entries are 20 bytes, but tolerate single-byte EOLs.
            input = lexer::skip_ws(&input[18..]);
        }
    }
}

/// Cross-reference stream: `/Type /XRef` with /W field widths and an
/// optional /Index of (start, count) pairs.
fn parse_stream_section(data: &[u8], offset: usize, table: &mut XrefTable) -> Result<Dict> {
    let (_, obj) = parser::parse_indirect_at(data, offset)?;
    let dict = obj
        .as_dict()
        .cloned()
        .ok_or(Error::InvalidXref)?;
    if dict.get("Type").and_then(|o| o.as_name()) != Some("XRef") {
        return Err(Error::InvalidXref);
    }

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|o| o.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|o| o.as_integer())
                .map(|v| v as usize)
                .collect()
        })
        .ok_or(Error::InvalidXref)?;
    if widths.len() != 3 {
        return Err(Error::InvalidXref);
    }
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(Error::InvalidXref);
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or(Error::InvalidXref)?;
    let index: Vec<(i64, i64)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(arr) => arr
            .chunks(2)
            .filter_map(|pair| match (pair[0].as_integer(), pair.get(1)?.as_integer()) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .collect(),
        None => vec![(0, size)],
    };

    let decoded = obj.decode_stream_data()?;
    let rows = apply_predictor(&dict, decoded, row_len)?;

    let mut cursor = 0usize;
    for (start, count) in index {
        for i in 0..count {
            let Some(row) = rows.get(cursor..cursor + row_len) else {
                return Err(Error::InvalidXref);
            };
            cursor += row_len;

            let mut fields = [1u64, 0, 0];
            let mut pos = 0;
            for (f, &w) in fields.iter_mut().zip(&widths) {
                if w > 0 {
                    *f = row[pos..pos + w].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
                    pos += w;
                }
            }

            let id = (start + i) as u32;
            match fields[0] {
                0 => table.merge_entry(id, XrefEntry::Free),
                1 => table.merge_entry(
                    id,
                    XrefEntry::InFile {
                        offset: fields[1] as usize,
                        gen: fields[2] as u16,
                    },
                ),
                2 => table.merge_entry(
                    id,
                    XrefEntry::InStream {
                        stream_id: fields[1] as u32,
                        index: fields[2] as u32,
                    },
                ),
                other => {
                    log::debug!("unknown xref stream entry type {}", other);
                },
            }
        }
    }

    Ok(dict)
}

/// Undo PNG row predictors (Predictor >= 10) on decoded xref stream data.
fn apply_predictor(dict: &Dict, data: Vec<u8>, row_len: usize) -> Result<Vec<u8>> {
    let params = dict
        .get("DecodeParms")
        .and_then(|o| o.as_dict())
        .cloned()
        .unwrap_or_default();
    let predictor = params
        .get("Predictor")
        .and_then(|o| o.as_integer())
        .unwrap_or(1);
    if predictor < 10 {
        return Ok(data);
    }

    let columns = params
        .get("Columns")
        .and_then(|o| o.as_integer())
        .unwrap_or(row_len as i64) as usize;
    let stride = columns + 1;
    if stride == 1 || data.len() % stride != 0 {
        return Err(Error::Decode("bad predictor geometry".to_string()));
    }

    let mut out = Vec::with_capacity(data.len() / stride * columns);
    let mut prev_row = vec![0u8; columns];
    for chunk in data.chunks(stride) {
        let filter = chunk[0];
        let mut row = chunk[1..].to_vec();
        match filter {
            0 => {},
            1 => {
                for i in 1..row.len() {
                    row[i] = row[i].wrapping_add(row[i - 1]);
                }
            },
            2 => {
                for i in 0..row.len() {
                    row[i] = row[i].wrapping_add(prev_row[i]);
                }
            },
            3 => {
                for i in 0..row.len() {
                    let left = if i > 0 { row[i - 1] as u16 } else { 0 };
                    let up = prev_row[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            },
            4 => {
                for i in 0..row.len() {
                    let left = if i > 0 { row[i - 1] as i16 } else { 0 };
                    let up = prev_row[i] as i16;
                    let up_left = if i > 0 { prev_row[i - 1] as i16 } else { 0 };
                    let p = left + up - up_left;
                    let (pa, pb, pc) =
                        ((p - left).abs(), (p - up).abs(), (p - up_left).abs());
                    let pred = if pa <= pb && pa <= pc {
                        left
                    } else if pb <= pc {
                        up
                    } else {
                        up_left
                    };
                    row[i] = row[i].wrapping_add(pred as u8);
                }
            },
            other => {
                return Err(Error::Decode(format!("unknown PNG filter {}", other)));
            },
        }
        out.extend_from_slice(&row);
        prev_row = row;
    }
    Ok(out)
}

/// Last-resort reconstruction: scan for `id gen obj` headers and the last
/// trailer dictionary.
fn reconstruct_xref(data: &[u8]) -> Result<XrefTable> {
    lazy_static::lazy_static! {
        static ref OBJ_HEADER: regex::bytes::Regex =
            regex::bytes::Regex::new(r"(?m)(\d{1,10})\s+(\d{1,5})\s+obj\b").expect("obj header regex");
    }

    let mut table = XrefTable::default();
    for caps in OBJ_HEADER.captures_iter(data) {
        let whole = caps.get(0).expect("match");
        let id: u32 = match std::str::from_utf8(&caps[1]).ok().and_then(|s| s.parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        let gen: u16 = match std::str::from_utf8(&caps[2]).ok().and_then(|s| s.parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        // Later definitions shadow earlier ones during reconstruction.
        table
            .entries
            .insert(id, XrefEntry::InFile { offset: whole.start(), gen });
    }

    if table.entries.is_empty() {
        return Err(Error::PdfMalformed("no indirect objects found".to_string()));
    }

    // Find the newest trailer dictionary for /Root and /Info.
    let mut search_from = 0;
    let mut last_trailer = None;
    while let Some(pos) = parser::find_subslice(&data[search_from..], b"trailer") {
        let abs = search_from + pos + b"trailer".len();
        if let Ok((Object::Dictionary(d), _)) = parser::parse_object(&data[abs..]) {
            last_trailer = Some(d);
        }
        search_from = abs;
    }

    match last_trailer {
        Some(d) => table.trailer = d,
        None => {
            // Synthesize a trailer by locating the catalog object.
            for (&id, entry) in &table.entries {
                if let XrefEntry::InFile { offset, gen } = entry {
                    if let Ok((_, obj)) = parser::parse_indirect_at(data, *offset) {
                        if obj.as_dict().and_then(|d| d.get("Type")).and_then(|t| t.as_name())
                            == Some("Catalog")
                        {
                            table.trailer.insert(
                                "Root".to_string(),
                                Object::Reference(crate::object::ObjectRef::new(id, *gen)),
                            );
                            break;
                        }
                    }
                }
            }
            if !table.trailer.contains_key("Root") {
                return Err(Error::PdfMalformed("no document catalog found".to_string()));
            }
        },
    }

    log::debug!(
        "reconstructed xref with {} objects",
        table.entries.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIC: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
xref\n0 3\n0000000000 65535 f \n0000000009 00000 n \n0000000056 00000 n \n\
trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n105\n%%EOF";

    fn classic_doc() -> Vec<u8> {
        // Recompute the xref offset so the fixture stays valid.
        let body = CLASSIC.to_vec();
        let xref_pos = parser::find_subslice(&body, b"xref").unwrap();
        let mut text = String::from_utf8(body).unwrap();
        text = text.replace("startxref\n105", &format!("startxref\n{}", xref_pos));
        // Fix the two object offsets too.
        let obj1 = text.find("1 0 obj").unwrap();
        let obj2 = text.find("2 0 obj").unwrap();
        text = text.replace("0000000009", &format!("{:010}", obj1));
        text = text.replace("0000000056", &format!("{:010}", obj2));
        text.into_bytes()
    }

    #[test]
    fn test_parse_classic_table() {
        let data = classic_doc();
        let table = parse_xref(&data).unwrap();
        assert_eq!(table.entries.get(&0), Some(&XrefEntry::Free));
        assert!(matches!(table.entries.get(&1), Some(XrefEntry::InFile { .. })));
        assert!(table.trailer.contains_key("Root"));
    }

    #[test]
    fn test_reconstruction_on_broken_offsets() {
        let mut data = classic_doc();
        // Corrupt the startxref pointer.
        let pos = parser::find_subslice(&data, b"startxref").unwrap();
        data[pos + 10] = b'9';
        data[pos + 11] = b'9';
        let table = parse_xref(&data).unwrap();
        assert!(table.entries.contains_key(&1));
        assert!(table.trailer.contains_key("Root"));
    }

    #[test]
    fn test_predictor_up_filter() {
        let mut dict = Dict::new();
        let mut parms = Dict::new();
        parms.insert("Predictor".to_string(), Object::Integer(12));
        parms.insert("Columns".to_string(), Object::Integer(3));
        dict.insert("DecodeParms".to_string(), Object::Dictionary(parms));
        // Two rows of 3 columns, filter 2 (Up): second row adds to first.
        let data = vec![2, 1, 2, 3, 2, 1, 1, 1];
        let out = apply_predictor(&dict, data, 3).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }
}
