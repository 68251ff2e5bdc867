//! Content-stream operator iteration.
//!
//! Parses page content into `(operands, operator)` pairs for the
//! marked-content, contrast, and text-heuristic scans. A second,
//! byte-level scanner finds `/Lang (..) BDC` overrides even when the
//! surrounding stream cannot be fully parsed.

use crate::lexer::{self, Token};
use crate::object::{Dict, Object};
use std::collections::HashSet;

/// One content-stream operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    /// Operands preceding the operator, in order
    pub operands: Vec<Object>,
    /// Operator keyword (e.g. "Tj", "rg", "BDC")
    pub operator: String,
}

/// Parse a decoded content stream into operations.
///
/// Unparseable bytes end the scan with whatever was collected; content
/// scans must degrade, not fail. Inline image data (`BI ... ID ... EI`)
/// is skipped.
pub fn parse_content_ops(data: &[u8]) -> Vec<ContentOp> {
    let mut ops = Vec::new();
    let mut operands: Vec<Object> = Vec::new();
    let mut input = data;

    loop {
        let Ok((rest, token)) = lexer::next_token(input) else {
            break;
        };
        match token {
            Token::Integer(i) => operands.push(Object::Integer(i)),
            Token::Real(r) => operands.push(Object::Real(r)),
            Token::LiteralString(raw) => {
                operands.push(Object::String(lexer::decode_literal_string(raw)))
            },
            Token::HexString(raw) => {
                operands.push(Object::String(lexer::decode_hex_string(raw)))
            },
            Token::Name(name) => operands.push(Object::Name(name)),
            Token::True => operands.push(Object::Boolean(true)),
            Token::False => operands.push(Object::Boolean(false)),
            Token::Null => operands.push(Object::Null),
            Token::ArrayStart => match collect_array(rest) {
                Some((arr, after)) => {
                    operands.push(arr);
                    input = after;
                    continue;
                },
                None => break,
            },
            Token::DictStart => match collect_dict(rest) {
                Some((dict, after)) => {
                    operands.push(dict);
                    input = after;
                    continue;
                },
                None => break,
            },
            Token::ArrayEnd | Token::DictEnd => {
                // Stray delimiter; drop pending operands and continue.
                operands.clear();
            },
            Token::Keyword(word) => {
                let operator = String::from_utf8_lossy(word).to_string();
                if operator == "BI" {
                    // Inline image: skip to EI.
                    match skip_inline_image(rest) {
                        Some(after) => {
                            operands.clear();
                            input = after;
                            continue;
                        },
                        None => break,
                    }
                }
                ops.push(ContentOp {
                    operands: std::mem::take(&mut operands),
                    operator,
                });
            },
            Token::R | Token::ObjStart | Token::ObjEnd | Token::StreamStart
            | Token::StreamEnd => {
                operands.clear();
            },
        }
        input = rest;
    }
    ops
}

fn collect_array(input: &[u8]) -> Option<(Object, &[u8])> {
    let mut items = Vec::new();
    let mut rest = input;
    loop {
        let (after, token) = lexer::next_token(rest).ok()?;
        match token {
            Token::ArrayEnd => return Some((Object::Array(items), after)),
            Token::Integer(i) => items.push(Object::Integer(i)),
            Token::Real(r) => items.push(Object::Real(r)),
            Token::LiteralString(raw) => {
                items.push(Object::String(lexer::decode_literal_string(raw)))
            },
            Token::HexString(raw) => items.push(Object::String(lexer::decode_hex_string(raw))),
            Token::Name(name) => items.push(Object::Name(name)),
            _ => return None,
        }
        rest = after;
    }
}

fn collect_dict(mut input: &[u8]) -> Option<(Object, &[u8])> {
    let mut dict = Dict::new();
    loop {
        let (rest, token) = lexer::next_token(input).ok()?;
        match token {
            Token::DictEnd => return Some((Object::Dictionary(dict), rest)),
            Token::Name(key) => {
                let (after, value_token) = lexer::next_token(rest).ok()?;
                let value = match value_token {
                    Token::Integer(i) => Object::Integer(i),
                    Token::Real(r) => Object::Real(r),
                    Token::Name(n) => Object::Name(n),
                    Token::LiteralString(raw) => {
                        Object::String(lexer::decode_literal_string(raw))
                    },
                    Token::HexString(raw) => Object::String(lexer::decode_hex_string(raw)),
                    Token::True => Object::Boolean(true),
                    Token::False => Object::Boolean(false),
                    Token::Null => Object::Null,
                    Token::DictStart => {
                        let (nested, after_nested) = collect_dict(after)?;
                        dict.entry(key).or_insert(nested);
                        input = after_nested;
                        continue;
                    },
                    _ => return None,
                };
                dict.entry(key).or_insert(value);
                input = after;
            },
            _ => return None,
        }
    }
}

fn skip_inline_image(input: &[u8]) -> Option<&[u8]> {
    let pos = crate::parser::find_subslice(input, b"EI")?;
    Some(&input[pos + 2..])
}

/// Extract the text shown by `Tj`, `'`, `"`, and `TJ` operators.
///
/// This is an encoding-blind heuristic: simple-font text comes out
/// readable, CID-coded text degrades to bytes. Good enough for the
/// sensory-wording and script-detection scans, which only need samples.
pub fn extract_text(data: &[u8]) -> String {
    let mut out = String::new();
    for op in parse_content_ops(data) {
        match op.operator.as_str() {
            "Tj" | "'" => {
                if let Some(Object::String(s)) = op.operands.last() {
                    push_text(&mut out, s);
                }
            },
            "\"" => {
                if let Some(Object::String(s)) = op.operands.last() {
                    push_text(&mut out, s);
                }
            },
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.last() {
                    for item in items {
                        if let Object::String(s) = item {
                            push_text(&mut out, s);
                        }
                    }
                }
            },
            "Td" | "TD" | "T*" => {
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
            },
            _ => {},
        }
    }
    out
}

fn push_text(out: &mut String, bytes: &[u8]) {
    let text = crate::object::decode_text_string(bytes);
    // Heuristic: UTF-8 decodable byte strings are re-read as UTF-8 so CJK
    // literals survive; otherwise the Latin-1 decode above stands.
    if text.chars().any(|c| (c as u32) > 0x7F) {
        if let Ok(utf8) = std::str::from_utf8(bytes) {
            out.push_str(utf8);
            return;
        }
    }
    out.push_str(&text);
}

/// Marked-content language overrides on a page's decoded operators.
///
/// Collects `/Lang` values from `BDC` property dictionaries.
pub fn marked_content_languages(data: &[u8]) -> HashSet<String> {
    let mut langs = HashSet::new();
    for op in parse_content_ops(data) {
        if op.operator != "BDC" {
            continue;
        }
        for operand in &op.operands {
            if let Some(dict) = operand.as_dict() {
                if let Some(lang) = dict.get("Lang").and_then(|l| l.as_text()) {
                    let trimmed = lang.trim().to_string();
                    if !trimmed.is_empty() {
                        langs.insert(trimmed);
                    }
                }
            }
        }
    }
    langs
}

/// Raw-bytes fallback for `/Lang (..) BDC` detection.
///
/// Some writers emit property dictionaries this scanner's structured pass
/// cannot resolve (named resources, exotic escapes); a byte-level regex
/// over the possibly-still-compressed stream still finds direct literals.
pub fn raw_marked_content_languages(raw: &[u8]) -> HashSet<String> {
    lazy_static::lazy_static! {
        static ref LANG_BDC: regex::bytes::Regex = regex::bytes::Regex::new(
            r"(?s)/Lang\s*\(\s*([A-Za-z]{2,3}(?:-[A-Za-z0-9]{2,8})*)\s*\)[^(]{0,128}?BDC"
        )
        .expect("lang bdc regex");
    }
    let mut langs = HashSet::new();
    for caps in LANG_BDC.captures_iter(raw) {
        if let Ok(tag) = std::str::from_utf8(&caps[1]) {
            langs.insert(tag.to_string());
        }
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_ops() {
        let ops = parse_content_ops(b"BT /F1 12 Tf (Hello) Tj ET");
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, vec!["BT", "Tf", "Tj", "ET"]);
        assert_eq!(ops[1].operands.len(), 2);
        assert_eq!(ops[2].operands[0], Object::String(b"Hello".to_vec()));
    }

    #[test]
    fn test_parse_color_ops() {
        let ops = parse_content_ops(b"0.5 0.5 0.5 rg 1 0 0 RG");
        assert_eq!(ops[0].operator, "rg");
        assert_eq!(ops[0].operands.len(), 3);
        assert_eq!(ops[1].operator, "RG");
    }

    #[test]
    fn test_parse_tj_array() {
        let ops = parse_content_ops(b"[(Hel) -20 (lo)] TJ");
        assert_eq!(ops[0].operator, "TJ");
        let arr = ops[0].operands[0].as_array().unwrap();
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn test_parse_bdc_with_property_dict() {
        let ops = parse_content_ops(b"/Span << /Lang (fr-FR) >> BDC (Bonjour) Tj EMC");
        assert_eq!(ops[0].operator, "BDC");
        let dict = ops[0].operands[1].as_dict().unwrap();
        assert_eq!(dict.get("Lang").unwrap().as_text().unwrap(), "fr-FR");
    }

    #[test]
    fn test_inline_image_skipped() {
        let ops = parse_content_ops(b"BI /W 1 /H 1 ID \x00\xFF\x00 EI (after) Tj");
        let operators: Vec<&str> = ops.iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(operators, vec!["Tj"]);
    }

    #[test]
    fn test_extract_text() {
        let text = extract_text(b"BT (Click the red button) Tj 0 -14 Td (to continue) Tj ET");
        assert!(text.contains("Click the red button"));
        assert!(text.contains("to continue"));
    }

    #[test]
    fn test_extract_text_tj_array() {
        let text = extract_text(b"[(Sp) -10 (lit)] TJ");
        assert_eq!(text, "Split");
    }

    #[test]
    fn test_marked_content_languages() {
        let langs =
            marked_content_languages(b"/Span << /Lang (ru-RU) >> BDC (x) Tj EMC");
        assert!(langs.contains("ru-RU"));
    }

    #[test]
    fn test_raw_language_scan() {
        let raw = b"garbage /Span << /Lang (ja) /MCID 3 >> BDC more garbage";
        let langs = raw_marked_content_languages(raw);
        assert!(langs.contains("ja"));
    }

    #[test]
    fn test_raw_language_scan_requires_bdc() {
        let raw = b"/Lang (en-US) no marked content here";
        assert!(raw_marked_content_languages(raw).is_empty());
    }

    #[test]
    fn test_garbage_does_not_panic() {
        let ops = parse_content_ops(b"\xFF\xFE\x00\x01 (unterminated");
        // Whatever was parsed is fine; the scan must simply not panic.
        let _ = ops;
    }
}
