//! PDF object parser.
//!
//! Builds [`Object`] values from the token stream produced by the lexer.
//! Indirect references (`10 0 R`) are recognized with two-integer
//! lookahead; duplicate dictionary keys keep the first occurrence, which
//! is what the RoleMap tie-break relies on.

use crate::error::{Error, Result};
use crate::lexer::{self, Token};
use crate::object::{Dict, Object, ObjectRef};

/// Parse a direct object (no `obj`/`endobj` wrapper) from the start of
/// `input`. Returns the object and the remaining input.
pub fn parse_object(input: &[u8]) -> Result<(Object, &[u8])> {
    let (rest, token) = lexer::next_token(input).map_err(|_| Error::UnexpectedEof)?;
    parse_object_from_token(token, rest, input)
}

fn parse_error(input: &[u8], all: &[u8], reason: &str) -> Error {
    let offset = all.len().saturating_sub(input.len());
    Error::ParseError {
        offset,
        reason: reason.to_string(),
    }
}

fn parse_object_from_token<'a>(
    token: Token<'a>,
    rest: &'a [u8],
    all: &'a [u8],
) -> Result<(Object, &'a [u8])> {
    match token {
        Token::Null => Ok((Object::Null, rest)),
        Token::True => Ok((Object::Boolean(true), rest)),
        Token::False => Ok((Object::Boolean(false), rest)),
        Token::Real(r) => Ok((Object::Real(r), rest)),
        Token::Integer(first) => parse_integer_or_reference(first, rest),
        Token::LiteralString(raw) => {
            Ok((Object::String(lexer::decode_literal_string(raw)), rest))
        },
        Token::HexString(raw) => Ok((Object::String(lexer::decode_hex_string(raw)), rest)),
        Token::Name(name) => Ok((Object::Name(name), rest)),
        Token::ArrayStart => parse_array(rest, all),
        Token::DictStart => parse_dictionary_or_stream(rest, all),
        other => Err(parse_error(
            rest,
            all,
            &format!("unexpected token {:?}", other),
        )),
    }
}

/// An integer may begin an indirect reference (`id gen R`). Only commit to
/// the reference reading when the full three-token pattern is present.
fn parse_integer_or_reference(first: i64, rest: &[u8]) -> Result<(Object, &[u8])> {
    if (0..=u32::MAX as i64).contains(&first) {
        if let Ok((after_gen, Token::Integer(gen))) = lexer::next_token(rest) {
            if (0..=u16::MAX as i64).contains(&gen) {
                if let Ok((after_r, Token::R)) = lexer::next_token(after_gen) {
                    return Ok((
                        Object::Reference(ObjectRef::new(first as u32, gen as u16)),
                        after_r,
                    ));
                }
            }
        }
    }
    Ok((Object::Integer(first), rest))
}

fn parse_array<'a>(mut input: &'a [u8], all: &'a [u8]) -> Result<(Object, &'a [u8])> {
    let mut items = Vec::new();
    loop {
        let (rest, token) = lexer::next_token(input)
            .map_err(|_| parse_error(input, all, "unterminated array"))?;
        if token == Token::ArrayEnd {
            return Ok((Object::Array(items), rest));
        }
        let (obj, rest) = parse_object_from_token(token, rest, all)?;
        items.push(obj);
        input = rest;
    }
}

fn parse_dictionary_or_stream<'a>(
    mut input: &'a [u8],
    all: &'a [u8],
) -> Result<(Object, &'a [u8])> {
    let mut dict = Dict::new();
    loop {
        let (rest, token) = lexer::next_token(input)
            .map_err(|_| parse_error(input, all, "unterminated dictionary"))?;
        match token {
            Token::DictEnd => {
                input = rest;
                break;
            },
            Token::Name(key) => {
                let (value, rest) = parse_object(rest)?;
                // First occurrence wins for duplicate keys.
                dict.entry(key).or_insert(value);
                input = rest;
            },
            other => {
                return Err(parse_error(
                    rest,
                    all,
                    &format!("dictionary key must be a name, found {:?}", other),
                ));
            },
        }
    }

    // A `stream` keyword directly after the dictionary turns it into a
    // stream object.
    if let Ok((after_kw, Token::StreamStart)) = lexer::next_token(input) {
        let data_start = skip_stream_eol(after_kw);
        let (data, rest) = read_stream_data(&dict, data_start, all)?;
        return Ok((
            Object::Stream {
                dict,
                data: bytes::Bytes::copy_from_slice(data),
            },
            rest,
        ));
    }

    Ok((Object::Dictionary(dict), input))
}

/// Stream data begins after a single EOL following the `stream` keyword.
fn skip_stream_eol(input: &[u8]) -> &[u8] {
    if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        input
    }
}

/// Slice out stream data using /Length when it is a direct integer,
/// falling back to scanning for `endstream` when it is indirect or wrong.
fn read_stream_data<'a>(
    dict: &Dict,
    input: &'a [u8],
    all: &'a [u8],
) -> Result<(&'a [u8], &'a [u8])> {
    if let Some(len) = dict.get("Length").and_then(|o| o.as_integer()) {
        let len = len.max(0) as usize;
        if len <= input.len() {
            let rest = &input[len..];
            if let Ok((after, Token::StreamEnd)) = lexer::next_token(rest) {
                return Ok((&input[..len], after));
            }
            log::debug!("stream /Length {} not followed by endstream, rescanning", len);
        }
    }

    // Fallback: locate the endstream keyword.
    match find_subslice(input, b"endstream") {
        Some(pos) => {
            let mut end = pos;
            // Strip the EOL that precedes endstream
            if end > 0 && input[end - 1] == b'\n' {
                end -= 1;
            }
            if end > 0 && input[end - 1] == b'\r' {
                end -= 1;
            }
            Ok((&input[..end], &input[pos + b"endstream".len()..]))
        },
        None => Err(parse_error(input, all, "unterminated stream")),
    }
}

pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse an indirect object (`id gen obj ... endobj`) at `offset`.
pub fn parse_indirect_at(data: &[u8], offset: usize) -> Result<(ObjectRef, Object)> {
    let input = data.get(offset..).ok_or(Error::UnexpectedEof)?;
    let (rest, id_token) = lexer::next_token(input).map_err(|_| Error::UnexpectedEof)?;
    let (rest, gen_token) = lexer::next_token(rest).map_err(|_| Error::UnexpectedEof)?;
    let (rest, obj_token) = lexer::next_token(rest).map_err(|_| Error::UnexpectedEof)?;

    let (Token::Integer(id), Token::Integer(gen), Token::ObjStart) =
        (id_token, gen_token, obj_token)
    else {
        return Err(Error::ParseError {
            offset,
            reason: "expected `id gen obj` header".to_string(),
        });
    };

    let (obj, _rest) = parse_object(rest)?;
    Ok((ObjectRef::new(id as u32, gen as u16), obj))
}

/// Extract the objects embedded in an object stream (`/Type /ObjStm`).
///
/// Returns `(object number, object)` pairs in stream order.
pub fn parse_object_stream(stream: &Object) -> Result<Vec<(u32, Object)>> {
    let dict = stream.as_dict().ok_or_else(|| Error::InvalidObjectType {
        expected: "Stream".to_string(),
        found: stream.type_name().to_string(),
    })?;
    let count = dict
        .get("N")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::PdfMalformed("object stream missing /N".to_string()))?;
    let first = dict
        .get("First")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::PdfMalformed("object stream missing /First".to_string()))?
        as usize;

    let data = stream.decode_stream_data()?;
    let header = data.get(..first).ok_or(Error::UnexpectedEof)?;

    // Header: N pairs of "obj-number byte-offset"
    let mut pairs = Vec::with_capacity(count as usize);
    let mut cursor = &header[..];
    for _ in 0..count {
        let (rest, id) = lexer::next_token(cursor).map_err(|_| Error::UnexpectedEof)?;
        let (rest, off) = lexer::next_token(rest).map_err(|_| Error::UnexpectedEof)?;
        let (Token::Integer(id), Token::Integer(off)) = (id, off) else {
            return Err(Error::PdfMalformed("bad object stream header".to_string()));
        };
        pairs.push((id as u32, off as usize));
        cursor = rest;
    }

    let mut objects = Vec::with_capacity(pairs.len());
    for (id, off) in pairs {
        let slice = data.get(first + off..).ok_or(Error::UnexpectedEof)?;
        let (obj, _) = parse_object(slice)?;
        objects.push((id, obj));
    }
    Ok(objects)
}
