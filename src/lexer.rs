//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of PDF byte streams: numbers, strings, names,
//! keywords, and delimiters. Whitespace (space, \t, \r, \n, \0, \f) and
//! comments (% to EOL) are skipped between tokens.
//!
//! Escape sequences inside literal strings are NOT decoded here; the
//! parser owns that so the lexer can hand out borrowed slices.

use nom::{
    bytes::complete::{tag, take_till, take_while},
    character::complete::char,
    combinator::opt,
    sequence::preceded,
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),
    /// Real (floating-point) number (e.g., 3.14, -2.5, .5)
    Real(f64),
    /// Literal string bytes (content of "(Hello)"), escapes undecoded
    LiteralString(&'a [u8]),
    /// Hexadecimal string bytes (content of "<48656C6C6F>")
    HexString(&'a [u8]),
    /// Name (e.g., "Type" from "/Type"), # escapes decoded per spec
    Name(String),
    /// Boolean true keyword
    True,
    /// Boolean false keyword
    False,
    /// Null keyword
    Null,
    /// Array start delimiter [
    ArrayStart,
    /// Array end delimiter ]
    ArrayEnd,
    /// Dictionary start delimiter <<
    DictStart,
    /// Dictionary end delimiter >>
    DictEnd,
    /// Indirect object start keyword "obj"
    ObjStart,
    /// Indirect object end keyword "endobj"
    ObjEnd,
    /// Stream start keyword "stream"
    StreamStart,
    /// Stream end keyword "endstream"
    StreamEnd,
    /// Reference keyword "R" (used in "10 0 R")
    R,
    /// Any other bare keyword (content-stream operators land here)
    Keyword(&'a [u8]),
}

/// PDF whitespace per ISO 32000-1 Table 1.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters per ISO 32000-1 Table 2.
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

/// Skip all whitespace and comments before the next token.
pub fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        let (rest, ws) =
            take_while::<_, _, nom::error::Error<&[u8]>>(is_whitespace)(remaining)
                .unwrap_or((remaining, &[][..]));
        remaining = rest;
        if remaining.first() == Some(&b'%') {
            let (rest, _) = take_till::<_, _, nom::error::Error<&[u8]>>(|c| {
                c == b'\r' || c == b'\n'
            })(remaining)
            .unwrap_or((remaining, &[][..]));
            remaining = rest;
            continue;
        }
        if ws.is_empty() {
            break;
        }
    }
    remaining
}

fn lex_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

/// Parse an integer or real number.
///
/// PDF numbers allow leading +/- signs and numbers starting or ending
/// with the decimal point (.5, 5.).
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, sign) = opt(nom::character::complete::one_of("+-"))(input)?;
    let (rest, int_part) = take_while::<_, _, nom::error::Error<&[u8]>>(|c: u8| {
        c.is_ascii_digit()
    })(rest)?;
    let (rest, frac) = opt(preceded(char('.'), take_while(|c: u8| c.is_ascii_digit())))(rest)?;

    if int_part.is_empty() && frac.map(|f: &[u8]| f.is_empty()).unwrap_or(true) {
        return Err(lex_error(input));
    }

    let int_str = std::str::from_utf8(int_part).map_err(|_| lex_error(input))?;
    if let Some(frac_part) = frac {
        let frac_str = std::str::from_utf8(frac_part).map_err(|_| lex_error(input))?;
        let mut num_str = String::new();
        if sign == Some('-') {
            num_str.push('-');
        }
        num_str.push_str(if int_str.is_empty() { "0" } else { int_str });
        num_str.push('.');
        num_str.push_str(if frac_str.is_empty() { "0" } else { frac_str });
        let num: f64 = num_str.parse().map_err(|_| lex_error(input))?;
        Ok((rest, Token::Real(num)))
    } else {
        let mut num: i64 = int_str.parse().map_err(|_| lex_error(input))?;
        if sign == Some('-') {
            num = -num;
        }
        Ok((rest, Token::Integer(num)))
    }
}

/// Parse a literal string enclosed in balanced parentheses.
///
/// The returned slice is the raw content between the outer parens; `\(`
/// and `\)` do not affect the balance count.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            b'\\' => i += 1, // skip escaped char
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&rest[i + 1..], Token::LiteralString(&rest[..i])));
                }
            },
            _ => {},
        }
        i += 1;
    }
    Err(lex_error(input))
}

/// Parse a hexadecimal string `<...>`. Whitespace inside is preserved and
/// decoded at parser level.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('<')(input)?;
    match rest.iter().position(|&c| c == b'>') {
        Some(end) => Ok((&rest[end + 1..], Token::HexString(&rest[..end]))),
        None => Err(lex_error(input)),
    }
}

/// Parse a name, decoding `#xx` escapes per the spec.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, _) = char('/')(input)?;
    let (rest, raw) = take_while::<_, _, nom::error::Error<&[u8]>>(is_regular)(rest)?;

    let mut name = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            if let Some(hex) = raw.get(i + 1..i + 3) {
                if let Ok(code) = u8::from_str_radix(&String::from_utf8_lossy(hex), 16) {
                    name.push(code as char);
                    i += 3;
                    continue;
                }
            }
        }
        name.push(raw[i] as char);
        i += 1;
    }
    Ok((rest, Token::Name(name)))
}

fn keyword_token(word: &[u8]) -> Token<'_> {
    match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    }
}

/// Read the next token, skipping leading whitespace and comments.
///
/// Returns the remaining input and the token, or an error at end of input.
pub fn next_token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    let Some(&first) = input.first() else {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Eof,
        )));
    };

    match first {
        b'[' => Ok((&input[1..], Token::ArrayStart)),
        b']' => Ok((&input[1..], Token::ArrayEnd)),
        b'(' => parse_literal_string(input),
        b'/' => parse_name(input),
        b'<' => {
            if input.get(1) == Some(&b'<') {
                let (rest, _) = tag::<_, _, nom::error::Error<&[u8]>>("<<")(input)?;
                Ok((rest, Token::DictStart))
            } else {
                parse_hex_string(input)
            }
        },
        b'>' => {
            let (rest, _) = tag::<_, _, nom::error::Error<&[u8]>>(">>")(input)?;
            Ok((rest, Token::DictEnd))
        },
        b'+' | b'-' | b'.' | b'0'..=b'9' => parse_number(input),
        _ => {
            let (rest, word) =
                take_while::<_, _, nom::error::Error<&[u8]>>(is_regular)(input)?;
            if word.is_empty() {
                Err(lex_error(input))
            } else {
                Ok((rest, keyword_token(word)))
            }
        },
    }
}

/// Decode the escape sequences of a literal string body.
pub fn decode_literal_string(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&next) = raw.get(i) else { break };
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' => out.push(b'('),
            b')' => out.push(b')'),
            b'\\' => out.push(b'\\'),
            // Line continuation: backslash-EOL is dropped
            b'\r' => {
                if raw.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
                continue;
            },
            other => out.push(other),
        }
        i += 1;
    }
    out
}

/// Decode a hex string body into bytes, ignoring embedded whitespace.
pub fn decode_hex_string(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() / 2);
    let mut nibble: Option<u8> = None;
    for &b in raw {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => continue,
        };
        match nibble.take() {
            Some(high) => out.push((high << 4) | digit),
            None => nibble = Some(digit),
        }
    }
    // An odd final digit is padded with zero per spec
    if let Some(high) = nibble {
        out.push(high << 4);
    }
    out
}
