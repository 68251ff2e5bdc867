//! PDF object types.
//!
//! The remediation engine mutates these values in place, so dictionaries
//! preserve insertion order (`IndexMap`): when a malformed RoleMap carries
//! duplicate keys, the first occurrence wins and later inserts are ignored
//! at parse time.

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Dictionary type used throughout the object model.
pub type Dict = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs, insertion-ordered)
    Dictionary(Dict),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Raw stream data, still encoded with the dictionary's filters
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name (without the leading slash).
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable dictionary access for Dictionary and Stream objects.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Mutable array access.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number, widening integers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            Object::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Decode a PDF text string to UTF-8, handling the UTF-16BE BOM form.
    pub fn as_text(&self) -> Option<String> {
        let bytes = self.as_string()?;
        Some(decode_text_string(bytes))
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode stream data using the filters named in the stream dictionary.
    ///
    /// Supports FlateDecode and ASCIIHexDecode; other filters return
    /// [`Error::UnsupportedFilter`] so callers can fall back to raw bytes.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict.get("Filter").map(filter_names).unwrap_or_default();
                let mut decoded = trim_leading_stream_whitespace(data).to_vec();
                for filter in &filters {
                    decoded = apply_filter(filter, &decoded)?;
                }
                Ok(decoded)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }

    /// Raw, still-encoded stream bytes. Fallback for content-stream scans
    /// where a filter is unsupported but byte-level regexes still apply.
    pub fn raw_stream_data(&self) -> Option<&[u8]> {
        match self {
            Object::Stream { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Decode a PDF text string: UTF-16BE when BOM-prefixed, PDFDocEncoding
/// approximated as Latin-1 otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Trim leading PDF whitespace from stream data.
///
/// Stream data begins immediately after the EOL marker following "stream",
/// but some generators add extra whitespace characters.
fn trim_leading_stream_whitespace(data: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < data.len() {
        match data[start] {
            0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20 => start += 1,
            _ => break,
        }
    }
    &data[start..]
}

/// The Filter entry can be a single Name or an array of Names.
fn filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}

fn apply_filter(filter: &str, data: &[u8]) -> Result<Vec<u8>> {
    match filter {
        "FlateDecode" | "Fl" => {
            use std::io::Read;
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::Decode(format!("FlateDecode failed: {}", e)))?;
            Ok(out)
        },
        "ASCIIHexDecode" | "AHx" => {
            let mut out = Vec::new();
            let mut nibble: Option<u8> = None;
            for &b in data {
                let digit = match b {
                    b'0'..=b'9' => b - b'0',
                    b'a'..=b'f' => b - b'a' + 10,
                    b'A'..=b'F' => b - b'A' + 10,
                    b'>' => break,
                    0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20 => continue,
                    other => {
                        return Err(Error::Decode(format!(
                            "invalid hex digit 0x{:02X}",
                            other
                        )))
                    },
                };
                match nibble.take() {
                    Some(high) => out.push((high << 4) | digit),
                    None => nibble = Some(digit),
                }
            }
            if let Some(high) = nibble {
                out.push(high << 4);
            }
            Ok(out)
        },
        other => Err(Error::UnsupportedFilter(other.to_string())),
    }
}

/// Flate-compress data for stream output.
pub fn flate_encode(data: &[u8]) -> Vec<u8> {
    use std::io::Write;
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    // Writing to a Vec cannot fail.
    encoder.write_all(data).expect("in-memory flate write");
    encoder.finish().expect("in-memory flate finish")
}

/// Convenience constructors used by the remediation engine.
impl Object {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.trim_start_matches('/').to_string())
    }

    /// Create a String object from UTF-8 text.
    pub fn text(s: &str) -> Object {
        if s.is_ascii() {
            Object::String(s.as_bytes().to_vec())
        } else {
            let mut bytes = vec![0xFE, 0xFF];
            for unit in s.encode_utf16() {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
            Object::String(bytes)
        }
    }

    /// Create a Dictionary object from entries.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        let map: Dict = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Object::Dictionary(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::Name("Type".to_string());
        assert_eq!(obj.as_name(), Some("Type"));
    }

    #[test]
    fn test_name_constructor_strips_slash() {
        assert_eq!(Object::name("/Figure").as_name(), Some("Figure"));
        assert_eq!(Object::name("Figure").as_name(), Some("Figure"));
    }

    #[test]
    fn test_object_number_widening() {
        assert_eq!(Object::Integer(3).as_number(), Some(3.0));
        assert_eq!(Object::Real(0.5).as_number(), Some(0.5));
    }

    #[test]
    fn test_stream_dict_access() {
        let mut dict = Dict::new();
        dict.insert("Length".to_string(), Object::Integer(100));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"stream data"),
        };
        assert_eq!(obj.as_dict().unwrap().get("Length").unwrap().as_integer(), Some(100));
    }

    #[test]
    fn test_duplicate_dict_keys_first_wins() {
        let mut dict = Dict::new();
        dict.entry("Foo".to_string()).or_insert(Object::Name("Bar".to_string()));
        dict.entry("Foo".to_string()).or_insert(Object::Name("Baz".to_string()));
        assert_eq!(dict.get("Foo").unwrap().as_name(), Some("Bar"));
    }

    #[test]
    fn test_decode_text_string_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&bytes), "Hi");
        assert_eq!(decode_text_string(b"Hi"), "Hi");
    }

    #[test]
    fn test_text_constructor_roundtrip() {
        let obj = Object::text("Prüfbericht");
        assert_eq!(obj.as_text().unwrap(), "Prüfbericht");
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let obj = Object::Stream {
            dict: Dict::new(),
            data: bytes::Bytes::from_static(b"Hello"),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_hex_filter() {
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::Name("ASCIIHexDecode".to_string()));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"48656C6C6F>"),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), b"Hello");
    }

    #[test]
    fn test_decode_stream_flate_roundtrip() {
        let payload = b"BT /F1 12 Tf (Hello) Tj ET";
        let compressed = flate_encode(payload);
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from(compressed),
        };
        assert_eq!(obj.decode_stream_data().unwrap(), payload);
    }

    #[test]
    fn test_decode_stream_unsupported_filter() {
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), Object::Name("JBIG2Decode".to_string()));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"\x00\x01"),
        };
        assert!(matches!(obj.decode_stream_data(), Err(Error::UnsupportedFilter(_))));
        assert_eq!(obj.raw_stream_data(), Some(&b"\x00\x01"[..]));
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let result = Object::Integer(42).decode_stream_data();
        match result {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            _ => panic!("Expected InvalidObjectType error"),
        }
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(format!("{}", ObjectRef::new(10, 0)), "10 0 R");
    }
}
