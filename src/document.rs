//! PDF document model.
//!
//! [`PdfDocument`] owns the full object graph of an opened file. A
//! document is single-owner: an analyze run holds it from open to close,
//! a fix run from open to save. The remediation engine is the only writer
//! and goes through the `_mut` accessors here.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser;
use crate::xref::{self, XrefEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

static NULL_OBJ: Object = Object::Null;

/// Options for serializing a document to disk.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Flate-compress streams that carry no filter yet. Streams with
    /// existing filters are written back byte-for-byte.
    pub compress_streams: bool,
    /// Kept for call-site parity; linearization is never performed.
    pub linearize: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
            linearize: false,
        }
    }
}

/// An opened PDF document.
#[derive(Debug)]
pub struct PdfDocument {
    path: Option<PathBuf>,
    /// Header version, e.g. (1, 7)
    version: (u8, u8),
    objects: BTreeMap<u32, (u16, Object)>,
    trailer: Dict,
    next_id: u32,
}

impl PdfDocument {
    /// Open a PDF file from disk.
    ///
    /// Fails with [`Error::PdfEncrypted`] when the trailer carries an
    /// `/Encrypt` dictionary and with [`Error::PdfMalformed`] on
    /// structural corruption the reconstruction scan cannot recover from.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mut doc = Self::from_bytes(&data)?;
        doc.path = Some(path.as_ref().to_path_buf());
        Ok(doc)
    }

    /// Parse a PDF from an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = parse_header_version(data)?;
        let table = xref::parse_xref(data)?;

        if table.trailer.contains_key("Encrypt") {
            return Err(Error::PdfEncrypted);
        }

        let mut objects: BTreeMap<u32, (u16, Object)> = BTreeMap::new();
        let mut in_stream: HashMap<u32, Vec<u32>> = HashMap::new();

        for (&id, entry) in &table.entries {
            match entry {
                XrefEntry::Free => {},
                XrefEntry::InFile { offset, .. } => {
                    match parser::parse_indirect_at(data, *offset) {
                        Ok((r, obj)) if r.id == id => {
                            objects.insert(id, (r.gen, obj));
                        },
                        Ok((r, obj)) => {
                            log::debug!("xref offset for {} resolved to object {}", id, r.id);
                            objects.insert(r.id, (r.gen, obj));
                        },
                        Err(err) => {
                            log::debug!("failed to parse object {}: {}", id, err);
                        },
                    }
                },
                XrefEntry::InStream { stream_id, .. } => {
                    in_stream.entry(*stream_id).or_default().push(id);
                },
            }
        }

        // Pull compressed objects out of their object streams.
        for (stream_id, wanted) in in_stream {
            let Some((_, stream)) = objects.get(&stream_id).map(|(g, o)| (*g, o.clone()))
            else {
                log::debug!("object stream {} missing", stream_id);
                continue;
            };
            match parser::parse_object_stream(&stream) {
                Ok(contained) => {
                    let wanted: HashSet<u32> = wanted.into_iter().collect();
                    for (id, obj) in contained {
                        if wanted.contains(&id) {
                            objects.entry(id).or_insert((0, obj));
                        }
                    }
                },
                Err(err) => {
                    log::debug!("failed to decode object stream {}: {}", stream_id, err);
                },
            }
        }

        let mut trailer = table.trailer;

        // Normalize a direct catalog into the object table so catalog_mut
        // always has an indirect target.
        let next_id = objects.keys().max().copied().unwrap_or(0) + 1;
        let mut doc = Self {
            path: None,
            version,
            objects,
            trailer: Dict::new(),
            next_id,
        };
        if let Some(Object::Dictionary(root)) = trailer.get("Root").cloned() {
            let r = doc.add_object(Object::Dictionary(root));
            trailer.insert("Root".to_string(), Object::Reference(r));
        }
        doc.trailer = trailer;

        if doc.catalog().is_err() {
            return Err(Error::PdfMalformed("document has no catalog".to_string()));
        }
        Ok(doc)
    }

    /// Create a minimal empty document (catalog + empty page tree).
    pub fn new() -> Self {
        let mut doc = Self {
            path: None,
            version: (1, 7),
            objects: BTreeMap::new(),
            trailer: Dict::new(),
            next_id: 1,
        };
        let pages = doc.add_object(Object::dict(vec![
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ]));
        let catalog = doc.add_object(Object::dict(vec![
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(pages)),
        ]));
        doc.trailer.insert("Root".to_string(), Object::Reference(catalog));
        doc
    }

    /// Append an empty page and return its reference.
    pub fn add_blank_page(&mut self, width: f64, height: f64) -> Result<ObjectRef> {
        let pages_ref = self
            .catalog()?
            .get("Pages")
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::PdfMalformed("catalog has no /Pages".to_string()))?;

        let page = self.add_object(Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(pages_ref)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
        ]));

        let pages = self
            .object_mut(pages_ref)
            .and_then(|o| o.as_dict_mut())
            .ok_or_else(|| Error::PdfMalformed("broken page tree".to_string()))?;
        match pages.get_mut("Kids").and_then(|o| o.as_array_mut()) {
            Some(kids) => kids.push(Object::Reference(page)),
            None => {
                pages.insert("Kids".to_string(), Object::Array(vec![Object::Reference(page)]));
            },
        }
        let count = pages.get("Count").and_then(|o| o.as_integer()).unwrap_or(0);
        pages.insert("Count".to_string(), Object::Integer(count + 1));
        Ok(page)
    }

    /// Path this document was opened from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Header version, possibly overridden by the catalog `/Version` name.
    pub fn effective_version(&self) -> (u8, u8) {
        if let Ok(catalog) = self.catalog() {
            if let Some(v) = catalog.get("Version").and_then(|o| o.as_name()) {
                if let Some(parsed) = parse_version_name(v) {
                    return parsed;
                }
            }
        }
        self.version
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Look up an indirect object.
    pub fn get(&self, r: ObjectRef) -> Option<&Object> {
        self.objects.get(&r.id).map(|(_, obj)| obj)
    }

    /// Mutable access to an indirect object.
    pub fn object_mut(&mut self, r: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&r.id).map(|(_, obj)| obj)
    }

    /// Replace or insert an object at a specific reference.
    pub fn set_object(&mut self, r: ObjectRef, obj: Object) {
        self.objects.insert(r.id, (r.gen, obj));
        if r.id >= self.next_id {
            self.next_id = r.id + 1;
        }
    }

    /// Store a new indirect object and return its reference.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, (0, obj));
        ObjectRef::new(id, 0)
    }

    /// Alias mirroring the mutation API the fix engine is written against.
    pub fn make_indirect(&mut self, obj: Object) -> ObjectRef {
        self.add_object(obj)
    }

    /// Follow reference chains to the underlying direct object.
    ///
    /// Dangling references resolve to Null; chains are cut at depth 32.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        let mut current = obj;
        for _ in 0..32 {
            match current {
                Object::Reference(r) => match self.get(*r) {
                    Some(next) => current = next,
                    None => return &NULL_OBJ,
                },
                _ => return current,
            }
        }
        log::debug!("reference chain exceeded depth limit");
        &NULL_OBJ
    }

    /// Resolve and view as a dictionary (covers streams too).
    pub fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dict> {
        self.resolve(obj).as_dict()
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dict> {
        let root = self
            .trailer
            .get("Root")
            .ok_or_else(|| Error::PdfMalformed("trailer has no /Root".to_string()))?;
        self.resolve_dict(root)
            .ok_or_else(|| Error::PdfMalformed("catalog is not a dictionary".to_string()))
    }

    /// Mutable catalog access.
    pub fn catalog_mut(&mut self) -> Result<&mut Dict> {
        let r = self
            .trailer
            .get("Root")
            .and_then(|o| o.as_reference())
            .ok_or_else(|| Error::PdfMalformed("trailer has no /Root".to_string()))?;
        self.object_mut(r)
            .and_then(|o| o.as_dict_mut())
            .ok_or_else(|| Error::PdfMalformed("catalog is not a dictionary".to_string()))
    }

    /// The legacy document information dictionary, if present.
    pub fn docinfo(&self) -> Option<&Dict> {
        let info = self.trailer.get("Info")?;
        self.resolve_dict(info)
    }

    /// Document info dictionary, created on demand.
    pub fn docinfo_mut(&mut self) -> &mut Dict {
        let existing = self.trailer.get("Info").and_then(|o| o.as_reference());
        let r = match existing {
            Some(r) if matches!(self.get(r), Some(Object::Dictionary(_))) => r,
            _ => {
                let r = self.add_object(Object::Dictionary(Dict::new()));
                self.trailer.insert("Info".to_string(), Object::Reference(r));
                r
            },
        };
        self.object_mut(r)
            .and_then(|o| o.as_dict_mut())
            .expect("docinfo object just ensured")
    }

    /// Page references in document order.
    pub fn pages(&self) -> Vec<ObjectRef> {
        let mut out = Vec::new();
        let Ok(catalog) = self.catalog() else {
            return out;
        };
        let Some(root) = catalog.get("Pages") else {
            return out;
        };
        let mut visited = HashSet::new();
        self.collect_pages(root, &mut out, &mut visited);
        out
    }

    fn collect_pages(
        &self,
        node: &Object,
        out: &mut Vec<ObjectRef>,
        visited: &mut HashSet<ObjectRef>,
    ) {
        let node_ref = node.as_reference();
        if let Some(r) = node_ref {
            if !visited.insert(r) {
                return;
            }
        }
        let Some(dict) = self.resolve_dict(node) else {
            return;
        };
        match dict.get("Type").and_then(|o| o.as_name()) {
            Some("Pages") => {
                if let Some(kids) = dict.get("Kids").map(|k| self.resolve(k)) {
                    if let Some(kids) = kids.as_array() {
                        for kid in kids {
                            self.collect_pages(kid, out, visited);
                        }
                    }
                }
            },
            _ => {
                // Treat any leaf dictionary as a page; some writers omit /Type.
                if let Some(r) = node_ref {
                    out.push(r);
                }
            },
        }
    }

    /// Page dictionary for a page reference.
    pub fn page_dict(&self, page: ObjectRef) -> Option<&Dict> {
        self.get(page)?.as_dict()
    }

    /// Mutable page dictionary.
    pub fn page_dict_mut(&mut self, page: ObjectRef) -> Option<&mut Dict> {
        self.object_mut(page)?.as_dict_mut()
    }

    /// Annotations on a page: `(reference-if-indirect, dictionary)`.
    pub fn page_annotations(&self, page: ObjectRef) -> Vec<(Option<ObjectRef>, &Dict)> {
        let mut out = Vec::new();
        let Some(dict) = self.page_dict(page) else {
            return out;
        };
        let Some(annots) = dict.get("Annots") else {
            return out;
        };
        let Some(arr) = self.resolve(annots).as_array() else {
            return out;
        };
        for entry in arr {
            match entry {
                Object::Reference(r) => {
                    if let Some(d) = self.get(*r).and_then(|o| o.as_dict()) {
                        out.push((Some(*r), d));
                    }
                },
                Object::Dictionary(d) => out.push((None, d)),
                _ => {},
            }
        }
        out
    }

    /// Look up a resource category on a page, honoring inheritance via
    /// `/Parent`.
    fn page_resource<'a>(&'a self, page: ObjectRef, category: &str) -> Option<&'a Dict> {
        let mut current: Option<&Dict> = self.page_dict(page);
        for _ in 0..32 {
            let dict = current?;
            if let Some(resources) = dict.get("Resources") {
                if let Some(res_dict) = self.resolve_dict(resources) {
                    if let Some(entry) = res_dict.get(category) {
                        return self.resolve_dict(entry);
                    }
                }
            }
            current = dict.get("Parent").and_then(|p| self.resolve_dict(p));
        }
        None
    }

    /// Fonts on a page: `(resource name, font dictionary)`.
    pub fn page_fonts(&self, page: ObjectRef) -> Vec<(String, &Dict)> {
        let Some(fonts) = self.page_resource(page, "Font") else {
            return Vec::new();
        };
        fonts
            .iter()
            .filter_map(|(name, obj)| {
                self.resolve_dict(obj).map(|d| (name.clone(), d))
            })
            .collect()
    }

    /// XObjects on a page: `(resource name, reference, object)`.
    pub fn page_xobjects(&self, page: ObjectRef) -> Vec<(String, Option<ObjectRef>, &Object)> {
        let Some(xobjects) = self.page_resource(page, "XObject") else {
            return Vec::new();
        };
        xobjects
            .iter()
            .map(|(name, obj)| {
                let r = obj.as_reference();
                (name.clone(), r, self.resolve(obj))
            })
            .collect()
    }

    /// Decoded page content, concatenating a Contents array.
    ///
    /// When a stream's filter is unsupported the raw bytes are appended
    /// instead, so byte-level scans still see the data.
    pub fn page_content(&self, page: ObjectRef) -> Vec<u8> {
        let mut out = Vec::new();
        let Some(dict) = self.page_dict(page) else {
            return out;
        };
        let Some(contents) = dict.get("Contents") else {
            return out;
        };
        let resolved = self.resolve(contents);
        let streams: Vec<&Object> = match resolved {
            Object::Array(items) => items.iter().map(|i| self.resolve(i)).collect(),
            other => vec![other],
        };
        for stream in streams {
            match stream.decode_stream_data() {
                Ok(data) => out.extend_from_slice(&data),
                Err(err) => {
                    log::debug!("content stream decode failed: {}", err);
                    if let Some(raw) = stream.raw_stream_data() {
                        out.extend_from_slice(raw);
                    }
                },
            }
            out.push(b'\n');
        }
        out
    }

    /// Raw (still encoded) page content bytes, for regex fallbacks.
    pub fn page_content_raw(&self, page: ObjectRef) -> Vec<u8> {
        let mut out = Vec::new();
        let Some(dict) = self.page_dict(page) else {
            return out;
        };
        let Some(contents) = dict.get("Contents") else {
            return out;
        };
        let resolved = self.resolve(contents);
        let streams: Vec<&Object> = match resolved {
            Object::Array(items) => items.iter().map(|i| self.resolve(i)).collect(),
            other => vec![other],
        };
        for stream in streams {
            if let Some(raw) = stream.raw_stream_data() {
                out.extend_from_slice(raw);
                out.push(b'\n');
            }
        }
        out
    }

    /// The XMP metadata stream object, if attached to the catalog.
    pub fn metadata_stream(&self) -> Option<&Object> {
        let catalog = self.catalog().ok()?;
        let metadata = catalog.get("Metadata")?;
        match self.resolve(metadata) {
            obj @ Object::Stream { .. } => Some(obj),
            _ => None,
        }
    }

    /// Iterate all loaded objects (id, object).
    pub fn iter_objects(&self) -> impl Iterator<Item = (u32, &Object)> {
        self.objects.iter().map(|(&id, (_, obj))| (id, obj))
    }

    /// Number of loaded indirect objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn objects_for_writer(&self) -> &BTreeMap<u32, (u16, Object)> {
        &self.objects
    }

    /// Serialize the document to `dest` with an atomic replace.
    pub fn save<P: AsRef<Path>>(&self, dest: P, options: &SaveOptions) -> Result<()> {
        crate::writer::save_document(self, dest.as_ref(), options)
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_header_version(data: &[u8]) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let pos = parser::find_subslice(window, b"%PDF-")
        .ok_or_else(|| Error::PdfMalformed("missing %PDF header".to_string()))?;
    let version_bytes = &window[pos + 5..];
    let text: String = version_bytes
        .iter()
        .take(3)
        .map(|&b| b as char)
        .collect();
    parse_version_name(&text)
        .ok_or_else(|| Error::PdfMalformed(format!("bad header version '{}'", text)))
}

fn parse_version_name(name: &str) -> Option<(u8, u8)> {
    let mut parts = name.trim().splitn(2, '.');
    let major: u8 = parts.next()?.parse().ok()?;
    let minor: u8 = parts.next()?.parse().ok()?;
    Some((major, minor))
}
