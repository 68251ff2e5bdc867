//! Structure-tree traversal.
//!
//! Depth-first walk over `StructTreeRoot.K` visiting every structure
//! element once, in document order. The walker owns the per-document
//! caches the checks share: the page-number lookup, the RoleMap, and the
//! Pg-inheritance state. `P` back-references are never followed; cycles
//! through `K` are broken with a visited-identity set.

use super::standards;
use crate::document::PdfDocument;
use crate::object::{Dict, Object, ObjectRef};
use std::collections::{HashMap, HashSet};

/// Maximum element nesting depth before a subtree is abandoned.
const MAX_DEPTH: usize = 128;

/// Per-document traversal context. Build once, borrow everywhere.
pub struct StructureWalker<'a> {
    doc: &'a PdfDocument,
    page_numbers: HashMap<ObjectRef, u32>,
    role_map: Option<Dict>,
}

impl<'a> StructureWalker<'a> {
    /// Build the walker and its page/RoleMap caches.
    pub fn new(doc: &'a PdfDocument) -> Self {
        let mut page_numbers = HashMap::new();
        for (index, page) in doc.pages().into_iter().enumerate() {
            page_numbers.insert(page, index as u32 + 1);
        }

        let role_map = doc
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get("StructTreeRoot").cloned())
            .and_then(|root| doc.resolve_dict(&root).cloned())
            .and_then(|root| {
                root.get("RoleMap")
                    .and_then(|rm| doc.resolve_dict(rm).cloned())
            });

        Self {
            doc,
            page_numbers,
            role_map,
        }
    }

    /// The document this walker reads.
    pub fn document(&self) -> &'a PdfDocument {
        self.doc
    }

    /// RoleMap of the structure tree, if present.
    pub fn role_map(&self) -> Option<&Dict> {
        self.role_map.as_ref()
    }

    /// 1-based page number for a page object reference.
    pub fn page_number(&self, page: ObjectRef) -> Option<u32> {
        self.page_numbers.get(&page).copied()
    }

    /// Number of pages known to the lookup.
    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    /// Effective structure type after RoleMap resolution.
    pub fn resolved_type(&self, element: &Dict) -> String {
        let raw = element
            .get("S")
            .and_then(|s| s.as_name())
            .unwrap_or_default();
        standards::resolve_role_type(raw, self.role_map.as_ref())
    }

    /// The structure tree root dictionary, if the catalog has one.
    pub fn struct_tree_root(&self) -> Option<&'a Dict> {
        let catalog = self.doc.catalog().ok()?;
        let root = catalog.get("StructTreeRoot")?;
        self.doc.resolve_dict(root)
    }

    /// Visit every structure element once, depth-first.
    ///
    /// The visitor receives the element dictionary and the nearest `Pg`
    /// reference on the path from the root (not yet converted to a page
    /// number; use [`effective_page_number`](Self::effective_page_number)).
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&'a Dict, Option<ObjectRef>),
    {
        let Some(root) = self.struct_tree_root() else {
            return;
        };
        let Some(kids) = root.get("K") else {
            return;
        };
        let mut visited: HashSet<ObjectRef> = HashSet::new();
        self.walk_node(kids, None, 0, &mut visited, &mut visit);
    }

    fn walk_node<F>(
        &self,
        node: &'a Object,
        current_page: Option<ObjectRef>,
        depth: usize,
        visited: &mut HashSet<ObjectRef>,
        visit: &mut F,
    ) where
        F: FnMut(&'a Dict, Option<ObjectRef>),
    {
        if depth > MAX_DEPTH {
            log::debug!("structure tree deeper than {} levels, stopping", MAX_DEPTH);
            return;
        }

        if let Some(r) = node.as_reference() {
            if !visited.insert(r) {
                log::debug!("structure tree cycle at {}, breaking", r);
                return;
            }
        }

        match self.doc.resolve(node) {
            Object::Dictionary(dict) => {
                let next_page = dict
                    .get("Pg")
                    .and_then(|pg| pg.as_reference())
                    .or(current_page);

                if dict.contains_key("S") {
                    visit(dict, next_page);
                }

                if let Some(kids) = dict.get("K") {
                    self.walk_node(kids, next_page, depth + 1, visited, visit);
                }
            },
            Object::Array(items) => {
                for item in items {
                    self.walk_node(item, current_page, depth + 1, visited, visit);
                }
            },
            _ => {},
        }
    }

    /// Effective page number: the inherited `Pg`, with a descendant scan
    /// as fallback when the caller needs a page and no ancestor had one.
    pub fn effective_page_number(
        &self,
        page_ref: Option<ObjectRef>,
        element: &'a Dict,
    ) -> Option<u32> {
        if let Some(r) = page_ref {
            if let Some(n) = self.page_number(r) {
                return Some(n);
            }
        }
        self.descendant_page_number(element, 0)
    }

    fn descendant_page_number(&self, element: &'a Dict, depth: usize) -> Option<u32> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(pg) = element.get("Pg").and_then(|pg| pg.as_reference()) {
            if let Some(n) = self.page_number(pg) {
                return Some(n);
            }
        }
        for child in self.child_elements(element) {
            if let Some(n) = self.descendant_page_number(child, depth + 1) {
                return Some(n);
            }
        }
        None
    }

    /// Direct child structure elements under `K`, skipping marked-content
    /// wrappers.
    pub fn child_elements(&self, element: &'a Dict) -> Vec<&'a Dict> {
        let mut children = Vec::new();
        let Some(kids) = element.get("K") else {
            return children;
        };
        let mut visited = HashSet::new();
        self.collect_child_elements(kids, &mut children, &mut visited, 0);
        children
    }

    fn collect_child_elements(
        &self,
        node: &'a Object,
        out: &mut Vec<&'a Dict>,
        visited: &mut HashSet<ObjectRef>,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        if let Some(r) = node.as_reference() {
            if !visited.insert(r) {
                return;
            }
        }
        match self.doc.resolve(node) {
            Object::Dictionary(dict) => {
                if dict.contains_key("S") {
                    out.push(dict);
                } else if let Some(kids) = dict.get("K") {
                    self.collect_child_elements(kids, out, visited, depth + 1);
                }
            },
            Object::Array(items) => {
                for item in items {
                    self.collect_child_elements(item, out, visited, depth + 1);
                }
            },
            _ => {},
        }
    }

    /// MCIDs and OBJR targets reachable in an element's `K` tree.
    pub fn collect_refs(&self, element: &Dict) -> (Vec<i64>, Vec<ObjectRef>) {
        let mut mcids = Vec::new();
        let mut obj_refs = Vec::new();
        if let Some(kids) = element.get("K") {
            let mut visited = HashSet::new();
            self.collect_refs_inner(kids, &mut mcids, &mut obj_refs, &mut visited, 0);
        }
        (mcids, obj_refs)
    }

    fn collect_refs_inner(
        &self,
        node: &Object,
        mcids: &mut Vec<i64>,
        obj_refs: &mut Vec<ObjectRef>,
        visited: &mut HashSet<ObjectRef>,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        if let Some(r) = node.as_reference() {
            if !visited.insert(r) {
                return;
            }
        }
        match self.doc.resolve(node) {
            Object::Integer(mcid) => mcids.push(*mcid),
            Object::Dictionary(dict) => {
                match dict.get("Type").and_then(|t| t.as_name()) {
                    Some("MCR") => {
                        if let Some(mcid) = dict.get("MCID").and_then(|m| m.as_integer()) {
                            mcids.push(mcid);
                        }
                    },
                    Some("OBJR") => {
                        if let Some(obj) = dict.get("Obj").and_then(|o| o.as_reference()) {
                            obj_refs.push(obj);
                        }
                    },
                    _ => {},
                }
                if let Some(kids) = dict.get("K") {
                    self.collect_refs_inner(kids, mcids, obj_refs, visited, depth + 1);
                }
            },
            Object::Array(items) => {
                for item in items {
                    self.collect_refs_inner(item, mcids, obj_refs, visited, depth + 1);
                }
            },
            _ => {},
        }
    }

    /// Short human-readable label for an element (ActualText, Alt, or T).
    pub fn element_label(&self, element: &Dict) -> Option<String> {
        for key in ["ActualText", "Alt", "T"] {
            if let Some(text) = element.get(key).and_then(|v| v.as_text()) {
                let snippet = clean_snippet(&text, 80);
                if !snippet.is_empty() {
                    return Some(snippet);
                }
            }
        }
        None
    }

    /// Heading level for an element: `H1`..`H6` by name, or `H` with a
    /// `/Level`-style attribute.
    pub fn heading_level(&self, element: &Dict, resolved_type: &str) -> Option<u32> {
        let bytes = resolved_type.as_bytes();
        if bytes.len() == 2 && bytes[0] == b'H' && bytes[1].is_ascii_digit() {
            let level = (bytes[1] - b'0') as u32;
            if (1..=6).contains(&level) {
                return Some(level);
            }
        }
        if resolved_type == "H" {
            for key in ["Level", "level", "Lvl"] {
                if let Some(level) = element.get(key).and_then(|v| v.as_integer()) {
                    if (1..=6).contains(&level) {
                        return Some(level as u32);
                    }
                }
            }
        }
        None
    }
}

/// Collapse whitespace and clip to a display length.
pub fn clean_snippet(value: &str, limit: usize) -> String {
    let collapsed: String = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        return collapsed;
    }
    let clipped: String = collapsed.chars().take(limit.saturating_sub(1)).collect();
    format!("{}…", clipped.trim_end())
}
