//! Standard structure types and the built-in role mapping table.
//!
//! The type set follows ISO 32000-1 §14.8.4; the custom-to-standard
//! mapping table collects the non-standard tag names that show up in
//! real-world corpora, used both when resolving RoleMaps and when the
//! remediation engine completes one.

use crate::object::Dict;
use std::collections::HashSet;

/// Standard structure types defined by ISO 32000-1:2008, 14.8.4.
pub const STANDARD_STRUCTURE_TYPES: &[&str] = &[
    // Grouping elements
    "Document", "Part", "Art", "Sect", "Div", "BlockQuote", "Caption", "TOC",
    "TOCI", "Index", "NonStruct", "Private",
    // Paragraph-level elements
    "P", "H", "H1", "H2", "H3", "H4", "H5", "H6",
    // List elements
    "L", "LI", "Lbl", "LBody",
    // Table elements
    "Table", "TR", "TH", "TD", "THead", "TBody", "TFoot",
    // Inline elements
    "Span", "Quote", "Note", "Reference", "BibEntry", "Code", "Link", "Annot",
    // Ruby and Warichu (East Asian typography)
    "Ruby", "RB", "RT", "RP", "Warichu", "WT", "WP",
    // Illustration elements
    "Figure", "Formula", "Form",
];

/// Common non-standard tag names and their standard targets.
pub const BUILT_IN_ROLE_MAP: &[(&str, &str)] = &[
    // Annotation-related
    ("Annotation", "Span"),
    ("Annotations", "Span"),
    ("Comment", "Note"),
    ("Highlight", "Span"),
    ("Underline", "Span"),
    ("StrikeOut", "Span"),
    // Artifact-related
    ("Artifact", "NonStruct"),
    ("Artifacts", "NonStruct"),
    ("Background", "NonStruct"),
    ("Decoration", "NonStruct"),
    ("Watermark", "NonStruct"),
    ("PageNumber", "NonStruct"),
    ("Header", "NonStruct"),
    ("Footer", "NonStruct"),
    // Chart and diagram related
    ("Chart", "Figure"),
    ("Graph", "Figure"),
    ("Diagram", "Figure"),
    ("Illustration", "Figure"),
    ("Image", "Figure"),
    ("Photo", "Figure"),
    // Heading variants
    ("Heading", "H"),
    ("Subheading", "H"),
    ("Title", "H1"),
    ("Subtitle", "H2"),
    // Text variants
    ("Text", "P"),
    ("Paragraph", "P"),
    ("Body", "P"),
    ("Content", "Div"),
    // Table variants
    ("TableHeader", "TH"),
    ("TableData", "TD"),
    ("TableCell", "TD"),
    ("Row", "TR"),
    // List variants
    ("ListItem", "LI"),
    ("BulletList", "L"),
    ("NumberedList", "L"),
    // Section variants
    ("Section", "Sect"),
    ("Chapter", "Part"),
    ("Article", "Art"),
    // Form variants
    ("FormField", "Form"),
    ("TextField", "Form"),
    ("CheckBox", "Form"),
    ("RadioButton", "Form"),
    ("PushButton", "Form"),
    // MathML support
    ("Math", "Formula"),
    ("Equation", "Formula"),
];

lazy_static::lazy_static! {
    static ref STANDARD_SET: HashSet<&'static str> =
        STANDARD_STRUCTURE_TYPES.iter().copied().collect();
}

/// Strip the leading slash a structure type may carry.
pub fn normalize_type(name: &str) -> &str {
    name.trim_start_matches('/')
}

/// Check membership in the standard type set.
pub fn is_standard_type(name: &str) -> bool {
    STANDARD_SET.contains(normalize_type(name))
}

/// Built-in standard mapping for a custom type, defaulting to `Div`.
pub fn standard_mapping_for(custom: &str) -> &'static str {
    let normalized = normalize_type(custom);
    BUILT_IN_ROLE_MAP
        .iter()
        .find(|(from, _)| *from == normalized)
        .map(|(_, to)| *to)
        .unwrap_or("Div")
}

/// Resolve a structure type through the RoleMap.
///
/// Walks the mapping chain until a standard type is reached, the chain
/// dies, or a name repeats (cycle). Returns the final name either way, so
/// the result is a standard type or the last reachable custom name.
pub fn resolve_role_type(name: &str, role_map: Option<&Dict>) -> String {
    let mut current = normalize_type(name).to_string();
    if current.is_empty() {
        return current;
    }
    let Some(role_map) = role_map else {
        return current;
    };

    let mut visited: HashSet<String> = HashSet::new();
    loop {
        if is_standard_type(&current) || visited.contains(&current) {
            return current;
        }
        visited.insert(current.clone());
        let Some(mapped) = role_map.get(current.as_str()).and_then(|o| o.as_name()) else {
            return current;
        };
        let mapped = normalize_type(mapped);
        if mapped.is_empty() {
            return current;
        }
        current = mapped.to_string();
    }
}

/// True when the type reaches a standard type through the RoleMap.
pub fn maps_to_standard(name: &str, role_map: &Dict) -> bool {
    is_standard_type(&resolve_role_type(name, Some(role_map)))
}

/// True when resolving the type walks into a cycle before reaching a
/// standard type.
pub fn has_circular_mapping(name: &str, role_map: &Dict) -> bool {
    let mut current = normalize_type(name).to_string();
    let mut visited: HashSet<String> = HashSet::new();
    loop {
        if is_standard_type(&current) {
            return false;
        }
        if !visited.insert(current.clone()) {
            return true;
        }
        match role_map.get(current.as_str()).and_then(|o| o.as_name()) {
            Some(mapped) => current = normalize_type(mapped).to_string(),
            None => return false,
        }
    }
}
