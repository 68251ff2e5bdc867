//! Figure alt-text lookup.
//!
//! One pass over the structure tree records which image XObjects and
//! which marked-content IDs are claimed by a Figure element carrying Alt
//! or ActualText. The 1.1.1 check consults this instead of chasing MCID
//! wiring per image: a Figure that names its image via OBJR counts even
//! when no MCID exists, and an ambiguous MCID mapping never turns into a
//! false positive as long as the Figure itself has alt text.

use super::walker::StructureWalker;
use crate::object::{Dict, ObjectRef};
use std::collections::{HashMap, HashSet};

/// Precomputed alt-text coverage for Figure elements.
#[derive(Debug, Default, Clone)]
pub struct FigureAltLookup {
    /// XObjects referenced via OBJR from an alt-texted Figure
    pub xobject_keys: HashSet<ObjectRef>,
    /// MCIDs claimed per page by alt-texted Figures
    pub page_mcids: HashMap<ObjectRef, HashSet<i64>>,
}

impl FigureAltLookup {
    /// Build the lookup for a document.
    pub fn build(walker: &StructureWalker<'_>) -> Self {
        let mut lookup = FigureAltLookup::default();
        walker.traverse(|element, page_ref| {
            if walker.resolved_type(element) != "Figure" {
                return;
            }
            if !element_has_alt_text(element) {
                return;
            }
            let (mcids, obj_refs) = walker.collect_refs(element);
            if let Some(page) = page_ref {
                let entry = lookup.page_mcids.entry(page).or_default();
                for mcid in mcids {
                    entry.insert(mcid);
                }
            }
            for obj_ref in obj_refs {
                lookup.xobject_keys.insert(obj_ref);
            }
        });
        lookup
    }

    /// True when the image XObject is covered by an alt-texted Figure.
    pub fn has_figure_alt_text(&self, xobject: ObjectRef) -> bool {
        self.xobject_keys.contains(&xobject)
    }

    /// True when any Figure on the page carries alt text at all.
    ///
    /// Used to suppress per-image findings when MCID/OBJR wiring is
    /// incomplete but the page clearly has described figures.
    pub fn page_has_alt_figures(&self, page: ObjectRef) -> bool {
        self.page_mcids
            .get(&page)
            .map(|mcids| !mcids.is_empty())
            .unwrap_or(false)
    }

    /// Whether any alt-texted Figure exists anywhere in the tree.
    pub fn any_alt_figures(&self) -> bool {
        !self.xobject_keys.is_empty() || self.page_mcids.values().any(|m| !m.is_empty())
    }
}

/// Alt or ActualText present and non-blank.
pub fn element_has_alt_text(element: &Dict) -> bool {
    for key in ["Alt", "ActualText"] {
        if let Some(text) = element.get(key).and_then(|v| v.as_text()) {
            if !text.trim().is_empty() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;
    use crate::object::Object;

    fn doc_with_figure(alt: Option<&str>, use_objr: bool) -> (PdfDocument, ObjectRef, ObjectRef) {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let image = doc.add_object(Object::dict(vec![
            ("Type", Object::name("XObject")),
            ("Subtype", Object::name("Image")),
        ]));

        let mut entries = vec![
            ("S", Object::name("Figure")),
            ("Pg", Object::Reference(page)),
        ];
        if let Some(alt) = alt {
            entries.push(("Alt", Object::text(alt)));
        }
        let kids = if use_objr {
            Object::dict(vec![
                ("Type", Object::name("OBJR")),
                ("Obj", Object::Reference(image)),
            ])
        } else {
            Object::Integer(3)
        };
        entries.push(("K", kids));
        let figure = doc.add_object(Object::Dictionary(
            entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ));
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Reference(figure)),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));
        (doc, image, page)
    }

    #[test]
    fn test_objr_figure_with_alt_covers_image() {
        let (doc, image, _) = doc_with_figure(Some("logo"), true);
        let walker = StructureWalker::new(&doc);
        let lookup = FigureAltLookup::build(&walker);
        assert!(lookup.has_figure_alt_text(image));
        assert!(lookup.any_alt_figures());
    }

    #[test]
    fn test_figure_without_alt_covers_nothing() {
        let (doc, image, _) = doc_with_figure(None, true);
        let walker = StructureWalker::new(&doc);
        let lookup = FigureAltLookup::build(&walker);
        assert!(!lookup.has_figure_alt_text(image));
        assert!(!lookup.any_alt_figures());
    }

    #[test]
    fn test_mcid_figure_records_page_mcids() {
        let (doc, image, page) = doc_with_figure(Some("chart"), false);
        let walker = StructureWalker::new(&doc);
        let lookup = FigureAltLookup::build(&walker);
        assert!(!lookup.has_figure_alt_text(image));
        assert!(lookup.page_has_alt_figures(page));
        assert!(lookup.page_mcids.get(&page).unwrap().contains(&3));
    }

    #[test]
    fn test_blank_alt_does_not_count() {
        let (doc, image, _) = doc_with_figure(Some("   "), true);
        let walker = StructureWalker::new(&doc);
        let lookup = FigureAltLookup::build(&walker);
        assert!(!lookup.has_figure_alt_text(image));
    }

    #[test]
    fn test_role_mapped_figure_counts() {
        let (mut doc, image, _) = doc_with_figure(Some("photo"), true);
        // Rename the Figure to a custom type mapped through the RoleMap.
        let mut figure_ref = None;
        for (id, obj) in doc.iter_objects() {
            if obj.as_dict().and_then(|d| d.get("S")).and_then(|s| s.as_name()) == Some("Figure") {
                figure_ref = Some(ObjectRef::new(id, 0));
            }
        }
        let figure_ref = figure_ref.unwrap();
        doc.object_mut(figure_ref)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .insert("S".to_string(), Object::name("Photo"));

        let struct_root_ref = doc
            .catalog()
            .unwrap()
            .get("StructTreeRoot")
            .and_then(|o| o.as_reference())
            .unwrap();
        doc.object_mut(struct_root_ref)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .insert(
                "RoleMap".to_string(),
                Object::dict(vec![("Photo", Object::name("Figure"))]),
            );

        let walker = StructureWalker::new(&doc);
        let lookup = FigureAltLookup::build(&walker);
        assert!(lookup.has_figure_alt_text(image));
    }
}
