//! Matterhorn Protocol checkpoints (PDF/UA-1).
//!
//! A static registry of the checkpoint table keyed by code, plus the
//! document-level, page-level, structure, font, and annotation checks
//! that operate over the object graph. Issues carry the checkpoint code,
//! its category, the WCAG cross-reference, and a location hint.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet, RoleRemap, Severity};
use crate::document::PdfDocument;
use crate::metadata;
use crate::object::Object;
use crate::structure::standards;
use crate::structure::walker::StructureWalker;

/// One checkpoint of the registry.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    /// Checkpoint code ("01-001")
    pub code: &'static str,
    /// Checkpoint category ("Document", "Page", ...)
    pub category: &'static str,
    /// Failure condition description
    pub description: &'static str,
    /// Severity when the checkpoint fails
    pub severity: Severity,
    /// WCAG cross-reference
    pub wcag: &'static str,
    /// ISO 14289-1 clause the checkpoint reports under
    pub clause: &'static str,
}

/// The checkpoint registry.
pub const CHECKPOINTS: &[Checkpoint] = &[
    // 01: Document-level requirements
    Checkpoint { code: "01-001", category: "Document", description: "Document does not contain a Metadata stream", severity: Severity::High, wcag: "4.1.2", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "01-002", category: "Document", description: "XMP metadata stream does not contain dc:title", severity: Severity::High, wcag: "2.4.2", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "01-003", category: "Document", description: "Document title is not set", severity: Severity::Medium, wcag: "2.4.2", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "01-004", category: "Document", description: "Document language is not set", severity: Severity::High, wcag: "3.1.1", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "01-005", category: "Document", description: "ViewerPreferences dictionary does not contain DisplayDocTitle key", severity: Severity::Medium, wcag: "2.4.2", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "01-006", category: "Document", description: "Suspects entry in MarkInfo dictionary is set to true", severity: Severity::High, wcag: "4.1.2", clause: "ISO 14289-1:7.1" },
    // 02: Page and role mapping requirements
    Checkpoint { code: "02-001", category: "Page", description: "Page does not contain Tabs entry", severity: Severity::Medium, wcag: "1.3.2", clause: "ISO 14289-1:7.2" },
    Checkpoint { code: "02-002", category: "Page", description: "Tabs entry in page dictionary is not set to S", severity: Severity::Medium, wcag: "1.3.2", clause: "ISO 14289-1:7.2" },
    Checkpoint { code: "02-004", category: "Structure", description: "Standard structure type is remapped in the RoleMap", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.2" },
    // 06: Structure tree requirements
    Checkpoint { code: "06-001", category: "Structure", description: "Structure tree root does not contain any children", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.2" },
    Checkpoint { code: "06-002", category: "Structure", description: "Structure element is not mapped to standard structure type", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.2" },
    Checkpoint { code: "06-003", category: "Structure", description: "Structure element does not have proper parent-child relationship", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.2" },
    // 07: Tagged content requirements
    Checkpoint { code: "07-001", category: "Content", description: "Real content is not tagged", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "07-002", category: "Content", description: "Artifact is tagged as real content", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.1" },
    // 09: Graphics requirements
    Checkpoint { code: "09-001", category: "Graphics", description: "Figure does not have alternative text", severity: Severity::High, wcag: "1.1.1", clause: "ISO 14289-1:7.18" },
    Checkpoint { code: "09-002", category: "Graphics", description: "Figure alternative text is empty", severity: Severity::High, wcag: "1.1.1", clause: "ISO 14289-1:7.18" },
    // 13: Graphics state requirements
    Checkpoint { code: "13-001", category: "Graphics State", description: "Graphics state parameter BM has value other than Normal or Compatible", severity: Severity::Medium, wcag: "1.4.3", clause: "ISO 14289-1:7.1" },
    // 14: Font requirements
    Checkpoint { code: "14-001", category: "Font", description: "Font is not embedded", severity: Severity::High, wcag: "1.4.5", clause: "ISO 14289-1:7.11" },
    Checkpoint { code: "14-002", category: "Font", description: "Font does not contain ToUnicode CMap", severity: Severity::High, wcag: "1.4.5", clause: "ISO 14289-1:7.11" },
    Checkpoint { code: "14-003", category: "Font", description: "Glyph is not mapped to Unicode", severity: Severity::High, wcag: "1.4.5", clause: "ISO 14289-1:7.11" },
    // 28: Annotation requirements
    Checkpoint { code: "28-001", category: "Annotation", description: "Annotation does not have Contents or Alt entry", severity: Severity::High, wcag: "1.1.1", clause: "ISO 14289-1:7.18.1" },
    Checkpoint { code: "28-002", category: "Annotation", description: "Annotation is not nested inside structure tree", severity: Severity::High, wcag: "1.3.1", clause: "ISO 14289-1:7.18.1" },
    Checkpoint { code: "28-003", category: "Annotation", description: "Widget annotation does not have TU entry", severity: Severity::Medium, wcag: "4.1.2", clause: "ISO 14289-1:7.18.1" },
    // 31: Optional content requirements
    Checkpoint { code: "31-001", category: "Optional Content", description: "Optional content configuration dictionary does not have Name entry", severity: Severity::Medium, wcag: "1.3.1", clause: "ISO 14289-1:7.1" },
    Checkpoint { code: "31-002", category: "Optional Content", description: "Optional content group does not have Name entry", severity: Severity::Medium, wcag: "1.3.1", clause: "ISO 14289-1:7.1" },
];

/// Look up a checkpoint by code.
pub fn checkpoint(code: &str) -> Option<&'static Checkpoint> {
    CHECKPOINTS.iter().find(|cp| cp.code == code)
}

/// Matterhorn-style PDF/UA validator.
pub struct MatterhornValidator<'a> {
    doc: &'a PdfDocument,
    issues: IssueSet,
}

impl<'a> MatterhornValidator<'a> {
    /// Create a validator for one document.
    pub fn new(doc: &'a PdfDocument) -> Self {
        Self {
            doc,
            issues: IssueSet::new(),
        }
    }

    /// Run all checkpoint checks and return the findings.
    pub fn validate(mut self) -> IssueSet {
        self.check_document_level();
        self.check_page_level();
        self.check_role_map();
        self.check_structure_tree();
        self.check_tagged_content();
        self.check_fonts();
        self.check_annotations();
        self.issues
    }

    fn emit(&mut self, code: &str, location: impl Into<String>) {
        let Some(cp) = checkpoint(code) else {
            log::debug!("unknown checkpoint {}", code);
            return;
        };
        let mut issue = Issue::pdfua(
            cp.description,
            cp.clause,
            cp.severity,
            format!("Resolve Matterhorn checkpoint {} ({})", cp.code, cp.category),
        )
        .with_checkpoint(cp.code)
        .with_location(location);
        issue.wcag_criteria = Some(cp.wcag.to_string());
        issue.meta = Some(serde_json::json!({ "category": cp.category }));
        self.issues.add(IssueCategory::PdfuaIssues, issue);
    }

    fn check_document_level(&mut self) {
        let Ok(catalog) = self.doc.catalog() else {
            return;
        };

        // 01-001: Metadata stream
        if self.doc.metadata_stream().is_none() {
            self.emit("01-001", "Document level");
        }

        // 01-002: dc:title in XMP
        let has_dc_title = metadata::read_document_xmp(self.doc)
            .map(|p| p.has_title())
            .unwrap_or(false);
        if !has_dc_title {
            self.emit("01-002", "XMP metadata");
        }

        // 01-003: docinfo title
        let has_info_title = self
            .doc
            .docinfo()
            .and_then(|info| info.get("Title"))
            .and_then(|t| t.as_text())
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if !has_info_title {
            self.emit("01-003", "Document info");
        }

        // 01-004: document language
        if !catalog.contains_key("Lang") {
            self.emit("01-004", "Document level");
        }

        // 01-005: ViewerPreferences / DisplayDocTitle
        match catalog
            .get("ViewerPreferences")
            .and_then(|vp| self.doc.resolve_dict(vp))
        {
            None => self.emit("01-005", "Document level"),
            Some(vp) => {
                if !vp.contains_key("DisplayDocTitle") {
                    self.emit("01-005", "ViewerPreferences");
                }
            },
        }

        // 01-006: Suspects entry
        if let Some(mark_info) = catalog
            .get("MarkInfo")
            .and_then(|m| self.doc.resolve_dict(m))
        {
            if mark_info.get("Suspects").and_then(|s| s.as_bool()) == Some(true) {
                self.emit("01-006", "MarkInfo");
            }
        }
    }

    fn check_page_level(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            let tabs = self
                .doc
                .page_dict(page)
                .and_then(|d| d.get("Tabs"))
                .and_then(|t| t.as_name());
            match tabs {
                None => self.emit_paged("02-001", page_num),
                Some("S") => {},
                Some(_) => self.emit_paged("02-002", page_num),
            }
        }
    }

    fn emit_paged(&mut self, code: &str, page_num: usize) {
        let Some(cp) = checkpoint(code) else {
            return;
        };
        let mut issue = Issue::pdfua(
            cp.description,
            cp.clause,
            cp.severity,
            format!("Resolve Matterhorn checkpoint {} ({})", cp.code, cp.category),
        )
        .with_checkpoint(cp.code)
        .with_page(page_num as u32)
        .with_location(format!("Page {}", page_num));
        issue.wcag_criteria = Some(cp.wcag.to_string());
        issue.meta = Some(serde_json::json!({ "category": cp.category }));
        self.issues.add(IssueCategory::PdfuaIssues, issue);
    }

    /// 02-004: standard structure types must not be remapped. Collects
    /// every offending key into a single finding.
    fn check_role_map(&mut self) {
        let walker = StructureWalker::new(self.doc);
        let Some(role_map) = walker.role_map() else {
            return;
        };
        let offending: Vec<RoleRemap> = role_map
            .iter()
            .filter(|(key, _)| standards::is_standard_type(key))
            .filter_map(|(key, target)| {
                target.as_name().map(|to| RoleRemap {
                    from: format!("/{}", key),
                    to: format!("/{}", to),
                })
            })
            .collect();
        if offending.is_empty() {
            return;
        }

        let cp = checkpoint("02-004").expect("registered checkpoint");
        let names = offending
            .iter()
            .map(|m| m.from.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut issue = Issue::pdfua(
            format!("{} ({})", cp.description, names),
            cp.clause,
            cp.severity,
            "Remove RoleMap entries whose key is a standard structure type.",
        )
        .with_checkpoint(cp.code)
        .with_location("RoleMap");
        issue.wcag_criteria = Some(cp.wcag.to_string());
        issue.offending_mappings = Some(offending);
        issue.meta = Some(serde_json::json!({ "category": cp.category }));
        self.issues.add(IssueCategory::PdfuaIssues, issue);
    }

    fn check_structure_tree(&mut self) {
        let Ok(catalog) = self.doc.catalog() else {
            return;
        };
        let Some(root) = catalog
            .get("StructTreeRoot")
            .and_then(|r| self.doc.resolve_dict(r))
        else {
            self.emit("06-001", "Document level");
            return;
        };
        let has_children = root
            .get("K")
            .map(|k| match self.doc.resolve(k) {
                Object::Array(items) => !items.is_empty(),
                Object::Null => false,
                _ => true,
            })
            .unwrap_or(false);
        if !has_children {
            self.emit("06-001", "Structure tree root");
        }
    }

    fn check_tagged_content(&mut self) {
        let Ok(catalog) = self.doc.catalog() else {
            return;
        };
        let marked = catalog
            .get("MarkInfo")
            .and_then(|m| self.doc.resolve_dict(m))
            .and_then(|m| m.get("Marked"))
            .and_then(|m| m.as_bool())
            == Some(true);
        if !marked {
            self.emit("07-001", "MarkInfo");
        }
    }

    fn check_fonts(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            for (name, font) in self.doc.page_fonts(page) {
                // 14-001: embedding, judged via the FontDescriptor
                if let Some(descriptor) = font
                    .get("FontDescriptor")
                    .and_then(|d| self.doc.resolve_dict(d))
                {
                    let embedded = ["FontFile", "FontFile2", "FontFile3"]
                        .iter()
                        .any(|key| descriptor.contains_key(*key));
                    if !embedded {
                        self.emit("14-001", format!("Page {}, Font {}", page_num, name));
                    }
                }

                // 14-002: composite fonts need a ToUnicode CMap; the deep
                // CMap usability check is the 7.11 font-mapping scan.
                if font.get("Subtype").and_then(|s| s.as_name()) == Some("Type0")
                    && !font.contains_key("ToUnicode")
                {
                    self.emit("14-002", format!("Page {}, Font {}", page_num, name));
                }
            }
        }
    }

    fn check_annotations(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            for (annot_index, (_, annot)) in
                self.doc.page_annotations(page).into_iter().enumerate()
            {
                let annot_num = annot_index + 1;
                let has_text = ["Contents", "Alt"].iter().any(|key| {
                    annot
                        .get(*key)
                        .and_then(|v| v.as_text())
                        .map(|t| !t.trim().is_empty())
                        .unwrap_or(false)
                });
                if !has_text {
                    self.emit_annot("28-001", page_num, annot_num);
                }

                if annot.get("Subtype").and_then(|s| s.as_name()) == Some("Widget")
                    && !annot.contains_key("TU")
                {
                    self.emit_annot("28-003", page_num, annot_num);
                }
            }
        }
    }

    fn emit_annot(&mut self, code: &str, page_num: usize, annot_num: usize) {
        let Some(cp) = checkpoint(code) else {
            return;
        };
        let mut issue = Issue::pdfua(
            cp.description,
            cp.clause,
            cp.severity,
            format!("Resolve Matterhorn checkpoint {} ({})", cp.code, cp.category),
        )
        .with_checkpoint(cp.code)
        .with_page(page_num as u32)
        .with_location(format!("Page {}, Annotation {}", page_num, annot_num));
        issue.wcag_criteria = Some(cp.wcag.to_string());
        issue.meta = Some(serde_json::json!({ "category": cp.category }));
        self.issues.add(IssueCategory::PdfuaIssues, issue);
    }
}

/// Validate and return the PDF/UA findings.
pub fn validate_matterhorn(doc: &PdfDocument) -> IssueSet {
    MatterhornValidator::new(doc).validate()
}
