//! PDF/A-1 validation (ISO 19005-1).
//!
//! File-structure, color, font, transparency, action, metadata, and
//! encryption checks. Findings are classified critical / error / warning;
//! the document is valid when no critical or error findings exist.

use crate::analysis::issue::{Issue, Severity};
use crate::document::PdfDocument;
use crate::metadata;
use crate::object::Object;
use serde::{Deserialize, Serialize};

/// PDF/A finding classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfaClass {
    /// Fails conformance outright
    Critical,
    /// Fails conformance
    Error,
    /// Advisory only
    Warning,
}

/// Per-class finding counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PdfaSummary {
    /// Critical findings
    pub critical: usize,
    /// Error findings
    pub error: usize,
    /// Warning findings
    pub warning: usize,
}

/// Outcome of a PDF/A validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfaValidationResult {
    /// True when no critical or error findings exist
    pub is_valid: bool,
    /// Claimed conformance from XMP ("PDF/A-1B") or "None"
    pub conformance_level: String,
    /// Findings, in check order
    pub issues: Vec<Issue>,
    /// Per-class counts
    pub summary: PdfaSummary,
}

/// Actions PDF/A-1 forbids.
const FORBIDDEN_ACTIONS: &[&str] = &[
    "Launch",
    "Sound",
    "Movie",
    "ResetForm",
    "ImportData",
    "JavaScript",
];

/// Annotation subtypes PDF/A-1 forbids.
const FORBIDDEN_ANNOTATIONS: &[&str] = &["Movie", "Sound", "FileAttachment"];

struct PdfaValidator<'a> {
    doc: &'a PdfDocument,
    issues: Vec<Issue>,
    summary: PdfaSummary,
}

impl<'a> PdfaValidator<'a> {
    fn add(&mut self, class: PdfaClass, mut issue: Issue) {
        issue.severity = match class {
            PdfaClass::Critical => Severity::Critical,
            PdfaClass::Error => Severity::High,
            PdfaClass::Warning => Severity::Low,
        };
        issue.meta = Some(serde_json::json!({
            "pdfaSeverity": match class {
                PdfaClass::Critical => "critical",
                PdfaClass::Error => "error",
                PdfaClass::Warning => "warning",
            }
        }));
        match class {
            PdfaClass::Critical => self.summary.critical += 1,
            PdfaClass::Error => self.summary.error += 1,
            PdfaClass::Warning => self.summary.warning += 1,
        }
        self.issues.push(issue);
    }

    fn check_file_structure(&mut self) {
        let (major, minor) = self.doc.effective_version();
        if (major, minor) > (1, 4) {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    format!("PDF version {}.{} exceeds PDF/A-1 limit (1.4)", major, minor),
                    "ISO 19005-1:2005, 6.1.2",
                    Severity::High,
                    "Convert document to PDF 1.4 or target PDF/A-2/3",
                ),
            );
        }
    }

    fn check_encryption(&mut self) {
        if self.doc.trailer().contains_key("Encrypt") {
            self.add(
                PdfaClass::Critical,
                Issue::pdfa(
                    "Document is encrypted (not allowed in PDF/A)",
                    "ISO 19005-1:2005, 6.1.3",
                    Severity::Critical,
                    "Remove encryption from document",
                ),
            );
        }
    }

    fn check_output_intents(&mut self) {
        let Ok(catalog) = self.doc.catalog() else {
            return;
        };
        let Some(intents) = catalog
            .get("OutputIntents")
            .map(|o| self.doc.resolve(o))
            .and_then(|o| o.as_array())
        else {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    "Document lacks OutputIntents (required for PDF/A)",
                    "ISO 19005-1:2005, 6.2.2",
                    Severity::High,
                    "Add ICC color profile as OutputIntent",
                ),
            );
            return;
        };
        if intents.is_empty() {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    "OutputIntents array is empty",
                    "ISO 19005-1:2005, 6.2.2",
                    Severity::High,
                    "Add at least one OutputIntent with ICC profile",
                ),
            );
            return;
        }

        let pdfa_intent = intents.iter().find(|intent| {
            self.doc
                .resolve_dict(intent)
                .and_then(|d| d.get("S"))
                .and_then(|s| s.as_name())
                == Some("GTS_PDFA1")
        });
        let Some(intent) = pdfa_intent.and_then(|i| self.doc.resolve_dict(i)) else {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    "No OutputIntent with subtype GTS_PDFA1",
                    "ISO 19005-1:2005, 6.2.2",
                    Severity::High,
                    "Add an OutputIntent with /S /GTS_PDFA1",
                ),
            );
            return;
        };

        let has_profile = intent
            .get("DestOutputProfile")
            .map(|p| matches!(self.doc.resolve(p), Object::Stream { .. }))
            .unwrap_or(false);
        if !has_profile {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    "OutputIntent lacks ICC color profile",
                    "ISO 19005-1:2005, 6.2.2",
                    Severity::High,
                    "Embed ICC color profile in OutputIntent",
                ),
            );
        }
        if !intent.contains_key("OutputConditionIdentifier") {
            self.add(
                PdfaClass::Error,
                Issue::pdfa(
                    "OutputIntent lacks OutputConditionIdentifier",
                    "ISO 19005-1:2005, 6.2.2",
                    Severity::High,
                    "Add OutputConditionIdentifier to OutputIntent",
                ),
            );
        }
    }

    fn check_fonts(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            for (name, font) in self.doc.page_fonts(page) {
                let Some(descriptor) = font
                    .get("FontDescriptor")
                    .and_then(|d| self.doc.resolve_dict(d))
                else {
                    continue;
                };
                let embedded = ["FontFile", "FontFile2", "FontFile3"]
                    .iter()
                    .any(|key| descriptor.contains_key(*key));
                if !embedded {
                    self.add(
                        PdfaClass::Critical,
                        Issue::pdfa(
                            format!("Font {} on page {} is not embedded", name, page_num),
                            "ISO 19005-1:2005, 6.3.5",
                            Severity::Critical,
                            "Embed all fonts used in the document",
                        )
                        .with_page(page_num as u32),
                    );
                    continue;
                }

                let symbolic_without_unicode = font
                    .get("Encoding")
                    .and_then(|e| e.as_name())
                    .map(|e| e.contains("Symbol"))
                    .unwrap_or(false)
                    && !font.contains_key("ToUnicode");
                if symbolic_without_unicode {
                    self.add(
                        PdfaClass::Error,
                        Issue::pdfa(
                            format!("Symbolic font {} lacks ToUnicode mapping", name),
                            "ISO 19005-1:2005, 6.3.6",
                            Severity::High,
                            "Add ToUnicode CMap for text extraction",
                        )
                        .with_page(page_num as u32),
                    );
                }
            }
        }
    }

    fn check_transparency(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            let Some(page_dict) = self.doc.page_dict(page) else {
                continue;
            };

            let transparency_group = page_dict
                .get("Group")
                .and_then(|g| self.doc.resolve_dict(g))
                .and_then(|g| g.get("S"))
                .and_then(|s| s.as_name())
                == Some("Transparency");
            if transparency_group {
                self.add(
                    PdfaClass::Error,
                    Issue::pdfa(
                        format!("Page {} uses transparency (not allowed in PDF/A-1)", page_num),
                        "ISO 19005-1:2005, 6.4",
                        Severity::High,
                        "Flatten transparency or target PDF/A-2/3",
                    )
                    .with_page(page_num as u32),
                );
            }

            let ext_gstates = page_dict
                .get("Resources")
                .and_then(|r| self.doc.resolve_dict(r))
                .and_then(|r| r.get("ExtGState"))
                .and_then(|e| self.doc.resolve_dict(e));
            if let Some(ext_gstates) = ext_gstates {
                for (_, gs) in ext_gstates {
                    let Some(gs) = self.doc.resolve_dict(gs) else {
                        continue;
                    };
                    if let Some(bm) = gs.get("BM").and_then(|b| b.as_name()) {
                        if bm != "Normal" && bm != "Compatible" {
                            self.add(
                                PdfaClass::Error,
                                Issue::pdfa(
                                    format!("Page {} uses blend mode /{}", page_num, bm),
                                    "ISO 19005-1:2005, 6.4",
                                    Severity::High,
                                    "Use only Normal/Compatible blend modes",
                                )
                                .with_page(page_num as u32),
                            );
                        }
                    }
                }
            }
        }
    }

    fn check_actions(&mut self) {
        let Ok(catalog) = self.doc.catalog() else {
            return;
        };
        if let Some(action_type) = catalog
            .get("OpenAction")
            .and_then(|a| self.doc.resolve_dict(a))
            .and_then(|a| a.get("S"))
            .and_then(|s| s.as_name())
        {
            if FORBIDDEN_ACTIONS.contains(&action_type) {
                self.add(
                    PdfaClass::Error,
                    Issue::pdfa(
                        format!("Forbidden action type /{} in OpenAction", action_type),
                        "ISO 19005-1:2005, 6.6.1",
                        Severity::High,
                        "Remove or replace forbidden action types",
                    ),
                );
            }
        }

        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            for (_, annot) in self.doc.page_annotations(page) {
                if let Some(subtype) = annot.get("Subtype").and_then(|s| s.as_name()) {
                    if FORBIDDEN_ANNOTATIONS.contains(&subtype) {
                        self.add(
                            PdfaClass::Error,
                            Issue::pdfa(
                                format!(
                                    "Forbidden annotation type /{} on page {}",
                                    subtype, page_num
                                ),
                                "ISO 19005-1:2005, 6.5.3",
                                Severity::High,
                                "Remove or replace forbidden annotation types",
                            )
                            .with_page(page_num as u32),
                        );
                    }
                }
                if let Some(action_type) = annot
                    .get("A")
                    .and_then(|a| self.doc.resolve_dict(a))
                    .and_then(|a| a.get("S"))
                    .and_then(|s| s.as_name())
                {
                    if FORBIDDEN_ACTIONS.contains(&action_type) {
                        self.add(
                            PdfaClass::Error,
                            Issue::pdfa(
                                format!(
                                    "Forbidden action type /{} in annotation on page {}",
                                    action_type, page_num
                                ),
                                "ISO 19005-1:2005, 6.6.1",
                                Severity::High,
                                "Remove or replace forbidden action types",
                            )
                            .with_page(page_num as u32),
                        );
                    }
                }
            }
        }
    }

    fn check_annotation_appearances(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index + 1;
            for (_, annot) in self.doc.page_annotations(page) {
                if !annot.contains_key("AP") {
                    self.add(
                        PdfaClass::Error,
                        Issue::pdfa(
                            format!("Annotation on page {} lacks appearance stream", page_num),
                            "ISO 19005-1:2005, 6.5.3",
                            Severity::High,
                            "Add appearance stream to annotation",
                        )
                        .with_page(page_num as u32),
                    );
                }
            }
        }
    }

    fn check_metadata(&mut self) {
        if self.doc.metadata_stream().is_none() {
            self.add(
                PdfaClass::Critical,
                Issue::pdfa(
                    "Document lacks XMP metadata stream",
                    "ISO 19005-1:2005, 6.7.3",
                    Severity::Critical,
                    "Add XMP metadata stream to document catalog",
                ),
            );
            return;
        }
        let packet = metadata::read_document_xmp(self.doc).unwrap_or_default();
        if packet.pdfa_part.is_none() {
            self.add(
                PdfaClass::Critical,
                Issue::pdfa(
                    "XMP metadata lacks PDF/A identification (pdfaid:part)",
                    "ISO 19005-1:2005, 6.7.11",
                    Severity::Critical,
                    "Add pdfaid:part and pdfaid:conformance to XMP",
                ),
            );
        }
        if packet.pdfa_conformance.is_none() {
            self.add(
                PdfaClass::Critical,
                Issue::pdfa(
                    "XMP metadata lacks PDF/A conformance level",
                    "ISO 19005-1:2005, 6.7.11",
                    Severity::Critical,
                    "Add pdfaid:conformance (A or B) to XMP",
                ),
            );
        }
        if !packet.has_title() {
            self.add(
                PdfaClass::Warning,
                Issue::pdfa(
                    "XMP metadata lacks dc:title",
                    "ISO 19005-1:2005, 6.7.3",
                    Severity::Low,
                    "Add document title to XMP metadata",
                ),
            );
        }
    }
}

/// Claimed PDF/A conformance level from XMP, or "None".
pub fn detect_conformance_level(doc: &PdfDocument) -> String {
    match metadata::read_document_xmp(doc) {
        Some(packet) => match packet.pdfa_part {
            Some(part) => format!(
                "PDF/A-{}{}",
                part,
                packet.pdfa_conformance.unwrap_or_default()
            ),
            None => "None".to_string(),
        },
        None => "None".to_string(),
    }
}

/// Validate PDF/A-1 conformance.
pub fn validate_pdfa(doc: &PdfDocument) -> PdfaValidationResult {
    let mut validator = PdfaValidator {
        doc,
        issues: Vec::new(),
        summary: PdfaSummary::default(),
    };
    validator.check_file_structure();
    validator.check_encryption();
    validator.check_output_intents();
    validator.check_fonts();
    validator.check_transparency();
    validator.check_annotation_appearances();
    validator.check_actions();
    validator.check_metadata();

    let is_valid = validator.summary.critical == 0 && validator.summary.error == 0;
    PdfaValidationResult {
        is_valid,
        conformance_level: detect_conformance_level(doc),
        issues: validator.issues,
        summary: validator.summary,
    }
}
