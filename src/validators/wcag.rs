//! WCAG 2.1 validation.
//!
//! Implements the success-criterion checks over the shared structure
//! walk: document language and title, structure tree and RoleMap health,
//! reading order, alternative text, tables, headings, lists, sensory
//! wording, language of parts, forms, annotations, link purpose, and
//! focus order. Contrast and font-mapping scans live in their own
//! modules and are invoked from [`WcagValidator::validate`].
//!
//! Every check degrades instead of failing: a document with an odd
//! structure loses one checkpoint (logged at debug), never the scan.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet, Severity, WcagLevel};
use crate::content;
use crate::document::PdfDocument;
use crate::language;
use crate::metadata;
use crate::object::{Dict, ObjectRef};
use crate::structure::figures::FigureAltLookup;
use crate::structure::standards;
use crate::structure::tables::{build_table_model, TableModel};
use crate::structure::walker::{clean_snippet, StructureWalker};
use crate::validators::{contrast, fonts};
use serde_json::json;
use std::collections::HashSet;

const MAX_SCOPE_ISSUES_PER_TABLE: usize = 10;
const MAX_DATA_ISSUES_PER_TABLE: usize = 25;
const MAX_INVALID_TYPE_ISSUES: usize = 25;

/// Generic link texts that fail 2.4.4 even when present.
const GENERIC_LINK_TEXTS: &[&str] = &[
    "click here",
    "here",
    "click",
    "read more",
    "more",
    "link",
    "learn more",
];

/// WCAG 2.1 validator. Owns the per-document caches for one run.
pub struct WcagValidator<'a> {
    doc: &'a PdfDocument,
    walker: StructureWalker<'a>,
    figure_lookup: FigureAltLookup,
    issues: IssueSet,
}

impl<'a> WcagValidator<'a> {
    /// Build the validator and its shared caches.
    pub fn new(doc: &'a PdfDocument) -> Self {
        let walker = StructureWalker::new(doc);
        let figure_lookup = FigureAltLookup::build(&walker);
        Self {
            doc,
            walker,
            figure_lookup,
            issues: IssueSet::new(),
        }
    }

    /// Run all checks and return the collected issues.
    pub fn validate(mut self) -> IssueSet {
        self.check_document_structure();
        self.check_document_language();
        self.check_document_title();
        self.check_structure_tree();
        self.check_reading_order();
        self.check_alternative_text();
        self.check_tables();
        self.check_heading_hierarchy();
        self.check_lists();
        self.check_sensory_characteristics();
        self.check_language_of_parts();
        self.check_form_fields();
        self.check_annotations();
        self.check_link_purpose();
        self.check_focus_order();
        contrast::check_contrast(self.doc, &mut self.issues);
        fonts::check_font_mappings(self.doc, &mut self.issues);
        self.issues
    }

    fn catalog(&self) -> Option<&'a Dict> {
        self.doc.catalog().ok()
    }

    fn add_wcag(&mut self, issue: Issue) {
        self.issues.add(IssueCategory::WcagIssues, issue);
    }

    fn add_pdfua(&mut self, issue: Issue) {
        self.issues.add(IssueCategory::PdfuaIssues, issue);
    }

    // ---- Document-level structure (ISO 14289-1:7.1) ----

    fn check_document_structure(&mut self) {
        let Some(catalog) = self.catalog() else {
            return;
        };

        if self.doc.metadata_stream().is_none() {
            self.add_pdfua(Issue::pdfua(
                "Document lacks metadata stream",
                "ISO 14289-1:7.1",
                Severity::High,
                "Add a metadata stream to the document catalog with PDF/UA identification",
            ));
        }

        match catalog.get("MarkInfo").and_then(|m| self.doc.resolve_dict(m)) {
            None => {
                self.add_pdfua(Issue::pdfua(
                    "Document not marked as tagged",
                    "ISO 14289-1:7.1",
                    Severity::High,
                    "Add MarkInfo dictionary to document catalog with Marked=true",
                ));
            },
            Some(mark_info) => {
                if mark_info.get("Marked").and_then(|m| m.as_bool()) != Some(true) {
                    self.add_pdfua(Issue::pdfua(
                        "Document MarkInfo.Marked is false",
                        "ISO 14289-1:7.1",
                        Severity::High,
                        "Set MarkInfo.Marked to true in document catalog",
                    ));
                }
                if mark_info.get("Suspects").and_then(|s| s.as_bool()) == Some(true) {
                    self.add_pdfua(Issue::pdfua(
                        "Document has Suspects entry set to true",
                        "ISO 14289-1:7.1",
                        Severity::High,
                        "Set Suspects entry to false or remove it",
                    ));
                }
            },
        }

        let display_title = catalog
            .get("ViewerPreferences")
            .and_then(|vp| self.doc.resolve_dict(vp))
            .and_then(|vp| vp.get("DisplayDocTitle"))
            .and_then(|d| d.as_bool())
            == Some(true);
        if !display_title {
            self.add_pdfua(Issue::pdfua(
                "ViewerPreferences.DisplayDocTitle is not set to true",
                "ISO 14289-1:7.1",
                Severity::Medium,
                "Add ViewerPreferences dictionary with DisplayDocTitle=true",
            ));
        }
    }

    // ---- 3.1.1 Language of Page ----

    fn check_document_language(&mut self) {
        let lang = self
            .catalog()
            .and_then(|c| c.get("Lang"))
            .and_then(|l| l.as_text());

        match lang {
            None => {
                self.add_wcag(Issue::wcag(
                    "Document language not specified",
                    "3.1.1",
                    WcagLevel::A,
                    Severity::High,
                    "Set the Lang entry in the document catalog",
                ));
                self.issues.add(
                    IssueCategory::MissingLanguage,
                    Issue::new("Document language not specified", Severity::High).with_page(1),
                );
            },
            Some(lang) if !language::is_valid_lang_tag(&lang) => {
                self.add_wcag(
                    Issue::wcag(
                        format!("Invalid document language code '{}'", lang.trim()),
                        "3.1.1",
                        WcagLevel::A,
                        Severity::High,
                        "Use a valid BCP 47 language tag (e.g., \"en-US\")",
                    )
                    .with_context(lang.trim().to_string()),
                );
                self.issues.add(
                    IssueCategory::MissingLanguage,
                    Issue::new(
                        format!("Invalid document language code '{}'", lang.trim()),
                        Severity::High,
                    )
                    .with_page(1),
                );
            },
            Some(_) => {},
        }
    }

    // ---- 2.4.2 Page Titled ----

    fn check_document_title(&mut self) {
        let xmp = metadata::read_document_xmp(self.doc);
        let has_dc_title = xmp.as_ref().map(|p| p.has_title()).unwrap_or(false);
        if !has_dc_title {
            self.add_wcag(Issue::wcag(
                "Document metadata lacks dc:title entry",
                "2.4.2",
                WcagLevel::A,
                Severity::High,
                "Add dc:title entry to document metadata stream",
            ));
            self.add_pdfua(Issue::pdfua(
                "Document metadata lacks dc:title entry",
                "ISO 14289-1:7.1",
                Severity::High,
                "Add dc:title entry to document metadata stream",
            ));
        }

        let docinfo = self.doc.docinfo();
        let has_info_title = docinfo
            .and_then(|info| info.get("Title"))
            .and_then(|t| t.as_text())
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false);
        if !has_info_title {
            self.add_wcag(Issue::wcag(
                "Document title not specified in info dictionary",
                "2.4.2",
                WcagLevel::A,
                Severity::Medium,
                "Add a Title entry to the document information dictionary",
            ));
            self.issues.add(
                IssueCategory::MissingMetadata,
                Issue::new("Document title not specified in info dictionary", Severity::High)
                    .with_page(1),
            );
        }

        // Author and subject gaps are planner fodder, never auto-fixed.
        let has_author = docinfo
            .and_then(|info| info.get("Author"))
            .and_then(|a| a.as_text())
            .map(|a| !a.trim().is_empty())
            .unwrap_or(false)
            || xmp.as_ref().map(|p| !p.creators.is_empty()).unwrap_or(false);
        if !has_author {
            self.issues.add(
                IssueCategory::MissingMetadata,
                Issue::new("Document author metadata is missing", Severity::Low).with_page(1),
            );
        }
        let has_subject = docinfo
            .and_then(|info| info.get("Subject"))
            .and_then(|s| s.as_text())
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
            || xmp
                .as_ref()
                .map(|p| p.description.is_some())
                .unwrap_or(false);
        if !has_subject {
            self.issues.add(
                IssueCategory::MissingMetadata,
                Issue::new("Document subject metadata is missing", Severity::Low).with_page(1),
            );
        }
    }

    // ---- Structure tree and RoleMap (ISO 14289-1:7.1 / 7.2) ----

    fn check_structure_tree(&mut self) {
        let Some(catalog) = self.catalog() else {
            return;
        };
        if !catalog.contains_key("StructTreeRoot") {
            self.add_pdfua(Issue::pdfua(
                "Document lacks structure tree",
                "ISO 14289-1:7.1",
                Severity::High,
                "Add a structure tree root to the document catalog",
            ));
            self.issues.add(
                IssueCategory::UntaggedContent,
                Issue::new(
                    "Document content is not tagged with a structure tree",
                    Severity::High,
                )
                .with_pages(self.all_page_numbers()),
            );
            return;
        }

        let root_has_children = self
            .walker
            .struct_tree_root()
            .and_then(|root| root.get("K"))
            .map(|k| match self.doc.resolve(k) {
                crate::object::Object::Array(items) => !items.is_empty(),
                crate::object::Object::Null => false,
                _ => true,
            })
            .unwrap_or(false);
        if !root_has_children {
            self.add_pdfua(Issue::pdfua(
                "Structure tree root has no children",
                "ISO 14289-1:7.1",
                Severity::High,
                "Add structure elements to the structure tree",
            ));
        }

        self.check_role_map();
        self.check_structure_element_types();
    }

    fn check_role_map(&mut self) {
        let Some(role_map) = self.walker.role_map().cloned() else {
            return;
        };
        for (key, _target) in &role_map {
            if standards::has_circular_mapping(key, &role_map) {
                self.add_pdfua(Issue::pdfua(
                    format!("Circular mapping detected for structure type: /{}", key),
                    "ISO 14289-1:7.2",
                    Severity::High,
                    "Remove circular mapping in RoleMap dictionary",
                ));
            } else if !standards::is_standard_type(key)
                && !standards::maps_to_standard(key, &role_map)
            {
                self.add_pdfua(Issue::pdfua(
                    format!(
                        "Non-standard structure type /{} does not map to a standard type",
                        key
                    ),
                    "ISO 14289-1:7.2",
                    Severity::Medium,
                    format!("Map /{} to a standard structure type", key),
                ));
            }
        }
    }

    fn check_structure_element_types(&mut self) {
        let role_map = self.walker.role_map().cloned();
        let mut unmapped: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        self.walker.traverse(|element, _| {
            let Some(raw) = element.get("S").and_then(|s| s.as_name()) else {
                return;
            };
            if standards::is_standard_type(raw) {
                return;
            }
            let resolved = standards::resolve_role_type(raw, role_map.as_ref());
            if standards::is_standard_type(&resolved) {
                return;
            }
            if seen.insert(raw.to_string()) {
                unmapped.push(raw.to_string());
            }
        });

        if unmapped.is_empty() {
            return;
        }
        for name in unmapped.iter().take(MAX_INVALID_TYPE_ISSUES) {
            self.add_pdfua(Issue::pdfua(
                format!("Invalid structure type: /{}", name),
                "ISO 14289-1:7.2",
                Severity::Medium,
                "Use a standard structure type or map the custom type in the RoleMap",
            ));
        }
        let mut issue = Issue::new(
            format!(
                "RoleMap does not map {} custom structure type(s) to standard types",
                unmapped.len()
            ),
            Severity::Medium,
        )
        .with_count(unmapped.len());
        issue.meta = Some(json!({ "missingMappings": unmapped }));
        self.issues.add(IssueCategory::RoleMapMissingMappings, issue);
    }

    // ---- 1.3.2 Meaningful Sequence ----

    fn check_reading_order(&mut self) {
        let Some(catalog) = self.catalog() else {
            return;
        };
        if !catalog.contains_key("StructTreeRoot") {
            // Already reported as untagged content.
            return;
        }
        let has_children = self
            .walker
            .struct_tree_root()
            .and_then(|root| root.get("K"))
            .map(|k| match self.doc.resolve(k) {
                crate::object::Object::Array(items) => !items.is_empty(),
                crate::object::Object::Null => false,
                _ => true,
            })
            .unwrap_or(false);
        if !has_children {
            self.add_wcag(Issue::wcag(
                "Reading order not defined",
                "1.3.2",
                WcagLevel::A,
                Severity::High,
                "Define reading order using structure tree",
            ));
            self.issues.add(
                IssueCategory::ReadingOrderIssues,
                Issue::new("Reading order not defined by a structure tree", Severity::High),
            );
        }
    }

    // ---- 1.1.1 Non-text Content ----

    fn check_alternative_text(&mut self) {
        let mut missing_pages: Vec<u32> = Vec::new();
        let mut missing_count = 0usize;

        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            // Ambiguous MCID wiring on a page with described figures must
            // not produce false positives.
            let page_suppressed = self.figure_lookup.page_has_alt_figures(page);

            for (name, xobject_ref, xobject) in self.doc.page_xobjects(page) {
                let Some(dict) = xobject.as_dict() else {
                    continue;
                };
                if dict.get("Subtype").and_then(|s| s.as_name()) != Some("Image") {
                    continue;
                }
                let direct_alt = crate::structure::figures::element_has_alt_text(dict);
                let objr_covered = xobject_ref
                    .map(|r| self.figure_lookup.has_figure_alt_text(r))
                    .unwrap_or(false);
                if direct_alt || objr_covered || page_suppressed {
                    continue;
                }

                missing_count += 1;
                if !missing_pages.contains(&page_num) {
                    missing_pages.push(page_num);
                }
                self.add_wcag(
                    Issue::wcag(
                        format!("Image on page {} lacks alternative text", page_num),
                        "1.1.1",
                        WcagLevel::A,
                        Severity::High,
                        "Add Alt text to the Figure structure element",
                    )
                    .with_page(page_num)
                    .with_context(name),
                );
            }
        }

        if missing_count > 0 {
            self.issues.add(
                IssueCategory::MissingAltText,
                Issue::new(
                    format!("{} image(s) lack alternative text", missing_count),
                    Severity::High,
                )
                .with_count(missing_count)
                .with_pages(missing_pages.clone())
                .with_page(missing_pages[0]),
            );
        }
    }

    // ---- 1.3.1 tables (and ISO 14289-1:7.5) ----

    fn check_tables(&mut self) {
        let mut tables: Vec<(&Dict, Option<u32>)> = Vec::new();
        self.walker.traverse(|element, page_ref| {
            if self.walker.resolved_type(element) == "Table" {
                let page = self.walker.effective_page_number(page_ref, element);
                tables.push((element, page));
            }
        });

        let mut problem_pages: Vec<u32> = Vec::new();
        let mut problem_tables = 0usize;

        for (table_index, &(table, page)) in tables.iter().enumerate() {
            let label = self.walker.element_label(table);
            let Some(model) = build_table_model(&self.walker, table, page) else {
                continue;
            };
            let had_issues = self.assess_table(&model, table_index + 1, label.as_deref());
            if had_issues {
                problem_tables += 1;
                if let Some(page) = model.page {
                    if !problem_pages.contains(&page) {
                        problem_pages.push(page);
                    }
                }
            }
        }

        if problem_tables > 0 {
            self.issues.add(
                IssueCategory::TableIssues,
                Issue::new(
                    format!(
                        "{} table(s) have missing or inconsistent header structure",
                        problem_tables
                    ),
                    Severity::High,
                )
                .with_count(problem_tables)
                .with_pages(problem_pages),
            );
        }
    }

    fn assess_table(
        &mut self,
        model: &TableModel,
        table_index: usize,
        label: Option<&str>,
    ) -> bool {
        let page_text = model
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let table_desc = match label {
            Some(label) => format!("Table \"{}\" on page {}", label, page_text),
            None => format!("Table {} on page {}", table_index, page_text),
        };

        if model.headers().count() == 0 {
            self.add_wcag(
                Issue::wcag(
                    format!("{} has no header cells (TH).", table_desc),
                    "1.3.1",
                    WcagLevel::A,
                    Severity::High,
                    "Add TH elements to define header rows or columns for this table.",
                )
                .with_page_opt(model.page)
                .with_context(label.unwrap_or(&table_desc).to_string()),
            );
            self.add_pdfua(
                Issue::pdfua(
                    format!("{} has no header cells (TH).", table_desc),
                    "ISO 14289-1:7.5",
                    Severity::High,
                    "Define table headers using TH elements to satisfy table accessibility requirements.",
                )
                .with_page_opt(model.page),
            );
            // Per-cell reporting is pointless without any headers.
            return true;
        }

        let mut had_issues = false;
        let mut scope_issues = 0usize;
        let headers: Vec<_> = model.headers().cloned().collect();
        for header in &headers {
            if header.scope.is_none() || model.scope_consistent(header) {
                continue;
            }
            if scope_issues >= MAX_SCOPE_ISSUES_PER_TABLE {
                break;
            }
            scope_issues += 1;
            had_issues = true;
            let scope_text = header.scope.as_deref().unwrap_or("").to_lowercase();
            self.add_wcag(
                Issue::wcag(
                    format!(
                        "{} has a header cell with potentially invalid {} scope.",
                        table_desc, scope_text
                    ),
                    "1.3.1",
                    WcagLevel::A,
                    Severity::Medium,
                    "Review TH scope placement so row/column headers align with the data they describe.",
                )
                .with_page_opt(model.page)
                .with_context(label.unwrap_or(&table_desc).to_string()),
            );
            self.add_pdfua(
                Issue::pdfua(
                    format!(
                        "{} has a header cell with potentially invalid {} scope.",
                        table_desc, scope_text
                    ),
                    "ISO 14289-1:7.5",
                    Severity::Medium,
                    "Ensure header cells correctly describe their row or column scope.",
                )
                .with_page_opt(model.page),
            );
        }

        let mut data_issues = 0usize;
        let data_cells: Vec<_> = model.data_cells().cloned().collect();
        for cell in &data_cells {
            if !model.associated_headers(cell).is_empty() {
                continue;
            }
            if data_issues >= MAX_DATA_ISSUES_PER_TABLE {
                break;
            }
            data_issues += 1;
            had_issues = true;
            let row_num = cell.row_index + 1;
            self.add_wcag(
                Issue::wcag(
                    format!(
                        "{} contains a data cell (row {}) without associated headers.",
                        table_desc, row_num
                    ),
                    "1.3.1",
                    WcagLevel::A,
                    Severity::High,
                    "Associate each TD with header cells using /Headers or clear TH scopes.",
                )
                .with_page_opt(model.page)
                .with_context(label.unwrap_or(&table_desc).to_string()),
            );
            self.add_pdfua(
                Issue::pdfua(
                    format!(
                        "{} contains a data cell (row {}) without associated headers.",
                        table_desc, row_num
                    ),
                    "ISO 14289-1:7.5",
                    Severity::High,
                    "Associate data cells with header cells (e.g., /Headers attributes or TH scopes).",
                )
                .with_page_opt(model.page),
            );
        }
        had_issues
    }

    // ---- 2.4.6 Headings and Labels ----

    fn check_heading_hierarchy(&mut self) {
        let mut headings: Vec<(u32, Option<u32>, Option<String>)> = Vec::new();
        self.walker.traverse(|element, page_ref| {
            let resolved = self.walker.resolved_type(element);
            if let Some(level) = self.walker.heading_level(element, &resolved) {
                headings.push((
                    level,
                    self.walker.effective_page_number(page_ref, element),
                    self.walker.element_label(element),
                ));
            }
        });

        if headings.len() < 2 {
            return;
        }

        let mut structure_problem = false;
        for pair in headings.windows(2) {
            let (prev_level, _, ref prev_label) = pair[0];
            let (level, page, ref label) = pair[1];
            if level <= prev_level + 1 {
                continue;
            }
            structure_problem = true;
            let page_text = page.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string());
            let mut suffix = String::new();
            if let Some(label) = label {
                suffix.push_str(&format!(" (\"{}\")", label));
            }
            if let Some(prev_label) = prev_label {
                suffix.push_str(&format!(" after \"{}\"", prev_label));
            }
            self.add_wcag(
                Issue::wcag(
                    format!(
                        "Non-sequential heading level: H{} followed directly by H{} on page {}{}.",
                        prev_level, level, page_text, suffix
                    ),
                    "2.4.6",
                    WcagLevel::AA,
                    Severity::Medium,
                    "Ensure headings increase by no more than one level at a time (e.g., H2 should follow H1).",
                )
                .with_page_opt(page)
                .with_context_opt(label.clone()),
            );
        }

        if structure_problem {
            self.issues.add(
                IssueCategory::StructureIssues,
                Issue::new("Heading levels skip intermediate levels", Severity::Medium),
            );
        }
    }

    // ---- 1.3.1 lists ----

    fn check_lists(&mut self) {
        let mut findings: Vec<Issue> = Vec::new();
        self.walker.traverse(|element, page_ref| {
            let resolved = self.walker.resolved_type(element);
            match resolved.as_str() {
                "L" => {
                    let has_items = self
                        .walker
                        .child_elements(element)
                        .into_iter()
                        .any(|child| self.walker.resolved_type(child) == "LI");
                    if !has_items {
                        let page = self.walker.effective_page_number(page_ref, element);
                        let page_text =
                            page.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string());
                        findings.push(
                            Issue::wcag(
                                format!("List on page {} lacks list items (LI).", page_text),
                                "1.3.1",
                                WcagLevel::A,
                                Severity::Medium,
                                "Ensure each list (L) element contains one or more list item (LI) children.",
                            )
                            .with_page_opt(page),
                        );
                    }
                },
                "LI" => {
                    let children = self.walker.child_elements(element);
                    let has_label = children
                        .iter()
                        .any(|child| self.walker.resolved_type(child) == "Lbl");
                    let has_body = children
                        .iter()
                        .any(|child| self.walker.resolved_type(child) == "LBody");
                    if has_label && has_body {
                        return;
                    }
                    let page = self.walker.effective_page_number(page_ref, element);
                    let page_text =
                        page.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string());
                    let item_label = self.walker.element_label(element);
                    let suffix = item_label
                        .as_deref()
                        .map(|l| format!(" (\"{}\")", l))
                        .unwrap_or_default();
                    if !has_label {
                        findings.push(
                            Issue::wcag(
                                format!(
                                    "List item{} is missing a label (Lbl) on page {}.",
                                    suffix, page_text
                                ),
                                "1.3.1",
                                WcagLevel::A,
                                Severity::Medium,
                                "Add an Lbl child to each list item to expose the bullet, number, or descriptor.",
                            )
                            .with_page_opt(page)
                            .with_context_opt(item_label.clone()),
                        );
                    }
                    if !has_body {
                        findings.push(
                            Issue::wcag(
                                format!(
                                    "List item{} is missing a body (LBody) on page {}.",
                                    suffix, page_text
                                ),
                                "1.3.1",
                                WcagLevel::A,
                                Severity::Medium,
                                "Include an LBody child for each list item to contain the list content.",
                            )
                            .with_page_opt(page)
                            .with_context_opt(item_label),
                        );
                    }
                },
                _ => {},
            }
        });
        for finding in findings {
            self.add_wcag(finding);
        }
    }

    // ---- 1.3.3 Sensory Characteristics ----

    fn check_sensory_characteristics(&mut self) {
        lazy_static::lazy_static! {
            static ref SENSORY: regex::Regex = regex::Regex::new(
                r"(?i)\b(click|press|tap|select|choose|see|use)\b[^.!?\n]{0,48}?\b(red|green|blue|yellow|orange|purple|pink|brown|gray|grey|round|square|circular|left|right|above|below|top|bottom)\b"
            )
            .expect("sensory regex");
            static ref TEXTUAL_REFERENCE: regex::Regex = regex::Regex::new(
                r#"(?i)\b(labell?ed|named|titled|called)\b|"[^"]+"|'[^']+'"#
            )
            .expect("textual reference regex");
        }

        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            let data = self.doc.page_content(page);
            if data.is_empty() {
                continue;
            }
            let text = content::extract_text(&data);
            if text.trim().is_empty() {
                continue;
            }

            for sentence in text.split(['.', '!', '?', '\n']) {
                let Some(found) = SENSORY.find(sentence) else {
                    continue;
                };
                if TEXTUAL_REFERENCE.is_match(sentence) {
                    continue;
                }
                self.add_wcag(
                    Issue::wcag(
                        format!(
                            "Instructions on page {} rely on sensory characteristics alone.",
                            page_num
                        ),
                        "1.3.3",
                        WcagLevel::A,
                        Severity::Medium,
                        "Reference controls by their label or name, not only by color, shape, or position.",
                    )
                    .with_page(page_num)
                    .with_context(clean_snippet(found.as_str(), 80)),
                );
                // One finding per page is enough signal.
                break;
            }
        }
    }

    // ---- 3.1.2 Language of Parts ----

    fn check_language_of_parts(&mut self) {
        let doc_lang = self
            .catalog()
            .and_then(|c| c.get("Lang"))
            .and_then(|l| l.as_text())
            .unwrap_or_default();

        // Element-level overrides anywhere in the tree.
        let mut element_langs: HashSet<String> = HashSet::new();
        self.walker.traverse(|element, _| {
            if let Some(lang) = element.get("Lang").and_then(|l| l.as_text()) {
                if let Some(normalized) = language::normalize_lang_value(&lang) {
                    element_langs.insert(normalized);
                }
            }
        });

        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            let data = self.doc.page_content(page);
            if data.is_empty() {
                continue;
            }
            let text = content::extract_text(&data);
            let scripts = language::collect_script_hints(&text);
            if scripts.is_empty() {
                continue;
            }

            // Marked-content overrides, structured plus raw fallback.
            let mut mc_langs = content::marked_content_languages(&data);
            for lang in content::raw_marked_content_languages(&self.doc.page_content_raw(page)) {
                mc_langs.insert(lang);
            }

            for script in scripts {
                let covered = language::lang_matches_script(&doc_lang, script)
                    || element_langs
                        .iter()
                        .any(|lang| language::lang_matches_script(lang, script))
                    || mc_langs
                        .iter()
                        .any(|lang| language::lang_matches_script(lang, script));
                if covered {
                    continue;
                }
                let mut issue = Issue::wcag(
                    format!(
                        "Page {} contains {} text without a matching language override.",
                        page_num, script
                    ),
                    "3.1.2",
                    WcagLevel::AA,
                    Severity::Medium,
                    "Add a Lang attribute on the enclosing structure element or a /Lang marked-content override.",
                )
                .with_page(page_num);
                issue.script_hint = Some(script.to_string());
                self.add_wcag(issue);
            }
        }
    }

    // ---- 3.3.2 / 4.1.2 forms ----

    fn check_form_fields(&mut self) {
        let Some(acro_form) = self
            .catalog()
            .and_then(|c| c.get("AcroForm"))
            .and_then(|a| self.doc.resolve_dict(a))
        else {
            return;
        };
        let Some(fields) = acro_form
            .get("Fields")
            .map(|f| self.doc.resolve(f))
            .and_then(|f| f.as_array())
        else {
            return;
        };

        let mut unlabeled = 0usize;
        for field in fields {
            let Some(field_dict) = self.doc.resolve_dict(field) else {
                continue;
            };
            let has_name = field_dict
                .get("T")
                .and_then(|t| t.as_text())
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            if !has_name {
                unlabeled += 1;
                self.add_wcag(Issue::wcag(
                    "Form field lacks label",
                    "3.3.2",
                    WcagLevel::A,
                    Severity::High,
                    "Add a label (T entry) to the form field",
                ));
            }
            let has_tooltip = field_dict
                .get("TU")
                .and_then(|t| t.as_text())
                .map(|t| !t.trim().is_empty())
                .unwrap_or(false);
            if !has_tooltip {
                self.add_wcag(Issue::wcag(
                    "Form field lacks a user-facing description (TU)",
                    "4.1.2",
                    WcagLevel::A,
                    Severity::Medium,
                    "Add a TU entry so assistive technology can announce the field purpose",
                ));
            }
        }

        if unlabeled > 0 {
            self.issues.add(
                IssueCategory::FormIssues,
                Issue::new(
                    format!("{} form field(s) lack labels", unlabeled),
                    Severity::High,
                )
                .with_count(unlabeled),
            );
        }
    }

    // ---- ISO 14289-1:7.18.1 annotations ----

    fn check_annotations(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            for (_, annot) in self.doc.page_annotations(page) {
                let has_contents = annot
                    .get("Contents")
                    .and_then(|c| c.as_text())
                    .map(|c| !c.trim().is_empty())
                    .unwrap_or(false);
                if !has_contents {
                    self.add_pdfua(
                        Issue::pdfua(
                            format!("Annotation on page {} lacks description", page_num),
                            "ISO 14289-1:7.18.1",
                            Severity::Medium,
                            "Add Contents entry to annotation for accessibility",
                        )
                        .with_page(page_num),
                    );
                }
            }
        }
    }

    // ---- 2.4.4 Link Purpose ----

    fn check_link_purpose(&mut self) {
        let mut link_problems = 0usize;
        let mut pages_with_problems: Vec<u32> = Vec::new();

        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            for (_, annot) in self.doc.page_annotations(page) {
                if !is_link_annotation(annot) {
                    continue;
                }
                let text = annot
                    .get("Contents")
                    .and_then(|c| c.as_text())
                    .or_else(|| annot.get("Alt").and_then(|a| a.as_text()))
                    .unwrap_or_default();
                let trimmed = text.trim().to_lowercase();
                let descriptive =
                    !trimmed.is_empty() && !GENERIC_LINK_TEXTS.contains(&trimmed.as_str());
                if descriptive {
                    continue;
                }
                link_problems += 1;
                if !pages_with_problems.contains(&page_num) {
                    pages_with_problems.push(page_num);
                }
                let description = if trimmed.is_empty() {
                    format!("Link on page {} has no descriptive text", page_num)
                } else {
                    format!(
                        "Link on page {} uses generic text \"{}\"",
                        page_num, trimmed
                    )
                };
                self.add_wcag(
                    Issue::wcag(
                        description,
                        "2.4.4",
                        WcagLevel::AA,
                        Severity::Medium,
                        "Give the link a Contents or Alt entry that describes its destination.",
                    )
                    .with_page(page_num),
                );
            }
        }

        if link_problems > 0 {
            self.issues.add(
                IssueCategory::LinkIssues,
                Issue::new(
                    format!("{} link(s) lack descriptive text", link_problems),
                    Severity::Medium,
                )
                .with_count(link_problems)
                .with_pages(pages_with_problems),
            );
        }
    }

    // ---- 2.4.3 Focus Order ----
    //
    // Two heuristics, one issue per inversion:
    //  * per page, the tab traversal implied by /Tabs must not contradict
    //    the row-major reading order of the annotation rectangles;
    //  * across pages, the structure tree's annotation order (via OBJR)
    //    must not jump back to an earlier page.
    // The annotation iteration order follows each page's Annots array.

    fn check_focus_order(&mut self) {
        for (index, page) in self.doc.pages().into_iter().enumerate() {
            let page_num = index as u32 + 1;
            let annots = self.interactive_annotations(page);
            if annots.len() < 2 {
                continue;
            }
            let tabs = self
                .doc
                .page_dict(page)
                .and_then(|d| d.get("Tabs"))
                .and_then(|t| t.as_name());

            let actual: Vec<usize> = match tabs {
                Some("C") => column_major_order(&annots),
                _ => (0..annots.len()).collect(),
            };
            let expected = row_major_order(&annots);
            let rank: Vec<usize> = actual
                .iter()
                .map(|&i| expected.iter().position(|&e| e == i).unwrap_or(0))
                .collect();

            for window in rank.windows(2) {
                if window[1] < window[0] {
                    self.add_wcag(
                        Issue::wcag(
                            format!(
                                "Focus order on page {} does not follow the visual reading order.",
                                page_num
                            ),
                            "2.4.3",
                            WcagLevel::A,
                            Severity::Medium,
                            "Order interactive elements so keyboard focus follows the reading order; prefer Tabs=/S with a matching structure tree.",
                        )
                        .with_page(page_num)
                        .with_context(format!("Tabs={}", tabs.unwrap_or("none"))),
                    );
                }
            }
        }

        // Structure-tree annotation order across pages.
        let mut ordered_pages: Vec<u32> = Vec::new();
        self.walker.traverse(|element, page_ref| {
            let (_, obj_refs) = self.walker.collect_refs(element);
            if obj_refs.is_empty() {
                return;
            }
            if let Some(page) = self.walker.effective_page_number(page_ref, element) {
                for _ in obj_refs {
                    ordered_pages.push(page);
                }
            }
        });
        for window in ordered_pages.windows(2) {
            if window[1] < window[0] {
                self.add_wcag(
                    Issue::wcag(
                        format!(
                            "Focus order jumps back from page {} to page {} in the structure tree.",
                            window[0], window[1]
                        ),
                        "2.4.3",
                        WcagLevel::A,
                        Severity::Medium,
                        "Reorder annotation structure elements so focus progresses through pages in order.",
                    )
                    .with_page(window[1])
                    .with_context(format!("page {} to page {}", window[0], window[1])),
                );
            }
        }
    }

    fn interactive_annotations(&self, page: ObjectRef) -> Vec<[f64; 4]> {
        self.doc
            .page_annotations(page)
            .into_iter()
            .filter(|(_, annot)| {
                matches!(
                    annot.get("Subtype").and_then(|s| s.as_name()),
                    Some("Link") | Some("Widget")
                )
            })
            .filter_map(|(_, annot)| annot_rect(annot))
            .collect()
    }

    fn all_page_numbers(&self) -> Vec<u32> {
        (1..=self.doc.pages().len() as u32).collect()
    }
}

fn is_link_annotation(annot: &Dict) -> bool {
    annot
        .get("Subtype")
        .and_then(|s| s.as_name())
        .map(|s| s.eq_ignore_ascii_case("link"))
        .unwrap_or(false)
}

fn annot_rect(annot: &Dict) -> Option<[f64; 4]> {
    let rect = annot.get("Rect")?.as_array()?;
    if rect.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (i, value) in rect.iter().enumerate() {
        out[i] = value.as_number()?;
    }
    Some(out)
}

/// Indices sorted top-to-bottom then left-to-right (reading order).
fn row_major_order(rects: &[[f64; 4]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| {
        let ya = -rects[a][3];
        let yb = -rects[b][3];
        ya.partial_cmp(&yb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                rects[a][0]
                    .partial_cmp(&rects[b][0])
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    order
}

/// Indices sorted left-to-right then top-to-bottom (column traversal).
fn column_major_order(rects: &[[f64; 4]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| {
        rects[a][0]
            .partial_cmp(&rects[b][0])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                (-rects[a][3])
                    .partial_cmp(&-rects[b][3])
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn issues_for(doc: &PdfDocument) -> IssueSet {
        WcagValidator::new(doc).validate()
    }

    fn criteria(issues: &IssueSet) -> Vec<String> {
        issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter_map(|i| i.criterion.clone())
            .collect()
    }

    #[test]
    fn test_bare_document_flags_language_and_title() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let issues = issues_for(&doc);
        let codes = criteria(&issues);
        assert!(codes.contains(&"3.1.1".to_string()));
        assert!(codes.contains(&"2.4.2".to_string()));
        assert!(!issues.get(IssueCategory::MissingLanguage).is_empty());
        assert!(!issues.get(IssueCategory::UntaggedContent).is_empty());
    }

    #[test]
    fn test_invalid_language_code_flagged() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        doc.catalog_mut()
            .unwrap()
            .insert("Lang".to_string(), Object::text("english-language"));
        let issues = issues_for(&doc);
        let lang_issues: Vec<_> = issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter(|i| i.criterion.as_deref() == Some("3.1.1"))
            .collect();
        assert_eq!(lang_issues.len(), 1);
        assert!(lang_issues[0].description.contains("Invalid"));
    }

    #[test]
    fn test_compliant_language_passes() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        doc.catalog_mut()
            .unwrap()
            .insert("Lang".to_string(), Object::text("en-US"));
        let issues = issues_for(&doc);
        assert!(!criteria(&issues).contains(&"3.1.1".to_string()));
        assert!(issues.get(IssueCategory::MissingLanguage).is_empty());
    }

    #[test]
    fn test_sensory_instructions_flagged() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let stream = doc.add_object(Object::Stream {
            dict: crate::object::Dict::new(),
            data: bytes::Bytes::from_static(
                b"BT (Click the red button above to continue.) Tj ET",
            ),
        });
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Contents".to_string(), Object::Reference(stream));
        let issues = issues_for(&doc);
        let sensory: Vec<_> = issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter(|i| i.criterion.as_deref() == Some("1.3.3"))
            .collect();
        assert_eq!(sensory.len(), 1);
        assert_eq!(sensory[0].level, Some(WcagLevel::A));
    }

    #[test]
    fn test_labeled_instructions_not_flagged() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let stream = doc.add_object(Object::Stream {
            dict: crate::object::Dict::new(),
            data: bytes::Bytes::from_static(
                b"BT (Select the option labeled Start to continue.) Tj (Press Submit when finished.) Tj ET",
            ),
        });
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Contents".to_string(), Object::Reference(stream));
        let issues = issues_for(&doc);
        assert!(!criteria(&issues).contains(&"1.3.3".to_string()));
    }

    #[test]
    fn test_generic_link_text_flagged() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let annot = doc.add_object(Object::dict(vec![
            ("Type", Object::name("Annot")),
            ("Subtype", Object::name("Link")),
            ("Contents", Object::text("click here")),
            (
                "Rect",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(10),
                    Object::Integer(10),
                ]),
            ),
        ]));
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Annots".to_string(), Object::Array(vec![Object::Reference(annot)]));
        let issues = issues_for(&doc);
        assert!(criteria(&issues).contains(&"2.4.4".to_string()));
        assert!(!issues.get(IssueCategory::LinkIssues).is_empty());
    }

    #[test]
    fn test_descriptive_link_passes() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let annot = doc.add_object(Object::dict(vec![
            ("Subtype", Object::name("Link")),
            ("Contents", Object::text("Annual accessibility report (PDF)")),
        ]));
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Annots".to_string(), Object::Array(vec![Object::Reference(annot)]));
        let issues = issues_for(&doc);
        assert!(!criteria(&issues).contains(&"2.4.4".to_string()));
    }

    #[test]
    fn test_form_field_without_name_flagged() {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let field = doc.add_object(Object::dict(vec![("FT", Object::name("Tx"))]));
        doc.catalog_mut().unwrap().insert(
            "AcroForm".to_string(),
            Object::dict(vec![("Fields", Object::Array(vec![Object::Reference(field)]))]),
        );
        let issues = issues_for(&doc);
        let codes = criteria(&issues);
        assert!(codes.contains(&"3.3.2".to_string()));
        assert!(codes.contains(&"4.1.2".to_string()));
        assert!(!issues.get(IssueCategory::FormIssues).is_empty());
    }

    #[test]
    fn test_focus_order_column_tabs_flagged() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(300.0, 800.0).unwrap();
        let rects: Vec<[i64; 4]> = vec![
            [50, 700, 100, 730],
            [50, 600, 100, 630],
            [200, 700, 250, 730],
        ];
        let mut annots = Vec::new();
        for rect in &rects {
            let r = doc.add_object(Object::dict(vec![
                ("Subtype", Object::name("Widget")),
                ("TU", Object::text("field")),
                ("Contents", Object::text("field")),
                (
                    "Rect",
                    Object::Array(rect.iter().map(|&v| Object::Integer(v)).collect()),
                ),
            ]));
            annots.push(Object::Reference(r));
        }
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Annots".to_string(), Object::Array(annots));
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Tabs".to_string(), Object::name("C"));

        let issues = issues_for(&doc);
        let focus: Vec<_> = issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter(|i| i.criterion.as_deref() == Some("2.4.3"))
            .collect();
        assert!(!focus.is_empty());
        assert!(focus.iter().all(|i| i.level == Some(WcagLevel::A)));
    }

    #[test]
    fn test_focus_order_logical_layout_passes() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(300.0, 800.0).unwrap();
        let rects: Vec<[i64; 4]> = vec![
            [50, 700, 100, 730],
            [200, 700, 250, 730],
            [50, 600, 100, 630],
        ];
        let mut annots = Vec::new();
        for rect in &rects {
            let r = doc.add_object(Object::dict(vec![
                ("Subtype", Object::name("Widget")),
                ("Contents", Object::text("field")),
                (
                    "Rect",
                    Object::Array(rect.iter().map(|&v| Object::Integer(v)).collect()),
                ),
            ]));
            annots.push(Object::Reference(r));
        }
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Annots".to_string(), Object::Array(annots));

        let issues = issues_for(&doc);
        assert!(!criteria(&issues).contains(&"2.4.3".to_string()));
    }

    #[test]
    fn test_focus_order_page_jump_flagged() {
        let mut doc = PdfDocument::new();
        let p1 = doc.add_blank_page(300.0, 800.0).unwrap();
        let p2 = doc.add_blank_page(300.0, 800.0).unwrap();

        let mut make_annot = |doc: &mut PdfDocument, page: ObjectRef| {
            let r = doc.add_object(Object::dict(vec![
                ("Subtype", Object::name("Widget")),
                ("Contents", Object::text("field")),
                (
                    "Rect",
                    Object::Array(vec![
                        Object::Integer(50),
                        Object::Integer(700),
                        Object::Integer(100),
                        Object::Integer(730),
                    ]),
                ),
            ]));
            let annots = doc
                .page_dict_mut(page)
                .unwrap()
                .entry("Annots".to_string())
                .or_insert(Object::Array(vec![]));
            annots.as_array_mut().unwrap().push(Object::Reference(r));
            r
        };
        let a1 = make_annot(&mut doc, p1);
        let a2 = make_annot(&mut doc, p2);
        let a3 = make_annot(&mut doc, p1);

        // Structure order: p1.A1 → p2.A1 → p1.A2
        let mut elements = Vec::new();
        for (annot, page) in [(a1, p1), (a2, p2), (a3, p1)] {
            let element = doc.add_object(Object::dict(vec![
                ("Type", Object::name("StructElem")),
                ("S", Object::name("Annot")),
                ("Pg", Object::Reference(page)),
                (
                    "K",
                    Object::dict(vec![
                        ("Type", Object::name("OBJR")),
                        ("Obj", Object::Reference(annot)),
                    ]),
                ),
            ]));
            elements.push(Object::Reference(element));
        }
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Array(elements)),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));

        let issues = issues_for(&doc);
        let focus: Vec<_> = issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter(|i| i.criterion.as_deref() == Some("2.4.3"))
            .collect();
        assert_eq!(focus.len(), 1);
        assert!(focus[0].description.contains("page 2 to page 1"));
    }

    #[test]
    fn test_language_of_parts_script_without_override() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        doc.catalog_mut()
            .unwrap()
            .insert("Lang".to_string(), Object::text("en-US"));
        let cyrillic = "BT (\u{041F}\u{0440}\u{0438}\u{0432}\u{0435}\u{0442}) Tj ET";
        let stream = doc.add_object(Object::Stream {
            dict: crate::object::Dict::new(),
            data: bytes::Bytes::from(cyrillic.as_bytes().to_vec()),
        });
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Contents".to_string(), Object::Reference(stream));

        let issues = issues_for(&doc);
        let parts: Vec<_> = issues
            .get(IssueCategory::WcagIssues)
            .iter()
            .filter(|i| i.criterion.as_deref() == Some("3.1.2"))
            .collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].script_hint.as_deref(), Some("Cyrillic"));
    }

    #[test]
    fn test_language_of_parts_bdc_override_passes() {
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        doc.catalog_mut()
            .unwrap()
            .insert("Lang".to_string(), Object::text("en-US"));
        let body =
            "/Span << /Lang (ru-RU) >> BDC BT (\u{041F}\u{0440}\u{0438}\u{0432}\u{0435}\u{0442}) Tj ET EMC";
        let stream = doc.add_object(Object::Stream {
            dict: crate::object::Dict::new(),
            data: bytes::Bytes::from(body.as_bytes().to_vec()),
        });
        doc.page_dict_mut(page)
            .unwrap()
            .insert("Contents".to_string(), Object::Reference(stream));

        let issues = issues_for(&doc);
        assert!(!criteria(&issues).contains(&"3.1.2".to_string()));
    }
}
