//! Automated remediation engine.
//!
//! Applies the automated fix plan to a document's object graph: language,
//! title and XMP, MarkInfo, ViewerPreferences, the structure-tree
//! scaffold, RoleMap completion, and PDF/A identification. Every sub-fix
//! runs independently; one failure never aborts the others. A sub-fix
//! whose post-condition already holds is skipped and produces no result,
//! so the success count only reflects observable changes.
//!
//! The original upload is never touched: mutations are saved to
//! `<originalPath>.temp` and the caller decides where the file goes.

use crate::analysis::issue::ScanResult;
use crate::document::{PdfDocument, SaveOptions};
use crate::error::{Error, Result};
use crate::fixes::progress::FixProgressTracker;
use crate::fixes::suggestions::{FixPlan, FixType};
use crate::metadata::{self, XmpPacket};
use crate::object::{Dict, Object};
use crate::structure::standards;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scan state handed to a fix run.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    /// Scan identifier
    pub scan_id: String,
    /// Working copy of the document (never the original upload)
    pub file_path: PathBuf,
    /// Original filename for title derivation
    pub original_filename: Option<String>,
    /// Prior scan result, carrying the fix plan
    pub results: Option<ScanResult>,
}

/// Outcome of one sub-fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixResult {
    /// Which engine operation ran
    #[serde(rename = "type")]
    pub fix_type: FixType,
    /// What changed (or why it failed)
    pub description: String,
    /// Whether the change was applied
    pub success: bool,
    /// Planner action id this fix satisfies, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<String>,
    /// True when the fix ran without a matching planner action
    pub implicit: bool,
}

/// Result of a whole fix run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FixOutcome {
    /// False only when the run itself failed (open/save errors)
    pub success: bool,
    /// Per-sub-fix results, in application order
    pub fixes_applied: Vec<FixResult>,
    /// Count of successful, observable changes
    pub success_count: usize,
    /// Human-readable summary
    pub message: String,
    /// Caller-safe error text when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Where the remediated file was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_temp_path: Option<PathBuf>,
    /// Post-fix scan, filled in by the orchestrator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_results: Option<ScanResult>,
}

/// Default language applied when none is configured.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// The automated remediation engine.
#[derive(Debug, Default)]
pub struct AutoFixEngine {
    save_options: SaveOptions,
}

impl AutoFixEngine {
    /// Engine with the standard save policy (compress bare streams,
    /// never linearize, preserve existing filters).
    pub fn new() -> Self {
        Self {
            save_options: SaveOptions::default(),
        }
    }

    /// Apply the automated bucket to the document at
    /// `record.file_path`, writing the result to `<path>.temp`.
    pub fn apply_automated_fixes(&self, record: &ScanRecord) -> FixOutcome {
        let mut tracker = FixProgressTracker::new(record.scan_id.clone());
        self.apply_automated_fixes_tracked(record, &mut tracker)
    }

    /// Same as [`apply_automated_fixes`](Self::apply_automated_fixes)
    /// with caller-visible progress.
    pub fn apply_automated_fixes_tracked(
        &self,
        record: &ScanRecord,
        tracker: &mut FixProgressTracker,
    ) -> FixOutcome {
        let plan = record.results.as_ref().and_then(|r| r.fixes.as_ref());
        let temp_path = temp_path_for(&record.file_path);

        let open_step = tracker.add_step("open", "Open the working document");
        tracker.start_step(open_step);
        let mut doc = match PdfDocument::open(&record.file_path) {
            Ok(doc) => {
                tracker.complete_step(open_step, None);
                doc
            },
            Err(err) => {
                tracker.fail_step(open_step, err.user_message());
                tracker.fail_all(err.user_message());
                return FixOutcome {
                    success: false,
                    error: Some(err.user_message()),
                    message: "The document could not be opened for fixing.".to_string(),
                    ..Default::default()
                };
            },
        };

        let mut fixes = Vec::new();
        let title_source = record
            .original_filename
            .clone()
            .or_else(|| {
                record
                    .file_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "document.pdf".to_string());

        self.run_step(tracker, "language", "Ensure catalog language", &mut fixes, || {
            fix_language(&mut doc, plan)
        });
        self.run_step(tracker, "title", "Ensure title and PDF/UA metadata", &mut fixes, || {
            fix_title_and_metadata(&mut doc, &title_source, plan)
        });
        self.run_step(tracker, "markinfo", "Ensure MarkInfo", &mut fixes, || {
            fix_mark_info(&mut doc, plan)
        });
        self.run_step(tracker, "viewerprefs", "Ensure ViewerPreferences", &mut fixes, || {
            fix_viewer_preferences(&mut doc, plan)
        });
        self.run_step(tracker, "structure", "Ensure structure tree scaffold", &mut fixes, || {
            fix_structure_scaffold(&mut doc, plan)
        });
        self.run_step(tracker, "rolemap", "Complete the RoleMap", &mut fixes, || {
            fix_role_map(&mut doc, plan)
        });
        self.run_step(tracker, "pdfa", "PDF/A identifier and metadata consistency", &mut fixes, || {
            fix_pdfa_identifier_and_consistency(&mut doc, plan)
        });

        let save_step = tracker.add_step("save", "Write the fixed document");
        tracker.start_step(save_step);
        if let Err(err) = doc.save(&temp_path, &self.save_options) {
            let _ = std::fs::remove_file(&temp_path);
            tracker.fail_step(save_step, err.user_message());
            tracker.fail_all(err.user_message());
            return FixOutcome {
                success: false,
                error: Some(err.user_message()),
                message: "The fixed document could not be saved.".to_string(),
                fixes_applied: fixes,
                ..Default::default()
            };
        }
        tracker.complete_step(save_step, Some(temp_path.display().to_string()));
        tracker.complete_all();

        let success_count = fixes.iter().filter(|f| f.success).count();
        FixOutcome {
            success: true,
            message: format!("Successfully applied {} automated fixes", success_count),
            success_count,
            fixes_applied: fixes,
            fixed_temp_path: Some(temp_path),
            error: None,
            scan_results: None,
        }
    }

    fn run_step<F>(
        &self,
        tracker: &mut FixProgressTracker,
        name: &str,
        description: &str,
        fixes: &mut Vec<FixResult>,
        f: F,
    ) where
        F: FnOnce() -> Result<Vec<FixResult>>,
    {
        let step = tracker.add_step(name, description);
        tracker.start_step(step);
        match f() {
            Ok(step_fixes) if step_fixes.is_empty() => {
                tracker.skip_step(step, "already satisfied");
            },
            Ok(step_fixes) => {
                tracker.complete_step(step, Some(format!("{} change(s)", step_fixes.len())));
                fixes.extend(step_fixes);
            },
            Err(err) => {
                log::debug!("sub-fix {} failed: {}", name, err);
                tracker.fail_step(step, err.user_message());
            },
        }
    }

    /// Apply a single user-directed fix and atomically replace `path`.
    pub fn apply_manual_fix(
        &self,
        path: &Path,
        fix_type: FixType,
        fix_data: &serde_json::Value,
        page: u32,
    ) -> FixOutcome {
        let mut doc = match PdfDocument::open(path) {
            Ok(doc) => doc,
            Err(err) => {
                return FixOutcome {
                    success: false,
                    error: Some(err.user_message()),
                    message: "The document could not be opened for fixing.".to_string(),
                    ..Default::default()
                };
            },
        };

        let applied = match fix_type {
            FixType::AddAltText => apply_alt_text(&mut doc, fix_data, page),
            FixType::AddFormLabel => apply_form_label(&mut doc, fix_data),
            FixType::AddOutputIntent => apply_output_intent(&mut doc),
            FixType::TagContent | FixType::FixStructure => apply_basic_tagging(&mut doc),
            _ => apply_basic_tagging(&mut doc),
        };

        let description = match &applied {
            Ok(Some(description)) => description.clone(),
            Ok(None) => {
                return FixOutcome {
                    success: false,
                    message: "The requested fix was not applicable.".to_string(),
                    error: Some("The requested fix was not applicable.".to_string()),
                    ..Default::default()
                };
            },
            Err(err) => {
                return FixOutcome {
                    success: false,
                    message: "The fix could not be applied.".to_string(),
                    error: Some(err.user_message()),
                    ..Default::default()
                };
            },
        };

        let temp_path = temp_path_for(path);
        if let Err(err) = doc.save(&temp_path, &self.save_options) {
            let _ = std::fs::remove_file(&temp_path);
            return FixOutcome {
                success: false,
                error: Some(err.user_message()),
                message: "The fixed document could not be saved.".to_string(),
                ..Default::default()
            };
        }
        if let Err(err) = std::fs::rename(&temp_path, path) {
            let _ = std::fs::remove_file(&temp_path);
            return FixOutcome {
                success: false,
                error: Some(Error::from(err).user_message()),
                message: "The fixed document could not be saved.".to_string(),
                ..Default::default()
            };
        }

        FixOutcome {
            success: true,
            message: description.clone(),
            success_count: 1,
            fixes_applied: vec![FixResult {
                fix_type,
                description,
                success: true,
                suggestion_id: None,
                implicit: false,
            }],
            fixed_temp_path: Some(path.to_path_buf()),
            error: None,
            scan_results: None,
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".temp");
    PathBuf::from(s)
}

fn suggestion_id(plan: Option<&FixPlan>, fix_type: FixType) -> (Option<String>, bool) {
    match plan.and_then(|p| p.automated.iter().find(|a| a.fix_type == fix_type)) {
        Some(action) => (Some(action.id.clone()), false),
        None => (None, true),
    }
}

fn result(
    plan: Option<&FixPlan>,
    fix_type: FixType,
    description: impl Into<String>,
) -> FixResult {
    let (suggestion_id, implicit) = suggestion_id(plan, fix_type);
    FixResult {
        fix_type,
        description: description.into(),
        success: true,
        suggestion_id,
        implicit,
    }
}

// ---- Sub-fix 1: language ----

fn fix_language(doc: &mut PdfDocument, plan: Option<&FixPlan>) -> Result<Vec<FixResult>> {
    let language = plan
        .and_then(|p| p.automated.iter().find(|a| a.fix_type == FixType::AddLanguage))
        .and_then(|a| a.fix_data.as_ref())
        .and_then(|d| d.get("language"))
        .and_then(|l| l.as_str())
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();

    let current = doc
        .catalog()?
        .get("Lang")
        .and_then(|l| l.as_text())
        .unwrap_or_default();
    if !current.trim().is_empty() {
        return Ok(vec![]);
    }
    doc.catalog_mut()?
        .insert("Lang".to_string(), Object::text(&language));
    Ok(vec![result(
        plan,
        FixType::AddLanguage,
        format!("Added document language ({})", language),
    )])
}

// ---- Sub-fix 2+3: title, XMP, metadata stream ----

fn derive_title(source: &str) -> String {
    let stem = source
        .rsplit('/')
        .next()
        .unwrap_or(source)
        .trim_end_matches(".pdf")
        .trim_end_matches(".PDF");
    stem.replace(['_', '-'], " ")
}

fn fix_title_and_metadata(
    doc: &mut PdfDocument,
    title_source: &str,
    plan: Option<&FixPlan>,
) -> Result<Vec<FixResult>> {
    let mut fixes = Vec::new();

    let existing_title = doc
        .docinfo()
        .and_then(|info| info.get("Title"))
        .and_then(|t| t.as_text())
        .filter(|t| !t.trim().is_empty());
    let title = existing_title
        .clone()
        .unwrap_or_else(|| derive_title(title_source));

    if existing_title.is_none() {
        doc.docinfo_mut()
            .insert("Title".to_string(), Object::text(&title));
        fixes.push(result(
            plan,
            FixType::AddTitle,
            format!("Added DocInfo title: {}", title),
        ));
    }

    let had_stream = doc.metadata_stream().is_some();
    let original = metadata::read_document_xmp(doc).unwrap_or_default();
    let mut packet = original.clone();

    if !packet.has_title() {
        packet.title = Some(title.clone());
    }
    packet.pdfua_part.get_or_insert_with(|| "1".to_string());
    packet
        .pdfua_conformance
        .get_or_insert_with(|| "A".to_string());

    // Mirror DocInfo fields the packet lacks.
    mirror_docinfo_into_packet(doc, &mut packet);

    if packet != original || !had_stream {
        metadata::write_document_xmp(doc, &packet)?;
        if !had_stream {
            fixes.push(result(
                plan,
                FixType::AddMetadata,
                "Attached XMP metadata stream with dc:title and PDF/UA identifier",
            ));
        } else {
            fixes.push(result(
                plan,
                FixType::AddMetadata,
                "Updated XMP metadata (dc:title, PDF/UA identifier)",
            ));
        }
    }

    Ok(fixes)
}

fn mirror_docinfo_into_packet(doc: &PdfDocument, packet: &mut XmpPacket) {
    let Some(info) = doc.docinfo() else {
        return;
    };
    if packet.creators.is_empty() {
        if let Some(author) = info.get("Author").and_then(|a| a.as_text()) {
            if !author.trim().is_empty() {
                packet.creators.push(author);
            }
        }
    }
    if packet.description.is_none() {
        if let Some(subject) = info.get("Subject").and_then(|s| s.as_text()) {
            if !subject.trim().is_empty() {
                packet.description = Some(subject);
            }
        }
    }
    if packet.keywords.is_none() {
        if let Some(keywords) = info.get("Keywords").and_then(|k| k.as_text()) {
            if !keywords.trim().is_empty() {
                packet.keywords = Some(keywords);
            }
        }
    }
}

// ---- Sub-fix 4: MarkInfo ----

fn fix_mark_info(doc: &mut PdfDocument, plan: Option<&FixPlan>) -> Result<Vec<FixResult>> {
    let current = doc
        .catalog()?
        .get("MarkInfo")
        .map(|m| doc.resolve(m).clone());

    let mut changed = false;
    match current {
        Some(Object::Dictionary(mut mark_info)) => {
            if mark_info.get("Marked").and_then(|m| m.as_bool()) != Some(true) {
                mark_info.insert("Marked".to_string(), Object::Boolean(true));
                changed = true;
            }
            if mark_info.get("Suspects").and_then(|s| s.as_bool()) != Some(false) {
                mark_info.insert("Suspects".to_string(), Object::Boolean(false));
                changed = true;
            }
            if changed {
                doc.catalog_mut()?
                    .insert("MarkInfo".to_string(), Object::Dictionary(mark_info));
            }
        },
        _ => {
            let mark_info = Object::dict(vec![
                ("Marked", Object::Boolean(true)),
                ("Suspects", Object::Boolean(false)),
            ]);
            doc.catalog_mut()?.insert("MarkInfo".to_string(), mark_info);
            changed = true;
        },
    }

    if changed {
        Ok(vec![result(
            plan,
            FixType::FixStructure,
            "Marked document as tagged (Marked=true, Suspects=false)",
        )])
    } else {
        Ok(vec![])
    }
}

// ---- Sub-fix 5: ViewerPreferences ----

fn fix_viewer_preferences(doc: &mut PdfDocument, plan: Option<&FixPlan>) -> Result<Vec<FixResult>> {
    let current = doc
        .catalog()?
        .get("ViewerPreferences")
        .map(|vp| doc.resolve(vp).clone());

    match current {
        Some(Object::Dictionary(mut prefs)) => {
            if prefs.get("DisplayDocTitle").and_then(|d| d.as_bool()) == Some(true) {
                return Ok(vec![]);
            }
            prefs.insert("DisplayDocTitle".to_string(), Object::Boolean(true));
            doc.catalog_mut()?
                .insert("ViewerPreferences".to_string(), Object::Dictionary(prefs));
        },
        _ => {
            doc.catalog_mut()?.insert(
                "ViewerPreferences".to_string(),
                Object::dict(vec![("DisplayDocTitle", Object::Boolean(true))]),
            );
        },
    }
    Ok(vec![result(
        plan,
        FixType::FixViewerPreferences,
        "Set ViewerPreferences to display the document title",
    )])
}

// ---- Sub-fix 6: structure-tree scaffold ----

fn built_in_role_map_dict() -> Dict {
    standards::BUILT_IN_ROLE_MAP
        .iter()
        .map(|(from, to)| (from.to_string(), Object::Name(to.to_string())))
        .collect()
}

fn fix_structure_scaffold(doc: &mut PdfDocument, plan: Option<&FixPlan>) -> Result<Vec<FixResult>> {
    if doc.catalog()?.contains_key("StructTreeRoot") {
        return ensure_structure_children(doc, plan);
    }

    let role_map = doc.make_indirect(Object::Dictionary(built_in_role_map_dict()));
    let parent_tree = doc.make_indirect(Object::dict(vec![("Nums", Object::Array(vec![]))]));
    let root = doc.make_indirect(Object::dict(vec![
        ("Type", Object::name("StructTreeRoot")),
        ("K", Object::Array(vec![])),
        ("RoleMap", Object::Reference(role_map)),
        ("ParentTree", Object::Reference(parent_tree)),
    ]));
    let document_element = doc.make_indirect(Object::dict(vec![
        ("Type", Object::name("StructElem")),
        ("S", Object::name("Document")),
        ("P", Object::Reference(root)),
        ("K", Object::Array(vec![])),
        ("Lang", Object::text(DEFAULT_LANGUAGE)),
    ]));
    if let Some(kids) = doc
        .object_mut(root)
        .and_then(|o| o.as_dict_mut())
        .and_then(|d| d.get_mut("K"))
        .and_then(|k| k.as_array_mut())
    {
        kids.push(Object::Reference(document_element));
    }
    doc.catalog_mut()?
        .insert("StructTreeRoot".to_string(), Object::Reference(root));

    Ok(vec![result(
        plan,
        FixType::FixStructure,
        "Created structure tree scaffold with a Document element and full RoleMap",
    )])
}

fn ensure_structure_children(
    doc: &mut PdfDocument,
    plan: Option<&FixPlan>,
) -> Result<Vec<FixResult>> {
    let Some(root_ref) = doc
        .catalog()?
        .get("StructTreeRoot")
        .and_then(|r| r.as_reference())
    else {
        return Ok(vec![]);
    };
    let empty = doc
        .get(root_ref)
        .and_then(|o| o.as_dict())
        .map(|root| match root.get("K") {
            None => true,
            Some(k) => matches!(doc.resolve(k), Object::Array(items) if items.is_empty()),
        })
        .unwrap_or(false);
    if !empty {
        return Ok(vec![]);
    }

    let document_element = doc.make_indirect(Object::dict(vec![
        ("Type", Object::name("StructElem")),
        ("S", Object::name("Document")),
        ("P", Object::Reference(root_ref)),
        ("K", Object::Array(vec![])),
        ("Lang", Object::text(DEFAULT_LANGUAGE)),
    ]));
    if let Some(root) = doc.object_mut(root_ref).and_then(|o| o.as_dict_mut()) {
        match root.get_mut("K").and_then(|k| k.as_array_mut()) {
            Some(kids) => kids.push(Object::Reference(document_element)),
            None => {
                root.insert(
                    "K".to_string(),
                    Object::Array(vec![Object::Reference(document_element)]),
                );
            },
        }
    }
    Ok(vec![result(
        plan,
        FixType::FixStructure,
        "Added a Document element to the empty structure tree",
    )])
}

// ---- Sub-fix 7: RoleMap completion ----

fn fix_role_map(doc: &mut PdfDocument, plan: Option<&FixPlan>) -> Result<Vec<FixResult>> {
    // Only runs when the planner asked for it.
    if !plan.map(|p| p.has_automated(FixType::FixRoleMap)).unwrap_or(false) {
        return Ok(vec![]);
    }
    let Some(root_ref) = doc
        .catalog()?
        .get("StructTreeRoot")
        .and_then(|r| r.as_reference())
    else {
        return Ok(vec![]);
    };

    // Load (or create) the RoleMap as a direct dictionary on the root.
    let existing = doc
        .get(root_ref)
        .and_then(|o| o.as_dict())
        .and_then(|root| root.get("RoleMap"))
        .map(|rm| doc.resolve(rm).clone());

    let mut role_map = match existing {
        Some(Object::Dictionary(d)) => d,
        _ => Dict::new(),
    };

    let mut added = 0usize;
    for (from, to) in standards::BUILT_IN_ROLE_MAP {
        if !role_map.contains_key(*from) {
            role_map.insert(from.to_string(), Object::Name(to.to_string()));
            added += 1;
        }
    }

    // Break mapping cycles: rewrite each cyclic key to the built-in
    // standard target.
    let mut repaired = 0usize;
    let keys: Vec<String> = role_map.keys().cloned().collect();
    for key in keys {
        let mut current = key.clone();
        let mut cycle = false;
        for _ in 0..10 {
            if standards::is_standard_type(&current) {
                break;
            }
            match role_map.get(current.as_str()).and_then(|o| o.as_name()) {
                Some(next) if next == key => {
                    cycle = true;
                    break;
                },
                Some(next) => current = next.to_string(),
                None => break,
            }
        }
        if cycle {
            role_map.insert(
                key.clone(),
                Object::Name(standards::standard_mapping_for(&key).to_string()),
            );
            repaired += 1;
        }
    }

    if added == 0 && repaired == 0 {
        return Ok(vec![]);
    }
    if let Some(root) = doc.object_mut(root_ref).and_then(|o| o.as_dict_mut()) {
        root.insert("RoleMap".to_string(), Object::Dictionary(role_map));
    }
    Ok(vec![result(
        plan,
        FixType::FixRoleMap,
        format!(
            "Completed RoleMap ({} mapping(s) added, {} cycle(s) repaired)",
            added, repaired
        ),
    )])
}

// ---- Sub-fix 8: PDF/A identifier and metadata consistency ----

fn fix_pdfa_identifier_and_consistency(
    doc: &mut PdfDocument,
    plan: Option<&FixPlan>,
) -> Result<Vec<FixResult>> {
    let mut fixes = Vec::new();

    let original = metadata::read_document_xmp(doc).unwrap_or_default();
    let mut packet = original.clone();
    let had_identifier = packet.pdfa_part.is_some() && packet.pdfa_conformance.is_some();
    packet.pdfa_part.get_or_insert_with(|| "1".to_string());
    packet
        .pdfa_conformance
        .get_or_insert_with(|| "B".to_string());

    // Mirror XMP ← DocInfo first, then DocInfo ← XMP.
    mirror_docinfo_into_packet(doc, &mut packet);
    let docinfo_changed = mirror_packet_into_docinfo(doc, &packet);

    if packet != original {
        metadata::write_document_xmp(doc, &packet)?;
        if !had_identifier {
            fixes.push(result(
                plan,
                FixType::AddPdfaIdentifier,
                "Added PDF/A identifier (pdfaid:part=1, pdfaid:conformance=B)",
            ));
        }
    }
    if docinfo_changed || (packet != original && had_identifier) {
        fixes.push(result(
            plan,
            FixType::FixMetadataConsistency,
            "Synchronized DocInfo and XMP metadata",
        ));
    }
    Ok(fixes)
}

fn mirror_packet_into_docinfo(doc: &mut PdfDocument, packet: &XmpPacket) -> bool {
    let mut changed = false;
    let updates: Vec<(&str, Option<String>)> = vec![
        ("Title", packet.title.clone()),
        ("Author", packet.creators.first().cloned()),
        ("Subject", packet.description.clone()),
        ("Keywords", packet.keywords.clone()),
    ];
    for (key, value) in updates {
        let Some(value) = value else {
            continue;
        };
        let current = doc
            .docinfo()
            .and_then(|info| info.get(key))
            .and_then(|v| v.as_text())
            .unwrap_or_default();
        if current.trim().is_empty() {
            doc.docinfo_mut().insert(key.to_string(), Object::text(&value));
            changed = true;
        }
    }
    changed
}

// ---- Manual fixes ----

fn apply_alt_text(
    doc: &mut PdfDocument,
    fix_data: &serde_json::Value,
    page: u32,
) -> Result<Option<String>> {
    let alt_text = fix_data
        .get("altText")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if alt_text.trim().is_empty() {
        return Ok(None);
    }
    let image_index = fix_data
        .get("imageIndex")
        .and_then(|v| v.as_u64())
        .unwrap_or(1)
        .saturating_sub(1) as usize;

    let pages = doc.pages();
    let Some(&page_ref) = pages.get(page.saturating_sub(1) as usize) else {
        return Ok(None);
    };
    let image_refs: Vec<_> = doc
        .page_xobjects(page_ref)
        .into_iter()
        .filter(|(_, _, obj)| {
            obj.as_dict()
                .and_then(|d| d.get("Subtype"))
                .and_then(|s| s.as_name())
                == Some("Image")
        })
        .filter_map(|(_, r, _)| r)
        .collect();
    let Some(&image_ref) = image_refs.get(image_index) else {
        return Ok(None);
    };

    if let Some(dict) = doc.object_mut(image_ref).and_then(|o| o.as_dict_mut()) {
        dict.insert("Alt".to_string(), Object::text(&alt_text));
    }
    Ok(Some(format!(
        "Added alt text to image {} on page {}",
        image_index + 1,
        page
    )))
}

fn apply_form_label(doc: &mut PdfDocument, fix_data: &serde_json::Value) -> Result<Option<String>> {
    let field_name = fix_data
        .get("fieldName")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let label = fix_data
        .get("label")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    if field_name.is_empty() || label.is_empty() {
        return Ok(None);
    }

    let field_refs: Vec<_> = doc
        .catalog()?
        .get("AcroForm")
        .and_then(|a| doc.resolve_dict(a))
        .and_then(|form| form.get("Fields"))
        .map(|f| doc.resolve(f).clone())
        .and_then(|f| f.as_array().cloned())
        .unwrap_or_default();

    for field in field_refs {
        let Some(r) = field.as_reference() else {
            continue;
        };
        let matches = doc
            .get(r)
            .and_then(|o| o.as_dict())
            .and_then(|d| d.get("T"))
            .and_then(|t| t.as_text())
            .map(|t| t == field_name)
            .unwrap_or(false);
        if matches {
            if let Some(dict) = doc.object_mut(r).and_then(|o| o.as_dict_mut()) {
                dict.insert("TU".to_string(), Object::text(&label));
            }
            return Ok(Some(format!("Added label '{}' to form field", label)));
        }
    }
    Ok(None)
}

/// Minimal sRGB-flavored ICC profile for the OutputIntent fix: a
/// 128-byte header (`acsp` signature, RGB data color space, XYZ
/// connection space) and an empty tag table. Hosts that need a fully
/// characterized profile can replace the stream afterwards.
const SRGB_ICC_PROFILE: &[u8] = &[
    0x00, 0x00, 0x00, 0x84, // profile size (132)
    b'n', b'o', b'n', b'e', // preferred CMM
    0x04, 0x30, 0x00, 0x00, // version 4.3
    b'm', b'n', b't', b'r', // display device profile
    b'R', b'G', b'B', b' ', // data color space
    b'X', b'Y', b'Z', b' ', // connection space
    0x07, 0xE0, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // creation date
    b'a', b'c', b's', b'p', // profile signature
    0x00, 0x00, 0x00, 0x00, // platform
    0x00, 0x00, 0x00, 0x00, // flags
    0x00, 0x00, 0x00, 0x00, // manufacturer
    0x00, 0x00, 0x00, 0x00, // model
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // attributes
    0x00, 0x00, 0x00, 0x00, // rendering intent (perceptual)
    0x00, 0x00, 0xF6, 0xD6, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xD3, 0x2D, // D50 white point
    0x00, 0x00, 0x00, 0x00, // creator
    // profile id + reserved (44 bytes to the 128-byte header boundary)
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, // tag count (0)
];

fn apply_output_intent(doc: &mut PdfDocument) -> Result<Option<String>> {
    let has_pdfa_intent = doc
        .catalog()?
        .get("OutputIntents")
        .map(|o| doc.resolve(o).clone())
        .and_then(|o| o.as_array().cloned())
        .map(|intents| {
            intents.iter().any(|intent| {
                doc.resolve_dict(intent)
                    .and_then(|d| d.get("S"))
                    .and_then(|s| s.as_name())
                    == Some("GTS_PDFA1")
            })
        })
        .unwrap_or(false);
    if has_pdfa_intent {
        return Ok(Some("OutputIntent already present".to_string()));
    }

    let mut profile_dict = Dict::new();
    profile_dict.insert("N".to_string(), Object::Integer(3));
    profile_dict.insert("Alternate".to_string(), Object::name("DeviceRGB"));
    let profile = doc.make_indirect(Object::Stream {
        dict: profile_dict,
        data: bytes::Bytes::from_static(SRGB_ICC_PROFILE),
    });
    let intent = doc.make_indirect(Object::dict(vec![
        ("Type", Object::name("OutputIntent")),
        ("S", Object::name("GTS_PDFA1")),
        ("OutputConditionIdentifier", Object::text("sRGB IEC61966-2.1")),
        ("Info", Object::text("sRGB IEC61966-2.1")),
        ("DestOutputProfile", Object::Reference(profile)),
    ]));

    let catalog = doc.catalog_mut()?;
    match catalog
        .get_mut("OutputIntents")
        .and_then(|o| o.as_array_mut())
    {
        Some(intents) => intents.push(Object::Reference(intent)),
        None => {
            catalog.insert(
                "OutputIntents".to_string(),
                Object::Array(vec![Object::Reference(intent)]),
            );
        },
    }
    Ok(Some(
        "Added sRGB OutputIntent with embedded ICC profile".to_string(),
    ))
}

fn apply_basic_tagging(doc: &mut PdfDocument) -> Result<Option<String>> {
    let mut descriptions = Vec::new();
    if !fix_language(doc, None)?.is_empty() {
        descriptions.push("language");
    }
    if !fix_mark_info(doc, None)?.is_empty() {
        descriptions.push("MarkInfo");
    }
    if !fix_structure_scaffold(doc, None)?.is_empty() {
        descriptions.push("structure tree");
    }
    if descriptions.is_empty() {
        return Ok(Some("Document already tagged".to_string()));
    }
    Ok(Some(format!(
        "Marked document as tagged ({})",
        descriptions.join(", ")
    )))
}

/// Legacy entry point: normalizes positional arguments and delegates to
/// the modern engine.
pub fn auto_fix(
    pdf_path: &str,
    fix_type: Option<&str>,
    fix_data: Option<serde_json::Value>,
    page: Option<u32>,
) -> FixOutcome {
    let engine = AutoFixEngine::new();
    match fix_type {
        None | Some("") | Some("automated") => engine.apply_automated_fixes(&ScanRecord {
            scan_id: format!("autofix-{}", uuid::Uuid::new_v4()),
            file_path: PathBuf::from(pdf_path),
            original_filename: None,
            results: None,
        }),
        Some(name) => {
            let fix_type = serde_json::from_value::<FixType>(serde_json::Value::String(
                name.to_string(),
            ))
            .unwrap_or(FixType::TagContent);
            engine.apply_manual_fix(
                Path::new(pdf_path),
                fix_type,
                &fix_data.unwrap_or_else(|| serde_json::json!({})),
                page.unwrap_or(1),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save_bare_document(dir: &std::path::Path) -> PathBuf {
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = dir.join("no_title_no_lang_untagged.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();
        path
    }

    fn record_for(path: &Path) -> ScanRecord {
        ScanRecord {
            scan_id: "scan-test".to_string(),
            file_path: path.to_path_buf(),
            original_filename: path.file_name().map(|n| n.to_string_lossy().to_string()),
            results: None,
        }
    }

    #[test]
    fn test_automated_fixes_on_bare_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bare_document(dir.path());
        let engine = AutoFixEngine::new();
        let outcome = engine.apply_automated_fixes(&record_for(&path));

        assert!(outcome.success);
        assert!(outcome.success_count >= 4, "got {:?}", outcome.fixes_applied);
        let temp = outcome.fixed_temp_path.unwrap();
        assert!(temp.exists());

        let fixed = PdfDocument::open(&temp).unwrap();
        let catalog = fixed.catalog().unwrap();
        assert_eq!(
            catalog.get("Lang").unwrap().as_text().unwrap(),
            DEFAULT_LANGUAGE
        );
        let mark_info = fixed.resolve_dict(catalog.get("MarkInfo").unwrap()).unwrap();
        assert_eq!(mark_info.get("Marked").unwrap().as_bool(), Some(true));
        assert_eq!(mark_info.get("Suspects").unwrap().as_bool(), Some(false));
        assert!(catalog.contains_key("StructTreeRoot"));

        let title = fixed
            .docinfo()
            .unwrap()
            .get("Title")
            .unwrap()
            .as_text()
            .unwrap();
        assert_eq!(title, "no title no lang untagged");

        let xmp = metadata::read_document_xmp(&fixed).unwrap();
        assert!(xmp.has_title());
        assert_eq!(xmp.pdfua_part.as_deref(), Some("1"));
        assert_eq!(xmp.pdfua_conformance.as_deref(), Some("A"));
        assert_eq!(xmp.pdfa_part.as_deref(), Some("1"));

        // The original file is untouched.
        let original = PdfDocument::open(&path).unwrap();
        assert!(!original.catalog().unwrap().contains_key("Lang"));
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bare_document(dir.path());
        let engine = AutoFixEngine::new();

        let first = engine.apply_automated_fixes(&record_for(&path));
        let fixed_path = first.fixed_temp_path.unwrap();
        let renamed = dir.path().join("fixed.pdf");
        std::fs::rename(&fixed_path, &renamed).unwrap();

        let second = engine.apply_automated_fixes(&record_for(&renamed));
        assert!(second.success);
        assert_eq!(
            second.success_count, 0,
            "second pass found work: {:?}",
            second.fixes_applied
        );
    }

    #[test]
    fn test_already_compliant_returns_success_with_no_fixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bare_document(dir.path());
        let engine = AutoFixEngine::new();
        let first = engine.apply_automated_fixes(&record_for(&path));
        let fixed = first.fixed_temp_path.unwrap();

        let record = record_for(&fixed);
        let outcome = engine.apply_automated_fixes(&record);
        assert!(outcome.success);
        assert!(outcome.fixes_applied.is_empty());
    }

    #[test]
    fn test_rolemap_completion_requires_plan() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Array(vec![])),
            ("RoleMap", Object::dict(vec![("Chart", Object::name("Figure"))])),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));
        let path = dir.path().join("rolemap.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        // Without a plan the RoleMap is left alone.
        let engine = AutoFixEngine::new();
        let outcome = engine.apply_automated_fixes(&record_for(&path));
        let fixed = PdfDocument::open(outcome.fixed_temp_path.as_ref().unwrap()).unwrap();
        let role_map_len = fixed
            .catalog()
            .unwrap()
            .get("StructTreeRoot")
            .and_then(|r| fixed.resolve_dict(r))
            .and_then(|root| root.get("RoleMap"))
            .and_then(|rm| fixed.resolve_dict(rm))
            .map(|rm| rm.len())
            .unwrap();
        assert_eq!(role_map_len, 1);

        // With a fixRoleMap plan, missing built-in mappings are inserted.
        let mut record = record_for(&path);
        let mut results = ScanResult::default();
        let mut issues = crate::analysis::issue::IssueSet::new();
        issues.add(
            crate::analysis::issue::IssueCategory::RoleMapMissingMappings,
            crate::analysis::issue::Issue::new("incomplete RoleMap", crate::analysis::issue::Severity::Medium),
        );
        results.fixes = Some(crate::fixes::suggestions::generate_fix_suggestions(&issues));
        record.results = Some(results);

        let outcome = engine.apply_automated_fixes(&record);
        let fixed = PdfDocument::open(outcome.fixed_temp_path.as_ref().unwrap()).unwrap();
        let role_map_len = fixed
            .catalog()
            .unwrap()
            .get("StructTreeRoot")
            .and_then(|r| fixed.resolve_dict(r))
            .and_then(|root| root.get("RoleMap"))
            .and_then(|rm| fixed.resolve_dict(rm))
            .map(|rm| rm.len())
            .unwrap();
        assert_eq!(role_map_len, standards::BUILT_IN_ROLE_MAP.len());
    }

    #[test]
    fn test_rolemap_cycle_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let root = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructTreeRoot")),
            ("K", Object::Array(vec![])),
            ("RoleMap", Object::dict(vec![("Chart", Object::name("Chart"))])),
        ]));
        doc.catalog_mut()
            .unwrap()
            .insert("StructTreeRoot".to_string(), Object::Reference(root));
        let path = dir.path().join("cycle.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let mut record = record_for(&path);
        let mut results = ScanResult::default();
        let mut issues = crate::analysis::issue::IssueSet::new();
        issues.add(
            crate::analysis::issue::IssueCategory::RoleMapMissingMappings,
            crate::analysis::issue::Issue::new("cycle", crate::analysis::issue::Severity::Medium),
        );
        results.fixes = Some(crate::fixes::suggestions::generate_fix_suggestions(&issues));
        record.results = Some(results);

        let engine = AutoFixEngine::new();
        let outcome = engine.apply_automated_fixes(&record);
        let fixed = PdfDocument::open(outcome.fixed_temp_path.as_ref().unwrap()).unwrap();
        let target = fixed
            .catalog()
            .unwrap()
            .get("StructTreeRoot")
            .and_then(|r| fixed.resolve_dict(r))
            .and_then(|root| root.get("RoleMap"))
            .and_then(|rm| fixed.resolve_dict(rm))
            .and_then(|rm| rm.get("Chart"))
            .and_then(|t| t.as_name())
            .unwrap()
            .to_string();
        assert_eq!(target, "Figure");
    }

    #[test]
    fn test_manual_form_label_fix() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let field = doc.add_object(Object::dict(vec![
            ("FT", Object::name("Tx")),
            ("T", Object::text("email")),
        ]));
        doc.catalog_mut().unwrap().insert(
            "AcroForm".to_string(),
            Object::dict(vec![("Fields", Object::Array(vec![Object::Reference(field)]))]),
        );
        let path = dir.path().join("form.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let engine = AutoFixEngine::new();
        let outcome = engine.apply_manual_fix(
            &path,
            FixType::AddFormLabel,
            &serde_json::json!({"fieldName": "email", "label": "Email address"}),
            1,
        );
        assert!(outcome.success, "{:?}", outcome.error);

        let fixed = PdfDocument::open(&path).unwrap();
        let tu = fixed
            .get(field)
            .unwrap()
            .as_dict()
            .unwrap()
            .get("TU")
            .unwrap()
            .as_text()
            .unwrap();
        assert_eq!(tu, "Email address");
    }

    #[test]
    fn test_manual_alt_text_fix() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        let page = doc.add_blank_page(612.0, 792.0).unwrap();
        let image = doc.add_object(Object::Stream {
            dict: [
                ("Type".to_string(), Object::name("XObject")),
                ("Subtype".to_string(), Object::name("Image")),
                ("Width".to_string(), Object::Integer(1)),
                ("Height".to_string(), Object::Integer(1)),
            ]
            .into_iter()
            .collect(),
            data: bytes::Bytes::from_static(&[0xFF]),
        });
        doc.page_dict_mut(page).unwrap().insert(
            "Resources".to_string(),
            Object::dict(vec![(
                "XObject",
                Object::dict(vec![("Im0", Object::Reference(image))]),
            )]),
        );
        let path = dir.path().join("image.pdf");
        doc.save(&path, &SaveOptions::default()).unwrap();

        let engine = AutoFixEngine::new();
        let outcome = engine.apply_manual_fix(
            &path,
            FixType::AddAltText,
            &serde_json::json!({"imageIndex": 1, "altText": "Company logo"}),
            1,
        );
        assert!(outcome.success, "{:?}", outcome.error);

        let fixed = PdfDocument::open(&path).unwrap();
        let alt = fixed
            .get(image)
            .unwrap()
            .as_dict()
            .unwrap()
            .get("Alt")
            .unwrap()
            .as_text()
            .unwrap();
        assert_eq!(alt, "Company logo");
    }

    #[test]
    fn test_output_intent_fix() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bare_document(dir.path());

        let engine = AutoFixEngine::new();
        let outcome = engine.apply_manual_fix(
            &path,
            FixType::AddOutputIntent,
            &serde_json::json!({}),
            1,
        );
        assert!(outcome.success, "{:?}", outcome.error);

        let fixed = PdfDocument::open(&path).unwrap();
        let intents = fixed
            .catalog()
            .unwrap()
            .get("OutputIntents")
            .map(|o| fixed.resolve(o).clone())
            .and_then(|o| o.as_array().cloned())
            .unwrap();
        assert_eq!(intents.len(), 1);
        let intent = fixed.resolve_dict(&intents[0]).unwrap();
        assert_eq!(intent.get("S").unwrap().as_name(), Some("GTS_PDFA1"));
        assert!(intent.contains_key("OutputConditionIdentifier"));
        let profile = fixed.resolve(intent.get("DestOutputProfile").unwrap());
        let profile_dict = profile.as_dict().unwrap();
        assert_eq!(profile_dict.get("N").unwrap().as_integer(), Some(3));
        assert_eq!(
            profile_dict.get("Alternate").unwrap().as_name(),
            Some("DeviceRGB")
        );

        // The PDF/A OutputIntent findings disappear on re-scan.
        let result = crate::validators::pdfa::validate_pdfa(&fixed);
        assert!(!result
            .issues
            .iter()
            .any(|i| i.description.contains("OutputIntent")));
    }

    #[test]
    fn test_failed_open_reports_clean_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_pdf.pdf");
        std::fs::write(&path, b"plain text").unwrap();

        let engine = AutoFixEngine::new();
        let outcome = engine.apply_automated_fixes(&record_for(&path));
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(!error.contains("not_a_pdf"), "error leaks path: {}", error);
        assert!(!path.with_extension("pdf.temp").exists());
    }

    #[test]
    fn test_legacy_shim_routes_to_automated() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_bare_document(dir.path());
        let outcome = auto_fix(path.to_str().unwrap(), None, None, None);
        assert!(outcome.success);
        assert!(outcome.fixed_temp_path.is_some());
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("annual_report-2024.pdf"), "annual report 2024");
        assert_eq!(derive_title("plain.pdf"), "plain");
    }
}
