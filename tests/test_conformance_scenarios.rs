//! End-to-end conformance scenarios: build a document with a known
//! defect, scan it, and check the exact findings; fix and re-scan where
//! the defect is automatable.

use pdf_a11y::document::{PdfDocument, SaveOptions};
use pdf_a11y::fixes::engine::ScanRecord;
use pdf_a11y::object::{Dict, Object};
use pdf_a11y::{analyze, apply_automated_fixes, IssueCategory};
use std::path::{Path, PathBuf};

fn save_doc(doc: &PdfDocument, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path, &SaveOptions::default()).unwrap();
    path
}

fn wcag_criteria(result: &pdf_a11y::ScanResult) -> Vec<String> {
    result
        .results
        .get(IssueCategory::WcagIssues)
        .iter()
        .filter_map(|i| i.criterion.clone())
        .collect()
}

fn pdfua_checkpoints(result: &pdf_a11y::ScanResult) -> Vec<String> {
    result
        .results
        .get(IssueCategory::PdfuaIssues)
        .iter()
        .filter_map(|i| i.checkpoint.clone())
        .collect()
}

/// Untagged document without title, language, or metadata: the scan must
/// flag the document-level criteria and the automated fix must clear all
/// of them on re-scan.
#[test]
fn test_untagged_document_fixed_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::new();
    doc.add_blank_page(612.0, 792.0).unwrap();
    let path = save_doc(&doc, dir.path(), "no_title_no_lang_untagged.pdf");

    let before = analyze(&path).unwrap();
    let criteria = wcag_criteria(&before);
    assert!(criteria.contains(&"3.1.1".to_string()));
    assert!(criteria.contains(&"2.4.2".to_string()));
    let checkpoints = pdfua_checkpoints(&before);
    for expected in ["01-001", "01-004", "06-001", "07-001"] {
        assert!(
            checkpoints.contains(&expected.to_string()),
            "missing checkpoint {}",
            expected
        );
    }

    let record = ScanRecord {
        scan_id: "scenario-untagged".to_string(),
        file_path: path.clone(),
        original_filename: Some("no_title_no_lang_untagged.pdf".to_string()),
        results: Some(before),
    };
    let outcome = apply_automated_fixes("scenario-untagged", &record).unwrap();
    assert!(outcome.success);

    let after = outcome.scan_results.unwrap();
    let criteria = wcag_criteria(&after);
    assert!(!criteria.contains(&"3.1.1".to_string()));
    assert!(!criteria.contains(&"2.4.2".to_string()));
    let checkpoints = pdfua_checkpoints(&after);
    for resolved in ["01-001", "01-002", "01-004", "01-005", "06-001", "07-001"] {
        assert!(
            !checkpoints.contains(&resolved.to_string()),
            "checkpoint {} survived the fix",
            resolved
        );
    }

    // The fixed file carries a derived title and the PDF/UA identifier.
    let fixed = PdfDocument::open(outcome.fixed_temp_path.unwrap()).unwrap();
    let title = fixed
        .docinfo()
        .unwrap()
        .get("Title")
        .unwrap()
        .as_text()
        .unwrap();
    assert_eq!(title, "no title no lang untagged");
    let xmp = pdf_a11y::metadata::read_document_xmp(&fixed).unwrap();
    assert_eq!(xmp.pdfua_part.as_deref(), Some("1"));
}

fn doc_with_role_map(entries: Vec<(&str, &str)>) -> PdfDocument {
    let mut doc = PdfDocument::new();
    doc.add_blank_page(612.0, 792.0).unwrap();
    let role_map: Dict = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), Object::name(v)))
        .collect();
    let root = doc.add_object(Object::dict(vec![
        ("Type", Object::name("StructTreeRoot")),
        ("K", Object::Array(vec![])),
        ("RoleMap", Object::Dictionary(role_map)),
    ]));
    doc.catalog_mut()
        .unwrap()
        .insert("StructTreeRoot".to_string(), Object::Reference(root));
    doc
}

/// Remapping a standard type is exactly one checkpoint finding naming
/// the offending mapping; mapping a custom type is clean.
#[test]
fn test_standard_type_remap_detection() {
    let dir = tempfile::tempdir().unwrap();

    let doc = doc_with_role_map(vec![("P", "Span")]);
    let path = save_doc(&doc, dir.path(), "remapped.pdf");
    let result = analyze(&path).unwrap();
    let remaps: Vec<_> = result
        .results
        .get(IssueCategory::PdfuaIssues)
        .iter()
        .filter(|i| i.checkpoint.as_deref() == Some("02-004"))
        .collect();
    assert_eq!(remaps.len(), 1);
    let mappings = remaps[0].offending_mappings.as_ref().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].from, "/P");
    assert_eq!(mappings[0].to, "/Span");

    let doc = doc_with_role_map(vec![("MyPara", "P")]);
    let path = save_doc(&doc, dir.path(), "custom_mapped.pdf");
    let result = analyze(&path).unwrap();
    assert!(
        !pdfua_checkpoints(&result).contains(&"02-004".to_string()),
        "custom-to-standard mapping must not be flagged"
    );
}

/// A table whose rows hold only TD cells gets one consolidated
/// no-header finding per standard, with per-cell findings suppressed.
#[test]
fn test_table_without_headers_single_finding() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::new();
    let page = doc.add_blank_page(612.0, 792.0).unwrap();

    let mut cells = Vec::new();
    for _ in 0..4 {
        cells.push(doc.add_object(Object::dict(vec![("S", Object::name("TD"))])));
    }
    let tr1 = doc.add_object(Object::dict(vec![
        ("S", Object::name("TR")),
        (
            "K",
            Object::Array(vec![Object::Reference(cells[0]), Object::Reference(cells[1])]),
        ),
    ]));
    let tr2 = doc.add_object(Object::dict(vec![
        ("S", Object::name("TR")),
        (
            "K",
            Object::Array(vec![Object::Reference(cells[2]), Object::Reference(cells[3])]),
        ),
    ]));
    let table = doc.add_object(Object::dict(vec![
        ("S", Object::name("Table")),
        ("Pg", Object::Reference(page)),
        ("K", Object::Array(vec![Object::Reference(tr1), Object::Reference(tr2)])),
    ]));
    let root = doc.add_object(Object::dict(vec![
        ("Type", Object::name("StructTreeRoot")),
        ("K", Object::Reference(table)),
    ]));
    doc.catalog_mut()
        .unwrap()
        .insert("StructTreeRoot".to_string(), Object::Reference(root));
    let path = save_doc(&doc, dir.path(), "headerless_table.pdf");

    let result = analyze(&path).unwrap();
    let wcag_table_issues: Vec<_> = result
        .results
        .get(IssueCategory::WcagIssues)
        .iter()
        .filter(|i| i.description.contains("header cells (TH)"))
        .collect();
    assert_eq!(wcag_table_issues.len(), 1);

    let pdfua_table_issues: Vec<_> = result
        .results
        .get(IssueCategory::PdfuaIssues)
        .iter()
        .filter(|i| i.clause.as_deref() == Some("ISO 14289-1:7.5"))
        .collect();
    assert_eq!(pdfua_table_issues.len(), 1);

    // No per-cell findings alongside the consolidated one.
    assert!(!result
        .results
        .get(IssueCategory::WcagIssues)
        .iter()
        .any(|i| i.description.contains("without associated headers")));
}

/// A Figure that names its image via OBJR and carries Alt must not
/// produce a non-text-content finding even with no MCID wiring.
#[test]
fn test_figure_alt_via_objr_suppresses_alt_finding() {
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
        data: bytes::Bytes::from_static(&[0x00]),
    });
    doc.page_dict_mut(page).unwrap().insert(
        "Resources".to_string(),
        Object::dict(vec![(
            "XObject",
            Object::dict(vec![("Im0", Object::Reference(image))]),
        )]),
    );

    let figure = doc.add_object(Object::dict(vec![
        ("Type", Object::name("StructElem")),
        ("S", Object::name("Figure")),
        ("Alt", Object::text("logo")),
        ("Pg", Object::Reference(page)),
        (
            "K",
            Object::dict(vec![
                ("Type", Object::name("OBJR")),
                ("Obj", Object::Reference(image)),
            ]),
        ),
    ]));
    let root = doc.add_object(Object::dict(vec![
        ("Type", Object::name("StructTreeRoot")),
        ("K", Object::Reference(figure)),
    ]));
    doc.catalog_mut()
        .unwrap()
        .insert("StructTreeRoot".to_string(), Object::Reference(root));
    let path = save_doc(&doc, dir.path(), "figure_objr_alt.pdf");

    let result = analyze(&path).unwrap();
    assert!(!wcag_criteria(&result).contains(&"1.1.1".to_string()));
    assert!(result.results.get(IssueCategory::MissingAltText).is_empty());
}

/// Without the Figure (or without Alt) the same image is flagged.
#[test]
fn test_bare_image_flagged_for_alt_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::new();
    let page = doc.add_blank_page(612.0, 792.0).unwrap();
    let image = doc.add_object(Object::Stream {
        dict: [
            ("Type".to_string(), Object::name("XObject")),
            ("Subtype".to_string(), Object::name("Image")),
        ]
        .into_iter()
        .collect(),
        data: bytes::Bytes::from_static(&[0x00]),
    });
    doc.page_dict_mut(page).unwrap().insert(
        "Resources".to_string(),
        Object::dict(vec![(
            "XObject",
            Object::dict(vec![("Im0", Object::Reference(image))]),
        )]),
    );
    let path = save_doc(&doc, dir.path(), "bare_image.pdf");

    let result = analyze(&path).unwrap();
    assert!(wcag_criteria(&result).contains(&"1.1.1".to_string()));
    let missing = result.results.get(IssueCategory::MissingAltText);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].count, Some(1));
    assert_eq!(missing[0].pages, vec![1]);
}

/// A CIDFontType2 without ToUnicode yields one document-wide font
/// finding with the failed requirement recorded, not auto-fixable.
#[test]
fn test_cid_font_without_to_unicode_single_finding() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::new();
    let page = doc.add_blank_page(612.0, 792.0).unwrap();

    let descendant = doc.add_object(Object::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("CIDFontType2")),
    ]));
    let font = doc.add_object(Object::dict(vec![
        ("Type", Object::name("Font")),
        ("Subtype", Object::name("Type0")),
        ("BaseFont", Object::name("NotoCID")),
        ("DescendantFonts", Object::Array(vec![Object::Reference(descendant)])),
    ]));
    doc.page_dict_mut(page).unwrap().insert(
        "Resources".to_string(),
        Object::dict(vec![(
            "Font",
            Object::dict(vec![("F1", Object::Reference(font))]),
        )]),
    );
    let path = save_doc(&doc, dir.path(), "cid_font.pdf");

    let result = analyze(&path).unwrap();
    let font_findings: Vec<_> = result
        .results
        .get(IssueCategory::PdfuaIssues)
        .iter()
        .filter(|i| i.clause.as_deref() == Some("ISO 14289-1:7.11"))
        .filter(|i| i.checkpoint.is_none())
        .collect();
    assert_eq!(font_findings.len(), 1);
    let finding = font_findings[0];
    assert_eq!(finding.document_wide, Some(true));
    assert_eq!(finding.auto_fix_available, Some(false));
    let requirements = finding.meta.as_ref().unwrap()["failedRequirements"]
        .as_array()
        .unwrap()
        .clone();
    assert!(requirements.iter().any(|r| r == "ToUnicodeMissing"));
    assert!(requirements.iter().any(|r| r == "CIDToGIDMapMissing"));
}

/// Structure-tree annotation order {p1.A1, p2.A1, p1.A2} is one focus
/// order finding referencing the page jump.
#[test]
fn test_focus_order_page_jump_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = PdfDocument::new();
    let p1 = doc.add_blank_page(300.0, 800.0).unwrap();
    let p2 = doc.add_blank_page(300.0, 800.0).unwrap();

    let mut annots: Vec<(pdf_a11y::object::ObjectRef, pdf_a11y::object::ObjectRef)> = Vec::new();
    for (page, rect_y) in [(p1, 700i64), (p2, 700), (p1, 600)] {
        let annot = doc.add_object(Object::dict(vec![
            ("Subtype", Object::name("Widget")),
            ("Contents", Object::text("field")),
            ("TU", Object::text("field")),
            (
                "Rect",
                Object::Array(vec![
                    Object::Integer(50),
                    Object::Integer(rect_y),
                    Object::Integer(100),
                    Object::Integer(rect_y + 30),
                ]),
            ),
        ]));
        let page_annots = doc
            .page_dict_mut(page)
            .unwrap()
            .entry("Annots".to_string())
            .or_insert(Object::Array(vec![]));
        page_annots
            .as_array_mut()
            .unwrap()
            .push(Object::Reference(annot));
        annots.push((annot, page));
    }

    let mut elements = Vec::new();
    for (annot, page) in &annots {
        let element = doc.add_object(Object::dict(vec![
            ("Type", Object::name("StructElem")),
            ("S", Object::name("Annot")),
            ("Pg", Object::Reference(*page)),
            (
                "K",
                Object::dict(vec![
                    ("Type", Object::name("OBJR")),
                    ("Obj", Object::Reference(*annot)),
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
    let path = save_doc(&doc, dir.path(), "focus_jump.pdf");

    let result = analyze(&path).unwrap();
    let focus: Vec<_> = result
        .results
        .get(IssueCategory::WcagIssues)
        .iter()
        .filter(|i| i.criterion.as_deref() == Some("2.4.3"))
        .collect();
    assert_eq!(focus.len(), 1);
    assert!(focus[0].description.contains("page 2 to page 1"));
}
