//! Fix pipeline properties: applying the automated plan twice finds no
//! new automated work, targeted categories never regress, and the fix
//! history lines up with the archived revision.

use pdf_a11y::document::{PdfDocument, SaveOptions};
use pdf_a11y::fixes::engine::ScanRecord;
use pdf_a11y::fixes::FixType;
use pdf_a11y::versioning::FixVersionStore;
use pdf_a11y::{analyze, apply_automated_fixes, build_fix_history, IssueCategory};
use std::path::{Path, PathBuf};

fn bare_document(dir: &Path, name: &str) -> PathBuf {
    let mut doc = PdfDocument::new();
    doc.add_blank_page(612.0, 792.0).unwrap();
    let path = dir.join(name);
    doc.save(&path, &SaveOptions::default()).unwrap();
    path
}

fn record(scan_id: &str, path: &Path, results: Option<pdf_a11y::ScanResult>) -> ScanRecord {
    ScanRecord {
        scan_id: scan_id.to_string(),
        file_path: path.to_path_buf(),
        original_filename: path.file_name().map(|n| n.to_string_lossy().to_string()),
        results,
    }
}

#[test]
fn test_automated_fix_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = bare_document(dir.path(), "idempotent.pdf");

    let before = analyze(&path).unwrap();
    let first = apply_automated_fixes("pipeline-idem", &record("pipeline-idem", &path, Some(before))).unwrap();
    assert!(first.success);
    assert!(first.success_count > 0);

    // Run the engine again over the fixed output.
    let fixed_path = dir.path().join("fixed_once.pdf");
    std::fs::rename(first.fixed_temp_path.as_ref().unwrap(), &fixed_path).unwrap();
    let mid = analyze(&fixed_path).unwrap();
    let second = apply_automated_fixes(
        "pipeline-idem",
        &record("pipeline-idem", &fixed_path, Some(mid.clone())),
    )
    .unwrap();
    assert!(second.success);
    assert_eq!(
        second.success_count, 0,
        "second pass applied new fixes: {:?}",
        second.fixes_applied
    );

    // The second scan's automated bucket is empty aside from plan noise
    // that the first pass could not address.
    let after = second.scan_results.unwrap();
    let automated_types: Vec<FixType> = after
        .fixes
        .as_ref()
        .map(|p| p.automated.iter().map(|a| a.fix_type).collect())
        .unwrap_or_default();
    assert!(
        automated_types.is_empty(),
        "automated work remains after two passes: {:?}",
        automated_types
    );
}

#[test]
fn test_no_regression_in_targeted_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = bare_document(dir.path(), "regression.pdf");

    let before = analyze(&path).unwrap();
    let outcome =
        apply_automated_fixes("pipeline-reg", &record("pipeline-reg", &path, Some(before.clone())))
            .unwrap();
    let after = outcome.scan_results.unwrap();

    // Categories the planner targets as automated must not grow.
    let targeted = [
        IssueCategory::MissingLanguage,
        IssueCategory::MissingMetadata,
        IssueCategory::UntaggedContent,
        IssueCategory::ReadingOrderIssues,
        IssueCategory::RoleMapMissingMappings,
    ];
    for category in targeted {
        assert!(
            after.results.count(category) <= before.results.count(category),
            "category {:?} regressed: {} -> {}",
            category,
            before.results.count(category),
            after.results.count(category)
        );
    }
    assert!(after.summary.total_issues <= before.summary.total_issues);
}

#[test]
fn test_fix_history_aligns_with_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = bare_document(dir.path(), "history_align.pdf");

    let before = analyze(&path).unwrap();
    let outcome = apply_automated_fixes(
        "pipeline-hist",
        &record("pipeline-hist", &path, Some(before.clone())),
    )
    .unwrap();

    let store = FixVersionStore::new(dir.path().join("fixed"));
    let entry = store
        .archive_fixed_pdf_version(
            "pipeline-hist",
            Some("history_align.pdf"),
            outcome.fixed_temp_path.as_ref().unwrap(),
        )
        .unwrap();

    let history = build_fix_history("pipeline-hist", &before, &outcome, &entry);
    assert_eq!(history.fixed_filename, entry.filename);
    assert_eq!(history.metadata.version, entry.version);
    assert_eq!(history.metadata.file_size, entry.size);
    assert_eq!(history.success_count, outcome.success_count);
    assert_eq!(history.total_issues_before, before.summary.total_issues);
    assert!(history.compliance_after > history.compliance_before);

    // The archived file re-opens as a valid PDF.
    let archived = PdfDocument::open(&entry.absolute_path).unwrap();
    assert_eq!(archived.pages().len(), 1);
}

#[test]
fn test_original_upload_never_mutated() {
    let dir = tempfile::tempdir().unwrap();
    let path = bare_document(dir.path(), "pristine.pdf");
    let original_bytes = std::fs::read(&path).unwrap();

    let before = analyze(&path).unwrap();
    let outcome =
        apply_automated_fixes("pipeline-pristine", &record("pipeline-pristine", &path, Some(before)))
            .unwrap();
    assert!(outcome.success);

    assert_eq!(
        std::fs::read(&path).unwrap(),
        original_bytes,
        "the input file must not change"
    );
    assert_ne!(
        outcome.fixed_temp_path.as_deref(),
        Some(path.as_path()),
        "fixes must land in a temp file"
    );
}

#[test]
fn test_plan_buckets_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let path = bare_document(dir.path(), "reproducible.pdf");

    let first = analyze(&path).unwrap();
    let second = analyze(&path).unwrap();

    let plan_a = first.fixes.unwrap();
    let plan_b = second.fixes.unwrap();
    let ids = |plan: &pdf_a11y::FixPlan| -> Vec<String> {
        plan.automated
            .iter()
            .chain(&plan.semi_automated)
            .chain(&plan.manual)
            .map(|f| f.id.clone())
            .collect()
    };
    assert_eq!(ids(&plan_a), ids(&plan_b));
    assert_eq!(plan_a.estimated_time, plan_b.estimated_time);
}
