//! Library surface.
//!
//! `analyze` runs the full validator set over a file and assembles the
//! scan record; `apply_automated_fixes` runs the remediation engine, then
//! re-analyzes the fixed file so the returned results reflect the
//! post-fix state. Operations on the same scan id are serialized by a
//! per-scan mutex; analyze and fix calls accept a deadline and a
//! cooperative cancellation token, checked between top-level phases.

use crate::analysis::criteria::{annotate_wcag_mappings, build_criteria_summary};
use crate::analysis::issue::{
    Issue, IssueCategory, IssueSet, ScanResult, ScanSummary, Severity, VerapdfStatus,
};
use crate::analysis::scoring;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::fixes::engine::{AutoFixEngine, FixOutcome, ScanRecord};
use crate::fixes::suggestions::{generate_fix_suggestions, FixType};
use crate::metadata;
use crate::validators::{matterhorn, pdfa, wcag};
use crate::versioning::VersionEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Cooperative cancellation token, checked between top-level phases.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// New, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation controls for a call.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Absolute deadline; exceeding it fails the call with
    /// [`Error::Deadline`]
    pub deadline: Option<Instant>,
    /// Cooperative cancellation
    pub cancel: Option<CancelToken>,
}

impl RunOptions {
    fn check(&self) -> Result<()> {
        self.check_cancelled()?;
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(Error::Deadline);
            }
        }
        Ok(())
    }

    /// Cancellation only; used before the first I/O so a pre-expired
    /// deadline still produces a partial payload at the next phase check.
    fn check_cancelled(&self) -> Result<()> {
        if let Some(cancel) = &self.cancel {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }
        Ok(())
    }
}

lazy_static::lazy_static! {
    /// Per-scan mutexes so no two operations hold the same scan at once.
    static ref SCAN_LOCKS: Mutex<HashMap<String, Arc<Mutex<()>>>> =
        Mutex::new(HashMap::new());
}

fn scan_lock(scan_id: &str) -> Arc<Mutex<()>> {
    let mut locks = SCAN_LOCKS.lock().expect("scan lock registry");
    locks
        .entry(scan_id.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Analyze a PDF for WCAG, PDF/UA, and PDF/A conformance.
pub fn analyze<P: AsRef<Path>>(path: P) -> Result<ScanResult> {
    analyze_with(path, &RunOptions::default())
}

/// [`analyze`] with a deadline and cancellation.
///
/// When the deadline strikes mid-run, whatever issues were produced so
/// far are returned with an error status instead of being discarded.
pub fn analyze_with<P: AsRef<Path>>(path: P, options: &RunOptions) -> Result<ScanResult> {
    options.check_cancelled()?;
    let doc = PdfDocument::open(path.as_ref())?;

    let mut issues = IssueSet::new();
    let phases: Vec<(&str, Box<dyn FnOnce(&PdfDocument, &mut IssueSet)>)> = vec![
        ("wcag", Box::new(|doc, issues| {
            issues.extend(wcag::WcagValidator::new(doc).validate());
        })),
        ("pdfua", Box::new(|doc, issues| {
            issues.extend(matterhorn::validate_matterhorn(doc));
        })),
        ("pdfa", Box::new(|doc, issues| {
            for issue in pdfa::validate_pdfa(doc).issues {
                issues.add(IssueCategory::PdfaIssues, issue);
            }
        })),
        ("consistency", Box::new(|doc, issues| {
            check_metadata_consistency(doc, issues);
        })),
    ];

    for (phase, run) in phases {
        if let Err(err) = options.check() {
            log::debug!("analysis stopped before phase {}: {}", phase, err);
            let mut partial = assemble_scan_result(issues);
            partial.error = Some(err.user_message());
            return Ok(partial);
        }
        run(&doc, &mut issues);
    }

    Ok(assemble_scan_result(issues))
}

/// DocInfo and XMP must agree on the fields both carry.
fn check_metadata_consistency(doc: &PdfDocument, issues: &mut IssueSet) {
    let Some(packet) = metadata::read_document_xmp(doc) else {
        return;
    };
    let Some(info) = doc.docinfo() else {
        return;
    };

    let pairs = [
        ("Title", packet.title.as_deref()),
        ("Author", packet.creators.first().map(|s| s.as_str())),
        ("Subject", packet.description.as_deref()),
        ("Keywords", packet.keywords.as_deref()),
    ];
    for (key, xmp_value) in pairs {
        let Some(xmp_value) = xmp_value else {
            continue;
        };
        let Some(info_value) = info.get(key).and_then(|v| v.as_text()) else {
            continue;
        };
        if info_value.trim().is_empty() || xmp_value.trim().is_empty() {
            continue;
        }
        if info_value.trim() != xmp_value.trim() {
            issues.add(
                IssueCategory::PdfaIssues,
                Issue::pdfa(
                    format!("DocInfo and XMP metadata disagree on {}", key),
                    "ISO 19005-1:2005, 6.7.3",
                    Severity::High,
                    "Synchronize the DocInfo dictionary with the XMP packet",
                )
                .with_context(format!("DocInfo: {} / XMP: {}", info_value.trim(), xmp_value.trim())),
            );
        }
    }
}

fn assemble_scan_result(mut issues: IssueSet) -> ScanResult {
    annotate_wcag_mappings(&mut issues);
    let criteria_summary = build_criteria_summary(&issues);

    let wcag_score = criteria_summary
        .wcag
        .as_ref()
        .map(scoring::derive_wcag_score)
        .unwrap_or(100.0);
    let pdfua_issue_count = issues.count(IssueCategory::PdfuaIssues);
    let pdfua_score = scoring::pdfua_advisory_score(pdfua_issue_count);
    let compliance_score = scoring::combined_compliance(wcag_score, pdfua_score);

    let fixes = generate_fix_suggestions(&issues);

    let total_issues = issues.total();
    let high_severity =
        issues.count_severity(Severity::Critical) + issues.count_severity(Severity::High);
    let medium_severity = issues.count_severity(Severity::Medium);

    ScanResult {
        summary: ScanSummary {
            total_issues,
            high_severity,
            medium_severity,
            compliance_score,
            wcag_compliance: Some(wcag_score),
            pdfua_compliance: Some(pdfua_score),
        },
        verapdf_status: Some(VerapdfStatus {
            wcag_compliance: wcag_score,
            pdfua_compliance: pdfua_score,
            wcag_issue_count: issues.count(IssueCategory::WcagIssues),
            pdfua_issue_count,
            validated: true,
        }),
        criteria_summary: Some(criteria_summary),
        fixes: Some(fixes),
        results: issues,
        error: None,
    }
}

/// Summary statistics for stored results (no document access).
pub fn calculate_summary(results: &IssueSet) -> ScanSummary {
    let total = results.total();
    let high = results.count_severity(Severity::Critical) + results.count_severity(Severity::High);
    let medium = results.count_severity(Severity::Medium);
    ScanSummary {
        total_issues: total,
        high_severity: high,
        medium_severity: medium,
        compliance_score: scoring::legacy_weighted_score(total, high, medium),
        wcag_compliance: None,
        pdfua_compliance: None,
    }
}

/// Run only the WCAG and PDF/UA validator families.
pub fn validate_wcag_pdfua<P: AsRef<Path>>(path: P) -> Result<IssueSet> {
    let doc = PdfDocument::open(path.as_ref())?;
    let mut issues = wcag::WcagValidator::new(&doc).validate();
    issues.extend(matterhorn::validate_matterhorn(&doc));
    Ok(issues)
}

/// Run only the PDF/A validator over an opened document.
pub fn validate_pdfa(doc: &PdfDocument) -> pdfa::PdfaValidationResult {
    pdfa::validate_pdfa(doc)
}

/// Apply the automated fix plan for a scan and re-analyze the result.
///
/// The engine writes to `<path>.temp`; the post-fix scan in the outcome
/// reflects that file. The caller archives it via the version store and
/// moves it wherever the fixed copy should live.
pub fn apply_automated_fixes(scan_id: &str, record: &ScanRecord) -> Result<FixOutcome> {
    apply_automated_fixes_with(scan_id, record, &RunOptions::default())
}

/// [`apply_automated_fixes`] with deadline/cancellation control.
pub fn apply_automated_fixes_with(
    scan_id: &str,
    record: &ScanRecord,
    options: &RunOptions,
) -> Result<FixOutcome> {
    let lock = scan_lock(scan_id);
    let _guard = lock.lock().map_err(|_| {
        Error::Internal("scan lock poisoned by a previous panic".to_string())
    })?;

    options.check()?;
    let engine = AutoFixEngine::new();
    let mut outcome = engine.apply_automated_fixes(record);
    if !outcome.success {
        return Ok(outcome);
    }

    options.check()?;
    if let Some(temp_path) = outcome.fixed_temp_path.clone() {
        match analyze_with(&temp_path, options) {
            Ok(rescan) => outcome.scan_results = Some(rescan),
            Err(err) => {
                log::warn!("post-fix analyze failed: {}", err);
                outcome.scan_results = None;
            },
        }
    }
    Ok(outcome)
}

/// Apply a single user-directed fix to the file at `path`.
pub fn apply_manual_fix(
    path: &Path,
    fix_type: FixType,
    fix_data: &serde_json::Value,
    page: u32,
) -> FixOutcome {
    AutoFixEngine::new().apply_manual_fix(path, fix_type, fix_data, page)
}

/// Metadata block of a fix-history record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixHistoryMetadata {
    /// Archived revision number
    pub version: u32,
    /// Path relative to the fixed root
    pub relative_path: String,
    /// Remote storage path, when mirrored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    /// Size of the archived file
    pub file_size: u64,
}

/// Record persisted after a successful remediation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixHistoryRecord {
    /// Scan the fix belongs to
    pub scan_id: String,
    /// Archived file name
    pub fixed_filename: String,
    /// Sub-fixes that ran
    pub fixes_applied: Vec<crate::fixes::engine::FixResult>,
    /// Issue counts by category before the fix
    pub issues_before: HashMap<String, usize>,
    /// Issue counts by category after the fix
    pub issues_after: HashMap<String, usize>,
    /// Combined compliance before
    pub compliance_before: f64,
    /// Combined compliance after
    pub compliance_after: f64,
    /// Total issues before
    pub total_issues_before: usize,
    /// Total issues after
    pub total_issues_after: usize,
    /// High/critical issues before
    pub high_severity_before: usize,
    /// High/critical issues after
    pub high_severity_after: usize,
    /// Count of successful sub-fixes
    pub success_count: usize,
    /// Archived revision details
    pub metadata: FixHistoryMetadata,
    /// When the fix was applied
    pub applied_at: DateTime<Utc>,
}

fn category_counts(results: &ScanResult) -> HashMap<String, usize> {
    results
        .results
        .iter()
        .map(|(category, issues)| (category.as_str().to_string(), issues.len()))
        .collect()
}

/// Assemble the fix-history record for a completed remediation.
pub fn build_fix_history(
    scan_id: &str,
    before: &ScanResult,
    outcome: &FixOutcome,
    entry: &VersionEntry,
) -> FixHistoryRecord {
    let after = outcome.scan_results.as_ref();
    let fixes_applied: Vec<_> = outcome
        .fixes_applied
        .iter()
        .filter(|f| f.success)
        .cloned()
        .collect();
    FixHistoryRecord {
        scan_id: scan_id.to_string(),
        fixed_filename: entry.filename.clone(),
        success_count: fixes_applied.len(),
        fixes_applied,
        issues_before: category_counts(before),
        issues_after: after.map(category_counts).unwrap_or_default(),
        compliance_before: before.summary.compliance_score,
        compliance_after: after.map(|r| r.summary.compliance_score).unwrap_or(0.0),
        total_issues_before: before.summary.total_issues,
        total_issues_after: after.map(|r| r.summary.total_issues).unwrap_or(0),
        high_severity_before: before.summary.high_severity,
        high_severity_after: after.map(|r| r.summary.high_severity).unwrap_or(0),
        metadata: FixHistoryMetadata {
            version: entry.version,
            relative_path: entry.relative_path.clone(),
            remote_path: entry.remote_path.clone(),
            file_size: entry.size,
        },
        applied_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SaveOptions;
    use crate::object::Object;

    fn save_doc(doc: &PdfDocument, dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        doc.save(&path, &SaveOptions::default()).unwrap();
        path
    }

    #[test]
    fn test_analyze_bare_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = save_doc(&doc, dir.path(), "bare.pdf");

        let result = analyze(&path).unwrap();
        assert!(result.summary.total_issues > 0);
        assert!(result.summary.compliance_score < 100.0);
        assert!(result.criteria_summary.is_some());
        assert!(result.fixes.is_some());
        assert!(result.error.is_none());

        let status = result.verapdf_status.unwrap();
        assert!(status.validated);
        assert!(status.pdfua_issue_count > 0);
    }

    #[test]
    fn test_analyze_missing_file_fails() {
        assert!(analyze("/nonexistent/nope.pdf").is_err());
    }

    #[test]
    fn test_analyze_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = save_doc(&doc, dir.path(), "cancel.pdf");

        let cancel = CancelToken::new();
        cancel.cancel();
        let options = RunOptions {
            cancel: Some(cancel),
            ..Default::default()
        };
        assert!(matches!(analyze_with(&path, &options), Err(Error::Cancelled)));
    }

    #[test]
    fn test_deadline_mid_run_returns_partial() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = save_doc(&doc, dir.path(), "deadline.pdf");

        // A deadline in the past fires at the first inter-phase check,
        // after open succeeded.
        let options = RunOptions {
            deadline: Some(Instant::now() - std::time::Duration::from_secs(1)),
            ..Default::default()
        };
        let result = analyze_with(&path, &options).unwrap();
        assert!(result.error.is_some());
    }

    #[test]
    fn test_metadata_consistency_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        doc.docinfo_mut()
            .insert("Title".to_string(), Object::text("Info title"));
        let packet = crate::metadata::XmpPacket {
            title: Some("Different XMP title".to_string()),
            ..Default::default()
        };
        crate::metadata::write_document_xmp(&mut doc, &packet).unwrap();
        let path = save_doc(&doc, dir.path(), "drift.pdf");

        let result = analyze(&path).unwrap();
        let drift: Vec<_> = result
            .results
            .get(IssueCategory::PdfaIssues)
            .iter()
            .filter(|i| i.description.contains("disagree"))
            .collect();
        assert_eq!(drift.len(), 1);
        // The planner turns it into an automated consistency fix.
        let plan = result.fixes.unwrap();
        assert!(plan.has_automated(FixType::FixMetadataConsistency));
    }

    #[test]
    fn test_apply_automated_fixes_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = save_doc(&doc, dir.path(), "fixme.pdf");

        let before = analyze(&path).unwrap();
        let record = ScanRecord {
            scan_id: "api-e2e".to_string(),
            file_path: path.clone(),
            original_filename: Some("fixme.pdf".to_string()),
            results: Some(before.clone()),
        };
        let outcome = apply_automated_fixes("api-e2e", &record).unwrap();
        assert!(outcome.success);
        assert!(outcome.success_count > 0);

        let after = outcome.scan_results.as_ref().unwrap();
        assert!(after.summary.total_issues < before.summary.total_issues);
        assert!(after.summary.compliance_score > before.summary.compliance_score);

        // Language, tagging, and title issues are gone.
        assert!(after.results.get(IssueCategory::MissingLanguage).is_empty());
        let checkpoints: Vec<_> = after
            .results
            .get(IssueCategory::PdfuaIssues)
            .iter()
            .filter_map(|i| i.checkpoint.as_deref())
            .collect();
        for resolved in ["01-001", "01-002", "01-003", "01-004", "01-005", "06-001", "07-001"] {
            assert!(
                !checkpoints.contains(&resolved),
                "checkpoint {} still present after fix",
                resolved
            );
        }
    }

    #[test]
    fn test_fix_history_record_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = PdfDocument::new();
        doc.add_blank_page(612.0, 792.0).unwrap();
        let path = save_doc(&doc, dir.path(), "history.pdf");

        let before = analyze(&path).unwrap();
        let record = ScanRecord {
            scan_id: "api-history".to_string(),
            file_path: path.clone(),
            original_filename: Some("history.pdf".to_string()),
            results: Some(before.clone()),
        };
        let outcome = apply_automated_fixes("api-history", &record).unwrap();

        let store = crate::versioning::FixVersionStore::new(dir.path().join("fixed"));
        let entry = store
            .archive_fixed_pdf_version(
                "api-history",
                Some("history.pdf"),
                outcome.fixed_temp_path.as_ref().unwrap(),
            )
            .unwrap();

        let history = build_fix_history("api-history", &before, &outcome, &entry);
        assert_eq!(history.scan_id, "api-history");
        assert_eq!(history.metadata.version, 1);
        assert!(history.total_issues_after < history.total_issues_before);
        assert!(history.success_count > 0);
        assert!(history
            .fixes_applied
            .iter()
            .all(|f| f.success), "history keeps only successful fixes");
    }

    #[test]
    fn test_calculate_summary_legacy_weights() {
        let mut issues = IssueSet::new();
        issues.add(IssueCategory::FormIssues, Issue::new("a", Severity::High));
        issues.add(IssueCategory::FormIssues, Issue::new("b", Severity::Medium));
        let summary = calculate_summary(&issues);
        assert_eq!(summary.total_issues, 2);
        assert_eq!(summary.compliance_score, 80.0);
    }

    #[test]
    fn test_scan_lock_reused_per_scan() {
        let a = scan_lock("same-scan");
        let b = scan_lock("same-scan");
        assert!(Arc::ptr_eq(&a, &b));
        let c = scan_lock("other-scan");
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
