//! Compliance scoring.
//!
//! The WCAG percentage is derived from the grouped criteria summary: each
//! criterion starts at full credit, confirmed issues subtract weight by
//! severity, and info-only advisories barely move the number so manual
//! checks do not read as total failure. The PDF/UA score is a simple
//! advisory count-based figure; the combined score is their mean.

use crate::analysis::criteria::CriteriaSection;
use crate::analysis::issue::{Issue, Severity};

/// Penalty weight for a severity.
fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical | Severity::High => 1.0,
        Severity::Medium => 0.75,
        Severity::Low => 0.45,
        Severity::Info => 0.15,
    }
}

/// Penalty contributed by a single issue.
///
/// An explicit `penaltyWeight` (0-5 scale) is normalized into 0.05..1.0
/// and taken when it exceeds the severity weight, except for info
/// findings which never escalate.
fn issue_penalty(issue: &Issue) -> f64 {
    let severity_weight = severity_weight(issue.severity);
    let normalized = issue
        .penalty_weight
        .map(|w| (w / 5.0).clamp(0.05, 1.0))
        .unwrap_or(0.0);

    if issue.severity == Severity::Info {
        if normalized > 0.0 {
            return severity_weight.min(normalized);
        }
        return severity_weight;
    }
    if normalized > 0.0 {
        return normalized.max(severity_weight);
    }
    severity_weight
}

fn criterion_penalty(issues: &[Issue]) -> f64 {
    issues
        .iter()
        .map(issue_penalty)
        .fold(0.0, f64::max)
        .min(1.0)
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// WCAG percentage from the criteria summary's WCAG section.
pub fn derive_wcag_score(section: &CriteriaSection) -> f64 {
    let items = &section.items;
    if items.is_empty() {
        return 100.0;
    }
    let total = items.len() as f64;
    let penalty: f64 = items.iter().map(|item| criterion_penalty(&item.issues)).sum();
    round2(((total - penalty) / total).max(0.0) * 100.0)
}

/// Advisory PDF/UA score from the Matterhorn issue count.
pub fn pdfua_advisory_score(issue_count: usize) -> f64 {
    (100.0 - issue_count as f64 * 10.0).max(0.0)
}

/// Combined compliance: mean of the WCAG and PDF/UA scores. The PDF/A
/// result is intentionally excluded.
pub fn combined_compliance(wcag: f64, pdfua: f64) -> f64 {
    round2((wcag + pdfua) / 2.0)
}

/// Legacy weighted score used when no criteria summary is available:
/// `100 − 15·high − 5·medium − 2·low`, clamped to 0..100.
pub fn legacy_weighted_score(total: usize, high: usize, medium: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let low = total.saturating_sub(high + medium);
    let score = 100.0 - (high as f64 * 15.0) - (medium as f64 * 5.0) - (low as f64 * 2.0);
    score.clamp(0.0, 100.0)
}
