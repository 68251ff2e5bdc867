//! Criteria summary builder.
//!
//! Groups scan issues by WCAG success criterion and PDF/UA clause into
//! ordered, status-tagged summaries. The WCAG score in
//! [`scoring`](crate::analysis::scoring) is derived from the WCAG section
//! built here, so dedup and category fan-out happen before scoring.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Note appended to language findings so users know the default fix.
pub const LANGUAGE_FIX_NOTE: &str =
    "Note: this tool will set the document language to 'en-US' by default when fixing this issue.";

/// Fixed ordering of WCAG criteria in the summary.
pub const WCAG_CRITERIA_ORDER: &[&str] = &[
    "1.1.1", "1.3.1", "1.3.2", "1.4.3", "1.4.6", "2.4.1", "2.4.2", "2.4.4", "2.4.6",
    "3.1.1", "3.3.2", "4.1.2",
];

/// Fixed ordering of PDF/UA clauses in the summary.
pub const PDFUA_CLAUSE_ORDER: &[&str] = &[
    "ISO 14289-1:7.1",
    "ISO 14289-1:7.2",
    "ISO 14289-1:7.3",
    "ISO 14289-1:7.4",
    "ISO 14289-1:7.5",
    "ISO 14289-1:7.18",
    "ISO 14289-1:7.18.1",
];

/// Name / level / one-line summary for a WCAG criterion.
pub fn wcag_criterion_details(code: &str) -> Option<(&'static str, &'static str, &'static str)> {
    let entry = match code {
        "1.1.1" => ("Non-text Content", "A", "Provide text alternatives for non-text content."),
        "1.3.1" => (
            "Info and Relationships",
            "A",
            "Preserve semantics so assistive technology can convey relationships.",
        ),
        "1.3.2" => ("Meaningful Sequence", "A", "Ensure reading order preserves intended meaning."),
        "1.3.3" => (
            "Sensory Characteristics",
            "A",
            "Instructions must not rely solely on color, shape, size, visual location, or sound cues.",
        ),
        "1.4.3" => (
            "Contrast (Minimum)",
            "AA",
            "Text/background contrast must be at least 4.5:1 for body text.",
        ),
        "1.4.6" => ("Contrast (Enhanced)", "AAA", "Enhanced 7:1 contrast aids users with low vision."),
        "2.4.1" => (
            "Bypass Blocks",
            "A",
            "Provide the ability to skip repeated content via clear headings or bookmarks.",
        ),
        "2.4.2" => ("Page Titled", "A", "Provide descriptive titles so users can identify content."),
        "2.4.3" => ("Focus Order", "A", "Interactive elements receive focus in an order that preserves meaning."),
        "2.4.4" => (
            "Link Purpose (In Context)",
            "AA",
            "Ensure link text, tooltips, or alt descriptions clearly explain the target destination.",
        ),
        "2.4.6" => ("Headings and Labels", "AA", "Use clear headings/labels for navigation."),
        "3.1.1" => ("Language of Page", "A", "Declare the primary language for pronunciation support."),
        "3.1.2" => (
            "Language of Parts",
            "AA",
            "Mark passages in another language so pronunciation can switch.",
        ),
        "3.3.2" => ("Labels or Instructions", "A", "Provide instructions so users know required input."),
        "4.1.2" => ("Name, Role, Value", "A", "Expose UI semantics programmatically."),
        _ => return None,
    };
    Some(entry)
}

/// Name / summary for a PDF/UA clause.
fn pdfua_clause_details(code: &str) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        "ISO 14289-1:7.1" => (
            "Document Identification",
            "Metadata, tagging, and document title requirements.",
        ),
        "ISO 14289-1:7.2" => (
            "Structure Tree",
            "Structure element semantics, RoleMap, and reading order.",
        ),
        "ISO 14289-1:7.3" => ("Artifacts", "Artifacts must be separate from tagged content."),
        "ISO 14289-1:7.4" => ("Headings", "Heading hierarchy and nesting rules."),
        "ISO 14289-1:7.5" => ("Tables", "Tables require header associations and structure."),
        "ISO 14289-1:7.11" => ("Fonts", "Embedded fonts need usable Unicode mappings."),
        "ISO 14289-1:7.18" => (
            "Forms & Alt Text",
            "Interactive elements need names and alternative text.",
        ),
        "ISO 14289-1:7.18.1" => (
            "Annotations",
            "Annotations require Contents text for assistive tech.",
        ),
        _ => return None,
    };
    Some(entry)
}

/// Criteria a category's issues fan out into.
pub fn category_criteria(category: IssueCategory) -> &'static [&'static str] {
    match category {
        IssueCategory::MissingMetadata => &["2.4.2"],
        IssueCategory::MissingLanguage => &["3.1.1"],
        IssueCategory::MissingAltText => &["1.1.1"],
        IssueCategory::UntaggedContent => &["1.3.1", "1.3.2"],
        IssueCategory::StructureIssues => &["1.3.1", "2.4.6"],
        IssueCategory::ReadingOrderIssues => &["1.3.2"],
        IssueCategory::TableIssues => &["1.3.1"],
        IssueCategory::FormIssues => &["3.3.2", "4.1.2"],
        IssueCategory::PoorContrast => &["1.4.3", "1.4.6"],
        IssueCategory::LinkIssues => &["2.4.4"],
        _ => &[],
    }
}

/// Conformance status of one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CriterionStatus {
    /// No issues recorded
    Supports,
    /// Reserved; currently never emitted
    PartiallySupports,
    /// At least one issue recorded
    DoesNotSupport,
}

/// Counts of item statuses in a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCounts {
    /// Items with no issues
    #[serde(rename = "supports")]
    pub supports: usize,
    /// Reserved
    #[serde(rename = "partiallySupports")]
    pub partially_supports: usize,
    /// Items with issues
    #[serde(rename = "doesNotSupport")]
    pub does_not_support: usize,
}

/// One criterion or clause entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriterionItem {
    /// Criterion or clause code
    pub code: String,
    /// Display name
    pub name: String,
    /// WCAG level, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// One-line summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Deduplicated issues under this code
    pub issues: Vec<Issue>,
    /// Issue count
    pub issue_count: usize,
    /// Status tag
    pub status: CriterionStatus,
}

/// One section (WCAG or PDF/UA) of the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaSection {
    /// Ordered criterion items
    pub items: Vec<CriterionItem>,
    /// Status tally
    pub status_counts: StatusCounts,
}

/// WCAG and PDF/UA criteria summaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaSummary {
    /// WCAG section (always present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag: Option<CriteriaSection>,
    /// PDF/UA section (present when PDF/UA issues exist)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdfua: Option<CriteriaSection>,
}

/// Build the full summary from scan results.
pub fn build_criteria_summary(results: &IssueSet) -> CriteriaSummary {
    CriteriaSummary {
        wcag: Some(build_wcag_section(results)),
        pdfua: build_pdfua_section(results),
    }
}

fn build_wcag_section(results: &IssueSet) -> CriteriaSection {
    let mut collected: Vec<Issue> = Vec::new();

    for issue in results.get(IssueCategory::WcagIssues) {
        let mut prepared = issue.clone();
        append_language_note(&mut prepared);
        collected.push(prepared);
    }

    // Category-to-criterion fan-out before dedup.
    for &category in IssueCategory::ALL {
        for &code in category_criteria(category) {
            for issue in results.get(category) {
                let mut prepared = issue.clone();
                prepared.criterion = Some(code.to_string());
                append_language_note(&mut prepared);
                collected.push(prepared);
            }
        }
    }

    let unique = dedup_issues(collected, |issue| issue.criterion.clone());
    let grouped = group_by_code(unique, |issue| issue.criterion.clone());
    let items = build_items(grouped, WCAG_CRITERIA_ORDER, |code| {
        wcag_criterion_details(code)
            .map(|(name, level, summary)| {
                (name.to_string(), Some(level.to_string()), Some(summary.to_string()))
            })
            .unwrap_or_else(|| ("WCAG Criterion".to_string(), None, None))
    });
    CriteriaSection {
        status_counts: count_statuses(&items),
        items,
    }
}

fn build_pdfua_section(results: &IssueSet) -> Option<CriteriaSection> {
    let collected: Vec<Issue> = results.get(IssueCategory::PdfuaIssues).to_vec();
    let unique = dedup_issues(collected, |issue| issue.clause.clone());
    if unique.is_empty() {
        return None;
    }
    let grouped = group_by_code(unique, |issue| issue.clause.clone());
    let items = build_items(grouped, PDFUA_CLAUSE_ORDER, |code| {
        pdfua_clause_details(code)
            .map(|(name, summary)| (name.to_string(), None, Some(summary.to_string())))
            .unwrap_or_else(|| ("PDF/UA Requirement".to_string(), None, None))
    });
    Some(CriteriaSection {
        status_counts: count_statuses(&items),
        items,
    })
}

/// Deduplicate by (code, description, page, pages, context), dropping
/// issues without a code.
fn dedup_issues<F>(issues: Vec<Issue>, code_of: F) -> Vec<Issue>
where
    F: Fn(&Issue) -> Option<String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for issue in issues {
        let Some(code) = code_of(&issue).map(|c| c.trim().to_string()) else {
            continue;
        };
        if code.is_empty() {
            continue;
        }
        let key = (
            code,
            issue.description.trim().to_string(),
            issue.page,
            issue.pages.clone(),
            issue.context.clone().unwrap_or_default(),
        );
        if seen.insert(key) {
            out.push(issue);
        }
    }
    out
}

fn group_by_code<F>(issues: Vec<Issue>, code_of: F) -> BTreeMap<String, Vec<Issue>>
where
    F: Fn(&Issue) -> Option<String>,
{
    let mut grouped: BTreeMap<String, Vec<Issue>> = BTreeMap::new();
    for issue in issues {
        if let Some(code) = code_of(&issue) {
            grouped.entry(code.trim().to_string()).or_default().push(issue);
        }
    }
    grouped
}

fn build_items<F>(
    mut grouped: BTreeMap<String, Vec<Issue>>,
    order: &[&str],
    details: F,
) -> Vec<CriterionItem>
where
    F: Fn(&str) -> (String, Option<String>, Option<String>),
{
    let mut items = Vec::new();
    for &code in order {
        let issues = grouped.remove(code).unwrap_or_default();
        items.push(make_item(code, issues, &details));
    }
    // Unknown codes are appended in sorted order (BTreeMap iteration).
    for (code, issues) in grouped {
        items.push(make_item(&code, issues, &details));
    }
    items
}

fn make_item<F>(code: &str, issues: Vec<Issue>, details: &F) -> CriterionItem
where
    F: Fn(&str) -> (String, Option<String>, Option<String>),
{
    let (name, level, summary) = details(code);
    let status = if issues.is_empty() {
        CriterionStatus::Supports
    } else {
        CriterionStatus::DoesNotSupport
    };
    CriterionItem {
        code: code.to_string(),
        name,
        level,
        summary,
        issue_count: issues.len(),
        issues,
        status,
    }
}

fn count_statuses(items: &[CriterionItem]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for item in items {
        match item.status {
            CriterionStatus::Supports => counts.supports += 1,
            CriterionStatus::PartiallySupports => counts.partially_supports += 1,
            CriterionStatus::DoesNotSupport => counts.does_not_support += 1,
        }
    }
    counts
}

/// Append the default-language note to 3.1.1 findings.
fn append_language_note(issue: &mut Issue) {
    if issue.criterion.as_deref() != Some("3.1.1") {
        return;
    }
    let remediation = issue.remediation.take().unwrap_or_default();
    if remediation.contains(LANGUAGE_FIX_NOTE) {
        issue.remediation = Some(remediation);
        return;
    }
    let separator = if remediation.is_empty() { "" } else { " " };
    issue.remediation = Some(format!("{}{}{}", remediation, separator, LANGUAGE_FIX_NOTE));
}

/// Populate human-friendly `wcagCriteria` strings on mapped categories.
pub fn annotate_wcag_mappings(results: &mut IssueSet) {
    let mut annotations: Vec<(IssueCategory, String)> = Vec::new();
    for &category in IssueCategory::ALL {
        let codes = category_criteria(category);
        if codes.is_empty() {
            continue;
        }
        let text = codes
            .iter()
            .filter_map(|code| format_criterion_label(code, None))
            .collect::<Vec<_>>()
            .join("; ");
        if !text.is_empty() {
            annotations.push((category, text));
        }
    }

    for (category, issues) in results.iter_mut() {
        if category == IssueCategory::WcagIssues {
            for issue in issues.iter_mut() {
                if issue.wcag_criteria.is_none() {
                    if let Some(criterion) = issue.criterion.clone() {
                        let level = issue.level.map(|l| l.as_str().to_string());
                        issue.wcag_criteria = format_criterion_label(&criterion, level.as_deref());
                    }
                }
                append_language_note(issue);
            }
            continue;
        }
        if let Some((_, text)) = annotations.iter().find(|(c, _)| *c == category) {
            for issue in issues.iter_mut() {
                if issue.wcag_criteria.is_none() {
                    issue.wcag_criteria = Some(text.clone());
                }
                append_language_note(issue);
            }
        }
    }
}

fn format_criterion_label(code: &str, fallback_level: Option<&str>) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    match wcag_criterion_details(code) {
        Some((name, level, summary)) => {
            let level = fallback_level.unwrap_or(level);
            Some(format!("{} {} (Level {}) – {}", code, name, level, summary))
        },
        None => match fallback_level {
            Some(level) => Some(format!("{} (Level {})", code, level.to_uppercase())),
            None => Some(code.to_string()),
        },
    }
}
