//! Issue and scan-result records.
//!
//! Issues are immutable once emitted; validators build them with the
//! `with_*` helpers and hand them to an [`IssueSet`], which assigns the
//! stable `issueId` from the category, criterion/clause, page, and a
//! context hash.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issue buckets a scan can populate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum IssueCategory {
    /// WCAG success-criterion findings
    WcagIssues,
    /// PDF/UA clause and Matterhorn checkpoint findings
    PdfuaIssues,
    /// PDF/A (ISO 19005) findings
    PdfaIssues,
    /// Images without alternative text
    MissingAltText,
    /// Catalog language missing or invalid
    MissingLanguage,
    /// Title/author/subject metadata gaps
    MissingMetadata,
    /// Content without a structure tree
    UntaggedContent,
    /// Contrast findings and manual-review reminders
    PoorContrast,
    /// Form field labeling problems
    FormIssues,
    /// Table structure problems
    TableIssues,
    /// Heading hierarchy and structure-type problems
    StructureIssues,
    /// Reading-order problems
    ReadingOrderIssues,
    /// Link purpose problems
    LinkIssues,
    /// RoleMap entries that are missing or do not reach a standard type
    RoleMapMissingMappings,
    /// Font embedding and Unicode mapping problems
    FontIssues,
}

impl IssueCategory {
    /// Every category, in serialization order.
    pub const ALL: &'static [IssueCategory] = &[
        IssueCategory::WcagIssues,
        IssueCategory::PdfuaIssues,
        IssueCategory::PdfaIssues,
        IssueCategory::MissingAltText,
        IssueCategory::MissingLanguage,
        IssueCategory::MissingMetadata,
        IssueCategory::UntaggedContent,
        IssueCategory::PoorContrast,
        IssueCategory::FormIssues,
        IssueCategory::TableIssues,
        IssueCategory::StructureIssues,
        IssueCategory::ReadingOrderIssues,
        IssueCategory::LinkIssues,
        IssueCategory::RoleMapMissingMappings,
        IssueCategory::FontIssues,
    ];

    /// Wire name (camelCase, matching the serialized key).
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::WcagIssues => "wcagIssues",
            IssueCategory::PdfuaIssues => "pdfuaIssues",
            IssueCategory::PdfaIssues => "pdfaIssues",
            IssueCategory::MissingAltText => "missingAltText",
            IssueCategory::MissingLanguage => "missingLanguage",
            IssueCategory::MissingMetadata => "missingMetadata",
            IssueCategory::UntaggedContent => "untaggedContent",
            IssueCategory::PoorContrast => "poorContrast",
            IssueCategory::FormIssues => "formIssues",
            IssueCategory::TableIssues => "tableIssues",
            IssueCategory::StructureIssues => "structureIssues",
            IssueCategory::ReadingOrderIssues => "readingOrderIssues",
            IssueCategory::LinkIssues => "linkIssues",
            IssueCategory::RoleMapMissingMappings => "roleMapMissingMappings",
            IssueCategory::FontIssues => "fontIssues",
        }
    }
}

/// Issue severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks assistive technology outright
    Critical,
    /// Major accessibility barrier
    High,
    /// Significant but workable barrier
    #[default]
    Medium,
    /// Minor issue
    Low,
    /// Advisory / manual review
    Info,
}

impl Severity {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

/// WCAG conformance level of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    /// Level A
    A,
    /// Level AA
    AA,
    /// Level AAA
    AAA,
}

impl WcagLevel {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WcagLevel::A => "A",
            WcagLevel::AA => "AA",
            WcagLevel::AAA => "AAA",
        }
    }
}

/// A RoleMap entry that remaps a standard type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRemap {
    /// Remapped key (with leading slash, as found)
    pub from: String,
    /// Mapping target
    pub to: String,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Stable identifier assigned when the issue enters a set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    /// Human-readable description
    pub description: String,
    /// WCAG success criterion ("1.1.1")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<String>,
    /// ISO clause ("ISO 14289-1:7.5")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause: Option<String>,
    /// WCAG level for criterion findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<WcagLevel>,
    /// Severity
    pub severity: Severity,
    /// How to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Standard the finding belongs to ("WCAG 2.1 Level A")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    /// 1-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Pages for consolidated findings
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pages: Vec<u32>,
    /// Short sample or element label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Element/occurrence count for consolidated findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Human-friendly WCAG mapping annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_criteria: Option<String>,
    /// Matterhorn checkpoint code ("01-001")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
    /// Alias of checkpoint kept for downstream consumers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matterhorn_id: Option<String>,
    /// Location hint ("Page 3, Annotation 2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Detected script for language-of-parts findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_hint: Option<String>,
    /// Computed contrast ratio for contrast findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast_ratio: Option<f64>,
    /// True for single document-wide findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_wide: Option<bool>,
    /// Whether the automated engine can fix this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_fix_available: Option<bool>,
    /// Optional scoring override (0-5 scale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_weight: Option<f64>,
    /// Standard-type remappings behind a 02-004 finding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offending_mappings: Option<Vec<RoleRemap>>,
    /// Free-form advisory payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl Issue {
    /// New issue with just a description and severity.
    pub fn new(description: impl Into<String>, severity: Severity) -> Self {
        Self {
            description: description.into(),
            severity,
            ..Default::default()
        }
    }

    /// WCAG finding.
    pub fn wcag(
        description: impl Into<String>,
        criterion: &str,
        level: WcagLevel,
        severity: Severity,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            criterion: Some(criterion.to_string()),
            level: Some(level),
            severity,
            remediation: Some(remediation.into()),
            specification: Some(format!("WCAG 2.1 Level {}", level.as_str())),
            ..Default::default()
        }
    }

    /// PDF/UA finding.
    pub fn pdfua(
        description: impl Into<String>,
        clause: &str,
        severity: Severity,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            clause: Some(clause.to_string()),
            severity,
            remediation: Some(remediation.into()),
            specification: Some("PDF/UA-1 (ISO 14289-1)".to_string()),
            ..Default::default()
        }
    }

    /// PDF/A finding.
    pub fn pdfa(
        description: impl Into<String>,
        clause: &str,
        severity: Severity,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            clause: Some(clause.to_string()),
            severity,
            remediation: Some(remediation.into()),
            specification: Some("PDF/A-1 (ISO 19005-1)".to_string()),
            ..Default::default()
        }
    }

    /// Set the page.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the page when known.
    pub fn with_page_opt(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }

    /// Set the consolidated page list.
    pub fn with_pages(mut self, pages: Vec<u32>) -> Self {
        self.pages = pages;
        self
    }

    /// Set the context snippet.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the context when known.
    pub fn with_context_opt(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Set the occurrence count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the location hint.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the Matterhorn checkpoint code (mirrored into matterhornId).
    pub fn with_checkpoint(mut self, checkpoint: &str) -> Self {
        self.checkpoint = Some(checkpoint.to_string());
        self.matterhorn_id = Some(checkpoint.to_string());
        self
    }
}

/// Stable id: fnv1a over the discriminating fields, hex-encoded.
fn issue_fingerprint(category: IssueCategory, issue: &Issue) -> String {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    };
    feed(issue.description.as_bytes());
    feed(issue.context.as_deref().unwrap_or("").as_bytes());
    for page in &issue.pages {
        feed(&page.to_le_bytes());
    }

    let code = issue
        .criterion
        .as_deref()
        .or(issue.clause.as_deref())
        .or(issue.checkpoint.as_deref())
        .unwrap_or("general");
    format!(
        "{}-{}-p{}-{:08x}",
        category.as_str(),
        code.replace([':', ' ', '/'], "."),
        issue.page.unwrap_or(0),
        (hash >> 32) as u32 ^ (hash as u32)
    )
}

/// Issues grouped by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct IssueSet {
    map: BTreeMap<IssueCategory, Vec<Issue>>,
}

impl IssueSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue, assigning its stable id.
    pub fn add(&mut self, category: IssueCategory, mut issue: Issue) {
        if issue.issue_id.is_none() {
            issue.issue_id = Some(issue_fingerprint(category, &issue));
        }
        self.map.entry(category).or_default().push(issue);
    }

    /// Issues in one category.
    pub fn get(&self, category: IssueCategory) -> &[Issue] {
        self.map.get(&category).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// All (category, issues) pairs with content.
    pub fn iter(&self) -> impl Iterator<Item = (IssueCategory, &[Issue])> {
        self.map.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Mutable access for annotation passes.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (IssueCategory, &mut Vec<Issue>)> {
        self.map.iter_mut().map(|(c, v)| (*c, v))
    }

    /// Total issue count.
    pub fn total(&self) -> usize {
        self.map.values().map(|v| v.len()).sum()
    }

    /// Count of issues at a severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.map
            .values()
            .flatten()
            .filter(|i| i.severity == severity)
            .count()
    }

    /// Count within one category.
    pub fn count(&self, category: IssueCategory) -> usize {
        self.get(category).len()
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: IssueSet) {
        for (category, issues) in other.map {
            for issue in issues {
                self.add(category, issue);
            }
        }
    }
}

/// Summary block of a scan.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Total issues across categories
    pub total_issues: usize,
    /// High or critical issues
    pub high_severity: usize,
    /// Medium issues
    pub medium_severity: usize,
    /// Combined score (mean of WCAG and PDF/UA when available)
    pub compliance_score: f64,
    /// Authoritative WCAG percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_compliance: Option<f64>,
    /// Advisory PDF/UA percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdfua_compliance: Option<f64>,
}

/// Advisory validator statistics block.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerapdfStatus {
    /// WCAG percentage (authoritative copy)
    pub wcag_compliance: f64,
    /// PDF/UA percentage (advisory)
    pub pdfua_compliance: f64,
    /// WCAG issue count
    pub wcag_issue_count: usize,
    /// PDF/UA issue count
    pub pdfua_issue_count: usize,
    /// False when the scan aborted early
    pub validated: bool,
}

/// Full result of an analyze run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Issues by category
    pub results: IssueSet,
    /// Severity counts and scores
    pub summary: ScanSummary,
    /// Advisory statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verapdf_status: Option<VerapdfStatus>,
    /// Criteria summary for UI and scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria_summary: Option<crate::analysis::criteria::CriteriaSummary>,
    /// Fix plan derived from the issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixes: Option<crate::fixes::suggestions::FixPlan>,
    /// Set when the analyzer fell back to a partial result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
