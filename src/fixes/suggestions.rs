//! Fix-suggestion planner.
//!
//! Consumes a scan's issue set and produces three ordered buckets:
//! `automated`, `semiAutomated`, and `manual`. Classification is a closed
//! mapping from issue signals to fix types so the same scan always plans
//! the same fixes. Semi-automated entries whose signature already appears
//! in the automated bucket are dropped, IDs are uniquified, and the time
//! estimate is recomputed after dedup.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet, Severity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// Closed set of fix operations the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FixType {
    /// Set the catalog language
    AddLanguage,
    /// Add title and core metadata
    AddMetadata,
    /// Add the DocInfo title specifically
    AddTitle,
    /// Set ViewerPreferences.DisplayDocTitle
    FixViewerPreferences,
    /// Complete and repair the RoleMap
    FixRoleMap,
    /// Create or repair MarkInfo / the structure-tree scaffold
    FixStructure,
    /// Add the PDF/A identifier to XMP
    #[serde(rename = "addPDFAIdentifier")]
    AddPdfaIdentifier,
    /// Mirror DocInfo and XMP metadata
    FixMetadataConsistency,
    /// Add an sRGB OutputIntent
    AddOutputIntent,
    /// Strip document encryption
    RemoveEncryption,
    /// Generate annotation appearance streams
    FixAnnotationAppearances,
    /// Other PDF/A repairs that need review
    #[serde(rename = "fixPDFA")]
    FixPdfa,
    /// Write alternative text
    AddAltText,
    /// Tag content structure
    TagContent,
    /// Label a form field
    AddFormLabel,
    /// Embed missing fonts
    EmbedFonts,
    /// Flatten transparency
    FlattenTransparency,
    /// Adjust colors for contrast
    FixContrast,
}

/// One planned fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixAction {
    /// Stable, unique id within the plan
    pub id: String,
    /// Short title
    pub title: String,
    /// What is wrong
    pub description: String,
    /// What the fix does
    pub action: String,
    /// Which engine operation applies
    pub fix_type: FixType,
    /// Source category
    pub category: String,
    /// Severity inherited from the issue
    pub severity: Severity,
    /// Estimated minutes
    pub estimated_time: u32,
    /// WCAG criterion, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<String>,
    /// ISO clause, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause: Option<String>,
    /// Page, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Pages, when consolidated
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pages: Vec<u32>,
    /// Parameters for the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_data: Option<serde_json::Value>,
    /// Manual steps for a human
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// The three buckets plus the recomputed time estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixPlan {
    /// Applied by the engine without input
    pub automated: Vec<FixAction>,
    /// Applied by the engine with user input
    pub semi_automated: Vec<FixAction>,
    /// Human-only fixes
    pub manual: Vec<FixAction>,
    /// Sum of estimated minutes across buckets
    pub estimated_time: u32,
}

impl FixPlan {
    /// Whether the plan contains an automated action of the given type.
    pub fn has_automated(&self, fix_type: FixType) -> bool {
        self.automated.iter().any(|f| f.fix_type == fix_type)
    }

    /// Total number of planned actions.
    pub fn len(&self) -> usize {
        self.automated.len() + self.semi_automated.len() + self.manual.len()
    }

    /// True when no actions were planned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ActionBuilder {
    action: FixAction,
}

impl ActionBuilder {
    fn new(id: &str, fix_type: FixType, title: &str, issue: &Issue, category: &str) -> Self {
        Self {
            action: FixAction {
                id: id.to_string(),
                title: title.to_string(),
                description: issue.description.clone(),
                action: issue
                    .remediation
                    .clone()
                    .unwrap_or_else(|| title.to_string()),
                fix_type,
                category: category.to_string(),
                severity: issue.severity,
                estimated_time: 1,
                criterion: issue.criterion.clone(),
                clause: issue.clause.clone(),
                page: issue.page,
                pages: issue.pages.clone(),
                fix_data: None,
                instructions: None,
            },
        }
    }

    fn minutes(mut self, minutes: u32) -> Self {
        self.action.estimated_time = minutes;
        self
    }

    fn data(mut self, data: serde_json::Value) -> Self {
        self.action.fix_data = Some(data);
        self
    }

    fn instructions(mut self, text: &str) -> Self {
        self.action.instructions = Some(text.to_string());
        self
    }

    fn build(self) -> FixAction {
        self.action
    }
}

/// Generate the fix plan for a scan's issues.
pub fn generate_fix_suggestions(results: &IssueSet) -> FixPlan {
    let mut plan = FixPlan::default();
    let mut processed: HashSet<String> = HashSet::new();

    classify_wcag_issues(results, &mut plan, &mut processed);
    classify_pdfua_issues(results, &mut plan, &mut processed);
    classify_pdfa_issues(results, &mut plan, &mut processed);
    classify_category_issues(results, &mut plan);

    plan.semi_automated = dedupe_semi_automated(&plan.automated, std::mem::take(&mut plan.semi_automated));
    apply_unique_fix_ids(&mut plan);
    plan.estimated_time = recompute_estimated_time(&plan);
    plan
}

fn classify_wcag_issues(results: &IssueSet, plan: &mut FixPlan, processed: &mut HashSet<String>) {
    for issue in results.get(IssueCategory::WcagIssues) {
        let criterion = issue.criterion.clone().unwrap_or_default();
        let key = format!("wcag-{}-{}", criterion, issue.description);
        if !processed.insert(key) {
            continue;
        }
        let lower = issue.description.to_lowercase();

        if lower.contains("title") && lower.contains("info dictionary") {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("wcag-title-info-{}", criterion),
                    FixType::AddTitle,
                    "Add document title to info dictionary",
                    issue,
                    "wcagIssues",
                )
                .build(),
            );
        } else if lower.contains("metadata") || lower.contains("dc:title") {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("wcag-metadata-{}", criterion),
                    FixType::AddMetadata,
                    "Add document metadata and title",
                    issue,
                    "wcagIssues",
                )
                .build(),
            );
        } else if lower.contains("reading order") {
            plan.manual.push(
                ActionBuilder::new(
                    &format!("wcag-reading-order-{}", criterion),
                    FixType::TagContent,
                    "Fix reading order",
                    issue,
                    "wcagIssues",
                )
                .minutes(20)
                .instructions("Use a PDF editor to create a structure tree and define reading order")
                .build(),
            );
        } else if criterion == "3.1.1" {
            // The language fix is planned from the missingLanguage bucket.
            continue;
        } else {
            plan.semi_automated.push(
                ActionBuilder::new(
                    &format!("wcag-{}", criterion),
                    FixType::TagContent,
                    &format!("Fix WCAG {} issue", criterion),
                    issue,
                    "wcagIssues",
                )
                .minutes(10)
                .build(),
            );
        }
    }
}

fn classify_pdfua_issues(results: &IssueSet, plan: &mut FixPlan, processed: &mut HashSet<String>) {
    for issue in results.get(IssueCategory::PdfuaIssues) {
        let clause = issue.clause.clone().unwrap_or_default();
        let key = format!("pdfua-{}-{}", clause, issue.description);
        if !processed.insert(key) {
            continue;
        }
        let lower = issue.description.to_lowercase();

        if lower.contains("displaydoctitle") || lower.contains("viewerpreferences") {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("pdfua-viewerprefs-{}", clause),
                    FixType::FixViewerPreferences,
                    "Display the document title in the window bar",
                    issue,
                    "pdfuaIssues",
                )
                .build(),
            );
        } else if lower.contains("metadata stream") || lower.contains("suspects") {
            let fix_type = if lower.contains("metadata stream") {
                FixType::AddMetadata
            } else {
                FixType::FixStructure
            };
            plan.automated.push(
                ActionBuilder::new(
                    &format!("pdfua-{}", clause),
                    fix_type,
                    "Fix PDF/UA structure issue",
                    issue,
                    "pdfuaIssues",
                )
                .build(),
            );
        } else if lower.contains("dc:title") {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("pdfua-dctitle-{}", clause),
                    FixType::AddMetadata,
                    "Add dc:title to metadata",
                    issue,
                    "pdfuaIssues",
                )
                .build(),
            );
        } else if lower.contains("structure tree") || lower.contains("marked as tagged")
            || lower.contains("markinfo")
        {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("pdfua-structure-tree-{}", clause),
                    FixType::FixStructure,
                    "Create structure tree",
                    issue,
                    "pdfuaIssues",
                )
                .build(),
            );
        } else {
            plan.semi_automated.push(
                ActionBuilder::new(
                    &format!("pdfua-{}", clause),
                    FixType::TagContent,
                    &format!("Fix PDF/UA {} issue", clause),
                    issue,
                    "pdfuaIssues",
                )
                .minutes(10)
                .build(),
            );
        }
    }
}

fn classify_pdfa_issues(results: &IssueSet, plan: &mut FixPlan, processed: &mut HashSet<String>) {
    for issue in results.get(IssueCategory::PdfaIssues) {
        let clause = issue.clause.clone().unwrap_or_default();
        let key = format!("pdfa-{}-{}", clause, issue.description);
        if !processed.insert(key) {
            continue;
        }
        let lower = issue.description.to_lowercase();

        if lower.contains("pdfaid:part") || lower.contains("pdf/a identification") {
            plan.automated.push(
                ActionBuilder::new(
                    "add-pdfa-identifier",
                    FixType::AddPdfaIdentifier,
                    "Add PDF/A identifier",
                    issue,
                    "pdfaIssues",
                )
                .build(),
            );
        } else if lower.contains("disagree") || lower.contains("consistency") {
            plan.automated.push(
                ActionBuilder::new(
                    "fix-metadata-consistency",
                    FixType::FixMetadataConsistency,
                    "Synchronize DocInfo and XMP metadata",
                    issue,
                    "pdfaIssues",
                )
                .build(),
            );
        } else if lower.contains("outputintent") {
            plan.semi_automated.push(
                ActionBuilder::new(
                    "add-output-intent",
                    FixType::AddOutputIntent,
                    "Add an sRGB OutputIntent",
                    issue,
                    "pdfaIssues",
                )
                .minutes(2)
                .build(),
            );
        } else if lower.contains("encrypted") {
            plan.semi_automated.push(
                ActionBuilder::new(
                    "remove-encryption",
                    FixType::RemoveEncryption,
                    "Remove document encryption",
                    issue,
                    "pdfaIssues",
                )
                .minutes(5)
                .build(),
            );
        } else if lower.contains("appearance stream") {
            plan.semi_automated.push(
                ActionBuilder::new(
                    "fix-annotation-appearances",
                    FixType::FixAnnotationAppearances,
                    "Generate annotation appearance streams",
                    issue,
                    "pdfaIssues",
                )
                .minutes(5)
                .build(),
            );
        } else if lower.contains("not embedded") {
            plan.manual.push(
                ActionBuilder::new(
                    "embed-fonts",
                    FixType::EmbedFonts,
                    "Embed missing fonts",
                    issue,
                    "pdfaIssues",
                )
                .minutes(15)
                .instructions("Re-export the document with font embedding enabled, or embed fonts in a PDF editor")
                .build(),
            );
        } else if lower.contains("transparency") || lower.contains("blend mode") {
            plan.manual.push(
                ActionBuilder::new(
                    "flatten-transparency",
                    FixType::FlattenTransparency,
                    "Flatten transparency",
                    issue,
                    "pdfaIssues",
                )
                .minutes(10)
                .build(),
            );
        } else {
            plan.semi_automated.push(
                ActionBuilder::new(
                    &format!("pdfa-{}", clause),
                    FixType::FixPdfa,
                    &format!("Fix PDF/A {} compliance", clause),
                    issue,
                    "pdfaIssues",
                )
                .minutes(12)
                .build(),
            );
        }
    }
}

fn classify_category_issues(results: &IssueSet, plan: &mut FixPlan) {
    // Language: one automated action regardless of issue count.
    if let Some(issue) = results.get(IssueCategory::MissingLanguage).first() {
        plan.automated.push(
            ActionBuilder::new("fix-language", FixType::AddLanguage, "Set document language", issue, "language")
                .data(json!({ "language": "en-US" }))
                .build(),
        );
    }

    for issue in results.get(IssueCategory::MissingMetadata) {
        let lower = issue.description.to_lowercase();
        if lower.contains("title") {
            plan.automated.push(
                ActionBuilder::new(
                    &format!("add-metadata-{}", issue.page.unwrap_or(1)),
                    FixType::AddMetadata,
                    "Add default metadata",
                    issue,
                    "metadata",
                )
                .build(),
            );
        } else {
            // Author / subject gaps always need human review.
            plan.semi_automated.push(
                ActionBuilder::new(
                    "review-metadata",
                    FixType::AddMetadata,
                    "Review document metadata",
                    issue,
                    "metadata",
                )
                .minutes(3)
                .build(),
            );
        }
    }

    if !results.get(IssueCategory::RoleMapMissingMappings).is_empty() {
        let issue = &results.get(IssueCategory::RoleMapMissingMappings)[0];
        plan.automated.push(
            ActionBuilder::new("fix-rolemap", FixType::FixRoleMap, "Complete the RoleMap", issue, "structure")
                .data(issue.meta.clone().unwrap_or_else(|| json!({})))
                .build(),
        );
    }

    for issue in results.get(IssueCategory::MissingAltText) {
        let count = issue.count.unwrap_or(1);
        plan.manual.push(
            ActionBuilder::new("add-alt-text", FixType::AddAltText, "Add alternative text to images", issue, "images")
                .minutes((count * 2) as u32)
                .instructions("Describe each image's purpose in its Figure element's Alt entry")
                .build(),
        );
    }

    for issue in results.get(IssueCategory::FormIssues) {
        let count = issue.count.unwrap_or(1);
        plan.manual.push(
            ActionBuilder::new("fix-forms", FixType::AddFormLabel, "Add form field labels", issue, "forms")
                .minutes((count * 3) as u32)
                .build(),
        );
    }

    for issue in results.get(IssueCategory::UntaggedContent) {
        plan.manual.push(
            ActionBuilder::new("tag-content", FixType::TagContent, "Tag content structure", issue, "structure")
                .minutes(30)
                .instructions("Use a PDF editor to add heading, paragraph, and list structure tags")
                .build(),
        );
    }

    for issue in results.get(IssueCategory::TableIssues) {
        let count = issue.count.unwrap_or(1);
        plan.manual.push(
            ActionBuilder::new("fix-tables", FixType::TagContent, "Fix table structure", issue, "tables")
                .minutes((count * 20) as u32)
                .instructions("Define table headers, data cells, and scopes in a PDF editor")
                .build(),
        );
    }

    for issue in results.get(IssueCategory::PoorContrast) {
        if issue.severity == Severity::Info {
            continue;
        }
        let count = issue.count.unwrap_or(1);
        plan.manual.push(
            ActionBuilder::new("fix-contrast", FixType::FixContrast, "Improve color contrast", issue, "color")
                .minutes((count * 5) as u32)
                .instructions("Adjust text and background colors to at least a 4.5:1 contrast ratio")
                .build(),
        );
    }

    for issue in results.get(IssueCategory::StructureIssues) {
        plan.manual.push(
            ActionBuilder::new("fix-structure", FixType::TagContent, "Fix document structure", issue, "structure")
                .minutes(40)
                .instructions("Ensure heading levels (H1, H2, H3) form a logical document outline")
                .build(),
        );
    }

    for issue in results.get(IssueCategory::ReadingOrderIssues) {
        plan.manual.push(
            ActionBuilder::new("fix-reading-order", FixType::TagContent, "Correct reading order", issue, "structure")
                .minutes(20)
                .build(),
        );
    }

    for issue in results.get(IssueCategory::LinkIssues) {
        let count = issue.count.unwrap_or(1);
        plan.manual.push(
            ActionBuilder::new("fix-links", FixType::TagContent, "Describe link destinations", issue, "links")
                .minutes((count * 2) as u32)
                .build(),
        );
    }

    for issue in results.get(IssueCategory::FontIssues) {
        plan.manual.push(
            ActionBuilder::new("embed-fonts", FixType::EmbedFonts, "Repair font Unicode mappings", issue, "fonts")
                .minutes(15)
                .build(),
        );
    }
}

/// Signature used to drop semi-automated entries already covered by an
/// automated one.
fn signature(fix: &FixAction) -> (String, String) {
    if let Some(criterion) = &fix.criterion {
        return ("criterion".to_string(), criterion.trim().to_lowercase());
    }
    if let Some(clause) = &fix.clause {
        return ("clause".to_string(), clause.trim().to_lowercase());
    }
    if !fix.description.is_empty() {
        return ("description".to_string(), fix.description.trim().to_lowercase());
    }
    ("id".to_string(), fix.id.clone())
}

fn dedupe_semi_automated(automated: &[FixAction], semi: Vec<FixAction>) -> Vec<FixAction> {
    let automated_sigs: HashSet<(String, String)> = automated.iter().map(signature).collect();
    semi.into_iter()
        .filter(|fix| !automated_sigs.contains(&signature(fix)))
        .collect()
}

/// Make every id unique. Prefixes in the force-suffix set always carry a
/// counter so downstream consumers can rely on "fix-contrast-1" shapes.
fn apply_unique_fix_ids(plan: &mut FixPlan) {
    const FORCE_SUFFIX: &[&str] = &[
        "fix-contrast",
        "fix-tables",
        "fix-table",
        "set-language",
        "fix-language",
    ];
    let mut counters: HashMap<String, u32> = HashMap::new();
    let mut existing: HashSet<String> = HashSet::new();

    let mut assign = |fix: &mut FixAction| {
        let mut normalized = if fix.id.is_empty() { "fix".to_string() } else { fix.id.clone() };
        if normalized == "set-language" {
            normalized = "fix-language".to_string();
        }
        let counter = counters.entry(normalized.clone()).or_insert(0);
        *counter += 1;
        let needs_suffix = FORCE_SUFFIX.contains(&normalized.as_str()) || *counter > 1;
        let mut candidate = if needs_suffix {
            format!("{}-{}", normalized, counter)
        } else {
            normalized.clone()
        };
        while existing.contains(&candidate) {
            *counters.get_mut(&normalized).expect("counter just inserted") += 1;
            candidate = format!("{}-{}", normalized, counters[&normalized]);
        }
        fix.id = candidate.clone();
        existing.insert(candidate);
    };

    for fix in &mut plan.automated {
        assign(fix);
    }
    for fix in &mut plan.semi_automated {
        assign(fix);
    }
    for fix in &mut plan.manual {
        assign(fix);
    }
}

fn recompute_estimated_time(plan: &FixPlan) -> u32 {
    plan.automated
        .iter()
        .chain(&plan.semi_automated)
        .chain(&plan.manual)
        .map(|f| f.estimated_time)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::issue::WcagLevel;

    fn results_with(category: IssueCategory, issue: Issue) -> IssueSet {
        let mut set = IssueSet::new();
        set.add(category, issue);
        set
    }

    #[test]
    fn test_missing_language_plans_automated_fix() {
        let results = results_with(
            IssueCategory::MissingLanguage,
            Issue::new("Document language not specified", Severity::High).with_page(1),
        );
        let plan = generate_fix_suggestions(&results);
        assert_eq!(plan.automated.len(), 1);
        let fix = &plan.automated[0];
        assert_eq!(fix.fix_type, FixType::AddLanguage);
        // Forced-suffix prefix always carries a counter.
        assert_eq!(fix.id, "fix-language-1");
        assert_eq!(fix.fix_data.as_ref().unwrap()["language"], "en-US");
        assert_eq!(plan.estimated_time, 1);
    }

    #[test]
    fn test_wcag_language_issue_not_double_planned() {
        let mut results = IssueSet::new();
        results.add(
            IssueCategory::WcagIssues,
            Issue::wcag(
                "Document language not specified",
                "3.1.1",
                WcagLevel::A,
                Severity::High,
                "Set the Lang entry",
            ),
        );
        results.add(
            IssueCategory::MissingLanguage,
            Issue::new("Document language not specified", Severity::High),
        );
        let plan = generate_fix_suggestions(&results);
        let language_fixes: Vec<_> = plan
            .automated
            .iter()
            .filter(|f| f.fix_type == FixType::AddLanguage)
            .collect();
        assert_eq!(language_fixes.len(), 1);
    }

    #[test]
    fn test_title_issue_classified_automated() {
        let results = results_with(
            IssueCategory::WcagIssues,
            Issue::wcag(
                "Document title not specified in info dictionary",
                "2.4.2",
                WcagLevel::A,
                Severity::Medium,
                "Add a Title entry",
            ),
        );
        let plan = generate_fix_suggestions(&results);
        assert!(plan.has_automated(FixType::AddTitle));
    }

    #[test]
    fn test_rolemap_issue_plans_fix_rolemap() {
        let mut issue = Issue::new("RoleMap does not map 2 custom structure type(s)", Severity::Medium);
        issue.meta = Some(json!({"missingMappings": ["Chart", "Footer"]}));
        let results = results_with(IssueCategory::RoleMapMissingMappings, issue);
        let plan = generate_fix_suggestions(&results);
        assert!(plan.has_automated(FixType::FixRoleMap));
        let fix = plan
            .automated
            .iter()
            .find(|f| f.fix_type == FixType::FixRoleMap)
            .unwrap();
        assert_eq!(fix.fix_data.as_ref().unwrap()["missingMappings"][0], "Chart");
    }

    #[test]
    fn test_alt_text_and_tables_are_manual() {
        let mut results = IssueSet::new();
        results.add(
            IssueCategory::MissingAltText,
            Issue::new("3 image(s) lack alternative text", Severity::High)
                .with_count(3)
                .with_pages(vec![1, 2]),
        );
        results.add(
            IssueCategory::TableIssues,
            Issue::new("1 table(s) have missing headers", Severity::High).with_count(1),
        );
        let plan = generate_fix_suggestions(&results);
        assert!(plan.automated.is_empty());
        let ids: Vec<&str> = plan.manual.iter().map(|f| f.id.as_str()).collect();
        assert!(ids.contains(&"add-alt-text"));
        assert!(ids.contains(&"fix-tables-1"));
        // 3 images * 2 min + 1 table * 20 min
        assert_eq!(plan.estimated_time, 26);
    }

    #[test]
    fn test_semi_automated_deduped_against_automated() {
        let mut results = IssueSet::new();
        // Same clause lands in automated (suspects) and would land in
        // semi-automated via the generic arm.
        results.add(
            IssueCategory::PdfuaIssues,
            Issue::pdfua(
                "Document has Suspects entry set to true",
                "ISO 14289-1:7.1",
                Severity::High,
                "Set Suspects to false",
            ),
        );
        results.add(
            IssueCategory::PdfuaIssues,
            Issue::pdfua(
                "Annotation on page 1 lacks description",
                "ISO 14289-1:7.1",
                Severity::Medium,
                "Add Contents",
            ),
        );
        let plan = generate_fix_suggestions(&results);
        assert_eq!(plan.automated.len(), 1);
        // The generic entry shares the clause signature and is dropped.
        assert!(plan.semi_automated.is_empty());
    }

    #[test]
    fn test_ids_uniquified_with_counters() {
        let mut results = IssueSet::new();
        results.add(
            IssueCategory::UntaggedContent,
            Issue::new("Content on pages 1-3 is untagged", Severity::High),
        );
        results.add(
            IssueCategory::UntaggedContent,
            Issue::new("Content on page 9 is untagged", Severity::High),
        );
        let plan = generate_fix_suggestions(&results);
        let ids: Vec<&str> = plan.manual.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["tag-content", "tag-content-2"]);
    }

    #[test]
    fn test_info_contrast_not_planned() {
        let results = results_with(
            IssueCategory::PoorContrast,
            Issue::new("Contrast could not be measured automatically", Severity::Info),
        );
        let plan = generate_fix_suggestions(&results);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_pdfa_identifier_automated_output_intent_semi() {
        let mut results = IssueSet::new();
        results.add(
            IssueCategory::PdfaIssues,
            Issue::pdfa(
                "XMP metadata lacks PDF/A identification (pdfaid:part)",
                "ISO 19005-1:2005, 6.7.11",
                Severity::Critical,
                "Add pdfaid:part",
            ),
        );
        results.add(
            IssueCategory::PdfaIssues,
            Issue::pdfa(
                "Document lacks OutputIntents (required for PDF/A)",
                "ISO 19005-1:2005, 6.2.2",
                Severity::High,
                "Add ICC profile",
            ),
        );
        let plan = generate_fix_suggestions(&results);
        assert!(plan.has_automated(FixType::AddPdfaIdentifier));
        assert!(plan
            .semi_automated
            .iter()
            .any(|f| f.fix_type == FixType::AddOutputIntent));
    }

    #[test]
    fn test_fix_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&FixType::AddPdfaIdentifier).unwrap(),
            "\"addPDFAIdentifier\""
        );
        assert_eq!(
            serde_json::to_string(&FixType::FixViewerPreferences).unwrap(),
            "\"fixViewerPreferences\""
        );
        assert_eq!(serde_json::to_string(&FixType::FixPdfa).unwrap(), "\"fixPDFA\"");
    }

    #[test]
    fn test_estimated_time_recomputed_after_dedup() {
        let mut results = IssueSet::new();
        results.add(
            IssueCategory::PdfuaIssues,
            Issue::pdfua(
                "ViewerPreferences.DisplayDocTitle is not set to true",
                "ISO 14289-1:7.1",
                Severity::Medium,
                "Set DisplayDocTitle",
            ),
        );
        results.add(
            IssueCategory::PdfuaIssues,
            Issue::pdfua(
                "Annotation on page 2 lacks description",
                "ISO 14289-1:7.1",
                Severity::Medium,
                "Add Contents",
            ),
        );
        let plan = generate_fix_suggestions(&results);
        // One automated (1 min); the semi entry was deduped away.
        assert_eq!(plan.estimated_time, 1);
    }
}
