//! Scan records, criteria summaries, and compliance scoring.

pub mod criteria;
pub mod issue;
pub mod scoring;

pub use criteria::{build_criteria_summary, CriteriaSummary};
pub use issue::{
    Issue, IssueCategory, IssueSet, RoleRemap, ScanResult, ScanSummary, Severity,
    VerapdfStatus, WcagLevel,
};
