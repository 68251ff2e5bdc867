// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF A11y
//!
//! PDF accessibility toolkit in Rust: analyze documents against WCAG 2.1
//! (Levels A/AA/AAA), PDF/UA-1 (ISO 14289-1), and PDF/A-1 (ISO 19005),
//! and remediate the object graph so the reported issues disappear on
//! re-scan.
//!
//! ## Core Features
//!
//! ### Analysis
//! - **Structure-tree walk**: RoleMap-resolved, cycle-safe traversal of
//!   tagged content with MCID/OBJR collection
//! - **WCAG 2.1 checks**: language, title, alt text, tables, headings,
//!   lists, sensory wording, link purpose, focus order, contrast
//! - **PDF/UA checks**: Matterhorn-style checkpoint registry (01-xxx …
//!   31-xxx)
//! - **PDF/A-1 checks**: version, OutputIntents, fonts, transparency,
//!   actions, XMP identification
//! - **Scoring**: severity-weighted WCAG percentage plus an advisory
//!   PDF/UA figure, combined into one compliance score
//!
//! ### Remediation
//! - **Automated fixes**: language, title and XMP, MarkInfo,
//!   ViewerPreferences, structure-tree scaffold, RoleMap completion,
//!   PDF/A identification, metadata consistency
//! - **Fix planning**: reproducible `automated` / `semiAutomated` /
//!   `manual` buckets with stable ids and time estimates
//! - **Versioning**: every remediated revision archived as
//!   `<base>_vN.pdf` with a remote-storage sidecar; only the latest
//!   version is downloadable by default
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_a11y::{analyze, apply_automated_fixes, ScanRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scan = analyze("report.pdf")?;
//! println!("compliance: {}", scan.summary.compliance_score);
//!
//! let record = ScanRecord {
//!     scan_id: "scan-1".into(),
//!     file_path: "report.pdf".into(),
//!     original_filename: Some("report.pdf".into()),
//!     results: Some(scan),
//! };
//! let outcome = apply_automated_fixes("scan-1", &record)?;
//! println!("applied {} fixes", outcome.success_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of
//!
//! * Apache License, Version 2.0
//! * MIT license
//!
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod xref;

// Content streams and metadata
pub mod content;
pub mod metadata;

// Language tags and script detection
pub mod language;

// PDF logical structure (Tagged PDFs)
pub mod structure;

// Conformance validators
pub mod validators;

// Scan records, criteria summary, scoring
pub mod analysis;

// Fix planning, remediation engine, progress tracking
pub mod fixes;

// Fixed-revision version store
pub mod versioning;

// Optional AI remediation hook
pub mod ai;

// PDF writing
pub mod writer;

// High-level API
pub mod api;

// Re-exports
pub use analysis::{Issue, IssueCategory, IssueSet, ScanResult, ScanSummary, Severity, WcagLevel};
pub use api::{
    analyze, analyze_with, apply_automated_fixes, apply_manual_fix, build_fix_history,
    validate_pdfa, validate_wcag_pdfua, CancelToken, FixHistoryRecord, RunOptions,
};
pub use document::{PdfDocument, SaveOptions};
pub use error::{Error, Result};
pub use fixes::{auto_fix, AutoFixEngine, FixOutcome, FixPlan, FixType, ScanRecord};
pub use versioning::{FixVersionStore, RemoteStore, VersionEntry};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
