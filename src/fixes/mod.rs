//! Remediation: fix planning, the automated engine, and progress
//! tracking.

pub mod engine;
pub mod progress;
pub mod suggestions;

pub use engine::{auto_fix, AutoFixEngine, FixOutcome, FixResult, ScanRecord};
pub use progress::{FixProgressTracker, ProgressSnapshot, StepStatus};
pub use suggestions::{generate_fix_suggestions, FixAction, FixPlan, FixType};
