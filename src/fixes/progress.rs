//! Fix progress tracking.
//!
//! Per-scan step machine with timing. The snapshot is JSON-serializable
//! so a host can poll remediation progress while a fix run executes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one step or of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Queued, not started
    Pending,
    /// Currently executing
    InProgress,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Skipped (document already satisfied the post-condition)
    Skipped,
}

/// One tracked step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based step id
    pub id: usize,
    /// Short step name
    pub name: String,
    /// What the step does
    pub description: String,
    /// Current status
    pub status: StepStatus,
    /// Start timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Completion details or skip reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializable progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Scan the run belongs to
    pub scan_id: String,
    /// Overall status
    pub status: StepStatus,
    /// Id of the step currently in progress (0 before the first)
    pub current_step: usize,
    /// Number of registered steps
    pub total_steps: usize,
    /// Completed step count
    pub completed_steps: usize,
    /// Failed step count
    pub failed_steps: usize,
    /// Integer percentage of completed steps
    pub progress: u8,
    /// All steps, in order
    pub steps: Vec<Step>,
    /// Run start time
    pub start_time: DateTime<Utc>,
    /// Overall failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tracks the progress of one remediation run.
#[derive(Debug)]
pub struct FixProgressTracker {
    scan_id: String,
    steps: Vec<Step>,
    status: StepStatus,
    current_step: usize,
    start_time: DateTime<Utc>,
    error: Option<String>,
}

impl FixProgressTracker {
    /// New tracker for a scan.
    pub fn new(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: scan_id.into(),
            steps: Vec::new(),
            status: StepStatus::Pending,
            current_step: 0,
            start_time: Utc::now(),
            error: None,
        }
    }

    /// Register a step; returns its 1-based id.
    pub fn add_step(&mut self, name: impl Into<String>, description: impl Into<String>) -> usize {
        let id = self.steps.len() + 1;
        self.steps.push(Step {
            id,
            name: name.into(),
            description: description.into(),
            status: StepStatus::Pending,
            start_time: None,
            end_time: None,
            duration: None,
            details: None,
            error: None,
        });
        id
    }

    fn step_mut(&mut self, step_id: usize) -> Option<&mut Step> {
        if step_id == 0 {
            return None;
        }
        self.steps.get_mut(step_id - 1)
    }

    /// Mark a step started.
    pub fn start_step(&mut self, step_id: usize) {
        if let Some(step) = self.step_mut(step_id) {
            step.status = StepStatus::InProgress;
            step.start_time = Some(Utc::now());
            self.current_step = step_id;
            self.status = StepStatus::InProgress;
            log::debug!("step {} started", step_id);
        }
    }

    /// Mark a step completed.
    pub fn complete_step(&mut self, step_id: usize, details: Option<String>) {
        if let Some(step) = self.step_mut(step_id) {
            step.status = StepStatus::Completed;
            step.end_time = Some(Utc::now());
            if let (Some(start), Some(end)) = (step.start_time, step.end_time) {
                step.duration = Some((end - start).num_milliseconds() as f64 / 1000.0);
            }
            step.details = details;
            log::debug!("step {} completed", step_id);
        }
    }

    /// Mark a step failed.
    pub fn fail_step(&mut self, step_id: usize, error: impl Into<String>) {
        if let Some(step) = self.step_mut(step_id) {
            step.status = StepStatus::Failed;
            step.end_time = Some(Utc::now());
            if let (Some(start), Some(end)) = (step.start_time, step.end_time) {
                step.duration = Some((end - start).num_milliseconds() as f64 / 1000.0);
            }
            step.error = Some(error.into());
            log::debug!("step {} failed", step_id);
        }
    }

    /// Mark a step skipped with a reason.
    pub fn skip_step(&mut self, step_id: usize, reason: impl Into<String>) {
        if let Some(step) = self.step_mut(step_id) {
            step.status = StepStatus::Skipped;
            step.details = Some(reason.into());
            log::debug!("step {} skipped", step_id);
        }
    }

    /// Mark the whole run completed.
    pub fn complete_all(&mut self) {
        self.status = StepStatus::Completed;
    }

    /// Mark the whole run failed.
    pub fn fail_all(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let completed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count();
        let progress = if self.steps.is_empty() {
            0
        } else {
            ((completed * 100) / self.steps.len()) as u8
        };
        ProgressSnapshot {
            scan_id: self.scan_id.clone(),
            status: self.status,
            current_step: self.current_step,
            total_steps: self.steps.len(),
            completed_steps: completed,
            failed_steps: failed,
            progress,
            steps: self.steps.clone(),
            start_time: self.start_time,
            error: self.error.clone(),
        }
    }

    /// Snapshot serialized to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
