//! Drift reports
//!
//! A [`DriftReport`] wraps the ordered diff with a verdict and renders it
//! either as text (one line per action) or as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitCode;

use crate::error::Result;
use crate::schema::diff::{DiffAction, DiffKind};

/// How urgent a single drift action is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Process outcome of a drift check; the numeric codes are what CI branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStatus {
    NoDrift,
    DriftDetected,
    Failure,
}

impl DriftStatus {
    pub fn code(self) -> u8 {
        match self {
            DriftStatus::NoDrift => 0,
            DriftStatus::DriftDetected => 1,
            DriftStatus::Failure => 2,
        }
    }

    /// Status for the outcome of a check, whether it ran or not
    pub fn of<E>(outcome: &std::result::Result<DriftReport, E>) -> Self {
        match outcome {
            Ok(report) => report.status(),
            Err(_) => DriftStatus::Failure,
        }
    }
}

impl From<DriftStatus> for ExitCode {
    fn from(status: DriftStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Count of actions per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub errors: usize,
    pub warnings: usize,
}

/// Result of one comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    has_drift: bool,
    highest_severity: Option<Severity>,
    summary: DriftSummary,
    actions: Vec<DiffAction>,
}

impl DriftReport {
    /// Build a report; action order is kept as given
    pub fn new(actions: Vec<DiffAction>) -> Self {
        let mut summary = DriftSummary::default();
        for action in &actions {
            match action.severity() {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
        }

        Self {
            has_drift: !actions.is_empty(),
            highest_severity: actions.iter().map(DiffAction::severity).max(),
            summary,
            actions,
        }
    }

    pub fn has_drift(&self) -> bool {
        self.has_drift
    }

    pub fn actions(&self) -> &[DiffAction] {
        &self.actions
    }

    pub fn summary(&self) -> DriftSummary {
        self.summary
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.highest_severity
    }

    /// Actions of one kind, in report order
    pub fn actions_of(&self, kind: DiffKind) -> impl Iterator<Item = &DiffAction> {
        self.actions.iter().filter(move |a| a.kind() == kind)
    }

    /// Actions at or above a severity, in report order
    pub fn actions_at_least(&self, severity: Severity) -> impl Iterator<Item = &DiffAction> {
        self.actions.iter().filter(move |a| a.severity() >= severity)
    }

    pub fn status(&self) -> DriftStatus {
        if self.has_drift {
            DriftStatus::DriftDetected
        } else {
            DriftStatus::NoDrift
        }
    }

    /// Human-readable rendering, one line per action
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_drift {
            return writeln!(f, "No schema drift detected.");
        }

        for action in &self.actions {
            writeln!(f, "{}", action)?;
        }
        Ok(())
    }
}
