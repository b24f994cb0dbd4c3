// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step record and status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five phases a work order moves through, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepName {
    Count,
    Prepare,
    Test,
    #[serde(rename = "Dry-Run")]
    DryRun,
    Send,
}

impl StepName {
    /// All steps in pipeline order.
    pub const ALL: [StepName; 5] =
        [StepName::Count, StepName::Prepare, StepName::Test, StepName::DryRun, StepName::Send];

    /// Parse a wire-format step name.
    pub fn parse(s: &str) -> Option<StepName> {
        match s {
            "Count" => Some(StepName::Count),
            "Prepare" => Some(StepName::Prepare),
            "Test" => Some(StepName::Test),
            "Dry-Run" => Some(StepName::DryRun),
            "Send" => Some(StepName::Send),
            _ => None,
        }
    }
}

crate::simple_display! {
    StepName {
        Count => "Count",
        Prepare => "Prepare",
        Test => "Test",
        DryRun => "Dry-Run",
        Send => "Send",
    }
}

/// Status of a step within a work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Enabled and waiting for a start command
    Ready,
    /// A handler is executing
    Working,
    /// Parked in the sleep queue between continuous-send passes
    Sleeping,
    /// Finished; enables the next step
    Complete,
    /// Failed with a classified error
    Error,
    /// Failed with an unclassified error (handler crash)
    Exception,
    /// Stopped cooperatively by a stop command
    Interrupted,
}

impl StepStatus {
    /// Whether a start command may (re)enter this status.
    ///
    /// `working` is excluded: a start against a working step is a duplicate
    /// request and is dropped by the main loop.
    pub fn can_start(&self) -> bool {
        !matches!(self, StepStatus::Working)
    }

    /// Whether a stop command applies to this status.
    pub fn can_stop(&self) -> bool {
        matches!(self, StepStatus::Working | StepStatus::Sleeping)
    }

    /// Terminal statuses close the step's `endTime`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Complete | StepStatus::Error | StepStatus::Exception | StepStatus::Interrupted
        )
    }

    /// Parse a wire-format status string.
    pub fn parse(s: &str) -> Option<StepStatus> {
        match s {
            "ready" => Some(StepStatus::Ready),
            "working" => Some(StepStatus::Working),
            "sleeping" => Some(StepStatus::Sleeping),
            "complete" => Some(StepStatus::Complete),
            "error" => Some(StepStatus::Error),
            "exception" => Some(StepStatus::Exception),
            "interrupted" => Some(StepStatus::Interrupted),
            _ => None,
        }
    }
}

crate::simple_display! {
    StepStatus {
        Ready => "ready",
        Working => "working",
        Sleeping => "sleeping",
        Complete => "complete",
        Error => "error",
        Exception => "exception",
        Interrupted => "interrupted",
    }
}

/// A phase within a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: StepName,
    pub status: StepStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Step {
    /// A freshly created, not-yet-enabled step.
    pub fn new(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Ready,
            message: String::new(),
            is_active: false,
            start_time: None,
            end_time: None,
        }
    }

    /// Reset to `ready`/active, clearing message and timestamps.
    ///
    /// Used when a completed step enables its successor.
    pub fn reset_ready(&mut self) {
        self.status = StepStatus::Ready;
        self.message.clear();
        self.is_active = true;
        self.start_time = None;
        self.end_time = None;
    }
}

crate::builder! {
    pub struct StepBuilder => Step {
        into {
            message: String = "",
        }
        set {
            name: StepName = StepName::Count,
            status: StepStatus = StepStatus::Ready,
            is_active: bool = false,
            start_time: Option<DateTime<Utc>> = None,
            end_time: Option<DateTime<Utc>> = None,
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
