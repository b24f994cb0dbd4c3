// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step failure taxonomy.
//!
//! Handlers return these; the executor classifies them into the terminal
//! step status. Cooperative stops travel as `Interrupted`, recognised
//! failures as `error`, anything unexplained as `exception`.

use crate::eligibility::MalformedPool;
use crate::personalize::PersonalizeError;
use crate::qa::QaFailure;
use crate::step::StepStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    /// Transient store or queue failure
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// Unknown work order, event, student or step
    #[error("{0}")]
    NotFound(String),
    /// Another agent holds the lease
    #[error("{0}")]
    LockDenied(String),
    /// Content QA failed in Prepare
    #[error("{0}")]
    Qa(#[from] QaFailure),
    /// Preconditions violated (missing HTML paths, no testers, form not ready)
    #[error("{0}")]
    Validation(String),
    /// Pool definition cannot be evaluated
    #[error("{0}")]
    MalformedPool(#[from] MalformedPool),
    /// Per-recipient HTML specialization failed
    #[error("{0}")]
    Personalize(#[from] PersonalizeError),
    /// 24-hour account quota breached
    #[error("{0}")]
    SendLimitReached(String),
    /// SMTP or collaborator transport failure that is not retriable
    #[error("{0}")]
    Transport(String),
    /// Cooperative stop observed at a poll point
    #[error("Step interrupted by stop request.")]
    Interrupted,
    /// Anything else: handler crash territory
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// The terminal status the executor records for this failure.
    pub fn terminal_status(&self) -> StepStatus {
        match self {
            StepError::Interrupted => StepStatus::Interrupted,
            StepError::StoreUnavailable(_) | StepError::Other(_) => StepStatus::Exception,
            StepError::NotFound(_)
            | StepError::LockDenied(_)
            | StepError::Qa(_)
            | StepError::Validation(_)
            | StepError::MalformedPool(_)
            | StepError::Personalize(_)
            | StepError::SendLimitReached(_)
            | StepError::Transport(_) => StepStatus::Error,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
