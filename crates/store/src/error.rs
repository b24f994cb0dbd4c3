// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store failure type shared by every capability trait.

use crate::codec::CodecError;
use courier_core::StepError;
use thiserror::Error;

/// Every adapter operation fails with this; callers convert it to a step
/// `exception` with the message surfaced.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store record invalid: {0}")]
    Codec(#[from] CodecError),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable(message.into())
    }
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        StepError::StoreUnavailable(err.to_string())
    }
}
