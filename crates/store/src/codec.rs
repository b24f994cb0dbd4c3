// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record encoding between typed structs and the tagged-value wire form.
//!
//! Conversion happens exactly once, at this boundary; everything above it
//! operates on typed data.

use crate::attr::AttrValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record encoding failed: {0}")]
    Encode(serde_json::Error),
    #[error("record decoding failed: {0}")]
    Decode(serde_json::Error),
}

/// Encode a typed record into its tagged attribute map.
pub fn encode<T: Serialize>(record: &T) -> Result<AttrValue, CodecError> {
    let json = serde_json::to_value(record).map_err(CodecError::Encode)?;
    Ok(AttrValue::from_json(&json))
}

/// Decode a tagged (or plain, or nested-wrapped) attribute map into a typed
/// record.
pub fn decode<T: DeserializeOwned>(value: &AttrValue) -> Result<T, CodecError> {
    serde_json::from_value(value.to_plain_json()).map_err(CodecError::Decode)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
