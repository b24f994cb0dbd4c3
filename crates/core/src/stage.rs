// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage records: per-stage policy knobs from the stages table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Externally owned policy record keyed by stage tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: String,
    /// AND-over-pools overlay filter; absent means no stage filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<String>>,
    /// language code -> subject prefix
    #[serde(default)]
    pub prefix: HashMap<String, String>,
    /// Prepare QA: require a zoom link carrying the work order's zoom id
    #[serde(default)]
    pub qa_step_check_zoom_id: bool,
}

impl StageRecord {
    pub fn new(stage: impl Into<String>) -> Self {
        Self { stage: stage.into(), ..Self::default() }
    }
}
