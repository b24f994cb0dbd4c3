// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event records from the events table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-retreat presentation config used by `||retreats||` and `||balance||`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetreatConfig {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub offering_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConfig {
    #[serde(default)]
    pub currency: Option<String>,
    /// "installments" switches the `#if offering` condition to balance math
    #[serde(default)]
    pub offering_presentation: Option<String>,
    #[serde(default)]
    pub which_retreats_config: HashMap<String, RetreatConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEventRecord {
    #[serde(default)]
    pub reg_link_available: bool,
}

/// Externally owned event record keyed by event code (`aid`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub aid: String,
    #[serde(default)]
    pub config: EventConfig,
    #[serde(default)]
    pub sub_events: HashMap<String, SubEventRecord>,
    /// sub-event -> stage -> full language name -> prepared HTML URL
    #[serde(default)]
    pub embedded_emails: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

impl EventRecord {
    pub fn new(aid: impl Into<String>) -> Self {
        Self { aid: aid.into(), ..Self::default() }
    }

    /// Currency symbol and code for `||balance||`. Anything but EUR is USD.
    pub fn currency_parts(&self) -> (&'static str, &'static str) {
        match self.config.currency.as_deref() {
            Some("EUR") => ("€", "EUR"),
            _ => ("$", "USD"),
        }
    }

    pub fn reg_link_available(&self, sub_event: &str) -> bool {
        self.sub_events.get(sub_event).is_some_and(|s| s.reg_link_available)
    }

    /// Record a prepared-HTML URL under `embeddedEmails`.
    pub fn set_embedded_email(
        &mut self,
        sub_event: &str,
        stage: &str,
        full_language: &str,
        url: impl Into<String>,
    ) {
        self.embedded_emails
            .entry(sub_event.to_string())
            .or_default()
            .entry(stage.to_string())
            .or_default()
            .insert(full_language.to_string(), url.into());
    }
}
