// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Student (recipient) record and the per-event program state it carries.
//!
//! Students are externally owned; the agent reads everything and writes only
//! `emails[campaignString]` after a successful non-dry send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One installment payment inside an offering record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    #[serde(default)]
    pub offering_amount: f64,
    #[serde(default)]
    pub offering_intent: Option<String>,
    #[serde(default)]
    pub offering_refund: Option<f64>,
}

/// Offering history for one sub-event of a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingRecord {
    #[serde(default, rename = "offeringSKU")]
    pub offering_sku: Option<String>,
    #[serde(default)]
    pub offering_intent: Option<String>,
    #[serde(default)]
    pub installments: HashMap<String, Installment>,
}

impl OfferingRecord {
    /// Sum of installment amounts received so far.
    pub fn amount_received(&self) -> f64 {
        self.installments.values().map(|i| i.offering_amount).sum()
    }
}

/// Per-event program state for a student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub join: bool,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub withdrawn: bool,
    #[serde(default)]
    pub oath: bool,
    #[serde(default)]
    pub attended: bool,
    #[serde(default)]
    pub manual_include: bool,
    #[serde(default)]
    pub eligible: bool,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub limit_fee: bool,
    /// retreat key -> selected flag
    #[serde(default)]
    pub which_retreats: HashMap<String, bool>,
    /// sub-event -> offering record
    #[serde(default)]
    pub offering_history: HashMap<String, OfferingRecord>,
}

impl Program {
    /// Retreat keys the student selected, sorted for stable output.
    pub fn selected_retreats(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .which_retreats
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

/// A recipient record from the student table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Full language name (e.g. "French"), when the student has a preference
    #[serde(default)]
    pub written_lang_pref: Option<String>,
    #[serde(default)]
    pub unsubscribe: bool,
    /// campaign string -> ISO-8601 send timestamp (at-most-one-send ledger)
    #[serde(default)]
    pub emails: HashMap<String, String>,
    #[serde(default)]
    pub practice: HashMap<String, bool>,
    /// event code -> program state
    #[serde(default)]
    pub programs: HashMap<String, Program>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last).trim().to_string()
    }

    pub fn program(&self, event_code: &str) -> Option<&Program> {
        self.programs.get(event_code)
    }
}

/// One line of the dry-run / send recipient logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientEntry {
    pub name: String,
    pub email: String,
    pub sendtime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

crate::builder! {
    pub struct StudentBuilder => Student {
        into {
            id: String = "st-1",
            email: String = "student@example.org",
            first: String = "Ada",
            last: String = "Lovelace",
        }
        set {
            unsubscribe: bool = false,
            emails: HashMap<String, String> = HashMap::new(),
            practice: HashMap<String, bool> = HashMap::new(),
            programs: HashMap<String, Program> = HashMap::new(),
        }
        option {
            country: String = None,
            written_lang_pref: String = None,
        }
    }
}

#[cfg(test)]
#[path = "student_tests.rs"]
mod tests;
