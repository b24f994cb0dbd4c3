// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work order record: one email campaign job and its step pipeline.

use crate::step::{Step, StepName, StepStatus};
use crate::student::RecipientEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Lifecycle tag for work orders parked between continuous-send passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderState {
    Sleeping,
}

crate::simple_display! {
    WorkOrderState {
        Sleeping => "Sleeping",
    }
}

/// A persisted campaign job.
///
/// Invariants (enforced by the mutators below, checked by the store tests):
/// - at most one step has `is_active == true`
/// - `locked_by` is non-empty iff `locked`
/// - `state == Sleeping` implies `sleep_until` is set and the order is locked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: String,
    #[serde(default)]
    pub event_code: String,
    #[serde(default)]
    pub sub_event: String,
    #[serde(default)]
    pub stage: String,
    /// language code -> subject line
    #[serde(default)]
    pub subjects: HashMap<String, String>,
    /// language code -> enabled flag; BTreeMap so iteration order is stable
    #[serde(default)]
    pub languages: BTreeMap<String, bool>,
    /// SMTP sender account key
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub zoom_id: Option<String>,
    #[serde(default)]
    pub in_person: bool,
    /// Absent counts as true for the `||name||` QA check
    #[serde(default)]
    pub salutation_by_name: Option<bool>,
    #[serde(default)]
    pub reg_link_present: bool,
    /// Ordered recipient ids for the Test step
    #[serde(default)]
    pub testers: Vec<String>,
    /// Free-form configuration; `pool` names the eligibility pool
    #[serde(default)]
    pub config: HashMap<String, String>,
    /// language code -> object-store URL of prepared HTML
    #[serde(default, rename = "s3HTMLPaths")]
    pub s3_html_paths: HashMap<String, String>,
    #[serde(default)]
    pub send_continuously: bool,
    #[serde(default)]
    pub send_until: Option<DateTime<Utc>>,
    /// Seconds between continuous-send passes
    #[serde(default)]
    pub send_interval: Option<i64>,
    /// Recipient preview written by the Dry-Run step
    #[serde(default)]
    pub dry_run_recipients: Vec<RecipientEntry>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub locked_by: String,
    #[serde(default)]
    pub stop_requested: bool,
    #[serde(default)]
    pub state: Option<WorkOrderState>,
    #[serde(default)]
    pub sleep_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkOrder {
    /// Pool name from `config.pool`, if configured.
    pub fn pool_name(&self) -> Option<&str> {
        self.config.get("pool").map(String::as_str)
    }

    /// Language codes enabled for this campaign, in stable order.
    pub fn enabled_languages(&self) -> Vec<&str> {
        self.languages
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(code, _)| code.as_str())
            .collect()
    }

    pub fn step_index(&self, name: StepName) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn step(&self, name: StepName) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_mut(&mut self, name: StepName) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.name == name)
    }

    pub fn active_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_active)
    }

    /// Whether a start for `name` respects left-to-right step order.
    pub fn predecessor_complete(&self, name: StepName) -> bool {
        match self.step_index(name) {
            Some(0) => true,
            Some(i) => self.steps[i - 1].status == StepStatus::Complete,
            None => false,
        }
    }

    /// Update one step's status and message, maintaining the single-active
    /// invariant and the start/end timestamps.
    ///
    /// Returns false when the step is not present.
    pub fn update_step(
        &mut self,
        name: StepName,
        status: StepStatus,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(i) = self.step_index(name) else {
            return false;
        };
        for (j, step) in self.steps.iter_mut().enumerate() {
            step.is_active = i == j;
        }
        let step = &mut self.steps[i];
        step.message = message.into();
        if status == StepStatus::Working && step.status != StepStatus::Working {
            step.start_time = Some(now);
            step.end_time = None;
        }
        if status.is_terminal() {
            step.end_time = Some(now);
        }
        step.status = status;
        true
    }

    /// Replace just the active step's progress message.
    pub fn set_step_message(&mut self, name: StepName, message: impl Into<String>) -> bool {
        match self.step_mut(name) {
            Some(step) => {
                step.message = message.into();
                true
            }
            None => false,
        }
    }

    /// Enable the step after `completed`, if any: reset it to `ready` and
    /// make it the single active step.
    pub fn enable_next_step(&mut self, completed: StepName) -> Option<StepName> {
        let i = self.step_index(completed)?;
        if i + 1 >= self.steps.len() {
            return None;
        }
        for (j, step) in self.steps.iter_mut().enumerate() {
            step.is_active = j == i + 1;
        }
        let next = &mut self.steps[i + 1];
        next.reset_ready();
        Some(next.name)
    }

    /// Effective continuous-send interval in seconds.
    pub fn send_interval_secs(&self, default_secs: i64) -> i64 {
        self.send_interval.filter(|s| *s > 0).unwrap_or(default_secs)
    }

    /// Number of active steps; the invariant is `<= 1`.
    pub fn active_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_active).count()
    }
}

/// Partial update applied through the store's `update_work_order`.
///
/// Outer `None` means "leave unchanged"; the double-`Option` fields can
/// also clear a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_requested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Option<WorkOrderState>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_until: Option<Option<DateTime<Utc>>>,
    #[serde(default, rename = "s3HTMLPaths", skip_serializing_if = "Option::is_none")]
    pub s3_html_paths: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run_recipients: Option<Vec<RecipientEntry>>,
}

impl WorkOrderPatch {
    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn stop_requested(mut self, v: bool) -> Self {
        self.stop_requested = Some(v);
        self
    }

    pub fn lock_state(mut self, locked: bool, locked_by: impl Into<String>) -> Self {
        self.locked = Some(locked);
        self.locked_by = Some(locked_by.into());
        self
    }

    /// Park the order: `state = Sleeping`, `sleepUntil` set, lock retained.
    pub fn park(mut self, sleep_until: DateTime<Utc>) -> Self {
        self.state = Some(Some(WorkOrderState::Sleeping));
        self.sleep_until = Some(Some(sleep_until));
        self
    }

    /// Clear the sleeping state on wake or stop.
    pub fn wake(mut self) -> Self {
        self.state = Some(None);
        self.sleep_until = Some(None);
        self
    }

    pub fn sleep_until(mut self, v: DateTime<Utc>) -> Self {
        self.sleep_until = Some(Some(v));
        self
    }

    pub fn s3_html_paths(mut self, v: HashMap<String, String>) -> Self {
        self.s3_html_paths = Some(v);
        self
    }

    pub fn dry_run_recipients(mut self, v: Vec<RecipientEntry>) -> Self {
        self.dry_run_recipients = Some(v);
        self
    }

    /// Apply this patch to a loaded record. `updatedAt` is the store's job.
    pub fn apply_to(&self, order: &mut WorkOrder) {
        if let Some(steps) = &self.steps {
            order.steps = steps.clone();
        }
        if let Some(v) = self.stop_requested {
            order.stop_requested = v;
        }
        if let Some(v) = self.locked {
            order.locked = v;
        }
        if let Some(v) = &self.locked_by {
            order.locked_by = v.clone();
        }
        if let Some(v) = &self.state {
            order.state = *v;
        }
        if let Some(v) = &self.sleep_until {
            order.sleep_until = *v;
        }
        if let Some(v) = &self.s3_html_paths {
            order.s3_html_paths = v.clone();
        }
        if let Some(v) = &self.dry_run_recipients {
            order.dry_run_recipients = v.clone();
        }
    }
}

fn default_steps() -> Vec<Step> {
    let mut steps: Vec<Step> = StepName::ALL.into_iter().map(Step::new).collect();
    if let Some(first) = steps.first_mut() {
        first.is_active = true;
    }
    steps
}

crate::builder! {
    pub struct WorkOrderBuilder => WorkOrder {
        into {
            id: String = "wo-1",
            event_code: String = "vr20251001",
            sub_event: String = "retreat",
            stage: String = "eligible",
            locked_by: String = "",
        }
        set {
            subjects: HashMap<String, String> = HashMap::new(),
            languages: BTreeMap<String, bool> = BTreeMap::from([("EN".to_string(), true)]),
            testers: Vec<String> = Vec::new(),
            config: HashMap<String, String> = HashMap::from([("pool".to_string(), "everyone".to_string())]),
            s3_html_paths: HashMap<String, String> = HashMap::new(),
            send_continuously: bool = false,
            send_until: Option<DateTime<Utc>> = None,
            send_interval: Option<i64> = None,
            dry_run_recipients: Vec<RecipientEntry> = Vec::new(),
            steps: Vec<Step> = default_steps(),
            locked: bool = false,
            stop_requested: bool = false,
            state: Option<WorkOrderState> = None,
            sleep_until: Option<DateTime<Utc>> = None,
            in_person: bool = false,
            salutation_by_name: Option<bool> = None,
            reg_link_present: bool = false,
        }
        option {
            account: String = None,
            from_name: String = None,
            reply_to: String = None,
            zoom_id: String = None,
        }
        computed {
            created_at: Option<DateTime<Utc>> = None,
            updated_at: Option<DateTime<Utc>> = None,
        }
    }
}

#[cfg(test)]
#[path = "work_order_tests.rs"]
mod tests;
