// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability traits over the durable store, queue and external
//! collaborators. The agent depends on these seams only; production wiring
//! and the in-memory backend both implement them.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    EventRecord, Pool, Prompt, RecipientEntry, StageRecord, Student, WorkOrder, WorkOrderPatch,
};
use std::collections::HashMap;
use std::time::Duration;

/// Work-order table operations, including the lock primitive.
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    async fn get_work_order(&self, id: &str) -> Result<Option<WorkOrder>, StoreError>;

    /// Partial update; implementations bump `updatedAt`. Unknown ids error.
    async fn update_work_order(&self, id: &str, patch: WorkOrderPatch) -> Result<(), StoreError>;

    async fn scan_work_orders(&self) -> Result<Vec<WorkOrder>, StoreError>;

    /// Conditional compare-and-set: succeeds iff currently unlocked.
    async fn try_lock_work_order(&self, id: &str, agent_id: &str) -> Result<bool, StoreError>;

    /// Unconditionally clears the lock; safe to call repeatedly.
    async fn unlock_work_order(&self, id: &str) -> Result<(), StoreError>;
}

/// Read surfaces owned by other services, plus the two narrow writes the
/// agent is allowed (student ledger, event embedded-email map).
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn scan_students(&self) -> Result<Vec<Student>, StoreError>;
    async fn get_student(&self, id: &str) -> Result<Option<Student>, StoreError>;

    /// Idempotent single-field merge of the at-most-one-send ledger.
    async fn update_student_emails(
        &self,
        id: &str,
        emails: HashMap<String, String>,
    ) -> Result<(), StoreError>;

    async fn scan_pools(&self) -> Result<Vec<Pool>, StoreError>;
    async fn scan_prompts(&self) -> Result<Vec<Prompt>, StoreError>;
    async fn get_event(&self, code: &str) -> Result<Option<EventRecord>, StoreError>;

    async fn set_event_embedded_email(
        &self,
        code: &str,
        sub_event: &str,
        stage: &str,
        full_language: &str,
        url: &str,
    ) -> Result<(), StoreError>;

    async fn get_stage(&self, stage: &str) -> Result<Option<StageRecord>, StoreError>;
}

/// Append-only dry-run / send recipient logs keyed by campaign string.
#[async_trait]
pub trait RecipientLog: Send + Sync {
    async fn append_dryrun_recipient(
        &self,
        campaign: &str,
        entry: RecipientEntry,
    ) -> Result<(), StoreError>;

    async fn delete_dryrun_recipients(&self, campaign: &str) -> Result<(), StoreError>;

    async fn append_send_recipient(
        &self,
        campaign: &str,
        entry: RecipientEntry,
    ) -> Result<(), StoreError>;

    /// Entries on the send log for `account` with `sendtime >= since`.
    async fn count_send_entries_since(
        &self,
        account: &str,
        since: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}

/// One received queue message; the receipt handle is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub body: String,
    pub receipt_handle: String,
}

/// Visibility-timeout command queue.
#[async_trait]
pub trait CommandQueue: Send + Sync {
    /// Long-poll receive of up to `max` messages.
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, StoreError>;

    /// Non-destructive read used by in-step stop checks.
    async fn peek(&self, max: usize) -> Result<Vec<QueueMessage>, StoreError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError>;

    async fn purge(&self) -> Result<(), StoreError>;
}

/// Prepared-HTML object store addressed by public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, StoreError>;

    /// Store HTML under `key` and return the canonical public URL.
    async fn put_html(&self, key: &str, body: &str) -> Result<String, StoreError>;
}

/// The campaign-builder rendering collaborator.
#[async_trait]
pub trait TemplateService: Send + Sync {
    /// Rendered HTML for a template name, or `None` when absent.
    async fn fetch_template(&self, name: &str) -> Result<Option<String>, StoreError>;
}

/// Outcome of a single push delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// The subscription is dead and should be pruned.
    Gone,
}

/// Fan-out fabric to connected UI clients.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn connection_ids(&self) -> Result<Vec<String>, StoreError>;
    async fn deliver(&self, connection_id: &str, payload: &str)
        -> Result<DeliveryStatus, StoreError>;
    async fn remove_connection(&self, connection_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub smtp_username: String,
    pub smtp_password: String,
}

/// Per-account SMTP credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credentials(&self, account: &str) -> Result<Option<SmtpCredentials>, StoreError>;
}
