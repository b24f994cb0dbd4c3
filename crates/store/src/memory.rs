// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory implementations of the capability traits.
//!
//! These back the agent's local mode and every test in the workspace. The
//! production deployment provides the same traits over the real store,
//! queue and push fabric.

use crate::error::StoreError;
use crate::traits::{
    CommandQueue, CredentialStore, DeliveryStatus, DirectoryStore, ObjectStore, PushChannel,
    QueueMessage, RecipientLog, SmtpCredentials, TemplateService, WorkOrderStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{
    Clock, EventRecord, Pool, Prompt, RecipientEntry, StageRecord, Student, SystemClock, WorkOrder,
    WorkOrderPatch,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Default)]
struct StoreInner {
    work_orders: HashMap<String, WorkOrder>,
    students: Vec<Student>,
    pools: Vec<Pool>,
    prompts: Vec<Prompt>,
    events: HashMap<String, EventRecord>,
    stages: HashMap<String, StageRecord>,
    dryrun_log: HashMap<String, Vec<RecipientEntry>>,
    send_log: HashMap<String, Vec<RecipientEntry>>,
}

/// In-memory table store.
pub struct MemoryStore<C: Clock = SystemClock> {
    clock: C,
    inner: Mutex<StoreInner>,
}

impl MemoryStore<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, inner: Mutex::new(StoreInner::default()) }
    }

    pub fn insert_work_order(&self, order: WorkOrder) {
        self.inner.lock().work_orders.insert(order.id.clone(), order);
    }

    pub fn insert_student(&self, student: Student) {
        self.inner.lock().students.push(student);
    }

    pub fn insert_pool(&self, pool: Pool) {
        self.inner.lock().pools.push(pool);
    }

    pub fn insert_prompt(&self, prompt: Prompt) {
        self.inner.lock().prompts.push(prompt);
    }

    pub fn insert_event(&self, event: EventRecord) {
        self.inner.lock().events.insert(event.aid.clone(), event);
    }

    pub fn insert_stage(&self, stage: StageRecord) {
        self.inner.lock().stages.insert(stage.stage.clone(), stage);
    }

    /// Direct read for assertions; the trait methods are the product surface.
    pub fn work_order(&self, id: &str) -> Option<WorkOrder> {
        self.inner.lock().work_orders.get(id).cloned()
    }

    pub fn student(&self, id: &str) -> Option<Student> {
        self.inner.lock().students.iter().find(|s| s.id == id).cloned()
    }

    pub fn event(&self, code: &str) -> Option<EventRecord> {
        self.inner.lock().events.get(code).cloned()
    }

    pub fn dryrun_entries(&self, campaign: &str) -> Vec<RecipientEntry> {
        self.inner.lock().dryrun_log.get(campaign).cloned().unwrap_or_default()
    }

    pub fn send_entries(&self, campaign: &str) -> Vec<RecipientEntry> {
        self.inner.lock().send_log.get(campaign).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl<C: Clock> WorkOrderStore for MemoryStore<C> {
    async fn get_work_order(&self, id: &str) -> Result<Option<WorkOrder>, StoreError> {
        Ok(self.inner.lock().work_orders.get(id).cloned())
    }

    async fn update_work_order(&self, id: &str, patch: WorkOrderPatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let order = inner
            .work_orders
            .get_mut(id)
            .ok_or_else(|| StoreError::unavailable(format!("work order not found: {id}")))?;
        patch.apply_to(order);
        order.updated_at = Some(self.clock.now());
        Ok(())
    }

    async fn scan_work_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        let mut orders: Vec<WorkOrder> = self.inner.lock().work_orders.values().cloned().collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn try_lock_work_order(&self, id: &str, agent_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let order = inner
            .work_orders
            .get_mut(id)
            .ok_or_else(|| StoreError::unavailable(format!("work order not found: {id}")))?;
        if order.locked {
            return Ok(false);
        }
        order.locked = true;
        order.locked_by = agent_id.to_string();
        order.updated_at = Some(self.clock.now());
        Ok(true)
    }

    async fn unlock_work_order(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(order) = inner.work_orders.get_mut(id) {
            order.locked = false;
            order.locked_by = String::new();
            order.updated_at = Some(self.clock.now());
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock> DirectoryStore for MemoryStore<C> {
    async fn scan_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.inner.lock().students.clone())
    }

    async fn get_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        Ok(self.student(id))
    }

    async fn update_student_emails(
        &self,
        id: &str,
        emails: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let student = inner
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::unavailable(format!("student not found: {id}")))?;
        student.emails = emails;
        Ok(())
    }

    async fn scan_pools(&self) -> Result<Vec<Pool>, StoreError> {
        Ok(self.inner.lock().pools.clone())
    }

    async fn scan_prompts(&self) -> Result<Vec<Prompt>, StoreError> {
        Ok(self.inner.lock().prompts.clone())
    }

    async fn get_event(&self, code: &str) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.inner.lock().events.get(code).cloned())
    }

    async fn set_event_embedded_email(
        &self,
        code: &str,
        sub_event: &str,
        stage: &str,
        full_language: &str,
        url: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let event = inner
            .events
            .get_mut(code)
            .ok_or_else(|| StoreError::unavailable(format!("event not found: {code}")))?;
        event.set_embedded_email(sub_event, stage, full_language, url);
        Ok(())
    }

    async fn get_stage(&self, stage: &str) -> Result<Option<StageRecord>, StoreError> {
        Ok(self.inner.lock().stages.get(stage).cloned())
    }
}

#[async_trait]
impl<C: Clock> RecipientLog for MemoryStore<C> {
    async fn append_dryrun_recipient(
        &self,
        campaign: &str,
        entry: RecipientEntry,
    ) -> Result<(), StoreError> {
        self.inner.lock().dryrun_log.entry(campaign.to_string()).or_default().push(entry);
        Ok(())
    }

    async fn delete_dryrun_recipients(&self, campaign: &str) -> Result<(), StoreError> {
        self.inner.lock().dryrun_log.remove(campaign);
        Ok(())
    }

    async fn append_send_recipient(
        &self,
        campaign: &str,
        entry: RecipientEntry,
    ) -> Result<(), StoreError> {
        self.inner.lock().send_log.entry(campaign.to_string()).or_default().push(entry);
        Ok(())
    }

    async fn count_send_entries_since(
        &self,
        account: &str,
        since: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let inner = self.inner.lock();
        let count = inner
            .send_log
            .values()
            .flatten()
            .filter(|e| e.account.as_deref() == Some(account) && e.sendtime >= since)
            .count();
        Ok(count)
    }
}

struct QueueItem {
    id: String,
    body: String,
    in_flight: bool,
}

#[derive(Default)]
struct QueueInner {
    next_id: u64,
    items: Vec<QueueItem>,
}

/// In-memory command queue. `receive` marks messages in flight rather than
/// removing them, mirroring a visibility-timeout queue; `wait` is ignored.
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<QueueInner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message body (the UI side of the queue).
    pub fn send(&self, body: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = format!("rh-{}", inner.next_id);
        inner.items.push(QueueItem { id, body: body.into(), in_flight: false });
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CommandQueue for MemoryQueue {
    async fn receive(&self, max: usize, _wait: Duration) -> Result<Vec<QueueMessage>, StoreError> {
        let mut inner = self.inner.lock();
        let mut received = Vec::new();
        for item in inner.items.iter_mut().filter(|i| !i.in_flight).take(max) {
            item.in_flight = true;
            received.push(QueueMessage { body: item.body.clone(), receipt_handle: item.id.clone() });
        }
        Ok(received)
    }

    async fn peek(&self, max: usize) -> Result<Vec<QueueMessage>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .items
            .iter()
            .take(max)
            .map(|i| QueueMessage { body: i.body.clone(), receipt_handle: i.id.clone() })
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), StoreError> {
        self.inner.lock().items.retain(|i| i.id != receipt_handle);
        Ok(())
    }

    async fn purge(&self) -> Result<(), StoreError> {
        self.inner.lock().items.clear();
        Ok(())
    }
}

/// In-memory object store addressed as `https://{bucket}/{key}`.
pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<String, String>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), objects: Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.objects.lock().insert(url.into(), body.into());
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.objects.lock().get(url).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn fetch(&self, url: &str) -> Result<String, StoreError> {
        self.objects
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| StoreError::unavailable(format!("object not found: {url}")))
    }

    async fn put_html(&self, key: &str, body: &str) -> Result<String, StoreError> {
        let url = format!("https://{}/{key}", self.bucket);
        self.objects.lock().insert(url.clone(), body.to_string());
        Ok(url)
    }
}

/// In-memory template renderer keyed by template name.
#[derive(Default)]
pub struct MemoryTemplateService {
    templates: Mutex<HashMap<String, String>>,
}

impl MemoryTemplateService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, html: impl Into<String>) {
        self.templates.lock().insert(name.into(), html.into());
    }
}

#[async_trait]
impl TemplateService for MemoryTemplateService {
    async fn fetch_template(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.templates.lock().get(name).cloned())
    }
}

#[derive(Default)]
struct PushInner {
    connections: Vec<String>,
    gone: HashSet<String>,
    delivered: Vec<(String, String)>,
}

/// In-memory push fabric recording every delivered payload.
#[derive(Default)]
pub struct MemoryPushChannel {
    inner: Mutex<PushInner>,
}

impl MemoryPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_connection(&self, id: impl Into<String>) {
        self.inner.lock().connections.push(id.into());
    }

    /// Future deliveries to this connection report `Gone`.
    pub fn mark_gone(&self, id: &str) {
        self.inner.lock().gone.insert(id.to_string());
    }

    pub fn connections(&self) -> Vec<String> {
        self.inner.lock().connections.clone()
    }

    pub fn delivered(&self) -> Vec<(String, String)> {
        self.inner.lock().delivered.clone()
    }
}

#[async_trait]
impl PushChannel for MemoryPushChannel {
    async fn connection_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.lock().connections.clone())
    }

    async fn deliver(
        &self,
        connection_id: &str,
        payload: &str,
    ) -> Result<DeliveryStatus, StoreError> {
        let mut inner = self.inner.lock();
        if inner.gone.contains(connection_id) {
            return Ok(DeliveryStatus::Gone);
        }
        inner.delivered.push((connection_id.to_string(), payload.to_string()));
        Ok(DeliveryStatus::Delivered)
    }

    async fn remove_connection(&self, connection_id: &str) -> Result<(), StoreError> {
        self.inner.lock().connections.retain(|c| c != connection_id);
        Ok(())
    }
}

/// In-memory SMTP credential table.
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, SmtpCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.accounts.lock().insert(
            account.into(),
            SmtpCredentials { smtp_username: username.into(), smtp_password: password.into() },
        );
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_credentials(&self, account: &str) -> Result<Option<SmtpCredentials>, StoreError> {
        Ok(self.accounts.lock().get(account).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
