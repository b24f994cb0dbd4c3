// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for agent tests: an agent wired to memory backends with
//! a controllable clock.

use crate::agent::{Agent, AgentDeps};
use crate::env::AgentConfig;
use crate::smtp::RecordingSmtpGateway;
use crate::steps::StepContext;
use chrono::{DateTime, TimeZone, Utc};
use courier_core::{FakeClock, StepName};
use courier_store::{
    MemoryObjectStore, MemoryPushChannel, MemoryQueue, MemoryStore, MemoryTemplateService,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).single().unwrap()
}

pub struct Harness {
    pub store: Arc<MemoryStore<FakeClock>>,
    pub queue: Arc<MemoryQueue>,
    pub push: Arc<MemoryPushChannel>,
    pub objects: Arc<MemoryObjectStore>,
    pub templates: Arc<MemoryTemplateService>,
    pub smtp: Arc<RecordingSmtpGateway>,
    pub clock: FakeClock,
    pub config: Arc<AgentConfig>,
    pub agent: Agent<FakeClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(AgentConfig {
            // Keep tests fast: no burst sleeps unless a test asks for them.
            email_burst_size: 1000,
            email_recovery_sleep_secs: 0,
            ..AgentConfig::default()
        })
    }

    pub fn with_config(config: AgentConfig) -> Self {
        let clock = FakeClock::at(t0());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let queue = Arc::new(MemoryQueue::new());
        let push = Arc::new(MemoryPushChannel::new());
        let objects = Arc::new(MemoryObjectStore::new("bucket.example"));
        let templates = Arc::new(MemoryTemplateService::new());
        let smtp = Arc::new(RecordingSmtpGateway::new());
        let deps = AgentDeps {
            work_orders: Arc::clone(&store) as _,
            directory: Arc::clone(&store) as _,
            recipients: Arc::clone(&store) as _,
            queue: Arc::clone(&queue) as _,
            objects: Arc::clone(&objects) as _,
            templates: Arc::clone(&templates) as _,
            push: Arc::clone(&push) as _,
            smtp: Arc::clone(&smtp) as _,
        };
        let agent = Agent::new(deps, config.clone(), clock.clone());
        Self {
            store,
            queue,
            push,
            objects,
            templates,
            smtp,
            clock,
            config: Arc::new(config),
            agent,
        }
    }

    /// A context for driving a handler directly, outside the main loop.
    pub fn context(&self, order_id: &str, step: StepName) -> StepContext<FakeClock> {
        StepContext {
            work_orders: Arc::clone(&self.store) as _,
            directory: Arc::clone(&self.store) as _,
            recipients: Arc::clone(&self.store) as _,
            queue: Arc::clone(&self.queue) as _,
            objects: Arc::clone(&self.objects) as _,
            templates: Arc::clone(&self.templates) as _,
            smtp: Arc::clone(&self.smtp) as _,
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            cancel: CancellationToken::new(),
            order_id: order_id.to_string(),
            step,
        }
    }
}
