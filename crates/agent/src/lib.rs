// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! courier-agent: the long-running email campaign worker.
//!
//! Consumes start/stop commands from the durable queue, drives each work
//! order through Count → Prepare → Test → Dry-Run → Send, and delivers
//! rate-limited personalized email.

pub mod agent;
pub mod env;
pub mod executor;
pub mod http;
pub mod lock;
pub mod notify;
pub mod sleep_queue;
pub mod smtp;
pub mod steps;

#[cfg(test)]
pub mod test_helpers;

pub use agent::{Agent, AgentDeps};
pub use env::AgentConfig;
pub use executor::{ExecutionOutcome, StepExecutor};
pub use lock::LockManager;
pub use notify::{NotifyingWorkOrderStore, PushNotifier};
pub use sleep_queue::{SleepQueue, SleepQueueEntry, SLEEP_QUEUE_LIMIT};
pub use smtp::{LettreSmtpGateway, OutgoingEmail, RecordingSmtpGateway, SentEmail, SmtpGateway};
pub use steps::StepContext;
