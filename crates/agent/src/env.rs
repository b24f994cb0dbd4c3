// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent.

use std::time::Duration;

/// External table names; the production store wiring resolves these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub work_orders: String,
    pub connections: String,
    pub events: String,
    pub students: String,
    pub pools: String,
    pub prompts: String,
    pub stages: String,
    pub credentials: String,
    pub dryrun_recipients: String,
    pub send_recipients: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            work_orders: "work-orders".to_string(),
            connections: "connections".to_string(),
            events: "events".to_string(),
            students: "students".to_string(),
            pools: "pools".to_string(),
            prompts: "prompts".to_string(),
            stages: "stages".to_string(),
            credentials: "email-account-credentials".to_string(),
            dryrun_recipients: "dryrun-recipients".to_string(),
            send_recipients: "send-recipients".to_string(),
        }
    }
}

/// Agent configuration, sourced from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Seconds between main-loop polls
    pub poll_interval: Duration,
    /// Seconds between in-step stop checks (interruptible-sleep slice)
    pub stop_check_interval: Duration,
    /// Recipients between recovery sleeps
    pub email_burst_size: usize,
    /// Seconds of burst sleep
    pub email_recovery_sleep_secs: u64,
    /// Default re-send interval when a work order omits `sendInterval`
    pub email_continuous_sleep_secs: i64,
    /// Hard cap on messages per account per 24 hours
    pub smtp_24_hour_send_limit: usize,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub default_preview: String,
    pub default_from_name: String,
    /// Fallback reply-to when a work order has none
    pub default_reply_to: String,
    /// Base URL of the template-rendering collaborator
    pub template_service_url: String,
    /// Object-store host for prepared HTML (`https://{bucket}/{key}`)
    pub html_bucket: String,
    pub tables: TableNames,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            stop_check_interval: Duration::from_secs(1),
            email_burst_size: 10,
            email_recovery_sleep_secs: 60,
            email_continuous_sleep_secs: 3600,
            smtp_24_hour_send_limit: 450,
            smtp_server: String::new(),
            smtp_port: 587,
            default_preview: String::new(),
            default_from_name: String::new(),
            default_reply_to: String::new(),
            template_service_url: String::new(),
            html_bucket: String::new(),
            tables: TableNames::default(),
        }
    }
}

impl AgentConfig {
    /// Read every recognized variable, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL", 5)),
            stop_check_interval: Duration::from_secs(env_u64("STOP_CHECK_INTERVAL", 1)),
            email_burst_size: env_u64("EMAIL_BURST_SIZE", 10) as usize,
            email_recovery_sleep_secs: env_u64("EMAIL_RECOVERY_SLEEP_SECS", 60),
            email_continuous_sleep_secs: env_u64("EMAIL_CONTINUOUS_SLEEP_SECS", 3600) as i64,
            smtp_24_hour_send_limit: env_u64("SMTP_24_HOUR_SEND_LIMIT", 450) as usize,
            smtp_server: env_str("SMTP_SERVER", ""),
            smtp_port: env_u64("SMTP_PORT", 587) as u16,
            default_preview: env_str("DEFAULT_PREVIEW", ""),
            default_from_name: env_str("DEFAULT_FROM_NAME", ""),
            default_reply_to: env_str("DEFAULT_REPLY_TO", ""),
            template_service_url: env_str("TEMPLATE_SERVICE_URL", ""),
            html_bucket: env_str("HTML_BUCKET", ""),
            tables: TableNames {
                work_orders: env_str("WORK_ORDERS_TABLE", &defaults.tables.work_orders),
                connections: env_str("CONNECTIONS_TABLE", &defaults.tables.connections),
                events: env_str("EVENTS_TABLE", &defaults.tables.events),
                students: env_str("STUDENTS_TABLE", &defaults.tables.students),
                pools: env_str("POOLS_TABLE", &defaults.tables.pools),
                prompts: env_str("PROMPTS_TABLE", &defaults.tables.prompts),
                stages: env_str("STAGES_TABLE", &defaults.tables.stages),
                credentials: env_str("CREDENTIALS_TABLE", &defaults.tables.credentials),
                dryrun_recipients: env_str(
                    "DRYRUN_RECIPIENTS_TABLE",
                    &defaults.tables.dryrun_recipients,
                ),
                send_recipients: env_str("SEND_RECIPIENTS_TABLE", &defaults.tables.send_recipients),
            },
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
