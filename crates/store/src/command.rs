// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound command messages from the durable queue.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
}

courier_core::simple_display! {
    CommandAction {
        Start => "start",
        Stop => "stop",
    }
}

/// `{ "workOrderId": …, "stepName": …, "action": "start|stop" }`
///
/// `step_name` stays a string here: a message naming an unknown step is
/// still well-formed and is rejected later against the work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub work_order_id: String,
    pub step_name: String,
    pub action: CommandAction,
}

impl Command {
    pub fn start(work_order_id: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            work_order_id: work_order_id.into(),
            step_name: step_name.into(),
            action: CommandAction::Start,
        }
    }

    pub fn stop(work_order_id: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            work_order_id: work_order_id.into(),
            step_name: step_name.into(),
            action: CommandAction::Stop,
        }
    }

    /// Parse a queue message body. `None` for malformed bodies, which the
    /// main loop deletes silently.
    pub fn parse(body: &str) -> Option<Command> {
        serde_json::from_str(body).ok()
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
