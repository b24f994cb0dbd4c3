// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step handlers and the context they share.
//!
//! Handlers catch nothing: they return `StepError` and the executor
//! classifies. Every suspension point doubles as a cancellation point.

pub mod count;
pub mod prepare;
pub mod send;

use crate::env::AgentConfig;
use crate::smtp::SmtpGateway;
use chrono::{DateTime, Utc};
use courier_core::{Clock, StepError, StepName, WorkOrder, WorkOrderPatch};
use courier_store::{
    Command, CommandAction, CommandQueue, DirectoryStore, ObjectStore, RecipientLog,
    TemplateService, WorkOrderStore,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything one step execution can reach: collaborator handles, the
/// agent configuration, and the cancellation token for this run.
pub struct StepContext<C: Clock> {
    pub work_orders: Arc<dyn WorkOrderStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub recipients: Arc<dyn RecipientLog>,
    pub queue: Arc<dyn CommandQueue>,
    pub objects: Arc<dyn ObjectStore>,
    pub templates: Arc<dyn TemplateService>,
    pub smtp: Arc<dyn SmtpGateway>,
    pub config: Arc<AgentConfig>,
    pub clock: C,
    pub cancel: CancellationToken,
    pub order_id: String,
    pub step: StepName,
}

impl<C: Clock> StepContext<C> {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reload the work order; it disappearing mid-step is a hard error.
    pub async fn reload(&self) -> Result<WorkOrder, StepError> {
        self.work_orders
            .get_work_order(&self.order_id)
            .await?
            .ok_or_else(|| StepError::NotFound(format!("work order not found: {}", self.order_id)))
    }

    /// Best-effort progress message on this step; failures are logged and
    /// swallowed so progress reporting never kills a handler.
    pub async fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(work_order = %self.order_id, step = %self.step, "{message}");
        let order = match self.work_orders.get_work_order(&self.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "progress update skipped: reload failed");
                return;
            }
        };
        let mut order = order;
        if !order.set_step_message(self.step, message) {
            return;
        }
        let patch = WorkOrderPatch::default().steps(order.steps);
        if let Err(e) = self.work_orders.update_work_order(&self.order_id, patch).await {
            tracing::warn!(error = %e, "progress update skipped: write failed");
        }
    }

    /// Observe cancellation: the run's token, then the persisted
    /// `stopRequested` flag (a stop may originate on another agent).
    pub async fn check_stop(&self) -> Result<(), StepError> {
        if self.cancel.is_cancelled() {
            return Err(StepError::Interrupted);
        }
        if self.reload().await?.stop_requested {
            return Err(StepError::Interrupted);
        }
        Ok(())
    }

    /// Peek the command queue (without consuming) for a stop aimed at this
    /// work order.
    pub async fn stop_message_pending(&self) -> Result<bool, StepError> {
        let messages = self.queue.peek(10).await?;
        Ok(messages.iter().any(|m| {
            Command::parse(&m.body).is_some_and(|c| {
                c.action == CommandAction::Stop && c.work_order_id == self.order_id
            })
        }))
    }

    /// Sleep in `STOP_CHECK_INTERVAL` slices, observing cancellation after
    /// each slice.
    pub async fn interruptible_sleep(&self, total_secs: u64) -> Result<(), StepError> {
        let slice = self.config.stop_check_interval.as_secs().max(1);
        let mut slept = 0;
        while slept < total_secs {
            let step = slice.min(total_secs - slept);
            tokio::time::sleep(std::time::Duration::from_secs(step)).await;
            slept += step;
            self.check_stop().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
