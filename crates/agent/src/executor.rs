// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step executor: dispatches a working step to its handler, classifies
//! failures into the terminal status, and owns the continuous-send
//! parking decision.

use crate::env::AgentConfig;
use crate::sleep_queue::SleepQueue;
use crate::steps::send::SendOutcome;
use crate::steps::{count, prepare, send, test, StepContext};
use courier_core::{Clock, StepName, StepStatus, WorkOrder, WorkOrderPatch};
use parking_lot::Mutex;
use std::sync::Arc;

/// What the main loop does next with the lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Step complete: enable the successor, then release the lock.
    Completed,
    /// Parked in the sleep queue: the lock is deliberately retained.
    Parked,
    /// Failed (including interruption): release the lock for a restart.
    Failed,
}

pub struct StepExecutor<C: Clock> {
    config: Arc<AgentConfig>,
    clock: C,
    agent_id: String,
}

impl<C: Clock> StepExecutor<C> {
    pub fn new(config: Arc<AgentConfig>, clock: C, agent_id: impl Into<String>) -> Self {
        Self { config, clock, agent_id: agent_id.into() }
    }

    /// Run the active step of a work order already transitioned to
    /// `working` under this agent's lease.
    pub async fn execute(
        &self,
        ctx: &StepContext<C>,
        sleep_queue: &Mutex<SleepQueue>,
    ) -> ExecutionOutcome {
        let order = match ctx.reload().await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(work_order = %ctx.order_id, error = %e, "executor reload failed");
                return ExecutionOutcome::Failed;
            }
        };
        if let Err(violation) = self.verify_invariants(&order, ctx.step) {
            tracing::error!(work_order = %ctx.order_id, step = %ctx.step, violation, "refusing step");
            self.write_status(ctx, StepStatus::Error, violation.to_string()).await;
            return ExecutionOutcome::Failed;
        }

        let result = match ctx.step {
            StepName::Count => count::run(ctx, &order).await.map(SendOutcome::Completed),
            StepName::Prepare => prepare::run(ctx, &order).await.map(SendOutcome::Completed),
            StepName::Test => test::run(ctx, &order).await.map(SendOutcome::Completed),
            StepName::DryRun => send::run(ctx, &order, true).await,
            StepName::Send => send::run(ctx, &order, false).await,
        };

        match result {
            Ok(SendOutcome::Completed(message)) => {
                self.write_status(ctx, StepStatus::Complete, message).await;
                ExecutionOutcome::Completed
            }
            Ok(SendOutcome::RequestPark) => self.park(ctx, &order, sleep_queue).await,
            Err(e) => {
                let status = e.terminal_status();
                tracing::warn!(
                    work_order = %ctx.order_id,
                    step = %ctx.step,
                    status = %status,
                    error = %e,
                    "step failed"
                );
                self.write_status(ctx, status, e.to_string()).await;
                ExecutionOutcome::Failed
            }
        }
    }

    fn verify_invariants(&self, order: &WorkOrder, step: StepName) -> Result<(), &'static str> {
        let Some(record) = order.step(step) else {
            return Err("step not present in work order");
        };
        if !record.is_active {
            return Err("step is not the active step");
        }
        if !order.locked || order.locked_by != self.agent_id {
            return Err("work order is not locked by this agent");
        }
        if record.status != StepStatus::Working {
            return Err("step is not in working status");
        }
        Ok(())
    }

    async fn park(
        &self,
        ctx: &StepContext<C>,
        order: &WorkOrder,
        sleep_queue: &Mutex<SleepQueue>,
    ) -> ExecutionOutcome {
        let interval = order.send_interval_secs(self.config.email_continuous_sleep_secs);
        let sleep_until = self.clock.now() + chrono::Duration::seconds(interval);

        if !sleep_queue.lock().park(&order.id, sleep_until) {
            self.write_status(
                ctx,
                StepStatus::Error,
                "Too many work orders are already sleeping. Try again later.",
            )
            .await;
            return ExecutionOutcome::Failed;
        }

        let message = format!("Sleeping until {}", sleep_until.to_rfc3339());
        tracing::info!(work_order = %order.id, %message, "parking continuous send");

        let mut fresh = match ctx.reload().await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(work_order = %ctx.order_id, error = %e, "park reload failed");
                sleep_queue.lock().remove(&order.id);
                return ExecutionOutcome::Failed;
            }
        };
        fresh.update_step(ctx.step, StepStatus::Sleeping, message.clone(), self.clock.now());
        let patch = WorkOrderPatch::default().steps(fresh.steps).park(sleep_until);
        if let Err(e) = ctx.work_orders.update_work_order(&ctx.order_id, patch).await {
            tracing::error!(work_order = %ctx.order_id, error = %e, "park write failed");
            sleep_queue.lock().remove(&order.id);
            return ExecutionOutcome::Failed;
        }
        ExecutionOutcome::Parked
    }

    /// Terminal status write; failures are logged, not propagated. There
    /// is nowhere better to report them.
    async fn write_status(&self, ctx: &StepContext<C>, status: StepStatus, message: impl Into<String>) {
        let message = message.into();
        let mut order = match ctx.reload().await {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(work_order = %ctx.order_id, error = %e, "status write reload failed");
                return;
            }
        };
        if !order.update_step(ctx.step, status, message, self.clock.now()) {
            return;
        }
        let patch = WorkOrderPatch::default().steps(order.steps);
        if let Err(e) = ctx.work_orders.update_work_order(&ctx.order_id, patch).await {
            tracing::error!(work_order = %ctx.order_id, error = %e, "status write failed");
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
