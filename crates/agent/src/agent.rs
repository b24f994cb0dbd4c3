// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent main loop: queue polling, start/stop dispatch, sleeper wakes.

use crate::env::AgentConfig;
use crate::executor::{ExecutionOutcome, StepExecutor};
use crate::lock::LockManager;
use crate::notify::{NotifyingWorkOrderStore, PushNotifier};
use crate::sleep_queue::SleepQueue;
use crate::smtp::SmtpGateway;
use crate::steps::StepContext;
use courier_core::{Clock, StepError, StepName, StepStatus, WorkOrderPatch, WorkOrderState};
use courier_store::{
    Command, CommandAction, CommandQueue, DirectoryStore, ObjectStore, PushChannel, QueueMessage,
    RecipientLog, TemplateService, WorkOrderStore,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Long-poll wait on the command queue.
const RECEIVE_WAIT: Duration = Duration::from_secs(5);

/// External collaborator handles handed to the agent at construction.
pub struct AgentDeps {
    pub work_orders: Arc<dyn WorkOrderStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub recipients: Arc<dyn RecipientLog>,
    pub queue: Arc<dyn CommandQueue>,
    pub objects: Arc<dyn ObjectStore>,
    pub templates: Arc<dyn TemplateService>,
    pub push: Arc<dyn PushChannel>,
    pub smtp: Arc<dyn SmtpGateway>,
}

/// The work order currently executing; routes stop signals into the
/// in-flight handler via its cancellation token.
struct CurrentWork {
    order_id: String,
    cancel: CancellationToken,
}

pub struct Agent<C: Clock> {
    work_orders: Arc<dyn WorkOrderStore>,
    directory: Arc<dyn DirectoryStore>,
    recipients: Arc<dyn RecipientLog>,
    queue: Arc<dyn CommandQueue>,
    objects: Arc<dyn ObjectStore>,
    templates: Arc<dyn TemplateService>,
    smtp: Arc<dyn SmtpGateway>,
    notifier: Arc<PushNotifier>,
    config: Arc<AgentConfig>,
    clock: C,
    agent_id: String,
    lock: LockManager,
    executor: StepExecutor<C>,
    sleep_queue: Mutex<SleepQueue>,
    current: Mutex<Option<CurrentWork>>,
    shutdown: CancellationToken,
}

impl<C: Clock> Agent<C> {
    pub fn new(deps: AgentDeps, config: AgentConfig, clock: C) -> Self {
        let agent_id = format!("agent_{}", uuid::Uuid::new_v4());
        let config = Arc::new(config);
        let notifier = Arc::new(PushNotifier::new(deps.push));
        let work_orders: Arc<dyn WorkOrderStore> =
            Arc::new(NotifyingWorkOrderStore::new(deps.work_orders, Arc::clone(&notifier)));
        let lock = LockManager::new(Arc::clone(&work_orders), agent_id.clone());
        let executor = StepExecutor::new(Arc::clone(&config), clock.clone(), agent_id.clone());
        Self {
            work_orders,
            directory: deps.directory,
            recipients: deps.recipients,
            queue: deps.queue,
            objects: deps.objects,
            templates: deps.templates,
            smtp: deps.smtp,
            notifier,
            config,
            clock,
            agent_id,
            lock,
            executor,
            sleep_queue: Mutex::new(SleepQueue::new()),
            current: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn sleeping_count(&self) -> usize {
        self.sleep_queue.lock().len()
    }

    /// Startup: discard stale commands, recover abandoned leases, rebuild
    /// the sleep queue from persisted Sleeping work orders.
    pub async fn startup(&self) -> Result<(), StepError> {
        tracing::info!(agent = %self.agent_id, "email agent starting");
        self.queue.purge().await?;
        self.lock.release_all_except_sleeping().await?;

        let now = self.clock.now();
        let mut revived = 0usize;
        for order in self.work_orders.scan_work_orders().await? {
            if order.state != Some(WorkOrderState::Sleeping) {
                continue;
            }
            let Some(mut sleep_until) = order.sleep_until else {
                continue;
            };
            if sleep_until <= now {
                let interval =
                    order.send_interval_secs(self.config.email_continuous_sleep_secs);
                sleep_until = now + chrono::Duration::seconds(interval);
                let mut fresh = order.clone();
                fresh.update_step(
                    StepName::Send,
                    StepStatus::Sleeping,
                    format!("Sleeping until {}", sleep_until.to_rfc3339()),
                    now,
                );
                let patch =
                    WorkOrderPatch::default().steps(fresh.steps).sleep_until(sleep_until);
                self.work_orders.update_work_order(&order.id, patch).await?;
            }
            // Adopt the lease left by whichever agent parked it.
            self.work_orders.unlock_work_order(&order.id).await?;
            self.work_orders.try_lock_work_order(&order.id, &self.agent_id).await?;
            if self.sleep_queue.lock().park(&order.id, sleep_until) {
                revived += 1;
            } else {
                tracing::warn!(work_order = %order.id, "sleep queue full, cannot revive sleeper");
            }
        }
        tracing::info!(revived, "sleep queue rebuilt");
        Ok(())
    }

    /// Poll until shutdown.
    pub async fn run(&self) -> Result<(), StepError> {
        let heartbeat = Arc::clone(&self.notifier)
            .spawn_heartbeat_sweep(self.clock.clone(), self.shutdown.child_token());

        while !self.shutdown.is_cancelled() {
            if let Err(e) = self.tick().await {
                tracing::error!(error = %e, "error in main loop");
            }
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        heartbeat.abort();
        let current = self.current.lock().take();
        if let Some(current) = current {
            let _ = self.lock.release(&current.order_id).await;
        }
        tracing::info!("email agent stopped");
        Ok(())
    }

    /// One poll iteration: wake due sleepers, then drain a received batch.
    pub async fn tick(&self) -> Result<(), StepError> {
        self.sweep_sleepers().await?;
        let messages = self.queue.receive(1, RECEIVE_WAIT).await?;
        if !messages.is_empty() {
            tracing::info!(count = messages.len(), "processing queue messages");
        }
        for message in messages {
            self.handle_message(message).await;
        }
        Ok(())
    }

    async fn sweep_sleepers(&self) -> Result<(), StepError> {
        let now = self.clock.now();
        let due = self.sleep_queue.lock().take_due(now);
        for entry in due {
            let Some(order) = self.work_orders.get_work_order(&entry.work_order_id).await? else {
                continue;
            };
            if order.stop_requested {
                tracing::info!(work_order = %order.id, "dropping stopped sleeper without waking");
                continue;
            }
            tracing::info!(work_order = %order.id, "waking work order from sleep queue");
            // The start path acquires its own lease.
            self.lock.release(&order.id).await?;
            self.handle_start(&order.id, "Send").await;
        }

        // A stop handled by another agent leaves our entry behind; prune it.
        let parked: Vec<String> =
            self.sleep_queue.lock().entries().iter().map(|e| e.work_order_id.clone()).collect();
        for id in parked {
            if let Some(order) = self.work_orders.get_work_order(&id).await? {
                if order.stop_requested {
                    tracing::info!(work_order = %id, "removing stopped work order from sleep queue");
                    self.sleep_queue.lock().remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn handle_message(&self, message: QueueMessage) {
        let Some(command) = Command::parse(&message.body) else {
            tracing::error!(body = %message.body, "invalid message format, deleting");
            self.delete_message(&message.receipt_handle).await;
            return;
        };

        let order = match self.work_orders.get_work_order(&command.work_order_id).await {
            Ok(order) => order,
            Err(e) => {
                // Leave the message for redelivery after a store hiccup.
                tracing::error!(error = %e, "failed to load work order for command");
                return;
            }
        };
        if order.is_none() {
            tracing::error!(work_order = %command.work_order_id, "work order not found, deleting command");
            self.delete_message(&message.receipt_handle).await;
            return;
        }

        match command.action {
            CommandAction::Stop => {
                if let Err(e) = self.handle_stop(&command.work_order_id, &command.step_name).await {
                    tracing::error!(error = %e, "stop handling failed");
                }
                self.delete_message(&message.receipt_handle).await;
            }
            CommandAction::Start => {
                // Delete first: a long-running start would outlive the
                // receipt handle and the message would be redelivered.
                self.delete_message(&message.receipt_handle).await;
                self.handle_start(&command.work_order_id, &command.step_name).await;
            }
        }
    }

    async fn handle_stop(&self, order_id: &str, step_name: &str) -> Result<(), StepError> {
        self.work_orders
            .update_work_order(order_id, WorkOrderPatch::default().stop_requested(true))
            .await?;
        let order = match self.work_orders.get_work_order(order_id).await? {
            Some(order) => order,
            None => return Ok(()),
        };
        let Some(step) = StepName::parse(step_name) else {
            tracing::error!(step = step_name, "stop for unknown step name");
            return Ok(());
        };
        let Some(record) = order.step(step) else {
            tracing::error!(work_order = order_id, step = %step, "stop for step not in work order");
            return Ok(());
        };
        if !record.status.can_stop() {
            tracing::info!(
                work_order = order_id,
                step = %step,
                status = %record.status,
                "step is not working or sleeping - ignoring stop request"
            );
            return Ok(());
        }

        let was_sleeping = record.status == StepStatus::Sleeping;
        let processing_here = {
            let current = self.current.lock();
            if let Some(current) = current.as_ref().filter(|c| c.order_id == order_id) {
                current.cancel.cancel();
                true
            } else {
                false
            }
        };
        let message = if processing_here {
            format!("{step} step stopped by user")
        } else if was_sleeping {
            self.sleep_queue.lock().remove(order_id);
            format!("{step} step stopped by user while sleeping")
        } else {
            format!("Agent was idle when {step} step was stopped by user")
        };

        let mut fresh = match self.work_orders.get_work_order(order_id).await? {
            Some(order) => order,
            None => return Ok(()),
        };
        fresh.update_step(step, StepStatus::Interrupted, message, self.clock.now());
        let mut patch = WorkOrderPatch::default().steps(fresh.steps);
        if was_sleeping {
            patch = patch.wake();
        }
        self.work_orders.update_work_order(order_id, patch).await?;
        self.lock.release(order_id).await?;
        Ok(())
    }

    /// Handle a start command (real or synthetic). Errors are terminal for
    /// this command only: they are logged and the lease is released.
    async fn handle_start(&self, order_id: &str, step_name: &str) {
        if let Err(e) = self.handle_start_inner(order_id, step_name).await {
            tracing::error!(work_order = order_id, error = %e, "start handling failed");
            *self.current.lock() = None;
            if let Err(release) = self.lock.release(order_id).await {
                tracing::error!(work_order = order_id, error = %release, "release after failure failed");
            }
        }
    }

    async fn handle_start_inner(&self, order_id: &str, step_name: &str) -> Result<(), StepError> {
        self.work_orders
            .update_work_order(order_id, WorkOrderPatch::default().stop_requested(false))
            .await?;
        let order = match self.work_orders.get_work_order(order_id).await? {
            Some(order) => order,
            None => return Ok(()),
        };

        let Some(step) = StepName::parse(step_name) else {
            tracing::error!(step = step_name, "start for unknown step name");
            return Ok(());
        };
        let Some(record) = order.step(step) else {
            tracing::error!(work_order = order_id, step = %step, "start for step not in work order");
            return Ok(());
        };

        if !order.predecessor_complete(step) {
            self.fail_step(
                order_id,
                step,
                format!("Cannot start {step} step. Previous step must be complete."),
            )
            .await;
            return Ok(());
        }
        if record.status == StepStatus::Working {
            tracing::info!(work_order = order_id, step = %step, "step already working - ignoring duplicate start");
            return Ok(());
        }
        let was_sleeping = record.status == StepStatus::Sleeping;

        if !self.lock.acquire(order_id).await? {
            self.fail_step(order_id, step, "Could not lock work order for processing").await;
            return Ok(());
        }

        let cancel = CancellationToken::new();
        *self.current.lock() =
            Some(CurrentWork { order_id: order_id.to_string(), cancel: cancel.clone() });

        {
            let mut fresh = match self.work_orders.get_work_order(order_id).await? {
                Some(order) => order,
                None => {
                    return Err(StepError::NotFound(format!(
                        "work order vanished before start: {order_id}"
                    )))
                }
            };
            let message = if was_sleeping {
                "Waking from sleep, beginning work"
            } else {
                "Work request received, beginning work"
            };
            fresh.update_step(step, StepStatus::Working, message, self.clock.now());
            let mut patch = WorkOrderPatch::default().steps(fresh.steps);
            if was_sleeping {
                self.sleep_queue.lock().remove(order_id);
                patch = patch.wake();
            }
            self.work_orders.update_work_order(order_id, patch).await?;
        }

        let ctx = self.step_context(order_id, step, cancel);
        let outcome = self.executor.execute(&ctx, &self.sleep_queue).await;
        *self.current.lock() = None;

        match outcome {
            ExecutionOutcome::Completed => {
                if let Some(mut fresh) = self.work_orders.get_work_order(order_id).await? {
                    if fresh.enable_next_step(step).is_some() {
                        self.work_orders
                            .update_work_order(
                                order_id,
                                WorkOrderPatch::default().steps(fresh.steps),
                            )
                            .await?;
                    }
                }
                self.lock.release(order_id).await?;
            }
            ExecutionOutcome::Parked => {
                // The lease is deliberately retained while sleeping.
            }
            ExecutionOutcome::Failed => {
                self.lock.release(order_id).await?;
            }
        }
        Ok(())
    }

    async fn fail_step(&self, order_id: &str, step: StepName, message: impl Into<String>) {
        let order = match self.work_orders.get_work_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(work_order = order_id, error = %e, "fail-step reload failed");
                return;
            }
        };
        let mut order = order;
        if !order.update_step(step, StepStatus::Error, message, self.clock.now()) {
            return;
        }
        let patch = WorkOrderPatch::default().steps(order.steps);
        if let Err(e) = self.work_orders.update_work_order(order_id, patch).await {
            tracing::error!(work_order = order_id, error = %e, "fail-step write failed");
        }
    }

    fn step_context(&self, order_id: &str, step: StepName, cancel: CancellationToken) -> StepContext<C> {
        StepContext {
            work_orders: Arc::clone(&self.work_orders),
            directory: Arc::clone(&self.directory),
            recipients: Arc::clone(&self.recipients),
            queue: Arc::clone(&self.queue),
            objects: Arc::clone(&self.objects),
            templates: Arc::clone(&self.templates),
            smtp: Arc::clone(&self.smtp),
            config: Arc::clone(&self.config),
            clock: self.clock.clone(),
            cancel,
            order_id: order_id.to_string(),
            step,
        }
    }

    async fn delete_message(&self, receipt_handle: &str) {
        if let Err(e) = self.queue.delete(receipt_handle).await {
            tracing::warn!(error = %e, "failed to delete queue message");
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
