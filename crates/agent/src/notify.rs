// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push fan-out to connected UI clients.
//!
//! Every successful work-order update broadcasts the full record; a
//! periodic heartbeat sweep probes subscriptions and prunes dead ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{Clock, WorkOrder, WorkOrderPatch};
use courier_store::{DeliveryStatus, PushChannel, StoreError, WorkOrderStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Seconds between heartbeat sweeps.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

pub struct PushNotifier {
    push: Arc<dyn PushChannel>,
}

impl PushNotifier {
    pub fn new(push: Arc<dyn PushChannel>) -> Self {
        Self { push }
    }

    /// Fan a full work-order snapshot out to every subscription.
    pub async fn broadcast_work_order(&self, order: &WorkOrder) {
        let payload = json!({ "type": "workOrderUpdate", "workOrder": order }).to_string();
        self.fan_out(&payload).await;
    }

    /// Probe every subscription; prune the ones that report gone.
    pub async fn heartbeat(&self, now: DateTime<Utc>) {
        let payload =
            json!({ "type": "heartbeat", "timestamp": now.to_rfc3339() }).to_string();
        self.fan_out(&payload).await;
    }

    async fn fan_out(&self, payload: &str) {
        let connections = match self.push.connection_ids().await {
            Ok(connections) => connections,
            Err(e) => {
                tracing::warn!(error = %e, "push fan-out skipped: subscription scan failed");
                return;
            }
        };
        for connection_id in connections {
            match self.push.deliver(&connection_id, payload).await {
                Ok(DeliveryStatus::Delivered) => {}
                Ok(DeliveryStatus::Gone) => {
                    tracing::info!(connection = %connection_id, "pruning dead subscription");
                    if let Err(e) = self.push.remove_connection(&connection_id).await {
                        tracing::warn!(connection = %connection_id, error = %e, "prune failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(connection = %connection_id, error = %e, "push delivery failed");
                }
            }
        }
    }

    /// Background heartbeat sweep until `shutdown` fires.
    pub fn spawn_heartbeat_sweep<C: Clock>(
        self: Arc<Self>,
        clock: C,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                        self.heartbeat(clock.now()).await;
                    }
                }
            }
        })
    }
}

/// Work-order store wrapper that fans out a snapshot after every
/// successful partial update. Lock transitions do not notify; the next
/// step-status update carries the authoritative lock fields anyway.
pub struct NotifyingWorkOrderStore {
    store: Arc<dyn WorkOrderStore>,
    notifier: Arc<PushNotifier>,
}

impl NotifyingWorkOrderStore {
    pub fn new(store: Arc<dyn WorkOrderStore>, notifier: Arc<PushNotifier>) -> Self {
        Self { store, notifier }
    }
}

#[async_trait]
impl WorkOrderStore for NotifyingWorkOrderStore {
    async fn get_work_order(&self, id: &str) -> Result<Option<WorkOrder>, StoreError> {
        self.store.get_work_order(id).await
    }

    async fn update_work_order(&self, id: &str, patch: WorkOrderPatch) -> Result<(), StoreError> {
        self.store.update_work_order(id, patch).await?;
        if let Some(order) = self.store.get_work_order(id).await? {
            self.notifier.broadcast_work_order(&order).await;
        }
        Ok(())
    }

    async fn scan_work_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        self.store.scan_work_orders().await
    }

    async fn try_lock_work_order(&self, id: &str, agent_id: &str) -> Result<bool, StoreError> {
        self.store.try_lock_work_order(id, agent_id).await
    }

    async fn unlock_work_order(&self, id: &str) -> Result<(), StoreError> {
        self.store.unlock_work_order(id).await
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
