// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-work-order lease management.
//!
//! A lease is the pair `locked`/`lockedBy` on the record itself; there is
//! no TTL. Abandoned leases are recovered only by `release_all` at agent
//! startup, which deliberately leaves Sleeping work orders locked (their
//! owner is conceptually the fleet, and the reviving agent re-adopts them).

use courier_core::{StepError, WorkOrderState};
use courier_store::WorkOrderStore;
use std::sync::Arc;

pub struct LockManager {
    store: Arc<dyn WorkOrderStore>,
    agent_id: String,
}

impl LockManager {
    pub fn new(store: Arc<dyn WorkOrderStore>, agent_id: impl Into<String>) -> Self {
        Self { store, agent_id: agent_id.into() }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Conditional acquire; false when another agent holds the lease.
    pub async fn acquire(&self, id: &str) -> Result<bool, StepError> {
        let acquired = self.store.try_lock_work_order(id, &self.agent_id).await?;
        if acquired {
            tracing::debug!(work_order = id, agent = %self.agent_id, "lease acquired");
        }
        Ok(acquired)
    }

    /// Unconditional release; safe to call repeatedly.
    pub async fn release(&self, id: &str) -> Result<(), StepError> {
        self.store.unlock_work_order(id).await?;
        tracing::debug!(work_order = id, "lease released");
        Ok(())
    }

    /// Startup recovery: release every locked work order except those
    /// parked Sleeping. Returns the number released.
    pub async fn release_all_except_sleeping(&self) -> Result<usize, StepError> {
        let orders = self.store.scan_work_orders().await?;
        let mut released = 0;
        for order in orders {
            if !order.locked || order.state == Some(WorkOrderState::Sleeping) {
                continue;
            }
            self.store.unlock_work_order(&order.id).await?;
            released += 1;
        }
        if released > 0 {
            tracing::info!(count = released, "force-released abandoned leases");
        }
        Ok(released)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
