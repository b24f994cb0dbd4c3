// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::Harness;
use courier_core::{StepError, StepName, StepStatus, WorkOrder, WorkOrderPatch};
use courier_store::{Command, WorkOrderStore};

#[tokio::test]
async fn progress_updates_step_message_and_notifies() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    harness.push.add_connection("conn-1");

    let ctx = harness.context("wo-1", StepName::Count);
    ctx.progress("Scanning student table...").await;

    let order = harness.store.work_order("wo-1").unwrap();
    assert_eq!(order.step(StepName::Count).unwrap().message, "Scanning student table...");
    assert_eq!(harness.push.delivered().len(), 1);
}

#[tokio::test]
async fn progress_swallows_missing_work_order() {
    let harness = Harness::new();
    let ctx = harness.context("wo-ghost", StepName::Count);
    ctx.progress("does not explode").await;
}

#[tokio::test]
async fn check_stop_honors_cancel_token() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    let ctx = harness.context("wo-1", StepName::Send);
    ctx.cancel.cancel();
    assert!(matches!(ctx.check_stop().await, Err(StepError::Interrupted)));
}

#[tokio::test]
async fn check_stop_honors_persisted_flag() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().stop_requested(true).build());
    let ctx = harness.context("wo-1", StepName::Send);
    assert!(matches!(ctx.check_stop().await, Err(StepError::Interrupted)));
}

#[tokio::test]
async fn check_stop_passes_when_clear() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    let ctx = harness.context("wo-1", StepName::Send);
    assert!(ctx.check_stop().await.is_ok());
}

#[tokio::test]
async fn stop_message_pending_matches_only_this_order() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    let ctx = harness.context("wo-1", StepName::Send);

    harness.queue.send(serde_json::to_string(&Command::stop("wo-other", "Send")).unwrap());
    assert!(!ctx.stop_message_pending().await.unwrap());

    harness.queue.send(serde_json::to_string(&Command::start("wo-1", "Send")).unwrap());
    assert!(!ctx.stop_message_pending().await.unwrap());

    harness.queue.send(serde_json::to_string(&Command::stop("wo-1", "Send")).unwrap());
    assert!(ctx.stop_message_pending().await.unwrap());
    // Peeking consumed nothing
    assert_eq!(harness.queue.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn interruptible_sleep_observes_stop_within_interval() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    let ctx = harness.context("wo-1", StepName::Send);

    // Flag the stop before sleeping; the first one-second slice must see it.
    harness
        .store
        .update_work_order("wo-1", WorkOrderPatch::default().stop_requested(true))
        .await
        .unwrap();
    let result = ctx.interruptible_sleep(60).await;
    assert!(matches!(result, Err(StepError::Interrupted)));
}

#[tokio::test(start_paused = true)]
async fn interruptible_sleep_completes_quietly() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    let ctx = harness.context("wo-1", StepName::Send);
    assert!(ctx.interruptible_sleep(3).await.is_ok());
}

#[tokio::test]
async fn reload_missing_order_is_not_found() {
    let harness = Harness::new();
    let ctx = harness.context("wo-ghost", StepName::Send);
    let err = ctx.reload().await.unwrap_err();
    assert_eq!(err.terminal_status(), StepStatus::Error);
    assert!(err.to_string().contains("wo-ghost"));
}
