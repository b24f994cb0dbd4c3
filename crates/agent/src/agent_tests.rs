// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{t0, Harness};
use chrono::Duration as ChronoDuration;
use courier_core::test_support::{event, everyone_pool, student};
use courier_core::WorkOrder;

fn send_command(harness: &Harness, command: Command) {
    harness.queue.send(serde_json::to_string(&command).unwrap_or_default());
}

fn seed_campaign(harness: &Harness) {
    harness.store.insert_student(student(1));
    harness.store.insert_student(student(2));
    harness.store.insert_pool(everyone_pool());
    harness.store.insert_event(event());
}

/// A work order whose Send step is next: everything before it complete.
fn order_ready_to_send(send_continuously: bool) -> WorkOrder {
    let mut order = WorkOrder::builder()
        .account("connect")
        .send_continuously(send_continuously)
        .build();
    order
        .s3_html_paths
        .insert("EN".to_string(), "https://bucket.example/vr20251001/t.html".to_string());
    for name in [StepName::Count, StepName::Prepare, StepName::Test, StepName::DryRun] {
        order.update_step(name, StepStatus::Complete, "", t0());
    }
    for step in order.steps.iter_mut() {
        step.is_active = step.name == StepName::Send;
    }
    order
}

fn seed_html(harness: &Harness) {
    harness.objects.insert(
        "https://bucket.example/vr20251001/t.html",
        "<p>Dear ||name||</p>",
    );
}

#[tokio::test]
async fn start_command_runs_count_to_completion() {
    let harness = Harness::new();
    seed_campaign(&harness);
    harness.store.insert_work_order(WorkOrder::builder().build());

    send_command(&harness, Command::start("wo-1", "Count"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let count = order.step(StepName::Count).unwrap();
    assert_eq!(count.status, StepStatus::Complete);
    assert!(count.message.contains("Will send: EN:2"));

    // Successor enabled, single active step, lock released, message gone.
    let prepare = order.step(StepName::Prepare).unwrap();
    assert_eq!(prepare.status, StepStatus::Ready);
    assert!(prepare.is_active);
    assert_eq!(order.active_step_count(), 1);
    assert!(!order.locked);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn malformed_message_is_deleted_silently() {
    let harness = Harness::new();
    harness.queue.send("{not json");
    harness.agent.tick().await.unwrap();
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn orphan_work_order_message_is_deleted() {
    let harness = Harness::new();
    send_command(&harness, Command::start("wo-ghost", "Count"));
    harness.agent.tick().await.unwrap();
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn duplicate_start_of_working_step_is_dropped() {
    let harness = Harness::new();
    let mut order = WorkOrder::builder().build();
    order.update_step(StepName::Count, StepStatus::Working, "busy elsewhere", t0());
    harness.store.insert_work_order(order);

    send_command(&harness, Command::start("wo-1", "Count"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let count = order.step(StepName::Count).unwrap();
    assert_eq!(count.status, StepStatus::Working);
    assert_eq!(count.message, "busy elsewhere");
    assert!(!order.locked);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn out_of_order_start_fails_the_step() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let send = order.step(StepName::Send).unwrap();
    assert_eq!(send.status, StepStatus::Error);
    assert!(send.message.contains("Previous step must be complete"));
    assert!(!order.locked);
}

#[tokio::test]
async fn lock_contention_fails_step_without_touching_holder() {
    let harness = Harness::new();
    seed_campaign(&harness);
    let mut order = order_ready_to_send(false);
    order.locked = true;
    order.locked_by = "agent-other".to_string();
    harness.store.insert_work_order(order);

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let send = order.step(StepName::Send).unwrap();
    assert_eq!(send.status, StepStatus::Error);
    assert!(send.message.contains("Could not lock work order for processing"));
    // The other agent's lease is untouched.
    assert!(order.locked);
    assert_eq!(order.locked_by, "agent-other");
}

#[tokio::test]
async fn send_records_ledger_and_audit_log() {
    let harness = Harness::new();
    seed_campaign(&harness);
    seed_html(&harness);
    harness.store.insert_work_order(order_ready_to_send(false));

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    assert_eq!(order.step(StepName::Send).unwrap().status, StepStatus::Complete);
    assert_eq!(harness.smtp.sent_count(), 2);

    let campaign = "vr20251001-retreat-eligible-EN";
    for id in ["st-1", "st-2"] {
        let ledger = harness.store.student(id).unwrap().emails;
        let stamp = ledger.get(campaign).expect("ledger entry");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }
    let audit = harness.store.send_entries(campaign);
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|e| e.account.as_deref() == Some("connect")));
}

#[tokio::test]
async fn rerun_send_skips_already_ledgered_recipients() {
    let harness = Harness::new();
    seed_campaign(&harness);
    seed_html(&harness);
    harness.store.insert_work_order(order_ready_to_send(false));

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();
    assert_eq!(harness.smtp.sent_count(), 2);

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();
    // Nobody is selected twice.
    assert_eq!(harness.smtp.sent_count(), 2);
}

#[tokio::test]
async fn stop_of_idle_step_is_informational() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());

    send_command(&harness, Command::stop("wo-1", "Count"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    // Ready step: nothing destructive happened, flag was set, message gone.
    assert_eq!(order.step(StepName::Count).unwrap().status, StepStatus::Ready);
    assert!(order.stop_requested);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn stop_interrupts_sleeping_work_order() {
    let harness = Harness::new();
    seed_campaign(&harness);
    let mut order = order_ready_to_send(true);
    order.send_until = Some(t0() + ChronoDuration::hours(2));
    order.send_interval = Some(1800);
    order.locked = true;
    order.locked_by = "agent-previous".to_string();
    order.state = Some(courier_core::WorkOrderState::Sleeping);
    order.sleep_until = Some(t0() + ChronoDuration::minutes(30));
    order.update_step(StepName::Send, StepStatus::Sleeping, "Sleeping until later", t0());
    harness.store.insert_work_order(order);

    harness.agent.startup().await.unwrap();
    assert_eq!(harness.agent.sleeping_count(), 1);

    send_command(&harness, Command::stop("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let send = order.step(StepName::Send).unwrap();
    assert_eq!(send.status, StepStatus::Interrupted);
    assert!(send.message.contains("while sleeping"));
    assert!(!order.locked);
    assert_eq!(order.state, None);
    assert_eq!(harness.agent.sleeping_count(), 0);
}

#[tokio::test]
async fn startup_purges_stale_commands() {
    let harness = Harness::new();
    harness.store.insert_work_order(WorkOrder::builder().build());
    send_command(&harness, Command::start("wo-1", "Count"));
    send_command(&harness, Command::start("wo-1", "Prepare"));

    harness.agent.startup().await.unwrap();
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn startup_releases_abandoned_leases() {
    let harness = Harness::new();
    harness
        .store
        .insert_work_order(WorkOrder::builder().locked(true).locked_by("agent-dead").build());
    harness.agent.startup().await.unwrap();
    assert!(!harness.store.work_order("wo-1").unwrap().locked);
}

#[tokio::test]
async fn startup_revives_sleepers_and_rewrites_past_due() {
    let harness = Harness::new();
    let mut order = order_ready_to_send(true);
    order.send_until = Some(t0() + ChronoDuration::hours(6));
    order.send_interval = Some(1800);
    order.locked = true;
    order.locked_by = "agent-dead".to_string();
    order.state = Some(courier_core::WorkOrderState::Sleeping);
    order.sleep_until = Some(t0() - ChronoDuration::minutes(5));
    order.update_step(StepName::Send, StepStatus::Sleeping, "Sleeping until earlier", t0());
    harness.store.insert_work_order(order);

    harness.agent.startup().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    assert_eq!(order.sleep_until, Some(t0() + ChronoDuration::seconds(1800)));
    assert_eq!(order.locked_by, harness.agent.agent_id());
    assert_eq!(harness.agent.sleeping_count(), 1);
    let send = order.step(StepName::Send).unwrap();
    assert_eq!(send.status, StepStatus::Sleeping);
    assert!(send.message.contains("Sleeping until"));
}

#[tokio::test]
async fn due_sleeper_wakes_sends_and_reparks() {
    let harness = Harness::new();
    seed_campaign(&harness);
    seed_html(&harness);
    let mut order = order_ready_to_send(true);
    order.send_until = Some(t0() + ChronoDuration::hours(6));
    order.send_interval = Some(1800);
    order.locked = true;
    order.locked_by = "agent-dead".to_string();
    order.state = Some(courier_core::WorkOrderState::Sleeping);
    order.sleep_until = Some(t0() + ChronoDuration::minutes(30));
    order.update_step(StepName::Send, StepStatus::Sleeping, "Sleeping until later", t0());
    harness.store.insert_work_order(order);

    harness.agent.startup().await.unwrap();
    assert_eq!(harness.agent.sleeping_count(), 1);

    // Not yet due: nothing happens.
    harness.agent.tick().await.unwrap();
    assert_eq!(harness.smtp.sent_count(), 0);

    // Advance past sleepUntil: the sleeper wakes, sends, and re-parks.
    harness.clock.advance(ChronoDuration::minutes(31));
    harness.agent.tick().await.unwrap();

    assert_eq!(harness.smtp.sent_count(), 2);
    let order = harness.store.work_order("wo-1").unwrap();
    assert_eq!(order.state, Some(courier_core::WorkOrderState::Sleeping));
    assert_eq!(order.step(StepName::Send).unwrap().status, StepStatus::Sleeping);
    assert!(order.locked);
    assert_eq!(harness.agent.sleeping_count(), 1);
}

#[tokio::test]
async fn quota_zero_fails_send_immediately() {
    let harness = Harness::with_config(crate::env::AgentConfig {
        smtp_24_hour_send_limit: 0,
        email_burst_size: 1000,
        email_recovery_sleep_secs: 0,
        ..crate::env::AgentConfig::default()
    });
    seed_campaign(&harness);
    seed_html(&harness);
    harness.store.insert_work_order(order_ready_to_send(false));

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    let send = order.step(StepName::Send).unwrap();
    assert_eq!(send.status, StepStatus::Error);
    assert!(send.message.contains("24-hour send limit reached"));
    assert_eq!(harness.smtp.sent_count(), 0);
    assert!(!order.locked);
}

#[tokio::test]
async fn zero_enabled_languages_completes_with_zero_sends() {
    let harness = Harness::new();
    seed_campaign(&harness);
    seed_html(&harness);
    let mut order = order_ready_to_send(false);
    order.languages = std::collections::BTreeMap::from([("EN".to_string(), false)]);
    harness.store.insert_work_order(order);

    send_command(&harness, Command::start("wo-1", "Send"));
    harness.agent.tick().await.unwrap();

    let order = harness.store.work_order("wo-1").unwrap();
    assert_eq!(order.step(StepName::Send).unwrap().status, StepStatus::Complete);
    assert_eq!(harness.smtp.sent_count(), 0);
}
