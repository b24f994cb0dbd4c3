// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration as ChronoDuration, TimeZone};
use courier_core::{FakeClock, WorkOrder};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().unwrap()
}

fn store() -> MemoryStore<FakeClock> {
    MemoryStore::new(FakeClock::at(t0()))
}

#[tokio::test]
async fn lock_is_a_compare_and_set() {
    let store = store();
    store.insert_work_order(WorkOrder::builder().build());

    assert!(store.try_lock_work_order("wo-1", "agent-a").await.unwrap());
    assert!(!store.try_lock_work_order("wo-1", "agent-b").await.unwrap());

    let order = store.work_order("wo-1").unwrap();
    assert!(order.locked);
    assert_eq!(order.locked_by, "agent-a");
}

#[tokio::test]
async fn unlock_is_idempotent() {
    let store = store();
    store.insert_work_order(WorkOrder::builder().build());
    store.try_lock_work_order("wo-1", "agent-a").await.unwrap();

    store.unlock_work_order("wo-1").await.unwrap();
    store.unlock_work_order("wo-1").await.unwrap();

    let order = store.work_order("wo-1").unwrap();
    assert!(!order.locked);
    assert!(order.locked_by.is_empty());
}

#[tokio::test]
async fn locked_iff_locked_by_nonempty() {
    let store = store();
    store.insert_work_order(WorkOrder::builder().build());
    store.try_lock_work_order("wo-1", "agent-a").await.unwrap();
    let order = store.work_order("wo-1").unwrap();
    assert_eq!(order.locked, !order.locked_by.is_empty());

    store.unlock_work_order("wo-1").await.unwrap();
    let order = store.work_order("wo-1").unwrap();
    assert_eq!(order.locked, !order.locked_by.is_empty());
}

#[tokio::test]
async fn update_bumps_updated_at() {
    let store = store();
    store.insert_work_order(WorkOrder::builder().build());
    store
        .update_work_order("wo-1", courier_core::WorkOrderPatch::default().stop_requested(true))
        .await
        .unwrap();
    let order = store.work_order("wo-1").unwrap();
    assert!(order.stop_requested);
    assert_eq!(order.updated_at, Some(t0()));
}

#[tokio::test]
async fn update_unknown_order_errors() {
    let store = store();
    let result = store
        .update_work_order("missing", courier_core::WorkOrderPatch::default().stop_requested(true))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn send_log_counts_by_account_and_window() {
    let store = store();
    let fresh = RecipientEntry {
        name: "A".into(),
        email: "a@x".into(),
        sendtime: t0(),
        account: Some("connect".into()),
    };
    let stale = RecipientEntry {
        sendtime: t0() - ChronoDuration::hours(30),
        ..fresh.clone()
    };
    let other_account = RecipientEntry { account: Some("gmb".into()), ..fresh.clone() };
    store.append_send_recipient("c-EN", fresh).await.unwrap();
    store.append_send_recipient("c-FR", stale).await.unwrap();
    store.append_send_recipient("c-EN", other_account).await.unwrap();

    let since = t0() - ChronoDuration::hours(24);
    assert_eq!(store.count_send_entries_since("connect", since).await.unwrap(), 1);
    assert_eq!(store.count_send_entries_since("gmb", since).await.unwrap(), 1);
    assert_eq!(store.count_send_entries_since("absent", since).await.unwrap(), 0);
}

#[tokio::test]
async fn dryrun_log_truncates() {
    let store = store();
    let entry = RecipientEntry {
        name: "A".into(),
        email: "a@x".into(),
        sendtime: t0(),
        account: None,
    };
    store.append_dryrun_recipient("c-EN", entry.clone()).await.unwrap();
    store.append_dryrun_recipient("c-EN", entry).await.unwrap();
    assert_eq!(store.dryrun_entries("c-EN").len(), 2);

    store.delete_dryrun_recipients("c-EN").await.unwrap();
    assert!(store.dryrun_entries("c-EN").is_empty());
}

#[tokio::test]
async fn queue_receive_marks_in_flight_until_deleted() {
    let queue = MemoryQueue::new();
    queue.send("one");
    queue.send("two");

    let first = queue.receive(1, Duration::from_secs(0)).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].body, "one");

    // The in-flight message is not redelivered
    let second = queue.receive(2, Duration::from_secs(0)).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].body, "two");

    queue.delete(&first[0].receipt_handle).await.unwrap();
    queue.delete(&second[0].receipt_handle).await.unwrap();
    assert!(queue.is_empty());
}

#[tokio::test]
async fn queue_peek_is_non_destructive() {
    let queue = MemoryQueue::new();
    queue.send("stop-msg");
    let peeked = queue.peek(10).await.unwrap();
    assert_eq!(peeked.len(), 1);
    assert_eq!(queue.len(), 1);
    let received = queue.receive(10, Duration::from_secs(0)).await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn queue_purge_discards_everything() {
    let queue = MemoryQueue::new();
    queue.send("a");
    queue.send("b");
    queue.purge().await.unwrap();
    assert!(queue.is_empty());
    assert!(queue.receive(10, Duration::from_secs(0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn object_store_round_trip() {
    let objects = MemoryObjectStore::new("bucket.example");
    let url = objects.put_html("vr20251001/t.html", "<p>hi</p>").await.unwrap();
    assert_eq!(url, "https://bucket.example/vr20251001/t.html");
    assert_eq!(objects.fetch(&url).await.unwrap(), "<p>hi</p>");
    assert!(objects.fetch("https://bucket.example/missing").await.is_err());
}

#[tokio::test]
async fn push_channel_reports_gone() {
    let push = MemoryPushChannel::new();
    push.add_connection("conn-1");
    push.add_connection("conn-2");
    push.mark_gone("conn-2");

    assert_eq!(push.deliver("conn-1", "{}").await.unwrap(), DeliveryStatus::Delivered);
    assert_eq!(push.deliver("conn-2", "{}").await.unwrap(), DeliveryStatus::Gone);

    push.remove_connection("conn-2").await.unwrap();
    assert_eq!(push.connection_ids().await.unwrap(), vec!["conn-1".to_string()]);
}

#[tokio::test]
async fn event_embedded_email_write() {
    let store = store();
    store.insert_event(EventRecord::new("vr20251001"));
    store
        .set_event_embedded_email("vr20251001", "retreat", "eligible", "English", "https://b/k")
        .await
        .unwrap();
    let event = store.event("vr20251001").unwrap();
    assert_eq!(
        event.embedded_emails["retreat"]["eligible"]["English"],
        "https://b/k".to_string()
    );
}
