// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pool::PoolRule;
use std::collections::HashMap;

fn everyone() -> Vec<Pool> {
    vec![Pool::new("everyone", vec![PoolRule::of("true")])]
}

fn order() -> WorkOrder {
    WorkOrder::builder().build()
}

#[test]
fn unsubscribed_students_are_skipped_entirely() {
    let students = [Student::builder().unsubscribe(true).build()];
    let counts = count_recipients(&students, &everyone(), &order(), None, "EN").unwrap();
    assert_eq!(counts, LanguageCounts { already_received: 0, will_send: 0 });
}

#[test]
fn already_received_accepts_both_separators() {
    let order = order();
    let dash = Student::builder()
        .emails(HashMap::from([(
            "vr20251001-retreat-eligible-EN".to_string(),
            "2024-01-01T00:00:00Z".to_string(),
        )]))
        .build();
    let underscore = Student::builder()
        .emails(HashMap::from([(
            "vr20251001_retreat_eligible_EN".to_string(),
            "2024-01-01T00:00:00Z".to_string(),
        )]))
        .build();
    assert!(already_received(&dash, &order, "EN"));
    assert!(already_received(&underscore, &order, "EN"));
    assert!(!already_received(&dash, &order, "FR"));
}

#[test]
fn english_passes_without_preference() {
    let students = [Student::builder().build()];
    let counts = count_recipients(&students, &everyone(), &order(), None, "EN").unwrap();
    assert_eq!(counts.will_send, 1);
}

#[test]
fn non_english_requires_matching_preference() {
    let no_pref = Student::builder().build();
    let french = Student::builder().id("st-2").written_lang_pref("french").build();
    let german = Student::builder().id("st-3").written_lang_pref("German").build();
    let students = [no_pref, french, german];

    let selected = select_recipients(&students, &everyone(), &order(), None, "FR").unwrap();
    assert_eq!(selected.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["st-2"]);
}

#[test]
fn missing_pool_config_excludes_everyone() {
    let order = WorkOrder::builder().config(HashMap::new()).build();
    let students = [Student::builder().build()];
    let counts = count_recipients(&students, &everyone(), &order, None, "EN").unwrap();
    assert_eq!(counts.will_send, 0);
}

#[test]
fn stage_filter_is_and_over_pools() {
    let pools = vec![
        Pool::new("everyone", vec![PoolRule::of("true")]),
        Pool::new("joined", vec![PoolRule::of("currenteventjoin")]),
    ];
    let mut stage = StageRecord::new("eligible");
    stage.pools = Some(vec!["everyone".to_string(), "joined".to_string()]);

    let outsider = Student::builder().build();
    let joined = Student::builder()
        .id("st-2")
        .programs(HashMap::from([(
            "vr20251001".to_string(),
            crate::student::Program { join: true, ..Default::default() },
        )]))
        .build();
    let students = [outsider, joined];

    let selected = select_recipients(&students, &pools, &order(), Some(&stage), "EN").unwrap();
    assert_eq!(selected.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["st-2"]);
}

#[test]
fn absent_stage_pools_is_vacuously_true() {
    let stage = StageRecord::new("eligible");
    let students = [Student::builder().build()];
    let selected =
        select_recipients(&students, &everyone(), &order(), Some(&stage), "EN").unwrap();
    assert_eq!(selected.len(), 1);
}

#[test]
fn stage_prefix_lookup() {
    let mut stage = StageRecord::new("offering-reminder");
    stage.prefix = HashMap::from([("FR".to_string(), "Rappel : ".to_string())]);
    assert_eq!(stage_prefix(Some(&stage), "FR"), "Rappel : ");
    assert_eq!(stage_prefix(Some(&stage), "EN"), "");
    assert_eq!(stage_prefix(None, "FR"), "");
}

#[test]
fn counts_split_received_and_pending_per_language() {
    // Three students: one unsubscribed, one already sent for EN, one fresh.
    let unsubscribed = Student::builder().id("st-1").unsubscribe(true).build();
    let received = Student::builder()
        .id("st-2")
        .emails(HashMap::from([(
            "vr20251001-retreat-eligible-EN".to_string(),
            "2024-01-01T00:00:00Z".to_string(),
        )]))
        .build();
    let fresh = Student::builder().id("st-3").build();
    let students = [unsubscribed, received, fresh];

    let en = count_recipients(&students, &everyone(), &order(), None, "EN").unwrap();
    assert_eq!(en, LanguageCounts { already_received: 1, will_send: 1 });

    let fr = count_recipients(&students, &everyone(), &order(), None, "FR").unwrap();
    assert_eq!(fr, LanguageCounts { already_received: 0, will_send: 0 });
}

#[test]
fn malformed_pool_propagates() {
    let pools = vec![Pool::new("everyone", vec![PoolRule::of("nonsense")])];
    let students = [Student::builder().build()];
    assert!(count_recipients(&students, &pools, &order(), None, "EN").is_err());
}
