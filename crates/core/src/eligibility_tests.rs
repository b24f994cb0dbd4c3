// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::student::{OfferingRecord, Student};
use std::collections::HashMap;

const AID: &str = "vr20251001";

fn student_with(program: Program) -> Student {
    Student::builder().programs(HashMap::from([(AID.to_string(), program)])).build()
}

fn pool(name: &str, rules: Vec<PoolRule>) -> Pool {
    Pool::new(name, rules)
}

fn check(pools: &[Pool], student: &Student) -> Result<bool, MalformedPool> {
    check_eligibility(&pools[0].name, student, AID, pools, Some("retreat"))
}

fn offering(sku: Option<&str>) -> OfferingRecord {
    OfferingRecord { offering_sku: sku.map(String::from), ..Default::default() }
}

#[test]
fn true_rule_always_matches() {
    let pools = [pool("everyone", vec![PoolRule::of("true")])];
    let student = Student::builder().build();
    assert_eq!(check(&pools, &student), Ok(true));
}

#[test]
fn empty_pool_matches_nobody() {
    let pools = [pool("empty", vec![])];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(false));
}

#[test]
fn unknown_pool_is_false() {
    let pools = [pool("outer", vec![PoolRule::of("pool").name("missing")])];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(false));
}

#[test]
fn rules_are_or_combined() {
    let pools = [pool(
        "either",
        vec![PoolRule::of("currenteventjoin"), PoolRule::of("true")],
    )];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(true));
}

#[test]
fn pooldiff_requires_in_but_not_out() {
    let pools = [
        pool("diff", vec![PoolRule::of("pooldiff").inpool("joined").outpool("oathed")]),
        pool("joined", vec![PoolRule::of("currenteventjoin")]),
        pool("oathed", vec![PoolRule::of("oath").aid(AID)]),
    ];
    let joined = student_with(Program { join: true, ..Default::default() });
    assert_eq!(check(&pools, &joined), Ok(true));

    let joined_and_oathed = student_with(Program { join: true, oath: true, ..Default::default() });
    assert_eq!(check(&pools, &joined_and_oathed), Ok(false));
}

#[test]
fn pooland_requires_both() {
    let pools = [
        pool("both", vec![PoolRule::of("pooland").pool1("joined").pool2("attended")]),
        pool("joined", vec![PoolRule::of("currenteventjoin")]),
        pool("attended", vec![PoolRule::of("attended").aid(AID)]),
    ];
    let only_joined = student_with(Program { join: true, ..Default::default() });
    assert_eq!(check(&pools, &only_joined), Ok(false));

    let both = student_with(Program { join: true, attended: true, ..Default::default() });
    assert_eq!(check(&pools, &both), Ok(true));
}

#[test]
fn practice_field_truthy() {
    let pools = [pool("practicing", vec![PoolRule::of("practice").field("meditation")])];
    let student = Student::builder()
        .practice(HashMap::from([("meditation".to_string(), true)]))
        .build();
    assert_eq!(check(&pools, &student), Ok(true));
    assert_eq!(check(&pools, &Student::builder().build()), Ok(false));
}

#[test]
fn offering_requires_sku_and_not_withdrawn() {
    let pools = [pool("paid", vec![PoolRule::of("offering").aid(AID).subevent("retreat")])];
    let paid = student_with(Program {
        offering_history: HashMap::from([("retreat".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &paid), Ok(true));

    let withdrawn = student_with(Program {
        withdrawn: true,
        offering_history: HashMap::from([("retreat".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &withdrawn), Ok(false));

    let no_sku = student_with(Program {
        offering_history: HashMap::from([("retreat".to_string(), offering(None))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &no_sku), Ok(false));
}

#[test]
fn offering_any_matches_any_subevent() {
    let pools = [pool("paid-any", vec![PoolRule::of("offering").aid(AID).subevent("any")])];
    let paid = student_with(Program {
        offering_history: HashMap::from([("weekend".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &paid), Ok(true));
}

#[test]
fn currenteventoffering_binds_current_context() {
    let pools = [pool("cur", vec![PoolRule::of("currenteventoffering")])];
    let paid = student_with(Program {
        offering_history: HashMap::from([("retreat".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    assert_eq!(check_eligibility("cur", &paid, AID, &pools, Some("retreat")), Ok(true));
    assert_eq!(check_eligibility("cur", &paid, AID, &pools, Some("weekend")), Ok(false));
    assert_eq!(check_eligibility("cur", &paid, AID, &pools, None), Ok(false));
}

#[test]
fn currenteventnotoffering_ignores_withdrawn() {
    let pools = [pool("not-paid", vec![PoolRule::of("currenteventnotoffering")])];
    let withdrawn_but_paid = student_with(Program {
        withdrawn: true,
        offering_history: HashMap::from([("retreat".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    // withdrawn does not rescue: the offering exists, so "not offering" is false
    assert_eq!(check(&pools, &withdrawn_but_paid), Ok(false));
    assert_eq!(check(&pools, &Student::builder().build()), Ok(true));
}

#[test]
fn offeringandpools_gates_on_subevent_presence() {
    let pools = [
        pool(
            "combo",
            vec![PoolRule::of("offeringandpools")
                .aid(AID)
                .subevent("retreat")
                .pools(vec!["joined".to_string()])],
        ),
        pool("joined", vec![PoolRule::of("currenteventjoin")]),
    ];
    let joined_no_history = student_with(Program { join: true, ..Default::default() });
    assert_eq!(check(&pools, &joined_no_history), Ok(false));

    let joined_with_history = student_with(Program {
        join: true,
        offering_history: HashMap::from([("retreat".to_string(), offering(None))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &joined_with_history), Ok(true));
}

#[test]
fn current_event_flag_rules() {
    let accepted = student_with(Program { accepted: true, ..Default::default() });
    let pools = [pool("acc", vec![PoolRule::of("currenteventaccepted")])];
    assert_eq!(check(&pools, &accepted), Ok(true));

    let accepted_withdrawn =
        student_with(Program { accepted: true, withdrawn: true, ..Default::default() });
    assert_eq!(check(&pools, &accepted_withdrawn), Ok(false));

    let pools = [pool("manual", vec![PoolRule::of("currenteventmanualinclude")])];
    let manual = student_with(Program { manual_include: true, ..Default::default() });
    assert_eq!(check(&pools, &manual), Ok(true));

    let pools = [pool("notjoin", vec![PoolRule::of("currenteventnotjoin")])];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(true));
    let joined = student_with(Program { join: true, ..Default::default() });
    assert_eq!(check(&pools, &joined), Ok(false));

    let pools = [pool("elig", vec![PoolRule::of("eligible")])];
    let eligible = student_with(Program { eligible: true, ..Default::default() });
    assert_eq!(check(&pools, &eligible), Ok(true));
}

#[test]
fn joinwhich_matches_retreat_prefix() {
    let pools = [pool("jw", vec![PoolRule::of("joinwhich").aid(AID).retreat("retreatA")])];
    let matching = student_with(Program {
        join: true,
        which_retreats: HashMap::from([("retreatA-june".to_string(), true)]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &matching), Ok(true));

    let unselected = student_with(Program {
        join: true,
        which_retreats: HashMap::from([("retreatA-june".to_string(), false)]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &unselected), Ok(false));

    let withdrawn = student_with(Program {
        join: true,
        withdrawn: true,
        which_retreats: HashMap::from([("retreatA-june".to_string(), true)]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &withdrawn), Ok(false));
}

#[test]
fn offeringwhich_needs_join_and_offering() {
    let pools = [pool(
        "ow",
        vec![PoolRule::of("offeringwhich").aid(AID).retreat("retreatA").subevent("retreat")],
    )];
    let complete = student_with(Program {
        join: true,
        which_retreats: HashMap::from([("retreatA".to_string(), true)]),
        offering_history: HashMap::from([("retreat-june".to_string(), offering(Some("sku")))]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &complete), Ok(true));

    let no_offering = student_with(Program {
        join: true,
        which_retreats: HashMap::from([("retreatA".to_string(), true)]),
        ..Default::default()
    });
    assert_eq!(check(&pools, &no_offering), Ok(false));
}

#[test]
fn nested_pools_recurse() {
    let pools = [
        pool("outer", vec![PoolRule::of("pool").name("middle")]),
        pool("middle", vec![PoolRule::of("pool").name("inner")]),
        pool("inner", vec![PoolRule::of("true")]),
    ];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(true));
}

#[test]
fn recursion_cycle_is_malformed() {
    let pools = [
        pool("a", vec![PoolRule::of("pool").name("b")]),
        pool("b", vec![PoolRule::of("pool").name("a")]),
    ];
    let err = check(&pools, &Student::builder().build()).unwrap_err();
    assert!(err.reason.contains("cycle"), "unexpected reason: {}", err.reason);
}

#[test]
fn sibling_recursion_is_not_a_cycle() {
    // The same pool may be consulted twice along different branches.
    let pools = [
        pool("top", vec![PoolRule::of("pooland").pool1("shared").pool2("also-shared")]),
        pool("shared", vec![PoolRule::of("true")]),
        pool("also-shared", vec![PoolRule::of("pool").name("shared")]),
    ];
    assert_eq!(check(&pools, &Student::builder().build()), Ok(true));
}

#[yare::parameterized(
    missing_type   = { PoolRule::default() },
    unknown_type   = { PoolRule::of("frobnicate") },
    pool_no_name   = { PoolRule::of("pool") },
    diff_no_out    = { PoolRule::of("pooldiff").inpool("a") },
    practice_bare  = { PoolRule::of("practice") },
    offering_bare  = { PoolRule::of("offering").aid("x") },
    joinwhich_bare = { PoolRule::of("joinwhich").retreat("r") },
)]
fn malformed_rules_error(rule: PoolRule) {
    let pools = [pool("bad", vec![rule]), pool("a", vec![PoolRule::of("true")])];
    let result = check(&pools, &Student::builder().build());
    assert!(result.is_err(), "expected MalformedPool, got {result:?}");
}
