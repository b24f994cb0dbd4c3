// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipient selection: the stage filter and the per-language send set.
//!
//! Selection order for one language: unsubscribe, already-received ledger,
//! language rule, work-order pool, stage pool overlay. Count and Send share
//! this path so the counts always predict the send set.

use crate::eligibility::{check_eligibility, MalformedPool};
use crate::language::{campaign_string, full_language_name, legacy_campaign_string};
use crate::pool::Pool;
use crate::stage::StageRecord;
use crate::student::Student;
use crate::work_order::WorkOrder;

/// Count-step output for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LanguageCounts {
    pub already_received: usize,
    pub will_send: usize,
}

/// Whether the student's ledger shows this campaign, accepting both the
/// canonical dash form and the legacy underscore form.
pub fn already_received(student: &Student, order: &WorkOrder, language: &str) -> bool {
    let canonical = campaign_string(&order.event_code, &order.sub_event, &order.stage, language);
    if student.emails.contains_key(&canonical) {
        return true;
    }
    let legacy = legacy_campaign_string(&order.event_code, &order.sub_event, &order.stage, language);
    student.emails.contains_key(&legacy)
}

/// English goes to everyone; any other language requires a matching written
/// language preference (case-insensitive full name).
fn passes_language_rule(student: &Student, language: &str) -> bool {
    let full = full_language_name(language);
    if full.eq_ignore_ascii_case("english") {
        return true;
    }
    student
        .written_lang_pref
        .as_deref()
        .is_some_and(|pref| pref.eq_ignore_ascii_case(full))
}

/// AND-over-pools stage overlay. A missing stage record or a stage without
/// `pools` passes vacuously.
pub fn passes_stage_filter(
    stage: Option<&StageRecord>,
    student: &Student,
    event_code: &str,
    pools: &[Pool],
    sub_event: Option<&str>,
) -> Result<bool, MalformedPool> {
    let Some(stage_pools) = stage.and_then(|s| s.pools.as_ref()) else {
        return Ok(true);
    };
    for pool_name in stage_pools {
        if !check_eligibility(pool_name, student, event_code, pools, sub_event)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Subject prefix for a language from the stage record, or empty.
pub fn stage_prefix<'a>(stage: Option<&'a StageRecord>, language: &str) -> &'a str {
    stage
        .and_then(|s| s.prefix.get(language))
        .map(String::as_str)
        .unwrap_or("")
}

fn passes_filters(
    student: &Student,
    order: &WorkOrder,
    stage: Option<&StageRecord>,
    pools: &[Pool],
    language: &str,
) -> Result<bool, MalformedPool> {
    if !passes_language_rule(student, language) {
        return Ok(false);
    }
    let Some(pool_name) = order.pool_name() else {
        // No configured pool excludes everyone.
        return Ok(false);
    };
    if !check_eligibility(pool_name, student, &order.event_code, pools, Some(&order.sub_event))? {
        return Ok(false);
    }
    passes_stage_filter(stage, student, &order.event_code, pools, Some(&order.sub_event))
}

/// Count-step numbers for one language: (already received, will send).
pub fn count_recipients(
    students: &[Student],
    pools: &[Pool],
    order: &WorkOrder,
    stage: Option<&StageRecord>,
    language: &str,
) -> Result<LanguageCounts, MalformedPool> {
    let mut counts = LanguageCounts::default();
    for student in students {
        if student.unsubscribe {
            continue;
        }
        if already_received(student, order, language) {
            counts.already_received += 1;
            continue;
        }
        if passes_filters(student, order, stage, pools, language)? {
            counts.will_send += 1;
        }
    }
    Ok(counts)
}

/// The send set for one language, in student-table order.
pub fn select_recipients<'a>(
    students: &'a [Student],
    pools: &[Pool],
    order: &WorkOrder,
    stage: Option<&StageRecord>,
    language: &str,
) -> Result<Vec<&'a Student>, MalformedPool> {
    let mut selected = Vec::new();
    for student in students {
        if student.unsubscribe || already_received(student, order, language) {
            continue;
        }
        if passes_filters(student, order, stage, pools, language)? {
            selected.push(student);
        }
    }
    Ok(selected)
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
