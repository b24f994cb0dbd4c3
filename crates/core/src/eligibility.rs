// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool eligibility evaluator.
//!
//! A pool is satisfied when **any** of its attribute rules is satisfied.
//! Rules may recurse into other pools by name; recursion is bounded by the
//! set of pool names and cycles are reported as [`MalformedPool`].

use crate::pool::{Pool, PoolRule};
use crate::student::{Program, Student};
use thiserror::Error;

/// A pool definition that cannot be evaluated: a rule is missing a required
/// field, names an unknown rule kind, or pool recursion cycles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed pool '{pool}': {reason}")]
pub struct MalformedPool {
    pub pool: String,
    pub reason: String,
}

impl MalformedPool {
    fn new(pool: &str, reason: impl Into<String>) -> Self {
        Self { pool: pool.to_string(), reason: reason.into() }
    }
}

/// Decide whether `student` is a member of the pool named `pool_name`.
///
/// `current_event` and `current_sub_event` bind the `currentevent*` rules.
/// An unknown pool name evaluates to `false` (the definition may simply not
/// exist yet); a malformed definition is an error.
pub fn check_eligibility(
    pool_name: &str,
    student: &Student,
    current_event: &str,
    pools: &[Pool],
    current_sub_event: Option<&str>,
) -> Result<bool, MalformedPool> {
    let mut visiting = Vec::new();
    eval_pool(pool_name, student, current_event, pools, current_sub_event, &mut visiting)
}

fn eval_pool(
    pool_name: &str,
    student: &Student,
    current_event: &str,
    pools: &[Pool],
    current_sub_event: Option<&str>,
    visiting: &mut Vec<String>,
) -> Result<bool, MalformedPool> {
    if visiting.iter().any(|p| p == pool_name) {
        return Err(MalformedPool::new(pool_name, "pool recursion cycle"));
    }
    let Some(pool) = pools.iter().find(|p| p.name == pool_name) else {
        return Ok(false);
    };
    if pool.attributes.is_empty() {
        return Ok(false);
    }

    visiting.push(pool_name.to_string());
    let mut result = false;
    for rule in &pool.attributes {
        if eval_rule(pool_name, rule, student, current_event, pools, current_sub_event, visiting)? {
            result = true;
            break;
        }
    }
    visiting.pop();
    Ok(result)
}

#[allow(clippy::too_many_arguments)]
fn eval_rule(
    pool_name: &str,
    rule: &PoolRule,
    student: &Student,
    current_event: &str,
    pools: &[Pool],
    current_sub_event: Option<&str>,
    visiting: &mut Vec<String>,
) -> Result<bool, MalformedPool> {
    let kind = rule
        .kind
        .as_deref()
        .ok_or_else(|| MalformedPool::new(pool_name, "rule without a type"))?;
    fn req<'a>(
        field: &'a Option<String>,
        name: &str,
        pool_name: &str,
        kind: &str,
    ) -> Result<&'a str, MalformedPool> {
        field
            .as_deref()
            .ok_or_else(|| MalformedPool::new(pool_name, format!("'{kind}' requires '{name}'")))
    }
    let mut recurse = |name: &str| -> Result<bool, MalformedPool> {
        eval_pool(name, student, current_event, pools, current_sub_event, visiting)
    };
    let program = |aid: &str| student.programs.get(aid);
    let current = || student.programs.get(current_event);

    let eligible = match kind {
        "true" => true,
        "pool" => recurse(req(&rule.name, "name", pool_name, kind)?)?,
        "pooldiff" => {
            recurse(req(&rule.inpool, "inpool", pool_name, kind)?)? && !recurse(req(&rule.outpool, "outpool", pool_name, kind)?)?
        }
        "pooland" => recurse(req(&rule.pool1, "pool1", pool_name, kind)?)? && recurse(req(&rule.pool2, "pool2", pool_name, kind)?)?,
        "practice" => {
            let field = req(&rule.field, "field", pool_name, kind)?;
            student.practice.get(field).copied().unwrap_or(false)
        }
        "offering" => {
            let aid = req(&rule.aid, "aid", pool_name, kind)?;
            let subevent = req(&rule.subevent, "subevent", pool_name, kind)?;
            program(aid).is_some_and(|p| !p.withdrawn && has_offering(p, subevent))
        }
        "currenteventoffering" => current().is_some_and(|p| {
            !p.withdrawn
                && current_sub_event.is_some_and(|se| has_offering(p, se))
        }),
        "currenteventnotoffering" => {
            !current().is_some_and(|p| current_sub_event.is_some_and(|se| has_offering(p, se)))
        }
        "currenteventtest" => current().is_some_and(|p| p.test),
        "offeringandpools" => {
            let aid = req(&rule.aid, "aid", pool_name, kind)?;
            let subevent = req(&rule.subevent, "subevent", pool_name, kind)?;
            let listed = rule
                .pools
                .as_ref()
                .ok_or_else(|| MalformedPool::new(pool_name, "'offeringandpools' requires 'pools'"))?;
            if program(aid).is_some_and(|p| p.offering_history.contains_key(subevent)) {
                let mut any = false;
                for name in listed {
                    if recurse(name)? {
                        any = true;
                        break;
                    }
                }
                any
            } else {
                false
            }
        }
        "oath" => program(req(&rule.aid, "aid", pool_name, kind)?).is_some_and(|p| p.oath),
        "attended" => program(req(&rule.aid, "aid", pool_name, kind)?).is_some_and(|p| p.attended),
        "join" => program(req(&rule.aid, "aid", pool_name, kind)?).is_some_and(|p| p.join),
        "currenteventjoin" => current().is_some_and(|p| p.join),
        "currenteventnotjoin" => !current().is_some_and(|p| p.join),
        "currenteventaccepted" => current().is_some_and(|p| p.accepted && !p.withdrawn),
        "currenteventmanualinclude" => current().is_some_and(|p| p.manual_include),
        "joinwhich" => {
            let aid = req(&rule.aid, "aid", pool_name, kind)?;
            let retreat = req(&rule.retreat, "retreat", pool_name, kind)?;
            program(aid).is_some_and(|p| joined_which(p, retreat))
        }
        "offeringwhich" => {
            let aid = req(&rule.aid, "aid", pool_name, kind)?;
            let retreat = req(&rule.retreat, "retreat", pool_name, kind)?;
            let subevent = req(&rule.subevent, "subevent", pool_name, kind)?;
            program(aid).is_some_and(|p| {
                joined_which(p, retreat)
                    && p.offering_history
                        .iter()
                        .any(|(k, o)| k.starts_with(subevent) && o.offering_sku.is_some())
            })
        }
        "eligible" => current().is_some_and(|p| p.eligible),
        other => {
            return Err(MalformedPool::new(pool_name, format!("unknown rule type '{other}'")));
        }
    };
    Ok(eligible)
}

/// `subevent = "any"` matches an offering on any sub-event.
fn has_offering(program: &Program, subevent: &str) -> bool {
    if subevent == "any" {
        program.offering_history.values().any(|o| o.offering_sku.is_some())
    } else {
        program
            .offering_history
            .get(subevent)
            .is_some_and(|o| o.offering_sku.is_some())
    }
}

fn joined_which(program: &Program, retreat: &str) -> bool {
    program.join
        && !program.withdrawn
        && program
            .which_retreats
            .iter()
            .any(|(k, selected)| *selected && k.starts_with(retreat))
}

#[cfg(test)]
#[path = "eligibility_tests.rs"]
mod tests;
