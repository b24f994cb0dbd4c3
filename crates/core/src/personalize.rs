// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-recipient HTML specialization shared by Test, Dry-Run and Send.
//!
//! Substitutions run in a fixed order over the prepared HTML, ending with
//! the `#if`/`#else`/`#endif` line filter. The filter is single-level: a
//! block is opened by a `#if` line, optionally flipped by `#else`, and
//! closed by `#endif`; directive lines themselves are consumed.

use crate::eligibility::{check_eligibility, MalformedPool};
use crate::event::EventRecord;
use crate::pool::Pool;
use crate::prompt::{prompt_lookup, Prompt};
use crate::qa::RECIPIENT_PLACEHOLDER;
use crate::student::Student;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonalizeError {
    #[error("Can't use ||retreats||. No whichRetreatsConfig object found for event.")]
    RetreatsConfigMissing,
    #[error("Can't use ||retreats||. No retreat config for: {0}")]
    RetreatNotConfigured(String),
    #[error("||retreats|| failed at least one rule: {0}")]
    NoRetreatsMatched(String),
    #[error("Can't use ||balance|| in a non-multiple retreats event.")]
    BalanceConfigMissing,
    #[error("Can't use #if offering with installments in a non-multiple retreats event.")]
    OfferingConfigMissing,
    #[error("Unknown #if condition: {0}")]
    UnknownCondition(String),
    #[error("Non-prefaced #endif")]
    DanglingEndif,
    #[error("Non-prefaced #else")]
    DanglingElse,
    #[error("EOF in #if condition")]
    UnterminatedIf,
    #[error(transparent)]
    Eligibility(#[from] MalformedPool),
}

/// Everything a substitution pass needs besides the HTML itself.
pub struct PersonalizeContext<'a> {
    pub student: &'a Student,
    pub event: &'a EventRecord,
    pub pools: &'a [Pool],
    pub prompts: &'a [Prompt],
    pub language: &'a str,
    /// Resolved coordinator address for `||coord-email||` and `From`
    pub coord_email: &'a str,
    /// Configured preview text, quotes not yet stripped
    pub preview: &'a str,
}

#[allow(clippy::expect_used)]
fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex literal"))
}

const CONTENT_TYPE_META: &str =
    r#"<meta http-equiv="Content-Type" content="text/html charset=UTF-8" />"#;

/// Apply every substitution in order and evaluate conditional blocks.
pub fn personalize_html(
    html: &str,
    ctx: &PersonalizeContext<'_>,
) -> Result<String, PersonalizeError> {
    let mut html = html.replace("||name||", &ctx.student.full_name());

    if html.contains("||retreats||") {
        let retreats = render_retreats(ctx)?;
        html = html.replace("||retreats||", &retreats);
    }

    if html.contains("||balance||") {
        let balance = render_balance(ctx)?;
        html = html.replace("||balance||", &balance);
    }

    let preview = ctx.preview.replace('"', "");
    html = html.replace("*|MC_PREVIEW_TEXT|*", &preview);
    html = html.replace("*|MC:SUBJECT|*", &preview);

    html = comment_re().replace_all(&html, "").into_owned();

    if !html.contains(CONTENT_TYPE_META) {
        html = html.replace(r#"<meta charset="UTF-8">"#, CONTENT_TYPE_META);
    }

    let coord_href = format!(
        "<u><a href=\"mailto:{email}\" target=\"_blank\" style=\"mso-line-height-rule: \
         exactly;-ms-text-size-adjust: 100%;-webkit-text-size-adjust: 100%;color: \
         #FFFFFF;font-weight: normal;text-decoration: underline;\"><span \
         style=\"color:#0000FF\">{email}</span></a></u>",
        email = ctx.coord_email
    );
    html = html.replace("||coord-email||", &coord_href);

    html = html.replace(RECIPIENT_PLACEHOLDER, &ctx.student.id);

    filter_conditionals(&html, ctx)
}

fn render_retreats(ctx: &PersonalizeContext<'_>) -> Result<String, PersonalizeError> {
    let config = &ctx.event.config.which_retreats_config;
    if config.is_empty() {
        return Err(PersonalizeError::RetreatsConfigMissing);
    }
    let program = ctx.student.program(&ctx.event.aid);
    let selected = program.map(|p| p.selected_retreats()).unwrap_or_default();

    let mut items = String::from("<ul>");
    let mut at_least_one = false;
    for key in selected {
        let retreat = config
            .get(key)
            .ok_or_else(|| PersonalizeError::RetreatNotConfigured(key.to_string()))?;
        let text = prompt_lookup(ctx.prompts, &retreat.prompt, ctx.language, &ctx.event.aid);
        items.push_str(&format!("<li><b>{text}</b></li>"));
        at_least_one = true;
    }
    items.push_str("</ul>");

    if !at_least_one {
        return Err(PersonalizeError::NoRetreatsMatched(format!(
            "{}, {}, {}",
            ctx.student.first, ctx.student.last, ctx.student.id
        )));
    }
    Ok(items)
}

fn render_balance(ctx: &PersonalizeContext<'_>) -> Result<String, PersonalizeError> {
    let config = &ctx.event.config.which_retreats_config;
    if config.is_empty() {
        return Err(PersonalizeError::BalanceConfigMissing);
    }
    let program = ctx.student.program(&ctx.event.aid);

    let total: f64 = program
        .map(|p| {
            p.selected_retreats()
                .iter()
                .filter_map(|key| config.get(*key))
                .map(|r| r.offering_total)
                .sum()
        })
        .unwrap_or(0.0);

    // Installments are recorded under the retreat sub-event.
    let received: f64 = program
        .and_then(|p| p.offering_history.get("retreat"))
        .map(|o| o.amount_received())
        .unwrap_or(0.0);

    let (symbol, code) = ctx.event.currency_parts();
    Ok(format!("{symbol}{} {code}", format_amount(total - received)))
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount:.2}")
    }
}

fn filter_conditionals(
    html: &str,
    ctx: &PersonalizeContext<'_>,
) -> Result<String, PersonalizeError> {
    let mut in_if = false;
    let mut condition = false;
    let mut filtered = String::new();

    for line in html.lines() {
        if !in_if {
            if let Some(index) = line.find("#if") {
                in_if = true;
                condition = eval_condition(&line[index + 3..], ctx)?;
                continue;
            }
            if line.contains("#endif") {
                return Err(PersonalizeError::DanglingEndif);
            }
            if line.contains("#else") {
                return Err(PersonalizeError::DanglingElse);
            }
            push_line(&mut filtered, line);
        } else if line.contains("#endif") {
            in_if = false;
        } else if line.contains("#else") {
            condition = !condition;
        } else if condition {
            push_line(&mut filtered, line);
        }
    }

    if in_if {
        return Err(PersonalizeError::UnterminatedIf);
    }
    Ok(filtered)
}

fn push_line(out: &mut String, line: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(line);
}

/// Condition grammar: `oathed`, `offering <subevent>` (or installments
/// mode), `retreats <retreatA> [<retreatB>]`.
fn eval_condition(args: &str, ctx: &PersonalizeContext<'_>) -> Result<bool, PersonalizeError> {
    let args: Vec<&str> = args
        .trim_start()
        .split(|c| c == ' ' || c == '<')
        .filter(|a| !a.is_empty())
        .collect();
    let keyword = args.first().copied().unwrap_or("");
    match keyword {
        "oathed" => {
            Ok(check_eligibility("oath", ctx.student, &ctx.event.aid, ctx.pools, None)?)
        }
        "offering" => eval_offering(args.get(1).copied(), ctx),
        "retreats" => {
            let program = ctx.student.program(&ctx.event.aid);
            let matches = |prefix: Option<&&str>| -> bool {
                match (prefix, program) {
                    (Some(prefix), Some(p)) => p
                        .which_retreats
                        .iter()
                        .any(|(k, selected)| *selected && k.starts_with(*prefix)),
                    _ => false,
                }
            };
            Ok(matches(args.get(1)) || matches(args.get(2)))
        }
        other => Err(PersonalizeError::UnknownCondition(other.to_string())),
    }
}

fn eval_offering(
    subevent: Option<&str>,
    ctx: &PersonalizeContext<'_>,
) -> Result<bool, PersonalizeError> {
    let installments =
        ctx.event.config.offering_presentation.as_deref() == Some("installments");
    let program = ctx.student.program(&ctx.event.aid);

    if !installments {
        let Some(subevent) = subevent else {
            return Ok(false);
        };
        return Ok(program.is_some_and(|p| p.offering_history.contains_key(subevent)));
    }

    let Some(program) = program else {
        return Ok(false);
    };
    let Some(installment_map) =
        program.offering_history.get("retreat").filter(|o| !o.installments.is_empty())
    else {
        return Ok(false);
    };
    let total_received: f64 =
        installment_map.installments.values().map(|i| i.offering_amount).sum();

    let selected = program.selected_retreats();
    if selected.is_empty() {
        return Ok(false);
    }

    let mut key_count = selected.len();
    if program.limit_fee && key_count > 2 {
        key_count = 2;
    }

    let config = &ctx.event.config.which_retreats_config;
    if config.is_empty() {
        return Err(PersonalizeError::OfferingConfigMissing);
    }

    let total_required: f64 = selected
        .iter()
        .take(key_count)
        .filter_map(|key| config.get(*key))
        .map(|r| r.offering_total)
        .sum();

    Ok(total_required <= total_received)
}

#[cfg(test)]
#[path = "personalize_tests.rs"]
mod tests;
