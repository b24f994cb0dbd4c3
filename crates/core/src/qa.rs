// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prepare-step content QA: directive balance, salutation, zoom and
//! registration links.

use crate::stage::StageRecord;
use crate::work_order::WorkOrder;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// A QA check rejected the prepared HTML. The message is user-visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct QaFailure(pub String);

impl QaFailure {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[allow(clippy::expect_used)]
fn regex(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex literal"))
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"#(if|else|endif)\b")
}

fn zoom_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"https://[^\s"]*zoom\.us/[^\s"]*"#)
}

fn reg_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r#"https://(?:reg|csf)\.slsupport\.link/[^\s"]+"#)
}

/// Recipient-id placeholder replaced at send time.
pub const RECIPIENT_PLACEHOLDER: &str = "123456789";

/// Normalize template-service HTML: drop the trailing `<center>…</center>`
/// block the renderer appends.
pub fn clean_html(raw: &str) -> String {
    let Some(start) = raw.rfind("<center>") else {
        return raw.to_string();
    };
    let Some(end) = raw[start..].find("</center>") else {
        return raw.to_string();
    };
    let end = start + end + "</center>".len();
    format!("{}{}", &raw[..start], &raw[end..])
}

/// Run every QA check against cleaned HTML for one language.
pub fn perform_qa(
    html: &str,
    order: &WorkOrder,
    stage: Option<&StageRecord>,
) -> Result<(), QaFailure> {
    check_directive_balance(html)?;

    if order.salutation_by_name.unwrap_or(true) && !html.contains("||name||") {
        return Err(QaFailure::new("QA Failure: missing '||name||' in HTML"));
    }

    if stage.is_some_and(|s| s.qa_step_check_zoom_id) && !order.in_person {
        let Some(zoom_id) = order.zoom_id.as_deref().filter(|z| !z.is_empty()) else {
            return Err(QaFailure::new(format!(
                "QA Failure: zoom ID required for '{}'",
                order.stage
            )));
        };
        let has_link = zoom_link_re().find_iter(html).any(|m| m.as_str().contains(zoom_id));
        if !has_link {
            return Err(QaFailure::new("QA Failure: zoom link with zoom ID not found"));
        }
    }

    if order.reg_link_present {
        let aid_param = format!("aid={}", order.event_code);
        let pid_param = format!("pid={RECIPIENT_PLACEHOLDER}");
        let ok = reg_link_re().find_iter(html).any(|m| {
            let link = m.as_str();
            has_query_param(link, &aid_param) && has_query_param(link, &pid_param)
        });
        if !ok {
            return Err(QaFailure::new(
                "QA Failure: registration link with '&aid' and '&pid' not found",
            ));
        }
    }

    Ok(())
}

fn has_query_param(link: &str, param: &str) -> bool {
    link.contains(&format!("?{param}")) || link.contains(&format!("&{param}"))
}

fn check_directive_balance(html: &str) -> Result<(), QaFailure> {
    let mut depth = 0u32;
    for capture in directive_re().captures_iter(html) {
        match &capture[1] {
            "if" => depth += 1,
            "else" => {
                if depth == 0 {
                    return Err(QaFailure::new("QA Failure: dangling '#else' found"));
                }
            }
            _ => {
                if depth == 0 {
                    return Err(QaFailure::new("QA Failure: unmatched '#endif' found"));
                }
                depth -= 1;
            }
        }
    }
    if depth > 0 {
        return Err(QaFailure::new("QA Failure: missing '#endif' for one or more '#if'"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "qa_tests.rs"]
mod tests;
