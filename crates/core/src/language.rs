// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language codes, campaign strings and the stage alias for template names.

/// Supported campaign languages: code -> full name.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("EN", "English"),
    ("FR", "French"),
    ("SP", "Spanish"),
    ("DE", "German"),
    ("IT", "Italian"),
    ("CZ", "Czech"),
    ("PT", "Portuguese"),
];

/// Full language name for a code; unknown codes pass through unchanged.
pub fn full_language_name(code: &str) -> &str {
    let upper = code.to_ascii_uppercase();
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Canonical campaign string: `eventCode-subEvent-stage-LANG` with the raw
/// stage. This is the only form new ledger entries are written under.
pub fn campaign_string(event_code: &str, sub_event: &str, stage: &str, language: &str) -> String {
    format!("{event_code}-{sub_event}-{stage}-{language}")
}

/// Underscore-joined form written by earlier versions of the system; still
/// accepted when checking whether a student already received a campaign.
pub fn legacy_campaign_string(
    event_code: &str,
    sub_event: &str,
    stage: &str,
    language: &str,
) -> String {
    format!("{event_code}_{sub_event}_{stage}_{language}")
}

/// Stage alias used only when composing template names: the reminder stages
/// reuse the `reg` template family.
pub fn template_stage(stage: &str) -> &str {
    match stage {
        "eligible" | "offering-reminder" | "reg-reminder" => "reg",
        other => other,
    }
}

/// Template name for the rendering service: `eventCode-subEvent-stage-LANG`
/// with the stage alias applied.
pub fn template_name(event_code: &str, sub_event: &str, stage: &str, language: &str) -> String {
    format!("{event_code}-{sub_event}-{}-{language}", template_stage(stage))
}

#[cfg(test)]
#[path = "language_tests.rs"]
mod tests;
