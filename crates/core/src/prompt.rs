// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Localized prompt fragments and their lookup rule.

use serde::{Deserialize, Serialize};

/// One localized text fragment, keyed by `(prompt, language)` where
/// `prompt` is either `{aid}-{key}` or `default-{key}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub prompt: String,
    pub language: String,
    #[serde(default)]
    pub text: String,
}

impl Prompt {
    pub fn new(
        prompt: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { prompt: prompt.into(), language: language.into(), text: text.into() }
    }
}

/// Look up a prompt: first the aid-specific entry for the language, then the
/// default entry for the language or `universal`, else a visible placeholder.
pub fn prompt_lookup(prompts: &[Prompt], key: &str, language: &str, aid: &str) -> String {
    let aid_key = format!("{aid}-{key}");
    if let Some(p) = prompts.iter().find(|p| p.prompt == aid_key && p.language == language) {
        return p.text.clone();
    }
    let default_key = format!("default-{key}");
    if let Some(p) = prompts
        .iter()
        .find(|p| p.prompt == default_key && (p.language == language || p.language == "universal"))
    {
        return p.text.clone();
    }
    format!("{aid}-{key}-{language}-unknown")
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
