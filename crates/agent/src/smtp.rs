// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SMTP submission gateway with per-account credentials and a
//! process-local credential cache.

use crate::env::AgentConfig;
use async_trait::async_trait;
use courier_core::{
    full_language_name, personalize_html, EventRecord, PersonalizeContext, Pool, Prompt,
    StepError, Student,
};
use courier_store::{CredentialStore, SmtpCredentials};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One message to submit, with everything personalization needs.
pub struct OutgoingEmail<'a> {
    pub html: &'a str,
    pub subject: &'a str,
    /// Two-letter language code
    pub language: &'a str,
    pub account: Option<&'a str>,
    pub student: &'a Student,
    pub event: &'a EventRecord,
    pub pools: &'a [Pool],
    pub prompts: &'a [Prompt],
    pub dryrun: bool,
}

#[async_trait]
pub trait SmtpGateway: Send + Sync {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), StepError>;
}

const AMERICAS: [&str; 6] = ["United States", "Canada", "Mexico", "Chile", "Brazil", "Columbia"];

/// The shared `foundations`/`gmb` accounts split into regional senders.
pub fn regional_account(account: &str, country: &str) -> String {
    if account == "foundations" || account == "gmb" {
        if AMERICAS.contains(&country) {
            format!("{account}-americas")
        } else {
            format!("{account}-europe")
        }
    } else {
        account.to_string()
    }
}

const MAX_SEND_ATTEMPTS: u32 = 5;
const TRANSIENT_RETRY_WAIT: Duration = Duration::from_secs(60);

/// Production gateway: STARTTLS submission through the configured relay.
pub struct LettreSmtpGateway {
    config: Arc<AgentConfig>,
    credentials: Arc<dyn CredentialStore>,
    cache: Mutex<HashMap<String, SmtpCredentials>>,
}

impl LettreSmtpGateway {
    pub fn new(config: Arc<AgentConfig>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { config, credentials, cache: Mutex::new(HashMap::new()) }
    }

    async fn credentials_for(
        &self,
        account: &str,
        country: &str,
    ) -> Result<SmtpCredentials, StepError> {
        let resolved = regional_account(account, country);
        if let Some(cached) = self.cache.lock().get(&resolved) {
            return Ok(cached.clone());
        }
        let creds = self
            .credentials
            .get_credentials(&resolved)
            .await
            .map_err(StepError::from)?
            .ok_or_else(|| {
                StepError::Transport(format!(
                    "email credential lookup can't find account {resolved}"
                ))
            })?;
        self.cache.lock().insert(resolved, creds.clone());
        Ok(creds)
    }
}

#[async_trait]
impl SmtpGateway for LettreSmtpGateway {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), StepError> {
        let account = email
            .account
            .ok_or_else(|| StepError::Validation("no sender account configured".to_string()))?;
        let country = email.student.country.as_deref().unwrap_or("United States");
        let creds = self.credentials_for(account, country).await?;

        let html = personalize_html(
            email.html,
            &PersonalizeContext {
                student: email.student,
                event: email.event,
                pools: email.pools,
                prompts: email.prompts,
                language: full_language_name(email.language),
                coord_email: &creds.smtp_username,
                preview: &self.config.default_preview,
            },
        )?;

        if email.dryrun {
            tracing::info!(
                to = %email.student.email,
                country,
                sender = %creds.smtp_username,
                written_lang = email.student.written_lang_pref.as_deref().unwrap_or("English"),
                "DRYRUN"
            );
            return Ok(());
        }

        let from_address: Address = creds
            .smtp_username
            .parse()
            .map_err(|e| StepError::Transport(format!("bad sender address: {e}")))?;
        let to_address: Address = email
            .student
            .email
            .parse()
            .map_err(|e| StepError::Transport(format!("bad recipient address: {e}")))?;
        let preview = self.config.default_preview.replace('"', "");

        let message = Message::builder()
            .from(Mailbox::new(Some(self.config.default_from_name.clone()), from_address))
            .to(Mailbox::new(None, to_address))
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(preview, html))
            .map_err(|e| StepError::Transport(format!("message build failed: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
            &self.config.smtp_server,
        )
        .map_err(|e| StepError::Transport(format!("smtp relay setup failed: {e}")))?
        .port(self.config.smtp_port)
        .credentials(Credentials::new(
            creds.smtp_username.clone(),
            creds.smtp_password.clone(),
        ))
        .build();

        let mut attempts = 0;
        loop {
            match transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_transient() && attempts + 1 < MAX_SEND_ATTEMPTS => {
                    attempts += 1;
                    tracing::warn!(
                        attempt = attempts,
                        error = %e,
                        "transient SMTP failure, waiting before retry"
                    );
                    tokio::time::sleep(TRANSIENT_RETRY_WAIT).await;
                }
                Err(e) => {
                    return Err(StepError::Transport(format!("mail submission failed: {e}")));
                }
            }
        }
    }
}

/// One recorded submission from [`RecordingSmtpGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub language: String,
    pub account: Option<String>,
    pub dryrun: bool,
}

/// Local-mode transport: records submissions instead of speaking SMTP.
#[derive(Default)]
pub struct RecordingSmtpGateway {
    sent: Mutex<Vec<SentEmail>>,
    fail_after: Mutex<Option<usize>>,
}

impl RecordingSmtpGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every submission past the first `n` fails with a transport error.
    pub fn fail_after(&self, n: usize) {
        *self.fail_after.lock() = Some(n);
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl SmtpGateway for RecordingSmtpGateway {
    async fn send_email(&self, email: OutgoingEmail<'_>) -> Result<(), StepError> {
        let mut sent = self.sent.lock();
        if let Some(limit) = *self.fail_after.lock() {
            if sent.len() >= limit {
                return Err(StepError::Transport("injected transport failure".to_string()));
            }
        }
        sent.push(SentEmail {
            to: email.student.email.clone(),
            subject: email.subject.to_string(),
            language: email.language.to_string(),
            account: email.account.map(String::from),
            dryrun: email.dryrun,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "smtp_tests.rs"]
mod tests;
