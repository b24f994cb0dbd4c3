// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Send and Dry-Run: the bursted, quota-limited delivery loop.
//!
//! One handler, parameterized by `dry_run`. The continuous-send decision
//! is returned to the executor, which owns the sleep-queue parking path.

use super::StepContext;
use crate::smtp::OutgoingEmail;
use chrono::Duration;
use courier_core::{
    campaign_string, select_recipients, stage_prefix, Clock, RecipientEntry, StepError, WorkOrder,
    WorkOrderPatch,
};

/// How a successful pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Terminal: the step is complete with this message.
    Completed(String),
    /// Continuous mode with time left before `sendUntil`; park the order.
    RequestPark,
}

pub async fn run<C: Clock>(
    ctx: &StepContext<C>,
    order: &WorkOrder,
    dry_run: bool,
) -> Result<SendOutcome, StepError> {
    let display_name = if dry_run { "Dry-Run" } else { "Send" };
    ctx.progress(format!("Starting {} process...", display_name.to_lowercase())).await;

    if !dry_run {
        if let Some(account) = order.account.as_deref() {
            ctx.progress(format!("Checking 24-hour send limit for account '{account}'...")).await;
            check_quota(ctx, account, "").await?;
        }
    }

    let stage = ctx.directory.get_stage(&order.stage).await?;

    ctx.progress("Loading required data...").await;
    let students = ctx.directory.scan_students().await?;
    ctx.progress(format!("Loaded {} student records", students.len())).await;
    let pools = ctx.directory.scan_pools().await?;
    let prompts = ctx.directory.scan_prompts().await?;
    let event = ctx
        .directory
        .get_event(&order.event_code)
        .await?
        .ok_or_else(|| StepError::NotFound(format!("Event {} not found", order.event_code)))?;

    if order.s3_html_paths.is_empty() {
        return Err(StepError::Validation(
            "No S3 HTML paths found. Prepare step must be completed first.".to_string(),
        ));
    }

    let mut total_sent = 0usize;
    let mut preview: Vec<RecipientEntry> = Vec::new();

    for lang in order.enabled_languages() {
        if !dry_run && total_sent > 0 {
            if let Some(account) = order.account.as_deref() {
                check_quota(ctx, account, &format!(" before processing {lang}")).await?;
            }
        }

        ctx.progress(format!("Processing {lang} language...")).await;
        let campaign = campaign_string(&order.event_code, &order.sub_event, &order.stage, lang);

        if dry_run {
            ctx.progress(format!("Clearing existing dry run records for {lang}...")).await;
            ctx.recipients.delete_dryrun_recipients(&campaign).await?;
        }

        let selected = select_recipients(&students, &pools, order, stage.as_ref(), lang)?;
        ctx.progress(format!("Found {} eligible students for {lang}", selected.len())).await;

        let url = order.s3_html_paths.get(lang).ok_or_else(|| {
            StepError::Validation(format!("No S3 path found for language {lang}"))
        })?;
        let html = ctx.objects.fetch(url).await.map_err(|e| {
            StepError::Transport(format!("Failed to retrieve HTML for {lang}: {e}"))
        })?;

        let subject = {
            let base = order
                .subjects
                .get(lang)
                .cloned()
                .unwrap_or_else(|| format!("Email for {lang}"));
            format!("{}{base}", stage_prefix(stage.as_ref(), lang))
        };

        let mut sent_for_lang = 0usize;
        ctx.progress(format!("Sending {} emails for {lang}...", selected.len())).await;

        for (i, student) in selected.iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                return Err(StepError::Interrupted);
            }
            if i % 5 == 0 {
                ctx.check_stop().await?;
                if ctx.stop_message_pending().await? {
                    return Err(StepError::Interrupted);
                }
            }
            if !dry_run && i > 0 && i % 10 == 0 {
                if let Some(account) = order.account.as_deref() {
                    check_quota(ctx, account, " during sending").await?;
                }
            }

            ctx.smtp
                .send_email(OutgoingEmail {
                    html: &html,
                    subject: &subject,
                    language: lang,
                    account: order.account.as_deref(),
                    student,
                    event: &event,
                    pools: &pools,
                    prompts: &prompts,
                    dryrun: dry_run,
                })
                .await?;

            let now = ctx.now();
            let entry = RecipientEntry {
                name: student.full_name(),
                email: student.email.clone(),
                sendtime: now,
                account: if dry_run { None } else { order.account.clone() },
            };
            if dry_run {
                ctx.recipients.append_dryrun_recipient(&campaign, entry.clone()).await?;
                preview.push(entry);
            } else {
                // Ledger first: at-most-one-recorded-delivery per recipient.
                let mut emails = student.emails.clone();
                emails.insert(campaign.clone(), now.to_rfc3339());
                ctx.directory.update_student_emails(&student.id, emails).await?;
                ctx.recipients.append_send_recipient(&campaign, entry).await?;
            }
            sent_for_lang += 1;
            total_sent += 1;

            if (i + 1) % 10 == 0 {
                ctx.progress(format!(
                    "Processed {}/{} students for {lang}, sent {sent_for_lang} emails",
                    i + 1,
                    selected.len()
                ))
                .await;
            }

            if !dry_run
                && ctx.config.email_burst_size > 0
                && (i + 1) % ctx.config.email_burst_size == 0
                && i + 1 < selected.len()
            {
                let secs = ctx.config.email_recovery_sleep_secs;
                ctx.progress(format!(
                    "Burst limit reached for {lang}, sleeping for {secs} seconds..."
                ))
                .await;
                ctx.interruptible_sleep(secs).await?;
            }
        }

        ctx.progress(format!("Completed {lang} language, sent {sent_for_lang} emails")).await;
    }

    if dry_run {
        ctx.work_orders
            .update_work_order(&ctx.order_id, WorkOrderPatch::default().dry_run_recipients(preview))
            .await?;
        return Ok(SendOutcome::Completed(format!(
            "Dry-Run completed successfully. {total_sent} emails would have been sent."
        )));
    }

    if order.send_continuously && order.send_until.is_some_and(|until| ctx.now() < until) {
        return Ok(SendOutcome::RequestPark);
    }

    Ok(SendOutcome::Completed(format!(
        "Send completed successfully. Sent {total_sent} total emails."
    )))
}

async fn check_quota<C: Clock>(
    ctx: &StepContext<C>,
    account: &str,
    phase: &str,
) -> Result<(), StepError> {
    let limit = ctx.config.smtp_24_hour_send_limit;
    let since = ctx.now() - Duration::hours(24);
    let sent = ctx.recipients.count_send_entries_since(account, since).await?;
    if sent >= limit {
        return Err(StepError::SendLimitReached(format!(
            "24-hour send limit reached{phase} for account '{account}'. \
             Sent {sent}/{limit} emails in the last 24 hours."
        )));
    }
    Ok(())
}
