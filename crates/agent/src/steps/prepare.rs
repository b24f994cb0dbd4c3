// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prepare step: fetch rendered HTML, QA it, publish it.

use super::StepContext;
use courier_core::{
    clean_html, full_language_name, perform_qa, template_name, Clock, StepError, WorkOrder,
    WorkOrderPatch,
};

pub async fn run<C: Clock>(
    ctx: &StepContext<C>,
    order: &WorkOrder,
) -> Result<String, StepError> {
    ctx.progress("Starting prepare step...").await;

    let stage = ctx.directory.get_stage(&order.stage).await?;
    let mut html_paths = order.s3_html_paths.clone();

    for lang in order.enabled_languages() {
        ctx.check_stop().await?;
        ctx.progress(format!("Processing {lang} language...")).await;

        let template = template_name(&order.event_code, &order.sub_event, &order.stage, lang);
        ctx.progress(format!("Finding template for {lang}...")).await;
        let html = ctx
            .templates
            .fetch_template(&template)
            .await?
            .ok_or_else(|| StepError::NotFound(format!("Template '{template}' not found")))?;
        let html = clean_html(&html);

        ctx.progress(format!("Performing QA checks for {lang}...")).await;
        perform_qa(&html, order, stage.as_ref())?;

        let key = format!("{}/{template}.html", order.event_code);
        ctx.progress(format!("Uploading {lang} template...")).await;
        // Publishing failures are operator-retriable errors, not crashes.
        let url = ctx
            .objects
            .put_html(&key, &html)
            .await
            .map_err(|e| StepError::Transport(format!("upload of {key} failed: {e}")))?;

        ctx.progress(format!("Recording embedded email for {lang}...")).await;
        ctx.directory
            .set_event_embedded_email(
                &order.event_code,
                &order.sub_event,
                &order.stage,
                full_language_name(lang),
                &url,
            )
            .await
            .map_err(|e| {
                StepError::Transport(format!("embedded email update for {lang} failed: {e}"))
            })?;

        html_paths.insert(lang.to_string(), url);
        ctx.work_orders
            .update_work_order(
                &ctx.order_id,
                WorkOrderPatch::default().s3_html_paths(html_paths.clone()),
            )
            .await?;
        ctx.progress(format!("Successfully completed {lang} language")).await;
    }

    Ok("Prepare step completed successfully".to_string())
}
