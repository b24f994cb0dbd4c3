// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Count step: per-language (already received, will send) totals.

use super::StepContext;
use courier_core::{count_recipients, Clock, StepError, WorkOrder};

pub async fn run<C: Clock>(
    ctx: &StepContext<C>,
    order: &WorkOrder,
) -> Result<String, StepError> {
    ctx.progress("Starting count process...").await;

    let stage = ctx.directory.get_stage(&order.stage).await?;

    ctx.progress("Scanning student table...").await;
    let students = ctx.directory.scan_students().await?;
    ctx.progress(format!("Found {} student records", students.len())).await;

    let pools = ctx.directory.scan_pools().await?;
    ctx.progress(format!("Found {} pool definitions", pools.len())).await;

    let mut received = Vec::new();
    let mut will_send = Vec::new();
    let mut totals = Vec::new();

    for lang in order.enabled_languages() {
        ctx.check_stop().await?;
        ctx.progress(format!("Processing {lang} language...")).await;
        let counts = count_recipients(&students, &pools, order, stage.as_ref(), lang)?;
        received.push(format!("{lang}:{}", counts.already_received));
        will_send.push(format!("{lang}:{}", counts.will_send));
        totals.push(format!("{lang}:{}", counts.already_received + counts.will_send));
    }

    let message = format!(
        "Already received: {}, Will send: {}, Total: {}",
        received.join(", "),
        will_send.join(", "),
        totals.join(", ")
    );
    ctx.progress(message.clone()).await;
    Ok(message)
}
