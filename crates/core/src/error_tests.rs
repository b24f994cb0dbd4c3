// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn interrupted_maps_to_interrupted() {
    assert_eq!(StepError::Interrupted.terminal_status(), StepStatus::Interrupted);
}

#[yare::parameterized(
    store = { StepError::StoreUnavailable("timeout".into()) },
    other = { StepError::Other("panic equivalent".into()) },
)]
fn unexplained_failures_are_exceptions(err: StepError) {
    assert_eq!(err.terminal_status(), StepStatus::Exception);
}

#[yare::parameterized(
    not_found  = { StepError::NotFound("no such event".into()) },
    lock       = { StepError::LockDenied("held by agent-b".into()) },
    validation = { StepError::Validation("no testers".into()) },
    quota      = { StepError::SendLimitReached("450/450".into()) },
    transport  = { StepError::Transport("mail relay refused".into()) },
)]
fn recognised_failures_are_errors(err: StepError) {
    assert_eq!(err.terminal_status(), StepStatus::Error);
}

#[test]
fn interrupted_message_is_stable() {
    // The UI matches on this exact message.
    assert_eq!(StepError::Interrupted.to_string(), "Step interrupted by stop request.");
}
