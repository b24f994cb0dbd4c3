// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for tests in this crate and downstream crates.

use crate::event::EventRecord;
use crate::pool::{Pool, PoolRule};
use crate::student::Student;

/// The catch-all pool: a single `true` rule.
pub fn everyone_pool() -> Pool {
    Pool::new("everyone", vec![PoolRule::of("true")])
}

/// An event matching the default work-order builder.
pub fn event() -> EventRecord {
    EventRecord::new("vr20251001")
}

/// A sendable student with a unique id and address.
pub fn student(n: usize) -> Student {
    Student::builder()
        .id(format!("st-{n}"))
        .email(format!("student{n}@example.org"))
        .first(format!("First{n}"))
        .last("Example")
        .build()
}
