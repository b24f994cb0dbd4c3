// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool definitions: named, rule-composed predicates over student records.
//!
//! Rules arrive from a scanned table and are deliberately loose; the
//! evaluator in [`crate::eligibility`] validates required fields at
//! evaluation time so a malformed definition surfaces as `MalformedPool`
//! rather than a decode failure that hides the pool name.

use serde::{Deserialize, Serialize};

/// A named set definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<PoolRule>,
}

impl Pool {
    pub fn new(name: impl Into<String>, attributes: Vec<PoolRule>) -> Self {
        Self { name: name.into(), attributes }
    }
}

/// One attribute rule inside a pool. `kind` selects the rule; which of the
/// remaining fields are required depends on the kind and is checked by the
/// evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolRule {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inpool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outpool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subevent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retreat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<String>>,
}

impl PoolRule {
    /// A rule with just a kind; field setters below fill in the rest.
    pub fn of(kind: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), ..Self::default() }
    }

    pub fn name(mut self, v: impl Into<String>) -> Self {
        self.name = Some(v.into());
        self
    }

    pub fn inpool(mut self, v: impl Into<String>) -> Self {
        self.inpool = Some(v.into());
        self
    }

    pub fn outpool(mut self, v: impl Into<String>) -> Self {
        self.outpool = Some(v.into());
        self
    }

    pub fn pool1(mut self, v: impl Into<String>) -> Self {
        self.pool1 = Some(v.into());
        self
    }

    pub fn pool2(mut self, v: impl Into<String>) -> Self {
        self.pool2 = Some(v.into());
        self
    }

    pub fn field(mut self, v: impl Into<String>) -> Self {
        self.field = Some(v.into());
        self
    }

    pub fn aid(mut self, v: impl Into<String>) -> Self {
        self.aid = Some(v.into());
        self
    }

    pub fn subevent(mut self, v: impl Into<String>) -> Self {
        self.subevent = Some(v.into());
        self
    }

    pub fn retreat(mut self, v: impl Into<String>) -> Self {
        self.retreat = Some(v.into());
        self
    }

    pub fn pools(mut self, v: Vec<String>) -> Self {
        self.pools = Some(v);
        self
    }
}
