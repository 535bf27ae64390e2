// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deterministic operation identifiers.
//!
//! A workflow ID names one logical operation on one resource. The engine
//! treats it as the idempotency key, so the same `(prefix, name, id)` must
//! always produce the same string. Components are joined with `-`. A `-` or
//! `%` inside the name or the ID is percent-escaped, so the last two `-`
//! always delimit them and distinct triples never share an ID. The prefix is
//! a fixed operation tag such as `disable-cron-job` and is kept verbatim.

use std::borrow::Cow;

/// Build the workflow ID for `(prefix, name, id)`.
///
/// ```
/// use hosting_core::workflow_id::workflow_id;
///
/// assert_eq!(workflow_id("webroot", "main", "abc123"), "webroot-main-abc123");
/// assert_eq!(workflow_id("cron", "my-job", "1"), "cron-my%2Djob-1");
/// ```
pub fn workflow_id(prefix: &str, name: &str, id: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + name.len() + id.len() + 2);
    out.push_str(prefix);
    out.push('-');
    out.push_str(&escape(name));
    out.push('-');
    out.push_str(&escape(id));
    out
}

fn escape(component: &str) -> Cow<'_, str> {
    if !component.contains(['-', '%']) {
        return Cow::Borrowed(component);
    }
    let mut escaped = String::with_capacity(component.len() + 4);
    for c in component.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '-' => escaped.push_str("%2D"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
