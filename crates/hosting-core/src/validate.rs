// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Input validation shared by the lifecycle services.

use crate::error::{CoreError, Result};

const MAX_NAME_LEN: usize = 63;
const MAX_FQDN_LEN: usize = 253;

/// Resource names: `[a-z0-9][a-z0-9_-]{0,62}`.
pub fn name(field: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(CoreError::validation(field, "must not be empty"));
    };
    if value.len() > MAX_NAME_LEN {
        return Err(CoreError::validation(
            field,
            format!("must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(CoreError::validation(
            field,
            "must start with a lowercase letter or digit",
        ));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(CoreError::validation(
            field,
            "may only contain lowercase letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Required free-form value.
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    Ok(())
}

/// Dot-separated DNS labels, each 1-63 of `[a-z0-9-]`, not starting or
/// ending with `-`. A leading `*.` wildcard label is allowed.
pub fn fqdn(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > MAX_FQDN_LEN {
        return Err(CoreError::validation(
            field,
            format!("must be 1-{} characters", MAX_FQDN_LEN),
        ));
    }
    let host = value.strip_prefix("*.").unwrap_or(value);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Err(CoreError::validation(field, "must contain at least two labels"));
    }
    for label in labels {
        let valid = !label.is_empty()
            && label.len() <= MAX_NAME_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(CoreError::validation(
                field,
                format!("invalid label '{}'", label),
            ));
        }
    }
    Ok(())
}

/// Five whitespace-separated cron fields.
pub fn cron_schedule(field: &str, value: &str) -> Result<()> {
    let fields = value.split_whitespace().count();
    if fields != 5 {
        return Err(CoreError::validation(
            field,
            format!("expected 5 fields, got {}", fields),
        ));
    }
    Ok(())
}

/// Path relative to the webroot that cannot escape it.
pub fn relative_path(field: &str, value: &str) -> Result<()> {
    if value.starts_with('/') {
        return Err(CoreError::validation(field, "must be relative"));
    }
    if value.split('/').any(|segment| segment == "..") {
        return Err(CoreError::validation(field, "must not contain '..'"));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(CoreError::validation(field, "must not be negative"));
    }
    Ok(())
}

pub fn positive(field: &str, value: i32) -> Result<()> {
    if value <= 0 {
        return Err(CoreError::validation(field, "must be positive"));
    }
    Ok(())
}

/// URL path prefix a daemon is proxied under.
pub fn proxy_path(field: &str, value: &str) -> Result<()> {
    if !value.starts_with('/') {
        return Err(CoreError::validation(field, "must start with '/'"));
    }
    Ok(())
}
