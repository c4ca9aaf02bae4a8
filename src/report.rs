// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Probe results and transcript formatting helpers.
//!
//! Every platform sub-check lands in a [`Probe`]: either the decoded value
//! or the failure detail (a `0x`-prefixed status word for raw platform
//! failures). A failed probe aborts only its own nested sub-checks; the
//! transcript keeps whatever was already collected and the run moves on.

use serde::Serialize;

/// Outcome of one platform sub-check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Probe<T> {
    Ok { value: T },
    Failed { detail: String },
}

impl<T> Probe<T> {
    pub fn ok(value: T) -> Self {
        Probe::Ok { value }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Probe::Failed {
            detail: detail.into(),
        }
    }

    /// Failure from a raw Win32 status word or HRESULT bit pattern.
    pub fn failed_status(status: u32) -> Self {
        Self::failed(format_status(status))
    }
}

/// `0x`-prefixed, zero-padded, uppercase hex — the transcript's status
/// format for platform error words.
pub fn format_status(status: u32) -> String {
    format!("{status:#010X}")
}
