// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Scoped deferred cleanup.
//!
//! `defer` runs a release action exactly once when the guard leaves scope,
//! on every exit path. Used for OS handles, COM interfaces, and platform
//! heap allocations in the inspection routines.

/// Guard returned by [`defer`]. Runs its action on drop unless dismissed.
pub struct ScopeGuard<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    /// Disarm the guard; the action will not run.
    pub fn dismiss(mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

/// Run `action` when the returned guard is dropped.
#[must_use = "the guard runs its action when dropped; binding it to _ releases immediately"]
pub fn defer<F: FnOnce()>(action: F) -> ScopeGuard<F> {
    ScopeGuard {
        action: Some(action),
    }
}
