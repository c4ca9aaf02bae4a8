// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Shared helpers: scoped cleanup and (on Windows) the scoped COM apartment.

pub mod scope_guard;

#[cfg(windows)]
pub mod com;

pub use scope_guard::defer;
