// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! isoscope: a read-only Windows security/isolation posture inspector.
//!
//! This library provides the registry access wrapper and the three
//! inspection routines (token elevation, firewall profiles, network
//! isolation / app containers) behind the `isoscope` binary. All platform
//! access goes through narrow seams so the wrapper contracts can be
//! exercised off-Windows.

pub mod checks;
pub mod config;
pub mod registry;
pub mod report;
pub mod utils;
