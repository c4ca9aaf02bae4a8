// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Inspection routines.
//!
//! Each check is an independent one-shot consumer: it queries the platform,
//! captures every sub-result in a [`crate::report::Probe`], and renders its
//! section of the transcript. A failure inside one check never stops the
//! others.

pub mod elevation;
pub mod firewall;
pub mod network_isolation;

use std::io::{self, Write};

use serde::Serialize;

/// Which checks to run. Defaults to all of them.
#[derive(Debug, Clone)]
pub struct Selection {
    pub elevation: bool,
    pub firewall: bool,
    pub network_isolation: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            elevation: true,
            firewall: true,
            network_isolation: true,
        }
    }
}

/// The full posture report. Sections are absent when deselected, or on
/// platforms where collection is unsupported.
#[derive(Debug, Serialize)]
pub struct PostureReport {
    pub platform: &'static str,
    pub elevation: Option<elevation::ElevationReport>,
    pub firewall: Option<firewall::FirewallReport>,
    pub network_isolation: Option<network_isolation::NetworkIsolationReport>,
}

#[cfg(windows)]
pub fn collect(selection: &Selection, hosts: &[String]) -> PostureReport {
    let registry = crate::registry::Registry::live();
    PostureReport {
        platform: std::env::consts::OS,
        elevation: selection
            .elevation
            .then(|| elevation::collect(&registry)),
        firewall: selection.firewall.then(firewall::collect),
        network_isolation: selection
            .network_isolation
            .then(|| network_isolation::collect(&registry, hosts)),
    }
}

#[cfg(not(windows))]
pub fn collect(_selection: &Selection, _hosts: &[String]) -> PostureReport {
    tracing::warn!("posture inspection requires Windows; emitting an empty report");
    PostureReport {
        platform: std::env::consts::OS,
        elevation: None,
        firewall: None,
        network_isolation: None,
    }
}

impl PostureReport {
    pub fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "isoscope security posture (platform: {})", self.platform)?;
        if self.elevation.is_none() && self.firewall.is_none() && self.network_isolation.is_none()
        {
            writeln!(out, "no posture data collected: inspection requires Windows")?;
            return Ok(());
        }
        if let Some(elevation) = &self.elevation {
            writeln!(out)?;
            elevation.render_text(out)?;
        }
        if let Some(firewall) = &self.firewall {
            writeln!(out)?;
            firewall.render_text(out)?;
        }
        if let Some(isolation) = &self.network_isolation {
            writeln!(out)?;
            isolation.render_text(out)?;
        }
        Ok(())
    }
}
