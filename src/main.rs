// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! isoscope binary: dump the current process's security/isolation posture.

use std::io::Write;

use clap::{Parser, ValueEnum};
use tracing::info;

use isoscope::checks::{self, Selection};
use isoscope::config::Config;

#[derive(Parser, Debug)]
#[command(version, about = "Read-only Windows security/isolation posture inspector", long_about = None)]
struct Cli {
    /// Emit the posture report as pretty JSON instead of the text transcript
    #[arg(long)]
    json: bool,

    /// Run only the named checks (repeatable); default is all of them
    #[arg(long, value_enum)]
    only: Vec<CheckKind>,

    /// Hosts probed by the network-isolation connect diagnostic (repeatable)
    #[arg(long)]
    host: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum CheckKind {
    Elevation,
    Firewall,
    NetworkIsolation,
}

fn main() {
    install_panic_hook();
    if let Err(e) = run() {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env();
    if let Err(e) = init_tracing(&config) {
        eprintln!("Warning: failed to init tracing: {e}");
    }

    let selection = if cli.only.is_empty() {
        Selection::default()
    } else {
        Selection {
            elevation: cli.only.contains(&CheckKind::Elevation),
            firewall: cli.only.contains(&CheckKind::Firewall),
            network_isolation: cli.only.contains(&CheckKind::NetworkIsolation),
        }
    };

    let hosts: Vec<String> = if cli.host.is_empty() {
        isoscope::checks::network_isolation::DEFAULT_HOSTS
            .iter()
            .map(|h| h.to_string())
            .collect()
    } else {
        cli.host
    };

    info!(json = cli.json, "collecting posture report");
    let report = checks::collect(&selection, &hosts);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        report.render_text(&mut out)?;
    }
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("isoscope=info"));

    // Logs go to stderr; stdout carries only the transcript.
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
