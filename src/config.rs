// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

use std::env;

/// Environment variable holding the tracing filter (e.g. `isoscope=debug`).
pub const ENV_LOG_LEVEL: &str = "ISOSCOPE_LOG";
/// Environment variable selecting the log format: "text" or "json".
pub const ENV_LOG_FORMAT: &str = "ISOSCOPE_LOG_FORMAT";

/// Runtime configuration. Everything check-related comes from CLI flags;
/// only observability knobs live in the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string()),
            log_format: env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
