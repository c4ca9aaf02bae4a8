// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Token elevation check.
//!
//! Reads the machine-wide UAC policy flags through the registry wrapper
//! and queries the process token for its elevation type and elevated bit.

use std::io::{self, Write};

use serde::Serialize;

use crate::report::Probe;

/// Machine policy key holding the UAC flags.
pub const UAC_POLICY_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Policies\System";

#[derive(Debug, Serialize)]
pub struct ElevationReport {
    pub uac_policy: Probe<UacPolicy>,
    pub token: Probe<TokenState>,
}

/// UAC policy flags; `None` when the value is not set (machine default).
#[derive(Debug, Clone, Serialize)]
pub struct UacPolicy {
    pub enable_lua: Option<bool>,
    pub enable_virtualization: Option<bool>,
    pub enable_installer_detection: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenState {
    pub elevation_type: String,
    pub elevated: bool,
}

/// Label for a raw TOKEN_ELEVATION_TYPE value.
pub fn elevation_type_label(raw: i32) -> &'static str {
    match raw {
        1 => "default",
        2 => "full",
        3 => "limited",
        _ => "???",
    }
}

fn flag_label(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "enabled",
        Some(false) => "disabled",
        None => "not set",
    }
}

impl ElevationReport {
    pub fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "== elevation ==")?;
        match &self.uac_policy {
            Probe::Ok { value } => {
                writeln!(out, "UacPolicy: HKEY_LOCAL_MACHINE\\{UAC_POLICY_KEY}:")?;
                writeln!(out, "  EnableLUA: {}", flag_label(value.enable_lua))?;
                writeln!(
                    out,
                    "  EnableVirtualization: {}",
                    flag_label(value.enable_virtualization)
                )?;
                writeln!(
                    out,
                    "  EnableInstallerDetection: {}",
                    flag_label(value.enable_installer_detection)
                )?;
            }
            Probe::Failed { detail } => writeln!(out, "UacPolicy: failed: {detail}")?,
        }
        match &self.token {
            Probe::Ok { value } => {
                writeln!(out, "TokenElevationType: {}", value.elevation_type)?;
                writeln!(
                    out,
                    "TokenIsElevated: {}",
                    if value.elevated { "yes" } else { "no" }
                )?;
            }
            Probe::Failed { detail } => writeln!(out, "TokenElevation: failed: {detail}")?,
        }
        Ok(())
    }
}

#[cfg(windows)]
pub fn collect(registry: &crate::registry::Registry) -> ElevationReport {
    ElevationReport {
        uac_policy: match read_uac_policy(registry) {
            Ok(policy) => Probe::ok(policy),
            Err(e) => Probe::failed(e.to_string()),
        },
        token: read_token_state(),
    }
}

#[cfg(windows)]
fn read_uac_policy(
    registry: &crate::registry::Registry,
) -> Result<UacPolicy, crate::registry::RegError> {
    use crate::registry::backend::Access;

    let key = registry
        .local_machine()
        .open_if_exists(UAC_POLICY_KEY, Access::Query)?;
    let flag = |name: &str| -> Result<Option<bool>, crate::registry::RegError> {
        Ok(key.u32_value_opt(name)?.map(|v| v != 0))
    };
    Ok(UacPolicy {
        enable_lua: flag("EnableLUA")?,
        enable_virtualization: flag("EnableVirtualization")?,
        enable_installer_detection: flag("EnableInstallerDetection")?,
    })
}

#[cfg(windows)]
fn read_token_state() -> Probe<TokenState> {
    use crate::utils::defer;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{
        GetTokenInformation, TokenElevation, TokenElevationType, TOKEN_ELEVATION,
        TOKEN_ELEVATION_TYPE, TOKEN_QUERY,
    };
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        if let Err(e) = OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) {
            return Probe::failed_status(e.code().0 as u32);
        }
        let _close_token = defer(move || {
            let _ = CloseHandle(token);
        });

        let mut kind = TOKEN_ELEVATION_TYPE::default();
        let mut len = 0u32;
        if let Err(e) = GetTokenInformation(
            token,
            TokenElevationType,
            Some(&mut kind as *mut _ as *mut core::ffi::c_void),
            std::mem::size_of::<TOKEN_ELEVATION_TYPE>() as u32,
            &mut len,
        ) {
            return Probe::failed_status(e.code().0 as u32);
        }

        let mut elevation = TOKEN_ELEVATION::default();
        if let Err(e) = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut core::ffi::c_void),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut len,
        ) {
            return Probe::failed_status(e.code().0 as u32);
        }

        Probe::ok(TokenState {
            elevation_type: elevation_type_label(kind.0).to_string(),
            elevated: elevation.TokenIsElevated != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_type_labels() {
        assert_eq!(elevation_type_label(1), "default");
        assert_eq!(elevation_type_label(2), "full");
        assert_eq!(elevation_type_label(3), "limited");
        assert_eq!(elevation_type_label(0), "???");
        assert_eq!(elevation_type_label(9), "???");
    }

    #[test]
    fn render_failed_uac_probe_keeps_token_section() {
        let report = ElevationReport {
            uac_policy: Probe::failed_status(5),
            token: Probe::ok(TokenState {
                elevation_type: "full".to_string(),
                elevated: true,
            }),
        };
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("UacPolicy: failed: 0x00000005"));
        assert!(text.contains("TokenElevationType: full"));
        assert!(text.contains("TokenIsElevated: yes"));
    }
}
