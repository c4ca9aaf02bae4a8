// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Network isolation (app container) check.
//!
//! Runs the connect-failure diagnostic for a set of probe hosts,
//! enumerates the firewall app containers (plain and force-compute-
//! binaries), flags repeated container identities, resolves identities to
//! their registered display monikers through the registry wrapper, and
//! dumps the app-container config SID list.

use std::collections::HashSet;
use std::io::{self, Write};

use serde::Serialize;

use crate::registry::backend::Access;
use crate::registry::{RegError, Registry};
use crate::report::{format_status, Probe};

/// Per-user mapping table from container identity to display moniker.
pub const MONIKER_MAPPINGS_KEY: &str =
    r"Software\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppContainer\Mappings";

/// Value under each mapping entry holding the moniker string.
pub const MONIKER_VALUE_NAME: &str = "Moniker";

/// Hosts probed when the CLI does not override them.
pub const DEFAULT_HOSTS: [&str; 3] = ["127.0.0.1", "::1", "localhost"];

/// NETISO_FLAG_FORCE_COMPUTE_BINARIES.
pub const FORCE_COMPUTE_BINARIES: u32 = 0x1;

#[derive(Debug, Serialize)]
pub struct NetworkIsolationReport {
    pub connect_diagnostics: Vec<ConnectDiagnostic>,
    /// Enumeration with flags 0.
    pub app_containers: Probe<AppContainerList>,
    /// Enumeration with NETISO_FLAG_FORCE_COMPUTE_BINARIES.
    pub app_containers_forced: Probe<AppContainerList>,
    pub config: Probe<Vec<Probe<ConfigEntry>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectDiagnostic {
    pub host: String,
    pub outcome: Probe<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppContainerList {
    pub entries: Vec<Probe<AppContainerEntry>>,
    /// Number of distinct container identities seen.
    pub distinct: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppContainerEntry {
    pub sid: String,
    pub name: String,
    pub display_name: String,
    pub moniker: Option<String>,
    /// True when an earlier entry carried the same identity bytes.
    pub duplicate: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub sid: String,
    pub attributes: u32,
}

/// Label for a raw NETISO_ERROR_TYPE value.
pub fn netiso_error_label(raw: i32) -> &'static str {
    match raw {
        0 => "none",
        1 => "private",
        2 => "internet_client",
        3 => "internet_client_server",
        _ => "???",
    }
}

/// Single membership-set pass over raw identity bytes. An entry is a
/// duplicate when an earlier entry compared equal under (length,
/// byte-equality); no canonicalization is applied. Returns the per-entry
/// duplicate flags and the distinct-identity count.
pub fn mark_duplicates(sids: &[Vec<u8>]) -> (Vec<bool>, usize) {
    let mut seen: HashSet<&[u8]> = HashSet::with_capacity(sids.len());
    let flags = sids.iter().map(|sid| !seen.insert(sid.as_slice())).collect();
    (flags, seen.len())
}

/// Look up the display moniker registered for `sid`. Absence of the
/// mappings key, the entry, or the value is not an error.
pub fn resolve_moniker(registry: &Registry, sid: &str) -> Result<Option<String>, RegError> {
    let mappings = registry
        .current_user()
        .open_if_exists(MONIKER_MAPPINGS_KEY, Access::Query)?;
    let entry = mappings.open_if_exists(sid, Access::Query)?;
    entry.string_value_opt(MONIKER_VALUE_NAME)
}

impl NetworkIsolationReport {
    pub fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "== network isolation ==")?;
        for diag in &self.connect_diagnostics {
            match &diag.outcome {
                Probe::Ok { value } => writeln!(
                    out,
                    "NetworkIsolationDiagnoseConnectFailureAndGetInfo: '{}': {value}",
                    diag.host
                )?,
                Probe::Failed { detail } => writeln!(
                    out,
                    "NetworkIsolationDiagnoseConnectFailureAndGetInfo: '{}': failed: {detail}",
                    diag.host
                )?,
            }
        }
        render_container_list(out, 0, &self.app_containers)?;
        render_container_list(out, FORCE_COMPUTE_BINARIES, &self.app_containers_forced)?;
        match &self.config {
            Probe::Ok { value } => {
                writeln!(out, "NetworkIsolationGetAppContainerConfig: {}:", value.len())?;
                for (n, entry) in value.iter().enumerate() {
                    match entry {
                        Probe::Ok { value } => writeln!(
                            out,
                            "  #{n}: {}: {}",
                            value.sid,
                            format_status(value.attributes)
                        )?,
                        Probe::Failed { detail } => writeln!(out, "  #{n}: failed: {detail}")?,
                    }
                }
            }
            Probe::Failed { detail } => {
                writeln!(out, "NetworkIsolationGetAppContainerConfig: failed: {detail}")?
            }
        }
        Ok(())
    }
}

fn render_container_list(
    out: &mut dyn Write,
    flags: u32,
    probe: &Probe<AppContainerList>,
) -> io::Result<()> {
    let header = format!("NetworkIsolationEnumAppContainers: {}", format_status(flags));
    let list = match probe {
        Probe::Ok { value } => value,
        Probe::Failed { detail } => return writeln!(out, "{header}: failed: {detail}"),
    };
    writeln!(out, "{header}: {}:", list.entries.len())?;
    for (n, entry) in list.entries.iter().enumerate() {
        match entry {
            Probe::Ok { value } => {
                write!(out, "  #{n}: {}: {}", value.sid, value.name)?;
                if !value.display_name.is_empty() {
                    write!(out, " ({})", value.display_name)?;
                }
                if let Some(moniker) = &value.moniker {
                    write!(out, " [moniker: {moniker}]")?;
                }
                if value.duplicate {
                    write!(out, " (duplicate)")?;
                }
                writeln!(out)?;
            }
            Probe::Failed { detail } => writeln!(out, "  #{n}: failed: {detail}")?,
        }
    }
    writeln!(out, "  distinct: {}", list.distinct)
}

#[cfg(windows)]
pub fn collect(registry: &Registry, hosts: &[String]) -> NetworkIsolationReport {
    NetworkIsolationReport {
        connect_diagnostics: hosts
            .iter()
            .map(|host| ConnectDiagnostic {
                host: host.clone(),
                outcome: diagnose_host(host),
            })
            .collect(),
        app_containers: enum_app_containers(registry, 0),
        app_containers_forced: enum_app_containers(registry, FORCE_COMPUTE_BINARIES),
        config: read_config(),
    }
}

#[cfg(windows)]
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(windows)]
fn diagnose_host(host: &str) -> Probe<String> {
    use windows::core::PCWSTR;
    use windows::Win32::Security::Isolation::{
        NetworkIsolationDiagnoseConnectFailureAndGetInfo, NETISO_ERROR_TYPE,
    };

    let wide = to_wide(host);
    let mut kind = NETISO_ERROR_TYPE::default();
    let status =
        unsafe { NetworkIsolationDiagnoseConnectFailureAndGetInfo(PCWSTR(wide.as_ptr()), &mut kind) };
    if status != 0 {
        return Probe::failed_status(status);
    }
    Probe::ok(netiso_error_label(kind.0).to_string())
}

#[cfg(windows)]
fn pwstr_lossy(s: windows::core::PWSTR) -> String {
    if s.is_null() {
        return String::new();
    }
    unsafe { s.to_string().unwrap_or_default() }
}

#[cfg(windows)]
unsafe fn sid_bytes(sid: windows::Win32::Security::PSID) -> Vec<u8> {
    use windows::Win32::Security::GetLengthSid;

    if sid.is_invalid() {
        return Vec::new();
    }
    let len = GetLengthSid(sid) as usize;
    std::slice::from_raw_parts(sid.0 as *const u8, len).to_vec()
}

#[cfg(windows)]
fn sid_to_string(sid: windows::Win32::Security::PSID) -> windows::core::Result<String> {
    use crate::utils::defer;
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{LocalFree, HLOCAL};
    use windows::Win32::Security::Authorization::ConvertSidToStringSidW;

    unsafe {
        let mut text = PWSTR::null();
        ConvertSidToStringSidW(sid, &mut text)?;
        let _free = defer(move || {
            let _ = LocalFree(Some(HLOCAL(text.0 as *mut core::ffi::c_void)));
        });
        Ok(text.to_string().unwrap_or_default())
    }
}

#[cfg(windows)]
fn enum_app_containers(registry: &Registry, flags: u32) -> Probe<AppContainerList> {
    use crate::utils::defer;
    use windows::Win32::Security::Isolation::{
        NetworkIsolationEnumAppContainers, NetworkIsolationFreeAppContainers,
        INET_FIREWALL_APP_CONTAINER,
    };

    let mut count: u32 = 0;
    let mut array: *mut INET_FIREWALL_APP_CONTAINER = std::ptr::null_mut();
    let status = unsafe { NetworkIsolationEnumAppContainers(flags, &mut count, &mut array) };
    if status != 0 {
        return Probe::failed_status(status);
    }
    let _free = defer(move || {
        let _ = unsafe { NetworkIsolationFreeAppContainers(array) };
    });

    let containers: &[INET_FIREWALL_APP_CONTAINER] = if array.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(array, count as usize) }
    };

    let raw_sids: Vec<Vec<u8>> = containers
        .iter()
        .map(|c| unsafe { sid_bytes(c.appContainerSid) })
        .collect();
    let (duplicate_flags, distinct) = mark_duplicates(&raw_sids);

    let entries = containers
        .iter()
        .zip(duplicate_flags)
        .map(|(container, duplicate)| describe_container(registry, container, duplicate))
        .collect();
    Probe::ok(AppContainerList { entries, distinct })
}

#[cfg(windows)]
fn describe_container(
    registry: &Registry,
    container: &windows::Win32::Security::Isolation::INET_FIREWALL_APP_CONTAINER,
    duplicate: bool,
) -> Probe<AppContainerEntry> {
    let sid = match sid_to_string(container.appContainerSid) {
        Ok(sid) => sid,
        Err(e) => return Probe::failed_status(e.code().0 as u32),
    };
    let name = pwstr_lossy(container.appContainerName);
    let display_name = pwstr_lossy(container.displayName);
    match resolve_moniker(registry, &sid) {
        Ok(moniker) => Probe::ok(AppContainerEntry {
            sid,
            name,
            display_name,
            moniker,
            duplicate,
        }),
        Err(e) => Probe::failed(e.to_string()),
    }
}

#[cfg(windows)]
fn read_config() -> Probe<Vec<Probe<ConfigEntry>>> {
    use crate::utils::defer;
    use windows::Win32::Security::Isolation::NetworkIsolationGetAppContainerConfig;
    use windows::Win32::Security::SID_AND_ATTRIBUTES;
    use windows::Win32::System::Memory::{GetProcessHeap, HeapFree, HEAP_FLAGS};

    let mut count: u32 = 0;
    let mut array: *mut SID_AND_ATTRIBUTES = std::ptr::null_mut();
    let status = unsafe { NetworkIsolationGetAppContainerConfig(&mut count, &mut array) };
    if status != 0 {
        return Probe::failed_status(status);
    }
    // The SIDs and the array itself come from the process heap; release the
    // SIDs first, then the array.
    let _free = defer(move || unsafe {
        if array.is_null() {
            return;
        }
        if let Ok(heap) = GetProcessHeap() {
            let entries = std::slice::from_raw_parts(array, count as usize);
            for entry in entries.iter().rev() {
                let _ = HeapFree(heap, HEAP_FLAGS(0), Some(entry.Sid.0 as *const core::ffi::c_void));
            }
            let _ = HeapFree(heap, HEAP_FLAGS(0), Some(array as *const core::ffi::c_void));
        }
    });

    let entries: &[SID_AND_ATTRIBUTES] = if array.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(array, count as usize) }
    };
    Probe::ok(
        entries
            .iter()
            .map(|entry| match sid_to_string(entry.Sid) {
                Ok(sid) => Probe::ok(ConfigEntry {
                    sid,
                    attributes: entry.Attributes,
                }),
                Err(e) => Probe::failed_status(e.code().0 as u32),
            })
            .collect(),
    )
}
