// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Firewall profile check.
//!
//! Creates the firewall policy COM object inside a scoped apartment and
//! reads the per-profile switches and default actions for the private,
//! domain, and public profiles.

use std::io::{self, Write};

use serde::Serialize;

use crate::report::Probe;

#[derive(Debug, Serialize)]
pub struct FirewallReport {
    /// Fails as a whole when apartment init or object creation fails;
    /// individual profile getters fail per-field.
    pub policy: Probe<Vec<ProfileConfig>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileConfig {
    pub profile: &'static str,
    pub firewall_enabled: Probe<bool>,
    pub block_all_inbound_traffic: Probe<bool>,
    pub notifications_disabled: Probe<bool>,
    pub unicast_responses_to_multicast_broadcast_disabled: Probe<bool>,
    pub default_inbound_action: Probe<String>,
    pub default_outbound_action: Probe<String>,
}

/// Label for a raw NET_FW_ACTION value.
pub fn action_label(raw: i32) -> &'static str {
    match raw {
        0 => "block",
        1 => "allow",
        _ => "???",
    }
}

fn write_bool(out: &mut dyn Write, label: &str, probe: &Probe<bool>) -> io::Result<()> {
    match probe {
        Probe::Ok { value } => writeln!(
            out,
            "  {label}: {}",
            if *value { "enabled" } else { "disabled" }
        ),
        Probe::Failed { detail } => writeln!(out, "  {label}: failed: {detail}"),
    }
}

fn write_action(out: &mut dyn Write, label: &str, probe: &Probe<String>) -> io::Result<()> {
    match probe {
        Probe::Ok { value } => writeln!(out, "  {label}: {value}"),
        Probe::Failed { detail } => writeln!(out, "  {label}: failed: {detail}"),
    }
}

impl FirewallReport {
    pub fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "== firewall ==")?;
        let profiles = match &self.policy {
            Probe::Ok { value } => value,
            Probe::Failed { detail } => {
                return writeln!(out, "INetFwPolicy2: failed: {detail}");
            }
        };
        for profile in profiles {
            writeln!(out, "FirewallProfileType: {}", profile.profile)?;
            write_bool(out, "FirewallEnabled", &profile.firewall_enabled)?;
            write_bool(
                out,
                "BlockAllInboundTraffic",
                &profile.block_all_inbound_traffic,
            )?;
            write_bool(out, "NotificationsDisabled", &profile.notifications_disabled)?;
            write_bool(
                out,
                "UnicastResponsesToMulticastBroadcastDisabled",
                &profile.unicast_responses_to_multicast_broadcast_disabled,
            )?;
            write_action(out, "DefaultInboundAction", &profile.default_inbound_action)?;
            write_action(
                out,
                "DefaultOutboundAction",
                &profile.default_outbound_action,
            )?;
        }
        Ok(())
    }
}

#[cfg(windows)]
pub fn collect() -> FirewallReport {
    FirewallReport {
        policy: probe_policy(),
    }
}

#[cfg(windows)]
fn probe_policy() -> Probe<Vec<ProfileConfig>> {
    use crate::utils::com::ComApartment;
    use windows::Win32::NetworkManagement::WindowsFirewall::{
        INetFwPolicy2, NetFwPolicy2, NET_FW_PROFILE2_DOMAIN, NET_FW_PROFILE2_PRIVATE,
        NET_FW_PROFILE2_PUBLIC,
    };
    use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};

    let _apartment = match ComApartment::init_apartment() {
        Ok(apartment) => apartment,
        Err(e) => return Probe::failed_status(e.code().0 as u32),
    };

    let policy: INetFwPolicy2 =
        match unsafe { CoCreateInstance(&NetFwPolicy2, None, CLSCTX_INPROC_SERVER) } {
            Ok(policy) => policy,
            Err(e) => return Probe::failed_status(e.code().0 as u32),
        };

    let profiles = [
        ("private", NET_FW_PROFILE2_PRIVATE),
        ("domain", NET_FW_PROFILE2_DOMAIN),
        ("public", NET_FW_PROFILE2_PUBLIC),
    ];
    Probe::ok(
        profiles
            .into_iter()
            .map(|(name, ty)| read_profile(&policy, name, ty))
            .collect(),
    )
}

#[cfg(windows)]
fn read_profile(
    policy: &windows::Win32::NetworkManagement::WindowsFirewall::INetFwPolicy2,
    name: &'static str,
    ty: windows::Win32::NetworkManagement::WindowsFirewall::NET_FW_PROFILE_TYPE2,
) -> ProfileConfig {
    use windows::Win32::Foundation::VARIANT_BOOL;
    use windows::Win32::NetworkManagement::WindowsFirewall::NET_FW_ACTION;

    fn probe_bool(result: windows::core::Result<VARIANT_BOOL>) -> Probe<bool> {
        match result {
            Ok(v) => Probe::ok(v.as_bool()),
            Err(e) => Probe::failed_status(e.code().0 as u32),
        }
    }

    fn probe_action(result: windows::core::Result<NET_FW_ACTION>) -> Probe<String> {
        match result {
            Ok(action) => Probe::ok(action_label(action.0).to_string()),
            Err(e) => Probe::failed_status(e.code().0 as u32),
        }
    }

    unsafe {
        ProfileConfig {
            profile: name,
            firewall_enabled: probe_bool(policy.FirewallEnabled(ty)),
            block_all_inbound_traffic: probe_bool(policy.BlockAllInboundTraffic(ty)),
            notifications_disabled: probe_bool(policy.NotificationsDisabled(ty)),
            unicast_responses_to_multicast_broadcast_disabled: probe_bool(
                policy.UnicastResponsesToMulticastBroadcastDisabled(ty),
            ),
            default_inbound_action: probe_action(policy.DefaultInboundAction(ty)),
            default_outbound_action: probe_action(policy.DefaultOutboundAction(ty)),
        }
    }
}
