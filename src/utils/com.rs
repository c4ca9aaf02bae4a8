// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Scoped COM apartment initialization.
//!
//! COM is only needed by the firewall check, so the apartment is acquired
//! at the start of that one routine and released at its end instead of
//! being initialized process-wide.

use tracing::debug;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

/// An initialized single-threaded COM apartment for the current thread.
/// `CoUninitialize` runs on drop. Not constructed when initialization
/// fails (e.g. RPC_E_CHANGED_MODE), so an unbalanced uninit cannot occur.
pub struct ComApartment(());

impl ComApartment {
    pub fn init_apartment() -> windows::core::Result<Self> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        hr.ok()?;
        Ok(Self(()))
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
        debug!("COM apartment released");
    }
}
