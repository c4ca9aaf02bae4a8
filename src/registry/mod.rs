// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Typed, reference-counted registry access.
//!
//! [`RegKey`] is a shared-ownership handle to a key: clones share the
//! platform resource, which is released exactly once when the last clone
//! drops. Root handles come from the [`Hive`] table and are never closed.
//! An *empty* key (default-constructed, or returned by a suppressing open
//! for a missing path) carries only its would-be path; reads on it fail
//! explicitly unless the caller used a suppressing accessor.
//!
//! Failures split into two tiers: "not found", suppressible only through
//! the `_if_exists`/`_opt` shapes, and hard failures (access denied,
//! undersized payloads, type mismatches), which always surface. The only
//! automatic retry anywhere is the buffer-growth loop on enumeration and
//! value reads.

pub mod backend;
pub mod value;

#[cfg(windows)]
pub mod win32;

use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use backend::{
    Access, EnumStep, Hive, QueryStep, RawKey, RegBackend, STATUS_ACCESS_DENIED, STATUS_NOT_FOUND,
};
use value::ValueKind;

/// Initial name buffer, in UTF-16 code units.
const INIT_NAME_LEN: usize = 32;
/// Initial value data buffer, in bytes (one GUID).
const INIT_DATA_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum RegError {
    #[error("registry key not found: {path}")]
    NotFound { path: String },

    #[error("registry access denied: {path}")]
    AccessDenied { path: String },

    #[error("operation on an empty registry handle: {path}")]
    Empty { path: String },

    #[error("value '{name}' under {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("value '{name}' under {path}: {reason}")]
    Decode {
        path: String,
        name: String,
        reason: &'static str,
    },

    #[error("registry error {status:#010X} at {path}")]
    Platform { status: u32, path: String },
}

impl RegError {
    fn from_status(status: u32, path: String) -> Self {
        match status {
            STATUS_NOT_FOUND => RegError::NotFound { path },
            STATUS_ACCESS_DENIED => RegError::AccessDenied { path },
            _ => RegError::Platform { status, path },
        }
    }
}

/// Entry point to a registry tree: holds the backend and hands out root
/// handles. Cloning is cheap and shares the backend.
#[derive(Clone)]
pub struct Registry {
    backend: Arc<dyn RegBackend>,
}

impl Registry {
    pub fn new(backend: Arc<dyn RegBackend>) -> Self {
        Self { backend }
    }

    /// The live Windows registry.
    #[cfg(windows)]
    pub fn live() -> Self {
        Self::new(Arc::new(win32::Win32Backend))
    }

    /// Root handle for `hive`. Idempotent; the underlying resource is
    /// process-lifetime and never closed.
    pub fn root(&self, hive: Hive) -> RegKey {
        let raw = self.backend.root(hive);
        RegKey {
            handle: Some(Arc::new(KeyHandle {
                backend: self.backend.clone(),
                raw,
                close_on_drop: false,
            })),
            path: hive.display_name().to_string(),
        }
    }

    pub fn current_user(&self) -> RegKey {
        self.root(Hive::CurrentUser)
    }

    pub fn local_machine(&self) -> RegKey {
        self.root(Hive::LocalMachine)
    }
}

/// The shared platform resource. Closed exactly once, when the last
/// `RegKey` clone drops — roots use the leave-open policy instead.
struct KeyHandle {
    backend: Arc<dyn RegBackend>,
    raw: RawKey,
    close_on_drop: bool,
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        if self.close_on_drop {
            self.backend.close(self.raw);
        }
    }
}

/// An open (or explicitly empty) handle to a location in the store.
#[derive(Clone)]
pub struct RegKey {
    handle: Option<Arc<KeyHandle>>,
    path: String,
}

impl std::fmt::Debug for RegKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegKey")
            .field("path", &self.path)
            .field("empty", &self.is_empty())
            .finish()
    }
}

fn join_path(parent: &str, subkey: &str) -> String {
    if parent.is_empty() {
        subkey.to_string()
    } else {
        format!("{parent}\\{subkey}")
    }
}

impl RegKey {
    /// An empty handle at `path`: no platform resource, reads fail.
    pub fn empty_at(path: impl Into<String>) -> Self {
        Self {
            handle: None,
            path: path.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_none()
    }

    /// Full hierarchical path, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn require_handle(&self) -> Result<&KeyHandle, RegError> {
        self.handle.as_deref().ok_or_else(|| RegError::Empty {
            path: self.path.clone(),
        })
    }

    /// True when two handles share the same underlying platform resource.
    pub fn shares_resource_with(&self, other: &RegKey) -> bool {
        match (&self.handle, &other.handle) {
            (Some(a), Some(b)) => a.raw == b.raw,
            _ => false,
        }
    }

    fn open_inner(
        &self,
        subkey: &str,
        access: Access,
        suppress_missing: bool,
    ) -> Result<RegKey, RegError> {
        let child_path = join_path(&self.path, subkey);
        let handle = match self.require_handle() {
            Ok(h) => h,
            // Navigating below an empty key under the suppressing contract
            // yields another empty key.
            Err(_) if suppress_missing => return Ok(RegKey::empty_at(child_path)),
            Err(e) => return Err(e),
        };
        match handle.backend.open(handle.raw, subkey, access) {
            Ok(raw) => {
                trace!(path = %child_path, "opened registry key");
                Ok(RegKey {
                    handle: Some(Arc::new(KeyHandle {
                        backend: handle.backend.clone(),
                        raw,
                        close_on_drop: true,
                    })),
                    path: child_path,
                })
            }
            Err(STATUS_NOT_FOUND) if suppress_missing => Ok(RegKey::empty_at(child_path)),
            Err(status) => Err(RegError::from_status(status, child_path)),
        }
    }

    /// Open a child key. Missing key or insufficient permissions is a hard
    /// failure.
    pub fn open(&self, subkey: &str, access: Access) -> Result<RegKey, RegError> {
        self.open_inner(subkey, access, false)
    }

    /// Open a child key, returning an explicit empty handle when the key
    /// does not exist.
    pub fn open_if_exists(&self, subkey: &str, access: Access) -> Result<RegKey, RegError> {
        self.open_inner(subkey, access, true)
    }

    /// Open-or-create a child key, creating intermediate keys as needed.
    pub fn create(&self, subkey: &str, access: Access) -> Result<RegKey, RegError> {
        let child_path = join_path(&self.path, subkey);
        let handle = self.require_handle()?;
        match handle.backend.create(handle.raw, subkey, access) {
            Ok(raw) => Ok(RegKey {
                handle: Some(Arc::new(KeyHandle {
                    backend: handle.backend.clone(),
                    raw,
                    close_on_drop: true,
                })),
                path: child_path,
            }),
            Err(status) => Err(RegError::from_status(status, child_path)),
        }
    }

    /// Recursively delete `subkey`. Missing subtree is a hard failure.
    pub fn delete_tree(&self, subkey: &str) -> Result<(), RegError> {
        let child_path = join_path(&self.path, subkey);
        let handle = self.require_handle()?;
        match handle.backend.delete_tree(handle.raw, subkey) {
            0 => Ok(()),
            status => Err(RegError::from_status(status, child_path)),
        }
    }

    /// Recursively delete `subkey`; `Ok(false)` when it did not exist.
    pub fn delete_tree_if_exists(&self, subkey: &str) -> Result<bool, RegError> {
        match self.delete_tree(subkey) {
            Ok(()) => Ok(true),
            Err(RegError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a named value. Fails if absent or access is denied.
    pub fn delete_value(&self, name: &str) -> Result<(), RegError> {
        let handle = self.require_handle()?;
        match handle.backend.delete_value(handle.raw, name) {
            0 => Ok(()),
            status => Err(RegError::from_status(status, self.path.clone())),
        }
    }

    /// Child key names, in platform enumeration order.
    pub fn key_names(&self) -> Result<Vec<String>, RegError> {
        // Key-name regrowth doubles the reported requirement, matching the
        // platform's habit of reporting sizes without the terminator.
        self.enum_names(
            |backend, raw, index, buf| backend.enum_key(raw, index, buf),
            true,
        )
    }

    /// Value names, in platform enumeration order.
    pub fn value_names(&self) -> Result<Vec<String>, RegError> {
        self.enum_names(
            |backend, raw, index, buf| backend.enum_value(raw, index, buf),
            false,
        )
    }

    fn enum_names<F>(&self, step: F, double_on_grow: bool) -> Result<Vec<String>, RegError>
    where
        F: Fn(&dyn RegBackend, RawKey, u32, &mut [u16]) -> EnumStep,
    {
        let handle = self.require_handle()?;
        let mut names = Vec::new();
        let mut buf = vec![0u16; INIT_NAME_LEN];
        let mut index: u32 = 0;
        loop {
            match step(handle.backend.as_ref(), handle.raw, index, &mut buf) {
                EnumStep::Entry { len } => {
                    names.push(String::from_utf16_lossy(&buf[..len]));
                    index += 1;
                }
                EnumStep::MoreData { needed } => {
                    // Resource-sizing retry of the same index; guaranteed to
                    // make progress even if the backend under-reports.
                    let target = if double_on_grow {
                        needed.max(buf.len()).saturating_mul(2)
                    } else {
                        needed.max(buf.len() + 1)
                    };
                    buf.resize(target, 0);
                }
                EnumStep::Done => return Ok(names),
                EnumStep::Failed(status) => {
                    return Err(RegError::from_status(status, self.path.clone()))
                }
            }
        }
    }

    fn raw_value_inner(
        &self,
        name: &str,
        suppress_missing: bool,
    ) -> Result<(ValueKind, Vec<u8>), RegError> {
        let handle = match (&self.handle, suppress_missing) {
            (Some(h), _) => h,
            (None, true) => return Ok((ValueKind::None, Vec::new())),
            (None, false) => {
                return Err(RegError::Empty {
                    path: self.path.clone(),
                })
            }
        };
        let mut data = vec![0u8; INIT_DATA_LEN];
        loop {
            match handle.backend.query_value(handle.raw, name, &mut data) {
                QueryStep::Value { kind, len } => {
                    data.truncate(len);
                    return Ok((ValueKind::from_raw(kind), data));
                }
                QueryStep::MoreData { needed } => {
                    let target = needed.max(data.len() + 1);
                    data.resize(target, 0);
                }
                QueryStep::NotFound if suppress_missing => {
                    return Ok((ValueKind::None, Vec::new()))
                }
                QueryStep::NotFound => {
                    return Err(RegError::NotFound {
                        path: format!("{}\\{name}", self.path),
                    })
                }
                QueryStep::Failed(status) => {
                    return Err(RegError::from_status(status, self.path.clone()))
                }
            }
        }
    }

    /// Raw payload plus type tag. Missing value is a hard failure.
    pub fn raw_value(&self, name: &str) -> Result<(ValueKind, Vec<u8>), RegError> {
        self.raw_value_inner(name, false)
    }

    /// Raw payload plus type tag; a missing value yields
    /// `(ValueKind::None, empty)` instead of failing.
    pub fn raw_value_if_exists(&self, name: &str) -> Result<(ValueKind, Vec<u8>), RegError> {
        self.raw_value_inner(name, true)
    }

    fn typed_value<T>(
        &self,
        name: &str,
        suppress_missing: bool,
        expected: &'static str,
        accepts: fn(ValueKind) -> bool,
        decode: fn(&[u8]) -> Result<T, &'static str>,
    ) -> Result<Option<T>, RegError> {
        let (kind, data) = self.raw_value_inner(name, suppress_missing)?;
        match kind {
            // Only reachable on the suppressing shapes.
            ValueKind::None => Ok(None),
            k if accepts(k) => decode(&data).map(Some).map_err(|reason| RegError::Decode {
                path: self.path.clone(),
                name: name.to_string(),
                reason,
            }),
            // A wrong type is a corruption signal, not an absence signal:
            // always hard, even on the suppressing shapes.
            other => Err(RegError::TypeMismatch {
                path: self.path.clone(),
                name: name.to_string(),
                expected,
                found: other.label(),
            }),
        }
    }

    pub fn string_value(&self, name: &str) -> Result<String, RegError> {
        self.typed_value(name, false, "REG_SZ or REG_EXPAND_SZ", accepts_string, value::decode_string)
            .map(|v| v.unwrap_or_default())
    }

    pub fn string_value_opt(&self, name: &str) -> Result<Option<String>, RegError> {
        self.typed_value(name, true, "REG_SZ or REG_EXPAND_SZ", accepts_string, value::decode_string)
    }

    pub fn u32_value(&self, name: &str) -> Result<u32, RegError> {
        self.typed_value(name, false, "REG_DWORD", accepts_u32, value::decode_u32)
            .map(|v| v.unwrap_or_default())
    }

    pub fn u32_value_opt(&self, name: &str) -> Result<Option<u32>, RegError> {
        self.typed_value(name, true, "REG_DWORD", accepts_u32, value::decode_u32)
    }

    pub fn u64_value(&self, name: &str) -> Result<u64, RegError> {
        self.typed_value(name, false, "REG_QWORD", accepts_u64, value::decode_u64)
            .map(|v| v.unwrap_or_default())
    }

    pub fn u64_value_opt(&self, name: &str) -> Result<Option<u64>, RegError> {
        self.typed_value(name, true, "REG_QWORD", accepts_u64, value::decode_u64)
    }

    pub fn guid_value(&self, name: &str) -> Result<uuid::Uuid, RegError> {
        self.typed_value(name, false, "REG_BINARY", accepts_binary, value::decode_guid)
            .map(|v| v.unwrap_or_default())
    }

    pub fn guid_value_opt(&self, name: &str) -> Result<Option<uuid::Uuid>, RegError> {
        self.typed_value(name, true, "REG_BINARY", accepts_binary, value::decode_guid)
    }

    fn set_raw(&self, name: &str, kind: ValueKind, data: &[u8]) -> Result<(), RegError> {
        let handle = self.require_handle()?;
        match handle.backend.set_value(handle.raw, name, kind.raw(), data) {
            0 => Ok(()),
            status => Err(RegError::from_status(
                status,
                format!("{}\\{name}", self.path),
            )),
        }
    }

    pub fn set_string(&self, name: &str, val: &str) -> Result<(), RegError> {
        self.set_raw(name, ValueKind::Str, &value::encode_string(val))
    }

    pub fn set_u32(&self, name: &str, val: u32) -> Result<(), RegError> {
        self.set_raw(name, ValueKind::U32, &value::encode_u32(val))
    }

    pub fn set_u64(&self, name: &str, val: u64) -> Result<(), RegError> {
        self.set_raw(name, ValueKind::U64, &value::encode_u64(val))
    }
}

fn accepts_string(kind: ValueKind) -> bool {
    matches!(kind, ValueKind::Str | ValueKind::ExpandStr)
}

fn accepts_u32(kind: ValueKind) -> bool {
    kind == ValueKind::U32
}

fn accepts_u64(kind: ValueKind) -> bool {
    kind == ValueKind::U64
}

fn accepts_binary(kind: ValueKind) -> bool {
    kind == ValueKind::Binary
}
