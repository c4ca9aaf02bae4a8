// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Raw backend seam for the registry wrapper.
//!
//! The wrapper in [`crate::registry`] owns the retry and ownership logic;
//! a backend only translates single calls into Win32-shaped outcomes.
//! The real backend lives in [`crate::registry::win32`] and is compiled on
//! Windows only; tests drive the wrapper through an in-memory backend.

/// Opaque platform key handle, as wide as `HKEY`.
pub type RawKey = isize;

/// Status words the wrapper branches on (Win32 error codes).
pub const STATUS_NOT_FOUND: u32 = 2; // ERROR_FILE_NOT_FOUND
pub const STATUS_ACCESS_DENIED: u32 = 5; // ERROR_ACCESS_DENIED
pub const STATUS_MORE_DATA: u32 = 234; // ERROR_MORE_DATA
pub const STATUS_NO_MORE_ITEMS: u32 = 259; // ERROR_NO_MORE_ITEMS

/// Requested access on open/create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Query values and enumerate subkeys.
    Query,
    /// Full read/write access.
    Full,
}

/// The well-known top-level locations of the store. A data-driven table of
/// roots consulted by one generic accessor, instead of one hand-rolled
/// lazily-initialized accessor per hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
    ClassesRoot,
    Users,
}

impl Hive {
    pub const ALL: [Hive; 4] = [
        Hive::CurrentUser,
        Hive::LocalMachine,
        Hive::ClassesRoot,
        Hive::Users,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::Users => "HKEY_USERS",
        }
    }
}

/// One step of a name enumeration, shaped like `RegEnumKeyExW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStep {
    /// `buf[..len]` holds the entry name (UTF-16 code units, no NUL).
    Entry { len: usize },
    /// Buffer too small; retry the same index with at least `needed` units.
    MoreData { needed: usize },
    /// No more items.
    Done,
    Failed(u32),
}

/// Outcome of a single value query, shaped like `RegQueryValueExW`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStep {
    /// `buf[..len]` holds the payload; `kind` is the raw REG_* type tag.
    Value { kind: u32, len: usize },
    /// Buffer too small; retry with at least `needed` bytes.
    MoreData { needed: usize },
    NotFound,
    Failed(u32),
}

/// Raw registry operations. Every method is a single platform call; status
/// classification and retries happen in the wrapper.
pub trait RegBackend: Send + Sync {
    /// Predefined handle for a well-known root. Never fails and is never
    /// closed by the wrapper.
    fn root(&self, hive: Hive) -> RawKey;

    fn open(&self, parent: RawKey, subkey: &str, access: Access) -> Result<RawKey, u32>;

    /// Open-or-create, creating intermediate keys as needed.
    fn create(&self, parent: RawKey, subkey: &str, access: Access) -> Result<RawKey, u32>;

    /// Recursive delete of `subkey` and everything under it.
    fn delete_tree(&self, parent: RawKey, subkey: &str) -> u32;

    fn delete_value(&self, key: RawKey, name: &str) -> u32;

    fn enum_key(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep;

    fn enum_value(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep;

    fn query_value(&self, key: RawKey, name: &str, buf: &mut [u8]) -> QueryStep;

    fn set_value(&self, key: RawKey, name: &str, kind: u32, data: &[u8]) -> u32;

    fn close(&self, key: RawKey);
}
