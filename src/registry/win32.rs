// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Live Windows registry backend.

use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteTreeW, RegDeleteValueW, RegEnumKeyExW, RegEnumValueW,
    RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_USER,
    HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_ALL_ACCESS, KEY_ENUMERATE_SUB_KEYS, KEY_QUERY_VALUE,
    REG_OPTION_NON_VOLATILE, REG_SAM_FLAGS, REG_VALUE_TYPE,
};

use super::backend::{Access, EnumStep, Hive, QueryStep, RawKey, RegBackend};

pub struct Win32Backend;

fn hkey(raw: RawKey) -> HKEY {
    HKEY(raw as *mut core::ffi::c_void)
}

fn sam(access: Access) -> REG_SAM_FLAGS {
    match access {
        Access::Query => KEY_QUERY_VALUE | KEY_ENUMERATE_SUB_KEYS,
        Access::Full => KEY_ALL_ACCESS,
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl RegBackend for Win32Backend {
    fn root(&self, hive: Hive) -> RawKey {
        let key = match hive {
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::Users => HKEY_USERS,
        };
        key.0 as RawKey
    }

    fn open(&self, parent: RawKey, subkey: &str, access: Access) -> Result<RawKey, u32> {
        let wide = to_wide(subkey);
        let mut out = HKEY::default();
        let status = unsafe {
            RegOpenKeyExW(
                hkey(parent),
                PCWSTR(wide.as_ptr()),
                None,
                sam(access),
                &mut out,
            )
        };
        if status == ERROR_SUCCESS {
            Ok(out.0 as RawKey)
        } else {
            Err(status.0)
        }
    }

    fn create(&self, parent: RawKey, subkey: &str, access: Access) -> Result<RawKey, u32> {
        let wide = to_wide(subkey);
        let mut out = HKEY::default();
        let status = unsafe {
            RegCreateKeyExW(
                hkey(parent),
                PCWSTR(wide.as_ptr()),
                None,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                sam(access),
                None,
                &mut out,
                None,
            )
        };
        if status == ERROR_SUCCESS {
            Ok(out.0 as RawKey)
        } else {
            Err(status.0)
        }
    }

    fn delete_tree(&self, parent: RawKey, subkey: &str) -> u32 {
        let wide = to_wide(subkey);
        unsafe { RegDeleteTreeW(hkey(parent), PCWSTR(wide.as_ptr())) }.0
    }

    fn delete_value(&self, key: RawKey, name: &str) -> u32 {
        let wide = to_wide(name);
        unsafe { RegDeleteValueW(hkey(key), PCWSTR(wide.as_ptr())) }.0
    }

    fn enum_key(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep {
        let mut len = buf.len() as u32;
        let status = unsafe {
            RegEnumKeyExW(
                hkey(key),
                index,
                Some(PWSTR(buf.as_mut_ptr())),
                &mut len,
                None,
                None,
                None,
                None,
            )
        };
        match status {
            ERROR_SUCCESS => EnumStep::Entry { len: len as usize },
            ERROR_MORE_DATA => EnumStep::MoreData {
                needed: len as usize + 1,
            },
            ERROR_NO_MORE_ITEMS => EnumStep::Done,
            other => EnumStep::Failed(other.0),
        }
    }

    fn enum_value(&self, key: RawKey, index: u32, buf: &mut [u16]) -> EnumStep {
        let mut len = buf.len() as u32;
        let status = unsafe {
            RegEnumValueW(
                hkey(key),
                index,
                Some(PWSTR(buf.as_mut_ptr())),
                &mut len,
                None,
                None,
                None,
                None,
            )
        };
        match status {
            ERROR_SUCCESS => EnumStep::Entry { len: len as usize },
            ERROR_MORE_DATA => EnumStep::MoreData {
                needed: len as usize + 1,
            },
            ERROR_NO_MORE_ITEMS => EnumStep::Done,
            other => EnumStep::Failed(other.0),
        }
    }

    fn query_value(&self, key: RawKey, name: &str, buf: &mut [u8]) -> QueryStep {
        let wide = to_wide(name);
        let mut kind = REG_VALUE_TYPE::default();
        let mut len = buf.len() as u32;
        let status = unsafe {
            RegQueryValueExW(
                hkey(key),
                PCWSTR(wide.as_ptr()),
                None,
                Some(&mut kind),
                Some(buf.as_mut_ptr()),
                Some(&mut len),
            )
        };
        match status {
            ERROR_SUCCESS => QueryStep::Value {
                kind: kind.0,
                len: len as usize,
            },
            ERROR_MORE_DATA => QueryStep::MoreData {
                needed: len as usize,
            },
            ERROR_FILE_NOT_FOUND => QueryStep::NotFound,
            other => QueryStep::Failed(other.0),
        }
    }

    fn set_value(&self, key: RawKey, name: &str, kind: u32, data: &[u8]) -> u32 {
        let wide = to_wide(name);
        unsafe {
            RegSetValueExW(
                hkey(key),
                PCWSTR(wide.as_ptr()),
                None,
                REG_VALUE_TYPE(kind),
                Some(data),
            )
        }
        .0
    }

    fn close(&self, key: RawKey) {
        let _ = unsafe { RegCloseKey(hkey(key)) };
    }
}
