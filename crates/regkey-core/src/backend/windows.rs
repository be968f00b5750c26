//! Win32 registry backend.
//!
//! Calls the wide-character (`…W`) registry functions. Names are passed as
//! UTF-16. Text payloads arrive from the key layer as UTF-8 and are stored
//! as UTF-16, and are converted back on the way out, so value sizes reported
//! here are UTF-8 sizes.

#![allow(unsafe_code)]

use super::RegistryBackend;
use crate::error::{OsError, OsResult};
use crate::types::{AccessMask, RawKey, RootKey, ValueInfo, ValueType};
use std::ffi::c_void;
use std::ptr;
use tracing::debug;
use windows_sys::Win32::Foundation::{
    LocalFree, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS,
};
use windows_sys::Win32::Security::Authorization::{
    ConvertStringSecurityDescriptorToSecurityDescriptorW, SDDL_REVISION_1,
};
use windows_sys::Win32::Security::{DACL_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyExW, RegDeleteValueW, RegEnumKeyExW, RegEnumValueW,
    RegOpenKeyExW, RegQueryValueExW, RegSetKeySecurity, RegSetValueExW, HKEY, HKEY_CLASSES_ROOT,
    HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS,
    REG_OPTION_NON_VOLATILE,
};

const ERROR_INVALID_PARAMETER: u32 = 87;

/// Access to the registry of the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }
}

fn root_hkey(root: RootKey) -> HKEY {
    match root {
        RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
        RootKey::CurrentUser => HKEY_CURRENT_USER,
        RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        RootKey::Users => HKEY_USERS,
        RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
    }
}

fn hkey(key: RawKey) -> HKEY {
    key.0 as HKEY
}

/// NUL-terminated UTF-16 copy of `text`.
fn wide(text: &str) -> OsResult<Vec<u16>> {
    if text.contains('\0') {
        return Err(OsError::Other(ERROR_INVALID_PARAMETER));
    }
    Ok(text.encode_utf16().chain(std::iter::once(0)).collect())
}

fn to_u32(len: usize) -> OsResult<u32> {
    u32::try_from(len).map_err(|_| OsError::Other(ERROR_INVALID_PARAMETER))
}

fn check(status: u32) -> OsResult<()> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(OsError::from_win32(status))
    }
}

/// Stored form of a payload: text kinds become UTF-16LE.
fn to_stored(value_type: ValueType, data: &[u8]) -> Vec<u8> {
    if !value_type.is_string() {
        return data.to_vec();
    }
    String::from_utf8_lossy(data)
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Caller form of a stored payload: text kinds become UTF-8.
fn from_stored(value_type: ValueType, data: Vec<u8>) -> Vec<u8> {
    if !value_type.is_string() {
        return data;
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units).into_bytes()
}

/// Releases a descriptor allocated by the OS when dropped.
struct LocalDescriptor(PSECURITY_DESCRIPTOR);

impl Drop for LocalDescriptor {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer was allocated by
            // ConvertStringSecurityDescriptorToSecurityDescriptorW, which
            // documents LocalFree as its release function, and is freed once.
            unsafe {
                LocalFree(self.0 as *mut c_void);
            }
        }
    }
}

impl WindowsRegistry {
    /// Read a whole value in its stored form.
    ///
    /// The value may grow between the size query and the read; the read is
    /// retried with the new size.
    fn read_stored(&self, key: RawKey, name: &str) -> OsResult<(ValueType, Vec<u8>)> {
        let name = wide(name)?;
        let mut buffer = Vec::new();
        loop {
            let mut raw_type = 0u32;
            let mut size = to_u32(buffer.len())?;
            let data = if buffer.is_empty() {
                ptr::null_mut()
            } else {
                buffer.as_mut_ptr()
            };
            // SAFETY: `name` is NUL-terminated; `data` is null (size query)
            // or valid for `size` bytes, and the OS writes at most that many.
            let status = unsafe {
                RegQueryValueExW(
                    hkey(key),
                    name.as_ptr(),
                    ptr::null(),
                    &mut raw_type,
                    data,
                    &mut size,
                )
            };
            let sizing = buffer.is_empty();
            match status {
                ERROR_SUCCESS if sizing && size > 0 => buffer.resize(size as usize, 0),
                ERROR_MORE_DATA => buffer.resize(size as usize, 0),
                ERROR_SUCCESS => {
                    buffer.truncate(size as usize);
                    return Ok((ValueType::from_raw(raw_type), buffer));
                }
                other => return Err(OsError::from_win32(other)),
            }
        }
    }
}

impl RegistryBackend for WindowsRegistry {
    fn create_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey> {
        let path = wide(path)?;
        let mut key: HKEY = ptr::null_mut();
        // SAFETY: `path` is NUL-terminated and outlives the call; `key` is a
        // valid out location. Class, security attributes and disposition are
        // optional and passed as null.
        let status = unsafe {
            RegCreateKeyExW(
                root_hkey(root),
                path.as_ptr(),
                0,
                ptr::null(),
                REG_OPTION_NON_VOLATILE,
                access.bits(),
                ptr::null(),
                &mut key,
                ptr::null_mut(),
            )
        };
        check(status)?;
        Ok(RawKey(key as usize))
    }

    fn open_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey> {
        let path = wide(path)?;
        let mut key: HKEY = ptr::null_mut();
        // SAFETY: `path` is NUL-terminated and outlives the call; `key` is a
        // valid out location.
        let status =
            unsafe { RegOpenKeyExW(root_hkey(root), path.as_ptr(), 0, access.bits(), &mut key) };
        check(status)?;
        Ok(RawKey(key as usize))
    }

    fn close_key(&self, key: RawKey) -> OsResult<()> {
        // SAFETY: the handle was issued by RegCreateKeyExW/RegOpenKeyExW and
        // the caller releases it once.
        check(unsafe { RegCloseKey(hkey(key)) })
    }

    fn set_value(
        &self,
        key: RawKey,
        name: &str,
        value_type: ValueType,
        data: &[u8],
    ) -> OsResult<()> {
        let name = wide(name)?;
        let stored = to_stored(value_type, data);
        let size = to_u32(stored.len())?;
        // SAFETY: `name` is NUL-terminated; `stored` is valid for `size` bytes.
        let status = unsafe {
            RegSetValueExW(
                hkey(key),
                name.as_ptr(),
                0,
                value_type.raw(),
                stored.as_ptr(),
                size,
            )
        };
        check(status)
    }

    fn query_value_info(&self, key: RawKey, name: &str) -> OsResult<ValueInfo> {
        let (value_type, stored) = self.read_stored(key, name)?;
        let size = from_stored(value_type, stored).len();
        Ok(ValueInfo {
            value_type,
            size: to_u32(size)?,
        })
    }

    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        capacity: usize,
    ) -> OsResult<(ValueType, Vec<u8>)> {
        let (value_type, stored) = self.read_stored(key, name)?;
        let data = from_stored(value_type, stored);
        if data.len() > capacity {
            return Err(OsError::MoreData);
        }
        Ok((value_type, data))
    }

    fn delete_value(&self, key: RawKey, name: &str) -> OsResult<()> {
        let name = wide(name)?;
        // SAFETY: `name` is NUL-terminated and outlives the call.
        check(unsafe { RegDeleteValueW(hkey(key), name.as_ptr()) })
    }

    fn delete_key(&self, key: RawKey, access: AccessMask) -> OsResult<()> {
        let view = access.bits() & (AccessMask::WOW64_32KEY | AccessMask::WOW64_64KEY).bits();
        let empty = [0u16];
        // SAFETY: an empty subkey name deletes the key the handle refers to.
        check(unsafe { RegDeleteKeyExW(hkey(key), empty.as_ptr(), view, 0) })
    }

    fn enum_value(
        &self,
        key: RawKey,
        index: u32,
        name_capacity: usize,
    ) -> OsResult<Option<(String, ValueType)>> {
        let mut name = vec![0u16; name_capacity];
        let mut name_len = to_u32(name_capacity)?;
        let mut raw_type = 0u32;
        // SAFETY: `name` is valid for `name_len` characters; data is not
        // requested.
        let status = unsafe {
            RegEnumValueW(
                hkey(key),
                index,
                name.as_mut_ptr(),
                &mut name_len,
                ptr::null(),
                &mut raw_type,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status == ERROR_NO_MORE_ITEMS {
            return Ok(None);
        }
        check(status)?;
        name.truncate(name_len as usize);
        Ok(Some((String::from_utf16_lossy(&name), ValueType::from_raw(raw_type))))
    }

    fn enum_key(&self, key: RawKey, index: u32, name_capacity: usize) -> OsResult<Option<String>> {
        let mut name = vec![0u16; name_capacity];
        let mut name_len = to_u32(name_capacity)?;
        // SAFETY: `name` is valid for `name_len` characters; class and
        // timestamp are not requested.
        let status = unsafe {
            RegEnumKeyExW(
                hkey(key),
                index,
                name.as_mut_ptr(),
                &mut name_len,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status == ERROR_NO_MORE_ITEMS {
            return Ok(None);
        }
        check(status)?;
        name.truncate(name_len as usize);
        Ok(Some(String::from_utf16_lossy(&name)))
    }

    fn set_key_security(&self, key: RawKey, sddl: &str) -> OsResult<()> {
        let text = wide(sddl).map_err(|_| OsError::InvalidData)?;
        let mut native = LocalDescriptor(ptr::null_mut());
        // SAFETY: `text` is NUL-terminated; on success the OS stores a
        // LocalAlloc'd descriptor in `native.0`, which the guard frees.
        let converted = unsafe {
            ConvertStringSecurityDescriptorToSecurityDescriptorW(
                text.as_ptr(),
                SDDL_REVISION_1,
                &mut native.0,
                ptr::null_mut(),
            )
        };
        if converted == 0 {
            debug!("Rejected descriptor {:?}", sddl);
            return Err(OsError::InvalidData);
        }
        // SAFETY: `native.0` points to a valid self-relative descriptor for
        // the lifetime of the guard.
        check(unsafe { RegSetKeySecurity(hkey(key), DACL_SECURITY_INFORMATION, native.0) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payloads_are_stored_as_utf16() {
        let stored = to_stored(ValueType::Sz, "café\0".as_bytes());
        assert_eq!(stored, vec![b'c', 0, b'a', 0, b'f', 0, 0xE9, 0, 0, 0]);
        assert_eq!(from_stored(ValueType::Sz, stored), "café\0".as_bytes().to_vec());

        let binary = vec![0xC3, 0xA9];
        assert_eq!(to_stored(ValueType::Binary, &binary), binary);
    }

    #[test]
    fn test_multi_sz_keeps_separators() {
        let data = b"a\0bb\0\0".to_vec();
        let stored = to_stored(ValueType::MultiSz, &data);
        assert_eq!(stored.len(), data.len() * 2);
        assert_eq!(from_stored(ValueType::MultiSz, stored), data);
    }

    #[test]
    fn test_wide_names() {
        assert_eq!(wide("Ü").unwrap(), vec![0xDC, 0]);
        assert_eq!(wide("a\0b"), Err(OsError::Other(ERROR_INVALID_PARAMETER)));
    }
}
