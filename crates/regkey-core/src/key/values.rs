//! Typed value accessors and deletion.

use super::RegKey;
use crate::config::RegistryLimits;
use crate::convert::{bytes_to_hex, hex_to_bytes};
use crate::error::{OsError, RegError, Result};
use crate::types::{ValueInfo, ValueType};
use tracing::warn;

/// Encode a text payload with its terminating NUL.
fn text_payload(value: &str) -> Result<Vec<u8>> {
    if value.chars().count() > RegistryLimits::MAX_TEXT_VALUE {
        return Err(RegError::StrTooLong);
    }
    if value.contains('\0') {
        return Err(RegError::InvalidValue);
    }
    let mut data = Vec::with_capacity(value.len() + 1);
    data.extend_from_slice(value.as_bytes());
    data.push(0);
    Ok(data)
}

/// Encode a string list: each entry NUL-terminated, then one more NUL.
///
/// Entries are written as given. An empty entry reads back as the end of
/// the list.
fn multi_payload(values: &[&str]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for value in values {
        if value.contains('\0') {
            return Err(RegError::InvalidValue);
        }
        data.extend_from_slice(value.as_bytes());
        data.push(0);
    }
    data.push(0);
    Ok(data)
}

/// Decode text up to the first NUL.
fn decode_text(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

impl RegKey {
    /// Stored type and byte size of the value `name`.
    pub fn type_size(&self, name: &str) -> Result<ValueInfo> {
        let handle = self.handle()?;
        self.backend()
            .query_value_info(handle, name)
            .map_err(RegError::from_value_os)
    }

    pub fn write_sz(&self, name: &str, value: &str) -> Result<()> {
        self.write_text(name, value, ValueType::Sz)
    }

    pub fn write_expand_sz(&self, name: &str, value: &str) -> Result<()> {
        self.write_text(name, value, ValueType::ExpandSz)
    }

    pub fn write_dword(&self, name: &str, value: u32) -> Result<()> {
        self.write_raw(name, ValueType::Dword, &value.to_le_bytes())
    }

    pub fn write_qword(&self, name: &str, value: u64) -> Result<()> {
        self.write_raw(name, ValueType::Qword, &value.to_le_bytes())
    }

    /// Write bytes given as hex text.
    ///
    /// Decoding is permissive: invalid digits become 0 and a trailing odd
    /// digit is dropped.
    pub fn write_binary(&self, name: &str, hex: &str) -> Result<()> {
        self.write_raw(name, ValueType::Binary, &hex_to_bytes(hex))
    }

    pub fn write_multi_sz(&self, name: &str, values: &[&str]) -> Result<()> {
        self.handle()?;
        let data = multi_payload(values)?;
        self.write_raw(name, ValueType::MultiSz, &data)
    }

    fn write_text(&self, name: &str, value: &str, value_type: ValueType) -> Result<()> {
        self.handle()?;
        let data = text_payload(value)?;
        self.write_raw(name, value_type, &data)
    }

    fn write_raw(&self, name: &str, value_type: ValueType, data: &[u8]) -> Result<()> {
        let handle = self.handle()?;
        self.backend()
            .set_value(handle, name, value_type, data)
            .map_err(RegError::from_write_os)
    }

    pub fn read_sz(&self, name: &str) -> Result<String> {
        self.read_text(name, ValueType::Sz)
    }

    pub fn read_expand_sz(&self, name: &str) -> Result<String> {
        self.read_text(name, ValueType::ExpandSz)
    }

    pub fn read_dword(&self, name: &str) -> Result<u32> {
        let data = self.read_checked(name, ValueType::Dword, Some(4))?;
        let mut bytes = [0u8; 4];
        let len = data.len().min(4);
        bytes[..len].copy_from_slice(&data[..len]);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_qword(&self, name: &str) -> Result<u64> {
        let data = self.read_checked(name, ValueType::Qword, Some(8))?;
        let mut bytes = [0u8; 8];
        let len = data.len().min(8);
        bytes[..len].copy_from_slice(&data[..len]);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Read bytes as uppercase hex text.
    pub fn read_binary(&self, name: &str) -> Result<String> {
        let data = self.read_checked(name, ValueType::Binary, None)?;
        Ok(bytes_to_hex(&data))
    }

    /// Read a string list.
    ///
    /// Unlike the other readers this does not check the stored type. Values
    /// larger than [`RegKeyConfig::multi_sz_buffer`](crate::RegKeyConfig)
    /// fail with [`RegError::BufferOverflow`].
    pub fn read_multi_sz(&self, name: &str) -> Result<Vec<String>> {
        let handle = self.handle()?;
        let info = self.type_size(name)?;
        let capacity = self.config().multi_sz_buffer;
        if info.size as usize > capacity {
            return Err(RegError::BufferOverflow);
        }

        let (_, data) = self
            .backend()
            .query_value(handle, name, capacity)
            .map_err(|err| match err {
                OsError::MoreData => RegError::BufferOverflow,
                other => RegError::from_value_os(other),
            })?;

        Ok(data
            .split(|&b| b == 0)
            .take_while(|entry| !entry.is_empty())
            .map(|entry| String::from_utf8_lossy(entry).into_owned())
            .collect())
    }

    fn read_text(&self, name: &str, value_type: ValueType) -> Result<String> {
        let data = self.read_checked(name, value_type, None)?;
        Ok(decode_text(&data))
    }

    /// Query the size, check the stored type, then read.
    ///
    /// Text reads get one spare byte for the terminator; fixed-size reads
    /// pass their width.
    fn read_checked(
        &self,
        name: &str,
        expected: ValueType,
        width: Option<usize>,
    ) -> Result<Vec<u8>> {
        let handle = self.handle()?;
        let info = self.type_size(name)?;
        if info.value_type != expected {
            return Err(RegError::IncorrectType);
        }

        let capacity = match width {
            Some(width) => width,
            None if expected.is_string() => info.size as usize + 1,
            None => info.size as usize,
        };
        let (_, data) = self
            .backend()
            .query_value(handle, name, capacity)
            .map_err(RegError::from_value_os)?;
        Ok(data)
    }

    /// Delete the value `name`.
    pub fn delete_value(&self, name: &str) -> Result<()> {
        let handle = self.handle()?;
        if name.chars().count() > RegistryLimits::MAX_VALUE_NAME {
            return Err(RegError::StrTooLong);
        }
        self.backend()
            .delete_value(handle, name)
            .map_err(RegError::from_value_os)
    }

    /// Delete this key, then close it.
    ///
    /// The key must have no subkeys.
    pub fn delete(&mut self) -> Result<()> {
        let handle = self.handle()?;
        self.backend()
            .delete_key(handle, self.access())
            .map_err(|err| match err {
                OsError::AccessDenied => RegError::AccessDenied,
                OsError::NotFound | OsError::KeyDeleted => RegError::PathNotExist,
                _ => RegError::UnknownError,
            })?;

        if let Err(err) = self.close() {
            warn!("Deleted key could not be closed: {}", err);
        }
        Ok(())
    }
}
