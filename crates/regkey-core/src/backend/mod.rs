//! Registry backends.
//!
//! [`RegistryBackend`] is the small capability surface a [`RegKey`](crate::RegKey)
//! drives. Two implementations are provided:
//!
//! - [`MemoryRegistry`]: an in-process store that enforces access rights and
//!   descriptors the way the OS does. Used by tests and on non-Windows hosts.
//! - `WindowsRegistry`: the wide-character Win32 registry API (Windows only).

mod memory;
#[cfg(windows)]
mod windows;

pub use memory::MemoryRegistry;
#[cfg(windows)]
pub use windows::WindowsRegistry;

use crate::error::OsResult;
use crate::types::{AccessMask, RawKey, RootKey, ValueInfo, ValueType};

/// Operations a registry store must provide.
///
/// All operations are synchronous. "No more items" during enumeration is
/// reported as `Ok(None)`, never as an error.
pub trait RegistryBackend: Send + Sync {
    /// Open a key, creating it and any missing ancestors first.
    fn create_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey>;

    /// Open an existing key.
    fn open_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey>;

    /// Release a handle.
    fn close_key(&self, key: RawKey) -> OsResult<()>;

    /// Store a value, replacing any existing value of the same name.
    fn set_value(
        &self,
        key: RawKey,
        name: &str,
        value_type: ValueType,
        data: &[u8],
    ) -> OsResult<()>;

    /// Report a value's stored type and size without reading it.
    fn query_value_info(&self, key: RawKey, name: &str) -> OsResult<ValueInfo>;

    /// Read a value into a buffer of `capacity` bytes.
    ///
    /// Fails with [`OsError::MoreData`](crate::OsError::MoreData) if the value
    /// does not fit.
    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        capacity: usize,
    ) -> OsResult<(ValueType, Vec<u8>)>;

    fn delete_value(&self, key: RawKey, name: &str) -> OsResult<()>;

    /// Delete the key the handle refers to. The key must have no subkeys.
    fn delete_key(&self, key: RawKey, access: AccessMask) -> OsResult<()>;

    /// Name and type of the value at `index`.
    ///
    /// Names that do not fit in `name_capacity` characters (including the
    /// terminator) fail with [`OsError::MoreData`](crate::OsError::MoreData).
    fn enum_value(
        &self,
        key: RawKey,
        index: u32,
        name_capacity: usize,
    ) -> OsResult<Option<(String, ValueType)>>;

    /// Name of the subkey at `index`.
    fn enum_key(&self, key: RawKey, index: u32, name_capacity: usize) -> OsResult<Option<String>>;

    /// Parse descriptor text and replace the key's discretionary ACL with
    /// the one it describes.
    ///
    /// Text is parsed before the handle is used, so text the store cannot
    /// parse fails with [`OsError::InvalidData`](crate::OsError::InvalidData)
    /// regardless of the handle's rights.
    fn set_key_security(&self, key: RawKey, sddl: &str) -> OsResult<()>;
}
