//! Centralized configuration for regkey.
//!
//! Fixed limits of the registry interface, the named constants callers pass to
//! key operations, and the per-key runtime configuration.

use serde::{Deserialize, Serialize};

/// Name of a key's unnamed default value slot.
pub const DEFAULT_VALUE: &str = "";

/// Security descriptor granting everyone read access only.
pub const SECURITY_LOCK: &str = "O:BAG:BAD:(A;;GR;;;WD)";

/// Security descriptor granting everyone full control.
pub const SECURITY_UNLOCK: &str = "O:BAG:BAD:(A;;FA;;;WD)";

/// Length limits of the registry interface.
pub struct RegistryLimits;

impl RegistryLimits {
    /// Longest key path accepted, in characters.
    pub const MAX_PATH: usize = 260;
    /// Longest value name accepted by `delete_value`, in characters.
    pub const MAX_VALUE_NAME: usize = 255;
    /// Longest text payload accepted by the text writers, in characters.
    pub const MAX_TEXT_VALUE: usize = 255;
    /// Name buffer used per enumerated entry, including the terminator.
    pub const ENUM_NAME_CAPACITY: usize = 256;
    /// Read buffer used by the multi-string reader.
    pub const MULTI_SZ_BUFFER: usize = 1024;
}

/// Runtime configuration carried by every [`RegKey`](crate::RegKey).
///
/// Children opened through navigation or recursive enumeration inherit the
/// configuration of the key they were opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegKeyConfig {
    /// Capacity of the multi-string read buffer in bytes. Larger values fail
    /// with `BufferOverflow`.
    pub multi_sz_buffer: usize,
    /// Capacity of the per-entry name buffer during enumeration.
    pub enum_name_capacity: usize,
    /// Report child-open and child traversal failures during recursive
    /// enumeration instead of skipping them silently.
    pub strict_recursion: bool,
}

impl Default for RegKeyConfig {
    fn default() -> Self {
        Self {
            multi_sz_buffer: RegistryLimits::MULTI_SZ_BUFFER,
            enum_name_capacity: RegistryLimits::ENUM_NAME_CAPACITY,
            strict_recursion: false,
        }
    }
}
