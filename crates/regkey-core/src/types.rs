//! Vocabulary types shared by keys and backends.

use crate::error::RegError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// One of the predefined top-level scopes the registry is partitioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKey {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl RootKey {
    pub const ALL: [RootKey; 5] = [
        RootKey::ClassesRoot,
        RootKey::CurrentUser,
        RootKey::LocalMachine,
        RootKey::Users,
        RootKey::CurrentConfig,
    ];

    /// Predefined handle value the OS uses for this scope.
    pub fn raw(&self) -> u32 {
        match self {
            RootKey::ClassesRoot => 0x8000_0000,
            RootKey::CurrentUser => 0x8000_0001,
            RootKey::LocalMachine => 0x8000_0002,
            RootKey::Users => 0x8000_0003,
            RootKey::CurrentConfig => 0x8000_0005,
        }
    }

    /// Look up a scope by its predefined handle value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|root| root.raw() == raw)
    }
}

impl TryFrom<u32> for RootKey {
    type Error = RegError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or(RegError::InvalidRoot)
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Stored type of a registry value.
///
/// The six supported kinds have dedicated variants; anything else a store
/// reports is carried as [`ValueType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Null-terminated string (`REG_SZ`)
    Sz,
    /// String with `%VARIABLE%` references (`REG_EXPAND_SZ`)
    ExpandSz,
    /// Raw bytes (`REG_BINARY`)
    Binary,
    /// 32-bit little-endian integer (`REG_DWORD`)
    Dword,
    /// Sequence of strings terminated by an empty one (`REG_MULTI_SZ`)
    MultiSz,
    /// 64-bit little-endian integer (`REG_QWORD`)
    Qword,
    Other(u32),
}

impl ValueType {
    pub const REG_SZ: u32 = 1;
    pub const REG_EXPAND_SZ: u32 = 2;
    pub const REG_BINARY: u32 = 3;
    pub const REG_DWORD: u32 = 4;
    pub const REG_MULTI_SZ: u32 = 7;
    pub const REG_QWORD: u32 = 11;

    /// Raw type identifier.
    pub fn raw(&self) -> u32 {
        match self {
            ValueType::Sz => Self::REG_SZ,
            ValueType::ExpandSz => Self::REG_EXPAND_SZ,
            ValueType::Binary => Self::REG_BINARY,
            ValueType::Dword => Self::REG_DWORD,
            ValueType::MultiSz => Self::REG_MULTI_SZ,
            ValueType::Qword => Self::REG_QWORD,
            ValueType::Other(raw) => *raw,
        }
    }

    /// Classify a raw type identifier.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::REG_SZ => ValueType::Sz,
            Self::REG_EXPAND_SZ => ValueType::ExpandSz,
            Self::REG_BINARY => ValueType::Binary,
            Self::REG_DWORD => ValueType::Dword,
            Self::REG_MULTI_SZ => ValueType::MultiSz,
            Self::REG_QWORD => ValueType::Qword,
            other => ValueType::Other(other),
        }
    }

    /// Check if this is one of the text kinds.
    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::Sz | ValueType::ExpandSz | ValueType::MultiSz)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Requested access rights, passed to the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMask(pub u32);

impl AccessMask {
    pub const QUERY_VALUE: AccessMask = AccessMask(0x0001);
    pub const SET_VALUE: AccessMask = AccessMask(0x0002);
    pub const CREATE_SUB_KEY: AccessMask = AccessMask(0x0004);
    pub const ENUMERATE_SUB_KEYS: AccessMask = AccessMask(0x0008);
    pub const NOTIFY: AccessMask = AccessMask(0x0010);
    pub const CREATE_LINK: AccessMask = AccessMask(0x0020);
    pub const WOW64_64KEY: AccessMask = AccessMask(0x0100);
    pub const WOW64_32KEY: AccessMask = AccessMask(0x0200);

    pub const DELETE: AccessMask = AccessMask(0x0001_0000);
    pub const READ_CONTROL: AccessMask = AccessMask(0x0002_0000);
    pub const WRITE_DAC: AccessMask = AccessMask(0x0004_0000);
    pub const WRITE_OWNER: AccessMask = AccessMask(0x0008_0000);
    pub const SYNCHRONIZE: AccessMask = AccessMask(0x0010_0000);

    pub const READ: AccessMask = AccessMask(0x0002_0019);
    pub const WRITE: AccessMask = AccessMask(0x0002_0006);
    pub const EXECUTE: AccessMask = AccessMask::READ;
    pub const ALL_ACCESS: AccessMask = AccessMask(0x000F_003F);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: AccessMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        AccessMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u32> for AccessMask {
    fn from(bits: u32) -> Self {
        AccessMask(bits)
    }
}

/// Opaque handle issued by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawKey(pub usize);

/// Stored type and byte size of a value, as reported by `type_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub value_type: ValueType,
    pub size: u32,
}

/// A value slot seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueEntry {
    pub name: String,
    pub value_type: ValueType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_raw_roundtrip() {
        for root in RootKey::ALL {
            assert_eq!(RootKey::from_raw(root.raw()), Some(root));
        }
        assert_eq!(RootKey::try_from(0), Err(RegError::InvalidRoot));
        assert_eq!(RootKey::try_from(0x8000_0004), Err(RegError::InvalidRoot));
    }

    #[test]
    fn test_value_type_raw() {
        assert_eq!(ValueType::from_raw(4), ValueType::Dword);
        assert_eq!(ValueType::from_raw(0), ValueType::Other(0));
        assert_eq!(ValueType::Other(9).raw(), 9);
        assert!(ValueType::ExpandSz.is_string());
        assert!(!ValueType::Binary.is_string());
    }

    #[test]
    fn test_access_mask_composition() {
        let mask = AccessMask::QUERY_VALUE | AccessMask::SET_VALUE;
        assert!(mask.contains(AccessMask::SET_VALUE));
        assert!(!mask.contains(AccessMask::WRITE));
        assert!(AccessMask::ALL_ACCESS.contains(AccessMask::READ | AccessMask::WRITE));
        assert!(AccessMask::ALL_ACCESS.contains(AccessMask::DELETE | AccessMask::WRITE_DAC));
    }
}
