//! Conversion helpers between symbolic names, identifiers and hex text.
//!
//! All conversions are total: unrecognized input falls back to a fixed
//! default instead of failing.

use crate::types::{RootKey, ValueType};

impl RootKey {
    /// Parse a root scope from its full name or short alias.
    ///
    /// Unrecognized names resolve to [`RootKey::LocalMachine`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "HKEY_CLASSES_ROOT" | "HKCR" => RootKey::ClassesRoot,
            "HKEY_CURRENT_USER" | "HKCU" => RootKey::CurrentUser,
            "HKEY_LOCAL_MACHINE" | "HKLM" => RootKey::LocalMachine,
            "HKEY_USERS" | "HKU" => RootKey::Users,
            "HKEY_CURRENT_CONFIG" | "HKCC" => RootKey::CurrentConfig,
            _ => RootKey::LocalMachine,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::Users => "HKEY_USERS",
            RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKCR",
            RootKey::CurrentUser => "HKCU",
            RootKey::LocalMachine => "HKLM",
            RootKey::Users => "HKU",
            RootKey::CurrentConfig => "HKCC",
        }
    }
}

/// Name of the root scope with the given predefined handle value.
///
/// Unrecognized identifiers resolve to `"HKEY_LOCAL_MACHINE"`.
pub fn root_name_from_raw(raw: u32) -> &'static str {
    RootKey::from_raw(raw)
        .unwrap_or(RootKey::LocalMachine)
        .name()
}

impl ValueType {
    /// Parse a value type from its `REG_*` name.
    ///
    /// Unrecognized names resolve to [`ValueType::Sz`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "REG_SZ" => ValueType::Sz,
            "REG_EXPAND_SZ" => ValueType::ExpandSz,
            "REG_DWORD" => ValueType::Dword,
            "REG_QWORD" => ValueType::Qword,
            "REG_BINARY" => ValueType::Binary,
            "REG_MULTI_SZ" => ValueType::MultiSz,
            _ => ValueType::Sz,
        }
    }

    /// `REG_*` name of this type; types outside the supported six report
    /// `"REG_SZ"`.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Sz => "REG_SZ",
            ValueType::ExpandSz => "REG_EXPAND_SZ",
            ValueType::Dword => "REG_DWORD",
            ValueType::Qword => "REG_QWORD",
            ValueType::Binary => "REG_BINARY",
            ValueType::MultiSz => "REG_MULTI_SZ",
            ValueType::Other(_) => "REG_SZ",
        }
    }
}

/// Value of a single hex digit. Anything else decodes to 0.
pub fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// Decode hex text into bytes, two characters per byte, high nibble first.
///
/// Invalid characters decode as 0 and a trailing unpaired character is
/// dropped.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| (hex_nibble(pair[0]) << 4) | hex_nibble(pair[1]))
        .collect()
}

/// Encode bytes as uppercase hex text.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_aliases() {
        assert_eq!(RootKey::from_name("HKCU"), RootKey::CurrentUser);
        assert_eq!(RootKey::from_name("HKEY_USERS"), RootKey::Users);
        assert_eq!(RootKey::from_name("HKCC"), RootKey::CurrentConfig);
        assert_eq!(RootKey::from_name("nonsense"), RootKey::LocalMachine);
        for root in RootKey::ALL {
            assert_eq!(RootKey::from_name(root.name()), root);
            assert_eq!(RootKey::from_name(root.short_name()), root);
        }
    }

    #[test]
    fn test_root_name_from_raw() {
        assert_eq!(root_name_from_raw(0x8000_0000), "HKEY_CLASSES_ROOT");
        assert_eq!(root_name_from_raw(42), "HKEY_LOCAL_MACHINE");
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(ValueType::from_name("REG_QWORD"), ValueType::Qword);
        assert_eq!(ValueType::from_name("REG_LINK"), ValueType::Sz);
        assert_eq!(ValueType::MultiSz.name(), "REG_MULTI_SZ");
        assert_eq!(ValueType::Other(0).name(), "REG_SZ");
    }

    #[test]
    fn test_hex_nibble() {
        assert_eq!(hex_nibble(b'7'), 7);
        assert_eq!(hex_nibble(b'c'), 12);
        assert_eq!(hex_nibble(b'F'), 15);
        assert_eq!(hex_nibble(b'g'), 0);
        assert_eq!(hex_nibble(b' '), 0);
    }

    #[test]
    fn test_hex_to_bytes() {
        assert_eq!(
            hex_to_bytes("EB589033907C"),
            vec![0xEB, 0x58, 0x90, 0x33, 0x90, 0x7C]
        );
        assert_eq!(hex_to_bytes("eb58"), vec![0xEB, 0x58]);
        // Odd length drops the trailing character
        assert_eq!(hex_to_bytes("ABC"), vec![0xAB]);
        // Invalid characters decode as zero nibbles
        assert_eq!(hex_to_bytes("zz1x"), vec![0x00, 0x10]);
        assert!(hex_to_bytes("").is_empty());
        assert!(hex_to_bytes("A").is_empty());
    }

    #[test]
    fn test_bytes_to_hex_is_uppercase() {
        assert_eq!(bytes_to_hex(&[0xEB, 0x58, 0x0A]), "EB580A");
        assert_eq!(bytes_to_hex(&[]), "");
    }
}
