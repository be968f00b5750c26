//! Access control entries and lists.

use super::sid::Sid;
use uuid::Uuid;

/// Generic and standard access rights, plus the key-specific mapping.
pub mod rights {
    pub const GENERIC_READ: u32 = 0x8000_0000;
    pub const GENERIC_WRITE: u32 = 0x4000_0000;
    pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
    pub const GENERIC_ALL: u32 = 0x1000_0000;

    pub const DELETE: u32 = 0x0001_0000;
    pub const READ_CONTROL: u32 = 0x0002_0000;
    pub const WRITE_DAC: u32 = 0x0004_0000;
    pub const WRITE_OWNER: u32 = 0x0008_0000;
    pub const SYNCHRONIZE: u32 = 0x0010_0000;

    pub const KEY_READ: u32 = 0x0002_0019;
    pub const KEY_WRITE: u32 = 0x0002_0006;
    pub const KEY_EXECUTE: u32 = KEY_READ;
    pub const KEY_ALL_ACCESS: u32 = 0x000F_003F;

    pub const FILE_ALL_ACCESS: u32 = 0x001F_01FF;
    pub const FILE_GENERIC_READ: u32 = 0x0012_0089;
    pub const FILE_GENERIC_WRITE: u32 = 0x0012_0116;
    pub const FILE_GENERIC_EXECUTE: u32 = 0x0012_00A0;

    /// Replace generic bits with the key-specific rights they stand for.
    pub fn map_generic(mask: u32) -> u32 {
        let mut mapped = mask & !(GENERIC_READ | GENERIC_WRITE | GENERIC_EXECUTE | GENERIC_ALL);
        if mask & GENERIC_READ != 0 {
            mapped |= KEY_READ;
        }
        if mask & GENERIC_WRITE != 0 {
            mapped |= KEY_WRITE;
        }
        if mask & GENERIC_EXECUTE != 0 {
            mapped |= KEY_EXECUTE;
        }
        if mask & GENERIC_ALL != 0 {
            mapped |= KEY_ALL_ACCESS;
        }
        mapped
    }

    /// Two-letter SDDL right codes.
    pub(crate) const CODES: &[(&str, u32)] = &[
        ("GA", GENERIC_ALL),
        ("GR", GENERIC_READ),
        ("GW", GENERIC_WRITE),
        ("GX", GENERIC_EXECUTE),
        ("RC", READ_CONTROL),
        ("SD", DELETE),
        ("WD", WRITE_DAC),
        ("WO", WRITE_OWNER),
        ("FA", FILE_ALL_ACCESS),
        ("FR", FILE_GENERIC_READ),
        ("FW", FILE_GENERIC_WRITE),
        ("FX", FILE_GENERIC_EXECUTE),
        ("KA", KEY_ALL_ACCESS),
        ("KR", KEY_READ),
        ("KW", KEY_WRITE),
        ("KX", KEY_EXECUTE),
        ("CC", 0x0001),
        ("DC", 0x0002),
        ("LC", 0x0004),
        ("SW", 0x0008),
        ("RP", 0x0010),
        ("WP", 0x0020),
        ("DT", 0x0040),
        ("LO", 0x0080),
        ("CR", 0x0100),
    ];
}

/// ACE inheritance and audit flags
pub mod ace_flags {
    pub const OBJECT_INHERIT_ACE: u8 = 0x01;
    pub const CONTAINER_INHERIT_ACE: u8 = 0x02;
    pub const NO_PROPAGATE_INHERIT_ACE: u8 = 0x04;
    pub const INHERIT_ONLY_ACE: u8 = 0x08;
    pub const INHERITED_ACE: u8 = 0x10;
    pub const SUCCESSFUL_ACCESS_ACE_FLAG: u8 = 0x40;
    pub const FAILED_ACCESS_ACE_FLAG: u8 = 0x80;

    pub(crate) const CODES: &[(&str, u8)] = &[
        ("OI", OBJECT_INHERIT_ACE),
        ("CI", CONTAINER_INHERIT_ACE),
        ("NP", NO_PROPAGATE_INHERIT_ACE),
        ("IO", INHERIT_ONLY_ACE),
        ("ID", INHERITED_ACE),
        ("SA", SUCCESSFUL_ACCESS_ACE_FLAG),
        ("FA", FAILED_ACCESS_ACE_FLAG),
    ];
}

/// ACE types supported in descriptor text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AceType {
    AccessAllowed = 0,
    AccessDenied = 1,
    SystemAudit = 2,
    SystemAlarm = 3,
    AccessAllowedObject = 5,
    AccessDeniedObject = 6,
    SystemAuditObject = 7,
    SystemAlarmObject = 8,
}

impl AceType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(AceType::AccessAllowed),
            "D" => Some(AceType::AccessDenied),
            "AU" => Some(AceType::SystemAudit),
            "AL" => Some(AceType::SystemAlarm),
            "OA" => Some(AceType::AccessAllowedObject),
            "OD" => Some(AceType::AccessDeniedObject),
            "OU" => Some(AceType::SystemAuditObject),
            "OL" => Some(AceType::SystemAlarmObject),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AceType::AccessAllowed => "A",
            AceType::AccessDenied => "D",
            AceType::SystemAudit => "AU",
            AceType::SystemAlarm => "AL",
            AceType::AccessAllowedObject => "OA",
            AceType::AccessDeniedObject => "OD",
            AceType::SystemAuditObject => "OU",
            AceType::SystemAlarmObject => "OL",
        }
    }

    /// Object ACEs may carry object and inherited-object type GUIDs.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
        )
    }
}

/// Access control entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    pub ace_type: AceType,
    pub flags: u8,
    pub mask: u32,
    /// Property set or child class the entry is limited to (object ACEs only).
    pub object_type: Option<Uuid>,
    /// Child class that inherits the entry (object ACEs only).
    pub inherited_object_type: Option<Uuid>,
    pub sid: Sid,
}

impl Ace {
    pub fn allow(mask: u32, sid: Sid) -> Self {
        Self::new(AceType::AccessAllowed, mask, sid)
    }

    pub fn deny(mask: u32, sid: Sid) -> Self {
        Self::new(AceType::AccessDenied, mask, sid)
    }

    fn new(ace_type: AceType, mask: u32, sid: Sid) -> Self {
        Self {
            ace_type,
            flags: 0,
            mask,
            object_type: None,
            inherited_object_type: None,
            sid,
        }
    }

    /// Inherit-only entries take no part in access checks on the object itself.
    pub fn is_inherit_only(&self) -> bool {
        self.flags & ace_flags::INHERIT_ONLY_ACE != 0
    }

    /// Whether the entry applies to the object as a whole.
    ///
    /// An object ACE limited to an object type only covers that property set
    /// or child class, which keys do not have.
    fn applies_to_object(&self) -> bool {
        !self.is_inherit_only() && self.object_type.is_none()
    }
}

/// Ordered list of access control entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acl {
    pub aces: Vec<Ace>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ace: Ace) {
        self.aces.push(ace);
    }

    pub fn len(&self) -> usize {
        self.aces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    /// Maximum access this list grants to a caller holding `principals`.
    ///
    /// Entries are processed in order. A right denied before it was granted
    /// stays denied.
    pub fn evaluate(&self, principals: &[Sid]) -> u32 {
        let mut granted = 0u32;
        let mut denied = 0u32;

        for ace in &self.aces {
            if !ace.applies_to_object() || !principals.contains(&ace.sid) {
                continue;
            }
            let mask = rights::map_generic(ace.mask);
            match ace.ace_type {
                AceType::AccessAllowed | AceType::AccessAllowedObject => granted |= mask & !denied,
                AceType::AccessDenied | AceType::AccessDeniedObject => denied |= mask & !granted,
                _ => {}
            }
        }

        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_mapping() {
        assert_eq!(rights::map_generic(rights::GENERIC_READ), rights::KEY_READ);
        assert_eq!(rights::map_generic(rights::GENERIC_ALL), rights::KEY_ALL_ACCESS);
        assert_eq!(
            rights::map_generic(rights::GENERIC_WRITE | rights::DELETE),
            rights::KEY_WRITE | rights::DELETE
        );
    }

    #[test]
    fn test_deny_before_allow() {
        let everyone = Sid::everyone();
        let mut acl = Acl::new();
        acl.push(Ace::deny(0x0002, everyone.clone()));
        acl.push(Ace::allow(rights::KEY_ALL_ACCESS, everyone.clone()));

        let granted = acl.evaluate(&[everyone]);
        assert_eq!(granted & 0x0002, 0);
        assert_ne!(granted & 0x0001, 0);
    }

    #[test]
    fn test_allow_before_deny_wins() {
        let everyone = Sid::everyone();
        let mut acl = Acl::new();
        acl.push(Ace::allow(0x0003, everyone.clone()));
        acl.push(Ace::deny(0x0002, everyone.clone()));

        assert_eq!(acl.evaluate(&[everyone]), 0x0003);
    }

    #[test]
    fn test_unmatched_and_inherit_only_entries_ignored() {
        let mut acl = Acl::new();
        acl.push(Ace::allow(rights::KEY_ALL_ACCESS, Sid::local_system()));
        let mut inherit_only = Ace::allow(rights::KEY_ALL_ACCESS, Sid::everyone());
        inherit_only.flags = ace_flags::INHERIT_ONLY_ACE;
        acl.push(inherit_only);

        assert_eq!(acl.evaluate(&[Sid::everyone()]), 0);
    }

    #[test]
    fn test_object_entries() {
        let everyone = Sid::everyone();
        let mut acl = Acl::new();
        let mut scoped = Ace::deny(rights::KEY_ALL_ACCESS, everyone.clone());
        scoped.ace_type = AceType::AccessDeniedObject;
        scoped.object_type = Some(Uuid::from_u128(0xbf96_7950_0de6_11d0_a285_00aa_0030_49e2));
        acl.push(scoped);
        let mut whole = Ace::allow(rights::KEY_READ, everyone.clone());
        whole.ace_type = AceType::AccessAllowedObject;
        acl.push(whole);

        // A deny scoped to an object type does not cover the key itself
        assert_eq!(acl.evaluate(&[everyone]), rights::KEY_READ);
        assert!(AceType::from_code("OU").unwrap().is_object());
        assert!(!AceType::AccessAllowed.is_object());
    }
}
