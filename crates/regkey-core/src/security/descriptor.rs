//! Security descriptors and their textual form.
//!
//! A descriptor carries an owner, a primary group, a discretionary ACL (who
//! may access the key) and a system ACL (auditing). The text form parsed here
//! is the security descriptor definition language:
//!
//! ```text
//! O:<owner>G:<group>D:<flags>(<ace>)(<ace>)…S:<flags>(<ace>)…
//! ```
//!
//! where each ACE reads `type;flags;rights;object_guid;inherit_guid;sid`.
//!
//! Aliases relative to a machine or domain SID (`LA`, `DA`, `DU`, …) are not
//! resolved here and fail as [`SddlError::InvalidSid`].

use super::acl::{ace_flags, rights, Ace, AceType, Acl};
use super::sid::Sid;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Security descriptor revision
pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;

/// Security descriptor control flags
pub mod sd_control {
    pub const SE_OWNER_DEFAULTED: u16 = 0x0001;
    pub const SE_GROUP_DEFAULTED: u16 = 0x0002;
    pub const SE_DACL_PRESENT: u16 = 0x0004;
    pub const SE_DACL_DEFAULTED: u16 = 0x0008;
    pub const SE_SACL_PRESENT: u16 = 0x0010;
    pub const SE_SACL_DEFAULTED: u16 = 0x0020;
    pub const SE_DACL_AUTO_INHERIT_REQ: u16 = 0x0100;
    pub const SE_SACL_AUTO_INHERIT_REQ: u16 = 0x0200;
    pub const SE_DACL_AUTO_INHERITED: u16 = 0x0400;
    pub const SE_SACL_AUTO_INHERITED: u16 = 0x0800;
    pub const SE_DACL_PROTECTED: u16 = 0x1000;
    pub const SE_SACL_PROTECTED: u16 = 0x2000;
    pub const SE_SELF_RELATIVE: u16 = 0x8000;

    /// Bits that travel with the discretionary ACL.
    pub const DACL_CONTROL: u16 = SE_DACL_PRESENT
        | SE_DACL_DEFAULTED
        | SE_DACL_AUTO_INHERIT_REQ
        | SE_DACL_AUTO_INHERITED
        | SE_DACL_PROTECTED;
}

use sd_control::*;

/// Failure to parse descriptor text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SddlError {
    #[error("malformed descriptor text: {0}")]
    Malformed(String),

    #[error("section {0}: appears more than once")]
    DuplicateSection(char),

    #[error("invalid SID: {0}")]
    InvalidSid(String),

    #[error("invalid ACL flags: {0}")]
    InvalidAclFlags(String),

    #[error("invalid ACE: {0}")]
    InvalidAce(String),

    #[error("invalid access rights: {0}")]
    InvalidRights(String),
}

/// Parsed security descriptor.
///
/// `dacl == None` with `SE_DACL_PRESENT` clear means no DACL at all, which
/// grants everyone full access. A present but empty DACL grants nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    pub control: u16,
    pub owner: Option<Sid>,
    pub group: Option<Sid>,
    pub dacl: Option<Acl>,
    pub sacl: Option<Acl>,
}

impl SecurityDescriptor {
    /// Parse descriptor text.
    pub fn parse(sddl: &str) -> Result<Self, SddlError> {
        let mut sd = SecurityDescriptor {
            control: SE_SELF_RELATIVE,
            owner: None,
            group: None,
            dacl: None,
            sacl: None,
        };
        let mut seen = Vec::with_capacity(4);

        for (tag, body) in split_sections(sddl.trim())? {
            if seen.contains(&tag) {
                return Err(SddlError::DuplicateSection(tag));
            }
            seen.push(tag);

            match tag {
                'O' => sd.owner = Some(parse_sid(body)?),
                'G' => sd.group = Some(parse_sid(body)?),
                'D' => {
                    let (flags, acl) = parse_acl(body)?;
                    sd.control |= flags.control(
                        SE_DACL_PROTECTED,
                        SE_DACL_AUTO_INHERITED,
                        SE_DACL_AUTO_INHERIT_REQ,
                    );
                    if !flags.null_acl {
                        sd.control |= SE_DACL_PRESENT;
                        sd.dacl = Some(acl);
                    }
                }
                'S' => {
                    let (flags, acl) = parse_acl(body)?;
                    sd.control |= flags.control(
                        SE_SACL_PROTECTED,
                        SE_SACL_AUTO_INHERITED,
                        SE_SACL_AUTO_INHERIT_REQ,
                    );
                    if !flags.null_acl {
                        sd.control |= SE_SACL_PRESENT;
                        sd.sacl = Some(acl);
                    }
                }
                _ => return Err(SddlError::Malformed(sddl.to_string())),
            }
        }

        Ok(sd)
    }

    /// Descriptor with an owner and no DACL, granting everyone full access.
    pub fn owned_by(owner: Sid) -> Self {
        Self {
            control: SE_SELF_RELATIVE,
            owner: Some(owner),
            group: None,
            dacl: None,
            sacl: None,
        }
    }

    /// Replace the DACL and its control bits with those of `other`.
    ///
    /// Owner, group and SACL are left untouched.
    pub fn apply_dacl(&mut self, other: &SecurityDescriptor) {
        self.control = (self.control & !DACL_CONTROL) | (other.control & DACL_CONTROL);
        self.dacl = other.dacl.clone();
    }

    pub fn has_dacl(&self) -> bool {
        self.control & SE_DACL_PRESENT != 0
    }

    /// Maximum key access granted to a caller holding `principals`.
    ///
    /// Generic rights are mapped to key rights. The owner always keeps
    /// `READ_CONTROL | WRITE_DAC` so it can repair its own descriptor.
    pub fn granted(&self, principals: &[Sid]) -> u32 {
        let mut granted = match &self.dacl {
            None => rights::KEY_ALL_ACCESS | rights::SYNCHRONIZE,
            Some(acl) => acl.evaluate(principals),
        };
        if let Some(owner) = &self.owner {
            if principals.contains(owner) {
                granted |= rights::READ_CONTROL | rights::WRITE_DAC;
            }
        }
        granted
    }

    /// Check whether every right in `desired` is granted.
    pub fn access_check(&self, principals: &[Sid], desired: u32) -> bool {
        let desired = rights::map_generic(desired);
        desired & !self.granted(principals) == 0
    }
}

impl fmt::Display for SecurityDescriptor {
    /// Render as descriptor text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "O:{}", SidText(owner))?;
        }
        if let Some(group) = &self.group {
            write!(f, "G:{}", SidText(group))?;
        }
        if let Some(dacl) = &self.dacl {
            f.write_str("D:")?;
            write_acl_flags(
                f,
                self.control,
                SE_DACL_PROTECTED,
                SE_DACL_AUTO_INHERITED,
                SE_DACL_AUTO_INHERIT_REQ,
            )?;
            write_aces(f, dacl)?;
        }
        if let Some(sacl) = &self.sacl {
            f.write_str("S:")?;
            write_acl_flags(
                f,
                self.control,
                SE_SACL_PROTECTED,
                SE_SACL_AUTO_INHERITED,
                SE_SACL_AUTO_INHERIT_REQ,
            )?;
            write_aces(f, sacl)?;
        }
        Ok(())
    }
}

struct SidText<'a>(&'a Sid);

impl fmt::Display for SidText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.alias() {
            Some(alias) => f.write_str(alias),
            None => write!(f, "{}", self.0),
        }
    }
}

fn write_acl_flags(
    f: &mut fmt::Formatter<'_>,
    control: u16,
    protected: u16,
    auto_inherited: u16,
    auto_inherit_req: u16,
) -> fmt::Result {
    if control & protected != 0 {
        f.write_str("P")?;
    }
    if control & auto_inherited != 0 {
        f.write_str("AI")?;
    }
    if control & auto_inherit_req != 0 {
        f.write_str("AR")?;
    }
    Ok(())
}

fn write_aces(f: &mut fmt::Formatter<'_>, acl: &Acl) -> fmt::Result {
    for ace in &acl.aces {
        write!(f, "({};", ace.ace_type.code())?;
        for (code, bit) in ace_flags::CODES {
            if ace.flags & bit != 0 {
                f.write_str(code)?;
            }
        }
        match rights::CODES.iter().find(|(_, bits)| *bits == ace.mask) {
            Some((code, _)) => write!(f, ";{};", code)?,
            None => write!(f, ";0x{:X};", ace.mask)?,
        }
        if let Some(guid) = &ace.object_type {
            write!(f, "{}", guid)?;
        }
        f.write_str(";")?;
        if let Some(guid) = &ace.inherited_object_type {
            write!(f, "{}", guid)?;
        }
        write!(f, ";{})", SidText(&ace.sid))?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct AclFlags {
    protected: bool,
    auto_inherited: bool,
    auto_inherit_req: bool,
    null_acl: bool,
}

impl AclFlags {
    fn control(&self, protected: u16, auto_inherited: u16, auto_inherit_req: u16) -> u16 {
        let mut control = 0;
        if self.protected {
            control |= protected;
        }
        if self.auto_inherited {
            control |= auto_inherited;
        }
        if self.auto_inherit_req {
            control |= auto_inherit_req;
        }
        control
    }
}

/// Split descriptor text into `(tag, body)` sections.
///
/// A section starts at `O:`, `G:`, `D:` or `S:` outside any parenthesis.
fn split_sections(text: &str) -> Result<Vec<(char, &str)>, SddlError> {
    let bytes = text.as_bytes();
    let mut starts: Vec<(char, usize)> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SddlError::Malformed(text.to_string()))?;
            }
            tag @ (b'O' | b'G' | b'D' | b'S') if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                starts.push((tag as char, i));
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err(SddlError::Malformed(text.to_string()));
    }
    match starts.first() {
        None if text.is_empty() => return Ok(Vec::new()),
        Some((_, 0)) => {}
        _ => return Err(SddlError::Malformed(text.to_string())),
    }

    let mut sections = Vec::with_capacity(starts.len());
    for (n, (tag, start)) in starts.iter().enumerate() {
        let end = starts.get(n + 1).map_or(text.len(), |(_, next)| *next);
        sections.push((*tag, &text[start + 2..end]));
    }
    Ok(sections)
}

fn parse_sid(text: &str) -> Result<Sid, SddlError> {
    Sid::parse(text.trim()).ok_or_else(|| SddlError::InvalidSid(text.to_string()))
}

fn parse_acl(body: &str) -> Result<(AclFlags, Acl), SddlError> {
    let split = body.find('(').unwrap_or(body.len());
    let (prefix, mut rest) = body.split_at(split);

    let mut flags = AclFlags::default();
    let mut remaining = prefix.trim();
    while !remaining.is_empty() {
        if let Some(r) = remaining.strip_prefix("NO_ACCESS_CONTROL") {
            flags.null_acl = true;
            remaining = r;
        } else if let Some(r) = remaining.strip_prefix("AI") {
            flags.auto_inherited = true;
            remaining = r;
        } else if let Some(r) = remaining.strip_prefix("AR") {
            flags.auto_inherit_req = true;
            remaining = r;
        } else if let Some(r) = remaining.strip_prefix('P') {
            flags.protected = true;
            remaining = r;
        } else {
            return Err(SddlError::InvalidAclFlags(prefix.to_string()));
        }
    }

    let mut acl = Acl::new();
    rest = rest.trim();
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('(')
            .ok_or_else(|| SddlError::InvalidAce(rest.to_string()))?;
        let close = inner
            .find(')')
            .ok_or_else(|| SddlError::InvalidAce(rest.to_string()))?;
        acl.push(parse_ace(&inner[..close])?);
        rest = inner[close + 1..].trim_start();
    }

    Ok((flags, acl))
}

fn parse_ace(text: &str) -> Result<Ace, SddlError> {
    let fields: Vec<&str> = text.split(';').collect();
    if fields.len() < 6 {
        return Err(SddlError::InvalidAce(text.to_string()));
    }

    let invalid = || SddlError::InvalidAce(text.to_string());

    let ace_type = AceType::from_code(fields[0].trim()).ok_or_else(invalid)?;
    let flags = parse_ace_flags(fields[1].trim()).ok_or_else(invalid)?;
    let mask = parse_rights(fields[2].trim())?;
    let object_type = parse_guid(fields[3]).ok_or_else(invalid)?;
    let inherited_object_type = parse_guid(fields[4]).ok_or_else(invalid)?;
    if !ace_type.is_object() && (object_type.is_some() || inherited_object_type.is_some()) {
        return Err(invalid());
    }
    let sid = parse_sid(fields[5])?;

    Ok(Ace {
        ace_type,
        flags,
        mask,
        object_type,
        inherited_object_type,
        sid,
    })
}

/// Parse an optional GUID field. `None` means the field is malformed.
fn parse_guid(text: &str) -> Option<Option<Uuid>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    Uuid::parse_str(text).ok().map(Some)
}

fn parse_ace_flags(text: &str) -> Option<u8> {
    let mut flags = 0u8;
    for code in two_letter_codes(text)? {
        let (_, bit) = ace_flags::CODES.iter().find(|(name, _)| *name == code)?;
        flags |= bit;
    }
    Some(flags)
}

/// Parse a rights field: hex, decimal, or concatenated two-letter codes.
fn parse_rights(text: &str) -> Result<u32, SddlError> {
    let invalid = || SddlError::InvalidRights(text.to_string());

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(|_| invalid());
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().map_err(|_| invalid());
    }

    let mut mask = 0u32;
    for code in two_letter_codes(text).ok_or_else(invalid)? {
        let (_, bits) = rights::CODES
            .iter()
            .find(|(name, _)| *name == code)
            .ok_or_else(invalid)?;
        mask |= bits;
    }
    Ok(mask)
}

fn two_letter_codes(text: &str) -> Option<Vec<&str>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    Some((0..text.len()).step_by(2).map(|i| &text[i..i + 2]).collect())
}
