//! Security identifiers.
//!
//! A SID has the textual form `S-R-I-S-S…`: literal `S`, revision (always 1),
//! identifier authority, then up to fifteen sub-authorities. SDDL also names
//! well-known SIDs by two-letter aliases such as `WD` (Everyone) or `BA`
//! (Builtin Administrators).

use std::fmt;

/// Maximum number of sub-authorities in a SID
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;

/// SID revision
pub const SID_REVISION: u8 = 1;

/// Identifier authority values
pub mod identifier_authority {
    pub const SECURITY_NULL_SID_AUTHORITY: u64 = 0;
    pub const SECURITY_WORLD_SID_AUTHORITY: u64 = 1;
    pub const SECURITY_LOCAL_SID_AUTHORITY: u64 = 2;
    pub const SECURITY_CREATOR_SID_AUTHORITY: u64 = 3;
    pub const SECURITY_NON_UNIQUE_AUTHORITY: u64 = 4;
    pub const SECURITY_NT_AUTHORITY: u64 = 5;
    pub const SECURITY_APP_PACKAGE_AUTHORITY: u64 = 15;
    pub const SECURITY_MANDATORY_LABEL_AUTHORITY: u64 = 16;
}

use identifier_authority::*;

/// SDDL aliases and the SIDs they stand for.
const WELL_KNOWN: &[(&str, u64, &[u32])] = &[
    ("WD", SECURITY_WORLD_SID_AUTHORITY, &[0]),
    ("CO", SECURITY_CREATOR_SID_AUTHORITY, &[0]),
    ("CG", SECURITY_CREATOR_SID_AUTHORITY, &[1]),
    ("OW", SECURITY_CREATOR_SID_AUTHORITY, &[4]),
    ("NU", SECURITY_NT_AUTHORITY, &[2]),
    ("IU", SECURITY_NT_AUTHORITY, &[4]),
    ("SU", SECURITY_NT_AUTHORITY, &[6]),
    ("AN", SECURITY_NT_AUTHORITY, &[7]),
    ("ED", SECURITY_NT_AUTHORITY, &[9]),
    ("PS", SECURITY_NT_AUTHORITY, &[10]),
    ("AU", SECURITY_NT_AUTHORITY, &[11]),
    ("RC", SECURITY_NT_AUTHORITY, &[12]),
    ("WR", SECURITY_NT_AUTHORITY, &[33]),
    ("SY", SECURITY_NT_AUTHORITY, &[18]),
    ("LS", SECURITY_NT_AUTHORITY, &[19]),
    ("NS", SECURITY_NT_AUTHORITY, &[20]),
    ("BA", SECURITY_NT_AUTHORITY, &[32, 544]),
    ("BU", SECURITY_NT_AUTHORITY, &[32, 545]),
    ("BG", SECURITY_NT_AUTHORITY, &[32, 546]),
    ("PU", SECURITY_NT_AUTHORITY, &[32, 547]),
    ("AO", SECURITY_NT_AUTHORITY, &[32, 548]),
    ("SO", SECURITY_NT_AUTHORITY, &[32, 549]),
    ("PO", SECURITY_NT_AUTHORITY, &[32, 550]),
    ("BO", SECURITY_NT_AUTHORITY, &[32, 551]),
    ("RU", SECURITY_NT_AUTHORITY, &[32, 554]),
    ("RD", SECURITY_NT_AUTHORITY, &[32, 555]),
    ("NO", SECURITY_NT_AUTHORITY, &[32, 556]),
    ("MU", SECURITY_NT_AUTHORITY, &[32, 558]),
    ("LU", SECURITY_NT_AUTHORITY, &[32, 559]),
    ("IS", SECURITY_NT_AUTHORITY, &[32, 568]),
    ("CY", SECURITY_NT_AUTHORITY, &[32, 569]),
    ("ER", SECURITY_NT_AUTHORITY, &[32, 573]),
    ("AC", SECURITY_APP_PACKAGE_AUTHORITY, &[2, 1]),
    ("LW", SECURITY_MANDATORY_LABEL_AUTHORITY, &[4096]),
    ("ME", SECURITY_MANDATORY_LABEL_AUTHORITY, &[8192]),
    ("HI", SECURITY_MANDATORY_LABEL_AUTHORITY, &[12288]),
    ("SI", SECURITY_MANDATORY_LABEL_AUTHORITY, &[16384]),
];

/// Security identifier of a principal (user, group or computer).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// Create a SID from its authority and sub-authorities.
    pub fn create(authority: u64, sub_authorities: &[u32]) -> Option<Self> {
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES || authority >= 1 << 48 {
            return None;
        }
        Some(Self {
            authority,
            sub_authorities: sub_authorities.to_vec(),
        })
    }

    /// Everyone (S-1-1-0).
    pub fn everyone() -> Self {
        Self::well_known("WD")
    }

    /// Builtin Administrators (S-1-5-32-544).
    pub fn builtin_administrators() -> Self {
        Self::well_known("BA")
    }

    /// Authenticated Users (S-1-5-11).
    pub fn authenticated_users() -> Self {
        Self::well_known("AU")
    }

    /// Local System (S-1-5-18).
    pub fn local_system() -> Self {
        Self::well_known("SY")
    }

    fn well_known(alias: &str) -> Self {
        Self::from_alias(alias).unwrap_or_else(|| Self {
            authority: SECURITY_NULL_SID_AUTHORITY,
            sub_authorities: vec![0],
        })
    }

    /// Resolve a two-letter SDDL alias.
    pub fn from_alias(alias: &str) -> Option<Self> {
        WELL_KNOWN
            .iter()
            .find(|(name, _, _)| *name == alias)
            .map(|(_, authority, subs)| Self {
                authority: *authority,
                sub_authorities: subs.to_vec(),
            })
    }

    /// Two-letter SDDL alias of this SID, if it has one.
    pub fn alias(&self) -> Option<&'static str> {
        WELL_KNOWN
            .iter()
            .find(|(_, authority, subs)| {
                *authority == self.authority && *subs == self.sub_authorities.as_slice()
            })
            .map(|(name, _, _)| *name)
    }

    /// Parse an alias or an `S-1-…` string.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(sid) = Self::from_alias(text) {
            return Some(sid);
        }

        let mut parts = text.split('-');
        if !matches!(parts.next(), Some("S") | Some("s")) {
            return None;
        }
        let revision: u8 = parts.next()?.parse().ok()?;
        if revision != SID_REVISION {
            return None;
        }
        let authority_text = parts.next()?;
        let authority = match authority_text
            .strip_prefix("0x")
            .or_else(|| authority_text.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16).ok()?,
            None => authority_text.parse().ok()?,
        };
        let subs = parts
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Self::create(authority, &subs)
    }

    pub fn authority(&self) -> u64 {
        self.authority
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Last sub-authority (the relative identifier).
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", SID_REVISION)?;
        if self.authority >= 1 << 32 {
            write!(f, "0x{:012X}", self.authority)?;
        } else {
            write!(f, "{}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}
