//! Security descriptors for registry keys.
//!
//! Provides a model of SIDs, ACLs and descriptors together with a parser for
//! the descriptor definition language used by `RegKey::set_security`. The
//! in-process backend parses descriptor text with it and evaluates the
//! result when keys are opened; the Win32 backend hands the text to the OS.

pub mod acl;
pub mod descriptor;
pub mod sid;

pub use acl::{rights, Ace, AceType, Acl};
pub use descriptor::{SddlError, SecurityDescriptor};
pub use sid::Sid;
