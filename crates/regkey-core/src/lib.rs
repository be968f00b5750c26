//! regkey - Typed key handles over the hierarchical registry store.
//!
//! A [`RegKey`] addresses a key by root scope plus a `\`-delimited path and
//! offers typed reads and writes of its values, parent/child navigation,
//! flat and recursive enumeration, and replacement of its security
//! descriptor. All store access goes through a [`RegistryBackend`]:
//! [`MemoryRegistry`] runs anywhere, `WindowsRegistry` talks to the system
//! registry on Windows.
//!
//! # Example
//!
//! ```rust
//! use regkey::{AccessMask, MemoryRegistry, RegKey, RootKey};
//! use std::sync::Arc;
//!
//! fn main() -> regkey::Result<()> {
//!     let backend = Arc::new(MemoryRegistry::new());
//!
//!     let mut key = RegKey::new(backend);
//!     key.create(RootKey::CurrentUser, "Software\\Example", AccessMask::ALL_ACCESS)?;
//!     key.write_sz("Greeting", "hello")?;
//!     key.write_dword("Retries", 3)?;
//!
//!     assert_eq!(key.read_sz("Greeting")?, "hello");
//!     key.enum_value(|_, name, value_type| println!("{name}: {value_type}"))?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod key;
pub mod security;
pub mod types;

// Re-export commonly used types
pub use backend::{MemoryRegistry, RegistryBackend};
#[cfg(windows)]
pub use backend::WindowsRegistry;
pub use config::{RegKeyConfig, RegistryLimits, DEFAULT_VALUE, SECURITY_LOCK, SECURITY_UNLOCK};
pub use convert::{bytes_to_hex, hex_nibble, hex_to_bytes, root_name_from_raw};
pub use error::{OsError, RegError, Result};
pub use key::{RegKey, Subkeys, Values};
pub use security::{SddlError, SecurityDescriptor, Sid};
pub use types::{AccessMask, RawKey, RootKey, ValueEntry, ValueInfo, ValueType};
