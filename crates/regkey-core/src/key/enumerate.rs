//! Enumeration of values and subkeys.
//!
//! Two styles are offered. The pull iterators [`RegKey::values`] and
//! [`RegKey::subkeys`] yield one entry per index until the store reports no
//! more items. The push visitors (`enum_*`) walk the same sequence, invoke a
//! callback per entry and report the last error seen.
//!
//! A per-entry failure (such as a name that does not fit the name buffer)
//! skips that entry and enumeration continues with the next index. A failure
//! of the key itself (access denied, handle invalidated) ends enumeration.

use super::RegKey;
use crate::error::{OsError, RegError, Result};
use crate::types::{ValueEntry, ValueType};
use tracing::warn;

fn enum_error(err: OsError) -> (RegError, bool) {
    let fatal = !matches!(err, OsError::MoreData);
    (RegError::from_write_os(err), fatal)
}

/// Iterator over the values of a key. Created by [`RegKey::values`].
pub struct Values<'a> {
    key: &'a RegKey,
    index: u32,
    done: bool,
}

impl Iterator for Values<'_> {
    type Item = Result<ValueEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let handle = match self.key.handle() {
            Ok(handle) => handle,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        let capacity = self.key.config().enum_name_capacity;
        match self.key.backend().enum_value(handle, self.index, capacity) {
            Ok(Some((name, value_type))) => {
                self.index += 1;
                Some(Ok(ValueEntry { name, value_type }))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                let (err, fatal) = enum_error(err);
                self.index += 1;
                self.done = fatal;
                Some(Err(err))
            }
        }
    }
}

/// Iterator over the names of a key's direct subkeys. Created by
/// [`RegKey::subkeys`].
pub struct Subkeys<'a> {
    key: &'a RegKey,
    index: u32,
    done: bool,
}

impl Iterator for Subkeys<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let handle = match self.key.handle() {
            Ok(handle) => handle,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };

        let capacity = self.key.config().enum_name_capacity;
        match self.key.backend().enum_key(handle, self.index, capacity) {
            Ok(Some(name)) => {
                self.index += 1;
                Some(Ok(name))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                let (err, fatal) = enum_error(err);
                self.index += 1;
                self.done = fatal;
                Some(Err(err))
            }
        }
    }
}

type ValueVisitor<'v> = dyn FnMut(&RegKey, &str, ValueType) + 'v;
type KeyVisitor<'v> = dyn FnMut(&RegKey, &str) + 'v;

impl RegKey {
    /// Iterate over this key's values in store order.
    pub fn values(&self) -> Values<'_> {
        Values {
            key: self,
            index: 0,
            done: false,
        }
    }

    /// Iterate over the names of this key's direct subkeys.
    pub fn subkeys(&self) -> Subkeys<'_> {
        Subkeys {
            key: self,
            index: 0,
            done: false,
        }
    }

    /// Visit every value of this key.
    pub fn enum_value<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&RegKey, &str, ValueType),
    {
        self.handle()?;
        let mut last = Ok(());
        for entry in self.values() {
            match entry {
                Ok(entry) => visit(self, &entry.name, entry.value_type),
                Err(err) => last = Err(err),
            }
        }
        last
    }

    /// Visit the name of every direct subkey.
    pub fn enum_key<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&RegKey, &str),
    {
        self.handle()?;
        let mut last = Ok(());
        for name in self.subkeys() {
            match name {
                Ok(name) => visit(self, &name),
                Err(err) => last = Err(err),
            }
        }
        last
    }

    /// Visit every value in this key's subtree.
    ///
    /// A key's own values are visited before any of its subkeys are entered.
    /// Subkeys are opened with this key's access; the visitor receives the
    /// key that owns each value.
    pub fn enum_all_value<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&RegKey, &str, ValueType),
    {
        self.walk_values(&mut visit)
    }

    /// Visit every key name in this key's subtree.
    ///
    /// Each subkey's name is visited before its own subkeys.
    pub fn enum_all_key<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&RegKey, &str),
    {
        self.walk_keys(&mut visit)
    }

    fn walk_values(&self, visit: &mut ValueVisitor<'_>) -> Result<()> {
        self.handle()?;
        let strict = self.config().strict_recursion;
        let own = self.enum_value(&mut *visit);
        let mut last = if strict { own } else { Ok(()) };

        for name in self.subkeys() {
            let name = match name {
                Ok(name) => name,
                Err(err) => {
                    last = Err(err);
                    continue;
                }
            };
            match self.child(&name, self.access()) {
                Ok(child) => {
                    let result = child.walk_values(visit);
                    if strict {
                        if let Err(err) = result {
                            last = Err(err);
                        }
                    }
                }
                Err(err) => {
                    warn!("Skipping subkey {} of {}: {}", name, self, err);
                    if strict {
                        last = Err(err);
                    }
                }
            }
        }
        last
    }

    fn walk_keys(&self, visit: &mut KeyVisitor<'_>) -> Result<()> {
        self.handle()?;
        let strict = self.config().strict_recursion;
        let mut last = Ok(());

        for name in self.subkeys() {
            let name = match name {
                Ok(name) => name,
                Err(err) => {
                    last = Err(err);
                    continue;
                }
            };
            visit(self, &name);
            match self.child(&name, self.access()) {
                Ok(child) => {
                    let result = child.walk_keys(visit);
                    if strict {
                        if let Err(err) = result {
                            last = Err(err);
                        }
                    }
                }
                Err(err) => {
                    warn!("Skipping subkey {} of {}: {}", name, self, err);
                    if strict {
                        last = Err(err);
                    }
                }
            }
        }
        last
    }
}
