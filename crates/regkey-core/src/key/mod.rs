//! Registry key handles.
//!
//! A [`RegKey`] owns at most one backend handle. It is closed when created
//! with [`RegKey::new`], becomes open through [`RegKey::create`] or
//! [`RegKey::open`], and returns to closed through [`RegKey::close`],
//! [`RegKey::delete`] or drop.
//!
//! Cloning never duplicates the raw handle: the clone re-opens the same root,
//! path and access through the backend and owns its own handle.

mod enumerate;
mod values;

pub use enumerate::{Subkeys, Values};

use crate::backend::RegistryBackend;
use crate::config::{RegKeyConfig, RegistryLimits};
use crate::error::{OsError, RegError, Result};
use crate::types::{AccessMask, RawKey, RootKey};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle to one registry key.
pub struct RegKey {
    backend: Arc<dyn RegistryBackend>,
    config: RegKeyConfig,
    handle: Option<RawKey>,
    root: Option<RootKey>,
    path: String,
    access: AccessMask,
}

impl RegKey {
    /// Create a closed key bound to `backend`.
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self::with_config(backend, RegKeyConfig::default())
    }

    /// Create a closed key with custom configuration.
    pub fn with_config(backend: Arc<dyn RegistryBackend>, config: RegKeyConfig) -> Self {
        Self {
            backend,
            config,
            handle: None,
            root: None,
            path: String::new(),
            access: AccessMask::default(),
        }
    }

    /// Create a key and immediately create or open it.
    ///
    /// Failures are not reported: the returned key is simply closed. Paths
    /// over the length limit never reach the backend.
    pub fn connect(
        backend: Arc<dyn RegistryBackend>,
        root: RootKey,
        path: &str,
        access: AccessMask,
        create_if_not_exist: bool,
    ) -> Self {
        let mut key = Self::new(backend);
        if path.chars().count() > RegistryLimits::MAX_PATH {
            return key;
        }

        let result = if create_if_not_exist {
            key.create(root, path, access)
        } else {
            key.open(root, path, access)
        };
        if let Err(err) = result {
            debug!("Connect to {}\\{} left key closed: {}", root, path, err);
        }
        key
    }

    /// Open a key, creating it and any missing ancestors first.
    ///
    /// An already open key is closed first, so on failure the key is closed.
    pub fn create(&mut self, root: RootKey, path: &str, access: AccessMask) -> Result<()> {
        self.attach(root, path, access, true)
    }

    /// Open an existing key.
    ///
    /// Fails with [`RegError::PathNotExist`] if no key exists at `path`. An
    /// already open key is closed first.
    pub fn open(&mut self, root: RootKey, path: &str, access: AccessMask) -> Result<()> {
        self.attach(root, path, access, false)
    }

    /// [`create`](Self::create) with a raw predefined root identifier.
    pub fn create_raw(&mut self, root: u32, path: &str, access: AccessMask) -> Result<()> {
        let root = RootKey::try_from(root)?;
        self.create(root, path, access)
    }

    /// [`open`](Self::open) with a raw predefined root identifier.
    pub fn open_raw(&mut self, root: u32, path: &str, access: AccessMask) -> Result<()> {
        let root = RootKey::try_from(root)?;
        self.open(root, path, access)
    }

    fn attach(
        &mut self,
        root: RootKey,
        path: &str,
        access: AccessMask,
        create: bool,
    ) -> Result<()> {
        if self.is_open() {
            if let Err(err) = self.close() {
                warn!("Failed to release previous handle of {}: {}", self, err);
            }
        }
        if path.chars().count() > RegistryLimits::MAX_PATH {
            return Err(RegError::InvalidPath);
        }

        let result = if create {
            self.backend.create_key(root, path, access)
        } else {
            self.backend.open_key(root, path, access)
        };

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.root = Some(root);
                self.path = path.to_string();
                self.access = access;
                debug!("Opened {}", self);
                Ok(())
            }
            Err(err) => {
                debug!("Failed to open {}\\{}: {}", root, path, err);
                Err(match err {
                    OsError::InvalidHandle => RegError::InvalidRoot,
                    OsError::NotFound if !create => RegError::PathNotExist,
                    _ => RegError::UnknownError,
                })
            }
        }
    }

    /// Release the handle.
    ///
    /// The key is closed afterwards even if the backend fails to release it.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(RegError::KeyNotOpened)?;
        let result = self.backend.close_key(handle);
        if let Err(err) = &result {
            warn!("Failed to close {}: {}", self, err);
        }

        self.root = None;
        self.path.clear();
        self.access = AccessMask::default();
        result.map_err(|_| RegError::UnknownError)
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Root scope, or `None` while closed.
    pub fn root(&self) -> Option<RootKey> {
        self.root
    }

    /// Root-relative path, empty while closed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Access the key was opened with.
    pub fn access(&self) -> AccessMask {
        self.access
    }

    pub fn config(&self) -> &RegKeyConfig {
        &self.config
    }

    /// Open the parent key.
    ///
    /// Fails with [`RegError::KeyIsRoot`] if the path has no separator.
    pub fn parent(&self, access: AccessMask) -> Result<RegKey> {
        let (parent, _) = self.path.rsplit_once('\\').ok_or(RegError::KeyIsRoot)?;
        self.open_sibling(parent, access)
    }

    /// Open the direct child `name`.
    pub fn child(&self, name: &str, access: AccessMask) -> Result<RegKey> {
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}\\{}", self.path, name)
        };
        self.open_sibling(&path, access)
    }

    /// Open another key under the same root with the same backend and config.
    fn open_sibling(&self, path: &str, access: AccessMask) -> Result<RegKey> {
        let root = self.root.ok_or(RegError::InvalidRoot)?;
        let mut key = RegKey::with_config(Arc::clone(&self.backend), self.config);
        key.open(root, path, access)?;
        Ok(key)
    }

    /// Replace the discretionary ACL from descriptor text.
    ///
    /// See [`SECURITY_LOCK`](crate::config::SECURITY_LOCK) and
    /// [`SECURITY_UNLOCK`](crate::config::SECURITY_UNLOCK) for canned policies.
    ///
    /// Text the backend cannot parse fails with [`RegError::UnknownError`].
    pub fn set_security(&self, sddl: &str) -> Result<()> {
        let handle = self.handle()?;
        self.backend
            .set_key_security(handle, sddl)
            .map_err(RegError::from_write_os)
    }

    pub(crate) fn handle(&self) -> Result<RawKey> {
        self.handle.ok_or(RegError::KeyNotOpened)
    }

    pub(crate) fn backend(&self) -> &dyn RegistryBackend {
        self.backend.as_ref()
    }
}

impl Clone for RegKey {
    fn clone(&self) -> Self {
        let mut copy = RegKey::with_config(Arc::clone(&self.backend), self.config);
        copy.clone_from(self);
        copy
    }

    /// Re-open the source's key into `self`.
    ///
    /// Does nothing if the source is closed or its path is over the limit.
    fn clone_from(&mut self, source: &Self) {
        let Some(root) = source.root.filter(|_| source.is_open()) else {
            return;
        };
        if source.path.chars().count() > RegistryLimits::MAX_PATH {
            return;
        }

        if self.is_open() {
            if let Err(err) = self.close() {
                warn!("Failed to release handle before copy: {}", err);
            }
        }
        self.backend = Arc::clone(&source.backend);
        self.config = source.config;
        if let Err(err) = self.open(root, &source.path, source.access) {
            warn!("Failed to reopen copy of {}: {}", source, err);
        }
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.backend.close_key(handle) {
                warn!("Failed to close {} on drop: {}", self, err);
            }
        }
    }
}

impl fmt::Display for RegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) if self.path.is_empty() => write!(f, "{}", root),
            Some(root) => write!(f, "{}\\{}", root, self.path),
            None => f.write_str("<closed>"),
        }
    }
}

impl fmt::Debug for RegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegKey")
            .field("root", &self.root)
            .field("path", &self.path)
            .field("access", &self.access)
            .field("open", &self.is_open())
            .finish()
    }
}
