//! In-process registry store.
//!
//! Keys live in an arena of nodes, one tree per root scope, each node holding
//! its parent index, its subkeys in creation order, its values in creation
//! order and its security descriptor. Names compare case-insensitively.
//! The slot of a deleted key is reused once no handle refers to it.
//!
//! Access is enforced per handle the way the OS does it: the rights requested
//! at open time are checked against the key's descriptor for the caller's
//! principals and then fixed for the life of the handle.

use super::RegistryBackend;
use crate::error::{OsError, OsResult};
use crate::security::{rights, SecurityDescriptor, Sid};
use crate::types::{AccessMask, RawKey, RootKey, ValueInfo, ValueType};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_INTERNAL_ERROR: u32 = 1359;

/// Longest key name component accepted.
const MAX_KEY_NAME: usize = 255;

const MAXIMUM_ALLOWED: u32 = 0x0200_0000;
const WOW64_FLAGS: u32 = 0x0000_0300;

/// First handle value issued; handles advance in steps of 4.
const FIRST_HANDLE: usize = 0x100;

struct StoredValue {
    name: String,
    value_type: ValueType,
    data: Vec<u8>,
}

struct KeyNode {
    name: String,
    parent: Option<usize>,
    subkeys: Vec<usize>,
    values: Vec<StoredValue>,
    security: SecurityDescriptor,
    deleted: bool,
}

impl KeyNode {
    fn new(name: &str, parent: Option<usize>, owner: &Sid) -> Self {
        Self {
            name: name.to_string(),
            parent,
            subkeys: Vec::new(),
            values: Vec::new(),
            security: SecurityDescriptor::owned_by(owner.clone()),
            deleted: false,
        }
    }

    fn value_index(&self, name: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(name))
    }
}

struct OpenKey {
    node: usize,
    granted: u32,
}

struct Store {
    nodes: Vec<KeyNode>,
    free: Vec<usize>,
    roots: HashMap<RootKey, usize>,
    handles: HashMap<usize, OpenKey>,
    next_handle: usize,
}

impl Store {
    fn new(owner: &Sid) -> Self {
        let mut nodes = Vec::with_capacity(RootKey::ALL.len());
        let mut roots = HashMap::new();
        for root in RootKey::ALL {
            roots.insert(root, nodes.len());
            nodes.push(KeyNode::new(root.name(), None, owner));
        }
        Self {
            nodes,
            free: Vec::new(),
            roots,
            handles: HashMap::new(),
            next_handle: FIRST_HANDLE,
        }
    }

    fn child(&self, node: usize, name: &str) -> Option<usize> {
        self.nodes[node]
            .subkeys
            .iter()
            .copied()
            .find(|&i| self.nodes[i].name.eq_ignore_ascii_case(name))
    }

    /// Store a new node, reusing a released slot if there is one.
    fn alloc(&mut self, node: KeyNode) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Release the slot of a deleted node that no handle refers to.
    fn release_if_unused(&mut self, node: usize) {
        let unused = !self.handles.values().any(|open| open.node == node);
        if self.nodes[node].deleted && unused && !self.free.contains(&node) {
            self.free.push(node);
        }
    }

    fn root(&self, root: RootKey) -> OsResult<usize> {
        self.roots.get(&root).copied().ok_or(OsError::InvalidHandle)
    }

    fn resolve(&self, root: RootKey, path: &str) -> OsResult<usize> {
        let mut node = self.root(root)?;
        for name in components(path)? {
            node = self.child(node, name).ok_or(OsError::NotFound)?;
        }
        Ok(node)
    }

    fn issue(&mut self, node: usize, granted: u32) -> RawKey {
        let handle = self.next_handle;
        self.next_handle += 4;
        self.handles.insert(handle, OpenKey { node, granted });
        RawKey(handle)
    }

    /// Node behind a handle, provided the handle holds every right in `required`.
    fn node_for(&self, key: RawKey, required: u32) -> OsResult<usize> {
        let open = self.handles.get(&key.0).ok_or(OsError::InvalidHandle)?;
        if self.nodes[open.node].deleted {
            return Err(OsError::KeyDeleted);
        }
        if open.granted & required != required {
            return Err(OsError::AccessDenied);
        }
        Ok(open.node)
    }

    fn path_of(&self, mut node: usize) -> String {
        let mut names = Vec::new();
        while let Some(parent) = self.nodes[node].parent {
            names.push(self.nodes[node].name.as_str());
            node = parent;
        }
        names.reverse();
        names.join("\\")
    }
}

/// Split a key path into its components, skipping empty segments.
fn components(path: &str) -> OsResult<Vec<&str>> {
    let names: Vec<&str> = path.split('\\').filter(|s| !s.is_empty()).collect();
    if names.iter().any(|n| n.chars().count() > MAX_KEY_NAME) {
        return Err(OsError::Other(ERROR_INVALID_PARAMETER));
    }
    Ok(names)
}

/// In-process registry.
///
/// Thread-safe via an internal mutex. Every caller acts as one fixed identity:
/// an owner SID, used as the owner of every key created, plus group SIDs.
pub struct MemoryRegistry {
    store: Mutex<Store>,
    principals: Vec<Sid>,
}

impl MemoryRegistry {
    /// Create an empty registry acting as an elevated administrator.
    pub fn new() -> Self {
        Self::with_identity(
            Sid::builtin_administrators(),
            vec![Sid::everyone(), Sid::authenticated_users()],
        )
    }

    /// Create an empty registry acting as `owner` with membership in `groups`.
    pub fn with_identity(owner: Sid, groups: Vec<Sid>) -> Self {
        let store = Store::new(&owner);
        let mut principals = Vec::with_capacity(groups.len() + 1);
        principals.push(owner);
        principals.extend(groups);
        Self {
            store: Mutex::new(store),
            principals,
        }
    }

    fn lock(&self) -> OsResult<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| OsError::Other(ERROR_INTERNAL_ERROR))
    }

    fn owner(&self) -> &Sid {
        &self.principals[0]
    }

    /// Rights a handle to `node` receives for the requested `access`.
    fn grant(&self, store: &Store, node: usize, access: AccessMask) -> OsResult<u32> {
        let available = store.nodes[node].security.granted(&self.principals);
        let requested = access.bits() & !WOW64_FLAGS;
        if requested & MAXIMUM_ALLOWED != 0 {
            return Ok(available);
        }
        let desired = rights::map_generic(requested);
        if desired & !available != 0 {
            return Err(OsError::AccessDenied);
        }
        Ok(desired)
    }

    /// Whether a key exists at `path`.
    pub fn key_exists(&self, root: RootKey, path: &str) -> bool {
        self.lock()
            .map(|store| store.resolve(root, path).is_ok())
            .unwrap_or(false)
    }

    /// Current descriptor of the key at `path`.
    pub fn security_of(&self, root: RootKey, path: &str) -> Option<SecurityDescriptor> {
        let store = self.lock().ok()?;
        let node = store.resolve(root, path).ok()?;
        Some(store.nodes[node].security.clone())
    }

    /// Number of handles issued and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.lock().map(|store| store.handles.len()).unwrap_or(0)
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBackend for MemoryRegistry {
    fn create_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey> {
        let mut store = self.lock()?;
        let mut node = store.root(root)?;

        for name in components(path)? {
            node = match store.child(node, name) {
                Some(existing) => existing,
                None => {
                    let parent_rights = store.nodes[node].security.granted(&self.principals);
                    if parent_rights & AccessMask::CREATE_SUB_KEY.bits() == 0 {
                        return Err(OsError::AccessDenied);
                    }
                    let index = store.alloc(KeyNode::new(name, Some(node), self.owner()));
                    store.nodes[node].subkeys.push(index);
                    debug!("Created key {}\\{}", root, store.path_of(index));
                    index
                }
            };
        }

        let granted = self.grant(&store, node, access)?;
        Ok(store.issue(node, granted))
    }

    fn open_key(&self, root: RootKey, path: &str, access: AccessMask) -> OsResult<RawKey> {
        let mut store = self.lock()?;
        let node = store.resolve(root, path)?;
        let granted = self.grant(&store, node, access)?;
        Ok(store.issue(node, granted))
    }

    fn close_key(&self, key: RawKey) -> OsResult<()> {
        let mut store = self.lock()?;
        let open = store.handles.remove(&key.0).ok_or(OsError::InvalidHandle)?;
        store.release_if_unused(open.node);
        Ok(())
    }

    fn set_value(
        &self,
        key: RawKey,
        name: &str,
        value_type: ValueType,
        data: &[u8],
    ) -> OsResult<()> {
        let mut store = self.lock()?;
        let node = store.node_for(key, AccessMask::SET_VALUE.bits())?;
        let key_node = &mut store.nodes[node];

        let value = StoredValue {
            name: name.to_string(),
            value_type,
            data: data.to_vec(),
        };
        match key_node.value_index(name) {
            Some(i) => key_node.values[i] = value,
            None => key_node.values.push(value),
        }
        Ok(())
    }

    fn query_value_info(&self, key: RawKey, name: &str) -> OsResult<ValueInfo> {
        let store = self.lock()?;
        let node = &store.nodes[store.node_for(key, AccessMask::QUERY_VALUE.bits())?];
        let value = &node.values[node.value_index(name).ok_or(OsError::NotFound)?];
        Ok(ValueInfo {
            value_type: value.value_type,
            size: value.data.len() as u32,
        })
    }

    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        capacity: usize,
    ) -> OsResult<(ValueType, Vec<u8>)> {
        let store = self.lock()?;
        let node = &store.nodes[store.node_for(key, AccessMask::QUERY_VALUE.bits())?];
        let value = &node.values[node.value_index(name).ok_or(OsError::NotFound)?];
        if value.data.len() > capacity {
            return Err(OsError::MoreData);
        }
        Ok((value.value_type, value.data.clone()))
    }

    fn delete_value(&self, key: RawKey, name: &str) -> OsResult<()> {
        let mut store = self.lock()?;
        let node = store.node_for(key, AccessMask::SET_VALUE.bits())?;
        let key_node = &mut store.nodes[node];
        let index = key_node.value_index(name).ok_or(OsError::NotFound)?;
        key_node.values.remove(index);
        Ok(())
    }

    fn delete_key(&self, key: RawKey, _access: AccessMask) -> OsResult<()> {
        let mut store = self.lock()?;
        let node = store.node_for(key, AccessMask::DELETE.bits())?;
        let parent = store.nodes[node].parent.ok_or(OsError::AccessDenied)?;
        if !store.nodes[node].subkeys.is_empty() {
            return Err(OsError::AccessDenied);
        }

        debug!("Deleted key {}", store.path_of(node));
        store.nodes[parent].subkeys.retain(|&i| i != node);
        let key_node = &mut store.nodes[node];
        key_node.deleted = true;
        key_node.values.clear();
        store.release_if_unused(node);
        Ok(())
    }

    fn enum_value(
        &self,
        key: RawKey,
        index: u32,
        name_capacity: usize,
    ) -> OsResult<Option<(String, ValueType)>> {
        let store = self.lock()?;
        let node = &store.nodes[store.node_for(key, AccessMask::QUERY_VALUE.bits())?];
        let Some(value) = node.values.get(index as usize) else {
            return Ok(None);
        };
        if value.name.chars().count() >= name_capacity {
            return Err(OsError::MoreData);
        }
        Ok(Some((value.name.clone(), value.value_type)))
    }

    fn enum_key(&self, key: RawKey, index: u32, name_capacity: usize) -> OsResult<Option<String>> {
        let store = self.lock()?;
        let node = store.node_for(key, AccessMask::ENUMERATE_SUB_KEYS.bits())?;
        let Some(&child) = store.nodes[node].subkeys.get(index as usize) else {
            return Ok(None);
        };
        let name = &store.nodes[child].name;
        if name.chars().count() >= name_capacity {
            return Err(OsError::MoreData);
        }
        Ok(Some(name.clone()))
    }

    fn set_key_security(&self, key: RawKey, sddl: &str) -> OsResult<()> {
        let descriptor = SecurityDescriptor::parse(sddl).map_err(|err| {
            debug!("Rejected descriptor {:?}: {}", sddl, err);
            OsError::InvalidData
        })?;
        let mut store = self.lock()?;
        let node = store.node_for(key, AccessMask::WRITE_DAC.bits())?;
        store.nodes[node].security.apply_dacl(&descriptor);
        Ok(())
    }
}
