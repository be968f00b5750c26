//! Integration tests for RegKey over the in-memory backend.
//!
//! These exercise the public surface the way callers use it: open a key,
//! write and read typed values, navigate, enumerate and change security.

use regkey::{
    AccessMask, MemoryRegistry, RegError, RegKey, RegKeyConfig, RootKey, ValueType, DEFAULT_VALUE,
    SECURITY_LOCK, SECURITY_UNLOCK,
};
use std::sync::Arc;

/// Helper to build a registry and an open key under HKCU.
fn open(path: &str) -> (Arc<MemoryRegistry>, RegKey) {
    let reg = Arc::new(MemoryRegistry::new());
    let mut key = RegKey::new(reg.clone());
    key.create(RootKey::CurrentUser, path, AccessMask::ALL_ACCESS).unwrap();
    (reg, key)
}

fn strict() -> RegKeyConfig {
    RegKeyConfig {
        strict_recursion: true,
        ..Default::default()
    }
}

#[test]
fn test_open_close_lifecycle() {
    let (reg, mut key) = open("Software\\Lifecycle");
    assert!(key.is_open());
    assert_eq!(key.root(), Some(RootKey::CurrentUser));
    assert_eq!(key.path(), "Software\\Lifecycle");

    key.close().unwrap();
    assert!(!key.is_open());
    assert!(reg.key_exists(RootKey::CurrentUser, "Software\\Lifecycle"));
}

#[test]
fn test_open_missing_path() {
    let reg = Arc::new(MemoryRegistry::new());
    let mut key = RegKey::new(reg.clone());
    assert_eq!(
        key.open(RootKey::LocalMachine, "Never\\Created", AccessMask::READ),
        Err(RegError::PathNotExist)
    );
    assert!(!key.is_open());
    assert!(!reg.key_exists(RootKey::LocalMachine, "Never"));
}

#[test]
fn test_text_round_trip_and_type_check() {
    let (_reg, key) = open("Text");
    key.write_sz("greeting", "hello").unwrap();
    assert_eq!(key.read_sz("greeting").unwrap(), "hello");
    assert_eq!(key.read_dword("greeting"), Err(RegError::IncorrectType));

    let info = key.type_size("greeting").unwrap();
    assert_eq!(info.value_type, ValueType::Sz);
    assert_eq!(info.size, 6);
}

#[test]
fn test_too_long_text_leaves_value_unchanged() {
    let (_reg, key) = open("Text");
    key.write_sz("name", "short").unwrap();
    assert_eq!(
        key.write_sz("name", &"x".repeat(256)),
        Err(RegError::StrTooLong)
    );
    assert_eq!(key.read_sz("name").unwrap(), "short");
}

#[test]
fn test_binary_hex_round_trip() {
    let (_reg, key) = open("Binary");
    key.write_binary("boot", "EB589033907C").unwrap();
    assert_eq!(key.read_binary("boot").unwrap(), "EB589033907C");
    assert_eq!(key.type_size("boot").unwrap().size, 6);

    // Odd trailing digit is dropped
    key.write_binary("odd", "ABC").unwrap();
    assert_eq!(key.read_binary("odd").unwrap(), "AB");

    key.write_binary("lower", "0a0b").unwrap();
    assert_eq!(key.read_binary("lower").unwrap(), "0A0B");
}

#[test]
fn test_multi_sz_round_trip() {
    let (_reg, key) = open("Multi");
    key.write_multi_sz("list", &["a", "bb", "ccc"]).unwrap();
    assert_eq!(
        key.read_multi_sz("list").unwrap(),
        vec!["a".to_string(), "bb".to_string(), "ccc".to_string()]
    );
    assert_eq!(key.type_size("list").unwrap().value_type, ValueType::MultiSz);
    assert_eq!(key.write_multi_sz("bad", &["a\0b"]), Err(RegError::InvalidValue));
}

#[test]
fn test_multi_sz_with_empty_entry() {
    let (_reg, key) = open("MultiEmpty");
    key.write_multi_sz("list", &["a", "", "b"]).unwrap();

    // The empty entry reads back as the end of the list
    assert_eq!(key.read_multi_sz("list").unwrap(), vec!["a".to_string()]);
    assert_eq!(key.type_size("list").unwrap().size, 6);
}

#[test]
fn test_text_limit_counts_characters() {
    let (_reg, key) = open("Wide");
    let text = "é".repeat(200);
    key.write_sz("accented", &text).unwrap();
    assert_eq!(key.read_sz("accented").unwrap(), text);

    assert_eq!(key.write_sz("long", &"é".repeat(256)), Err(RegError::StrTooLong));
    assert_eq!(key.type_size("long"), Err(RegError::ValueNotExist));

    let name = "ü".repeat(200);
    key.write_dword(&name, 1).unwrap();
    assert_eq!(key.read_dword(&name).unwrap(), 1);
}

#[test]
fn test_delete_value() {
    let (_reg, key) = open("Delete");
    assert_eq!(key.delete_value("missing"), Err(RegError::ValueNotExist));

    key.write_dword("count", 7).unwrap();
    key.delete_value("count").unwrap();
    assert_eq!(key.type_size("count"), Err(RegError::ValueNotExist));
}

#[test]
fn test_default_value_slot() {
    let (_reg, key) = open("Default");
    key.write_sz(DEFAULT_VALUE, "unnamed").unwrap();
    assert_eq!(key.read_sz("").unwrap(), "unnamed");

    let names: Vec<String> = key.values().map(|entry| entry.unwrap().name).collect();
    assert_eq!(names, vec![String::new()]);
}

#[test]
fn test_delete_key() {
    let (reg, mut key) = open("Parent\\Leaf");
    key.delete().unwrap();
    assert!(!key.is_open());
    assert!(!reg.key_exists(RootKey::CurrentUser, "Parent\\Leaf"));
    assert!(reg.key_exists(RootKey::CurrentUser, "Parent"));

    let mut parent = RegKey::new(reg.clone());
    parent
        .open(RootKey::CurrentUser, "Parent", AccessMask::ALL_ACCESS)
        .unwrap();
    parent.child("Leaf", AccessMask::READ).unwrap_err();
}

#[test]
fn test_delete_after_removed_elsewhere() {
    let (reg, mut key) = open("Gone");
    let mut other = RegKey::new(reg.clone());
    other
        .open(RootKey::CurrentUser, "Gone", AccessMask::ALL_ACCESS)
        .unwrap();

    key.delete().unwrap();
    assert_eq!(other.delete(), Err(RegError::PathNotExist));
    assert!(!reg.key_exists(RootKey::CurrentUser, "Gone"));
}

#[test]
fn test_delete_key_with_subkeys_is_denied() {
    let (reg, _leaf) = open("Branch\\Leaf");
    let mut branch = RegKey::new(reg.clone());
    branch
        .open(RootKey::CurrentUser, "Branch", AccessMask::ALL_ACCESS)
        .unwrap();
    assert_eq!(branch.delete(), Err(RegError::AccessDenied));
    assert!(branch.is_open());
}

#[test]
fn test_parent_at_root_level() {
    let (_reg, key) = open("TopLevel");
    assert_eq!(key.parent(AccessMask::READ).unwrap_err(), RegError::KeyIsRoot);
}

#[test]
fn test_parent_and_child_navigation() {
    let (_reg, key) = open("A\\B\\C");
    let parent = key.parent(AccessMask::READ).unwrap();
    assert_eq!(parent.path(), "A\\B");
    assert_eq!(parent.access(), AccessMask::READ);

    let back = parent.child("C", AccessMask::ALL_ACCESS).unwrap();
    assert_eq!(back.path(), "A\\B\\C");
    assert_eq!(back.to_string(), "HKEY_CURRENT_USER\\A\\B\\C");
}

#[test]
fn test_enum_all_value_visits_own_values_first() {
    let (reg, root) = open("Tree");
    root.write_sz("top1", "x").unwrap();
    root.write_dword("top2", 2).unwrap();

    let child = RegKey::connect(
        reg.clone(),
        RootKey::CurrentUser,
        "Tree\\Child",
        AccessMask::ALL_ACCESS,
        true,
    );
    child.write_sz("inner", "y").unwrap();
    let grandchild = RegKey::connect(
        reg.clone(),
        RootKey::CurrentUser,
        "Tree\\Child\\Deep",
        AccessMask::ALL_ACCESS,
        true,
    );
    grandchild.write_qword("deepest", 3).unwrap();

    let mut seen = Vec::new();
    root.enum_all_value(|owner, name, value_type| {
        seen.push((owner.path().to_string(), name.to_string(), value_type));
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![
            ("Tree".to_string(), "top1".to_string(), ValueType::Sz),
            ("Tree".to_string(), "top2".to_string(), ValueType::Dword),
            ("Tree\\Child".to_string(), "inner".to_string(), ValueType::Sz),
            ("Tree\\Child\\Deep".to_string(), "deepest".to_string(), ValueType::Qword),
        ]
    );
}

#[test]
fn test_enum_all_key_visits_name_before_descendants() {
    let (reg, root) = open("Walk");
    for path in ["Walk\\A", "Walk\\A\\A1", "Walk\\B"] {
        RegKey::connect(reg.clone(), RootKey::CurrentUser, path, AccessMask::ALL_ACCESS, true);
    }

    let mut seen = Vec::new();
    root.enum_all_key(|parent, name| seen.push(format!("{}\\{}", parent.path(), name)))
        .unwrap();
    assert_eq!(seen, vec!["Walk\\A", "Walk\\A\\A1", "Walk\\B"]);

    let mut direct = Vec::new();
    root.enum_key(|_, name| direct.push(name.to_string())).unwrap();
    assert_eq!(direct, vec!["A", "B"]);
}

#[test]
fn test_iterators() {
    let (reg, key) = open("Iter");
    key.write_sz("one", "1").unwrap();
    key.write_binary("two", "02").unwrap();
    RegKey::connect(reg.clone(), RootKey::CurrentUser, "Iter\\Sub", AccessMask::ALL_ACCESS, true);

    let values: Vec<_> = key.values().collect::<regkey::Result<_>>().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1].name, "two");
    assert_eq!(values[1].value_type, ValueType::Binary);

    let subkeys: Vec<String> = key.subkeys().collect::<regkey::Result<_>>().unwrap();
    assert_eq!(subkeys, vec!["Sub".to_string()]);

    let closed = RegKey::new(reg);
    let mut iter = closed.values();
    assert_eq!(iter.next(), Some(Err(RegError::KeyNotOpened)));
    assert_eq!(iter.next(), None);
}

#[test]
fn test_enumeration_without_rights_terminates() {
    let (reg, _key) = open("NoEnum\\Child");
    let mut key = RegKey::new(reg.clone());
    key.open(RootKey::CurrentUser, "NoEnum", AccessMask::QUERY_VALUE)
        .unwrap();

    let results: Vec<_> = key.subkeys().collect();
    assert_eq!(results, vec![Err(RegError::AccessDenied)]);

    let mut visited = 0;
    assert_eq!(key.enum_key(|_, _| visited += 1), Err(RegError::AccessDenied));
    assert_eq!(visited, 0);
}

#[test]
fn test_long_names_are_skipped() {
    let reg = Arc::new(MemoryRegistry::new());
    let config = RegKeyConfig {
        enum_name_capacity: 8,
        ..Default::default()
    };
    let mut key = RegKey::with_config(reg, config);
    key.create(RootKey::CurrentUser, "Names", AccessMask::ALL_ACCESS)
        .unwrap();
    key.write_sz("short", "a").unwrap();
    key.write_sz("much_too_long", "b").unwrap();
    key.write_sz("tiny", "c").unwrap();

    let mut names = Vec::new();
    let result = key.enum_value(|_, name, _| names.push(name.to_string()));
    assert_eq!(result, Err(RegError::UnknownError));
    assert_eq!(names, vec!["short", "tiny"]);
}

#[test]
fn test_clone_from_closed_source_keeps_destination() {
    let (reg, mut dest) = open("Dest");
    let source = RegKey::new(reg);
    dest.clone_from(&source);
    assert!(dest.is_open());
    assert_eq!(dest.path(), "Dest");
}

#[test]
fn test_clone_from_open_source_replaces_destination() {
    let (reg, mut dest) = open("Dest");
    let source = RegKey::connect(reg.clone(), RootKey::Users, "Source", AccessMask::READ, true);
    dest.clone_from(&source);
    assert_eq!(dest.root(), Some(RootKey::Users));
    assert_eq!(dest.path(), "Source");
    assert_eq!(dest.access(), AccessMask::READ);
    assert_eq!(reg.open_handles(), 2);
}

#[test]
fn test_lock_and_unlock() {
    let (reg, key) = open("Secure");
    key.write_sz("before", "v").unwrap();
    key.set_security(SECURITY_LOCK).unwrap();

    let mut full = RegKey::new(reg.clone());
    assert_eq!(
        full.open(RootKey::CurrentUser, "Secure", AccessMask::ALL_ACCESS),
        Err(RegError::UnknownError)
    );

    let mut reader = RegKey::new(reg.clone());
    reader
        .open(RootKey::CurrentUser, "Secure", AccessMask::READ)
        .unwrap();
    assert_eq!(reader.read_sz("before").unwrap(), "v");
    assert_eq!(reader.write_sz("after", "v"), Err(RegError::AccessDenied));

    // The owner can still rewrite the DACL
    let mut admin = RegKey::new(reg.clone());
    admin
        .open(
            RootKey::CurrentUser,
            "Secure",
            AccessMask::READ | AccessMask::WRITE_DAC,
        )
        .unwrap();
    admin.set_security(SECURITY_UNLOCK).unwrap();

    full.open(RootKey::CurrentUser, "Secure", AccessMask::ALL_ACCESS)
        .unwrap();
    full.write_sz("after", "v").unwrap();
}

#[test]
fn test_invalid_descriptor_text() {
    let (reg, key) = open("Secure");
    assert_eq!(key.set_security("not a descriptor"), Err(RegError::UnknownError));
    assert_eq!(key.set_security("D:(A;;ZZ;;;WD)"), Err(RegError::UnknownError));

    let descriptor = reg.security_of(RootKey::CurrentUser, "Secure").unwrap();
    assert!(!descriptor.has_dacl());
}

#[test]
fn test_object_entries_round_trip_through_set_security() {
    let (reg, key) = open("Objects");
    let text = "D:(OA;;KR;bf967aba-0de6-11d0-a285-00aa003049e2;;WD)(A;;KA;;;BA)";
    key.set_security(text).unwrap();

    let descriptor = reg.security_of(RootKey::CurrentUser, "Objects").unwrap();
    let aces = descriptor.dacl.unwrap().aces;
    assert_eq!(aces.len(), 2);
    assert_eq!(
        aces[0].object_type.map(|guid| guid.to_string()),
        Some("bf967aba-0de6-11d0-a285-00aa003049e2".to_string())
    );
    assert_eq!(aces[1].object_type, None);
}

#[test]
fn test_set_security_needs_write_dac() {
    let (reg, _key) = open("Secure");
    let mut reader = RegKey::new(reg);
    reader
        .open(RootKey::CurrentUser, "Secure", AccessMask::READ)
        .unwrap();
    assert_eq!(reader.set_security(SECURITY_LOCK), Err(RegError::AccessDenied));
}

#[test]
fn test_recursion_over_locked_child() {
    let (reg, root) = open("Guarded");
    root.write_sz("visible", "v").unwrap();
    let locked = RegKey::connect(
        reg.clone(),
        RootKey::CurrentUser,
        "Guarded\\Locked",
        AccessMask::ALL_ACCESS,
        true,
    );
    locked.write_sz("hidden", "h").unwrap();
    locked.set_security(SECURITY_LOCK).unwrap();

    let mut names = Vec::new();
    root.enum_all_value(|_, name, _| names.push(name.to_string()))
        .unwrap();
    assert_eq!(names, vec!["visible"]);

    let mut strict_root = RegKey::with_config(reg.clone(), strict());
    strict_root
        .open(RootKey::CurrentUser, "Guarded", AccessMask::ALL_ACCESS)
        .unwrap();
    let mut strict_names = Vec::new();
    assert_eq!(
        strict_root.enum_all_value(|_, name, _| strict_names.push(name.to_string())),
        Err(RegError::UnknownError)
    );
    assert_eq!(strict_names, vec!["visible"]);

    let mut keys = Vec::new();
    assert_eq!(
        strict_root.enum_all_key(|_, name| keys.push(name.to_string())),
        Err(RegError::UnknownError)
    );
    assert_eq!(keys, vec!["Locked"]);
}

#[test]
fn test_error_codes() {
    assert_eq!(RegError::UnknownError.code(), -1);
    assert_eq!(RegError::KeyNotOpened.code(), -9);
    assert_eq!(RegError::KeyIsRoot.code(), -13);
    assert_eq!(RegError::from_code(-12), Some(RegError::BufferOverflow));
    assert_eq!(RegError::from_code(0), None);
    assert_eq!(RegError::from_code(-14), None);
}

#[test]
fn test_keys_share_one_store() {
    let (reg, writer) = open("Shared");
    writer.write_dword("n", 42).unwrap();

    let reader = RegKey::connect(reg, RootKey::CurrentUser, "shared", AccessMask::READ, false);
    assert!(reader.is_open());
    assert_eq!(reader.read_dword("N").unwrap(), 42);
}
