use std::collections::BTreeSet;
use std::sync::Arc;

use pathedit::{Error, MapEnv, MemoryStore, PathReader, PathScope, SharedEnv};
use tempfile::tempdir;

fn env() -> SharedEnv {
    Arc::new(MapEnv::new().with("SystemRoot", r"C:\Windows"))
}

#[test]
fn edit_and_save_keeps_placeholders_unexpanded() {
    let mut reader = PathReader::new(
        MemoryStore::with_paths(r"%SystemRoot%\system32;C:\Old;C:\Tools", r"C:\Sys"),
        false,
    );

    let mut list = reader.load(PathScope::User, env()).unwrap();
    assert_eq!(list.entries()[0].path_expanded(), r"C:\Windows\system32");

    list.get_mut(1).unwrap().set_enabled(false);
    list.push(r"%SystemRoot%\extra");
    reader.save(&list).unwrap();

    assert_eq!(
        reader.read_path(PathScope::User).unwrap(),
        r"%SystemRoot%\system32;C:\Tools;%SystemRoot%\extra"
    );
    assert_eq!(reader.read_path(PathScope::System).unwrap(), r"C:\Sys");
}

#[test]
fn reordering_and_dedupe_survive_a_reload() {
    let mut reader = PathReader::new(MemoryStore::with_paths(r"C:\b;C:\a;C:\b;c:\B\", ""), false);

    let mut list = reader.load(PathScope::User, env()).unwrap();
    assert_eq!(list.dedupe(), 1);
    let selection: BTreeSet<usize> = [1].into_iter().collect();
    list.move_up(&selection);
    reader.save(&list).unwrap();

    let reloaded = reader.load(PathScope::User, env()).unwrap();
    let paths: Vec<&str> = reloaded.entries().iter().map(|e| e.path()).collect();
    assert_eq!(paths, vec![r"C:\a", r"C:\b", r"c:\B\"]);
}

#[test]
fn unreadable_scope_is_an_error_not_an_empty_list() {
    let reader = PathReader::new(MemoryStore::new().with_value(PathScope::User, ""), false);

    let empty = reader.load(PathScope::User, env()).unwrap();
    assert!(empty.is_empty());

    let err = reader.load(PathScope::System, env()).unwrap_err();
    assert!(matches!(err, Error::RegistryKeyNotFound { .. }));
}

#[test]
fn unelevated_system_save_is_rejected_whole() {
    let mut reader = PathReader::new(
        MemoryStore::with_paths("u", r"C:\Windows;C:\Sys").elevated(false),
        false,
    );
    let mut list = reader.load(PathScope::System, env()).unwrap();
    list.push(r"C:\New");

    let err = reader.save(&list).unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
    assert_eq!(
        reader.read_path(PathScope::System).unwrap(),
        r"C:\Windows;C:\Sys"
    );
}

#[test]
fn existence_flags_reflect_the_disk_after_load() {
    let dir = tempdir().unwrap();
    let present = dir.path().to_string_lossy().into_owned();
    let absent = dir.path().join("gone").to_string_lossy().into_owned();
    let raw = format!("{present};{absent}");
    let reader = PathReader::new(MemoryStore::with_paths(&raw, ""), false);

    let list = reader.load(PathScope::User, env()).unwrap();
    assert!(list.entries()[0].exists());
    assert!(!list.entries()[1].exists());
    assert_eq!(list.missing(), vec![1]);
}
