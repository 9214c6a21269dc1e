//! Integration tests for staticnet-keystore persistence.

use staticnet_keystore::keyring_file::{read_keyring, write_keyring, KeyringEntry};
use staticnet_keystore::{AccountRef, KeyStore};
use staticnet_types::StaticNetError;

type TestResult = std::result::Result<(), StaticNetError>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// RAII guard that removes a temporary file on drop.
struct TempFile(std::path::PathBuf);

impl TempFile {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "staticnet_test_{name}_{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        Self(path)
    }

    fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn keys_survive_reopen() -> TestResult {
    let file = TempFile::new("reopen");

    let (self_id, blog_id) = {
        let store = KeyStore::open(file.path())?;
        let self_id = store.peer_identity(&AccountRef::self_account())?.id();
        let blog_id = store.get_or_create("blog")?;
        (self_id, blog_id)
    };

    let reopened = KeyStore::open(file.path())?;
    assert_eq!(reopened.id_by_name("self"), Some(self_id));
    assert_eq!(reopened.id_by_name("blog"), Some(blog_id));
    Ok(())
}

#[test]
fn removal_is_persisted() -> TestResult {
    let file = TempFile::new("removal");
    {
        let store = KeyStore::open(file.path())?;
        store.import("blog", &[0x42; 32])?;
        store.remove("blog")?;
    }
    let reopened = KeyStore::open(file.path())?;
    assert_eq!(reopened.id_by_name("blog"), None);
    Ok(())
}

#[test]
fn missing_file_is_empty_store() -> TestResult {
    let file = TempFile::new("missing");
    let store = KeyStore::open(file.path())?;
    assert!(store.list().is_empty());
    assert!(!file.path().exists());
    Ok(())
}

#[test]
fn imported_seed_yields_same_id_after_reopen() -> TestResult {
    let file = TempFile::new("import");
    let id = KeyStore::open(file.path())?.import("blog", &[0x07; 32])?;
    let entries = read_keyring(file.path())?;
    assert_eq!(entries.len(), 1);
    assert_eq!(*entries[0].seed()?, [0x07; 32]);
    assert_eq!(KeyStore::open(file.path())?.id_by_name("blog"), Some(id));
    Ok(())
}

#[test]
fn unsupported_version_is_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = TempFile::new("version");
    std::fs::write(file.path(), r#"{"version": 9, "keys": []}"#)?;
    assert!(matches!(
        KeyStore::open(file.path()),
        Err(StaticNetError::StorageError { .. })
    ));
    Ok(())
}

#[test]
fn corrupt_seed_is_rejected() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let file = TempFile::new("corrupt");
    std::fs::write(
        file.path(),
        r#"{"version": 1, "keys": [{"name": "blog", "seed": "abcd"}]}"#,
    )?;
    assert!(KeyStore::open(file.path()).is_err());
    Ok(())
}

#[test]
fn written_keyring_reads_back() -> TestResult {
    let file = TempFile::new("write");
    write_keyring(
        file.path(),
        vec![KeyringEntry::new("a", &[1; 32]), KeyringEntry::new("b", &[2; 32])],
    )?;
    let names: Vec<String> = read_keyring(file.path())?
        .iter()
        .map(|entry| entry.name.clone())
        .collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    Ok(())
}
