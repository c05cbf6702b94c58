use super::*;
use std::time::{SystemTime, UNIX_EPOCH};

fn tokens() -> AuthTokens {
    AuthTokens {
        access_token: "mock-access-token-1".into(),
        refresh_token: "mock-refresh-token-1".into(),
    }
}

fn temp_session_dir(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("backoffice_session_test_{label}_{suffix}"))
}

#[test]
fn memory_store_round_trips_and_clears() {
    let store = MemorySessionStore::default();
    assert!(store.load().is_none());

    store.store(&tokens());
    assert_eq!(store.load(), Some(tokens()));

    store.clear();
    assert!(store.load().is_none());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = temp_session_dir("reopen");
    let store = FileSessionStore::new(&dir);
    store.store(&tokens());

    let reopened = FileSessionStore::new(&dir);
    assert_eq!(reopened.load(), Some(tokens()));
    assert!(dir.join(SESSION_FILE_NAME).exists());

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn file_store_creates_missing_parent_dirs() {
    let dir = temp_session_dir("nested").join("deeper");
    let store = FileSessionStore::new(&dir);
    store.store(&tokens());
    assert!(store.path().exists());

    fs::remove_dir_all(dir.parent().expect("parent")).expect("cleanup");
}

#[test]
fn file_store_treats_corrupt_payload_as_logged_out() {
    let dir = temp_session_dir("corrupt");
    fs::create_dir_all(&dir).expect("dir");
    fs::write(dir.join(SESSION_FILE_NAME), "not json at all").expect("write");

    let store = FileSessionStore::new(&dir);
    assert!(store.load().is_none());

    fs::remove_dir_all(dir).expect("cleanup");
}

#[test]
fn file_store_clear_removes_the_document_and_tolerates_absence() {
    let dir = temp_session_dir("clear");
    let store = FileSessionStore::new(&dir);
    store.store(&tokens());
    assert!(store.path().exists());

    store.clear();
    assert!(!store.path().exists());
    assert!(store.load().is_none());

    // clearing an already-cleared session is a no-op
    store.clear();

    fs::remove_dir_all(dir).expect("cleanup");
}
