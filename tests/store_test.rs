use std::path::PathBuf;

use jamcli::{
    management::{CredentialStore, FileStore, MemoryStore},
    types::Credential,
};

// Helper function to create an isolated store root
fn temp_root(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("jamcli-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    root
}

fn create_test_credential() -> Credential {
    Credential {
        access_token: Some("access".to_string()),
        refresh_token: Some("refresh".to_string()),
        expires_at: Some(1_700_000_000_000),
    }
}

#[tokio::test]
async fn test_memory_store_transaction_is_taken_once() {
    let store = MemoryStore::new();
    store.save_transaction("verifier").await.unwrap();

    assert_eq!(
        store.take_transaction().await.unwrap().as_deref(),
        Some("verifier")
    );
    assert_eq!(store.take_transaction().await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_store_pending_term_is_taken_once() {
    let store = MemoryStore::new();
    store.save_pending_term("daft punk").await.unwrap();
    store.save_pending_term("justice").await.unwrap();

    assert_eq!(
        store.take_pending_term().await.unwrap().as_deref(),
        Some("justice")
    );
    assert_eq!(store.take_pending_term().await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_store_update_and_clear() {
    let store = MemoryStore::with_credential(create_test_credential());

    let updated = store
        .update(Box::new(|c| c.access_token = None))
        .await
        .unwrap();
    assert_eq!(updated.access_token, None);
    assert_eq!(updated.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(store.load().await.unwrap(), updated);

    store.clear().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_missing_files_read_as_empty() {
    let store = FileStore::with_root(temp_root("missing"));

    assert_eq!(store.load().await.unwrap(), Credential::default());
    assert_eq!(store.take_transaction().await.unwrap(), None);
    assert_eq!(store.take_pending_term().await.unwrap(), None);
    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_file_store_credential_roundtrip() {
    let root = temp_root("credential");
    let store = FileStore::with_root(root.clone());
    let credential = create_test_credential();

    store.save(&credential).await.unwrap();
    assert!(root.join("cache/credential.json").is_file());

    // A second instance sees what the first one wrote.
    let reopened = FileStore::with_root(root.clone());
    assert_eq!(reopened.load().await.unwrap(), credential);

    let updated = reopened
        .update(Box::new(|c| {
            c.access_token = Some("newer".to_string());
            c.expires_at = None;
        }))
        .await
        .unwrap();
    assert_eq!(updated.access_token.as_deref(), Some("newer"));
    assert_eq!(updated.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(store.load().await.unwrap(), updated);

    store.clear().await.unwrap();
    assert!(!root.join("cache/credential.json").exists());
    assert!(store.load().await.unwrap().is_empty());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_file_store_update_to_empty_removes_file() {
    let root = temp_root("emptied");
    let store = FileStore::with_root(root.clone());
    store.save(&create_test_credential()).await.unwrap();

    store
        .update(Box::new(|c| *c = Credential::default()))
        .await
        .unwrap();

    assert!(!root.join("cache/credential.json").exists());
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_file_store_session_values_are_taken_once() {
    let root = temp_root("session");
    let store = FileStore::with_root(root.clone());

    store.save_transaction("verifier").await.unwrap();
    store.save_pending_term("daft punk").await.unwrap();

    assert_eq!(
        store.take_transaction().await.unwrap().as_deref(),
        Some("verifier")
    );
    assert_eq!(store.take_transaction().await.unwrap(), None);
    assert_eq!(
        store.take_pending_term().await.unwrap().as_deref(),
        Some("daft punk")
    );
    assert_eq!(store.take_pending_term().await.unwrap(), None);
    assert!(!root.join("session/verifier.json").exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_pending_term_can_be_read_without_consuming() {
    let root = temp_root("pending");
    let file_store = FileStore::with_root(root.clone());
    let memory_store = MemoryStore::new();
    let stores: [&dyn CredentialStore; 2] = [&file_store, &memory_store];

    for store in stores {
        assert_eq!(store.pending_term().await.unwrap(), None);
        store.save_pending_term("daft punk").await.unwrap();

        assert_eq!(
            store.pending_term().await.unwrap().as_deref(),
            Some("daft punk")
        );
        assert_eq!(
            store.take_pending_term().await.unwrap().as_deref(),
            Some("daft punk")
        );
        assert_eq!(store.pending_term().await.unwrap(), None);
    }

    let _ = std::fs::remove_dir_all(&root);
}
