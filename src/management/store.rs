use std::{fmt, io::Error, path::PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::{
    types::{Credential, PendingSearch, PkceTransaction},
    utils,
};

#[derive(Debug)]
pub enum StoreError {
    IoError(Error),
    SerdeError(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::IoError(e) => write!(f, "{e}"),
            StoreError::SerdeError(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        StoreError::IoError(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerdeError(err)
    }
}

/// Edit applied by [`CredentialStore::update`] under the store's lock.
pub type CredentialEdit = Box<dyn FnOnce(&mut Credential) + Send>;

/// Durable key/value persistence for the token lifecycle.
///
/// The credential is long-lived. The PKCE verifier and the pending search
/// term only need to survive one redirect round-trip. Each method is one
/// atomic step: writes replace the whole value, and the `take_*` methods
/// read and delete in the same step so a consumed value cannot be reused.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credential, empty when nothing is stored.
    async fn load(&self) -> Result<Credential, StoreError>;

    async fn save(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Read-modify-write of the credential. Returns the value written.
    async fn update(&self, edit: CredentialEdit) -> Result<Credential, StoreError>;

    /// Removes access token, refresh token and expiry together.
    async fn clear(&self) -> Result<(), StoreError>;

    async fn save_transaction(&self, verifier: &str) -> Result<(), StoreError>;

    async fn take_transaction(&self) -> Result<Option<String>, StoreError>;

    async fn save_pending_term(&self, term: &str) -> Result<(), StoreError>;

    /// Reads the pending term without consuming it.
    async fn pending_term(&self) -> Result<Option<String>, StoreError>;

    async fn take_pending_term(&self) -> Result<Option<String>, StoreError>;
}

/// File-backed store under the local data directory.
///
/// Layout below the root (`<data_local_dir>/jamcli` by default):
/// - `cache/credential.json`
/// - `session/verifier.json`
/// - `session/pending_search.json`
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new() -> Self {
        let mut root = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        root.push("jamcli");
        Self::with_root(root)
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            lock: Mutex::new(()),
        }
    }

    fn credential_path(&self) -> PathBuf {
        self.root.join("cache/credential.json")
    }

    fn verifier_path(&self) -> PathBuf {
        self.root.join("session/verifier.json")
    }

    fn pending_search_path(&self) -> PathBuf {
        self.root.join("session/pending_search.json")
    }

    async fn read<T: DeserializeOwned>(path: &PathBuf) -> Result<Option<T>, StoreError> {
        let content = match async_fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::IoError(e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn write<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(value)?;
        async_fs::write(path, json).await?;
        Ok(())
    }

    async fn remove(path: &PathBuf) -> Result<(), StoreError> {
        match async_fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::IoError(e)),
        }
    }

    async fn take<T: DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StoreError> {
        let _guard = self.lock.lock().await;
        let value = Self::read(&path).await?;
        if value.is_some() {
            Self::remove(&path).await?;
        }
        Ok(value)
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Credential, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(Self::read(&self.credential_path()).await?.unwrap_or_default())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        Self::write(&self.credential_path(), credential).await
    }

    async fn update(&self, edit: CredentialEdit) -> Result<Credential, StoreError> {
        let _guard = self.lock.lock().await;
        let path = self.credential_path();
        let mut credential: Credential = Self::read(&path).await?.unwrap_or_default();
        edit(&mut credential);
        if credential.is_empty() {
            Self::remove(&path).await?;
        } else {
            Self::write(&path, &credential).await?;
        }
        Ok(credential)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        Self::remove(&self.credential_path()).await
    }

    async fn save_transaction(&self, verifier: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let transaction = PkceTransaction {
            code_verifier: verifier.to_string(),
            created_at: utils::now_millis(),
        };
        Self::write(&self.verifier_path(), &transaction).await
    }

    async fn take_transaction(&self) -> Result<Option<String>, StoreError> {
        let transaction: Option<PkceTransaction> = self.take(self.verifier_path()).await?;
        Ok(transaction.map(|t| t.code_verifier))
    }

    async fn save_pending_term(&self, term: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let pending = PendingSearch {
            term: term.to_string(),
        };
        Self::write(&self.pending_search_path(), &pending).await
    }

    async fn pending_term(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().await;
        let pending: Option<PendingSearch> = Self::read(&self.pending_search_path()).await?;
        Ok(pending.map(|p| p.term))
    }

    async fn take_pending_term(&self) -> Result<Option<String>, StoreError> {
        let pending: Option<PendingSearch> = self.take(self.pending_search_path()).await?;
        Ok(pending.map(|p| p.term))
    }
}

#[derive(Default)]
struct MemoryState {
    credential: Credential,
    verifier: Option<String>,
    pending_term: Option<String>,
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `credential`.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                credential,
                ..MemoryState::default()
            }),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Credential, StoreError> {
        Ok(self.state.lock().await.credential.clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        self.state.lock().await.credential = credential.clone();
        Ok(())
    }

    async fn update(&self, edit: CredentialEdit) -> Result<Credential, StoreError> {
        let mut state = self.state.lock().await;
        edit(&mut state.credential);
        Ok(state.credential.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.state.lock().await.credential = Credential::default();
        Ok(())
    }

    async fn save_transaction(&self, verifier: &str) -> Result<(), StoreError> {
        self.state.lock().await.verifier = Some(verifier.to_string());
        Ok(())
    }

    async fn take_transaction(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.verifier.take())
    }

    async fn save_pending_term(&self, term: &str) -> Result<(), StoreError> {
        self.state.lock().await.pending_term = Some(term.to_string());
        Ok(())
    }

    async fn pending_term(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.pending_term.clone())
    }

    async fn take_pending_term(&self) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.pending_term.take())
    }
}
