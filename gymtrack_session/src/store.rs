//! Credential stores
//!
//! A store holds the single live credential: written on login and on every
//! successful refresh, read by every outgoing request, cleared on logout or
//! when a refresh is rejected. The in-memory store covers the common case of
//! one process; the file store additionally mirrors the credential where
//! sibling processes can observe it, which is a best-effort convenience and
//! not part of the refresh protocol's correctness.

use std::error;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::{AccessToken, AccessTokenRef};

/// The boxed error produced by fallible stores
pub type StoreError = Box<dyn error::Error + Send + Sync + 'static>;

/// Shared storage for the one live bearer credential
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the current credential, if one is present
    async fn load(&self) -> Result<Option<AccessToken>, StoreError>;

    /// Replaces the stored credential
    async fn persist(&self, token: &AccessTokenRef) -> Result<(), StoreError>;

    /// Removes the stored credential
    async fn clear(&self) -> Result<(), StoreError>;
}

/// A process-local credential slot
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: RwLock<Option<AccessToken>>,
}

impl InMemoryCredentialStore {
    /// Constructs an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a store already holding a credential
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> Result<Option<AccessToken>, StoreError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.clone())
    }

    async fn persist(&self, token: &AccessTokenRef) -> Result<(), StoreError> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(token.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}

#[cfg(feature = "file")]
pub use self::file::FileCredentialStore;

#[cfg(feature = "file")]
mod file {
    use std::io;
    use std::path::PathBuf;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use tokio::fs::OpenOptions;

    use super::{CredentialStore, StoreError};
    use crate::{AccessToken, AccessTokenRef};

    // One canonical key: the single field of this document. Divergent legacy
    // key names are not kept in sync.
    #[derive(Debug, Serialize, Deserialize)]
    struct StoredCredential {
        access_token: AccessToken,
    }

    /// A credential store backed by a local JSON file
    ///
    /// The file is created with mode `0o600` on unix.
    #[derive(Debug)]
    pub struct FileCredentialStore {
        path: PathBuf,
    }

    impl FileCredentialStore {
        /// Constructs a store persisting to the given path
        pub fn new(path: PathBuf) -> Self {
            Self { path }
        }

        async fn read_credential(&self) -> Result<Option<AccessToken>, io::Error> {
            use tokio::io::AsyncReadExt;

            let mut file = match OpenOptions::new().read(true).open(&self.path).await {
                Ok(file) => file,
                Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(error) => return Err(error),
            };
            let mut data = String::new();
            file.read_to_string(&mut data).await?;
            let stored: StoredCredential = serde_json::from_str(&data)?;
            Ok(Some(stored.access_token))
        }

        async fn write_credential(&self, token: &AccessTokenRef) -> Result<(), io::Error> {
            use tokio::io::AsyncWriteExt;

            let mut file_opts = OpenOptions::new();

            file_opts.create(true).truncate(true).write(true);

            #[cfg(unix)]
            file_opts.mode(0o600);

            let mut file = file_opts.open(&self.path).await?;
            let stored = StoredCredential {
                access_token: token.to_owned(),
            };
            let data = serde_json::to_string_pretty(&stored)?;
            file.write_all(data.as_bytes()).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl CredentialStore for FileCredentialStore {
        async fn load(&self) -> Result<Option<AccessToken>, StoreError> {
            Ok(self.read_credential().await?)
        }

        async fn persist(&self, token: &AccessTokenRef) -> Result<(), StoreError> {
            Ok(self.write_credential(token).await?)
        }

        async fn clear(&self) -> Result<(), StoreError> {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(error) => Err(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_replaces_and_clears() {
        let store = InMemoryCredentialStore::new();
        assert!(store.load().await.unwrap().is_none());

        store
            .persist(AccessTokenRef::from_str("first"))
            .await
            .unwrap();
        store
            .persist(AccessTokenRef::from_str("second"))
            .await
            .unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().as_str(), "second");

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[cfg(feature = "file")]
    #[tokio::test]
    async fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credential.json"));

        assert!(store.load().await.unwrap().is_none());

        store
            .persist(AccessTokenRef::from_str("persisted-token"))
            .await
            .unwrap();
        assert_eq!(
            store.load().await.unwrap().unwrap().as_str(),
            "persisted-token"
        );

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // clearing an already-empty store is fine
        store.clear().await.unwrap();
    }
}
