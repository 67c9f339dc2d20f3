//! Photo object backends.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use kg_types::PhotoKey;

use crate::error::{StoreError, StoreResult};
use crate::traits::PhotoStore;

/// `HashMap`-backed photo store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryPhotoStore {
    objects: RwLock<HashMap<PhotoKey, Bytes>>,
}

impl InMemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn put(&self, key: &PhotoKey, data: Bytes) -> StoreResult<()> {
        let mut map = self
            .objects
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        map.insert(key.clone(), data);
        Ok(())
    }

    async fn get(&self, key: &PhotoKey) -> StoreResult<Option<Bytes>> {
        let map = self
            .objects
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(map.get(key).cloned())
    }
}

/// Directory-backed photo store: one file per key under `root`.
///
/// Keys are fixed-length hex, so they are always a single safe path component.
#[derive(Debug, Clone)]
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    /// Open (creating if needed) the directory at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &PhotoKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn put(&self, key: &PhotoKey, data: Bytes) -> StoreResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &PhotoKey) -> StoreResult<Option<Bytes>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
