/*!
 * Optional write-through persistence for enrichment results
 *
 * The engine works with the in-memory cache alone; a store is a best-effort
 * sink. Save failures are the caller's to log, never to propagate.
 */

use crate::error::{KeystoneError, Result};
use crate::record::EnrichmentResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Persistence collaborator for fused records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `result` under the normalized address `key`
    async fn save(&self, key: &str, result: &EnrichmentResult) -> Result<()>;
}

/// One pretty-printed JSON file per address, named by the SHA-256 of the key
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the record for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Read back a previously saved result.
    ///
    /// Enrichment never reads the store; this is the read side for whatever
    /// consumes the persisted records downstream.
    pub async fn load(&self, key: &str) -> Result<Option<EnrichmentResult>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KeystoneError::Store {
                path,
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RecordStore for JsonDirStore {
    async fn save(&self, key: &str, result: &EnrichmentResult) -> Result<()> {
        let path = self.path_for(key);
        let body = serde_json::to_vec_pretty(result)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| KeystoneError::Store {
                path: self.dir.clone(),
                message: e.to_string(),
            })?;

        // Write to a sibling temp file first so readers never see a torn record
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| KeystoneError::Store {
                path: tmp.clone(),
                message: e.to_string(),
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| KeystoneError::Store {
                path: path.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(path = %path.display(), "persisted enrichment result");
        Ok(())
    }
}
