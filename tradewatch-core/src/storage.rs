//! Durable JSON documents.
//!
//! Each store is a single JSON file holding the whole document. Writers take
//! an async mutex, load the current document, mutate it and replace the file
//! through a temporary sibling and a rename, so readers never observe a
//! partially written document.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::entities::dead_letter::DeadLetterStore;
use crate::entities::ledger::LedgerStore;
use crate::entities::trade::JsonTradeRepository;

pub const TRADES_FILE: &str = "trades.json";
pub const DEAD_LETTERS_FILE: &str = "dead_letters.json";
pub const LEDGER_FILE: &str = "ledger.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt document {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// A JSON file holding one `D`, with serialized writers.
#[derive(Debug)]
pub struct JsonDocument<D> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> D>,
}

impl<D> JsonDocument<D>
where
    D: Serialize + DeserializeOwned + Default + Send,
{
    /// Open the document at `path`, creating it (and its parent directory)
    /// with an empty document when missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let document = Self {
            path: path.into(),
            lock: Mutex::new(()),
            _marker: PhantomData,
        };

        if let Some(parent) = document.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let exists = tokio::fs::try_exists(&document.path)
            .await
            .map_err(|e| StoreError::io(&document.path, e))?;
        if exists {
            // Surface corruption at startup rather than on first use.
            document.load().await?;
        } else {
            document.store(&D::default()).await?;
            info!(path = %document.path.display(), "Created empty document");
        }

        Ok(document)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a consistent snapshot of the document.
    pub async fn read(&self) -> Result<D, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Apply `f` to the document and persist the result.
    pub async fn update<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut D) -> R + Send,
        R: Send,
    {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let out = f(&mut document);
        self.store(&document).await?;
        Ok(out)
    }

    /// Like [`update`](Self::update), but the document is only written when
    /// `f` succeeds.
    pub async fn try_update<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut D) -> Result<R, E> + Send,
        R: Send,
        E: From<StoreError> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let out = f(&mut document)?;
        self.store(&document).await?;
        Ok(out)
    }

    async fn load(&self) -> Result<D, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(D::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(D::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn store(&self, document: &D) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

/// The three stores backing the pipeline, opened from one data directory.
pub struct Stores {
    pub trades: Arc<JsonTradeRepository>,
    pub dead_letters: DeadLetterStore,
    pub ledger: Arc<LedgerStore>,
}

impl Stores {
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            trades: Arc::new(JsonTradeRepository::open(data_dir.join(TRADES_FILE)).await?),
            dead_letters: DeadLetterStore::open(data_dir.join(DEAD_LETTERS_FILE)).await?,
            ledger: Arc::new(LedgerStore::open(data_dir.join(LEDGER_FILE)).await?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    type Counters = BTreeMap<String, u32>;

    #[tokio::test]
    async fn open_creates_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("counters.json");
        let doc = JsonDocument::<Counters>::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(doc.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn updates_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        {
            let doc = JsonDocument::<Counters>::open(&path).await.unwrap();
            let n = doc
                .update(|c| {
                    *c.entry("a".into()).or_default() += 2;
                    c["a"]
                })
                .await
                .unwrap();
            assert_eq!(n, 2);
        }
        let doc = JsonDocument::<Counters>::open(&path).await.unwrap();
        assert_eq!(doc.read().await.unwrap()["a"], 2);
        assert!(!dir.path().join("counters.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_try_update_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::<Counters>::open(dir.path().join("c.json"))
            .await
            .unwrap();
        let result: Result<(), StoreError> = doc
            .try_update(|c| {
                c.insert("x".into(), 1);
                Err(StoreError::io(Path::new("x"), std::io::ErrorKind::Other.into()))
            })
            .await;
        assert!(result.is_err());
        assert!(doc.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let err = JsonDocument::<Counters>::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn blank_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.json");
        std::fs::write(&path, b"\n").unwrap();
        let doc = JsonDocument::<Counters>::open(&path).await.unwrap();
        assert!(doc.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Arc::new(
            JsonDocument::<Counters>::open(dir.path().join("c.json"))
                .await
                .unwrap(),
        );
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let doc = doc.clone();
            tasks.push(tokio::spawn(async move {
                doc.update(|c| *c.entry("n".into()).or_default() += 1)
                    .await
                    .unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(doc.read().await.unwrap()["n"], 20);
    }
}
