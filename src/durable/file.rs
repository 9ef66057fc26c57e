//! File-backed durable store.
//!
//! One JSON document per key under a root directory. The hex encoding of the
//! key is split into bounded segments: every segment but the last is a
//! directory, the last names the file. Any key length stays within the
//! per-component file name limit.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{DurableRecord, DurableStore};
use crate::error::Result;

const EXTENSION: &str = "json";

/// Hex characters per path component.
const SEGMENT_LEN: usize = 128;

/// Distinguishes temp files of concurrent writers.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) the store directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Opened file store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded = encode_key(key);
        let mut path = self.root.clone();
        let mut rest = encoded.as_str();
        while rest.len() > SEGMENT_LEN {
            let (segment, tail) = rest.split_at(SEGMENT_LEN);
            path.push(segment);
            rest = tail;
        }
        path.push(format!("{}.{}", rest, EXTENSION));
        path
    }

    /// Walks the directory tree, rebuilding each key from its path segments.
    async fn record_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir_path, prefix)) = pending.pop() {
            let mut dir = match fs::read_dir(&dir_path).await {
                Ok(dir) => dir,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            while let Some(item) = dir.next_entry().await? {
                let path = item.path();
                if item.file_type().await?.is_dir() {
                    if let Some(segment) = path.file_name().and_then(|n| n.to_str()) {
                        pending.push((path.clone(), format!("{}{}", prefix, segment)));
                    }
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                let key = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| decode_key(&format!("{}{}", prefix, stem)));
                if let Some(key) = key {
                    files.push((key, path));
                }
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<DurableRecord>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, record: DurableRecord) -> Result<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(&record)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        fs::write(&tmp, bytes).await?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    async fn clear(&self) -> Result<()> {
        for (_, path) in self.record_files().await? {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .record_files()
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.record_files().await?.len())
    }
}

fn encode_key(key: &str) -> String {
    key.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn decode_key(name: &str) -> Option<String> {
    if name.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..name.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(name.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
