// src/file_store.rs
//! Directory-backed persistent store for cross-process caching.
//!
//! Each key is one file: `[EXPIRES_AT_MS:i64][PAYLOAD]`. An expiry of `0`
//! never expires.

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::StoreError;
use crate::store::PersistentStore;

const HEADER_LEN: usize = 8;

pub struct FileStore {
    dir: PathBuf,
    /// Distinguishes temp files of overlapping writes within this process.
    write_seq: AtomicU64,
}

impl FileStore {
    /// Store files under `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.bin"))
    }

    /// Scratch file for one write to `path`, unique across processes sharing `dir`.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("tmp{}-{seq}", std::process::id()))
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_frame(value: &[u8], expires_at_ms: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + value.len());
    buf.put_i64(expires_at_ms);
    buf.put_slice(value);
    buf.freeze()
}

/// Returns the payload if the frame is well-formed and still live at `now_ms`.
fn decode_frame(raw: Vec<u8>, now_ms: i64) -> Result<Option<Bytes>, StoreError> {
    if raw.len() < HEADER_LEN {
        return Err(StoreError::Backend(format!(
            "truncated frame: {} bytes",
            raw.len()
        )));
    }
    let mut frame = Bytes::from(raw);
    let expires_at_ms = frame.get_i64();
    if expires_at_ms != 0 && expires_at_ms <= now_ms {
        return Ok(None);
    }
    Ok(Some(frame))
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let raw = match tokio::fs::read(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_frame(raw, Utc::now().timestamp_millis())
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = Utc::now().timestamp_millis().saturating_add(ttl_ms);
        let path = self.path_for(key);
        let tmp = self.temp_path(&path);
        tokio::fs::write(&tmp, encode_frame(&value, expires_at_ms)).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
