// 🗂️ Ephemeral Artifact Store - short-lived downloadable results
//
// put(bytes) -> handle, take(handle) -> bytes exactly once.
// Entries older than the TTL are treated as gone and swept periodically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default retention window for generated downloads (5 minutes)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("file '{0}' not found or expired")]
    NotFound(String),
}

#[derive(Debug)]
struct Artifact {
    bytes: Vec<u8>,
    created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, Artifact>>>,
}

impl ArtifactStore {
    pub fn new(ttl: Duration) -> Self {
        ArtifactStore {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store bytes and return a handle such as `missing_<uuid>.csv`
    pub fn put(&self, prefix: &str, bytes: Vec<u8>) -> String {
        self.put_at(prefix, bytes, Instant::now())
    }

    fn put_at(&self, prefix: &str, bytes: Vec<u8>, now: Instant) -> String {
        let handle = format!("{}_{}.csv", prefix, uuid::Uuid::new_v4());

        self.lock().insert(
            handle.clone(),
            Artifact {
                bytes,
                created_at: now,
            },
        );

        handle
    }

    /// Remove and return an artifact. A second call for the same handle,
    /// or a call after the TTL, is `NotFound`.
    pub fn take(&self, handle: &str) -> Result<Vec<u8>, ArtifactError> {
        self.take_at(handle, Instant::now())
    }

    fn take_at(&self, handle: &str, now: Instant) -> Result<Vec<u8>, ArtifactError> {
        let artifact = self
            .lock()
            .remove(handle)
            .ok_or_else(|| ArtifactError::NotFound(handle.to_string()))?;

        if self.is_expired(&artifact, now) {
            return Err(ArtifactError::NotFound(handle.to_string()));
        }

        Ok(artifact.bytes)
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, artifact| !self.is_expired(artifact, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, artifact: &Artifact, now: Instant) -> bool {
        now.saturating_duration_since(artifact.created_at) >= self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Artifact>> {
        // Entries stay consistent even if a holder panicked
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}
