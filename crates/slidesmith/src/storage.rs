//! Artifact persistence behind a capability trait.
//!
//! Object keys are content hashes of the *inputs* (brief + theme + archetype
//! version + format), so identical generations share one stored object.
//! Writes are once-only per key; overwrites are forbidden by contract.

use futures::future::BoxFuture;
use slidesmith_core::Artifact;
use slidesmith_core::model::artifact::sha256_hex;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait ArtifactStore: Send + Sync {
    /// Stores `artifact` under `key` unless the key already exists, and
    /// returns a signed reference either way.
    fn put<'a>(
        &'a self,
        key: &'a str,
        artifact: &'a Artifact,
        ttl: Duration,
    ) -> BoxFuture<'a, String>;

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Artifact>>;
}

/// In-memory store with lazy expiry and toy URL signing. The production
/// object-store client implements the same trait at the composition root.
pub struct MemoryArtifactStore {
    objects: Mutex<HashMap<String, (Artifact, Instant)>>,
    signing_key: String,
}

impl MemoryArtifactStore {
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            signing_key: signing_key.into(),
        }
    }

    fn sign(&self, key: &str, ttl: Duration) -> String {
        let sig = sha256_hex(&[self.signing_key.as_bytes(), b":", key.as_bytes()]);
        format!("mem://artifacts/{key}?exp={}&sig={}", ttl.as_secs(), &sig[..16])
    }
}

impl Default for MemoryArtifactStore {
    fn default() -> Self {
        Self::new("dev-signing-key")
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn put<'a>(
        &'a self,
        key: &'a str,
        artifact: &'a Artifact,
        ttl: Duration,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let mut guard = match self.objects.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .entry(key.to_string())
                .or_insert_with(|| (artifact.clone(), Instant::now() + ttl));
            self.sign(key, ttl)
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Artifact>> {
        Box::pin(async move {
            let mut guard = match self.objects.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match guard.get(key) {
                Some((_, expiry)) if *expiry <= Instant::now() => {
                    guard.remove(key);
                    None
                }
                Some((artifact, _)) => Some(artifact.clone()),
                None => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn first_write_wins() {
        let store = MemoryArtifactStore::default();
        let ttl = Duration::from_secs(3600);
        let original = Artifact::new(b"one".to_vec(), "text/plain");
        let replacement = Artifact::new(b"two".to_vec(), "text/plain");

        block_on(store.put("k", &original, ttl));
        block_on(store.put("k", &replacement, ttl));

        let stored = block_on(store.get("k")).expect("present");
        assert_eq!(stored.bytes, b"one");
    }

    #[test]
    fn references_are_signed_and_keyed() {
        let store = MemoryArtifactStore::default();
        let artifact = Artifact::new(b"x".to_vec(), "image/svg+xml");
        let reference = block_on(store.put("abc123", &artifact, Duration::from_secs(60)));
        assert!(reference.contains("abc123"));
        assert!(reference.contains("sig="));
    }

    #[test]
    fn expired_objects_vanish() {
        let store = MemoryArtifactStore::default();
        let artifact = Artifact::new(b"x".to_vec(), "text/plain");
        block_on(store.put("gone", &artifact, Duration::ZERO));
        assert!(block_on(store.get("gone")).is_none());
    }
}
