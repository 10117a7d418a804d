use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// An opaque output blob addressable by its content hash.
///
/// Artifact storage is write-once per hash; identical inputs (brief + theme +
/// archetype version) therefore share one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Lowercase hex sha256 of `bytes`.
    pub hash: String,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        let hash = sha256_hex(&[&bytes]);
        Self {
            bytes,
            content_type: content_type.into(),
            hash,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Hashes the concatenation of `parts` to a lowercase hex digest.
///
/// Used both for artifact addresses and for cache keys derived from several
/// logical segments; callers are responsible for separator discipline.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}
