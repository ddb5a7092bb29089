//! Content hashing.
//!
//! Shared-context blobs and context items both store a SHA-256 fingerprint
//! next to their content. The hash is recomputed on every write so the
//! `content_hash == sha256(content)` invariant holds by construction.

use sha2::{Digest, Sha256};

/// SHA-256 of the content, lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
