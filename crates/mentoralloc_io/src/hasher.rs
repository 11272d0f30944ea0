//! SHA-256 digests, including over canonical JSON.
//!
//! Deterministic: the same canonical structure always hashes to the
//! same lowercase 64-hex string, regardless of OS or architecture.

#![forbid(unsafe_code)]

use crate::IoError;

#[cfg(feature = "hash")]
use sha2::{Digest, Sha256};

#[cfg(all(feature = "hash", feature = "serde"))]
use crate::canonical_json::to_canonical_json_bytes;
#[cfg(all(feature = "hash", feature = "serde"))]
use serde::Serialize;

/// Lowercase 64-hex SHA-256 of raw bytes.
#[cfg(feature = "hash")]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Streaming SHA-256 over a reader.
#[cfg(feature = "hash")]
pub fn sha256_stream<R: std::io::Read>(reader: &mut R) -> Result<String, IoError> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over a value's canonical JSON encoding (sorted keys, compact).
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, IoError> {
    let v = serde_json::to_value(value)?;
    Ok(sha256_hex(&to_canonical_json_bytes(&v)))
}

/// Hash a file from disk.
#[cfg(feature = "hash")]
pub fn sha256_file<P: AsRef<std::path::Path>>(path: P) -> Result<String, IoError> {
    let mut f = std::fs::File::open(path)?;
    sha256_stream(&mut f)
}

/// The digest attached to a loaded `PolicyConfig`, used to fingerprint
/// exactly which policy a run was executed against.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn policy_digest(policy: &mentoralloc_core::policy::PolicyConfig) -> Result<String, IoError> {
    sha256_canonical(policy)
}

/// A digest over the full input batch (students, mentor pool, and
/// history snapshot, in that order), used to tie an output batch to
/// the exact inputs it was produced from.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn batch_digest<S: Serialize, M: Serialize, H: Serialize>(
    students: &S,
    mentors: &M,
    history: &H,
) -> Result<String, IoError> {
    let combined = serde_json::json!({ "students": students, "mentors": mentors, "history": history });
    sha256_canonical(&combined)
}

/// True iff `s` is lowercase 64-hex.
pub fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.as_bytes().iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
