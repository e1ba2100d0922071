//! Foundry Core - Data Types
//!
//! Pure data structures shared by every other crate: invocation lifecycle,
//! project-log documents, the index schema, configuration and errors.
//! No I/O happens here.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

mod config;
mod embedding;
mod entry;
mod error;
mod invocation;
mod schema;

pub use config::*;
pub use embedding::*;
pub use entry::*;
pub use error::*;
pub use invocation::*;
pub use schema::*;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Generate a new document key (UUIDv7, timestamp-sortable).
pub fn new_entry_id() -> String {
    Uuid::now_v7().to_string()
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Lowercase hex form of [`compute_content_hash`].
pub fn content_hash_hex(content: &[u8]) -> String {
    hex::encode(compute_content_hash(content))
}

// =============================================================================
// TESTS
// =============================================================================
