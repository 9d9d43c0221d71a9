//! Content-addressed cache keys.
//!
//! Every key is a full 256-bit BLAKE3 digest of `(model identifier, content)`.
//! The model identifier is always hashed first and separated from the content by
//! [`KEY_FIELD_SEPARATOR`], so switching models never reuses an artifact.
//!
//! # Key shapes
//!
//! | Artifact | Hashed content |
//! |----------|----------------|
//! | embedding | normalized text |
//! | similarity matrix | sorted, de-duplicated row keys, then column keys |
//! | reranker score | the text pair in canonical (lexicographic) order |
//!
//! List elements and pair members are length-prefixed so that no two distinct
//! inputs produce the same byte stream.

use std::fmt;

use blake3::Hasher;
use rkyv::{Archive, Deserialize, Serialize};

use crate::constants::{KEY_FIELD_SEPARATOR, KEY_LIST_SEPARATOR};

/// 32-byte BLAKE3 digest identifying one cached artifact.
#[derive(
    Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct CacheKey(pub [u8; 32]);

impl CacheKey {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lower-case hex encoding (64 chars).
    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<blake3::Hash> for CacheKey {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

fn model_hasher(model_identifier: &str) -> Hasher {
    let mut hasher = Hasher::new();
    hasher.update(model_identifier.as_bytes());
    hasher.update(KEY_FIELD_SEPARATOR);
    hasher
}

fn update_prefixed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Key of the embedding of `text` under `model_identifier`.
#[inline]
pub fn embedding_key(model_identifier: &str, text: &str) -> CacheKey {
    let mut hasher = model_hasher(model_identifier);
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// Sorts and de-duplicates a key list into the canonical matrix axis order.
pub fn canonical_axis(keys: &[CacheKey]) -> Vec<CacheKey> {
    let mut axis = keys.to_vec();
    axis.sort_unstable();
    axis.dedup();
    axis
}

/// Key of the similarity matrix between two key sets.
///
/// Input order and duplicates do not affect the key.
pub fn matrix_key(model_identifier: &str, rows: &[CacheKey], cols: &[CacheKey]) -> CacheKey {
    let mut hasher = model_hasher(model_identifier);
    for axis in [canonical_axis(rows), canonical_axis(cols)] {
        hasher.update(&(axis.len() as u64).to_le_bytes());
        for key in &axis {
            hasher.update(key.as_bytes());
        }
        hasher.update(KEY_LIST_SEPARATOR);
    }
    hasher.finalize().into()
}

/// Orders a text pair so that `(a, b)` and `(b, a)` map to the same value.
#[inline]
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Key of the reranker score for a text pair. Symmetric in its arguments.
pub fn reranker_key(model_identifier: &str, text_a: &str, text_b: &str) -> CacheKey {
    let (first, second) = canonical_pair(text_a, text_b);
    let mut hasher = model_hasher(model_identifier);
    update_prefixed(&mut hasher, first.as_bytes());
    update_prefixed(&mut hasher, second.as_bytes());
    hasher.finalize().into()
}
