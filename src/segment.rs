//! Lossless, boundary-preferring text segmenter.
//!
//! Splits document body text into [`Chunk`]s of at most `max_chars`
//! characters each, such that concatenating the chunk texts in ordinal
//! order reproduces the original text byte-for-byte. Split points prefer
//! paragraph boundaries (`\n\n`), then sentence ends (`. `), then line or
//! word boundaries; a run of text with no boundary is hard-split at the
//! size limit.
//!
//! Each chunk carries a SHA-256 fingerprint of its exact text, used as the
//! embedding-cache key and staleness detector.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Pure function: no side effects, deterministic chunk boundaries and
/// fingerprints (chunk IDs are freshly generated). Empty input yields an
/// empty vector.
pub fn segment_text(document_id: &str, text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);

    let mut chunks = Vec::new();
    let mut rest = text;
    let mut ordinal = 0usize;

    while !rest.is_empty() {
        let at = split_point(rest, max_chars);
        let (piece, tail) = rest.split_at(at);
        chunks.push(make_chunk(document_id, ordinal, piece));
        ordinal += 1;
        rest = tail;
    }

    chunks
}

/// Compute the SHA-256 hex fingerprint of a chunk's exact text.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pick the byte offset to split `rest` at, keeping at most `max_chars`
/// characters and preferring natural boundaries. Always returns a non-zero
/// offset on a char boundary so the caller makes progress.
fn split_point(rest: &str, max_chars: usize) -> usize {
    // Byte offset just past the max_chars-th character.
    let window_end = match rest.char_indices().nth(max_chars) {
        Some((idx, _)) => idx,
        None => return rest.len(), // whole remainder fits
    };

    let window = &rest[..window_end];

    // Paragraph break: keep the separator with the preceding chunk.
    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return pos + 2;
        }
    }

    // Sentence end.
    if let Some(pos) = window.rfind(". ") {
        if pos > 0 {
            return pos + 2;
        }
    }

    // Line or word boundary.
    if let Some(pos) = window.rfind('\n') {
        if pos > 0 {
            return pos + 1;
        }
    }
    if let Some(pos) = window.rfind(' ') {
        if pos > 0 {
            return pos + 1;
        }
    }

    // No usable boundary: hard split at the size limit.
    window_end.max(1)
}

fn make_chunk(document_id: &str, ordinal: usize, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        ordinal,
        text: text.to_string(),
        fingerprint: fingerprint(text),
        embedding: Vec::new(),
        embedded_at: None,
    }
}
