use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest
pub const CONTENT_HASH_LEN: usize = 8;

/// Reduce raw text to the key that identifies it in storage.
///
/// Lower-cases, drops everything that is not a letter, digit or whitespace,
/// then joins the remaining words with underscores. Texts that differ only
/// in punctuation, case or spacing share a key.
pub fn normalize_key(raw_text: &str) -> String {
    let cleaned: String = raw_text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .trim_matches('_')
        .to_string()
}

/// Truncated SHA-256 hex digest of a normalized key.
///
/// Collisions between distinct keys are possible at 32 bits and are not
/// detected.
pub fn content_hash(normalized_key: &str) -> String {
    let digest = Sha256::digest(normalized_key.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(CONTENT_HASH_LEN);
    hash
}

/// Whether `value` has the shape of a content hash
pub fn is_content_hash(value: &str) -> bool {
    value.len() == CONTENT_HASH_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
