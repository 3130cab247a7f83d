pub mod identity;
pub mod rendering;

pub use identity::{content_hash, is_content_hash, normalize_key, CONTENT_HASH_LEN};
pub use rendering::format_for_tts;

use serde::{Deserialize, Serialize};

/// Stable identity and spoken form derived from one raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub raw_text: String,
    pub normalized_key: String,
    pub content_hash: String,
    pub tts_rendering: String,
}

/// Derive the identity and TTS rendering of `raw_text`.
///
/// Pure and deterministic. The voice used for synthesis is deliberately not
/// an input: one cached object is shared by every voice.
pub fn canonicalize(raw_text: &str) -> CanonicalIdentity {
    let normalized_key = normalize_key(raw_text);
    let content_hash = content_hash(&normalized_key);
    let tts_rendering = format_for_tts(raw_text);

    CanonicalIdentity {
        raw_text: raw_text.to_string(),
        normalized_key,
        content_hash,
        tts_rendering,
    }
}
