use once_cell::sync::Lazy;
use regex::Regex;

/// Two or more consecutive periods, or a Unicode ellipsis
static ELLIPSIS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{2,}|…").expect("ellipsis pattern is valid"));

/// Format raw text into what the TTS backend should speak.
///
/// Acronyms (two or more uppercase letters once periods are stripped) are
/// spelled out letter by letter so the backend does not read them as words:
/// `"S.P.F."` becomes `"S P F"`. Every other token keeps its punctuation,
/// apart from ellipses which produce unnatural pauses.
pub fn format_for_tts(raw_text: &str) -> String {
    raw_text
        .split_whitespace()
        .filter_map(format_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_token(token: &str) -> Option<String> {
    if let Some(letters) = acronym_letters(token) {
        return Some(spell_out(&letters));
    }

    let stripped = ELLIPSIS_PATTERN.replace_all(token, "");
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.into_owned())
    }
}

/// Returns the acronym letters when the token is an acronym candidate
fn acronym_letters(token: &str) -> Option<String> {
    let letters: String = token.chars().filter(|c| *c != '.').collect();

    let is_candidate = letters.chars().count() >= 2
        && letters.chars().all(|c| c.is_alphabetic() && c.is_uppercase());

    is_candidate.then_some(letters)
}

fn spell_out(letters: &str) -> String {
    letters
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ")
}
