//! `likely_has_gguf` heuristic (spec §4.C).

use regex::Regex;
use std::sync::OnceLock;

const SUBSTRINGS: &[&str] = &[
    "gguf", "ggml", ".gguf", "-gguf", "_gguf", "q4_k_m", "q4_0", "q5_0", "q8_0", "f16", "f32",
];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"q\d+_k_[msl]",
            r"q\d+_\d+",
            r"iq\d+_[a-z]+",
            r"f\d+",
            r"bf\d+",
            r"int\d+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex pattern is valid"))
        .collect()
    })
}

/// True if the lowercased id or any lowercased tag matches one of the
/// spec-defined substrings or regex patterns.
pub fn likely_has_gguf(id: &str, tags: &[String]) -> bool {
    let id_lower = id.to_lowercase();
    let tag_lowers: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

    let haystacks = std::iter::once(id_lower.as_str()).chain(tag_lowers.iter().map(|s| s.as_str()));

    for haystack in haystacks {
        if SUBSTRINGS.iter().any(|s| haystack.contains(s)) {
            return true;
        }
    }

    if patterns().iter().any(|p| p.is_match(&id_lower)) {
        return true;
    }

    false
}
