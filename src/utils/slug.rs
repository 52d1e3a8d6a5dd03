//! URL slugification.
//!
//! Taxonomy terms and heading ids go through `urlize`; permalink path
//! segments keep their characters and only lose the forbidden ones.

use deunicode::deunicode;

/// Characters forbidden in permalink segments
const FORBIDDEN_CHARS: &[char] = &[
    '<', '>', ':', '|', '?', '*', '#', '\\', '(', ')', '[', ']', '"', '\t', '\r', '\n',
];

/// Transliterate to ASCII, lowercase and join words with `-`.
///
/// - `urlize("Rust Tips")` -> `"rust-tips"`
/// - `urlize("Ça va?")` -> `"ca-va"`
pub fn urlize(text: &str) -> String {
    deunicode(text)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Heading anchor; falls back to `"section"` when nothing survives.
pub fn anchorize(text: &str) -> String {
    let slug = urlize(text);
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Lowercased permalink segment with spaces turned into `-`.
pub fn path_segment(segment: &str) -> String {
    segment
        .trim()
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlize() {
        assert_eq!(urlize("Rust Tips"), "rust-tips");
        assert_eq!(urlize("  multiple   spaces "), "multiple-spaces");
        assert_eq!(urlize("Ça va?"), "ca-va");
        assert_eq!(urlize("snake_case.name"), "snake-case-name");
    }

    #[test]
    fn test_anchorize_fallback() {
        assert_eq!(anchorize("Getting Started"), "getting-started");
        assert_eq!(anchorize("???"), "section");
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("My Post"), "my-post");
        assert_eq!(path_segment("Résumé"), "résumé");
        assert_eq!(path_segment("a:b?"), "ab");
    }
}
