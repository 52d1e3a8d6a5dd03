//! Summary, word count and reading time.

use crate::utils::html::strip_tags;

/// Manual summary divider.
pub const SUMMARY_DIVIDER: &str = "<!--more-->";

/// Words per minute for reading time.
const WORDS_PER_MINUTE: usize = 213;
const CJK_CHARS_PER_MINUTE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub truncated: bool,
}

/// Remove the divider from rendered HTML, returning the part before it.
pub fn split_divider(html: &str) -> (String, Option<String>) {
    match html.find(SUMMARY_DIVIDER) {
        Some(pos) => {
            let before = html[..pos].trim_end().to_string();
            let full = format!("{}{}", &html[..pos], &html[pos + SUMMARY_DIVIDER.len()..]);
            (full, Some(before))
        }
        None => (html.to_string(), None),
    }
}

/// Summary by precedence: front matter, divider, first `length` words.
pub fn summarize(
    html: &str,
    front_matter: Option<&str>,
    before_divider: Option<&str>,
    length: usize,
    cjk: bool,
) -> Summary {
    if let Some(explicit) = front_matter {
        return Summary {
            text: explicit.trim().to_string(),
            truncated: true,
        };
    }

    if let Some(before) = before_divider {
        let rest = strip_tags(&html[before.len().min(html.len())..]);
        return Summary {
            text: before.to_string(),
            truncated: !rest.trim().is_empty(),
        };
    }

    let plain = strip_tags(html);
    let words = split_words(&plain, cjk);
    let truncated = words.len() > length;
    let text = if cjk {
        words[..length.min(words.len())].concat()
    } else {
        words[..length.min(words.len())].join(" ")
    };
    Summary { text, truncated }
}

/// Word count of plain text; with `cjk` each CJK character is a word.
pub fn word_count(text: &str, cjk: bool) -> usize {
    if !cjk {
        return text.split_whitespace().count();
    }
    text.split_whitespace()
        .map(|token| {
            let han = token.chars().filter(|&c| is_cjk(c)).count();
            let has_other = token.chars().any(|c| !is_cjk(c) && c.is_alphanumeric());
            han + usize::from(has_other)
        })
        .sum()
}

/// Minutes, rounded up.
pub fn reading_time(words: usize, cjk: bool) -> usize {
    let rate = if cjk {
        CJK_CHARS_PER_MINUTE
    } else {
        WORDS_PER_MINUTE
    };
    words.div_ceil(rate)
}

/// Words for summary truncation. CJK text splits per character, keeping
/// other runs whole; joined back with `concat` for CJK.
fn split_words(text: &str, cjk: bool) -> Vec<String> {
    if !cjk {
        return text.split_whitespace().map(str::to_string).collect();
    }
    let mut words = Vec::new();
    for token in text.split_whitespace() {
        let mut run = String::new();
        for c in token.chars() {
            if is_cjk(c) {
                if !run.is_empty() {
                    words.push(std::mem::take(&mut run));
                }
                words.push(c.to_string());
            } else {
                run.push(c);
            }
        }
        if !run.is_empty() {
            words.push(run);
        }
    }
    words
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // kana
        | '\u{3400}'..='\u{4DBF}' // ext A
        | '\u{4E00}'..='\u{9FFF}' // unified ideographs
        | '\u{AC00}'..='\u{D7AF}' // hangul
        | '\u{F900}'..='\u{FAFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_split() {
        let (full, before) = split_divider("<p>one</p>\n<!--more-->\n<p>two</p>");
        assert_eq!(before.as_deref(), Some("<p>one</p>"));
        assert!(!full.contains(SUMMARY_DIVIDER));

        let summary = summarize(&full, None, before.as_deref(), 70, false);
        assert_eq!(summary.text, "<p>one</p>");
        assert!(summary.truncated);
    }

    #[test]
    fn test_front_matter_summary_wins() {
        let summary = summarize("<p>body</p>", Some(" Custom "), Some("<p>x</p>"), 70, false);
        assert_eq!(summary.text, "Custom");
    }

    #[test]
    fn test_automatic_summary() {
        let summary = summarize("<p>one two three four</p>", None, None, 2, false);
        assert_eq!(summary.text, "one two");
        assert!(summary.truncated);

        let short = summarize("<p>one two</p>", None, None, 5, false);
        assert_eq!(short.text, "one two");
        assert!(!short.truncated);
    }

    #[test]
    fn test_cjk_counting() {
        assert_eq!(word_count("hello world", false), 2);
        assert_eq!(word_count("你好世界 rust", true), 5);
        assert_eq!(word_count("你好世界 rust", false), 2);

        let summary = summarize("<p>你好世界</p>", None, None, 2, true);
        assert_eq!(summary.text, "你好");
        assert!(summary.truncated);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0, false), 0);
        assert_eq!(reading_time(1, false), 1);
        assert_eq!(reading_time(213, false), 1);
        assert_eq!(reading_time(214, false), 2);
        assert_eq!(reading_time(501, true), 2);
    }
}
