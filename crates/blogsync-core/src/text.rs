//! Word count and reading time for post bodies.
//!
//! Bodies arrive as rendered HTML. Tags are stripped before counting so
//! markup does not inflate the numbers.

/// Words per minute used for the reading-time estimate.
pub const WORDS_PER_MINUTE: i64 = 200;

/// Remove HTML tags, replacing each with a space so adjacent words
/// separated only by markup are still counted separately.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Number of whitespace-separated words in `html` once tags are removed.
pub fn word_count(html: &str) -> i64 {
    strip_tags(html).split_whitespace().count() as i64
}

/// Estimated reading time in whole minutes, rounded up.
pub fn reading_time(words: i64) -> i64 {
    if words <= 0 {
        return 0;
    }
    (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>Hello</p>").trim(), "Hello");
        assert_eq!(strip_tags("no markup"), "no markup");
    }

    #[test]
    fn test_word_count_ignores_markup() {
        assert_eq!(word_count("<p>One two</p><p>three</p>"), 3);
        assert_eq!(word_count("<h2 class=\"title\">Heading</h2>"), 1);
    }

    #[test]
    fn test_word_count_empty() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("<br/>"), 0);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        assert_eq!(reading_time(0), 0);
        assert_eq!(reading_time(1), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
        assert_eq!(reading_time(1000), 5);
    }
}
