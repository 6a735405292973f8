//! # Text Breaking
//!
//! UAX#14 segmentation into breakable units, and the hard character split
//! used when a single unit is wider than the wrap width.

use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A run of text between two break opportunities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakUnit<'a> {
    /// The unit's text with any trailing hard line break removed. Trailing
    /// spaces are kept; they belong to the unit before the break.
    pub text: &'a str,
    /// The unit ended in a hard line break.
    pub mandatory: bool,
}

fn is_hard_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split `text` at every UAX#14 break opportunity.
///
/// `linebreaks` always reports a mandatory break at end of text; that one
/// only counts as mandatory if the text really ends in a line break.
pub fn break_units(text: &str) -> Vec<BreakUnit<'_>> {
    let mut units = Vec::new();
    let mut last = 0;
    for (pos, opportunity) in linebreaks(text) {
        let raw = &text[last..pos];
        last = pos;
        let trimmed = raw.trim_end_matches(is_hard_break);
        let mandatory =
            opportunity == BreakOpportunity::Mandatory && trimmed.len() != raw.len();
        if raw.is_empty() {
            continue;
        }
        units.push(BreakUnit {
            text: trimmed,
            mandatory,
        });
    }
    units
}

/// Cut `word` into chunks no wider than `max_width`, each the longest
/// prefix of the remainder that fits. Concatenating the chunks gives back
/// `word` exactly.
///
/// Fails with the offending character if even one character is too wide.
pub fn hard_split<'a>(
    word: &'a str,
    max_width: f64,
    width_of: impl Fn(&str) -> f64,
) -> Result<Vec<&'a str>, char> {
    let mut chunks = Vec::new();
    let mut rest = word;
    while let Some(first) = rest.chars().next() {
        let mut end = 0;
        for (idx, ch) in rest.char_indices() {
            let candidate = idx + ch.len_utf8();
            if width_of(&rest[..candidate]) > max_width {
                break;
            }
            end = candidate;
        }
        if end == 0 {
            return Err(first);
        }
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(units: &[BreakUnit<'a>]) -> Vec<&'a str> {
        units.iter().map(|u| u.text).collect()
    }

    #[test]
    fn test_units_keep_trailing_spaces() {
        let units = break_units("The quick brown fox");
        assert_eq!(texts(&units), vec!["The ", "quick ", "brown ", "fox"]);
        assert!(units.iter().all(|u| !u.mandatory));
    }

    #[test]
    fn test_newline_is_mandatory() {
        let units = break_units("one\ntwo");
        assert_eq!(
            units,
            vec![
                BreakUnit {
                    text: "one",
                    mandatory: true
                },
                BreakUnit {
                    text: "two",
                    mandatory: false
                },
            ]
        );
    }

    #[test]
    fn test_crlf_and_lone_newline() {
        let units = break_units("a\r\nb");
        assert_eq!(texts(&units), vec!["a", "b"]);
        assert!(units[0].mandatory);

        let units = break_units("\n");
        assert_eq!(
            units,
            vec![BreakUnit {
                text: "",
                mandatory: true
            }]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(break_units("").is_empty());
    }

    #[test]
    fn test_hard_split_prefix_maximality() {
        let word = "Supercalifragilisticexpialidocious";
        let chunks = hard_split(word, 80.0, |s| s.chars().count() as f64 * 10.0).unwrap();
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![8, 8, 8, 8, 2]);
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn test_hard_split_multibyte() {
        let chunks = hard_split("ééééé", 2.0, |s| s.chars().count() as f64).unwrap();
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_hard_split_too_narrow() {
        assert_eq!(hard_split("abc", 5.0, |s| s.len() as f64 * 10.0), Err('a'));
    }
}
