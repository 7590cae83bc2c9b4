//! Case-insensitive substring matching and name ordering.

use serde::Serialize;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Byte range of a match inside the original (not lowercased) text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn is_prefix(&self) -> bool {
        self.start == 0
    }

    /// Split `text` into the parts before, inside and after the match, for
    /// rendering the matched part in bold.
    pub fn split<'a>(&self, text: &'a str) -> (&'a str, &'a str, &'a str) {
        (
            &text[..self.start],
            &text[self.start..self.end],
            &text[self.end..],
        )
    }
}

/// Find the first case-insensitive occurrence of `needle` in `haystack`.
///
/// The returned span always falls on char boundaries of `haystack`, even
/// when lowercasing changes the byte length of some characters.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<MatchSpan> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }

    'start: for (start, _) in haystack.char_indices() {
        let mut pending = needle.iter().peekable();

        for (offset, c) in haystack[start..].char_indices() {
            for lower in c.to_lowercase() {
                match pending.next() {
                    Some(&expected) if expected == lower => {}
                    Some(_) => continue 'start,
                    None => break,
                }
            }
            if pending.peek().is_none() {
                return Some(MatchSpan {
                    start,
                    end: start + offset + c.len_utf8(),
                });
            }
        }

        // haystack ran out before the needle did; later starts are shorter
        return None;
    }

    None
}

/// Primary collation key: decomposed, accents stripped, lowercased
fn base_letters(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Secondary key: decomposed and lowercased, accents kept
fn accented_letters(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd().flat_map(char::to_lowercase)
}

/// Alphabetical order in the way a reader expects: accents and case are
/// ignored first ("Éthiopie" sorts with the E's), then accents, then the raw
/// text, so the result is total and deterministic.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| accented_letters(a).cmp(accented_letters(b)))
        .then_with(|| a.cmp(b))
}
