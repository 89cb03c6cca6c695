//! Heuristic matchers for bibliographic fields in plain page text
//!
//! Each matcher is a pure function over a block of text that returns the
//! first match, or the caller-supplied default unchanged when there is none.
//! A capture that trims to nothing is not a match.

use std::sync::LazyLock;

use regex::Regex;

/// `Title` followed by optional colon/whitespace, then the rest of the line
static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bTitle[:\s]*(.+)").unwrap());

/// `Copyright © 2004 by <author>`
static AUTHOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Copyright\s+©\s+\d{4}\s+by\s+(.+)").unwrap());

/// `ISBN`, `ISBN-10` or `ISBN-13`, then a run of digits, hyphens and X
static ISBN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bISBN(?:-10)?(?:-13)?[:\s]*([\d\-Xx]+)\b").unwrap());

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn match_title(text: &str) -> Option<String> {
    first_capture(&TITLE_PATTERN, text)
}

fn match_author(text: &str) -> Option<String> {
    first_capture(&AUTHOR_PATTERN, text)
}

fn match_isbn(text: &str) -> Option<String> {
    first_capture(&ISBN_PATTERN, text)
}

pub fn extract_title(text: &str, default: &str) -> String {
    match_title(text).unwrap_or_else(|| default.to_string())
}

pub fn extract_author(text: &str, default: &str) -> String {
    match_author(text).unwrap_or_else(|| default.to_string())
}

pub fn extract_isbn(text: &str, default: &str) -> String {
    match_isbn(text).unwrap_or_else(|| default.to_string())
}
