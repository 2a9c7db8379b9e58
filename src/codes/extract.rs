use std::borrow::Cow;
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of alphanumerics joined by single hyphens. A SHiFT code is one whole
/// run with exactly five groups of five, so `AAAAA-...` with a sixth group
/// never yields a shorter match out of its prefix.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*").expect("invalid token regex"));

static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9]{5}(?:-[A-Z0-9]{5}){4}$").expect("invalid code regex")
});

pub fn is_shift_code(s: &str) -> bool {
    CODE_RE.is_match(s)
}

/// Every SHiFT code in `text`, upper-cased, in discovery order, each at most
/// once. Each call gets its own iterator and holds no state between calls.
pub fn extract_codes(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut seen = HashSet::new();

    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| is_shift_code(token))
        .map(|token| token.to_ascii_uppercase())
        .filter(move |code| seen.insert(code.clone()))
}

/// True when `text` holds at least one code.
pub fn contains_code(text: &str) -> bool {
    extract_codes(text).next().is_some()
}

/// `text` with every code token removed, so the characters of a code can't
/// be mistaken for reward keywords.
pub fn strip_codes(text: &str) -> Cow<'_, str> {
    TOKEN_RE.replace_all(text, |caps: &regex::Captures| {
        if is_shift_code(&caps[0]) {
            String::new()
        } else {
            caps[0].to_string()
        }
    })
}
