//! Unicode case folding.
//!
//! Matching is case-insensitive everywhere, so every comparison goes through
//! full case folding (`ß` folds to `ss`, `Σ`/`σ`/`ς` fold together). Folding
//! can change byte lengths, which is why the locator folds through
//! [`MappedText`](super::mapped::MappedText) instead of calling these directly
//! on a haystack.

use icu::casemap::CaseMapper;

/// Fold a whole string.
pub fn fold_case(s: &str) -> String {
    if s.is_ascii() {
        return s.to_ascii_lowercase();
    }
    CaseMapper::new().fold_string(s)
}

/// Append the folded form of `c` to `out`.
pub fn push_folded(c: char, mapper: &CaseMapper, out: &mut String) {
    if c.is_ascii() {
        out.push(c.to_ascii_lowercase());
    } else {
        let mut buf = [0u8; 4];
        out.push_str(&mapper.fold_string(c.encode_utf8(&mut buf)));
    }
}
