//! Placeholder restoration.
//!
//! A placeholder can come back in three shapes:
//!
//! - bare: replaced by its original text;
//! - inside `{--…--}` or `{++…++}`: the wrapper is split around it and the
//!   original is spliced in between, outside any change marker;
//! - inside `{~~old~>new~~}`: the placeholder is removed from both sides; if
//!   the sides are then equal the old side is emitted with the element in
//!   place, otherwise the reduced change is emitted followed by the element.

use super::{PlaceholderToken, ProtectionLayer};
use crate::markup::{
    self, DEL_CLOSE, DEL_OPEN, INS_CLOSE, INS_OPEN, SUB_CLOSE, SUB_OPEN, SUB_SEP,
};
use crate::util::normalize_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Insertion,
    Deletion,
    Substitution,
}

impl Wrapper {
    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            Wrapper::Insertion => (INS_OPEN, INS_CLOSE),
            Wrapper::Deletion => (DEL_OPEN, DEL_CLOSE),
            Wrapper::Substitution => (SUB_OPEN, SUB_CLOSE),
        }
    }

    fn wrap(self, content: &str) -> String {
        match self {
            Wrapper::Insertion => markup::insertion(content),
            _ => markup::deletion(content),
        }
    }
}

/// The change wrapper enclosing `at..end`, as (wrapper, open start, close end).
/// Only the last opener before the placeholder is considered; it encloses the
/// placeholder when its closer lies beyond it.
fn enclosing(text: &str, at: usize, end: usize) -> Option<(Wrapper, usize, usize)> {
    let head = &text[..at];
    let (wrapper, open) = [Wrapper::Insertion, Wrapper::Deletion, Wrapper::Substitution]
        .into_iter()
        .filter_map(|w| head.rfind(w.delimiters().0).map(|pos| (w, pos)))
        .max_by_key(|&(_, pos)| pos)?;

    let (open_delim, close_delim) = wrapper.delimiters();
    let close = text[open + open_delim.len()..]
        .find(close_delim)
        .map(|p| p + open + open_delim.len())?;
    (close >= end).then_some((wrapper, open, close + close_delim.len()))
}

/// One side of a split wrapper: whitespace-only remainders stay raw.
fn push_side(out: &mut String, wrapper: Wrapper, content: &str) {
    if content.is_empty() {
        return;
    }
    if content.trim().is_empty() {
        out.push_str(content);
    } else {
        out.push_str(&wrapper.wrap(content));
    }
}

fn restore_in_wrapper(inner: &str, wrapper: Wrapper, token: &PlaceholderToken) -> String {
    let mut out = String::with_capacity(inner.len() + token.original.len());
    let mut pieces = inner.split(token.placeholder.as_str()).peekable();
    while let Some(piece) = pieces.next() {
        push_side(&mut out, wrapper, piece);
        if pieces.peek().is_some() {
            out.push_str(&token.original);
        }
    }
    out
}

fn restore_in_substitution(inner: &str, token: &PlaceholderToken) -> String {
    let (old, new) = inner.split_once(SUB_SEP).unwrap_or((inner, ""));
    let placeholder = token.placeholder.as_str();
    let old_reduced = old.replace(placeholder, "");
    let new_reduced = new.replace(placeholder, "");

    if normalize_whitespace(&old_reduced) == normalize_whitespace(&new_reduced) {
        let side = if old.contains(placeholder) { old } else { new };
        return side.replace(placeholder, &token.original);
    }

    let (old_trimmed, new_trimmed) = (old_reduced.trim(), new_reduced.trim());
    let change = match (old_trimmed.is_empty(), new_trimmed.is_empty()) {
        (true, true) => String::new(),
        (false, true) => markup::deletion(old_trimmed),
        (true, false) => markup::insertion(new_trimmed),
        (false, false) => markup::substitution(old_trimmed, new_trimmed),
    };
    if change.is_empty() {
        token.original.clone()
    } else {
        format!("{change} {}", token.original)
    }
}

/// Restore every occurrence of one token.
pub fn restore_token(text: &str, token: &PlaceholderToken) -> String {
    let mut current = text.to_string();
    while let Some(at) = current.find(token.placeholder.as_str()) {
        let end = at + token.placeholder.len();
        let replaced = match enclosing(&current, at, end) {
            None => format!("{}{}{}", &current[..at], token.original, &current[end..]),
            Some((wrapper, open, close_end)) => {
                let (open_delim, close_delim) = wrapper.delimiters();
                let inner = &current[open + open_delim.len()..close_end - close_delim.len()];
                let body = match wrapper {
                    Wrapper::Substitution => restore_in_substitution(inner, token),
                    _ => restore_in_wrapper(inner, wrapper, token),
                };
                format!("{}{}{}", &current[..open], body, &current[close_end..])
            }
        };
        current = replaced;
    }
    current
}

pub fn restore_layer(text: &str, layer: &ProtectionLayer) -> String {
    layer
        .tokens
        .iter()
        .fold(text.to_string(), |acc, token| restore_token(&acc, token))
}

/// Restore a full layer stack, last layer first.
pub fn restore(text: String, layers: &[ProtectionLayer]) -> String {
    layers
        .iter()
        .rev()
        .fold(text, |acc, layer| restore_layer(&acc, layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protect::ProtectKind;
    use pretty_assertions::assert_eq;

    fn token(placeholder: &str, original: &str) -> PlaceholderToken {
        PlaceholderToken {
            placeholder: placeholder.to_string(),
            original: original.to_string(),
            kind: ProtectKind::CrossRef,
            image: None,
        }
    }

    const PH: &str = "\u{E000}CROSSREF0\u{E001}";

    #[test]
    fn bare_placeholder_is_replaced() {
        let t = token(PH, "@fig:a");
        assert_eq!(restore_token(&format!("see {PH}."), &t), "see @fig:a.");
    }

    #[test]
    fn deletion_is_split_around_the_element() {
        let t = token(PH, "@fig:a");
        let text = format!("x {{--old {PH} text--}} y");
        assert_eq!(restore_token(&text, &t), "x {--old --}@fig:a{-- text--} y");
    }

    #[test]
    fn whitespace_remainder_is_emitted_raw() {
        let t = token(PH, "@fig:a");
        let text = format!("{{++ {PH}++}}");
        assert_eq!(restore_token(&text, &t), " @fig:a");
    }

    #[test]
    fn closed_wrapper_before_placeholder_is_ignored() {
        let t = token(PH, "@fig:a");
        let text = format!("{{--gone--}} then {PH}");
        assert_eq!(restore_token(&text, &t), "{--gone--} then @fig:a");
    }

    #[test]
    fn substitution_with_equal_sides_keeps_old_side() {
        let t = token(PH, "@fig:a");
        let text = format!("a {{~~see {PH}~>see~~}} b");
        assert_eq!(restore_token(&text, &t), "a see @fig:a b");
    }

    #[test]
    fn substitution_with_different_sides_keeps_reduced_change() {
        let t = token(PH, "@fig:a");
        let text = format!("{{~~in {PH}~>shown in~~}}");
        assert_eq!(restore_token(&text, &t), "{~~in~>shown in~~} @fig:a");

        let text = format!("{{~~{PH} old~>{PH}~~}}");
        assert_eq!(restore_token(&text, &t), "{--old--} @fig:a");
    }

    #[test]
    fn layers_restore_in_reverse() {
        let inner = token("\u{E000}CROSSREF0\u{E001}", "@fig:b");
        let outer = PlaceholderToken {
            kind: ProtectKind::Citation,
            ..token("\u{E000}CITATION1\u{E001}", "[see \u{E000}CROSSREF0\u{E001}; @doe]")
        };
        let layers = vec![
            ProtectionLayer { kind: ProtectKind::CrossRef, tokens: vec![inner] },
            ProtectionLayer { kind: ProtectKind::Citation, tokens: vec![outer] },
        ];
        assert_eq!(
            restore("as shown \u{E000}CITATION1\u{E001}".to_string(), &layers),
            "as shown [see @fig:b; @doe]"
        );
    }
}
