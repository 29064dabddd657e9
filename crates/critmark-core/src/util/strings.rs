/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    result
}

/// Largest char boundary `<= index`.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= index`.
pub fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// The last `n` characters of `s`.
pub fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// The first `n` characters of `s`.
pub fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Byte window of up to `n` characters ending at `end`.
pub fn window_before(s: &str, end: usize, n: usize) -> &str {
    let end = floor_char_boundary(s, end);
    tail_chars(&s[..end], n)
}

/// Byte window of up to `n` characters starting at `start`.
pub fn window_after(s: &str, start: usize, n: usize) -> &str {
    let start = ceil_char_boundary(s, start);
    head_chars(&s[start..], n)
}

/// Lowercased alphanumeric words of `s`.
pub fn words(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_whitespace_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \n\n b\tc  "), "a b c");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn char_boundaries_step_over_multibyte() {
        let s = "aé";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(ceil_char_boundary(s, 2), 3);
        assert_eq!(floor_char_boundary(s, 10), 3);
    }

    #[test]
    fn head_and_tail_count_characters() {
        assert_eq!(head_chars("héllo", 2), "hé");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("hi", 10), "hi");
    }

    #[test]
    fn windows_clamp_to_the_string() {
        let s = "0123456789";
        assert_eq!(window_before(s, 5, 3), "234");
        assert_eq!(window_after(s, 8, 5), "89");
    }

    #[test]
    fn words_split_on_punctuation() {
        let w: Vec<_> = words("Hello, World! It's 2024.").collect();
        assert_eq!(w, vec!["hello", "world", "it", "s", "2024"]);
    }
}
