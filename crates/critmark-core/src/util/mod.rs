pub mod fold;
pub mod lcs;
pub mod mapped;
pub mod strings;

pub use fold::fold_case;
pub use lcs::{compute_correlation, diff_words, CorrelationStatus, DiffResult, DiffType};
pub use mapped::MappedText;
pub use strings::{
    ceil_char_boundary, floor_char_boundary, head_chars, normalize_whitespace, tail_chars,
    window_after, window_before, words,
};
