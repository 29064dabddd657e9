//! Longest-common-run correlation for word-level diffing.
//!
//! The correlation finds the longest contiguous run of equal items shared by
//! both sequences, then recurses on the portions before and after it. That
//! yields the same equal/deleted/inserted segmentation a reviewer would expect
//! from a track-changes view, without the scattered single-word matches a
//! classic (non-contiguous) LCS produces.

use std::fmt;

/// How a run of items relates between the two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStatus {
    Equal,
    Deleted,
    Inserted,
}

impl fmt::Display for CorrelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStatus::Equal => write!(f, "Equal"),
            CorrelationStatus::Deleted => write!(f, "Deleted"),
            CorrelationStatus::Inserted => write!(f, "Inserted"),
        }
    }
}

/// A correlated run: indices into the first and second sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedRun {
    pub status: CorrelationStatus,
    pub range1: std::ops::Range<usize>,
    pub range2: std::ops::Range<usize>,
}

/// Longest contiguous match between two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub i1: usize,
    pub i2: usize,
    pub length: usize,
}

/// Find the longest common contiguous run. Ties go to the earliest position
/// in the first sequence, then the second. O(n·m) time, O(m) space.
pub fn find_longest_match<T: PartialEq>(items1: &[T], items2: &[T]) -> Option<MatchResult> {
    let mut best = MatchResult { i1: 0, i2: 0, length: 0 };
    let mut prev = vec![0usize; items2.len() + 1];
    let mut row = vec![0usize; items2.len() + 1];

    for i in 1..=items1.len() {
        for j in 1..=items2.len() {
            row[j] = if items1[i - 1] == items2[j - 1] {
                prev[j - 1] + 1
            } else {
                0
            };
            let len = row[j];
            if len > best.length
                || (len == best.length && len > 0 && (i - len, j - len) < (best.i1, best.i2))
            {
                best = MatchResult {
                    i1: i - len,
                    i2: j - len,
                    length: len,
                };
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }

    (best.length > 0).then_some(best)
}

/// Correlate two sequences into ordered equal/deleted/inserted runs.
pub fn compute_correlation<T: PartialEq>(items1: &[T], items2: &[T]) -> Vec<CorrelatedRun> {
    let mut result = Vec::new();
    correlate(items1, items2, 0, 0, &mut result);
    flatten_correlation(result)
}

fn correlate<T: PartialEq>(
    items1: &[T],
    items2: &[T],
    offset1: usize,
    offset2: usize,
    out: &mut Vec<CorrelatedRun>,
) {
    let deleted = |out: &mut Vec<CorrelatedRun>| {
        if !items1.is_empty() {
            out.push(CorrelatedRun {
                status: CorrelationStatus::Deleted,
                range1: offset1..offset1 + items1.len(),
                range2: offset2..offset2,
            });
        }
    };
    let inserted = |out: &mut Vec<CorrelatedRun>| {
        if !items2.is_empty() {
            out.push(CorrelatedRun {
                status: CorrelationStatus::Inserted,
                range1: offset1 + items1.len()..offset1 + items1.len(),
                range2: offset2..offset2 + items2.len(),
            });
        }
    };

    let Some(m) = find_longest_match(items1, items2) else {
        deleted(out);
        inserted(out);
        return;
    };

    correlate(&items1[..m.i1], &items2[..m.i2], offset1, offset2, out);
    out.push(CorrelatedRun {
        status: CorrelationStatus::Equal,
        range1: offset1 + m.i1..offset1 + m.i1 + m.length,
        range2: offset2 + m.i2..offset2 + m.i2 + m.length,
    });
    let after1 = m.i1 + m.length;
    let after2 = m.i2 + m.length;
    correlate(
        &items1[after1..],
        &items2[after2..],
        offset1 + after1,
        offset2 + after2,
        out,
    );
}

/// Merge adjacent runs of the same status.
pub fn flatten_correlation(runs: Vec<CorrelatedRun>) -> Vec<CorrelatedRun> {
    let mut result: Vec<CorrelatedRun> = Vec::with_capacity(runs.len());
    for run in runs {
        match result.last_mut() {
            Some(last) if last.status == run.status => {
                last.range1.end = run.range1.end;
                last.range2.end = run.range2.end;
            }
            _ => result.push(run),
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    Equal,
    Insert,
    Delete,
}

/// One segment of a word diff; `value` is the segment's words joined by
/// single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub diff_type: DiffType,
    pub value: String,
}

/// Word-level diff of two texts split on whitespace.
pub fn diff_words(text1: &str, text2: &str) -> Vec<DiffResult> {
    let words1: Vec<&str> = text1.split_whitespace().collect();
    let words2: Vec<&str> = text2.split_whitespace().collect();

    compute_correlation(&words1, &words2)
        .into_iter()
        .map(|run| match run.status {
            CorrelationStatus::Equal => DiffResult {
                diff_type: DiffType::Equal,
                value: words1[run.range1].join(" "),
            },
            CorrelationStatus::Deleted => DiffResult {
                diff_type: DiffType::Delete,
                value: words1[run.range1].join(" "),
            },
            CorrelationStatus::Inserted => DiffResult {
                diff_type: DiffType::Insert,
                value: words2[run.range2].join(" "),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_longest_match_identical() {
        let result = find_longest_match(&items("abc"), &items("abc")).unwrap();
        assert_eq!(result, MatchResult { i1: 0, i2: 0, length: 3 });
    }

    #[test]
    fn test_find_longest_match_with_diff() {
        let result = find_longest_match(&items("abcd"), &items("xbcy")).unwrap();
        assert_eq!(result, MatchResult { i1: 1, i2: 1, length: 2 });
    }

    #[test]
    fn test_find_longest_match_prefers_earliest_tie() {
        let result = find_longest_match(&items("abxab"), &items("ab")).unwrap();
        assert_eq!(result, MatchResult { i1: 0, i2: 0, length: 2 });
    }

    #[test]
    fn test_find_longest_match_none() {
        assert!(find_longest_match(&items("abc"), &items("xyz")).is_none());
        assert!(find_longest_match(&items(""), &items("ab")).is_none());
    }

    #[test]
    fn test_compute_correlation_insertion() {
        let runs = compute_correlation(&items("ac"), &items("abc"));
        let statuses: Vec<_> = runs.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                CorrelationStatus::Equal,
                CorrelationStatus::Inserted,
                CorrelationStatus::Equal
            ]
        );
        assert_eq!(runs[1].range2, 1..2);
    }

    #[test]
    fn test_compute_correlation_empty_sides() {
        let runs = compute_correlation(&items(""), &items("ab"));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, CorrelationStatus::Inserted);

        let runs = compute_correlation(&items("ab"), &items(""));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, CorrelationStatus::Deleted);

        assert!(compute_correlation(&items(""), &items("")).is_empty());
    }

    #[test]
    fn test_flatten_merges_adjacent_same_status() {
        let runs = vec![
            CorrelatedRun { status: CorrelationStatus::Deleted, range1: 0..1, range2: 0..0 },
            CorrelatedRun { status: CorrelationStatus::Deleted, range1: 1..2, range2: 0..0 },
            CorrelatedRun { status: CorrelationStatus::Equal, range1: 2..3, range2: 0..1 },
        ];
        let result = flatten_correlation(runs);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].range1, 0..2);
    }

    #[test]
    fn test_diff_words_replacement() {
        let result = diff_words("hello big world", "hello small world");
        assert_eq!(
            result,
            vec![
                DiffResult { diff_type: DiffType::Equal, value: "hello".into() },
                DiffResult { diff_type: DiffType::Delete, value: "big".into() },
                DiffResult { diff_type: DiffType::Insert, value: "small".into() },
                DiffResult { diff_type: DiffType::Equal, value: "world".into() },
            ]
        );
    }

    #[test]
    fn test_diff_words_identical() {
        let result = diff_words("same  words\nhere", "same words here");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].diff_type, DiffType::Equal);
        assert_eq!(result[0].value, "same words here");
    }
}
