//! Staircase Blocking Policies
//!
//! Given the span arrays of a rank-ordered incidence matrix, decide where to cut
//! the row range into contiguous blocks. Three policies: static fixed-size cuts,
//! dynamic cuts at constriction points minimizing crossing variables, and
//! as-soon-as-possible cuts at the first zero-crossing boundary once a block is
//! large enough.
//!
//! A blocking with at most one block means the policy did not find a staircase;
//! callers treat that as "nothing detected", not as an error.
//!

use crate::matrix::SpanInfo;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockingPolicy {
    Static,
    Dynamic,
    AsSoonAsPossible,
}

impl std::fmt::Display for BlockingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::AsSoonAsPossible => write!(f, "asap"),
        }
    }
}

/// a partition of the row positions `0..rows` into contiguous blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocking {
    /// the first row position of every block except the first, strictly increasing
    pub boundaries: Vec<usize>,
    /// the covered row count
    pub rows: usize,
}

impl Blocking {
    pub fn block_count(&self) -> usize {
        self.boundaries.len() + 1
    }

    pub fn ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = vec![];
        let mut start = 0;
        for &boundary in self.boundaries.iter() {
            ranges.push(start..boundary);
            start = boundary;
        }
        ranges.push(start..self.rows);
        ranges
    }
}

/// cut every `conss_per_block` rows; the remainder forms the last block
pub fn static_blocking(rows: usize, conss_per_block: usize) -> Blocking {
    assert!(conss_per_block >= 1, "block size must be positive");
    let boundaries = (1..rows.div_ceil(conss_per_block)).map(|k| k * conss_per_block).collect();
    Blocking { boundaries, rows }
}

/// the number of columns forced to cross the boundary between row positions
/// `i` and `i+1` if the matrix were cut there: `1 + iend[i] - ibegin[i+1]`;
/// nonpositive values mean a clean break
pub fn min_crossing(spans: &SpanInfo) -> Vec<i64> {
    (0..spans.ibegin.len().saturating_sub(1))
        .map(|i| 1 + spans.iend[i] as i64 - spans.ibegin[i + 1] as i64)
        .collect()
}

/// boundaries where the crossing count is a strict interior local minimum
pub fn constriction_points(crossing: &[i64]) -> Vec<usize> {
    (1..crossing.len().saturating_sub(1))
        .filter(|&i| crossing[i] < crossing[i - 1] && crossing[i] < crossing[i + 1])
        .collect()
}

/// the minimum rows per block for a desired block count
pub fn min_block_size(rows: usize, desired_blocks: usize) -> usize {
    assert!(desired_blocks >= 1);
    ((rows as f64 / (2.0 * desired_blocks as f64)).round() as usize).max(1)
}

/// a cut is a valid staircase cut only if no variable of the *previous* block is
/// still alive at the candidate row, i.e. no variable would span three blocks
pub fn is_valid_blocking(spans: &SpanInfo, previous_block: Range<usize>, candidate_first_row: usize) -> bool {
    let last_column_prev_block = previous_block.map(|row| spans.iend[row]).max().unwrap_or(0);
    last_column_prev_block < spans.ibegin[candidate_first_row]
}

/// greedy selection of constriction points with a spacing constraint and the
/// staircase validity check; candidates failing either are silently skipped
pub fn dynamic_blocking_with_min_size(spans: &SpanInfo, min_size: usize) -> Blocking {
    let rows = spans.ibegin.len();
    let crossing = min_crossing(spans);
    let mut boundaries = vec![];
    let mut block_start = 0;
    let mut previous_block: Option<Range<usize>> = None;
    for boundary in constriction_points(&crossing) {
        let candidate = boundary + 1;
        if candidate - block_start < min_size {
            continue;
        }
        if let Some(previous) = previous_block.clone() {
            if !is_valid_blocking(spans, previous, candidate) {
                continue;
            }
        }
        boundaries.push(candidate);
        previous_block = Some(block_start..candidate);
        block_start = candidate;
    }
    Blocking { boundaries, rows }
}

pub fn dynamic_blocking(spans: &SpanInfo, desired_blocks: usize) -> Blocking {
    dynamic_blocking_with_min_size(spans, min_block_size(spans.ibegin.len(), desired_blocks))
}

/// cut at the first boundary where the block already has `min_block_size` rows
/// and no variable crosses into the next row
pub fn asap_blocking(spans: &SpanInfo, desired_blocks: usize) -> Blocking {
    let rows = spans.ibegin.len();
    let min_size = min_block_size(rows, desired_blocks);
    let mut boundaries = vec![];
    let mut block_start = 0;
    let mut last_column_block = 0;
    for i in 0..rows.saturating_sub(1) {
        last_column_block = last_column_block.max(spans.iend[i]);
        if i + 1 - block_start >= min_size && last_column_block < spans.ibegin[i + 1] {
            boundaries.push(i + 1);
            block_start = i + 1;
            last_column_block = 0;
        }
    }
    Blocking { boundaries, rows }
}

/// derive the desired block count from the band shape: with n the widest and v
/// the narrowest row band, `tau = round((nvars - v) / (n - v))`; a matrix with
/// uniform band width carries no staircase signal and falls back to 2
pub fn auto_desired_blocks(spans: &SpanInfo, nvars: usize, min_blocks: usize, max_blocks: usize) -> usize {
    let rows = spans.ibegin.len();
    let n = (0..rows).map(|row| spans.row_width(row)).max().unwrap_or(1);
    let v = (0..rows).map(|row| spans.row_width(row)).min().unwrap_or(1);
    let tau = if n == v {
        2
    } else {
        ((nvars.saturating_sub(v)) as f64 / (n - v) as f64).round() as usize
    };
    tau.clamp(min_blocks, max_blocks)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_problems::*;
    use crate::incidence::RelevantView;
    use crate::matrix::*;
    use more_asserts::assert_ge;
    use test_case::test_case;

    pub fn spans_of(problem: &crate::util::SparseProblem) -> SpanInfo {
        let view = RelevantView::new(problem);
        Ordered::new(IncidenceMatrix::from_view(&view)).spans()
    }

    #[test_case(6, 2, 3 ; "even split")]
    #[test_case(7, 2, 4 ; "remainder forms last block")]
    #[test_case(5, 5, 1 ; "single block")]
    #[test_case(5, 1, 5 ; "one row per block")]
    fn blocking_static_block_count(rows: usize, conss_per_block: usize, expected_blocks: usize) {
        let blocking = static_blocking(rows, conss_per_block);
        assert_eq!(blocking.block_count(), expected_blocks);
        let ranges = blocking.ranges();
        assert_eq!(ranges.len(), expected_blocks);
        // deterministic and covering
        assert_eq!(blocking, static_blocking(rows, conss_per_block));
        assert_eq!(ranges.iter().map(|range| range.len()).sum::<usize>(), rows);
        assert!(ranges.iter().all(|range| !range.is_empty()));
    }

    #[test]
    fn blocking_dynamic_block_diagonal() {
        // cargo test blocking_dynamic_block_diagonal -- --nocapture
        // two independent 3x3 blocks: one clean constriction in the middle
        let spans = spans_of(&block_diagonal(2, 3, 3));
        let crossing = min_crossing(&spans);
        assert_eq!(crossing, vec![3, 3, 0, 3, 3]);
        assert_eq!(constriction_points(&crossing), vec![2]);
        let blocking = dynamic_blocking(&spans, 2);
        assert_eq!(blocking.boundaries, vec![3]);
        assert_eq!(blocking.block_count(), 2);
        // zero crossing variables at the selected cut
        assert_eq!(crossing[2], 0);
    }

    #[test]
    fn blocking_dynamic_dense_finds_nothing() {
        // cargo test blocking_dynamic_dense_finds_nothing -- --nocapture
        let spans = spans_of(&dense(5, 5));
        let crossing = min_crossing(&spans);
        // every boundary forces all columns across
        assert!(crossing.iter().all(|&value| value == 5));
        let blocking = dynamic_blocking(&spans, 2);
        assert_eq!(blocking.block_count(), 1);
    }

    #[test]
    fn blocking_dynamic_staircase_with_overlap() {
        // cargo test blocking_dynamic_staircase_with_overlap -- --nocapture
        // three blocks of width 4 overlapping in one variable each
        let spans = spans_of(&staircase(3, 2, 4, 1));
        let crossing = min_crossing(&spans);
        assert_eq!(crossing, vec![4, 1, 4, 1, 4]);
        assert_eq!(constriction_points(&crossing), vec![1, 3]);
        let blocking = dynamic_blocking(&spans, 3);
        assert_eq!(blocking.boundaries, vec![2, 4]);
        assert_eq!(blocking.block_count(), 3);
    }

    #[test]
    fn blocking_dynamic_validity_rejects_three_block_span() {
        // cargo test blocking_dynamic_validity_rejects_three_block_span -- --nocapture
        // a long variable from the first block reaching into the third block makes
        // the second cut invalid
        let spans = SpanInfo {
            ibegin: vec![0, 0, 0, 2, 2, 2, 5, 5, 5],
            iend: vec![7, 3, 3, 4, 4, 4, 7, 7, 7],
            jbegin: vec![],
            jend: vec![],
        };
        let crossing = min_crossing(&spans);
        assert_eq!(constriction_points(&crossing), vec![2, 5]);
        let blocking = dynamic_blocking_with_min_size(&spans, 1);
        // the first cut is accepted, the second one would let row 0's variable
        // span three blocks and is skipped
        assert_eq!(blocking.boundaries, vec![3]);
    }

    #[test]
    fn blocking_dynamic_monotone_in_min_size() {
        // cargo test blocking_dynamic_monotone_in_min_size -- --nocapture
        let spans = spans_of(&staircase(5, 3, 4, 1));
        let mut previous_count = usize::MAX;
        for min_size in 1..=spans.ibegin.len() {
            let blocking = dynamic_blocking_with_min_size(&spans, min_size);
            assert_ge!(previous_count, blocking.block_count());
            previous_count = blocking.block_count();
        }
    }

    #[test]
    fn blocking_asap_cuts_at_first_clean_boundary() {
        // cargo test blocking_asap_cuts_at_first_clean_boundary -- --nocapture
        let spans = spans_of(&block_diagonal(3, 2, 2));
        let blocking = asap_blocking(&spans, 3);
        assert_eq!(blocking.boundaries, vec![2, 4]);
        // a dense matrix has no clean boundary at all
        let spans = spans_of(&dense(4, 4));
        assert_eq!(asap_blocking(&spans, 2).block_count(), 1);
    }

    #[test]
    fn blocking_auto_desired_blocks() {
        // cargo test blocking_auto_desired_blocks -- --nocapture
        // staircase: 10 vars, widest band 4, narrowest 4 -> uniform, falls back to 2
        let spans = spans_of(&staircase(3, 2, 4, 1));
        assert_eq!(auto_desired_blocks(&spans, 10, 2, 20), 2);
        // mixed band widths: tau = round((10 - 2) / (6 - 2)) = 2
        let spans = SpanInfo {
            ibegin: vec![0, 2, 4],
            iend: vec![5, 3, 9],
            jbegin: vec![],
            jend: vec![],
        };
        assert_eq!(auto_desired_blocks(&spans, 10, 2, 20), 2);
        // clamping to the configured bounds
        assert_eq!(auto_desired_blocks(&spans, 10, 3, 20), 3);
    }
}
