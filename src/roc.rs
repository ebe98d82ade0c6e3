//! Rank-Order Clustering Engine
//!
//! Iteratively reorders the rows and columns of the incidence matrix so that
//! nonzero entries cluster toward a diagonal band (staircase pattern). One
//! iteration sorts the rows by their incidence pattern read as a binary number
//! (descending, stable) and then the columns symmetrically against the updated
//! row order; the sort is realized as a stable bring-to-front pass per column
//! (resp. row), processed back to front, rebuilding the order array each pass.
//!
//! Convergence is not guaranteed in general; the iteration cap is the safety
//! net and running into it is not an error.
//!

use crate::matrix::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ITERATIONS: i64 = 1_000_000;

/// iteration cap semantics: `-1` is unlimited, any other value `<= 0` skips the
/// engine entirely, a positive value bounds the number of iterations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocEngine {
    pub max_iterations: i64,
}

impl Default for RocEngine {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RocReport {
    /// iterations actually executed
    pub iterations: usize,
    /// whether the span arrays reached a fixed point
    pub converged: bool,
}

impl RocEngine {
    pub fn new(max_iterations: i64) -> Self {
        Self { max_iterations }
    }

    /// run to the fixed point of the `ibegin`/`iend`/`jbegin`/`jend` arrays,
    /// or until the iteration cap; the ordering is mutated in place and remains
    /// meaningful even when the cap fires first
    pub fn run(&self, ordered: &mut Ordered) -> RocReport {
        if self.max_iterations != -1 && self.max_iterations <= 0 {
            return RocReport {
                iterations: 0,
                converged: false,
            };
        }
        let mut spans = ordered.spans();
        let mut iterations = 0;
        loop {
            if self.max_iterations != -1 && iterations >= self.max_iterations as usize {
                return RocReport {
                    iterations,
                    converged: false,
                };
            }
            Self::iterate_once(ordered);
            iterations += 1;
            let new_spans = ordered.spans();
            if new_spans == spans {
                return RocReport {
                    iterations,
                    converged: true,
                };
            }
            spans = new_spans;
        }
    }

    /// a single rank-order pass: rows first, then columns against the updated row order
    pub fn iterate_once(ordered: &mut Ordered) {
        let row_order = Self::rank_rows(ordered);
        ordered.set_row_order(row_order);
        let column_order = Self::rank_columns(ordered);
        ordered.set_column_order(column_order);
    }

    /// stable partition per column from last to first: rows with a nonzero in the
    /// column move to the front, preserving relative order; afterwards the rows are
    /// sorted descending by their bit pattern in the current column order
    fn rank_rows(ordered: &Ordered) -> Vec<RowIndex> {
        let mut order: Vec<RowIndex> = ordered.row_order().to_vec();
        for column_position in (0..ordered.columns()).rev() {
            let column = ordered.column_at(column_position);
            let (mut front, back): (Vec<RowIndex>, Vec<RowIndex>) =
                order.into_iter().partition(|&row| ordered.get_entry(row, column));
            front.extend(back);
            order = front;
        }
        order
    }

    fn rank_columns(ordered: &Ordered) -> Vec<ColumnIndex> {
        let mut order: Vec<ColumnIndex> = ordered.column_order().to_vec();
        for row_position in (0..ordered.rows()).rev() {
            let row = ordered.row_at(row_position);
            let (mut front, back): (Vec<ColumnIndex>, Vec<ColumnIndex>) =
                order.into_iter().partition(|&column| ordered.get_entry(row, column));
            front.extend(back);
            order = front;
        }
        order
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_problems::*;
    use crate::incidence::RelevantView;
    use crate::util::*;
    use rand::prelude::*;

    pub fn ordered_of(problem: &SparseProblem) -> Ordered {
        let view = RelevantView::new(problem);
        Ordered::new(IncidenceMatrix::from_view(&view))
    }

    #[test]
    fn roc_dense_converges_in_one_iteration() {
        // cargo test roc_dense_converges_in_one_iteration -- --nocapture
        let problem = dense(5, 5);
        let mut ordered = ordered_of(&problem);
        let report = RocEngine::default().run(&mut ordered);
        assert!(report.converged);
        assert_eq!(report.iterations, 1);
        let spans = ordered.spans();
        assert!(spans.ibegin.iter().all(|&position| position == 0));
        assert!(spans.iend.iter().all(|&position| position == 4));
    }

    #[test]
    fn roc_fixed_point_is_idempotent() {
        // cargo test roc_fixed_point_is_idempotent -- --nocapture
        // oscillating instances are legal (the cap is the safety net), so only
        // converged runs are checked for idempotence
        let mut converged_count = 0;
        for seed in 0..10 {
            let problem = random_sparse(12, 16, 0.3, seed);
            let mut ordered = ordered_of(&problem);
            let report = RocEngine::new(1000).run(&mut ordered);
            if !report.converged {
                continue;
            }
            converged_count += 1;
            let spans = ordered.spans();
            // one more full iteration must not change the span arrays
            RocEngine::iterate_once(&mut ordered);
            assert_eq!(ordered.spans(), spans);
        }
        assert!(converged_count > 0, "no instance converged at all");
    }

    #[test]
    fn roc_orders_remain_permutations() {
        // cargo test roc_orders_remain_permutations -- --nocapture
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let problem = random_sparse(10, 14, 0.25, rng.gen());
            let mut ordered = ordered_of(&problem);
            RocEngine::new(50).run(&mut ordered);
            // `set_row_order` / `set_column_order` assert the permutation property on
            // every pass, so here it suffices to check the final state
            let mut rows: Vec<usize> = ordered.row_order().to_vec();
            rows.sort_unstable();
            assert_eq!(rows, (0..ordered.rows()).collect::<Vec<_>>());
            let mut columns: Vec<usize> = ordered.column_order().to_vec();
            columns.sort_unstable();
            assert_eq!(columns, (0..ordered.columns()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn roc_restores_shuffled_block_structure() {
        // cargo test roc_restores_shuffled_block_structure -- --nocapture
        let problem = shuffle_rows(&block_diagonal(2, 3, 3), 42);
        let mut ordered = ordered_of(&problem);
        let report = RocEngine::default().run(&mut ordered);
        assert!(report.converged);
        // after convergence the two independent blocks may appear in either order,
        // but rows of different blocks never interleave: walking the rows, the
        // variable group may change exactly once
        let group_of_row: Vec<usize> = (0..ordered.rows())
            .map(|position| {
                let row = ordered.row_at(position);
                let cons_index = ordered.row_to_cons(row);
                // variables 0..3 belong to the first block, 3..6 to the second
                problem.conss[cons_index].vars[0] / 3
            })
            .collect();
        let switches = group_of_row.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert_eq!(switches, 1, "blocks interleave: {group_of_row:?}");
    }

    #[test]
    fn roc_chain_table_after_convergence() {
        // cargo test roc_chain_table_after_convergence -- --nocapture
        // variable 1 appears in the first two constraints and moves in front of
        // variable 0, the classic rank-order shape of a chain
        let problem = chain(3);
        let mut ordered = ordered_of(&problem);
        let report = RocEngine::default().run(&mut ordered);
        assert!(report.converged);
        assert_eq!(report.iterations, 2);
        ordered.printstd();
        assert_eq!(
            ordered.printstd_str(),
            "\
┌─┬─┬─┬─┬─┐
┊ ┊1┊0┊2┊3┊
╞═╪═╪═╪═╪═╡
┊0┊1┊1┊ ┊ ┊
├─┼─┼─┼─┼─┤
┊1┊1┊ ┊1┊ ┊
├─┼─┼─┼─┼─┤
┊2┊ ┊ ┊1┊1┊
└─┴─┴─┴─┴─┘
"
        );
    }

    #[test]
    fn roc_cap_skips_or_limits() {
        // cargo test roc_cap_skips_or_limits -- --nocapture
        let problem = random_sparse(8, 8, 0.4, 7);
        // cap 0 skips entirely and leaves the identity order
        let mut ordered = ordered_of(&problem);
        let report = RocEngine::new(0).run(&mut ordered);
        assert_eq!(report.iterations, 0);
        assert!(!report.converged);
        assert_eq!(ordered.row_order(), (0..8).collect::<Vec<_>>().as_slice());
        // cap 1 runs exactly one iteration
        let report = RocEngine::new(1).run(&mut ordered);
        assert_eq!(report.iterations, 1);
        // -1 is unlimited; use an instance that provably reaches its fixed point
        let mut ordered = ordered_of(&block_diagonal(2, 3, 3));
        let report = RocEngine::new(-1).run(&mut ordered);
        assert!(report.converged);
    }
}
