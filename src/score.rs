//! Decomposition Scoring
//!
//! Ranks candidate decompositions: the more of the incidence matrix ends up
//! outside both the blocks and the linking border, the better the candidate
//! works as a column-generation reformulation.
//!

use crate::decomposition::Decomposition;
use crate::incidence::RelevantView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecompositionScore {
    /// share of the matrix area covered neither by a block nor by the border
    pub max_white: f64,
    /// share of the matrix area claimed by linking variables and constraints
    pub border_area: f64,
    /// smallest over largest block constraint count, 1.0 = perfectly balanced
    pub block_balance: f64,
}

pub fn score(decomposition: &Decomposition, view: &RelevantView) -> DecompositionScore {
    let nconss = view.num_conss() as f64;
    let nvars = view.num_vars() as f64;
    let total = nconss * nvars;
    let block_area: f64 = decomposition
        .blocks
        .iter()
        .map(|block| (block.conss.len() * block.vars.len()) as f64)
        .sum();
    let linking_vars = decomposition.linking_vars.len() as f64;
    let linking_conss = decomposition.linking_conss.len() as f64;
    // border columns and rows overlap in their intersection cells
    let border_area = (linking_vars * nconss + linking_conss * nvars - linking_vars * linking_conss) / total;
    let max_white = 1.0 - border_area - block_area / total;
    let largest = decomposition.blocks.iter().map(|block| block.conss.len()).max().unwrap_or(0);
    let smallest = decomposition.blocks.iter().map(|block| block.conss.len()).min().unwrap_or(0);
    let block_balance = if largest == 0 { 0.0 } else { smallest as f64 / largest as f64 };
    DecompositionScore {
        max_white,
        border_area,
        block_balance,
    }
}

/// index of the candidate with the largest white share, ties keep the first
pub fn best_candidate(decompositions: &[Decomposition], view: &RelevantView) -> Option<usize> {
    (0..decompositions.len()).reduce(|best, index| {
        if score(&decompositions[index], view).max_white > score(&decompositions[best], view).max_white {
            index
        } else {
            best
        }
    })
}
