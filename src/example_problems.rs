//! Example Problems
//!
//! Constructors for structured MIP incidence patterns, used by the tests, the
//! benchmark command and the built-in test command. These are toy instances to
//! exercise and demonstrate the detectors, not realistic models.
//!

use crate::util::*;
use rand_xoshiro::rand_core::RngCore;

/// `blocks` independent dense blocks of `rows_per_block` x `vars_per_block`,
/// no shared variables between blocks
pub fn block_diagonal(blocks: usize, rows_per_block: usize, vars_per_block: usize) -> SparseProblem {
    let mut conss = vec![];
    for block in 0..blocks {
        let vars: Vec<VarIndex> = (block * vars_per_block..(block + 1) * vars_per_block).collect();
        for _ in 0..rows_per_block {
            conss.push(vars.clone());
        }
    }
    SparseProblem::with_conss(blocks * vars_per_block, conss)
}

/// block diagonal plus `linking_vars` variables appearing in every constraint
pub fn bordered_block_diagonal(
    blocks: usize,
    rows_per_block: usize,
    vars_per_block: usize,
    linking_vars: usize,
) -> SparseProblem {
    let num_vars = blocks * vars_per_block + linking_vars;
    let border: Vec<VarIndex> = (blocks * vars_per_block..num_vars).collect();
    let mut conss = vec![];
    for block in 0..blocks {
        let mut vars: Vec<VarIndex> = (block * vars_per_block..(block + 1) * vars_per_block).collect();
        vars.extend(border.iter().copied());
        for _ in 0..rows_per_block {
            conss.push(vars.clone());
        }
    }
    SparseProblem::with_conss(num_vars, conss)
}

/// staircase of `blocks` dense blocks where consecutive blocks overlap in
/// `overlap` variables
pub fn staircase(blocks: usize, rows_per_block: usize, vars_per_block: usize, overlap: usize) -> SparseProblem {
    assert!(overlap < vars_per_block, "overlap must leave each block its own variables");
    let step = vars_per_block - overlap;
    let num_vars = blocks * step + overlap;
    let mut conss = vec![];
    for block in 0..blocks {
        let vars: Vec<VarIndex> = (block * step..block * step + vars_per_block).collect();
        for _ in 0..rows_per_block {
            conss.push(vars.clone());
        }
    }
    SparseProblem::with_conss(num_vars, conss)
}

/// `nconss` constraints where consecutive constraints share exactly one variable
/// and nothing else is shared
pub fn chain(nconss: usize) -> SparseProblem {
    let conss = (0..nconss).map(|i| vec![i, i + 1]).collect();
    SparseProblem::with_conss(nconss + 1, conss)
}

/// every constraint contains every variable
pub fn dense(rows: usize, cols: usize) -> SparseProblem {
    let all_vars: Vec<VarIndex> = (0..cols).collect();
    SparseProblem::with_conss(cols, vec![all_vars; rows])
}

/// random 0/1 incidence with the given density; every constraint keeps at least
/// one variable so the relevance filtering does not erase rows
pub fn random_sparse(rows: usize, cols: usize, density: f64, seed: u64) -> SparseProblem {
    let mut rng = seeded_rng(seed);
    let threshold = (density * u32::MAX as f64) as u64;
    let mut conss = vec![];
    for _ in 0..rows {
        let mut vars: Vec<VarIndex> = (0..cols).filter(|_| (rng.next_u32() as u64) < threshold).collect();
        if vars.is_empty() {
            vars.push((rng.next_u64() % cols as u64) as VarIndex);
        }
        conss.push(vars);
    }
    SparseProblem::with_conss(cols, conss)
}

/// the same constraints in a random order, to exercise order recovery
pub fn shuffle_rows(problem: &SparseProblem, seed: u64) -> SparseProblem {
    let mut rng = seeded_rng(seed);
    let mut shuffled = problem.clone();
    // Fisher-Yates over the constraint list
    for i in (1..shuffled.conss.len()).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        shuffled.conss.swap(i, j);
    }
    assert!(
        shuffled.inactive_conss.is_empty(),
        "shuffling does not track inactive constraint indices"
    );
    shuffled
}
