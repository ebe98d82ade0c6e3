//! Partition-to-Assignment Translation
//!
//! Turns the raw output of a partitioning pass into a [`Decomposition`]: row
//! blockings from the staircase pipeline, or terminal block lists (possibly
//! containing merged representative constraints) from the recursive
//! bisection. Representative fan-out runs newest group first so that nested
//! merges resolve; afterwards blocks are chained along shared variables into a
//! linear order.
//!

use crate::blocking::Blocking;
use crate::decomposition::*;
use crate::incidence::RelevantView;
use crate::matrix::*;
use crate::util::*;
use hashbrown::HashMap;
use std::collections::BTreeSet;

/// constraints collapsed into a single representative during recursive
/// bisection; the representative is itself one of the members
#[derive(Debug, Clone)]
pub struct MergedGroup {
    /// constraint position of the surviving vertex
    pub representative: usize,
    /// all merged constraint positions, the representative included
    pub members: Vec<usize>,
}

/// contiguous row blocks of an ordered matrix -> decomposition
pub fn from_row_blocking(detector: String, view: &RelevantView, ordered: &Ordered, blocking: &Blocking) -> Decomposition {
    assert_eq!(blocking.rows, ordered.rows(), "blocking covers a different matrix");
    let mut decomposition = Decomposition::new(detector);
    for (block_index, range) in blocking.ranges().into_iter().enumerate() {
        let mut block = Block::default();
        for row_position in range {
            let cons_index = ordered.row_to_cons(ordered.row_at(row_position));
            block.conss.push(cons_index);
            decomposition.cons_block.insert(cons_index, block_index);
        }
        decomposition.blocks.push(block);
    }
    decomposition.assign_vars(view);
    decomposition.assert_consistent(view);
    decomposition
}

/// terminal block lists over constraint positions -> decomposition;
/// fans out merged groups, then orders the blocks into a staircase chain
pub fn from_block_lists(
    detector: String,
    view: &RelevantView,
    block_lists: Vec<Vec<usize>>,
    merged_groups: &[MergedGroup],
    start_block: Option<usize>,
) -> Decomposition {
    let mut assignment: HashMap<usize, usize> = HashMap::new();
    let mut blocks: Vec<Vec<usize>> = block_lists;
    for (block_index, conss) in blocks.iter().enumerate() {
        for &cons_position in conss.iter() {
            assignment.insert(cons_position, block_index);
        }
    }
    // newest representative first: its members may themselves be older
    // representatives, which then fan out in a later step of this loop
    for group in merged_groups.iter().rev() {
        assert!(
            group.members.contains(&group.representative),
            "representative must be one of the merged constraints"
        );
        let block_index = *assignment
            .get(&group.representative)
            .expect("representative was never assigned to a block");
        for &member in group.members.iter() {
            if member == group.representative {
                continue;
            }
            let previous = assignment.insert(member, block_index);
            assert!(previous.is_none(), "merged constraint {} assigned twice", member);
            blocks[block_index].push(member);
        }
    }
    for conss in blocks.iter_mut() {
        conss.sort_unstable();
    }
    let order = chain_block_order(view, &blocks, &assignment, start_block.unwrap_or(0));
    let mut decomposition = Decomposition::new(detector);
    for (block_index, &original_index) in order.iter().enumerate() {
        let mut block = Block::default();
        for &cons_position in blocks[original_index].iter() {
            let cons_index = view.conss[cons_position];
            block.conss.push(cons_index);
            decomposition.cons_block.insert(cons_index, block_index);
        }
        decomposition.blocks.push(block);
    }
    decomposition.assign_vars(view);
    decomposition.assert_consistent(view);
    decomposition
}

/// a raw 0..k partition vector over constraint positions -> decomposition;
/// block ids keep their relative order, ids no constraint ended up with vanish
pub fn from_partition_vector(detector: String, view: &RelevantView, partition: &[usize], parts: usize) -> Decomposition {
    assert_eq!(partition.len(), view.num_conss(), "partition covers a different problem");
    let mut block_lists: Vec<Vec<usize>> = vec![vec![]; parts];
    for (cons_position, &block_id) in partition.iter().enumerate() {
        block_lists[block_id].push(cons_position);
    }
    let mut decomposition = Decomposition::new(detector);
    for conss in block_lists.into_iter().filter(|conss| !conss.is_empty()) {
        let block_index = decomposition.blocks.len();
        let mut block = Block::default();
        for cons_position in conss {
            let cons_index = view.conss[cons_position];
            block.conss.push(cons_index);
            decomposition.cons_block.insert(cons_index, block_index);
        }
        decomposition.blocks.push(block);
    }
    decomposition.assign_vars(view);
    decomposition.assert_consistent(view);
    decomposition
}

/// a 0..k partition vector over *variable* positions -> decomposition; a
/// constraint whose variables live in a single block follows them, a constraint
/// spanning blocks goes to the border, and no linking variables remain
pub fn from_variable_partition(detector: String, view: &RelevantView, partition: &[usize], parts: usize) -> Decomposition {
    assert_eq!(partition.len(), view.num_vars(), "partition covers a different problem");
    let mut block_of_id = vec![usize::MAX; parts];
    let mut decomposition = Decomposition::new(detector);
    for (var_position, &block_id) in partition.iter().enumerate() {
        if block_of_id[block_id] == usize::MAX {
            block_of_id[block_id] = decomposition.blocks.len();
            decomposition.blocks.push(Block::default());
        }
        let block_index = block_of_id[block_id];
        let var_index = view.vars[var_position];
        decomposition.blocks[block_index].vars.push(var_index);
        decomposition.var_block.insert(var_index, block_index);
    }
    for (cons_position, var_positions) in view.cons_incidences.iter().enumerate() {
        let cons_index = view.conss[cons_position];
        let first_block = block_of_id[partition[var_positions[0]]];
        if var_positions.iter().all(|&v| block_of_id[partition[v]] == first_block) {
            decomposition.blocks[first_block].conss.push(cons_index);
            decomposition.cons_block.insert(cons_index, first_block);
        } else {
            decomposition.linking_conss.push(cons_index);
        }
    }
    decomposition.assert_consistent(view);
    decomposition
}

/// walk the block-adjacency-via-shared-variables chain: the next block shares a
/// variable with the current one and is neither the current nor the preceding
/// block; blocks the walk never reaches are appended in creation order
fn chain_block_order(
    view: &RelevantView,
    blocks: &[Vec<usize>],
    assignment: &HashMap<usize, usize>,
    start_block: usize,
) -> Vec<usize> {
    let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); blocks.len()];
    for cons_positions in view.var_incidences.iter() {
        let touched: BTreeSet<usize> = cons_positions
            .iter()
            .filter_map(|cons_position| assignment.get(cons_position).copied())
            .collect();
        for &a in touched.iter() {
            for &b in touched.iter() {
                if a != b {
                    neighbors[a].insert(b);
                }
            }
        }
    }
    let mut order = vec![start_block];
    let mut placed = vec![false; blocks.len()];
    placed[start_block] = true;
    let mut previous: Option<usize> = None;
    let mut current = start_block;
    loop {
        let next = neighbors[current]
            .iter()
            .copied()
            .find(|&candidate| !placed[candidate] && Some(candidate) != previous);
        match next {
            Some(next) => {
                order.push(next);
                placed[next] = true;
                previous = Some(current);
                current = next;
            }
            None => break,
        }
    }
    for block_index in 0..blocks.len() {
        if !placed[block_index] {
            order.push(block_index);
        }
    }
    order
}
