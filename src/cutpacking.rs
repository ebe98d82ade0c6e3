//! Recursive Min-Cut Partitioner
//!
//! Recursively bisects the constraint adjacency graph until all surviving
//! subgraphs are single blocks. Every cut classifies the constraints with a
//! neighbor across the cut as linking; each side either becomes a terminal
//! block or a child subgraph in which that side's linking constraints collapse
//! into one representative vertex. Representatives fan back out into their
//! block once the recursion has finished (see `translate`).
//!
//! Subgraphs live in an arena of slots addressed by stable ids with an explicit
//! free list; children never point at parents, the driver loop owns the
//! traversal. The count of constraints across finished blocks, live subgraphs
//! and pending merged members is conserved throughout and debug-asserted.
//!

use crate::decomposition::Decomposition;
use crate::detector::Detector;
use crate::external::{ExternalPartitioner, PartitionMode};
use crate::incidence::*;
use crate::mincut;
use crate::translate::{self, MergedGroup};
use crate::util::*;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CutAlgorithm {
    /// internal Stoer-Wagner global minimum cut
    StoerWagner,
    /// invoke the configured external graph partitioner
    ExternalPartitioner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutpackingConfig {
    #[serde(default = "cutpacking_default_configs::algorithm")]
    pub algorithm: CutAlgorithm,
    /// stop splitting subgraphs once they are at most `block_size` constraints,
    /// even when a desired block count is set
    #[serde(default)]
    pub fixed_blocks: bool,
    #[serde(default = "cutpacking_default_configs::block_size")]
    pub block_size: usize,
    /// 0 = split until subgraphs reach `block_size`
    #[serde(default)]
    pub desired_blocks: usize,
    #[serde(default = "cutpacking_default_configs::random_seed")]
    pub random_seed: i64,
    /// remove partitioner temp files, disable to debug the exchange
    #[serde(default = "cutpacking_default_configs::tidy")]
    pub tidy: bool,
    /// unbalance factor of the external partitioner
    #[serde(default = "cutpacking_default_configs::ub_factor")]
    pub ub_factor: f64,
    /// external partitioner executable
    #[serde(default = "cutpacking_default_configs::partitioner")]
    pub partitioner: PathBuf,
}

pub mod cutpacking_default_configs {
    use super::CutAlgorithm;
    use std::path::PathBuf;

    pub fn algorithm() -> CutAlgorithm {
        CutAlgorithm::StoerWagner
    }
    pub fn block_size() -> usize {
        20
    }
    pub fn random_seed() -> i64 {
        1
    }
    pub fn tidy() -> bool {
        true
    }
    pub fn ub_factor() -> f64 {
        5.0
    }
    pub fn partitioner() -> PathBuf {
        PathBuf::from("hmetis")
    }
}

impl Default for CutpackingConfig {
    fn default() -> Self {
        serde_json::from_value(json!({})).unwrap()
    }
}

/// one subgraph awaiting a cut; `conss` are constraint positions of the
/// relevance view, `cons1`/`cons2` the inherited constraints that the next cut
/// has to separate when both are present
#[derive(Debug, Clone)]
struct SubGraph {
    conss: Vec<usize>,
    /// local adjacency, indices into `conss`
    adjacency: Vec<BTreeMap<usize, Weight>>,
    /// constraint position -> local index
    positions: HashMap<usize, usize>,
    cons1: Option<usize>,
    cons2: Option<usize>,
}

impl SubGraph {
    fn root(graph: &ConsGraph) -> Self {
        let conss: Vec<usize> = (0..graph.num_vertices()).collect();
        Self {
            positions: conss.iter().map(|&c| (c, c)).collect(),
            adjacency: graph.adjacency.clone(),
            conss,
            cons1: None,
            cons2: None,
        }
    }

    fn len(&self) -> usize {
        self.conss.len()
    }

    fn has_special(&self) -> bool {
        self.cons1.is_some() || self.cons2.is_some()
    }
}

/// slot arena owning all live subgraphs; ids stay stable, freed slots are reused
#[derive(Debug, Default)]
struct GraphArena {
    slots: Vec<Option<SubGraph>>,
    free: Vec<usize>,
}

impl GraphArena {
    fn insert(&mut self, node: SubGraph) -> usize {
        match self.free.pop() {
            Some(id) => {
                debug_assert!(self.slots[id].is_none());
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn remove(&mut self, id: usize) -> SubGraph {
        let node = self.slots[id].take().expect("removing an empty arena slot");
        self.free.push(id);
        node
    }

    fn total_conss(&self) -> usize {
        self.slots.iter().flatten().map(|node| node.conss.len()).sum()
    }
}

/// local indices of the constraints with at least one neighbor across the cut
pub fn linking_constraints(adjacency: &[BTreeMap<usize, Weight>], partition: &[bool]) -> Vec<usize> {
    (0..adjacency.len())
        .filter(|&a| adjacency[a].keys().any(|&b| partition[b] != partition[a]))
        .collect()
}

enum SideOutcome {
    /// constraint positions of a finished block, and whether it carries a
    /// forced linking constraint (relevant for the chain start hint)
    Terminal(Vec<usize>, bool),
    Child(SubGraph),
}

pub struct CutpackingDetector {
    pub config: CutpackingConfig,
}

impl CutpackingDetector {
    pub fn new(config: CutpackingConfig) -> Self {
        Self { config }
    }

    fn should_terminate(&self, node: &SubGraph, finished_blocks: usize, pending: usize) -> bool {
        if node.len() < 2 {
            return true;
        }
        let config = &self.config;
        if config.desired_blocks > 0 && finished_blocks + pending + 1 >= config.desired_blocks {
            return true;
        }
        if (config.fixed_blocks || config.desired_blocks == 0) && node.len() <= config.block_size {
            return true;
        }
        false
    }

    fn bisect(&self, node: &SubGraph) -> Result<Vec<bool>, DetectError> {
        match self.config.algorithm {
            CutAlgorithm::StoerWagner => {
                let must_separate = match (node.cons1, node.cons2) {
                    (Some(a), Some(b)) => Some((node.positions[&a], node.positions[&b])),
                    _ => None,
                };
                Ok(mincut::stoer_wagner(&node.adjacency, must_separate).partition)
            }
            CutAlgorithm::ExternalPartitioner => {
                let hypergraph = Hypergraph::from_adjacency(&node.adjacency);
                let partitioner = ExternalPartitioner {
                    executable: self.config.partitioner.clone(),
                    mode: PartitionMode::Rb,
                    ub_factor: self.config.ub_factor,
                    seed: self.config.random_seed,
                    verbosity: 0,
                    tidy: self.config.tidy,
                    work_dir: None,
                };
                let partition = partitioner.partition(&hypergraph, 2)?;
                Ok(partition.into_iter().map(|block| block == 1).collect())
            }
        }
    }

    /// build the outcome of one side of a cut: a terminal block, or a child
    /// subgraph with this side's linking constraints merged into a representative
    fn split_side(
        node: &SubGraph,
        partition: &[bool],
        side: bool,
        merged_groups: &mut Vec<MergedGroup>,
    ) -> SideOutcome {
        let members: Vec<usize> = (0..node.len()).filter(|&i| partition[i] == side).collect();
        debug_assert!(!members.is_empty());
        let linking_all = linking_constraints(&node.adjacency, partition);
        let linking: Vec<usize> = linking_all.iter().copied().filter(|&i| partition[i] == side).collect();
        let core: Vec<usize> = members.iter().copied().filter(|i| !linking.contains(i)).collect();
        let inherited: Vec<usize> = [node.cons1, node.cons2]
            .into_iter()
            .flatten()
            .filter(|c| partition[node.positions[c]] == side)
            .collect();
        if members.len() < 2 || core.is_empty() {
            // a lone constraint, or a side consisting only of linking constraints,
            // becomes a final block as it stands
            let conss = members.iter().map(|&i| node.conss[i]).collect();
            return SideOutcome::Terminal(conss, !inherited.is_empty());
        }
        // the representative is one of the merged constraints; prefer an inherited
        // one so its separation duty survives the merge
        let representative: Option<usize> = if linking.is_empty() {
            None
        } else {
            linking
                .iter()
                .copied()
                .find(|&i| inherited.contains(&node.conss[i]))
                .or(Some(linking[0]))
        };
        if let Some(representative) = representative {
            if linking.len() > 1 {
                merged_groups.push(MergedGroup {
                    representative: node.conss[representative],
                    members: linking.iter().map(|&i| node.conss[i]).collect(),
                });
            }
        }
        // child vertices: the core plus the representative, adjacency rebuilt by
        // copying core-core edges and accumulating core-linking edges onto the
        // representative; edges among linking constraints vanish inside it
        let mut child_conss: Vec<usize> = core.iter().map(|&i| node.conss[i]).collect();
        if let Some(representative) = representative {
            child_conss.push(node.conss[representative]);
        }
        let positions: HashMap<usize, usize> = child_conss.iter().enumerate().map(|(l, &c)| (c, l)).collect();
        let mut adjacency: Vec<BTreeMap<usize, Weight>> = vec![BTreeMap::new(); child_conss.len()];
        let representative_local = representative.map(|_| child_conss.len() - 1);
        for &a in core.iter() {
            let a_local = positions[&node.conss[a]];
            for (&b, &weight) in node.adjacency[a].iter() {
                if partition[b] != side {
                    continue;
                }
                if linking.contains(&b) {
                    let r_local = representative_local.unwrap();
                    *adjacency[a_local].entry(r_local).or_insert(0) += weight;
                    *adjacency[r_local].entry(a_local).or_insert(0) += weight;
                } else if b > a {
                    let b_local = positions[&node.conss[b]];
                    adjacency[a_local].insert(b_local, weight);
                    adjacency[b_local].insert(a_local, weight);
                }
            }
        }
        // inherited constraints that survive in the child keep their special role,
        // then the fresh representative; an external cut may have ignored the
        // separation hint and left both inherited constraints here, in which case
        // the fresh representative rides along unspecial
        let mut specials: Vec<usize> = inherited
            .iter()
            .copied()
            .filter(|c| positions.contains_key(c))
            .collect();
        if let Some(representative) = representative {
            let cons = node.conss[representative];
            if !specials.contains(&cons) {
                specials.push(cons);
            }
        }
        SideOutcome::Child(SubGraph {
            conss: child_conss,
            adjacency,
            positions,
            cons1: specials.first().copied(),
            cons2: specials.get(1).copied(),
        })
    }
}

fn debug_check_conservation(total: usize, blocks: &[Vec<usize>], arena: &GraphArena, merged_groups: &[MergedGroup]) {
    if cfg!(debug_assertions) {
        let finished: usize = blocks.iter().map(|block| block.len()).sum();
        let pending_merged: usize = merged_groups.iter().map(|group| group.members.len() - 1).sum();
        assert_eq!(
            finished + arena.total_conss() + pending_merged,
            total,
            "constraint count not conserved across the recursion"
        );
    }
}

impl Detector for CutpackingDetector {
    fn name(&self) -> &'static str {
        "cutpacking"
    }

    fn detect(&mut self, problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError> {
        let view = RelevantView::new(problem);
        if view.num_conss() < 2 {
            return Ok(vec![]);
        }
        let graph = ConsGraph::from_view(&view);
        let total = view.num_conss();
        let mut arena = GraphArena::default();
        let mut active: VecDeque<usize> = VecDeque::new();
        active.push_back(arena.insert(SubGraph::root(&graph)));
        let mut blocks: Vec<Vec<usize>> = vec![];
        let mut block_has_special: Vec<bool> = vec![];
        let mut merged_groups: Vec<MergedGroup> = vec![];
        while let Some(id) = active.pop_front() {
            let node = arena.remove(id);
            if self.should_terminate(&node, blocks.len(), active.len()) {
                block_has_special.push(node.has_special());
                blocks.push(node.conss);
                debug_check_conservation(total, &blocks, &arena, &merged_groups);
                continue;
            }
            let partition = self.bisect(&node)?;
            debug_assert_eq!(partition.len(), node.len());
            if partition.iter().all(|&s| s) || partition.iter().all(|&s| !s) {
                // the partitioner refused to split; accept the subgraph as a block
                block_has_special.push(node.has_special());
                blocks.push(node.conss);
                debug_check_conservation(total, &blocks, &arena, &merged_groups);
                continue;
            }
            for side in [false, true] {
                match Self::split_side(&node, &partition, side, &mut merged_groups) {
                    SideOutcome::Terminal(conss, has_special) => {
                        block_has_special.push(has_special);
                        blocks.push(conss);
                    }
                    SideOutcome::Child(child) => {
                        active.push_back(arena.insert(child));
                    }
                }
            }
            debug_check_conservation(total, &blocks, &arena, &merged_groups);
        }
        let start_block = block_has_special.iter().position(|&special| !special);
        let decomposition = translate::from_block_lists(
            self.name().to_string(),
            &view,
            blocks,
            &merged_groups,
            start_block,
        );
        if decomposition.block_count() <= 1 {
            return Ok(vec![]);
        }
        Ok(vec![decomposition])
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_problems::*;
    use crate::mincut::stoer_wagner;

    fn detector_with(config: serde_json::Value) -> CutpackingDetector {
        CutpackingDetector::new(serde_json::from_value(config).unwrap())
    }

    #[test]
    fn cutpacking_config_defaults() {
        // cargo test cutpacking_config_defaults -- --nocapture
        let config = CutpackingConfig::default();
        assert_eq!(config.algorithm, CutAlgorithm::StoerWagner);
        assert!(!config.fixed_blocks);
        assert_eq!(config.block_size, 20);
        assert_eq!(config.desired_blocks, 0);
        assert!(config.tidy);
        let config: CutpackingConfig = serde_json::from_value(json!({"block_size": 3})).unwrap();
        assert_eq!(config.block_size, 3);
        // unknown fields are rejected instead of silently ignored
        assert!(serde_json::from_value::<CutpackingConfig>(json!({"blocksize": 3})).is_err());
    }

    #[test]
    fn cutpacking_linking_set_matches_cross_neighbors() {
        // cargo test cutpacking_linking_set_matches_cross_neighbors -- --nocapture
        let problem = random_sparse(10, 12, 0.3, 99);
        let view = RelevantView::new(&problem);
        let graph = ConsGraph::from_view(&view);
        let bisection = stoer_wagner(&graph.adjacency, None);
        // every constraint lands on exactly one side
        assert_eq!(bisection.partition.len(), view.num_conss());
        let linking = linking_constraints(&graph.adjacency, &bisection.partition);
        for a in 0..view.num_conss() {
            let has_cross_neighbor = graph.adjacency[a]
                .keys()
                .any(|&b| bisection.partition[b] != bisection.partition[a]);
            assert_eq!(linking.contains(&a), has_cross_neighbor);
        }
    }

    #[test]
    fn cutpacking_block_diagonal_splits_cleanly() {
        // cargo test cutpacking_block_diagonal_splits_cleanly -- --nocapture
        let problem = block_diagonal(2, 3, 3);
        let mut detector = detector_with(json!({"block_size": 3}));
        let decompositions = detector.detect(&problem).unwrap();
        assert_eq!(decompositions.len(), 1);
        let decomposition = &decompositions[0];
        assert_eq!(decomposition.block_count(), 2);
        assert!(decomposition.linking_vars.is_empty());
        for block in decomposition.blocks.iter() {
            assert_eq!(block.conss.len(), 3);
        }
    }

    #[test]
    fn cutpacking_chain_produces_weight_one_cuts() {
        // cargo test cutpacking_chain_produces_weight_one_cuts -- --nocapture
        let problem = chain(4);
        let mut detector = detector_with(json!({"block_size": 2}));
        let decompositions = detector.detect(&problem).unwrap();
        assert_eq!(decompositions.len(), 1);
        let decomposition = &decompositions[0];
        assert_eq!(decomposition.block_count(), 3);
        // chain ordering: consecutive blocks share a variable
        for pair in decomposition.blocks.windows(2) {
            let shared = pair[0].conss.iter().any(|&a| {
                pair[1]
                    .conss
                    .iter()
                    .any(|&b| problem.conss[a].vars.iter().any(|v| problem.conss[b].vars.contains(v)))
            });
            assert!(shared, "blocks {:?} and {:?} share nothing", pair[0].conss, pair[1].conss);
        }
    }

    #[test]
    fn cutpacking_desired_blocks_caps_the_recursion() {
        // cargo test cutpacking_desired_blocks_caps_the_recursion -- --nocapture
        let problem = chain(6);
        let mut detector = detector_with(json!({"desired_blocks": 2, "block_size": 1}));
        let decompositions = detector.detect(&problem).unwrap();
        assert_eq!(decompositions[0].block_count(), 2);
    }

    #[test]
    fn cutpacking_small_problem_finds_nothing() {
        // cargo test cutpacking_small_problem_finds_nothing -- --nocapture
        // everything fits into one block, which is no decomposition at all
        let problem = block_diagonal(2, 3, 3);
        let mut detector = detector_with(json!({}));
        assert!(detector.detect(&problem).unwrap().is_empty());
    }

    #[test]
    fn cutpacking_external_failure_propagates() {
        // cargo test cutpacking_external_failure_propagates -- --nocapture
        let problem = chain(4);
        let mut detector = detector_with(json!({
            "algorithm": "external-partitioner",
            "partitioner": "false",
            "block_size": 2,
        }));
        let result = detector.detect(&problem);
        assert!(matches!(result, Err(DetectError::Partitioner { .. })));
    }

    #[test]
    fn cutpacking_bordered_blocks_share_only_border_vars() {
        // cargo test cutpacking_bordered_blocks_share_only_border_vars -- --nocapture
        let problem = bordered_block_diagonal(2, 3, 3, 1);
        let mut detector = detector_with(json!({"block_size": 3}));
        let decompositions = detector.detect(&problem).unwrap();
        assert_eq!(decompositions.len(), 1);
        let decomposition = &decompositions[0];
        assert_eq!(decomposition.block_count(), 2);
        // the border variable couples the blocks
        assert_eq!(decomposition.linking_vars, vec![6]);
        decomposition.assert_consistent(&RelevantView::new(&problem));
    }
}
