//! Incidence Structures
//!
//! The detectors never look at the host problem directly; they work on a
//! [`RelevantView`] that filters out inactive constraints and fixed variables and
//! assigns both sides dense positions. On top of the view live the two graph
//! representations consumed by the partitioners: the constraint adjacency graph
//! (edge weight = number of shared variables) and the hypergraph (one hyperedge
//! per variable over the constraints containing it).
//!

use crate::util::*;
use hashbrown::HashMap;
use itertools::Itertools;
use std::collections::BTreeMap;

/// dense, filtered view of the relevant part of a problem;
/// all detector-internal indices are positions into this view
#[derive(Debug, Clone)]
pub struct RelevantView {
    /// original indices of the surviving constraints, in host order
    pub conss: Vec<ConsIndex>,
    /// original indices of the surviving variables, in host order
    pub vars: Vec<VarIndex>,
    /// per constraint position, the variable positions it touches, sorted
    pub cons_incidences: Vec<Vec<usize>>,
    /// per variable position, the constraint positions touching it, sorted
    pub var_incidences: Vec<Vec<usize>>,
    cons_positions: HashMap<ConsIndex, usize>,
    var_positions: HashMap<VarIndex, usize>,
}

impl RelevantView {
    /// a problem with no relevant constraint or variable cannot be decomposed at all;
    /// that is a hard precondition, not a recoverable failure
    pub fn new(problem: &dyn ProblemSource) -> Self {
        // a constraint survives only if at least one of its variables is relevant
        let mut conss = vec![];
        let mut raw_incidences = vec![];
        for cons_index in problem.relevant_conss() {
            let vars: Vec<VarIndex> = problem
                .cons_vars(cons_index)
                .iter()
                .copied()
                .filter(|&v| problem.is_var_relevant(v))
                .collect();
            if vars.is_empty() {
                continue;
            }
            conss.push(cons_index);
            raw_incidences.push(vars);
        }
        // a variable survives only if some surviving constraint touches it
        let var_set: std::collections::BTreeSet<VarIndex> =
            raw_incidences.iter().flat_map(|vars| vars.iter().copied()).collect();
        let vars: Vec<VarIndex> = var_set.into_iter().collect();
        assert!(
            !conss.is_empty() && !vars.is_empty(),
            "no relevant constraints or variables, nothing to decompose"
        );
        let cons_positions: HashMap<ConsIndex, usize> = conss.iter().enumerate().map(|(p, &c)| (c, p)).collect();
        let var_positions: HashMap<VarIndex, usize> = vars.iter().enumerate().map(|(p, &v)| (v, p)).collect();
        let mut cons_incidences: Vec<Vec<usize>> = Vec::with_capacity(conss.len());
        let mut var_incidences: Vec<Vec<usize>> = vec![vec![]; vars.len()];
        for (cons_position, raw_vars) in raw_incidences.into_iter().enumerate() {
            let mut positions: Vec<usize> = raw_vars.iter().map(|v| var_positions[v]).collect();
            positions.sort_unstable();
            positions.dedup();
            for &var_position in positions.iter() {
                var_incidences[var_position].push(cons_position);
            }
            cons_incidences.push(positions);
        }
        Self {
            conss,
            vars,
            cons_incidences,
            var_incidences,
            cons_positions,
            var_positions,
        }
    }

    pub fn num_conss(&self) -> usize {
        self.conss.len()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn cons_position(&self, cons_index: ConsIndex) -> Option<usize> {
        self.cons_positions.get(&cons_index).copied()
    }

    pub fn var_position(&self, var_index: VarIndex) -> Option<usize> {
        self.var_positions.get(&var_index).copied()
    }
}

/// adjacency graph over constraint positions, weighted by shared-variable counts
#[derive(Debug, Clone)]
pub struct ConsGraph {
    /// per constraint position, neighbor position -> accumulated weight
    pub adjacency: Vec<BTreeMap<usize, Weight>>,
}

impl ConsGraph {
    pub fn from_view(view: &RelevantView) -> Self {
        let mut adjacency: Vec<BTreeMap<usize, Weight>> = vec![BTreeMap::new(); view.num_conss()];
        for cons_positions in view.var_incidences.iter() {
            // every unordered pair of constraints sharing this variable gains +1
            for (&a, &b) in cons_positions.iter().tuple_combinations() {
                *adjacency[a].entry(b).or_insert(0) += 1;
                *adjacency[b].entry(a).or_insert(0) += 1;
            }
        }
        let graph = Self { adjacency };
        graph.debug_assert_symmetric();
        graph
    }

    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_weight(&self, a: usize, b: usize) -> Weight {
        self.adjacency[a].get(&b).copied().unwrap_or(0)
    }

    /// adjacency must stay symmetric outside of active merge operations
    pub fn debug_assert_symmetric(&self) {
        if cfg!(debug_assertions) {
            for (a, neighbors) in self.adjacency.iter().enumerate() {
                for (&b, &weight) in neighbors.iter() {
                    assert_eq!(
                        self.adjacency[b].get(&a),
                        Some(&weight),
                        "asymmetric edge between {} and {}",
                        a,
                        b
                    );
                }
            }
        }
    }
}

/// a hyperedge is a weighted set of vertex indices
#[derive(Debug, Clone)]
pub struct HyperEdge {
    pub vertices: Vec<usize>,
    pub weight: Weight,
}

/// immutable hypergraph handed to a partitioner, built once per detection call
#[derive(Debug, Clone)]
pub struct Hypergraph {
    pub vertex_count: usize,
    pub hyperedges: Vec<HyperEdge>,
}

impl Hypergraph {
    /// constraints are the vertices, every variable becomes one hyperedge
    pub fn variables_over_conss(view: &RelevantView) -> Self {
        let hyperedges = view
            .var_incidences
            .iter()
            .map(|cons_positions| HyperEdge {
                vertices: cons_positions.clone(),
                weight: 1,
            })
            .collect();
        Self {
            vertex_count: view.num_conss(),
            hyperedges,
        }
    }

    /// the dual view: variables are the vertices, every constraint becomes one hyperedge
    pub fn conss_over_vars(view: &RelevantView) -> Self {
        let hyperedges = view
            .cons_incidences
            .iter()
            .map(|var_positions| HyperEdge {
                vertices: var_positions.clone(),
                weight: 1,
            })
            .collect();
        Self {
            vertex_count: view.num_vars(),
            hyperedges,
        }
    }

    /// one 2-pin hyperedge per adjacency edge, used when bisecting subgraphs externally
    pub fn from_adjacency(adjacency: &[BTreeMap<usize, Weight>]) -> Self {
        let mut hyperedges = vec![];
        for (a, neighbors) in adjacency.iter().enumerate() {
            for (&b, &weight) in neighbors.iter() {
                if a < b {
                    hyperedges.push(HyperEdge {
                        vertices: vec![a, b],
                        weight,
                    });
                }
            }
        }
        Self {
            vertex_count: adjacency.len(),
            hyperedges,
        }
    }
}
