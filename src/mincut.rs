//! Stoer-Wagner Minimum Cut
//!
//! Global minimum cut of a weighted undirected graph by repeated
//! maximum-adjacency sweeps: the last two vertices of every sweep are merged
//! into a supervertex and the cut-of-the-phase (the last vertex against the
//! rest) is a candidate for the global minimum. Merging keeps the adjacency
//! symmetric, so the graph handed back to the caller is never left in a
//! half-merged state.
//!
//! When two designated constraints must end up on opposite sides (they
//! represent linking groups of two different ancestor cuts), only phase cuts
//! genuinely separating them are considered. Such a phase always occurs before
//! their supervertices are merged: the merge unites the groups of the last two
//! vertices of a sweep, and the phase cut of that sweep separates them.
//!

use crate::util::*;
use std::collections::BTreeMap;

/// one bisection: `partition[i]` is true for vertices on the side that was split off
#[derive(Debug, Clone)]
pub struct Bisection {
    pub cut_weight: Weight,
    pub partition: Vec<bool>,
}

impl Bisection {
    /// vertices on the split-off side
    pub fn side(&self, value: bool) -> Vec<usize> {
        (0..self.partition.len()).filter(|&i| self.partition[i] == value).collect()
    }
}

/// global minimum cut; `must_separate` restricts the result to cuts separating
/// the two given vertices
pub fn stoer_wagner(adjacency: &[BTreeMap<usize, Weight>], must_separate: Option<(usize, usize)>) -> Bisection {
    let n = adjacency.len();
    assert!(n >= 2, "cannot bisect a graph with fewer than two vertices");
    if let Some((a, b)) = must_separate {
        assert!(a < n && b < n && a != b, "invalid must-separate pair");
    }
    // working copy: supervertex adjacency and the original members of every supervertex
    let mut graph: Vec<BTreeMap<usize, Weight>> = adjacency.to_vec();
    let mut members: Vec<Vec<usize>> = (0..n).map(|v| vec![v]).collect();
    let mut alive: Vec<bool> = vec![true; n];
    let mut alive_count = n;
    let mut best: Option<Bisection> = None;

    while alive_count >= 2 {
        // maximum adjacency sweep from the first alive vertex
        let start = (0..n).find(|&v| alive[v]).unwrap();
        let mut in_sweep = vec![false; n];
        in_sweep[start] = true;
        let mut attachment: Vec<Weight> = vec![0; n];
        for (&neighbor, &weight) in graph[start].iter() {
            attachment[neighbor] += weight;
        }
        let mut second_last = start;
        let mut last = start;
        for _ in 1..alive_count {
            let next = (0..n)
                .filter(|&v| alive[v] && !in_sweep[v])
                .max_by_key(|&v| attachment[v])
                .unwrap();
            in_sweep[next] = true;
            second_last = last;
            last = next;
            for (&neighbor, &weight) in graph[next].iter() {
                if alive[neighbor] && !in_sweep[neighbor] {
                    attachment[neighbor] += weight;
                }
            }
        }
        // cut of the phase: the members of `last` against everything else
        let cut_weight: Weight = graph[last].values().sum();
        let separates = match must_separate {
            Some((a, b)) => members[last].contains(&a) != members[last].contains(&b),
            None => true,
        };
        if separates && best.as_ref().map(|b| cut_weight < b.cut_weight).unwrap_or(true) {
            let mut partition = vec![false; n];
            for &vertex in members[last].iter() {
                partition[vertex] = true;
            }
            best = Some(Bisection { cut_weight, partition });
        }
        merge(&mut graph, &mut members, &mut alive, second_last, last);
        alive_count -= 1;
    }

    // with a must-separate pair a separating phase is guaranteed (see module doc),
    // so the fallback isolating one endpoint is unreachable in practice
    best.unwrap_or_else(|| {
        let (_, b) = must_separate.unwrap();
        let mut partition = vec![false; n];
        partition[b] = true;
        Bisection {
            cut_weight: adjacency[b].values().sum(),
            partition,
        }
    })
}

/// contract `from` into `into`, accumulating edge weights and dropping the
/// self-loop; symmetry is restored before returning
fn merge(graph: &mut [BTreeMap<usize, Weight>], members: &mut [Vec<usize>], alive: &mut [bool], into: usize, from: usize) {
    assert_ne!(into, from);
    let from_edges: Vec<(usize, Weight)> = graph[from].iter().map(|(&v, &w)| (v, w)).collect();
    for (neighbor, weight) in from_edges {
        graph[neighbor].remove(&from);
        if neighbor != into {
            *graph[into].entry(neighbor).or_insert(0) += weight;
            *graph[neighbor].entry(into).or_insert(0) += weight;
        }
    }
    graph[from].clear();
    graph[into].remove(&from);
    let moved = std::mem::take(&mut members[from]);
    members[into].extend(moved);
    alive[from] = false;
}
