//! Staircase Detector
//!
//! Drives the staircase pipeline: relevance view -> incidence matrix ->
//! rank-order clustering -> blocking policy -> decomposition. With
//! `multiple_decomps` the desired block count sweeps the configured range and
//! every distinct blocking becomes one candidate; attempts that end with a
//! single block contribute nothing.
//!

use crate::blocking::{self, Blocking, BlockingPolicy};
use crate::decomposition::Decomposition;
use crate::detector::Detector;
use crate::incidence::RelevantView;
use crate::matrix::*;
use crate::roc::RocEngine;
use crate::translate;
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StairheurConfig {
    /// 0 = derive the desired block count from the band shape
    #[serde(default)]
    pub desired_blocks: usize,
    #[serde(default = "stairheur_default_configs::min_blocks")]
    pub min_blocks: usize,
    #[serde(default = "stairheur_default_configs::max_blocks")]
    pub max_blocks: usize,
    /// cut at constriction points, minimizing crossing variables
    #[serde(default)]
    pub dynamic_blocking: bool,
    /// cut every `conss_per_block` rows
    #[serde(default = "stairheur_default_configs::static_blocking")]
    pub static_blocking: bool,
    /// cut at the first clean boundary once a block is large enough
    #[serde(default)]
    pub blocking_assoonaspossible: bool,
    /// rows per block of the static policy
    #[serde(default = "stairheur_default_configs::conss_per_block")]
    pub conss_per_block: usize,
    /// sweep the desired block count from `min_blocks` to `max_blocks`
    #[serde(default = "stairheur_default_configs::multiple_decomps")]
    pub multiple_decomps: bool,
    /// rank-order clustering iteration cap: -1 unlimited, other values <= 0 skip
    #[serde(default = "stairheur_default_configs::max_iterations_roc")]
    pub max_iterations_roc: i64,
}

pub mod stairheur_default_configs {
    use crate::roc::DEFAULT_MAX_ITERATIONS;

    pub fn min_blocks() -> usize {
        2
    }
    pub fn max_blocks() -> usize {
        20
    }
    pub fn static_blocking() -> bool {
        true
    }
    pub fn conss_per_block() -> usize {
        32
    }
    pub fn multiple_decomps() -> bool {
        true
    }
    pub fn max_iterations_roc() -> i64 {
        DEFAULT_MAX_ITERATIONS
    }
}

impl Default for StairheurConfig {
    fn default() -> Self {
        serde_json::from_value(json!({})).unwrap()
    }
}

pub struct StairheurDetector {
    pub config: StairheurConfig,
}

impl StairheurDetector {
    pub fn new(config: StairheurConfig) -> Self {
        Self { config }
    }

    fn desired_block_counts(&self, spans: &SpanInfo, nvars: usize) -> Vec<usize> {
        let config = &self.config;
        if config.multiple_decomps {
            (config.min_blocks..=config.max_blocks).collect()
        } else if config.desired_blocks == 0 {
            vec![blocking::auto_desired_blocks(
                spans,
                nvars,
                config.min_blocks,
                config.max_blocks,
            )]
        } else {
            vec![config.desired_blocks.clamp(config.min_blocks, config.max_blocks)]
        }
    }
}

impl Detector for StairheurDetector {
    fn name(&self) -> &'static str {
        "stairheur"
    }

    fn detect(&mut self, problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError> {
        let view = RelevantView::new(problem);
        let mut ordered = Ordered::new(IncidenceMatrix::from_view(&view));
        RocEngine::new(self.config.max_iterations_roc).run(&mut ordered);
        let spans = ordered.spans();
        let rows = ordered.rows();
        let mut candidates = vec![];
        let mut seen: BTreeSet<Vec<usize>> = BTreeSet::new();
        let mut consider = |blocking: Blocking, policy: BlockingPolicy, candidates: &mut Vec<Decomposition>| {
            if blocking.block_count() <= 1 {
                // everything overlaps: this attempt found nothing
                return;
            }
            if !seen.insert(blocking.boundaries.clone()) {
                return;
            }
            candidates.push(translate::from_row_blocking(
                format!("stairheur-{policy}"),
                &view,
                &ordered,
                &blocking,
            ));
        };
        if self.config.static_blocking {
            consider(
                blocking::static_blocking(rows, self.config.conss_per_block),
                BlockingPolicy::Static,
                &mut candidates,
            );
        }
        for tau in self.desired_block_counts(&spans, view.num_vars()) {
            if self.config.dynamic_blocking {
                consider(blocking::dynamic_blocking(&spans, tau), BlockingPolicy::Dynamic, &mut candidates);
            }
            if self.config.blocking_assoonaspossible {
                consider(
                    blocking::asap_blocking(&spans, tau),
                    BlockingPolicy::AsSoonAsPossible,
                    &mut candidates,
                );
            }
        }
        Ok(candidates)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::example_problems::*;

    fn detector_with(config: serde_json::Value) -> StairheurDetector {
        StairheurDetector::new(serde_json::from_value(config).unwrap())
    }

    #[test]
    fn stairheur_config_defaults() {
        // cargo test stairheur_config_defaults -- --nocapture
        let config = StairheurConfig::default();
        assert_eq!(config.desired_blocks, 0);
        assert_eq!(config.min_blocks, 2);
        assert_eq!(config.max_blocks, 20);
        assert!(!config.dynamic_blocking);
        assert!(config.static_blocking);
        assert!(!config.blocking_assoonaspossible);
        assert!(config.multiple_decomps);
        assert_eq!(config.max_iterations_roc, crate::roc::DEFAULT_MAX_ITERATIONS);
        assert!(serde_json::from_value::<StairheurConfig>(json!({"maxiterations": 1})).is_err());
    }

    #[test]
    fn stairheur_block_diagonal_two_blocks_no_linking() {
        // cargo test stairheur_block_diagonal_two_blocks_no_linking -- --nocapture
        let problem = block_diagonal(2, 3, 3);
        // both the static and the dynamic policy must discover the two blocks
        for config in [
            json!({"static_blocking": true, "dynamic_blocking": false, "conss_per_block": 3, "multiple_decomps": false}),
            json!({"static_blocking": false, "dynamic_blocking": true, "desired_blocks": 2, "multiple_decomps": false}),
        ] {
            let mut detector = detector_with(config);
            let candidates = detector.detect(&problem).unwrap();
            assert_eq!(candidates.len(), 1);
            let decomposition = &candidates[0];
            assert_eq!(decomposition.block_count(), 2);
            assert!(decomposition.linking_vars.is_empty(), "{:?}", decomposition.linking_vars);
            assert_eq!(decomposition.blocks[0].conss.len(), 3);
            assert_eq!(decomposition.blocks[1].conss.len(), 3);
        }
    }

    #[test]
    fn stairheur_dynamic_finds_nothing_on_dense() {
        // cargo test stairheur_dynamic_finds_nothing_on_dense -- --nocapture
        let problem = dense(5, 5);
        let mut detector = detector_with(json!({
            "static_blocking": false,
            "dynamic_blocking": true,
        }));
        assert!(detector.detect(&problem).unwrap().is_empty());
    }

    #[test]
    fn stairheur_static_works_where_dynamic_gives_up() {
        // cargo test stairheur_static_works_where_dynamic_gives_up -- --nocapture
        let problem = dense(6, 5);
        let mut detector = detector_with(json!({"conss_per_block": 2, "multiple_decomps": false}));
        let candidates = detector.detect(&problem).unwrap();
        assert_eq!(candidates.len(), 1);
        let decomposition = &candidates[0];
        assert_eq!(decomposition.block_count(), 3);
        // a dense matrix makes every variable a linking variable
        assert_eq!(decomposition.linking_vars.len(), 5);
        assert!(decomposition.blocks.iter().all(|block| block.vars.is_empty()));
    }

    #[test]
    fn stairheur_sweep_deduplicates_blockings() {
        // cargo test stairheur_sweep_deduplicates_blockings -- --nocapture
        let problem = staircase(3, 2, 4, 1);
        let mut detector = detector_with(json!({
            "static_blocking": false,
            "dynamic_blocking": true,
            "multiple_decomps": true,
        }));
        let candidates = detector.detect(&problem).unwrap();
        // the whole sweep collapses to the distinct blockings
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].block_count(), 2);
    }

    #[test]
    fn stairheur_without_roc_keeps_the_given_staircase() {
        // cargo test stairheur_without_roc_keeps_the_given_staircase -- --nocapture
        // rank-order clustering pulls overlap columns to the front, which hides
        // part of this staircase; skipping it keeps the hand-made order
        let problem = staircase(3, 2, 4, 1);
        let mut detector = detector_with(json!({
            "static_blocking": false,
            "dynamic_blocking": true,
            "multiple_decomps": false,
            "desired_blocks": 3,
            "max_iterations_roc": 0,
        }));
        let candidates = detector.detect(&problem).unwrap();
        assert_eq!(candidates.len(), 1);
        let decomposition = &candidates[0];
        assert_eq!(decomposition.block_count(), 3);
        assert_eq!(decomposition.linking_vars, vec![3, 6]);
    }

    #[test]
    fn stairheur_shuffled_blocks_are_recovered() {
        // cargo test stairheur_shuffled_blocks_are_recovered -- --nocapture
        let problem = shuffle_rows(&block_diagonal(3, 4, 4), 11);
        let mut detector = detector_with(json!({
            "static_blocking": false,
            "dynamic_blocking": true,
        }));
        let candidates = detector.detect(&problem).unwrap();
        assert!(!candidates.is_empty());
        for decomposition in candidates.iter() {
            // blocks of this instance never share variables, so any contiguous
            // blocking aligned with the true blocks has no linking variables
            if decomposition.block_count() == 3 {
                assert!(decomposition.linking_vars.is_empty());
            }
        }
    }
}
