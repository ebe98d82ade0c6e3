//! Hypergraph Partitioning Detector
//!
//! Models the incidence matrix as a hypergraph and hands it to the external
//! partitioner for a direct k-way partition. In `columns` mode the constraints
//! are the vertices and every variable is a hyperedge over the constraints
//! containing it; `rows` mode is the dual, where constraints spanning the
//! partition end up on the border. With `multiple_decomps` every block count in
//! the configured range is attempted; an attempt whose partitioner invocation
//! fails is skipped and the sweep continues with the next block count.
//!

use crate::decomposition::Decomposition;
use crate::detector::Detector;
use crate::external::{ExternalPartitioner, PartitionMode};
use crate::incidence::*;
use crate::translate;
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// which side of the incidence matrix becomes the hypergraph vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HrgGraphMode {
    /// constraints as vertices, variables as hyperedges; spanning variables
    /// become linking variables
    Columns,
    /// variables as vertices, constraints as hyperedges; spanning constraints
    /// go to the border
    Rows,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HrgPartitionConfig {
    #[serde(default = "hrgpartition_default_configs::graph_mode")]
    pub graph_mode: HrgGraphMode,
    /// 0 = sweep the configured block range
    #[serde(default)]
    pub desired_blocks: usize,
    #[serde(default = "hrgpartition_default_configs::min_blocks")]
    pub min_blocks: usize,
    #[serde(default = "hrgpartition_default_configs::max_blocks")]
    pub max_blocks: usize,
    /// attempt one decomposition per block count in the range
    #[serde(default = "hrgpartition_default_configs::multiple_decomps")]
    pub multiple_decomps: bool,
    #[serde(default = "hrgpartition_default_configs::random_seed")]
    pub random_seed: i64,
    /// remove partitioner temp files, disable to debug the exchange
    #[serde(default = "hrgpartition_default_configs::tidy")]
    pub tidy: bool,
    /// unbalance factor of the external partitioner
    #[serde(default = "hrgpartition_default_configs::ub_factor")]
    pub ub_factor: f64,
    /// external partitioner executable
    #[serde(default = "hrgpartition_default_configs::partitioner")]
    pub partitioner: PathBuf,
}

pub mod hrgpartition_default_configs {
    use super::HrgGraphMode;
    use std::path::PathBuf;

    pub fn graph_mode() -> HrgGraphMode {
        HrgGraphMode::Columns
    }
    pub fn min_blocks() -> usize {
        2
    }
    pub fn max_blocks() -> usize {
        10
    }
    pub fn multiple_decomps() -> bool {
        true
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

impl Default for HrgPartitionConfig {
    fn default() -> Self {
        serde_json::from_value(json!({})).unwrap()
    }
}

pub struct HrgPartitionDetector {
    pub config: HrgPartitionConfig,
}

impl HrgPartitionDetector {
    pub fn new(config: HrgPartitionConfig) -> Self {
        Self { config }
    }

    fn block_counts(&self) -> Vec<usize> {
        let config = &self.config;
        if config.desired_blocks > 0 {
            vec![config.desired_blocks.max(2)]
        } else if config.multiple_decomps {
            (config.min_blocks.max(2)..=config.max_blocks).collect()
        } else {
            vec![config.min_blocks.max(2)]
        }
    }

    fn partitioner(&self) -> ExternalPartitioner {
        ExternalPartitioner {
            executable: self.config.partitioner.clone(),
            mode: PartitionMode::Kway,
            ub_factor: self.config.ub_factor,
            seed: self.config.random_seed,
            verbosity: 0,
            tidy: self.config.tidy,
            work_dir: None,
        }
    }
}

impl Detector for HrgPartitionDetector {
    fn name(&self) -> &'static str {
        "hrgpartition"
    }

    fn detect(&mut self, problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError> {
        let view = RelevantView::new(problem);
        if view.num_conss() < 2 {
            return Ok(vec![]);
        }
        let hypergraph = match self.config.graph_mode {
            HrgGraphMode::Columns => Hypergraph::variables_over_conss(&view),
            HrgGraphMode::Rows => Hypergraph::conss_over_vars(&view),
        };
        let partitioner = self.partitioner();
        let mut candidates = vec![];
        let mut last_error = None;
        for parts in self.block_counts() {
            if parts > hypergraph.vertex_count {
                break;
            }
            let partition = match partitioner.partition(&hypergraph, parts) {
                Ok(partition) => partition,
                Err(error) => {
                    // this block-count candidate produced nothing, move on
                    last_error = Some(error);
                    continue;
                }
            };
            let decomposition = match self.config.graph_mode {
                HrgGraphMode::Columns => {
                    translate::from_partition_vector(self.name().to_string(), &view, &partition, parts)
                }
                HrgGraphMode::Rows => {
                    translate::from_variable_partition(self.name().to_string(), &view, &partition, parts)
                }
            };
            if decomposition.block_count() > 1 {
                candidates.push(decomposition);
            }
        }
        match (candidates.is_empty(), last_error) {
            (true, Some(error)) => Err(error),
            _ => Ok(candidates),
        }
    }
}
