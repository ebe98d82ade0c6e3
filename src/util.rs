//! Common Definitions
//!
//! Index types, the abstract problem-data source consumed by every detector,
//! and the recoverable error taxonomy of a detection attempt.
//!

use derivative::Derivative;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type ConsIndex = usize;
pub type VarIndex = usize;
pub type BlockIndex = usize;
/// edge and hyperedge weights are shared-variable counts, thus integral
pub type Weight = usize;

/// errors that make a single detection attempt fail; the calling loop treats them
/// as "this attempt produced no candidate" and moves on to the next attempt
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("external partitioner `{command}` failed: {reason}")]
    Partitioner { command: String, reason: String },
    #[error("partition file {path} is malformed: {reason}")]
    MalformedPartition { path: String, reason: String },
    #[error("io error during partitioning: {0}")]
    Io(#[from] std::io::Error),
}

/// read-only queries against the host problem; the core never creates, destroys
/// or mutates constraints and variables, it only indexes them
pub trait ProblemSource {
    /// the number of constraints, including inactive ones
    fn num_conss(&self) -> usize;
    /// the number of variables, including fixed ones
    fn num_vars(&self) -> usize;
    fn is_cons_active(&self, cons_index: ConsIndex) -> bool;
    fn is_var_relevant(&self, var_index: VarIndex) -> bool;
    /// the variables of a constraint, unfiltered
    fn cons_vars(&self, cons_index: ConsIndex) -> &[VarIndex];

    fn relevant_conss(&self) -> Vec<ConsIndex> {
        (0..self.num_conss()).filter(|&c| self.is_cons_active(c)).collect()
    }

    fn relevant_vars(&self) -> Vec<VarIndex> {
        (0..self.num_vars()).filter(|&v| self.is_var_relevant(v)).collect()
    }
}

/// a constraint as seen by the detectors: only its variable incidences matter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseCons {
    /// the variables appearing with nonzero coefficient
    pub vars: Vec<VarIndex>,
}

impl SparseCons {
    pub fn new(vars: Vec<VarIndex>) -> Self {
        Self { vars }
    }
}

/// a self-contained problem instance, used as the test vehicle and the CLI input format
#[derive(Debug, Clone, Derivative, Serialize, Deserialize)]
#[derivative(Default(new = "true"))]
pub struct SparseProblem {
    /// the number of variables, constraint entries are within [0, num_vars)
    pub num_vars: usize,
    /// the constraints
    pub conss: Vec<SparseCons>,
    /// constraints deactivated by the host (e.g. redundant after presolving)
    #[serde(default)]
    pub inactive_conss: BTreeSet<ConsIndex>,
    /// variables fixed by the host, irrelevant for decomposition
    #[serde(default)]
    pub fixed_vars: BTreeSet<VarIndex>,
}

impl SparseProblem {
    pub fn with_conss(num_vars: usize, conss: Vec<Vec<VarIndex>>) -> Self {
        Self {
            num_vars,
            conss: conss.into_iter().map(SparseCons::new).collect(),
            inactive_conss: BTreeSet::new(),
            fixed_vars: BTreeSet::new(),
        }
    }

    /// sanity check to avoid out-of-range or duplicate incidences that are hard to debug
    pub fn sanity_check(&self) -> Result<(), String> {
        for (cons_index, cons) in self.conss.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for &var_index in cons.vars.iter() {
                if var_index >= self.num_vars {
                    return Err(format!(
                        "constraint {} references variable {} but num_vars is {}",
                        cons_index, var_index, self.num_vars
                    ));
                }
                if !seen.insert(var_index) {
                    return Err(format!("constraint {} references variable {} twice", cons_index, var_index));
                }
            }
        }
        for &cons_index in self.inactive_conss.iter() {
            if cons_index >= self.conss.len() {
                return Err(format!("inactive constraint {} does not exist", cons_index));
            }
        }
        for &var_index in self.fixed_vars.iter() {
            if var_index >= self.num_vars {
                return Err(format!("fixed variable {} does not exist", var_index));
            }
        }
        Ok(())
    }
}

impl ProblemSource for SparseProblem {
    fn num_conss(&self) -> usize {
        self.conss.len()
    }
    fn num_vars(&self) -> usize {
        self.num_vars
    }
    fn is_cons_active(&self, cons_index: ConsIndex) -> bool {
        !self.inactive_conss.contains(&cons_index)
    }
    fn is_var_relevant(&self, var_index: VarIndex) -> bool {
        !self.fixed_vars.contains(&var_index)
    }
    fn cons_vars(&self, cons_index: ConsIndex) -> &[VarIndex] {
        &self.conss[cons_index].vars
    }
}

/// deterministic RNG for everything that needs reproducible randomness
pub fn seeded_rng(seed: u64) -> Xoshiro256StarStar {
    Xoshiro256StarStar::seed_from_u64(seed)
}
