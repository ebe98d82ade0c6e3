//! Decomposition Result
//!
//! The output contract of every detector: constraints grouped into blocks,
//! variables either local to exactly one block or linking, plus the lookup maps
//! the host needs to build the reformulation. Violations of the completeness
//! identities indicate an upstream algorithmic bug and are assertion failures,
//! never user-visible error values.
//!

use crate::incidence::RelevantView;
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// one independent subproblem: its constraints and its exclusively-local variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub conss: Vec<ConsIndex>,
    pub vars: Vec<VarIndex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    /// the detector (and policy) that produced this candidate
    pub detector: String,
    pub blocks: Vec<Block>,
    /// variables coupling two or more blocks, handled by the master problem
    pub linking_vars: Vec<VarIndex>,
    /// constraints assigned to the border instead of a block
    pub linking_conss: Vec<ConsIndex>,
    /// constraint -> block, for constraints not in `linking_conss`
    pub cons_block: BTreeMap<ConsIndex, BlockIndex>,
    /// variable -> block, for variables not in `linking_vars`
    pub var_block: BTreeMap<VarIndex, BlockIndex>,
}

impl Decomposition {
    pub fn new(detector: String) -> Self {
        Self {
            detector,
            blocks: vec![],
            linking_vars: vec![],
            linking_conss: vec![],
            cons_block: BTreeMap::new(),
            var_block: BTreeMap::new(),
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// classify the view's variables against the current constraint assignment:
    /// local to the single block touching them, linking otherwise
    pub fn assign_vars(&mut self, view: &RelevantView) {
        self.linking_vars.clear();
        self.var_block.clear();
        for block in self.blocks.iter_mut() {
            block.vars.clear();
        }
        for (var_position, cons_positions) in view.var_incidences.iter().enumerate() {
            let var_index = view.vars[var_position];
            let mut touched: Option<BlockIndex> = None;
            let mut linking = false;
            for &cons_position in cons_positions.iter() {
                let cons_index = view.conss[cons_position];
                match self.cons_block.get(&cons_index) {
                    Some(&block_index) => match touched {
                        Some(existing) if existing != block_index => {
                            linking = true;
                            break;
                        }
                        _ => touched = Some(block_index),
                    },
                    // a border constraint couples everything it touches
                    None => {
                        linking = true;
                        break;
                    }
                }
            }
            if linking {
                self.linking_vars.push(var_index);
            } else {
                // the view guarantees at least one incident constraint
                let block_index = touched.unwrap();
                self.blocks[block_index].vars.push(var_index);
                self.var_block.insert(var_index, block_index);
            }
        }
    }

    /// completeness identities; a violation is a programming error upstream
    pub fn assert_consistent(&self, view: &RelevantView) {
        let block_conss: usize = self.blocks.iter().map(|block| block.conss.len()).sum();
        assert_eq!(
            block_conss + self.linking_conss.len(),
            view.num_conss(),
            "constraints assigned {} times, expected {}",
            block_conss + self.linking_conss.len(),
            view.num_conss()
        );
        let block_vars: usize = self.blocks.iter().map(|block| block.vars.len()).sum();
        assert_eq!(block_vars + self.linking_vars.len(), view.num_vars());
        // every constraint appears exactly once and the maps agree
        let mut seen_conss = std::collections::BTreeSet::new();
        for (block_index, block) in self.blocks.iter().enumerate() {
            for &cons_index in block.conss.iter() {
                assert!(seen_conss.insert(cons_index), "constraint {} assigned twice", cons_index);
                assert_eq!(self.cons_block.get(&cons_index), Some(&block_index));
            }
        }
        for &cons_index in self.linking_conss.iter() {
            assert!(seen_conss.insert(cons_index), "constraint {} assigned twice", cons_index);
            assert!(!self.cons_block.contains_key(&cons_index));
        }
        let mut seen_vars = std::collections::BTreeSet::new();
        for (block_index, block) in self.blocks.iter().enumerate() {
            for &var_index in block.vars.iter() {
                assert!(seen_vars.insert(var_index), "variable {} assigned twice", var_index);
                assert_eq!(self.var_block.get(&var_index), Some(&block_index));
            }
        }
        for &var_index in self.linking_vars.iter() {
            assert!(seen_vars.insert(var_index), "variable {} assigned twice", var_index);
            assert!(!self.var_block.contains_key(&var_index));
        }
    }

    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "detector": self.detector,
            "blocks": self.blocks.iter().map(|block| json!({
                "conss": block.conss,
                "vars": block.vars,
            })).collect::<Vec<_>>(),
            "linking_vars": self.linking_vars,
            "linking_conss": self.linking_conss,
        })
    }
}
