//! External Partitioner Adapter
//!
//! Bridges to an hmetis-style graph partitioner: write the hypergraph to a temp
//! file, run the executable with a plain argument list (no shell involved),
//! parse the partition file it leaves next to the input. The external tool is a
//! black box; any wall-clock limit is enforced by the tool itself and the call
//! simply blocks until it exits.
//!
//! File contract: the input starts with `"<nedges> <nvertices> 1"` followed by
//! one line per hyperedge, `"<weight> <v1> <v2> ..."` with 1-indexed vertices;
//! the output `<input>.part.<k>` holds one 0-indexed block id per line in input
//! vertex order. Invocation:
//! `<executable> <file> <parts> <ubfactor> <seed> <verbosity> <rb|kway>`.
//!

use crate::incidence::Hypergraph;
use crate::util::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::prelude::*;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

/// distinguishes temp files of concurrent detection attempts within one process
static TEMP_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionMode {
    /// recursive bisection
    Rb,
    /// direct k-way partitioning
    Kway,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalPartitioner {
    /// executable name or path
    pub executable: PathBuf,
    pub mode: PartitionMode,
    /// unbalance factor handed through to the partitioner
    pub ub_factor: f64,
    pub seed: i64,
    /// verbosity level handed through to the partitioner
    pub verbosity: usize,
    /// remove temp files afterwards; disable to debug the exchange
    pub tidy: bool,
    /// where temp files go, system temp dir if unset
    pub work_dir: Option<PathBuf>,
}

impl Default for ExternalPartitioner {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("hmetis"),
            mode: PartitionMode::Rb,
            ub_factor: 5.0,
            seed: 1,
            verbosity: 0,
            tidy: true,
            work_dir: None,
        }
    }
}

impl ExternalPartitioner {
    /// partition the hypergraph into `parts` blocks, returning one block id per vertex
    pub fn partition(&self, hypergraph: &Hypergraph, parts: usize) -> Result<Vec<usize>, DetectError> {
        assert!(parts >= 2, "partitioning into fewer than two parts is meaningless");
        let input_path = self.fresh_input_path();
        let output_path = PathBuf::from(format!("{}.part.{}", input_path.display(), parts));
        let result = self.partition_files(hypergraph, parts, &input_path, &output_path);
        if self.tidy {
            // best effort on both the success and the failure path
            let _ = std::fs::remove_file(&input_path);
            let _ = std::fs::remove_file(&output_path);
        }
        result
    }

    fn partition_files(
        &self,
        hypergraph: &Hypergraph,
        parts: usize,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<Vec<usize>, DetectError> {
        write_hypergraph(hypergraph, input_path)?;
        let command = self.executable.display().to_string();
        let mode = match self.mode {
            PartitionMode::Rb => "rb",
            PartitionMode::Kway => "kway",
        };
        let status = Command::new(&self.executable)
            .arg(input_path)
            .arg(parts.to_string())
            .arg(self.ub_factor.to_string())
            .arg(self.seed.to_string())
            .arg(self.verbosity.to_string())
            .arg(mode)
            .status()
            .map_err(|error| DetectError::Partitioner {
                command: command.clone(),
                reason: format!("failed to spawn: {error}"),
            })?;
        if !status.success() {
            return Err(DetectError::Partitioner {
                command,
                reason: format!("exit status {status}"),
            });
        }
        parse_partition(output_path, hypergraph.vertex_count, parts)
    }

    fn fresh_input_path(&self) -> PathBuf {
        let dir = self.work_dir.clone().unwrap_or_else(std::env::temp_dir);
        let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.join(format!("blockdec-{}-{}.hgr", std::process::id(), counter))
    }
}

pub fn write_hypergraph(hypergraph: &Hypergraph, path: &Path) -> Result<(), DetectError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{} {} 1", hypergraph.hyperedges.len(), hypergraph.vertex_count)?;
    for hyperedge in hypergraph.hyperedges.iter() {
        write!(writer, "{}", hyperedge.weight)?;
        for &vertex in hyperedge.vertices.iter() {
            write!(writer, " {}", vertex + 1)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn parse_partition(path: &Path, vertex_count: usize, parts: usize) -> Result<Vec<usize>, DetectError> {
    let malformed = |reason: String| DetectError::MalformedPartition {
        path: path.display().to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path)
        .map_err(|error| malformed(format!("unreadable: {error}")))?;
    let mut partition = vec![];
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let block: usize = line
            .parse()
            .map_err(|_| malformed(format!("line {} is not a block id: {:?}", line_number + 1, line)))?;
        if block >= parts {
            return Err(malformed(format!("block id {} out of range 0..{}", block, parts)));
        }
        partition.push(block);
    }
    if partition.len() != vertex_count {
        return Err(malformed(format!(
            "{} entries for {} vertices",
            partition.len(),
            vertex_count
        )));
    }
    Ok(partition)
}
