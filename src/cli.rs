use crate::cutpacking::*;
use crate::decomposition::Decomposition;
use crate::detector::*;
use crate::example_problems::*;
use crate::hrgpartition::*;
use crate::stairheur::*;
use crate::util::*;
use clap::builder::{StringValueParser, TypedValueParser, ValueParser};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand, ValueEnum};
use pbr::ProgressBar;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[clap(author = clap::crate_authors!(", "))]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Structure detection for Dantzig-Wolfe decomposition of mixed-integer programs")]
#[clap(color = clap::ColorChoice::Auto)]
#[clap(propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
pub struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// run one detector on a problem instance
    Detect(DetectParameters),
    /// benchmark a detector on random shuffled staircase instances
    Benchmark(BenchmarkParameters),
    /// built-in tests
    Test {
        #[clap(subcommand)]
        command: TestCommands,
    },
}

#[derive(Parser, Clone)]
pub struct DetectParameters {
    /// problem instance file (JSON serialization of a sparse problem)
    #[clap(value_parser)]
    input: PathBuf,
    /// the detector to run
    #[clap(short = 'd', long, value_enum, default_value_t = DetectorType::Stairheur)]
    detector: DetectorType,
    /// the configuration of the detector
    #[clap(long, default_value_t = json!({}), value_parser = ValueParser::new(SerdeJsonParser))]
    config: serde_json::Value,
    /// write the decomposition snapshots to this file
    #[clap(short = 'o', long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Clone)]
pub struct BenchmarkParameters {
    /// number of staircase blocks of the generated instances
    #[clap(value_parser)]
    blocks: usize,
    /// rows per block
    #[clap(short = 'r', long, default_value_t = 8)]
    rows_per_block: usize,
    /// variables per block
    #[clap(short = 'v', long, default_value_t = 8)]
    vars_per_block: usize,
    /// overlap variables between consecutive blocks
    #[clap(long, default_value_t = 2)]
    overlap: usize,
    /// the number of rounds to run
    #[clap(long, default_value_t = 100)]
    total_rounds: usize,
    /// the detector to benchmark
    #[clap(short = 'd', long, value_enum, default_value_t = DetectorType::Stairheur)]
    detector: DetectorType,
    /// the configuration of the detector
    #[clap(long, default_value_t = json!({}), value_parser = ValueParser::new(SerdeJsonParser))]
    config: serde_json::Value,
    /// use deterministic per-round seeds for reproducible runs
    #[clap(long, action)]
    use_deterministic_seed: bool,
    /// message on the progress bar
    #[clap(long, default_value_t = format!(""))]
    pb_message: String,
}

#[derive(Subcommand, Clone, Debug)]
pub enum TestCommands {
    /// test the detectors on the example problems
    Common,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorType {
    /// staircase detection via rank-order clustering
    Stairheur,
    /// recursive min-cut bisection
    Cutpacking,
    /// external k-way hypergraph partitioning
    Hrgpartition,
}

impl DetectorType {
    pub fn build(&self, config: serde_json::Value) -> Box<dyn Detector> {
        match self {
            Self::Stairheur => Box::new(StairheurDetector::new(
                serde_json::from_value(config).expect("invalid stairheur config"),
            )),
            Self::Cutpacking => Box::new(CutpackingDetector::new(
                serde_json::from_value(config).expect("invalid cutpacking config"),
            )),
            Self::Hrgpartition => Box::new(HrgPartitionDetector::new(
                serde_json::from_value(config).expect("invalid hrgpartition config"),
            )),
        }
    }
}

#[derive(Clone)]
struct SerdeJsonParser;
impl TypedValueParser for SerdeJsonParser {
    type Value = serde_json::Value;
    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let inner = StringValueParser::new();
        let val = inner.parse_ref(cmd, arg, value)?;
        match serde_json::from_str::<serde_json::Value>(&val) {
            Ok(vector) => Ok(vector),
            Err(error) => {
                let mut err = clap::Error::new(ErrorKind::ValueValidation).with_cmd(cmd);
                if let Some(arg) = arg {
                    err.insert(ContextKind::InvalidArg, ContextValue::String(arg.to_string()));
                }
                err.insert(
                    ContextKind::InvalidValue,
                    ContextValue::String(format!("should be like {{\"a\":1}}, parse error: {error}")),
                );
                Err(err)
            }
        }
    }
}

fn print_summary(decompositions: &[Decomposition], view: &crate::incidence::RelevantView) {
    if decompositions.is_empty() {
        println!("no decomposition found");
        return;
    }
    for (index, decomposition) in decompositions.iter().enumerate() {
        let block_sizes: Vec<usize> = decomposition.blocks.iter().map(|block| block.conss.len()).collect();
        let score = crate::score::score(decomposition, view);
        println!(
            "[{}] {}: {} blocks {:?}, {} linking vars, {} linking conss, white {:.3}",
            index,
            decomposition.detector,
            decomposition.block_count(),
            block_sizes,
            decomposition.linking_vars.len(),
            decomposition.linking_conss.len(),
            score.max_white
        );
    }
    if let Some(best) = crate::score::best_candidate(decompositions, view) {
        println!("best candidate: [{best}]");
    }
}

impl Cli {
    pub fn run(self) {
        match self.command {
            Commands::Detect(DetectParameters {
                input,
                detector,
                config,
                output,
            }) => {
                let content = std::fs::read_to_string(&input)
                    .unwrap_or_else(|error| panic!("cannot read {}: {}", input.display(), error));
                let problem: SparseProblem = serde_json::from_str(&content).expect("invalid problem file");
                problem.sanity_check().expect("problem fails sanity check");
                let mut detector = detector.build(config);
                match detector.detect(&problem) {
                    Ok(decompositions) => {
                        print_summary(&decompositions, &crate::incidence::RelevantView::new(&problem));
                        if let Some(output) = output {
                            let snapshots: Vec<serde_json::Value> =
                                decompositions.iter().map(|d| d.snapshot()).collect();
                            let writer = BufWriter::new(File::create(output).expect("cannot create output file"));
                            serde_json::to_writer_pretty(writer, &snapshots).expect("cannot write output file");
                        }
                    }
                    Err(error) => {
                        eprintln!("detection attempt failed: {error}");
                        std::process::exit(1);
                    }
                }
            }
            Commands::Benchmark(BenchmarkParameters {
                blocks,
                rows_per_block,
                vars_per_block,
                overlap,
                total_rounds,
                detector,
                config,
                use_deterministic_seed,
                pb_message,
            }) => {
                // whether to disable progress bar, useful when running jobs in background
                let disable_progress_bar = env::var("DISABLE_PROGRESS_BAR").is_ok();
                let mut pb = if !disable_progress_bar {
                    let mut pb = ProgressBar::on(std::io::stderr(), total_rounds as u64);
                    pb.message(format!("{pb_message} ").as_str());
                    Some(pb)
                } else {
                    if !pb_message.is_empty() {
                        print!("{pb_message} ");
                    }
                    None
                };
                let mut rng = SmallRng::seed_from_u64(thread_rng().gen());
                let mut found = 0;
                let mut linking_sum = 0;
                for round in 0..total_rounds as u64 {
                    if let Some(pb) = pb.as_mut() {
                        pb.set(round);
                    }
                    let seed = if use_deterministic_seed { round } else { rng.next_u64() };
                    let problem = shuffle_rows(&staircase(blocks, rows_per_block, vars_per_block, overlap), seed);
                    let mut detector = detector.build(config.clone());
                    match detector.detect(&problem) {
                        Ok(decompositions) if !decompositions.is_empty() => {
                            found += 1;
                            linking_sum += decompositions
                                .iter()
                                .map(|d| d.linking_vars.len())
                                .min()
                                .unwrap();
                        }
                        Ok(_) => {}
                        Err(error) => eprintln!("round {round} failed: {error}"),
                    }
                }
                if let Some(pb) = pb.as_mut() {
                    pb.finish();
                }
                println!();
                println!(
                    "found {}/{} decompositions, mean best linking vars {:.2}",
                    found,
                    total_rounds,
                    if found > 0 { linking_sum as f64 / found as f64 } else { f64::NAN }
                );
            }
            Commands::Test { command } => match command {
                TestCommands::Common => {
                    run_common_tests();
                    println!("all common tests passed");
                }
            },
        }
    }
}

/// quick end-to-end checks over the example problems, also reachable in release builds
pub fn run_common_tests() {
    use crate::incidence::RelevantView;
    // staircase detection on clean block structure
    let problem = block_diagonal(3, 4, 4);
    let mut detector = DetectorType::Stairheur.build(json!({
        "static_blocking": false,
        "dynamic_blocking": true,
    }));
    let candidates = detector.detect(&problem).unwrap();
    assert!(!candidates.is_empty(), "stairheur missed the block diagonal");
    for decomposition in candidates.iter() {
        decomposition.assert_consistent(&RelevantView::new(&problem));
    }
    // recursive bisection on a bordered instance
    let problem = bordered_block_diagonal(2, 4, 4, 1);
    let mut detector = DetectorType::Cutpacking.build(json!({"block_size": 4}));
    let candidates = detector.detect(&problem).unwrap();
    assert_eq!(candidates.len(), 1, "cutpacking missed the bordered block diagonal");
    candidates[0].assert_consistent(&RelevantView::new(&problem));
    // a chain decomposes into weight-one cuts
    let problem = chain(8);
    let mut detector = DetectorType::Cutpacking.build(json!({"block_size": 3}));
    let candidates = detector.detect(&problem).unwrap();
    assert!(!candidates.is_empty(), "cutpacking missed the chain");
    candidates[0].assert_consistent(&RelevantView::new(&problem));
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn cli_common_tests_pass() {
        // cargo test cli_common_tests_pass -- --nocapture
        run_common_tests();
    }

    #[test]
    fn cli_detector_type_builds_with_default_config() {
        // cargo test cli_detector_type_builds_with_default_config -- --nocapture
        let problem = block_diagonal(2, 3, 3);
        for detector_type in [DetectorType::Stairheur, DetectorType::Cutpacking] {
            let mut detector = detector_type.build(json!({}));
            detector.detect(&problem).unwrap();
        }
    }
}
