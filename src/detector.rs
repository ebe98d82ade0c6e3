//! Detector Interface
//!
//! Common interface of the structure detectors plus the driver loop that runs
//! several of them: a failing attempt (external tool trouble, no structure
//! found) contributes zero candidates and the run continues with the next
//! detector.
//!

use crate::decomposition::Decomposition;
use crate::util::*;

pub trait Detector {
    fn name(&self) -> &'static str;

    /// one detection attempt; `Ok(vec![])` means "nothing found", `Err` means
    /// the attempt itself failed (e.g. the external partitioner died)
    fn detect(&mut self, problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError>;
}

/// run every detector, skipping failed attempts
pub fn detect_all(problem: &dyn ProblemSource, detectors: &mut [Box<dyn Detector>]) -> Vec<Decomposition> {
    let mut candidates = vec![];
    for detector in detectors.iter_mut() {
        match detector.detect(problem) {
            Ok(decompositions) => candidates.extend(decompositions),
            Err(error) => {
                eprintln!("detector {} failed, skipping: {}", detector.name(), error);
            }
        }
    }
    candidates
}

#[cfg(test)]
pub mod tests {
    use super::*;

    struct FailingDetector;
    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn detect(&mut self, _problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError> {
            Err(DetectError::Partitioner {
                command: "mock".to_string(),
                reason: "always fails".to_string(),
            })
        }
    }

    struct EmptyDetector;
    impl Detector for EmptyDetector {
        fn name(&self) -> &'static str {
            "empty"
        }
        fn detect(&mut self, _problem: &dyn ProblemSource) -> Result<Vec<Decomposition>, DetectError> {
            Ok(vec![Decomposition::new("empty".to_string())])
        }
    }

    #[test]
    fn detector_driver_skips_failures() {
        // cargo test detector_driver_skips_failures -- --nocapture
        let problem = SparseProblem::with_conss(2, vec![vec![0], vec![1]]);
        let mut detectors: Vec<Box<dyn Detector>> = vec![Box::new(FailingDetector), Box::new(EmptyDetector)];
        let candidates = detect_all(&problem, &mut detectors);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].detector, "empty");
    }
}
