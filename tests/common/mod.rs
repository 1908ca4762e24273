//! Faulty tools for exercising the harness's failure paths.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pbdiff::cnf::CnfFormula;
use pbdiff::error::PipelineError;
use pbdiff::tools::{
    Encoder, EncoderOutput, EncodingStrategy, ExhaustiveEncoder, ExhaustiveSolver, ProofChecker, RunResult,
    Solver,
};

/// Encodes exhaustively, then loses the last clause.
pub struct LossyEncoder;

impl Encoder for LossyEncoder {
    fn encode(&self, instance: &Path, strategy: EncodingStrategy) -> Result<EncoderOutput, PipelineError> {
        let output = ExhaustiveEncoder.encode(instance, strategy)?;
        let cnf = CnfFormula::load(&output.cnf)?;
        let num_vars = cnf.num_vars();
        let mut clauses = cnf.clauses().to_vec();
        clauses.pop();
        let lossy = CnfFormula::new(clauses).with_declared_vars(num_vars);
        fs::write(&output.cnf, lossy.to_dimacs_string()).unwrap();
        Ok(output)
    }
}

/// Crashes on every instance whose file name contains the pattern and
/// encodes the others exhaustively.
pub struct CrashingEncoder(pub &'static str);

impl Encoder for CrashingEncoder {
    fn encode(&self, instance: &Path, strategy: EncodingStrategy) -> Result<EncoderOutput, PipelineError> {
        let name = instance.file_name().unwrap_or_default().to_string_lossy();
        if !name.contains(self.0) {
            return ExhaustiveEncoder.encode(instance, strategy);
        }
        Err(PipelineError::EncoderFailure {
            program: "crashing".to_string(),
            input: instance.to_path_buf(),
            code: Some(134),
        })
    }
}

/// Accepts every proof.
pub struct TrustingChecker;

impl ProofChecker for TrustingChecker {
    fn check(&self, _: &Path, _: &Path) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Answers every query with the same canned solver output.
pub struct CannedSolver(pub &'static str);

impl Solver for CannedSolver {
    fn solve(&self, instance: &Path) -> Result<RunResult, PipelineError> {
        RunResult::parse(self.0).map_err(|source| PipelineError::Parse {
            path: instance.to_path_buf(),
            source,
        })
    }
}

/// Panics on every query whose file name contains the pattern and solves
/// the others exhaustively.
pub struct PanickingSolver(pub &'static str);

impl Solver for PanickingSolver {
    fn solve(&self, instance: &Path) -> Result<RunResult, PipelineError> {
        let name = instance.file_name().unwrap_or_default().to_string_lossy();
        if name.contains(self.0) {
            panic!("solver blew up");
        }
        ExhaustiveSolver.solve(instance)
    }
}
