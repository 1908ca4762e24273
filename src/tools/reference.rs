//! Exhaustive in-process tools.
//!
//! These honour the same file contracts as the external programs but decide
//! everything by enumeration, so they only handle a few variables
//! (see [`MAX_ORACLE_VARS`](crate::oracle::MAX_ORACLE_VARS)). They serve as
//! a known-good baseline for the harness itself and let the pipeline run
//! without any external program installed.

use std::fs;
use std::path::Path;

use log::debug;

use crate::cnf::{Clause, CnfFormula};
use crate::error::PipelineError;
use crate::opb::OpbFormula;
use crate::oracle::{self, assignments};
use crate::tools::{Encoder, EncoderOutput, EncodingStrategy, ProofChecker, RunResult, Solver};
use crate::types::Var;

const PROOF_HEADER: &str = "pseudo-Boolean proof version 1.2\n";

/// Encodes an OPB file by blocking every violating assignment with one
/// clause. No auxiliary variables are introduced.
#[derive(Debug, Copy, Clone, Default)]
pub struct ExhaustiveEncoder;

impl ExhaustiveEncoder {
    pub fn encode_formula(formula: &OpbFormula) -> CnfFormula {
        let support = Var::range(formula.num_vars());
        let clauses: Vec<Clause> = assignments(&support)
            .filter(|a| !formula.is_satisfied(|v| a.value(v)))
            .map(|a| {
                support
                    .iter()
                    .map(|&v| if a.value(v) { v.neg() } else { v.pos() })
                    .collect()
            })
            .collect();
        CnfFormula::new(clauses)
    }
}

impl Encoder for ExhaustiveEncoder {
    fn encode(&self, instance: &Path, strategy: EncodingStrategy) -> Result<EncoderOutput, PipelineError> {
        debug!("exhaustive encoding of {} (ignoring {})", instance.display(), strategy);
        let formula = OpbFormula::load(instance)?;
        let cnf = Self::encode_formula(&formula);

        let output = EncoderOutput::beside(instance);
        // Keep the declared count so that unconstrained variables survive.
        let text = cnf.with_declared_vars(formula.num_vars()).to_dimacs_string();
        fs::write(&output.cnf, text).map_err(|e| PipelineError::io(&output.cnf, e))?;
        fs::write(&output.proof, PROOF_HEADER).map_err(|e| PipelineError::io(&output.proof, e))?;
        Ok(output)
    }
}

/// Accepts a proof iff the sibling `.cnf`, projected onto the variables of
/// the OPB instance, has exactly the models of that instance.
///
/// Variables above the instance's own are auxiliary: an assignment to the
/// instance variables is a CNF model if some setting of the auxiliaries
/// satisfies every clause. Both sides are enumerated, so this only scales
/// to encodings with a handful of auxiliaries.
#[derive(Debug, Copy, Clone, Default)]
pub struct EquivalenceChecker;

impl ProofChecker for EquivalenceChecker {
    fn check(&self, instance: &Path, proof: &Path) -> Result<(), PipelineError> {
        let rejected = |reason: String| PipelineError::VerificationFailure {
            instance: instance.to_path_buf(),
            proof: proof.to_path_buf(),
            reason,
        };

        let header = fs::read_to_string(proof).map_err(|e| PipelineError::io(proof, e))?;
        if !header.starts_with(PROOF_HEADER) {
            return Err(rejected("missing proof header".to_string()));
        }

        let formula = OpbFormula::load(instance)?;
        let cnf = CnfFormula::load(proof.with_extension("cnf"))?;
        let num_vars = formula.num_vars();
        let support = Var::range(num_vars);
        let aux: Vec<Var> = (num_vars + 1..=cnf.num_vars()).map(Var::new).collect();
        debug!("checking {} against {} with {} auxiliary variables", instance.display(), proof.display(), aux.len());

        let mismatch = assignments(&support).find(|a| {
            let encoded = assignments(&aux).any(|b| {
                cnf.is_satisfied(|v| if v.id() <= num_vars { a.value(v) } else { b.value(v) })
            });
            formula.is_satisfied(|v| a.value(v)) != encoded
        });
        match mismatch {
            None => Ok(()),
            Some(a) => {
                let witness: Vec<String> = support
                    .iter()
                    .map(|&v| (if a.value(v) { v.pos() } else { v.neg() }).to_string())
                    .collect();
                Err(rejected(format!("models differ at {}", witness.join(" "))))
            }
        }
    }
}

/// Minimizes by enumeration.
#[derive(Debug, Copy, Clone, Default)]
pub struct ExhaustiveSolver;

impl Solver for ExhaustiveSolver {
    fn solve(&self, instance: &Path) -> Result<RunResult, PipelineError> {
        let formula = OpbFormula::load(instance)?;
        let objective = formula.objective().cloned().unwrap_or_default();
        let result = match oracle::minimize(formula.constraints(), &objective) {
            Some(value) => RunResult::optimum(value),
            None => RunResult::unsatisfiable(),
        };
        debug!("exhaustive solver on {}: {}", instance.display(), result);
        Ok(result)
    }
}
