//! The encode, verify, solve pipeline for one test instance.
//!
//! Stages run strictly in order and the first failure ends the run:
//!
//! 1. **Construct**: write the source OPB.
//! 2. **Encode**: run the encoder, which leaves a CNF and a proof.
//! 3. **Verify**: run the proof checker on the source and the proof.
//! 4. **Load CNF**: parse the encoder's clauses.
//! 5. **Minimize** / **Maximize**: pose the clauses plus an objective to
//!    the solver.
//!
//! The ordering is enforced by types: [`Pipeline::encode`] performs stages
//! 1-4 and is the only way to obtain an [`Encoded`], which in turn is the
//! only thing that can be queried. A CNF whose proof has not been checked
//! can never reach the solver.
//!
//! ```no_run
//! use pbdiff::artifacts::ArtifactPaths;
//! use pbdiff::driver::Pipeline;
//! use pbdiff::expr::Expression;
//! use pbdiff::tools::{EncodingStrategy, Toolchain};
//! use pbdiff::types::Var;
//!
//! # fn main() -> Result<(), pbdiff::error::PipelineError> {
//! let tools = Toolchain::exhaustive();
//! let xs = Var::range(3);
//! let sum = Expression::weighted_sum(&[1, 1, 1], &xs);
//!
//! let artifacts = ArtifactPaths::new("generated", "at_least_two");
//! let encoded = Pipeline::new(&tools, artifacts, EncodingStrategy::default())
//!     .encode(&[sum.clone().geq(2).normalize()])?;
//! let result = encoded.minimize(&sum)?;
//! assert_eq!(result.objective_value, Some(2));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;

use log::{debug, info};

use crate::artifacts::ArtifactPaths;
use crate::cnf::CnfFormula;
use crate::error::{PipelineError, Query};
use crate::expr::{Expression, NormalizedConstraint, NormalizedExpr};
use crate::opb::OpbFormula;
use crate::tools::{EncodingStrategy, RunResult, Toolchain};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Construct,
    Encode,
    Verify,
    LoadCnf,
    Minimize,
    Maximize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Construct => "construct",
            Stage::Encode => "encode",
            Stage::Verify => "verify",
            Stage::LoadCnf => "load-cnf",
            Stage::Minimize => "minimize",
            Stage::Maximize => "maximize",
        };
        write!(f, "{}", name)
    }
}

impl From<Query> for Stage {
    fn from(query: Query) -> Self {
        match query {
            Query::Minimize => Stage::Minimize,
            Query::Maximize => Stage::Maximize,
        }
    }
}

/// A pipeline run that has not yet produced a verified encoding.
#[derive(Debug)]
pub struct Pipeline<'t> {
    tools: &'t Toolchain,
    artifacts: ArtifactPaths,
    strategy: EncodingStrategy,
}

impl<'t> Pipeline<'t> {
    pub fn new(tools: &'t Toolchain, artifacts: ArtifactPaths, strategy: EncodingStrategy) -> Self {
        Self {
            tools,
            artifacts,
            strategy,
        }
    }

    pub fn artifacts(&self) -> &ArtifactPaths {
        &self.artifacts
    }

    /// Runs Construct, Encode, Verify and Load CNF.
    pub fn encode(self, constraints: &[NormalizedConstraint]) -> Result<Encoded<'t>, PipelineError> {
        let name = self.artifacts.test_name().to_string();

        debug!("[{}] {}", name, Stage::Construct);
        self.artifacts.create_dir()?;
        let source = self.artifacts.source();
        OpbFormula::new(constraints.to_vec()).save(&source)?;

        debug!("[{}] {} with {}", name, Stage::Encode, self.strategy);
        let output = self.tools.encoder().encode(&source, self.strategy)?;

        debug!("[{}] {}", name, Stage::Verify);
        self.tools.checker().check(&source, &output.proof)?;

        debug!("[{}] {}", name, Stage::LoadCnf);
        let cnf = CnfFormula::load(&output.cnf)?;
        info!(
            "[{}] verified encoding: {} clauses over {} variables",
            name,
            cnf.num_clauses(),
            cnf.num_vars()
        );

        Ok(Encoded {
            tools: self.tools,
            artifacts: self.artifacts,
            cnf,
        })
    }
}

/// A verified encoding, ready to be queried.
#[derive(Debug)]
pub struct Encoded<'t> {
    tools: &'t Toolchain,
    artifacts: ArtifactPaths,
    cnf: CnfFormula,
}

impl Encoded<'_> {
    pub fn cnf(&self) -> &CnfFormula {
        &self.cnf
    }

    pub fn artifacts(&self) -> &ArtifactPaths {
        &self.artifacts
    }

    /// Minimum of `objective` over the models of the encoding.
    pub fn minimize(&self, objective: &Expression) -> Result<RunResult, PipelineError> {
        let objective = objective.normalize();
        self.solve(Query::Minimize, &objective, self.artifacts.min_query())
    }

    /// Maximum of `objective`, computed as `-min(-objective)`.
    ///
    /// The objective is normalized before negation, so duplicate occurrences
    /// of a variable are folded first and never counted twice.
    pub fn maximize(&self, objective: &Expression) -> Result<RunResult, PipelineError> {
        let negated = objective.normalize().negate();
        let result = self.solve(Query::Maximize, &negated, self.artifacts.max_query())?;
        Ok(result.negated())
    }

    fn solve(&self, query: Query, objective: &NormalizedExpr, path: PathBuf) -> Result<RunResult, PipelineError> {
        let name = self.artifacts.test_name();
        debug!("[{}] {}: min {}", name, Stage::from(query), objective);

        OpbFormula::new(self.cnf.to_constraints())
            .with_objective(objective.without_offset())
            .with_min_vars(self.cnf.num_vars())
            .save(&path)?;
        let result = self.tools.solver().solve(&path)?.shifted(objective.offset());

        info!("[{}] {}: {}", name, Stage::from(query), result);
        Ok(result)
    }
}
