//! External collaborators of the pipeline.
//!
//! The encoder, the proof checker and the solver are capabilities with a
//! single operation each. [`process`] implements them by running the real
//! programs and [`reference`] by exhaustive enumeration; other harnesses may
//! plug in their own.
//!
//! Encoding choices are closed enums, turned into command-line flags only
//! inside [`process::ProcessEncoder`].

pub mod process;
pub mod reference;
pub mod result;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

pub use self::process::{ProcessChecker, ProcessEncoder, ProcessSolver};
pub use self::reference::{EquivalenceChecker, ExhaustiveEncoder, ExhaustiveSolver};
pub use self::result::{RunResult, SolveStatus};

/// How the encoder turns cardinality constraints into clauses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CardinalityEncoding {
    #[default]
    Totalizer,
    SequentialCounter,
}

impl CardinalityEncoding {
    /// Value of the encoder's `-card=` option.
    pub fn flag(self) -> &'static str {
        match self {
            CardinalityEncoding::SequentialCounter => "0",
            CardinalityEncoding::Totalizer => "1",
        }
    }
}

/// How the encoder turns general PB constraints into clauses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PbEncoding {
    #[default]
    GeneralizedTotalizer,
    Adder,
}

impl PbEncoding {
    /// Value of the encoder's `-pb=` option.
    pub fn flag(self) -> &'static str {
        match self {
            PbEncoding::GeneralizedTotalizer => "0",
            PbEncoding::Adder => "1",
        }
    }
}

/// Cardinality strategy paired with a PB strategy.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct EncodingStrategy {
    pub cardinality: CardinalityEncoding,
    pub pb: PbEncoding,
}

impl EncodingStrategy {
    pub fn new(cardinality: CardinalityEncoding, pb: PbEncoding) -> Self {
        Self { cardinality, pb }
    }
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.cardinality, self.pb)
    }
}

/// Files left behind by a successful encoder run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EncoderOutput {
    pub cnf: PathBuf,
    pub proof: PathBuf,
}

impl EncoderOutput {
    /// The encoder's convention: same stem as the input, `.cnf` and `.pbp`.
    pub fn beside(instance: &Path) -> Self {
        Self {
            cnf: instance.with_extension("cnf"),
            proof: instance.with_extension("pbp"),
        }
    }
}

/// Translates an OPB file into CNF plus a checkable proof.
pub trait Encoder: Send + Sync {
    fn encode(&self, instance: &Path, strategy: EncodingStrategy) -> Result<EncoderOutput, PipelineError>;
}

/// Checks that a proof certifies the encoding of an OPB file.
///
/// Any failure must be reported as an error: an unchecked encoding makes
/// every later answer meaningless.
pub trait ProofChecker: Send + Sync {
    fn check(&self, instance: &Path, proof: &Path) -> Result<(), PipelineError>;
}

/// Minimizes the objective of an OPB file.
pub trait Solver: Send + Sync {
    fn solve(&self, instance: &Path) -> Result<RunResult, PipelineError>;
}

/// Exit codes that end a solver run normally.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SolverExitCodes {
    pub optimum: i32,
    pub unsatisfiable: i32,
}

impl Default for SolverExitCodes {
    fn default() -> Self {
        Self {
            optimum: 30,
            unsatisfiable: 20,
        }
    }
}

impl SolverExitCodes {
    pub fn is_terminal(&self, code: i32) -> bool {
        code == self.optimum || code == self.unsatisfiable
    }
}

/// Locations and exit-code contracts of the external programs.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub encoder: PathBuf,
    pub checker: PathBuf,
    pub solver: PathBuf,
    pub encoder_success_code: i32,
    pub solver_codes: SolverExitCodes,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            encoder: PathBuf::from("veritaspblib"),
            checker: PathBuf::from("veripb"),
            solver: PathBuf::from("roundingsat"),
            encoder_success_code: 0,
            solver_codes: SolverExitCodes::default(),
        }
    }
}

impl ToolchainConfig {
    pub const ENCODER_VAR: &'static str = "PBDIFF_ENCODER";
    pub const CHECKER_VAR: &'static str = "PBDIFF_CHECKER";
    pub const SOLVER_VAR: &'static str = "PBDIFF_SOLVER";

    /// Defaults, with program paths overridden by `PBDIFF_ENCODER`,
    /// `PBDIFF_CHECKER` and `PBDIFF_SOLVER` when set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        if let Some(path) = lookup(Self::ENCODER_VAR) {
            self.encoder = path;
        }
        if let Some(path) = lookup(Self::CHECKER_VAR) {
            self.checker = path;
        }
        if let Some(path) = lookup(Self::SOLVER_VAR) {
            self.solver = path;
        }
        self
    }
}

/// The three collaborators used by one pipeline run.
pub struct Toolchain {
    encoder: Box<dyn Encoder>,
    checker: Box<dyn ProofChecker>,
    solver: Box<dyn Solver>,
}

impl Toolchain {
    pub fn new(
        encoder: impl Encoder + 'static,
        checker: impl ProofChecker + 'static,
        solver: impl Solver + 'static,
    ) -> Self {
        Self {
            encoder: Box::new(encoder),
            checker: Box::new(checker),
            solver: Box::new(solver),
        }
    }

    /// Process-backed tools as described by `config`.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(
            ProcessEncoder::new(&config.encoder, config.encoder_success_code),
            ProcessChecker::new(&config.checker),
            ProcessSolver::new(&config.solver, config.solver_codes),
        )
    }

    /// In-process tools, for instances within the oracle's reach.
    pub fn exhaustive() -> Self {
        Self::new(ExhaustiveEncoder, EquivalenceChecker, ExhaustiveSolver)
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn checker(&self) -> &dyn ProofChecker {
        self.checker.as_ref()
    }

    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}
