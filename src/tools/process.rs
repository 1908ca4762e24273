//! Tools backed by external programs.
//!
//! Each call is a blocking [`Command`] run. No timeout is imposed here; a
//! harness that needs a wall-clock budget must enforce it around the run.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use log::{debug, warn};

use crate::error::PipelineError;
use crate::tools::{Encoder, EncoderOutput, EncodingStrategy, ProofChecker, RunResult, Solver, SolverExitCodes};

fn launch(program: &Path, command: &mut Command) -> Result<Output, PipelineError> {
    debug!("running {:?}", command);
    command.output().map_err(|source| PipelineError::Launch {
        program: program.display().to_string(),
        source,
    })
}

/// Last non-empty line of the program's diagnostics, for error messages.
fn last_words(output: &Output) -> String {
    [&output.stderr, &output.stdout]
        .iter()
        .filter_map(|bytes| {
            String::from_utf8_lossy(bytes)
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
        })
        .next()
        .unwrap_or_else(|| match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        })
}

/// `<encoder> -card=<n> -pb=<n> -verified <instance.opb>`
#[derive(Debug, Clone)]
pub struct ProcessEncoder {
    program: PathBuf,
    success_code: i32,
}

impl ProcessEncoder {
    pub fn new(program: impl Into<PathBuf>, success_code: i32) -> Self {
        Self {
            program: program.into(),
            success_code,
        }
    }
}

impl Encoder for ProcessEncoder {
    fn encode(&self, instance: &Path, strategy: EncodingStrategy) -> Result<EncoderOutput, PipelineError> {
        let mut command = Command::new(&self.program);
        command
            .arg(format!("-card={}", strategy.cardinality.flag()))
            .arg(format!("-pb={}", strategy.pb.flag()))
            .arg("-verified")
            .arg(instance)
            .stdout(Stdio::null());
        let output = launch(&self.program, &mut command)?;

        let code = output.status.code();
        if code != Some(self.success_code) {
            warn!("encoder failed on {}: {}", instance.display(), last_words(&output));
            return Err(PipelineError::EncoderFailure {
                program: self.program.display().to_string(),
                input: instance.to_path_buf(),
                code,
            });
        }
        Ok(EncoderOutput::beside(instance))
    }
}

/// `<checker> <instance.opb> <proof.pbp>`, accepted on a zero exit status.
#[derive(Debug, Clone)]
pub struct ProcessChecker {
    program: PathBuf,
}

impl ProcessChecker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ProofChecker for ProcessChecker {
    fn check(&self, instance: &Path, proof: &Path) -> Result<(), PipelineError> {
        let mut command = Command::new(&self.program);
        command.arg(instance).arg(proof);
        let output = launch(&self.program, &mut command)?;

        if output.status.success() {
            return Ok(());
        }
        Err(PipelineError::VerificationFailure {
            instance: instance.to_path_buf(),
            proof: proof.to_path_buf(),
            reason: last_words(&output),
        })
    }
}

/// `<solver> <instance.opb>`, with its output parsed as a [`RunResult`].
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    program: PathBuf,
    codes: SolverExitCodes,
}

impl ProcessSolver {
    pub fn new(program: impl Into<PathBuf>, codes: SolverExitCodes) -> Self {
        Self {
            program: program.into(),
            codes,
        }
    }
}

impl Solver for ProcessSolver {
    fn solve(&self, instance: &Path) -> Result<RunResult, PipelineError> {
        let mut command = Command::new(&self.program);
        command.arg(instance);
        let output = launch(&self.program, &mut command)?;

        let code = output.status.code();
        if !code.is_some_and(|code| self.codes.is_terminal(code)) {
            warn!("solver failed on {}: {}", instance.display(), last_words(&output));
            return Err(PipelineError::SolverFailure {
                program: self.program.display().to_string(),
                input: instance.to_path_buf(),
                code,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        RunResult::parse(&stdout).map_err(|e| PipelineError::parse(instance, e))
    }
}
