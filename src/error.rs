//! Error types of the verification pipeline.
//!
//! Pipeline faults ([`PipelineError`]) abort a single test instance and are
//! never retried: a bad exit code means either a defect under test or a
//! misconfigured environment. A wrong answer from an otherwise healthy
//! pipeline is an [`AssertionMismatch`], reported by the check layer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed OPB, CNF or solver output.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("unterminated clause at end of input: {0:?}")]
    UnterminatedClause(Vec<i32>),
    #[error("unknown solver status `{0}`")]
    UnknownStatus(String),
    #[error("solver output has no status line")]
    MissingStatus,
}

impl ParseError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Fatal failure of one pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("encoder `{program}` on `{input}` exited with {}", fmt_code(.code))]
    EncoderFailure {
        program: String,
        input: PathBuf,
        code: Option<i32>,
    },
    #[error("proof `{proof}` rejected for `{instance}`: {reason}")]
    VerificationFailure {
        instance: PathBuf,
        proof: PathBuf,
        reason: String,
    },
    #[error("solver `{program}` on `{input}` exited with {}", fmt_code(.code))]
    SolverFailure {
        program: String,
        input: PathBuf,
        code: Option<i32>,
    },
    #[error("could not launch `{program}`")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error on `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("test name `{0}` is not a valid file stem")]
    InvalidTestName(String),
    #[error("instance has {vars} variables, the oracle enumerates at most {max}")]
    OracleTooLarge { vars: usize, max: usize },
    #[error("panicked: {message}")]
    Panicked { message: String },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        PipelineError::Parse {
            path: path.into(),
            source,
        }
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no code (terminated by signal)".to_string(),
    }
}

/// Which optimization query a mismatch belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Query {
    Minimize,
    Maximize,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Minimize => write!(f, "minimize"),
            Query::Maximize => write!(f, "maximize"),
        }
    }
}

/// The result field that disagreed with the oracle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Field {
    Status,
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Status => write!(f, "status"),
            Field::Value => write!(f, "value"),
        }
    }
}

/// One disagreement between the pipeline and the oracle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Mismatch {
    pub query: Query,
    pub field: Field,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: expected {}, got {}",
            self.query, self.field, self.expected, self.actual
        )
    }
}

/// The reported result of a test instance differs from the oracle.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("{test_name}: {}", join_mismatches(.mismatches))]
pub struct AssertionMismatch {
    pub test_name: String,
    pub mismatches: Vec<Mismatch>,
}

fn join_mismatches(mismatches: &[Mismatch]) -> String {
    mismatches.iter().map(|m| m.to_string()).collect::<Vec<_>>().join("; ")
}
