//! Solver output protocol.
//!
//! The solver reports on standard output, one item per line:
//!
//! ```text
//! c comments are ignored
//! o 7
//! o 5
//! s OPTIMUM FOUND
//! ```
//!
//! Every `o` line carries the best objective value so far, so the last one
//! wins. The `s` line carries the final status.

use std::fmt;

use crate::error::ParseError;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SolveStatus {
    Optimum,
    Satisfiable,
    Unsatisfiable,
}

impl SolveStatus {
    fn from_token(token: &str) -> Result<Self, ParseError> {
        match token {
            "OPTIMUM" => Ok(SolveStatus::Optimum),
            "SATISFIABLE" => Ok(SolveStatus::Satisfiable),
            "UNSATISFIABLE" => Ok(SolveStatus::Unsatisfiable),
            _ => Err(ParseError::UnknownStatus(token.to_string())),
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimum => write!(f, "OPTIMUM"),
            SolveStatus::Satisfiable => write!(f, "SATISFIABLE"),
            SolveStatus::Unsatisfiable => write!(f, "UNSATISFIABLE"),
        }
    }
}

/// Final status and best objective value of one solver run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunResult {
    pub status: SolveStatus,
    pub objective_value: Option<i64>,
}

impl RunResult {
    pub fn optimum(value: i64) -> Self {
        Self {
            status: SolveStatus::Optimum,
            objective_value: Some(value),
        }
    }

    pub fn unsatisfiable() -> Self {
        Self {
            status: SolveStatus::Unsatisfiable,
            objective_value: None,
        }
    }

    pub fn parse(output: &str) -> Result<Self, ParseError> {
        let mut status = None;
        let mut objective_value = None;

        for (index, line) in output.lines().enumerate() {
            let mut words = line.split_whitespace();
            match words.next() {
                Some("o") => {
                    let word = words.next().unwrap_or("");
                    let value = word
                        .parse::<i64>()
                        .map_err(|_| ParseError::syntax(index + 1, format!("bad objective value `{}`", word)))?;
                    objective_value = Some(value);
                }
                Some("s") => {
                    status = Some(SolveStatus::from_token(words.next().unwrap_or(""))?);
                }
                _ => {}
            }
        }

        let status = status.ok_or(ParseError::MissingStatus)?;
        Ok(Self {
            status,
            objective_value,
        })
    }

    /// Adds a constant to the reported value.
    pub fn shifted(self, offset: i64) -> Self {
        Self {
            objective_value: self.objective_value.map(|v| v + offset),
            ..self
        }
    }

    /// Negates the reported value, turning `min(-f)` into `max(f)`.
    pub fn negated(self) -> Self {
        Self {
            objective_value: self.objective_value.map(|v| -v),
            ..self
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective_value {
            Some(value) => write!(f, "{} ({})", self.status, value),
            None => write!(f, "{}", self.status),
        }
    }
}
