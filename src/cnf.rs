//! DIMACS CNF as produced by the encoder.
//!
//! ```text
//! c any comment
//! p cnf 5 3
//! 1 2 -4 0
//! -1 5 0
//! 3 0
//! ```
//!
//! Comments and the problem line are optional. A clause ends at its `0`
//! sentinel, which normally closes the line but may come on a later one.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use log::debug;
use num_bigint::BigUint;

use crate::error::{ParseError, PipelineError};
use crate::expr::{Expression, NormalizedConstraint, Term};
use crate::oracle;
use crate::types::{Lit, Var};

pub type Clause = Vec<Lit>;

/// An immutable list of clauses.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CnfFormula {
    clauses: Vec<Clause>,
    declared_vars: u32,
}

impl CnfFormula {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self {
            clauses,
            declared_vars: 0,
        }
    }

    /// Declares at least `count` variables, as a `p cnf` line would.
    pub fn with_declared_vars(mut self, count: u32) -> Self {
        self.declared_vars = count;
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Highest variable in any clause, or the `p cnf` count if larger.
    pub fn num_vars(&self) -> u32 {
        self.clauses
            .iter()
            .flatten()
            .map(|lit| lit.var().id())
            .max()
            .unwrap_or(0)
            .max(self.declared_vars)
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut formula = CnfFormula::default();
        let mut clause: Vec<i32> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.starts_with('c') {
                continue;
            }
            if line.starts_with('%') {
                break;
            }
            if line.starts_with('p') {
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    ["p", "cnf", vars, _clauses] => {
                        formula.declared_vars = vars
                            .parse()
                            .map_err(|_| ParseError::syntax(line_no, format!("bad variable count `{}`", vars)))?;
                    }
                    _ => return Err(ParseError::syntax(line_no, format!("bad problem line `{}`", line))),
                }
                continue;
            }

            for word in line.split_whitespace() {
                let lit = word
                    .parse::<i32>()
                    .map_err(|_| ParseError::syntax(line_no, format!("bad literal `{}`", word)))?;
                match lit {
                    0 => formula
                        .clauses
                        .push(clause.drain(..).map(Lit::from_dimacs).collect()),
                    _ => clause.push(lit),
                }
            }
        }

        if !clause.is_empty() {
            return Err(ParseError::UnterminatedClause(clause));
        }
        Ok(formula)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let formula = Self::parse(&text).map_err(|e| PipelineError::parse(path, e))?;
        debug!(
            "loaded {} clauses over {} variables from {}",
            formula.num_clauses(),
            formula.num_vars(),
            path.display()
        );
        Ok(formula)
    }

    pub fn to_dimacs_string(&self) -> String {
        let mut out = format!("p cnf {} {}\n", self.num_vars(), self.num_clauses());
        for clause in &self.clauses {
            for lit in clause {
                out.push_str(&lit.to_dimacs().to_string());
                out.push(' ');
            }
            out.push_str("0\n");
        }
        out
    }

    /// Each clause `l1 ∨ … ∨ lk` as the PB row `l1 + … + lk >= 1`.
    pub fn to_constraints(&self) -> Vec<NormalizedConstraint> {
        self.clauses
            .iter()
            .map(|clause| {
                Expression::from_terms(clause.iter().map(|&lit| Term::new(1, lit)))
                    .geq(1)
                    .normalize()
            })
            .collect()
    }

    pub fn is_satisfied(&self, assignment: impl Fn(Var) -> bool) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.iter().any(|lit| lit.value(&assignment)))
    }

    /// Number of assignments to `x1..=x<num_vars>` satisfying every clause.
    ///
    /// Exhaustive over the variables that occur in clauses; the remaining
    /// ones each double the count.
    pub fn count_models(&self, num_vars: u32) -> BigUint {
        let support: Vec<Var> = self
            .clauses
            .iter()
            .flatten()
            .map(|lit| lit.var())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        assert!(
            support.iter().all(|v| v.id() <= num_vars),
            "clauses mention variables above x{}",
            num_vars
        );
        oracle::count_over(&support, num_vars, |a| self.is_satisfied(|v| a.value(v)))
    }
}
