//! OPB text format.
//!
//! Writes and reads the subset of the pseudo-Boolean competition format used
//! by the encoder and the solver:
//!
//! ```text
//! * #variable=3 #constraint=1
//! min: +1 x1 +1 x2 +1 x3 ;
//! +1 x1 +1 x2 +1 x3 >= 2 ;
//! ```
//!
//! Variable numbering is taken verbatim from the [`Var`] ids, so the same
//! variable has the same name in every constraint and in the objective.
//! The reader additionally accepts `~x` literals, `<=` rows and statements
//! spanning several lines.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{ParseError, PipelineError};
use crate::expr::{Expression, NormalizedConstraint, NormalizedExpr, Term};
use crate::types::{Lit, Var};

/// A set of normalized constraints with an optional objective to minimize.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OpbFormula {
    constraints: Vec<NormalizedConstraint>,
    objective: Option<NormalizedExpr>,
    min_vars: u32,
}

impl OpbFormula {
    pub fn new(constraints: Vec<NormalizedConstraint>) -> Self {
        Self {
            constraints,
            objective: None,
            min_vars: 0,
        }
    }

    /// Sets the objective.
    ///
    /// OPB has no syntax for a constant in the objective, so the offset is
    /// not written; callers that care add it back to the solver's answer.
    pub fn with_objective(mut self, objective: NormalizedExpr) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Declares at least `count` variables in the header, even if the
    /// highest ones never occur in a constraint.
    pub fn with_min_vars(mut self, count: u32) -> Self {
        self.min_vars = count;
        self
    }

    pub fn constraints(&self) -> &[NormalizedConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&NormalizedExpr> {
        self.objective.as_ref()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Highest variable index in use (or declared).
    pub fn num_vars(&self) -> u32 {
        self.constraints
            .iter()
            .filter_map(|c| c.max_var())
            .chain(self.objective.iter().filter_map(|o| o.max_var()))
            .map(Var::id)
            .max()
            .unwrap_or(0)
            .max(self.min_vars)
    }

    /// True if `assignment` satisfies every constraint.
    pub fn is_satisfied(&self, assignment: impl Fn(Var) -> bool) -> bool {
        self.constraints.iter().all(|c| c.is_satisfied(&assignment))
    }

    pub fn to_opb_string(&self) -> String {
        let mut out = String::new();
        writeln!(
            out,
            "* #variable={} #constraint={}",
            self.num_vars(),
            self.num_constraints()
        )
        .unwrap();
        if let Some(objective) = &self.objective {
            out.push_str("min:");
            for term in objective.terms() {
                write!(out, " {}", term).unwrap();
            }
            out.push_str(" ;\n");
        }
        for constraint in &self.constraints {
            for term in constraint.lhs().terms() {
                write!(out, "{} ", term).unwrap();
            }
            writeln!(out, "{} {} ;", constraint.relation(), constraint.degree()).unwrap();
        }
        out
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let path = path.as_ref();
        debug!(
            "writing {} constraints over {} variables to {}",
            self.num_constraints(),
            self.num_vars(),
            path.display()
        );
        fs::write(path, self.to_opb_string()).map_err(|e| PipelineError::io(path, e))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Self::parse(&text).map_err(|e| PipelineError::parse(path, e))
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut formula = OpbFormula::default();
        let mut tokens: Vec<(usize, String)> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if let Some(comment) = line.strip_prefix('*') {
                if let Some(declared) = parse_header(comment, line_no)? {
                    formula.min_vars = declared;
                }
                continue;
            }
            for token in line.replace(';', " ; ").split_whitespace() {
                tokens.push((line_no, token.to_string()));
            }
        }

        let mut statement: Vec<(usize, String)> = Vec::new();
        for (line_no, token) in tokens {
            if token == ";" {
                formula.parse_statement(&statement)?;
                statement.clear();
            } else {
                statement.push((line_no, token));
            }
        }
        if let Some((line_no, _)) = statement.first() {
            return Err(ParseError::syntax(*line_no, "statement not terminated by `;`"));
        }

        Ok(formula)
    }

    fn parse_statement(&mut self, statement: &[(usize, String)]) -> Result<(), ParseError> {
        let Some((first_line, first)) = statement.first() else {
            return Ok(());
        };

        if first == "min:" {
            if self.objective.is_some() {
                return Err(ParseError::syntax(*first_line, "more than one objective"));
            }
            let terms = parse_terms(&statement[1..])?;
            self.objective = Some(Expression::from_terms(terms).into_normalized());
            return Ok(());
        }

        let Some(pos) = statement
            .iter()
            .position(|(_, t)| t == ">=" || t == "=" || t == "<=")
        else {
            return Err(ParseError::syntax(*first_line, "constraint without relation"));
        };
        let terms = parse_terms(&statement[..pos])?;
        let (rel_line, relation) = &statement[pos];
        let degree = match &statement[pos + 1..] {
            [(line_no, degree)] => degree
                .parse::<i64>()
                .map_err(|_| ParseError::syntax(*line_no, format!("bad degree `{}`", degree)))?,
            _ => return Err(ParseError::syntax(*rel_line, "expected a single degree after relation")),
        };

        let lhs = Expression::from_terms(terms);
        let constraint = match relation.as_str() {
            ">=" => lhs.geq(degree),
            "=" => lhs.equals(degree),
            _ => lhs.leq(degree),
        };
        self.constraints.push(constraint.normalize());
        Ok(())
    }
}

fn parse_header(comment: &str, line_no: usize) -> Result<Option<u32>, ParseError> {
    let Some(rest) = comment.split("#variable=").nth(1) else {
        return Ok(None);
    };
    let value = rest.split_whitespace().next().unwrap_or("");
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::syntax(line_no, format!("bad variable count `{}`", value)))
}

fn parse_terms(tokens: &[(usize, String)]) -> Result<Vec<Term>, ParseError> {
    if tokens.len() % 2 != 0 {
        let (line_no, _) = tokens[tokens.len() - 1];
        return Err(ParseError::syntax(line_no, "dangling coefficient or literal"));
    }
    tokens
        .chunks(2)
        .map(|pair| {
            let (line_no, coeff) = &pair[0];
            let (_, lit) = &pair[1];
            let coeff = coeff
                .parse::<i64>()
                .map_err(|_| ParseError::syntax(*line_no, format!("bad coefficient `{}`", coeff)))?;
            Ok(Term::new(coeff, parse_lit(lit, *line_no)?))
        })
        .collect()
}

fn parse_lit(token: &str, line_no: usize) -> Result<Lit, ParseError> {
    let (negated, name) = match token.strip_prefix('~') {
        Some(name) => (true, name),
        None => (false, token),
    };
    let id = name
        .strip_prefix('x')
        .and_then(|id| id.parse::<u32>().ok())
        .filter(|&id| id > 0)
        .ok_or_else(|| ParseError::syntax(line_no, format!("bad literal `{}`", token)))?;
    let var = Var::new(id);
    Ok(if negated { var.neg() } else { var.pos() })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn xs() -> Vec<Var> {
        Var::range(3)
    }

    #[test]
    fn test_write_counting_constraint() {
        let terms = Expression::weighted_sum(&[1, 1, 1], &xs());
        let formula =
            OpbFormula::new(vec![terms.clone().geq(2).normalize()]).with_objective(terms.normalize());
        assert_eq!(
            formula.to_opb_string(),
            "* #variable=3 #constraint=1\n\
             min: +1 x1 +1 x2 +1 x3 ;\n\
             +1 x1 +1 x2 +1 x3 >= 2 ;\n"
        );
    }

    #[test]
    fn test_write_negative_and_equality() {
        let c = Expression::weighted_sum(&[-3, -2, -2], &xs()).equals(-2).normalize();
        let formula = OpbFormula::new(vec![c]);
        assert_eq!(
            formula.to_opb_string(),
            "* #variable=3 #constraint=1\n-3 x1 -2 x2 -2 x3 = -2 ;\n"
        );
    }

    #[test]
    fn test_write_empty_constraint() {
        let c = Expression::new().geq(1).normalize();
        let formula = OpbFormula::new(vec![c]).with_objective(NormalizedExpr::zero());
        assert_eq!(formula.to_opb_string(), "* #variable=0 #constraint=1\nmin: ;\n>= 1 ;\n");
    }

    #[test]
    fn test_min_vars_in_header() {
        let c = Expression::from(Var::new(2)).geq(1).normalize();
        let formula = OpbFormula::new(vec![c]).with_min_vars(7);
        assert_eq!(formula.num_vars(), 7);
        assert!(formula.to_opb_string().starts_with("* #variable=7 #constraint=1\n"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let terms = Expression::weighted_sum(&[10, 2, 2], &xs());
        let formula = OpbFormula::new(vec![
            terms.clone().geq(5).normalize(),
            Expression::weighted_sum(&[-1, -1], &xs()[1..]).geq(-1).normalize(),
        ])
        .with_objective(terms.normalize());
        let parsed = OpbFormula::parse(&formula.to_opb_string()).unwrap();
        assert_eq!(parsed, formula.with_min_vars(3));
    }

    #[test]
    fn test_parse_negated_literal_and_leq() {
        let text = "* #variable=2 #constraint=2\n2 ~x1 +1 x2 >= 2 ;\n+1 x1 +1 x2\n <= 1 ;\n";
        let parsed = OpbFormula::parse(text).unwrap();
        assert_eq!(parsed.num_constraints(), 2);
        assert_eq!(parsed.constraints()[0].to_string(), "-2 x1 +1 x2 >= 0");
        assert_eq!(parsed.constraints()[1].to_string(), "-1 x1 -1 x2 >= -1");
    }

    #[test]
    fn test_parse_same_models() {
        let text = "+3 x1 -2 ~x2 +1 x3 = 2 ;";
        let parsed = OpbFormula::parse(text).unwrap();
        let reparsed = OpbFormula::parse(&parsed.to_opb_string()).unwrap();
        for mask in 0..8u32 {
            let assignment = |v: Var| mask & (1 << (v.id() - 1)) != 0;
            let direct = {
                let x = |i: u32| assignment(Var::new(i)) as i64;
                3 * x(1) - 2 * (1 - x(2)) + x(3) == 2
            };
            assert_eq!(parsed.is_satisfied(assignment), direct);
            assert_eq!(reparsed.is_satisfied(assignment), direct);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            OpbFormula::parse("+1 x1 >= 1"),
            Err(ParseError::syntax(1, "statement not terminated by `;`"))
        );
        assert_eq!(
            OpbFormula::parse("* c\n+1 y1 >= 1 ;"),
            Err(ParseError::syntax(2, "bad literal `y1`"))
        );
        assert_eq!(
            OpbFormula::parse("+1 x1 +1 ;"),
            Err(ParseError::syntax(1, "constraint without relation"))
        );
        assert_eq!(
            OpbFormula::parse("+1 x0 >= 1 ;"),
            Err(ParseError::syntax(1, "bad literal `x0`"))
        );
    }
}
