//! Linear pseudo-boolean expressions and constraints.
//!
//! An [`Expression`] is either a raw list of weighted literals, exactly as the
//! caller built it, or a [`NormalizedExpr`]: a canonical sum over positive
//! literals with one coefficient per variable and a constant offset. The
//! rewrite is
//!
//! ```text
//! c * ~x  =  c * (1 - x)  =  -c * x + c
//! ```
//!
//! so every negative literal moves its coefficient into the offset.
//!
//! Only normalized constraints can be serialized or handed to the pipeline,
//! which makes "forgot to normalize" a type error rather than a runtime check.
//!
//! # Examples
//!
//! ```
//! use pbdiff::expr::Expression;
//! use pbdiff::types::Var;
//!
//! let x1 = Var::new(1);
//! let x2 = Var::new(2);
//!
//! // 3 x1 + 2 ~x2 + 1 x1  =  4 x1 - 2 x2 + 2
//! let e = 3 * x1 + 2 * x2.neg() + 1 * x1;
//! let n = e.normalize();
//! assert_eq!(n.to_string(), "+4 x1 -2 x2 +2");
//! assert_eq!(n.offset(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use crate::types::{Lit, Var};

/// A signed coefficient applied to a literal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Term {
    pub coeff: i64,
    pub lit: Lit,
}

impl Term {
    pub fn new(coeff: i64, lit: impl Into<Lit>) -> Self {
        Self {
            coeff,
            lit: lit.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+} {}", self.coeff, self.lit)
    }
}

/// Canonical form of a linear expression.
///
/// # Invariants
///
/// - every literal is positive
/// - each variable appears at most once
/// - no coefficient is zero
/// - terms are sorted by variable
///
/// Two normalized expressions describing the same linear function are
/// therefore equal under `==`, whatever order their source terms came in.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct NormalizedExpr {
    terms: Vec<Term>,
    offset: i64,
}

impl NormalizedExpr {
    /// The zero function.
    pub fn zero() -> Self {
        Self::default()
    }

    fn fold(terms: impl IntoIterator<Item = Term>, offset: i64) -> Self {
        let mut offset = offset;
        let mut coeffs: BTreeMap<Var, i64> = BTreeMap::new();
        for Term { coeff, lit } in terms {
            let entry = coeffs.entry(lit.var()).or_default();
            if lit.is_positive() {
                *entry += coeff;
            } else {
                *entry -= coeff;
                offset += coeff;
            }
        }
        let terms = coeffs
            .into_iter()
            .filter(|&(_, coeff)| coeff != 0)
            .map(|(var, coeff)| Term::new(coeff, var))
            .collect();
        Self { terms, offset }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Constant accumulated while rewriting negative literals.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn into_parts(self) -> (Vec<Term>, i64) {
        (self.terms, self.offset)
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficients(&self) -> Vec<i64> {
        self.terms.iter().map(|t| t.coeff).collect()
    }

    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.terms.iter().map(|t| t.lit.var())
    }

    pub fn max_var(&self) -> Option<Var> {
        self.terms.last().map(|t| t.lit.var())
    }

    /// Returns `-self`: every coefficient and the offset flip sign.
    pub fn negate(&self) -> Self {
        Self {
            terms: self.terms.iter().map(|t| Term::new(-t.coeff, t.lit)).collect(),
            offset: -self.offset,
        }
    }

    /// Same terms, zero offset.
    pub fn without_offset(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            offset: 0,
        }
    }

    /// Sum of two normalized expressions, re-normalized.
    pub fn plus(&self, other: &Self) -> Self {
        Self::fold(
            self.terms.iter().chain(other.terms.iter()).copied(),
            self.offset + other.offset,
        )
    }

    /// Value under `assignment`, offset included.
    pub fn evaluate(&self, assignment: impl Fn(Var) -> bool) -> i64 {
        self.terms
            .iter()
            .filter(|t| assignment(t.lit.var()))
            .map(|t| t.coeff)
            .sum::<i64>()
            + self.offset
    }

    /// Smallest value over all assignments.
    pub fn min_value(&self) -> i64 {
        self.terms.iter().map(|t| t.coeff.min(0)).sum::<i64>() + self.offset
    }

    /// Largest value over all assignments.
    pub fn max_value(&self) -> i64 {
        self.terms.iter().map(|t| t.coeff.max(0)).sum::<i64>() + self.offset
    }
}

impl fmt::Display for NormalizedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", term)?;
            first = false;
        }
        if self.offset != 0 || first {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{:+}", self.offset)?;
        }
        Ok(())
    }
}

/// A linear expression over literals, before or after normalization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Expression {
    Raw(Vec<Term>),
    Normalized(NormalizedExpr),
}

impl Default for Expression {
    fn default() -> Self {
        Expression::Raw(Vec::new())
    }
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        Expression::Raw(terms.into_iter().collect())
    }

    /// `Σ coefficients[i] * vars[i]`.
    ///
    /// # Panics
    ///
    /// Panics if there are more coefficients than variables.
    pub fn weighted_sum(coefficients: &[i64], vars: &[Var]) -> Self {
        assert!(
            coefficients.len() <= vars.len(),
            "{} coefficients for {} variables",
            coefficients.len(),
            vars.len()
        );
        Self::from_terms(coefficients.iter().zip(vars).map(|(&c, &v)| Term::new(c, v)))
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, Expression::Normalized(_))
    }

    /// Canonical form of this expression. Normalizing twice is a no-op.
    pub fn normalize(&self) -> NormalizedExpr {
        match self {
            Expression::Raw(terms) => NormalizedExpr::fold(terms.iter().copied(), 0),
            Expression::Normalized(n) => n.clone(),
        }
    }

    pub fn into_normalized(self) -> NormalizedExpr {
        match self {
            Expression::Raw(terms) => NormalizedExpr::fold(terms, 0),
            Expression::Normalized(n) => n,
        }
    }

    pub fn evaluate(&self, assignment: impl Fn(Var) -> bool) -> i64 {
        match self {
            Expression::Raw(terms) => terms
                .iter()
                .filter(|t| t.lit.value(&assignment))
                .map(|t| t.coeff)
                .sum(),
            Expression::Normalized(n) => n.evaluate(assignment),
        }
    }

    pub fn geq(self, degree: i64) -> Constraint {
        Constraint::new(self, Relation::Geq, degree)
    }

    pub fn equals(self, degree: i64) -> Constraint {
        Constraint::new(self, Relation::Eq, degree)
    }

    /// `self <= degree`, stored as `-self >= -degree`.
    pub fn leq(self, degree: i64) -> Constraint {
        Constraint::new(-self, Relation::Geq, -degree)
    }
}

impl From<NormalizedExpr> for Expression {
    fn from(n: NormalizedExpr) -> Self {
        Expression::Normalized(n)
    }
}

impl From<Term> for Expression {
    fn from(term: Term) -> Self {
        Expression::Raw(vec![term])
    }
}

impl From<Lit> for Expression {
    fn from(lit: Lit) -> Self {
        Term::new(1, lit).into()
    }
}

impl From<Var> for Expression {
    fn from(var: Var) -> Self {
        var.pos().into()
    }
}

impl Mul<Var> for i64 {
    type Output = Expression;

    fn mul(self, rhs: Var) -> Self::Output {
        Term::new(self, rhs).into()
    }
}

impl Mul<Lit> for i64 {
    type Output = Expression;

    fn mul(self, rhs: Lit) -> Self::Output {
        Term::new(self, rhs).into()
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Expression::Raw(mut lhs), Expression::Raw(rhs)) => {
                lhs.extend(rhs);
                Expression::Raw(lhs)
            }
            // A raw term list has nowhere to keep an offset.
            (lhs, rhs) => Expression::Normalized(lhs.into_normalized().plus(&rhs.into_normalized())),
        }
    }
}

impl Add<Var> for Expression {
    type Output = Expression;

    fn add(self, rhs: Var) -> Self::Output {
        self + Expression::from(rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        match self {
            Expression::Raw(terms) => Expression::Raw(terms.into_iter().map(|t| Term::new(-t.coeff, t.lit)).collect()),
            Expression::Normalized(n) => Expression::Normalized(n.negate()),
        }
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Sum for Expression {
    fn sum<I: Iterator<Item = Expression>>(iter: I) -> Self {
        iter.fold(Expression::new(), |acc, e| acc + e)
    }
}

/// Relational operator of a PB constraint. OPB has only these two.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Relation {
    Geq,
    Eq,
}

impl Relation {
    pub fn holds(self, lhs: i64, degree: i64) -> bool {
        match self {
            Relation::Geq => lhs >= degree,
            Relation::Eq => lhs == degree,
        }
    }

    /// Short name used in instance names.
    pub fn name(self) -> &'static str {
        match self {
            Relation::Geq => "geq",
            Relation::Eq => "eq",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Geq => write!(f, ">="),
            Relation::Eq => write!(f, "="),
        }
    }
}

/// `lhs {>=|=} degree` with an arbitrary left-hand side.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Constraint {
    lhs: Expression,
    relation: Relation,
    degree: i64,
}

impl Constraint {
    pub fn new(lhs: Expression, relation: Relation, degree: i64) -> Self {
        Self { lhs, relation, degree }
    }

    pub fn lhs(&self) -> &Expression {
        &self.lhs
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn degree(&self) -> i64 {
        self.degree
    }

    /// Normalizes the left-hand side and moves its offset into the degree.
    pub fn normalize(&self) -> NormalizedConstraint {
        let (terms, offset) = self.lhs.normalize().into_parts();
        NormalizedConstraint {
            lhs: NormalizedExpr { terms, offset: 0 },
            relation: self.relation,
            degree: self.degree - offset,
        }
    }
}

/// A constraint whose left-hand side is normalized with a zero offset.
///
/// This is the only constraint type accepted by the OPB writer and by the
/// encode stage of the pipeline.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct NormalizedConstraint {
    lhs: NormalizedExpr,
    relation: Relation,
    degree: i64,
}

impl NormalizedConstraint {
    pub fn lhs(&self) -> &NormalizedExpr {
        &self.lhs
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn degree(&self) -> i64 {
        self.degree
    }

    pub fn max_var(&self) -> Option<Var> {
        self.lhs.max_var()
    }

    pub fn is_satisfied(&self, assignment: impl Fn(Var) -> bool) -> bool {
        self.relation.holds(self.lhs.evaluate(assignment), self.degree)
    }

    /// True if no assignment of the variables can satisfy the constraint.
    ///
    /// Exact for `>=`; for `=` it only catches out-of-range degrees.
    pub fn is_trivially_unsat(&self) -> bool {
        match self.relation {
            Relation::Geq => self.lhs.max_value() < self.degree,
            Relation::Eq => self.degree < self.lhs.min_value() || self.lhs.max_value() < self.degree,
        }
    }
}

impl From<NormalizedConstraint> for Constraint {
    fn from(c: NormalizedConstraint) -> Self {
        Constraint::new(Expression::Normalized(c.lhs), c.relation, c.degree)
    }
}

impl fmt::Display for NormalizedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in self.lhs.terms() {
            write!(f, "{} ", term)?;
        }
        write!(f, "{} {}", self.relation, self.degree)
    }
}
