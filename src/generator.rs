//! Test instance families.
//!
//! Every family is a deterministic function of a few small parameters, and
//! the randomized families draw from a [`ChaCha8Rng`] seeded once when the
//! [`Generator`] is built, so the same configuration always yields the same
//! instances in the same order.
//!
//! Names follow `<prefix>_<geq|eq>_<family>_<n>_vars_<d>_degree`, for
//! example `totalizer_geq_base_3_vars_2_degree`. The hand-picked instances
//! are named `<prefix>_saturated_1` and `<prefix>_propagating_1`.

use std::collections::HashSet;
use std::fmt;

use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::Query;
use crate::expr::{Constraint, Expression, NormalizedConstraint, Relation};
use crate::oracle;
use crate::tools::{CardinalityEncoding, EncodingStrategy, PbEncoding};
use crate::types::Var;

/// One named constraint `Σ coefficients[i] * vars[i] {>=|=} degree`,
/// optionally together with extra constraints over the same variables.
///
/// The objective is always the left-hand side of the main constraint.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestInstance {
    pub name: String,
    pub coefficients: Vec<i64>,
    pub vars: Vec<Var>,
    pub degree: i64,
    pub relation: Relation,
    pub side_constraints: Vec<NormalizedConstraint>,
}

impl TestInstance {
    pub fn new(
        name: impl Into<String>,
        coefficients: Vec<i64>,
        vars: Vec<Var>,
        degree: i64,
        relation: Relation,
    ) -> Self {
        assert_eq!(
            coefficients.len(),
            vars.len(),
            "coefficients and variables must pair up"
        );
        Self {
            name: name.into(),
            coefficients,
            vars,
            degree,
            relation,
            side_constraints: Vec::new(),
        }
    }

    pub fn with_side_constraints(mut self, constraints: Vec<NormalizedConstraint>) -> Self {
        self.side_constraints = constraints;
        self
    }

    pub fn objective(&self) -> Expression {
        Expression::weighted_sum(&self.coefficients, &self.vars)
    }

    pub fn constraint(&self) -> Constraint {
        Constraint::new(self.objective(), self.relation, self.degree)
    }

    /// The main constraint followed by the side constraints.
    pub fn constraints(&self) -> Vec<NormalizedConstraint> {
        std::iter::once(self.constraint().normalize())
            .chain(self.side_constraints.iter().cloned())
            .collect()
    }

    /// Equality instances are checked from both sides.
    pub fn queries(&self) -> &'static [Query] {
        match self.relation {
            Relation::Geq => &[Query::Minimize],
            Relation::Eq => &[Query::Minimize, Query::Maximize],
        }
    }

    /// Number of variables the oracle enumerates for this instance.
    pub fn oracle_vars(&self) -> usize {
        if self.side_constraints.is_empty() && !has_duplicates(&self.vars) {
            return self.vars.len();
        }
        self.constraints()
            .iter()
            .flat_map(|c| c.lhs().vars())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Ground truth for `query`, or `None` if the instance is infeasible.
    ///
    /// Always recomputed from the instance itself, never cached.
    pub fn expected(&self, query: Query) -> Option<i64> {
        if !self.side_constraints.is_empty() || has_duplicates(&self.vars) {
            let objective = self.objective().normalize();
            let constraints = self.constraints();
            return match query {
                Query::Minimize => oracle::minimize(&constraints, &objective),
                Query::Maximize => oracle::maximize(&constraints, &objective),
            };
        }
        match (self.relation, query) {
            (Relation::Eq, _) => oracle::brute_force_exact(&self.coefficients, self.degree),
            (Relation::Geq, Query::Minimize) => oracle::brute_force_optimum(&self.coefficients, self.degree),
            (Relation::Geq, Query::Maximize) => oracle::brute_force_maximum(&self.coefficients, self.degree),
        }
    }
}

fn has_duplicates(vars: &[Var]) -> bool {
    let mut seen = HashSet::new();
    !vars.iter().all(|v| seen.insert(*v))
}

impl fmt::Display for TestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.constraint().normalize())?;
        if !self.side_constraints.is_empty() {
            write!(f, " (+{} side constraints)", self.side_constraints.len())?;
        }
        Ok(())
    }
}

fn instance_name(prefix: &str, relation: Relation, family: &str, n: usize, degree: i64) -> String {
    format!(
        "{}_{}_{}_{}_vars_{}_degree",
        prefix,
        relation.name(),
        family,
        n,
        degree
    )
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Largest variable count of the uniform families.
    pub max_vars: u32,
    /// Width of the binary-weight family.
    pub binary_bits: u32,
    pub random_small: usize,
    pub random_large: usize,
    /// Largest variable count of the randomized families.
    pub random_max_vars: u32,
    pub small_magnitude: i64,
    pub large_magnitude: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_vars: 3,
            binary_bits: 3,
            random_small: 8,
            random_large: 4,
            random_max_vars: 6,
            small_magnitude: 10,
            large_magnitude: 20_000,
        }
    }
}

pub struct Generator {
    config: GeneratorConfig,
    rng: ChaCha8Rng,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn pool(&self) -> Vec<Var> {
        Var::range(self.config.max_vars)
    }

    /// `Σ factor * x_i (rel) factor * d` for `n` in `min_vars..=max_vars`
    /// and `d` in `0..=max_vars`.
    pub fn base(&self, prefix: &str, relation: Relation, factor: i64, min_vars: u32) -> Vec<TestInstance> {
        let pool = self.pool();
        let mut instances = Vec::new();
        for n in min_vars..=self.config.max_vars {
            for d in 0..=self.config.max_vars as i64 {
                let degree = d * factor;
                instances.push(TestInstance::new(
                    instance_name(prefix, relation, "base", n as usize, degree),
                    vec![factor; n as usize],
                    pool[..n as usize].to_vec(),
                    degree,
                    relation,
                ));
            }
        }
        instances
    }

    /// `Σ -factor * x_i (rel) -factor * d` for `d` in `-1..=max_vars`.
    ///
    /// The name carries `factor * d`, the degree before negation.
    pub fn negated(&self, prefix: &str, relation: Relation, factor: i64, min_vars: u32) -> Vec<TestInstance> {
        let pool = self.pool();
        let mut instances = Vec::new();
        for n in min_vars..=self.config.max_vars {
            for d in -1..=self.config.max_vars as i64 {
                let degree = d * factor;
                instances.push(TestInstance::new(
                    instance_name(prefix, relation, "neg", n as usize, degree),
                    vec![-factor; n as usize],
                    pool[..n as usize].to_vec(),
                    -degree,
                    relation,
                ));
            }
        }
        instances
    }

    /// Coefficients `1, 2, ..., 2^(k-1)` against every threshold in
    /// `0..2^(k+1)`, half of which exceed the largest attainable sum.
    pub fn binary_weights(&self, prefix: &str, relation: Relation) -> Vec<TestInstance> {
        let k = self.config.binary_bits;
        let coefficients: Vec<i64> = (0..k).map(|i| 1 << i).collect();
        let vars = Var::range(k);
        (0..1i64 << (k + 1))
            .map(|degree| {
                TestInstance::new(
                    instance_name(prefix, relation, "binary", k as usize, degree),
                    coefficients.clone(),
                    vars.clone(),
                    degree,
                    relation,
                )
            })
            .collect()
    }

    /// `10 x1 + 2 x2 + 2 x3 >= 5`: one literal alone exceeds the degree.
    pub fn saturating(&self, prefix: &str) -> TestInstance {
        TestInstance::new(
            format!("{}_saturated_1", prefix),
            vec![10, 2, 2],
            Var::range(3),
            5,
            Relation::Geq,
        )
    }

    /// `-3 x1 - 2 x2 - 2 x3 >= -2`: forces `x1` false and at most one of
    /// the others true.
    pub fn propagating(&self, prefix: &str) -> TestInstance {
        TestInstance::new(
            format!("{}_propagating_1", prefix),
            vec![-3, -2, -2],
            Var::range(3),
            -2,
            Relation::Geq,
        )
    }

    fn randomized(&mut self, prefix: &str, family: &str, count: usize, magnitude: i64) -> Vec<TestInstance> {
        let mut pool = Var::range(self.config.random_max_vars);
        if pool.is_empty() {
            debug!("no variables for the {} family", family);
            return Vec::new();
        }
        let mut instances = Vec::with_capacity(count);
        for index in 0..count {
            let n = self.rng.random_range(1..=pool.len());
            pool.shuffle(&mut self.rng);
            let vars = pool[..n].to_vec();
            let coefficients: Vec<i64> = (0..n)
                .map(|_| self.rng.random_range(-magnitude..=magnitude))
                .collect();

            let low: i64 = coefficients.iter().filter(|&&c| c < 0).sum();
            let high: i64 = coefficients.iter().filter(|&&c| c > 0).sum();
            let degree = self.rng.random_range(low - 1..=high + 1);
            let relation = if self.rng.random_bool(0.5) {
                Relation::Geq
            } else {
                Relation::Eq
            };

            instances.push(TestInstance::new(
                instance_name(prefix, relation, &format!("{}{}", family, index), n, degree),
                coefficients,
                vars,
                degree,
                relation,
            ));
        }
        instances
    }

    /// Random coefficients in `[-small_magnitude, small_magnitude]`.
    pub fn randomized_small(&mut self, prefix: &str) -> Vec<TestInstance> {
        let (count, magnitude) = (self.config.random_small, self.config.small_magnitude);
        self.randomized(prefix, "random_small", count, magnitude)
    }

    /// Random coefficients in `[-large_magnitude, large_magnitude]`.
    pub fn randomized_large(&mut self, prefix: &str) -> Vec<TestInstance> {
        let (count, magnitude) = (self.config.random_large, self.config.large_magnitude);
        self.randomized(prefix, "random_large", count, magnitude)
    }

    /// `2n` variables with `Σ x_i >= n + 1` and, for every pair,
    /// `-x(2i-1) - x(2i) >= -1`. At most one variable per pair can be true,
    /// so at most `n` in total: always infeasible.
    pub fn scaling(&self, prefix: &str, n: u32) -> TestInstance {
        let vars = Var::range(2 * n);
        let pairs = vars
            .chunks(2)
            .map(|pair| Expression::weighted_sum(&[-1, -1], pair).geq(-1).normalize())
            .collect();
        let degree = n as i64 + 1;
        TestInstance::new(
            instance_name(prefix, Relation::Geq, "scaling", vars.len(), degree),
            vec![1; vars.len()],
            vars,
            degree,
            Relation::Geq,
        )
        .with_side_constraints(pairs)
    }

    /// Every family for `suite`, in a fixed order.
    pub fn suite(&mut self, suite: &Suite) -> Vec<TestInstance> {
        let prefix = suite.prefix;
        let mut instances = Vec::new();
        for relation in [Relation::Geq, Relation::Eq] {
            instances.extend(self.base(prefix, relation, suite.factor, suite.min_vars));
        }
        for relation in [Relation::Geq, Relation::Eq] {
            instances.extend(self.negated(prefix, relation, suite.factor, suite.min_vars));
        }
        if suite.hand_picked {
            instances.push(self.saturating(prefix));
            instances.push(self.propagating(prefix));
        }
        for relation in [Relation::Geq, Relation::Eq] {
            instances.extend(self.binary_weights(prefix, relation));
        }
        instances.extend(self.randomized_small(prefix));
        instances.extend(self.randomized_large(prefix));
        for n in 1..=suite.scaling {
            instances.push(self.scaling(prefix, n));
        }
        debug!("generated {} instances for suite `{}`", instances.len(), prefix);
        instances
    }
}

/// A named encoder configuration together with the parameters of its
/// uniform families.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Suite {
    pub prefix: &'static str,
    pub strategy: EncodingStrategy,
    pub factor: i64,
    pub min_vars: u32,
    pub hand_picked: bool,
    /// Largest `n` of the scaling family, `0` to skip it.
    pub scaling: u32,
}

impl Suite {
    pub fn totalizer() -> Self {
        Self {
            prefix: "totalizer",
            strategy: EncodingStrategy::new(CardinalityEncoding::Totalizer, PbEncoding::GeneralizedTotalizer),
            factor: 1,
            min_vars: 0,
            hand_picked: false,
            scaling: 3,
        }
    }

    pub fn sequential() -> Self {
        Self {
            prefix: "seq",
            strategy: EncodingStrategy::new(CardinalityEncoding::SequentialCounter, PbEncoding::GeneralizedTotalizer),
            factor: 1,
            min_vars: 0,
            hand_picked: false,
            scaling: 3,
        }
    }

    pub fn gte() -> Self {
        Self {
            prefix: "gte",
            strategy: EncodingStrategy::new(CardinalityEncoding::SequentialCounter, PbEncoding::GeneralizedTotalizer),
            factor: 2,
            min_vars: 1,
            hand_picked: true,
            scaling: 0,
        }
    }

    pub fn adder() -> Self {
        Self {
            prefix: "adder",
            strategy: EncodingStrategy::new(CardinalityEncoding::SequentialCounter, PbEncoding::Adder),
            factor: 2,
            min_vars: 1,
            hand_picked: true,
            scaling: 0,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::totalizer(), Self::sequential(), Self::gte(), Self::adder()]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|suite| suite.prefix == name)
    }
}
