//! Brute-force ground truth.
//!
//! Every question is answered by enumerating all `2^k` assignments of the
//! variables involved, so the answers do not depend on any encoder or solver.
//! This is only meant for the handful of variables used by generated test
//! instances: enumeration is capped at [`MAX_ORACLE_VARS`].

use std::collections::BTreeSet;

use num_bigint::BigUint;

use crate::expr::{NormalizedConstraint, NormalizedExpr};
use crate::types::Var;

/// Largest number of variables the oracle will enumerate.
pub const MAX_ORACLE_VARS: usize = 24;

/// One assignment to a sorted set of variables, as a bitmask.
#[derive(Debug, Copy, Clone)]
pub struct Assignment<'a> {
    support: &'a [Var],
    mask: u64,
}

impl Assignment<'_> {
    /// Value of `var`; variables outside the support are false.
    pub fn value(&self, var: Var) -> bool {
        match self.support.binary_search(&var) {
            Ok(i) => self.mask & (1 << i) != 0,
            Err(_) => false,
        }
    }
}

pub(crate) fn assignments(support: &[Var]) -> impl Iterator<Item = Assignment<'_>> {
    assert!(
        support.len() <= MAX_ORACLE_VARS,
        "refusing to enumerate 2^{} assignments",
        support.len()
    );
    debug_assert!(support.windows(2).all(|w| w[0] < w[1]));
    (0..1u64 << support.len()).map(move |mask| Assignment { support, mask })
}

/// Values `Σ coefficients[i] * a[i]` over all 0/1 vectors `a`.
fn subset_sums(coefficients: &[i64]) -> impl Iterator<Item = i64> + '_ {
    assert!(
        coefficients.len() <= MAX_ORACLE_VARS,
        "refusing to enumerate 2^{} assignments",
        coefficients.len()
    );
    (0..1u64 << coefficients.len()).map(move |mask| {
        coefficients
            .iter()
            .enumerate()
            .filter(|&(i, _)| mask & (1 << i) != 0)
            .map(|(_, &c)| c)
            .sum()
    })
}

/// Smallest attainable `Σ c_i x_i` that is at least `bound_degree`.
///
/// This is the optimum of minimizing the left-hand side of
/// `Σ c_i x_i >= bound_degree` subject to that very constraint, or `None`
/// if the constraint is infeasible.
pub fn brute_force_optimum(coefficients: &[i64], bound_degree: i64) -> Option<i64> {
    subset_sums(coefficients).filter(|&s| s >= bound_degree).min()
}

/// Largest attainable `Σ c_i x_i` that is at least `bound_degree`.
pub fn brute_force_maximum(coefficients: &[i64], bound_degree: i64) -> Option<i64> {
    subset_sums(coefficients).filter(|&s| s >= bound_degree).max()
}

/// `Some(degree)` if `Σ c_i x_i = degree` has a solution.
pub fn brute_force_exact(coefficients: &[i64], degree: i64) -> Option<i64> {
    subset_sums(coefficients).any(|s| s == degree).then_some(degree)
}

fn support(constraints: &[NormalizedConstraint], objective: Option<&NormalizedExpr>) -> Vec<Var> {
    constraints
        .iter()
        .flat_map(|c| c.lhs().vars())
        .chain(objective.into_iter().flat_map(|o| o.vars()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Minimum of `objective` (offset included) over all assignments that
/// satisfy every constraint, or `None` if there are none.
pub fn minimize(constraints: &[NormalizedConstraint], objective: &NormalizedExpr) -> Option<i64> {
    let support = support(constraints, Some(objective));
    assignments(&support)
        .filter(|a| constraints.iter().all(|c| c.is_satisfied(|v| a.value(v))))
        .map(|a| objective.evaluate(|v| a.value(v)))
        .min()
}

/// Maximum of `objective` over all satisfying assignments.
pub fn maximize(constraints: &[NormalizedConstraint], objective: &NormalizedExpr) -> Option<i64> {
    let support = support(constraints, Some(objective));
    assignments(&support)
        .filter(|a| constraints.iter().all(|c| c.is_satisfied(|v| a.value(v))))
        .map(|a| objective.evaluate(|v| a.value(v)))
        .max()
}

/// Number of assignments to `x1..=x<num_vars>` satisfying every constraint.
pub fn count_models(constraints: &[NormalizedConstraint], num_vars: u32) -> BigUint {
    let support = support(constraints, None);
    assert!(
        support.iter().all(|v| v.id() <= num_vars),
        "constraints mention variables above x{}",
        num_vars
    );
    count_over(&support, num_vars, |a| {
        constraints.iter().all(|c| c.is_satisfied(|v| a.value(v)))
    })
}

/// Counts satisfying assignments over `support`, then scales by the
/// `2^(num_vars - |support|)` ways to set the remaining variables.
pub(crate) fn count_over(support: &[Var], num_vars: u32, predicate: impl Fn(&Assignment<'_>) -> bool) -> BigUint {
    let free = num_vars as usize - support.len();
    let count = assignments(support).filter(|a| predicate(a)).count();
    BigUint::from(count) << free
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::expr::Expression;

    #[test]
    fn test_counting_constraint() {
        assert_eq!(brute_force_optimum(&[1, 1, 1], 2), Some(2));
        assert_eq!(brute_force_optimum(&[1, 1, 1], 0), Some(0));
        assert_eq!(brute_force_optimum(&[1, 1, 1], 4), None);
    }

    #[test]
    fn test_all_negative_infeasible() {
        assert_eq!(brute_force_optimum(&[-1, -1, -1], 1), None);
        assert_eq!(brute_force_optimum(&[-1, -1, -1], -2), Some(-2));
    }

    #[test]
    fn test_saturating() {
        assert_eq!(brute_force_optimum(&[10, 2, 2], 5), Some(10));
    }

    #[test]
    fn test_propagating() {
        assert_eq!(brute_force_optimum(&[-3, -2, -2], -2), Some(-2));
    }

    #[test]
    fn test_binary_weights() {
        assert_eq!(brute_force_exact(&[1, 2, 4], 5), Some(5));
        assert_eq!(brute_force_exact(&[1, 2, 4], 8), None);
        for t in 0..=7 {
            assert_eq!(brute_force_exact(&[1, 2, 4], t), Some(t));
            assert_eq!(brute_force_optimum(&[1, 2, 4], t), Some(t));
        }
        assert_eq!(brute_force_maximum(&[1, 2, 4], 5), Some(7));
    }

    #[test]
    fn test_no_coefficients() {
        assert_eq!(brute_force_optimum(&[], 0), Some(0));
        assert_eq!(brute_force_optimum(&[], 1), None);
        assert_eq!(brute_force_exact(&[], 0), Some(0));
    }

    #[test]
    fn test_large_magnitudes() {
        let coeffs = [20_000, -15_000, 12_345, 19_999, -20_000];
        assert_eq!(brute_force_optimum(&coeffs, 39_999), Some(39_999));
        assert_eq!(brute_force_maximum(&coeffs, i64::MIN), Some(52_344));
    }

    #[test]
    fn test_minimize_matches_coefficient_form() {
        let xs = Var::range(4);
        let coeffs = [3, -2, 5, 1];
        for degree in -3..=10 {
            let terms = Expression::weighted_sum(&coeffs, &xs);
            let c = terms.clone().geq(degree).normalize();
            assert_eq!(
                minimize(&[c.clone()], &terms.normalize()),
                brute_force_optimum(&coeffs, degree)
            );
            assert_eq!(
                maximize(&[c], &terms.normalize()),
                brute_force_maximum(&coeffs, degree)
            );
        }
    }

    #[test]
    fn test_objective_offset() {
        // min ~x1 subject to nothing: x1 = 1 gives 0
        let objective = (1 * Var::new(1).neg()).normalize();
        assert_eq!(minimize(&[], &objective), Some(0));
        assert_eq!(maximize(&[], &objective), Some(1));
    }

    #[test]
    fn test_count_models() {
        let xs = Var::range(3);
        let c = Expression::weighted_sum(&[1, 1, 1], &xs).geq(2).normalize();
        assert_eq!(count_models(&[c.clone()], 3), BigUint::from(4u32));
        assert_eq!(count_models(&[c], 5), BigUint::from(16u32));
        assert_eq!(count_models(&[], 2), BigUint::from(4u32));
    }
}
