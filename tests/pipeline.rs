//! End-to-end runs of the pipeline with in-process tools.

mod common;

use std::path::Path;

use proptest::prelude::*;

use pbdiff::artifacts::ArtifactPaths;
use pbdiff::check::{run_instance, run_suite, HarnessConfig, Outcome, Summary};
use pbdiff::driver::{Encoded, Pipeline};
use pbdiff::error::{Field, ParseError, PipelineError, Query};
use pbdiff::expr::{Expression, NormalizedConstraint, Relation};
use pbdiff::generator::{Generator, GeneratorConfig, Suite, TestInstance};
use pbdiff::oracle;
use pbdiff::tools::{EncodingStrategy, EquivalenceChecker, ExhaustiveEncoder, ExhaustiveSolver, RunResult, SolveStatus, Toolchain};
use pbdiff::types::Var;

use common::{CannedSolver, CrashingEncoder, LossyEncoder, PanickingSolver, TrustingChecker};

fn encode<'t>(tools: &'t Toolchain, root: &Path, name: &str, constraints: &[NormalizedConstraint]) -> Encoded<'t> {
    Pipeline::new(tools, ArtifactPaths::new(root, name), EncodingStrategy::default())
        .encode(constraints)
        .unwrap()
}

fn harness(root: &Path, jobs: usize) -> HarnessConfig {
    HarnessConfig {
        generation_dir: root.to_path_buf(),
        jobs,
    }
}

// ─── Fixed scenarios ──────────────────────────────────────────────────────────

#[test]
fn at_least_two_of_three() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let sum = Expression::weighted_sum(&[1, 1, 1], &Var::range(3));

    let encoded = encode(&tools, dir.path(), "count", &[sum.clone().geq(2).normalize()]);
    let result = encoded.minimize(&sum).unwrap();
    assert_eq!(result.status, SolveStatus::Optimum);
    assert_eq!(result.objective_value, Some(2));
}

#[test]
fn all_negative_is_infeasible() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let sum = Expression::weighted_sum(&[-1, -1, -1], &Var::range(3));

    let encoded = encode(&tools, dir.path(), "neg", &[sum.clone().geq(1).normalize()]);
    assert_eq!(encoded.minimize(&sum).unwrap(), RunResult::unsatisfiable());
}

#[test]
fn saturating_coefficient() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let sum = Expression::weighted_sum(&[10, 2, 2], &Var::range(3));

    let encoded = encode(&tools, dir.path(), "sat", &[sum.clone().geq(5).normalize()]);
    assert_eq!(encoded.minimize(&sum).unwrap(), RunResult::optimum(10));
}

#[test]
fn binary_weights_equality() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let sum = Expression::weighted_sum(&[1, 2, 4], &Var::range(3));

    let encoded = encode(&tools, dir.path(), "bin5", &[sum.clone().equals(5).normalize()]);
    assert_eq!(encoded.minimize(&sum).unwrap(), RunResult::optimum(5));
    assert_eq!(encoded.maximize(&sum).unwrap(), RunResult::optimum(5));

    let encoded = encode(&tools, dir.path(), "bin8", &[sum.clone().equals(8).normalize()]);
    assert_eq!(encoded.minimize(&sum).unwrap(), RunResult::unsatisfiable());
    assert_eq!(encoded.maximize(&sum).unwrap(), RunResult::unsatisfiable());
}

#[test]
fn artifacts_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let instance = Generator::new(GeneratorConfig::default()).saturating("gte");

    let report = run_instance(&tools, &harness(dir.path(), 1), EncodingStrategy::default(), &instance);
    assert!(report.is_passed(), "{}", report);

    let paths = report.artifacts.as_ref().unwrap();
    assert_eq!(paths.dir(), dir.path().join("gte_saturated_1"));
    for path in [paths.source(), paths.proof(), paths.cnf(), paths.min_query()] {
        assert!(path.exists(), "missing {}", path.display());
    }
    // `>=` instances are only minimized
    assert!(!paths.max_query().exists());
}

#[test]
fn encoding_preserves_model_count() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let xs = Var::range(5);
    let constraints = vec![
        Expression::weighted_sum(&[3, -2, 5, 1, -4], &xs).geq(1).normalize(),
        Expression::weighted_sum(&[1, 1], &xs[3..]).equals(1).normalize(),
    ];

    let encoded = encode(&tools, dir.path(), "count", &constraints);
    assert_eq!(
        encoded.cnf().count_models(5),
        oracle::count_models(&constraints, 5)
    );
}

// ─── Failure paths ────────────────────────────────────────────────────────────

#[test]
fn unsound_encoding_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::new(LossyEncoder, EquivalenceChecker, ExhaustiveSolver);
    let sum = Expression::weighted_sum(&[1, 1, 1], &Var::range(3));

    let err = Pipeline::new(&tools, ArtifactPaths::new(dir.path(), "lossy"), EncodingStrategy::default())
        .encode(&[sum.geq(2).normalize()])
        .unwrap_err();
    assert!(matches!(err, PipelineError::VerificationFailure { .. }), "{}", err);
}

#[test]
fn wrong_answer_is_a_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    // the dropped clause blocks `x3` alone, so the minimum falls to 1
    let tools = Toolchain::new(LossyEncoder, TrustingChecker, ExhaustiveSolver);
    let instance = TestInstance::new("lossy", vec![1, 1, 1], Var::range(3), 2, Relation::Geq);

    let report = run_instance(&tools, &harness(dir.path(), 1), EncodingStrategy::default(), &instance);
    match report.outcome {
        Outcome::Failed(failure) => {
            assert_eq!(failure.test_name, "lossy");
            assert_eq!(failure.mismatches.len(), 1);
            assert_eq!(failure.mismatches[0].query, Query::Minimize);
            assert_eq!(failure.mismatches[0].field, Field::Value);
            assert_eq!(failure.to_string(), "lossy: minimize value: expected 2, got 1");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn solver_without_status_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::new(ExhaustiveEncoder, EquivalenceChecker, CannedSolver("o 3\n"));
    let instance = Generator::new(GeneratorConfig::default()).propagating("adder");

    let report = run_instance(&tools, &harness(dir.path(), 1), EncodingStrategy::default(), &instance);
    match report.outcome {
        Outcome::Aborted(PipelineError::Parse { source, .. }) => assert_eq!(source, ParseError::MissingStatus),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn failures_stay_with_their_instance() {
    let dir = tempfile::tempdir().unwrap();
    let crashing = Toolchain::new(CrashingEncoder("_2_vars_"), EquivalenceChecker, ExhaustiveSolver);
    let instances = Generator::new(GeneratorConfig::default()).base("crash", Relation::Geq, 1, 0);

    let reports = run_suite(&crashing, &harness(dir.path(), 3), EncodingStrategy::default(), &instances);
    assert_eq!(reports.len(), instances.len());
    for report in &reports {
        if report.name.contains("_2_vars_") {
            assert!(matches!(
                report.outcome,
                Outcome::Aborted(PipelineError::EncoderFailure { code: Some(134), .. })
            ));
        } else {
            assert!(report.is_passed(), "{}", report);
        }
    }
    let summary = Summary::of(&reports);
    assert_eq!((summary.passed, summary.failed, summary.aborted), (12, 0, 4));
}

#[test]
fn faulty_instances_do_not_take_down_their_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let instances = vec![
        TestInstance::new("small", vec![1, 1, 1], Var::range(3), 2, Relation::Geq),
        TestInstance::new("wide", vec![1; 25], Var::range(25), 2, Relation::Geq),
        TestInstance::new("../escape", vec![1], Var::range(1), 1, Relation::Geq),
        TestInstance::new("last", vec![1, 2, 4], Var::range(3), 5, Relation::Eq),
    ];

    let reports = run_suite(&tools, &harness(dir.path(), 2), EncodingStrategy::default(), &instances);
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["small", "wide", "../escape", "last"]);

    assert!(reports[0].is_passed(), "{}", reports[0]);
    assert!(matches!(
        reports[1].outcome,
        Outcome::Aborted(PipelineError::OracleTooLarge { vars: 25, max: 24 })
    ));
    assert!(matches!(reports[2].outcome, Outcome::Aborted(PipelineError::InvalidTestName(_))));
    assert!(reports[2].artifacts.is_none());
    assert!(reports[3].is_passed(), "{}", reports[3]);
    assert_eq!(Summary::of(&reports), Summary { passed: 2, failed: 0, aborted: 2 });
}

#[test]
fn panicking_tool_aborts_only_its_instance() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::new(ExhaustiveEncoder, EquivalenceChecker, PanickingSolver("_3_vars_"));
    let instances = Generator::new(GeneratorConfig::default()).base("panic", Relation::Geq, 1, 0);

    let reports = run_suite(&tools, &harness(dir.path(), 3), EncodingStrategy::default(), &instances);
    assert_eq!(reports.len(), instances.len());
    for report in &reports {
        if report.name.contains("_3_vars_") {
            match &report.outcome {
                Outcome::Aborted(PipelineError::Panicked { message }) => assert_eq!(message, "solver blew up"),
                other => panic!("unexpected outcome: {:?}", other),
            }
        } else {
            assert!(report.is_passed(), "{}", report);
        }
    }
}

// ─── Whole suites ─────────────────────────────────────────────────────────────

#[test]
fn every_suite_passes_with_exhaustive_tools() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Toolchain::exhaustive();
    let config = harness(dir.path(), 4);

    for suite in Suite::all() {
        let instances = Generator::new(GeneratorConfig::default()).suite(&suite);
        let reports = run_suite(&tools, &config, suite.strategy, &instances);

        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        let expected: Vec<&str> = instances.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, expected, "reports out of order for {}", suite.prefix);

        let failures: Vec<String> = reports.iter().filter(|r| !r.is_passed()).map(|r| r.to_string()).collect();
        assert!(failures.is_empty(), "{}", failures.join("\n"));
        assert!(Summary::of(&reports).is_success());
    }
}

// ─── Properties ───────────────────────────────────────────────────────────────

fn coefficients() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-10i64..=10, 0..=10)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn minimize_agrees_with_oracle(coeffs in coefficients(), degree in -40i64..=40) {
        let dir = tempfile::tempdir().unwrap();
        let tools = Toolchain::exhaustive();
        let xs = Var::range(coeffs.len() as u32);
        let sum = Expression::weighted_sum(&coeffs, &xs);

        let encoded = encode(&tools, dir.path(), "prop", &[sum.clone().geq(degree).normalize()]);
        let result = encoded.minimize(&sum).unwrap();
        match oracle::brute_force_optimum(&coeffs, degree) {
            Some(value) => prop_assert_eq!(result, RunResult::optimum(value)),
            None => prop_assert_eq!(result.status, SolveStatus::Unsatisfiable),
        }
    }

    #[test]
    fn maximize_is_negated_minimize(coeffs in coefficients(), degree in -20i64..=20) {
        let dir = tempfile::tempdir().unwrap();
        let tools = Toolchain::exhaustive();
        let xs = Var::range(coeffs.len() as u32);
        let sum = Expression::weighted_sum(&coeffs, &xs);

        let encoded = encode(&tools, dir.path(), "dual", &[sum.clone().equals(degree).normalize()]);
        let max = encoded.maximize(&sum).unwrap();
        let min_of_negated = encoded.minimize(&-sum).unwrap();
        prop_assert_eq!(max, min_of_negated.negated());
        prop_assert_eq!(max.objective_value, oracle::brute_force_exact(&coeffs, degree));
    }
}
