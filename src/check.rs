//! Comparing pipeline answers against the oracle.
//!
//! A test instance ends in one of three ways: every answer matched the
//! oracle ([`Outcome::Passed`]), some answer differed
//! ([`Outcome::Failed`], a test failure), or a pipeline stage broke
//! ([`Outcome::Aborted`], a fault of the encoder, checker, solver or
//! environment). Instances are independent, so a fault in one never
//! affects another.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::thread;

use log::{info, warn};

use crate::artifacts::ArtifactPaths;
use crate::driver::Pipeline;
use crate::error::{AssertionMismatch, Field, Mismatch, PipelineError, Query};
use crate::generator::TestInstance;
use crate::oracle::MAX_ORACLE_VARS;
use crate::tools::{EncodingStrategy, RunResult, SolveStatus, Toolchain};

/// What the solver must report for one query.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Expectation {
    Optimum(i64),
    Infeasible,
}

impl Expectation {
    pub fn status(self) -> SolveStatus {
        match self {
            Expectation::Optimum(_) => SolveStatus::Optimum,
            Expectation::Infeasible => SolveStatus::Unsatisfiable,
        }
    }

    pub fn value(self) -> Option<i64> {
        match self {
            Expectation::Optimum(value) => Some(value),
            Expectation::Infeasible => None,
        }
    }
}

impl From<Option<i64>> for Expectation {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(value) => Expectation::Optimum(value),
            None => Expectation::Infeasible,
        }
    }
}

fn show_value(value: Option<i64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}

/// Every field of `result` that disagrees with `expected`.
pub fn check_result(query: Query, expected: Expectation, result: &RunResult) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    if result.status != expected.status() {
        mismatches.push(Mismatch {
            query,
            field: Field::Status,
            expected: expected.status().to_string(),
            actual: result.status.to_string(),
        });
    }
    if result.objective_value != expected.value() {
        mismatches.push(Mismatch {
            query,
            field: Field::Value,
            expected: show_value(expected.value()),
            actual: show_value(result.objective_value),
        });
    }
    mismatches
}

#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(AssertionMismatch),
    Aborted(PipelineError),
}

#[derive(Debug)]
pub struct InstanceReport {
    pub name: String,
    /// `None` when the name could not be turned into an artifact directory.
    pub artifacts: Option<ArtifactPaths>,
    pub outcome: Outcome,
}

impl InstanceReport {
    pub fn is_passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    fn write_artifacts(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.artifacts {
            Some(artifacts) => write!(f, " (artifacts in {})", artifacts.dir().display()),
            None => Ok(()),
        }
    }
}

impl fmt::Display for InstanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Passed => write!(f, "PASS {}", self.name),
            Outcome::Failed(mismatch) => {
                write!(f, "FAIL {}", mismatch)?;
                self.write_artifacts(f)
            }
            Outcome::Aborted(error) => {
                write!(f, "ERROR {}: {}", self.name, error)?;
                let mut source = error.source();
                while let Some(cause) = source {
                    write!(f, ": {}", cause)?;
                    source = cause.source();
                }
                self.write_artifacts(f)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root under which each instance gets its own artifact directory.
    pub generation_dir: PathBuf,
    /// Worker threads for [`run_suite`].
    pub jobs: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            generation_dir: PathBuf::from("generated"),
            jobs: thread::available_parallelism().map(|n| n.get()).unwrap_or(2),
        }
    }
}

/// Runs the whole pipeline for `instance` and compares every query with
/// the oracle's answer, computed now from the instance itself.
///
/// Never panics: a panic inside a tool or the oracle is reported as
/// [`PipelineError::Panicked`] for this instance alone.
pub fn run_instance(
    tools: &Toolchain,
    config: &HarnessConfig,
    strategy: EncodingStrategy,
    instance: &TestInstance,
) -> InstanceReport {
    let artifacts = match ArtifactPaths::try_new(&config.generation_dir, &instance.name) {
        Ok(artifacts) => artifacts,
        Err(error) => {
            warn!("{} aborted: {}", instance.name, error);
            return InstanceReport {
                name: instance.name.clone(),
                artifacts: None,
                outcome: Outcome::Aborted(error),
            };
        }
    };
    let run = panic::catch_unwind(AssertUnwindSafe(|| {
        collect_mismatches(tools, artifacts.clone(), strategy, instance)
    }));
    let result = run.unwrap_or_else(|payload| {
        Err(PipelineError::Panicked {
            message: panic_message(&*payload),
        })
    });
    let outcome = match result {
        Ok(mismatches) if mismatches.is_empty() => {
            info!("{} passed", instance.name);
            Outcome::Passed
        }
        Ok(mismatches) => {
            let failure = AssertionMismatch {
                test_name: instance.name.clone(),
                mismatches,
            };
            warn!("{}", failure);
            Outcome::Failed(failure)
        }
        Err(error) => {
            warn!("{} aborted: {}", instance.name, error);
            Outcome::Aborted(error)
        }
    };
    InstanceReport {
        name: instance.name.clone(),
        artifacts: Some(artifacts),
        outcome,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn collect_mismatches(
    tools: &Toolchain,
    artifacts: ArtifactPaths,
    strategy: EncodingStrategy,
    instance: &TestInstance,
) -> Result<Vec<Mismatch>, PipelineError> {
    // answers above the cap cannot be checked
    let vars = instance.oracle_vars();
    if vars > MAX_ORACLE_VARS {
        return Err(PipelineError::OracleTooLarge {
            vars,
            max: MAX_ORACLE_VARS,
        });
    }
    let encoded = Pipeline::new(tools, artifacts, strategy).encode(&instance.constraints())?;
    let objective = instance.objective();

    let mut mismatches = Vec::new();
    for &query in instance.queries() {
        let result = match query {
            Query::Minimize => encoded.minimize(&objective)?,
            Query::Maximize => encoded.maximize(&objective)?,
        };
        let expected = Expectation::from(instance.expected(query));
        mismatches.extend(check_result(query, expected, &result));
    }
    Ok(mismatches)
}

/// Runs every instance on `config.jobs` worker threads.
///
/// Reports come back in the order of `instances`.
pub fn run_suite(
    tools: &Toolchain,
    config: &HarnessConfig,
    strategy: EncodingStrategy,
    instances: &[TestInstance],
) -> Vec<InstanceReport> {
    let jobs = config.jobs.clamp(1, instances.len().max(1));
    info!("running {} instances on {} threads with {}", instances.len(), jobs, strategy);

    let next = AtomicUsize::new(0);
    let (tx, rx) = channel::<(usize, InstanceReport)>();

    thread::scope(|scope| {
        for _ in 0..jobs {
            let tx = tx.clone();
            let next = &next;
            scope.spawn(move || loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(instance) = instances.get(index) else {
                    break;
                };
                let report = run_instance(tools, config, strategy, instance);
                if tx.send((index, report)).is_err() {
                    break;
                }
            });
        }
    });
    // receiver would otherwise wait for this sender forever
    drop(tx);

    let mut reports: Vec<Option<InstanceReport>> = instances.iter().map(|_| None).collect();
    for (index, report) in rx {
        reports[index] = Some(report);
    }
    reports.into_iter().flatten().collect()
}

/// Counts of passed, failed and aborted instances.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl Summary {
    pub fn of(reports: &[InstanceReport]) -> Self {
        let mut summary = Summary::default();
        for report in reports {
            match report.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::Aborted(_) => summary.aborted += 1,
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.aborted == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} aborted",
            self.passed, self.failed, self.aborted
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_matching_optimum() {
        let result = RunResult::optimum(2);
        assert!(check_result(Query::Minimize, Expectation::Optimum(2), &result).is_empty());
    }

    #[test]
    fn test_wrong_value() {
        let mismatches = check_result(Query::Maximize, Expectation::Optimum(5), &RunResult::optimum(7));
        assert_eq!(
            mismatches,
            vec![Mismatch {
                query: Query::Maximize,
                field: Field::Value,
                expected: "5".to_string(),
                actual: "7".to_string(),
            }]
        );
    }

    #[test]
    fn test_unexpected_unsat() {
        let mismatches = check_result(Query::Minimize, Expectation::Optimum(10), &RunResult::unsatisfiable());
        let fields: Vec<Field> = mismatches.iter().map(|m| m.field).collect();
        assert_eq!(fields, vec![Field::Status, Field::Value]);
        assert_eq!(mismatches[0].to_string(), "minimize status: expected OPTIMUM, got UNSATISFIABLE");
        assert_eq!(mismatches[1].to_string(), "minimize value: expected 10, got none");
    }

    #[test]
    fn test_infeasible() {
        assert!(check_result(Query::Minimize, Expectation::Infeasible, &RunResult::unsatisfiable()).is_empty());
        let satisfiable = RunResult {
            status: SolveStatus::Satisfiable,
            objective_value: None,
        };
        let mismatches = check_result(Query::Minimize, Expectation::Infeasible, &satisfiable);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, Field::Status);
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static");
        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 42");
    }

    #[test]
    fn test_expectation_from_oracle() {
        assert_eq!(Expectation::from(Some(-2)), Expectation::Optimum(-2));
        assert_eq!(Expectation::from(None), Expectation::Infeasible);
    }
}
