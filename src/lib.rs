//! # pbdiff: differential testing of pseudo-Boolean encoders
//!
//! **`pbdiff`** checks PB-to-CNF encoders against ground truth. It builds small pseudo-Boolean
//! constraints, has an external encoder turn them into CNF together with a proof, has a proof
//! checker certify that proof, asks an external solver for the minimum (and, for equalities, the
//! maximum) of the constraint's left-hand side over the CNF, and compares the answers with a
//! brute-force oracle.
//!
//! ## Pipeline
//!
//! ```text
//! Generator ──▶ TestInstance ──▶ normalize ──▶ T.opb
//!                                               │ encoder
//!                                               ▼
//!                                      T.cnf + T.pbp ──▶ proof checker
//!                                               │
//!                               T.min.opt.opb / T.max.opt.opb ──▶ solver ──▶ RunResult
//!                                                                              │
//!                                                         oracle ──▶ compare ◀─┘
//! ```
//!
//! Each stage blocks on its external program and the first failure ends the instance.
//! Instances are independent and can run in parallel, each in its own artifact directory.
//!
//! ## Basic Usage
//!
//! ```rust
//! use pbdiff::expr::Expression;
//! use pbdiff::oracle;
//! use pbdiff::types::Var;
//!
//! let xs = Var::range(3);
//! let sum = Expression::weighted_sum(&[10, 2, 2], &xs);
//! let constraint = sum.clone().geq(5).normalize();
//! assert_eq!(constraint.to_string(), "+10 x1 +2 x2 +2 x3 >= 5");
//!
//! // Smallest feasible value of the left-hand side.
//! assert_eq!(oracle::minimize(&[constraint], &sum.normalize()), Some(10));
//! ```
//!
//! ## Core Components
//!
//! - **[`expr`]**: Terms, expressions and constraints, and their canonical normalized form.
//! - **[`opb`]** and **[`cnf`]**: The OPB and DIMACS text formats.
//! - **[`oracle`]**: Exhaustive ground truth.
//! - **[`tools`]**: The encoder, proof checker and solver, as external programs or in-process.
//! - **[`driver`]**: The encode, verify, solve pipeline for one instance.
//! - **[`generator`]**: Families of test instances.
//! - **[`check`]**: Comparing answers with the oracle and running whole suites.

pub mod artifacts;
pub mod check;
pub mod cnf;
pub mod driver;
pub mod error;
pub mod expr;
pub mod generator;
pub mod opb;
pub mod oracle;
pub mod tools;
pub mod types;
