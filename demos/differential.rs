//! Differential run of an encoder against the brute-force oracle.
//!
//! Generates the instance families of one or more suites, runs each through
//! encode, verify and solve, and prints one line per instance.
//!
//! Run with: `cargo run --example differential -- --suite gte`
//! Without external tools: `cargo run --example differential -- --exhaustive`

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::bail;

use pbdiff::check::{run_suite, HarnessConfig, Summary};
use pbdiff::generator::{Generator, GeneratorConfig, Suite};
use pbdiff::tools::{Toolchain, ToolchainConfig};

#[derive(Parser, Debug)]
#[command(name = "differential")]
#[command(about = "Check a PB encoder against a brute-force oracle")]
struct Args {
    /// Suites to run (totalizer, seq, gte, adder); all when omitted
    #[arg(short, long)]
    suite: Vec<String>,

    /// Directory receiving the per-instance artifacts
    #[arg(short, long, default_value = "generated")]
    out: PathBuf,

    /// Worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Seed of the randomized families
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Encoder program (overrides PBDIFF_ENCODER)
    #[arg(long)]
    encoder: Option<PathBuf>,

    /// Proof checker program (overrides PBDIFF_CHECKER)
    #[arg(long)]
    checker: Option<PathBuf>,

    /// Solver program (overrides PBDIFF_SOLVER)
    #[arg(long)]
    solver: Option<PathBuf>,

    /// Use the in-process exhaustive tools instead of external programs
    #[arg(long)]
    exhaustive: bool,

    /// Print passing instances too
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Warn,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Args::parse();

    let suites = if args.suite.is_empty() {
        Suite::all()
    } else {
        let mut suites = Vec::new();
        for name in &args.suite {
            match Suite::by_name(name) {
                Some(suite) => suites.push(suite),
                None => bail!("unknown suite `{}`", name),
            }
        }
        suites
    };

    let tools = if args.exhaustive {
        Toolchain::exhaustive()
    } else {
        let mut config = ToolchainConfig::from_env();
        if let Some(encoder) = args.encoder {
            config.encoder = encoder;
        }
        if let Some(checker) = args.checker {
            config.checker = checker;
        }
        if let Some(solver) = args.solver {
            config.solver = solver;
        }
        println!("tools = {:?}", config);
        Toolchain::from_config(&config)
    };

    let mut harness = HarnessConfig {
        generation_dir: args.out,
        ..HarnessConfig::default()
    };
    if let Some(jobs) = args.jobs {
        harness.jobs = jobs;
    }

    let generator_config = GeneratorConfig {
        seed: args.seed,
        ..GeneratorConfig::default()
    };

    let mut total = Summary::default();
    for suite in suites {
        let time_suite = Instant::now();
        let instances = Generator::new(generator_config.clone()).suite(&suite);
        println!("── {} ({}, {} instances) ──", suite.prefix, suite.strategy, instances.len());

        let reports = run_suite(&tools, &harness, suite.strategy, &instances);
        for report in &reports {
            if args.verbose || !report.is_passed() {
                println!("{}", report);
            }
        }

        let summary = Summary::of(&reports);
        println!("{}: {} in {:.2?}", suite.prefix, summary, time_suite.elapsed());
        total.passed += summary.passed;
        total.failed += summary.failed;
        total.aborted += summary.aborted;
    }

    println!("total: {}", total);
    if !total.is_success() {
        bail!("{} instances did not pass", total.failed + total.aborted);
    }
    Ok(())
}
