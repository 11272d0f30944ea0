//! mentoralloc — CLI entrypoint.
//!
//! Thin wrapper: load policy + the three input tables, run one batch,
//! write the four canonical output tables. Strictly offline and
//! deterministic, same as the engine it drives.

mod args;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use args::{AllocateArgs, Cli, Command};
use mentoralloc_io::canonical_json::write_canonical_file;
use mentoralloc_pipeline::driver::{run_batch, BatchControl};
use mentoralloc_pipeline::load::load_batch_from_json;
use mentoralloc_pipeline::{summary, PipelineError};
use mentoralloc_report::render_json;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Allocate(args) => run_allocate(args),
    }
}

fn run_allocate(args: AllocateArgs) -> ExitCode {
    match allocate(&args) {
        Ok(()) => ExitCode::from(0),
        Err(Failure::Pipeline(PipelineError::PolicyInvalid(msg))) => {
            eprintln!("mentoralloc: policy invalid: {msg}");
            ExitCode::from(2)
        }
        Err(Failure::Pipeline(PipelineError::InputInvalid(msg))) => {
            eprintln!("mentoralloc: input invalid: {msg}");
            ExitCode::from(3)
        }
        Err(Failure::Pipeline(PipelineError::Cancelled { processed, total, partial })) => {
            eprintln!("mentoralloc: cancelled after {processed} of {total} students");
            if let Err(e) = write_partial(&args, &partial) {
                eprintln!("mentoralloc: error writing partial artifacts: {e}");
            }
            ExitCode::from(4)
        }
        Err(Failure::Pipeline(PipelineError::CapacityUnderflow { mentor_id, row_index })) => {
            eprintln!("mentoralloc: internal error: capacity underflow committing mentor '{mentor_id}' for row {row_index}");
            ExitCode::from(5)
        }
        Err(Failure::Pipeline(PipelineError::InternalError(msg))) => {
            eprintln!("mentoralloc: internal error: {msg}");
            ExitCode::from(5)
        }
        Err(Failure::Other(msg)) => {
            eprintln!("mentoralloc: internal error: {msg}");
            ExitCode::from(5)
        }
    }
}

enum Failure {
    Pipeline(PipelineError),
    Other(String),
}

impl From<PipelineError> for Failure {
    fn from(e: PipelineError) -> Self {
        Failure::Pipeline(e)
    }
}

fn allocate(args: &AllocateArgs) -> Result<(), Failure> {
    let students_json = read_input(&args.students)?;
    let pool_json = read_input(&args.pool)?;
    let history_json = read_input(&args.history)?;
    let policy_json = read_input(&args.policy)?;

    let batch = load_batch_from_json(&policy_json, &students_json, &pool_json, &history_json)?;

    let control = BatchControl {
        progress: Some(&|percent, message| {
            tracing::debug!(percent, message, "allocate: progress");
        }),
        cancel_requested: None,
        batch_label: Some(args.students.display().to_string()),
    };

    let outcome = run_batch(&batch, &control)?;

    write_outputs(&args.output, &outcome)?;

    if !args.center_manager.is_empty() {
        write_center_managers(&args.output, &args.center_manager)?;
    }

    if !args.quiet {
        let batch_summary = summary::summarize(&outcome);
        println!(
            "mentoralloc: {} students, {} placed, {} failed, {} skipped (history)",
            batch_summary.total_students,
            batch_summary.success_count,
            batch_summary.failed_count,
            batch_summary.skipped_history_count,
        );
        println!("mentoralloc: artifacts written to {}", args.output.display());
    }

    Ok(())
}

fn read_input(path: &std::path::Path) -> Result<String, Failure> {
    fs::read_to_string(path).map_err(|e| Failure::Other(format!("cannot read {}: {e}", path.display())))
}

fn write_outputs(out_dir: &std::path::Path, outcome: &mentoralloc_pipeline::driver::BatchOutcome) -> Result<(), Failure> {
    let assignments = render_json::build_student_tables(outcome);
    let batch_summary = summary::summarize(outcome);

    write_table(out_dir, "assignments.json", &assignments.assignments)?;
    write_table(out_dir, "trace.json", &assignments.trace)?;
    write_table(out_dir, "log.json", &assignments.log)?;
    write_table(out_dir, "summary.json", &mentoralloc_report::structure::build_summary(&batch_summary))?;
    Ok(())
}

fn write_table<T: serde::Serialize>(out_dir: &std::path::Path, file_name: &str, value: &T) -> Result<(), Failure> {
    let json = serde_json::to_value(value).map_err(|e| Failure::Other(e.to_string()))?;
    write_canonical_file(&out_dir.join(file_name), &json).map_err(|e| Failure::Other(e.to_string()))
}

fn write_partial(args: &AllocateArgs, partial: &mentoralloc_pipeline::driver::BatchOutcome) -> std::io::Result<()> {
    write_outputs(&args.output, partial).map_err(|f| match f {
        Failure::Other(msg) => std::io::Error::new(std::io::ErrorKind::Other, msg),
        Failure::Pipeline(e) => std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    })
}

fn write_center_managers(out_dir: &std::path::Path, pairs: &[(String, String)]) -> Result<(), Failure> {
    let map: serde_json::Map<String, serde_json::Value> =
        pairs.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
    let json = serde_json::Value::Object(map);
    write_canonical_file(&out_dir.join("center_managers.json"), &json).map_err(|e| Failure::Other(e.to_string()))
}
