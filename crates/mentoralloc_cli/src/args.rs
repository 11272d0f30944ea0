//! Deterministic, offline CLI argument parsing for the `allocate`
//! subcommand. No networked paths, no hidden defaults beyond `--output`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mentoralloc", about = "Deterministic student -> mentor allocation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one batch end to end: load policy + inputs, allocate, write
    /// the four canonical output tables.
    Allocate(AllocateArgs),
}

#[derive(Debug, Parser)]
pub struct AllocateArgs {
    /// Path to the students input table (JSON array of rows).
    #[arg(long)]
    pub students: PathBuf,

    /// Path to the mentor pool input table (JSON array of rows).
    #[arg(long)]
    pub pool: PathBuf,

    /// Path to the history snapshot (JSON array of rows).
    #[arg(long)]
    pub history: PathBuf,

    /// Path to the policy document (JSON).
    #[arg(long)]
    pub policy: PathBuf,

    /// Output directory for the four canonical tables.
    #[arg(long)]
    pub output: PathBuf,

    /// Repeatable `key=value` pair identifying the human contact
    /// responsible for a center; recorded verbatim alongside the
    /// run's output tables but never consulted by the allocation
    /// engine itself.
    #[arg(long = "center-manager", value_parser = parse_key_value)]
    pub center_manager: Vec<(String, String)>,

    /// Suppress the human-readable summary line on stdout.
    #[arg(long)]
    pub quiet: bool,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected `key=value`, got '{s}'")),
    }
}
