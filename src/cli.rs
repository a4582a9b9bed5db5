use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::technique::Technique;

#[derive(Parser)]
#[command(name = "snapvault")]
#[command(about = "Point-in-time directory snapshots with whole-file or chunked storage")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Take a snapshot of a directory
    Snapshot(SnapshotArgs),

    /// List all snapshots with their stored sizes
    List,

    /// Restore a snapshot into an output directory
    Restore(RestoreArgs),

    /// Delete a snapshot and all its records
    Prune(PruneArgs),

    /// Verify stored digests against record contents
    Check,
}

#[derive(Parser)]
pub struct SnapshotArgs {
    /// Target directory to snapshot
    pub directory: PathBuf,

    /// Storage technique for this and future snapshots (whole-file or chunked)
    #[arg(long)]
    pub technique: Option<Technique>,

    /// Chunk size in bytes, used only by the chunked technique
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

#[derive(Parser)]
pub struct RestoreArgs {
    /// Snapshot ID to restore
    pub snapshot: i64,

    /// Output directory for restored files
    pub output_directory: PathBuf,
}

#[derive(Parser)]
pub struct PruneArgs {
    /// Snapshot ID to prune
    pub snapshot: i64,
}
