use clap::Parser;
use snapvault::cli::{Cli, Command};
use snapvault::config::Config;
use snapvault::engine::SnapshotEngine;
use snapvault::report;
use snapvault::store::Store;
use snapvault::util::format_bytes;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> snapvault::Result<()> {
    match cli.command {
        Command::Snapshot(args) => {
            let config = Config::load(args.technique, args.chunk_size)?;
            let engine = open_engine(&config)?;

            let id = engine.take_snapshot(&args.directory)?;
            println!(
                "snapshot {id} created ({} technique)",
                config.technique.as_str()
            );
        }
        Command::List => {
            let config = Config::load(None, None)?;
            let engine = open_engine(&config)?;

            let summaries = engine.list_snapshots()?;
            let total = engine.total_stored_size()?;
            report::print(&summaries, total);
        }
        Command::Restore(args) => {
            let config = Config::load(None, None)?;
            let engine = open_engine(&config)?;

            engine.restore_snapshot(args.snapshot, &args.output_directory)?;
            println!(
                "snapshot {} restored to {}",
                args.snapshot,
                args.output_directory.display()
            );
        }
        Command::Prune(args) => {
            let config = Config::load(None, None)?;
            let mut engine = open_engine(&config)?;

            engine.prune_snapshot(args.snapshot)?;
            println!("snapshot {} pruned", args.snapshot);
        }
        Command::Check => {
            let config = Config::load(None, None)?;
            let engine = open_engine(&config)?;

            let corrupted = engine.check_integrity()?;
            if corrupted.is_empty() {
                println!("no corrupted records found ({} stored)", format_bytes(engine.total_stored_size()?));
            } else {
                eprintln!("corrupted records found:");
                for record in &corrupted {
                    eprintln!(
                        "  snapshot {} {}: {}",
                        record.snapshot_id, record.path, record.detail
                    );
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn open_engine(config: &Config) -> snapvault::Result<SnapshotEngine> {
    let store = match &config.db_path {
        Some(path) => Store::open_at(path)?,
        None => Store::open()?,
    };
    SnapshotEngine::new(store, config.technique, config.chunk_size)
}
