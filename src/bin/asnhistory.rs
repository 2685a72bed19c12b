//! Loader daemon entry point
//!
//! Runs forever: discover the collector's dump files, run one load pass,
//! sleep, repeat. Discovery and scheduling live here; the library exposes a
//! single synchronous pass.

use std::path::{Path, PathBuf};
use std::thread::sleep;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};

use asnhistory::{Loader, LoaderConfig, SnapshotStore};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Route collector to ingest (e.g. rrc00)
    #[clap(default_value = "rrc00")]
    collector: String,

    /// Configuration file path, by default $HOME/.asnhistory/asnhistory.toml
    #[clap(short, long)]
    config: Option<String>,

    /// Override the snapshot store path
    #[clap(long)]
    db: Option<String>,

    /// Run a single load pass and exit
    #[clap(long)]
    once: bool,

    /// Print debug information
    #[clap(long)]
    debug: bool,
}

/// Collect every `.gz` file under the collector's dump tree. The tree is
/// laid out by the external fetcher as `<collector>/<YYYY.MM>/bview.*.gz`.
fn discover_dumps(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read dump directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            found.extend(discover_dumps(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "gz") {
            found.push(path);
        }
    }
    Ok(found)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config = LoaderConfig::new(&cli.config)?;
    let dump_dir = config.validate_collector_dir(&cli.collector)?;
    let db_path = cli.db.unwrap_or_else(|| config.sqlite_path());

    let store = SnapshotStore::open(&db_path, &cli.collector)?;
    let loader = Loader::new(store);

    info!(
        "ingesting collector {} from {dump_dir} into {db_path}",
        cli.collector
    );

    loop {
        let pass = discover_dumps(Path::new(&dump_dir))
            .and_then(|candidates| loader.load_all(&candidates));
        match pass {
            Ok(loaded) if loaded > 0 => info!("pass complete, {loaded} snapshot(s) loaded"),
            Ok(_) => {}
            // storage outages and the like: retried after the sleep interval
            Err(e) => error!("load pass failed: {e:#}"),
        }

        if cli.once {
            break;
        }
        sleep(config.sleep_interval());
    }
    Ok(())
}
