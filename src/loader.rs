//! Load orchestration
//!
//! Drives one pass over the candidate snapshot files of a collector:
//! newest first, skipping snapshots that are older than the read-side cache
//! cares about or that are already fully loaded, then running
//! parse → resolve → aggregate → commit for each remaining file. A file
//! that fails to load is logged and left alone; since its date never gets
//! marked as loaded, the next pass picks it up again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate_origins, Afi};
use crate::dump::DumpReader;
use crate::origin::resolve_origin;
use crate::store::SnapshotStore;

/// Canonical date key for a dump file named `bview.<YYYYMMDD>.<HHMM>.gz`,
/// as an ISO-8601 string. `None` when the file name does not match.
pub fn snapshot_date(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.strip_prefix("bview.")?.strip_suffix(".gz")?;
    let parsed = NaiveDateTime::parse_from_str(stamp, "%Y%m%d.%H%M").ok()?;
    Some(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Orchestrates loading of discovered snapshot files into the store.
pub struct Loader {
    store: SnapshotStore,
}

impl Loader {
    pub fn new(store: SnapshotStore) -> Loader {
        Loader { store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one pass over the candidate files. Returns the number of
    /// snapshots loaded this pass. Per-file failures are logged and do not
    /// abort the pass; store-level failures do.
    pub fn load_all(&self, candidates: &[PathBuf]) -> Result<usize> {
        let oldest_to_load = self.store.oldest_date_of_interest()?;

        let dated = candidates
            .iter()
            .filter_map(|path| {
                let date = snapshot_date(path);
                if date.is_none() {
                    debug!("ignoring {}: not a bview file name", path.display());
                }
                date.map(|d| (d, path))
            })
            .sorted_by(|a, b| b.0.cmp(&a.0))
            .collect::<Vec<_>>();

        let mut loaded = 0;
        for (date, path) in dated {
            if let Some(oldest) = &oldest_to_load {
                if date < *oldest {
                    // older than the oldest date the cache wants, not worth
                    // parsing
                    debug!("skipping {}: older than {oldest}", path.display());
                    continue;
                }
            }
            if self.store.is_date_loaded(&date)? {
                debug!("already loaded {}", path.display());
                continue;
            }
            info!("loading {}", path.display());
            match self.load_file(path, &date) {
                Ok(()) => {
                    info!("done with {}", path.display());
                    loaded += 1;
                }
                Err(e) => {
                    // left unmarked, so a later pass retries it
                    warn!("failed to load {}: {e:#}", path.display());
                }
            }
        }
        Ok(loaded)
    }

    /// Load one snapshot file: stream its entries, resolve each prefix's
    /// origin AS, then aggregate and commit one address family at a time.
    fn load_file(&self, path: &Path, date: &str) -> Result<()> {
        let mut reader = DumpReader::open(path)?;
        let mut routes: HashMap<Afi, Vec<(String, String)>> =
            Afi::both().into_iter().map(|f| (f, Vec::new())).collect();

        while let Some(entry) = reader.next_entry()? {
            // prefixes with no resolvable origin are dropped, not fatal
            if let Some(asn) = resolve_origin(&entry.as_paths) {
                if let Some(bucket) = routes.get_mut(&entry.family) {
                    bucket.push((entry.prefix, asn));
                }
            }
        }
        debug!("content loaded from {}", path.display());

        for family in Afi::both() {
            let pairs = routes.remove(&family).unwrap_or_default();
            let aggregates = aggregate_origins(pairs)?;
            debug!(
                "committing {} ASNs for {date} ({family})",
                aggregates.len()
            );
            // committed even when empty so the both-families gate can close
            self.store.commit_snapshot(family, date, aggregates)?;
        }
        Ok(())
    }
}
