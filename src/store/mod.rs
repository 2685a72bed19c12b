//! Snapshot store
//!
//! Persists per-AS snapshot aggregates into SQLite, keyed by
//! (collector, family, date, asn), and tracks which snapshot dates have been
//! fully loaded. A date only counts as loaded once both address families
//! have committed, so a run that died between the v4 and v6 commit is
//! retried on the next pass. Commits are transactional per family; the
//! per-family "latest loaded date" pointer is advanced only after the
//! transaction is durable and never moves backward.

mod schema;

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::aggregate::{Afi, AsAggregate};
use schema::SchemaDefinitions;

/// Meta key under which the read-side cache publishes the oldest snapshot
/// date it still wants backfilled.
const META_EXPECTED_INTERVAL_FIRST: &str = "expected_interval_first";

/// Persisted load state for one collector.
pub struct SnapshotStore {
    conn: Connection,
    collector: String,
}

impl SnapshotStore {
    /// Open (and initialize if needed) the store at the given path.
    pub fn open(path: &str, collector: &str) -> Result<SnapshotStore> {
        let conn = Connection::open(path)
            .map_err(|e| anyhow!("failed to open snapshot store at '{path}': {e}"))?;
        let store = SnapshotStore {
            conn,
            collector: collector.to_string(),
        };
        store.configure()?;
        store.initialize()?;
        Ok(store)
    }

    /// In-memory store, used by tests and one-off inspection.
    pub fn open_in_memory(collector: &str) -> Result<SnapshotStore> {
        let conn = Connection::open_in_memory()
            .map_err(|e| anyhow!("failed to create in-memory snapshot store: {e}"))?;
        let store = SnapshotStore {
            conn,
            collector: collector.to_string(),
        };
        store.configure()?;
        store.initialize()?;
        Ok(store)
    }

    pub fn collector(&self) -> &str {
        &self.collector
    }

    fn configure(&self) -> Result<()> {
        // WAL keeps external readers (the lookup side) unblocked during
        // commits
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("failed to set journal mode: {e}"))?;
        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("failed to set synchronous mode: {e}"))?;
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("failed to set temp store: {e}"))?;
        Ok(())
    }

    fn initialize(&self) -> Result<()> {
        for table_sql in SchemaDefinitions::all_tables() {
            self.conn
                .execute(table_sql, [])
                .map_err(|e| anyhow!("failed to create store table: {e}"))?;
        }
        for index_sql in SchemaDefinitions::INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("failed to create store index: {e}"))?;
        }
        Ok(())
    }

    /// True only when both address families have committed this date.
    pub fn is_date_loaded(&self, date: &str) -> Result<bool> {
        for family in Afi::both() {
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM loaded_dates WHERE collector = ?1 AND family = ?2 AND date = ?3",
                params![self.collector, family.as_str(), date],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Commit one family's aggregates for one snapshot date.
    ///
    /// All rows land in a single transaction: the per-ASN aggregates
    /// (merged as a set union with any prior row for the same key, with the
    /// address count recomputed from the union, so re-loading a file is
    /// idempotent) plus the loaded-date marker. The last-date pointer is
    /// advanced afterwards, once the snapshot is durable.
    pub fn commit_snapshot(
        &self,
        family: Afi,
        date: &str,
        aggregates: HashMap<String, AsAggregate>,
    ) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("failed to begin commit transaction: {e}"))?;
        {
            let mut select = tx.prepare_cached(
                "SELECT prefixes FROM as_aggregates
                 WHERE collector = ?1 AND family = ?2 AND date = ?3 AND asn = ?4",
            )?;
            let mut upsert = tx.prepare_cached(
                "INSERT OR REPLACE INTO as_aggregates
                 (collector, family, date, asn, prefixes, ip_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (asn, mut agg) in aggregates {
                let prior: Option<String> = select
                    .query_row(
                        params![self.collector, family.as_str(), date, asn],
                        |row| row.get(0),
                    )
                    .optional()?;
                if let Some(json) = prior {
                    let existing: Vec<String> = serde_json::from_str(&json)
                        .with_context(|| format!("corrupt prefix set for asn {asn}"))?;
                    agg = AsAggregate::from_prefixes(
                        existing.into_iter().chain(agg.prefixes),
                    )?;
                }
                let mut prefixes: Vec<&String> = agg.prefixes.iter().collect();
                prefixes.sort();
                upsert.execute(params![
                    self.collector,
                    family.as_str(),
                    date,
                    asn,
                    serde_json::to_string(&prefixes)?,
                    agg.ip_count.to_string(),
                ])?;
            }
            tx.execute(
                "INSERT OR IGNORE INTO loaded_dates (collector, family, date) VALUES (?1, ?2, ?3)",
                params![self.collector, family.as_str(), date],
            )?;
        }
        tx.commit()
            .map_err(|e| anyhow!("failed to commit snapshot for {date} ({family}): {e}"))?;

        self.update_last(family, date)
    }

    /// Advance the family's last-date pointer if this date is newer. Dates
    /// are ISO-8601 strings, so lexicographic order is chronological order.
    fn update_last(&self, family: Afi, date: &str) -> Result<()> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT date FROM last_date WHERE collector = ?1 AND family = ?2",
                params![self.collector, family.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if current.as_deref().is_none_or(|cur| date > cur) {
            self.conn.execute(
                "INSERT OR REPLACE INTO last_date (collector, family, date) VALUES (?1, ?2, ?3)",
                params![self.collector, family.as_str(), date],
            )?;
        }
        Ok(())
    }

    /// Latest loaded date for one family, if any snapshot has committed.
    pub fn last_date(&self, family: Afi) -> Result<Option<String>> {
        let date = self
            .conn
            .query_row(
                "SELECT date FROM last_date WHERE collector = ?1 AND family = ?2",
                params![self.collector, family.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(date)
    }

    /// All dates committed for one family, ascending.
    pub fn loaded_dates(&self, family: Afi) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date FROM loaded_dates WHERE collector = ?1 AND family = ?2 ORDER BY date",
        )?;
        let dates = stmt
            .query_map(params![self.collector, family.as_str()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(dates)
    }

    /// ASNs seen in one snapshot, ascending by ASN string.
    pub fn snapshot_asns(&self, family: Afi, date: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT asn FROM as_aggregates
             WHERE collector = ?1 AND family = ?2 AND date = ?3 ORDER BY asn",
        )?;
        let asns = stmt
            .query_map(params![self.collector, family.as_str(), date], |row| {
                row.get(0)
            })?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(asns)
    }

    /// The aggregate persisted for one (family, date, asn) key.
    pub fn aggregate(&self, family: Afi, date: &str, asn: &str) -> Result<Option<AsAggregate>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT prefixes, ip_count FROM as_aggregates
                 WHERE collector = ?1 AND family = ?2 AND date = ?3 AND asn = ?4",
                params![self.collector, family.as_str(), date, asn],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((json, count)) => {
                let prefixes: Vec<String> = serde_json::from_str(&json)
                    .with_context(|| format!("corrupt prefix set for asn {asn}"))?;
                let ip_count = count
                    .parse::<u128>()
                    .map_err(|e| anyhow!("corrupt ip count for asn {asn}: {e}"))?;
                Ok(Some(AsAggregate {
                    prefixes: prefixes.into_iter().collect(),
                    ip_count,
                }))
            }
        }
    }

    /// Set a metadata value.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO loader_meta (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("failed to set meta value: {e}"))?;
        Ok(())
    }

    /// Get a metadata value.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM loader_meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| anyhow!("failed to get meta value: {e}"))?;
        Ok(value)
    }

    /// Oldest snapshot date the read-side cache still wants, maintained
    /// externally. Snapshots strictly older are not worth loading.
    pub fn oldest_date_of_interest(&self) -> Result<Option<String>> {
        self.get_meta(META_EXPECTED_INTERVAL_FIRST)
    }

    pub fn set_oldest_date_of_interest(&self, date: &str) -> Result<()> {
        self.set_meta(META_EXPECTED_INTERVAL_FIRST, date)
    }
}
