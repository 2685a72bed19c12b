//! Snapshot store schema
//!
//! Table definitions for the persisted load state. Everything is keyed by
//! (collector, family, date) so one database can carry the history of
//! several collectors.

/// Schema definitions for the snapshot store
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Key/value metadata, including the cache-maintained oldest date of
    /// interest (`expected_interval_first`).
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS loader_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// Dates whose aggregate has been fully committed, per address family.
    /// A date is only "loaded" once both families have a row.
    pub const LOADED_DATES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS loaded_dates (
            collector TEXT NOT NULL,
            family TEXT NOT NULL,
            date TEXT NOT NULL,
            PRIMARY KEY (collector, family, date)
        );
    "#;

    /// Monotonically advancing "latest loaded date" pointer per family.
    pub const LAST_DATE_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS last_date (
            collector TEXT NOT NULL,
            family TEXT NOT NULL,
            date TEXT NOT NULL,
            PRIMARY KEY (collector, family)
        );
    "#;

    /// Per-AS aggregate for one snapshot: prefix set as a JSON array of
    /// canonical CIDR strings, address count as a decimal string (v6 counts
    /// do not fit in an SQLite integer).
    pub const AS_AGGREGATES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS as_aggregates (
            collector TEXT NOT NULL,
            family TEXT NOT NULL,
            date TEXT NOT NULL,
            asn TEXT NOT NULL,
            prefixes TEXT NOT NULL,
            ip_count TEXT NOT NULL,
            PRIMARY KEY (collector, family, date, asn)
        );
    "#;

    pub const INDEXES: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_as_aggregates_snapshot ON as_aggregates(collector, family, date)",
        "CREATE INDEX IF NOT EXISTS idx_loaded_dates_date ON loaded_dates(collector, date)",
    ];

    pub fn all_tables() -> [&'static str; 4] {
        [
            Self::META_TABLE,
            Self::LOADED_DATES_TABLE,
            Self::LAST_DATE_TABLE,
            Self::AS_AGGREGATES_TABLE,
        ]
    }
}
