#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! ASN History - BGP snapshot ingestion
//!
//! Ingests periodic full-table BGP routing dumps (RIPE RIS `bview` files)
//! from a route collector and aggregates, for every announced prefix, its
//! originating Autonomous System into per-AS, per-address-family,
//! per-snapshot-date records, persisted in a SQLite store for point-in-time
//! lookup ("which AS originated this address range on date D?").
//!
//! # Architecture
//!
//! The pipeline runs in five stages, strictly one file at a time:
//!
//! - **[`dump`]**: decode a binary table dump into per-prefix route entries
//!   (TABLE_DUMP_V2 only; v1 records are skipped)
//! - **[`origin`]**: pick the single origin ASN from a prefix's AS paths,
//!   including AS-SET (`{asn,asn}`) notation
//! - **[`aggregate`]**: group (prefix, origin) pairs per ASN, accumulating
//!   distinct prefixes and total addressable IPs
//! - **[`store`]**: commit each family's aggregate transactionally, track
//!   fully loaded dates and the monotonic "latest loaded date" pointer
//! - **[`loader`]**: orchestrate one pass over discovered dump files, with
//!   retention and already-loaded skips and per-file retry-by-resumption
//!
//! Snapshot discovery, dump fetching, and the run-forever scheduling loop
//! live in the `asnhistory` binary; the library itself is synchronous and
//! holds no timing state.

pub mod aggregate;
pub mod config;
pub mod dump;
pub mod error;
pub mod loader;
pub mod origin;
pub mod store;

pub use aggregate::{aggregate_origins, Afi, AsAggregate};
pub use config::LoaderConfig;
pub use dump::{DumpReader, RouteEntry};
pub use error::LoaderError;
pub use loader::{snapshot_date, Loader};
pub use origin::resolve_origin;
pub use store::SnapshotStore;
