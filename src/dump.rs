//! Routing table dump parsing
//!
//! Decodes an MRT routing-table snapshot (RIPE RIS `bview` file, gzip
//! transparent) into a stream of per-prefix route entries. Only
//! TABLE_DUMP_V2 RIB records are yielded: the v1 table-dump format lacks the
//! structured per-route path attributes this pipeline depends on, so v1
//! records are silently skipped, as are peer index tables and any
//! BGP4MP records that ended up in the file.
//!
//! The reader is single-pass and not restartable; re-open the file to
//! reparse.

use std::io::Read;
use std::path::Path;

use anyhow::Result;
use bgpkit_parser::models::{MrtMessage, TableDumpV2Message};
use bgpkit_parser::{BgpkitParser, ParserError};

use crate::aggregate::Afi;
use crate::error::LoaderError;

/// One row of a snapshot: a prefix and the AS-path attribute of every route
/// received for it, in the order the routes appear in the dump.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// `"<address>/<length>"`.
    pub prefix: String,
    pub family: Afi,
    /// One space-separated AS-path string per received route; AS-SET
    /// segments render as `{asn,asn,...}`.
    pub as_paths: Vec<String>,
}

/// Lazy reader over the table-dump-v2 entries of one snapshot file.
pub struct DumpReader {
    parser: BgpkitParser<Box<dyn Read + Send>>,
}

impl DumpReader {
    /// Open a snapshot file. A missing or unreadable file is a decode
    /// failure for that file, caught and retried by the orchestrator.
    pub fn open(path: &Path) -> Result<DumpReader> {
        let path_str = path
            .to_str()
            .ok_or_else(|| LoaderError::decode(format!("non-utf8 path {}", path.display())))?;
        let parser = BgpkitParser::new(path_str)
            .map_err(|e| LoaderError::decode(format!("cannot open {path_str}: {e}")))?;
        Ok(DumpReader { parser })
    }

    /// Pull the next table-dump-v2 RIB entry, or `None` at clean end of
    /// file. Truncated or otherwise corrupt input is a decode failure.
    pub fn next_entry(&mut self) -> Result<Option<RouteEntry>> {
        loop {
            let record = match self.parser.next_record() {
                Ok(record) => record,
                // clean end of file at a record boundary
                Err(e) if matches!(e.error, ParserError::EofExpected) => return Ok(None),
                Err(e) => {
                    return Err(LoaderError::decode(format!("corrupt dump record: {e}")).into())
                }
            };

            let rib = match record.message {
                MrtMessage::TableDumpV2Message(TableDumpV2Message::RibAfi(rib)) => rib,
                // v1 table dumps, peer index tables, BGP4MP messages
                _ => continue,
            };

            let prefix = rib.prefix.prefix;
            let family = if prefix.addr().is_ipv4() {
                Afi::V4
            } else {
                Afi::V6
            };
            let as_paths = rib
                .rib_entries
                .iter()
                .filter_map(|route| route.attributes.as_path().map(|p| p.to_string()))
                .collect();

            return Ok(Some(RouteEntry {
                prefix: prefix.to_string(),
                family,
                as_paths,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_is_clean_end_of_stream() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut reader = DumpReader::open(file.path()).unwrap();
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_garbage_record_is_decode_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // nothing MRT about these bytes; the header alone is unparseable
        file.write_all(&[0xffu8; 64]).unwrap();
        file.flush().unwrap();

        let mut reader = DumpReader::open(file.path()).unwrap();
        let err = reader.next_entry().err().unwrap();
        assert!(err.to_string().starts_with("decode:"));
    }

    #[test]
    fn test_open_missing_file_is_decode_error() {
        let err = DumpReader::open(Path::new("/nonexistent/bview.20240601.0000.gz"))
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("decode:"));
    }

    #[test]
    fn test_as_path_rendering() {
        use bgpkit_parser::models::{AsPath, AsPathSegment};

        // The origin resolver tokenizes on whitespace and expects AS-SET
        // segments as one brace-wrapped comma-joined token.
        let path = AsPath {
            segments: vec![
                AsPathSegment::AsSequence(vec![64511.into(), 64512.into()]),
                AsPathSegment::AsSet(vec![64513.into(), 64514.into()]),
            ],
        };
        assert_eq!(path.to_string(), "64511 64512 {64513,64514}");
    }
}
