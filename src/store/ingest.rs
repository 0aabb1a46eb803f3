//! Reading record files into a [`TextIndexStore`]
//!
//! Two layouts are understood:
//!
//! - `.json`: one top-level array of objects
//! - anything else (`.jsonl`, `.ndjson`, ...): one object per line
//!
//! Rows that are not objects, lack a string `name` or are not valid UTF-8
//! are counted as malformed and skipped. Only I/O failures, or a `.json`
//! file whose top level is not an array, abort the read.
//!
//! Every row keeps its 0-based position in the source (line for JSON lines,
//! element for arrays) so skipped rows can be reported against the file.

use crate::error::{IngestError, StoreError};
use crate::store::index::{LoadReport, TextIndexStore};
use crate::store::record::Record;
use crate::utils::progress::spinner;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::warn;

/// Rows parsed from a source, plus the ones that could not be parsed
#[derive(Debug, Default)]
pub struct RecordSource {
    /// (source row, record)
    pub records: Vec<(usize, Record)>,
    pub rejected: Vec<IngestError>,
}

/// Read a record file without touching any store
pub fn read_records(path: &Path, silent: bool) -> Result<RecordSource, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let is_array = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let progress = spinner("Reading records...", silent);
    let source = if is_array {
        parse_array(reader, path)
    } else {
        parse_lines(reader, path, |_| {
            if let Some(pb) = &progress {
                pb.inc(1);
            }
        })
    };
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    source
}

/// Read `path` and replace the contents of `store` with it
///
/// Rows rejected while parsing are folded into the returned report next to
/// the rows the store itself skipped.
pub fn load_path(store: &TextIndexStore, path: &Path, silent: bool) -> Result<LoadReport, StoreError> {
    let source = read_records(path, silent)?;
    let mut report = store.load_rows(source.records);
    for issue in source.rejected {
        report.note(issue);
    }

    if report.skipped() > 0 {
        warn!(
            path = %path.display(),
            malformed = report.malformed,
            duplicates = report.duplicates,
            "skipped rows while loading records"
        );
    }
    Ok(report)
}

/// Parse a JSON array of record objects
pub fn parse_array<R: Read>(reader: R, path: &Path) -> Result<RecordSource, StoreError> {
    let value: Value = serde_json::from_reader(reader).map_err(|e| StoreError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let Value::Array(rows) = value else {
        return Err(StoreError::Format {
            path: path.to_path_buf(),
            reason: "top-level value is not an array".to_string(),
        });
    };

    let mut source = RecordSource::default();
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<Record>(row) {
            Ok(record) => source.records.push((index, record)),
            Err(e) => source.rejected.push(IngestError::Invalid {
                index,
                reason: e.to_string(),
            }),
        }
    }
    Ok(source)
}

/// Parse one record object per line; blank lines are ignored
///
/// Lines are taken as raw bytes, so a row with broken UTF-8 is rejected on
/// its own instead of failing the read.
pub fn parse_lines<R: BufRead>(
    mut reader: R,
    path: &Path,
    mut on_row: impl FnMut(usize),
) -> Result<RecordSource, StoreError> {
    let mut source = RecordSource::default();
    let mut buf = Vec::new();

    for index in 0.. {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<Record>(line) {
            Ok(record) => source.records.push((index, record)),
            Err(e) => source.rejected.push(IngestError::Invalid {
                index,
                reason: e.to_string(),
            }),
        }
        on_row(index);
    }
    Ok(source)
}
