//! Delimited-text (CSV) reader

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use super::{ReadOptions, SourceReader};
use crate::{Result, SalesvizError};

/// Reads comma (or otherwise) delimited files with a header row
///
/// Record lengths are strict: a row with more or fewer fields than the
/// header aborts the read. Quoted fields, embedded delimiters and embedded
/// newlines follow the usual CSV quoting rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSourceReader;

impl CsvSourceReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse already-loaded bytes as a delimited table
    ///
    /// `source` names the table in error messages.
    pub fn parse_bytes(
        &self,
        source: &str,
        bytes: Vec<u8>,
        options: &ReadOptions,
    ) -> Result<DataFrame> {
        let text = options.encoding.decode(bytes, source)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SalesvizError::ReaderError(format!("{}: {}", source, e)))?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(SalesvizError::SchemaMismatch(format!(
                "{} has no header row",
                source
            )));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(SalesvizError::SchemaMismatch(format!(
                "{} repeats column '{}'",
                source, duplicate
            )));
        }

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record.map_err(|e| malformed(source, e))?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.push(if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }

        let columns: Vec<Column> = headers
            .iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name.as_str().into(), values).into())
            .collect();
        let df = DataFrame::new(columns)?;

        debug!(
            "Read {} rows x {} columns from {} ({})",
            df.height(),
            df.width(),
            source,
            options.encoding
        );
        Ok(df)
    }
}

impl SourceReader for CsvSourceReader {
    fn read_table(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame> {
        let bytes = std::fs::read(path).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::NotFound => "file not found".to_string(),
                _ => e.to_string(),
            };
            SalesvizError::MissingInput(format!("{}: {}", path.display(), reason))
        })?;
        self.parse_bytes(&path.display().to_string(), bytes, options)
    }
}

fn malformed(source: &str, err: csv::Error) -> SalesvizError {
    let line = err
        .position()
        .map(|p| format!(" (line {})", p.line()))
        .unwrap_or_default();
    SalesvizError::ReaderError(format!("{}{}: {}", source, line, err))
}
