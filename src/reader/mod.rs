//! Source readers for the sales extracts and lookup tables
//!
//! The reader module turns delimited source files into Polars DataFrames.
//! Readers make no attempt to type the data: every column comes back as
//! nullable text (empty field = null) and the key normalizer decides which
//! columns become integers. This keeps dirty lookup keys such as `"12a"`
//! intact until the cleaning rules can see them.
//!
//! # Architecture
//!
//! All readers implement the `SourceReader` trait, which provides:
//! - File (or embedded resource) → DataFrame conversion
//! - Per-table text decoding (`TextEncoding`)
//! - Fatal errors for missing files and malformed rows
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::reader::{CsvSourceReader, ReadOptions, SourceReader, TextEncoding};
//!
//! let reader = CsvSourceReader::new();
//! let customers = reader.read_table(
//!     "files/AdventureWorks Customer Lookup.csv".as_ref(),
//!     &ReadOptions::new(TextEncoding::Latin1),
//! )?;
//! ```

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Result, SalesvizError};

pub mod delimited;

#[cfg(feature = "builtin-data")]
pub mod data;

pub use delimited::CsvSourceReader;

#[cfg(feature = "builtin-data")]
pub use data::BuiltinReader;

// ============================================================================
// Text decoding
// ============================================================================

/// Character encoding of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Strict UTF-8 (a leading byte-order mark is ignored)
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value, so
    /// decoding never fails
    #[serde(alias = "iso-8859-1", alias = "latin-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode raw file bytes into text
    ///
    /// `source` is only used for error messages.
    pub fn decode(self, bytes: Vec<u8>, source: &str) -> Result<String> {
        match self {
            TextEncoding::Utf8 => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    SalesvizError::ReaderError(format!(
                        "{} is not valid UTF-8 (byte offset {}); declare its encoding as latin1",
                        source,
                        e.utf8_error().valid_up_to()
                    ))
                })?;
                Ok(match text.strip_prefix('\u{feff}') {
                    Some(stripped) => stripped.to_string(),
                    None => text,
                })
            }
            TextEncoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf8"),
            TextEncoding::Latin1 => write!(f, "latin1"),
        }
    }
}

/// Per-table parsing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl ReadOptions {
    /// Comma-delimited input in the given encoding
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new(TextEncoding::Utf8)
    }
}

// ============================================================================
// Reader Trait
// ============================================================================

/// Trait for source table readers
///
/// Readers load one table per call and return it as a DataFrame whose
/// columns are all nullable `String`. They provide a uniform interface for
/// files on disk and for the embedded sample dataset.
pub trait SourceReader {
    /// Read a single table
    ///
    /// # Errors
    ///
    /// - `SalesvizError::MissingInput` if the source does not exist or
    ///   cannot be read
    /// - `SalesvizError::ReaderError` if a row has the wrong number of
    ///   fields or the bytes cannot be decoded
    /// - `SalesvizError::SchemaMismatch` if the header row is empty or
    ///   repeats a column name
    fn read_table(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame>;

    /// Read and concatenate yearly sales extracts, in the given order
    ///
    /// Every row of every extract is kept. Column order is aligned to the
    /// first extract; a differing column set is a `SchemaMismatch`.
    fn read_sales(&self, paths: &[PathBuf], options: &ReadOptions) -> Result<DataFrame> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            frames.push((path.display().to_string(), self.read_table(path, options)?));
        }
        concat_extracts(frames)
    }
}

/// Stack same-schema extracts on top of each other
pub fn concat_extracts(frames: Vec<(String, DataFrame)>) -> Result<DataFrame> {
    let mut frames = frames.into_iter();
    let (first_name, mut combined) = frames.next().ok_or_else(|| {
        SalesvizError::ConfigError("At least one sales extract is required".to_string())
    })?;
    let columns = combined.get_column_names_owned();

    for (name, frame) in frames {
        let other = frame.get_column_names_owned();
        let same_set =
            other.len() == columns.len() && columns.iter().all(|c| other.contains(c));
        if !same_set {
            return Err(SalesvizError::SchemaMismatch(format!(
                "Sales extract {} has columns [{}] but {} has [{}]",
                name,
                join_names(&other),
                first_name,
                join_names(&columns)
            )));
        }
        let aligned = frame.select(columns.clone())?;
        combined.vstack_mut(&aligned)?;
    }

    Ok(combined)
}

fn join_names(names: &[PlSmallStr]) -> String {
    names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
