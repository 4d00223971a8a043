//! Built-in sample dataset
//!
//! A small AdventureWorks-shaped dataset (two yearly sales extracts plus the
//! three lookups) compiled into the binary. The customer lookup is stored
//! as ISO-8859-1 and contains dirty keys (`12a`, blank, `AW00029300`) so the
//! demo exercises the same cleaning rules as real extracts.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use super::{CsvSourceReader, ReadOptions, SourceReader};
use crate::config::SourceConfig;
use crate::reader::TextEncoding;
use crate::{Result, SalesvizError};

static SALES_2021: &[u8] = include_bytes!("../data/sales_2021.csv");
static SALES_2022: &[u8] = include_bytes!("../data/sales_2022.csv");
static CUSTOMERS: &[u8] = include_bytes!("../data/customers.csv");
static TERRITORIES: &[u8] = include_bytes!("../data/territories.csv");
static PRODUCTS: &[u8] = include_bytes!("../data/products.csv");

const SAMPLE_FILES: &[(&str, &[u8])] = &[
    ("sales_2021.csv", SALES_2021),
    ("sales_2022.csv", SALES_2022),
    ("customers.csv", CUSTOMERS),
    ("territories.csv", TERRITORIES),
    ("products.csv", PRODUCTS),
];

/// Source configuration pointing at the embedded sample files
pub fn sample_sources() -> SourceConfig {
    SourceConfig {
        sales: vec![
            PathBuf::from("sales_2021.csv"),
            PathBuf::from("sales_2022.csv"),
        ],
        customers: PathBuf::from("customers.csv"),
        territories: PathBuf::from("territories.csv"),
        products: PathBuf::from("products.csv"),
        customer_encoding: TextEncoding::Latin1,
        delimiter: ',',
    }
}

/// Serves the embedded sample files by file name
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinReader {
    csv: CsvSourceReader,
}

impl BuiltinReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the embedded files
    pub fn file_names() -> impl Iterator<Item = &'static str> {
        SAMPLE_FILES.iter().map(|(name, _)| *name)
    }
}

impl SourceReader for BuiltinReader {
    fn read_table(&self, path: &Path, options: &ReadOptions) -> Result<DataFrame> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let bytes = SAMPLE_FILES
            .iter()
            .find(|(file, _)| *file == name)
            .map(|(_, bytes)| bytes.to_vec())
            .ok_or_else(|| {
                SalesvizError::MissingInput(format!(
                    "{}: not part of the built-in sample dataset",
                    path.display()
                ))
            })?;
        self.csv.parse_bytes(name, bytes, options)
    }
}
