/*!
# salesviz - order volume by product and sales region

salesviz loads yearly sales extracts together with customer, territory and
product lookup tables, reconciles their join keys, merges them into one
denormalized table, sums order quantity per (product, region) and renders
the result as an interactive 3D scatter.

## Example

```rust,ignore
use salesviz::{Pipeline, PipelineConfig};
use salesviz::reader::CsvSourceReader;
use salesviz::writer::ExportFormat;

let config = PipelineConfig::from_file("salesviz.toml")?;
let pipeline = Pipeline::new(config)?;
let output = pipeline.run(&CsvSourceReader::new())?;
let html = pipeline.render(&output, ExportFormat::Html)?;
```

## Core Components

- [`reader`] - Delimited-text readers producing text-typed DataFrames
- [`normalize`] - Join-key renaming, customer key cleaning, key coercion
- [`join`] - Left joins of sales against the three dimensions
- [`aggregate`] - Grouped order quantity sums per (product, region)
- [`encode`] - Marker size scaling and region colors
- [`writer`] - Plotly figure / standalone HTML export adapters
*/

pub mod aggregate;
pub mod config;
pub mod encode;
pub mod join;
pub mod naming;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod tables;
pub mod writer;

pub use aggregate::{AggregatedPoint, NullGroupPolicy};
pub use config::PipelineConfig;
pub use encode::{EncodedPoint, SizePolicy};
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats};

// Re-export polars types that appear in the public API
pub use polars::prelude::DataFrame;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main library error type
#[derive(thiserror::Error, Debug)]
pub enum SalesvizError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Reader error: {0}")]
    ReaderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Writer error: {0}")]
    WriterError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<polars::prelude::PolarsError> for SalesvizError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        SalesvizError::InternalError(format!("Data engine failure: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, SalesvizError>;
