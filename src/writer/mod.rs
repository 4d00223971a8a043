//! Chart and export adapters
//!
//! Writers consume the encoded aggregate table and know nothing about how it
//! was produced. Each output flavour is a separate `Writer` implementation:
//!
//! - [`PlotlyWriter`] - plotly.js figure JSON (one `scatter3d` trace per region)
//! - [`HtmlWriter`] - standalone HTML page embedding the figure, optionally
//!   with an export button wired to the interactive server
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::writer::{export_to_path, ExportFormat};
//!
//! let chart = pipeline.chart_data(&output);
//! export_to_path(&chart, ExportFormat::Html, "3d_sales_volume_product_region.html")?;
//! ```

mod html;
mod plotly;

pub use html::{ExportButton, HtmlWriter};
pub use plotly::PlotlyWriter;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ChartConfig;
use crate::encode::EncodedPoint;
use crate::{Result, SalesvizError};

/// Everything a writer needs to draw the chart
#[derive(Debug, Clone, Copy)]
pub struct ChartData<'a> {
    pub points: &'a [EncodedPoint],
    pub chart: &'a ChartConfig,
    /// Input file names, listed in the subtitle when enabled
    pub sources: &'a [String],
}

/// Trait for chart writers
pub trait Writer {
    type Output;

    /// Render the chart
    fn write(&self, data: &ChartData) -> Result<Self::Output>;

    /// Check the chart can be rendered; called by `write`
    fn validate(&self, data: &ChartData) -> Result<()> {
        if let Some(bad) = data
            .points
            .iter()
            .find(|p| !(p.marker_size.is_finite() && p.marker_size >= 0.0))
        {
            return Err(SalesvizError::WriterError(format!(
                "Marker size {} for {} / {} cannot be drawn",
                bad.marker_size,
                crate::naming::display_label(bad.point.product_name.as_deref()),
                crate::naming::display_label(bad.point.region.as_deref())
            )));
        }
        Ok(())
    }
}

/// Export artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Standalone HTML page
    #[default]
    Html,
    /// plotly.js figure JSON
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    /// Default download file name
    pub fn file_name(self) -> String {
        format!("3d_sales_volume_product_region.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SalesvizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            other => Err(SalesvizError::ConfigError(format!(
                "Unknown export format '{}'. Available formats: html, json",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Render the chart into a finished byte buffer
pub fn export_bytes(data: &ChartData, format: ExportFormat) -> Result<Vec<u8>> {
    export_bytes_with(data, format, &HtmlWriter::new())
}

/// Like [`export_bytes`], rendering HTML with a configured [`HtmlWriter`]
pub fn export_bytes_with(
    data: &ChartData,
    format: ExportFormat,
    html: &HtmlWriter,
) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Html => html.write(data).map(String::into_bytes),
        ExportFormat::Json => {
            let figure = PlotlyWriter::new().write(data)?;
            serde_json::to_vec_pretty(&figure).map_err(|e| {
                SalesvizError::WriterError(format!("Failed to serialize figure: {}", e))
            })
        }
    }
}

/// Render the chart and write it to `path`
pub fn export_to_path(
    data: &ChartData,
    format: ExportFormat,
    path: impl AsRef<Path>,
) -> Result<()> {
    let bytes = export_bytes(data, format)?;
    save_export(&bytes, format, path)
}

/// Write a finished export to `path`
pub fn save_export(bytes: &[u8], format: ExportFormat, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, bytes).map_err(|e| {
        SalesvizError::WriterError(format!("Failed to write {}: {}", path.display(), e))
    })?;
    info!("Wrote {} bytes of {} to {}", bytes.len(), format, path.display());
    Ok(())
}
