//! The batch pipeline: readers → normalizer → joins → aggregation → encoding
//!
//! Nothing runs until [`Pipeline::run`] is called. Each stage fully
//! materializes its output and hands it by value to the next; no stage reads
//! back from a later one.

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate, AggregatedPoint};
use crate::config::PipelineConfig;
use crate::encode::{encode, EncodedPoint};
use crate::join::{join_dimensions, JoinStats};
use crate::normalize::{
    normalize_customers, normalize_products, normalize_sales, normalize_territories,
    CustomerCleaning,
};
use crate::reader::SourceReader;
use crate::writer::{export_bytes, ChartData, ExportFormat};
use crate::Result;

/// Raw (text-typed) source tables, before key normalization
#[derive(Debug, Clone)]
pub struct SourceFrames {
    /// All yearly extracts, already concatenated
    pub sales: DataFrame,
    pub customers: DataFrame,
    pub territories: DataFrame,
    pub products: DataFrame,
}

/// Counts collected while the pipeline runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub sales_rows: usize,
    pub customers_loaded: usize,
    /// Customer rows dropped for an absent or non-numeric key
    pub customers_discarded: usize,
    pub unmatched_customers: usize,
    pub unmatched_territories: usize,
    pub unmatched_products: usize,
    pub groups: usize,
}

impl PipelineStats {
    fn new(cleaning: CustomerCleaning, join: JoinStats, groups: usize) -> Self {
        Self {
            sales_rows: join.rows,
            customers_loaded: cleaning.loaded,
            customers_discarded: cleaning.discarded,
            unmatched_customers: join.unmatched_customers,
            unmatched_territories: join.unmatched_territories,
            unmatched_products: join.unmatched_products,
            groups,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub aggregated: Vec<AggregatedPoint>,
    pub encoded: Vec<EncodedPoint>,
    pub stats: PipelineStats,
    /// Input file names, sales extracts first then the lookups
    pub sources: Vec<String>,
}

/// A configured, reusable pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and build a pipeline from it
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read every configured source through `reader`
    pub fn load(&self, reader: &dyn SourceReader) -> Result<SourceFrames> {
        let sources = &self.config.sources;
        let options = sources.read_options();

        let frames = SourceFrames {
            sales: reader.read_sales(&sources.sales, &options)?,
            customers: reader.read_table(&sources.customers, &sources.customer_read_options())?,
            territories: reader.read_table(&sources.territories, &options)?,
            products: reader.read_table(&sources.products, &options)?,
        };
        info!(
            "Loaded {} sales rows from {} extract(s), {} customers, {} territories, {} products",
            frames.sales.height(),
            sources.sales.len(),
            frames.customers.height(),
            frames.territories.height(),
            frames.products.height()
        );
        Ok(frames)
    }

    /// Read the sources and run every stage
    pub fn run(&self, reader: &dyn SourceReader) -> Result<PipelineOutput> {
        let frames = self.load(reader)?;
        self.run_frames(frames)
    }

    /// Run every stage on tables that are already in memory
    pub fn run_frames(&self, frames: SourceFrames) -> Result<PipelineOutput> {
        let keys = &self.config.keys;

        let sales = normalize_sales(frames.sales)?;
        let (customers, cleaning) = normalize_customers(frames.customers, &keys.customer_source)?;
        let territories = normalize_territories(frames.territories, &keys.territory_source)?;
        let products = normalize_products(frames.products)?;
        info!(
            "Discarded {} of {} customer rows with unusable keys",
            cleaning.discarded, cleaning.loaded
        );

        let (merged, join_stats) = join_dimensions(sales, customers, territories, products)?;
        let aggregated = aggregate(&merged, self.config.aggregate.null_groups)?;
        let encoded = encode(&aggregated, &self.config.encoding)?;

        let stats = PipelineStats::new(cleaning, join_stats, aggregated.len());
        Ok(PipelineOutput {
            aggregated,
            encoded,
            stats,
            sources: self.config.sources.file_names(),
        })
    }

    /// Chart input for the export adapters
    pub fn chart_data<'a>(&'a self, output: &'a PipelineOutput) -> ChartData<'a> {
        ChartData {
            points: &output.encoded,
            chart: &self.config.chart,
            sources: &output.sources,
        }
    }

    /// Render a finished run to export bytes
    pub fn render(&self, output: &PipelineOutput, format: ExportFormat) -> Result<Vec<u8>> {
        export_bytes(&self.chart_data(output), format)
    }
}
