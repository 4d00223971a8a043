/*!
salesviz Command Line Interface

Runs the sales volume pipeline against files on disk (or the built-in sample
dataset) and writes the 3D scatter export.

## Usage

```bash
salesviz render --config salesviz.toml --output chart.html
salesviz render --config salesviz.toml --plotly-js plotly.min.js -o chart.html
salesviz points --sales 2021.csv --sales 2022.csv --format table
salesviz sample --format json
salesviz check-config salesviz.toml
```
*/

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salesviz::encode::EncodedPoint;
use salesviz::naming::display_label;
use salesviz::reader::{CsvSourceReader, SourceReader, TextEncoding};
use salesviz::writer::{export_bytes_with, save_export, ExportFormat, HtmlWriter};
use salesviz::{NullGroupPolicy, Pipeline, PipelineConfig, PipelineOutput, SizePolicy, VERSION};

#[derive(Parser)]
#[command(name = "salesviz")]
#[command(about = "Order volume by product and sales region, as a 3D scatter")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline and export the chart
    Render {
        #[command(flatten)]
        run: RunArgs,

        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Html)]
        format: ExportFormat,

        /// Output file path (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Inline this local plotly.js into HTML output instead of loading the CDN copy
        #[arg(long, value_name = "PATH")]
        plotly_js: Option<PathBuf>,
    },

    /// Run the pipeline and print the encoded points
    Points {
        #[command(flatten)]
        run: RunArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = PointsFormat::Table)]
        format: PointsFormat,
    },

    /// Render the built-in sample dataset
    #[cfg(feature = "builtin-data")]
    Sample {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Html)]
        format: ExportFormat,

        /// Output file path (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Inline this local plotly.js into HTML output instead of loading the CDN copy
        #[arg(long, value_name = "PATH")]
        plotly_js: Option<PathBuf>,
    },

    /// Validate a manifest without reading any data
    CheckConfig {
        /// Path to a TOML manifest
        manifest: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PointsFormat {
    Table,
    Json,
}

/// Pipeline inputs; flags override the manifest
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML manifest
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Yearly sales extract (repeat for several years, in order)
    #[arg(long)]
    sales: Vec<PathBuf>,

    /// Customer lookup file
    #[arg(long)]
    customers: Option<PathBuf>,

    /// Territory lookup file
    #[arg(long)]
    territories: Option<PathBuf>,

    /// Product lookup file
    #[arg(long)]
    products: Option<PathBuf>,

    /// Encoding of the customer lookup
    #[arg(long, value_enum)]
    customer_encoding: Option<TextEncoding>,

    /// Field delimiter for every input file
    #[arg(long)]
    delimiter: Option<char>,

    /// What to do with groups whose product or region is unmatched
    #[arg(long, value_enum)]
    null_groups: Option<NullGroupPolicy>,

    /// Scale marker sizes linearly: size = quantity / DIVISOR
    #[arg(long, conflicts_with = "min_max")]
    divisor: Option<f64>,

    /// Scale marker sizes onto MIN..MAX (e.g. 4..30)
    #[arg(long, value_name = "MIN..MAX", value_parser = parse_size_range)]
    min_max: Option<(f64, f64)>,

    /// Named color palette
    #[arg(long)]
    palette: Option<String>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        let sources = &mut config.sources;
        if !self.sales.is_empty() {
            sources.sales = self.sales;
        }
        if let Some(path) = self.customers {
            sources.customers = path;
        }
        if let Some(path) = self.territories {
            sources.territories = path;
        }
        if let Some(path) = self.products {
            sources.products = path;
        }
        if let Some(encoding) = self.customer_encoding {
            sources.customer_encoding = encoding;
        }
        if let Some(delimiter) = self.delimiter {
            sources.delimiter = delimiter;
        }
        if let Some(policy) = self.null_groups {
            config.aggregate.null_groups = policy;
        }
        if let Some(divisor) = self.divisor {
            config.encoding.size = SizePolicy::Linear { divisor };
        }
        if let Some((min_size, max_size)) = self.min_max {
            config.encoding.size = SizePolicy::min_max(min_size, max_size);
        }
        if let Some(palette) = self.palette {
            config.encoding.palette = palette;
            config.encoding.colors = None;
        }
        if let Some(title) = self.title {
            config.chart.title = title;
        }
        Ok(config)
    }
}

fn parse_size_range(s: &str) -> Result<(f64, f64), String> {
    let (min, max) = s
        .split_once("..")
        .ok_or_else(|| format!("expected MIN..MAX, got '{}'", s))?;
    let min: f64 = min.trim().parse().map_err(|e| format!("bad minimum: {}", e))?;
    let max: f64 = max.trim().parse().map_err(|e| format!("bad maximum: {}", e))?;
    Ok((min, max))
}

fn run_pipeline(
    config: PipelineConfig,
    reader: &dyn SourceReader,
) -> anyhow::Result<(Pipeline, PipelineOutput)> {
    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(reader)?;
    let stats = &output.stats;
    info!(
        "{} sales rows -> {} groups ({} customers discarded; unmatched: {} customers, {} territories, {} products)",
        stats.sales_rows,
        stats.groups,
        stats.customers_discarded,
        stats.unmatched_customers,
        stats.unmatched_territories,
        stats.unmatched_products
    );
    Ok((pipeline, output))
}

fn html_writer(plotly_js: Option<&Path>) -> anyhow::Result<HtmlWriter> {
    let writer = HtmlWriter::new();
    Ok(match plotly_js {
        Some(path) => writer.with_inline_plotly(path)?,
        None => writer,
    })
}

fn write_export(
    pipeline: &Pipeline,
    output: &PipelineOutput,
    format: ExportFormat,
    path: Option<PathBuf>,
    plotly_js: Option<PathBuf>,
) -> anyhow::Result<()> {
    let html = html_writer(plotly_js.as_deref())?;
    let bytes = export_bytes_with(&pipeline.chart_data(output), format, &html)?;
    match path {
        Some(path) => save_export(&bytes, format, &path)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

/// Display width of a table column: the widest cell or the header, in chars
fn column_width<'a>(header: &'a str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .chain([header])
        .map(|cell| cell.chars().count())
        .max()
        .unwrap_or_default()
}

fn print_points(points: &[EncodedPoint], format: PointsFormat) -> anyhow::Result<()> {
    match format {
        PointsFormat::Json => {
            println!("{}", serde_json::to_string_pretty(points)?);
        }
        PointsFormat::Table => {
            let product_width = column_width(
                "ProductName",
                points.iter().map(|p| display_label(p.point.product_name.as_deref())),
            );
            let region_width = column_width(
                "Region",
                points.iter().map(|p| display_label(p.point.region.as_deref())),
            );

            println!(
                "{:<pw$}  {:<rw$}  {:>13}  {:>10}  {}",
                "ProductName",
                "Region",
                "OrderQuantity",
                "MarkerSize",
                "Color",
                pw = product_width,
                rw = region_width
            );
            for p in points {
                println!(
                    "{:<pw$}  {:<rw$}  {:>13}  {:>10.3}  {}",
                    display_label(p.point.product_name.as_deref()),
                    display_label(p.point.region.as_deref()),
                    p.point.order_quantity,
                    p.marker_size,
                    p.color,
                    pw = product_width,
                    rw = region_width
                );
            }
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Render {
            run,
            format,
            output,
            plotly_js,
        } => {
            let (pipeline, result) = run_pipeline(run.into_config()?, &CsvSourceReader::new())?;
            write_export(&pipeline, &result, format, output, plotly_js)?;
        }
        Commands::Points { run, format } => {
            let (_, result) = run_pipeline(run.into_config()?, &CsvSourceReader::new())?;
            print_points(&result.encoded, format)?;
        }
        #[cfg(feature = "builtin-data")]
        Commands::Sample {
            format,
            output,
            plotly_js,
        } => {
            use salesviz::reader::{data::sample_sources, BuiltinReader};

            let config = PipelineConfig {
                sources: sample_sources(),
                ..Default::default()
            };
            let (pipeline, result) = run_pipeline(config, &BuiltinReader::new())?;
            write_export(&pipeline, &result, format, output, plotly_js)?;
        }
        Commands::CheckConfig { manifest } => {
            let config = PipelineConfig::from_file(&manifest)?;
            config.validate()?;
            println!("{}: ok", manifest.display());
            println!("  sales extracts: {}", config.sources.sales.len());
            println!("  customer encoding: {}", config.sources.customer_encoding);
            println!("  size policy: {}", config.encoding.size);
            let palette = match &config.encoding.colors {
                Some(colors) => format!("{} custom colors", colors.len()),
                None => config.encoding.palette.clone(),
            };
            println!("  palette: {}", palette);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salesviz=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "salesviz",
            "points",
            "--sales",
            "a.csv",
            "--sales",
            "b.csv",
            "--customer-encoding",
            "utf8",
            "--null-groups",
            "drop",
            "--min-max",
            "2..20",
            "--title",
            "Units",
        ])
        .unwrap();

        let Commands::Points { run, .. } = cli.command else {
            panic!("expected points");
        };
        let config = run.into_config().unwrap();
        assert_eq!(config.sources.sales, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
        assert_eq!(config.sources.customer_encoding, TextEncoding::Utf8);
        assert_eq!(config.aggregate.null_groups, NullGroupPolicy::Drop);
        assert_eq!(config.encoding.size, SizePolicy::min_max(2.0, 20.0));
        assert_eq!(config.chart.title, "Units");
        // Untouched values keep their defaults
        assert_eq!(config.keys.customer_source, "CustomerID");
    }

    #[test]
    fn test_divisor_conflicts_with_min_max() {
        let result = Cli::try_parse_from([
            "salesviz", "render", "--divisor", "10", "--min-max", "1..2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_size_range() {
        assert_eq!(parse_size_range("4..30").unwrap(), (4.0, 30.0));
        assert_eq!(parse_size_range(" 1.5 .. 9 ").unwrap(), (1.5, 9.0));
        assert!(parse_size_range("4-30").is_err());
        assert!(parse_size_range("a..b").is_err());
    }

    #[test]
    fn test_column_width_counts_chars() {
        // "Renée" is six bytes but five columns wide
        assert_eq!(column_width("Name", ["Renée", "Bob"].into_iter()), 5);
        assert_eq!(column_width("ProductName", ["José"].into_iter()), 11);
        assert_eq!(column_width("Region", std::iter::empty()), 6);
    }

    #[test]
    fn test_plotly_js_flag() {
        let dir = tempfile::tempdir().unwrap();
        let js = dir.path().join("plotly.min.js");
        std::fs::write(&js, "window.Plotly = {};").unwrap();

        let cli = Cli::try_parse_from([
            "salesviz",
            "render",
            "--plotly-js",
            js.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Render { plotly_js, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(plotly_js.as_deref(), Some(js.as_path()));
        assert!(html_writer(plotly_js.as_deref()).is_ok());
        assert!(html_writer(Some(&dir.path().join("missing.js"))).is_err());
    }

    #[test]
    fn test_manifest_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("salesviz.toml");
        std::fs::write(
            &manifest,
            "[encoding]\npalette = \"set2\"\n[chart]\ntitle = \"From manifest\"\n",
        )
        .unwrap();

        let run = RunArgs {
            config: Some(manifest),
            title: Some("From flag".to_string()),
            ..Default::default()
        };
        let config = run.into_config().unwrap();
        assert_eq!(config.encoding.palette, "set2");
        assert_eq!(config.chart.title, "From flag");
    }
}
