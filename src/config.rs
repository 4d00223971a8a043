//! Pipeline configuration
//!
//! A `PipelineConfig` is loaded from a TOML manifest; every section and
//! field has a default, so an empty manifest describes the AdventureWorks
//! layout the tool was built for:
//!
//! ```toml
//! [sources]
//! sales = ["files/sales_2021.csv", "files/sales_2022.csv"]
//! customers = "files/AdventureWorks Customer Lookup.csv"
//! territories = "files/AdventureWorks Territory Lookup.csv"
//! products = "files/AdventureWorks Product Lookup.csv"
//! customer_encoding = "latin1"
//!
//! [keys]
//! customer_source = "CustomerID"
//! territory_source = "SalesTerritoryKey"
//!
//! [aggregate]
//! null_groups = "retain"
//!
//! [encoding]
//! size = { policy = "linear", divisor = 50.0 }
//! palette = "category10"
//!
//! [chart]
//! title = "3D Sales Volume: Product vs Region"
//! ```
//!
//! Relative paths in a manifest resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::NullGroupPolicy;
use crate::encode::EncodingConfig;
use crate::reader::{ReadOptions, TextEncoding};
use crate::{Result, SalesvizError};

/// Input files (`[sources]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Yearly sales extracts, concatenated in this order
    pub sales: Vec<PathBuf>,
    pub customers: PathBuf,
    pub territories: PathBuf,
    pub products: PathBuf,
    /// Encoding of the customer lookup; the other tables are always UTF-8
    pub customer_encoding: TextEncoding,
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sales: vec![
                PathBuf::from("files/sales_2021.csv"),
                PathBuf::from("files/sales_2022.csv"),
            ],
            customers: PathBuf::from("files/AdventureWorks Customer Lookup.csv"),
            territories: PathBuf::from("files/AdventureWorks Territory Lookup.csv"),
            products: PathBuf::from("files/AdventureWorks Product Lookup.csv"),
            customer_encoding: TextEncoding::Latin1,
            delimiter: ',',
        }
    }
}

impl SourceConfig {
    /// Options for the UTF-8 tables (sales, territories, products)
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::new(TextEncoding::Utf8).with_delimiter(self.delimiter as u8)
    }

    /// Options for the customer lookup
    pub fn customer_read_options(&self) -> ReadOptions {
        ReadOptions::new(self.customer_encoding).with_delimiter(self.delimiter as u8)
    }

    /// File names of every input in the order they are read: sales extracts,
    /// then products, territories and customers (for the chart subtitle)
    pub fn file_names(&self) -> Vec<String> {
        self.sales
            .iter()
            .chain([&self.products, &self.territories, &self.customers])
            .map(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect()
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.sales.iter_mut().for_each(resolve);
        resolve(&mut self.customers);
        resolve(&mut self.territories);
        resolve(&mut self.products);
    }
}

/// Natural key column names in the lookup files (`[keys]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Customer lookup column renamed to `CustomerKey`
    pub customer_source: String,
    /// Territory lookup column renamed to `TerritoryKey`
    pub territory_source: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            customer_source: "CustomerID".to_string(),
            territory_source: "SalesTerritoryKey".to_string(),
        }
    }
}

/// Aggregation settings (`[aggregate]`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub null_groups: NullGroupPolicy,
}

/// Chart presentation (`[chart]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    /// List the input file names under the title
    pub show_sources: bool,
    pub opacity: f64,
    /// Camera eye position (x, y, z)
    pub camera_eye: [f64; 3],
    pub x_title: String,
    pub y_title: String,
    pub z_title: String,
    /// Tick label angle in degrees for the product and region axes
    pub tick_angle: f64,
    pub tick_font_size: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "3D Sales Volume: Product vs Region".to_string(),
            show_sources: true,
            opacity: 0.8,
            camera_eye: [2.0, 2.0, 1.0],
            x_title: "Product".to_string(),
            y_title: "Region".to_string(),
            z_title: "Order Quantity".to_string(),
            tick_angle: 30.0,
            tick_font_size: 10.0,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: SourceConfig,
    pub keys: KeyConfig,
    pub aggregate: AggregateConfig,
    pub encoding: EncodingConfig,
    pub chart: ChartConfig,
}

impl PipelineConfig {
    /// Parse a TOML manifest; paths are kept as written
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml_edit::de::from_str(text)
            .map_err(|e| SalesvizError::ConfigError(format!("Invalid manifest: {}", e)))
    }

    /// Load a TOML manifest, resolving relative paths against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SalesvizError::MissingInput(format!("{}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.sources.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Check everything that can be checked without touching the inputs
    pub fn validate(&self) -> Result<()> {
        if self.sources.sales.is_empty() {
            return Err(SalesvizError::ConfigError(
                "At least one sales extract is required".to_string(),
            ));
        }
        if !self.sources.delimiter.is_ascii() {
            return Err(SalesvizError::ConfigError(format!(
                "Delimiter '{}' must be a single ASCII character",
                self.sources.delimiter
            )));
        }
        if self.keys.customer_source.is_empty() || self.keys.territory_source.is_empty() {
            return Err(SalesvizError::ConfigError(
                "Key column names must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.chart.opacity) {
            return Err(SalesvizError::ConfigError(format!(
                "Chart opacity must be between 0 and 1, got {}",
                self.chart.opacity
            )));
        }
        self.encoding.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::SizePolicy;
    use std::io::Write;

    #[test]
    fn test_empty_manifest_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sources.sales.len(), 2);
        assert_eq!(config.sources.customer_encoding, TextEncoding::Latin1);
        assert_eq!(config.keys.territory_source, "SalesTerritoryKey");
        assert_eq!(config.encoding.size, SizePolicy::Linear { divisor: 50.0 });
        assert_eq!(config.chart.camera_eye, [2.0, 2.0, 1.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_manifest() {
        let config = PipelineConfig::from_toml_str(
            r##"
            [sources]
            sales = ["2021.csv", "2022.csv", "2023.csv"]
            customers = "customers.csv"
            customer_encoding = "utf8"
            delimiter = ";"

            [keys]
            customer_source = "CustomerKey"

            [aggregate]
            null_groups = "drop"

            [encoding]
            size = { policy = "minmax", min_size = 3.0, max_size = 18.0 }
            colors = ["#112233", "teal"]

            [chart]
            title = "Units by product"
            show_sources = false
            "##,
        )
        .unwrap();

        assert_eq!(config.sources.sales.len(), 3);
        assert_eq!(config.sources.customer_encoding, TextEncoding::Utf8);
        assert_eq!(config.sources.read_options().delimiter, b';');
        // Unset fields keep their defaults
        assert_eq!(config.keys.territory_source, "SalesTerritoryKey");
        assert_eq!(config.aggregate.null_groups, NullGroupPolicy::Drop);
        assert_eq!(
            config.encoding.size,
            SizePolicy::MinMax {
                min_size: 3.0,
                max_size: 18.0,
                fallback_size: 12.0
            }
        );
        assert_eq!(config.chart.title, "Units by product");
        assert!(!config.chart.show_sources);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_manifest() {
        let err =
            PipelineConfig::from_toml_str("[aggregate]\nnull_groups = \"maybe\"").unwrap_err();
        assert!(matches!(err, SalesvizError::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.sources.sales.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.chart.opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.encoding.size = SizePolicy::Linear { divisor: -2.0 };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.encoding.colors = Some(vec!["nope".to_string()]);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.sources.delimiter = '§';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("salesviz.toml");
        let mut file = std::fs::File::create(&manifest).unwrap();
        writeln!(file, "[sources]\nsales = [\"data/sales.csv\", \"/abs/sales.csv\"]").unwrap();

        let config = PipelineConfig::from_file(&manifest).unwrap();
        assert_eq!(config.sources.sales[0], dir.path().join("data/sales.csv"));
        assert_eq!(config.sources.sales[1], PathBuf::from("/abs/sales.csv"));
        assert_eq!(
            config.sources.products,
            dir.path().join("files/AdventureWorks Product Lookup.csv")
        );
    }

    #[test]
    fn test_missing_manifest() {
        let err = PipelineConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SalesvizError::MissingInput(_)));
    }

    #[test]
    fn test_file_names_in_read_order() {
        let names = SourceConfig::default().file_names();
        assert_eq!(
            names,
            vec![
                "sales_2021.csv",
                "sales_2022.csv",
                "AdventureWorks Product Lookup.csv",
                "AdventureWorks Territory Lookup.csv",
                "AdventureWorks Customer Lookup.csv",
            ]
        );
    }
}
