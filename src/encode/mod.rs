//! Visual encoding of aggregated points
//!
//! Derives the two visual channels the chart needs from each
//! `AggregatedPoint`: a marker size (from order quantity, per `SizePolicy`)
//! and a color token (from region, per a categorical palette).

mod color;
pub mod palettes;
mod size;

pub use color::ColorAssigner;
pub use size::SizePolicy;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregatedPoint;
use crate::Result;

fn default_palette() -> String {
    "category10".to_string()
}

/// Encoding settings (`[encoding]` manifest section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Marker size policy
    pub size: SizePolicy,
    /// Named palette used when `colors` is not set
    pub palette: String,
    /// Explicit color list (any CSS color syntax)
    pub colors: Option<Vec<String>>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            size: SizePolicy::default(),
            palette: default_palette(),
            colors: None,
        }
    }
}

impl EncodingConfig {
    pub fn validate(&self) -> Result<()> {
        self.size.validate()?;
        palettes::resolve_palette(&self.palette, self.colors.as_deref())?;
        Ok(())
    }
}

/// An aggregated point with its marker size and color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPoint {
    #[serde(flatten)]
    pub point: AggregatedPoint,
    pub marker_size: f64,
    /// Hex color token
    pub color: String,
}

/// Compute marker size and color for every point
///
/// Colors are assigned to regions in the order they first appear in
/// `points`; since the aggregator sorts its output, the same input always
/// yields the same assignment.
pub fn encode(points: &[AggregatedPoint], config: &EncodingConfig) -> Result<Vec<EncodedPoint>> {
    let palette = palettes::resolve_palette(&config.palette, config.colors.as_deref())?;
    let mut colors = ColorAssigner::new(palette)?;

    let quantities: Vec<i64> = points.iter().map(|p| p.order_quantity).collect();
    let sizes = config.size.scale(&quantities);

    Ok(points
        .iter()
        .zip(sizes)
        .map(|(point, marker_size)| EncodedPoint {
            color: colors.color_for(point.region.as_deref()).to_string(),
            point: point.clone(),
            marker_size,
        })
        .collect())
}
