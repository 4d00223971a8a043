//! Named categorical palettes for region colors
//!
//! Provides lookup functions to expand palette names to explicit colors.

use crate::{Result, SalesvizError};

// =============================================================================
// Categorical Color Palettes
// =============================================================================

/// D3 Category 10 - the plotly default colorway, used by default
pub const CATEGORY10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Tableau 10
pub const TABLEAU10: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f",
    "#edc948", "#b07aa1", "#ff9da7", "#9c755f", "#bab0ac",
];

/// ColorBrewer Set1
pub const SET1: &[&str] = &[
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00",
    "#ffff33", "#a65628", "#f781bf", "#999999",
];

/// ColorBrewer Set2
pub const SET2: &[&str] = &[
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854",
    "#ffd92f", "#e5c494", "#b3b3b3",
];

/// ColorBrewer Dark2
pub const DARK2: &[&str] = &[
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e",
    "#e6ab02", "#a6761d", "#666666",
];

/// ColorBrewer Paired
pub const PAIRED: &[&str] = &[
    "#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99",
    "#e31a1c", "#fdbf6f", "#ff7f00", "#cab2d6", "#6a3d9a",
    "#ffff99", "#b15928",
];

/// Palette names accepted in configuration
pub const PALETTE_NAMES: &[&str] = &["category10", "tableau10", "set1", "set2", "dark2", "paired"];

/// Look up a named palette (case-insensitive)
pub fn lookup_palette(name: &str) -> Option<&'static [&'static str]> {
    match name.to_lowercase().as_str() {
        "category10" | "d3" | "plotly" => Some(CATEGORY10),
        "tableau10" | "tableau" => Some(TABLEAU10),
        "set1" => Some(SET1),
        "set2" => Some(SET2),
        "dark2" => Some(DARK2),
        "paired" => Some(PAIRED),
        _ => None,
    }
}

// =============================================================================
// Color Utilities
// =============================================================================

/// Convert a CSS color name/value to hex format.
/// Supports named colors (e.g., "red"), hex (#FF0000), rgb(), rgba(), hsl(), etc.
pub fn color_to_hex(value: &str) -> Result<String> {
    csscolorparser::parse(value)
        .map(|c| c.to_css_hex())
        .map_err(|e| SalesvizError::ConfigError(format!("Invalid color '{}': {}", value, e)))
}

/// Resolve the palette for a run: explicit colors win over a palette name
pub fn resolve_palette(name: &str, colors: Option<&[String]>) -> Result<Vec<String>> {
    match colors {
        Some([]) => Err(SalesvizError::ConfigError(
            "Custom color list is empty".to_string(),
        )),
        Some(colors) => colors.iter().map(|c| color_to_hex(c)).collect(),
        None => lookup_palette(name)
            .map(|palette| palette.iter().map(|c| c.to_string()).collect())
            .ok_or_else(|| {
                SalesvizError::ConfigError(format!(
                    "Unknown palette '{}'. Available palettes: {}",
                    name,
                    PALETTE_NAMES.join(", ")
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_are_valid_hex() {
        for name in PALETTE_NAMES {
            let palette = lookup_palette(name).unwrap();
            for color in palette {
                assert_eq!(color_to_hex(color).unwrap(), *color, "{} in {}", color, name);
            }
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup_palette("Category10"), Some(CATEGORY10));
        assert_eq!(lookup_palette("plotly"), Some(CATEGORY10));
        assert!(lookup_palette("rainbow").is_none());
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(color_to_hex("red").unwrap(), "#ff0000");
        assert_eq!(color_to_hex("rgb(0, 128, 255)").unwrap(), "#0080ff");
        assert!(color_to_hex("not-a-color").is_err());
    }

    #[test]
    fn test_resolve_palette() {
        let named = resolve_palette("set1", None).unwrap();
        assert_eq!(named.len(), SET1.len());

        let custom = resolve_palette("ignored", Some(&["red".to_string(), "#00f".to_string()]))
            .unwrap();
        assert_eq!(custom, vec!["#ff0000", "#0000ff"]);

        assert!(resolve_palette("set1", Some(&[])).is_err());
        let err = resolve_palette("rainbow", None).unwrap_err();
        assert!(err.to_string().contains("category10"));
    }
}
