//! Region → color assignment

use std::collections::HashMap;

use crate::{Result, SalesvizError};

/// Assigns palette colors to regions in first-seen order
///
/// The first distinct region gets the first palette color, the second gets
/// the second, and so on, wrapping around when there are more regions than
/// colors. A null region is a region of its own.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette: Vec<String>,
    assigned: HashMap<Option<String>, usize>,
    order: Vec<Option<String>>,
}

impl ColorAssigner {
    pub fn new(palette: Vec<String>) -> Result<Self> {
        if palette.is_empty() {
            return Err(SalesvizError::ConfigError(
                "A color palette needs at least one color".to_string(),
            ));
        }
        Ok(Self {
            palette,
            assigned: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Color for `region`, assigning the next palette entry on first sight
    pub fn color_for(&mut self, region: Option<&str>) -> &str {
        let key = region.map(str::to_string);
        let next = self.assigned.len();
        let index = *self.assigned.entry(key.clone()).or_insert_with(|| {
            self.order.push(key);
            next
        });
        &self.palette[index % self.palette.len()]
    }

    /// Regions in the order they were first seen
    pub fn regions(&self) -> &[Option<String>] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Vec<String> {
        vec!["#111111".to_string(), "#222222".to_string()]
    }

    #[test]
    fn test_first_seen_order() {
        let mut colors = ColorAssigner::new(palette()).unwrap();
        assert_eq!(colors.color_for(Some("West")), "#111111");
        assert_eq!(colors.color_for(Some("East")), "#222222");
        assert_eq!(colors.color_for(Some("West")), "#111111");
        assert_eq!(
            colors.regions(),
            &[Some("West".to_string()), Some("East".to_string())]
        );
    }

    #[test]
    fn test_palette_wraps() {
        let mut colors = ColorAssigner::new(palette()).unwrap();
        colors.color_for(Some("A"));
        colors.color_for(Some("B"));
        assert_eq!(colors.color_for(Some("C")), "#111111");
        assert_eq!(colors.color_for(Some("B")), "#222222");
    }

    #[test]
    fn test_empty_palette_is_rejected() {
        assert!(ColorAssigner::new(Vec::new()).is_err());
    }

    #[test]
    fn test_null_region_is_distinct() {
        let mut colors = ColorAssigner::new(palette()).unwrap();
        assert_eq!(colors.color_for(None), "#111111");
        assert_eq!(colors.color_for(Some("")), "#222222");
        assert_eq!(colors.color_for(None), "#111111");
    }
}
