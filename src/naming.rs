//! Column names shared by every pipeline stage
//!
//! After key normalization all four tables speak this vocabulary, so the
//! join and aggregation stages never need to know the source file headers.

/// Customer join key (renamed from the customer lookup's natural key)
pub const CUSTOMER_KEY: &str = "CustomerKey";

/// Territory join key (renamed from the territory lookup's natural key)
pub const TERRITORY_KEY: &str = "TerritoryKey";

/// Product join key
pub const PRODUCT_KEY: &str = "ProductKey";

/// Units ordered on a sales line
pub const ORDER_QUANTITY: &str = "OrderQuantity";

/// Product display name from the product lookup
pub const PRODUCT_NAME: &str = "ProductName";

/// Sales region from the territory lookup
pub const REGION: &str = "Region";

/// Label shown for a product or region that did not match a lookup row
pub const MISSING_LABEL: &str = "(missing)";

/// Internal marker column added to a dimension before joining.
///
/// A null marker after the left join means the sales row found no match.
pub fn match_marker(dimension: &str) -> String {
    format!("__salesviz_{}_matched__", dimension)
}

/// Display label for a nullable dimension attribute
pub fn display_label(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING_LABEL)
}
