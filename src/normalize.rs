//! Join-key normalization
//!
//! Brings the four source tables onto a shared key vocabulary and types the
//! keys as `Int64`:
//!
//! - the territory lookup's natural key is renamed to `TerritoryKey`
//! - the customer lookup's natural key is renamed to `CustomerKey`, and
//!   rows whose key is absent or not made entirely of decimal digits are
//!   dropped before any join can see them
//! - sales keys and the remaining dimension keys are coerced to integers
//!   (blank = null, anything else non-numeric is a schema error)
//!
//! Dimension tables also lose rows with null keys and keep only the first
//! row per key, so a left join can never multiply sales rows.

use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::naming::{CUSTOMER_KEY, ORDER_QUANTITY, PRODUCT_KEY, PRODUCT_NAME, REGION, TERRITORY_KEY};
use crate::tables::{CustomerTable, ProductTable, SalesTable, TerritoryTable};
use crate::{Result, SalesvizError};

// ============================================================================
// Key predicates
// ============================================================================

/// True when `text` is non-empty and made only of ASCII decimal digits.
///
/// Signs, whitespace, decimal points and prefixes such as `AW000` all fail.
pub fn is_digit_key(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a customer key that passes [`is_digit_key`].
///
/// Returns `None` for absent keys, keys failing the digit check, and digit
/// strings too large for `i64`.
pub fn parse_clean_key(value: Option<&str>) -> Option<i64> {
    value
        .filter(|text| is_digit_key(text))
        .and_then(|text| text.parse::<i64>().ok())
}

/// Outcome of customer key cleaning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CustomerCleaning {
    /// Rows in the customer lookup as read
    pub loaded: usize,
    /// Rows dropped for an absent or non-numeric key
    pub discarded: usize,
    /// Rows dropped because an earlier row already used the same key
    pub duplicates: usize,
}

// ============================================================================
// Column helpers
// ============================================================================

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

fn require_columns(df: &DataFrame, table: &str, names: &[&str]) -> Result<()> {
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !has_column(df, name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SalesvizError::SchemaMismatch(format!(
            "{} table is missing column(s): {}",
            table,
            missing.join(", ")
        )))
    }
}

/// Render a column as text, whatever its current type
fn column_as_text(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Rename a table's natural key column to the shared join key name
pub fn rename_key_column(df: &mut DataFrame, table: &str, from: &str, to: &str) -> Result<()> {
    if from == to {
        return require_columns(df, table, &[to]);
    }
    if !has_column(df, from) {
        return Err(SalesvizError::SchemaMismatch(format!(
            "{} table has no '{}' column to rename to '{}'",
            table, from, to
        )));
    }
    if has_column(df, to) {
        return Err(SalesvizError::SchemaMismatch(format!(
            "{} table already has a '{}' column besides '{}'",
            table, to, from
        )));
    }
    df.rename(from, to.into())?;
    Ok(())
}

/// Coerce a key column to nullable `Int64`
///
/// Blank and absent values become null; any other non-integer text is a
/// schema error naming the first offending row.
pub fn coerce_key(df: &mut DataFrame, table: &str, name: &str) -> Result<()> {
    let values = column_as_text(df, name)?;
    let parsed = values
        .iter()
        .enumerate()
        .map(|(row, value)| match value.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => text.parse::<i64>().map(Some).map_err(|_| {
                SalesvizError::SchemaMismatch(format!(
                    "{} column '{}' has non-integer value '{}' on row {}",
                    table,
                    name,
                    text,
                    row + 1
                ))
            }),
        })
        .collect::<Result<Vec<Option<i64>>>>()?;

    df.with_column(Series::new(name.into(), parsed))?;
    Ok(())
}

/// Coerce `OrderQuantity` to a non-null, non-negative `Int64`
fn coerce_quantity(df: &mut DataFrame) -> Result<()> {
    let values = column_as_text(df, ORDER_QUANTITY)?;
    let parsed = values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let text = value.as_deref().map(str::trim).unwrap_or_default();
            match text.parse::<i64>() {
                Ok(quantity) if quantity >= 0 => Ok(quantity),
                _ => Err(SalesvizError::SchemaMismatch(format!(
                    "sales column '{}' needs a non-negative integer on row {}, found '{}'",
                    ORDER_QUANTITY,
                    row + 1,
                    text
                ))),
            }
        })
        .collect::<Result<Vec<i64>>>()?;

    df.with_column(Series::new(ORDER_QUANTITY.into(), parsed))?;
    Ok(())
}

/// Drop null keys and keep the first row per key
///
/// Returns the filtered frame and the number of duplicate rows removed.
fn dedupe_dimension(df: DataFrame, table: &str, key: &str) -> Result<(DataFrame, usize)> {
    let keys = df.column(key)?.as_materialized_series().i64()?.clone();
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mask: Vec<bool> = keys
        .into_iter()
        .map(|k| match k {
            Some(k) if seen.insert(k) => true,
            Some(_) => {
                duplicates += 1;
                false
            }
            None => false,
        })
        .collect();

    if duplicates > 0 {
        warn!(
            "{} table repeats {} {} value(s); keeping the first row for each",
            table, duplicates, key
        );
    }

    let filtered = df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?;
    Ok((filtered, duplicates))
}

// ============================================================================
// Per-table normalization
// ============================================================================

/// Type the sales keys and order quantity
pub fn normalize_sales(mut sales: DataFrame) -> Result<SalesTable> {
    require_columns(
        &sales,
        "sales",
        &[ORDER_QUANTITY, CUSTOMER_KEY, TERRITORY_KEY, PRODUCT_KEY],
    )?;
    for key in [CUSTOMER_KEY, TERRITORY_KEY, PRODUCT_KEY] {
        coerce_key(&mut sales, "sales", key)?;
    }
    coerce_quantity(&mut sales)?;
    debug!("Normalized {} sales rows", sales.height());
    Ok(SalesTable::new(sales))
}

/// Rename, clean and type the customer lookup
///
/// A row survives only if its key, rendered as text, passes
/// [`is_digit_key`]. Rejected rows are counted, never joined.
pub fn normalize_customers(
    mut customers: DataFrame,
    source_key: &str,
) -> Result<(CustomerTable, CustomerCleaning)> {
    rename_key_column(&mut customers, "customer", source_key, CUSTOMER_KEY)?;

    let loaded = customers.height();
    let parsed: Vec<Option<i64>> = column_as_text(&customers, CUSTOMER_KEY)?
        .iter()
        .map(|v| parse_clean_key(v.as_deref()))
        .collect();
    let discarded = parsed.iter().filter(|k| k.is_none()).count();

    customers.with_column(Series::new(CUSTOMER_KEY.into(), parsed))?;
    let (customers, duplicates) = dedupe_dimension(customers, "customer", CUSTOMER_KEY)?;

    debug!(
        "Customer lookup: {} rows loaded, {} dirty keys discarded",
        loaded, discarded
    );
    Ok((
        CustomerTable::new(customers),
        CustomerCleaning {
            loaded,
            discarded,
            duplicates,
        },
    ))
}

/// Rename and type the territory lookup
pub fn normalize_territories(
    mut territories: DataFrame,
    source_key: &str,
) -> Result<TerritoryTable> {
    rename_key_column(&mut territories, "territory", source_key, TERRITORY_KEY)?;
    require_columns(&territories, "territory", &[REGION])?;
    coerce_key(&mut territories, "territory", TERRITORY_KEY)?;
    let (territories, _) = dedupe_dimension(territories, "territory", TERRITORY_KEY)?;
    Ok(TerritoryTable::new(territories))
}

/// Type the product lookup
pub fn normalize_products(mut products: DataFrame) -> Result<ProductTable> {
    require_columns(&products, "product", &[PRODUCT_KEY, PRODUCT_NAME])?;
    coerce_key(&mut products, "product", PRODUCT_KEY)?;
    let (products, _) = dedupe_dimension(products, "product", PRODUCT_KEY)?;
    Ok(ProductTable::new(products))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_is_digit_key() {
        assert!(is_digit_key("11000"));
        assert!(is_digit_key("007"));
        assert!(!is_digit_key(""));
        assert!(!is_digit_key("12a"));
        assert!(!is_digit_key("AW00011000"));
        assert!(!is_digit_key("-5"));
        assert!(!is_digit_key(" 12"));
        assert!(!is_digit_key("12.0"));
        // Non-ASCII digits are not decimal key digits
        assert!(!is_digit_key("١٢"));
    }

    #[test]
    fn test_parse_clean_key() {
        assert_eq!(parse_clean_key(Some("11000")), Some(11000));
        assert_eq!(parse_clean_key(Some("007")), Some(7));
        assert_eq!(parse_clean_key(Some("12a")), None);
        assert_eq!(parse_clean_key(None), None);
        assert_eq!(parse_clean_key(Some("99999999999999999999999")), None);
    }

    #[test]
    fn test_rename_key_column() {
        let mut df = df! {
            "SalesTerritoryKey" => &["1"],
            "Region" => &["Northwest"],
        }
        .unwrap();
        rename_key_column(&mut df, "territory", "SalesTerritoryKey", TERRITORY_KEY).unwrap();
        assert!(df.column(TERRITORY_KEY).is_ok());
        assert!(df.column("SalesTerritoryKey").is_err());
    }

    #[test]
    fn test_rename_missing_column_is_schema_mismatch() {
        let mut df = df! { "Region" => &["Northwest"] }.unwrap();
        let err = rename_key_column(&mut df, "territory", "SalesTerritoryKey", TERRITORY_KEY)
            .unwrap_err();
        assert!(matches!(err, SalesvizError::SchemaMismatch(_)));
        assert!(err.to_string().contains("SalesTerritoryKey"));
    }

    #[test]
    fn test_rename_same_name_is_noop() {
        let mut df = df! { "CustomerKey" => &["1"] }.unwrap();
        rename_key_column(&mut df, "customer", CUSTOMER_KEY, CUSTOMER_KEY).unwrap();
        assert!(df.column(CUSTOMER_KEY).is_ok());
    }

    #[test]
    fn test_customers_drop_dirty_keys() {
        let customers = df! {
            "CustomerID" => &[Some("11000"), Some("12a"), None, Some("AW00011002"), Some("11003")],
            "FirstName" => &["Jon", "Bad", "Blank", "Legacy", "Christy"],
        }
        .unwrap();

        let (table, cleaning) = normalize_customers(customers, "CustomerID").unwrap();

        assert_eq!(
            cleaning,
            CustomerCleaning {
                loaded: 5,
                discarded: 3,
                duplicates: 0
            }
        );
        assert_eq!(table.height(), 2);
        assert_eq!(
            int_values(table.frame(), CUSTOMER_KEY),
            vec![Some(11000), Some(11003)]
        );
        assert_eq!(
            table.frame().column(CUSTOMER_KEY).unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn test_customers_with_numeric_source_column() {
        let customers = df! {
            "CustomerID" => &[11000i64, -4, 11001],
        }
        .unwrap();
        let (table, cleaning) = normalize_customers(customers, "CustomerID").unwrap();
        assert_eq!(cleaning.discarded, 1);
        assert_eq!(
            int_values(table.frame(), CUSTOMER_KEY),
            vec![Some(11000), Some(11001)]
        );
    }

    #[test]
    fn test_duplicate_dimension_keys_keep_first() {
        let products = df! {
            "ProductKey" => &["214", "214", "310"],
            "ProductName" => &["Helmet", "Helmet (old)", "Road-150"],
        }
        .unwrap();
        let table = normalize_products(products).unwrap();
        assert_eq!(table.height(), 2);
        let names: Vec<Option<&str>> = table
            .frame()
            .column(PRODUCT_NAME)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec![Some("Helmet"), Some("Road-150")]);
    }

    #[test]
    fn test_sales_keys_are_typed() {
        let sales = df! {
            "OrderNumber" => &["SO1", "SO2"],
            "ProductKey" => &["214", "310"],
            "CustomerKey" => &[Some("11000"), None],
            "TerritoryKey" => &["1", " 4 "],
            "OrderQuantity" => &["1", "3"],
        }
        .unwrap();

        let table = normalize_sales(sales).unwrap();
        let df = table.frame();
        assert_eq!(int_values(df, CUSTOMER_KEY), vec![Some(11000), None]);
        assert_eq!(int_values(df, TERRITORY_KEY), vec![Some(1), Some(4)]);
        assert_eq!(int_values(df, ORDER_QUANTITY), vec![Some(1), Some(3)]);
        // Passthrough columns stay as text
        assert_eq!(df.column("OrderNumber").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_sales_reject_bad_quantity() {
        for bad in ["-1", "", "two"] {
            let sales = df! {
                "ProductKey" => &["214"],
                "CustomerKey" => &["11000"],
                "TerritoryKey" => &["1"],
                "OrderQuantity" => &[bad],
            }
            .unwrap();
            let err = normalize_sales(sales).unwrap_err();
            assert!(matches!(err, SalesvizError::SchemaMismatch(_)), "{}", bad);
        }
    }

    #[test]
    fn test_sales_reject_non_integer_key() {
        let sales = df! {
            "ProductKey" => &["BK-R89B-44"],
            "CustomerKey" => &["11000"],
            "TerritoryKey" => &["1"],
            "OrderQuantity" => &["1"],
        }
        .unwrap();
        let err = normalize_sales(sales).unwrap_err();
        assert!(err.to_string().contains("BK-R89B-44"));
    }

    #[test]
    fn test_sales_missing_column() {
        let sales = df! {
            "ProductKey" => &["214"],
            "OrderQuantity" => &["1"],
        }
        .unwrap();
        let err = normalize_sales(sales).unwrap_err();
        assert!(matches!(err, SalesvizError::SchemaMismatch(_)));
        assert!(err.to_string().contains("CustomerKey"));
        assert!(err.to_string().contains("TerritoryKey"));
    }

    #[test]
    fn test_territories_need_region() {
        let territories = df! { "SalesTerritoryKey" => &["1"], "Country" => &["Canada"] }.unwrap();
        let err = normalize_territories(territories, "SalesTerritoryKey").unwrap_err();
        assert!(err.to_string().contains("Region"));
    }
}
