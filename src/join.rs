//! Left joins of the sales table against the three dimensions
//!
//! Sales is always the driving table. Each dimension gets a marker column
//! before joining; a null marker afterwards identifies a sales row with no
//! matching dimension row, which is how unmatched counts are reported
//! without inspecting the (possibly all-null) attribute columns.

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::naming::{match_marker, CUSTOMER_KEY, PRODUCT_KEY, TERRITORY_KEY};
use crate::tables::{CustomerTable, MergedTable, ProductTable, SalesTable, TerritoryTable};
use crate::{Result, SalesvizError};

/// Row and match counts from the join stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    /// Rows in the merged table (always equal to the sales row count)
    pub rows: usize,
    pub unmatched_customers: usize,
    pub unmatched_territories: usize,
    pub unmatched_products: usize,
}

struct Dimension {
    name: &'static str,
    key: &'static str,
    frame: LazyFrame,
}

impl Dimension {
    fn new(name: &'static str, key: &'static str, frame: DataFrame) -> Self {
        let frame = frame
            .lazy()
            .with_column(lit(true).alias(match_marker(name)));
        Self { name, key, frame }
    }
}

/// Join sales ⟕ customers ⟕ territories ⟕ products
///
/// # Errors
///
/// `InternalError` if the result does not have exactly one row per sales
/// line. Dimension keys are unique after normalization, so this indicates
/// a bug rather than bad input.
pub fn join_dimensions(
    sales: SalesTable,
    customers: CustomerTable,
    territories: TerritoryTable,
    products: ProductTable,
) -> Result<(MergedTable, JoinStats)> {
    let sales_rows = sales.height();

    let dimensions = [
        Dimension::new("customer", CUSTOMER_KEY, customers.into_frame()),
        Dimension::new("territory", TERRITORY_KEY, territories.into_frame()),
        Dimension::new("product", PRODUCT_KEY, products.into_frame()),
    ];

    let mut merged = sales.into_frame().lazy();
    for dimension in &dimensions {
        merged = merged.join(
            dimension.frame.clone(),
            [col(dimension.key)],
            [col(dimension.key)],
            JoinArgs::new(JoinType::Left),
        );
    }
    let mut merged = merged.collect()?;

    if merged.height() != sales_rows {
        return Err(SalesvizError::InternalError(format!(
            "Join produced {} rows from {} sales rows",
            merged.height(),
            sales_rows
        )));
    }

    let mut unmatched = [0usize; 3];
    for (count, dimension) in unmatched.iter_mut().zip(&dimensions) {
        let marker = merged.drop_in_place(&match_marker(dimension.name))?;
        *count = marker.null_count();
    }

    let stats = JoinStats {
        rows: merged.height(),
        unmatched_customers: unmatched[0],
        unmatched_territories: unmatched[1],
        unmatched_products: unmatched[2],
    };
    info!(
        "Joined {} sales rows (unmatched: {} customer, {} territory, {} product)",
        stats.rows,
        stats.unmatched_customers,
        stats.unmatched_territories,
        stats.unmatched_products
    );

    Ok((MergedTable::new(merged), stats))
}
