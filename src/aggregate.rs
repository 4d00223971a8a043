//! Order quantity totals per (product, region)

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::naming::{ORDER_QUANTITY, PRODUCT_NAME, REGION};
use crate::tables::MergedTable;
use crate::{Result, SalesvizError};

/// What to do with groups whose product or region is null (an unmatched
/// dimension row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NullGroupPolicy {
    /// Keep null-keyed groups so every unit ordered stays accounted for
    #[default]
    Retain,
    /// Discard groups with a null product or region
    Drop,
}

/// Total order quantity for one (product, region) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPoint {
    /// `None` when the sales rows had no matching product
    pub product_name: Option<String>,
    /// `None` when the sales rows had no matching territory
    pub region: Option<String>,
    pub order_quantity: i64,
}

impl AggregatedPoint {
    pub fn new(product_name: Option<&str>, region: Option<&str>, order_quantity: i64) -> Self {
        Self {
            product_name: product_name.map(str::to_string),
            region: region.map(str::to_string),
            order_quantity,
        }
    }

    /// True when either grouping key is null
    pub fn has_null_key(&self) -> bool {
        self.product_name.is_none() || self.region.is_none()
    }
}

/// Group the merged table by (ProductName, Region) and sum OrderQuantity
///
/// All other columns are discarded. The result is sorted by
/// (product, region) with null keys first, so repeated runs over the same
/// input return identical vectors.
pub fn aggregate(merged: &MergedTable, policy: NullGroupPolicy) -> Result<Vec<AggregatedPoint>> {
    check_sums_fit(merged)?;

    let grouped = merged
        .frame()
        .clone()
        .lazy()
        .select([
            col(PRODUCT_NAME).cast(DataType::String),
            col(REGION).cast(DataType::String),
            col(ORDER_QUANTITY).cast(DataType::Int64),
        ])
        .group_by([col(PRODUCT_NAME), col(REGION)])
        .agg([col(ORDER_QUANTITY).sum()])
        .collect()?;

    let products = grouped.column(PRODUCT_NAME)?.as_materialized_series().str()?.clone();
    let regions = grouped.column(REGION)?.as_materialized_series().str()?.clone();
    let quantities = grouped
        .column(ORDER_QUANTITY)?
        .as_materialized_series()
        .i64()?
        .clone();

    let mut points = Vec::with_capacity(grouped.height());
    for ((product, region), quantity) in products
        .into_iter()
        .zip(regions.into_iter())
        .zip(quantities.into_iter())
    {
        let quantity = quantity.ok_or_else(|| {
            SalesvizError::InternalError("Grouped order quantity sum is null".to_string())
        })?;
        points.push(AggregatedPoint::new(product, region, quantity));
    }

    let total_groups = points.len();
    if policy == NullGroupPolicy::Drop {
        points.retain(|p| !p.has_null_key());
    }
    points.sort();

    info!(
        "Aggregated {} (product, region) groups ({} dropped for null keys)",
        points.len(),
        total_groups - points.len()
    );
    Ok(points)
}

/// Reject tables whose group sums could overflow `Int64`
///
/// No partial sum of any group can exceed the sum of absolute quantities
/// over the whole table, so one bound covers every group.
fn check_sums_fit(merged: &MergedTable) -> Result<()> {
    let quantities = merged
        .frame()
        .column(ORDER_QUANTITY)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    let bound: i128 = quantities
        .i64()?
        .into_iter()
        .flatten()
        .map(|q| i128::from(q.unsigned_abs()))
        .sum();
    if bound > i128::from(i64::MAX) {
        return Err(SalesvizError::SchemaMismatch(format!(
            "{} totals exceed the 64-bit integer range",
            ORDER_QUANTITY
        )));
    }
    Ok(())
}
