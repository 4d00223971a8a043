//! Typed table wrappers for each entity in the pipeline
//!
//! Every wrapper can only be built by the stage that guarantees its
//! invariants: the normalizer builds the four source tables (join keys
//! present and typed as `Int64`), and the join engine builds the merged
//! table. Downstream stages accept the wrapper instead of a bare
//! `DataFrame`, so an unnormalized frame cannot reach a join.

use polars::prelude::DataFrame;

macro_rules! table_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            frame: DataFrame,
        }

        impl $name {
            pub(crate) fn new(frame: DataFrame) -> Self {
                Self { frame }
            }

            /// Borrow the underlying frame
            pub fn frame(&self) -> &DataFrame {
                &self.frame
            }

            /// Take ownership of the underlying frame
            pub fn into_frame(self) -> DataFrame {
                self.frame
            }

            /// Number of rows
            pub fn height(&self) -> usize {
                self.frame.height()
            }
        }
    };
}

table_wrapper!(
    /// Concatenated yearly sales lines.
    ///
    /// `OrderQuantity` is a non-null, non-negative `Int64`; the three foreign
    /// keys are nullable `Int64`. All other columns pass through as text.
    SalesTable
);

table_wrapper!(
    /// Customer lookup after key cleaning: `CustomerKey` is a unique,
    /// non-negative `Int64` on every row.
    CustomerTable
);

table_wrapper!(
    /// Territory lookup: unique `TerritoryKey` plus a `Region` text column.
    TerritoryTable
);

table_wrapper!(
    /// Product lookup: unique `ProductKey` plus a `ProductName` text column.
    ProductTable
);

table_wrapper!(
    /// Sales left-joined with all three dimensions; one row per sales line.
    MergedTable
);
