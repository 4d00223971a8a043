//! Property tests for the pipeline's row-count, sum, determinism and
//! encoding guarantees

use std::collections::{BTreeMap, HashMap};

use polars::df;
use proptest::prelude::*;

use salesviz::aggregate::NullGroupPolicy;
use salesviz::encode::{encode, EncodingConfig, SizePolicy};
use salesviz::pipeline::SourceFrames;
use salesviz::{AggregatedPoint, Pipeline, PipelineConfig};

const REGIONS: &[&str] = &["East", "West", "North", "South"];
const PRODUCTS: &[&str] = &["Widget", "Gadget", "Sprocket"];

/// One sales line: product key, customer key, territory key, quantity
type SalesLine = (u8, u8, u8, u16);

#[derive(Debug, Clone)]
struct Dataset {
    sales: Vec<SalesLine>,
    /// Raw customer keys, some dirty, some repeated
    customers: Vec<&'static str>,
    /// (territory key, region index); keys may repeat
    territories: Vec<(u8, usize)>,
    /// (product key, product index); keys may repeat
    products: Vec<(u8, usize)>,
}

impl Dataset {
    fn frames(&self) -> SourceFrames {
        SourceFrames {
            sales: df! {
                "ProductKey" => self.sales.iter().map(|s| s.0.to_string()).collect::<Vec<_>>(),
                "CustomerKey" => self.sales.iter().map(|s| s.1.to_string()).collect::<Vec<_>>(),
                "TerritoryKey" => self.sales.iter().map(|s| s.2.to_string()).collect::<Vec<_>>(),
                "OrderQuantity" => self.sales.iter().map(|s| s.3.to_string()).collect::<Vec<_>>(),
            }
            .unwrap(),
            customers: df! {
                "CustomerID" => self.customers.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            }
            .unwrap(),
            territories: df! {
                "SalesTerritoryKey" => self.territories.iter().map(|t| t.0.to_string()).collect::<Vec<_>>(),
                "Region" => self.territories.iter().map(|t| REGIONS[t.1].to_string()).collect::<Vec<_>>(),
            }
            .unwrap(),
            products: df! {
                "ProductKey" => self.products.iter().map(|p| p.0.to_string()).collect::<Vec<_>>(),
                "ProductName" => self.products.iter().map(|p| PRODUCTS[p.1].to_string()).collect::<Vec<_>>(),
            }
            .unwrap(),
        }
    }

    /// Per-(product, region) sums computed directly from the raw lines,
    /// with the first lookup row winning for a repeated key
    fn expected_groups(&self) -> BTreeMap<(Option<String>, Option<String>), i64> {
        let mut product_names: HashMap<u8, &str> = HashMap::new();
        for &(key, index) in &self.products {
            product_names.entry(key).or_insert(PRODUCTS[index]);
        }
        let mut regions: HashMap<u8, &str> = HashMap::new();
        for &(key, index) in &self.territories {
            regions.entry(key).or_insert(REGIONS[index]);
        }

        let mut groups = BTreeMap::new();
        for &(product, _, territory, quantity) in &self.sales {
            let key = (
                product_names.get(&product).map(|name| name.to_string()),
                regions.get(&territory).map(|name| name.to_string()),
            );
            *groups.entry(key).or_insert(0) += i64::from(quantity);
        }
        groups
    }
}

fn dataset() -> impl Strategy<Value = Dataset> {
    (
        prop::collection::vec((0u8..6, 0u8..6, 0u8..6, 0u16..500), 1..40),
        prop::collection::vec(
            prop::sample::select(vec!["0", "1", "2", "3", "3", "4", "12a", "", "AW005"]),
            1..10,
        ),
        prop::collection::vec((0u8..6, 0..REGIONS.len()), 1..8),
        prop::collection::vec((0u8..6, 0..PRODUCTS.len()), 1..8),
    )
        .prop_map(|(sales, customers, territories, products)| Dataset {
            sales,
            customers,
            territories,
            products,
        })
}

fn run(dataset: &Dataset, policy: NullGroupPolicy) -> salesviz::PipelineOutput {
    let mut config = PipelineConfig::default();
    config.aggregate.null_groups = policy;
    Pipeline::new(config)
        .unwrap()
        .run_frames(dataset.frames())
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_merge_keeps_every_sales_row(dataset in dataset()) {
        let output = run(&dataset, NullGroupPolicy::Retain);
        prop_assert_eq!(output.stats.sales_rows, dataset.sales.len());
    }

    #[test]
    fn prop_retained_sums_match_each_group(dataset in dataset()) {
        let output = run(&dataset, NullGroupPolicy::Retain);
        let actual: BTreeMap<(Option<String>, Option<String>), i64> = output
            .aggregated
            .into_iter()
            .map(|p| ((p.product_name, p.region), p.order_quantity))
            .collect();
        prop_assert_eq!(actual, dataset.expected_groups());
    }

    #[test]
    fn prop_groups_are_unique_and_sorted(dataset in dataset()) {
        let output = run(&dataset, NullGroupPolicy::Retain);
        for pair in output.aggregated.windows(2) {
            let a = (&pair[0].product_name, &pair[0].region);
            let b = (&pair[1].product_name, &pair[1].region);
            prop_assert!(a < b, "{:?} should sort before {:?}", a, b);
        }
    }

    #[test]
    fn prop_drop_removes_only_null_groups(dataset in dataset()) {
        let retained = run(&dataset, NullGroupPolicy::Retain);
        let dropped = run(&dataset, NullGroupPolicy::Drop);
        let expected: Vec<AggregatedPoint> = retained
            .aggregated
            .into_iter()
            .filter(|p| !p.has_null_key())
            .collect();
        prop_assert_eq!(dropped.aggregated, expected);
    }

    #[test]
    fn prop_runs_are_deterministic(dataset in dataset()) {
        let first = run(&dataset, NullGroupPolicy::Retain);
        let second = run(&dataset, NullGroupPolicy::Retain);
        prop_assert_eq!(first.aggregated, second.aggregated);
        prop_assert_eq!(first.encoded, second.encoded);
        prop_assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn prop_min_max_hits_both_bounds(
        quantities in prop::collection::vec(0i64..10_000, 2..50),
        min_size in 1.0f64..10.0,
        extra in 1.0f64..40.0,
    ) {
        let max_size = min_size + extra;
        let sizes = SizePolicy::min_max(min_size, max_size).scale(&quantities);
        let q_min = *quantities.iter().min().unwrap();
        let q_max = *quantities.iter().max().unwrap();

        prop_assert_eq!(sizes.len(), quantities.len());
        for (&q, &size) in quantities.iter().zip(&sizes) {
            prop_assert!(size >= min_size && size <= max_size);
            if q_min != q_max {
                if q == q_min {
                    prop_assert_eq!(size, min_size);
                }
                if q == q_max {
                    prop_assert_eq!(size, max_size);
                }
            }
        }
    }

    #[test]
    fn prop_one_color_per_region(
        points in prop::collection::vec(
            (prop::option::of(0..PRODUCTS.len()), prop::option::of(0..REGIONS.len()), 0i64..1000),
            0..30,
        )
    ) {
        let points: Vec<AggregatedPoint> = points
            .into_iter()
            .map(|(p, r, q)| AggregatedPoint::new(p.map(|i| PRODUCTS[i]), r.map(|i| REGIONS[i]), q))
            .collect();
        let encoded = encode(&points, &EncodingConfig::default()).unwrap();

        let mut colors: HashMap<Option<String>, String> = HashMap::new();
        for point in &encoded {
            let color = colors
                .entry(point.point.region.clone())
                .or_insert_with(|| point.color.clone());
            prop_assert_eq!(&*color, &point.color);
        }
        // Five distinct keys at most (four regions plus null) fit in category10
        let distinct: std::collections::HashSet<&String> = colors.values().collect();
        prop_assert_eq!(distinct.len(), colors.len());
    }
}
