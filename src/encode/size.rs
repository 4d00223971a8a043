//! Marker size scaling

use serde::{Deserialize, Serialize};

use crate::{Result, SalesvizError};

fn default_divisor() -> f64 {
    50.0
}

fn default_min_size() -> f64 {
    4.0
}

fn default_max_size() -> f64 {
    30.0
}

fn default_fallback_size() -> f64 {
    12.0
}

/// How order quantity maps to marker size
///
/// One policy applies to every point of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum SizePolicy {
    /// `size = quantity / divisor`; zero maps to zero
    Linear {
        #[serde(default = "default_divisor")]
        divisor: f64,
    },
    /// Rescale `[q_min, q_max]` onto `[min_size, max_size]`
    ///
    /// When every point has the same quantity the range is empty and all
    /// points get `fallback_size`.
    #[serde(alias = "min-max", alias = "min_max")]
    MinMax {
        #[serde(default = "default_min_size")]
        min_size: f64,
        #[serde(default = "default_max_size")]
        max_size: f64,
        #[serde(default = "default_fallback_size")]
        fallback_size: f64,
    },
}

impl Default for SizePolicy {
    fn default() -> Self {
        SizePolicy::Linear {
            divisor: default_divisor(),
        }
    }
}

impl SizePolicy {
    /// Min-max policy with the default fallback size
    pub fn min_max(min_size: f64, max_size: f64) -> Self {
        SizePolicy::MinMax {
            min_size,
            max_size,
            fallback_size: default_fallback_size(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            SizePolicy::Linear { divisor } => {
                if !(divisor.is_finite() && divisor > 0.0) {
                    return Err(SalesvizError::ConfigError(format!(
                        "Linear size divisor must be a positive number, got {}",
                        divisor
                    )));
                }
            }
            SizePolicy::MinMax {
                min_size,
                max_size,
                fallback_size,
            } => {
                let all_finite = [min_size, max_size, fallback_size]
                    .iter()
                    .all(|v| v.is_finite() && *v >= 0.0);
                if !all_finite {
                    return Err(SalesvizError::ConfigError(
                        "Min-max sizes must be finite and non-negative".to_string(),
                    ));
                }
                if min_size > max_size {
                    return Err(SalesvizError::ConfigError(format!(
                        "min_size ({}) is larger than max_size ({})",
                        min_size, max_size
                    )));
                }
            }
        }
        Ok(())
    }

    /// Marker size for every quantity, in input order
    ///
    /// The min-max bounds are taken over the whole slice.
    pub fn scale(&self, quantities: &[i64]) -> Vec<f64> {
        match *self {
            SizePolicy::Linear { divisor } => {
                quantities.iter().map(|&q| q as f64 / divisor).collect()
            }
            SizePolicy::MinMax {
                min_size,
                max_size,
                fallback_size,
            } => {
                let (Some(&q_min), Some(&q_max)) =
                    (quantities.iter().min(), quantities.iter().max())
                else {
                    return Vec::new();
                };
                if q_min == q_max {
                    return vec![fallback_size; quantities.len()];
                }
                let span = (q_max - q_min) as f64;
                quantities
                    .iter()
                    .map(|&q| {
                        // Pin the endpoints so rounding can never miss them
                        if q == q_min {
                            min_size
                        } else if q == q_max {
                            max_size
                        } else {
                            min_size + (q - q_min) as f64 / span * (max_size - min_size)
                        }
                    })
                    .collect()
            }
        }
    }
}

impl std::fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizePolicy::Linear { divisor } => write!(f, "linear (quantity / {})", divisor),
            SizePolicy::MinMax {
                min_size, max_size, ..
            } => write!(f, "min-max ({}..{})", min_size, max_size),
        }
    }
}
