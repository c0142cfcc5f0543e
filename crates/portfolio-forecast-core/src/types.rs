use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiplicative growth of one unit invested (1.10 = +10%).
pub type GrowthFactor = Decimal;

/// Sampling period of a return series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnFrequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl ReturnFrequency {
    /// Number of periods in a year
    pub fn periods_per_year(&self) -> u32 {
        match self {
            ReturnFrequency::Daily => 252,
            ReturnFrequency::Weekly => 52,
            ReturnFrequency::Monthly => 12,
            ReturnFrequency::Quarterly => 4,
            ReturnFrequency::Annual => 1,
        }
    }
}

impl std::str::FromStr for ReturnFrequency {
    type Err = crate::ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(ReturnFrequency::Daily),
            "weekly" => Ok(ReturnFrequency::Weekly),
            "monthly" => Ok(ReturnFrequency::Monthly),
            "quarterly" => Ok(ReturnFrequency::Quarterly),
            "annual" | "annually" => Ok(ReturnFrequency::Annual),
            other => Err(crate::ForecastError::InvalidInput {
                field: "frequency".into(),
                reason: format!(
                    "Unknown frequency '{other}'. Use: daily, weekly, monthly, quarterly, annual"
                ),
            }),
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(methodology, assumptions, warnings, elapsed_us, "rust_decimal_128bit", result)
}

/// Same envelope for computations that run in binary floating point.
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(methodology, assumptions, warnings, elapsed_us, "ieee754_f64", result)
}

fn wrap<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(ReturnFrequency::Monthly.periods_per_year(), 12);
        assert_eq!(ReturnFrequency::Daily.periods_per_year(), 252);
        assert_eq!(ReturnFrequency::Annual.periods_per_year(), 1);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Monthly".parse::<ReturnFrequency>().unwrap(), ReturnFrequency::Monthly);
        assert_eq!("annually".parse::<ReturnFrequency>().unwrap(), ReturnFrequency::Annual);
        assert!("fortnightly".parse::<ReturnFrequency>().is_err());
    }

    #[test]
    fn test_metadata_precision_labels() {
        let d = with_metadata("m", &serde_json::json!({}), vec![], 1, 0u8);
        let f = with_metadata_f64("m", &serde_json::json!({}), vec![], 1, 0u8);
        assert_eq!(d.metadata.precision, "rust_decimal_128bit");
        assert_eq!(f.metadata.precision, "ieee754_f64");
    }
}
