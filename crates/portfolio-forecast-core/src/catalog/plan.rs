use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Risk tier of a model portfolio, ordered from least to most concentrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Diversified,
    Targeted,
    Concentrated,
    Aggressive,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Diversified,
        RiskTier::Targeted,
        RiskTier::Concentrated,
        RiskTier::Aggressive,
    ];

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Diversified => "Diversified",
            RiskTier::Targeted => "Targeted",
            RiskTier::Concentrated => "Concentrated",
            RiskTier::Aggressive => "Aggressive",
        };
        f.write_str(s)
    }
}

/// A named, fixed weight vector over the asset universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub tier: RiskTier,
    /// Asset id -> weight in [0, 1].
    pub weights: BTreeMap<String, Decimal>,
}

impl Plan {
    pub fn new<I, S>(name: impl Into<String>, tier: RiskTier, weights: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: Into<String>,
    {
        Plan {
            name: name.into(),
            tier,
            weights: weights.into_iter().map(|(a, w)| (a.into(), w)).collect(),
        }
    }

    pub fn total_weight(&self) -> Decimal {
        self.weights.values().sum()
    }

    /// Asset ids this plan holds.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Diversified < RiskTier::Targeted);
        assert!(RiskTier::Targeted < RiskTier::Concentrated);
        assert!(RiskTier::Concentrated < RiskTier::Aggressive);
        for (i, t) in RiskTier::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_total_weight() {
        let p = Plan::new(
            "Mixed",
            RiskTier::Targeted,
            [("SPY", dec!(0.6)), ("QQQ", dec!(0.4))],
        );
        assert_eq!(p.total_weight(), Decimal::ONE);
        assert_eq!(p.assets().collect::<Vec<_>>(), vec!["QQQ", "SPY"]);
    }
}
