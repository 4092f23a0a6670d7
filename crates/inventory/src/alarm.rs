//! Stock alarm classification.
//!
//! Bands, evaluated in order (first match wins):
//!
//! | band     | condition                              |
//! |----------|----------------------------------------|
//! | critical | `current < min`                        |
//! | high     | `min <= current <= min * 1.15`         |
//! | medium   | `min * 1.15 < current <= min * 1.50`   |
//! | none     | `current > min * 1.50`                 |
//!
//! Band edges are compared in hundredths (`current * 100` against
//! `min * 115` / `min * 150`) so they are exact for every integer pair.

use serde::{Deserialize, Serialize};

const HIGH_CEILING_PCT: u128 = 115;
const MEDIUM_CEILING_PCT: u128 = 150;

/// Severity of a product's stock shortfall. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmLevel {
    Critical,
    High,
    Medium,
}

impl AlarmLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmLevel::Critical => "critical",
            AlarmLevel::High => "high",
            AlarmLevel::Medium => "medium",
        }
    }

    /// True if `self` is at least as severe as `other`.
    pub fn at_least(self, other: AlarmLevel) -> bool {
        self <= other
    }
}

impl core::fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AlarmLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(AlarmLevel::Critical),
            "high" => Ok(AlarmLevel::High),
            "medium" => Ok(AlarmLevel::Medium),
            other => Err(format!("unknown alarm level '{other}' (expected critical, high or medium)")),
        }
    }
}

/// True iff `current <= min * 1.5`. This predicate decides alarm-listing membership.
pub fn is_in_alarm(stock_current: u64, stock_min: u64) -> bool {
    (stock_current as u128) * 100 <= (stock_min as u128) * MEDIUM_CEILING_PCT
}

/// Classify a stock position. `None` means the product is not in alarm.
pub fn classify_alarm(stock_current: u64, stock_min: u64) -> Option<AlarmLevel> {
    let current_pct = (stock_current as u128) * 100;
    let min = stock_min as u128;

    if stock_current < stock_min {
        Some(AlarmLevel::Critical)
    } else if current_pct <= min * HIGH_CEILING_PCT {
        Some(AlarmLevel::High)
    } else if current_pct <= min * MEDIUM_CEILING_PCT {
        Some(AlarmLevel::Medium)
    } else {
        None
    }
}

/// `round(current / min * 100)`, half away from zero; 0 when `min == 0`.
pub fn stock_percentage(stock_current: u64, stock_min: u64) -> u64 {
    if stock_min == 0 {
        return 0;
    }
    let num = (stock_current as u128) * 200 + stock_min as u128;
    let den = (stock_min as u128) * 2;
    u64::try_from(num / den).unwrap_or(u64::MAX)
}

/// Units needed to reach the minimum (`max(0, min - current)`).
pub fn deficit(stock_current: u64, stock_min: u64) -> u64 {
    stock_min.saturating_sub(stock_current)
}

/// Alarm view of one product: band plus the derived figures shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmAssessment {
    pub level: AlarmLevel,
    pub stock_current: u64,
    pub stock_min: u64,
    pub stock_percentage: u64,
    pub deficit: u64,
}

impl AlarmAssessment {
    /// Assess a stock position; `None` when the product is not in alarm.
    pub fn assess(stock_current: u64, stock_min: u64) -> Option<Self> {
        if !is_in_alarm(stock_current, stock_min) {
            return None;
        }
        let level = classify_alarm(stock_current, stock_min)?;
        Some(Self {
            level,
            stock_current,
            stock_min,
            stock_percentage: stock_percentage(stock_current, stock_min),
            deficit: deficit(stock_current, stock_min),
        })
    }

    /// Listing order: most severe first, then lowest percentage, then largest deficit.
    pub fn priority_cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.level
            .cmp(&other.level)
            .then(self.stock_percentage.cmp(&other.stock_percentage))
            .then(other.deficit.cmp(&self.deficit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_minimum_is_critical() {
        assert_eq!(classify_alarm(8, 10), Some(AlarmLevel::Critical));
        assert_eq!(classify_alarm(0, 1), Some(AlarmLevel::Critical));
    }

    #[test]
    fn at_minimum_is_high() {
        assert_eq!(classify_alarm(10, 10), Some(AlarmLevel::High));
        assert_eq!(classify_alarm(11, 10), Some(AlarmLevel::High));
    }

    #[test]
    fn just_above_high_band_is_medium() {
        assert_eq!(classify_alarm(12, 10), Some(AlarmLevel::Medium));
        assert_eq!(classify_alarm(15, 10), Some(AlarmLevel::Medium));
    }

    #[test]
    fn above_one_and_a_half_times_minimum_is_not_in_alarm() {
        assert_eq!(classify_alarm(16, 10), None);
        assert!(!is_in_alarm(16, 10));
        assert!(AlarmAssessment::assess(16, 10).is_none());
    }

    #[test]
    fn band_edges_are_exact_at_hundredths() {
        // min=20: high ceiling 23, medium ceiling 30.
        assert_eq!(classify_alarm(23, 20), Some(AlarmLevel::High));
        assert_eq!(classify_alarm(24, 20), Some(AlarmLevel::Medium));
        assert_eq!(classify_alarm(30, 20), Some(AlarmLevel::Medium));
        assert_eq!(classify_alarm(31, 20), None);
    }

    #[test]
    fn zero_minimum() {
        assert_eq!(classify_alarm(0, 0), Some(AlarmLevel::High));
        assert!(is_in_alarm(0, 0));
        assert_eq!(classify_alarm(1, 0), None);
        assert_eq!(stock_percentage(5, 0), 0);
        assert_eq!(deficit(5, 0), 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(stock_percentage(8, 10), 80);
        assert_eq!(stock_percentage(1, 3), 33);
        assert_eq!(stock_percentage(2, 3), 67);
        assert_eq!(stock_percentage(1, 8), 13);
    }

    #[test]
    fn deficit_never_negative() {
        assert_eq!(deficit(8, 10), 2);
        assert_eq!(deficit(12, 10), 0);
    }

    #[test]
    fn assessment_orders_by_severity_then_percentage() {
        let critical = AlarmAssessment::assess(2, 10).unwrap();
        let worse_critical = AlarmAssessment::assess(1, 10).unwrap();
        let high = AlarmAssessment::assess(10, 10).unwrap();
        let medium = AlarmAssessment::assess(14, 10).unwrap();

        let mut all = vec![medium, high, critical, worse_critical];
        all.sort_by(|a, b| a.priority_cmp(b));

        assert_eq!(all, vec![worse_critical, critical, high, medium]);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<AlarmLevel>().unwrap(), AlarmLevel::High);
        assert!("low".parse::<AlarmLevel>().is_err());
        assert!(AlarmLevel::Critical.at_least(AlarmLevel::High));
        assert!(!AlarmLevel::Medium.at_least(AlarmLevel::High));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: anything below the minimum is critical.
            #[test]
            fn below_min_is_always_critical(
                (min, current) in (1u64..1_000_000).prop_flat_map(|m| (Just(m), 0..m))
            ) {
                prop_assert_eq!(classify_alarm(current, min), Some(AlarmLevel::Critical));
            }

            /// Property: membership predicate and classifier agree on "not in alarm".
            #[test]
            fn predicate_matches_classifier(current in 0u64..10_000_000, min in 0u64..10_000_000) {
                prop_assert_eq!(is_in_alarm(current, min), classify_alarm(current, min).is_some());
            }

            /// Property: bands follow the float definition for all integer pairs.
            #[test]
            fn bands_match_threshold_definition(current in 0u64..100_000, min in 0u64..100_000) {
                let c = current as f64;
                let m = min as f64;
                let expected = if c < m {
                    Some(AlarmLevel::Critical)
                } else if c * 100.0 <= m * 115.0 {
                    Some(AlarmLevel::High)
                } else if c * 100.0 <= m * 150.0 {
                    Some(AlarmLevel::Medium)
                } else {
                    None
                };
                prop_assert_eq!(classify_alarm(current, min), expected);
            }

            /// Property: deficit plus current reaches at least the minimum.
            #[test]
            fn deficit_closes_the_gap(current in 0u64..1_000_000, min in 0u64..1_000_000) {
                prop_assert!(current + deficit(current, min) >= min);
            }
        }
    }
}
