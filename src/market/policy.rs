//! Parameter clamping
//!
//! Out-of-range fees and durations are replaced by a default rather than
//! rejected. The substitution is reported back so callers can see it.

use super::units::{format_ether, parse_ether};
use crate::config::MarketPolicyConfig;
use crate::{Error, Result};
use alloy::primitives::U256;

/// Seconds per day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Result of applying a clamp policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped<T> {
    pub effective: T,
    /// True when the requested value was replaced
    pub clamped: bool,
}

/// Entrance fee bounds, in wei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePolicy {
    pub min: U256,
    pub max: U256,
    pub default: U256,
}

impl FeePolicy {
    pub fn from_config(config: &MarketPolicyConfig) -> Result<Self> {
        let parse = |field: &str, value: &str| {
            parse_ether(value).map_err(|e| Error::Config(format!("market.{}: {}", field, e)))
        };
        let policy = Self {
            min: parse("min_fee_eth", &config.min_fee_eth)?,
            max: parse("max_fee_eth", &config.max_fee_eth)?,
            default: parse("default_fee_eth", &config.default_fee_eth)?,
        };

        if policy.min > policy.max || !policy.contains(policy.default) {
            return Err(Error::Config(format!(
                "Fee default {} must lie within [{}, {}]",
                config.default_fee_eth, config.min_fee_eth, config.max_fee_eth
            )));
        }
        Ok(policy)
    }

    pub fn contains(&self, wei: U256) -> bool {
        wei >= self.min && wei <= self.max
    }

    /// Resolve a caller-supplied ETH amount.
    ///
    /// Omitted means the default. A malformed string is a validation error;
    /// a well-formed amount outside the bounds becomes the default.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Clamped<U256>> {
        let Some(requested) = requested else {
            return Ok(Clamped {
                effective: self.default,
                clamped: false,
            });
        };

        let wei = parse_ether(requested)?;
        if self.contains(wei) {
            Ok(Clamped {
                effective: wei,
                clamped: false,
            })
        } else {
            tracing::info!(
                requested = requested,
                effective = %format_ether(self.default),
                "Fee outside bounds, using default"
            );
            Ok(Clamped {
                effective: self.default,
                clamped: true,
            })
        }
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            min: U256::from(1_000_000_000_000_000u64),
            max: U256::from(5_000_000_000_000_000u64),
            default: U256::from(1_000_000_000_000_000u64),
        }
    }
}

/// Market duration bounds, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlinePolicy {
    pub min_days: i64,
    pub max_days: i64,
    pub default_days: i64,
}

impl DeadlinePolicy {
    pub fn from_config(config: &MarketPolicyConfig) -> Result<Self> {
        let policy = Self {
            min_days: config.min_deadline_days,
            max_days: config.max_deadline_days,
            default_days: config.default_deadline_days,
        };
        if policy.min_days < 1
            || policy.min_days > policy.max_days
            || !policy.contains(policy.default_days)
        {
            return Err(Error::Config(format!(
                "Deadline default {} must lie within [{}, {}] with a minimum of at least 1 day",
                policy.default_days, policy.min_days, policy.max_days
            )));
        }
        Ok(policy)
    }

    pub fn contains(&self, days: i64) -> bool {
        days >= self.min_days && days <= self.max_days
    }

    pub fn resolve(&self, requested: Option<i64>) -> Clamped<i64> {
        match requested {
            Some(days) if self.contains(days) => Clamped {
                effective: days,
                clamped: false,
            },
            Some(days) => {
                tracing::info!(
                    requested = days,
                    effective = self.default_days,
                    "Deadline outside bounds, using default"
                );
                Clamped {
                    effective: self.default_days,
                    clamped: true,
                }
            }
            None => Clamped {
                effective: self.default_days,
                clamped: false,
            },
        }
    }

    /// Deadline timestamp for a market starting at `now`
    pub fn deadline_from(&self, now: u64, days: i64) -> u64 {
        now + days.unsigned_abs() * SECONDS_PER_DAY
    }
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            min_days: 3,
            max_days: 30,
            default_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_outside_bounds_fall_back_to_seven() {
        let policy = DeadlinePolicy::default();
        for days in [-5, 0, 1, 2, 31, 40, 365] {
            let resolved = policy.resolve(Some(days));
            assert_eq!(resolved.effective, 7, "days={}", days);
            assert!(resolved.clamped);
        }
    }

    #[test]
    fn days_inside_bounds_are_kept() {
        let policy = DeadlinePolicy::default();
        for days in [3, 7, 15, 30] {
            let resolved = policy.resolve(Some(days));
            assert_eq!(resolved.effective, days);
            assert!(!resolved.clamped);
            assert_eq!(
                policy.deadline_from(1_000, days),
                1_000 + days as u64 * 86_400
            );
        }
    }

    #[test]
    fn omitted_days_use_default_without_flag() {
        let resolved = DeadlinePolicy::default().resolve(None);
        assert_eq!(resolved.effective, 7);
        assert!(!resolved.clamped);
    }

    #[test]
    fn fees_outside_bounds_fall_back_to_default() {
        let policy = FeePolicy::default();
        for fee in ["0.01", "0.0009", "0", "1", "0.005000000000000001"] {
            let resolved = policy.resolve(Some(fee)).unwrap();
            assert_eq!(
                resolved.effective,
                U256::from(1_000_000_000_000_000u64),
                "fee={}",
                fee
            );
            assert!(resolved.clamped);
        }
    }

    #[test]
    fn fees_inside_bounds_convert_exactly() {
        let policy = FeePolicy::default();
        let cases = [
            ("0.001", 1_000_000_000_000_000u64),
            ("0.0025", 2_500_000_000_000_000u64),
            ("0.005", 5_000_000_000_000_000u64),
        ];
        for (fee, wei) in cases {
            let first = policy.resolve(Some(fee)).unwrap();
            let second = policy.resolve(Some(fee)).unwrap();
            assert_eq!(first.effective, U256::from(wei));
            assert_eq!(first, second);
            assert!(!first.clamped);
        }
    }

    #[test]
    fn malformed_fee_is_rejected_not_clamped() {
        let err = FeePolicy::default().resolve(Some("-0.002")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn from_config_checks_default_in_range() {
        let mut config = MarketPolicyConfig::default();
        assert_eq!(
            FeePolicy::from_config(&config).unwrap(),
            FeePolicy::default()
        );

        config.default_fee_eth = "0.01".to_string();
        assert!(matches!(
            FeePolicy::from_config(&config),
            Err(Error::Config(_))
        ));

        let mut config = MarketPolicyConfig::default();
        config.default_deadline_days = 2;
        assert!(matches!(
            DeadlinePolicy::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
