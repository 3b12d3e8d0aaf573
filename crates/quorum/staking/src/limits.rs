//! Global staking limits

use quorum_types::Amount;
use serde::{Deserialize, Serialize};

use crate::params::{mul_div, StakingParams, APY_SCALE, ONE_YEAR};

/// Upper bounds every staking instance must satisfy at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingLimits {
    /// Largest allowed `min_staking_deposit`.
    pub min_deposit: Amount,
    /// Largest allowed `time_for_emissions`, in seconds.
    pub max_emissions_duration: u64,
    /// Largest allowed `max_num_services`.
    pub max_services: u32,
    /// Largest allowed APY, scaled by `APY_SCALE`.
    pub max_apy: u128,
}

impl StakingLimits {
    pub fn has_zero_field(&self) -> bool {
        self.min_deposit == 0
            || self.max_emissions_duration == 0
            || self.max_services == 0
            || self.max_apy == 0
    }

    /// Whether `params` is within every limit. Zero parameters never pass.
    pub fn admits(&self, params: &StakingParams) -> bool {
        if params.has_zero_field() {
            return false;
        }
        params.min_staking_deposit <= self.min_deposit
            && params.time_for_emissions <= self.max_emissions_duration
            && params.max_num_services <= self.max_services
            && params.apy().is_some_and(|apy| apy <= self.max_apy)
    }

    /// Highest `rewards_per_second` the APY limit allows for the stake shape of
    /// `params`.
    pub fn max_rewards_per_second(&self, params: &StakingParams) -> Option<Amount> {
        let stake = (params.max_num_services as u128)
            .checked_mul(params.min_staking_deposit)?
            .checked_mul(params.num_agent_instances as u128 + 1)?;
        let per_year = mul_div(self.max_apy, stake, APY_SCALE)?;
        Some(per_year / ONE_YEAR)
    }

    /// Largest total emissions an instance shaped like `params` may ever pay
    /// out: the APY-limited reward rate over the longest allowed period.
    pub fn emissions_amount_limit(&self, params: &StakingParams) -> Amount {
        self.max_rewards_per_second(params)
            .and_then(|rate| rate.checked_mul(self.max_emissions_duration as u128))
            .unwrap_or(Amount::MAX)
    }
}

impl Default for StakingLimits {
    fn default() -> Self {
        Self {
            min_deposit: 10_000 * APY_SCALE,
            max_emissions_duration: 365 * 24 * 3600,
            max_services: 100,
            max_apy: 5 * APY_SCALE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> StakingLimits {
        StakingLimits {
            min_deposit: 1_000,
            max_emissions_duration: 1_000,
            max_services: 10,
            // 100%
            max_apy: APY_SCALE,
        }
    }

    fn params() -> StakingParams {
        StakingParams {
            min_staking_deposit: 1_000,
            rewards_per_second: 1,
            time_for_emissions: 1_000,
            max_num_services: 10,
            num_agent_instances: 1,
        }
    }

    #[test]
    fn boundary_values_are_admitted() {
        // apy = ONE_YEAR * 1e18 / (10 * 1000 * 2) = 1576.8 * 1e18 > 1e18
        assert!(!limits().admits(&params()));

        let generous = StakingLimits {
            max_apy: 2_000 * APY_SCALE,
            ..limits()
        };
        assert!(generous.admits(&params()));
    }

    #[test]
    fn each_limit_is_an_upper_bound() {
        let generous = StakingLimits {
            max_apy: 2_000 * APY_SCALE,
            ..limits()
        };
        let over = [
            StakingParams {
                min_staking_deposit: 1_001,
                ..params()
            },
            StakingParams {
                time_for_emissions: 1_001,
                ..params()
            },
            StakingParams {
                max_num_services: 11,
                ..params()
            },
            StakingParams {
                rewards_per_second: 2,
                ..params()
            },
        ];
        for candidate in over {
            assert!(!generous.admits(&candidate), "{candidate:?} admitted");
        }
    }

    #[test]
    fn zero_params_are_rejected() {
        let generous = StakingLimits {
            max_apy: u128::MAX,
            ..limits()
        };
        let zero = StakingParams {
            num_agent_instances: 0,
            ..params()
        };
        assert!(!generous.admits(&zero));
    }

    #[test]
    fn emissions_limit_follows_apy_cap() {
        let limits = limits();
        // stake 20_000, apy cap 100% -> 20_000 per year -> 0 per second after flooring
        assert_eq!(limits.max_rewards_per_second(&params()), Some(0));

        let big = StakingParams {
            min_staking_deposit: 1_000 * ONE_YEAR,
            ..params()
        };
        // stake = 10 * 1000 * ONE_YEAR * 2 -> 20_000 per second
        assert_eq!(limits.max_rewards_per_second(&big), Some(20_000));
        assert_eq!(limits.emissions_amount_limit(&big), 20_000 * 1_000);
    }
}
