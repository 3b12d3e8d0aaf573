//! Staking parameters and the initializer payload
//!
//! ```text
//! selector(4) | min_staking_deposit(32) | rewards_per_second(32)
//!   | time_for_emissions(32) | max_num_services(32) | num_agent_instances(32)
//! ```

use quorum_types::words::{self, WORD};
use quorum_types::{Amount, WordError};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};

/// Seconds in a (365-day) year.
pub const ONE_YEAR: u128 = 365 * 24 * 60 * 60;

/// Fixed-point scale of APY values (1e18 = 100%).
pub const APY_SCALE: u128 = 1_000_000_000_000_000_000;

/// Length of the initializer selector.
pub const SELECTOR_LEN: usize = 4;

const NUM_FIELDS: usize = 5;

/// Economic parameters a staking instance is initialised with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    pub min_staking_deposit: Amount,
    pub rewards_per_second: Amount,
    /// Seconds rewards are emitted for.
    pub time_for_emissions: u64,
    pub max_num_services: u32,
    pub num_agent_instances: u32,
}

impl StakingParams {
    /// Selector of the standard initializer.
    pub fn init_selector() -> [u8; SELECTOR_LEN] {
        let digest = blake3::hash(b"initialize(StakingParams)");
        let mut selector = [0u8; SELECTOR_LEN];
        selector.copy_from_slice(&digest.as_bytes()[..SELECTOR_LEN]);
        selector
    }

    /// Initializer payload for these parameters.
    pub fn encode_init(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SELECTOR_LEN + NUM_FIELDS * WORD);
        buf.extend_from_slice(&Self::init_selector());
        words::push_u128(&mut buf, self.min_staking_deposit);
        words::push_u128(&mut buf, self.rewards_per_second);
        words::push_u128(&mut buf, self.time_for_emissions as u128);
        words::push_u128(&mut buf, self.max_num_services as u128);
        words::push_u128(&mut buf, self.num_agent_instances as u128);
        buf
    }

    pub fn decode_init(data: &[u8]) -> Result<Self> {
        let expected = SELECTOR_LEN + NUM_FIELDS * WORD;
        if data.len() != expected {
            return Err(StakingError::IncorrectDataLength {
                provided: data.len(),
                expected,
            });
        }
        if data[..SELECTOR_LEN] != Self::init_selector() {
            return Err(StakingError::UnknownSelector);
        }

        let field = |i: usize| words::read_u128(data, SELECTOR_LEN + i * WORD);
        let narrow = |i: usize, value: u128| -> std::result::Result<u64, WordError> {
            u64::try_from(value).map_err(|_| WordError::Overflow(SELECTOR_LEN + i * WORD))
        };

        Ok(Self {
            min_staking_deposit: field(0)?,
            rewards_per_second: field(1)?,
            time_for_emissions: narrow(2, field(2)?)?,
            max_num_services: u32::try_from(narrow(3, field(3)?)?)
                .map_err(|_| WordError::Overflow(SELECTOR_LEN + 3 * WORD))?,
            num_agent_instances: u32::try_from(narrow(4, field(4)?)?)
                .map_err(|_| WordError::Overflow(SELECTOR_LEN + 4 * WORD))?,
        })
    }

    /// True if any field is zero.
    pub fn has_zero_field(&self) -> bool {
        self.min_staking_deposit == 0
            || self.rewards_per_second == 0
            || self.time_for_emissions == 0
            || self.max_num_services == 0
            || self.num_agent_instances == 0
    }

    /// Annual yield at full capacity, scaled by [`APY_SCALE`]:
    /// `rewards_per_second * ONE_YEAR * 1e18 / (max_num_services * min_staking_deposit * (num_agent_instances + 1))`.
    ///
    /// `None` if the denominator is zero or a value overflows.
    pub fn apy(&self) -> Option<u128> {
        let stake = (self.max_num_services as u128)
            .checked_mul(self.min_staking_deposit)?
            .checked_mul(self.num_agent_instances as u128 + 1)?;
        let yearly = self.rewards_per_second.checked_mul(ONE_YEAR)?;
        mul_div(yearly, APY_SCALE, stake)
    }

    /// Total rewards over the emissions period.
    pub fn emissions_amount(&self) -> Option<Amount> {
        self.rewards_per_second
            .checked_mul(self.time_for_emissions as u128)
    }
}

/// `a * b / d` with a 256-bit intermediate. `None` on division by zero or if
/// the quotient does not fit `u128`.
pub(crate) fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (hi, lo) = widening_mul(a, b);
    if hi >= d {
        return None;
    }

    let mut rem = hi;
    let mut quot: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quot <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1;
        }
    }
    Some(quot)
}

fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}
