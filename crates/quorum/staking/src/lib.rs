//! Quorum Staking - admission control for staking instances
//!
//! - **StakingVerifier**: whitelist of staking implementations plus global
//!   upper limits on deposit, emissions duration, service count and APY
//! - **StakingFactory**: clones a deployed implementation, runs its
//!   initializer and admits the instance only if the verifier accepts both the
//!   implementation and the initialised parameters
//!
//! Limits are enforced at creation time only. Changing them never affects
//! instances that already exist, except through [`StakingFactory::verify_instance`],
//! which re-checks against the current limits.

#![deny(unsafe_code)]

pub mod error;
pub mod event;
pub mod factory;
pub mod limits;
pub mod params;
pub mod verifier;

pub use error::{Result, StakingError};
pub use event::StakingEvent;
pub use factory::{InstanceRecord, StakingFactory, StakingImplementation, StandardStaking};
pub use limits::StakingLimits;
pub use params::{StakingParams, APY_SCALE, ONE_YEAR};
pub use verifier::{InstanceVerifier, StakingVerifier};
