//! Quorum Multisig - joint-custody wallet backends
//!
//! A service's registered agent instances jointly control one wallet. The
//! service registry never creates that wallet itself; it calls a whitelisted
//! [`MultisigBackend`]:
//!
//! - **FreshDeployBackend**: deploys a new wallet, optionally running a setup
//!   call encoded in the payload
//! - **SameAddressBackend**: re-verifies that an existing wallet already has the
//!   requested owners and threshold and returns its address unchanged
//! - **RecoveryModuleBackend**: fresh deploy with a recovery module enabled,
//!   guarded against re-entry from setup code
//!
//! Wallets live in a [`WalletHost`], the in-process model of the external
//! wallet infrastructure.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod fresh;
pub mod payload;
pub mod recovery;
pub mod same_address;
pub mod wallet;

pub use backend::{validate_owner_set, MultisigBackend};
pub use error::{MultisigError, Result};
pub use fresh::FreshDeployBackend;
pub use payload::{FreshDeployPayload, SameAddressPayload};
pub use recovery::{RecoveryModule, RecoveryModuleBackend, ServiceDirectory};
pub use same_address::SameAddressBackend;
pub use wallet::{DeployRequest, SetupCall, SetupHandler, Wallet, WalletHost};
