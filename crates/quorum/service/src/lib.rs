//! Quorum Service - service lifecycle and bond escrow
//!
//! A service is a set of agents, each with a number of instance slots and a
//! per-instance bond. This crate provides:
//!
//! - **ServiceState**: the explicit lifecycle transition table
//! - **ServiceRegistry**: creation, registration, deployment through a
//!   whitelisted multisig backend, termination, unbonding, slashing
//! - **Escrow**: the owner's security deposit plus operator bonds, held in the
//!   registry's account on the value ledger
//!
//! ```text
//! create → activate_registration → register_agents* → deploy
//!        → terminate → unbond* → (back to PreRegistration)
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod service;
pub mod state;

pub use error::{Result, ServiceError};
pub use registry::ServiceRegistry;
pub use service::{AgentInstance, AgentParams, Service, ServiceEvent};
pub use state::{ServiceState, Transition};
