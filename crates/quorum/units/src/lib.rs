//! Quorum Units - component and agent registries
//!
//! This crate provides the generic unit registry used twice:
//!
//! - **Component registry**: building blocks; components may depend on
//!   previously created components
//! - **Agent registry**: deployable agents; every agent depends on at least one
//!   component
//! - **RegistriesManager**: the manager role for both registries and the public
//!   write surface, enforcing hash uniqueness across both
//!
//! Units are never destroyed. Hash history is append-only, and every hash that
//! ever belonged to any unit stays reserved.

#![deny(unsafe_code)]

pub mod error;
pub mod manager;
pub mod registry;
pub mod unit;

pub use error::{Result, UnitError};
pub use manager::RegistriesManager;
pub use registry::{SupplyView, UnitDirectory, UnitRegistry};
pub use unit::{Unit, UnitKind, UnitRegistryEvent};
