//! Quorum Node - configuration and wiring for the registries
//!
//! - **config**: layered `QuorumConfig` (defaults, file, `QUORUM_` environment)
//! - **telemetry**: tracing subscriber initialisation
//! - **protocol**: a `Protocol` value owning every registry, backend and the
//!   staking factory, assembled from configuration
//!
//! # Example
//!
//! ```
//! use quorum_node::{Protocol, QuorumConfig};
//! use quorum_types::Address;
//!
//! let protocol = Protocol::from_config(&QuorumConfig::default(), Address::from_label("dao"))?;
//! assert_eq!(protocol.services.total_supply(), 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod protocol;
pub mod telemetry;

pub use config::{LoggingConfig, QuorumConfig, ServiceConfig, StakingConfig, UnitsConfig, TOKEN};
pub use protocol::{system_address, BackendKind, Protocol};
pub use telemetry::init_tracing;
