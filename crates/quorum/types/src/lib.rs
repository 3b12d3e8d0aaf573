//! # quorum-types
//!
//! Primitive types shared by every Quorum registry:
//!
//! - **Identities**: `Address`, `ContentHash`, `UnitId`, `ServiceId`, `Amount`
//! - **Call context**: the authenticated caller plus attached value
//! - **Value transfer**: the `ValueLedger` primitive used for deposits, bonds
//!   and refunds
//! - **Ownership**: NFT-style owner/balance accounting for units and services
//! - **Reentrancy guard**: scoped lock held across external capability calls
//! - **Words**: fixed-width payload readers/writers for backend payloads
//!
//! Registries never interpret a `ContentHash`; it is an opaque digest with
//! equality.

#![deny(unsafe_code)]

pub mod context;
pub mod error;
pub mod guard;
pub mod ids;
pub mod ownership;
pub mod value;
pub mod words;

pub use context::CallContext;
pub use error::{Classify, ErrorKind, ParseIdError, TransferError};
pub use guard::{GuardToken, ReentrancyGuard};
pub use ids::{Address, AgentId, Amount, ComponentId, ContentHash, ServiceId, UnitId};
pub use ownership::OwnershipLedger;
pub use value::{InMemoryValueLedger, ValueLedger};
pub use words::WordError;
