//! # cadence-sentry
//!
//! Allow-list gate consulted before arbitrary actions.
//!
//! An account may act iff it is not on the sanctions list (when one is
//! configured) and every registered strategy allows it. Only holders of the
//! admin role may change the strategy set, the sanctions list or the role
//! itself; every mutating call names its caller and is checked first.
//!
//! ## Modules
//!
//! - [`roles`]: admin role membership
//! - [`strategy`]: strategy and sanctions interfaces, list-backed implementations
//! - [`sentry`]: the bounded strategy registry

pub mod roles;
pub mod sentry;
pub mod strategy;

pub use sentry::{Sentry, SentryEvent};

use cadence_types::Address;

/// Error types for sentry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SentryError {
    /// Caller does not hold the admin role.
    #[error("unauthorized: {0} is not an admin")]
    Unauthorized(Address),

    /// The strategy registry is full.
    #[error("strategy capacity reached: maximum is {max}")]
    CapacityReached {
        /// Maximum number of strategies.
        max: usize,
    },

    /// Strategy already registered.
    #[error("strategy already registered: {0}")]
    DuplicateStrategy(Address),

    /// Strategy is not registered.
    #[error("strategy not found: {0}")]
    StrategyNotFound(Address),

    /// Account already holds the admin role.
    #[error("admin role already granted to {0}")]
    AdminAlreadyGranted(Address),

    /// Account does not hold the admin role.
    #[error("admin role not held by {0}")]
    AdminNotFound(Address),

    /// A strategy's internal state could not be read.
    #[error("strategy state unavailable: {0}")]
    StrategyState(String),
}

/// Convenience result type for sentry operations.
pub type Result<T> = std::result::Result<T, SentryError>;
