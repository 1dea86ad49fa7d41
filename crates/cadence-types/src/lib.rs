//! # cadence-types
//!
//! Shared domain types used across the cadence workspace.

pub mod address;
pub mod events;

pub use address::Address;

/// Decimal precision every externally reported amount is expressed in.
pub const NORMALIZED_DECIMALS: u8 = 18;

/// Default oracle update period in seconds (24 hours).
pub const DEFAULT_PERIOD_SECS: u64 = 86400;

/// Maximum number of strategies a sentry may consult.
pub const MAX_SENTRY_STRATEGIES: usize = 10;

/// Error types for parsing shared domain values.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Address string is not 20 hex-encoded bytes.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Convenience result type for shared type parsing.
pub type Result<T> = std::result::Result<T, TypesError>;
