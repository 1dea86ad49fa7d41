//! # cadence-oracle
//!
//! Time-weighted average price oracle over a two-asset liquidity venue.
//!
//! The venue publishes running integrals of price over time (cumulative
//! price accumulators). Once per epoch the oracle differences two
//! accumulator snapshots and divides by the elapsed time, giving an average
//! price per trading direction that a short-lived price spike cannot move
//! much. Reads scale the average by an input amount and normalize the result
//! to 18 decimals.
//!
//! ## Modules
//!
//! - [`fixed_point`]: UQ112x112 binary fixed-point numbers
//! - [`epoch`]: Catch-up-aware once-per-period gate
//! - [`clock`]: Wall-clock time sources
//! - [`source`]: Accumulator source and asset metadata interfaces
//! - [`pair`]: In-memory constant-product reference venue
//! - [`normalizer`]: Decimal normalization multipliers
//! - [`twap`]: The oracle itself

pub mod clock;
pub mod epoch;
pub mod fixed_point;
pub mod normalizer;
pub mod pair;
pub mod source;
pub mod twap;

pub use ethnum::U256;

use cadence_types::Address;

/// Error types for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The update gate is still closed for the current epoch.
    #[error("epoch not elapsed: now {now}, next epoch opens at {next_epoch_at}")]
    EpochNotElapsed {
        /// Time of the rejected attempt.
        now: u64,
        /// Earliest time the gate opens.
        next_epoch_at: u64,
    },

    /// Elapsed time was zero where the division is unconditional.
    #[error("division by zero")]
    DivisionByZero,

    /// Asset is not one of the two configured for this pair.
    #[error("unknown asset: {0}")]
    UnknownAsset(Address),

    /// Construction-time invariant violated.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The accumulator source or venue failed or rejected the request.
    #[error("price source fault: {0}")]
    Source(String),

    /// Venue reserve exceeds 112 bits.
    #[error("reserve overflow: {0} does not fit in 112 bits")]
    ReserveOverflow(u128),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
