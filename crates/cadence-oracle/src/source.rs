//! Interfaces the oracle consumes, plus a manually driven source.
//!
//! - [`CumulativePriceSource`]: the venue's running price integrals, read on
//!   every update and live query
//! - [`AssetMetadata`]: decimal precision per asset, read once at
//!   construction
//!
//! [`FixedPriceSource`] answers with whatever values were last set on it and
//! is used for dry runs and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cadence_types::Address;
use ethnum::U256;

use crate::{OracleError, Result};

/// One reading of the venue's cumulative price accumulators.
///
/// `price0_cumulative` integrates the price of asset 0 in units of asset 1
/// over time (UQ112x112 seconds); `price1_cumulative` the reverse. Both
/// wrap at 2^256 and the timestamp wraps at 2^32, so deltas between two
/// snapshots must be taken with modular subtraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccumulatorSnapshot {
    pub price0_cumulative: U256,
    pub price1_cumulative: U256,
    pub timestamp: u32,
}

impl AccumulatorSnapshot {
    /// Seconds between `earlier` and `self`, modulo 2^32.
    pub fn elapsed_since(&self, earlier: &AccumulatorSnapshot) -> u32 {
        self.timestamp.wrapping_sub(earlier.timestamp)
    }

    /// Accumulator growth per direction since `earlier`, modulo 2^256.
    pub fn deltas_since(&self, earlier: &AccumulatorSnapshot) -> (U256, U256) {
        (
            self.price0_cumulative
                .wrapping_sub(earlier.price0_cumulative),
            self.price1_cumulative
                .wrapping_sub(earlier.price1_cumulative),
        )
    }
}

/// A venue exposing cumulative price accumulators for one asset pair.
///
/// Reads are synchronous and must not change the oracle's state. A venue
/// that cannot answer reports [`OracleError::Source`]; the oracle surfaces it
/// and never retries.
pub trait CumulativePriceSource: Send + Sync {
    /// The pair's assets in direction order: `(asset0, asset1)`.
    fn assets(&self) -> (Address, Address);

    /// Current reserves `(reserve0, reserve1)`.
    fn reserves(&self) -> Result<(u128, u128)>;

    /// Accumulators as of the current time.
    fn current_cumulative_prices(&self) -> Result<AccumulatorSnapshot>;
}

impl<S: CumulativePriceSource + ?Sized> CumulativePriceSource for Arc<S> {
    fn assets(&self) -> (Address, Address) {
        (**self).assets()
    }

    fn reserves(&self) -> Result<(u128, u128)> {
        (**self).reserves()
    }

    fn current_cumulative_prices(&self) -> Result<AccumulatorSnapshot> {
        (**self).current_cumulative_prices()
    }
}

/// Decimal precision lookup, consulted once when an oracle is built.
pub trait AssetMetadata {
    fn decimals(&self, asset: &Address) -> Result<u8>;
}

impl AssetMetadata for HashMap<Address, u8> {
    fn decimals(&self, asset: &Address) -> Result<u8> {
        self.get(asset)
            .copied()
            .ok_or_else(|| OracleError::Configuration(format!("no decimals known for {asset}")))
    }
}

#[derive(Debug, Clone, Copy)]
struct FixedState {
    snapshot: AccumulatorSnapshot,
    reserves: (u128, u128),
}

/// A source that reports values set by hand.
#[derive(Debug)]
pub struct FixedPriceSource {
    assets: (Address, Address),
    state: Mutex<FixedState>,
}

impl FixedPriceSource {
    /// Create a source with zero accumulators at timestamp `timestamp`.
    pub fn new(asset0: Address, asset1: Address, reserves: (u128, u128), timestamp: u32) -> Self {
        Self {
            assets: (asset0, asset1),
            state: Mutex::new(FixedState {
                snapshot: AccumulatorSnapshot {
                    timestamp,
                    ..AccumulatorSnapshot::default()
                },
                reserves,
            }),
        }
    }

    /// Replace the reported accumulators and timestamp.
    pub fn set_cumulative(
        &self,
        price0_cumulative: U256,
        price1_cumulative: U256,
        timestamp: u32,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state.snapshot = AccumulatorSnapshot {
            price0_cumulative,
            price1_cumulative,
            timestamp,
        };
        Ok(())
    }

    /// Replace the reported reserves.
    pub fn set_reserves(&self, reserve0: u128, reserve1: u128) -> Result<()> {
        self.lock()?.reserves = (reserve0, reserve1);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FixedState>> {
        self.state
            .lock()
            .map_err(|_| OracleError::Source("fixed source lock poisoned".to_string()))
    }
}

impl CumulativePriceSource for FixedPriceSource {
    fn assets(&self) -> (Address, Address) {
        self.assets
    }

    fn reserves(&self) -> Result<(u128, u128)> {
        Ok(self.lock()?.reserves)
    }

    fn current_cumulative_prices(&self) -> Result<AccumulatorSnapshot> {
        Ok(self.lock()?.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_wraps() {
        let earlier = AccumulatorSnapshot {
            timestamp: u32::MAX - 9,
            ..Default::default()
        };
        let later = AccumulatorSnapshot {
            timestamp: 10,
            ..Default::default()
        };
        assert_eq!(later.elapsed_since(&earlier), 20);
    }

    #[test]
    fn test_deltas_wrap() {
        let earlier = AccumulatorSnapshot {
            price0_cumulative: U256::MAX - U256::new(4),
            price1_cumulative: U256::new(100),
            timestamp: 0,
        };
        let later = AccumulatorSnapshot {
            price0_cumulative: U256::new(5),
            price1_cumulative: U256::new(150),
            timestamp: 1,
        };
        let (d0, d1) = later.deltas_since(&earlier);
        assert_eq!(d0, U256::new(10));
        assert_eq!(d1, U256::new(50));
    }

    #[test]
    fn test_metadata_map() {
        let mut meta = HashMap::new();
        meta.insert(Address::repeat(1), 6u8);
        assert_eq!(meta.decimals(&Address::repeat(1)).expect("known"), 6);
        assert!(matches!(
            meta.decimals(&Address::repeat(2)),
            Err(OracleError::Configuration(_))
        ));
    }

    #[test]
    fn test_fixed_source_reports_what_was_set() {
        let source = FixedPriceSource::new(Address::repeat(1), Address::repeat(2), (10, 20), 7);
        let snap = source.current_cumulative_prices().expect("read");
        assert_eq!(snap.timestamp, 7);
        assert_eq!(snap.price0_cumulative, U256::ZERO);

        source
            .set_cumulative(U256::new(3), U256::new(4), 9)
            .expect("set");
        source.set_reserves(1, 2).expect("set");
        let snap = source.current_cumulative_prices().expect("read");
        assert_eq!(snap.price0_cumulative, U256::new(3));
        assert_eq!(snap.price1_cumulative, U256::new(4));
        assert_eq!(snap.timestamp, 9);
        assert_eq!(source.reserves().expect("read"), (1, 2));
    }

    #[test]
    fn test_arc_source_delegates() {
        let source = Arc::new(FixedPriceSource::new(
            Address::repeat(1),
            Address::repeat(2),
            (10, 20),
            0,
        ));
        let shared: Arc<dyn CumulativePriceSource> = source.clone();
        assert_eq!(shared.assets(), (Address::repeat(1), Address::repeat(2)));
        assert_eq!(shared.reserves().expect("read"), (10, 20));
    }
}
