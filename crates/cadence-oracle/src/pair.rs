//! In-memory constant-product reference venue.
//!
//! Keeps two reserves and, on every reserve change, first integrates the
//! prevailing spot price over the time since the previous change:
//!
//! ```text
//! price0_cumulative += (reserve1 / reserve0) * 2^112 * elapsed   (mod 2^256)
//! price1_cumulative += (reserve0 / reserve1) * 2^112 * elapsed   (mod 2^256)
//! ```
//!
//! Reads add the same accrual for the time since the last change without
//! storing it, so an observer always sees accumulators as of "now".

use std::sync::{Mutex, MutexGuard};

use cadence_types::Address;
use ethnum::U256;

use crate::clock::{observation_timestamp, Clock};
use crate::fixed_point::UQ112x112;
use crate::source::{AccumulatorSnapshot, CumulativePriceSource};
use crate::{OracleError, Result};

/// Largest reserve a venue can hold (2^112 - 1).
pub const MAX_RESERVE: u128 = (1u128 << 112) - 1;

/// Swap fee in basis points (0.3%).
pub const SWAP_FEE_BPS: u128 = 30;

const BPS: u128 = 10_000;

#[derive(Debug, Clone, Copy)]
struct PairState {
    reserve0: u128,
    reserve1: u128,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    timestamp_last: u32,
}

impl PairState {
    /// Integrate spot prices up to `now`.
    fn accrue(&mut self, now: u32) {
        let elapsed = now.wrapping_sub(self.timestamp_last);
        if elapsed > 0 && self.reserve0 != 0 && self.reserve1 != 0 {
            let elapsed = U256::new(u128::from(elapsed));
            // Reserves are non-zero, so neither ratio can fail.
            if let (Ok(price0), Ok(price1)) = (
                UQ112x112::from_ratio(self.reserve1, self.reserve0),
                UQ112x112::from_ratio(self.reserve0, self.reserve1),
            ) {
                self.price0_cumulative_last = self
                    .price0_cumulative_last
                    .wrapping_add(price0.raw().wrapping_mul(elapsed));
                self.price1_cumulative_last = self
                    .price1_cumulative_last
                    .wrapping_add(price1.raw().wrapping_mul(elapsed));
            }
        }
        self.timestamp_last = now;
    }

    fn snapshot(&self) -> AccumulatorSnapshot {
        AccumulatorSnapshot {
            price0_cumulative: self.price0_cumulative_last,
            price1_cumulative: self.price1_cumulative_last,
            timestamp: self.timestamp_last,
        }
    }
}

/// A two-asset x*y=k venue.
#[derive(Debug)]
pub struct ConstantProductPair<C: Clock> {
    asset0: Address,
    asset1: Address,
    clock: C,
    state: Mutex<PairState>,
}

impl<C: Clock> ConstantProductPair<C> {
    /// Open a venue with the given initial reserves.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] if both assets are the same
    /// - [`OracleError::ReserveOverflow`] if a reserve exceeds [`MAX_RESERVE`]
    pub fn new(
        asset0: Address,
        asset1: Address,
        reserve0: u128,
        reserve1: u128,
        clock: C,
    ) -> Result<Self> {
        if asset0 == asset1 {
            return Err(OracleError::Configuration(format!(
                "pair assets must differ, got {asset0} twice"
            )));
        }
        check_reserve(reserve0)?;
        check_reserve(reserve1)?;

        let timestamp_last = observation_timestamp(clock.now());
        tracing::info!(%asset0, %asset1, reserve0, reserve1, "constant-product pair opened");

        Ok(Self {
            asset0,
            asset1,
            clock,
            state: Mutex::new(PairState {
                reserve0,
                reserve1,
                price0_cumulative_last: U256::ZERO,
                price1_cumulative_last: U256::ZERO,
                timestamp_last,
            }),
        })
    }

    /// Force reserves to new values, accruing prices up to now first.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ReserveOverflow`] if a reserve exceeds [`MAX_RESERVE`]
    pub fn sync(&self, reserve0: u128, reserve1: u128) -> Result<()> {
        check_reserve(reserve0)?;
        check_reserve(reserve1)?;

        let now = observation_timestamp(self.clock.now());
        let mut state = self.lock()?;
        state.accrue(now);
        state.reserve0 = reserve0;
        state.reserve1 = reserve1;

        tracing::debug!(reserve0, reserve1, "pair synced");
        Ok(())
    }

    /// Sell `amount_in` of `asset_in` into the pool; returns the amount of
    /// the other asset paid out.
    ///
    /// # Errors
    ///
    /// - [`OracleError::UnknownAsset`] if `asset_in` is not in the pair
    /// - [`OracleError::Source`] if the amount is zero or the pool is empty
    /// - [`OracleError::ReserveOverflow`] if the input reserve would exceed
    ///   [`MAX_RESERVE`]
    pub fn swap_exact_in(&self, asset_in: &Address, amount_in: u128) -> Result<u128> {
        let zero_for_one = if *asset_in == self.asset0 {
            true
        } else if *asset_in == self.asset1 {
            false
        } else {
            return Err(OracleError::UnknownAsset(*asset_in));
        };
        if amount_in == 0 {
            return Err(OracleError::Source(
                "swap rejected: insufficient input amount".to_string(),
            ));
        }

        let now = observation_timestamp(self.clock.now());
        let mut state = self.lock()?;
        let (reserve_in, reserve_out) = if zero_for_one {
            (state.reserve0, state.reserve1)
        } else {
            (state.reserve1, state.reserve0)
        };
        if reserve_in == 0 || reserve_out == 0 {
            return Err(OracleError::Source(
                "swap rejected: insufficient liquidity".to_string(),
            ));
        }

        let new_reserve_in = reserve_in
            .checked_add(amount_in)
            .filter(|r| *r <= MAX_RESERVE)
            .ok_or(OracleError::ReserveOverflow(reserve_in.saturating_add(amount_in)))?;

        let amount_in_with_fee = U256::new(amount_in) * U256::new(BPS - SWAP_FEE_BPS);
        let numerator = amount_in_with_fee * U256::new(reserve_out);
        let denominator = U256::new(reserve_in) * U256::new(BPS) + amount_in_with_fee;
        // Always strictly below reserve_out, so it fits u128.
        let amount_out = (numerator / denominator).as_u128();

        state.accrue(now);
        if zero_for_one {
            state.reserve0 = new_reserve_in;
            state.reserve1 = reserve_out - amount_out;
        } else {
            state.reserve1 = new_reserve_in;
            state.reserve0 = reserve_out - amount_out;
        }

        tracing::debug!(%asset_in, amount_in, amount_out, "pair swap");
        Ok(amount_out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PairState>> {
        self.state
            .lock()
            .map_err(|_| OracleError::Source("pair state lock poisoned".to_string()))
    }
}

impl<C: Clock> CumulativePriceSource for ConstantProductPair<C> {
    fn assets(&self) -> (Address, Address) {
        (self.asset0, self.asset1)
    }

    fn reserves(&self) -> Result<(u128, u128)> {
        let state = self.lock()?;
        Ok((state.reserve0, state.reserve1))
    }

    fn current_cumulative_prices(&self) -> Result<AccumulatorSnapshot> {
        let now = observation_timestamp(self.clock.now());
        let mut counterfactual = *self.lock()?;
        counterfactual.accrue(now);
        Ok(counterfactual.snapshot())
    }
}

fn check_reserve(reserve: u128) -> Result<()> {
    if reserve > MAX_RESERVE {
        return Err(OracleError::ReserveOverflow(reserve));
    }
    Ok(())
}
