//! The TWAP oracle.
//!
//! An oracle is bound to one venue pair and one update period. Its state is
//! a single [`Observation`]: the accumulator snapshot taken at the last
//! update plus the average price per direction derived from it. Only
//! [`TwapOracle::update`] replaces the observation, and it does so in one
//! assignment, so readers never see a new snapshot paired with old averages.
//!
//! ```text
//! average = (cumulative_now - cumulative_last) / (t_now - t_last)
//! consult(asset, amount) = trunc(average[asset] * amount) * multiplier[asset]
//! ```
//!
//! Averages read as zero until the first update.

use cadence_types::events::{Event, EventType};
use cadence_types::Address;
use ethnum::U256;

use crate::clock::Clock;
use crate::epoch::EpochGate;
use crate::fixed_point::UQ112x112;
use crate::normalizer::DecimalNormalizer;
use crate::source::{AccumulatorSnapshot, AssetMetadata, CumulativePriceSource};
use crate::{OracleError, Result};

/// Everything the oracle knows about the last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    pub snapshot: AccumulatorSnapshot,
    /// Price of asset 0 in asset 1 units.
    pub price0_average: UQ112x112,
    /// Price of asset 1 in asset 0 units.
    pub price1_average: UQ112x112,
}

/// Notification produced by a successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceUpdated {
    pub epoch: u64,
    pub price0_cumulative: U256,
    pub price1_cumulative: U256,
    pub timestamp: u32,
    pub time_elapsed: u32,
}

impl PriceUpdated {
    /// Render as an `Updated` notification event.
    pub fn to_event(&self, now: u64) -> Event {
        Event::new(
            EventType::Updated,
            now,
            serde_json::json!({
                "epoch": self.epoch,
                "price0_cumulative": self.price0_cumulative.to_string(),
                "price1_cumulative": self.price1_cumulative.to_string(),
                "timestamp": self.timestamp,
                "time_elapsed": self.time_elapsed,
            }),
        )
    }
}

/// Result of a gated update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New averages were stored.
    Updated(PriceUpdated),
    /// No time had passed on the venue. The epoch was still consumed.
    Unchanged { epoch: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ZeroToOne,
    OneToZero,
}

/// Time-weighted average price oracle for one venue pair.
pub struct TwapOracle<S, C> {
    source: S,
    clock: C,
    asset0: Address,
    asset1: Address,
    normalizer: DecimalNormalizer,
    gate: EpochGate,
    observation: Observation,
}

impl<S: CumulativePriceSource, C: Clock> TwapOracle<S, C> {
    /// Bind an oracle to `source` with the given update period in seconds.
    ///
    /// Takes the first accumulator snapshot immediately; the first epoch
    /// opens one period after the clock's current time.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] if the pair has an empty reserve, the
    ///   decimals are not one 18 and one 6, metadata is missing, or `period`
    ///   is zero
    /// - [`OracleError::Source`] if the venue cannot be read
    pub fn new<M: AssetMetadata + ?Sized>(
        source: S,
        metadata: &M,
        clock: C,
        period: u64,
    ) -> Result<Self> {
        let (asset0, asset1) = source.assets();
        let normalizer =
            DecimalNormalizer::new(metadata.decimals(&asset0)?, metadata.decimals(&asset1)?)?;

        let (reserve0, reserve1) = source.reserves()?;
        if reserve0 == 0 || reserve1 == 0 {
            return Err(OracleError::Configuration(format!(
                "no reserves: ({reserve0}, {reserve1})"
            )));
        }

        let snapshot = source.current_cumulative_prices()?;
        let gate = EpochGate::new(period, clock.now())?;

        tracing::info!(
            %asset0,
            %asset1,
            period,
            timestamp = snapshot.timestamp,
            "twap oracle created"
        );

        Ok(Self {
            source,
            clock,
            asset0,
            asset1,
            normalizer,
            gate,
            observation: Observation {
                snapshot,
                ..Observation::default()
            },
        })
    }

    /// Recompute the averages, at most once per epoch.
    ///
    /// The gate is checked before the venue is read and consumed only after
    /// the read succeeded. If no time passed on the venue since the last
    /// snapshot, the epoch is consumed and nothing else changes.
    ///
    /// # Errors
    ///
    /// - [`OracleError::EpochNotElapsed`] if the current epoch was already used
    /// - [`OracleError::Source`] if the venue cannot be read; the epoch is
    ///   not consumed
    pub fn update(&mut self) -> Result<UpdateOutcome> {
        let now = self.clock.now();
        if let Err(err) = self.gate.ensure_open(now) {
            tracing::warn!(now, next_epoch_at = self.gate.next_epoch_at(), "update rejected");
            return Err(err);
        }

        let current = self.source.current_cumulative_prices()?;
        let epoch = self.gate.enter(now)?;

        let last = self.observation.snapshot;
        let time_elapsed = current.elapsed_since(&last);
        if time_elapsed == 0 {
            tracing::debug!(epoch, "no time elapsed on venue, averages kept");
            return Ok(UpdateOutcome::Unchanged { epoch });
        }

        let (delta0, delta1) = current.deltas_since(&last);
        self.observation = Observation {
            snapshot: current,
            price0_average: UQ112x112::from_truncated_ratio(delta0, time_elapsed)?,
            price1_average: UQ112x112::from_truncated_ratio(delta1, time_elapsed)?,
        };

        tracing::info!(
            epoch,
            time_elapsed,
            price0_average = %self.observation.price0_average,
            price1_average = %self.observation.price1_average,
            "twap updated"
        );

        Ok(UpdateOutcome::Updated(PriceUpdated {
            epoch,
            price0_cumulative: current.price0_cumulative,
            price1_cumulative: current.price1_cumulative,
            timestamp: current.timestamp,
            time_elapsed,
        }))
    }

    /// Value `amount_in` of `asset` at the stored average, in 18 decimals.
    ///
    /// Returns zero before the first update.
    ///
    /// # Errors
    ///
    /// - [`OracleError::UnknownAsset`] if `asset` is not in the pair
    pub fn consult(&self, asset: &Address, amount_in: U256) -> Result<U256> {
        let average = match self.direction(asset)? {
            Direction::ZeroToOne => self.observation.price0_average,
            Direction::OneToZero => self.observation.price1_average,
        };
        Ok(self.normalize(asset, average.mul_truncate(amount_in)))
    }

    /// Value `amount_in` of `asset` at a live average, in 18 decimals.
    ///
    /// The average runs from the stored snapshot to the venue's current
    /// accumulators. There is no zero-time guard: querying in the same
    /// second as the stored snapshot fails, which callers can read as "the
    /// stored average is fresh" or "no update has happened yet".
    ///
    /// # Errors
    ///
    /// - [`OracleError::UnknownAsset`] if `asset` is not in the pair
    /// - [`OracleError::DivisionByZero`] if no time elapsed since the stored
    ///   snapshot
    /// - [`OracleError::Source`] if the venue cannot be read
    pub fn twap(&self, asset: &Address, amount_in: U256) -> Result<U256> {
        let direction = self.direction(asset)?;
        let current = self.source.current_cumulative_prices()?;
        let last = &self.observation.snapshot;

        let time_elapsed = current.elapsed_since(last);
        let (delta0, delta1) = current.deltas_since(last);
        let delta = match direction {
            Direction::ZeroToOne => delta0,
            Direction::OneToZero => delta1,
        };
        let average = UQ112x112::from_truncated_ratio(delta, time_elapsed)?;

        tracing::debug!(%asset, time_elapsed, %average, "live twap");
        Ok(self.normalize(asset, average.mul_truncate(amount_in)))
    }

    /// Whether [`update`](Self::update) would pass the epoch gate now.
    pub fn can_update(&self) -> bool {
        self.gate.can_enter(self.clock.now())
    }

    /// `(asset0, asset1)`, in direction order.
    pub fn assets(&self) -> (Address, Address) {
        (self.asset0, self.asset1)
    }

    pub fn period(&self) -> u64 {
        self.gate.period()
    }

    /// Number of epochs consumed so far.
    pub fn epoch(&self) -> u64 {
        self.gate.epoch()
    }

    pub fn epoch_start(&self) -> u64 {
        self.gate.epoch_start()
    }

    pub fn next_epoch_at(&self) -> u64 {
        self.gate.next_epoch_at()
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn last_snapshot(&self) -> &AccumulatorSnapshot {
        &self.observation.snapshot
    }

    pub fn price0_average(&self) -> UQ112x112 {
        self.observation.price0_average
    }

    pub fn price1_average(&self) -> UQ112x112 {
        self.observation.price1_average
    }

    pub fn normalizer(&self) -> &DecimalNormalizer {
        &self.normalizer
    }

    fn direction(&self, asset: &Address) -> Result<Direction> {
        if *asset == self.asset0 {
            Ok(Direction::ZeroToOne)
        } else if *asset == self.asset1 {
            Ok(Direction::OneToZero)
        } else {
            Err(OracleError::UnknownAsset(*asset))
        }
    }

    /// `amount` is below 2^144 and the multiplier at most 10^12, so the
    /// product stays far below 2^256.
    fn normalize(&self, asset: &Address, amount: U256) -> U256 {
        let multiplier = if *asset == self.asset0 {
            self.normalizer.multiplier0()
        } else {
            self.normalizer.multiplier1()
        };
        amount * multiplier
    }
}

impl<S, C> std::fmt::Debug for TwapOracle<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwapOracle")
            .field("asset0", &self.asset0)
            .field("asset1", &self.asset1)
            .field("normalizer", &self.normalizer)
            .field("gate", &self.gate)
            .field("observation", &self.observation)
            .finish()
    }
}
