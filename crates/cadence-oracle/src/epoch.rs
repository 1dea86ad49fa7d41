//! Once-per-period gate.
//!
//! The gate splits time into fixed windows starting at the construction
//! time. An operation may enter at most once per window. Entering after a
//! long gap moves the window start straight to the latest boundary at or
//! before the current time, so a caller cannot burn through missed windows
//! with back-to-back entries.

use crate::{OracleError, Result};

/// Gate state: period, epoch index and the start of the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochGate {
    period: u64,
    epoch: u64,
    epoch_start: u64,
}

impl EpochGate {
    /// Create a gate whose first window starts at `start`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] if `period` is zero
    pub fn new(period: u64, start: u64) -> Result<Self> {
        if period == 0 {
            return Err(OracleError::Configuration(
                "epoch period must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            period,
            epoch: 0,
            epoch_start: start,
        })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// Number of successful entries so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn epoch_start(&self) -> u64 {
        self.epoch_start
    }

    /// Earliest time the gate opens. Saturates instead of wrapping.
    pub fn next_epoch_at(&self) -> u64 {
        self.epoch_start.saturating_add(self.period)
    }

    /// Whether an entry at `now` would succeed: `now >= epoch_start + period`.
    pub fn can_enter(&self, now: u64) -> bool {
        now.checked_sub(self.epoch_start)
            .is_some_and(|since_start| since_start >= self.period)
    }

    /// Check the gate without consuming it.
    ///
    /// # Errors
    ///
    /// - [`OracleError::EpochNotElapsed`] if the gate is closed at `now`
    pub fn ensure_open(&self, now: u64) -> Result<()> {
        if !self.can_enter(now) {
            return Err(OracleError::EpochNotElapsed {
                now,
                next_epoch_at: self.next_epoch_at(),
            });
        }
        Ok(())
    }

    /// Consume the current window.
    ///
    /// Moves the window start to the last period boundary at or before
    /// `now` and increments the epoch index by one, however many windows
    /// were skipped.
    ///
    /// # Errors
    ///
    /// - [`OracleError::EpochNotElapsed`] if the gate is closed at `now`
    pub fn enter(&mut self, now: u64) -> Result<u64> {
        self.ensure_open(now)?;

        let windows = (now - self.epoch_start) / self.period;
        self.epoch_start += windows * self.period;
        self.epoch += 1;

        tracing::debug!(
            epoch = self.epoch,
            epoch_start = self.epoch_start,
            skipped = windows - 1,
            "epoch gate entered"
        );

        Ok(self.epoch)
    }
}
