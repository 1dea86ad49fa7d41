//! UQ112x112 binary fixed-point numbers.
//!
//! A value is stored as an unsigned integer `x` meaning `x / 2^112`. The
//! integer is confined to 224 bits: anything above is dropped, never
//! reported. Accumulators on the venue side wrap the same way, so a
//! difference of two wrapped accumulators taken with modular subtraction is
//! still exact as long as less than one full wrap happened in between.
//!
//! ```text
//! from_ratio(n, d)           = (n << 112) / d          mod 2^224
//! from_truncated_ratio(n, t) = n / t                   mod 2^224
//! mul_truncate(x, y)         = ((x * y) mod 2^256) >> 112   mod 2^144
//! ```

use std::fmt;

use ethnum::U256;

use crate::{OracleError, Result};

/// Number of fractional bits.
pub const RESOLUTION: u32 = 112;

/// `2^112`, the fixed-point representation of 1.
pub const Q112: U256 = U256::from_words(0, 1u128 << RESOLUTION);

/// Mask keeping the low 224 bits.
pub const MASK_224: U256 = U256::from_words(u128::MAX >> 32, u128::MAX);

/// Mask keeping the low 144 bits.
pub const MASK_144: U256 = U256::from_words(u16::MAX as u128, u128::MAX);

/// An unsigned Q112.112 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct UQ112x112(U256);

impl UQ112x112 {
    /// Zero. Also the value of an average that has never been computed.
    pub const ZERO: UQ112x112 = UQ112x112(U256::ZERO);

    /// One.
    pub const ONE: UQ112x112 = UQ112x112(Q112);

    /// Wrap a raw `value * 2^112` magnitude, truncating to 224 bits.
    pub fn from_raw(raw: U256) -> Self {
        UQ112x112(raw & MASK_224)
    }

    /// The raw `value * 2^112` magnitude.
    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U256::ZERO
    }

    /// `numerator / denominator` as a fixed-point number.
    ///
    /// # Errors
    ///
    /// - [`OracleError::DivisionByZero`] if `denominator` is zero
    pub fn from_ratio(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(OracleError::DivisionByZero);
        }
        // numerator < 2^128, so the shift stays below 2^240
        let shifted = U256::new(numerator) << RESOLUTION;
        Ok(Self::from_raw(shifted / U256::new(denominator)))
    }

    /// Divide an already-scaled magnitude by an elapsed time.
    ///
    /// `numerator` is a difference of cumulative accumulators, which are
    /// themselves in `price * 2^112 * seconds` units, so no shift is applied.
    /// The quotient is cast down to 224 bits.
    ///
    /// # Errors
    ///
    /// - [`OracleError::DivisionByZero`] if `time_elapsed` is zero
    pub fn from_truncated_ratio(numerator: U256, time_elapsed: u32) -> Result<Self> {
        if time_elapsed == 0 {
            return Err(OracleError::DivisionByZero);
        }
        Ok(Self::from_raw(numerator / U256::new(u128::from(time_elapsed))))
    }

    /// Multiply by an integer amount and keep the integer part.
    ///
    /// The product wraps at 256 bits, the fractional bits are shifted out and
    /// the result is cut to 144 bits. Always rounds down.
    pub fn mul_truncate(&self, amount: U256) -> U256 {
        (self.0.wrapping_mul(amount) >> RESOLUTION) & MASK_144
    }

    /// The integer part.
    pub fn decode(&self) -> U256 {
        self.0 >> RESOLUTION
    }
}

impl fmt::Debug for UQ112x112 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UQ112x112({})", self.0)
    }
}

impl fmt::Display for UQ112x112 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
