//! Decimal normalization.
//!
//! A pair must hold exactly one 18-decimal asset and one 6-decimal asset.
//! Reading asset 0 yields an amount of asset 1 and vice versa, so each
//! asset's multiplier lifts the *other* asset's native precision to 18
//! decimals:
//!
//! ```text
//! multiplier(asset0) = 10^(18 - decimals(asset1))
//! multiplier(asset1) = 10^(18 - decimals(asset0))
//! ```

use cadence_types::NORMALIZED_DECIMALS;
use ethnum::U256;

use crate::{OracleError, Result};

/// Precision of the low-decimal asset in a supported pair.
pub const LOW_DECIMALS: u8 = 6;

/// Per-asset multipliers that bring query results to 18 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalNormalizer {
    multiplier0: U256,
    multiplier1: U256,
}

impl DecimalNormalizer {
    /// Build from the two assets' native precisions.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Configuration`] unless one asset has 18 decimals and
    ///   the other has 6
    pub fn new(decimals0: u8, decimals1: u8) -> Result<Self> {
        let valid = matches!(
            (decimals0, decimals1),
            (NORMALIZED_DECIMALS, LOW_DECIMALS) | (LOW_DECIMALS, NORMALIZED_DECIMALS)
        );
        if !valid {
            return Err(OracleError::Configuration(format!(
                "unsupported decimals ({decimals0}, {decimals1}): need one {NORMALIZED_DECIMALS}-decimal and one {LOW_DECIMALS}-decimal asset"
            )));
        }

        Ok(Self {
            multiplier0: pow10(NORMALIZED_DECIMALS - decimals1),
            multiplier1: pow10(NORMALIZED_DECIMALS - decimals0),
        })
    }

    /// Multiplier applied to results of querying asset 0.
    pub fn multiplier0(&self) -> U256 {
        self.multiplier0
    }

    /// Multiplier applied to results of querying asset 1.
    pub fn multiplier1(&self) -> U256 {
        self.multiplier1
    }
}

fn pow10(exp: u8) -> U256 {
    U256::new(10u128.pow(u32::from(exp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_then_eighteen() {
        let n = DecimalNormalizer::new(6, 18).expect("valid");
        assert_eq!(n.multiplier0(), U256::ONE);
        assert_eq!(n.multiplier1(), U256::new(1_000_000_000_000));
    }

    #[test]
    fn test_eighteen_then_six() {
        let n = DecimalNormalizer::new(18, 6).expect("valid");
        assert_eq!(n.multiplier0(), U256::new(1_000_000_000_000));
        assert_eq!(n.multiplier1(), U256::ONE);
    }

    #[test]
    fn test_rejects_other_pairings() {
        for (d0, d1) in [(18, 18), (6, 6), (8, 18), (18, 8), (0, 0), (6, 19)] {
            assert!(
                matches!(
                    DecimalNormalizer::new(d0, d1),
                    Err(OracleError::Configuration(_))
                ),
                "({d0}, {d1}) should be rejected"
            );
        }
    }
}
