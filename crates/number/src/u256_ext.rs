//! Extension trait for U256 arithmetic operations.

use alloy::primitives::U256;

/// Denominator of a basis point fraction.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Extension trait for U256 to add utility methods.
pub trait U256Ext: Sized {
    /// Ceiling division: (self + other - 1) / other
    fn checked_ceil_div(&self, other: &Self) -> Option<Self>;

    /// Scales `self` by `factor_bps / 10000`, rounding down.
    fn checked_mul_bps_floor(&self, factor_bps: u64) -> Option<Self>;

    /// Scales `self` by `factor_bps / 10000`, rounding up.
    fn checked_mul_bps_ceil(&self, factor_bps: u64) -> Option<Self>;
}

impl U256Ext for U256 {
    fn checked_ceil_div(&self, other: &Self) -> Option<Self> {
        self.checked_add(other.checked_sub(U256::from(1u64))?)?
            .checked_div(*other)
    }

    fn checked_mul_bps_floor(&self, factor_bps: u64) -> Option<Self> {
        self.checked_mul(U256::from(factor_bps))?
            .checked_div(U256::from(BPS_DENOMINATOR))
    }

    fn checked_mul_bps_ceil(&self, factor_bps: u64) -> Option<Self> {
        self.checked_mul(U256::from(factor_bps))?
            .checked_ceil_div(&U256::from(BPS_DENOMINATOR))
    }
}
