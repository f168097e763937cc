//! # Money Module
//!
//! Integer money for prices, document totals and customer spend.
//!
//! ## Spend Deltas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer lifetime spend is maintained incrementally:                   │
//! │                                                                         │
//! │    spend += new_total - old_total                                       │
//! │                                                                         │
//! │  A receipt edited a hundred times must land on the same figure as one   │
//! │  issued once, so amounts stay in whole cents end to end:                │
//! │    49999 - 49999 + 49999  →  49999                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price = Money::from_cents(1250); // 12.50
//! let line = price.multiply_quantity(3); // 37.50
//! assert_eq!(line.cents(), 3750);
//! assert_eq!(line.display_with("MUR"), "MUR 37.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::types::TaxRate;

/// Amount in cents. Signed: spend deltas and retractions go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Unit price times quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Amount left after a whole-document discount of `discount_bps`
    /// (1000 = 10%). The discount itself is rounded half-up.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(20000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 18000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        let discount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money(self.0 - discount as i64)
    }

    /// Tax added on top of a tax-exclusive amount, rounded half-up.
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax as i64)
    }

    /// VAT contained in a VAT-inclusive amount.
    ///
    /// ```text
    /// gross = net × (1 + r)
    /// vat   = gross × bps / (10000 + bps)
    ///
    /// gross 115.00 @ 15%  →  vat 15.00, net 100.00
    /// ```
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    /// use stockroom_core::types::TaxRate;
    ///
    /// let gross = Money::from_cents(11500);
    /// assert_eq!(gross.included_tax(TaxRate::from_bps(1500)).cents(), 1500);
    /// ```
    pub fn included_tax(&self, rate: TaxRate) -> Money {
        let divisor = 10000i128 + rate.bps() as i128;
        let numerator = self.0 as i128 * rate.bps() as i128;
        // half-up on magnitude, sign restored afterwards
        let magnitude = (numerator.abs() + divisor / 2) / divisor;
        let signed = if numerator < 0 { -magnitude } else { magnitude };
        Money(signed as i64)
    }

    /// `MUR 12.50`
    pub fn display_with(&self, currency: &str) -> String {
        format!("{} {}", currency, self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1250).to_string(), "12.50");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert_eq!(Money::zero().display_with("MUR"), "MUR 0.00");
    }

    #[test]
    fn test_spend_delta_arithmetic() {
        let old_total = Money::from_cents(49999);
        let new_total = Money::from_cents(30000);
        let mut spend = old_total;
        spend += new_total - old_total;
        assert_eq!(spend, new_total);

        let lines: Money = [1000, 250, 250].into_iter().map(Money::from_cents).sum();
        assert_eq!(lines.cents(), 1500);
        assert_eq!(Money::from_cents(3999).multiply_quantity(3).cents(), 11997);
    }

    #[test]
    fn test_included_vat_at_fifteen_percent() {
        let rate = TaxRate::from_bps(1500);
        assert_eq!(Money::from_cents(11500).included_tax(rate).cents(), 1500);
        // 100.00 gross → 13.0434... → 13.04
        assert_eq!(Money::from_cents(10000).included_tax(rate).cents(), 1304);
        assert_eq!(Money::from_cents(-11500).included_tax(rate).cents(), -1500);
        assert!(Money::from_cents(999).included_tax(TaxRate::zero()).is_zero());

        // round trip: net + tax on top, then extracted again
        let net = Money::from_cents(10000);
        let gross = net + net.calculate_tax(rate);
        assert_eq!(gross.cents(), 11500);
        assert_eq!(gross.included_tax(rate), net.calculate_tax(rate));
        assert_eq!((Money::from_cents(250) * 4).cents(), 1000);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 9000);
        assert_eq!(subtotal.apply_percentage_discount(0).cents(), 10000);
        assert_eq!(subtotal.apply_percentage_discount(10000).cents(), 0);
        // 3.35 off 33.45 rounds half-up
        assert_eq!(Money::from_cents(3345).apply_percentage_discount(1000).cents(), 3010);
    }
}
