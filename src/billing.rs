use std::ops::RangeInclusive;

use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};

/// Possible errors to occur while configuring the billing calculator
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("The amount range is empty: {min} is greater than {max}")]
    EmptyRange { min: u32, max: u32 },
    #[error("The tax rate must not be negative, got {0}")]
    NegativeTaxRate(Decimal),
    #[error("The tax rate {rate} is too large for amounts of up to {max}")]
    TaxRateTooLarge { rate: Decimal, max: u32 },
}

/// The inclusive range base amounts are drawn from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AmountRange(RangeInclusive<u32>);

impl AmountRange {
    pub fn new(min: u32, max: u32) -> Result<Self, BillingError> {
        match min <= max {
            true => Ok(Self(min..=max)),
            false => Err(BillingError::EmptyRange { min, max }),
        }
    }

    pub fn min(&self) -> u32 {
        *self.0.start()
    }

    pub fn max(&self) -> u32 {
        *self.0.end()
    }

    pub fn contains(&self, amount: u32) -> bool {
        self.0.contains(&amount)
    }
}

impl Default for AmountRange {
    fn default() -> Self {
        Self(500..=2000)
    }
}

/// The charges of a single invoice
///
/// All amounts are decimal, so `tax` is exact to the paisa and
/// `total == subtotal + tax` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BillingAmounts {
    base: u32,
    discount: Decimal,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl BillingAmounts {
    /// The randomly drawn charge before discount and tax
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn discount(&self) -> Decimal {
        self.discount
    }

    /// `base - discount`
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// `subtotal * tax_rate`
    pub fn tax(&self) -> Decimal {
        self.tax
    }

    /// `subtotal + tax`
    pub fn total(&self) -> Decimal {
        self.total
    }
}

/// Prices invoices
///
/// Every call to [`BillingCalculator::draw`] picks a fresh base amount, so two
/// students of the same batch are usually charged differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingCalculator {
    tax_rate: Decimal,
    amount_range: AmountRange,
}

impl Default for BillingCalculator {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            amount_range: AmountRange::default(),
        }
    }
}

/// The IGST rate of 18%
fn default_tax_rate() -> Decimal {
    Decimal::new(18, 2)
}

impl BillingCalculator {
    /// Creates a calculator, making sure no amount of the range can overflow
    ///
    /// The charges grow with the base amount, so checking the largest one
    /// covers the whole range.
    pub fn new(tax_rate: Decimal, amount_range: AmountRange) -> Result<Self, BillingError> {
        if tax_rate.is_sign_negative() && !tax_rate.is_zero() {
            return Err(BillingError::NegativeTaxRate(tax_rate));
        }
        let max = amount_range.max();
        let subtotal = Decimal::from(max);
        subtotal
            .checked_mul(tax_rate)
            .and_then(|tax| subtotal.checked_add(tax))
            .and_then(|_| tax_rate.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or(BillingError::TaxRateTooLarge { rate: tax_rate, max })?;

        Ok(Self { tax_rate, amount_range })
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn amount_range(&self) -> &AmountRange {
        &self.amount_range
    }

    /// The tax rate as a percentage, e.g. `18` for a rate of `0.18`
    pub fn tax_percent(&self) -> Decimal {
        (self.tax_rate * Decimal::ONE_HUNDRED).normalize()
    }

    /// Draws a base amount from `rng` and derives all other charges
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> BillingAmounts {
        let base = rng.random_range(self.amount_range.0.clone());
        self.amounts_for(base)
    }

    /// Derives the charges for a known base amount
    ///
    /// No discount is granted at the moment.
    pub fn amounts_for(&self, base: u32) -> BillingAmounts {
        let discount = Decimal::ZERO;
        let subtotal = Decimal::from(base) - discount;
        let tax = subtotal * self.tax_rate;

        BillingAmounts {
            base,
            discount,
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

/// Renders an amount with exactly two decimal places
pub fn format_money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}
