//! Pricing
//!
//! Cash and financed totals for a cart. Arithmetic is done on exact decimals and
//! integer minor units; formatting is left to the view.

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso};
use thiserror::Error;

use crate::cart::{Cart, LineItem};

/// An amount in the storefront currency.
pub type Amount = Money<'static, iso::Currency>;

/// Default rate between the cash and financed totals.
pub const DEFAULT_RATE_PERCENT: u32 = 5;

/// Default maximum number of installments.
pub const DEFAULT_MAX_INSTALLMENTS: u8 = 12;

/// Errors that can occur while pricing a cart.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// An amount does not fit in minor units.
    #[error("amount out of range")]
    Overflow,

    /// The installment count is outside `1..=max`.
    #[error("invalid installment count {count}; expected 1 to {max}")]
    InvalidInstallmentCount {
        /// Requested count
        count: u8,
        /// Largest count allowed
        max: u8,
    },
}

/// How the rate relates the cash and financed totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateMode {
    /// The subtotal is the financed total; paying cash takes the rate off.
    #[default]
    DiscountFromFinanced,

    /// The subtotal is the cash total; financing adds the rate on top.
    MarkupOnCash,
}

/// Cash and financed totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals {
    /// Sum of line totals
    pub subtotal: Amount,

    /// Total when paying in one go
    pub cash: Amount,

    /// Total when paying in installments
    pub financed: Amount,
}

impl CartTotals {
    /// Difference between the financed and cash totals.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction fails.
    pub fn savings(&self) -> Result<Amount, MoneyError> {
        self.financed.sub(self.cash)
    }
}

/// The amount due per installment for a given count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallmentQuote {
    /// Number of installments
    pub count: u8,

    /// Amount per installment
    pub amount: Amount,

    /// Total paid across all installments
    pub total: Amount,
}

/// Pricing Policy
///
/// Currency, rate and installment limits applied to every cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    currency: &'static iso::Currency,
    rate: Percentage,
    mode: RateMode,
    max_installments: u8,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency: iso::BRL,
            rate: Percentage::from(Decimal::new(i64::from(DEFAULT_RATE_PERCENT), 2)),
            mode: RateMode::default(),
            max_installments: DEFAULT_MAX_INSTALLMENTS,
        }
    }
}

impl PricingPolicy {
    /// Default policy in the given currency.
    #[must_use]
    pub fn new(currency: &'static iso::Currency) -> Self {
        Self {
            currency,
            ..Self::default()
        }
    }

    /// Replace the rate.
    #[must_use]
    pub fn with_rate(mut self, rate: Percentage) -> Self {
        self.rate = rate;
        self
    }

    /// Replace the rate direction.
    #[must_use]
    pub fn with_mode(mut self, mode: RateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the maximum installment count. Zero is raised to one.
    #[must_use]
    pub fn with_max_installments(mut self, max: u8) -> Self {
        self.max_installments = max.max(1);
        self
    }

    /// Currency amounts are expressed in.
    pub fn currency(&self) -> &'static iso::Currency {
        self.currency
    }

    /// Rate between the cash and financed totals.
    pub fn rate(&self) -> Percentage {
        self.rate
    }

    /// Rate direction.
    pub fn mode(&self) -> RateMode {
        self.mode
    }

    /// Largest installment count offered.
    pub fn max_installments(&self) -> u8 {
        self.max_installments
    }

    /// Zero in the policy currency.
    pub fn zero(&self) -> Amount {
        Money::from_minor(0, self.currency)
    }

    /// Convert a decimal price to an amount, rounding once to minor units.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the price does not fit in minor units.
    pub fn amount(&self, price: Decimal) -> Result<Amount, PricingError> {
        Ok(Money::from_minor(to_minor(price, self.currency)?, self.currency))
    }

    /// Calculate the price of a line: unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the line total does not fit in minor units.
    pub fn line_total(&self, item: &LineItem) -> Result<Amount, PricingError> {
        line_total(item, self.currency)
    }

    /// Sum of line totals in display order.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any line overflows or the sum fails.
    pub fn cart_subtotal(&self, cart: &Cart) -> Result<Amount, PricingError> {
        cart_subtotal(cart, self.currency)
    }

    /// Cash and financed totals for `cart`.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the subtotal or the rate cannot be applied.
    pub fn totals(&self, cart: &Cart) -> Result<CartTotals, PricingError> {
        self.totals_for(self.cart_subtotal(cart)?)
    }

    /// Cash and financed totals for a single subtotal, such as one product's price.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the rate cannot be applied.
    pub fn totals_for(&self, subtotal: Amount) -> Result<CartTotals, PricingError> {
        let adjustment = Money::from_minor(
            percent_of_minor(self.rate, subtotal.to_minor_units())?,
            self.currency,
        );

        let (cash, financed) = match self.mode {
            RateMode::DiscountFromFinanced => (subtotal.sub(adjustment)?, subtotal),
            RateMode::MarkupOnCash => (subtotal, subtotal.add(adjustment)?),
        };

        Ok(CartTotals {
            subtotal,
            cash,
            financed,
        })
    }

    /// Amount per installment when paying `totals` in `count` installments.
    ///
    /// One installment is the cash total; more split the financed total evenly, each
    /// installment rounded half away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidInstallmentCount`] if `count` is outside
    /// `1..=max_installments`.
    pub fn installment(
        &self,
        totals: &CartTotals,
        count: u8,
    ) -> Result<InstallmentQuote, PricingError> {
        if count == 0 || count > self.max_installments {
            return Err(PricingError::InvalidInstallmentCount {
                count,
                max: self.max_installments,
            });
        }

        if count == 1 {
            return Ok(InstallmentQuote {
                count,
                amount: totals.cash,
                total: totals.cash,
            });
        }

        Ok(InstallmentQuote {
            count,
            amount: split_evenly(totals.financed, count)?,
            total: totals.financed,
        })
    }

    /// Quotes for every count from one to `max_installments`.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any quote cannot be calculated.
    pub fn installment_options(
        &self,
        totals: &CartTotals,
    ) -> Result<Vec<InstallmentQuote>, PricingError> {
        (1..=self.max_installments)
            .map(|count| self.installment(totals, count))
            .collect()
    }
}

/// Calculate the price of a line in `currency`: unit price times quantity, rounded
/// once to minor units.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] if the line total does not fit in minor units.
pub fn line_total(
    item: &LineItem,
    currency: &'static iso::Currency,
) -> Result<Amount, PricingError> {
    let total = item
        .unit_price_cash
        .checked_mul(Decimal::from(item.quantity))
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(to_minor(total, currency)?, currency))
}

/// Sum of line totals in display order. An empty cart totals zero.
///
/// # Errors
///
/// Returns a [`PricingError`] if any line overflows or the sum fails.
pub fn cart_subtotal(
    cart: &Cart,
    currency: &'static iso::Currency,
) -> Result<Amount, PricingError> {
    cart.iter()
        .try_fold(
            Money::from_minor(0, currency),
            |acc, item| -> Result<Amount, PricingError> {
                Ok(acc.add(line_total(item, currency)?)?)
            },
        )
}

/// One of `count` equal parts of `total`, rounded half away from zero.
///
/// # Errors
///
/// Returns [`PricingError::InvalidInstallmentCount`] if `count` is zero.
pub fn split_evenly(total: Amount, count: u8) -> Result<Amount, PricingError> {
    if count == 0 {
        return Err(PricingError::InvalidInstallmentCount { count, max: u8::MAX });
    }

    let part = Decimal::from(total.to_minor_units())
        .checked_div(Decimal::from(count))
        .ok_or(PricingError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)?;

    Ok(Money::from_minor(part, total.currency()))
}

/// Convert a decimal amount to minor units, rounding half away from zero.
fn to_minor(amount: Decimal, currency: &iso::Currency) -> Result<i64, PricingError> {
    let scale = 10_i64
        .checked_pow(currency.exponent)
        .ok_or(PricingError::Overflow)?;

    amount
        .checked_mul(Decimal::from(scale))
        .ok_or(PricingError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)
}

/// Apply a percentage to an amount in minor units, rounding half away from zero.
fn percent_of_minor(percent: Percentage, minor: i64) -> Result<i64, PricingError> {
    let percent = percent * Decimal::ONE;

    let Some(applied) = percent.checked_mul(Decimal::from(minor)) else {
        return Err(PricingError::Overflow);
    };

    let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    rounded.to_i64().ok_or(PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::products::ProductId;

    use super::*;

    fn line(id: &str, price: Decimal, quantity: u32) -> LineItem {
        LineItem {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            image: None,
            unit_price_cash: price,
            quantity,
        }
    }

    fn brl(minor: i64) -> Amount {
        Money::from_minor(minor, iso::BRL)
    }

    #[test]
    fn line_total_multiplies_then_rounds_once() -> TestResult {
        // 3 x 0.335 = 1.005, which rounds to 1.01 rather than 3 x 0.34.
        let item = line("a", Decimal::new(335, 3), 3);

        assert_eq!(line_total(&item, iso::BRL)?, brl(101));

        Ok(())
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() -> TestResult {
        assert_eq!(cart_subtotal(&Cart::new(), iso::BRL)?, brl(0));

        Ok(())
    }

    #[test]
    fn subtotal_sums_lines() -> TestResult {
        let cart = Cart::with_items([
            line("a", Decimal::new(10000, 2), 2),
            line("b", Decimal::new(5050, 2), 1),
        ]);

        assert_eq!(cart_subtotal(&cart, iso::BRL)?, brl(25050));

        Ok(())
    }

    #[test]
    fn discount_from_financed_takes_rate_off_cash() -> TestResult {
        let policy = PricingPolicy::default();
        let cart = Cart::with_items([line("a", Decimal::new(10000, 2), 1)]);

        let totals = policy.totals(&cart)?;

        assert_eq!(totals.financed, brl(10000));
        assert_eq!(totals.cash, brl(9500));
        assert_eq!(totals.savings()?, brl(500));

        Ok(())
    }

    #[test]
    fn markup_on_cash_adds_rate_to_financed() -> TestResult {
        let policy = PricingPolicy::default().with_mode(RateMode::MarkupOnCash);
        let cart = Cart::with_items([line("a", Decimal::new(10000, 2), 1)]);

        let totals = policy.totals(&cart)?;

        assert_eq!(totals.cash, brl(10000));
        assert_eq!(totals.financed, brl(10500));

        Ok(())
    }

    #[test]
    fn rate_adjustment_rounds_half_away_from_zero() -> TestResult {
        // 5% of 0.10 is 0.005, which rounds to one cent.
        let policy = PricingPolicy::default();

        let totals = policy.totals_for(brl(10))?;

        assert_eq!(totals.cash, brl(9));

        Ok(())
    }

    #[test]
    fn single_installment_is_cash_total() -> TestResult {
        let policy = PricingPolicy::default();
        let totals = policy.totals_for(brl(10000))?;

        let quote = policy.installment(&totals, 1)?;

        assert_eq!(quote.amount, brl(9500));
        assert_eq!(quote.total, brl(9500));

        Ok(())
    }

    #[test]
    fn installments_split_financed_total() -> TestResult {
        let policy = PricingPolicy::default();
        let totals = policy.totals_for(brl(10000))?;

        let quote = policy.installment(&totals, 3)?;

        assert_eq!(quote.amount, brl(3333));
        assert_eq!(quote.total, brl(10000));

        let reconstructed = quote.amount.to_minor_units() * 3;
        assert!((reconstructed - totals.financed.to_minor_units()).abs() < 3);

        Ok(())
    }

    #[test]
    fn installment_count_out_of_range_is_rejected() -> TestResult {
        let policy = PricingPolicy::default().with_max_installments(10);
        let totals = policy.totals_for(brl(10000))?;

        assert_eq!(
            policy.installment(&totals, 0),
            Err(PricingError::InvalidInstallmentCount { count: 0, max: 10 })
        );
        assert_eq!(
            policy.installment(&totals, 11),
            Err(PricingError::InvalidInstallmentCount { count: 11, max: 10 })
        );

        Ok(())
    }

    #[test]
    fn installment_options_cover_every_count() -> TestResult {
        let policy = PricingPolicy::default();
        let totals = policy.totals_for(brl(12000))?;

        let options = policy.installment_options(&totals)?;

        assert_eq!(options.len(), usize::from(DEFAULT_MAX_INSTALLMENTS));
        assert_eq!(options.last().map(|quote| quote.amount), Some(brl(1000)));

        Ok(())
    }

    #[test]
    fn custom_rate_and_currency() -> TestResult {
        let policy = PricingPolicy::new(iso::USD).with_rate(Percentage::from(Decimal::new(10, 2)));

        let totals = policy.totals_for(Money::from_minor(2000, iso::USD))?;

        assert_eq!(totals.cash, Money::from_minor(1800, iso::USD));

        Ok(())
    }
}
