//! View
//!
//! Pure projections of the cart into what the page shows. Nothing here touches
//! storage or the catalog.

use smallvec::{SmallVec, smallvec};

use crate::{
    actions::CartAction,
    cart::Cart,
    pricing::{Amount, InstallmentQuote, PricingError, PricingPolicy},
    products::ProductId,
};

pub mod products;
pub mod render;

pub use products::{ProductCard, ProductDetail, ProductListing, RatingSummary};
pub use render::{CartRenderer, Mount, Page, RenderError, RenderLoop, TableRenderer};

/// Message shown in place of the rows when the cart has no lines.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty.";

/// One cart line as displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct RowViewModel {
    /// Position in display order, starting at one
    pub index: usize,

    /// Product id
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Product image
    pub image: Option<String>,

    /// Cash price per unit
    pub unit_price: Amount,

    /// Units in the cart
    pub quantity: u32,

    /// Unit price times quantity
    pub line_total: Amount,

    /// Controls offered on the row: decrement, increment and remove
    pub actions: SmallVec<[CartAction; 3]>,
}

/// One installment choice offered in the summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallmentOption {
    /// Number of installments
    pub count: u8,

    /// Amount per installment
    pub amount: Amount,

    /// Whether this is the current selection
    pub selected: bool,
}

/// Cart totals and installment choices.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryViewModel {
    /// Total when paying in one go
    pub cash_total: Amount,

    /// Total when paying in installments
    pub financed_total: Amount,

    /// Financed total minus cash total
    pub savings: Amount,

    /// Every installment count offered
    pub options: Vec<InstallmentOption>,

    /// The quote for the selected installment count
    pub selected: InstallmentQuote,
}

/// Cart View
#[derive(Debug, Clone, PartialEq)]
pub enum CartView {
    /// The cart has no lines.
    Empty {
        /// Empty state message
        message: String,
    },

    /// The cart has lines.
    Populated {
        /// One row per line, in display order
        rows: Vec<RowViewModel>,

        /// Totals and installment choices
        summary: SummaryViewModel,
    },
}

impl CartView {
    /// Returns true for the empty state.
    pub fn is_empty(&self) -> bool {
        matches!(self, CartView::Empty { .. })
    }

    /// Rows to draw; none for the empty state.
    pub fn rows(&self) -> &[RowViewModel] {
        match self {
            CartView::Empty { .. } => &[],
            CartView::Populated { rows, .. } => rows,
        }
    }

    /// Summary to draw; none for the empty state.
    pub fn summary(&self) -> Option<&SummaryViewModel> {
        match self {
            CartView::Empty { .. } => None,
            CartView::Populated { summary, .. } => Some(summary),
        }
    }
}

/// The item-count badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    /// Total units across all lines
    pub count: u64,
}

impl Badge {
    /// Badge for `cart`.
    pub fn for_cart(cart: &Cart) -> Self {
        Self {
            count: cart.item_count(),
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.count)
    }
}

/// Project `cart` into a view model.
///
/// A `selected_installments` count outside the policy's range falls back to a single
/// cash installment.
///
/// # Errors
///
/// Returns a [`PricingError`] if the cart cannot be priced.
pub fn derive_view_model(
    cart: &Cart,
    pricing: &PricingPolicy,
    selected_installments: u8,
) -> Result<CartView, PricingError> {
    if cart.is_empty() {
        return Ok(CartView::Empty {
            message: EMPTY_CART_MESSAGE.to_string(),
        });
    }

    let rows = cart
        .iter()
        .enumerate()
        .map(|(position, item)| -> Result<RowViewModel, PricingError> {
            Ok(RowViewModel {
                index: position + 1,
                id: item.id.clone(),
                name: item.name.clone(),
                image: item.image.clone(),
                unit_price: pricing.amount(item.unit_price_cash)?,
                quantity: item.quantity,
                line_total: pricing.line_total(item)?,
                actions: smallvec![
                    CartAction::Decrement(item.id.clone()),
                    CartAction::Increment(item.id.clone()),
                    CartAction::Remove(item.id.clone()),
                ],
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let totals = pricing.totals(cart)?;
    let quotes = pricing.installment_options(&totals)?;

    let selected = match pricing.installment(&totals, selected_installments) {
        Ok(quote) => quote,
        Err(PricingError::InvalidInstallmentCount { .. }) => pricing.installment(&totals, 1)?,
        Err(error) => return Err(error),
    };

    let options = quotes
        .iter()
        .map(|quote| InstallmentOption {
            count: quote.count,
            amount: quote.amount,
            selected: quote.count == selected.count,
        })
        .collect();

    Ok(CartView::Populated {
        rows,
        summary: SummaryViewModel {
            cash_total: totals.cash,
            financed_total: totals.financed,
            savings: totals.savings()?,
            options,
            selected,
        },
    })
}
