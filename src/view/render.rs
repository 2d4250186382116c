//! Render loop
//!
//! Draws cart view models onto a page and keeps them in sync with the store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
    actions::CartAction,
    cart::{Cart, CartObserver},
    pricing::{InstallmentQuote, PricingError, PricingPolicy},
    view::{Badge, CartView, SummaryViewModel, derive_view_model},
};

/// Errors raised while drawing the cart.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    /// The page has no mount point with this name
    #[error("missing mount point: {0}")]
    MissingMount(&'static str),

    /// The cart could not be priced
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A region of the page the renderer writes into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mount {
    /// Rendered content
    pub content: String,

    /// Whether the region is shown
    pub visible: bool,
}

/// The page the cart is drawn on. Every mount point is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Cart rows, or the empty-state message
    pub cart_rows: Option<Mount>,

    /// Totals and installment choices
    pub summary: Option<Mount>,

    /// Item-count badge
    pub badge: Option<Mount>,
}

impl Page {
    /// A page with every mount point present.
    pub fn full() -> Self {
        Self {
            cart_rows: Some(Mount::default()),
            summary: Some(Mount::default()),
            badge: Some(Mount::default()),
        }
    }

    /// A page with only the badge, like a product listing page.
    pub fn badge_only() -> Self {
        Self {
            badge: Some(Mount::default()),
            ..Self::default()
        }
    }
}

/// Turns view models into mount content.
pub trait CartRenderer: Send + Sync {
    /// Content of the cart rows mount.
    fn render_rows(&self, view: &CartView) -> String;

    /// Content of the summary mount.
    fn render_summary(&self, summary: &SummaryViewModel) -> String;
}

/// Renders the cart as terminal tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRenderer;

impl CartRenderer for TableRenderer {
    fn render_rows(&self, view: &CartView) -> String {
        let rows = match view {
            CartView::Empty { message } => return message.clone(),
            CartView::Populated { rows, .. } => rows,
        };

        let mut builder = Builder::default();

        builder.push_record(["#", "Item", "Price", "Qty", "Total", "Actions"]);

        for row in rows {
            builder.push_record([
                row.index.to_string(),
                format!("{} ({})", row.name, row.id),
                row.unit_price.to_string(),
                row.quantity.to_string(),
                row.line_total.to_string(),
                control_labels(&row.actions),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..5), Alignment::right());

        table.to_string()
    }

    fn render_summary(&self, summary: &SummaryViewModel) -> String {
        let mut builder = Builder::default();

        builder.push_record(["", "Installments", "Per installment"]);

        for option in &summary.options {
            let marker = if option.selected { "*" } else { "" };

            builder.push_record([
                marker.to_string(),
                format!("{}x", option.count),
                option.amount.to_string(),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(1..3), Alignment::right());

        [
            format!(
                "Cash total: {} (save {})",
                summary.cash_total, summary.savings
            ),
            format!("Financed total: {}", summary.financed_total),
            format!(
                "Selected: {}x of {} = {}",
                summary.selected.count, summary.selected.amount, summary.selected.total
            ),
            table.to_string(),
        ]
        .join("\n")
    }
}

fn control_labels(actions: &[CartAction]) -> String {
    actions
        .iter()
        .filter_map(|action| match action {
            CartAction::Decrement(_) => Some("[-]"),
            CartAction::Increment(_) => Some("[+]"),
            CartAction::Remove(_) => Some("[remove]"),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug)]
struct RenderState {
    page: Page,
    selected_installments: u8,
    last_cart: Cart,
}

/// Render Loop
///
/// Redraws the cart mounts and the badge whenever the store reports a change. Drawing
/// never fails outward: missing mounts and pricing failures are logged and skipped.
#[derive(Debug)]
pub struct RenderLoop<R> {
    pricing: PricingPolicy,
    renderer: R,
    state: Mutex<RenderState>,
}

impl<R: CartRenderer> RenderLoop<R> {
    /// Create a render loop drawing onto `page`.
    pub fn new(pricing: PricingPolicy, renderer: R, page: Page) -> Self {
        Self {
            pricing,
            renderer,
            state: Mutex::new(RenderState {
                page,
                selected_installments: 1,
                last_cart: Cart::new(),
            }),
        }
    }

    /// Pricing policy used to build view models.
    pub fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    /// A snapshot of the page.
    pub fn page(&self) -> Page {
        self.lock().page.clone()
    }

    /// Current installment selection.
    pub fn selected_installments(&self) -> u8 {
        self.lock().selected_installments
    }

    /// Redraw the cart rows and the summary from `cart`, replacing their content.
    pub fn render_cart(&self, cart: &Cart) {
        let mut state = self.lock();

        state.last_cart = cart.clone();

        self.draw_cart(&mut state);
    }

    /// Write the total unit count to the badge.
    pub fn update_item_count_badge(&self, cart: &Cart) {
        let mut state = self.lock();

        let badge = Badge::for_cart(cart);

        if let Err(error) = fill(&mut state.page.badge, "badge", badge.to_string(), true) {
            warn!(%error, "skipping badge update");
        }
    }

    /// Redraw everything from `cart`.
    pub fn refresh(&self, cart: &Cart) {
        self.render_cart(cart);
        self.update_item_count_badge(cart);
    }

    /// Select an installment count and redraw the summary. The selection survives
    /// later redraws.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Pricing`] if the count is outside the policy's range;
    /// the previous selection is kept.
    pub fn select_installments(&self, count: u8) -> Result<InstallmentQuote, RenderError> {
        let mut state = self.lock();

        let totals = self.pricing.totals(&state.last_cart)?;
        let quote = self.pricing.installment(&totals, count)?;

        state.selected_installments = count;

        self.draw_cart(&mut state);

        Ok(quote)
    }

    fn draw_cart(&self, state: &mut RenderState) {
        let view = match derive_view_model(
            &state.last_cart,
            &self.pricing,
            state.selected_installments,
        ) {
            Ok(view) => view,
            Err(error) => {
                error!(error = %RenderError::from(error), "failed to price cart; skipping render");
                return;
            }
        };

        let rows = self.renderer.render_rows(&view);

        if let Err(error) = fill(&mut state.page.cart_rows, "cart rows", rows, true) {
            warn!(%error, "skipping cart rows");
        }

        let summary = match view.summary() {
            Some(summary) => fill(
                &mut state.page.summary,
                "summary",
                self.renderer.render_summary(summary),
                true,
            ),
            None => fill(&mut state.page.summary, "summary", String::new(), false),
        };

        if let Err(error) = summary {
            warn!(%error, "skipping summary");
        }

        debug!(lines = view.rows().len(), "rendered cart");
    }

    fn lock(&self) -> MutexGuard<'_, RenderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: CartRenderer> CartObserver for RenderLoop<R> {
    fn cart_changed(&self, cart: &Cart) {
        self.refresh(cart);
    }
}

fn fill(
    mount: &mut Option<Mount>,
    name: &'static str,
    content: String,
    visible: bool,
) -> Result<(), RenderError> {
    let mount = mount.as_mut().ok_or(RenderError::MissingMount(name))?;

    mount.content = content;
    mount.visible = visible;

    Ok(())
}
