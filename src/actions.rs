//! Actions
//!
//! Tagged user actions and the controller that routes them to the cart service and
//! the render loop.

use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use crate::{
    cart::{CartService, CartStorage, CartUpdate, CheckoutOutcome, Confirmation, MutationError},
    feedback::{Feedback, Notifier},
    products::ProductId,
    view::{CartRenderer, RenderLoop},
};

/// Something the user asked the storefront to do. Row actions carry the product id
/// and are resolved against the cart at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a product from the catalog
    Add(ProductId),

    /// Add one unit to a cart line
    Increment(ProductId),

    /// Take one unit off a cart line
    Decrement(ProductId),

    /// Remove a cart line
    Remove(ProductId),

    /// Show the summary for this many installments
    SelectInstallments(u8),

    /// Empty the cart
    Clear,

    /// Confirm and complete the purchase
    Checkout,
}

/// Storefront
///
/// Wires the cart service, the render loop and the user-facing collaborators together.
pub struct Storefront<S, R> {
    service: CartService<S>,
    view: Arc<RenderLoop<R>>,
    notifier: Arc<dyn Notifier>,
    confirmation: Arc<dyn Confirmation>,
}

impl<S, R> fmt::Debug for Storefront<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront").finish_non_exhaustive()
    }
}

impl<S: CartStorage, R: CartRenderer + 'static> Storefront<S, R> {
    /// Create a storefront.
    pub fn new(
        service: CartService<S>,
        view: Arc<RenderLoop<R>>,
        notifier: Arc<dyn Notifier>,
        confirmation: Arc<dyn Confirmation>,
    ) -> Self {
        Self {
            service,
            view,
            notifier,
            confirmation,
        }
    }

    /// Subscribe the render loop to cart changes and draw the persisted cart.
    pub async fn start(&self) {
        self.service.subscribe(self.view.clone()).await;

        let cart = self.service.cart().await;

        self.view.refresh(&cart);

        debug!(lines = cart.len(), "storefront started");
    }

    /// The cart service.
    pub fn service(&self) -> &CartService<S> {
        &self.service
    }

    /// The render loop.
    pub fn view(&self) -> &RenderLoop<R> {
        &self.view
    }

    /// Run `action`, returning the feedback shown to the user, if any.
    pub async fn dispatch(&self, action: CartAction) -> Option<Feedback> {
        debug!(?action, "dispatching cart action");

        let result = match action {
            CartAction::Add(id) => self.service.add(&id).await,
            CartAction::Increment(id) => self.service.increment(&id).await,
            CartAction::Decrement(id) => self.service.decrement(&id).await,
            CartAction::Remove(id) => self.service.remove(&id).await,
            CartAction::Clear => Ok(self.service.clear().await),
            CartAction::Checkout => match self.service.checkout(self.confirmation.as_ref()).await {
                Ok(CheckoutOutcome::Completed(update)) => Ok(update),
                Ok(CheckoutOutcome::Cancelled) => return None,
                Err(error) => Err(error),
            },
            CartAction::SelectInstallments(count) => {
                return match self.view.select_installments(count) {
                    Ok(_) => None,
                    Err(error) => {
                        warn!(%error, count, "installment selection refused");

                        self.deliver(Feedback::warning("Invalid number of installments."))
                    }
                };
            }
        };

        match result {
            Ok(update) => self.applied(update),
            Err(error) => self.refused(&error),
        }
    }

    fn applied(&self, update: CartUpdate) -> Option<Feedback> {
        // Observers only hear about persisted carts.
        if !update.status.is_persisted() {
            self.view.refresh(&update.cart);
        }

        update.feedback().and_then(|feedback| self.deliver(feedback))
    }

    fn refused(&self, error: &MutationError) -> Option<Feedback> {
        warn!(%error, "cart action refused");

        self.deliver(Feedback::from(error))
    }

    fn deliver(&self, feedback: Feedback) -> Option<Feedback> {
        self.notifier.notify(&feedback);

        Some(feedback)
    }
}
