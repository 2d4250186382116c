//! Feedback
//!
//! Transient messages shown to the user after an action.

use std::fmt;

use mockall::automock;
use tracing::{info, warn};

use crate::cart::{CartChange, CartUpdate, MutationError};

/// Severity of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// The action succeeded
    Success,

    /// The action was refused; nothing changed
    Warning,

    /// The action failed; nothing changed
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Severity
    pub kind: FeedbackKind,

    /// Message text
    pub message: String,
}

impl Feedback {
    /// A success message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Success,
            message: message.into(),
        }
    }

    /// A warning message.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Warning,
            message: message.into(),
        }
    }

    /// An error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&MutationError> for Feedback {
    fn from(error: &MutationError) -> Self {
        match error {
            MutationError::MaxQuantityReached { .. } => {
                Feedback::warning("Maximum quantity reached for this product.")
            }
            MutationError::OutOfStock(_) => Feedback::warning("Product out of stock."),
            MutationError::NotInCart(_) => Feedback::warning("This product is not in your cart."),
            MutationError::Catalog(_) => {
                Feedback::error("Could not add to cart. Please try again.")
            }
            MutationError::ProductNotFound(_) => Feedback::error("Product not found."),
            MutationError::EmptyCart => Feedback::error("Your cart is empty!"),
            MutationError::NotCleared => {
                Feedback::error("Could not complete your purchase. Please try again.")
            }
        }
    }
}

impl CartUpdate {
    /// Feedback to show for this update. Quantity steps and removals are silent.
    pub fn feedback(&self) -> Option<Feedback> {
        match &self.change {
            CartChange::Added { name, .. } => {
                Some(Feedback::success(format!("{name} added to cart!")))
            }
            CartChange::Merged { name, .. } => {
                Some(Feedback::success(format!("{name} updated in cart!")))
            }
            CartChange::CheckedOut { .. } => {
                Some(Feedback::success("Purchase completed successfully!"))
            }
            CartChange::Incremented { .. }
            | CartChange::Decremented { .. }
            | CartChange::Removed { .. }
            | CartChange::Cleared => None,
        }
    }
}

/// Delivers feedback to the user.
#[automock]
pub trait Notifier: Send + Sync {
    /// Show `feedback`.
    fn notify(&self, feedback: &Feedback);
}

/// Writes feedback to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, feedback: &Feedback) {
        match feedback.kind {
            FeedbackKind::Success => info!(text = %feedback.message, "feedback"),
            FeedbackKind::Warning | FeedbackKind::Error => {
                warn!(kind = ?feedback.kind, text = %feedback.message, "feedback");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cart::{Cart, SaveStatus},
        catalog::CatalogError,
        products::ProductId,
    };

    use super::*;

    fn update(change: CartChange) -> CartUpdate {
        CartUpdate {
            change,
            cart: Cart::new(),
            status: SaveStatus::Persisted,
        }
    }

    #[test]
    fn refusals_are_warnings_and_failures_are_errors() {
        let id = ProductId::from("1");

        let max = Feedback::from(&MutationError::MaxQuantityReached {
            id: id.clone(),
            stock: 2,
        });
        let out = Feedback::from(&MutationError::OutOfStock(id.clone()));
        let fetch = Feedback::from(&MutationError::Catalog(CatalogError::UnexpectedStatus(500)));
        let missing = Feedback::from(&MutationError::ProductNotFound(id));

        assert_eq!(max, Feedback::warning("Maximum quantity reached for this product."));
        assert_eq!(out.kind, FeedbackKind::Warning);
        assert_eq!(fetch, Feedback::error("Could not add to cart. Please try again."));
        assert_eq!(missing.kind, FeedbackKind::Error);
        assert_eq!(
            Feedback::from(&MutationError::NotCleared).kind,
            FeedbackKind::Error
        );
    }

    #[test]
    fn adds_and_checkout_produce_success_messages() {
        let added = update(CartChange::Added {
            id: ProductId::from("1"),
            name: "Mouse".to_string(),
        });
        let merged = update(CartChange::Merged {
            id: ProductId::from("1"),
            name: "Mouse".to_string(),
            quantity: 2,
        });
        let checked_out = update(CartChange::CheckedOut { units: 3 });

        assert_eq!(added.feedback(), Some(Feedback::success("Mouse added to cart!")));
        assert_eq!(merged.feedback(), Some(Feedback::success("Mouse updated in cart!")));
        assert_eq!(
            checked_out.feedback().map(|feedback| feedback.kind),
            Some(FeedbackKind::Success)
        );
    }

    #[test]
    fn quantity_steps_are_silent() {
        let stepped = update(CartChange::Decremented {
            id: ProductId::from("1"),
            quantity: 1,
        });

        assert_eq!(stepped.feedback(), None);
        assert_eq!(update(CartChange::Cleared).feedback(), None);
    }
}
