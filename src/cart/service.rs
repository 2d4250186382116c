//! Cart service
//!
//! Stock-checked mutations. Every mutation holds the store lock across the whole
//! read, catalog fetch, modify and write sequence, so two requests for the same
//! product can never both pass the stock check.
//!
//! Storage calls are synchronous and run on the task holding the lock; the catalog
//! fetch is the only await point inside it.

use std::sync::Arc;

use mockall::automock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cart::{
        Cart, Decrement, LineItem,
        storage::CartStorage,
        store::{CartObserver, CartStore, SaveStatus},
    },
    catalog::{CatalogError, CatalogSource},
    products::ProductId,
};

/// Prompt shown before a checkout is completed.
pub const CHECKOUT_PROMPT: &str = "Do you want to complete your purchase?";

/// Errors that stop a cart mutation. The cart is left unchanged.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The catalog could not be fetched
    #[error("could not load the catalog: {0}")]
    Catalog(#[from] CatalogError),

    /// The catalog has no entry for the product
    #[error("product {0} not found in the catalog")]
    ProductNotFound(ProductId),

    /// One more unit would take the line past the product's stock
    #[error("maximum quantity reached for product {id} (stock {stock})")]
    MaxQuantityReached {
        /// Product id
        id: ProductId,
        /// Units in stock
        stock: u32,
    },

    /// The product has no stock
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),

    /// The cart has no line for the product
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// Checkout was requested on an empty cart
    #[error("the cart is empty")]
    EmptyCart,

    /// The purchase was confirmed but the persisted cart could not be erased
    #[error("the cart could not be cleared after checkout")]
    NotCleared,
}

/// What a successful mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with quantity one.
    Added {
        /// Product id
        id: ProductId,
        /// Product name
        name: String,
    },

    /// Adding a product already in the cart bumped its quantity.
    Merged {
        /// Product id
        id: ProductId,
        /// Product name
        name: String,
        /// New quantity
        quantity: u32,
    },

    /// A line gained one unit.
    Incremented {
        /// Product id
        id: ProductId,
        /// New quantity
        quantity: u32,
    },

    /// A line lost one unit and is still in the cart.
    Decremented {
        /// Product id
        id: ProductId,
        /// New quantity
        quantity: u32,
    },

    /// A line was removed.
    Removed {
        /// Product id
        id: ProductId,
        /// Product name
        name: String,
    },

    /// Every line was removed.
    Cleared,

    /// The purchase was confirmed and the cart emptied.
    CheckedOut {
        /// Units purchased
        units: u64,
    },
}

/// The outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpdate {
    /// What changed
    pub change: CartChange,

    /// The cart after the change, whether or not it was persisted
    pub cart: Cart,

    /// Whether the new cart reached storage
    pub status: SaveStatus,
}

/// The outcome of a checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The purchase was confirmed and the cart cleared.
    Completed(CartUpdate),

    /// The confirmation was declined; nothing changed.
    Cancelled,
}

/// Asks the user to confirm an action.
#[automock]
pub trait Confirmation: Send + Sync {
    /// Returns true if the user accepts `prompt`.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Cart Service
pub struct CartService<S> {
    store: Mutex<CartStore<S>>,
    catalog: Arc<dyn CatalogSource>,
}

impl<S> std::fmt::Debug for CartService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService").finish_non_exhaustive()
    }
}

impl<S: CartStorage> CartService<S> {
    /// Create a service mutating `store` and checking stock against `catalog`.
    pub fn new(store: CartStore<S>, catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            store: Mutex::new(store),
            catalog,
        }
    }

    /// The current persisted cart.
    pub async fn cart(&self) -> Cart {
        self.store.lock().await.load()
    }

    /// Register an observer notified after every successful write.
    pub async fn subscribe(&self, observer: Arc<dyn CartObserver>) {
        self.store.lock().await.subscribe(observer);
    }

    /// The catalog source mutations are checked against.
    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// Add one unit of a product: append a new line, or bump the existing one.
    ///
    /// # Errors
    ///
    /// - [`MutationError::Catalog`]: the catalog could not be fetched.
    /// - [`MutationError::ProductNotFound`]: the catalog has no such product.
    /// - [`MutationError::MaxQuantityReached`]: the line is already at the stock level.
    /// - [`MutationError::OutOfStock`]: the product has no stock.
    #[tracing::instrument(name = "cart.service.add", skip(self, id), fields(product_id = %id), err)]
    pub async fn add(&self, id: &ProductId) -> Result<CartUpdate, MutationError> {
        let mut store = self.store.lock().await;

        let catalog = self.catalog.fetch().await?;

        let entry = catalog
            .find(id)
            .ok_or_else(|| MutationError::ProductNotFound(id.clone()))?;

        let mut cart = store.load();

        let change = if let Some(existing) = cart.find(id) {
            ensure_below_stock(existing, entry.stock)?;

            let quantity = cart.increment(id).map_or(0, |item| item.quantity);

            CartChange::Merged {
                id: id.clone(),
                name: entry.name.clone(),
                quantity,
            }
        } else {
            if !entry.in_stock() {
                return Err(MutationError::OutOfStock(id.clone()));
            }

            cart.merge(LineItem::from_entry(entry));

            CartChange::Added {
                id: id.clone(),
                name: entry.name.clone(),
            }
        };

        let status = store.save(&cart);

        info!(?change, ?status, "added product to cart");

        Ok(CartUpdate {
            change,
            cart,
            status,
        })
    }

    /// Add one unit to a line already in the cart, within the product's stock.
    ///
    /// # Errors
    ///
    /// - [`MutationError::NotInCart`]: the cart has no line for the product.
    /// - [`MutationError::Catalog`]: the catalog could not be fetched.
    /// - [`MutationError::ProductNotFound`]: the catalog no longer has the product.
    /// - [`MutationError::MaxQuantityReached`]: the line is already at the stock level.
    #[tracing::instrument(
        name = "cart.service.increment",
        skip(self, id),
        fields(product_id = %id),
        err
    )]
    pub async fn increment(&self, id: &ProductId) -> Result<CartUpdate, MutationError> {
        let mut store = self.store.lock().await;
        let mut cart = store.load();

        let Some(existing) = cart.find(id) else {
            return Err(MutationError::NotInCart(id.clone()));
        };

        let catalog = self.catalog.fetch().await?;

        let entry = catalog
            .find(id)
            .ok_or_else(|| MutationError::ProductNotFound(id.clone()))?;

        ensure_below_stock(existing, entry.stock)?;

        let quantity = cart.increment(id).map_or(0, |item| item.quantity);

        let status = store.save(&cart);

        debug!(quantity, ?status, "incremented cart line");

        Ok(CartUpdate {
            change: CartChange::Incremented {
                id: id.clone(),
                quantity,
            },
            cart,
            status,
        })
    }

    /// Take one unit off a line; a line reaching zero is removed.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::NotInCart`] if the cart has no line for the product.
    #[tracing::instrument(
        name = "cart.service.decrement",
        skip(self, id),
        fields(product_id = %id),
        err
    )]
    pub async fn decrement(&self, id: &ProductId) -> Result<CartUpdate, MutationError> {
        let mut store = self.store.lock().await;
        let mut cart = store.load();

        let change = match cart.decrement(id) {
            Some(Decrement::Reduced(item)) => CartChange::Decremented {
                id: item.id,
                quantity: item.quantity,
            },
            Some(Decrement::Removed(item)) => CartChange::Removed {
                id: item.id,
                name: item.name,
            },
            None => return Err(MutationError::NotInCart(id.clone())),
        };

        let status = store.save(&cart);

        debug!(?change, ?status, "decremented cart line");

        Ok(CartUpdate {
            change,
            cart,
            status,
        })
    }

    /// Remove a line regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::NotInCart`] if the cart has no line for the product.
    #[tracing::instrument(name = "cart.service.remove", skip(self, id), fields(product_id = %id), err)]
    pub async fn remove(&self, id: &ProductId) -> Result<CartUpdate, MutationError> {
        let mut store = self.store.lock().await;
        let mut cart = store.load();

        let item = cart
            .remove(id)
            .ok_or_else(|| MutationError::NotInCart(id.clone()))?;

        let status = store.save(&cart);

        debug!(?status, "removed cart line");

        Ok(CartUpdate {
            change: CartChange::Removed {
                id: item.id,
                name: item.name,
            },
            cart,
            status,
        })
    }

    /// Empty the cart.
    #[tracing::instrument(name = "cart.service.clear", skip(self))]
    pub async fn clear(&self) -> CartUpdate {
        let mut store = self.store.lock().await;

        let status = store.clear();

        debug!(?status, "cleared cart");

        CartUpdate {
            change: CartChange::Cleared,
            cart: Cart::new(),
            status,
        }
    }

    /// Complete the purchase once `confirmation` accepts it, emptying the cart.
    ///
    /// The prompt runs without holding the store lock; the cart is checked again once
    /// the answer is in.
    ///
    /// # Errors
    ///
    /// - [`MutationError::EmptyCart`]: there is nothing to check out.
    /// - [`MutationError::NotCleared`]: the persisted cart could not be erased; it is
    ///   left as it was.
    #[tracing::instrument(name = "cart.service.checkout", skip(self, confirmation), err)]
    pub async fn checkout(
        &self,
        confirmation: &dyn Confirmation,
    ) -> Result<CheckoutOutcome, MutationError> {
        let pending = self.store.lock().await.load();

        if pending.is_empty() {
            return Err(MutationError::EmptyCart);
        }

        if !confirmation.confirm(CHECKOUT_PROMPT) {
            debug!("checkout declined");

            return Ok(CheckoutOutcome::Cancelled);
        }

        let mut store = self.store.lock().await;
        let cart = store.load();

        if cart.is_empty() {
            warn!("cart emptied while waiting for confirmation");

            return Err(MutationError::EmptyCart);
        }

        let units = cart.item_count();
        let status = store.clear();

        if !status.is_persisted() {
            return Err(MutationError::NotCleared);
        }

        info!(units, lines = cart.len(), "checkout completed");

        Ok(CheckoutOutcome::Completed(CartUpdate {
            change: CartChange::CheckedOut { units },
            cart: Cart::new(),
            status,
        }))
    }
}

fn ensure_below_stock(line: &LineItem, stock: u32) -> Result<(), MutationError> {
    if u64::from(line.quantity) + 1 > u64::from(stock) {
        warn!(product_id = %line.id, quantity = line.quantity, stock, "stock ceiling reached");

        return Err(MutationError::MaxQuantityReached {
            id: line.id.clone(),
            stock,
        });
    }

    Ok(())
}
