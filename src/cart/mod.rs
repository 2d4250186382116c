//! Cart

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::products::{CatalogEntry, ProductId};

pub mod service;
pub mod storage;
pub mod store;

pub use service::{
    CartChange, CartService, CartUpdate, CheckoutOutcome, Confirmation, MutationError,
};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{CartObserver, CartStore, DEFAULT_CART_KEY, SaveStatus};

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog id
    pub id: ProductId,

    /// Display name copied from the catalog when the item was added
    pub name: String,

    /// Display image copied from the catalog when the item was added
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Cash price per unit
    #[serde(rename = "price")]
    pub unit_price_cash: Decimal,

    /// Units in the cart, always at least one
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item with a quantity of one from a catalog entry.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            image: entry.image.clone(),
            unit_price_cash: entry.price_cash,
            quantity: 1,
        }
    }
}

/// The result of decrementing a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrement {
    /// The line is still in the cart with the given quantity.
    Reduced(LineItem),

    /// The line dropped to zero and was removed.
    Removed(LineItem),
}

/// Cart
///
/// An ordered list of line items; insertion order is display order and each product id
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cart from line items, merging repeated ids into the first occurrence.
    pub fn with_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();

        for item in items {
            cart.merge(item);
        }

        cart
    }

    /// Line items in display order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Iterate over the line items in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Find the line for a product.
    pub fn find(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Append a line, or add its quantity to the existing line for the same product.
    pub fn merge(&mut self, item: LineItem) {
        if let Some(existing) = self.find_mut(&item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Add one unit to the line for `id`, returning the updated line.
    pub fn increment(&mut self, id: &ProductId) -> Option<&LineItem> {
        let item = self.find_mut(id)?;
        item.quantity = item.quantity.saturating_add(1);

        Some(item)
    }

    /// Take one unit off the line for `id`; a line reaching zero is removed.
    pub fn decrement(&mut self, id: &ProductId) -> Option<Decrement> {
        let position = self.position(id)?;
        let item = self.items.get_mut(position)?;

        if item.quantity > 1 {
            item.quantity -= 1;

            return Some(Decrement::Reduced(item.clone()));
        }

        Some(Decrement::Removed(self.items.remove(position)))
    }

    /// Remove the line for `id`.
    pub fn remove(&mut self, id: &ProductId) -> Option<LineItem> {
        let position = self.position(id)?;

        Some(self.items.remove(position))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn find_mut(&mut self, id: &ProductId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| &item.id == id)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
