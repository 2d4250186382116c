//! Cart Store

use std::{fmt, sync::Arc};

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::{
    cart::{Cart, LineItem, storage::CartStorage},
    products::ProductId,
};

/// Storage key the cart is persisted under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "cart";

/// Receives the cart after every successful write to the store.
pub trait CartObserver: Send + Sync {
    /// Called with the cart as it was just persisted.
    fn cart_changed(&self, cart: &Cart);
}

/// Whether a save reached the storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SaveStatus {
    /// The cart was written and observers were notified.
    Persisted,

    /// The write failed and was logged; observers were not notified.
    NotPersisted,
}

impl SaveStatus {
    /// Returns true if the write reached storage.
    pub fn is_persisted(self) -> bool {
        self == SaveStatus::Persisted
    }
}

/// Cart Store
///
/// Single owner of the persisted cart. Reads never fail: missing or unreadable state
/// loads as an empty cart. Writes never propagate errors: failures are logged and
/// reported as [`SaveStatus::NotPersisted`].
pub struct CartStore<S> {
    storage: S,
    key: String,
    observers: Vec<Arc<dyn CartObserver>>,
}

impl<S: fmt::Debug> fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("storage", &self.storage)
            .field("key", &self.key)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<S: CartStorage> CartStore<S> {
    /// Create a store persisting under [`DEFAULT_CART_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_CART_KEY)
    }

    /// Create a store persisting under `key`.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            observers: Vec::new(),
        }
    }

    /// Register an observer notified after every successful write.
    pub fn subscribe(&mut self, observer: Arc<dyn CartObserver>) {
        self.observers.push(observer);
    }

    /// Storage key in use.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The underlying storage backend, mutably.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Read the persisted cart.
    pub fn load(&self) -> Cart {
        match self.storage.read(&self.key) {
            Ok(Some(text)) => parse_cart(&text),
            Ok(None) => Cart::new(),
            Err(error) => {
                error!(key = %self.key, %error, "failed to read cart; starting empty");
                Cart::new()
            }
        }
    }

    /// Persist `cart` and notify observers.
    pub fn save(&mut self, cart: &Cart) -> SaveStatus {
        let text = match serde_json::to_string(cart) {
            Ok(text) => text,
            Err(error) => {
                error!(key = %self.key, %error, "failed to serialise cart");
                return SaveStatus::NotPersisted;
            }
        };

        if let Err(error) = self.storage.write(&self.key, &text) {
            error!(key = %self.key, %error, "failed to save cart");
            return SaveStatus::NotPersisted;
        }

        debug!(key = %self.key, lines = cart.len(), "saved cart");

        self.notify(cart);

        SaveStatus::Persisted
    }

    /// Erase the persisted cart and notify observers with an empty cart.
    pub fn clear(&mut self) -> SaveStatus {
        if let Err(error) = self.storage.remove(&self.key) {
            error!(key = %self.key, %error, "failed to clear cart");
            return SaveStatus::NotPersisted;
        }

        debug!(key = %self.key, "cleared cart");

        self.notify(&Cart::new());

        SaveStatus::Persisted
    }

    fn notify(&self, cart: &Cart) {
        for observer in &self.observers {
            observer.cart_changed(cart);
        }
    }
}

/// A stored line as found in the slot; every field may be missing or blank.
#[derive(Debug, Deserialize)]
struct StoredLineItem {
    #[serde(default)]
    id: Option<ProductId>,

    #[serde(default, alias = "nome")]
    name: Option<String>,

    #[serde(default, alias = "imagem")]
    image: Option<String>,

    #[serde(default, alias = "preco", alias = "unitPriceCash")]
    price: Option<Decimal>,

    #[serde(default, alias = "quantidade")]
    quantity: Option<u32>,
}

impl StoredLineItem {
    fn into_line_item(self) -> Option<LineItem> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let quantity = self.quantity.filter(|quantity| *quantity > 0)?;
        let unit_price_cash = self
            .price
            .filter(|price| price.is_sign_positive() && !price.is_zero())?;

        Some(LineItem {
            id,
            name: self.name.unwrap_or_default(),
            image: self.image,
            unit_price_cash,
            quantity,
        })
    }
}

/// Parse stored text, dropping entries that are malformed or miss a required field.
fn parse_cart(text: &str) -> Cart {
    let entries = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            warn!(kind = value_kind(&other), "stored cart is not a list; starting empty");
            return Cart::new();
        }
        Err(error) => {
            warn!(%error, "stored cart is not valid JSON; starting empty");
            return Cart::new();
        }
    };

    let total = entries.len();

    let items: Vec<LineItem> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<StoredLineItem>(entry).ok())
        .filter_map(StoredLineItem::into_line_item)
        .collect();

    if items.len() < total {
        warn!(
            dropped = total - items.len(),
            kept = items.len(),
            "dropped invalid stored cart entries"
        );
    }

    Cart::with_items(items)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use testresult::TestResult;

    use crate::cart::storage::{MemoryStorage, StorageError};

    use super::*;

    #[derive(Debug, Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<Cart>>,
    }

    impl RecordingObserver {
        fn seen(&self) -> Vec<Cart> {
            self.seen
                .lock()
                .map(|seen| seen.clone())
                .unwrap_or_default()
        }
    }

    impl CartObserver for RecordingObserver {
        fn cart_changed(&self, cart: &Cart) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(cart.clone());
            }
        }
    }

    #[derive(Debug)]
    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk on fire")))
        }

        fn write(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk on fire")))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk on fire")))
        }
    }

    fn line(id: &str, quantity: u32, price: Decimal) -> LineItem {
        LineItem {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            image: Some(format!("img/{id}.png")),
            unit_price_cash: price,
            quantity,
        }
    }

    fn store_with(text: &str) -> TestResult<CartStore<MemoryStorage>> {
        let mut storage = MemoryStorage::new();
        storage.write(DEFAULT_CART_KEY, text)?;

        Ok(CartStore::new(storage))
    }

    #[test]
    fn load_missing_slot_is_empty() {
        let store = CartStore::new(MemoryStorage::new());

        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = CartStore::new(MemoryStorage::new());
        let cart = Cart::with_items([
            line("1", 2, Decimal::new(19990, 2)),
            line("2", 1, Decimal::new(5, 1)),
        ]);

        assert!(store.save(&cart).is_persisted());
        assert_eq!(store.load(), cart);
    }

    #[test]
    fn load_corrupt_text_is_empty() -> TestResult {
        assert!(store_with("{not json")?.load().is_empty());
        assert!(store_with(r#"{"id": 1}"#)?.load().is_empty());
        assert!(store_with("null")?.load().is_empty());

        Ok(())
    }

    #[test]
    fn load_drops_entries_missing_required_fields() -> TestResult {
        let store = store_with(
            r#"[
                {"id": 1, "name": "A", "price": 10.5, "quantity": 1},
                {"id": 2, "name": "B", "price": 3, "quantity": 2},
                {"id": 3, "name": "C", "price": "7.25", "quantity": 4},
                {"name": "no id", "price": 1, "quantity": 1},
                {"id": 5, "name": "no quantity", "price": 1},
                {"id": 6, "name": "no price", "quantity": 1},
                {"id": 7, "name": "zero quantity", "price": 1, "quantity": 0},
                {"id": 8, "name": "bad quantity", "price": 1, "quantity": "lots"},
                "not an object"
            ]"#,
        )?;

        let ids: Vec<String> = store.load().iter().map(|i| i.id.to_string()).collect();

        assert_eq!(ids, ["1", "2", "3"]);

        Ok(())
    }

    #[test]
    fn load_accepts_portuguese_field_names() -> TestResult {
        let store = store_with(
            r#"[{"id": 4, "nome": "Monitor", "imagem": "m.png", "preco": 999.9, "quantidade": 2}]"#,
        )?;

        let cart = store.load();
        let item = cart.find(&ProductId::from("4"));

        assert_eq!(item.map(|i| i.name.as_str()), Some("Monitor"));
        assert_eq!(item.map(|i| i.quantity), Some(2));

        Ok(())
    }

    #[test]
    fn load_merges_duplicate_ids() -> TestResult {
        let store = store_with(
            r#"[
                {"id": 1, "name": "A", "price": 1, "quantity": 1},
                {"id": "1", "name": "A", "price": 1, "quantity": 2}
            ]"#,
        )?;

        let cart = store.load();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 3);

        Ok(())
    }

    #[test]
    fn save_notifies_observers() {
        let observer = Arc::new(RecordingObserver::default());
        let mut store = CartStore::new(MemoryStorage::new());
        store.subscribe(observer.clone());

        let cart = Cart::with_items([line("1", 1, Decimal::ONE)]);
        let status = store.save(&cart);

        assert_eq!(status, SaveStatus::Persisted);
        assert_eq!(observer.seen(), vec![cart]);
    }

    #[test]
    fn failed_save_is_reported_and_not_broadcast() {
        let observer = Arc::new(RecordingObserver::default());
        let mut store = CartStore::new(MemoryStorage::with_quota(8));
        store.subscribe(observer.clone());

        let cart = Cart::with_items([line("1", 1, Decimal::ONE)]);

        assert_eq!(store.save(&cart), SaveStatus::NotPersisted);
        assert!(observer.seen().is_empty());
        assert!(store.load().is_empty());
    }

    #[test]
    fn broken_storage_never_fails_callers() {
        let mut store = CartStore::new(BrokenStorage);

        assert!(store.load().is_empty());
        assert_eq!(store.save(&Cart::new()), SaveStatus::NotPersisted);
        assert_eq!(store.clear(), SaveStatus::NotPersisted);
    }

    #[test]
    fn clear_erases_slot_and_notifies_with_empty_cart() {
        let observer = Arc::new(RecordingObserver::default());
        let mut store = CartStore::with_key(MemoryStorage::new(), "carrinho");
        store.subscribe(observer.clone());

        let cart = Cart::with_items([line("1", 1, Decimal::ONE)]);
        assert!(store.save(&cart).is_persisted());
        assert!(store.clear().is_persisted());

        assert!(store.load().is_empty());
        assert_eq!(observer.seen(), vec![cart, Cart::new()]);
    }
}
