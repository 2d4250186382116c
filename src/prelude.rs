//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    actions::{CartAction, Storefront},
    cart::{
        Cart, CartChange, CartObserver, CartService, CartStorage, CartStore, CartUpdate,
        CheckoutOutcome, Confirmation, FileStorage, LineItem, MemoryStorage, MutationError,
        SaveStatus, StorageError,
    },
    catalog::{
        CachedCatalog, Catalog, CatalogError, CatalogSource, FileCatalog, HttpCatalog,
        StaticCatalog,
    },
    feedback::{Feedback, FeedbackKind, LogNotifier, Notifier},
    pricing::{Amount, CartTotals, InstallmentQuote, PricingError, PricingPolicy, RateMode},
    products::{CatalogEntry, ProductId, Review, SpecValue},
    view::{
        Badge, CartRenderer, CartView, Page, ProductCard, ProductDetail, ProductListing,
        RenderLoop, TableRenderer, derive_view_model, products::product_listing,
    },
};
