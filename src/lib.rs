//! Storefront
//!
//! Storefront is the headless core of a small e-commerce shop: a persisted shopping cart,
//! a cash/installment pricing engine, stock-checked cart mutations against a read-only
//! product catalog, and the view models that project all of it onto a page.

pub mod actions;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod feedback;
pub mod logging;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod view;
