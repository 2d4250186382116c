//! Integration tests for catalog sources and the product pages built from them

use std::{path::PathBuf, sync::Arc};

use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use testresult::TestResult;

use storefront::{
    cart::{CartService, CartStore, MemoryStorage},
    catalog::{CachedCatalog, Catalog, CatalogError, CatalogSource, FileCatalog, MockCatalogSource},
    pricing::PricingPolicy,
    products::{ProductId, SpecValue},
    view::{ProductDetail, products::product_listing},
};

fn manifest_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[tokio::test]
async fn sample_catalog_loads_from_json() -> TestResult {
    let catalog = FileCatalog::new(manifest_path("data/products.json")).fetch().await?;

    assert_eq!(catalog.len(), 4);

    let ryzen = catalog.find(&ProductId::from("1")).ok_or("missing product 1")?;

    assert_eq!(ryzen.price_cash, Decimal::new(113_990, 2));
    assert_eq!(ryzen.price_installments, Some(Decimal::new(119_990, 2)));
    assert_eq!(ryzen.stock, 5);
    assert_eq!(ryzen.reviews.len(), 2);
    assert_eq!(ryzen.specifications.get("cores"), Some(&SpecValue::Integer(8)));

    Ok(())
}

#[tokio::test]
async fn portuguese_yaml_catalog_loads() -> TestResult {
    let catalog = FileCatalog::new(manifest_path("tests/fixtures/products.yml")).fetch().await?;

    let ssd = catalog.find(&ProductId::from("10")).ok_or("missing product 10")?;

    assert_eq!(ssd.name, "SSD NVMe 1TB");
    assert_eq!(ssd.stock, 3);
    assert_eq!(ssd.installments, Some(10));
    assert_eq!(ssd.reviews.first().map(|review| review.user.as_str()), Some("Ana"));

    let psu = catalog.find(&ProductId::from("11")).ok_or("missing product 11")?;

    assert!(!psu.in_stock());

    Ok(())
}

#[tokio::test]
async fn unknown_extension_is_rejected() -> TestResult {
    let file = tempfile::Builder::new().suffix(".csv").tempfile()?;

    let result = FileCatalog::new(file.path()).fetch().await;

    assert!(matches!(result, Err(CatalogError::UnsupportedFormat(ext)) if ext == "csv"));

    Ok(())
}

#[tokio::test]
async fn cached_catalog_fetches_source_once() -> TestResult {
    let mut source = MockCatalogSource::new();

    source
        .expect_fetch()
        .times(1)
        .returning(|| Ok(Arc::new(Catalog::default())));

    let cached = CachedCatalog::new(source);

    cached.fetch().await?;
    cached.fetch().await?;

    Ok(())
}

#[tokio::test]
async fn listing_search_and_detail_from_sample_catalog() -> TestResult {
    let pricing = PricingPolicy::default();
    let catalog = FileCatalog::new(manifest_path("data/products.json")).fetch().await?;

    let listing = product_listing(&catalog, "rtx", &pricing)?;

    assert_eq!(listing.cards.len(), 1);
    assert_eq!(
        listing.cards.first().map(|card| card.installment_count),
        Some(12)
    );

    let none = product_listing(&catalog, "teclado", &pricing)?;

    assert!(none.cards.is_empty());
    assert!(none.message().is_some());

    let entry = catalog.find(&ProductId::from("1")).ok_or("missing product 1")?;
    let detail = ProductDetail::from_entry(entry, &pricing)?;

    // 1139.90 less 5%, the same as a one-unit cart
    assert_eq!(detail.card.price_cash, Money::from_minor(108_290, iso::BRL));
    assert_eq!(detail.reviews.len(), 2);
    assert!(detail.to_text().contains("AMD"));

    Ok(())
}

#[tokio::test]
async fn cart_checks_stock_against_file_catalog() -> TestResult {
    let service = CartService::new(
        CartStore::new(MemoryStorage::new()),
        Arc::new(CachedCatalog::new(FileCatalog::new(manifest_path(
            "data/products.json",
        )))),
    );

    let id = ProductId::from("3");

    service.add(&id).await?;

    assert!(service.add(&id).await.is_err());
    assert!(service.add(&ProductId::from("4")).await.is_err());
    assert_eq!(service.cart().await.item_count(), 1);

    Ok(())
}
