//! Storefront configuration

use std::{path::PathBuf, sync::Arc};

use clap::{Args, ValueEnum};
use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::iso;
use thiserror::Error;

use crate::{
    cart::{CartStore, DEFAULT_CART_KEY, FileStorage},
    catalog::{CachedCatalog, CatalogSource, FileCatalog, HttpCatalog},
    pricing::{DEFAULT_MAX_INSTALLMENTS, PricingPolicy, RateMode},
};

/// Errors raised while turning settings into runtime values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The currency code is not an ISO 4217 code
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The rate is not a percentage between 0% and 100%
    #[error("invalid rate: {0}")]
    InvalidRate(String),
}

/// Storefront settings.
#[derive(Debug, Args)]
pub struct StorefrontConfig {
    /// Product catalog settings.
    #[command(flatten)]
    pub catalog: CatalogConfig,

    /// Cart storage settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Pricing settings.
    #[command(flatten)]
    pub pricing: PricingConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Product catalog settings.
#[derive(Debug, Args)]
pub struct CatalogConfig {
    /// Catalog file (.json, .yml, .yaml) or http(s) URL
    #[arg(
        long = "catalog",
        env = "STOREFRONT_CATALOG",
        default_value = "data/products.json"
    )]
    pub source: String,
}

impl CatalogConfig {
    /// Build the catalog source. URLs are fetched over HTTP; anything else is a file path.
    /// Either way the first successful fetch is cached.
    pub fn catalog_source(&self) -> Arc<dyn CatalogSource> {
        if is_url(&self.source) {
            Arc::new(CachedCatalog::new(HttpCatalog::new(self.source.clone())))
        } else {
            Arc::new(CachedCatalog::new(FileCatalog::new(&self.source)))
        }
    }
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();

    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Cart storage settings.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory the cart file is kept in
    #[arg(long, env = "STOREFRONT_CART_DIR", default_value = ".storefront")]
    pub cart_dir: PathBuf,

    /// Storage key the cart is saved under
    #[arg(long, env = "STOREFRONT_CART_KEY", default_value = DEFAULT_CART_KEY)]
    pub cart_key: String,
}

impl StorageConfig {
    /// Build a file-backed cart store.
    pub fn cart_store(&self) -> CartStore<FileStorage> {
        CartStore::with_key(FileStorage::new(&self.cart_dir), self.cart_key.clone())
    }
}

/// Which total the rate is applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RateDirection {
    /// Cart prices are financed prices; paying cash takes the rate off.
    #[default]
    Discount,

    /// Cart prices are cash prices; paying in installments adds the rate on.
    Markup,
}

impl From<RateDirection> for RateMode {
    fn from(direction: RateDirection) -> Self {
        match direction {
            RateDirection::Discount => RateMode::DiscountFromFinanced,
            RateDirection::Markup => RateMode::MarkupOnCash,
        }
    }
}

/// Pricing settings.
#[derive(Debug, Args)]
pub struct PricingConfig {
    /// ISO 4217 currency code
    #[arg(long, env = "STOREFRONT_CURRENCY", default_value = "BRL")]
    pub currency: String,

    /// Rate between cash and financed totals, e.g. "5%" or "0.05"
    #[arg(long, env = "STOREFRONT_RATE", default_value = "5%")]
    pub rate: String,

    /// Which total the rate is applied to
    #[arg(long, env = "STOREFRONT_RATE_DIRECTION", value_enum, default_value_t = RateDirection::Discount)]
    pub rate_direction: RateDirection,

    /// Largest number of installments offered
    #[arg(
        long,
        env = "STOREFRONT_MAX_INSTALLMENTS",
        default_value_t = DEFAULT_MAX_INSTALLMENTS,
        value_parser = clap::value_parser!(u8).range(1..)
    )]
    pub max_installments: u8,
}

impl PricingConfig {
    /// Build the pricing policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the currency or the rate is invalid.
    pub fn pricing_policy(&self) -> Result<PricingPolicy, ConfigError> {
        let code = self.currency.trim().to_ascii_uppercase();

        let currency = iso::find(&code).ok_or(ConfigError::UnknownCurrency(code))?;

        Ok(PricingPolicy::new(currency)
            .with_rate(parse_rate(&self.rate)?)
            .with_mode(self.rate_direction.into())
            .with_max_installments(self.max_installments))
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    #[default]
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Parse a rate given as a percentage ("5%") or a fraction ("0.05").
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRate`] if the text is not a number or falls outside
/// 0% to 100%.
pub fn parse_rate(s: &str) -> Result<Percentage, ConfigError> {
    let trimmed = s.trim();
    let invalid = || ConfigError::InvalidRate(s.to_string());

    let fraction = if let Some(percent) = trimmed.strip_suffix('%') {
        percent
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| invalid())?
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or_else(invalid)?
    } else {
        trimmed.parse::<Decimal>().map_err(|_err| invalid())?
    };

    if fraction.is_sign_negative() || fraction > Decimal::ONE {
        return Err(invalid());
    }

    Ok(Percentage::from(fraction))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: StorefrontConfig,
    }

    #[test]
    fn parse_rate_accepts_percentage_format() -> TestResult {
        assert_eq!(parse_rate("5%")?, Percentage::from(Decimal::new(5, 2)));
        assert_eq!(parse_rate(" 12.5 % ")?, Percentage::from(Decimal::new(125, 3)));

        Ok(())
    }

    #[test]
    fn parse_rate_accepts_fraction_format() -> TestResult {
        assert_eq!(parse_rate("0.05")?, Percentage::from(Decimal::new(5, 2)));

        Ok(())
    }

    #[test]
    fn parse_rate_rejects_garbage_and_out_of_range() {
        assert_eq!(parse_rate("five"), Err(ConfigError::InvalidRate("five".to_string())));
        assert!(parse_rate("-1%").is_err());
        assert!(parse_rate("150%").is_err());
    }

    #[test]
    fn pricing_policy_from_arguments() -> TestResult {
        let cli = TestCli::try_parse_from([
            "storefront",
            "--currency",
            "usd",
            "--rate",
            "10%",
            "--rate-direction",
            "markup",
            "--max-installments",
            "6",
        ])?;

        let policy = cli.config.pricing.pricing_policy()?;

        assert_eq!(policy.currency(), iso::USD);
        assert_eq!(policy.mode(), RateMode::MarkupOnCash);
        assert_eq!(policy.max_installments(), 6);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() -> TestResult {
        let cli = TestCli::try_parse_from(["storefront", "--currency", "XYZ1"])?;

        assert_eq!(
            cli.config.pricing.pricing_policy(),
            Err(ConfigError::UnknownCurrency("XYZ1".to_string()))
        );

        Ok(())
    }

    #[test]
    fn zero_installments_is_rejected_by_parser() {
        assert!(TestCli::try_parse_from(["storefront", "--max-installments", "0"]).is_err());
    }

    #[test]
    fn urls_select_http_catalog() {
        assert!(is_url("https://shop.example/products.json"));
        assert!(is_url("HTTP://shop.example/products.json"));
        assert!(!is_url("data/products.json"));
    }
}
