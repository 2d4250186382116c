//! Storefront CLI

use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
};

use clap::{Parser, Subcommand};
use storefront::{
    actions::{CartAction, Storefront},
    cart::{CartService, Confirmation},
    catalog::CatalogError,
    config::{ConfigError, StorefrontConfig},
    feedback::{Feedback, FeedbackKind, Notifier},
    logging::{LoggingError, init_subscriber},
    pricing::PricingError,
    products::ProductId,
    view::{Page, ProductDetail, RenderLoop, TableRenderer, products::product_listing},
};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront catalog and cart", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: StorefrontConfig,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List products, optionally filtered by name
    Products {
        /// Case-insensitive name filter
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a product's details, specifications and reviews
    Product {
        /// Product id
        id: String,
    },

    /// Add one unit of a product to the cart
    Add {
        /// Product id
        id: String,
    },

    /// Add one unit to a cart line
    Increase {
        /// Product id
        id: String,
    },

    /// Take one unit off a cart line
    Decrease {
        /// Product id
        id: String,
    },

    /// Remove a cart line
    Remove {
        /// Product id
        id: String,
    },

    /// Empty the cart
    Clear,

    /// Show the cart
    Show {
        /// Number of installments to quote
        #[arg(short, long)]
        installments: Option<u8>,
    },

    /// Complete the purchase
    Checkout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),
}

/// Prints feedback to the terminal.
#[derive(Debug, Clone, Copy)]
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    #[expect(clippy::print_stdout, reason = "feedback is CLI output")]
    fn notify(&self, feedback: &Feedback) {
        let marker = match feedback.kind {
            FeedbackKind::Success => "✔",
            FeedbackKind::Warning => "!",
            FeedbackKind::Error => "✘",
        };

        println!("{marker} {feedback}");
    }
}

/// Asks on the terminal, unless told to assume yes.
#[derive(Debug, Clone, Copy)]
struct PromptConfirmation {
    assume_yes: bool,
}

impl Confirmation for PromptConfirmation {
    #[expect(clippy::print_stdout, reason = "confirmation prompt is CLI output")]
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{prompt} [y/N] ");
        _ = io::stdout().flush();

        let mut answer = String::new();

        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }

        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::load() {
        Ok(cli) => cli,
        Err(error) => {
            _ = error.print();

            return ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2));
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);

            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "fatal errors are reported on stderr")]
fn report(error: &CliError) {
    eprintln!("error: {error}");
}

async fn run(cli: Cli) -> Result<(), CliError> {
    init_subscriber(&cli.config.logging)?;

    let pricing = cli.config.pricing.pricing_policy()?;
    let catalog = cli.config.catalog.catalog_source();
    let assume_yes = matches!(cli.command, Commands::Checkout { yes: true });

    let action = match cli.command {
        Commands::Products { search } => {
            let catalog = catalog.fetch().await?;
            let listing = product_listing(&catalog, search.as_deref().unwrap_or_default(), &pricing)?;

            print_block(&listing.to_table());

            return Ok(());
        }
        Commands::Product { id } => {
            let id = ProductId::new(id);
            let catalog = catalog.fetch().await?;
            let entry = catalog.find(&id).ok_or_else(|| CliError::ProductNotFound(id.clone()))?;

            print_block(&ProductDetail::from_entry(entry, &pricing)?.to_text());

            return Ok(());
        }
        Commands::Add { id } => Some(CartAction::Add(ProductId::new(id))),
        Commands::Increase { id } => Some(CartAction::Increment(ProductId::new(id))),
        Commands::Decrease { id } => Some(CartAction::Decrement(ProductId::new(id))),
        Commands::Remove { id } => Some(CartAction::Remove(ProductId::new(id))),
        Commands::Clear => Some(CartAction::Clear),
        Commands::Show { installments } => installments.map(CartAction::SelectInstallments),
        Commands::Checkout { .. } => Some(CartAction::Checkout),
    };

    let storefront = Storefront::new(
        CartService::new(cli.config.storage.cart_store(), catalog),
        Arc::new(RenderLoop::new(pricing, TableRenderer, Page::full())),
        Arc::new(ConsoleNotifier),
        Arc::new(PromptConfirmation { assume_yes }),
    );

    storefront.start().await;

    if let Some(action) = action {
        storefront.dispatch(action).await;
    }

    print_page(&storefront.view().page());

    Ok(())
}

#[expect(clippy::print_stdout, reason = "command output")]
fn print_block(text: &str) {
    println!("{text}");
}

fn print_page(page: &Page) {
    let mounts = [&page.cart_rows, &page.summary];

    for mount in mounts.into_iter().flatten().filter(|mount| mount.visible) {
        print_block(&mount.content);
    }

    if let Some(badge) = &page.badge {
        print_block(&format!("Items in cart: {}", badge.content));
    }
}
