//! Product views

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

use crate::{
    catalog::Catalog,
    pricing::{Amount, PricingError, PricingPolicy, split_evenly},
    products::{CatalogEntry, ProductId, Review},
};

/// Installments a product is split into when its entry does not say.
pub const DEFAULT_INSTALLMENT_COUNT: u8 = 10;

/// Shown when a search matches no products.
pub const NO_PRODUCTS_MESSAGE: &str = "No products found.";

/// Shown when a product has no reviews.
pub const NO_REVIEWS_MESSAGE: &str = "No reviews available.";

/// Shown when a product has no specifications.
pub const NO_SPECIFICATIONS_MESSAGE: &str = "No specifications available.";

const MAX_STARS: usize = 5;

/// A product as shown in a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    /// Product id
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Product image
    pub image: Option<String>,

    /// Price paid in one go, the same as a one-unit cart's cash total
    pub price_cash: Amount,

    /// Number of installments offered
    pub installment_count: u8,

    /// Amount per installment
    pub installment_amount: Amount,
}

impl ProductCard {
    /// Build a card for `entry`.
    ///
    /// The cash price applies the policy's rate the same way a cart does. The
    /// installment amount is the entry's installment price split over its count;
    /// entries without an installment price use the policy's financed price.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if a price does not fit in minor units.
    pub fn from_entry(entry: &CatalogEntry, pricing: &PricingPolicy) -> Result<Self, PricingError> {
        let totals = pricing.totals_for(pricing.amount(entry.price_cash)?)?;

        let installment_count = entry
            .installments
            .filter(|count| *count > 0)
            .unwrap_or(DEFAULT_INSTALLMENT_COUNT);

        let financed = match entry.price_installments {
            Some(price) => pricing.amount(price)?,
            None => totals.financed,
        };

        Ok(Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            image: entry.image.clone(),
            price_cash: totals.cash,
            installment_count,
            installment_amount: split_evenly(financed, installment_count)?,
        })
    }
}

/// Product Listing
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    /// Matching products in catalog order
    pub cards: Vec<ProductCard>,
}

impl ProductListing {
    /// Message shown instead of cards, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.cards.is_empty().then_some(NO_PRODUCTS_MESSAGE)
    }

    /// Render the listing as a table.
    pub fn to_table(&self) -> String {
        if let Some(message) = self.message() {
            return message.to_string();
        }

        let mut builder = Builder::default();

        builder.push_record(["Id", "Product", "Cash", "Installments"]);

        for card in &self.cards {
            builder.push_record([
                card.id.to_string(),
                card.name.clone(),
                card.price_cash.to_string(),
                format!("{}x {}", card.installment_count, card.installment_amount),
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..4), Alignment::right());

        table.to_string()
    }
}

/// List the products whose name contains `term`, ignoring case.
///
/// # Errors
///
/// Returns a [`PricingError`] if a card cannot be priced.
pub fn product_listing(
    catalog: &Catalog,
    term: &str,
    pricing: &PricingPolicy,
) -> Result<ProductListing, PricingError> {
    let cards = catalog
        .search(term)
        .into_iter()
        .map(|entry| ProductCard::from_entry(entry, pricing))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProductListing { cards })
}

/// Average rating across a product's reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingSummary {
    /// Average rating, one decimal place
    pub average: Decimal,

    /// Five-star rendering of the average
    pub stars: String,

    /// Number of reviews
    pub count: usize,
}

impl RatingSummary {
    /// Summarise `reviews`, or `None` if there are none.
    pub fn from_reviews(reviews: &[Review]) -> Option<Self> {
        let count = reviews.len();

        let total = reviews
            .iter()
            .try_fold(Decimal::ZERO, |acc, review| acc.checked_add(review.rating))?;

        let average = total
            .checked_div(Decimal::from(count))?
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        Some(Self {
            average,
            stars: render_stars(average),
            count,
        })
    }
}

/// One review as shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewView {
    /// Reviewer name
    pub user: String,

    /// Review date, if given
    pub date: Option<String>,

    /// Five-star rendering of the rating
    pub stars: String,

    /// Review text
    pub comment: Option<String>,
}

/// Product Detail
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    /// Name, image and prices
    pub card: ProductCard,

    /// Brand name
    pub brand: Option<String>,

    /// Long description
    pub description: Option<String>,

    /// Availability text
    pub availability: Option<String>,

    /// Specification label and value pairs
    pub specifications: Vec<(String, String)>,

    /// Rating summary; `None` when there are no reviews
    pub rating: Option<RatingSummary>,

    /// Individual reviews
    pub reviews: Vec<ReviewView>,
}

impl ProductDetail {
    /// Build the detail view for `entry`.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if a price does not fit in minor units.
    pub fn from_entry(entry: &CatalogEntry, pricing: &PricingPolicy) -> Result<Self, PricingError> {
        let specifications = entry
            .specifications
            .iter()
            .map(|(key, value)| (specification_label(key), value.to_string()))
            .collect();

        let reviews = entry
            .reviews
            .iter()
            .map(|review| ReviewView {
                user: review.user.clone(),
                date: review.date.clone(),
                stars: render_stars(review.rating),
                comment: review.comment.clone(),
            })
            .collect();

        Ok(Self {
            card: ProductCard::from_entry(entry, pricing)?,
            brand: entry.brand.clone(),
            description: entry.description.clone(),
            availability: entry.availability.clone(),
            specifications,
            rating: RatingSummary::from_reviews(&entry.reviews),
            reviews,
        })
    }

    /// Render the detail page as plain text.
    pub fn to_text(&self) -> String {
        let mut lines = vec![self.card.name.clone()];

        if let Some(brand) = &self.brand {
            lines.push(format!("Brand: {brand}"));
        }

        lines.extend(self.description.iter().cloned());
        lines.extend(self.availability.iter().cloned());

        lines.push(format!("{} in cash", self.card.price_cash));
        lines.push(format!(
            "or {}x of {}",
            self.card.installment_count, self.card.installment_amount
        ));

        lines.push(String::new());
        lines.push("Specifications".to_string());

        if self.specifications.is_empty() {
            lines.push(NO_SPECIFICATIONS_MESSAGE.to_string());
        } else {
            lines.extend(
                self.specifications
                    .iter()
                    .map(|(label, value)| format!("{label}: {value}")),
            );
        }

        lines.push(String::new());

        match &self.rating {
            Some(rating) => {
                lines.push(format!("Reviews {} ({}/5)", rating.stars, rating.average));

                for review in &self.reviews {
                    let date = review.date.as_deref().unwrap_or_default();

                    lines.push(format!("{} {} {date}", review.stars, review.user));
                    lines.extend(review.comment.iter().map(|comment| format!("  {comment}")));
                }
            }
            None => lines.push(NO_REVIEWS_MESSAGE.to_string()),
        }

        lines.join("\n")
    }
}

/// Display label for a specification key.
pub fn specification_label(key: &str) -> String {
    let known = match key {
        "socket" => "Socket",
        "chipset" => "Chipset",
        "memory" => "Memory",
        "pcieSlots" => "PCIe Slots",
        "connections" => "Connections",
        "power" => "Power",
        "certification" => "Certification",
        "boostClock" => "Boost Clock",
        "cores" => "Cores",
        "threads" => "Threads",
        "cache" => "Cache",
        "tdp" => "TDP",
        "capacity" => "Capacity",
        "interface" => "Interface",
        "read" => "Read Speed",
        "write" => "Write Speed",
        "size" => "Size",
        "resolution" => "Resolution",
        "refreshRate" => "Refresh Rate",
        "responseTime" => "Response Time",
        "cooling" => "Cooling",
        "technologies" => "Technologies",
        "color" => "Color",
        "material" => "Material",
        "adjustments" => "Adjustments",
        "coolingSupport" => "Cooling Support",
        _ => return capitalise(key),
    };

    known.to_string()
}

fn capitalise(key: &str) -> String {
    let mut chars = key.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Five stars, filled up to `rating` rounded to the nearest whole star.
pub fn render_stars(rating: Decimal) -> String {
    let filled = rating
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_usize()
        .unwrap_or(0)
        .min(MAX_STARS);

    "★".repeat(filled) + &"☆".repeat(MAX_STARS - filled)
}
