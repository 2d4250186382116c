//! Products

use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque catalog identifier.
///
/// Catalog files and stored carts carry ids either as strings or as numbers; both are
/// normalised to their string form so `7` and `"7"` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id carries no characters.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ProductId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Unsigned(id) => Self(id.to_string()),
            RawId::Signed(id) => Self(id.to_string()),
            RawId::Text(id) => Self(id),
        })
    }
}

/// A product specification value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    /// Boolean flag, e.g. `rgb: true`
    Flag(bool),

    /// Whole number, e.g. `cores: 8`
    Integer(i64),

    /// Fractional number, e.g. `weight: 1.2`
    Float(f64),

    /// Free text
    Text(String),

    /// List of values, displayed comma separated
    List(Vec<SpecValue>),
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecValue::Flag(true) => f.write_str("Yes"),
            SpecValue::Flag(false) => f.write_str("No"),
            SpecValue::Integer(value) => write!(f, "{value}"),
            SpecValue::Float(value) => write!(f, "{value}"),
            SpecValue::Text(value) => f.write_str(value),
            SpecValue::List(values) => {
                let joined = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");

                f.write_str(&joined)
            }
        }
    }
}

/// A customer review attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    /// Reviewer display name
    #[serde(alias = "usuario")]
    pub user: String,

    /// Free-form review date
    #[serde(default, alias = "data")]
    pub date: Option<String>,

    /// Rating between 0 and 5
    #[serde(alias = "nota")]
    pub rating: Decimal,

    /// Review text
    #[serde(default, alias = "comentario")]
    pub comment: Option<String>,
}

/// Catalog Entry
///
/// The authoritative, read-only product record. Field names accept both the English
/// and the Portuguese spellings found in storefront data files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Product id
    pub id: ProductId,

    /// Product name
    #[serde(alias = "nome")]
    pub name: String,

    /// Product image path
    #[serde(default, alias = "imagem")]
    pub image: Option<String>,

    /// Cash price per unit
    #[serde(alias = "precoAVista", alias = "price")]
    pub price_cash: Decimal,

    /// Total price when paid in installments
    #[serde(default, alias = "precoParcelado")]
    pub price_installments: Option<Decimal>,

    /// Number of installments the installment price is split into
    #[serde(default, alias = "parcelas")]
    pub installments: Option<u8>,

    /// Units in stock; the ceiling for cart quantities
    #[serde(default, alias = "estoque")]
    pub stock: u32,

    /// Brand name
    #[serde(default, alias = "marca")]
    pub brand: Option<String>,

    /// Long description
    #[serde(default, alias = "fullDescription", alias = "descricao")]
    pub description: Option<String>,

    /// Availability text, e.g. "In stock"
    #[serde(default, alias = "disponibilidade")]
    pub availability: Option<String>,

    /// Technical specifications
    #[serde(default, alias = "especificacoes")]
    pub specifications: BTreeMap<String, SpecValue>,

    /// Customer reviews
    #[serde(default, alias = "avaliacoes")]
    pub reviews: Vec<Review>,
}

impl CatalogEntry {
    /// Creates a minimal entry with the given id, name, cash price and stock.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price_cash: Decimal,
        stock: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: None,
            price_cash,
            price_installments: None,
            installments: None,
            stock,
            brand: None,
            description: None,
            availability: None,
            specifications: BTreeMap::new(),
            reviews: Vec::new(),
        }
    }

    /// Returns true if at least one unit is available.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn product_id_accepts_numbers_and_strings() -> TestResult {
        let numeric: ProductId = serde_json::from_str("7")?;
        let text: ProductId = serde_json::from_str("\"7\"")?;

        assert_eq!(numeric, text);
        assert_eq!(serde_json::to_string(&numeric)?, "\"7\"");

        Ok(())
    }

    #[test]
    fn product_id_blank_is_empty() {
        assert!(ProductId::new("  ").is_empty());
        assert!(!ProductId::new("a1").is_empty());
    }

    #[test]
    fn catalog_entry_accepts_portuguese_field_names() -> TestResult {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{
                "id": 3,
                "nome": "Placa-mãe B550",
                "imagem": "img/b550.png",
                "precoAVista": 899.9,
                "precoParcelado": 999.0,
                "parcelas": 10,
                "estoque": 4
            }"#,
        )?;

        assert_eq!(entry.id, ProductId::from("3"));
        assert_eq!(entry.name, "Placa-mãe B550");
        assert_eq!(entry.price_cash, Decimal::new(8999, 1));
        assert_eq!(entry.price_installments, Some(Decimal::new(999, 0)));
        assert_eq!(entry.installments, Some(10));
        assert_eq!(entry.stock, 4);

        Ok(())
    }

    #[test]
    fn catalog_entry_missing_stock_defaults_to_zero() -> TestResult {
        let entry: CatalogEntry =
            serde_json::from_str(r#"{ "id": "x", "name": "Cable", "priceCash": "9.90" }"#)?;

        assert_eq!(entry.stock, 0);
        assert!(!entry.in_stock());

        Ok(())
    }

    #[test]
    fn spec_value_lists_join_with_commas() -> TestResult {
        let value: SpecValue = serde_json::from_str(r#"["HDMI", "DisplayPort", 2]"#)?;

        assert_eq!(value.to_string(), "HDMI, DisplayPort, 2");

        Ok(())
    }
}
