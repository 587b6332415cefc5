use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CONCENTRATE_MARKERS: &[&str] = &[
    "concentrate",
    "hash",
    "rosin",
    "resin",
    "wax",
    "shatter",
    "kief",
    "dab",
    "гашиш",
    "концентрат",
];

const PIECE_MARKERS: &[&str] =
    &["pre-roll", "preroll", "joint", "edible", "gummy", "gummies", "cookie", "джойнт"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrainType {
    Indica,
    Sativa,
    Hybrid,
    #[default]
    None,
}

impl StrainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indica => "indica",
            Self::Sativa => "sativa",
            Self::Hybrid => "hybrid",
            Self::None => "none",
        }
    }

    /// Lenient parse used for store rows; unknown values map to `None`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "indica" => Self::Indica,
            "sativa" => Self::Sativa,
            "hybrid" => Self::Hybrid,
            _ => Self::None,
        }
    }
}

impl fmt::Display for StrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing and presentation class derived from the free-form category name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryClass {
    Flower,
    Piece,
    Concentrate,
}

impl CategoryClass {
    pub fn of(category: &str) -> Self {
        let normalized = category.to_lowercase();
        if CONCENTRATE_MARKERS.iter().any(|marker| normalized.contains(marker)) {
            Self::Concentrate
        } else if PIECE_MARKERS.iter().any(|marker| normalized.contains(marker)) {
            Self::Piece
        } else {
            Self::Flower
        }
    }

    pub fn is_primary(self) -> bool {
        !matches!(self, Self::Concentrate)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrices {
    #[serde(default)]
    pub per_piece: Option<Decimal>,
    #[serde(default)]
    pub per_gram: Option<Decimal>,
    #[serde(default)]
    pub per_5g: Option<Decimal>,
    #[serde(default)]
    pub per_20g: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub strain_type: StrainType,
    #[serde(default)]
    pub thc: Option<Decimal>,
    #[serde(default)]
    pub cbg: Option<Decimal>,
    #[serde(default)]
    pub prices: TierPrices,
    #[serde(default)]
    pub in_house: bool,
}

impl CatalogItem {
    pub fn category_class(&self) -> CategoryClass {
        CategoryClass::of(&self.category)
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

pub fn find_item<'a>(items: &'a [CatalogItem], name: &str) -> Option<&'a CatalogItem> {
    items.iter().find(|item| item.matches_name(name))
}
