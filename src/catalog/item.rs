use std::fmt;

use serde::{Deserialize, Serialize};

use super::attributes::{
    derive_brand, normalize_name, normalize_unique_key, spec_signature,
};

/// Position of an item within its catalog. Stable for the duration of a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which catalog an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// "Our" catalog.
    Left,
    /// The catalog being compared against.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// One row handed over by an external catalog loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_l1: Option<String>,
    #[serde(default)]
    pub category_l3: Option<String>,
    /// Barcode or other cross-catalog identifier.
    #[serde(default)]
    pub unique_key: Option<String>,
    #[serde(default)]
    pub spec: Option<String>,
    /// Explicit brand; derived from the name when absent.
    #[serde(default)]
    pub brand: Option<String>,
}

impl CatalogRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_categories(mut self, l1: impl Into<String>, l3: impl Into<String>) -> Self {
        self.category_l1 = Some(l1.into());
        self.category_l3 = Some(l3.into());
        self
    }

    pub fn with_unique_key(mut self, key: impl Into<String>) -> Self {
        self.unique_key = Some(key.into());
        self
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }
}

/// An ingested catalog row with its derived matching attributes.
///
/// Read-only to the matcher except for [`embedding`](Self::embedding), which the
/// pipeline attaches once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub raw_name: String,
    pub normalized_name: String,
    /// `None` when missing, non-finite or non-positive.
    pub price: Option<f64>,
    pub category_l1: String,
    pub category_l3: String,
    pub unique_key: Option<String>,
    pub brand: Option<String>,
    pub spec_signature: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl CatalogItem {
    pub fn from_record(id: ItemId, record: CatalogRecord) -> Self {
        let normalized_name = normalize_name(&record.name);
        let brand = derive_brand(&normalized_name, record.brand.as_deref());
        let spec_signature = spec_signature(&normalized_name, record.spec.as_deref());
        let price = record.price.filter(|p| p.is_finite() && *p > 0.0);

        Self {
            id,
            raw_name: record.name,
            normalized_name,
            price,
            category_l1: record.category_l1.map(|c| normalize_name(&c)).unwrap_or_default(),
            category_l3: record.category_l3.map(|c| normalize_name(&c)).unwrap_or_default(),
            unique_key: normalize_unique_key(record.unique_key.as_deref()),
            brand,
            spec_signature,
            embedding: None,
        }
    }

    /// Text sent to the embedding and reranker providers.
    #[inline]
    pub fn match_text(&self) -> &str {
        &self.normalized_name
    }

    /// `true` when both items carry the same known brand.
    pub fn brand_equals(&self, other: &CatalogItem) -> bool {
        matches!((&self.brand, &other.brand), (Some(a), Some(b)) if a == b)
    }

    /// `true` when `other`'s price lies within `tolerance` (relative to this item's price).
    ///
    /// Items without a usable price never fall inside a window.
    pub fn price_within(&self, other: &CatalogItem, tolerance: f64) -> bool {
        match (self.price, other.price) {
            (Some(base), Some(candidate)) => (candidate - base).abs() <= base * tolerance,
            _ => false,
        }
    }
}

/// Turns loader rows into items, assigning ids by position.
pub fn build_items(records: Vec<CatalogRecord>) -> Vec<CatalogItem> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| CatalogItem::from_record(ItemId(idx), record))
        .collect()
}
