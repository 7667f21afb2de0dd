//! Catalog entities as the checkout core sees them.
//!
//! Products and collections are maintained by admin tooling; checkout only
//! reads them, and always from the store, never from client input.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CollectionId, Money, ProductId};

/// A sellable garment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Base unit price.
    pub price: Money,
    /// Whether shoppers may choose a lined variant.
    pub has_lining: bool,
    /// Unit price of the lined variant. Positive whenever `has_lining` is set.
    pub lining_price: Option<Money>,
    /// Size labels offered for this product.
    pub sizes: Vec<String>,
    pub collection_id: Option<CollectionId>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The lined unit price, if this product offers a usable lining option.
    #[must_use]
    pub fn lining_price(&self) -> Option<Money> {
        if !self.has_lining {
            return None;
        }
        self.lining_price.filter(Money::is_positive)
    }

    /// Whether shoppers can pick "with"/"without" lining for this product.
    #[must_use]
    pub fn supports_lining(&self) -> bool {
        self.lining_price().is_some()
    }
}

/// A named grouping of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub handle: String,
    pub description: String,
}

/// Authoritative product lookup used while pricing a cart.
pub trait ProductCatalog {
    /// Look up a product by id.
    fn product(&self, id: ProductId) -> Option<&Product>;
}

impl ProductCatalog for HashMap<ProductId, Product> {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.get(&id)
    }
}

impl ProductCatalog for [Product] {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.iter().find(|p| p.id == id)
    }
}
