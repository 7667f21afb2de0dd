//! Catalog seeding from YAML.
//!
//! ```yaml
//! collections:
//!   - name: Festive
//!     handle: festive
//!     description: Lehengas and sarees for the season
//!     products:
//!       - name: Silk Lehenga
//!         price: 5000
//!         liningPrice: 5600
//!         sizes: [S, M, L, XL]
//! ```
//!
//! Collections are upserted by handle. Products are inserted only when no
//! product with the same name exists, so the command can be re-run.

use std::path::Path;

use serde::Deserialize;

use atelier_core::Money;
use atelier_storefront::db::ProductRepository;
use atelier_storefront::db::products::NewProduct;

use super::{CommandError, connect};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub collections: Vec<CollectionSeed>,
}

/// A collection and its products.
#[derive(Debug, Deserialize)]
pub struct CollectionSeed {
    pub name: String,
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// A product to insert.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub lining_price: Option<Money>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

/// Check a parsed seed before touching the database.
fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();
    for collection in &seed.collections {
        if collection.handle.trim().is_empty() {
            errors.push(format!("collection '{}' has no handle", collection.name));
        }
        for product in &collection.products {
            if product.price.is_negative() {
                errors.push(format!("product '{}' has a negative price", product.name));
            }
            if product.lining_price.is_some_and(|p| !p.is_positive()) {
                errors.push(format!(
                    "product '{}' has a lining price that is not positive",
                    product.name
                ));
            }
        }
    }
    errors
}

/// Seed collections and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<(), CommandError> {
    let content = tokio::fs::read_to_string(Path::new(file_path)).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        for error in &errors {
            tracing::error!("{error}");
        }
        return Err(CommandError::Invalid(format!(
            "{} problem(s) in {file_path}",
            errors.len()
        )));
    }

    let pool = connect().await?;
    let products = ProductRepository::new(&pool);

    let (mut inserted, mut skipped) = (0usize, 0usize);
    for collection in seed.collections {
        let saved = products
            .upsert_collection(&collection.name, &collection.handle, &collection.description)
            .await?;
        tracing::info!(handle = %saved.handle, "Collection ready");

        for product in collection.products {
            if products.exists_named(&product.name).await? {
                skipped += 1;
                continue;
            }
            products
                .create(&NewProduct {
                    name: product.name,
                    description: product.description,
                    price: product.price,
                    lining_price: product.lining_price,
                    sizes: product.sizes,
                    collection_id: Some(saved.id),
                })
                .await?;
            inserted += 1;
        }
    }

    tracing::info!(inserted, skipped, "Catalog seeded");
    Ok(())
}
