//! Catalog repository: products and collections.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use atelier_core::catalog::{Collection, Product};
use atelier_core::{CollectionId, Money, ProductId};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    has_lining: bool,
    lining_price: Option<Money>,
    sizes: Vec<String>,
    collection_id: Option<CollectionId>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            has_lining: row.has_lining,
            lining_price: row.lining_price,
            sizes: row.sizes,
            collection_id: row.collection_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CollectionRow {
    id: CollectionId,
    name: String,
    handle: String,
    description: String,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            handle: row.handle,
            description: row.description,
        }
    }
}

/// Product fields for inserts.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub lining_price: Option<Money>,
    pub sizes: Vec<String>,
    pub collection_id: Option<CollectionId>,
}

/// Repository for catalog reads and seeding.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first, optionally within one collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        collection: Option<CollectionId>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, has_lining, lining_price,
                   sizes, collection_id, created_at
            FROM storefront.product
            WHERE $1::integer IS NULL OR collection_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(collection)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, has_lining, lining_price,
                   sizes, collection_id, created_at
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Load every listed product in one round trip. Missing ids are simply absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, has_lining, lining_price,
                   sizes, collection_id, created_at
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.id, Product::from(row)))
            .collect())
    }

    /// List all collections by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_collections(&self) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            "SELECT id, name, handle, description FROM storefront.collection ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Collection::from).collect())
    }

    /// Insert a collection, or update the one with the same handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_collection(
        &self,
        name: &str,
        handle: &str,
        description: &str,
    ) -> Result<Collection, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(
            r"
            INSERT INTO storefront.collection (name, handle, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle) DO UPDATE
                SET name = EXCLUDED.name, description = EXCLUDED.description
            RETURNING id, name, handle, description
            ",
        )
        .bind(name)
        .bind(handle)
        .bind(description)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Whether a product with this exact name exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_named(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.product WHERE name = $1)",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a product. A lining price turns the lining option on.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the lining price is not positive.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.product
                (name, description, price, has_lining, lining_price, sizes, collection_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, description, price, has_lining, lining_price,
                      sizes, collection_id, created_at
            ",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.lining_price.is_some())
        .bind(product.lining_price)
        .bind(&product.sizes)
        .bind(product.collection_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict(format!(
                    "product '{}' violates a catalog constraint",
                    product.name
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
