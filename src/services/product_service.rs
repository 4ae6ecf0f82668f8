use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use crate::database::models::Product;
use crate::database::{scope_query, DatabaseError, ScopedQuery, SqlParam};
use crate::tenant::Scope;
use crate::types::{MerchantId, Page};

pub(crate) const LIST_PRODUCTS: &str = "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2";
pub(crate) const COUNT_PRODUCTS: &str = "SELECT COUNT(*) FROM products";
pub(crate) const LOW_STOCK_PRODUCTS: &str = "SELECT * FROM products WHERE stock < $1 ORDER BY stock ASC, name ASC";
pub(crate) const FIND_PRODUCT: &str = "SELECT * FROM products WHERE id = $1";
pub(crate) const DELETE_PRODUCT: &str = "DELETE FROM products WHERE id = $1";
pub(crate) const UPDATE_PRODUCT: &str = r#"
    UPDATE products
    SET name = $1, description = $2, price = $3, stock = $4, category = $5,
        image_url = $6, updated_at = NOW()
    WHERE id = $7
    RETURNING *
"#;

/// Rejected product input, reported as `(field, message)`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidProduct {
    pub field: &'static str,
    pub message: &'static str,
}

impl InvalidProduct {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    /// Owning merchant; only read for platform-wide super admin requests
    pub merchant_id: Option<MerchantId>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), InvalidProduct> {
        let has_name = self.name.as_deref().is_some_and(|n| !n.trim().is_empty());
        if !has_name || self.price.is_none() {
            return Err(InvalidProduct::new("name", "Name and price are required"));
        }
        validate_price_and_stock(self.price, self.stock)
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductChanges {
    pub fn validate(&self) -> Result<(), InvalidProduct> {
        validate_price_and_stock(self.price, self.stock)
    }

    fn apply(self, current: &Product) -> Product {
        Product {
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| current.name.clone()),
            description: self.description.or_else(|| current.description.clone()),
            price: self.price.unwrap_or(current.price),
            stock: self.stock.unwrap_or(current.stock),
            category: self.category.or_else(|| current.category.clone()),
            image_url: self.image_url.or_else(|| current.image_url.clone()),
            ..current.clone()
        }
    }
}

fn validate_price_and_stock(price: Option<Decimal>, stock: Option<i32>) -> Result<(), InvalidProduct> {
    if price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(InvalidProduct::new("price", "Price must be greater than 0"));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(InvalidProduct::new("stock", "Stock cannot be negative"));
    }
    Ok(())
}

/// Result of a product update, carrying the stock level before the change
#[derive(Debug, Clone)]
pub struct UpdatedProduct {
    pub previous_stock: i32,
    pub product: Product,
}

impl UpdatedProduct {
    pub fn ran_out(&self) -> bool {
        Product::ran_out(self.previous_stock, self.product.stock)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error(transparent)]
    Invalid(#[from] InvalidProduct),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct ProductService {
    pool: PgPool,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, scope: &Scope, page: Page) -> Result<(Vec<Product>, i64), DatabaseError> {
        let products = scope_query(
            scope,
            LIST_PRODUCTS,
            vec![SqlParam::from(page.limit), SqlParam::from(page.offset())],
        )?
        .fetch_all(&self.pool)
        .await?;

        let total = scope_query(scope, COUNT_PRODUCTS, vec![])?
            .fetch_count(&self.pool)
            .await?;

        Ok((products, total))
    }

    /// Products strictly below `threshold`, emptiest first
    pub async fn low_stock(&self, scope: &Scope, threshold: i32) -> Result<Vec<Product>, DatabaseError> {
        scope_query(scope, LOW_STOCK_PRODUCTS, vec![SqlParam::from(threshold)])?
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find(&self, scope: &Scope, id: i32) -> Result<Option<Product>, DatabaseError> {
        scope_query(scope, FIND_PRODUCT, vec![SqlParam::from(id)])?
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert a product owned by the scoped merchant. Platform-wide requests
    /// must name the owner in `merchant_id`.
    pub async fn create(&self, scope: &Scope, input: NewProduct) -> Result<Product, ProductError> {
        input.validate()?;

        let merchant_id = match scope {
            Scope::ScopedTo(id) => *id,
            Scope::Unscoped => input
                .merchant_id
                .ok_or_else(|| InvalidProduct::new("merchant_id", "merchant_id is required"))?,
        };

        let product: Product = ScopedQuery::unscoped(
            r#"
            INSERT INTO products (name, description, price, stock, category, image_url, merchant_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
            vec![
                SqlParam::from(input.name.unwrap_or_default().trim()),
                SqlParam::from(input.description),
                SqlParam::from(input.price.unwrap_or_default()),
                SqlParam::from(input.stock.unwrap_or(0)),
                SqlParam::from(input.category),
                SqlParam::from(input.image_url),
                SqlParam::from(merchant_id),
            ],
        )
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created product {} for merchant {}", product.id, merchant_id);
        Ok(product)
    }

    /// Apply `changes` to a product visible in `scope`. `None` when no such product.
    pub async fn update(
        &self,
        scope: &Scope,
        id: i32,
        changes: ProductChanges,
    ) -> Result<Option<UpdatedProduct>, ProductError> {
        changes.validate()?;

        let Some(current) = self.find(scope, id).await? else {
            return Ok(None);
        };
        let previous_stock = current.stock;
        let next = changes.apply(&current);

        let product = scope_query(
            scope,
            UPDATE_PRODUCT,
            vec![
                SqlParam::from(next.name),
                SqlParam::from(next.description),
                SqlParam::from(next.price),
                SqlParam::from(next.stock),
                SqlParam::from(next.category),
                SqlParam::from(next.image_url),
                SqlParam::from(id),
            ],
        )?
        .fetch_optional::<Product>(&self.pool)
        .await?;

        Ok(product.map(|product| UpdatedProduct {
            previous_stock,
            product,
        }))
    }

    /// Returns false when nothing visible in `scope` matched
    pub async fn delete(&self, scope: &Scope, id: i32) -> Result<bool, DatabaseError> {
        let affected = scope_query(scope, DELETE_PRODUCT, vec![SqlParam::from(id)])?
            .execute(&self.pool)
            .await?;
        Ok(affected > 0)
    }

    /// Products in `0 < stock < threshold` across every merchant, for the stock monitor
    pub async fn running_low(&self, threshold: i32) -> Result<Vec<Product>, DatabaseError> {
        ScopedQuery::unscoped(
            "SELECT * FROM products WHERE stock > 0 AND stock < $1 ORDER BY merchant_id, stock ASC",
            vec![SqlParam::from(threshold)],
        )
        .fetch_all(&self.pool)
        .await
    }
}
