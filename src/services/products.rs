use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{doc, oid::ObjectId};

use crate::db::{Db, PRODUCTS};
use crate::model::Product;
use crate::ports::{ProductCatalog, StoreError};

use super::store_error;

fn coll(db: &Db) -> Collection<Product> {
    db.collection::<Product>(PRODUCTS)
}

/// Active products in catalog order.
pub async fn list_active(db: &Db) -> mongodb::error::Result<Vec<Product>> {
    let mut cur = coll(db)
        .find(doc! { "is_active": true })
        .sort(doc! { "sort_order": 1, "code": 1 })
        .await?;
    let mut out = Vec::new();
    while let Some(p) = cur.try_next().await? {
        out.push(p);
    }
    Ok(out)
}

pub async fn find_active_by_code(db: &Db, code: &str) -> mongodb::error::Result<Option<Product>> {
    coll(db)
        .find_one(doc! { "code": code.trim(), "is_active": true })
        .await
}

/// Creates or replaces the product with the same code.
pub async fn upsert(db: &Db, product: &Product) -> anyhow::Result<Option<ObjectId>> {
    anyhow::ensure!(!product.code.trim().is_empty(), "product code is required");
    anyhow::ensure!(
        product.price_per_stack_cents >= 0,
        "price of {} must not be negative",
        product.code
    );
    let doc = Product { id: None, ..product.clone() };
    let r = coll(db)
        .replace_one(doc! { "code": product.code.as_str() }, doc)
        .upsert(true)
        .await?;
    tracing::info!(code = %product.code, "product saved");
    Ok(r.upserted_id.and_then(|id| id.as_object_id()))
}

/// [`ProductCatalog`] over the `products` collection.
#[derive(Clone)]
pub struct MongoProductCatalog {
    db: Db,
}

impl MongoProductCatalog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductCatalog for MongoProductCatalog {
    async fn find_active(&self, code: &str) -> Result<Option<Product>, StoreError> {
        find_active_by_code(&self.db, code).await.map_err(store_error)
    }
}
