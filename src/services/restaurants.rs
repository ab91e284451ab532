use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{doc, oid::ObjectId};

use crate::db::{Db, RESTAURANTS};
use crate::model::Restaurant;
use crate::ports::{RestaurantDirectory, StoreError};
use crate::schedule::RestaurantId;

use super::store_error;

fn coll(db: &Db) -> Collection<Restaurant> {
    db.collection::<Restaurant>(RESTAURANTS)
}

pub async fn list_active(db: &Db) -> mongodb::error::Result<Vec<Restaurant>> {
    let mut cur = coll(db)
        .find(doc! { "is_active": true })
        .sort(doc! { "name": 1 })
        .await?;
    let mut out = Vec::new();
    while let Some(r) = cur.try_next().await? {
        out.push(r);
    }
    Ok(out)
}

/// Restaurant by directory id. Ids that are not ObjectId hex match nothing.
pub async fn find(db: &Db, id: &RestaurantId) -> mongodb::error::Result<Option<Restaurant>> {
    let Ok(oid) = ObjectId::parse_str(id.as_str()) else {
        return Ok(None);
    };
    coll(db).find_one(doc! { "_id": oid }).await
}

/// [`RestaurantDirectory`] over the `restaurants` collection. Ids are the
/// hex form of the document `_id`.
#[derive(Clone)]
pub struct MongoRestaurantDirectory {
    db: Db,
}

impl MongoRestaurantDirectory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RestaurantDirectory for MongoRestaurantDirectory {
    async fn list_restaurant_ids(&self) -> Result<Vec<RestaurantId>, StoreError> {
        let restaurants = list_active(&self.db).await.map_err(store_error)?;
        Ok(restaurants
            .into_iter()
            .filter_map(|r| r.id)
            .map(|id| RestaurantId::new(id.to_hex()))
            .collect())
    }
}
