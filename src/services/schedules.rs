use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::{DateTime, doc};

use crate::db::{Db, SCHEDULES};
use crate::ports::{ScheduleStore, StoreError};
use crate::schedule::{DeliverySchedule, RestaurantId, ScheduleRecord};

use super::store_error;

/// [`ScheduleStore`] backed by the `delivery_schedules` collection.
#[derive(Clone)]
pub struct MongoScheduleStore {
    db: Db,
}

impl MongoScheduleStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn coll(&self) -> Collection<ScheduleRecord> {
        self.db.collection::<ScheduleRecord>(SCHEDULES)
    }
}

#[async_trait]
impl ScheduleStore for MongoScheduleStore {
    async fn get_schedule(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Option<DeliverySchedule>, StoreError> {
        let rec = self
            .coll()
            .find_one(doc! { "restaurant_id": restaurant_id.as_str() })
            .await
            .map_err(store_error)?;

        rec.map(DeliverySchedule::try_from)
            .transpose()
            .map_err(|source| StoreError::InvalidRecord {
                restaurant_id: restaurant_id.clone(),
                source,
            })
    }

    async fn put_schedule(&self, schedule: &DeliverySchedule) -> Result<(), StoreError> {
        let mut rec = ScheduleRecord::from(schedule);
        rec.updated_at = Some(DateTime::now());
        self.coll()
            .replace_one(doc! { "restaurant_id": schedule.restaurant_id.as_str() }, rec)
            .upsert(true)
            .await
            .map_err(store_error)?;
        tracing::debug!(restaurant_id = %schedule.restaurant_id, "schedule saved");
        Ok(())
    }
}
