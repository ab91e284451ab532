//! Collaborators the desk core talks to.
//!
//! The MongoDB adapters live in [`crate::services`]; tests use in-memory or
//! mocked implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::Clock;
use thiserror::Error;

use crate::model::Product;
use crate::schedule::{DeliverySchedule, RestaurantId, ScheduleError};

/// Errors raised by store and directory adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store could not be reached.
    #[error("store connection failed: {message}")]
    Connection { message: String },
    /// Query or write failed.
    #[error("store query failed: {message}")]
    Query { message: String },
    /// Stored document did not pass schedule validation.
    #[error("stored schedule for {restaurant_id} is invalid: {source}")]
    InvalidRecord {
        restaurant_id: RestaurantId,
        #[source]
        source: ScheduleError,
    },
}

impl StoreError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }
}

/// Keyed storage of delivery schedules, one per restaurant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Stored schedule for a restaurant, active or not.
    async fn get_schedule(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Option<DeliverySchedule>, StoreError>;

    /// Replace the restaurant's schedule wholesale, creating it if missing.
    async fn put_schedule(&self, schedule: &DeliverySchedule) -> Result<(), StoreError>;
}

/// Read-only list of restaurants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    /// Active restaurants ordered by name.
    async fn list_restaurant_ids(&self) -> Result<Vec<RestaurantId>, StoreError>;
}

/// Product lookups for pricing order lines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// The active product with `code`; inactive products are not returned.
    async fn find_active(&self, code: &str) -> Result<Option<Product>, StoreError>;
}

/// Local calendar date according to `clock`.
pub fn today(clock: &dyn Clock) -> NaiveDate {
    clock.local().date_naive()
}

/// The stored schedule as it is, active or not; the default only when nothing
/// is stored. This is the base for edits and templates.
pub async fn stored_or_default<S>(
    store: &S,
    restaurant_id: &RestaurantId,
) -> Result<DeliverySchedule, StoreError>
where
    S: ScheduleStore + ?Sized,
{
    match store.get_schedule(restaurant_id).await? {
        Some(stored) => Ok(stored),
        None => {
            tracing::info!(
                restaurant_id = %restaurant_id,
                "no schedule stored, starting from the default"
            );
            Ok(DeliverySchedule::default_for(restaurant_id.clone()))
        }
    }
}

/// Effective schedule for a restaurant: stored and active, else the default.
pub async fn resolve_schedule<S>(
    store: &S,
    restaurant_id: &RestaurantId,
) -> Result<DeliverySchedule, StoreError>
where
    S: ScheduleStore + ?Sized,
{
    let stored = store.get_schedule(restaurant_id).await?;
    match &stored {
        None => tracing::debug!(restaurant_id = %restaurant_id, "no schedule stored, using default"),
        Some(s) if !s.is_active => {
            tracing::info!(restaurant_id = %restaurant_id, "stored schedule is inactive, using default")
        }
        Some(_) => {}
    }
    Ok(DeliverySchedule::effective(stored, restaurant_id))
}
