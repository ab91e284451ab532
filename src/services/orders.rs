use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};

use crate::db::{Db, ORDERS};
use crate::model::{Order, OrderItem};
use crate::order::{OrderStatus, ValidatedOrder};
use crate::report::ReportPeriod;
use crate::schedule::{RestaurantId, format_iso_date};

fn coll(db: &Db) -> Collection<Order> {
    db.collection::<Order>(ORDERS)
}

/// Stores an order that passed intake. New orders start as `pending`.
pub async fn create(db: &Db, order: &ValidatedOrder) -> Result<ObjectId> {
    let now = DateTime::now();
    let draft = &order.draft;
    let items = draft
        .lines
        .iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let doc = Order {
        id: None,
        order_code: nanoid::nanoid!(8),
        restaurant_id: draft.restaurant_id.as_str().to_string(),
        delivery_date: format_iso_date(draft.delivery_date),
        status: OrderStatus::Pending,
        items,
        total_amount_cents: order.total_cents,
        notes: draft.notes.clone().filter(|n| !n.trim().is_empty()),
        created_by: draft.created_by.clone(),
        confirmed_by: None,
        confirmed_at: None,
        created_at: now,
        updated_at: now,
    };
    let r = coll(db).insert_one(doc).await?;
    let id = r
        .inserted_id
        .as_object_id()
        .context("order insert returned no ObjectId")?;
    tracing::info!(order_id = %id, restaurant_id = %draft.restaurant_id, "order created");
    Ok(id)
}

pub async fn get(db: &Db, id: ObjectId) -> Result<Option<Order>> {
    Ok(coll(db).find_one(doc! { "_id": id }).await?)
}

/// Orders of one restaurant, newest first.
pub async fn list_by_restaurant(db: &Db, restaurant_id: &RestaurantId) -> Result<Vec<Order>> {
    let mut cur = coll(db)
        .find(doc! { "restaurant_id": restaurant_id.as_str() })
        .await?;
    let mut out = Vec::new();
    while let Some(o) = cur.try_next().await? {
        out.push(o);
    }
    out.sort_by_key(|o| std::cmp::Reverse(o.created_at.timestamp_millis()));
    Ok(out)
}

/// Query for the orders a report over `period` covers. Delivery dates are
/// stored as `YYYY-MM-DD`, so string bounds compare as dates.
pub fn period_filter(period: &ReportPeriod) -> Document {
    let mut filter = doc! {
        "delivery_date": {
            "$gte": format_iso_date(period.from),
            "$lte": format_iso_date(period.to),
        },
        "status": { "$ne": OrderStatus::Cancelled.as_str() },
    };
    if let Some(r) = &period.restaurant {
        filter.insert("restaurant_id", r.as_str());
    }
    filter
}

pub async fn list_by_period(db: &Db, period: &ReportPeriod) -> Result<Vec<Order>> {
    let mut cur = coll(db).find(period_filter(period)).await?;
    let mut out = Vec::new();
    while let Some(o) = cur.try_next().await? {
        out.push(o);
    }
    Ok(out)
}

/// Filter and `$set` body moving order `id` from `current` to `next`. The
/// filter matches only while the stored status is still `current`.
pub fn status_update(
    id: ObjectId,
    current: OrderStatus,
    next: OrderStatus,
    by: Option<&str>,
    now: DateTime,
) -> (Document, Document) {
    let filter = doc! { "_id": id, "status": current.as_str() };
    let mut set = doc! { "status": next.as_str(), "updated_at": now };
    if next == OrderStatus::Confirmed {
        set.insert("confirmed_at", now);
        if let Some(user) = by {
            set.insert("confirmed_by", user);
        }
    }
    (filter, doc! { "$set": set })
}

/// Moves an order along the workflow. Confirming records who did it and when.
/// Delivered and cancelled orders are final.
pub async fn set_status(
    db: &Db,
    id: ObjectId,
    next: OrderStatus,
    by: Option<&str>,
) -> Result<OrderStatus> {
    let order = get(db, id)
        .await?
        .with_context(|| format!("order {id} not found"))?;
    let status = order.status.transition(next)?;

    let (filter, update) = status_update(id, order.status, status, by, DateTime::now());
    let r = coll(db).update_one(filter, update).await?;
    anyhow::ensure!(r.matched_count == 1, "order {id} changed concurrently, reload and retry");

    tracing::info!(order_id = %id, from = %order.status, to = %status, "order status changed");
    Ok(status)
}
