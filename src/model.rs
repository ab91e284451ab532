use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::order::{OrderError, OrderLine, OrderStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Catalog entry. Prices are per stack, in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price_per_stack_cents: i64,
    #[serde(default = "one_item")]
    pub items_per_stack: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

fn one_item() -> i64 {
    1
}

/// Line as stored inside an order document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_per_stack_cents: i64,
    pub total_price_cents: i64,
}

impl TryFrom<&OrderLine> for OrderItem {
    type Error = OrderError;

    fn try_from(l: &OrderLine) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: l.product_id.clone(),
            product_code: l.product_code.clone(),
            product_name: l.product_name.clone(),
            quantity: l.quantity,
            price_per_stack_cents: l.price_per_stack_cents,
            total_price_cents: l.line_total_cents()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub order_code: String,
    pub restaurant_id: String,
    /// `YYYY-MM-DD`
    pub delivery_date: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount_cents: i64,

    #[serde(default)]
    pub notes: Option<String>,
    pub created_by: String,

    #[serde(default)]
    pub confirmed_by: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}
