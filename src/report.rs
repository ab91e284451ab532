//! Sales summaries over a delivery-date period.
//!
//! Cancelled orders never count. Amounts are summed with overflow checks; a
//! report that cannot be represented is an error, not a wrapped number.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::Order;
use crate::order::OrderStatus;
use crate::schedule::{RestaurantId, parse_iso_date};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("report period starts {from} after it ends {to}")]
    InvertedPeriod { from: NaiveDate, to: NaiveDate },

    #[error("report totals exceed the representable amount")]
    TotalOverflow,
}

/// Delivery dates from `from` to `to`, both included, optionally for one
/// restaurant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub restaurant: Option<RestaurantId>,
}

impl ReportPeriod {
    pub fn new(
        from: NaiveDate,
        to: NaiveDate,
        restaurant: Option<RestaurantId>,
    ) -> Result<Self, ReportError> {
        if from > to {
            return Err(ReportError::InvertedPeriod { from, to });
        }
        Ok(Self { from, to, restaurant })
    }

    /// Whether `order` belongs in the report. Orders with an unreadable
    /// delivery date are left out.
    pub fn covers(&self, order: &Order) -> bool {
        if order.status == OrderStatus::Cancelled {
            return false;
        }
        if let Some(r) = &self.restaurant {
            if order.restaurant_id != r.as_str() {
                return false;
            }
        }
        parse_iso_date(&order.delivery_date)
            .map(|d| (self.from..=self.to).contains(&d))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_code: String,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantSales {
    pub restaurant_id: String,
    pub order_count: usize,
    pub total_amount_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    pub total_orders: usize,
    pub total_amount_cents: i64,
    /// Rounded to the nearest cent; zero without orders.
    pub avg_order_value_cents: i64,
    pub unique_restaurants: usize,
    /// Highest amount first.
    pub products: Vec<ProductSales>,
    /// Highest amount first.
    pub restaurants: Vec<RestaurantSales>,
}

fn add(a: i64, b: i64) -> Result<i64, ReportError> {
    a.checked_add(b).ok_or(ReportError::TotalOverflow)
}

/// Aggregates the orders `period` covers; everything else in `orders` is
/// ignored.
pub fn summarize(orders: &[Order], period: &ReportPeriod) -> Result<SalesReport, ReportError> {
    let mut report = SalesReport::default();
    // keyed by code; the first name seen for a code wins
    let mut products: BTreeMap<&str, ProductSales> = BTreeMap::new();
    let mut restaurants: HashMap<&str, RestaurantSales> = HashMap::new();

    for order in orders.iter().filter(|o| period.covers(o)) {
        report.total_orders += 1;
        report.total_amount_cents = add(report.total_amount_cents, order.total_amount_cents)?;

        let r = restaurants
            .entry(order.restaurant_id.as_str())
            .or_insert_with(|| RestaurantSales {
                restaurant_id: order.restaurant_id.clone(),
                order_count: 0,
                total_amount_cents: 0,
            });
        r.order_count += 1;
        r.total_amount_cents = add(r.total_amount_cents, order.total_amount_cents)?;

        for item in &order.items {
            let p = products
                .entry(item.product_code.as_str())
                .or_insert_with(|| ProductSales {
                    product_code: item.product_code.clone(),
                    product_name: item.product_name.clone(),
                    total_quantity: 0,
                    total_amount_cents: 0,
                });
            p.total_quantity = add(p.total_quantity, item.quantity)?;
            p.total_amount_cents = add(p.total_amount_cents, item.total_price_cents)?;
        }
    }

    report.unique_restaurants = restaurants.len();
    if report.total_orders > 0 {
        let n = report.total_orders as i128;
        let total = report.total_amount_cents as i128;
        // half away from zero; the quotient never exceeds the total
        let rounded = (2 * total + total.signum() * n) / (2 * n);
        report.avg_order_value_cents = rounded as i64;
    }

    report.products = products.into_values().collect();
    report
        .products
        .sort_by(|a, b| b.total_amount_cents.cmp(&a.total_amount_cents));

    report.restaurants = restaurants.into_values().collect();
    report.restaurants.sort_by(|a, b| {
        b.total_amount_cents
            .cmp(&a.total_amount_cents)
            .then_with(|| a.restaurant_id.cmp(&b.restaurant_id))
    });
    Ok(report)
}
