//! Order intake and the order status workflow.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eligibility::is_eligible;
use crate::ports::{ScheduleStore, StoreError, resolve_schedule, today};
use crate::schedule::{RestaurantId, ScheduleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Delivered)
                | (Processing, Delivered)
        )
    }

    /// `next` if the workflow allows it.
    pub fn transition(self, next: Self) -> Result<Self, OrderError> {
        if self.is_final() {
            return Err(OrderError::FinalStatus { status: self });
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OrderError::InvalidTransition { from: self, to: next })
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(OrderError::UnknownStatus { value: s.to_string() }),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order has no items")]
    EmptyOrder,

    #[error("quantity for {product_code} must be positive")]
    InvalidQuantity { product_code: String },

    #[error("price for {product_code} must not be negative")]
    InvalidPrice { product_code: String },

    #[error("no active product with code {product_code:?}")]
    UnknownProduct { product_code: String },

    #[error("order total exceeds the representable amount")]
    TotalOverflow,

    #[error("order {status} is final and cannot change")]
    FinalStatus { status: OrderStatus },

    #[error("delivery on {date} is not available for this restaurant")]
    IneligibleDeliveryDate { date: NaiveDate },

    #[error("order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("unknown order status {value:?}")]
    UnknownStatus { value: String },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `12.50` for 1250 cents.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// One catalog product in an order. Prices are per stack, in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_per_stack_cents: i64,
}

impl OrderLine {
    /// Quantity times price, or [`OrderError::TotalOverflow`].
    pub fn line_total_cents(&self) -> Result<i64, OrderError> {
        self.quantity
            .checked_mul(self.price_per_stack_cents)
            .ok_or(OrderError::TotalOverflow)
    }
}

/// An order as submitted by restaurant staff, not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub restaurant_id: RestaurantId,
    pub delivery_date: NaiveDate,
    pub lines: Vec<OrderLine>,
    pub notes: Option<String>,
    pub created_by: String,
}

impl OrderDraft {
    pub fn total_cents(&self) -> Result<i64, OrderError> {
        self.lines.iter().try_fold(0i64, |acc, line| {
            acc.checked_add(line.line_total_cents()?)
                .ok_or(OrderError::TotalOverflow)
        })
    }
}

/// A draft that passed intake checks against today's eligible dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub draft: OrderDraft,
    pub total_cents: i64,
    pub checked_on: NaiveDate,
}

/// Server-side intake checks. The delivery date is re-checked against a
/// freshly resolved schedule, whatever the client showed.
pub struct OrderIntake<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> OrderIntake<S>
where
    S: ScheduleStore + ?Sized,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn validate(&self, draft: OrderDraft) -> Result<ValidatedOrder, OrderError> {
        if draft.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        if let Some(line) = draft.lines.iter().find(|l| l.quantity <= 0) {
            return Err(OrderError::InvalidQuantity {
                product_code: line.product_code.clone(),
            });
        }
        if let Some(line) = draft.lines.iter().find(|l| l.price_per_stack_cents < 0) {
            return Err(OrderError::InvalidPrice {
                product_code: line.product_code.clone(),
            });
        }
        let total_cents = draft.total_cents()?;

        let schedule = resolve_schedule(self.store.as_ref(), &draft.restaurant_id).await?;
        let checked_on = today(self.clock.as_ref());
        if !is_eligible(&schedule, checked_on, draft.delivery_date)? {
            tracing::warn!(
                restaurant_id = %draft.restaurant_id,
                delivery_date = %draft.delivery_date,
                "rejected order with ineligible delivery date"
            );
            return Err(OrderError::IneligibleDeliveryDate { date: draft.delivery_date });
        }

        Ok(ValidatedOrder { draft, total_cents, checked_on })
    }
}
