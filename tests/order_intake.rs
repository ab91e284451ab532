//! Catalog pricing followed by intake, against in-memory collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use delivery_desk::catalog::{LineRequest, price_lines};
use delivery_desk::model::Product;
use delivery_desk::order::{OrderDraft, OrderError, OrderIntake};
use delivery_desk::schedule::parse_iso_date;
use delivery_desk::{DeliverySchedule, ProductCatalog, RestaurantId, ScheduleStore, StoreError};

struct Catalog(HashMap<&'static str, Product>);

#[async_trait]
impl ProductCatalog for Catalog {
    async fn find_active(&self, code: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.0.get(code).filter(|p| p.is_active).cloned())
    }
}

struct NoSchedules;

#[async_trait]
impl ScheduleStore for NoSchedules {
    async fn get_schedule(
        &self,
        _restaurant_id: &RestaurantId,
    ) -> Result<Option<DeliverySchedule>, StoreError> {
        Ok(None)
    }

    async fn put_schedule(&self, _schedule: &DeliverySchedule) -> Result<(), StoreError> {
        Ok(())
    }
}

struct FixedClock(DateTime<Local>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

fn product(code: &str, price: i64, is_active: bool) -> Product {
    Product {
        id: None,
        code: code.into(),
        name: format!("Product {code}"),
        category: "drinks".into(),
        price_per_stack_cents: price,
        items_per_stack: 24,
        unit: "stack".into(),
        is_active,
        sort_order: 0,
    }
}

fn catalog() -> Catalog {
    Catalog(HashMap::from([
        ("PC05", product("PC05", 1840, true)),
        ("MW15", product("MW15", 960, true)),
        ("OLD1", product("OLD1", 100, false)),
        ("NEG1", product("NEG1", -100, true)),
    ]))
}

fn intake() -> OrderIntake<NoSchedules> {
    let monday = Local
        .with_ymd_and_hms(2024, 6, 3, 12, 0, 0)
        .single()
        .expect("unambiguous local time");
    OrderIntake::new(Arc::new(NoSchedules), Arc::new(FixedClock(monday)))
}

fn lines(requests: &[&str]) -> Vec<LineRequest> {
    requests.iter().map(|s| s.parse().expect("CODE,QTY")).collect()
}

async fn submit(requests: &[&str]) -> Result<i64, OrderError> {
    let priced = price_lines(&catalog(), &lines(requests)).await?;
    let draft = OrderDraft {
        restaurant_id: "r1".into(),
        delivery_date: parse_iso_date("2024-06-05").expect("date"),
        lines: priced,
        notes: None,
        created_by: "staff".into(),
    };
    Ok(intake().validate(draft).await?.total_cents)
}

#[tokio::test]
async fn catalog_prices_determine_the_total() {
    assert_eq!(submit(&["PC05,3", "MW15,2"]).await.expect("accepted"), 3 * 1840 + 2 * 960);
}

#[tokio::test]
async fn inactive_products_cannot_be_ordered() {
    let err = submit(&["PC05,1", "OLD1,1"]).await.expect_err("inactive");
    assert!(matches!(err, OrderError::UnknownProduct { product_code } if product_code == "OLD1"));
}

#[tokio::test]
async fn negative_catalog_price_is_refused_at_intake() {
    let err = submit(&["NEG1,1"]).await.expect_err("negative price");
    assert!(matches!(err, OrderError::InvalidPrice { product_code } if product_code == "NEG1"));
}

#[tokio::test]
async fn overflowing_quantity_is_refused_at_intake() {
    let huge = format!("PC05,{}", i64::MAX);
    let err = submit(&[huge.as_str()]).await.expect_err("overflow");
    assert!(matches!(err, OrderError::TotalOverflow));
}
