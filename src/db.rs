use anyhow::Result;
use mongodb::bson::doc;
use mongodb::options::{FullDocumentType, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel, options::ClientOptions};
use tokio_stream::StreamExt;

use crate::model::Product;
use crate::schedule::ScheduleRecord;

pub const SCHEDULES: &str = "delivery_schedules";
pub const RESTAURANTS: &str = "restaurants";
pub const ORDERS: &str = "orders";
pub const PRODUCTS: &str = "products";

#[derive(Clone)]
pub struct Db {
    _client: Client,
    pub db: Database,
}

pub async fn connect(uri: &str, database: Option<&str>) -> Result<Db> {
    let mut opts = ClientOptions::parse(uri).await?;
    if opts.app_name.is_none() {
        opts.app_name = Some("DeliveryDesk".into());
    }
    let client = Client::with_options(opts)?;
    let db = match database {
        Some(name) => client.database(name),
        None => client
            .default_database()
            .unwrap_or_else(|| client.database("deliverydesk")),
    };
    db.run_command(doc! { "ping": 1 }).await?;
    tracing::info!(database = %db.name(), "connected to MongoDB");
    Ok(Db { _client: client, db })
}

impl Db {
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }

    /// One schedule per restaurant, one product per code.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = |key: &str| {
            IndexModel::builder()
                .keys(doc! { key: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };
        self.collection::<ScheduleRecord>(SCHEDULES)
            .create_index(unique("restaurant_id"))
            .await?;
        self.collection::<Product>(PRODUCTS)
            .create_index(unique("code"))
            .await?;
        Ok(())
    }
}

/// Logs every change to the schedule collection until the stream ends.
pub async fn watch_schedules(db: Db) -> Result<()> {
    let coll = db.collection::<ScheduleRecord>(SCHEDULES);
    let mut stream = coll
        .watch()
        .full_document(FullDocumentType::UpdateLookup)
        .await?;
    while let Some(ev) = stream.next().await {
        let ev = ev?;
        let restaurant = ev
            .full_document
            .as_ref()
            .map(|r| r.restaurant_id.as_str())
            .unwrap_or("?");
        tracing::info!(operation = ?ev.operation_type, restaurant_id = %restaurant, "schedule changed");
    }
    Ok(())
}
