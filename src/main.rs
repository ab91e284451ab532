use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use mongodb::bson::oid::ObjectId;
use tracing_subscriber::EnvFilter;

use delivery_desk::catalog::{LineRequest, price_lines};
use delivery_desk::eligibility::next_eligible_date;
use delivery_desk::model::Product;
use delivery_desk::notify::OrderEmail;
use delivery_desk::order::{OrderDraft, OrderError, OrderIntake, OrderStatus, format_cents};
use delivery_desk::ports::{ScheduleStore, resolve_schedule, stored_or_default, today};
use delivery_desk::report::{ReportPeriod, summarize};
use delivery_desk::schedule::{
    RestaurantId, ScheduleEdit, format_iso_date, parse_iso_date, parse_weekday,
};
use delivery_desk::services::{
    orders, products, products::MongoProductCatalog, restaurants,
    restaurants::MongoRestaurantDirectory, schedules::MongoScheduleStore,
};
use delivery_desk::template::ScheduleTemplateApplicator;
use delivery_desk::{compute_eligible_dates, config, db};

#[derive(Debug, Parser)]
#[command(name = "deliverydesk", version, about = "Delivery schedule administration")]
struct Cli {
    /// MongoDB connection string; overrides the environment and the saved config.
    #[arg(long, global = true)]
    mongo_uri: Option<String>,

    /// Database name; defaults to the one in the URI, then `deliverydesk`.
    #[arg(long, global = true)]
    database: Option<String>,

    /// Save the connection settings for later runs.
    #[arg(long, global = true)]
    remember: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the dates a restaurant can currently pick for delivery.
    Dates {
        #[arg(long)]
        restaurant: String,
        /// Reference date (YYYY-MM-DD); defaults to today.
        #[arg(long, value_parser = parse_date_arg)]
        today: Option<NaiveDate>,
    },
    /// Print the schedule that applies to a restaurant.
    Show {
        #[arg(long)]
        restaurant: String,
    },
    /// Change a restaurant's stored schedule.
    SetSchedule {
        #[arg(long)]
        restaurant: String,
        /// Allowed weekdays, replacing the current ones (`1,3,5` or `mon,wed,fri`).
        #[arg(long, value_delimiter = ',', value_parser = parse_weekday_arg)]
        days: Option<Vec<Weekday>>,
        /// Weekdays to flip on or off.
        #[arg(long, value_delimiter = ',', value_parser = parse_weekday_arg)]
        toggle: Vec<Weekday>,
        #[arg(long, allow_negative_numbers = true)]
        min: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        max: Option<i64>,
        #[arg(long, value_delimiter = ',', value_parser = parse_date_arg)]
        block: Vec<NaiveDate>,
        #[arg(long, value_delimiter = ',', value_parser = parse_date_arg)]
        unblock: Vec<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Copy one restaurant's schedule onto others.
    ApplyTemplate {
        #[arg(long)]
        source: String,
        /// Target restaurants; every active restaurant when omitted.
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,
    },
    /// List the active product catalog.
    Products,
    /// Create or replace a catalog product, keyed by code.
    PutProduct {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        price_cents: i64,
        #[arg(long, default_value_t = 1)]
        items_per_stack: i64,
        #[arg(long, default_value = "stack")]
        unit: String,
        #[arg(long, default_value_t = 0)]
        sort_order: i64,
        #[arg(long)]
        inactive: bool,
    },
    /// Price an order from the catalog, check its delivery date and store it.
    Submit {
        #[arg(long)]
        restaurant: String,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        /// `CODE,QTY`; repeat for every product.
        #[arg(long = "line", required = true)]
        lines: Vec<LineRequest>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        by: String,
    },
    /// List a restaurant's orders, newest first.
    Orders {
        #[arg(long)]
        restaurant: String,
    },
    /// Move an order to another status.
    SetStatus {
        #[arg(long)]
        order: String,
        #[arg(long, value_parser = OrderStatus::from_str)]
        status: OrderStatus,
        #[arg(long)]
        by: Option<String>,
    },
    /// Sales summary for delivery dates in a period, cancelled orders excluded.
    Report {
        #[arg(long, value_parser = parse_date_arg)]
        from: NaiveDate,
        #[arg(long, value_parser = parse_date_arg)]
        to: NaiveDate,
        #[arg(long)]
        restaurant: Option<String>,
    },
    /// Print the notification mail for an order.
    Email {
        #[arg(long)]
        order: String,
    },
    /// Log schedule changes until interrupted.
    Watch,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_iso_date(s).map_err(|_| format!("expected YYYY-MM-DD, got {s:?}"))
}

fn parse_weekday_arg(s: &str) -> Result<Weekday, String> {
    parse_weekday(s).map_err(|e| e.to_string())
}

fn parse_order_id(s: &str) -> Result<ObjectId> {
    ObjectId::parse_str(s.trim()).context("invalid order id")
}

async fn open_db(cli: &Cli) -> Result<db::Db> {
    let stored = config::load().unwrap_or_else(|e| {
        tracing::warn!("ignoring unreadable config: {e:#}");
        config::LocalConfig::default()
    });
    let cfg = stored.resolve(
        |k| std::env::var(k).ok(),
        cli.mongo_uri.clone(),
        cli.database.clone(),
    );
    let uri = cfg.mongo_uri.clone().with_context(|| {
        format!("no MongoDB URI: pass --mongo-uri or set {}", config::MONGO_URI_ENV)
    })?;

    let dbh = db::connect(uri.trim(), cfg.database.as_deref()).await?;

    if cli.remember {
        let saved = config::LocalConfig { remember_server: true, ..cfg };
        if let Err(e) = config::save(&saved) {
            tracing::warn!("could not save config: {e:#}");
        }
    }
    Ok(dbh)
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let dbh = open_db(&cli).await?;
    let store = Arc::new(MongoScheduleStore::new(dbh.clone()));

    match cli.command {
        Command::Dates { restaurant, today: reference } => {
            let id = RestaurantId::new(restaurant);
            let schedule = resolve_schedule(store.as_ref(), &id).await?;
            let reference = reference.unwrap_or_else(|| today(&DefaultClock));
            let dates = compute_eligible_dates(&schedule, reference)?;
            let Some(first) = next_eligible_date(&schedule, reference)? else {
                println!("no delivery dates currently available");
                return Ok(ExitCode::SUCCESS);
            };
            for d in dates {
                let mark = if d == first { "  (preselected)" } else { "" };
                println!("{}  {}{mark}", format_iso_date(d), d.format("%A"));
            }
        }
        Command::Show { restaurant } => {
            let id = RestaurantId::new(restaurant);
            let schedule = resolve_schedule(store.as_ref(), &id).await?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        Command::SetSchedule {
            restaurant,
            days,
            toggle,
            min,
            max,
            block,
            unblock,
            notes,
            active,
        } => {
            let edit = ScheduleEdit {
                weekdays: days,
                toggle,
                min_lead_days: min,
                max_lead_days: max,
                block,
                unblock,
                notes,
                is_active: active,
            };
            anyhow::ensure!(!edit.is_empty(), "nothing to change");
            dbh.ensure_indexes().await?;

            let id = RestaurantId::new(restaurant);
            let current = stored_or_default(store.as_ref(), &id).await?;
            let updated = edit.apply_to(&current)?;
            store.put_schedule(&updated).await?;
            tracing::info!(restaurant_id = %id, "schedule updated");
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        Command::ApplyTemplate { source, targets } => {
            dbh.ensure_indexes().await?;
            let source_id = RestaurantId::new(source);
            let applicator = ScheduleTemplateApplicator::new(store.clone());
            let template = applicator.load_template(&source_id).await?;

            let report = if targets.is_empty() {
                let directory = MongoRestaurantDirectory::new(dbh.clone());
                applicator.apply_to_directory(&template, &directory).await?
            } else {
                applicator
                    .apply(&template, targets.into_iter().map(RestaurantId::new))
                    .await
            };

            for id in &report.succeeded {
                println!("ok      {id}");
            }
            for f in &report.failed {
                println!("FAILED  {}: {}", f.restaurant_id, f.error);
            }
            println!("{} of {} restaurants updated", report.succeeded.len(), report.attempted());
            if !report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Products => {
            for p in products::list_active(&dbh).await? {
                println!(
                    "{:<10}  {:<30}  {:>10}  {} x {}  {}",
                    p.code,
                    p.name,
                    format_cents(p.price_per_stack_cents),
                    p.items_per_stack,
                    p.unit,
                    p.category
                );
            }
        }
        Command::PutProduct {
            code,
            name,
            category,
            price_cents,
            items_per_stack,
            unit,
            sort_order,
            inactive,
        } => {
            dbh.ensure_indexes().await?;
            let product = Product {
                id: None,
                code: code.trim().to_string(),
                name,
                category,
                price_per_stack_cents: price_cents,
                items_per_stack,
                unit,
                is_active: !inactive,
                sort_order,
            };
            products::upsert(&dbh, &product).await?;
            println!("saved {}", product.code);
        }
        Command::Submit { restaurant, date, lines, notes, by } => {
            let catalog = MongoProductCatalog::new(dbh.clone());
            let lines = match price_lines(&catalog, &lines).await {
                Ok(lines) => lines,
                Err(OrderError::UnknownProduct { product_code }) => {
                    println!("{product_code} is not an active product");
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            };
            let intake = OrderIntake::new(store.clone(), Arc::new(DefaultClock));
            let draft = OrderDraft {
                restaurant_id: RestaurantId::new(restaurant),
                delivery_date: date,
                lines,
                notes,
                created_by: by,
            };
            let order = match intake.validate(draft).await {
                Ok(order) => order,
                Err(OrderError::IneligibleDeliveryDate { date }) => {
                    println!("{date} is not an available delivery date");
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            };
            let id = orders::create(&dbh, &order).await?;
            println!("{id}  total {}", format_cents(order.total_cents));
        }
        Command::Orders { restaurant } => {
            let id = RestaurantId::new(restaurant);
            for o in orders::list_by_restaurant(&dbh, &id).await? {
                println!(
                    "{}  {}  {:<10}  {:>10}  {}",
                    o.order_code,
                    o.delivery_date,
                    o.status.as_str(),
                    format_cents(o.total_amount_cents),
                    o.created_by
                );
            }
        }
        Command::SetStatus { order, status, by } => {
            let oid = parse_order_id(&order)?;
            match orders::set_status(&dbh, oid, status, by.as_deref()).await {
                Ok(now) => println!("{oid} -> {now}"),
                Err(e) => match e.downcast_ref::<OrderError>() {
                    Some(OrderError::FinalStatus { status }) => {
                        println!("order {oid} is {status} and can no longer change");
                        return Ok(ExitCode::FAILURE);
                    }
                    _ => return Err(e),
                },
            }
        }
        Command::Report { from, to, restaurant } => {
            let period = ReportPeriod::new(from, to, restaurant.map(RestaurantId::new))?;
            let found = orders::list_by_period(&dbh, &period).await?;
            let report = summarize(&found, &period)?;
            let names: HashMap<String, String> = restaurants::list_active(&dbh)
                .await?
                .into_iter()
                .filter_map(|r| Some((r.id?.to_hex(), r.name)))
                .collect();

            println!("period          {} .. {}", format_iso_date(from), format_iso_date(to));
            println!("orders          {}", report.total_orders);
            println!("total           {}", format_cents(report.total_amount_cents));
            println!("average order   {}", format_cents(report.avg_order_value_cents));
            println!("restaurants     {}", report.unique_restaurants);
            println!();
            for p in &report.products {
                println!(
                    "{:<10}  {:<30}  {:>6}  {:>12}",
                    p.product_code,
                    p.product_name,
                    p.total_quantity,
                    format_cents(p.total_amount_cents)
                );
            }
            println!();
            for r in &report.restaurants {
                let name = names.get(&r.restaurant_id).unwrap_or(&r.restaurant_id);
                println!(
                    "{:<30}  {:>4}  {:>12}",
                    name,
                    r.order_count,
                    format_cents(r.total_amount_cents)
                );
            }
        }
        Command::Email { order } => {
            let oid = parse_order_id(&order)?;
            let order = orders::get(&dbh, oid)
                .await?
                .with_context(|| format!("order {oid} not found"))?;
            let restaurant_id = RestaurantId::new(order.restaurant_id.clone());
            let restaurant_name = restaurants::find(&dbh, &restaurant_id)
                .await?
                .map(|r| r.name)
                .unwrap_or_else(|| order.restaurant_id.clone());
            let created_ms = order.created_at.timestamp_millis();
            let placed_at = chrono::DateTime::from_timestamp_millis(created_ms)
                .context("order creation time out of range")?
                .with_timezone(&Local)
                .naive_local();

            let mail = OrderEmail { restaurant_name: &restaurant_name, order: &order, placed_at };
            println!("Subject: {}\n", mail.subject());
            println!("{}", mail.html());
        }
        Command::Watch => {
            tokio::select! {
                res = db::watch_schedules(dbh) => res?,
                _ = tokio::signal::ctrl_c() => tracing::info!("stopped"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    run(cli).await
}
