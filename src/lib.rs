//! Delivery planning for the restaurant ordering desk.
//!
//! [`eligibility`] computes the delivery dates a restaurant may pick from its
//! [`schedule`]; [`template`] copies one schedule onto other restaurants;
//! [`order`] checks incoming orders against those dates after [`catalog`]
//! prices them. [`report`] summarizes sales and [`notify`] renders the order
//! mail. The MongoDB adapters for the [`ports`] live in [`services`].

pub mod catalog;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod model;
pub mod notify;
pub mod order;
pub mod ports;
pub mod report;
pub mod schedule;
pub mod services;
pub mod template;

pub use eligibility::{compute_eligible_dates, compute_eligible_iso_dates, is_eligible};
pub use ports::{ProductCatalog, RestaurantDirectory, ScheduleStore, StoreError};
pub use schedule::{DeliverySchedule, RestaurantId, ScheduleEdit, ScheduleError, WeekdaySet};
pub use template::{ApplyReport, ScheduleTemplateApplicator};
