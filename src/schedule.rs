//! Per-restaurant delivery schedule.
//!
//! [`DeliverySchedule`] is the validated form of a stored schedule document.
//! Records coming out of the store are converted exactly once, through
//! [`TryFrom<ScheduleRecord>`], so the eligibility calculator only ever sees
//! well-formed weekday codes, lead-day bounds and calendar dates.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, Weekday};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Upper bound for `max_lead_days`; keeps date enumeration bounded.
pub const MAX_LEAD_DAYS: i64 = 366;

pub const DEFAULT_MIN_LEAD_DAYS: i64 = 1;
pub const DEFAULT_MAX_LEAD_DAYS: i64 = 14;

const ISO_DATE: &str = "%Y-%m-%d";

/// Configuration mistakes in a schedule. None of these are ever clamped away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid schedule config: min lead days ({min}) exceed max lead days ({max})")]
    LeadDaysInverted { min: i64, max: i64 },

    #[error("invalid schedule config: {field} must not be negative (got {value})")]
    NegativeLeadDays { field: &'static str, value: i64 },

    #[error("invalid schedule config: max lead days {max} exceed the limit of {limit}")]
    LeadWindowTooLong { max: i64, limit: i64 },

    #[error("invalid schedule config: weekday code {code} is outside 0..=6")]
    WeekdayOutOfRange { code: i64 },

    #[error("invalid schedule config: blocked date {value:?} is not a YYYY-MM-DD date")]
    InvalidBlockedDate { value: String },

    #[error("date {date} is already blocked")]
    DuplicateBlockedDate { date: NaiveDate },

    #[error("date {date} is not blocked")]
    DateNotBlocked { date: NaiveDate },

    #[error("unknown weekday {value:?}")]
    UnknownWeekday { value: String },
}

/// Opaque restaurant key, owned by the restaurant directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(String);

impl RestaurantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RestaurantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Weekday code as stored: 0 = Sunday … 6 = Saturday.
pub fn weekday_code(day: Weekday) -> u8 {
    // num_days_from_sunday is always in 0..=6
    day.num_days_from_sunday() as u8
}

const WEEK_FROM_SUNDAY: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A stored weekday code (`0`–`6`) or an English day name such as `mon`.
pub fn parse_weekday(value: &str) -> Result<Weekday, ScheduleError> {
    let value = value.trim();
    if let Ok(code) = value.parse::<i64>() {
        return usize::try_from(code)
            .ok()
            .and_then(|i| WEEK_FROM_SUNDAY.get(i).copied())
            .ok_or(ScheduleError::WeekdayOutOfRange { code });
    }
    value
        .parse::<Weekday>()
        .map_err(|_| ScheduleError::UnknownWeekday { value: value.to_string() })
}

/// Set of weekdays on which delivery is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: Self = Self(0);

    /// Monday to Friday.
    pub fn weekdays() -> Self {
        [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .collect()
    }

    /// Builds a set from stored codes, rejecting anything outside 0..=6.
    /// Repeated codes collapse.
    pub fn from_codes(codes: &[i64]) -> Result<Self, ScheduleError> {
        let mut bits = 0u8;
        for &code in codes {
            if !(0..=6).contains(&code) {
                return Err(ScheduleError::WeekdayOutOfRange { code });
            }
            bits |= 1 << code;
        }
        Ok(Self(bits))
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << weekday_code(day)) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << weekday_code(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !(1 << weekday_code(day));
    }

    /// Flips membership of `day`; returns whether it is now allowed.
    pub fn toggle(&mut self, day: Weekday) -> bool {
        self.0 ^= 1 << weekday_code(day);
        self.contains(day)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Stored codes in ascending order (Sunday first).
    pub fn codes(&self) -> Vec<i64> {
        (0..7).filter(|c| self.0 & (1 << c) != 0).collect()
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.codes())
    }
}

/// A restaurant's validated delivery schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliverySchedule {
    pub restaurant_id: RestaurantId,
    pub allowed_weekdays: WeekdaySet,
    pub min_lead_days: i64,
    pub max_lead_days: i64,
    pub blocked_dates: BTreeSet<NaiveDate>,
    pub notes: String,
    pub is_active: bool,
}

impl DeliverySchedule {
    pub fn new(
        restaurant_id: RestaurantId,
        allowed_weekdays: WeekdaySet,
        min_lead_days: i64,
        max_lead_days: i64,
        blocked_dates: BTreeSet<NaiveDate>,
    ) -> Result<Self, ScheduleError> {
        let schedule = Self {
            restaurant_id,
            allowed_weekdays,
            min_lead_days,
            max_lead_days,
            blocked_dates,
            notes: String::new(),
            is_active: true,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Mon–Fri, one to fourteen days ahead, nothing blocked.
    pub fn default_for(restaurant_id: RestaurantId) -> Self {
        Self {
            restaurant_id,
            allowed_weekdays: WeekdaySet::weekdays(),
            min_lead_days: DEFAULT_MIN_LEAD_DAYS,
            max_lead_days: DEFAULT_MAX_LEAD_DAYS,
            blocked_dates: BTreeSet::new(),
            notes: String::new(),
            is_active: true,
        }
    }

    /// The schedule that governs a restaurant: the stored one when it exists
    /// and is active, the default otherwise.
    pub fn effective(stored: Option<Self>, restaurant_id: &RestaurantId) -> Self {
        match stored {
            Some(s) if s.is_active => s,
            _ => Self::default_for(restaurant_id.clone()),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        check_lead_days(self.min_lead_days, self.max_lead_days)
    }

    /// Replaces both lead-day bounds, leaving the schedule untouched on error.
    pub fn set_lead_days(&mut self, min: i64, max: i64) -> Result<(), ScheduleError> {
        check_lead_days(min, max)?;
        self.min_lead_days = min;
        self.max_lead_days = max;
        Ok(())
    }

    pub fn toggle_weekday(&mut self, day: Weekday) -> bool {
        self.allowed_weekdays.toggle(day)
    }

    pub fn block_date(&mut self, date: NaiveDate) -> Result<(), ScheduleError> {
        if !self.blocked_dates.insert(date) {
            return Err(ScheduleError::DuplicateBlockedDate { date });
        }
        Ok(())
    }

    pub fn unblock_date(&mut self, date: NaiveDate) -> Result<(), ScheduleError> {
        if !self.blocked_dates.remove(&date) {
            return Err(ScheduleError::DateNotBlocked { date });
        }
        Ok(())
    }

    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.blocked_dates.contains(&date)
    }
}

/// A batch of admin changes. [`ScheduleEdit::apply_to`] applies all of them
/// or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleEdit {
    /// Replaces the allowed weekdays.
    pub weekdays: Option<Vec<Weekday>>,
    /// Flipped after `weekdays` is applied.
    pub toggle: Vec<Weekday>,
    pub min_lead_days: Option<i64>,
    pub max_lead_days: Option<i64>,
    pub block: Vec<NaiveDate>,
    pub unblock: Vec<NaiveDate>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

impl ScheduleEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `schedule` with the edit applied. Lead days left out keep their
    /// current value. Unblocking runs before blocking.
    pub fn apply_to(&self, schedule: &DeliverySchedule) -> Result<DeliverySchedule, ScheduleError> {
        let mut next = schedule.clone();

        if let Some(days) = &self.weekdays {
            for day in WEEK_FROM_SUNDAY {
                if days.contains(&day) {
                    next.allowed_weekdays.insert(day);
                } else {
                    next.allowed_weekdays.remove(day);
                }
            }
        }
        for &day in &self.toggle {
            next.toggle_weekday(day);
        }

        next.set_lead_days(
            self.min_lead_days.unwrap_or(next.min_lead_days),
            self.max_lead_days.unwrap_or(next.max_lead_days),
        )?;

        for &date in &self.unblock {
            next.unblock_date(date)?;
        }
        for &date in &self.block {
            next.block_date(date)?;
        }

        if let Some(notes) = &self.notes {
            next = next.with_notes(notes.trim());
        }
        if let Some(active) = self.is_active {
            next = next.with_active(active);
        }
        Ok(next)
    }
}

fn check_lead_days(min: i64, max: i64) -> Result<(), ScheduleError> {
    if min < 0 {
        return Err(ScheduleError::NegativeLeadDays { field: "min_lead_days", value: min });
    }
    if max < 0 {
        return Err(ScheduleError::NegativeLeadDays { field: "max_lead_days", value: max });
    }
    if min > max {
        return Err(ScheduleError::LeadDaysInverted { min, max });
    }
    if max > MAX_LEAD_DAYS {
        return Err(ScheduleError::LeadWindowTooLong { max, limit: MAX_LEAD_DAYS });
    }
    Ok(())
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE).map_err(|_| {
        ScheduleError::InvalidBlockedDate { value: value.to_string() }
    })
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE).to_string()
}

/// Schedule document as it lives in the `delivery_schedules` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub restaurant_id: String,
    #[serde(default)]
    pub allowed_days: Vec<i64>,
    pub min_days_ahead: i64,
    pub max_days_ahead: i64,
    #[serde(default)]
    pub blocked_dates: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl TryFrom<ScheduleRecord> for DeliverySchedule {
    type Error = ScheduleError;

    fn try_from(rec: ScheduleRecord) -> Result<Self, Self::Error> {
        let allowed_weekdays = WeekdaySet::from_codes(&rec.allowed_days)?;
        let blocked_dates = rec
            .blocked_dates
            .iter()
            .map(|d| parse_iso_date(d))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut schedule = DeliverySchedule::new(
            RestaurantId::new(rec.restaurant_id),
            allowed_weekdays,
            rec.min_days_ahead,
            rec.max_days_ahead,
            blocked_dates,
        )?;
        schedule.notes = rec.notes.unwrap_or_default();
        // column defaults to true
        schedule.is_active = rec.is_active.unwrap_or(true);
        Ok(schedule)
    }
}

impl From<&DeliverySchedule> for ScheduleRecord {
    fn from(s: &DeliverySchedule) -> Self {
        Self {
            restaurant_id: s.restaurant_id.as_str().to_string(),
            allowed_days: s.allowed_weekdays.codes(),
            min_days_ahead: s.min_lead_days,
            max_days_ahead: s.max_lead_days,
            blocked_dates: s.blocked_dates.iter().copied().map(format_iso_date).collect(),
            notes: Some(s.notes.clone()),
            is_active: Some(s.is_active),
            updated_at: None,
        }
    }
}
