//! Delivery-date eligibility.
//!
//! Pure functions over a [`DeliverySchedule`] and a caller-supplied reference
//! date. Nothing here reads a clock or touches the store; inactive schedules
//! must already have been replaced with the default by the caller (see
//! [`DeliverySchedule::effective`]).

use chrono::{Datelike, Days, NaiveDate};

use crate::schedule::{DeliverySchedule, ScheduleError, format_iso_date};

/// Inclusive `[start, end]` window, or `None` if it runs off the calendar.
fn lead_window(schedule: &DeliverySchedule, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    // lead days are validated non-negative and bounded
    let start = reference.checked_add_days(Days::new(schedule.min_lead_days as u64))?;
    let end = reference.checked_add_days(Days::new(schedule.max_lead_days as u64))?;
    Some((start, end))
}

fn accepts(schedule: &DeliverySchedule, date: NaiveDate) -> bool {
    schedule.allowed_weekdays.contains(date.weekday()) && !schedule.is_blocked(date)
}

/// Every date on which delivery may be requested, ascending.
///
/// An empty result is not an error: it means no delivery is currently
/// possible. A schedule whose invariants were broken after construction
/// fails with the corresponding [`ScheduleError`].
pub fn compute_eligible_dates(
    schedule: &DeliverySchedule,
    reference: NaiveDate,
) -> Result<Vec<NaiveDate>, ScheduleError> {
    schedule.validate()?;

    if schedule.allowed_weekdays.is_empty() {
        return Ok(Vec::new());
    }
    let Some((start, end)) = lead_window(schedule, reference) else {
        return Ok(Vec::new());
    };

    Ok(start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| accepts(schedule, *d))
        .collect())
}

/// Same as [`compute_eligible_dates`], rendered as `YYYY-MM-DD`.
pub fn compute_eligible_iso_dates(
    schedule: &DeliverySchedule,
    reference: NaiveDate,
) -> Result<Vec<String>, ScheduleError> {
    Ok(compute_eligible_dates(schedule, reference)?
        .into_iter()
        .map(format_iso_date)
        .collect())
}

/// Whether `date` would appear in [`compute_eligible_dates`] for the same inputs.
pub fn is_eligible(
    schedule: &DeliverySchedule,
    reference: NaiveDate,
    date: NaiveDate,
) -> Result<bool, ScheduleError> {
    schedule.validate()?;
    Ok(match lead_window(schedule, reference) {
        Some((start, end)) => (start..=end).contains(&date) && accepts(schedule, date),
        None => false,
    })
}

/// First eligible date; the order form preselects it.
pub fn next_eligible_date(
    schedule: &DeliverySchedule,
    reference: NaiveDate,
) -> Result<Option<NaiveDate>, ScheduleError> {
    schedule.validate()?;
    let Some((start, end)) = lead_window(schedule, reference) else {
        return Ok(None);
    };
    Ok(start
        .iter_days()
        .take_while(|d| *d <= end)
        .find(|d| accepts(schedule, *d)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Weekday;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::schedule::{WeekdaySet, parse_iso_date};

    fn date(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    #[fixture]
    fn weekdays_week() -> DeliverySchedule {
        DeliverySchedule::new("r".into(), WeekdaySet::weekdays(), 1, 7, BTreeSet::new())
            .expect("valid schedule")
    }

    #[rstest]
    fn weekdays_only_within_one_week(weekdays_week: DeliverySchedule) {
        // window is inclusive: Tue 06-04 through Mon 06-10, weekend skipped
        let out = compute_eligible_iso_dates(&weekdays_week, date("2024-06-03")).expect("ok");
        assert_eq!(
            out,
            vec!["2024-06-04", "2024-06-05", "2024-06-06", "2024-06-07", "2024-06-10"]
        );
    }

    #[rstest]
    fn blocked_date_is_dropped(mut weekdays_week: DeliverySchedule) {
        weekdays_week.block_date(date("2024-06-05")).expect("block");
        let out = compute_eligible_iso_dates(&weekdays_week, date("2024-06-03")).expect("ok");
        assert_eq!(out, vec!["2024-06-04", "2024-06-06", "2024-06-07", "2024-06-10"]);
    }

    #[rstest]
    fn blocked_date_outside_window_has_no_effect(mut weekdays_week: DeliverySchedule) {
        let before = compute_eligible_dates(&weekdays_week, date("2024-06-03")).expect("ok");
        weekdays_week.block_date(date("2025-01-01")).expect("block");
        weekdays_week.block_date(date("2024-06-03")).expect("block");
        let after = compute_eligible_dates(&weekdays_week, date("2024-06-03")).expect("ok");
        assert_eq!(before, after);
    }

    #[test]
    fn same_day_delivery_with_zero_lead() {
        let s = DeliverySchedule::new(
            "r".into(),
            [Weekday::Mon].into_iter().collect(),
            0,
            0,
            BTreeSet::new(),
        )
        .expect("valid");
        assert_eq!(compute_eligible_dates(&s, date("2024-06-03")).expect("ok"), vec![date("2024-06-03")]);
        // Saturday
        assert!(compute_eligible_dates(&s, date("2024-06-08")).expect("ok").is_empty());
    }

    #[test]
    fn broken_invariant_is_reported_not_clamped() {
        let mut s = DeliverySchedule::default_for("r".into());
        s.min_lead_days = 9;
        s.max_lead_days = 3;
        assert_eq!(
            compute_eligible_dates(&s, date("2024-06-03")),
            Err(ScheduleError::LeadDaysInverted { min: 9, max: 3 })
        );
        assert!(is_eligible(&s, date("2024-06-03"), date("2024-06-05")).is_err());
    }

    #[test]
    fn window_past_the_end_of_the_calendar_is_empty() {
        let s = DeliverySchedule::default_for("r".into());
        assert!(compute_eligible_dates(&s, NaiveDate::MAX).expect("ok").is_empty());
        assert_eq!(next_eligible_date(&s, NaiveDate::MAX).expect("ok"), None);
    }

    #[rstest]
    #[case("2024-06-04", true)]
    #[case("2024-06-03", false)]
    #[case("2024-06-08", false)]
    #[case("2024-06-10", true)]
    #[case("2024-06-11", false)]
    fn membership_matches_enumeration(
        weekdays_week: DeliverySchedule,
        #[case] candidate: &str,
        #[case] expected: bool,
    ) {
        let reference = date("2024-06-03");
        let listed = compute_eligible_dates(&weekdays_week, reference)
            .expect("ok")
            .contains(&date(candidate));
        let checked = is_eligible(&weekdays_week, reference, date(candidate)).expect("ok");
        assert_eq!(checked, expected);
        assert_eq!(listed, expected);
    }

    #[rstest]
    fn next_date_is_first_of_the_list(weekdays_week: DeliverySchedule) {
        // Friday: the weekend is skipped
        assert_eq!(
            next_eligible_date(&weekdays_week, date("2024-06-07")).expect("ok"),
            Some(date("2024-06-10"))
        );
    }
}
