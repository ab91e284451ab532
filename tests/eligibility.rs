//! Behaviour of the eligibility calculator over whole schedules.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use delivery_desk::schedule::{parse_iso_date, weekday_code};
use delivery_desk::{
    DeliverySchedule, ScheduleError, WeekdaySet, compute_eligible_dates,
    compute_eligible_iso_dates,
};
use rstest::rstest;

fn date(s: &str) -> NaiveDate {
    parse_iso_date(s).expect("valid date")
}

fn schedule(codes: &[i64], min: i64, max: i64, blocked: &[&str]) -> DeliverySchedule {
    let blocked: BTreeSet<_> = blocked.iter().map(|d| date(d)).collect();
    DeliverySchedule::new(
        "restaurant".into(),
        WeekdaySet::from_codes(codes).expect("valid codes"),
        min,
        max,
        blocked,
    )
    .expect("valid schedule")
}

#[test]
fn weekday_window_starting_monday() {
    let s = schedule(&[1, 2, 3, 4, 5], 1, 7, &[]);
    let out = compute_eligible_iso_dates(&s, date("2024-06-03")).expect("ok");
    // Sat 06-08 and Sun 06-09 drop out; Mon 06-10 is the inclusive window end
    assert_eq!(
        out,
        vec!["2024-06-04", "2024-06-05", "2024-06-06", "2024-06-07", "2024-06-10"]
    );
}

#[test]
fn blocked_wednesday_is_skipped() {
    let s = schedule(&[1, 2, 3, 4, 5], 1, 7, &["2024-06-05"]);
    let out = compute_eligible_iso_dates(&s, date("2024-06-03")).expect("ok");
    assert_eq!(out, vec!["2024-06-04", "2024-06-06", "2024-06-07", "2024-06-10"]);
}

#[test]
fn tuesday_to_friday_when_window_stops_before_next_week() {
    let s = schedule(&[1, 2, 3, 4, 5], 1, 6, &[]);
    let out = compute_eligible_iso_dates(&s, date("2024-06-03")).expect("ok");
    assert_eq!(out, vec!["2024-06-04", "2024-06-05", "2024-06-06", "2024-06-07"]);
}

#[rstest]
#[case("2024-06-03", 0, 0)]
#[case("2024-06-03", 1, 14)]
#[case("2024-02-27", 0, 60)]
fn no_allowed_weekdays_means_no_dates(#[case] reference: &str, #[case] min: i64, #[case] max: i64) {
    let s = schedule(&[], min, max, &[]);
    assert!(compute_eligible_dates(&s, date(reference)).expect("ok").is_empty());
}

#[test]
fn same_day_window_on_saturday_is_empty() {
    let s = schedule(&[1, 2, 3, 4, 5], 0, 0, &[]);
    assert!(compute_eligible_dates(&s, date("2024-06-08")).expect("ok").is_empty());
}

#[rstest]
#[case("2024-06-03", &[], Some("2024-06-05"))]
#[case("2024-06-03", &["2024-06-05"], None)]
#[case("2024-06-06", &[], None)] // lands on Saturday
fn single_day_window(
    #[case] reference: &str,
    #[case] blocked: &[&str],
    #[case] expected: Option<&str>,
) {
    let s = schedule(&[1, 2, 3, 4, 5], 2, 2, blocked);
    let out = compute_eligible_iso_dates(&s, date(reference)).expect("ok");
    assert_eq!(out, expected.into_iter().map(String::from).collect::<Vec<_>>());
}

#[test]
fn leap_day_and_year_end_are_enumerated() {
    let s = schedule(&[0, 1, 2, 3, 4, 5, 6], 0, 3, &[]);
    assert_eq!(
        compute_eligible_iso_dates(&s, date("2024-02-28")).expect("ok"),
        vec!["2024-02-28", "2024-02-29", "2024-03-01", "2024-03-02"]
    );
    assert_eq!(
        compute_eligible_iso_dates(&s, date("2024-12-30")).expect("ok"),
        vec!["2024-12-30", "2024-12-31", "2025-01-01", "2025-01-02"]
    );
}

#[test]
fn inverted_lead_days_fail_instead_of_clamping() {
    let mut s = schedule(&[1], 1, 2, &[]);
    s.min_lead_days = 5;
    assert_eq!(
        compute_eligible_dates(&s, date("2024-06-03")),
        Err(ScheduleError::LeadDaysInverted { min: 5, max: 2 })
    );
}

#[test]
fn oversized_window_is_refused() {
    let mut s = schedule(&[1], 0, 1, &[]);
    s.max_lead_days = i64::MAX;
    assert!(matches!(
        compute_eligible_dates(&s, date("2024-06-03")),
        Err(ScheduleError::LeadWindowTooLong { .. })
    ));
}

/// Sweeps a spread of references and schedules and checks the output
/// guarantees on every result.
#[test]
fn output_guarantees_hold_across_schedules() {
    let weekday_sets: [&[i64]; 5] = [&[], &[1, 2, 3, 4, 5], &[0, 6], &[3], &[0, 1, 2, 3, 4, 5, 6]];
    let windows = [(0, 0), (0, 6), (1, 14), (3, 3), (7, 45)];
    let blocked = ["2024-06-05", "2024-06-15", "2024-07-01", "2023-01-01"];

    let start = date("2024-05-27");
    for offset in 0..14 {
        let reference = start + Days::new(offset);
        for codes in weekday_sets {
            for (min, max) in windows {
                let s = schedule(codes, min, max, &blocked);
                let out = compute_eligible_dates(&s, reference).expect("valid");

                let lo = reference + Days::new(min as u64);
                let hi = reference + Days::new(max as u64);
                for d in &out {
                    assert!(*d >= lo && *d <= hi, "{d} outside [{lo}, {hi}]");
                    assert!(codes.contains(&i64::from(weekday_code(d.weekday()))));
                    assert!(!s.blocked_dates.contains(d));
                }
                assert!(out.windows(2).all(|w| w[0] < w[1]), "not strictly ascending");

                // every qualifying date in the window is present
                let expected = lo
                    .iter_days()
                    .take_while(|d| *d <= hi)
                    .filter(|d| s.allowed_weekdays.contains(d.weekday()) && !s.is_blocked(*d))
                    .count();
                assert_eq!(out.len(), expected);

                assert_eq!(compute_eligible_dates(&s, reference).expect("valid"), out);
            }
        }
    }
}

#[test]
fn default_schedule_spans_two_weeks_of_weekdays() {
    let s = DeliverySchedule::default_for("r".into());
    let out = compute_eligible_dates(&s, date("2024-06-03")).expect("ok");
    assert_eq!(out.first(), Some(&date("2024-06-04")));
    assert_eq!(out.last(), Some(&date("2024-06-17")));
    assert_eq!(out.len(), 10);
    assert!(out.iter().all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
}
