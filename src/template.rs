//! Bulk copy of one restaurant's schedule onto others.
//!
//! Every target is written independently. A failing target is recorded in the
//! [`ApplyReport`] and never stops the remaining writes; partial completion is
//! a normal outcome, not a rollback case.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::ports::{RestaurantDirectory, ScheduleStore, StoreError, stored_or_default};
use crate::schedule::{DeliverySchedule, RestaurantId};

/// Copy of `source` bound to `target`. Everything except the restaurant is kept.
pub fn retarget(source: &DeliverySchedule, target: RestaurantId) -> DeliverySchedule {
    DeliverySchedule {
        restaurant_id: target,
        ..source.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub restaurant_id: RestaurantId,
    pub error: StoreError,
}

/// Per-target outcome of a bulk apply, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub succeeded: Vec<RestaurantId>,
    pub failed: Vec<ApplyFailure>,
    /// The source restaurant was among the targets and was left alone.
    pub skipped_source: bool,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

pub struct ScheduleTemplateApplicator<S: ?Sized> {
    store: Arc<S>,
}

impl<S> ScheduleTemplateApplicator<S>
where
    S: ScheduleStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The source restaurant's stored schedule as it is, including an inactive
    /// one. Only a restaurant with nothing stored yields the default.
    pub async fn load_template(
        &self,
        source_id: &RestaurantId,
    ) -> Result<DeliverySchedule, StoreError> {
        stored_or_default(self.store.as_ref(), source_id).await
    }

    /// Writes a copy of `source` for every target except the source restaurant.
    pub async fn apply<I>(&self, source: &DeliverySchedule, targets: I) -> ApplyReport
    where
        I: IntoIterator<Item = RestaurantId>,
    {
        let mut report = ApplyReport::default();
        let mut seen = HashSet::new();
        let mut schedules = Vec::new();

        for target in targets {
            // the source keeps its own schedule; see DESIGN.md
            if target == source.restaurant_id {
                report.skipped_source = true;
                continue;
            }
            if seen.insert(target.clone()) {
                schedules.push(retarget(source, target));
            }
        }

        let writes = schedules.iter().map(|s| self.store.put_schedule(s));
        let outcomes = join_all(writes).await;

        for (schedule, outcome) in schedules.into_iter().zip(outcomes) {
            let restaurant_id = schedule.restaurant_id;
            match outcome {
                Ok(()) => {
                    info!(source = %source.restaurant_id, target = %restaurant_id, "schedule applied");
                    report.succeeded.push(restaurant_id);
                }
                Err(error) => {
                    warn!(
                        source = %source.restaurant_id,
                        target = %restaurant_id,
                        error = %error,
                        "schedule apply failed"
                    );
                    report.failed.push(ApplyFailure { restaurant_id, error });
                }
            }
        }
        report
    }

    /// [`Self::apply`] over every restaurant the directory lists.
    pub async fn apply_to_directory<D>(
        &self,
        source: &DeliverySchedule,
        directory: &D,
    ) -> Result<ApplyReport, StoreError>
    where
        D: RestaurantDirectory + ?Sized,
    {
        let targets = directory.list_restaurant_ids().await?;
        Ok(self.apply(source, targets).await)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use mockall::predicate::function;

    use super::*;
    use crate::ports::{MockRestaurantDirectory, MockScheduleStore};
    use crate::schedule::{WeekdaySet, parse_iso_date};

    fn source() -> DeliverySchedule {
        let blocked: BTreeSet<_> = [parse_iso_date("2024-12-25").expect("date")].into();
        DeliverySchedule::new(
            "src".into(),
            WeekdaySet::from_codes(&[2, 4]).expect("codes"),
            2,
            9,
            blocked,
        )
        .expect("valid")
        .with_notes("only Tue/Thu")
        .with_active(false)
    }

    #[test]
    fn retarget_only_rebinds_the_restaurant() {
        let copy = retarget(&source(), "other".into());
        assert_eq!(copy.restaurant_id.as_str(), "other");
        assert_eq!(
            DeliverySchedule { restaurant_id: "src".into(), ..copy },
            source()
        );
    }

    #[tokio::test]
    async fn source_restaurant_and_duplicates_are_not_written() {
        let mut store = MockScheduleStore::new();
        store
            .expect_put_schedule()
            .with(function(|s: &DeliverySchedule| s.restaurant_id.as_str() == "a"))
            .times(1)
            .returning(|_| Ok(()));

        let applicator = ScheduleTemplateApplicator::new(Arc::new(store));
        let report = applicator
            .apply(&source(), ["src".into(), "a".into(), "a".into()])
            .await;

        assert!(report.skipped_source);
        assert_eq!(report.succeeded, vec![RestaurantId::from("a")]);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn inactive_source_is_loaded_unchanged() {
        let mut store = MockScheduleStore::new();
        store
            .expect_get_schedule()
            .times(1)
            .return_once(|_| Ok(Some(source())));

        let applicator = ScheduleTemplateApplicator::new(Arc::new(store));
        let loaded = applicator.load_template(&"src".into()).await.expect("loads");
        assert_eq!(loaded, source());
    }

    #[tokio::test]
    async fn missing_source_loads_the_default() {
        let mut store = MockScheduleStore::new();
        store.expect_get_schedule().return_once(|_| Ok(None));

        let applicator = ScheduleTemplateApplicator::new(Arc::new(store));
        let loaded = applicator.load_template(&"src".into()).await.expect("loads");
        assert_eq!(loaded, DeliverySchedule::default_for("src".into()));
    }

    #[tokio::test]
    async fn directory_failure_is_returned_before_any_write() {
        let mut store = MockScheduleStore::new();
        store.expect_put_schedule().never();
        let mut directory = MockRestaurantDirectory::new();
        directory
            .expect_list_restaurant_ids()
            .return_once(|| Err(StoreError::query("restaurants unavailable")));

        let applicator = ScheduleTemplateApplicator::new(Arc::new(store));
        let err = applicator
            .apply_to_directory(&source(), &directory)
            .await
            .expect_err("directory fails");
        assert_eq!(err, StoreError::query("restaurants unavailable"));
    }

    #[tokio::test]
    async fn every_listed_restaurant_receives_the_copy() {
        let mut store = MockScheduleStore::new();
        store
            .expect_put_schedule()
            .times(2)
            .returning(|s| {
                assert_eq!(s.allowed_weekdays.codes(), vec![2, 4]);
                assert!(!s.is_active);
                Ok(())
            });
        let mut directory = MockRestaurantDirectory::new();
        directory
            .expect_list_restaurant_ids()
            .return_once(|| Ok(vec!["src".into(), "b".into(), "c".into()]));

        let applicator = ScheduleTemplateApplicator::new(Arc::new(store));
        let report = applicator
            .apply_to_directory(&source(), &directory)
            .await
            .expect("directory lists");
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.succeeded, vec![RestaurantId::from("b"), RestaurantId::from("c")]);
    }
}
