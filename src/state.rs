use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

use crate::analysis::metrics::{summarize, MetricsSummary, ViewCoverage};
use crate::analysis::report::AnalysisReport;
use crate::config::AnalysisConfig;
use crate::data::filter::{apply, FilterCriteria};
use crate::data::model::{RecordCollection, RecordStore};
use crate::error::CriteriaError;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Criteria together with the view they produced. Published as one unit so a
/// reader can never pair new criteria with an old view.
#[derive(Debug)]
pub struct Snapshot {
    pub criteria: FilterCriteria,
    pub view: Arc<RecordCollection>,
}

/// The analysis session: the loaded dataset plus the active filters.
///
/// Criteria changes build the new view first and then swap the snapshot
/// pointer, so concurrent readers see either the old or the new state.
#[derive(Debug)]
pub struct SessionContext {
    store: Arc<RecordStore>,
    current: RwLock<Arc<Snapshot>>,
}

impl SessionContext {
    /// Start a session showing the full dataset.
    pub fn new(store: Arc<RecordStore>) -> Self {
        let snapshot = Snapshot {
            criteria: FilterCriteria::unconstrained(),
            view: Arc::new(store.collection().clone()),
        };
        Self {
            store,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.snapshot().criteria.clone()
    }

    /// The filtered view for the latest applied criteria.
    pub fn current_view(&self) -> Arc<RecordCollection> {
        Arc::clone(&self.snapshot().view)
    }

    /// Replace the active criteria wholesale.
    pub fn apply_criteria(&self, criteria: FilterCriteria) {
        let view = apply(self.store.collection(), &criteria);
        debug!(
            "criteria applied: {} of {} records kept",
            view.len(),
            self.store.len()
        );
        let snapshot = Arc::new(Snapshot {
            criteria,
            view: Arc::new(view),
        });
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Derive new criteria from the current ones and apply them. If `change`
    /// fails the current criteria stay in effect.
    ///
    /// Reads and the final swap are atomic, but the read-modify-write is not:
    /// callers must serialize writers or one update can overwrite another.
    pub fn update<F>(&self, change: F) -> Result<(), CriteriaError>
    where
        F: FnOnce(FilterCriteria) -> Result<FilterCriteria, CriteriaError>,
    {
        match change(self.criteria()) {
            Ok(next) => {
                self.apply_criteria(next);
                Ok(())
            }
            Err(err) => {
                warn!("rejected filter update: {err}");
                Err(err)
            }
        }
    }

    /// Drop every constraint and show the full dataset again.
    pub fn reset(&self) {
        self.apply_criteria(FilterCriteria::unconstrained());
    }

    pub fn set_subjects<I, S>(&self, subjects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let criteria = self.criteria().with_subjects(subjects);
        self.apply_criteria(criteria);
    }

    /// Toggle a single subject in the selection.
    ///
    /// With no subject constraint every subject counts as selected, so the
    /// first toggle removes `subject` from the full set. A selection that ends
    /// up full or empty means no constraint again.
    pub fn toggle_subject(&self, subject: &str) {
        let mut selected = self.criteria().subjects().clone();
        if selected.is_empty() {
            selected = self.store.subjects.clone();
        }
        if !selected.remove(subject) {
            selected.insert(subject.to_string());
        }
        if selected == self.store.subjects {
            selected.clear();
        }
        self.set_subjects(selected);
    }

    /// Select all subjects, i.e. remove the subject constraint.
    pub fn select_all_subjects(&self) {
        self.set_subjects(Vec::<String>::new());
    }

    pub fn set_rating_range(&self, min: f64, max: f64) -> Result<(), CriteriaError> {
        self.update(|c| c.with_rating_range(min, max))
    }

    pub fn set_student_id_range(&self, min: i64, max: i64) -> Result<(), CriteriaError> {
        self.update(|c| c.with_student_id_range(min, max))
    }

    pub fn metrics(&self) -> MetricsSummary {
        summarize(&self.current_view())
    }

    pub fn coverage(&self) -> ViewCoverage {
        ViewCoverage::new(self.current_view().len(), self.store.len())
    }

    pub fn report(&self, config: &AnalysisConfig) -> AnalysisReport {
        AnalysisReport::build(&self.current_view(), self.store.len(), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FeedbackRecord;

    fn session() -> SessionContext {
        let records = RecordCollection::from_records(vec![
            FeedbackRecord::new(Some(1), "Math", Some(4.0), Some("good")),
            FeedbackRecord::new(Some(2), "Math", Some(5.0), None),
            FeedbackRecord::new(Some(3), "Art", Some(3.0), Some("ok")),
        ]);
        SessionContext::new(Arc::new(RecordStore::new(records)))
    }

    #[test]
    fn starts_with_the_full_dataset() {
        let session = session();
        assert!(session.criteria().is_unconstrained());
        assert_eq!(session.current_view().len(), 3);
    }

    #[test]
    fn applied_criteria_are_reflected_in_the_view() {
        let session = session();
        session.set_subjects(["Math"]);
        let metrics = session.metrics();
        assert_eq!(metrics.total_records, 2);
        assert_eq!(metrics.average_rating, Some(4.5));
        assert_eq!(session.coverage(), ViewCoverage::new(2, 3));
    }

    #[test]
    fn invalid_update_keeps_prior_criteria() {
        let session = session();
        session.set_rating_range(4.0, 5.0).unwrap();
        let before = session.snapshot();

        let err = session.set_rating_range(5.0, 1.0).unwrap_err();
        assert!(matches!(err, CriteriaError::InvertedRange { .. }));

        let after = session.snapshot();
        assert_eq!(after.criteria, before.criteria);
        assert_eq!(after.view.len(), 2);
    }

    #[test]
    fn reset_restores_everything() {
        let session = session();
        session.set_subjects(["Art"]);
        session.set_student_id_range(3, 3).unwrap();
        assert_eq!(session.current_view().len(), 1);

        session.reset();
        assert!(session.criteria().is_unconstrained());
        assert_eq!(session.current_view().len(), 3);
    }

    #[test]
    fn toggling_starts_from_every_subject_selected() {
        let session = session();
        session.toggle_subject("Art");
        let view = session.current_view();
        assert!(view.iter().all(|r| r.subject == "Math"));
        assert_eq!(view.len(), 2);

        session.toggle_subject("Art");
        assert!(session.criteria().subjects().is_empty());
        assert_eq!(session.current_view().len(), 3);
    }

    #[test]
    fn toggling_collapses_full_and_empty_selections() {
        let session = session();
        session.set_subjects(["Math"]);
        session.toggle_subject("Art");
        assert!(session.criteria().subjects().is_empty());

        session.set_subjects(["Math"]);
        session.toggle_subject("Math");
        assert!(session.criteria().subjects().is_empty());
        assert_eq!(session.current_view().len(), 3);

        session.set_subjects(["Art"]);
        session.select_all_subjects();
        assert!(session.criteria().subjects().is_empty());
    }

    #[test]
    fn held_views_are_unaffected_by_later_updates() {
        let session = session();
        let old = session.current_view();
        session.set_subjects(["Art"]);
        assert_eq!(old.len(), 3);
        assert_eq!(session.current_view().len(), 1);
    }

    #[test]
    fn readers_never_see_mismatched_criteria_and_view() {
        let session = Arc::new(session());
        let writer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                for i in 0..200 {
                    if i % 2 == 0 {
                        session.set_subjects(["Art"]);
                    } else {
                        session.reset();
                    }
                }
            })
        };
        for _ in 0..200 {
            let snap = session.snapshot();
            let expected = apply(session.store().collection(), &snap.criteria);
            assert_eq!(*snap.view, expected);
        }
        writer.join().unwrap();
    }
}
