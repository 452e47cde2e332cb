use std::collections::BTreeSet;
use std::fmt::Display;

use serde::Serialize;

use super::model::{FeedbackRecord, RecordCollection, RecordStore, Schema};
use crate::error::CriteriaError;

// ---------------------------------------------------------------------------
// RangeFilter – an inclusive [min, max] bound
// ---------------------------------------------------------------------------

/// Inclusive range. Only constructible with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeFilter<T> {
    min: T,
    max: T,
}

impl<T: PartialOrd + Copy + Display> RangeFilter<T> {
    fn checked(field: &'static str, min: T, max: T) -> Result<Self, CriteriaError> {
        if min > max {
            return Err(CriteriaError::InvertedRange {
                field,
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl RangeFilter<f64> {
    pub fn ratings(min: f64, max: f64) -> Result<Self, CriteriaError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(CriteriaError::NonFiniteBound { field: "rating" });
        }
        Self::checked("rating", min, max)
    }
}

impl RangeFilter<i64> {
    pub fn student_ids(min: i64, max: i64) -> Result<Self, CriteriaError> {
        Self::checked("student id", min, max)
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria – the full set of active constraints
// ---------------------------------------------------------------------------

/// The constraints a user has selected. Replaced wholesale on every change;
/// the `with_*` methods consume the value and return a new one.
///
/// An empty subject set means "every subject", not "no subject". An absent
/// range means no constraint on that field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterCriteria {
    subjects: BTreeSet<String>,
    rating_range: Option<RangeFilter<f64>>,
    student_id_range: Option<RangeFilter<i64>>,
}

impl FilterCriteria {
    /// Criteria that keep every record.
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn new<I, S>(
        subjects: I,
        rating_range: Option<(f64, f64)>,
        student_id_range: Option<(i64, i64)>,
    ) -> Result<Self, CriteriaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let criteria = Self::unconstrained().with_subjects(subjects);
        let criteria = match rating_range {
            Some((min, max)) => criteria.with_rating_range(min, max)?,
            None => criteria,
        };
        match student_id_range {
            Some((min, max)) => criteria.with_student_id_range(min, max),
            None => Ok(criteria),
        }
    }

    /// Criteria whose ranges span the store's full rating and student id extents.
    pub fn spanning(store: &RecordStore) -> Self {
        Self {
            subjects: BTreeSet::new(),
            rating_range: store
                .rating_extent
                .map(|(min, max)| RangeFilter { min, max }),
            student_id_range: store
                .student_id_extent
                .map(|(min, max)| RangeFilter { min, max }),
        }
    }

    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating_range(mut self, min: f64, max: f64) -> Result<Self, CriteriaError> {
        self.rating_range = Some(RangeFilter::ratings(min, max)?);
        Ok(self)
    }

    pub fn with_student_id_range(mut self, min: i64, max: i64) -> Result<Self, CriteriaError> {
        self.student_id_range = Some(RangeFilter::student_ids(min, max)?);
        Ok(self)
    }

    pub fn without_rating_range(mut self) -> Self {
        self.rating_range = None;
        self
    }

    pub fn without_student_id_range(mut self) -> Self {
        self.student_id_range = None;
        self
    }

    pub fn subjects(&self) -> &BTreeSet<String> {
        &self.subjects
    }

    pub fn rating_range(&self) -> Option<RangeFilter<f64>> {
        self.rating_range
    }

    pub fn student_id_range(&self) -> Option<RangeFilter<i64>> {
        self.student_id_range
    }

    pub fn is_unconstrained(&self) -> bool {
        self.subjects.is_empty() && self.rating_range.is_none() && self.student_id_range.is_none()
    }

    /// Whether a single record passes every active constraint.
    ///
    /// * subject: passes when no subjects are selected or the record's subject is selected
    /// * rating: a record without a rating fails an active rating range
    /// * student id: ignored entirely when the schema has no student id column
    pub fn matches(&self, record: &FeedbackRecord, schema: &Schema) -> bool {
        if !self.subjects.is_empty() && !self.subjects.contains(&record.subject) {
            return false;
        }
        if let Some(range) = &self.rating_range {
            match record.rating {
                Some(r) if range.contains(r) => {}
                _ => return false,
            }
        }
        if let (Some(range), true) = (&self.student_id_range, schema.has_student_id()) {
            match record.student_id {
                Some(id) if range.contains(id) => {}
                _ => return false,
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Applying criteria
// ---------------------------------------------------------------------------

/// Return indices of records that pass all active filters, in input order.
pub fn filtered_indices(records: &RecordCollection, criteria: &FilterCriteria) -> Vec<usize> {
    if criteria.is_unconstrained() {
        return (0..records.len()).collect();
    }
    records
        .iter()
        .enumerate()
        .filter(|(_, rec)| criteria.matches(rec, &records.schema))
        .map(|(i, _)| i)
        .collect()
}

/// Produce the filtered view as a new collection. The input is left untouched
/// and relative order is preserved.
pub fn apply(records: &RecordCollection, criteria: &FilterCriteria) -> RecordCollection {
    let kept = filtered_indices(records, criteria)
        .into_iter()
        .map(|i| records.records[i].clone())
        .collect();
    RecordCollection::new(records.schema.clone(), kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, subject: &str, rating: Option<f64>) -> FeedbackRecord {
        FeedbackRecord::new(Some(id), subject, rating, None)
    }

    fn sample() -> RecordCollection {
        RecordCollection::from_records(vec![
            rec(1, "Math", Some(4.0)),
            rec(2, "Math", Some(5.0)),
            rec(3, "Art", Some(3.0)),
            rec(4, "History", None),
            rec(5, "Art", Some(4.0)),
        ])
    }

    #[test]
    fn empty_subject_set_selects_all() {
        let criteria = FilterCriteria::unconstrained().with_subjects(Vec::<String>::new());
        assert_eq!(apply(&sample(), &criteria), sample());
    }

    #[test]
    fn subject_filter_keeps_members_in_order() {
        let criteria = FilterCriteria::unconstrained().with_subjects(["Art"]);
        assert_eq!(filtered_indices(&sample(), &criteria), vec![2, 4]);
    }

    #[test]
    fn rating_range_is_inclusive_and_drops_unrated() {
        let criteria = FilterCriteria::unconstrained()
            .with_rating_range(3.0, 4.0)
            .unwrap();
        assert_eq!(filtered_indices(&sample(), &criteria), vec![0, 2, 4]);
    }

    #[test]
    fn degenerate_rating_range_matches_exact_value() {
        let criteria = FilterCriteria::unconstrained()
            .with_rating_range(4.0, 4.0)
            .unwrap();
        let view = apply(&sample(), &criteria);
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|r| r.rating == Some(4.0)));
    }

    #[test]
    fn student_range_is_inclusive() {
        let criteria = FilterCriteria::unconstrained()
            .with_student_id_range(2, 4)
            .unwrap();
        assert_eq!(filtered_indices(&sample(), &criteria), vec![1, 2, 3]);
    }

    #[test]
    fn student_range_is_noop_without_student_column() {
        let mut records = sample();
        records.schema.student_id_column = None;
        for r in &mut records.records {
            r.student_id = None;
        }
        let criteria = FilterCriteria::unconstrained()
            .with_student_id_range(100, 200)
            .unwrap();
        assert_eq!(apply(&records, &criteria).len(), records.len());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let err = FilterCriteria::unconstrained()
            .with_rating_range(4.0, 2.0)
            .unwrap_err();
        assert!(matches!(err, CriteriaError::InvertedRange { field: "rating", .. }));

        assert!(FilterCriteria::new(["Math"], None, Some((9, 1))).is_err());
        assert!(matches!(
            RangeFilter::ratings(f64::NAN, 1.0),
            Err(CriteriaError::NonFiniteBound { .. })
        ));
    }

    #[test]
    fn filters_compose_conjunctively() {
        let criteria = FilterCriteria::new(["Art", "Math"], Some((4.0, 5.0)), Some((1, 4))).unwrap();
        assert_eq!(filtered_indices(&sample(), &criteria), vec![0, 1]);
    }

    #[test]
    fn empty_result_is_a_valid_collection() {
        let criteria = FilterCriteria::unconstrained().with_subjects(["Physics"]);
        let view = apply(&sample(), &criteria);
        assert!(view.is_empty());
        assert_eq!(view.schema, sample().schema);
    }

    #[test]
    fn spanning_criteria_cover_the_whole_store() {
        let records = RecordCollection::from_records(vec![
            rec(10, "Math", Some(1.0)),
            rec(20, "Art", Some(5.0)),
        ]);
        let store = RecordStore::new(records.clone());
        let criteria = FilterCriteria::spanning(&store);
        assert_eq!(criteria.rating_range().map(|r| (r.min(), r.max())), Some((1.0, 5.0)));
        assert_eq!(apply(&records, &criteria), records);
    }
}
