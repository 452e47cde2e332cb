use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// RatingKey – an orderable rating value
// ---------------------------------------------------------------------------

/// A rating usable as a grouping key.
/// Ratings are `f64`, so ordering and hashing go through `total_cmp` / `to_bits`
/// to make them usable in `BTreeMap` keys.
#[derive(Debug, Clone, Copy)]
pub struct RatingKey(pub f64);

impl PartialEq for RatingKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for RatingKey {}

impl PartialOrd for RatingKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RatingKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for RatingKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for RatingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for RatingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

// ---------------------------------------------------------------------------
// FeedbackRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// A single feedback submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    /// `None` when the dataset has no student id column.
    pub student_id: Option<i64>,
    pub subject: String,
    /// `None` when the source cell was empty.
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

impl FeedbackRecord {
    pub fn new(
        student_id: Option<i64>,
        subject: impl Into<String>,
        rating: Option<f64>,
        comment: Option<&str>,
    ) -> Self {
        Self {
            student_id,
            subject: subject.into(),
            rating,
            comment: comment.map(str::to_string),
        }
    }

    /// The comment, if present and not blank after trimming.
    pub fn non_blank_comment(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Schema – capability flags resolved once at load time
// ---------------------------------------------------------------------------

/// Source column names for each field. Optional columns are `None` when the
/// dataset does not carry them; filters and metrics consult the capability
/// flags instead of probing individual records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub student_id_column: Option<String>,
    pub subject_column: String,
    pub rating_column: String,
    pub comment_column: Option<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            student_id_column: Some("Student_ID".into()),
            subject_column: "Subject".into(),
            rating_column: "Rating".into(),
            comment_column: Some("Comment".into()),
        }
    }
}

impl Schema {
    pub fn has_student_id(&self) -> bool {
        self.student_id_column.is_some()
    }

    pub fn has_comment(&self) -> bool {
        self.comment_column.is_some()
    }

    /// Header names in export order, only for columns present in the dataset.
    pub fn headers(&self) -> Vec<&str> {
        let mut headers = Vec::with_capacity(4);
        if let Some(col) = &self.student_id_column {
            headers.push(col.as_str());
        }
        headers.push(self.subject_column.as_str());
        headers.push(self.rating_column.as_str());
        if let Some(col) = &self.comment_column {
            headers.push(col.as_str());
        }
        headers
    }
}

/// Canonical form used to match source headers: lowercase, with `_`, `-`
/// and whitespace removed. `Student_ID`, `student id` and `StudentId` all
/// normalise to `studentid`.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !(c.is_whitespace() || *c == '_' || *c == '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// RecordCollection – an ordered sequence of records
// ---------------------------------------------------------------------------

/// An ordered, immutable-by-convention sequence of records sharing a schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordCollection {
    pub schema: Schema,
    pub records: Vec<FeedbackRecord>,
}

impl RecordCollection {
    pub fn new(schema: Schema, records: Vec<FeedbackRecord>) -> Self {
        Self { schema, records }
    }

    /// A collection using the default four-column schema.
    pub fn from_records(records: Vec<FeedbackRecord>) -> Self {
        Self::new(Schema::default(), records)
    }

    /// An empty collection with the same schema.
    pub fn empty_like(&self) -> Self {
        Self::new(self.schema.clone(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeedbackRecord> {
        self.records.iter()
    }

    /// Ratings that are present, in record order.
    pub fn ratings(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().filter_map(|r| r.rating)
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a FeedbackRecord;
    type IntoIter = std::slice::Iter<'a, FeedbackRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// RecordStore – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full dataset with pre-computed column extents.
#[derive(Debug, Clone)]
pub struct RecordStore {
    collection: RecordCollection,
    /// Sorted set of subjects present.
    pub subjects: BTreeSet<String>,
    /// `(min, max)` over present ratings.
    pub rating_extent: Option<(f64, f64)>,
    /// `(min, max)` over student ids; `None` if the column is absent.
    pub student_id_extent: Option<(i64, i64)>,
}

impl RecordStore {
    /// Build column extents from the loaded records.
    pub fn new(collection: RecordCollection) -> Self {
        let mut subjects = BTreeSet::new();
        let mut rating_extent: Option<(f64, f64)> = None;
        let mut student_id_extent: Option<(i64, i64)> = None;

        for rec in &collection {
            subjects.insert(rec.subject.clone());
            if let Some(r) = rec.rating {
                rating_extent = Some(match rating_extent {
                    Some((lo, hi)) => (lo.min(r), hi.max(r)),
                    None => (r, r),
                });
            }
            if let Some(id) = rec.student_id.filter(|_| collection.schema.has_student_id()) {
                student_id_extent = Some(match student_id_extent {
                    Some((lo, hi)) => (lo.min(id), hi.max(id)),
                    None => (id, id),
                });
            }
        }

        RecordStore {
            collection,
            subjects,
            rating_extent,
            student_id_extent,
        }
    }

    pub fn collection(&self) -> &RecordCollection {
        &self.collection
    }

    pub fn schema(&self) -> &Schema {
        &self.collection.schema
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}
