use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{FeedbackRecord, RatingKey, RecordCollection};

// ---------------------------------------------------------------------------
// AggregateTable – a named, ordered set of rows for one chart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Declared ordering of a table's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub key: &'static str,
    pub direction: SortDirection,
    /// Secondary key, always ascending.
    pub tie_break: Option<&'static str>,
}

impl SortSpec {
    fn asc(key: &'static str) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
            tie_break: None,
        }
    }

    fn desc(key: &'static str) -> Self {
        Self {
            key,
            direction: SortDirection::Descending,
            tie_break: None,
        }
    }

    fn then(mut self, tie_break: &'static str) -> Self {
        self.tie_break = Some(tie_break);
        self
    }
}

/// Rows derived from a record collection, already in `sort` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable<R> {
    pub name: &'static str,
    pub sort: SortSpec,
    pub rows: Vec<R>,
}

impl<R> AggregateTable<R> {
    fn new(name: &'static str, sort: SortSpec, rows: Vec<R>) -> Self {
        Self { name, sort, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRating {
    pub subject: String,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRating {
    pub student_id: i64,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRatingCount {
    pub subject: String,
    pub rating: RatingKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRatingShare {
    pub subject: String,
    pub rating: RatingKey,
    /// Share of the subject's rated records, in percent.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Five-number summary of one subject's ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSpread {
    pub subject: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Grouping helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct RatingAccumulator {
    sum: f64,
    count: usize,
}

impl RatingAccumulator {
    fn push(&mut self, rating: f64) {
        self.sum += rating;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Group records by key. Keys come out in ascending order; records within a
/// group keep their input order.
fn group_by<'a, K, F>(records: &'a RecordCollection, key: F) -> BTreeMap<K, Vec<&'a FeedbackRecord>>
where
    K: Ord,
    F: Fn(&'a FeedbackRecord) -> Option<K>,
{
    let mut groups: BTreeMap<K, Vec<&FeedbackRecord>> = BTreeMap::new();
    for rec in records {
        if let Some(k) = key(rec) {
            groups.entry(k).or_default().push(rec);
        }
    }
    groups
}

/// Mean rating per group over the records that carry a rating. Groups with no
/// rated record are dropped.
fn mean_ratings<K: Ord>(
    groups: BTreeMap<K, Vec<&FeedbackRecord>>,
) -> Vec<(K, RatingAccumulator)> {
    groups
        .into_iter()
        .filter_map(|(k, recs)| {
            let mut acc = RatingAccumulator::default();
            for r in recs.iter().filter_map(|r| r.rating) {
                acc.push(r);
            }
            (acc.count > 0).then_some((k, acc))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Number of records per subject, most frequent first.
pub fn subject_counts(records: &RecordCollection) -> AggregateTable<SubjectCount> {
    let mut rows: Vec<SubjectCount> = group_by(records, |r| Some(r.subject.as_str()))
        .into_iter()
        .map(|(subject, recs)| SubjectCount {
            subject: subject.to_string(),
            count: recs.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.subject.cmp(&b.subject)));

    AggregateTable::new(
        "subject_counts",
        SortSpec::desc("count").then("subject"),
        rows,
    )
}

/// The `limit` most frequent subjects, same ordering as [`subject_counts`].
pub fn top_subjects(records: &RecordCollection, limit: usize) -> AggregateTable<SubjectCount> {
    let mut table = subject_counts(records);
    table.rows.truncate(limit);
    table.name = "top_subjects";
    table
}

/// Mean rating and rated-record count per subject, lowest mean first.
pub fn subject_average_ratings(records: &RecordCollection) -> AggregateTable<SubjectRating> {
    let groups = group_by(records, |r| Some(r.subject.as_str()));
    let mut rows: Vec<SubjectRating> = mean_ratings(groups)
        .into_iter()
        .map(|(subject, acc)| SubjectRating {
            subject: subject.to_string(),
            mean: acc.mean(),
            count: acc.count,
        })
        .collect();
    rows.sort_by(|a, b| a.mean.total_cmp(&b.mean).then_with(|| a.subject.cmp(&b.subject)));

    AggregateTable::new(
        "subject_average_ratings",
        SortSpec::asc("mean").then("subject"),
        rows,
    )
}

/// Mean rating per student for the first `limit` student ids in ascending id
/// order.
///
/// This is a bounded preview of the grouping, not a ranking: rows are picked
/// by student id, never by rating. Empty when the dataset has no student id
/// column.
pub fn student_average_ratings(
    records: &RecordCollection,
    limit: usize,
) -> AggregateTable<StudentRating> {
    let sort = SortSpec::asc("student_id");
    if !records.schema.has_student_id() {
        return AggregateTable::new("student_average_ratings", sort, Vec::new());
    }

    let rows = mean_ratings(group_by(records, |r| r.student_id))
        .into_iter()
        .take(limit)
        .map(|(student_id, acc)| StudentRating {
            student_id,
            mean: acc.mean(),
            count: acc.count,
        })
        .collect();

    AggregateTable::new("student_average_ratings", sort, rows)
}

/// Occurrences of each (subject, rating) pair. Only non-zero cells appear.
pub fn subject_rating_counts(records: &RecordCollection) -> AggregateTable<SubjectRatingCount> {
    let rows = group_by(records, |r| r.rating.map(|v| (r.subject.as_str(), RatingKey(v))))
        .into_iter()
        .map(|((subject, rating), recs)| SubjectRatingCount {
            subject: subject.to_string(),
            rating,
            count: recs.len(),
        })
        .collect();

    AggregateTable::new(
        "subject_rating_counts",
        SortSpec::asc("subject").then("rating"),
        rows,
    )
}

/// For each subject, the percentage of its rated records holding each rating.
/// Every subject's shares sum to 100; subjects with no rated record are absent.
pub fn subject_rating_distribution(
    records: &RecordCollection,
) -> AggregateTable<SubjectRatingShare> {
    let counts = subject_rating_counts(records);

    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for cell in &counts.rows {
        *totals.entry(cell.subject.as_str()).or_default() += cell.count;
    }

    let rows = counts
        .rows
        .iter()
        .filter_map(|cell| {
            let total = *totals.get(cell.subject.as_str())?;
            (total > 0).then(|| SubjectRatingShare {
                subject: cell.subject.clone(),
                rating: cell.rating,
                percent: cell.count as f64 * 100.0 / total as f64,
            })
        })
        .collect();

    AggregateTable::new(
        "subject_rating_distribution",
        SortSpec::asc("subject").then("rating"),
        rows,
    )
}

/// Equal-width histogram of present ratings between their minimum and maximum.
/// The last bin is closed on the right. A single bin is produced when every
/// rating is identical.
pub fn rating_histogram(records: &RecordCollection, bins: usize) -> AggregateTable<RatingBin> {
    let sort = SortSpec::asc("lower");
    let ratings: Vec<f64> = records.ratings().collect();
    let Some((min, max)) = ratings.iter().fold(None, |ext: Option<(f64, f64)>, &r| {
        Some(ext.map_or((r, r), |(lo, hi)| (lo.min(r), hi.max(r))))
    }) else {
        return AggregateTable::new("rating_histogram", sort, Vec::new());
    };

    if min == max || bins <= 1 {
        let row = RatingBin {
            lower: min,
            upper: max,
            count: ratings.len(),
        };
        return AggregateTable::new("rating_histogram", sort, vec![row]);
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for r in &ratings {
        let idx = (((r - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let rows = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| RatingBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect();

    AggregateTable::new("rating_histogram", sort, rows)
}

/// Box-plot statistics per subject, subjects ascending. Quartiles use linear
/// interpolation between closest ranks.
pub fn subject_rating_spread(records: &RecordCollection) -> AggregateTable<SubjectSpread> {
    let rows = group_by(records, |r| Some(r.subject.as_str()))
        .into_iter()
        .filter_map(|(subject, recs)| {
            let mut ratings: Vec<f64> = recs.iter().filter_map(|r| r.rating).collect();
            if ratings.is_empty() {
                return None;
            }
            ratings.sort_by(f64::total_cmp);
            Some(SubjectSpread {
                subject: subject.to_string(),
                count: ratings.len(),
                min: ratings[0],
                q1: quantile(&ratings, 0.25),
                median: quantile(&ratings, 0.5),
                q3: quantile(&ratings, 0.75),
                max: ratings[ratings.len() - 1],
            })
        })
        .collect();

    AggregateTable::new("subject_rating_spread", SortSpec::asc("subject"), rows)
}

/// `q`-quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
