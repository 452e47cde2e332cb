//! End-to-end tests of the filter → metrics → aggregate pipeline.

use std::io::Write;
use std::sync::Arc;

use course_feedback::analysis::aggregate::{
    rating_histogram, student_average_ratings, subject_average_ratings, subject_counts,
    subject_rating_counts, subject_rating_distribution, subject_rating_spread, top_subjects,
};
use course_feedback::analysis::text::comment_terms;
use course_feedback::data::export::to_csv_string;
use course_feedback::data::loader::read_csv;
use course_feedback::{
    apply, load_file, summarize, AnalysisConfig, FeedbackRecord, FilterCriteria,
    RecordCollection, RecordStore, SessionContext,
};

// ============================================================================
// FIXTURES
// ============================================================================

fn three_records() -> RecordCollection {
    RecordCollection::from_records(vec![
        FeedbackRecord::new(Some(1), "Math", Some(4.0), Some("good")),
        FeedbackRecord::new(Some(2), "Math", Some(5.0), None),
        FeedbackRecord::new(Some(3), "Art", Some(3.0), Some("ok")),
    ])
}

/// A mixed dataset: repeated students, every rating step, one unrated row.
fn course_records() -> RecordCollection {
    let subjects = ["Physics", "Art", "Math", "History"];
    let comments = [Some("clear"), None, Some("too fast"), Some(" ")];
    let records = (0..48)
        .map(|i: i64| {
            let idx = i as usize;
            let rating = if i == 17 { None } else { Some((i % 11) as f64 * 0.5) };
            FeedbackRecord::new(
                Some(100 + i % 13),
                subjects[idx % subjects.len()],
                rating,
                comments[idx % comments.len()],
            )
        })
        .collect();
    RecordCollection::from_records(records)
}

fn subject_only() -> FilterCriteria {
    FilterCriteria::unconstrained().with_subjects(["Math", "Art"])
}

fn rating_only() -> FilterCriteria {
    FilterCriteria::unconstrained()
        .with_rating_range(1.0, 4.0)
        .unwrap()
}

fn student_only() -> FilterCriteria {
    FilterCriteria::unconstrained()
        .with_student_id_range(102, 109)
        .unwrap()
}

fn combined() -> FilterCriteria {
    FilterCriteria::new(["Math", "Art"], Some((1.0, 4.0)), Some((102, 109))).unwrap()
}

// ============================================================================
// FILTER PROPERTIES
// ============================================================================

#[test]
fn filtered_view_is_an_ordered_subset() {
    let records = course_records();
    let view = apply(&records, &combined());
    assert!(!view.is_empty());

    let mut cursor = records.iter();
    for kept in &view {
        assert!(
            cursor.any(|r| r == kept),
            "record {kept:?} missing or out of order"
        );
    }
}

#[test]
fn filter_order_does_not_matter() {
    let records = course_records();
    let expected = apply(&records, &combined());
    let single = [subject_only(), rating_only(), student_only()];
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in orders {
        let view = order
            .iter()
            .fold(records.clone(), |acc, &i| apply(&acc, &single[i]));
        assert_eq!(view, expected, "order {order:?}");
    }
}

#[test]
fn filtering_is_idempotent() {
    let records = course_records();
    for criteria in [subject_only(), rating_only(), student_only(), combined()] {
        let once = apply(&records, &criteria);
        assert_eq!(apply(&once, &criteria), once);
    }
}

#[test]
fn unconstrained_criteria_are_an_identity_on_metrics() {
    let records = course_records();
    let view = apply(&records, &FilterCriteria::unconstrained());
    assert_eq!(summarize(&view), summarize(&records));
}

#[test]
fn full_extent_criteria_are_an_identity_when_every_record_is_rated() {
    let records = three_records();
    let store = RecordStore::new(records.clone());
    let all_subjects = store.subjects.iter().cloned().collect::<Vec<_>>();
    let criteria = FilterCriteria::spanning(&store).with_subjects(all_subjects);
    assert_eq!(summarize(&apply(&records, &criteria)), summarize(&records));
}

#[test]
fn exact_rating_boundary() {
    let criteria = FilterCriteria::unconstrained()
        .with_rating_range(4.0, 4.0)
        .unwrap();
    let view = apply(&three_records(), &criteria);
    assert_eq!(view.records, vec![three_records().records[0].clone()]);
}

// ============================================================================
// METRICS AND AGGREGATES
// ============================================================================

#[test]
fn math_only_scenario() {
    let view = apply(
        &three_records(),
        &FilterCriteria::unconstrained().with_subjects(["Math"]),
    );
    let metrics = summarize(&view);
    assert_eq!(metrics.total_records, 2);
    assert_eq!(metrics.average_rating, Some(4.5));
    assert_eq!(metrics.distinct_subjects, 1);
    assert_eq!(metrics.comment_count, 1);
}

#[test]
fn subject_average_scenario() {
    let rows: Vec<(String, f64, usize)> = subject_average_ratings(&three_records())
        .rows
        .into_iter()
        .map(|r| (r.subject, r.mean, r.count))
        .collect();
    assert_eq!(
        rows,
        vec![("Art".to_string(), 3.0, 1), ("Math".to_string(), 4.5, 2)]
    );
}

#[test]
fn distribution_rows_sum_to_one_hundred_on_a_larger_dataset() {
    let table = subject_rating_distribution(&course_records());
    let subjects: std::collections::BTreeSet<&str> =
        table.rows.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects.len(), 4);
    for subject in subjects {
        let total: f64 = table
            .rows
            .iter()
            .filter(|r| r.subject == subject)
            .map(|r| r.percent)
            .sum();
        assert!((total - 100.0).abs() < 0.01, "{subject} sums to {total}");
    }
}

#[test]
fn rating_counts_agree_with_subject_counts() {
    let records = course_records();
    let counts = subject_rating_counts(&records);
    let rated_total: usize = counts.rows.iter().map(|c| c.count).sum();
    assert_eq!(rated_total, records.ratings().count());

    let all_total: usize = subject_counts(&records).rows.iter().map(|c| c.count).sum();
    assert_eq!(all_total, records.len());
}

#[test]
fn empty_input_degrades_gracefully() {
    let empty = apply(
        &three_records(),
        &FilterCriteria::unconstrained().with_subjects(["Philosophy"]),
    );
    let metrics = summarize(&empty);
    assert_eq!(metrics.total_records, 0);
    assert_eq!(metrics.average_rating, None);
    assert_eq!(metrics.distinct_subjects, 0);
    assert_eq!(metrics.distinct_students, Some(0));
    assert_eq!(metrics.comment_count, 0);

    assert!(subject_counts(&empty).is_empty());
    assert!(top_subjects(&empty, 15).is_empty());
    assert!(subject_average_ratings(&empty).is_empty());
    assert!(student_average_ratings(&empty, 20).is_empty());
    assert!(subject_rating_counts(&empty).is_empty());
    assert!(subject_rating_distribution(&empty).is_empty());
    assert!(rating_histogram(&empty, 20).is_empty());
    assert!(subject_rating_spread(&empty).is_empty());
    assert!(comment_terms(&empty, 200).is_empty());
}

#[test]
fn aggregates_are_deterministic_across_threads() {
    let records = Arc::new(course_records());
    let sequential = serde_json::to_string(&subject_average_ratings(&records)).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let records = Arc::clone(&records);
            std::thread::spawn(move || serde_json::to_string(&subject_average_ratings(&records)).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), sequential);
    }
}

// ============================================================================
// LOAD → SESSION → EXPORT
// ============================================================================

#[test]
fn csv_without_student_column_end_to_end() {
    let text = "Subject,Rating,Comment\nMath,4.0,good\nArt,2.5,\nMath,,late\n";
    let loaded = read_csv(text.as_bytes()).unwrap();
    let session = SessionContext::new(Arc::new(loaded.store));

    session.set_student_id_range(1, 2).unwrap();
    assert_eq!(session.current_view().len(), 3);

    let report = session.report(&AnalysisConfig::default());
    assert_eq!(report.metrics.distinct_students, None);
    assert!(report.student_average_ratings.is_empty());
    assert_eq!(report.metrics.average_rating, Some(3.25));

    session.set_rating_range(3.0, 5.0).unwrap();
    let exported = to_csv_string(&session.current_view()).unwrap();
    assert_eq!(exported, "Subject,Rating,Comment\nMath,4.0,good\n");
}

#[test]
fn session_over_loaded_file() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(to_csv_string(&course_records()).unwrap().as_bytes())
        .unwrap();

    let loaded = load_file(file.path()).unwrap();
    assert_eq!(loaded.report.rows_loaded, 48);
    let session = SessionContext::new(Arc::new(loaded.store));

    session.apply_criteria(combined());
    assert_eq!(*session.current_view(), apply(&course_records(), &combined()));

    let config = AnalysisConfig {
        student_preview_limit: 3,
        ..AnalysisConfig::default()
    };
    let report = session.report(&config);
    assert!(report.student_average_ratings.len() <= 3);
    assert_eq!(report.coverage.total, 48);

    session.reset();
    assert_eq!(session.current_view().len(), 48);
}
