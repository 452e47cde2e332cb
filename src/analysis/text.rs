use std::collections::HashMap;

use serde::Serialize;

use super::aggregate::{AggregateTable, SortDirection, SortSpec};
use crate::data::model::RecordCollection;

/// Common English words left out of term counts.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "else",
    "ever", "few", "for", "from", "further", "get", "had", "has", "have", "having", "he", "her",
    "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into",
    "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not",
    "of", "off", "on", "once", "only", "or", "other", "otherwise", "our", "ours", "ourselves",
    "out", "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// Every non-blank comment, trimmed and joined by single spaces, in record order.
/// This is the raw text handed to a word-cloud renderer.
pub fn comment_corpus(records: &RecordCollection) -> String {
    records
        .iter()
        .filter_map(|r| r.non_blank_comment())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased word tokens of a comment. Apostrophes inside words are kept and
/// a trailing possessive `'s` is dropped.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphabetic() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .map(|w| w.strip_suffix("'s").unwrap_or(w).to_lowercase())
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(&w.as_str()))
}

/// Term frequencies over all comments, most frequent first, ties alphabetical,
/// truncated to `limit` terms.
pub fn comment_terms(records: &RecordCollection, limit: usize) -> AggregateTable<TermCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for comment in records.iter().filter_map(|r| r.non_blank_comment()) {
        for term in tokens(comment) {
            *counts.entry(term).or_default() += 1;
        }
    }

    let mut rows: Vec<TermCount> = counts
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    rows.truncate(limit);

    AggregateTable {
        name: "comment_terms",
        sort: SortSpec {
            key: "count",
            direction: SortDirection::Descending,
            tie_break: Some("term"),
        },
        rows,
    }
}
