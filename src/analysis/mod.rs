/// Analysis layer: pure functions over a record collection.
///
/// ```text
///   RecordCollection (filtered view)
///        │
///        ├──▶ metrics    → MetricsSummary, ViewCoverage
///        ├──▶ aggregate  → AggregateTable<_> per chart
///        ├──▶ text       → comment corpus, term counts
///        ▼
///   ┌──────────┐
///   │  report   │  bundle everything for the rendering layer
///   └──────────┘
/// ```
///
/// Nothing here holds state, so tables can be computed in any order (or in
/// parallel) with identical results.

pub mod aggregate;
pub mod metrics;
pub mod report;
pub mod text;
