/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RecordStore (+ schema capability flags)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ RecordStore  │  RecordCollection, subject set, rating / id extents
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterCriteria → filtered RecordCollection
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  filtered view → CSV
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
