/// Data layer: typed row-sets, loading, filtering, aggregation and export.
///
/// Architecture:
/// ```text
///      .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RowSet (typed, schema-checked)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec (AND of predicates) → new RowSet
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌───────────┐  ┌──────────┐
///   │ aggregate  │  │   bin    │  equal-width buckets → label column
///   └───────────┘  └──────────┘
///        │
///        ▼
///   OrderedTable / Matrix → ui
/// ```
///
/// Every stage is a pure function of its inputs; row-sets are never mutated.

pub mod aggregate;
pub mod bin;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;

pub use error::{DataError, Result};
pub use model::{ColumnKind, RowSet, Value};
