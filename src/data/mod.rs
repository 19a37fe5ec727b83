/// Data layer: loading, coercion, aggregation and series building.
///
/// Architecture:
/// ```text
///  raw portal export / NCAA wide table
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  count per month / reshape per year → chart CSVs
///   └──────────┘
///        │
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable (string cells)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  RecordSchema → Vec<TypedRecord> + drop count
///   └───────────┘
///        │
///        ▼
///   ┌─────────────────────┐
///   │ filter / aggregate   │  group selection, (time, group) buckets
///   └─────────────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ series/stack  │  sorted, era-partitioned Series; cumulative; stacks
///   └──────────────┘
/// ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod series;
pub mod stack;
