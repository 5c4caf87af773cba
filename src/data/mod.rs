//! Data layer: core types, loading, filtering and chart payloads.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → JobDataset (lenient dates via `dates`)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ JobDataset  │  Vec<JobPosting>, facet index
//!   └────────────┘
//!        │                       │
//!        ▼                       ▼
//!   ┌──────────┐          ┌──────────┐
//!   │ payload   │          │  filter   │  FilterSelection → matching postings
//!   └──────────┘          └──────────┘
//!   per-chart raw inputs, scoped by the filters
//! ```

pub mod dates;
pub mod filter;
pub mod loader;
pub mod model;
pub mod payload;
