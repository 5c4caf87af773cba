//! Aggregation helpers: pure functions that turn raw series into the
//! statistics the charts draw.
//!
//! ```text
//!   salaries per category ──▶ summary  ──▶ box plots, bar medians, sorting
//!                         └─▶ density  ──▶ ridgeline curves
//!   daily counts          ──▶ bucket   ──▶ weekly / monthly / quarterly grids
//! ```
//!
//! Nothing here keeps state.  Missing keys count as zero, non-finite values
//! are dropped, and empty input yields `None` instead of panicking.

pub mod bucket;
pub mod density;
pub mod summary;

pub use bucket::{Granularity, bucket_series};
pub use density::density_curve;
pub use summary::{Summary, median, padded_range, summarize};
