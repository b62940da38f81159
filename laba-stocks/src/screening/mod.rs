//! Screening over CSV snapshots.
//!
//! - [`graham`]: criteria bitmask filter, descending rank, clamped pages
//! - [`valuation`]: intrinsic-value ranking with optional sort key
//! - [`dataset`]: snapshot loading
//! - [`numeric`]: lenient numeric coercion for snapshot cells

pub mod dataset;
pub mod graham;
pub mod numeric;
pub mod page;
pub mod valuation;

pub use dataset::{CsvDataset, DatasetSource};
pub use graham::{screen, CriteriaMask, GrahamSortKey, ScreeningQuery, ScreeningRow};
pub use numeric::coerce_number;
pub use page::{Page, Pagination, PAGE_SIZE};
pub use valuation::{sort_and_filter_data, ValuationRow, ValuationSortKey};
