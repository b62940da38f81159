//! Paginated screening responses.

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

/// Rows per page for ranked screening results.
pub const PAGE_SIZE: usize = 10;

/// Pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    fn new(current_page: usize, total_pages: usize, page_size: usize, total_items: usize) -> Self {
        Self {
            current_page,
            total_pages,
            page_size,
            total_items,
            has_next_page: current_page < total_pages,
            has_previous_page: current_page > 1,
        }
    }

    /// Clamp `requested` into `[1, total_pages]`; an empty set reports page 1
    /// of 0.
    pub fn clamped(total_items: usize, requested: usize, page_size: usize) -> Self {
        let total_pages = total_items.div_ceil(page_size);
        let current = requested.clamp(1, total_pages.max(1));
        Self::new(current, total_pages, page_size, total_items)
    }

    /// Clamp `requested` below at 1 only. A page past the end stays as asked
    /// and selects no rows. An empty set still reports page 1.
    pub fn open_ended(total_items: usize, requested: usize, page_size: usize) -> Self {
        let total_pages = total_items.div_ceil(page_size);
        let current = if total_items == 0 { 1 } else { requested.max(1) };
        Self::new(current, total_pages, page_size, total_items)
    }

    /// Half-open row range selected by this page.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = (self.current_page - 1)
            .saturating_mul(self.page_size)
            .min(self.total_items);
        let end = start.saturating_add(self.page_size).min(self.total_items);
        start..end
    }
}

/// One page of screening rows, as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub retrieved_at: String,
}

impl<T: Clone> Page<T> {
    /// Slice `rows` according to `pagination`.
    pub fn from_rows(rows: &[T], pagination: Pagination) -> Self {
        let data = rows[pagination.range()].to_vec();
        Self {
            data,
            pagination,
            retrieved_at: retrieved_at_now(),
        }
    }
}

/// Current time in the display zone.
pub fn retrieved_at_now() -> String {
    format_retrieved_at(Utc::now())
}

/// Render an instant in America/New_York, e.g. `Monday, 02 June 2025, 14:05 EDT`.
pub fn format_retrieved_at(at: DateTime<Utc>) -> String {
    at.with_timezone(&New_York)
        .format("%A, %d %B %Y, %H:%M %Z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clamped_pagination() {
        let p = Pagination::clamped(25, 1, PAGE_SIZE);
        assert_eq!((p.current_page, p.total_pages), (1, 3));
        assert!(p.has_next_page && !p.has_previous_page);
        assert_eq!(p.range(), 0..10);

        let last = Pagination::clamped(25, 99, PAGE_SIZE);
        assert_eq!(last.current_page, 3);
        assert_eq!(last.range(), 20..25);
        assert!(!last.has_next_page && last.has_previous_page);

        let zero = Pagination::clamped(25, 0, PAGE_SIZE);
        assert_eq!(zero.current_page, 1);
    }

    #[test]
    fn test_clamped_empty() {
        let p = Pagination::clamped(0, 4, PAGE_SIZE);
        assert_eq!((p.current_page, p.total_pages, p.total_items), (1, 0, 0));
        assert!(!p.has_next_page && !p.has_previous_page);
        assert_eq!(p.range(), 0..0);
    }

    #[test]
    fn test_open_ended_past_end() {
        let p = Pagination::open_ended(3, 2, PAGE_SIZE);
        assert_eq!((p.current_page, p.total_pages), (2, 1));
        assert_eq!(p.range(), 3..3);
        assert!(!p.has_next_page);

        let empty = Pagination::open_ended(0, 5, PAGE_SIZE);
        assert_eq!((empty.current_page, empty.total_pages), (1, 0));
    }

    #[test]
    fn test_page_serialization() {
        let page = Page::from_rows(&[1, 2, 3], Pagination::clamped(3, 1, PAGE_SIZE));
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["pagination"]["currentPage"], 1);
        assert_eq!(json["pagination"]["pageSize"], 10);
        assert_eq!(json["pagination"]["hasNextPage"], false);
        assert!(json["retrievedAt"].is_string());
    }

    #[test]
    fn test_retrieved_at_format() {
        let summer = Utc.with_ymd_and_hms(2025, 6, 2, 18, 5, 0).unwrap();
        assert_eq!(format_retrieved_at(summer), "Monday, 02 June 2025, 14:05 EDT");

        let winter = Utc.with_ymd_and_hms(2025, 1, 6, 15, 30, 0).unwrap();
        assert_eq!(format_retrieved_at(winter), "Monday, 06 January 2025, 10:30 EST");
    }
}
