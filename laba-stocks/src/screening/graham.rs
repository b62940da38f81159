//! Benjamin Graham criteria screening.
//!
//! Each snapshot row carries a 7-character criteria string per investor
//! profile (`1` = criterion met) and a count of met criteria. Screening keeps
//! rows that meet every criterion selected by the mask, ranks them by the
//! chosen profile's count and returns one page.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::page::{Page, Pagination, PAGE_SIZE};
use crate::error::{StockError, StockResult};

/// Number of Graham criteria per profile.
pub const CRITERIA_COUNT: usize = 7;

// ============================================================================
// Rows
// ============================================================================

/// One stock in the Graham snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRow {
    #[serde(rename = "Stock Symbol")]
    pub symbol: String,

    #[serde(rename = "Company Name", default)]
    pub company_name: String,

    #[serde(rename = "Defensive Value")]
    pub defensive_value: i64,

    #[serde(rename = "Defensive")]
    pub defensive: String,

    #[serde(rename = "Enterprising Value")]
    pub enterprising_value: i64,

    #[serde(rename = "Enterprising")]
    pub enterprising: String,

    #[serde(rename = "Overall Value")]
    pub overall_value: i64,
}

impl ScreeningRow {
    /// Reject rows whose criteria strings are not 7 binary digits.
    pub fn validate(&self) -> Result<(), String> {
        let profiles = [
            ("Defensive", &self.defensive),
            ("Enterprising", &self.enterprising),
        ];
        for (profile, bits) in profiles {
            if CriteriaMask::parse(bits).is_none() {
                return Err(format!(
                    "{}: {profile} criteria {bits:?} is not a {CRITERIA_COUNT}-bit string",
                    self.symbol
                ));
            }
        }
        Ok(())
    }

    fn criteria(&self, profile: GrahamSortKey) -> Option<CriteriaMask> {
        match profile {
            GrahamSortKey::Defensive => CriteriaMask::parse(&self.defensive),
            GrahamSortKey::Enterprising => CriteriaMask::parse(&self.enterprising),
            GrahamSortKey::Overall => None,
        }
    }

    fn value(&self, key: GrahamSortKey) -> i64 {
        match key {
            GrahamSortKey::Defensive => self.defensive_value,
            GrahamSortKey::Enterprising => self.enterprising_value,
            GrahamSortKey::Overall => self.overall_value,
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Ranking profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrahamSortKey {
    Defensive,
    Enterprising,
    #[default]
    Overall,
}

impl GrahamSortKey {
    /// Exact-match parse; anything else (including absence) is `Overall`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw {
            Some("Defensive") => Self::Defensive,
            Some("Enterprising") => Self::Enterprising,
            _ => Self::Overall,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defensive => "Defensive",
            Self::Enterprising => "Enterprising",
            Self::Overall => "Overall",
        }
    }
}

impl fmt::Display for GrahamSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seven-bit criteria selection; bit 0 is the leftmost character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaMask(u8);

impl CriteriaMask {
    /// Parse `^[01]{7}$`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != CRITERIA_COUNT {
            return None;
        }
        raw.bytes().enumerate().try_fold(0u8, |acc, (i, b)| match b {
            b'1' => Some(acc | (1 << i)),
            b'0' => Some(acc),
            _ => None,
        })
        .map(Self)
    }

    /// True when every criterion selected here is also set in `row`.
    pub fn is_satisfied_by(&self, row: CriteriaMask) -> bool {
        self.0 & row.0 == self.0
    }
}

impl fmt::Display for CriteriaMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..CRITERIA_COUNT {
            f.write_str(if self.0 & (1 << i) != 0 { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Parse a page parameter; missing, unparsable or non-positive means 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// A validated Graham list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreeningQuery {
    pub sort_key: GrahamSortKey,
    pub filter_mask: Option<CriteriaMask>,
    pub page: usize,
}

impl ScreeningQuery {
    /// Build from raw request parameters.
    ///
    /// A non-empty `filter_by` must be seven binary digits regardless of the
    /// sort key; it is only applied under Defensive or Enterprising.
    pub fn from_params(
        sort_by: Option<&str>,
        filter_by: Option<&str>,
        page: Option<&str>,
    ) -> StockResult<Self> {
        let filter_mask = match filter_by.filter(|f| !f.is_empty()) {
            Some(raw) => Some(
                CriteriaMask::parse(raw)
                    .ok_or_else(|| StockError::validation("Invalid filterBy format"))?,
            ),
            None => None,
        };

        Ok(Self {
            sort_key: GrahamSortKey::parse_or_default(sort_by),
            filter_mask,
            page: parse_page(page),
        })
    }

    /// Canonical cache-key params: sortBy, filterBy or "", page.
    pub fn key_params(&self) -> Vec<String> {
        vec![
            self.sort_key.to_string(),
            self.filter_mask.map(|m| m.to_string()).unwrap_or_default(),
            self.page.to_string(),
        ]
    }

    fn active_mask(&self) -> Option<CriteriaMask> {
        match self.sort_key {
            GrahamSortKey::Overall => None,
            _ => self.filter_mask,
        }
    }
}

// ============================================================================
// Screening
// ============================================================================

/// Filter, rank and paginate snapshot rows.
pub fn screen(mut rows: Vec<ScreeningRow>, query: &ScreeningQuery) -> Page<ScreeningRow> {
    if let Some(mask) = query.active_mask() {
        rows.retain(|row| {
            row.criteria(query.sort_key)
                .is_some_and(|bits| mask.is_satisfied_by(bits))
        });
    }

    // Stable: ties keep snapshot order.
    rows.sort_by(|a, b| b.value(query.sort_key).cmp(&a.value(query.sort_key)));

    let pagination = Pagination::clamped(rows.len(), query.page, PAGE_SIZE);
    Page::from_rows(&rows, pagination)
}
