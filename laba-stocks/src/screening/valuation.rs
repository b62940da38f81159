//! Intrinsic-value ranking.
//!
//! Rows carry several valuation models and the percentage gap between each
//! model and the opening price. Ranking sorts by one of those columns,
//! smallest first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::numeric::coerce_str;
use super::page::{retrieved_at_now, Page, Pagination, PAGE_SIZE};

/// One stock in the intrinsic-value snapshot. Non-numeric cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationRow {
    #[serde(rename = "Stock Symbol")]
    pub symbol: String,
    #[serde(rename = "Company Name", default)]
    pub company_name: String,
    #[serde(rename = "Opening Price", default, skip_serializing_if = "Option::is_none")]
    pub opening_price: Option<f64>,
    #[serde(rename = "Beta", default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(rename = "DCF Value", default, skip_serializing_if = "Option::is_none")]
    pub dcf_value: Option<f64>,
    #[serde(rename = "Percent DCF", default, skip_serializing_if = "Option::is_none")]
    pub percent_dcf: Option<f64>,
    #[serde(rename = "Percent Abs DCF", default, skip_serializing_if = "Option::is_none")]
    pub percent_abs_dcf: Option<f64>,
    #[serde(rename = "DDM Value", default, skip_serializing_if = "Option::is_none")]
    pub ddm_value: Option<f64>,
    #[serde(rename = "Percent DDM", default, skip_serializing_if = "Option::is_none")]
    pub percent_ddm: Option<f64>,
    #[serde(rename = "Percent Abs DDM", default, skip_serializing_if = "Option::is_none")]
    pub percent_abs_ddm: Option<f64>,
    #[serde(rename = "Benjamin Graham Value", default, skip_serializing_if = "Option::is_none")]
    pub graham_value: Option<f64>,
    #[serde(rename = "Percent Benjamin Graham", default, skip_serializing_if = "Option::is_none")]
    pub percent_graham: Option<f64>,
    #[serde(
        rename = "Percent Abs Benjamin Graham",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub percent_abs_graham: Option<f64>,
    #[serde(rename = "Average Value", default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<f64>,
    #[serde(rename = "Percent Average", default, skip_serializing_if = "Option::is_none")]
    pub percent_average: Option<f64>,
    #[serde(rename = "Percent Abs Average", default, skip_serializing_if = "Option::is_none")]
    pub percent_abs_average: Option<f64>,
    #[serde(
        rename = "Intrinsic Value Standard Deviation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stddev: Option<f64>,
}

impl ValuationRow {
    /// Build a row from header-keyed text cells. Missing columns are absent.
    pub fn from_cells(cells: &HashMap<&str, &str>) -> Self {
        let text = |name: &str| cells.get(name).map(|s| s.trim().to_string()).unwrap_or_default();
        let num = |name: &str| cells.get(name).and_then(|s| coerce_str(s));

        Self {
            symbol: text("Stock Symbol"),
            company_name: text("Company Name"),
            opening_price: num("Opening Price"),
            beta: num("Beta"),
            dcf_value: num("DCF Value"),
            percent_dcf: num("Percent DCF"),
            percent_abs_dcf: num("Percent Abs DCF"),
            ddm_value: num("DDM Value"),
            percent_ddm: num("Percent DDM"),
            percent_abs_ddm: num("Percent Abs DDM"),
            graham_value: num("Benjamin Graham Value"),
            percent_graham: num("Percent Benjamin Graham"),
            percent_abs_graham: num("Percent Abs Benjamin Graham"),
            average_value: num("Average Value"),
            percent_average: num("Percent Average"),
            percent_abs_average: num("Percent Abs Average"),
            stddev: num("Intrinsic Value Standard Deviation"),
        }
    }
}

/// Ranking column. Every key sorts ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationSortKey {
    Beta,
    PercentDcf,
    PercentDdm,
    PercentGraham,
    PercentAverage,
    PercentAbsDcf,
    PercentAbsDdm,
    PercentAbsGraham,
    PercentAbsAverage,
    Stddev,
}

impl ValuationSortKey {
    pub const ALL: [Self; 10] = [
        Self::Beta,
        Self::PercentDcf,
        Self::PercentDdm,
        Self::PercentGraham,
        Self::PercentAverage,
        Self::PercentAbsDcf,
        Self::PercentAbsDdm,
        Self::PercentAbsGraham,
        Self::PercentAbsAverage,
        Self::Stddev,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beta => "beta",
            Self::PercentDcf => "percent_dcf",
            Self::PercentDdm => "percent_ddm",
            Self::PercentGraham => "percent_graham",
            Self::PercentAverage => "percent_average",
            Self::PercentAbsDcf => "percent_abs_dcf",
            Self::PercentAbsDdm => "percent_abs_ddm",
            Self::PercentAbsGraham => "percent_abs_graham",
            Self::PercentAbsAverage => "percent_abs_average",
            Self::Stddev => "stddev",
        }
    }

    fn field(&self, row: &ValuationRow) -> Option<f64> {
        match self {
            Self::Beta => row.beta,
            Self::PercentDcf => row.percent_dcf,
            Self::PercentDdm => row.percent_ddm,
            Self::PercentGraham => row.percent_graham,
            Self::PercentAverage => row.percent_average,
            Self::PercentAbsDcf => row.percent_abs_dcf,
            Self::PercentAbsDdm => row.percent_abs_ddm,
            Self::PercentAbsGraham => row.percent_abs_graham,
            Self::PercentAbsAverage => row.percent_abs_average,
            Self::Stddev => row.stddev,
        }
    }
}

/// Rank and paginate the snapshot.
///
/// Without a recognized key the whole snapshot comes back as a single page.
/// With one, rows lacking the column are dropped before ranking.
pub fn sort_and_filter_data(
    mut rows: Vec<ValuationRow>,
    sort_key: Option<ValuationSortKey>,
    page: usize,
) -> Page<ValuationRow> {
    let Some(key) = sort_key else {
        let total = rows.len();
        return Page {
            data: rows,
            pagination: Pagination {
                current_page: 1,
                total_pages: 1,
                page_size: total,
                total_items: total,
                has_next_page: false,
                has_previous_page: false,
            },
            retrieved_at: retrieved_at_now(),
        };
    };

    rows.retain(|row| key.field(row).is_some());
    rows.sort_by(|a, b| {
        let (x, y) = (key.field(a).unwrap_or_default(), key.field(b).unwrap_or_default());
        x.total_cmp(&y)
    });

    let pagination = Pagination::open_ended(rows.len(), page, PAGE_SIZE);
    Page::from_rows(&rows, pagination)
}
