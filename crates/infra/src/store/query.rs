//! Query parameters and paginated results for inventory listings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use almox_core::{CategoryId, ProductId, UnitId};
use almox_inventory::{MovementDirection, StockMovement};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).clamp(1, 1000),
            offset: offset.unwrap_or(0),
        }
    }

    /// 1-based page number with a fixed page size.
    pub fn page(page: Option<u32>, per_page: u32) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.clamp(1, 1000);
        Self {
            limit: per_page,
            offset: (page - 1).saturating_mul(per_page),
        }
    }

    pub fn first(limit: u32) -> Self {
        Self::new(Some(limit), None)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of rows matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let has_more = (pagination.offset as u64) + (items.len() as u64) < total;
        Self {
            items,
            total,
            pagination,
            has_more,
        }
    }

    /// Slice an already filtered and ordered list.
    pub fn from_sorted(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Self::new(items, total, pagination)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
            has_more: self.has_more,
        }
    }
}

/// Filter for units of measure and categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFilter {
    /// Case-insensitive substring over name, symbol (units) and description.
    pub search: Option<String>,
    pub active: Option<bool>,
}

/// Filter for the product list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring over code, name and description.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit_id: Option<UnitId>,
    pub active: Option<bool>,
    /// Only products at or below their minimum quantity.
    #[serde(default)]
    pub low_stock_only: bool,
}

/// Filter for the movement list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub direction: Option<MovementDirection>,
    /// Inclusive lower bound on the UTC calendar date of the movement.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the UTC calendar date of the movement.
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring over product code, product name and notes.
    pub search: Option<String>,
}

impl MovementFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }
}

/// A movement joined with the product fields list views display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementRecord {
    pub movement: StockMovement,
    pub product_code: String,
    pub product_name: String,
    pub unit_symbol: String,
}

/// Normalized search needle: trimmed, lowercased, `None` when blank.
pub(crate) fn search_needle(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(Pagination::page(None, 15), Pagination { limit: 15, offset: 0 });
        assert_eq!(Pagination::page(Some(3), 20), Pagination { limit: 20, offset: 40 });
        assert_eq!(Pagination::page(Some(0), 10), Pagination { limit: 10, offset: 0 });
    }

    #[test]
    fn from_sorted_reports_has_more() {
        let page = Page::from_sorted((1..=25).collect::<Vec<_>>(), Pagination::page(Some(2), 10));
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert!(page.has_more);

        let last = Page::from_sorted((1..=25).collect::<Vec<_>>(), Pagination::page(Some(3), 10));
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_more);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_needle(Some("   ")), None);
        assert_eq!(search_needle(Some(" Papel ")), Some("papel".to_string()));
    }
}
