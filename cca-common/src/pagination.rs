//! Page arithmetic for list endpoints

use serde::{Deserialize, Serialize};

/// Rows per page on every paginated endpoint
pub const PAGE_SIZE: i64 = 100;

/// Page position reported alongside a page of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based, clamped into range
    pub page: i64,
    pub total_pages: i64,
    /// Rows to skip for this page
    #[serde(skip)]
    pub offset: i64,
}

/// `?page=N`, defaulting to the first page
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

fn first_page() -> i64 {
    1
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: first_page() }
    }
}

/// Locate `requested` among `total` rows
///
/// Pages below 1 resolve to the first page and pages past the end to the
/// last one, so a stale link still returns rows.
///
/// ```
/// use cca_common::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 7);
/// assert_eq!((p.page, p.total_pages, p.offset), (3, 3, 200));
/// ```
pub fn calculate_pagination(total: i64, requested: i64) -> Pagination {
    let total_pages = if total <= 0 { 0 } else { (total - 1) / PAGE_SIZE + 1 };
    let page = requested.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_page() {
        let p = calculate_pagination(250, 2);
        assert_eq!((p.page, p.total_pages, p.offset), (2, 3, 100));
    }

    #[test]
    fn test_requested_page_is_clamped() {
        assert_eq!(calculate_pagination(150, 99).page, 2);
        assert_eq!(calculate_pagination(150, 0).page, 1);
        assert_eq!(calculate_pagination(150, -4).offset, 0);
    }

    #[test]
    fn test_no_rows() {
        let p = calculate_pagination(0, 3);
        assert_eq!((p.page, p.total_pages, p.offset), (1, 0, 0));
    }

    #[test]
    fn test_full_last_page() {
        let p = calculate_pagination(200, 5);
        assert_eq!((p.page, p.total_pages), (2, 2));
    }

    #[test]
    fn test_page_query_defaults_to_first() {
        let q: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
    }
}
