//! Page arithmetic for search endpoints
//!
//! Search is paged by 1-indexed page number over the index's offset/limit.

use tos_common::index::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

/// Requested page translated to offset/limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub page_size: usize,
    /// Offset for the index query
    pub offset: usize,
}

/// Sanitize a requested page and page size
///
/// Page 0 reads as page 1. A missing or zero size uses the default and sizes
/// above the maximum are clamped.
///
/// # Examples
/// ```
/// use tos_bridge::pagination::calculate_pagination;
///
/// let p = calculate_pagination(Some(3), Some(20));
/// assert_eq!(p.offset, 40);
///
/// let p = calculate_pagination(None, Some(1000));
/// assert_eq!(p.page, 1);
/// assert_eq!(p.page_size, 100);
/// ```
pub fn calculate_pagination(page: Option<usize>, page_size: Option<usize>) -> Pagination {
    let page_size = match page_size {
        None | Some(0) => DEFAULT_SEARCH_LIMIT,
        Some(n) => n.min(MAX_SEARCH_LIMIT),
    };
    let page = page.unwrap_or(1).max(1);

    Pagination {
        page,
        page_size,
        offset: (page - 1).saturating_mul(page_size),
    }
}

/// Number of pages needed for `total` results
pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
