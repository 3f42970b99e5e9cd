//! Offset pagination helpers for list endpoints.

use serde::Deserialize;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on page size to keep result sets small.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters for page/limit pagination.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    /// Normalizes the parameters: page is at least 1 and the limit is
    /// clamped to `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// SQL LIMIT value.
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }

    /// SQL OFFSET value for the current page.
    pub fn offset(&self) -> i64 {
        ((self.page.max(1) - 1) as i64) * self.limit as i64
    }

    /// Total number of pages for a given row count.
    pub fn total_pages(&self, total: i64) -> u32 {
        if total <= 0 {
            0
        } else {
            ((total as f64) / (self.limit as f64)).ceil() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_for_later_pages() {
        let params = PageParams { page: 3, limit: 20 }.normalized();
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_zero_page_is_clamped() {
        let params = PageParams { page: 0, limit: 10 }.normalized();
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = PageParams {
            page: 1,
            limit: 10_000,
        }
        .normalized();
        assert_eq!(params.limit, MAX_PAGE_SIZE);

        let params = PageParams { page: 1, limit: 0 }.normalized();
        assert_eq!(params.limit, 1);
    }

    #[test]
    fn test_total_pages() {
        let params = PageParams { page: 1, limit: 20 };
        assert_eq!(params.total_pages(0), 0);
        assert_eq!(params.total_pages(1), 1);
        assert_eq!(params.total_pages(20), 1);
        assert_eq!(params.total_pages(21), 2);
        assert_eq!(params.total_pages(100), 5);
    }

    #[test]
    fn test_deserialize_from_query() {
        let params: PageParams = serde_json::from_str(r#"{"page": 2, "limit": 50}"#).unwrap();
        assert_eq!(params.page, 2);
        assert_eq!(params.limit, 50);

        let params: PageParams = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, DEFAULT_PAGE_SIZE);
    }
}
