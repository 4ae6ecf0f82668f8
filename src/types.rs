/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Primary key of a merchant (tenant) row
pub type MerchantId = i32;

const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64` at the largest page size
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// `?page=&limit=` query parameters for list endpoints
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Resolve against an endpoint's default page size.
    pub fn resolve(self, default_limit: i64) -> Page {
        Page {
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: self.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn with_total(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total + self.limit - 1) / self.limit,
        }
    }
}

/// Pagination block returned alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let page = PageQuery::default().resolve(10);
        assert_eq!(page, Page { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);

        let page = PageQuery { page: Some(0), limit: Some(10_000) }.resolve(20);
        assert_eq!(page, Page { page: 1, limit: 100 });

        let page = PageQuery { page: Some(3), limit: Some(20) }.resolve(10);
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn page_count_rounds_up() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(page.with_total(0).pages, 0);
        assert_eq!(page.with_total(10).pages, 1);
        assert_eq!(page.with_total(11).pages, 2);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let page = PageQuery { page: Some(i64::MAX), limit: None }.resolve(10);
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() > 0);

        let page = PageQuery { page: Some(i64::MAX), limit: Some(i64::MAX) }.resolve(10);
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert!(page.offset() > 0);

        let raw = Page { page: i64::MAX, limit: 100 };
        assert_eq!(raw.offset(), i64::MAX);
    }
}
