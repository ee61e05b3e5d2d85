//! Page parameters and the `{data, meta}` page envelope.

use serde::{Deserialize, Serialize};

/// Page size used when the client does not ask for one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// Pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, params: &PageParams) -> Self {
        let per_page = params.per_page();
        let pages = (total.max(0) as u64).div_ceil(u64::from(per_page));
        let last_page = u32::try_from(pages).unwrap_or(u32::MAX).max(1);

        Self {
            data,
            meta: PageMeta {
                current_page: params.page(),
                last_page,
                per_page,
                total,
            },
        }
    }

    /// A page with no rows and a total of zero.
    pub fn empty(params: &PageParams) -> Self {
        Self::new(Vec::new(), 0, params)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(params.offset(), 0);

        let params = PageParams::new(0, 1000);
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);

        let params = PageParams::new(3, 10);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn last_page_rounds_up() {
        let page: Page<i64> = Page::new(vec![1, 2], 21, &PageParams::new(1, 10));
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.meta.total, 21);
    }

    #[test]
    fn empty_page_has_one_last_page() {
        let page: Page<i64> = Page::empty(&PageParams::default());
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.last_page, 1);
        assert_eq!(page.meta.current_page, 1);
    }
}
