//! Multi-page listing walker.
//!
//! Platform list endpoints answer with `(records, page, totalPages)`. The walker keeps
//! asking for the next page until the server says it is on the last one, or until the
//! safety cap is reached.

use std::future::Future;

use crate::{errors::Error, Result};

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

/// One page of a listing, with the server's paging metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct PaginatedFetcher {
    per_page: u32,
    max_pages: u32,
}

impl Default for PaginatedFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE, DEFAULT_MAX_PAGES)
    }
}

impl PaginatedFetcher {
    pub fn new(per_page: u32, max_pages: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            max_pages: max_pages.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Fetch every page starting at page 1 and concatenate records in page order.
    ///
    /// The first failing page aborts the walk and its error is returned as-is.
    pub async fn fetch_all<T, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let mut out = Vec::new();
        let mut next = 1u32;
        let mut fetched = 0u32;

        loop {
            if fetched >= self.max_pages {
                return Err(Error::PageLimit {
                    max_pages: self.max_pages,
                });
            }

            let page = fetch_page(PageRequest {
                page: next,
                per_page: self.per_page,
            })
            .await?;
            fetched += 1;

            tracing::debug!(
                page = page.page,
                total_pages = page.total_pages,
                records = page.records.len(),
                "fetched listing page"
            );

            out.extend(page.records);
            if page.total_pages <= page.page {
                return Ok(out);
            }
            next = page.page + 1;
        }
    }
}
