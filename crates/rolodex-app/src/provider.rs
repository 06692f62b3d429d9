// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::model::{Contact, Page, PageRequest};
use crate::query::QueryCriteria;
use crate::status::UiStatus;

/// Backend operation returning one page of contacts for a query.
#[async_trait(?Send)]
pub trait PageSource {
    async fn fetch_page(&self, criteria: &QueryCriteria, request: PageRequest) -> Result<Page>;
}

/// A page ready for the grid, tagged with the cache generation it was
/// requested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedPage {
    pub generation: u64,
    pub request: PageRequest,
    pub content: Vec<Contact>,
    pub total: usize,
}

impl ProvidedPage {
    fn from_page(generation: u64, request: PageRequest, page: Page) -> Self {
        let mut content = page.content;
        content.truncate(request.size());
        let loaded = request.offset() + content.len();
        // A short page marks the end of the data set; a full one only says
        // there may be more.
        let total = if content.len() < request.size() {
            loaded
        } else if page.size >= loaded && page.size > request.size() {
            // Larger than one page, so it is the backend's own count.
            page.size
        } else {
            loaded + request.size()
        };
        Self {
            generation,
            request,
            content,
            total,
        }
    }

    pub fn is_short(&self) -> bool {
        self.content.len() < self.request.size()
    }
}

/// A request that came back with an error. The error itself has already
/// gone to the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedPage {
    pub generation: u64,
    pub request: PageRequest,
}

pub type PageDelivery = std::result::Result<ProvidedPage, FailedPage>;

pub type PageFetch = LocalBoxFuture<'static, PageDelivery>;

/// Bridges the grid's pull-based paging to a [`PageSource`]. Holds no page
/// data itself; the only shared state is the generation counter.
#[derive(Clone)]
pub struct DataProvider {
    source: Rc<dyn PageSource>,
    generation: Rc<Cell<u64>>,
    status: UiStatus,
}

impl fmt::Debug for DataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProvider")
            .field("generation", &self.generation.get())
            .finish_non_exhaustive()
    }
}

impl DataProvider {
    pub fn new(source: Rc<dyn PageSource>, status: UiStatus) -> Self {
        Self {
            source,
            generation: Rc::new(Cell::new(0)),
            status,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Starts a new cache generation. Requests already in flight still
    /// complete but carry the old generation.
    pub fn invalidate(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        debug!(generation = next, "page cache invalidated");
        next
    }

    pub async fn provide(
        &self,
        criteria: &QueryCriteria,
        request: PageRequest,
    ) -> PageDelivery {
        self.provide_as(self.generation.get(), criteria, request).await
    }

    /// Returns a future for one page. The generation and criteria are
    /// captured now, not when the future is first polled.
    pub fn fetch(&self, criteria: QueryCriteria, request: PageRequest) -> PageFetch {
        let provider = self.clone();
        let generation = self.generation.get();
        async move { provider.provide_as(generation, &criteria, request).await }.boxed_local()
    }

    async fn provide_as(
        &self,
        generation: u64,
        criteria: &QueryCriteria,
        request: PageRequest,
    ) -> PageDelivery {
        debug!(
            page = request.index(),
            size = request.size(),
            generation,
            "requesting page"
        );
        match self.source.fetch_page(criteria, request).await {
            Ok(page) => Ok(ProvidedPage::from_page(generation, request, page)),
            Err(error) => {
                warn!(page = request.index(), generation, "page fetch failed: {error:#}");
                self.status
                    .notify_error(format!("could not load contacts: {error}"));
                Err(FailedPage {
                    generation,
                    request,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataProvider, FailedPage, PageSource};
    use crate::{Contact, Page, PageRequest, QueryCriteria, UiStatus};
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::rc::Rc;

    struct FixedSource {
        rows: usize,
        reported_size: usize,
    }

    #[async_trait(?Send)]
    impl PageSource for FixedSource {
        async fn fetch_page(&self, _criteria: &QueryCriteria, request: PageRequest) -> Result<Page> {
            let end = (request.offset() + request.size()).min(self.rows);
            let content = (request.offset()..end)
                .map(|_| Contact::placeholder())
                .collect();
            Ok(Page {
                content,
                size: self.reported_size,
            })
        }
    }

    struct BrokenSource;

    #[async_trait(?Send)]
    impl PageSource for BrokenSource {
        async fn fetch_page(&self, _criteria: &QueryCriteria, _request: PageRequest) -> Result<Page> {
            bail!("connection refused")
        }
    }

    fn all() -> QueryCriteria {
        QueryCriteria::Scope {
            company: None,
            status: None,
        }
    }

    #[test]
    fn short_page_reports_exact_total() -> Result<()> {
        let provider = DataProvider::new(
            Rc::new(FixedSource {
                rows: 2,
                reported_size: 20,
            }),
            UiStatus::default(),
        );
        let page = block_on(provider.provide(&all(), PageRequest::new(0, 20)?))
            .expect("page delivered");
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total, 2);
        assert!(page.is_short());
        Ok(())
    }

    #[test]
    fn full_page_reports_upper_bound() -> Result<()> {
        let provider = DataProvider::new(
            Rc::new(FixedSource {
                rows: 100,
                reported_size: 100,
            }),
            UiStatus::default(),
        );
        let first = block_on(provider.provide(&all(), PageRequest::new(0, 20)?))
            .expect("page delivered");
        assert_eq!(first.total, 100);

        let unknown = DataProvider::new(
            Rc::new(FixedSource {
                rows: 100,
                reported_size: 20,
            }),
            UiStatus::default(),
        );
        let second = block_on(unknown.provide(&all(), PageRequest::new(1, 20)?))
            .expect("page delivered");
        assert_eq!(second.total, 60);
        Ok(())
    }

    #[test]
    fn full_last_page_keeps_reported_total() -> Result<()> {
        let provider = DataProvider::new(
            Rc::new(FixedSource {
                rows: 40,
                reported_size: 40,
            }),
            UiStatus::default(),
        );
        let first = block_on(provider.provide(&all(), PageRequest::new(0, 20)?))
            .expect("page delivered");
        assert_eq!(first.total, 40);
        let last = block_on(provider.provide(&all(), PageRequest::new(1, 20)?))
            .expect("page delivered");
        assert!(!last.is_short());
        assert_eq!(last.total, 40);
        Ok(())
    }

    #[test]
    fn empty_page_is_not_an_error() -> Result<()> {
        let status = UiStatus::default();
        let provider = DataProvider::new(
            Rc::new(FixedSource {
                rows: 0,
                reported_size: 0,
            }),
            status.clone(),
        );
        let page = block_on(provider.provide(&all(), PageRequest::new(0, 20)?))
            .expect("empty page delivered");
        assert!(page.content.is_empty());
        assert_eq!(page.total, 0);
        assert!(!status.message().open);
        Ok(())
    }

    #[test]
    fn failure_is_reported_through_status_not_returned() -> Result<()> {
        let status = UiStatus::default();
        let provider = DataProvider::new(Rc::new(BrokenSource), status.clone());

        let request = PageRequest::new(0, 20)?;
        let page = block_on(provider.provide(&all(), request));
        assert_eq!(
            page,
            Err(FailedPage {
                generation: 0,
                request,
            })
        );
        let message = status.message();
        assert!(message.error);
        assert!(message.text.contains("connection refused"));
        Ok(())
    }

    #[test]
    fn fetch_is_tagged_with_generation_at_request_time() -> Result<()> {
        let provider = DataProvider::new(
            Rc::new(FixedSource {
                rows: 5,
                reported_size: 5,
            }),
            UiStatus::default(),
        );
        assert_eq!(provider.generation(), 0);
        let pending = provider.fetch(all(), PageRequest::new(0, 20)?);
        provider.invalidate();

        let page = block_on(pending).expect("page delivered");
        assert_eq!(page.generation, 0);

        let fresh = block_on(provider.provide(&all(), PageRequest::new(0, 20)?))
            .expect("page delivered");
        assert_eq!(fresh.generation, 1);
        Ok(())
    }
}
