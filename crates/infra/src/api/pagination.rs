//! Pagination orchestrator
//!
//! Turns one [`ApiRequest`] into one or many executor calls:
//!
//! - **Single**: one call, body returned untouched
//! - **Sequential**: pages fetched one after another on the caller's task
//!   until `offset >= Total-Count`, re-reading the total from every page; a
//!   page without the header is returned as the whole result
//! - **Concurrent**: page 0 first, then offsets generated lazily from its
//!   total and claimed by a fixed pool of workers; results land in slots
//!   indexed by page position and are read in offset order after the join
//!
//! With `force` set, failed pages are collected instead of aborting the call.
//! A failed page 0 under `force` yields an empty result naming offset 0.

use std::iter::Enumerate;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use cwpp_domain::{FetchMode, PageRequest, RemainingOffsets, ResponseBody};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use super::errors::ApiError;
use super::executor::RequestExecutor;
use super::request::{ApiRequest, ApiResponse, Fetched, PageFailure, PagedRecords};

type PageSlot = Option<Result<ResponseBody, ApiError>>;

/// Drives paginated fetches on top of a shared [`RequestExecutor`]
#[derive(Debug, Clone)]
pub struct Paginator {
    executor: Arc<RequestExecutor>,
    default_limit: u64,
    default_workers: usize,
}

impl Paginator {
    /// Paginator with fallback page size and worker count.
    pub fn new(executor: Arc<RequestExecutor>, default_limit: u64, default_workers: usize) -> Self {
        Self { executor, default_limit: default_limit.max(1), default_workers: default_workers.max(1) }
    }

    /// Run `request` in its fetch mode.
    ///
    /// # Errors
    /// Returns the first page failure (as `ApiError::Page`) unless
    /// `request.force` is set.
    #[instrument(skip(self, request), fields(endpoint = %request.endpoint_key(), mode = ?request.mode))]
    pub async fn fetch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let limit = request.limit.unwrap_or(self.default_limit).max(1);
        match request.mode {
            FetchMode::Single => {
                let fetched = self.executor.execute(&request, None).await?;
                Ok(ApiResponse::Body(fetched.body))
            }
            FetchMode::Sequential => self.fetch_sequential(&request, limit).await,
            FetchMode::Concurrent { workers } => {
                let workers = if workers == 0 { self.default_workers } else { workers };
                self.fetch_concurrent(request, limit, workers).await
            }
        }
    }

    async fn first_page(&self, request: &ApiRequest, limit: u64) -> Result<Fetched, ApiError> {
        self.executor.execute(request, Some(PageRequest::new(0, limit))).await
    }

    /// Outcome of a failed page 0: an empty best-effort result, or the error.
    fn first_page_failed(request: &ApiRequest, error: ApiError) -> Result<ApiResponse, ApiError> {
        if !request.force {
            return Err(error.at_offset(0));
        }
        warn!(%error, "first page failed, returning empty partial result");
        Ok(ApiResponse::Records(PagedRecords {
            records: Vec::new(),
            total_count: None,
            failed_pages: vec![PageFailure { offset: 0, error }],
        }))
    }

    async fn fetch_sequential(&self, request: &ApiRequest, limit: u64) -> Result<ApiResponse, ApiError> {
        let first = match self.first_page(request, limit).await {
            Ok(first) => first,
            Err(error) => return Self::first_page_failed(request, error),
        };
        let Some(mut total) = first.total_count else {
            return Ok(ApiResponse::Body(first.body));
        };
        if first.body.is_empty() {
            return Ok(ApiResponse::Body(ResponseBody::Empty));
        }

        let mut paged = PagedRecords {
            records: first.body.into_records(),
            total_count: Some(total),
            failed_pages: Vec::new(),
        };
        let mut pages_completed: u64 = 1;
        let mut next = PageRequest::new(0, limit).next_page();

        while let Some(page) = next.filter(|page| page.offset < total) {
            let offset = page.offset;
            match self.executor.execute(request, Some(page)).await {
                Ok(fetched) => {
                    let Some(page_total) = fetched.total_count else {
                        info!(offset, "page carried no Total-Count, returning it as the result");
                        return Ok(ApiResponse::Body(fetched.body));
                    };
                    total = page_total;
                    paged.total_count = Some(total);
                    paged.records.extend(fetched.body.into_records());
                    pages_completed += 1;
                    info!(
                        offset,
                        pages_completed,
                        total_pages = PageRequest::remaining_pages(limit, total) + 1,
                        records_fetched = paged.records.len(),
                        "page fetched"
                    );
                }
                Err(error) if request.force => {
                    warn!(offset, %error, "page failed, returning partial results");
                    paged.failed_pages.push(PageFailure { offset, error });
                    break;
                }
                Err(error) => return Err(error.at_offset(offset)),
            }
            next = page.next_page();
        }

        Ok(ApiResponse::Records(paged))
    }

    async fn fetch_concurrent(
        &self,
        request: ApiRequest,
        limit: u64,
        workers: usize,
    ) -> Result<ApiResponse, ApiError> {
        let first = match self.first_page(&request, limit).await {
            Ok(first) => first,
            Err(error) => return Self::first_page_failed(&request, error),
        };
        let Some(total) = first.total_count else {
            return Ok(ApiResponse::Body(first.body));
        };
        if first.body.is_empty() {
            return Ok(ApiResponse::Body(ResponseBody::Empty));
        }

        let remaining = PageRequest::remaining_pages(limit, total);
        let mut records = first.body.into_records();
        if remaining == 0 {
            return Ok(ApiResponse::Records(PagedRecords {
                records,
                total_count: Some(total),
                failed_pages: Vec::new(),
            }));
        }

        let total_pages = remaining.saturating_add(1);
        let worker_count = workers.max(1).min(usize::try_from(remaining).unwrap_or(usize::MAX));
        info!(total_count = total, total_pages, workers = worker_count, "fetching remaining pages");

        let force = request.force;
        let request = Arc::new(request);
        let queue: Arc<Mutex<Enumerate<RemainingOffsets>>> =
            Arc::new(Mutex::new(PageRequest::remaining_offsets(limit, total).enumerate()));
        let slots: Arc<Mutex<Vec<PageSlot>>> = Arc::new(Mutex::new(Vec::new()));
        let first_failure: Arc<Mutex<Option<ApiError>>> = Arc::new(Mutex::new(None));
        let abort = Arc::new(AtomicBool::new(false));
        let pages_completed = Arc::new(AtomicU64::new(1));
        let records_fetched = Arc::new(AtomicUsize::new(records.len()));

        let handles = (0..worker_count).map(|worker| {
            let executor = Arc::clone(&self.executor);
            let request = Arc::clone(&request);
            let queue = Arc::clone(&queue);
            let slots = Arc::clone(&slots);
            let first_failure = Arc::clone(&first_failure);
            let abort = Arc::clone(&abort);
            let pages_completed = Arc::clone(&pages_completed);
            let records_fetched = Arc::clone(&records_fetched);

            tokio::spawn(async move {
                loop {
                    if abort.load(Ordering::Acquire) {
                        break;
                    }
                    let next = queue.lock().next();
                    let Some((index, offset)) = next else {
                        break;
                    };

                    let outcome = executor
                        .execute(&request, Some(PageRequest::new(offset, limit)))
                        .await
                        .map(|page| page.body);

                    match &outcome {
                        Ok(body) => {
                            let fetched =
                                records_fetched.fetch_add(body.record_count(), Ordering::AcqRel)
                                    + body.record_count();
                            let completed = pages_completed.fetch_add(1, Ordering::AcqRel) + 1;
                            info!(
                                worker,
                                offset,
                                pages_completed = completed,
                                total_pages,
                                records_fetched = fetched,
                                "page fetched"
                            );
                        }
                        Err(error) => {
                            warn!(worker, offset, %error, "page failed");
                            if !force {
                                first_failure.lock().get_or_insert_with(|| error.clone().at_offset(offset));
                                abort.store(true, Ordering::Release);
                            }
                        }
                    }
                    let mut filled = slots.lock();
                    if filled.len() <= index {
                        filled.resize_with(index + 1, || None);
                    }
                    filled[index] = Some(outcome);
                }
            })
        });

        for joined in join_all(handles).await {
            if let Err(err) = joined {
                return Err(ApiError::Worker(err.to_string()));
            }
        }

        if let Some(error) = first_failure.lock().take() {
            return Err(error);
        }

        let mut failed_pages = Vec::new();
        let slots = std::mem::take(&mut *slots.lock());
        for (offset, slot) in PageRequest::remaining_offsets(limit, total).zip(slots) {
            match slot {
                Some(Ok(body)) => records.extend(body.into_records()),
                Some(Err(error)) => failed_pages.push(PageFailure { offset, error }),
                None => {}
            }
        }

        if !failed_pages.is_empty() {
            warn!(failed = failed_pages.len(), total_pages, "returning partial results");
        }
        info!(records = records.len(), total_count = total, "pagination complete");

        Ok(ApiResponse::Records(PagedRecords { records, total_count: Some(total), failed_pages }))
    }
}
