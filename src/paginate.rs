//! Lazy enumeration of a whole collection, one page at a time.
//!
//! [`paginate`] turns a [`PageSource`] and a starting query into a stream of
//! items. Only the current page is held in memory. Before each fetch the
//! source's latest rate limit window is consulted and, when it is nearly
//! spent and resets soon, the stream sleeps until the reset. A short page
//! ends the enumeration.
//!
//! Cancellation is cooperative: the token is checked before every fetch and
//! interrupts any wait, but a page already fetched is still yielded in full.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::DeskError;
use crate::models::Page;
use crate::query::ListQuery;
use crate::rate_limit::RateLimitInfo;

/// Delay inserted between two page fetches.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Stream of items produced by [`paginate`].
pub type ItemStream<T> = BoxStream<'static, Result<T, DeskError>>;

/// Something that can fetch one page of a collection.
///
/// Implemented by [`Resource`](crate::client::Resource); tests use in-memory
/// fakes.
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    /// Item type of the collection.
    type Item: Send + 'static;

    /// Query parameters of the collection.
    type Query: ListQuery;

    /// Fetches the page `query` points at.
    async fn fetch_page(&self, query: &Self::Query) -> Result<Page<Self::Item>, DeskError>;

    /// The latest rate limit window this source has seen.
    fn rate_limit(&self) -> RateLimitInfo;
}

/// Progress of an enumeration, reported to the optional observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A page is about to be fetched.
    PageStarted {
        /// Page number.
        page: u32,
    },
    /// All items of a page have been yielded.
    PageFetched {
        /// Page number.
        page: u32,
        /// Items on this page.
        items: usize,
        /// Items yielded since the enumeration started.
        total_so_far: u64,
    },
    /// The collection is exhausted.
    Finished {
        /// Items yielded.
        total: u64,
        /// Pages fetched.
        pages: u32,
    },
}

/// Callback receiving [`Progress`] events.
pub type ProgressObserver = Arc<dyn Fn(Progress) + Send + Sync>;

/// Options of one enumeration.
#[derive(Clone)]
pub struct PaginateOptions {
    /// Cancels the enumeration when triggered.
    pub cancel: CancellationToken,

    /// Optional progress callback. Never affects control flow.
    pub observer: Option<ProgressObserver>,

    /// Pause after each full page, on top of any rate limit wait.
    pub page_delay: Duration,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            cancel: CancellationToken::new(),
            observer: None,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

impl fmt::Debug for PaginateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginateOptions")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observer", &self.observer.is_some())
            .field("page_delay", &self.page_delay)
            .finish()
    }
}

impl PaginateOptions {
    /// Default options: fresh token, no observer, 100ms page delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `cancel` as the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Registers a progress observer.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Replaces the inter-page delay.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }
}

enum Phase<T> {
    Fetching,
    Waiting(Duration),
    Yielding {
        items: VecDeque<T>,
        page_len: usize,
        page_was_full: bool,
    },
    Exhausted,
    Cancelled,
}

struct Enumerator<S: PageSource> {
    source: S,
    query: S::Query,
    options: PaginateOptions,
    phase: Phase<S::Item>,
    /// Set once the rate limit has been consulted for the pending fetch.
    rate_checked: bool,
    pages: u32,
    total: u64,
}

impl<S: PageSource> Enumerator<S> {
    fn new(source: S, query: S::Query, options: PaginateOptions) -> Self {
        Self {
            source,
            query,
            options,
            phase: Phase::Fetching,
            rate_checked: false,
            pages: 0,
            total: 0,
        }
    }

    fn notify(&self, progress: Progress) {
        if let Some(observer) = &self.options.observer {
            observer(progress);
        }
    }

    fn finish(&mut self) {
        tracing::debug!(total = self.total, pages = self.pages, "Enumeration exhausted");
        self.notify(Progress::Finished {
            total: self.total,
            pages: self.pages,
        });
        self.phase = Phase::Exhausted;
    }

    /// Drives the state machine until it can produce an item or terminates.
    async fn advance(&mut self) -> Option<Result<S::Item, DeskError>> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Exhausted) {
                Phase::Fetching => {
                    if self.options.cancel.is_cancelled() {
                        tracing::debug!(page = self.query.page(), "Enumeration cancelled");
                        self.phase = Phase::Cancelled;
                        continue;
                    }

                    if !self.rate_checked {
                        self.rate_checked = true;
                        let wait = self.source.rate_limit().should_wait();
                        if !wait.is_zero() {
                            tracing::debug!(
                                wait_ms = wait.as_millis() as u64,
                                "Rate limit nearly spent, waiting for reset"
                            );
                            self.phase = Phase::Waiting(wait);
                            continue;
                        }
                    }

                    let page = self.query.page();
                    self.notify(Progress::PageStarted { page });
                    tracing::debug!(page, per_page = self.query.per_page(), "Fetching page");

                    let fetched = match self.source.fetch_page(&self.query).await {
                        Ok(fetched) => fetched,
                        Err(e) => {
                            // Terminal: the error is the last item.
                            return Some(Err(e));
                        }
                    };
                    self.pages += 1;
                    self.rate_checked = false;

                    if fetched.is_empty() {
                        self.notify(Progress::PageFetched {
                            page,
                            items: 0,
                            total_so_far: self.total,
                        });
                        self.finish();
                        continue;
                    }

                    let page_was_full = fetched.is_full(self.query.per_page());
                    let items: VecDeque<_> = fetched.items.into();
                    self.phase = Phase::Yielding {
                        page_len: items.len(),
                        items,
                        page_was_full,
                    };
                }
                Phase::Waiting(duration) => {
                    let cancel = self.options.cancel.clone();
                    let cancelled = tokio::select! {
                        () = cancel.cancelled() => true,
                        () = tokio::time::sleep(duration) => false,
                    };
                    self.phase = if cancelled {
                        tracing::debug!("Enumeration cancelled while waiting");
                        Phase::Cancelled
                    } else {
                        Phase::Fetching
                    };
                }
                Phase::Yielding {
                    mut items,
                    page_len,
                    page_was_full,
                } => {
                    if let Some(item) = items.pop_front() {
                        self.total += 1;
                        self.phase = Phase::Yielding {
                            items,
                            page_len,
                            page_was_full,
                        };
                        return Some(Ok(item));
                    }

                    let page = self.query.page();
                    self.notify(Progress::PageFetched {
                        page,
                        items: page_len,
                        total_so_far: self.total,
                    });

                    if !page_was_full {
                        self.finish();
                        continue;
                    }

                    self.query.paging_mut().page = page.saturating_add(1);
                    self.phase = if self.options.page_delay.is_zero() {
                        Phase::Fetching
                    } else {
                        Phase::Waiting(self.options.page_delay)
                    };
                }
                terminal @ (Phase::Exhausted | Phase::Cancelled) => {
                    self.phase = terminal;
                    return None;
                }
            }
        }
    }
}

/// Enumerates the whole collection of `source`, starting at `query`'s page.
///
/// `query` is moved into the stream; only its page number changes as the
/// stream advances. The stream ends after a short or empty page, after the
/// first error, or once cancellation is observed.
pub fn paginate<S>(source: S, query: S::Query, options: PaginateOptions) -> ItemStream<S::Item>
where
    S: PageSource,
{
    let enumerator = Enumerator::new(source, query, options);
    stream::unfold(enumerator, |mut enumerator| async move {
        let item = enumerator.advance().await?;
        Some((item, enumerator))
    })
    .boxed()
}

/// Drains [`paginate`] into a vector, stopping at the first error.
///
/// # Errors
///
/// Returns the first error raised by the source.
pub async fn collect_all<S>(
    source: S,
    query: S::Query,
    options: PaginateOptions,
) -> Result<Vec<S::Item>, DeskError>
where
    S: PageSource,
{
    paginate(source, query, options).try_collect().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::models::ErrorBody;
    use crate::query::TicketQuery;
    use chrono::{TimeDelta, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves pages of the given sizes, numbering items from 0.
    #[derive(Clone)]
    struct FakeSource {
        sizes: Arc<Vec<usize>>,
        calls: Arc<AtomicUsize>,
        requested: Arc<Mutex<Vec<u32>>>,
        fail_on_call: Option<usize>,
        rate_limit: RateLimitInfo,
    }

    impl FakeSource {
        fn new(sizes: &[usize]) -> Self {
            Self {
                sizes: Arc::new(sizes.to_vec()),
                calls: Arc::new(AtomicUsize::new(0)),
                requested: Arc::new(Mutex::new(Vec::new())),
                fail_on_call: None,
                rate_limit: RateLimitInfo::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        type Item = usize;
        type Query = TicketQuery;

        async fn fetch_page(&self, query: &TicketQuery) -> Result<Page<usize>, DeskError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(query.page());

            if self.fail_on_call == Some(call) {
                return Err(DeskError::ServerError {
                    status: 503,
                    message: "unavailable".to_string(),
                    body: ErrorBody::default(),
                });
            }

            let index = query.page() as usize - 1;
            let size = self.sizes.get(index).copied().unwrap_or(0);
            let offset: usize = self.sizes.iter().take(index).sum();
            Ok(Page::new((offset..offset + size).collect(), 0))
        }

        fn rate_limit(&self) -> RateLimitInfo {
            self.rate_limit
        }
    }

    fn fast() -> PaginateOptions {
        PaginateOptions::new().with_page_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_full_pages_then_short_page() {
        let source = FakeSource::new(&[100, 100, 37]);
        let query = TicketQuery::new().with_per_page(100);

        let items = collect_all(source.clone(), query, fast()).await.unwrap();

        assert_eq!(items.len(), 237);
        assert_eq!(items, (0..237).collect::<Vec<_>>());
        assert_eq!(source.calls(), 3);
        assert_eq!(*source.requested.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_short_first_page() {
        let source = FakeSource::new(&[5]);
        let query = TicketQuery::new().with_per_page(100);

        let items = collect_all(source.clone(), query, fast()).await.unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_after_full_page() {
        let source = FakeSource::new(&[10]);
        let query = TicketQuery::new().with_per_page(10);

        let items = collect_all(source.clone(), query, fast()).await.unwrap();

        assert_eq!(items.len(), 10);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_starts_at_requested_page() {
        let source = FakeSource::new(&[2, 2, 1]);
        let query = TicketQuery::new().with_per_page(2).with_page(2);

        let items = collect_all(source.clone(), query, fast()).await.unwrap();

        assert_eq!(items, vec![2, 3, 4]);
        assert_eq!(*source.requested.lock().unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = FakeSource::new(&[100, 100]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let items = collect_all(
            source.clone(),
            TicketQuery::new().with_per_page(100),
            fast().with_cancel(cancel),
        )
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_page_finishes_current_page() {
        let source = FakeSource::new(&[3, 3, 3]);
        let cancel = CancellationToken::new();
        let mut stream = paginate(
            source.clone(),
            TicketQuery::new().with_per_page(3),
            fast().with_cancel(cancel.clone()),
        );

        assert_eq!(stream.next().await.unwrap().unwrap(), 0);
        cancel.cancel();

        let rest: Vec<usize> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(rest, vec![1, 2]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_terminates_stream() {
        let mut source = FakeSource::new(&[2, 2, 2]);
        source.fail_on_call = Some(1);

        let results: Vec<_> = paginate(
            source.clone(),
            TicketQuery::new().with_per_page(2),
            fast(),
        )
        .collect()
        .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorCategory::ServerError);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let options = fast().with_observer(move |progress| sink.lock().unwrap().push(progress));

        collect_all(
            FakeSource::new(&[2, 1]),
            TicketQuery::new().with_per_page(2),
            options,
        )
        .await
        .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                Progress::PageStarted { page: 1 },
                Progress::PageFetched {
                    page: 1,
                    items: 2,
                    total_so_far: 2
                },
                Progress::PageStarted { page: 2 },
                Progress::PageFetched {
                    page: 2,
                    items: 1,
                    total_so_far: 3
                },
                Progress::Finished { total: 3, pages: 2 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_near_reset() {
        let mut source = FakeSource::new(&[1]);
        source.rate_limit = RateLimitInfo {
            limit: 100,
            remaining: 2,
            reset: Utc::now() + TimeDelta::seconds(30),
        };

        let started = tokio::time::Instant::now();
        let items = collect_all(source.clone(), TicketQuery::new(), fast())
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert!(started.elapsed() >= Duration::from_secs(25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_far_reset_is_not_waited_for() {
        let mut source = FakeSource::new(&[1]);
        source.rate_limit = RateLimitInfo {
            limit: 100,
            remaining: 0,
            reset: Utc::now() + TimeDelta::minutes(10),
        };

        let started = tokio::time::Instant::now();
        collect_all(source, TicketQuery::new(), fast()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let mut source = FakeSource::new(&[1]);
        source.rate_limit = RateLimitInfo {
            limit: 100,
            remaining: 0,
            reset: Utc::now() + TimeDelta::seconds(90),
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let items = collect_all(source.clone(), TicketQuery::new(), fast().with_cancel(cancel))
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(source.calls(), 0);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_delay_between_pages() {
        let source = FakeSource::new(&[1, 1, 0]);
        let started = tokio::time::Instant::now();

        collect_all(
            source,
            TicketQuery::new().with_per_page(1),
            PaginateOptions::new(),
        )
        .await
        .unwrap();

        assert!(started.elapsed() >= DEFAULT_PAGE_DELAY * 2);
    }
}
