//! Shared types and streaming infrastructure for the YouTube API client.

use serde::Deserialize;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::Stream;

type OneFuturePage<'a, F, T> =
    Pin<Box<dyn Future<Output = eyre::Result<(F, (VecDeque<T>, Option<String>))>> + 'a + Send>>;

/// A paginated stream over a YouTube API `*.list` endpoint.
///
/// Items are yielded one at a time. The next page is only requested once every item of the
/// current page has been consumed, so a consumer that stops early never pays for the pages it
/// didn't look at.
pub struct PagedStream<'a, T, F> {
    /// Items of the most recently fetched page not yet yielded.
    buffered: VecDeque<T>,
    /// The in-flight (or not yet polled) page request; `None` once the listing is exhausted.
    next_page: Option<OneFuturePage<'a, F, T>>,
}

impl<'a, T, F> PagedStream<'a, T, F> {
    /// Creates a stream whose pages come from `fetcher`.
    ///
    /// `fetcher` receives `None` for the first page and the previous response's
    /// `nextPageToken` for every following one.
    pub fn new<Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<(VecDeque<T>, Option<String>)>> + Send + 'a,
    {
        Self {
            buffered: VecDeque::new(),
            next_page: Some(Self::fetch(fetcher, None)),
        }
    }

    fn fetch<Fut>(fetcher: F, page_token: Option<String>) -> OneFuturePage<'a, F, T>
    where
        F: Fn(Option<String>) -> Fut,
        F: Send + 'a,
        Fut: Future<Output = eyre::Result<(VecDeque<T>, Option<String>)>> + Send + 'a,
    {
        Box::pin(async move {
            let page = fetcher(page_token).await?;
            Ok((fetcher, page))
        })
    }
}

impl<'a, T: Unpin, F> Unpin for PagedStream<'a, T, F> {}

impl<'a, T: Unpin, F, Fut> Stream for PagedStream<'a, T, F>
where
    F: Fn(Option<String>) -> Fut,
    F: Send + 'a,
    Fut: Future<Output = eyre::Result<(VecDeque<T>, Option<String>)>> + Send + 'a,
{
    type Item = eyre::Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }

            let Some(pending) = self.next_page.as_mut() else {
                return Poll::Ready(None);
            };

            match pending.as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    // a failed page ends the listing
                    self.next_page = None;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Ok((fetcher, (items, next_token)))) => {
                    self.buffered.extend(items);
                    self.next_page = next_token.map(|token| Self::fetch(fetcher, Some(token)));
                }
            }
        }
    }
}

/// One page of a YouTube API `*.list` response.
///
/// Only the fields needed for pagination and the items themselves are kept.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    /// The resources on this page. Missing when the listing is empty.
    #[serde(default = "VecDeque::new")]
    pub items: VecDeque<T>,
    #[serde(rename = "pageInfo")]
    pub page_info: Option<PageInfo>,
    /// Token that can be used as the value of the pageToken parameter to retrieve the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn into_page(self) -> (VecDeque<T>, Option<String>) {
        (self.items, self.next_page_token)
    }
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct PageInfo {
    /// The total number of results in the result set.
    #[serde(rename = "totalResults")]
    pub total_results: u32,
    /// The number of results included in the API response.
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}
