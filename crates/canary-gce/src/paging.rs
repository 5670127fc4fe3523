//! Page-token walking for Compute Engine list calls.

use std::future::Future;
use std::ops::ControlFlow;

use canary_core::FleetResult;
use reqwest::RequestBuilder;

/// A list response that may point at a following page.
pub trait Paged {
    fn next_page_token(&self) -> Option<&str>;
}

/// Attach `pageToken` when continuing a listing.
pub fn with_page_token(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => req.query(&[("pageToken", token)]),
        None => req,
    }
}

/// Fetch pages until `visit` breaks or a page carries no `nextPageToken`.
///
/// `fetch` gets `None` for the first page and the previous page's token
/// afterwards. An empty token ends the walk like a missing one. Returns the
/// value `visit` broke with, or `None` when every page was visited.
pub async fn walk_pages<P, T, F, Fut, V>(mut fetch: F, mut visit: V) -> FleetResult<Option<T>>
where
    P: Paged,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = FleetResult<P>>,
    V: FnMut(P) -> ControlFlow<T>,
{
    let mut token = None;
    loop {
        let page = fetch(token.take()).await?;
        let next = page
            .next_page_token()
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if let ControlFlow::Break(found) = visit(page) {
            return Ok(Some(found));
        }

        match next {
            Some(next) => token = Some(next),
            None => return Ok(None),
        }
    }
}
