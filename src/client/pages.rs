//! Pagination
//!
//! List endpoints return bounded pages with a `links.next` URL. This module
//! turns them into one lazy stream of result objects: each page fetch goes
//! through the rate-limited transport, so pacing applies uniformly across
//! pages, and nothing is fetched until the stream is polled.

use async_stream::try_stream;
use futures::Stream;
use reqwest::Url;
use tracing::debug;

use crate::api::document::Document;
use crate::api::filters::MAX_PAGE_SIZE;
use crate::client::http::{ApiRequest, HttpClient};
use crate::error::{Error, Result};

/// Recover the query of a `links.next` URL as pairs for the follow-up
/// request.
fn next_query(next: &str) -> Result<Vec<(String, String)>> {
    let url = Url::parse(next)
        .map_err(|e| Error::MalformedResponse(format!("invalid next link {:?}: {}", next, e)))?;
    Ok(url.query_pairs().into_owned().collect())
}

/// Stream up to `limit` items, fetching `page_size` at a time.
///
/// Terminates when the server stops providing a next link, returns an empty
/// or short page, or the limit is reached. Items are yielded in server
/// order. The stream is not restartable; re-invoke the endpoint method to
/// start from the first page again.
pub(crate) fn paginate<'a, T, F>(
    http: &'a HttpClient,
    request: ApiRequest,
    page_size: usize,
    limit: usize,
    parse: F,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: Fn(&Document) -> Result<Vec<T>> + 'a,
{
    try_stream! {
        let mut request = request;
        let mut remaining = limit;

        loop {
            let size = page_size.min(remaining).clamp(1, MAX_PAGE_SIZE);
            request.remove_param("page[size]");
            debug!(path = %request.path, size, "requesting page");
            let doc = http.request(request.clone().param("page[size]", size)).await?;

            let items = parse(&doc)?;
            let count = items.len();
            if count == 0 {
                break;
            }
            for item in items.into_iter().take(remaining) {
                remaining -= 1;
                yield item;
            }

            if remaining == 0 || count < size {
                break;
            }
            match &doc.links.next {
                Some(next) => request.set_query(next_query(next)?),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use futures::TryStreamExt;
    use mockito::Matcher;

    fn item_page(range: std::ops::Range<i64>, next: Option<String>) -> String {
        let data: Vec<_> = range
            .map(|n| {
                serde_json::json!({
                    "type": "thing",
                    "id": n.to_string(),
                    "attributes": {}
                })
            })
            .collect();
        let mut body = serde_json::json!({ "data": data });
        if let Some(next) = next {
            body["links"] = serde_json::json!({ "next": next });
        }
        body.to_string()
    }

    fn parse_ids(doc: &Document) -> Result<Vec<i64>> {
        doc.many().iter().map(|r| r.id_i64()).collect()
    }

    #[tokio::test]
    async fn test_25_items_paged_by_10_takes_3_fetches() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let first = server
            .mock("GET", "/things")
            .match_query(Matcher::UrlEncoded("page[size]".into(), "10".into()))
            .with_status(200)
            .with_body(item_page(
                1..11,
                Some(format!("{}/things?page[size]=10&page[key]=2", base)),
            ))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/things")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page[size]".into(), "10".into()),
                Matcher::UrlEncoded("page[key]".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(item_page(
                11..21,
                Some(format!("{}/things?page[size]=10&page[key]=3", base)),
            ))
            .expect(1)
            .create_async()
            .await;
        let third = server
            .mock("GET", "/things")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page[size]".into(), "5".into()),
                Matcher::UrlEncoded("page[key]".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body(item_page(21..26, None))
            .expect(1)
            .create_async()
            .await;

        let options = ClientOptions::new().with_base_url(base);
        let http = HttpClient::new(None, &options).unwrap();

        let items: Vec<i64> = paginate(&http, ApiRequest::get("/things"), 10, 25, parse_ids)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, (1..26).collect::<Vec<i64>>());
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_short_page_terminates_stream() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let mock = server
            .mock("GET", "/things")
            .match_query(Matcher::UrlEncoded("page[size]".into(), "10".into()))
            .with_status(200)
            // Fewer items than requested, even though a next link exists.
            .with_body(item_page(
                1..4,
                Some(format!("{}/things?page[size]=10&page[key]=2", base)),
            ))
            .expect(1)
            .create_async()
            .await;

        let options = ClientOptions::new().with_base_url(base);
        let http = HttpClient::new(None, &options).unwrap();

        let items: Vec<i64> = paginate(&http, ApiRequest::get("/things"), 10, 50, parse_ids)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_limit_truncates_a_full_page() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/things")
            .match_query(Matcher::UrlEncoded("page[size]".into(), "4".into()))
            .with_status(200)
            .with_body(item_page(1..5, None))
            .expect(1)
            .create_async()
            .await;

        let options = ClientOptions::new().with_base_url(base);
        let http = HttpClient::new(None, &options).unwrap();

        // page_size larger than the limit is clamped down to it.
        let items: Vec<i64> = paginate(&http, ApiRequest::get("/things"), 10, 4, parse_ids)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_error_mid_stream_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/things")
            .match_query(Matcher::UrlEncoded("page[size]".into(), "2".into()))
            .with_status(200)
            .with_body(item_page(
                1..3,
                Some(format!("{}/things?page[size]=2&page[key]=2", base)),
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/things")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page[size]".into(), "2".into()),
                Matcher::UrlEncoded("page[key]".into(), "2".into()),
            ]))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let options = ClientOptions::new().with_base_url(base);
        let http = HttpClient::new(None, &options).unwrap();

        use futures::StreamExt;
        let mut collected = Vec::new();
        let mut stream = std::pin::pin!(paginate(
            &http,
            ApiRequest::get("/things"),
            2,
            10,
            parse_ids
        ));
        let err = loop {
            match stream.next().await {
                Some(Ok(item)) => collected.push(item),
                Some(Err(err)) => break err,
                None => panic!("stream ended without surfacing the error"),
            }
        };
        assert_eq!(collected, vec![1, 2]);
        assert!(matches!(err, Error::RemoteService { .. }));
    }
}
