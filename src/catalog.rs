use crate::config;
use crate::error::{Error, Result};
use crate::models::{BookSummary, UNKNOWN_AUTHOR};
use actix_web::web::Buf;
use awc::Client;
use serde_json::Value;

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Fixed result count per search; there is no pagination.
pub const PAGE_SIZE: u32 = 12;

/// Cover shown when the source has none.
pub const PLACEHOLDER_COVER: &str = "https://via.placeholder.com/140x210?text=No+Cover";

/// Anything that can answer a catalog query. The shelf aggregator is
/// written against this seam so it can be driven by a stub in tests.
#[async_trait::async_trait(?Send)]
pub trait CatalogSource {
    async fn search(&self, query: &str) -> Result<Vec<BookSummary>>;
}

/// Client for the Google Books volumes endpoint.
#[derive(Clone)]
pub struct CatalogClient {
    appkey: String,
}

impl CatalogClient {
    /// An empty key is rejected here, before any network call.
    pub fn new(appkey: &str) -> Result<Self> {
        if appkey.trim().is_empty() {
            return Err(Error::Config(config::GOOGLE_APPKEY.to_string()));
        }
        Ok(Self {
            appkey: appkey.to_string(),
        })
    }

    pub async fn search(&self, query: &str) -> Result<Vec<BookSummary>> {
        let max_results = PAGE_SIZE.to_string();

        let mut response = Client::default()
            .get(VOLUMES_URL)
            .query(&[
                ("q", query),
                ("printType", "books"),
                ("maxResults", max_results.as_str()),
                ("orderBy", "relevance"),
                ("key", self.appkey.as_str()),
            ])
            .map_err(|err| Error::Catalog(err.to_string()))?
            .send()
            .await
            .map_err(|err| Error::Catalog(err.to_string()))?;

        let status = response.status();
        let body = response
            .body()
            .await
            .map_err(|err| Error::Catalog(err.to_string()))?;

        if !status.is_success() {
            return Err(Error::Catalog(error_message(&body, status.as_u16())));
        }

        let root: Value =
            serde_json::from_reader(body.reader()).map_err(|err| Error::Catalog(err.to_string()))?;

        Ok(parse_summaries(&root))
    }
}

#[async_trait::async_trait(?Send)]
impl CatalogSource for CatalogClient {
    async fn search(&self, query: &str) -> Result<Vec<BookSummary>> {
        CatalogClient::search(self, query).await
    }
}

// The endpoint reports failures as `{"error": {"message": ...}}`.
fn error_message(body: &[u8], status: u16) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|root| {
            root.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("catalog request failed with status {status}"))
}

/// A response without `items` is an empty result, not an error.
pub(crate) fn parse_summaries(root: &Value) -> Vec<BookSummary> {
    root.get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_summary).collect())
        .unwrap_or_default()
}

fn parse_summary(node: &Value) -> Option<BookSummary> {
    let external_id = node.get("id")?.as_str()?.to_string();

    let null = Value::Null;
    let info = node.get("volumeInfo").unwrap_or(&null);
    let access = node.get("accessInfo").unwrap_or(&null);

    let title = info
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string();

    let author = info
        .get("authors")
        .and_then(Value::as_array)
        .and_then(|authors| authors.first())
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string();

    let cover_url = normalize_cover(
        info.pointer("/imageLinks/thumbnail")
            .or_else(|| info.pointer("/imageLinks/smallThumbnail"))
            .and_then(Value::as_str),
    );

    let page_count = info
        .get("pageCount")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    // Non-numeric ratings stay None; they are never coerced to 0.
    let rating = info.get("averageRating").and_then(Value::as_f64);

    let ratings_count = info
        .get("ratingsCount")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    let preview_url = access
        .get("webReaderLink")
        .and_then(Value::as_str)
        .or_else(|| info.get("previewLink").and_then(Value::as_str))
        .map(str::to_string);

    Some(BookSummary {
        external_id,
        title,
        author,
        cover_url,
        page_count,
        rating,
        ratings_count,
        preview_url,
    })
}

pub(crate) fn normalize_cover(url: Option<&str>) -> String {
    match url {
        Some(url) => match url.strip_prefix("http://") {
            Some(rest) => format!("https://{rest}"),
            None => url.to_string(),
        },
        None => PLACEHOLDER_COVER.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::env;

    #[test]
    fn missing_cover_uses_placeholder() {
        let root = json!({
            "items": [{ "id": "v1", "volumeInfo": { "title": "Dune" } }]
        });
        let items = parse_summaries(&root);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].cover_url, PLACEHOLDER_COVER);
    }

    #[test]
    fn insecure_cover_is_rewritten() {
        let root = json!({
            "items": [{
                "id": "v1",
                "volumeInfo": {
                    "title": "Dune",
                    "imageLinks": { "thumbnail": "http://example.com/c.jpg" }
                }
            }]
        });
        let items = parse_summaries(&root);
        assert_eq!(items[0].cover_url, "https://example.com/c.jpg");
    }

    #[test]
    fn missing_authors_uses_sentinel() {
        let root = json!({
            "items": [{ "id": "v1", "volumeInfo": { "title": "Dune" } }]
        });
        assert_eq!(parse_summaries(&root)[0].author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn first_author_wins() {
        let root = json!({
            "items": [{
                "id": "v1",
                "volumeInfo": { "title": "Good Omens", "authors": ["Terry Pratchett", "Neil Gaiman"] }
            }]
        });
        assert_eq!(parse_summaries(&root)[0].author, "Terry Pratchett");
    }

    #[test]
    fn non_numeric_rating_stays_none() {
        let root = json!({
            "items": [
                { "id": "a", "volumeInfo": { "title": "A", "averageRating": "4.2" } },
                { "id": "b", "volumeInfo": { "title": "B" } },
                { "id": "c", "volumeInfo": { "title": "C", "averageRating": 4.5 } }
            ]
        });
        let items = parse_summaries(&root);
        assert_eq!(items[0].rating, None);
        assert_eq!(items[1].rating, None);
        assert_eq!(items[2].rating, Some(4.5));
    }

    #[test]
    fn web_reader_link_preferred_over_preview() {
        let root = json!({
            "items": [{
                "id": "v1",
                "volumeInfo": { "title": "A", "previewLink": "https://p" },
                "accessInfo": { "webReaderLink": "https://r" }
            }]
        });
        assert_eq!(parse_summaries(&root)[0].preview_url.as_deref(), Some("https://r"));
    }

    #[test]
    fn items_without_id_are_skipped() {
        let root = json!({
            "items": [
                { "volumeInfo": { "title": "No id" } },
                { "id": "v2", "volumeInfo": { "title": "Kept" } }
            ]
        });
        let items = parse_summaries(&root);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].external_id, "v2");
    }

    #[test]
    fn empty_response_is_empty_result() {
        assert!(parse_summaries(&json!({ "totalItems": 0 })).is_empty());
    }

    #[test]
    fn error_body_message_is_extracted() {
        let body = br#"{"error":{"code":403,"message":"quota exceeded"}}"#;
        assert_eq!(error_message(body, 403), "quota exceeded");
        assert_eq!(
            error_message(b"not json", 500),
            "catalog request failed with status 500"
        );
    }

    #[test]
    fn empty_key_is_a_config_error() {
        match CatalogClient::new("  ") {
            Err(Error::Config(name)) => assert_eq!(name, config::GOOGLE_APPKEY),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[actix_web::test]
    #[ignore = "requires GOOGLE_APPKEY and network access"]
    async fn live_search() {
        let appkey = env::var("GOOGLE_APPKEY").unwrap();
        let client = CatalogClient::new(&appkey).unwrap();

        let items = client.search("subject:fiction").await.unwrap();
        assert!(!items.is_empty());
        assert!(items.len() <= PAGE_SIZE as usize);
    }
}
