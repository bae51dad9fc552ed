//! Pagination cursors, carried in a `Link` response header.
//!
//! The header holds comma-separated entries of the form
//! `<url>; rel="previous"` / `<url>; rel="next"`, where each URL's query
//! string carries integer `since` / `until` / `limit` values. A missing
//! header means "no adjacent pages" and is not an error; a malformed one
//! is a decode error, since silently swallowing it would make a caller
//! terminate early and under-report data.

use http::header::{HeaderMap, LINK};
use url::Url;

use crate::error::{Error, Result};

/// Bounds for fetching one adjacent page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Return entries after this cursor.
    pub since: Option<u64>,
    /// Return entries before this cursor.
    pub until: Option<u64>,
    /// Maximum number of entries.
    pub limit: Option<u64>,
}

impl Page {
    /// Render this page as query pairs for a list request.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(since) = self.since {
            query.push(("since".to_string(), since.to_string()));
        }
        if let Some(until) = self.until {
            query.push(("until".to_string(), until.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }

    fn query_string(&self) -> String {
        self.to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Cursors for the pages adjacent to a list response. `None` in a
/// direction means there is no page there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// The previous page, if any.
    pub previous: Option<Page>,
    /// The next page, if any.
    pub next: Option<Page>,
}

impl Pagination {
    /// Decode pagination cursors from response headers.
    ///
    /// The cursors may arrive comma-joined in one `Link` value or as
    /// separate header values; HTTP treats the two as equivalent, so
    /// both shapes decode the same way.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let mut pagination = Pagination::default();

        for raw in headers.get_all(LINK) {
            let raw = raw
                .to_str()
                .map_err(|_| Error::Decode("Link header is not valid UTF-8".to_string()))?;

            for entry in raw.split(',') {
                let entry = entry.trim();
                if entry.is_empty() {
                    continue;
                }

                let mut parts = entry.split(';');

                let target = parts
                    .next()
                    .map(str::trim)
                    .and_then(|t| t.strip_prefix('<'))
                    .and_then(|t| t.strip_suffix('>'))
                    .ok_or_else(|| {
                        Error::Decode(format!("malformed Link header entry: {entry}"))
                    })?;

                let rel = parts.find_map(|p| {
                    p.trim()
                        .strip_prefix("rel=\"")
                        .and_then(|r| r.strip_suffix('"'))
                });

                let url = Url::parse(target)
                    .map_err(|e| Error::Decode(format!("malformed Link header url: {e}")))?;
                let page = page_from_url(&url)?;

                match rel {
                    Some("previous") => pagination.previous = Some(page),
                    Some("next") => pagination.next = Some(page),
                    // Unknown relations are ignored, not an error.
                    _ => {}
                }
            }
        }

        Ok(pagination)
    }

    /// Encode these cursors as a `Link` header value pointing at the
    /// given list endpoint. Returns `None` when there is nothing to link.
    pub fn to_link_header(&self, endpoint: &Url) -> Option<String> {
        let mut entries = Vec::new();

        if let Some(previous) = &self.previous {
            entries.push(link_entry(endpoint, previous, "previous"));
        }
        if let Some(next) = &self.next {
            entries.push(link_entry(endpoint, next, "next"));
        }

        if entries.is_empty() {
            None
        } else {
            Some(entries.join(", "))
        }
    }
}

fn link_entry(endpoint: &Url, page: &Page, rel: &str) -> String {
    let mut url = endpoint.clone();
    let query = page.query_string();
    url.set_query(if query.is_empty() { None } else { Some(&query) });
    format!("<{url}>; rel=\"{rel}\"")
}

fn page_from_url(url: &Url) -> Result<Page> {
    let mut page = Page::default();

    for (key, value) in url.query_pairs() {
        let parsed = || {
            value.parse::<u64>().map_err(|_| {
                Error::Decode(format!("non-integer {key} in Link header: {value}"))
            })
        };

        match key.as_ref() {
            "since" => page.since = Some(parsed()?),
            "until" => page.until = Some(parsed()?),
            "limit" => page.limit = Some(parsed()?),
            _ => {}
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    fn endpoint() -> Url {
        Url::parse("https://ci.example.com/api/v1/builds").unwrap()
    }

    #[test]
    fn round_trips_previous_and_next() {
        let pagination = Pagination {
            previous: Some(Page { since: Some(452), until: None, limit: Some(123) }),
            next: Some(Page { since: None, until: Some(254), limit: Some(456) }),
        };

        let value = pagination.to_link_header(&endpoint()).unwrap();
        assert_eq!(
            value,
            "<https://ci.example.com/api/v1/builds?since=452&limit=123>; rel=\"previous\", \
             <https://ci.example.com/api/v1/builds?until=254&limit=456>; rel=\"next\""
        );

        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(&value).unwrap());

        assert_eq!(Pagination::from_headers(&headers).unwrap(), pagination);
    }

    #[test]
    fn decodes_cursors_split_across_separate_header_values() {
        let mut headers = HeaderMap::new();
        headers.append(
            LINK,
            HeaderValue::from_static(
                "<https://ci.example.com/api/v1/builds?since=452&limit=123>; rel=\"previous\"",
            ),
        );
        headers.append(
            LINK,
            HeaderValue::from_static(
                "<https://ci.example.com/api/v1/builds?until=254&limit=456>; rel=\"next\"",
            ),
        );

        let pagination = Pagination::from_headers(&headers).unwrap();
        assert_eq!(
            pagination.previous,
            Some(Page { since: Some(452), until: None, limit: Some(123) })
        );
        assert_eq!(
            pagination.next,
            Some(Page { since: None, until: Some(254), limit: Some(456) })
        );
    }

    #[test]
    fn missing_header_means_no_adjacent_pages() {
        let pagination = Pagination::from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(pagination.previous, None);
        assert_eq!(pagination.next, None);
    }

    #[test]
    fn malformed_url_is_a_decode_error() {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_static("<::nope>; rel=\"next\""));

        assert!(matches!(
            Pagination::from_headers(&headers),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn non_integer_cursor_is_a_decode_error() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://ci.example.com/api/v1/builds?since=banana>; rel=\"next\"",
            ),
        );

        assert!(matches!(
            Pagination::from_headers(&headers),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn entry_without_angle_brackets_is_a_decode_error() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("https://ci.example.com; rel=\"next\""),
        );

        assert!(matches!(
            Pagination::from_headers(&headers),
            Err(Error::Decode(_))
        ));
    }
}
