// src/handlers/api/mod.rs

//! JSON API under `/api/v1`.
//!
//! Callers authenticate with HTTP Basic credentials, either email and
//! password or a token with an empty password. See [`authentication`].

use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{config::Config, utils::pagination::Page};

pub mod authentication;
pub mod comments;
pub mod posts;
pub mod users;

/// Paginated listing: `{<key>: [...], prev, next, count}`.
///
/// `prev` and `next` are absolute URLs of the neighbouring pages, or null.
pub(crate) fn list_json<T, J: Serialize>(
    key: &str,
    page: &Page<T>,
    path: &str,
    config: &Config,
    to_json: impl Fn(&T) -> J,
) -> Json<Value> {
    let link = |n: Option<i64>| n.map(|n| config.external_url(&format!("{path}?page={n}")));
    let items: Vec<J> = page.items.iter().map(to_json).collect();

    let mut body = json!({
        "prev": link(page.prev_num()),
        "next": link(page.next_num()),
        "count": page.total,
    });
    body[key] = json!(items);
    Json(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pagination::{PageRequest, paginate_slice};

    #[test]
    fn listing_links_are_absolute() {
        let config = Config::for_testing();
        let items: Vec<i64> = (1..=31).collect();
        let page = paginate_slice(&items, PageRequest::Number(2), 15);

        let Json(body) = list_json("posts", &page, "/api/v1/posts/", &config, |n| *n);

        assert_eq!(body["posts"].as_array().map(Vec::len), Some(15));
        assert_eq!(body["prev"], "http://localhost/api/v1/posts/?page=1");
        assert_eq!(body["next"], "http://localhost/api/v1/posts/?page=3");
        assert_eq!(body["count"], 31);
    }

    #[test]
    fn edges_have_null_links() {
        let config = Config::for_testing();
        let items: Vec<i64> = (1..=3).collect();
        let page = paginate_slice(&items, PageRequest::Number(1), 15);

        let Json(body) = list_json("comments", &page, "/api/v1/comments/", &config, |n| *n);

        assert!(body["prev"].is_null());
        assert!(body["next"].is_null());
    }
}
