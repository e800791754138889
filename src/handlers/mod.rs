// src/handlers/mod.rs

use axum::http::{HeaderMap, header};
use tower_sessions::cookie::Cookie;

pub mod api;
pub mod auth;
pub mod blog;
pub mod follow;
pub mod moderation;
pub mod profile;

/// Value of the request cookie `name`, if sent.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Only same-site absolute paths are accepted as redirect targets.
pub(crate) fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_a_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("id=abc; show_followed=1; theme=dark"),
        );
        assert_eq!(cookie_value(&headers, "show_followed").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn redirect_targets_stay_on_site() {
        assert_eq!(safe_next(Some("/user/john")), "/user/john");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
