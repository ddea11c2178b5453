// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal `Cookie` / `Set-Cookie` handling.

use axum::http::{header, HeaderMap};

/// Value of a request cookie
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

/// Attributes of a `Set-Cookie` header
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieOptions {
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

/// `Set-Cookie` value, path `/`, `SameSite=Lax`
pub fn build(name: &str, value: &str, options: CookieOptions) -> String {
    let mut cookie = format!("{}={}; Path=/; SameSite=Lax", name, value);
    if let Some(max_age) = options.max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes a cookie
pub fn expire(name: &str) -> String {
    build(
        name,
        "",
        CookieOptions {
            max_age: Some(0),
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("flash=success:6f6b; session_id=abc-123"),
        );
        assert_eq!(get(&headers, "session_id").as_deref(), Some("abc-123"));
        assert_eq!(get(&headers, "flash").as_deref(), Some("success:6f6b"));
        assert_eq!(get(&headers, "missing"), None);
    }

    #[test]
    fn test_build_cookie() {
        let cookie = build(
            "session_id",
            "abc",
            CookieOptions {
                max_age: Some(1800),
                http_only: true,
                secure: true,
            },
        );
        assert_eq!(
            cookie,
            "session_id=abc; Path=/; SameSite=Lax; Max-Age=1800; HttpOnly; Secure"
        );
        assert_eq!(expire("flash"), "flash=; Path=/; SameSite=Lax; Max-Age=0");
    }
}
