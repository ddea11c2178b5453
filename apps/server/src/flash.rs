// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One-shot flash messages carried in a cookie.
//!
//! The cookie value is `<category>:<hex of UTF-8 text>` so Japanese text
//! survives without quoting rules.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::convert::Infallible;

use crate::cookies;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

impl Flash {
    pub fn new(category: &str, message: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("success", message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new("info", message)
    }

    fn encode(&self) -> String {
        format!("{}:{}", self.category, hex::encode(self.message.as_bytes()))
    }

    fn decode(value: &str) -> Option<Self> {
        let (category, encoded) = value.split_once(':')?;
        if category.is_empty() || !category.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let bytes = hex::decode(encoded).ok()?;
        Some(Self::new(category, String::from_utf8(bytes).ok()?))
    }

    pub fn set_cookie(&self) -> String {
        cookies::build(FLASH_COOKIE, &self.encode(), cookies::CookieOptions::default())
    }

    /// Redirect that carries this message to the next page
    pub fn redirect(self, to: &str) -> Response {
        let mut response = Redirect::to(to).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.set_cookie()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        response
    }
}

/// Flash message sent with this request, if any
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash(pub Option<Flash>);

impl IncomingFlash {
    /// Append the header that consumes the message, when there was one
    pub fn consume(&self, response: &mut Response) {
        if self.0.is_some() {
            if let Ok(value) = HeaderValue::from_str(&cookies::expire(FLASH_COOKIE)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for IncomingFlash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(
            cookies::get(&parts.headers, FLASH_COOKIE).and_then(|v| Flash::decode(&v)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let flash = Flash::error("パスワードが正しくありません");
        let encoded = flash.encode();
        assert!(encoded.starts_with("error:"));
        assert!(encoded.is_ascii());
        assert_eq!(Flash::decode(&encoded), Some(flash));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(Flash::decode("nocolon"), None);
        assert_eq!(Flash::decode("error:zz"), None);
        assert_eq!(Flash::decode("<b>:6f6b"), None);
    }

    #[test]
    fn test_redirect_sets_cookie() {
        let response = Flash::success("ok").redirect("/auth/login");
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert_eq!(cookie, "flash=success:6f6b; Path=/; SameSite=Lax");
    }
}
