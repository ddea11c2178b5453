// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session authentication and CSRF checks.

pub mod routes;
pub mod validation;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;

use crate::cookies::{self, CookieOptions};
use crate::db::sessions;
use crate::error::ApiError;
use crate::flash::Flash;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_id";
pub const CSRF_HEADER: &str = "x-csrftoken";
pub const CSRF_FIELD: &str = "csrf_token";
/// Cookie holding the CSRF token of the login and register forms
pub const FORM_CSRF_COOKIE: &str = "form_csrf";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGIN_REQUIRED_MESSAGE: &str = "このページにアクセスするにはログインが必要です。";

/// The signed-in user of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub session_id: String,
    pub csrf_token: String,
}

impl CurrentUser {
    /// Check the request's CSRF token against the session.
    ///
    /// The `X-CSRFToken` header wins over a `csrf_token` form field.
    pub fn verify_csrf(&self, headers: &HeaderMap, field: Option<&str>) -> Result<(), ApiError> {
        let supplied = headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .or(field);

        match supplied {
            Some(token) if token == self.csrf_token => Ok(()),
            _ => {
                tracing::warn!(user_id = self.user_id, "CSRF token mismatch");
                Err(ApiError::CsrfMismatch)
            }
        }
    }
}

async fn lookup(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let Some(session_id) = cookies::get(&parts.headers, SESSION_COOKIE) else {
        return Ok(None);
    };
    let session = sessions::find_active(&state.pool, &session_id).await?;
    Ok(session.map(|s| CurrentUser {
        user_id: s.user_id,
        username: s.username,
        session_id: s.session_id,
        csrf_token: s.csrf_token,
    }))
}

/// Why a login-only route refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Page navigation: send the browser to the login form
    LoginRedirect,
    /// API call without a session
    Unauthorized,
    Failed(ApiError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRedirect => {
                Flash::info(LOGIN_REQUIRED_MESSAGE).redirect(LOGIN_PATH)
            }
            AuthRejection::Unauthorized => ApiError::Unauthorized.into_response(),
            AuthRejection::Failed(e) => e.into_response(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match lookup(parts, state).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) if parts.method == Method::GET => {
                tracing::debug!(path = %parts.uri.path(), "Login required, redirecting");
                Err(AuthRejection::LoginRedirect)
            }
            Ok(None) => Err(AuthRejection::Unauthorized),
            Err(e) => Err(AuthRejection::Failed(e)),
        }
    }
}

/// The signed-in user, if there is one.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(lookup(parts, state).await?))
    }
}

/// CSRF token for visitors without a session.
///
/// Kept in a cookie and echoed back in the `csrf_token` form field.
#[derive(Debug, Clone)]
pub struct FormCsrf {
    token: String,
    issued: bool,
}

impl FormCsrf {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookies::get(headers, FORM_CSRF_COOKIE).filter(|t| !t.is_empty()) {
            Some(token) => Self {
                token,
                issued: false,
            },
            None => Self {
                token: sessions::generate_token(),
                issued: true,
            },
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Fails unless the request carried the cookie and a matching field.
    pub fn verify(&self, field: Option<&str>) -> Result<(), ApiError> {
        match field {
            Some(token) if !self.issued && token == self.token => Ok(()),
            _ => {
                tracing::warn!(cookie_present = !self.issued, "Form CSRF token mismatch");
                Err(ApiError::CsrfMismatch)
            }
        }
    }

    /// Set the cookie on `response` if this token is new.
    pub fn attach(&self, response: &mut Response, secure: bool) {
        if !self.issued {
            return;
        }
        let cookie = cookies::build(
            FORM_CSRF_COOKIE,
            &self.token,
            CookieOptions {
                max_age: None,
                http_only: true,
                secure,
            },
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for FormCsrf {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            user_id: 1,
            username: "taro".into(),
            session_id: "s".into(),
            csrf_token: "good".into(),
        }
    }

    #[test]
    fn test_csrf_from_header_or_field() {
        let mut headers = HeaderMap::new();
        assert!(user().verify_csrf(&headers, Some("good")).is_ok());
        assert!(user().verify_csrf(&headers, Some("bad")).is_err());
        assert!(user().verify_csrf(&headers, None).is_err());

        headers.insert(CSRF_HEADER, HeaderValue::from_static("good"));
        assert!(user().verify_csrf(&headers, None).is_ok());

        headers.insert(CSRF_HEADER, HeaderValue::from_static("bad"));
        assert!(matches!(
            user().verify_csrf(&headers, Some("good")),
            Err(ApiError::CsrfMismatch)
        ));
    }

    #[test]
    fn test_form_csrf_needs_cookie_and_field() {
        let fresh = FormCsrf::from_headers(&HeaderMap::new());
        let token = fresh.token().to_string();
        assert!(fresh.verify(Some(&token)).is_err());

        let mut response = Response::new(axum::body::Body::empty());
        fresh.attach(&mut response, false);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with(&format!("form_csrf={};", token)));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("form_csrf={}", token)).unwrap(),
        );
        let returning = FormCsrf::from_headers(&headers);
        assert_eq!(returning.token(), token);
        assert!(returning.verify(Some(&token)).is_ok());
        assert!(returning.verify(Some("other")).is_err());
        assert!(returning.verify(None).is_err());

        let mut response = Response::new(axum::body::Body::empty());
        returning.attach(&mut response, false);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
