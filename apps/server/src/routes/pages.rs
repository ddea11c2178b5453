// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Index page and bundled static assets.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::MaybeUser;
use crate::error::ApiError;
use crate::flash::IncomingFlash;
use crate::AppState;

const MAIN_JS: &str = include_str!("../../static/js/main.js");

/// GET /
pub async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: IncomingFlash,
) -> Result<Response, ApiError> {
    state
        .templates
        .page("index", "ホーム", user.as_ref(), &flash, None, json!({}))
}

/// GET /static/js/main.js
pub async fn main_js() -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        MAIN_JS,
    )
        .into_response()
}
