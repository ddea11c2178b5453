// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Takeoff Server - beam and column lists from uploaded IFC models.
//!
//! Signed-in users upload IFC files (whole or in chunks), preview the
//! extracted members, download them as CSV and manage their history.
//!
//! # Endpoints
//!
//! - `GET /` - Upload page
//! - `GET|POST /auth/register`, `GET|POST /auth/login`, `GET /auth/logout`
//! - `POST /upload` - Single-shot upload, or open a chunked upload
//! - `POST /upload/:upload_id/chunk/:chunk_number` - One chunk
//! - `GET /history` - Conversion history (HTML or `?format=json`)
//! - `GET /preview/:id` - Extracted elements (HTML or `?format=json`)
//! - `GET /download_csv/:id` - CSV export
//! - `POST /history/:id/delete` - Delete a history row and its file
//! - `GET /health` - Health check

pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod flash;
pub mod routes;
pub mod services;
pub mod templates;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use config::Config;
use services::FileStore;
use templates::Templates;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub store: Arc<FileStore>,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Open the database, run migrations and prepare the upload directory.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database_url).await?;
        let store = FileStore::new(&config.upload_dir).await;
        let templates = Templates::new()
            .map_err(|e| anyhow::anyhow!("Failed to compile templates: {}", e))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            store: Arc::new(store),
            templates: Arc::new(templates),
        })
    }
}

/// Build the router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    // Room for multipart framing around a maximum-size file
    let body_limit = state.config.max_file_size_mb * 1024 * 1024 + 1024 * 1024;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(routes::pages::index))
        .route("/static/js/main.js", get(routes::pages::main_js))
        .route("/health", get(routes::health::check))
        // Accounts
        .route(
            "/auth/register",
            get(auth::routes::register_page).post(auth::routes::register),
        )
        .route(
            "/auth/login",
            get(auth::routes::login_page).post(auth::routes::login),
        )
        .route("/auth/logout", get(auth::routes::logout))
        // Uploads
        .route("/upload", post(routes::upload::upload))
        .route(
            "/upload/:upload_id/chunk/:chunk_number",
            post(routes::upload::upload_chunk),
        )
        // History
        .route("/history", get(routes::history::list))
        .route("/history/:id/delete", post(routes::history::delete))
        .route("/preview/:id", get(routes::history::preview))
        .route("/download_csv/:id", get(routes::history::download_csv))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
