// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Takeoff Server binary.

use anyhow::Context;
use ifc_takeoff_server::{app, db, AppState, Config};
use std::net::SocketAddr;
use std::time::Duration;

/// How often expired sessions are removed.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,tower_http=debug,ifc_takeoff_server=debug".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        database_url = %config.database_url,
        upload_dir = %config.upload_dir.display(),
        max_file_size_mb = config.max_file_size_mb,
        worker_threads = config.worker_threads,
        "Starting IFC Takeoff Server"
    );

    // Extraction runs on rayon inside spawn_blocking
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config).await?;

    let pool = state.pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match db::sessions::purge_expired(&pool).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge sessions"),
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
