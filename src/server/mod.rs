//! The HTTP interface.
//!
//! - `POST /api/finances/upload/:user_id/:year` replaces a user's records for a year with the rows
//!   of an uploaded `.xlsx` file (multipart field `file`)
//! - `GET /api/finances/:user_id/:year` returns the stored records in calendar order
//! - `GET /sample.xlsx` downloads an example spreadsheet
//! - `GET /health` reports that the server is up

mod handlers;

use crate::error::{ErrorType, Res};
use crate::Config;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tracing::{error, info};

/// The spreadsheet served by `GET /sample.xlsx`.
pub(crate) const SAMPLE_XLSX: &[u8] = include_bytes!("../../static/sample_finances.xlsx");

/// The download name of `SAMPLE_XLSX`.
pub(crate) const SAMPLE_FILE_NAME: &str = "sample_finances.xlsx";

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    config: Config,
}

/// Builds the router. Upload bodies larger than the configured limit are rejected with 413.
pub(crate) fn router(config: Config) -> Router {
    let limit = config.max_upload_bytes();
    Router::new()
        .route(
            "/api/finances/upload/:user_id/:year",
            post(handlers::upload).layer(DefaultBodyLimit::max(limit)),
        )
        .route("/api/finances/:user_id/:year", get(handlers::records))
        .route("/sample.xlsx", get(handlers::sample))
        .route("/health", get(handlers::health))
        .with_state(AppState { config })
}

/// Serves until Ctrl-C, then closes the connection pool.
pub(crate) async fn run(config: Config, bind: SocketAddr) -> Res<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Unable to listen on {bind}"))?;
    let local_addr = listener.local_addr().context("Unable to read listen address")?;
    info!(
        "Listening on http://{local_addr} (uploads up to {} MB)",
        config.max_upload_mb()
    );

    axum::serve(listener, router(config.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("The HTTP server failed")?;

    config.db().close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// The HTTP status for each kind of error.
pub(crate) fn status_code(error_type: ErrorType) -> StatusCode {
    match error_type {
        ErrorType::Request => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorType::Database | ErrorType::Config | ErrorType::Service => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
