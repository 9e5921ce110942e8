use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::net::SocketAddr;
use std::path::Path;

/// Creates the data directory with:
/// - an initial `config.json` holding `max_upload_mb` and `bind`
/// - a SQLite database with the current schema
///
/// # Arguments
/// - `finances_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/finances`
/// - `max_upload_mb` - The largest upload the server will accept
/// - `bind` - The address `finances serve` listens on unless told otherwise
///
/// # Errors
/// - Returns an error if the directory is already initialized or any file operation fails.
pub async fn init(finances_home: &Path, max_upload_mb: f64, bind: SocketAddr) -> Result<Out<()>> {
    let config = Config::create(finances_home, max_upload_mb, bind)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the finances directory and config at {}",
        config.root().display()
    )
    .into())
}
