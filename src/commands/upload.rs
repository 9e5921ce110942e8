//! Upload commands: validate a spreadsheet and replace a user's records for one year.

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::ingest::{self, XLSX_EXTENSION};
use crate::model::UploadSummary;
use crate::{utils, Config, Error, Result};
use anyhow::Context;
use std::path::Path;
use tracing::{debug, info};

/// Validates `bytes` as an xlsx workbook and, if it passes, replaces every record for
/// (`user_id`, `year`) with its rows.
///
/// Checks happen in this order and the first failure wins:
/// 1. `file_name` is not empty
/// 2. `file_name` ends with `.xlsx` (any case)
/// 3. the workbook parses, has `Month` and `Amount` columns and every amount is numeric
/// 4. the user exists
///
/// Nothing is written unless all of them pass.
///
/// # Errors
/// - `ErrorType::Request` for 1 to 3
/// - `ErrorType::NotFound` for 4
/// - `ErrorType::Database` if storage fails
pub async fn upload(
    config: Config,
    user_id: i64,
    year: i64,
    file_name: &str,
    bytes: &[u8],
) -> Result<Out<UploadSummary>> {
    if file_name.is_empty() {
        return Err(Error::msg(ErrorType::Request, "No file selected"));
    }
    if !ingest::has_xlsx_extension(file_name) {
        return Err(Error::msg(
            ErrorType::Request,
            format!("Invalid file type. Please upload {XLSX_EXTENSION}"),
        ));
    }

    let rows = ingest::validate(bytes).pub_result(ErrorType::Request)?;
    debug!(
        "'{file_name}' has {} valid rows for user_id={user_id}, year={year}",
        rows.len()
    );

    let inserted = config.db().reconcile(user_id, year, &rows).await?;
    let summary = UploadSummary::new(user_id, year, inserted);
    info!("{}", summary.message);
    Ok(Out::new(summary.message.clone(), summary))
}

/// Reads a local file and passes it to `upload`. The file must not be larger than the configured
/// upload limit, the same rule the HTTP server applies.
pub async fn upload_file(
    config: Config,
    user_id: i64,
    year: i64,
    path: &Path,
) -> Result<Out<UploadSummary>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Unable to read file {}", path.display()))
        .pub_result(ErrorType::Request)?;
    if metadata.len() > config.max_upload_bytes() as u64 {
        return Err(Error::msg(
            ErrorType::TooLarge,
            format!(
                "File is larger than the {} MB upload limit",
                config.max_upload_mb()
            ),
        ));
    }

    let bytes = utils::read_bytes(path).await.pub_result(ErrorType::Request)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    upload(config, user_id, year, &file_name, &bytes).await
}
