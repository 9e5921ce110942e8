use super::{status_code, AppState, SAMPLE_FILE_NAME, SAMPLE_XLSX, XLSX_CONTENT_TYPE};
use crate::error::ErrorType;
use crate::model::{RecordView, UploadSummary};
use crate::{commands, Error};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// The multipart field that carries the spreadsheet.
const FILE_FIELD: &str = "file";

/// Renders an `Error` as `{"error": "..."}` with the matching status code.
#[derive(Debug)]
pub(super) struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_code(self.0.error_type());
        let message = self.0.to_string();
        if status.is_server_error() {
            error!("{status}: {:?}", self.0);
        } else {
            warn!("{status}: {message}");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn no_file_part() -> ApiError {
    Error::msg(ErrorType::Request, "No file part in request").into()
}

fn too_large(limit: usize) -> ApiError {
    Error::msg(
        ErrorType::TooLarge,
        format!("File is larger than the {limit} byte upload limit"),
    )
    .into()
}

fn path_error(rejection: PathRejection) -> ApiError {
    Error::msg(ErrorType::Request, rejection.body_text()).into()
}

fn multipart_error(e: MultipartError, limit: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        Error::msg(ErrorType::Request, e.body_text()).into()
    }
}

pub(super) async fn upload(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadSummary>, ApiError> {
    let Path((user_id, year)) = path.map_err(path_error)?;
    let limit = state.config.max_upload_bytes();

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if content_length.is_some_and(|len| len > limit) {
        return Err(too_large(limit));
    }

    let mut multipart = multipart.map_err(|_| no_file_part())?;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A part without a filename is a form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        file = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = file else {
        return Err(no_file_part());
    };
    let out = commands::upload(state.config.clone(), user_id, year, &file_name, &bytes).await?;
    let summary = out
        .into_structure()
        .unwrap_or_else(|| UploadSummary::new(user_id, year, 0));
    Ok(Json(summary))
}

pub(super) async fn records(
    State(state): State<AppState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<Vec<RecordView>>, ApiError> {
    let Path((user_id, year)) = path.map_err(path_error)?;
    let out = commands::show(state.config.clone(), user_id, year).await?;
    Ok(Json(out.into_structure().unwrap_or_default()))
}

pub(super) async fn sample() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SAMPLE_FILE_NAME}\""),
            ),
        ],
        SAMPLE_XLSX,
    )
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
