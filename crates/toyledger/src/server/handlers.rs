//! Request handlers for the records API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::grouping::{group_by_month, MonthGroup};
use crate::ingest::UploadForm;
use crate::record::{PhotoData, ToyRecord};
use crate::users::{self, User, USERS};

use super::error::ApiError;
use super::AppState;

/// Body returned after a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Always `true`.
    pub ok: bool,
    /// Number of records created.
    pub count: usize,
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/users`
pub async fn list_users() -> Json<&'static [User]> {
    Json(USERS)
}

/// `GET /api/records/:user_id`
pub async fn list_records(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> std::result::Result<Json<Vec<ToyRecord>>, ApiError> {
    Ok(Json(load_records(&state, user_id).await?))
}

/// `GET /api/records/:user_id/months`
pub async fn list_months(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> std::result::Result<Json<Vec<MonthGroup>>, ApiError> {
    let records = load_records(&state, user_id).await?;
    Ok(Json(group_by_month(records)))
}

/// `POST /api/records/:user_id`
///
/// Multipart form with `month` (or `date`), optional `name`, `amount` and
/// `note`, and one or more files under `photos` or `photos[]`.
pub async fn upload_records(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<UploadResponse>, ApiError> {
    users::require(&user_id)?;
    let form = read_form(multipart?, state.ingestor.max_photos())
        .await
        .map_err(|e| e.with_upload_limit(state.max_upload_bytes))?;

    let ingestor = state.ingestor.clone();
    let store = state.store.clone();
    let inserted = blocking(move || {
        let batch = ingestor.prepare(form)?;
        store.append(&user_id, batch)
    })
    .await?;

    Ok(Json(UploadResponse {
        ok: true,
        count: inserted.len(),
    }))
}

async fn load_records(state: &AppState, user_id: String) -> Result<Vec<ToyRecord>> {
    users::require(&user_id)?;
    let store = state.store.clone();
    blocking(move || store.list(&user_id)).await
}

/// Run blocking store or image work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}

/// Collect the multipart fields into an [`UploadForm`].
///
/// Stops reading as soon as more than `max_photos` files arrive.
async fn read_form(
    mut multipart: Multipart,
    max_photos: usize,
) -> std::result::Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "photos" | "photos[]" => {
                // Plain text parts under a photo field name are not files.
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if form.photos.len() == max_photos {
                    return Err(Error::validation(format!(
                        "too many photos: at most {max_photos} per upload"
                    ))
                    .into());
                }
                form.photos.push(PhotoData {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "month" => form.month = Some(field.text().await?),
            "date" => form.date = Some(field.text().await?),
            "name" => form.name = Some(field.text().await?),
            "amount" => form.amount = Some(field.text().await?),
            "note" => form.note = Some(field.text().await?),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}
