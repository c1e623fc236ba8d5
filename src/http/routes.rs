//! HTTP route definitions

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::app::AppState;
use crate::http::pages::{render_page, render_placeholder_svg, PageView};
use crate::inventory::{ItemForm, Phase, SubmitError, ValidationErrors};
use crate::store::LostItem;
use crate::upload::UploadError;
use crate::util::time::{now_iso, uptime_secs};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let pages = Router::new()
        .route("/", get(index_handler))
        .route("/items", post(submit_form_handler))
        .route("/placeholder.svg", get(placeholder_handler));

    let api = Router::new()
        .route("/api/items", get(list_items_handler).post(create_item_handler))
        .route("/api/upload-image", post(upload_image_handler))
        .route("/api/ping", get(ping_handler))
        .route("/health", get(ping_handler));

    Router::new()
        .merge(pages)
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Liveness
// ============================================================================

#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
    message: &'static str,
    time: String,
    uptime_secs: u64,
}

async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        message: "Lost and found board is alive!",
        time: now_iso(),
        uptime_secs: uptime_secs(),
    })
}

// ============================================================================
// HTML pages
// ============================================================================

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    state.inventory.fetch_all().await;
    let snapshot = state.inventory.snapshot();

    Html(render_page(&PageView {
        snapshot: &snapshot,
        form: &ItemForm::default(),
        dialog_open: false,
        notice: None,
    }))
}

async fn submit_form_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let mut form = ItemForm::default();
    let mut previous_image = None;
    let mut file_attached = false;
    let mut image_failure = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A broken file part can leave the rest of the body unreadable
            Err(_) if image_failure.is_some() => break,
            Err(e) => return Err(AppError::BadRequest(e.to_string())),
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            if !has_file(&field) || image_failure.is_some() {
                continue;
            }
            let content_type = field.content_type().map(str::to_string);
            match state
                .inventory
                .attach_image(&mut form, content_type.as_deref(), Box::pin(field))
                .await
            {
                Ok(()) => file_attached = true,
                Err(e) => image_failure = Some(e),
            }
            continue;
        }

        let value = match field.text().await {
            Ok(value) => value,
            Err(_) if image_failure.is_some() => break,
            Err(e) => return Err(AppError::BadRequest(e.to_string())),
        };
        match name.as_str() {
            "student_id" => form.student_id = value,
            "name" => form.name = value,
            "description" => form.description = value,
            "location" => form.location = value,
            "date_found" => form.date_found = value,
            "image_data" => previous_image = Some(value).filter(|v| !v.is_empty()),
            _ => {}
        }
    }

    // A newly attached file always wins over the image carried from the last attempt
    if !file_attached {
        form.image_data = previous_image;
    }

    let (dialog_open, notice) = match image_failure {
        Some(e) => (true, Some(e.notice().to_string())),
        None => match state.inventory.submit(&mut form).await {
            Ok(submitted) => (false, submitted.notice().map(str::to_string)),
            Err(e) => {
                warn!(error = %e, "Submission rejected");
                (true, Some(e.notice()))
            }
        },
    };

    let snapshot = state.inventory.snapshot();
    Ok(Html(render_page(&PageView {
        snapshot: &snapshot,
        form: &form,
        dialog_open,
        notice: notice.as_deref(),
    })))
}

/// Browsers send an empty, unnamed file part when nothing was selected
fn has_file(field: &Field<'_>) -> bool {
    field.file_name().is_some_and(|name| !name.is_empty())
}

#[derive(Deserialize)]
struct PlaceholderQuery {
    height: Option<u32>,
    width: Option<u32>,
    query: Option<String>,
}

async fn placeholder_handler(Query(q): Query<PlaceholderQuery>) -> impl IntoResponse {
    let svg = render_placeholder_svg(
        q.width.unwrap_or(64).min(1024),
        q.height.unwrap_or(64).min(1024),
        q.query.as_deref().unwrap_or_default(),
    );
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

// ============================================================================
// JSON endpoints
// ============================================================================

#[derive(Serialize)]
struct ItemsResponse {
    phase: Phase,
    processing: bool,
    items: Vec<LostItem>,
}

async fn list_items_handler(State(state): State<AppState>) -> Json<ItemsResponse> {
    state.inventory.fetch_all().await;
    let snapshot = state.inventory.snapshot();

    Json(ItemsResponse {
        phase: snapshot.phase,
        processing: snapshot.processing,
        items: snapshot.items,
    })
}

#[derive(Serialize)]
struct CreateItemResponse {
    item: Option<LostItem>,
    schema_fallback: bool,
    notice: Option<&'static str>,
}

async fn create_item_handler(
    State(state): State<AppState>,
    Json(mut form): Json<ItemForm>,
) -> Result<(StatusCode, Json<CreateItemResponse>), AppError> {
    let submitted = state.inventory.submit(&mut form).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateItemResponse {
            notice: submitted.notice(),
            item: submitted.item,
            schema_fallback: submitted.schema_fallback,
        }),
    ))
}

#[derive(Serialize)]
struct UploadResponse {
    url: String,
}

async fn upload_image_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("image").to_string();
        let data: Bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let url = state.uploader.upload(&file_name, data).await?;
        info!(file_name = %file_name, "Image uploaded");
        return Ok(Json(UploadResponse { url }));
    }

    Err(UploadError::NoFile.into())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: ValidationErrors,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        let message = e.notice();
        match e {
            SubmitError::Incomplete(fields) => AppError::Validation { message, fields },
            SubmitError::Busy => AppError::Conflict(message),
            SubmitError::Unconfigured | SubmitError::Unreachable(_) => AppError::Unavailable(message),
            SubmitError::Insert(_) => AppError::Upstream(message),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::NoFile => AppError::BadRequest(e.to_string()),
            UploadError::Failed(ref cause) => {
                warn!(error = %cause, "Image upload failed");
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg })),
            AppError::Validation { message, fields } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message, "fields": fields }),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, serde_json::json!({ "error": msg }))
            }
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, serde_json::json!({ "error": msg })),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({ "error": msg }))
            }
        };

        (status, Json::<Value>(body)).into_response()
    }
}
