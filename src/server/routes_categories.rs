//! Category folders directly under the storage root.

use crate::server::AppContext;
use crate::workflow::validate_category;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Deserialize;
use std::path::PathBuf;

pub fn category_routes() -> Router<AppContext> {
    Router::new().route(
        "/categories",
        get(list_categories)
            .post(create_category)
            .put(rename_category)
            .delete(delete_category),
    )
}

/// A category must be a single path component.
fn category_path(ctx: &AppContext, name: &str) -> Result<PathBuf, (StatusCode, String)> {
    let name = validate_category(name).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(ctx.config.storage.path.join(name))
}

fn io_error(action: &str, e: std::io::Error) -> (StatusCode, String) {
    let status = match e.kind() {
        std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        std::io::ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("Failed to {} category: {}", action, e))
}

async fn list_categories(State(ctx): State<AppContext>) -> impl IntoResponse {
    let mut categories = Vec::new();

    match std::fs::read_dir(&ctx.config.storage.path) {
        Ok(entries) => {
            for entry in entries.filter_map(|e| e.ok()) {
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    categories.push(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        Err(e) => tracing::warn!(
            "Error reading storage directory {:?}: {}",
            ctx.config.storage.path,
            e
        ),
    }

    categories.sort();
    Json(serde_json::json!({ "categories": categories }))
}

#[derive(Deserialize)]
struct CategoryRequest {
    #[serde(default)]
    name: String,
}

async fn create_category(
    State(ctx): State<AppContext>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = category_path(&ctx, &req.name)?;
    std::fs::create_dir_all(&path).map_err(|e| io_error("create", e))?;

    tracing::info!("Created category {:?}", path);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "status": "created", "name": req.name.trim() })),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameCategoryRequest {
    #[serde(default)]
    old_name: String,
    #[serde(default)]
    new_name: String,
}

async fn rename_category(
    State(ctx): State<AppContext>,
    Json(req): Json<RenameCategoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.old_name.trim().is_empty() || req.new_name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Old and new names are required".to_string(),
        ));
    }
    let from = category_path(&ctx, &req.old_name)?;
    let to = category_path(&ctx, &req.new_name)?;

    if to.exists() {
        return Err((
            StatusCode::CONFLICT,
            format!("Category already exists: {}", req.new_name.trim()),
        ));
    }
    std::fs::rename(&from, &to).map_err(|e| io_error("rename", e))?;

    tracing::info!("Renamed category {:?} -> {:?}", from, to);
    Ok(Json(serde_json::json!({ "status": "renamed" })))
}

/// Only empty categories can be deleted.
async fn delete_category(
    State(ctx): State<AppContext>,
    Json(req): Json<CategoryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = category_path(&ctx, &req.name)?;

    std::fs::remove_dir(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => io_error("delete", e),
        _ if path.is_dir() => (
            StatusCode::CONFLICT,
            format!("Failed to delete category: {} is not empty", req.name.trim()),
        ),
        _ => io_error("delete", e),
    })?;

    tracing::info!("Deleted category {:?}", path);
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
