//! POST /media_objects: multipart upload stored under the media directory.

use crate::case::value_keys_to_camel_case_recursive;
use crate::config::Operation;
use crate::error::AppError;
use crate::handlers::entity::resolve_entity;
use crate::response::success_one;
use crate::service::CrudService;
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use serde_json::{Map, Value};
use std::path::Path;

pub const MEDIA_RESOURCE: &str = "media_objects";
/// URL prefix the stored files are served from.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Generated file name; the client's extension is kept only when it is short and alphanumeric.
pub fn stored_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    let id = uuid::Uuid::new_v4();
    match ext {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve_entity(&state, MEDIA_RESOURCE, Operation::Upload)?;

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        file = Some((original, data.to_vec()));
        break;
    }
    let (original, data) = match file {
        Some((original, data)) if !data.is_empty() => (original, data),
        Some(_) => {
            tracing::warn!("rejected upload: empty 'file' field");
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        None => {
            tracing::warn!("rejected upload: no 'file' field");
            return Err(AppError::BadRequest("missing 'file' field in multipart body".into()));
        }
    };

    let name = stored_file_name(original.as_deref());
    let dir = &state.settings.media_dir;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&name);
    tokio::fs::write(&path, &data).await?;
    tracing::info!(file = %path.display(), bytes = data.len(), "stored upload");

    let mut body = Map::new();
    body.insert("file_path".into(), Value::String(name.clone()));
    body.insert(
        "content_url".into(),
        Value::String(format!("{}/{}", MEDIA_URL_PREFIX, name)),
    );
    let mut row = match CrudService::create(&state.pool, entity, &body).await {
        Ok(row) => row,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                tracing::warn!(file = %path.display(), error = %rm, "could not remove orphaned upload");
            }
            return Err(e);
        }
    };
    value_keys_to_camel_case_recursive(&mut row);
    Ok(success_one(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_extensions_only() {
        assert!(stored_file_name(Some("cover.JPG")).ends_with(".jpg"));
        assert!(!stored_file_name(Some("archive.tar.g$z")).contains('$'));
        assert!(!stored_file_name(Some("README")).contains('.'));
        assert!(!stored_file_name(None).contains('.'));
        assert_ne!(stored_file_name(None), stored_file_name(None));
    }
}
