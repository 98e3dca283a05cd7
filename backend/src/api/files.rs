//! File upload and download endpoints backed by the local upload directory.

use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};

use super::{error, success, ApiResult};
use crate::archive;
use crate::auth::CurrentUser;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::UploadedFile;
use crate::AppState;

/// URL prefix under which stored files are served.
pub const CONTENT_PREFIX: &str = "/api/files/content";

/// Upload form fields other than the file itself.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<PendingFile>,
    folder: Option<String>,
    project_name: Option<String>,
    caption: Option<String>,
}

#[derive(Debug)]
struct PendingFile {
    original_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

async fn read_form(multipart: &mut Multipart, max_bytes: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&original_name)
                            .first_or_octet_stream()
                            .to_string()
                    });

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::PayloadTooLarge(format!(
                            "File exceeds the {} MB upload limit",
                            max_bytes / (1024 * 1024)
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }

                form.file = Some(PendingFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
            "folder" | "projectName" | "caption" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "folder" => form.folder = value,
                    "projectName" => form.project_name = value,
                    _ => form.caption = value,
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/files/upload - Store a file and describe the resulting attachment.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ApiResult<UploadedFile> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let form = match read_form(&mut multipart, state.config.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => return error(e, revision_id),
    };
    let Some(file) = form.file else {
        return error(
            AppError::Validation("No file field in upload".to_string()),
            revision_id,
        );
    };

    let is_image = archive::is_image_type(&file.content_type);
    let storage = archive::storage_folder(
        form.project_name.as_deref(),
        &user.name,
        form.folder.as_deref(),
        is_image,
    );
    let attachment_folder = archive::resolve_folder(
        form.folder.as_deref().filter(|f| !f.starts_with("reports")),
        is_image,
    );
    let display = archive::display_name(
        form.project_name.as_deref().unwrap_or(""),
        &file.original_name,
        is_image,
        form.caption.as_deref(),
        state.clock.now(),
    );

    let unique = uuid::Uuid::new_v4().simple().to_string();
    let key = archive::object_key(&storage, &unique[..12], &display);
    let target = state.config.upload_dir.join(&key);

    let stored = async {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await
    };
    if let Err(e) = stored.await {
        return error(AppError::from(e), revision_id);
    }

    tracing::info!(
        path = %key,
        size = file.bytes.len(),
        user_id = %user.id,
        "File uploaded"
    );

    success(
        UploadedFile {
            url: format!("{}/{}", CONTENT_PREFIX, key),
            path: key,
            name: display,
            original_name: file.original_name,
            size: file.bytes.len(),
            content_type: file.content_type,
            folder: attachment_folder,
        },
        revision_id,
    )
}

/// Resolve a request path inside the upload root, refusing traversal.
fn resolve_stored_path(root: &FsPath, raw: &str) -> Option<PathBuf> {
    let relative = FsPath::new(raw.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if resolved == root {
        return None;
    }
    Some(resolved)
}

/// GET /api/files/content/*path - Serve a stored file.
pub async fn file_content(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppErrorWithRevision> {
    let not_found = || AppErrorWithRevision {
        error: AppError::NotFound(format!("File {} not found", path)),
        revision_id: 0,
    };

    let target = resolve_stored_path(&state.config.upload_dir, &path).ok_or_else(not_found)?;
    let bytes = tokio::fs::read(&target).await.map_err(|_| not_found())?;

    let content_type = mime_guess::from_path(&target)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_stored_path() {
        let root = FsPath::new("/srv/uploads");
        assert_eq!(
            resolve_stored_path(root, "projects/Apollo/Images/a.png"),
            Some(PathBuf::from("/srv/uploads/projects/Apollo/Images/a.png"))
        );
        assert_eq!(
            resolve_stored_path(root, "./uploads/Documents/b.pdf"),
            Some(PathBuf::from("/srv/uploads/uploads/Documents/b.pdf"))
        );
    }

    #[test]
    fn test_resolve_stored_path_rejects_traversal() {
        let root = FsPath::new("/srv/uploads");
        assert_eq!(resolve_stored_path(root, "../etc/passwd"), None);
        assert_eq!(resolve_stored_path(root, "uploads/../../secret"), None);
        assert_eq!(resolve_stored_path(root, ""), None);
    }
}
