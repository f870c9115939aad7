use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{error, info, warn};

use crate::models::{ErrorResponse, FileInfo};
use crate::ws::RoomError;
use crate::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "pdf", "doc", "docx", "txt"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected!")]
    NoFile,

    #[error("No room code given")]
    MissingRoomCode,

    #[error("Error: Only images, PDFs, and document files are allowed!")]
    DisallowedType,

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to register file: {0}")]
    Register(RoomError),
}

impl From<RoomError> for UploadError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::RoomNotFound => UploadError::RoomNotFound,
            other => UploadError::Register(other),
        }
    }
}

impl UploadError {
    fn status(&self) -> StatusCode {
        match self {
            UploadError::RoomNotFound => StatusCode::NOT_FOUND,
            UploadError::Multipart(e) => e.status(),
            UploadError::Io(_) | UploadError::Register(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// File part of the form, before validation
struct IncomingFile {
    original_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Store an uploaded file and register it with its room
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileInfo>), (StatusCode, Json<ErrorResponse>)> {
    match store_upload(&state, multipart).await {
        Ok(file_info) => Ok((StatusCode::OK, Json(file_info))),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                error!("Upload failed: {}", e);
            } else {
                warn!("Upload rejected: {}", e);
            }
            Err(ErrorResponse::with_status(status, e.to_string()))
        }
    }
}

async fn store_upload(state: &AppState, mut multipart: Multipart) -> Result<FileInfo, UploadError> {
    let mut room_code: Option<String> = None;
    let mut incoming: Option<IncomingFile> = None;

    // The browser client sends the file before the room code, so read the whole form first
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("roomCode") => room_code = Some(field.text().await?),
            Some("file") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                incoming = Some(IncomingFile { original_name, content_type, data });
            }
            _ => {}
        }
    }

    let file = incoming
        .filter(|f| !f.original_name.is_empty())
        .ok_or(UploadError::NoFile)?;
    let room_code = room_code
        .filter(|c| !c.trim().is_empty())
        .ok_or(UploadError::MissingRoomCode)?;
    let ext = allowed_extension(&file.original_name, file.content_type.as_deref())
        .ok_or(UploadError::DisallowedType)?;
    if file.data.len() > state.config.max_upload_bytes {
        return Err(UploadError::TooLarge(state.config.max_upload_bytes));
    }
    if !state.hub.room_exists(&room_code).await {
        return Err(UploadError::RoomNotFound);
    }

    let (stored_name, path) = write_new_file(Path::new(&state.config.upload_dir), &ext, &file.data).await?;
    let file_info = FileInfo {
        relative_path: format!("/uploads/{}", stored_name),
        stored_name,
        original_name: file.original_name,
        type_tag: format!(".{}", ext),
    };

    if let Err(e) = state.hub.register_file(&room_code, file_info.clone()).await {
        // The room emptied while the file was being written
        if let Err(rm) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove orphaned upload {}: {}", path.display(), rm);
        }
        return Err(e.into());
    }
    info!("Stored {} as {} for room {}", file_info.original_name, file_info.stored_name, room_code);
    Ok(file_info)
}

/// Write `data` to `{millis}.{ext}` in `dir`, bumping the stamp until the name is free
async fn write_new_file(dir: &Path, ext: &str, data: &[u8]) -> Result<(String, PathBuf), std::io::Error> {
    tokio::fs::create_dir_all(dir).await?;
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let name = format!("{}.{}", stamp, ext);
        let path = dir.join(&name);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(mut f) => {
                f.write_all(data).await?;
                f.flush().await?;
                return Ok((name, path));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => stamp += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Lower-cased extension of an acceptable upload, or `None` if the file is not allowed.
pub fn allowed_extension(original_name: &str, content_type: Option<&str>) -> Option<String> {
    let ext = Path::new(original_name)
        .extension()?
        .to_string_lossy()
        .to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    match content_type {
        Some(ct) if !content_type_fits(&ext, ct) => None,
        _ => Some(ext),
    }
}

fn content_type_fits(ext: &str, content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ct == "application/octet-stream" {
        return true;
    }
    match ext {
        "jpeg" | "jpg" | "png" | "gif" => ct.starts_with("image/"),
        "pdf" => ct == "application/pdf",
        "doc" | "docx" => ct.contains("msword") || ct.contains("officedocument"),
        "txt" => ct.starts_with("text/"),
        _ => false,
    }
}
