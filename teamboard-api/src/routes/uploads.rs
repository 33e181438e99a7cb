/// Multipart upload storage
///
/// Files are streamed chunk by chunk so the size ceiling is enforced before
/// anything touches the disk. Stored names follow
/// `<prefix>-<unix millis>-<random><.ext>` and are served under `/uploads`.

use axum::extract::{multipart::MultipartError, Multipart};
use rand::Rng;
use std::path::Path;
use tracing::info;

/// Ceiling for `POST /api/users/me/avatar`
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Ceiling for `POST /api/tasks/:id/attachments`
pub const ATTACHMENT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Upload failures
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded.")]
    MissingFile,

    #[error("File exceeds the {limit} byte limit.")]
    TooLarge { limit: usize },

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        UploadError::Malformed(err.body_text())
    }
}

/// A file written to the upload directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Name as sent by the client
    pub original_name: String,

    /// Public URL (`/uploads/<file>`)
    pub url: String,

    pub content_type: String,
    pub size: u64,
}

/// Keeps a short alphanumeric extension from the client's file name
fn safe_extension(original: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn stored_name(prefix: &str, original: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}-{}{}", prefix, millis, suffix, safe_extension(original))
}

/// Finds the multipart field `field_name` and stores it under `dir`
///
/// Other fields are skipped.
///
/// # Errors
///
/// - [`UploadError::MissingFile`] if no such field (or an empty one) was sent
/// - [`UploadError::TooLarge`] once more than `max_bytes` have been received
pub async fn save_upload(
    multipart: &mut Multipart,
    field_name: &str,
    dir: &Path,
    prefix: &str,
    max_bytes: usize,
) -> Result<StoredFile, UploadError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(UploadError::TooLarge { limit: max_bytes });
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(UploadError::MissingFile);
        }

        tokio::fs::create_dir_all(dir).await?;
        let file_name = stored_name(prefix, &original_name);
        tokio::fs::write(dir.join(&file_name), &data).await?;

        info!(file = %file_name, size = data.len(), "Stored upload");

        return Ok(StoredFile {
            original_name,
            url: format!("/uploads/{}", file_name),
            content_type,
            size: data.len() as u64,
        });
    }

    Err(UploadError::MissingFile)
}
