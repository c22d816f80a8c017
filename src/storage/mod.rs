use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Video MIME types accepted for upload, with the extension used on disk.
pub const ALLOWED_VIDEO_TYPES: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/quicktime", "mov"),
];

/// Extension for an allowed video MIME type, `None` if the type is rejected.
pub fn video_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ALLOWED_VIDEO_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

pub fn generate_video_filename(extension: &str) -> String {
    format!(
        "{}_{}.{}",
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().simple().to_string()[..8],
        extension
    )
}

/// URL path under which a stored upload is served.
pub fn video_url(filename: &str) -> String {
    format!("/uploads/{}", filename)
}

pub fn ensure_dirs(upload_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Streams an upload to disk while enforcing a size ceiling.
///
/// The partial file is removed if the writer is abandoned or the limit is
/// exceeded.
pub struct UploadWriter {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    limit: u64,
}

impl UploadWriter {
    pub async fn create(path: PathBuf, limit: u64) -> std::io::Result<Self> {
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file: Some(file),
            written: 0,
            limit,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        self.written += chunk.len() as u64;
        if self.written > self.limit {
            return Err(WriteError::TooLarge { limit: self.limit });
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
        }
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn finish(mut self) -> std::io::Result<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        // Only unfinished writers still own their file handle.
        if self.file.take().is_some() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial upload");
            }
        }
    }
}
