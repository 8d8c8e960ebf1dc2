use bytes::Bytes;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Upload ceiling: 5 MiB.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

pub const XLSX_MEDIA_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MEDIA_TYPE: &str = "application/vnd.ms-excel";

pub const ACCEPTED_MEDIA_TYPES: [&str; 2] = [XLSX_MEDIA_TYPE, XLS_MEDIA_TYPE];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Invalid file type. Only Excel files are accepted.")]
    InvalidType,

    #[error("File size exceeds 5MB limit")]
    TooLarge,
}

/// A workbook picked for import but not yet uploaded.
#[derive(Clone, PartialEq)]
pub struct UploadCandidate {
    pub file_name: String,
    pub media_type: String,
    /// Size as declared by the source; checked against the ceiling.
    pub size: u64,
    pub content: Bytes,
}

impl UploadCandidate {
    /// Builds a candidate from in-memory content. Without an explicit media
    /// type, one is derived from the file extension.
    pub fn new(file_name: impl Into<String>, media_type: Option<&str>, content: Bytes) -> Self {
        let file_name = file_name.into();
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for(&file_name).to_string());

        Self {
            size: content.len() as u64,
            file_name,
            media_type,
            content,
        }
    }

    /// Loads a candidate from disk. Files larger than [`MAX_FILE_SIZE`] are
    /// not read: they can never be admitted, so only their size is kept.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = tokio::fs::metadata(path).await?.len();

        let content = if size > MAX_FILE_SIZE {
            Bytes::new()
        } else {
            Bytes::from(tokio::fs::read(path).await?)
        };

        Ok(Self {
            media_type: media_type_for(&file_name).to_string(),
            file_name,
            size,
            content,
        })
    }

    /// Type and size filters applied when a file is picked and again on submit.
    pub fn check(&self, max_size: u64) -> Result<(), Rejection> {
        if !ACCEPTED_MEDIA_TYPES.contains(&self.media_type.as_str()) {
            return Err(Rejection::InvalidType);
        }
        if self.size > max_size {
            return Err(Rejection::TooLarge);
        }
        Ok(())
    }

    /// "name (1.23 MB)"
    pub fn describe(&self) -> String {
        format!(
            "{} ({:.2} MB)",
            self.file_name,
            self.size as f64 / 1024.0 / 1024.0
        )
    }
}

impl fmt::Debug for UploadCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCandidate")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

fn media_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") => XLSX_MEDIA_TYPE,
        Some("xls") => XLS_MEDIA_TYPE,
        _ => "application/octet-stream",
    }
}
