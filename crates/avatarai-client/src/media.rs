//! Files picked by the user and the upload step shared by every composer.

use std::path::Path;

use tracing::{debug, info};

use avatarai_net::ApiClient;
use avatarai_shared::validate::{content_type_for, validate_media, MediaKind};

use crate::error::Result;

/// A file selected for upload, already read into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk for `kind`, inferring the content type from its
    /// extension. Type and size are checked against the file metadata, so a
    /// rejected file is never read.
    pub async fn load(path: &Path, kind: MediaKind) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type_for(&file_name);
        let size = tokio::fs::metadata(path).await?.len();
        validate_media(kind, &content_type, size)?;

        let data = tokio::fs::read(path).await?;
        debug!(file = %file_name, size, "Media file loaded");
        Ok(Self::new(file_name, content_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// An uploaded file attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMedia {
    pub cid: String,
    pub url: String,
    pub alt: String,
}

/// Validate `file` for `kind` and upload it. Validation failures return
/// before any request is made.
pub async fn upload(api: &ApiClient, kind: MediaKind, file: MediaFile) -> Result<StagedMedia> {
    validate_media(kind, &file.content_type, file.size())?;

    let alt = file.file_name.clone();
    let result = api
        .upload_blob(&file.file_name, &file.content_type, file.data)
        .await?;
    info!(cid = %result.cid, kind = ?kind, "Media staged");

    Ok(StagedMedia {
        url: result.display_url(),
        cid: result.cid,
        alt,
    })
}
