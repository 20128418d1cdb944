use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// What the uploaded file is, which decides how the provider stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    /// Documents such as resumes, served back unmodified.
    Raw,
}

impl MediaKind {
    pub fn resource_type(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
}

/// An external media store. Implementations hold credentials only and
/// authenticate every upload on its own.
#[async_trait]
pub trait MediaStorage: Send + Sync + 'static {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia>;
}
