use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::{
    error::{AppError, AppResult},
    media::{MediaKind, MediaUpload},
};

pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn into_upload(self, kind: MediaKind) -> MediaUpload {
        MediaUpload {
            kind,
            file_name: self.file_name,
            content_type: self.content_type,
            data: self.data,
        }
    }
}

/// A buffered multipart form: text fields and files by field name
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

fn invalid_form(err: impl std::fmt::Display) -> AppError {
    AppError::bad_request(format!("Invalid multipart body: {err}"))
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(invalid_form)?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(invalid_form)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// A required, non-blank text field
    pub fn text(&self, name: &str) -> AppResult<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request(format!("Missing field: {name}")))
    }

    /// A required, non-empty file field
    pub fn take_file(&mut self, name: &str) -> AppResult<UploadedFile> {
        self.files
            .remove(name)
            .filter(|file| !file.data.is_empty())
            .ok_or_else(|| AppError::bad_request(format!("Missing file: {name}")))
    }
}
