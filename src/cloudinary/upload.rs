use std::{collections::BTreeMap, time::Duration};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use super::{credentials::CloudinaryCredentials, signature::CloudinarySigner};
use crate::{
    config::MediaConfig,
    media::{MediaKind, MediaStorage, MediaUpload, StoredMedia},
};

const API_ENDPOINT: &str = "https://api.cloudinary.com";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Upload API client for Cloudinary
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    cloud_name: String,
    signer: CloudinarySigner,
    endpoint: String,
    http_client: reqwest::Client,
}

/// The part of the upload response we keep
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryClient {
    /// Validates the configured credentials and builds a client. Nothing is
    /// sent to Cloudinary until the first upload.
    pub fn configure(config: &MediaConfig) -> Result<Self> {
        let credentials = CloudinaryCredentials::from_config(config)?;
        let http_client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        let client = Self::with_client(credentials, http_client);
        info!(cloud_name = client.cloud_name(), "Media storage configured");
        Ok(client)
    }

    /// Create client with custom HTTP client (useful for sharing client across app)
    pub fn with_client(credentials: CloudinaryCredentials, http_client: reqwest::Client) -> Self {
        Self {
            cloud_name: credentials.cloud_name,
            signer: CloudinarySigner::new(credentials.api_key, credentials.api_secret),
            endpoint: API_ENDPOINT.to_string(),
            http_client,
        }
    }

    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    fn upload_url(&self, kind: MediaKind) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.endpoint,
            self.cloud_name,
            kind.resource_type()
        )
    }
}

#[async_trait]
impl MediaStorage for CloudinaryClient {
    async fn upload(&self, upload: MediaUpload) -> Result<StoredMedia> {
        let params = self.signer.sign_upload(BTreeMap::new(), Utc::now().timestamp());

        let file_part = Part::bytes(upload.data.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v))
            .part("file", file_part);

        let response = self
            .http_client
            .post(self.upload_url(upload.kind))
            .multipart(form)
            .send()
            .await?;

        // Check response status
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or(response_text);
            return Err(anyhow!(
                "Cloudinary upload failed with status {status}: {message}"
            ));
        }

        let uploaded: UploadResponse = serde_json::from_str(&response_text)?;
        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}
