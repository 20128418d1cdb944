use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    clerk::{SessionVerifier, WebhookVerifier},
    cloudinary::CloudinaryClient,
    config::AppSettings,
    media::MediaStorage,
    repository::{PostgresRepository, Repository},
};

/// Shared, read-mostly resources handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub media: Arc<dyn MediaStorage>,
    pub sessions: Arc<SessionVerifier>,
    pub webhooks: Arc<WebhookVerifier>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository>,
        media: Arc<dyn MediaStorage>,
        sessions: SessionVerifier,
        webhooks: WebhookVerifier,
    ) -> Self {
        Self {
            repository,
            media,
            sessions: Arc::new(sessions),
            webhooks: Arc::new(webhooks),
        }
    }
}

/// Brings up every external dependency in order; the first failure aborts.
pub async fn init_state_with_pg(config: &AppSettings) -> Result<AppState> {
    let repository = PostgresRepository::connect(&config.database).await?;
    let media = CloudinaryClient::configure(&config.media)
        .context("failed to configure media storage")?;
    let sessions = SessionVerifier::from_config(&config.auth)
        .context("failed to load session verification key")?;
    let secret = config
        .webhook
        .secret
        .as_deref()
        .context("webhook signing secret is not configured (set CLERK_WEBHOOK_SECRET)")?;
    let webhooks = WebhookVerifier::new(secret).context("invalid webhook signing secret")?;

    Ok(AppState::new(
        Arc::new(repository),
        Arc::new(media),
        sessions,
        webhooks,
    ))
}
