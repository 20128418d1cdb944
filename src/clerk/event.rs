use serde::Deserialize;
use thiserror::Error;

use crate::repository::UserProfile;

/// Envelope of every webhook delivery
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    id: Option<String>,
    email_address: String,
}

/// User object as sent by Clerk, plus the flat `email`/`name` shape some
/// senders use
#[derive(Debug, Deserialize)]
struct UserData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl UserData {
    fn email(&self) -> String {
        if let Some(email) = self.email.as_ref().filter(|e| !e.is_empty()) {
            return email.clone();
        }
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| primary.is_some() && e.id.as_deref() == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
            .unwrap_or_default()
    }

    fn name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.name.clone().unwrap_or_default()
        } else {
            full
        }
    }

    fn into_profile(self) -> Result<UserProfile, EventError> {
        if self.id.trim().is_empty() {
            return Err(EventError::MissingUserId);
        }
        Ok(UserProfile {
            email: self.email(),
            name: self.name(),
            image: self.image_url.clone().unwrap_or_default(),
            id: self.id,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    UserCreated(UserProfile),
    UserUpdated(UserProfile),
    UserDeleted { id: String },
    /// A verified event of a kind this service does not act on
    Unsupported { kind: String },
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("webhook payload has no user id")]
    MissingUserId,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, EventError> {
        let envelope: Envelope = serde_json::from_slice(payload)?;
        let user = |data: serde_json::Value| -> Result<UserProfile, EventError> {
            serde_json::from_value::<UserData>(data)?.into_profile()
        };
        Ok(match envelope.kind.as_str() {
            "user.created" => WebhookEvent::UserCreated(user(envelope.data)?),
            "user.updated" => WebhookEvent::UserUpdated(user(envelope.data)?),
            "user.deleted" => WebhookEvent::UserDeleted {
                id: user(envelope.data)?.id,
            },
            _ => WebhookEvent::Unsupported {
                kind: envelope.kind,
            },
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            WebhookEvent::UserCreated(_) => "user.created",
            WebhookEvent::UserUpdated(_) => "user.updated",
            WebhookEvent::UserDeleted { .. } => "user.deleted",
            WebhookEvent::Unsupported { kind } => kind,
        }
    }
}
