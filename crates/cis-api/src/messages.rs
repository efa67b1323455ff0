//! Outbound SMS messages and weather alerts.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::request::{ListQuery, RequestOptions};

/// Longest body the backend will split into SMS segments.
pub const MAX_MESSAGE_LEN: usize = 918;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Sms,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Pending,
    Sent,
    Delivered,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default)]
    pub kind: MessageKind,
    pub content: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub recipient_count: u32,
    #[serde(default)]
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Message to send. Recipients are farmers picked individually and/or
/// everyone registered at the given locations.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub kind: MessageKind,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub farmer_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location_ids: Vec<i64>,
}

impl OutgoingMessage {
    pub fn sms(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Sms,
            content: content.into(),
            farmer_ids: Vec::new(),
            location_ids: Vec::new(),
        }
    }

    pub fn alert(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Alert,
            ..Self::sms(content)
        }
    }

    pub fn to_farmers(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.farmer_ids.extend(ids);
        self
    }

    pub fn to_locations(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.location_ids.extend(ids);
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        let len = self.content.trim().chars().count();
        if len == 0 {
            return Err(ApiError::InvalidRequest("Message content is empty".into()));
        }
        if len > MAX_MESSAGE_LEN {
            return Err(ApiError::InvalidRequest(format!(
                "Message is {} characters, the limit is {}",
                len, MAX_MESSAGE_LEN
            )));
        }
        if self.farmer_ids.is_empty() && self.location_ids.is_empty() {
            return Err(ApiError::InvalidRequest("Message has no recipients".into()));
        }
        Ok(())
    }
}

impl ApiClient {
    pub async fn list_messages(&self, query: &ListQuery) -> Result<Vec<Message>, ApiError> {
        self.get_with("/messages", query.apply(RequestOptions::new()))
            .await
    }

    pub async fn get_message(&self, id: i64) -> Result<Message, ApiError> {
        self.get(&format!("/messages/{}", id)).await
    }

    /// Queue a message for delivery. Sent at most once unless mutations are configured to retry.
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<Message, ApiError> {
        message.validate()?;

        let queued: Message = self.post("/messages", message).await?;
        tracing::info!(
            "Queued {:?} message {} for {} recipients",
            queued.kind,
            queued.id,
            queued.recipient_count
        );
        Ok(queued)
    }
}
