//! The assistant chat panel
//!
//! Chat goes to the assistant service, not the backend. Conversations are
//! grouped by an opaque session id generated client-side and rotated whenever
//! the assistant hands back a different one. The assistant associates chats
//! with the logged-in account through an `X-User-ID` header when the account
//! id is known.

use std::sync::PoisonError;

use http::HeaderName;
use serde::{Deserialize, Serialize};

use super::expect_json;
use crate::error::ApiError;
use crate::GymClient;

const X_SESSION_ID: HeaderName = HeaderName::from_static("x-session-id");
const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// The assistant's answer to one message
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    /// The assistant's response text
    pub response: String,
    /// The conversation this reply belongs to; adopt it when it differs from
    /// the id sent
    pub session_id: Option<String>,
}

/// One past message of a conversation
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message, `user` or `assistant`
    pub role: String,
    /// The message text
    pub content: String,
    /// When the message was recorded
    pub created_at: Option<String>,
}

/// A conversation transcript
#[derive(Debug, Deserialize)]
pub struct ChatHistory {
    /// The conversation id
    pub session_id: String,
    /// Number of messages in the conversation
    pub message_count: i64,
    /// The messages, oldest first
    pub messages: Vec<ChatMessage>,
}

/// Conversation with the assistant service
#[derive(Debug)]
pub struct ChatApi<'a> {
    pub(crate) client: &'a GymClient,
}

impl ChatApi<'_> {
    /// Sends one message and waits for the assistant's reply
    pub async fn send_message(&self, message: &str) -> Result<ChatReply, ApiError> {
        let session_id = self.current_session_id();
        let url = self.client.assistant_url("/api/v1/chat/")?;

        let mut request = self
            .client
            .assistant()
            .post(url)
            .header(X_SESSION_ID, session_id.as_str())
            .json(&ChatRequest { message });
        if let Some(user_id) = self.client.known_user_id() {
            request = request.header(X_USER_ID, user_id.to_string());
        }

        let response = request.send().await.map_err(ApiError::from)?;
        let reply: ChatReply = expect_json(response).await?;

        if let Some(new_session) = &reply.session_id {
            if *new_session != session_id {
                self.adopt_session_id(new_session.clone());
            }
        }
        Ok(reply)
    }

    /// Fetches the transcript of the current conversation
    pub async fn history(&self, limit: u32) -> Result<ChatHistory, ApiError> {
        let session_id = self.current_session_id();
        let url = self.client.assistant_url("/api/v1/chat/history")?;

        let mut request = self
            .client
            .assistant()
            .get(url)
            .query(&[("limit", limit)])
            .header(X_SESSION_ID, session_id.as_str());
        if let Some(user_id) = self.client.known_user_id() {
            request = request.header(X_USER_ID, user_id.to_string());
        }

        let response = request.send().await.map_err(ApiError::from)?;
        expect_json(response).await
    }

    // Conversation ids live for the lifetime of the client; one is minted on
    // first use.
    fn current_session_id(&self) -> String {
        let mut slot = self
            .client
            .chat_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone()
    }

    fn adopt_session_id(&self, session_id: String) {
        let mut slot = self
            .client
            .chat_session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(session_id);
    }
}
