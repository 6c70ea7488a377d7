use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;
use uuid::Uuid;

use agora_types::api::{CreateThreadRequest, MessagePage, SendMessageRequest};
use agora_types::{Message, MessageId, Thread};

use crate::error::SourceError;
use crate::source::MessageSource;

/// [`MessageSource`] backed by the agora REST API.
#[derive(Debug, Clone)]
pub struct HttpMessageSource {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpMessageSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    fn messages_url(&self, thread_id: Uuid) -> String {
        format!("{}/threads/{}/messages", self.base_url, thread_id)
    }

    async fn send(request: RequestBuilder) -> Result<Response, SourceError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("Request to {} failed with {}", response.url(), status);
            return Err(SourceError::Status(status));
        }
        Ok(response)
    }

    /// Threads of the authenticated user, most recent first.
    pub async fn list_threads(&self) -> Result<Vec<Thread>, SourceError> {
        let request = self
            .client
            .get(format!("{}/threads", self.base_url))
            .bearer_auth(&self.token);
        Ok(Self::send(request).await?.json().await?)
    }

    /// Open the thread with `participant_id`, creating it if needed.
    pub async fn create_thread(&self, participant_id: Uuid) -> Result<Thread, SourceError> {
        let request = self
            .client
            .post(format!("{}/threads", self.base_url))
            .bearer_auth(&self.token)
            .json(&CreateThreadRequest { participant_id });
        Ok(Self::send(request).await?.json().await?)
    }
}

impl MessageSource for HttpMessageSource {
    async fn fetch_messages(
        &self,
        thread_id: Uuid,
        limit: u32,
        cursor: Option<MessageId>,
    ) -> Result<MessagePage, SourceError> {
        let mut request = self
            .client
            .get(self.messages_url(thread_id))
            .bearer_auth(&self.token)
            .query(&[("limit", limit)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        Ok(Self::send(request).await?.json().await?)
    }

    async fn fetch_new_since(
        &self,
        thread_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, SourceError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        let request = self
            .client
            .get(format!("{}/since", self.messages_url(thread_id)))
            .bearer_auth(&self.token)
            .query(&[("since", since)]);
        Ok(Self::send(request).await?.json().await?)
    }

    async fn send_message(
        &self,
        thread_id: Uuid,
        recipient_id: Uuid,
        content: &str,
    ) -> Result<Message, SourceError> {
        let request = self
            .client
            .post(self.messages_url(thread_id))
            .bearer_auth(&self.token)
            .json(&SendMessageRequest {
                recipient_id,
                content: content.to_string(),
            });
        Ok(Self::send(request).await?.json().await?)
    }
}
