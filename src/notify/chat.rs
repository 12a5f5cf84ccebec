//! Chat transports

use super::NotifierError;

/// Destination that accepts rendered text messages
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifierError>;
}

/// Incoming-webhook chat transport (Slack/Mattermost compatible)
pub struct WebhookChat {
    client: reqwest::Client,
    url: String,
    channel: Option<String>,
}

impl WebhookChat {
    pub fn new(url: impl Into<String>, channel: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            channel,
        }
    }

    fn payload(&self, text: &str) -> serde_json::Value {
        match &self.channel {
            Some(channel) => serde_json::json!({ "channel": channel, "text": text }),
            None => serde_json::json!({ "text": text }),
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for WebhookChat {
    async fn send(&self, text: &str) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| NotifierError::Chat(format!("Failed to send message: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Chat(format!(
                "Chat webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(url = %self.url, "Chat message sent");
        Ok(())
    }
}

/// Writes messages to the log instead of a chat service
#[derive(Debug, Default)]
pub struct LogChat;

#[async_trait::async_trait]
impl ChatTransport for LogChat {
    async fn send(&self, text: &str) -> Result<(), NotifierError> {
        tracing::warn!("Chat message: {}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payload() {
        let chat = WebhookChat::new("http://chat.local/hooks/x", Some("ops".to_string()));
        assert_eq!(
            chat.payload("hi"),
            serde_json::json!({ "channel": "ops", "text": "hi" })
        );

        let chat = WebhookChat::new("http://chat.local/hooks/x", None);
        assert_eq!(chat.payload("hi"), serde_json::json!({ "text": "hi" }));
    }

    #[tokio::test]
    async fn test_log_chat_always_succeeds() {
        assert!(LogChat.send("test message").await.is_ok());
    }

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn spawn_server(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_webhook_posts_json() {
        use axum::{routing::post, Json};
        use std::sync::Arc;

        let received = Arc::new(parking_lot::Mutex::new(Vec::<serde_json::Value>::new()));
        let sink = Arc::clone(&received);
        let router = axum::Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push(body);
                    "ok"
                }
            }),
        );

        let base = spawn_server(router).await;
        let chat = WebhookChat::new(format!("{}/hook", base), Some("ops".to_string()));
        tokio_test::assert_ok!(chat.send("hello").await);

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["text"], "hello");
        assert_eq!(received[0]["channel"], "ops");
    }

    #[tokio::test]
    async fn test_webhook_error_status_fails() {
        use axum::{http::StatusCode, routing::post};

        let router =
            axum::Router::new().route("/hook", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

        let base = spawn_server(router).await;
        let chat = WebhookChat::new(format!("{}/hook", base), None);
        assert!(matches!(
            chat.send("hello").await,
            Err(NotifierError::Chat(_))
        ));
    }
}
