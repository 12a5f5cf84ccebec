//! Rendering plus delivery

use std::sync::Arc;

use super::chat::ChatTransport;
use super::template::{TemplateError, TemplateService};
use crate::alerts::WebhookMessage;
use crate::watchdog::{NotificationSink, WatchdogEvent};

/// Renders messages and events and sends them to a chat destination
pub struct Notifier {
    templates: TemplateService,
    chat: Arc<dyn ChatTransport>,
}

impl Notifier {
    pub fn new(templates: TemplateService, chat: Arc<dyn ChatTransport>) -> Self {
        Self { templates, chat }
    }

    /// Forward a webhook message as-is
    pub async fn relay(&self, message: &WebhookMessage) -> Result<(), NotifierError> {
        let text = self.templates.render_message(message)?;
        self.chat.send(&text).await
    }
}

#[async_trait::async_trait]
impl NotificationSink for Notifier {
    async fn deliver(&self, event: &WatchdogEvent) -> Result<(), NotifierError> {
        let text = self.templates.render_event(event)?;
        self.chat.send(&text).await?;

        tracing::debug!(
            watchdog_id = %event.id,
            kind = %event.kind,
            "Watchdog notification sent"
        );
        Ok(())
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Chat error: {0}")]
    Chat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Alert;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingChat {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ChatTransport for CapturingChat {
        async fn send(&self, text: &str) -> Result<(), NotifierError> {
            self.sent.lock().push(text.to_string());
            Ok(())
        }
    }

    fn notifier() -> (Notifier, Arc<CapturingChat>) {
        let chat = Arc::new(CapturingChat::default());
        let notifier = Notifier::new(
            TemplateService::new().unwrap(),
            Arc::clone(&chat) as Arc<dyn ChatTransport>,
        );
        (notifier, chat)
    }

    #[tokio::test]
    async fn test_deliver_renders_event() {
        let (notifier, chat) = notifier();
        let event = WatchdogEvent::fired("abc", Alert::firing([("alertname", "Watchdog")]));

        tokio_test::assert_ok!(notifier.deliver(&event).await);

        let sent = chat.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Watchdog expired"));
    }

    #[tokio::test]
    async fn test_relay_renders_message() {
        let (notifier, chat) = notifier();
        let message = WebhookMessage {
            receiver: "chat".to_string(),
            status: "resolved".to_string(),
            alerts: vec![Alert {
                status: "resolved".to_string(),
                ..Alert::firing([("alertname", "DiskFull")])
            }],
            ..Default::default()
        };

        tokio_test::assert_ok!(notifier.relay(&message).await);

        let sent = chat.sent.lock();
        assert!(sent[0].contains("[RESOLVED:1]"));
        assert!(sent[0].contains("DiskFull"));
    }
}
