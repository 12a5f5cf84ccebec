//! Message rendering and chat delivery

pub mod chat;
pub mod notifier;
pub mod template;

pub use chat::{ChatTransport, LogChat, WebhookChat};
pub use notifier::{Notifier, NotifierError};
pub use template::{TemplateError, TemplateService};
