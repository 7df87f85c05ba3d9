//! A messenger that keeps what it sends.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::{Messenger, OutboundFile};
use crate::error::LudinhoError;

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    /// A text message.
    Text {
        /// Recipient.
        to: String,
        /// Body.
        text: String,
    },
    /// A file.
    File {
        /// Recipient.
        to: String,
        /// The file as sent.
        file: OutboundFile,
    },
}

impl SentMessage {
    /// Recipient of the message.
    #[must_use]
    pub fn to(&self) -> &str {
        match self {
            Self::Text { to, .. } | Self::File { to, .. } => to,
        }
    }

    /// Text body, or the caption for files.
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
            Self::File { file, .. } => &file.caption,
        }
    }
}

/// Records every message instead of delivering it. Sending can be made to
/// fail for text and files independently.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    outbox: Mutex<Vec<SentMessage>>,
    fail_text: AtomicBool,
    fail_files: AtomicBool,
}

impl RecordingMessenger {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes text sends fail (or succeed again).
    pub fn fail_text(&self, fail: bool) {
        self.fail_text.store(fail, Ordering::SeqCst);
    }

    /// Makes file sends fail (or succeed again).
    pub fn fail_files(&self, fail: bool) {
        self.fail_files.store(fail, Ordering::SeqCst);
    }

    /// Everything recorded so far, oldest first.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().await.clone()
    }

    /// Bodies of the messages sent to `to`, oldest first.
    pub async fn bodies_to(&self, to: &str) -> Vec<String> {
        self.outbox
            .lock()
            .await
            .iter()
            .filter(|m| m.to() == to)
            .map(|m| m.body().to_string())
            .collect()
    }

    /// Empties the outbox and returns what it held.
    pub async fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.outbox.lock().await)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), LudinhoError> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(LudinhoError::MessagingError("text delivery disabled".to_string()));
        }
        info!(to, chars = text.chars().count(), "recorded outbound text");
        self.outbox.lock().await.push(SentMessage::Text {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_file(&self, to: &str, file: &OutboundFile) -> Result<(), LudinhoError> {
        if self.fail_files.load(Ordering::SeqCst) {
            return Err(LudinhoError::MessagingError("file delivery disabled".to_string()));
        }
        info!(to, filename = %file.filename, "recorded outbound file");
        self.outbox.lock().await.push(SentMessage::File {
            to: to.to_string(),
            file: file.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_in_order_and_filters_by_recipient() {
        let messenger = RecordingMessenger::new();
        let _ = messenger.send_text("1", "a").await;
        let _ = messenger.send_text("2", "b").await;
        let _ = messenger
            .send_file(
                "1",
                &OutboundFile {
                    base64: "JVBER".to_string(),
                    filename: "r.pdf".to_string(),
                    mime_type: "application/pdf".to_string(),
                    caption: "c".to_string(),
                },
            )
            .await;

        assert_eq!(messenger.bodies_to("1").await, vec!["a", "c"]);
        assert_eq!(messenger.take().await.len(), 3);
        assert!(messenger.sent().await.is_empty());
    }

    #[tokio::test]
    async fn failures_can_be_toggled() {
        let messenger = RecordingMessenger::new();
        messenger.fail_files(true);
        let file = OutboundFile {
            base64: String::new(),
            filename: "f".to_string(),
            mime_type: "image/png".to_string(),
            caption: String::new(),
        };
        assert!(messenger.send_file("1", &file).await.is_err());
        assert!(messenger.send_text("1", "ok").await.is_ok());
        messenger.fail_files(false);
        assert!(messenger.send_file("1", &file).await.is_ok());
    }
}
