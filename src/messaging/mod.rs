//! Outbound WhatsApp delivery.
//!
//! The state machine only knows the [`Messenger`] trait. Production wires a
//! [`WppConnectMessenger`]; tests and dry runs wire a [`RecordingMessenger`].

pub mod memory;
pub mod wppconnect;

use std::fmt;

use async_trait::async_trait;

use crate::error::LudinhoError;

pub use memory::{RecordingMessenger, SentMessage};
pub use wppconnect::WppConnectMessenger;

/// A file to deliver as a base64 document or image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFile {
    /// Base64 data without a `data:` prefix.
    pub base64: String,
    /// Filename shown to the recipient.
    pub filename: String,
    /// MIME type of the data.
    pub mime_type: String,
    /// Caption sent along with the file.
    pub caption: String,
}

impl OutboundFile {
    /// Renders the data as a `data:<mime>;base64,<data>` URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Delivers chat messages to a phone number.
#[async_trait]
pub trait Messenger: Send + Sync + fmt::Debug {
    /// Sends a text message.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::MessagingError`] when the gateway rejects or
    /// cannot be reached.
    async fn send_text(&self, to: &str, text: &str) -> Result<(), LudinhoError>;

    /// Sends a file with a caption.
    ///
    /// # Errors
    ///
    /// Returns [`LudinhoError::MessagingError`] when the gateway rejects or
    /// cannot be reached.
    async fn send_file(&self, to: &str, file: &OutboundFile) -> Result<(), LudinhoError>;
}
