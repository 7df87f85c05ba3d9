//! Normalization of inbound webhook payloads.
//!
//! WPPConnect (and the proxies in front of it) deliver the same event in
//! several JSON shapes. Everything the state machine needs is pulled out
//! here, once, into an [`InboundMessage`]; nothing else in the crate looks
//! at the raw payload.

use serde_json::Value;

use super::Phone;

/// Event type labels accepted as "message received".
const MESSAGE_EVENTS: [&str; 3] = ["onmessage", "message", "chat:message"];

/// Minimum length of a top-level `body` for it to be taken as a base64 file.
const INLINE_BODY_MIN_LEN: usize = 100;

/// Filename used when the payload does not carry one.
pub const DEFAULT_ATTACHMENT_NAME: &str = "comprovante";

/// A file that came with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Base64 data, without any `data:` prefix.
    pub base64: String,
    /// Filename as sent, or [`DEFAULT_ATTACHMENT_NAME`].
    pub filename: String,
    /// MIME type, provided or inferred.
    pub mime_type: String,
}

/// Normalized view of one webhook call.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Sender phone, when one could be resolved.
    pub phone: Option<Phone>,
    /// Message text, trimmed.
    pub text: String,
    /// Whether the bot's own account authored the message.
    pub from_me: bool,
    /// Whether the message came from a group chat.
    pub is_group: bool,
    /// Lowercased event label (empty when absent).
    pub event: String,
    /// Attached file, if any.
    pub attachment: Option<Attachment>,
}

/// Why an inbound message is acknowledged without processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Event type other than "message received".
    IgnoredEvent,
    /// Authored by the bot itself.
    FromMe,
    /// Group chat message.
    Group,
    /// No phone number could be resolved.
    NoPhone,
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn truthy(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "1"),
        _ => false,
    }
}

impl InboundMessage {
    /// Extracts the message from a raw webhook payload.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let empty = Value::Null;
        let data = payload.get("data").unwrap_or(&empty);
        let message = data.get("message").unwrap_or(&empty);

        let raw_from = str_field(payload, "from")
            .or_else(|| str_field(payload, "phone"))
            .or_else(|| str_field(data, "from"))
            .or_else(|| str_field(data, "chatId"))
            .unwrap_or_default();

        let text = str_field(payload, "caption")
            .or_else(|| str_field(message, "caption"))
            .or_else(|| str_field(data, "caption"))
            .or_else(|| str_field(payload, "text"))
            .or_else(|| str_field(payload, "message"))
            .or_else(|| str_field(data, "text"))
            .or_else(|| str_field(data, "body"))
            .or_else(|| str_field(payload, "body"))
            .unwrap_or_default()
            .trim()
            .to_string();

        let event = str_field(payload, "event")
            .unwrap_or_default()
            .to_lowercase();

        Self {
            phone: Phone::normalize(raw_from),
            text,
            from_me: truthy(payload, "fromMe") || truthy(data, "fromMe"),
            is_group: truthy(payload, "isGroupMsg")
                || truthy(payload, "isGroup")
                || truthy(data, "isGroupMsg")
                || truthy(data, "isGroup"),
            event,
            attachment: extract_attachment(payload),
        }
    }

    /// Returns why this message must be dropped, or `None` to process it.
    #[must_use]
    pub fn drop_reason(&self) -> Option<DropReason> {
        if !self.event.is_empty() && !MESSAGE_EVENTS.contains(&self.event.as_str()) {
            return Some(DropReason::IgnoredEvent);
        }
        if self.from_me {
            return Some(DropReason::FromMe);
        }
        if self.is_group {
            return Some(DropReason::Group);
        }
        if self.phone.is_none() {
            return Some(DropReason::NoPhone);
        }
        None
    }
}

/// Reads a `{data, filename, mimetype}` file object.
fn file_object(value: &Value) -> Option<Attachment> {
    let base64 = str_field(value, "data")?;
    Some(build_attachment(
        base64,
        str_field(value, "filename"),
        str_field(value, "mimetype"),
    ))
}

/// Reads a flat `base64` field with sibling `filename` / `mimetype`.
fn inline_base64(value: &Value) -> Option<Attachment> {
    let base64 = str_field(value, "base64")?;
    Some(build_attachment(
        base64,
        str_field(value, "filename"),
        str_field(value, "mimetype"),
    ))
}

fn build_attachment(raw: &str, filename: Option<&str>, mime: Option<&str>) -> Attachment {
    let (prefix_mime, base64) = split_data_uri(raw);
    let filename = filename.unwrap_or(DEFAULT_ATTACHMENT_NAME).to_string();
    let mime_type = mime
        .or(prefix_mime)
        .map(str::to_string)
        .unwrap_or_else(|| infer_mime_type(&filename, base64).to_string());
    Attachment {
        base64: base64.to_string(),
        filename,
        mime_type,
    }
}

/// Splits `data:<mime>;base64,<data>` into its parts; plain data passes through.
fn split_data_uri(raw: &str) -> (Option<&str>, &str) {
    raw.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map_or((None, raw), |(mime, data)| (Some(mime), data))
}

/// Finds the attached file, trying the known payload locations in order.
#[must_use]
pub fn extract_attachment(payload: &Value) -> Option<Attachment> {
    let empty = Value::Null;
    let data = payload.get("data").unwrap_or(&empty);
    let message = data.get("message").unwrap_or(&empty);

    message
        .get("file")
        .and_then(file_object)
        .or_else(|| message.get("mediaData").and_then(file_object))
        .or_else(|| inline_base64(message))
        .or_else(|| data.get("file").and_then(file_object))
        .or_else(|| inline_base64(data))
        .or_else(|| payload.get("file").and_then(file_object))
        .or_else(|| inline_base64(payload))
        .or_else(|| {
            str_field(payload, "body")
                .filter(|body| body.len() > INLINE_BODY_MIN_LEN && !body.contains(char::is_whitespace))
                .map(|body| {
                    build_attachment(
                        body,
                        str_field(payload, "filename"),
                        str_field(payload, "mimetype"),
                    )
                })
        })
}

/// Guesses a MIME type from the filename extension, then from the base64
/// magic prefix.
#[must_use]
pub fn infer_mime_type(filename: &str, base64: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => return "application/pdf",
        Some("png") => return "image/png",
        Some("jpg" | "jpeg") => return "image/jpeg",
        Some("webp") => return "image/webp",
        _ => {}
    }
    if base64.starts_with("JVBER") {
        "application/pdf"
    } else if base64.starts_with("iVBOR") {
        "image/png"
    } else if base64.starts_with("/9j/") {
        "image/jpeg"
    } else if base64.starts_with("UklGR") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_payload_is_read() {
        let msg = InboundMessage::from_payload(&json!({
            "from": "+55 11 99999-9999",
            "text": "  Oi  ",
            "event": "onMessage"
        }));
        assert_eq!(msg.phone.as_ref().map(Phone::as_str), Some("5511999999999"));
        assert_eq!(msg.text, "Oi");
        assert_eq!(msg.event, "onmessage");
        assert_eq!(msg.drop_reason(), None);
    }

    #[test]
    fn nested_payload_is_read() {
        let msg = InboundMessage::from_payload(&json!({
            "event": "chat:message",
            "data": {
                "chatId": "5511988887777@c.us",
                "message": { "caption": "COMPROVANTE TX-1" },
                "body": "ignored because caption wins"
            }
        }));
        assert_eq!(msg.phone.as_ref().map(Phone::as_str), Some("5511988887777"));
        assert_eq!(msg.text, "COMPROVANTE TX-1");
    }

    #[test]
    fn caption_is_preferred_over_body() {
        let msg = InboundMessage::from_payload(&json!({
            "from": "5511",
            "caption": "menu",
            "body": "JVBERi0xLjQK"
        }));
        assert_eq!(msg.text, "menu");
    }

    #[test]
    fn filters_apply_in_order() {
        let event = InboundMessage::from_payload(&json!({"from": "1", "event": "onack"}));
        assert_eq!(event.drop_reason(), Some(DropReason::IgnoredEvent));

        let me = InboundMessage::from_payload(&json!({"from": "1", "fromMe": true}));
        assert_eq!(me.drop_reason(), Some(DropReason::FromMe));

        let group = InboundMessage::from_payload(&json!({"from": "1", "data": {"isGroupMsg": true}}));
        assert_eq!(group.drop_reason(), Some(DropReason::Group));

        let anonymous = InboundMessage::from_payload(&json!({"text": "oi"}));
        assert_eq!(anonymous.drop_reason(), Some(DropReason::NoPhone));
    }

    #[test]
    fn malformed_payload_yields_empty_message() {
        let msg = InboundMessage::from_payload(&json!([1, 2, 3]));
        assert!(msg.phone.is_none());
        assert!(msg.text.is_empty());
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn message_file_object_wins() {
        let payload = json!({
            "data": {
                "message": {
                    "file": { "data": "JVBERi0x", "filename": "recibo.pdf" },
                    "mediaData": { "data": "iVBORw0K" }
                }
            },
            "base64": "/9j/4AAQ"
        });
        let Some(att) = extract_attachment(&payload) else {
            panic!("expected attachment");
        };
        assert_eq!(att.base64, "JVBERi0x");
        assert_eq!(att.filename, "recibo.pdf");
        assert_eq!(att.mime_type, "application/pdf");
    }

    #[test]
    fn media_data_then_inline_base64() {
        let media = json!({"data": {"message": {"mediaData": {"data": "iVBORw0K"}}}});
        let Some(att) = extract_attachment(&media) else {
            panic!("expected attachment");
        };
        assert_eq!(att.filename, DEFAULT_ATTACHMENT_NAME);
        assert_eq!(att.mime_type, "image/png");

        let inline = json!({"data": {"message": {"base64": "data:image/jpeg;base64,/9j/4AAQ"}}});
        let Some(att) = extract_attachment(&inline) else {
            panic!("expected attachment");
        };
        assert_eq!(att.base64, "/9j/4AAQ");
        assert_eq!(att.mime_type, "image/jpeg");
    }

    #[test]
    fn long_top_level_body_is_a_file() {
        let blob = "A".repeat(150);
        let payload = json!({"from": "1", "body": blob, "mimetype": "image/png"});
        let Some(att) = extract_attachment(&payload) else {
            panic!("expected attachment");
        };
        assert_eq!(att.mime_type, "image/png");

        let short = json!({"from": "1", "body": "COMPROVANTE 123"});
        assert!(extract_attachment(&short).is_none());
    }

    #[test]
    fn mime_inference_falls_back() {
        assert_eq!(infer_mime_type("x.JPG", ""), "image/jpeg");
        assert_eq!(infer_mime_type("comprovante", "UklGRiQ"), "image/webp");
        assert_eq!(infer_mime_type("comprovante", "AAAA"), "application/octet-stream");
    }
}
