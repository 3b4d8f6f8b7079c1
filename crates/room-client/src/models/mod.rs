//! Room client models.
//!
//! Wire shapes exchanged with the backend and over the chat data track, plus
//! the client-local chat log entry.

use common::secret::SecretString;
use serde::{Deserialize, Serialize};

/// Author recorded for locally echoed chat messages.
pub const LOCAL_AUTHOR: &str = "Me";

/// Author used when a remote participant has no identity.
pub const REMOTE_AUTHOR: &str = "Remote";

/// Payload discriminator for chat messages.
pub const CHAT_PAYLOAD_TYPE: &str = "chat";

// ============================================================================
// Backend API Models
// ============================================================================

/// Request body for `POST /token`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    /// Display name the token is minted for.
    pub identity: String,

    /// Room to join.
    pub room: String,
}

/// Response body for `POST /token`.
///
/// `token` is optional on the wire; its absence is a credential failure.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<SecretString>,
}

/// Response body for `GET /recordings/{room_sid}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordingStatus {
    pub ready: bool,

    /// Path of the recording file, relative to the backend base URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Recording download information, immutable once ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub ready: bool,
    pub url: String,
}

impl DownloadInfo {
    /// Build from a status that reported readiness.
    #[must_use]
    pub fn from_status(status: RecordingStatus) -> Self {
        Self {
            ready: status.ready,
            url: status.url.unwrap_or_default(),
        }
    }

    /// Absolute download link, `None` when the backend gave no path.
    #[must_use]
    pub fn download_url(&self, api_base_url: &str) -> Option<String> {
        if !self.ready || self.url.is_empty() {
            return None;
        }
        Some(format!("{api_base_url}{}", self.url))
    }
}

// ============================================================================
// Chat Models
// ============================================================================

/// One entry of the client-local chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Decode an inbound data-track payload.
    ///
    /// Structured chat payloads yield their own author; anything else is kept
    /// verbatim and attributed to `fallback_author`.
    pub fn decode(payload: &str, fallback_author: &str) -> Self {
        match serde_json::from_str::<ChatPayload>(payload) {
            Ok(chat) if chat.kind == CHAT_PAYLOAD_TYPE => Self::new(chat.from, chat.text),
            _ => Self::new(fallback_author, payload),
        }
    }
}

/// Structured chat payload sent over the data track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub from: String,
    pub text: String,
}

impl ChatPayload {
    pub fn new(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: CHAT_PAYLOAD_TYPE.to_string(),
            from: from.into(),
            text: text.into(),
        }
    }

    /// Encode as JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Fallback author for payloads from `identity`.
#[must_use]
pub fn fallback_author(identity: &str) -> &str {
    if identity.is_empty() {
        REMOTE_AUTHOR
    } else {
        identity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_token_request_serialization() {
        let request = TokenRequest {
            identity: "alice".to_string(),
            room: "standup".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"identity": "alice", "room": "standup"}));
    }

    #[test]
    fn test_token_response_without_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert!(response.token.is_none());
    }

    #[test]
    fn test_token_response_with_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"token":"eyJ..."}"#).unwrap();
        assert_eq!(response.token.unwrap().expose_secret(), "eyJ...");
    }

    #[test]
    fn test_recording_status_url_optional() {
        let status: RecordingStatus = serde_json::from_str(r#"{"ready":false}"#).unwrap();
        assert_eq!(
            status,
            RecordingStatus {
                ready: false,
                url: None
            }
        );
    }

    #[test]
    fn test_download_url_joins_base() {
        let info = DownloadInfo::from_status(RecordingStatus {
            ready: true,
            url: Some("/recordings-files/RM1.mp4".to_string()),
        });
        assert_eq!(
            info.download_url("http://localhost:5000").as_deref(),
            Some("http://localhost:5000/recordings-files/RM1.mp4")
        );
    }

    #[test]
    fn test_download_url_absent_without_path() {
        let info = DownloadInfo::from_status(RecordingStatus {
            ready: true,
            url: None,
        });
        assert_eq!(info.download_url("http://localhost:5000"), None);
    }

    #[test]
    fn test_chat_payload_encoding() {
        let encoded = ChatPayload::new("Bob", "hi").encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "chat", "from": "Bob", "text": "hi"})
        );
    }

    #[test]
    fn test_decode_structured_payload() {
        let message = ChatMessage::decode(r#"{"type":"chat","from":"Bob","text":"hi"}"#, "PA1");
        assert_eq!(message, ChatMessage::new("Bob", "hi"));
    }

    #[test]
    fn test_decode_raw_text_uses_fallback() {
        let message = ChatMessage::decode("raw text", "carol");
        assert_eq!(message, ChatMessage::new("carol", "raw text"));
    }

    #[test]
    fn test_decode_other_type_is_raw() {
        let payload = r#"{"type":"typing","from":"Bob","text":""}"#;
        let message = ChatMessage::decode(payload, "carol");
        assert_eq!(message, ChatMessage::new("carol", payload));
    }

    #[test]
    fn test_decode_missing_fields_is_raw() {
        let payload = r#"{"type":"chat","from":"Bob"}"#;
        let message = ChatMessage::decode(payload, "carol");
        assert_eq!(message.text, payload);
    }

    #[test]
    fn test_fallback_author() {
        assert_eq!(fallback_author(""), "Remote");
        assert_eq!(fallback_author("dave"), "dave");
    }
}
