//! Secret types for protecting room credentials from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The room access
//! token issued by the backend is a bearer credential: anyone holding it can
//! join the room as the identity it was minted for, so it is carried as a
//! [`SecretString`] from the moment it is parsed until it is handed to the
//! SDK connector.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that holds one is safe to log via `{:?}` or tracing fields.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct Credential {
//!     room: String,
//!     token: SecretString,
//! }
//!
//! let credential = Credential {
//!     room: "standup".to_string(),
//!     token: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! // Safe: the token is redacted
//! let _ = format!("{credential:?}");
//!
//! // Reading the value is always explicit
//! let _raw: &str = credential.token.expose_secret();
//! ```
//!
//! # Serde Integration
//!
//! With the `serde` feature enabled, secrets deserialize straight out of a
//! backend response:
//!
//! ```rust
//! use serde::Deserialize;
//! use common::secret::SecretString;
//!
//! #[derive(Debug, Deserialize)]
//! struct TokenBody {
//!     token: SecretString,
//! }
//!
//! let body: TokenBody = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("room-token-value");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("room-token-value"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("abc.def.ghi");
        assert_eq!(secret.expose_secret(), "abc.def.ghi");
    }

    #[test]
    fn test_token_body_deserialize_keeps_value_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct TokenBody {
            token: SecretString,
        }

        let json = r#"{"token": "issued-token"}"#;
        let body: TokenBody = serde_json::from_str(json).expect("deserialize");

        assert_eq!(body.token.expose_secret(), "issued-token");

        let debug = format!("{body:?}");
        assert!(!debug.contains("issued-token"));
        assert!(debug.contains("REDACTED"));
    }
}
