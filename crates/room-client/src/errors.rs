//! Room client error types.
//!
//! Every asynchronous boundary (credential fetch, room connect, recording
//! poll, chat send) catches its own failure and logs it; these types carry
//! the failure to that boundary. [`ClientError::user_message`] gives the short
//! text shown to the user; internal detail stays in logs.

use thiserror::Error;

/// Room client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Access token could not be obtained.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The SDK failed to establish the room connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Recording status request failed (transient).
    #[error("Recording poll error: {0}")]
    Poll(String),

    /// Chat payload could not be handed to an outbound data track.
    #[error("Chat delivery warning: {0}")]
    Delivery(String),

    /// Join form input was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A session is already connecting or connected.
    #[error("Already joined")]
    AlreadyJoined,

    /// The pending join was superseded by leave or shutdown.
    #[error("Join cancelled")]
    JoinCancelled,

    /// Internal error (actor mailbox closed, client construction failed).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token issuance failures.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Backend unreachable, timed out or returned 5xx.
    #[error("Token service unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request.
    #[error("Token request rejected with status {status}")]
    Rejected { status: u16 },

    /// Response parsed but carried no token.
    #[error("Token missing from response")]
    MissingToken,

    /// Response body was not the expected JSON.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

/// Join form validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Display name or room name was empty.
    #[error("Enter name & room")]
    MissingFields,
}

impl ClientError {
    /// Returns a user-facing message (no internal details).
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Credential(_) => {
                "Could not get access to the room, please try again".to_string()
            }
            ClientError::Connection(_) => "Could not connect to the room".to_string(),
            ClientError::Poll(_) => "Recording status is temporarily unavailable".to_string(),
            ClientError::Delivery(_) => "Message may not have been delivered".to_string(),
            ClientError::Validation(e) => e.to_string(),
            ClientError::AlreadyJoined => "Already in a room".to_string(),
            ClientError::JoinCancelled => "Join was cancelled".to_string(),
            ClientError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}
