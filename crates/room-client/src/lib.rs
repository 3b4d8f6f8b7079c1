//! Room Client Library
//!
//! Client-side session and state synchronization for the Pro Video
//! multi-party video chat. Media transport, signaling and track negotiation
//! belong to the conferencing SDK; token issuance and recordings belong to
//! the backend. This crate is the thin layer between them and the screen:
//!
//! - Join a named room with a short-lived token
//! - Track the live roster of remote participants
//! - Render local and remote feeds, with one participant pinned to the main view
//! - Exchange text chat over the room's data tracks
//! - Offer the room recording for download once the backend has it
//!
//! # Architecture
//!
//! ```text
//! AppShell (join form)
//! └── RoomSession actor ──► BackendApi (token, recording status)
//!     │                 └─► RoomConnector ──► Room (SDK)
//!     ├── recording poller (connection-scoped task)
//!     ├── ChatChannel actor (data tracks)
//!     └── Stage ──► ParticipantView actors ──► Canvas surfaces
//! ```
//!
//! Everything runs on the tokio runtime. State flows one way: actors own
//! their state and publish snapshots on `watch` channels.
//!
//! # Modules
//!
//! - [`actors`] - Room Session, Chat Channel and Participant View actors
//! - [`config`] - Client configuration from environment
//! - [`errors`] - Error taxonomy with user-facing messages
//! - [`models`] - Backend and chat wire shapes
//! - [`sdk`] - Capability traits over the conferencing SDK
//! - [`services`] - Backend HTTP client
//! - [`session`] - Roster, pin selection and session state
//! - [`shell`] - App Shell
//! - [`tasks`] - Recording poller
//! - [`ui`] - Surfaces, canvas and stage

pub mod actors;
pub mod config;
pub mod errors;
pub mod models;
pub mod sdk;
pub mod services;
pub mod session;
pub mod shell;
pub mod tasks;
pub mod ui;

pub use shell::AppShell;
