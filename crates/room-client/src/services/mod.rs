//! Services that talk to external collaborators.
//!
//! - `backend_client` - token issuance and recording status over HTTP

pub mod backend_client;

pub use backend_client::{BackendApi, BackendClient};
