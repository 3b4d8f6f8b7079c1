//! Background tasks.
//!
//! - `recording_poller` - polls recording status until ready

pub mod recording_poller;

pub use recording_poller::poll_recording_until_ready;
