//! Recording poller background task.
//!
//! Polls the backend for the recording status of a connected room until a
//! recording is reported ready. The first request fires one interval after
//! start, then once per interval. Failed requests are logged and retried at
//! the next tick.
//!
//! # Graceful Shutdown
//!
//! The task is bound to a connection-scoped cancellation token. Leaving the
//! room, losing the connection or unmounting the session cancels it; no
//! request is issued after cancellation.

use crate::models::DownloadInfo;
use crate::services::BackendApi;

use common::types::RoomSid;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Poll recording status until it is ready or the token is cancelled.
///
/// # Arguments
///
/// * `backend` - Backend collaborator
/// * `room_sid` - Room whose recording is polled
/// * `interval` - Delay before the first request and between requests
/// * `cancel_token` - Connection-scoped token
///
/// # Returns
///
/// `Some(DownloadInfo)` once the backend reports `ready: true`, `None` when
/// cancelled first.
#[instrument(skip_all, name = "room.poller", fields(room_sid = %room_sid))]
pub async fn poll_recording_until_ready(
    backend: Arc<dyn BackendApi>,
    room_sid: RoomSid,
    interval: Duration,
    cancel_token: CancellationToken,
) -> Option<DownloadInfo> {
    debug!(
        target: "room.poller",
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        "Starting recording poller"
    );

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                debug!(target: "room.poller", "Recording poller cancelled");
                return None;
            }
            _ = ticker.tick() => {
                let result = tokio::select! {
                    biased;
                    () = cancel_token.cancelled() => {
                        debug!(target: "room.poller", "Recording poller cancelled mid-request");
                        return None;
                    }
                    result = backend.recording_status(&room_sid) => result,
                };

                match result {
                    Ok(status) if status.ready => {
                        info!(target: "room.poller", "Recording ready");
                        return Some(DownloadInfo::from_status(status));
                    }
                    Ok(_) => {
                        debug!(target: "room.poller", "Recording not ready yet");
                    }
                    Err(e) => {
                        // Transient; retry at the next tick
                        warn!(target: "room.poller", error = %e, "Recording status poll failed");
                    }
                }
            }
        }
    }
}
