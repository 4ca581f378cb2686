//! Platform seam for the peer channel.
//!
//! The handshake state machines in [`super::host`] and [`super::guest`] are
//! written against these traits rather than a concrete WebRTC stack, so the
//! same logic drives a real peer connection and the deterministic in-memory
//! endpoint used by tests and the CLI loopback demo.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::SnapshotResult;

use super::diagnostics::{CandidateKind, IceGatheringResult};

/// Peer connection configuration. Both timeouts are deliberately generous:
/// TURN relay allocation alone can take 15-25s on slow networks.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// STUN/TURN server URLs
    pub ice_servers: Vec<String>,
    /// Upper bound on ICE candidate gathering
    pub ice_gather_timeout: Duration,
    /// Upper bound on the data channel transitioning to open
    pub channel_open_timeout: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_string(),
                "stun:stun1.l.google.com:19302".to_string(),
            ],
            ice_gather_timeout: Duration::from_secs(45),
            channel_open_timeout: Duration::from_secs(60),
        }
    }
}

/// Signaling state of a peer connection, mirroring the WebRTC state names
/// the handshake cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// One step of ICE gathering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatheringEvent {
    Candidate(CandidateKind),
    Complete,
}

/// A peer connection endpoint. One handshake per endpoint; after a terminal
/// state the endpoint is only good for `close`.
pub trait PeerEndpoint: Send + Sync + 'static {
    type Channel: DataChannel;

    /// Create the outbound data channel (host side, before the offer).
    async fn create_channel(&self, label: &str) -> SnapshotResult<Self::Channel>;

    /// Wait for the remote-created data channel (guest side).
    async fn incoming_channel(&self) -> SnapshotResult<Self::Channel>;

    /// Create a local offer and set it as the local description.
    async fn create_offer(&self) -> SnapshotResult<String>;

    /// Apply a remote offer (guest side).
    async fn apply_offer(&self, sdp: &str) -> SnapshotResult<()>;

    /// Create a local answer and set it as the local description (guest).
    async fn create_answer(&self) -> SnapshotResult<String>;

    /// Apply a remote answer (host side).
    async fn apply_answer(&self, sdp: &str) -> SnapshotResult<()>;

    fn signaling_state(&self) -> SignalingState;

    /// Next ICE gathering event; `None` once the stream is exhausted.
    async fn next_gathering_event(&self) -> Option<GatheringEvent>;

    /// Close the connection and release its resources. Idempotent.
    fn close(&self);
}

/// An established (or establishing) data channel.
pub trait DataChannel: Send + Sync + 'static {
    /// Resolve once the channel is open; error if it closed first.
    async fn wait_open(&self) -> SnapshotResult<()>;

    async fn send(&self, data: &[u8]) -> SnapshotResult<()>;

    /// `Ok(None)` on clean close.
    async fn recv(&self) -> SnapshotResult<Option<Vec<u8>>>;

    fn close(&self);
}

/// Endpoints are usually moved into the handshake; an `Arc` works too when
/// the caller needs to keep a handle (e.g. to close from another task).
impl<E: PeerEndpoint> PeerEndpoint for std::sync::Arc<E> {
    type Channel = E::Channel;

    async fn create_channel(&self, label: &str) -> SnapshotResult<Self::Channel> {
        (**self).create_channel(label).await
    }

    async fn incoming_channel(&self) -> SnapshotResult<Self::Channel> {
        (**self).incoming_channel().await
    }

    async fn create_offer(&self) -> SnapshotResult<String> {
        (**self).create_offer().await
    }

    async fn apply_offer(&self, sdp: &str) -> SnapshotResult<()> {
        (**self).apply_offer(sdp).await
    }

    async fn create_answer(&self) -> SnapshotResult<String> {
        (**self).create_answer().await
    }

    async fn apply_answer(&self, sdp: &str) -> SnapshotResult<()> {
        (**self).apply_answer(sdp).await
    }

    fn signaling_state(&self) -> SignalingState {
        (**self).signaling_state()
    }

    async fn next_gathering_event(&self) -> Option<GatheringEvent> {
        (**self).next_gathering_event().await
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Drain gathering events until completion or the timeout, whichever comes
/// first. A timeout is not an error: partial candidate counts are exactly
/// what a failure report needs.
pub async fn gather_ice<E: PeerEndpoint>(endpoint: &E, timeout: Duration) -> IceGatheringResult {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut result = IceGatheringResult::default();

    loop {
        let event = match tokio::time::timeout_at(deadline, endpoint.next_gathering_event()).await {
            Ok(event) => event,
            Err(_) => {
                result.gather_time_ms = started.elapsed().as_millis() as u64;
                debug!(
                    candidates = result.candidate_count,
                    "ICE gathering timed out before completing"
                );
                return result;
            }
        };

        match event {
            Some(GatheringEvent::Candidate(kind)) => result.record(kind),
            Some(GatheringEvent::Complete) | None => {
                result.complete = true;
                result.gather_time_ms = started.elapsed().as_millis() as u64;
                debug!(
                    candidates = result.candidate_count,
                    host = result.host_candidates,
                    srflx = result.srflx_candidates,
                    relay = result.relay_candidates,
                    ms = result.gather_time_ms,
                    "ICE gathering complete"
                );
                return result;
            }
        }
    }
}
