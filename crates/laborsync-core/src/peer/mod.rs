//! Signaling-free peer channel.
//!
//! Two people establish a direct data channel without any rendezvous server
//! by manually relaying two short SDP-derived codes (QR or copy-paste). The
//! host creates an offer code; the guest accepts it and hands back an answer
//! code; both sides then wait for the data channel to open, with bounded
//! timeouts and cooperative cancellation at every suspension point.

pub mod diagnostics;
pub mod guest;
pub mod host;
pub mod memory;
pub mod sdp;
pub mod signaling;

pub use diagnostics::{CandidateKind, IceGatheringResult};
pub use guest::{accept_offer, AcceptedOffer};
pub use host::{create_offer, PendingOffer, CHANNEL_LABEL};
pub use memory::{create_memory_pair, MemoryChannel, MemoryEndpoint, MemoryProfile};
pub use sdp::{compress_answer, compress_offer, decompress_answer, decompress_offer};
pub use signaling::{DataChannel, GatheringEvent, PeerConfig, PeerEndpoint, SignalingState};

/// An established peer connection: the endpoint and its open data channel.
pub struct PeerConnection<E: PeerEndpoint> {
    endpoint: E,
    channel: E::Channel,
}

impl<E: PeerEndpoint> std::fmt::Debug for PeerConnection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("state", &self.endpoint.signaling_state())
            .finish_non_exhaustive()
    }
}

impl<E: PeerEndpoint> PeerConnection<E> {
    fn new(endpoint: E, channel: E::Channel) -> Self {
        Self { endpoint, channel }
    }

    pub fn channel(&self) -> &E::Channel {
        &self.channel
    }

    /// Close the channel and the underlying connection.
    pub fn close(self) {
        self.channel.close();
        self.endpoint.close();
    }
}
