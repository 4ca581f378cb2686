//! Host side of the handshake:
//! `idle → offer-created → awaiting-answer → connected | failed | cancelled`.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SnapshotError, SnapshotResult};

use super::diagnostics::IceGatheringResult;
use super::sdp::{compress_offer, decompress_answer};
use super::signaling::{gather_ice, DataChannel, PeerConfig, PeerEndpoint, SignalingState};
use super::PeerConnection;

/// Label used for the data channel on every connection.
pub const CHANNEL_LABEL: &str = "ls-sync";

/// An offer the host has published and is waiting to hear back on.
///
/// `wait_for_answer` can only exist after the offer code does, so the
/// ordering guarantee is structural. Consuming `self` enforces one attempt
/// per connection.
pub struct PendingOffer<E: PeerEndpoint> {
    endpoint: E,
    channel: E::Channel,
    config: PeerConfig,
    cancel: CancellationToken,
    /// Compressed offer code to hand to the guest
    pub offer_code: String,
    /// What ICE gathering produced while building the offer
    pub ice_result: IceGatheringResult,
}

impl<E: PeerEndpoint> std::fmt::Debug for PendingOffer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOffer")
            .field("state", &self.endpoint.signaling_state())
            .field("offer_code_len", &self.offer_code.len())
            .field("ice_result", &self.ice_result)
            .finish_non_exhaustive()
    }
}

/// Create a data channel and local offer on `endpoint`, gather ICE
/// candidates (bounded), and compress the result into an offer code.
pub async fn create_offer<E: PeerEndpoint>(
    endpoint: E,
    config: PeerConfig,
) -> SnapshotResult<PendingOffer<E>> {
    let channel = match endpoint.create_channel(CHANNEL_LABEL).await {
        Ok(channel) => channel,
        Err(e) => {
            endpoint.close();
            return Err(e);
        }
    };

    let sdp = match endpoint.create_offer().await {
        Ok(sdp) => sdp,
        Err(e) => {
            endpoint.close();
            return Err(e);
        }
    };

    let ice_result = gather_ice(&endpoint, config.ice_gather_timeout).await;
    if !ice_result.has_public_path() {
        warn!(
            candidates = ice_result.candidate_count,
            "only host candidates gathered, cross-network connections may fail"
        );
    }

    let offer_code = compress_offer(&sdp);
    debug!(
        code_len = offer_code.len(),
        candidates = ice_result.candidate_count,
        "offer created"
    );

    Ok(PendingOffer {
        endpoint,
        channel,
        config,
        cancel: CancellationToken::new(),
        offer_code,
        ice_result,
    })
}

impl<E: PeerEndpoint> PendingOffer<E> {
    /// Token other tasks can use to cancel this handshake.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel and release the connection without waiting for an answer.
    pub fn cancel(self) {
        self.cancel.cancel();
        self.channel.close();
        self.endpoint.close();
    }

    /// Apply the guest's answer code and wait (bounded) for the data channel
    /// to open. The connection is closed on every failure path.
    pub async fn wait_for_answer(self, answer_code: &str) -> SnapshotResult<PeerConnection<E>> {
        if self.cancel.is_cancelled() {
            self.endpoint.close();
            return Err(SnapshotError::Cancelled(
                "connection was cancelled".to_string(),
            ));
        }

        // Stale or reused codes leave the connection out of have-local-offer;
        // fail fast instead of feeding them to the stack.
        let state = self.endpoint.signaling_state();
        if state != SignalingState::HaveLocalOffer {
            self.endpoint.close();
            return Err(SnapshotError::Expired(format!(
                "connection expired (state {state:?}), create a new invite"
            )));
        }

        let answer_sdp = match decompress_answer(answer_code) {
            Ok(sdp) => sdp,
            Err(e) => {
                self.endpoint.close();
                return Err(e);
            }
        };

        if let Err(e) = self.endpoint.apply_answer(&answer_sdp).await {
            self.endpoint.close();
            return Err(e);
        }

        debug!("answer applied, waiting for data channel to open");
        let opened = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.endpoint.close();
                return Err(SnapshotError::Cancelled(
                    "connection was cancelled".to_string(),
                ));
            }
            opened = tokio::time::timeout(self.config.channel_open_timeout, self.channel.wait_open()) => opened,
        };

        match opened {
            Err(_) => {
                self.endpoint.close();
                Err(SnapshotError::Timeout(format!(
                    "data channel open timed out ({}s), relay may be unreachable",
                    self.config.channel_open_timeout.as_secs()
                )))
            }
            Ok(Err(e)) => {
                self.endpoint.close();
                Err(e)
            }
            Ok(Ok(())) => {
                debug!("data channel open (host)");
                Ok(PeerConnection::new(self.endpoint, self.channel))
            }
        }
    }
}
