//! Guest side of the handshake:
//! `idle → offer-accepted → awaiting-channel → connected | failed`.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};

use super::diagnostics::IceGatheringResult;
use super::sdp::{compress_answer, decompress_offer};
use super::signaling::{gather_ice, DataChannel, PeerConfig, PeerEndpoint};
use super::PeerConnection;

/// An accepted offer: the answer code is ready to hand back to the host, and
/// the guest is waiting for the host-created channel to arrive and open.
pub struct AcceptedOffer<E: PeerEndpoint> {
    endpoint: E,
    config: PeerConfig,
    cancel: CancellationToken,
    /// Compressed answer code to hand back to the host
    pub answer_code: String,
    /// What ICE gathering produced while building the answer
    pub ice_result: IceGatheringResult,
}

impl<E: PeerEndpoint> std::fmt::Debug for AcceptedOffer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptedOffer")
            .field("state", &self.endpoint.signaling_state())
            .field("answer_code_len", &self.answer_code.len())
            .field("ice_result", &self.ice_result)
            .finish_non_exhaustive()
    }
}

/// Decompress and apply the host's offer, produce a local answer, gather ICE
/// candidates (bounded), and compress the answer into a code.
pub async fn accept_offer<E: PeerEndpoint>(
    endpoint: E,
    offer_code: &str,
    config: PeerConfig,
) -> SnapshotResult<AcceptedOffer<E>> {
    let offer_sdp = match decompress_offer(offer_code) {
        Ok(sdp) => sdp,
        Err(e) => {
            endpoint.close();
            return Err(SnapshotError::MalformedInput(format!(
                "invalid invite code: {e}"
            )));
        }
    };

    if let Err(e) = endpoint.apply_offer(&offer_sdp).await {
        endpoint.close();
        return Err(SnapshotError::MalformedInput(format!(
            "failed to process invite: {e}"
        )));
    }

    let answer_sdp = match endpoint.create_answer().await {
        Ok(sdp) => sdp,
        Err(e) => {
            endpoint.close();
            return Err(e);
        }
    };

    let ice_result = gather_ice(&endpoint, config.ice_gather_timeout).await;
    let answer_code = compress_answer(&answer_sdp);
    debug!(
        code_len = answer_code.len(),
        candidates = ice_result.candidate_count,
        "answer created"
    );

    Ok(AcceptedOffer {
        endpoint,
        config,
        cancel: CancellationToken::new(),
        answer_code,
        ice_result,
    })
}

impl<E: PeerEndpoint> AcceptedOffer<E> {
    /// Token other tasks can use to cancel this handshake.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel and release the connection without waiting for the channel.
    pub fn cancel(self) {
        self.cancel.cancel();
        self.endpoint.close();
    }

    /// Wait (bounded) for the host-created data channel to arrive and open.
    /// The connection is closed on every failure path.
    pub async fn wait_for_connection(self) -> SnapshotResult<PeerConnection<E>> {
        if self.cancel.is_cancelled() {
            self.endpoint.close();
            return Err(SnapshotError::Cancelled(
                "connection was cancelled".to_string(),
            ));
        }

        let timeout = self.config.channel_open_timeout;
        let connected = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.endpoint.close();
                return Err(SnapshotError::Cancelled(
                    "connection was cancelled".to_string(),
                ));
            }
            connected = tokio::time::timeout(timeout, async {
                let channel = self.endpoint.incoming_channel().await?;
                debug!("received data channel from host, waiting for open");
                channel.wait_open().await?;
                Ok::<_, SnapshotError>(channel)
            }) => connected,
        };

        match connected {
            Err(_) => {
                self.endpoint.close();
                Err(SnapshotError::Timeout(format!(
                    "data channel open timed out ({}s), relay may be unreachable",
                    timeout.as_secs()
                )))
            }
            Ok(Err(e)) => {
                self.endpoint.close();
                Err(e)
            }
            Ok(Ok(channel)) => {
                debug!("data channel open (guest)");
                Ok(PeerConnection::new(self.endpoint, channel))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::memory::{create_memory_pair, MemoryProfile};

    #[tokio::test]
    async fn test_invalid_offer_code_fails_descriptively() {
        let (_host, guest) =
            create_memory_pair(MemoryProfile::default(), MemoryProfile::default());
        let err = accept_offer(guest, "not-a-code", PeerConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid invite code"));
    }

    #[tokio::test]
    async fn test_invalid_offer_code_closes_endpoint() {
        let (_host, guest) =
            create_memory_pair(MemoryProfile::default(), MemoryProfile::default());
        let guest = std::sync::Arc::new(guest);
        let err = accept_offer(std::sync::Arc::clone(&guest), "not-a-code", PeerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedInput(_)));
        assert_eq!(guest.signaling_state(), crate::peer::SignalingState::Closed);
    }

    #[tokio::test]
    async fn test_answer_code_and_diagnostics() {
        let (host, guest) = create_memory_pair(MemoryProfile::default(), MemoryProfile::default());
        let pending = crate::peer::host::create_offer(host, PeerConfig::default())
            .await
            .unwrap();

        let accepted = accept_offer(guest, &pending.offer_code, PeerConfig::default())
            .await
            .unwrap();
        assert!(accepted.answer_code.starts_with("lsa."));
        assert!(accepted.ice_result.complete);
    }
}
