//! Deterministic in-process peer endpoints.
//!
//! A [`create_memory_pair`] behaves like two peer connections whose network
//! happens to be a pair of channels: the handshake state machine, gathering
//! events, and channel-open transitions all run for real, but with scripted
//! candidates and no actual sockets. Tests and the CLI loopback demo use it
//! to drive the host/guest machines end to end, including the failure paths
//! (stalled gathering, a channel that never opens).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use crate::error::{SnapshotError, SnapshotResult};

use super::diagnostics::CandidateKind;
use super::signaling::{DataChannel, GatheringEvent, PeerEndpoint, SignalingState};

const FAKE_SDP: &str = "v=0\r\no=- 0 1 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelPhase {
    Pending,
    Open,
    Closed,
}

/// Scripted behavior for one endpoint of a memory pair.
#[derive(Debug, Clone)]
pub struct MemoryProfile {
    /// Candidates emitted during gathering, in order
    pub candidates: Vec<CandidateKind>,
    /// When false, gathering never completes (exercises the gather timeout)
    pub complete_gathering: bool,
    /// When false (host side), the channel never opens after the answer is
    /// applied (exercises the channel-open timeout)
    pub open_on_connect: bool,
}

impl Default for MemoryProfile {
    fn default() -> Self {
        Self {
            candidates: vec![CandidateKind::Host, CandidateKind::Srflx],
            complete_gathering: true,
            open_on_connect: true,
        }
    }
}

struct Link {
    phase: watch::Sender<ChannelPhase>,
    open_on_connect: bool,
    incoming_tx: mpsc::UnboundedSender<MemoryChannel>,
    incoming_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryChannel>>,
}

/// One side of an in-memory peer pair.
pub struct MemoryEndpoint {
    state: Mutex<SignalingState>,
    events: Mutex<VecDeque<GatheringEvent>>,
    stall_gathering: bool,
    closed: AtomicBool,
    link: Arc<Link>,
}

/// In-memory data channel backed by unbounded byte pipes.
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    phase: watch::Receiver<ChannelPhase>,
    phase_tx: Arc<watch::Sender<ChannelPhase>>,
}

/// Build a connected host/guest endpoint pair with scripted gathering.
pub fn create_memory_pair(
    host_profile: MemoryProfile,
    guest_profile: MemoryProfile,
) -> (MemoryEndpoint, MemoryEndpoint) {
    let (phase, _) = watch::channel(ChannelPhase::Pending);
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let link = Arc::new(Link {
        phase,
        open_on_connect: host_profile.open_on_connect,
        incoming_tx,
        incoming_rx: tokio::sync::Mutex::new(incoming_rx),
    });

    let endpoint = |profile: &MemoryProfile| {
        let mut events: VecDeque<GatheringEvent> = profile
            .candidates
            .iter()
            .map(|&kind| GatheringEvent::Candidate(kind))
            .collect();
        if profile.complete_gathering {
            events.push_back(GatheringEvent::Complete);
        }
        MemoryEndpoint {
            state: Mutex::new(SignalingState::Stable),
            events: Mutex::new(events),
            stall_gathering: !profile.complete_gathering,
            closed: AtomicBool::new(false),
            link: Arc::clone(&link),
        }
    };

    (endpoint(&host_profile), endpoint(&guest_profile))
}

fn validate_sdp(sdp: &str) -> SnapshotResult<()> {
    if !sdp.starts_with("v=0") {
        return Err(SnapshotError::MalformedInput(
            "unparseable SDP: missing version line".to_string(),
        ));
    }
    Ok(())
}

impl PeerEndpoint for MemoryEndpoint {
    type Channel = MemoryChannel;

    async fn create_channel(&self, _label: &str) -> SnapshotResult<Self::Channel> {
        let (to_remote, from_local) = mpsc::unbounded_channel();
        let (to_local, from_remote) = mpsc::unbounded_channel();
        let phase_tx = Arc::new(self.link.phase.clone());

        let local = MemoryChannel {
            tx: to_remote,
            rx: tokio::sync::Mutex::new(from_remote),
            phase: self.link.phase.subscribe(),
            phase_tx: Arc::clone(&phase_tx),
        };
        let remote = MemoryChannel {
            tx: to_local,
            rx: tokio::sync::Mutex::new(from_local),
            phase: self.link.phase.subscribe(),
            phase_tx,
        };

        self.link
            .incoming_tx
            .send(remote)
            .map_err(|_| SnapshotError::PeerChannel("remote endpoint gone".to_string()))?;
        Ok(local)
    }

    async fn incoming_channel(&self) -> SnapshotResult<Self::Channel> {
        self.link
            .incoming_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| SnapshotError::PeerChannel("remote endpoint gone".to_string()))
    }

    async fn create_offer(&self) -> SnapshotResult<String> {
        let mut state = self.state.lock();
        if *state != SignalingState::Stable {
            return Err(SnapshotError::InvalidState(format!(
                "cannot create offer in state {state:?}"
            )));
        }
        *state = SignalingState::HaveLocalOffer;
        Ok(FAKE_SDP.to_string())
    }

    async fn apply_offer(&self, sdp: &str) -> SnapshotResult<()> {
        validate_sdp(sdp)?;
        let mut state = self.state.lock();
        if *state != SignalingState::Stable {
            return Err(SnapshotError::InvalidState(format!(
                "cannot apply offer in state {state:?}"
            )));
        }
        *state = SignalingState::HaveRemoteOffer;
        Ok(())
    }

    async fn create_answer(&self) -> SnapshotResult<String> {
        let mut state = self.state.lock();
        if *state != SignalingState::HaveRemoteOffer {
            return Err(SnapshotError::InvalidState(format!(
                "cannot create answer in state {state:?}"
            )));
        }
        *state = SignalingState::Stable;
        Ok(FAKE_SDP.to_string())
    }

    async fn apply_answer(&self, sdp: &str) -> SnapshotResult<()> {
        validate_sdp(sdp)?;
        let mut state = self.state.lock();
        if *state != SignalingState::HaveLocalOffer {
            return Err(SnapshotError::InvalidState(format!(
                "cannot apply answer in state {state:?}"
            )));
        }
        *state = SignalingState::Stable;
        drop(state);

        if self.link.open_on_connect {
            self.link.phase.send_replace(ChannelPhase::Open);
        }
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        if self.closed.load(Ordering::SeqCst) {
            return SignalingState::Closed;
        }
        *self.state.lock()
    }

    async fn next_gathering_event(&self) -> Option<GatheringEvent> {
        // Yield so concurrent drivers make progress deterministically
        tokio::task::yield_now().await;
        let next = self.events.lock().pop_front();
        match next {
            Some(event) => Some(event),
            None if self.stall_gathering => std::future::pending().await,
            None => None,
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock() = SignalingState::Closed;
        self.link.phase.send_replace(ChannelPhase::Closed);
    }
}

impl DataChannel for MemoryChannel {
    async fn wait_open(&self) -> SnapshotResult<()> {
        let mut phase = self.phase.clone();
        loop {
            match *phase.borrow_and_update() {
                ChannelPhase::Open => return Ok(()),
                ChannelPhase::Closed => {
                    return Err(SnapshotError::PeerChannel(
                        "channel closed before opening".to_string(),
                    ))
                }
                ChannelPhase::Pending => {}
            }
            if phase.changed().await.is_err() {
                return Err(SnapshotError::PeerChannel(
                    "endpoint dropped".to_string(),
                ));
            }
        }
    }

    async fn send(&self, data: &[u8]) -> SnapshotResult<()> {
        if *self.phase.borrow() == ChannelPhase::Closed {
            return Err(SnapshotError::PeerChannel("channel is closed".to_string()));
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| SnapshotError::PeerChannel("remote side closed".to_string()))
    }

    async fn recv(&self) -> SnapshotResult<Option<Vec<u8>>> {
        Ok(self.rx.lock().await.recv().await)
    }

    fn close(&self) {
        self.phase_tx.send_replace(ChannelPhase::Closed);
    }
}
