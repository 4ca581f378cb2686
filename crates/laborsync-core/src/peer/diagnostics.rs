//! Connection diagnostics for troubleshooting failed handshakes.

use serde::{Deserialize, Serialize};

/// ICE candidate type as reported during gathering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Local interface address
    Host,
    /// Server-reflexive (via STUN)
    Srflx,
    /// Relayed (via TURN)
    Relay,
}

/// What ICE gathering produced, kept even on timeout so failure reports can
/// say "no relay candidates" instead of just "it failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceGatheringResult {
    pub candidate_count: u32,
    pub host_candidates: u32,
    pub srflx_candidates: u32,
    pub relay_candidates: u32,
    pub gather_time_ms: u64,
    /// False when gathering hit the timeout before completing
    pub complete: bool,
}

impl IceGatheringResult {
    pub fn record(&mut self, kind: CandidateKind) {
        self.candidate_count += 1;
        match kind {
            CandidateKind::Host => self.host_candidates += 1,
            CandidateKind::Srflx => self.srflx_candidates += 1,
            CandidateKind::Relay => self.relay_candidates += 1,
        }
    }

    /// Whether a cross-network connection is plausible: anything beyond
    /// plain host candidates.
    pub fn has_public_path(&self) -> bool {
        self.srflx_candidates > 0 || self.relay_candidates > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tallies_by_kind() {
        let mut result = IceGatheringResult::default();
        result.record(CandidateKind::Host);
        result.record(CandidateKind::Host);
        result.record(CandidateKind::Srflx);
        result.record(CandidateKind::Relay);

        assert_eq!(result.candidate_count, 4);
        assert_eq!(result.host_candidates, 2);
        assert_eq!(result.srflx_candidates, 1);
        assert_eq!(result.relay_candidates, 1);
        assert!(result.has_public_path());
    }

    #[test]
    fn test_host_only_has_no_public_path() {
        let mut result = IceGatheringResult::default();
        result.record(CandidateKind::Host);
        assert!(!result.has_public_path());
    }
}
