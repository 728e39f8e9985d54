//! Mock peer transports
//!
//! In-memory [`PeerTransportFactory`] for tests. Created transports can be
//! killed (simulating a transport failing without a leave event), creation
//! can be scripted to fail per participant, and close calls are observable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{SessionError, SessionResult};
use crate::peer::registry::{PeerTransport, PeerTransportFactory, RemoteStream, RemoteStreamRef};
use crate::session::types::ParticipantId;

struct TransportProbe {
    alive: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// One mock transport session
pub struct MockPeerTransport {
    stream: Arc<RemoteStream>,
    alive: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PeerTransport for MockPeerTransport {
    fn remote_stream(&self) -> RemoteStreamRef {
        RemoteStreamRef::new(&self.stream)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FactoryState {
    fail_for: HashSet<ParticipantId>,
    probes: HashMap<ParticipantId, TransportProbe>,
    created: u32,
}

/// Scriptable factory handing out [`MockPeerTransport`]s
#[derive(Default)]
pub struct MockPeerFactory {
    state: Mutex<FactoryState>,
}

impl MockPeerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script creation to fail for the given participant
    pub fn fail_for(&self, participant: &ParticipantId) {
        self.state.lock().fail_for.insert(participant.clone());
    }

    /// Mark a participant's transport dead without closing it
    pub fn kill(&self, participant: &ParticipantId) {
        if let Some(probe) = self.state.lock().probes.get(participant) {
            probe.alive.store(false, Ordering::SeqCst);
        }
    }

    /// Whether `close()` was called on the participant's transport
    pub fn is_closed(&self, participant: &ParticipantId) -> bool {
        self.state
            .lock()
            .probes
            .get(participant)
            .map(|p| p.closed.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Transports created so far, including replaced ones
    pub fn created_count(&self) -> u32 {
        self.state.lock().created
    }
}

#[async_trait]
impl PeerTransportFactory for MockPeerFactory {
    async fn create(&self, participant: &ParticipantId) -> SessionResult<Box<dyn PeerTransport>> {
        let mut state = self.state.lock();
        if state.fail_for.contains(participant) {
            return Err(SessionError::TransportFailed {
                participant: participant.clone(),
                reason: "scripted creation failure".to_string(),
            });
        }
        state.created += 1;
        let alive = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));
        state.probes.insert(
            participant.clone(),
            TransportProbe { alive: alive.clone(), closed: closed.clone() },
        );
        Ok(Box::new(MockPeerTransport {
            stream: RemoteStream::new(participant.clone()),
            alive,
            closed,
        }))
    }
}
