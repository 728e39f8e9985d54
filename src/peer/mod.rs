//! Per-participant media transport sessions

pub mod mock;
pub mod registry;

pub use registry::{
    PeerConnectionRegistry, PeerTransport, PeerTransportFactory, RemoteStream, RemoteStreamRef,
    StreamId,
};
