//! Peer messaging: typed envelopes, framing, transports and the
//! handshake-driven channel that ties them together.

pub mod channel;
pub mod envelope;
pub mod framing;
pub mod transport;

pub use channel::{
    ChannelState, EnvelopeHandler, PeerMessageChannel, Role, SendOutcome, SharedChannel, Signal,
    SignalSink, pump_inbound,
};
pub use envelope::{KNOWN_TYPES, MessageEnvelope, Payload, now_millis};
pub use framing::{encode_frame, read_frame, write_frame};
pub use transport::{RecordingTransport, TcpLink, TcpTransport, Transport};
