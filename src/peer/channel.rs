//! Point-to-point envelope channel with external offer/answer signaling.

use crate::error::{Result, VoxbridgeError};
use crate::peer::envelope::{MessageEnvelope, Payload, now_millis};
use crate::peer::transport::Transport;
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const STATION: &str = "peer";

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Which side of the handshake this channel plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Handshake messages relayed by the host's rendezvous service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    Offer { session_id: String },
    Answer { session_id: String },
}

impl Signal {
    pub fn session_id(&self) -> &str {
        match self {
            Signal::Offer { session_id } | Signal::Answer { session_id } => session_id,
        }
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Result of [`PeerMessageChannel::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the transport.
    Sent { bytes: usize },
    /// Not connected; nothing was transmitted.
    Dropped,
}

/// Receives decoded inbound envelopes. Unneeded kinds can be left as no-ops.
pub trait EnvelopeHandler: Send {
    fn on_audio(&mut self, _audio: &[u8], _timestamp: u64) {}

    fn on_transcript(&mut self, _text: &str, _language: &str, _timestamp: u64) {}

    fn on_translation(
        &mut self,
        _original: &str,
        _translated: &str,
        _source_lang: &str,
        _target_lang: &str,
        _timestamp: u64,
    ) {
    }
}

/// Outbound signal subscriber.
pub type SignalSink = Box<dyn FnMut(&Signal) + Send>;

/// Channel shared between the pipeline and the inbound pump.
pub type SharedChannel = Arc<Mutex<PeerMessageChannel>>;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn new_session_id() -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}-{:x}", now_millis(), std::process::id(), n)
}

/// Sends and receives [`MessageEnvelope`]s over one [`Transport`].
///
/// Delivery is at-most-once: sends while not connected are dropped, and
/// there is no retry or reconnect.
pub struct PeerMessageChannel {
    transport: Arc<dyn Transport>,
    state: ChannelState,
    role: Option<Role>,
    session_id: Option<String>,
    handler: Option<Box<dyn EnvelopeHandler>>,
    signal_sink: Option<SignalSink>,
    reporter: Arc<dyn ErrorReporter>,
}

impl PeerMessageChannel {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: ChannelState::Disconnected,
            role: None,
            session_id: None,
            handler: None,
            signal_sink: None,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn shared(self) -> SharedChannel {
        Arc::new(Mutex::new(self))
    }

    /// Register the single inbound handler, replacing any previous one.
    pub fn set_handler(&mut self, handler: Box<dyn EnvelopeHandler>) {
        self.handler = Some(handler);
    }

    /// Register the single outbound signal subscriber.
    pub fn on_signal(&mut self, sink: SignalSink) {
        self.signal_sink = Some(sink);
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ChannelState::Connected
    }

    /// Begin the handshake. An initiator emits an offer; a responder waits for
    /// one. Ignored unless disconnected.
    pub fn connect(&mut self, role: Role) {
        if self.state != ChannelState::Disconnected {
            return;
        }

        self.role = Some(role);
        self.state = ChannelState::Connecting;
        match role {
            Role::Initiator => {
                let session_id = new_session_id();
                self.session_id = Some(session_id.clone());
                self.emit(Signal::Offer { session_id });
            }
            Role::Responder => self.session_id = None,
        }
    }

    /// Feed a signal received from the rendezvous service.
    pub fn apply_signal(&mut self, signal: Signal) -> Result<()> {
        match signal {
            Signal::Offer { session_id } => {
                let accepting = match self.state {
                    ChannelState::Disconnected => true,
                    ChannelState::Connecting => self.role == Some(Role::Responder),
                    ChannelState::Connected => false,
                };
                if !accepting {
                    return Err(self.reject(format!(
                        "offer {} while {:?} as {:?}",
                        session_id, self.state, self.role
                    )));
                }

                self.role = Some(Role::Responder);
                self.session_id = Some(session_id.clone());
                self.state = ChannelState::Connected;
                self.emit(Signal::Answer { session_id });
                Ok(())
            }
            Signal::Answer { session_id } => {
                if self.state != ChannelState::Connecting || self.role != Some(Role::Initiator) {
                    return Err(self.reject(format!(
                        "answer {} while {:?} as {:?}",
                        session_id, self.state, self.role
                    )));
                }
                if self.session_id.as_deref() != Some(session_id.as_str()) {
                    return Err(self.reject(format!(
                        "answer for session {} does not match offer {}",
                        session_id,
                        self.session_id.as_deref().unwrap_or("<none>")
                    )));
                }

                self.state = ChannelState::Connected;
                Ok(())
            }
        }
    }

    /// Tear down immediately and close the transport. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state == ChannelState::Disconnected && self.transport.is_closed() {
            return;
        }
        self.state = ChannelState::Disconnected;
        self.role = None;
        self.session_id = None;
        self.transport.close();
    }

    /// Send one envelope. Returns [`SendOutcome::Dropped`] without touching
    /// the transport unless connected. A transport failure disconnects.
    pub fn send(&mut self, envelope: &MessageEnvelope) -> Result<SendOutcome> {
        if self.state != ChannelState::Connected {
            return Ok(SendOutcome::Dropped);
        }

        let bytes = envelope.encode()?;
        match self.transport.send(&bytes) {
            Ok(()) => Ok(SendOutcome::Sent { bytes: bytes.len() }),
            Err(e @ VoxbridgeError::FrameTooLarge { .. }) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable(format!(
                        "{} envelope not sent: {}",
                        envelope.type_name(),
                        e
                    )),
                );
                Err(e)
            }
            Err(e) => {
                self.reporter
                    .report(STATION, &StationError::Fatal(format!("send failed: {}", e)));
                self.disconnect();
                Err(e)
            }
        }
    }

    /// Decode one inbound frame and dispatch it to the handler.
    ///
    /// Malformed frames are reported and returned as
    /// [`VoxbridgeError::Decode`]; unknown envelope types are reported and
    /// yield `Ok(None)`. Neither changes the connection state.
    pub fn receive(&mut self, raw: &[u8]) -> Result<Option<MessageEnvelope>> {
        let envelope = match MessageEnvelope::decode(raw) {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                self.reporter.report(
                    STATION,
                    &StationError::Recoverable("dropped envelope of unknown type".to_string()),
                );
                return Ok(None);
            }
            Err(e) => {
                self.reporter
                    .report(STATION, &StationError::Recoverable(e.to_string()));
                return Err(e);
            }
        };

        if let Some(handler) = self.handler.as_mut() {
            let ts = envelope.timestamp;
            match &envelope.payload {
                Payload::Audio { audio } => handler.on_audio(audio, ts),
                Payload::Transcript { text, language } => handler.on_transcript(text, language, ts),
                Payload::Translation {
                    original,
                    translated,
                    source_lang,
                    target_lang,
                } => handler.on_translation(original, translated, source_lang, target_lang, ts),
            }
        }
        Ok(Some(envelope))
    }

    fn emit(&mut self, signal: Signal) {
        if let Some(sink) = self.signal_sink.as_mut() {
            sink(&signal);
        }
    }

    fn reject(&self, message: String) -> VoxbridgeError {
        self.reporter
            .report(STATION, &StationError::Recoverable(format!("signal rejected: {}", message)));
        VoxbridgeError::SignalRejected { message }
    }
}

/// Feed frames from a transport's inbound queue into `channel` until the
/// queue closes. Returns how many envelopes were dispatched.
///
/// Bad frames are reported by the channel and skipped.
pub async fn pump_inbound(
    channel: SharedChannel,
    mut inbound: tokio::sync::mpsc::Receiver<Vec<u8>>,
) -> usize {
    let mut delivered = 0;
    while let Some(frame) = inbound.recv().await {
        let received = channel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .receive(&frame);
        if let Ok(Some(_)) = received {
            delivered += 1;
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::transport::RecordingTransport;
    use crate::pipeline::error::CollectingReporter;

    #[derive(Default)]
    struct Seen {
        audio: Vec<Vec<u8>>,
        transcripts: Vec<(String, String)>,
        translations: Vec<(String, String, String, String)>,
    }

    struct SharedHandler(Arc<Mutex<Seen>>);

    impl EnvelopeHandler for SharedHandler {
        fn on_audio(&mut self, audio: &[u8], _timestamp: u64) {
            self.0.lock().unwrap().audio.push(audio.to_vec());
        }

        fn on_transcript(&mut self, text: &str, language: &str, _timestamp: u64) {
            self.0
                .lock()
                .unwrap()
                .transcripts
                .push((text.to_string(), language.to_string()));
        }

        fn on_translation(
            &mut self,
            original: &str,
            translated: &str,
            source_lang: &str,
            target_lang: &str,
            _timestamp: u64,
        ) {
            self.0.lock().unwrap().translations.push((
                original.to_string(),
                translated.to_string(),
                source_lang.to_string(),
                target_lang.to_string(),
            ));
        }
    }

    fn signal_recorder(channel: &mut PeerMessageChannel) -> Arc<Mutex<Vec<Signal>>> {
        let signals = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&signals);
        channel.on_signal(Box::new(move |s: &Signal| sink.lock().unwrap().push(s.clone())));
        signals
    }

    /// Two channels joined through recording transports and a manual handshake.
    fn connected_pair() -> (
        PeerMessageChannel,
        Arc<RecordingTransport>,
        PeerMessageChannel,
        Arc<RecordingTransport>,
    ) {
        let a_transport = Arc::new(RecordingTransport::new());
        let b_transport = Arc::new(RecordingTransport::new());
        let mut a = PeerMessageChannel::new(a_transport.clone());
        let mut b = PeerMessageChannel::new(b_transport.clone());
        let a_signals = signal_recorder(&mut a);
        let b_signals = signal_recorder(&mut b);

        a.connect(Role::Initiator);
        let offer = a_signals.lock().unwrap()[0].clone();
        b.apply_signal(offer).expect("offer accepted");
        let answer = b_signals.lock().unwrap()[0].clone();
        a.apply_signal(answer).expect("answer accepted");

        (a, a_transport, b, b_transport)
    }

    #[tokio::test]
    async fn pump_inbound_dispatches_until_queue_closes() {
        let (_, _, b, _) = connected_pair();
        let received = Arc::new(Mutex::new(Vec::new()));
        let shared = b.shared();
        shared.lock().unwrap().set_handler(Box::new(TextRecorder(Arc::clone(&received))));

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        tx.send(MessageEnvelope::transcript("one", "en").encode().unwrap())
            .await
            .unwrap();
        tx.send(b"not json".to_vec()).await.unwrap();
        tx.send(MessageEnvelope::transcript("two", "en").encode().unwrap())
            .await
            .unwrap();
        drop(tx);

        let delivered = pump_inbound(shared, rx).await;

        assert_eq!(delivered, 2);
        assert_eq!(*received.lock().unwrap(), vec!["one", "two"]);
    }

    struct TextRecorder(Arc<Mutex<Vec<String>>>);

    impl EnvelopeHandler for TextRecorder {
        fn on_transcript(&mut self, text: &str, _language: &str, _timestamp: u64) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    #[test]
    fn handshake_connects_both_sides() {
        let (a, _, b, _) = connected_pair();

        assert_eq!(a.state(), ChannelState::Connected);
        assert_eq!(b.state(), ChannelState::Connected);
        assert_eq!(a.role(), Some(Role::Initiator));
        assert_eq!(b.role(), Some(Role::Responder));
        assert_eq!(a.session_id(), b.session_id());
    }

    #[test]
    fn round_trip_all_envelope_kinds() {
        let (mut a, a_transport, mut b, _) = connected_pair();
        let seen = Arc::new(Mutex::new(Seen::default()));
        b.set_handler(Box::new(SharedHandler(Arc::clone(&seen))));

        let sent = [
            MessageEnvelope::audio(vec![0x00, 0xFF, 0x10]),
            MessageEnvelope::transcript("hello", "en"),
            MessageEnvelope::translation("hello", "hola", "en", "es"),
        ];
        for envelope in &sent {
            assert!(matches!(
                a.send(envelope).expect("send"),
                SendOutcome::Sent { .. }
            ));
        }

        let frames = a_transport.frames();
        assert_eq!(frames.len(), 3);
        for (frame, original) in frames.iter().zip(&sent) {
            let received = b.receive(frame).expect("decode").expect("known type");
            assert_eq!(&received, original);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.audio, vec![vec![0x00, 0xFF, 0x10]]);
        assert_eq!(
            seen.transcripts,
            vec![("hello".to_string(), "en".to_string())]
        );
        assert_eq!(seen.translations.len(), 1);
        assert_eq!(seen.translations[0].1, "hola");
        assert_eq!(seen.translations[0].3, "es");
    }

    #[test]
    fn binary_audio_payloads_survive_the_wire() {
        let (mut a, a_transport, mut b, _) = connected_pair();

        let every_byte: Vec<u8> = (0..=255u8).collect();
        let payloads = [every_byte.clone(), every_byte.into_iter().rev().collect(), Vec::new()];
        for payload in &payloads {
            a.send(&MessageEnvelope::audio(payload.clone())).expect("send");
        }

        let frames = a_transport.frames();
        assert_eq!(frames.len(), payloads.len());
        for (frame, payload) in frames.iter().zip(&payloads) {
            let received = b.receive(frame).expect("decode").expect("known type");
            match received.payload {
                Payload::Audio { audio } => assert_eq!(&audio, payload),
                other => panic!("expected audio, got {:?}", other),
            }
        }
    }

    #[test]
    fn send_while_disconnected_transmits_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        let mut channel = PeerMessageChannel::new(transport.clone());

        let outcome = channel
            .send(&MessageEnvelope::transcript("hi", "en"))
            .expect("no error");

        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn send_while_connecting_is_dropped() {
        let transport = Arc::new(RecordingTransport::new());
        let mut channel = PeerMessageChannel::new(transport.clone());
        channel.connect(Role::Initiator);

        let outcome = channel
            .send(&MessageEnvelope::audio(vec![1, 2]))
            .expect("no error");

        assert_eq!(outcome, SendOutcome::Dropped);
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn malformed_frame_is_reported_and_channel_stays_up() {
        let (_, _, b, _) = connected_pair();
        let reporter = Arc::new(CollectingReporter::new());
        let mut b = b.with_reporter(reporter.clone());

        let err = b.receive(b"{not json").expect_err("malformed");
        assert!(matches!(err, VoxbridgeError::Decode { .. }));
        assert_eq!(b.state(), ChannelState::Connected);
        assert_eq!(reporter.for_station("peer").len(), 1);
    }

    #[test]
    fn unknown_type_is_reported_and_dropped() {
        let reporter = Arc::new(CollectingReporter::new());
        let mut channel = PeerMessageChannel::new(Arc::new(RecordingTransport::new()))
            .with_reporter(reporter.clone());

        let result = channel
            .receive(br#"{"type":"typing","timestamp":5}"#)
            .expect("not an error");

        assert!(result.is_none());
        assert_eq!(reporter.reports().len(), 1);
    }

    #[test]
    fn mismatched_answer_is_rejected() {
        let mut channel = PeerMessageChannel::new(Arc::new(RecordingTransport::new()));
        channel.connect(Role::Initiator);

        let err = channel
            .apply_signal(Signal::Answer {
                session_id: "someone-else".to_string(),
            })
            .expect_err("should reject");

        assert!(matches!(err, VoxbridgeError::SignalRejected { .. }));
        assert_eq!(channel.state(), ChannelState::Connecting);
    }

    #[test]
    fn offer_to_connected_channel_is_rejected() {
        let (mut a, _, _, _) = connected_pair();
        let err = a
            .apply_signal(Signal::Offer {
                session_id: "late".to_string(),
            })
            .expect_err("should reject");
        assert!(matches!(err, VoxbridgeError::SignalRejected { .. }));
        assert!(a.is_connected());
    }

    #[test]
    fn responder_can_wait_before_offer() {
        let mut channel = PeerMessageChannel::new(Arc::new(RecordingTransport::new()));
        let signals = signal_recorder(&mut channel);

        channel.connect(Role::Responder);
        assert_eq!(channel.state(), ChannelState::Connecting);
        assert!(signals.lock().unwrap().is_empty());

        channel
            .apply_signal(Signal::Offer {
                session_id: "s1".to_string(),
            })
            .expect("accepted");
        assert!(channel.is_connected());
        assert_eq!(
            *signals.lock().unwrap(),
            vec![Signal::Answer {
                session_id: "s1".to_string()
            }]
        );
    }

    #[test]
    fn disconnect_is_idempotent_and_closes_transport() {
        let (mut a, a_transport, _, _) = connected_pair();

        a.disconnect();
        a.disconnect();

        assert_eq!(a.state(), ChannelState::Disconnected);
        assert!(a_transport.is_closed());
        assert_eq!(
            a.send(&MessageEnvelope::transcript("x", "en")).expect("ok"),
            SendOutcome::Dropped
        );
    }

    #[test]
    fn transport_failure_disconnects() {
        let (mut a, a_transport, _, _) = connected_pair();
        let reporter = Arc::new(CollectingReporter::new());
        a = a.with_reporter(reporter.clone());
        a_transport.set_failing(true);

        let err = a
            .send(&MessageEnvelope::transcript("x", "en"))
            .expect_err("should fail");

        assert!(matches!(err, VoxbridgeError::Transport { .. }));
        assert_eq!(a.state(), ChannelState::Disconnected);
        assert_eq!(a.role(), None);
        assert_eq!(a.session_id(), None);
        assert!(a_transport.is_closed());
        assert!(reporter.for_station("peer")[0].is_fatal());

        // A fresh handshake can follow the teardown.
        a.connect(Role::Initiator);
        assert_eq!(a.state(), ChannelState::Connecting);
        assert!(a.session_id().is_some());
    }

    #[test]
    fn signals_serialize_with_snake_case_tags() {
        let json = Signal::Offer {
            session_id: "abc".to_string(),
        }
        .to_json()
        .expect("serialize");
        assert_eq!(json, r#"{"type":"offer","session_id":"abc"}"#);
        assert_eq!(
            Signal::from_json(&json).expect("parse").session_id(),
            "abc"
        );
    }
}
