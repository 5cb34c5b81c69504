//! Frame transports under the peer channel.

use crate::error::{Result, VoxbridgeError};
use crate::peer::framing::{encode_frame, read_frame};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

/// Reliable, ordered, message-preserving frame pipe.
///
/// `send` must not block: stream transports queue the frame for a writer task.
pub trait Transport: Send + Sync {
    fn send(&self, frame: &[u8]) -> Result<()>;

    /// Close the transport. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// In-memory transport that records every frame it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose sends fail until [`set_failing(false)`](Self::set_failing).
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.set_failing(true);
        transport
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Frames sent so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn sent_count(&self) -> usize {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Remove and return the recorded frames.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.frames.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl Transport for RecordingTransport {
    fn send(&self, frame: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(VoxbridgeError::Transport {
                message: "transport closed".to_string(),
            });
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(VoxbridgeError::Transport {
                message: "simulated send failure".to_string(),
            });
        }
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(frame.to_vec());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Inbound frame queue depth per TCP link.
const INBOUND_CAPACITY: usize = 64;

/// Length-prefixed frames over a TCP stream.
///
/// A writer task drains an unbounded queue so `send` never awaits; a reader
/// task pushes inbound frames to the [`TcpLink::inbound`] receiver.
pub struct TcpTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
    reader: AbortHandle,
    writer: Mutex<Option<JoinHandle<()>>>,
    peer_addr: SocketAddr,
    max_frame_bytes: usize,
}

/// A connected TCP transport plus its inbound frames.
pub struct TcpLink {
    pub transport: Arc<TcpTransport>,
    pub inbound: mpsc::Receiver<Vec<u8>>,
}

impl TcpTransport {
    /// Dial `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A, max_frame_bytes: usize) -> Result<TcpLink> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| VoxbridgeError::Transport {
                message: format!("Failed to connect: {}", e),
            })?;
        Self::from_stream(stream, max_frame_bytes)
    }

    /// Wait for one peer on `listener`.
    pub async fn accept(listener: &TcpListener, max_frame_bytes: usize) -> Result<TcpLink> {
        let (stream, _) = listener
            .accept()
            .await
            .map_err(|e| VoxbridgeError::Transport {
                message: format!("Failed to accept connection: {}", e),
            })?;
        Self::from_stream(stream, max_frame_bytes)
    }

    /// Wrap an established stream. Must be called inside a tokio runtime.
    pub fn from_stream(stream: TcpStream, max_frame_bytes: usize) -> Result<TcpLink> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;
        let (mut read_half, mut write_half) = stream.into_split();
        let closed = Arc::new(AtomicBool::new(false));

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let writer_closed = Arc::clone(&closed);
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let written = async {
                    write_half.write_all(&frame).await?;
                    write_half.flush().await
                }
                .await;
                if let Err(e) = written {
                    eprintln!("[peer] write to {} failed: {}", peer_addr, e);
                    writer_closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
            write_half.shutdown().await.ok();
        });

        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let reader_closed = Arc::clone(&closed);
        let reader = tokio::spawn(async move {
            loop {
                match read_frame(&mut read_half, max_frame_bytes).await {
                    Ok(Some(frame)) => {
                        if in_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("[peer] read from {} failed: {}", peer_addr, e);
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
        });

        let transport = Arc::new(TcpTransport {
            outbound: Mutex::new(Some(out_tx)),
            closed,
            reader: reader.abort_handle(),
            writer: Mutex::new(Some(writer)),
            peer_addr,
            max_frame_bytes,
        });
        Ok(TcpLink {
            transport,
            inbound: in_rx,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Close, then wait until every queued frame has been written.
    pub async fn shutdown(&self) {
        self.close();
        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(writer) = writer {
            writer.await.ok();
        }
    }
}

impl Transport for TcpTransport {
    fn send(&self, frame: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(VoxbridgeError::Transport {
                message: format!("connection to {} closed", self.peer_addr),
            });
        }
        let encoded = encode_frame(frame, self.max_frame_bytes)?;

        let outbound = self.outbound.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = outbound.as_ref() else {
            return Err(VoxbridgeError::Transport {
                message: "transport closed".to_string(),
            });
        };
        tx.send(encoded).map_err(|_| VoxbridgeError::Transport {
            message: format!("writer for {} has stopped", self.peer_addr),
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the sender lets the writer flush what is queued, then shut down.
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.reader.abort();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_transport_records_in_order() {
        let transport = RecordingTransport::new();
        transport.send(b"one").expect("send");
        transport.send(b"two").expect("send");

        assert_eq!(transport.frames(), vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(transport.sent_count(), 2);
        assert_eq!(transport.drain().len(), 2);
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn recording_transport_refuses_after_close() {
        let transport = RecordingTransport::new();
        transport.close();
        transport.close();

        assert!(transport.is_closed());
        assert!(transport.send(b"late").is_err());
        assert_eq!(transport.sent_count(), 0);
    }

    #[test]
    fn failing_transport_can_recover() {
        let transport = RecordingTransport::failing();
        assert!(transport.send(b"x").is_err());

        transport.set_failing(false);
        assert!(transport.send(b"x").is_ok());
    }

    #[tokio::test]
    async fn tcp_link_carries_frames_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (server, client) = tokio::join!(
            TcpTransport::accept(&listener, 1024),
            TcpTransport::connect(addr, 1024)
        );
        let mut server = server.expect("accept");
        let mut client = client.expect("connect");

        client.transport.send(b"ping").expect("send");
        assert_eq!(server.inbound.recv().await, Some(b"ping".to_vec()));

        server.transport.send(b"pong").expect("send");
        assert_eq!(client.inbound.recv().await, Some(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn tcp_send_rejects_oversized_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (_server, client) = tokio::join!(
            TcpTransport::accept(&listener, 8),
            TcpTransport::connect(addr, 8)
        );
        let client = client.expect("connect");

        let err = client.transport.send(&[0u8; 9]).expect_err("too large");
        assert!(matches!(err, VoxbridgeError::FrameTooLarge { size: 9, limit: 8 }));
        assert!(!client.transport.is_closed());
    }

    #[tokio::test]
    async fn tcp_close_ends_peer_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (server, client) = tokio::join!(
            TcpTransport::accept(&listener, 1024),
            TcpTransport::connect(addr, 1024)
        );
        let mut server = server.expect("accept");
        let client = client.expect("connect");

        client.transport.send(b"last").expect("send");
        client.transport.close();
        client.transport.close();

        assert!(client.transport.is_closed());
        assert!(client.transport.send(b"after").is_err());
        assert_eq!(server.inbound.recv().await, Some(b"last".to_vec()));
        assert_eq!(server.inbound.recv().await, None);
    }

    #[tokio::test]
    async fn tcp_shutdown_waits_for_queued_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (server, client) = tokio::join!(
            TcpTransport::accept(&listener, 1024),
            TcpTransport::connect(addr, 1024)
        );
        let mut server = server.expect("accept");
        let client = client.expect("connect");

        for frame in [b"one".as_slice(), b"two", b"three"] {
            client.transport.send(frame).expect("send");
        }
        client.transport.shutdown().await;
        client.transport.shutdown().await;

        assert!(client.transport.is_closed());
        let mut received = Vec::new();
        while let Some(frame) = server.inbound.recv().await {
            received.push(frame);
        }
        assert_eq!(received, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    }
}
