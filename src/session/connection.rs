//! Individual dashboard client session handling

use bytes::Bytes;
use std::net::SocketAddr;
use sweep_shared::codec::FrameDecoder;
use sweep_shared::{tuning, ClientMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle for pushing frames to one dashboard client
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub client_id: u64,
    pub addr: SocketAddr,
    sender: mpsc::Sender<Bytes>,
}

impl ClientHandle {
    /// Build a handle around an existing send queue (tests use this to
    /// observe broadcast traffic without a socket)
    pub fn new(client_id: u64, addr: SocketAddr, sender: mpsc::Sender<Bytes>) -> Self {
        Self {
            client_id,
            addr,
            sender,
        }
    }

    /// Queue a frame for this client without blocking
    ///
    /// A full queue means the client is too slow to keep up; the frame is
    /// dropped for that client only, and the next snapshot supersedes it
    /// anyway. Returns false when the frame was not queued.
    pub fn push(&self, frame: Bytes) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(client = self.client_id, addr = %self.addr, "send queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Active dashboard client session
pub struct ClientSession {
    handle: ClientHandle,
    reader: ReadHalf<TcpStream>,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl ClientSession {
    /// Create a session from a TCP stream, spawning a writer task that
    /// drains this client's send queue
    pub fn new(stream: TcpStream, addr: SocketAddr, client_id: u64) -> Self {
        let (reader, mut writer) = tokio::io::split(stream);
        let (tx, mut rx) = mpsc::channel::<Bytes>(tuning::CLIENT_SEND_QUEUE);

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(%addr, error = %e, "client write failed");
                    break;
                }
            }
        });

        Self {
            handle: ClientHandle::new(client_id, addr, tx),
            reader,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Get a cloneable handle for pushing frames to this client
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Read the next command from this client
    ///
    /// A frame that fails to parse as a command is invalid input for that
    /// one message: logged and skipped, the session stays up. A framing
    /// error means the byte stream itself is broken, so the session ends.
    /// Returns None when the connection is closed.
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        loop {
            match self.decoder.decode_next() {
                Ok(Some(payload)) => match ClientMessage::from_slice(&payload) {
                    Ok(message) => return Some(message),
                    Err(e) => {
                        warn!(addr = %self.handle.addr, error = %e, "invalid command, skipping");
                        continue;
                    }
                },
                Ok(None) => {
                    // Need more data
                }
                Err(e) => {
                    warn!(addr = %self.handle.addr, error = %e, "framing error, closing session");
                    return None;
                }
            }

            match self.reader.read(&mut self.read_buf).await {
                Ok(0) => return None, // Connection closed
                Ok(n) => {
                    self.decoder.extend(&self.read_buf[..n]);
                }
                Err(e) => {
                    debug!(addr = %self.handle.addr, error = %e, "read error, closing session");
                    return None;
                }
            }
        }
    }
}
