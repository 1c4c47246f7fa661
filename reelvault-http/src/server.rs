//! Connection acceptor and per-connection session engine.
//!
//! The acceptor owns the listening socket and spawns one independent task
//! per accepted connection. Each session reads one request under an
//! inactivity deadline, dispatches it through the router, writes the
//! translated response, and loops while the exchange negotiated keep-alive.
//! Requests on one connection are strictly sequential; sessions interleave
//! freely across the runtime's workers.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::timeout;

use crate::request::{ParseError, Request};
use crate::response::translate;
use crate::router::Router;

const MAX_HEADER_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const READ_CHUNK_BYTES: usize = 4096;

/// Values fixed at server construction; nothing here is compiled-in global
/// state, so tests can run with ephemeral ports and short deadlines.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub session_timeout: Duration,
}

impl ServerConfig {
    pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            session_timeout: Self::DEFAULT_SESSION_TIMEOUT,
        }
    }

    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: io::Error,
    },
}

/// Errors fatal to a single session. They are logged by the acceptor's
/// spawn wrapper and never reach other sessions or the accept loop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed request: {0}")]
    Parse(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The accept loop plus the immutable routing table shared by all sessions.
pub struct HttpServer {
    listener: TcpListener,
    session_timeout: Duration,
    router: Arc<Router>,
}

impl HttpServer {
    /// Bind the listening socket with address reuse enabled.
    pub fn bind(config: ServerConfig, router: Router) -> Result<Self, ServerError> {
        let listener = bind_listener(config.bind_addr).map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;
        Ok(Self {
            listener,
            session_timeout: config.session_timeout,
            router: Arc::new(router),
        })
    }

    /// The actually-bound address (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one spawned session per connection.
    ///
    /// Accept errors are logged and the loop keeps going; a failing session
    /// is torn down and logged without affecting anything else.
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            log::info!("listening on {addr}");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let router = Arc::clone(&self.router);
                    let session_timeout = self.session_timeout;
                    tokio::spawn(async move {
                        log::debug!("session started for {peer}");
                        if let Err(err) = run_session(stream, router, session_timeout).await {
                            log::warn!("session with {peer} failed: {err}");
                        }
                    });
                }
                Err(err) => {
                    log::warn!("accept failed: {err}");
                }
            }
        }
    }
}

fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// One connection's lifetime: read, dispatch, write, repeat while kept
/// alive.
///
/// A fresh inactivity deadline is armed for every read. The deadline
/// elapsing or the peer closing between requests ends the session cleanly;
/// any other read failure is fatal to this session only. On the way out the
/// outbound direction is half-closed, ignoring errors since the peer may
/// already be gone.
async fn run_session(
    mut stream: TcpStream,
    router: Arc<Router>,
    inactivity: Duration,
) -> Result<(), SessionError> {
    let mut buffer = Vec::new();
    loop {
        let request = match timeout(inactivity, read_request(&mut stream, &mut buffer)).await {
            Err(_elapsed) => {
                log::debug!("session idle past deadline, closing");
                break;
            }
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => break,
            Ok(Err(err)) => {
                let _ = stream.shutdown().await;
                return Err(err);
            }
        };

        let outcome = router.dispatch(&request);
        let response = translate(outcome, &request);
        let keep_alive = response.keep_alive;
        stream.write_all(&response.to_bytes()).await?;

        if !keep_alive {
            break;
        }
    }
    let _ = stream.shutdown().await;
    Ok(())
}

/// Read one complete request off the stream.
///
/// `buffer` persists across requests on the same connection and may already
/// hold bytes past the previous request. Returns `Ok(None)` when the peer
/// closed cleanly between requests; end-of-stream mid-request is an error.
async fn read_request(
    stream: &mut TcpStream,
    buffer: &mut Vec<u8>,
) -> Result<Option<Request>, SessionError> {
    loop {
        if let Some(header_end) = find_header_end(buffer) {
            let mut request = Request::parse(&buffer[..header_end])?;
            let body_len = request.content_length()?;
            if body_len > MAX_BODY_BYTES {
                return Err(ParseError::BodyTooLarge(MAX_BODY_BYTES).into());
            }

            let total = header_end + 4 + body_len;
            while buffer.len() < total {
                read_some(stream, buffer).await?;
            }

            let body = buffer[header_end + 4..total].to_vec();
            buffer.drain(..total);
            request.attach_body(body);
            return Ok(Some(request));
        }

        if buffer.len() > MAX_HEADER_BYTES {
            return Err(ParseError::HeadersTooLarge(MAX_HEADER_BYTES).into());
        }

        let mut chunk = [0u8; READ_CHUNK_BYTES];
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return if buffer.is_empty() {
                Ok(None)
            } else {
                Err(io::Error::from(io::ErrorKind::UnexpectedEof).into())
            };
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
}

/// Pull more bytes for a body read; end-of-stream here is always an error.
async fn read_some(stream: &mut TcpStream, buffer: &mut Vec<u8>) -> Result<(), SessionError> {
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let read = stream.read(&mut chunk).await?;
    if read == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    buffer.extend_from_slice(&chunk[..read]);
    Ok(())
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
