//! One pooled HTTP/1.1 connection, run as a single task:
//!
//! ```text
//! New → Resolving → Connecting → [TlsHandshaking] → Idle
//! Idle → Sending → Receiving → Idle        (keep-alive)
//! Idle → Sending → Receiving → Closing → Resolving   (server closed)
//! any  → Closing  (timeout, fatal I/O error, pool shutdown)
//! ```
//!
//! Each network-bound phase runs under a watchdog; expiry closes the
//! connection and the interrupted operation is never retried. A
//! connection serves one request at a time — no pipelining — and its
//! callback fires exactly once per request taken off the channel.

use crate::request::{
    PendingRequest, READ_BUFFER_SIZE, Response, ResponseError, ResponseParser,
};
use crate::tls;
use monoio::io::{AsyncReadRent, AsyncWriteRent, AsyncWriteRentExt};
use monoio::net::TcpStream;
use redpath_core::ConnectPolicy;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

/// Watchdog for connect, handshake, send, and receive. Resolution goes
/// through the blocking std resolver, which carries its own OS timeout.
pub const PHASE_TIMEOUT: Duration = Duration::from_secs(30);

enum Stream {
    Plain(TcpStream),
    Tls(monoio_rustls::ClientTlsStream<TcpStream>),
}

impl Stream {
    async fn write_all(&mut self, buf: Vec<u8>) -> io::Result<()> {
        match self {
            Stream::Plain(s) => {
                let (res, _) = s.write_all(buf).await;
                res.map(|_| ())
            }
            Stream::Tls(s) => {
                let (res, _) = s.write_all(buf).await;
                res.map(|_| ())
            }
        }
    }

    async fn read(&mut self, buf: Vec<u8>) -> (io::Result<usize>, Vec<u8>) {
        match self {
            Stream::Plain(s) => s.read(buf).await,
            Stream::Tls(s) => s.read(buf).await,
        }
    }

    /// Closing: close_notify on TLS (errors tolerated — the peer may
    /// already be gone), then shut the socket down.
    async fn close(mut self) {
        match &mut self {
            Stream::Plain(s) => {
                let _ = s.shutdown().await;
            }
            Stream::Tls(s) => {
                let _ = s.shutdown().await;
            }
        }
    }
}

pub(crate) struct Connection {
    host: String,
    port: u16,
    conn_id: u32,
    policy: Rc<ConnectPolicy>,
    channel: async_channel::Receiver<PendingRequest>,
}

/// How a batch of request cycles on one established stream ended.
enum CycleEnd {
    /// Server does not keep the connection alive; start over at resolve.
    Restart,
    /// Pool shutdown or fatal error; the task is done.
    Finished,
}

impl Connection {
    pub(crate) fn new(
        host: String,
        port: u16,
        conn_id: u32,
        policy: Rc<ConnectPolicy>,
        channel: async_channel::Receiver<PendingRequest>,
    ) -> Rc<Self> {
        Rc::new(Self {
            host,
            port,
            conn_id,
            policy,
            channel,
        })
    }

    pub(crate) async fn run(self: Rc<Self>) {
        loop {
            let Some(stream) = self.establish().await else {
                return;
            };
            match self.serve_cycles(stream).await {
                CycleEnd::Restart => continue,
                CycleEnd::Finished => return,
            }
        }
    }

    /// Resolving → Connecting → optional TlsHandshaking. `None` drops
    /// the connection; its pool slot expires with the task.
    async fn establish(&self) -> Option<Stream> {
        let candidates = resolve_addrs(&self.host, self.port);
        if candidates.is_empty() {
            tracing::warn!(host = %self.host, port = self.port, "Address resolve failed");
            return None;
        }

        let tcp = match monoio::time::timeout(PHASE_TIMEOUT, connect_any(&candidates)).await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                tracing::warn!(host = %self.host, tried = candidates.len(), "Connect failed on all candidates");
                return None;
            }
            Err(_) => {
                tracing::warn!(host = %self.host, "Connect timed out");
                return None;
            }
        };
        let _ = tcp.set_nodelay(true);

        if !self.policy.use_tls {
            tracing::debug!(conn = self.conn_id, host = %self.host, "Connected");
            return Some(Stream::Plain(tcp));
        }

        // TLS context is built per connection, from policy.
        let connector = match tls::build_connector(&self.policy) {
            Ok(connector) => connector,
            Err(e) => {
                tracing::warn!(error = %e, "TLS context build failed");
                return None;
            }
        };
        let server_name = match rustls::pki_types::ServerName::try_from(self.host.clone()) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(host = %self.host, error = %e, "Host is not a valid SNI name");
                return None;
            }
        };
        match monoio::time::timeout(PHASE_TIMEOUT, connector.connect(server_name, tcp)).await {
            Ok(Ok(stream)) => {
                tracing::debug!(conn = self.conn_id, host = %self.host, "TLS session established");
                Some(Stream::Tls(stream))
            }
            Ok(Err(e)) => {
                tracing::warn!(host = %self.host, error = %e, "TLS handshake failed");
                None
            }
            Err(_) => {
                tracing::warn!(host = %self.host, "TLS handshake timed out");
                None
            }
        }
    }

    /// Idle → Sending → Receiving cycles on one established stream.
    async fn serve_cycles(&self, mut stream: Stream) -> CycleEnd {
        loop {
            // ── Idle: wait for a request, watching the socket. A
            // request already queued takes priority over the watch. ──
            let pending = monoio::select! {
                biased;
                received = self.channel.recv() => match received {
                    Ok(pending) => pending,
                    Err(_) => {
                        tracing::debug!(conn = self.conn_id, "Pool channel cancelled, connection exiting");
                        stream.close().await;
                        return CycleEnd::Finished;
                    }
                },
                watched = idle_watch(&mut stream) => {
                    match watched {
                        Ok(0) => tracing::debug!(conn = self.conn_id, "Peer closed idle connection"),
                        Ok(_) => tracing::warn!(conn = self.conn_id, "Unexpected data on idle connection"),
                        Err(e) => tracing::debug!(conn = self.conn_id, error = %e, "Idle connection error"),
                    }
                    stream.close().await;
                    return CycleEnd::Finished;
                }
            };

            // ── Sending ──
            let PendingRequest { req, callback } = pending;
            tracing::debug!(conn = self.conn_id, method = %req.method, uri = %req.uri, "Sending request");
            match monoio::time::timeout(PHASE_TIMEOUT, stream.write_all(req.serialize())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(conn = self.conn_id, error = %e, "Request write failed");
                    callback(Response::default());
                    stream.close().await;
                    return CycleEnd::Finished;
                }
                Err(_) => {
                    tracing::warn!(conn = self.conn_id, "Request write timed out");
                    callback(Response::default());
                    stream.close().await;
                    return CycleEnd::Finished;
                }
            }

            // ── Receiving ──
            match monoio::time::timeout(PHASE_TIMEOUT, read_response(&mut stream)).await {
                Ok(Ok(response)) => {
                    let keep_alive = response.keep_alive();
                    callback(response);
                    if keep_alive {
                        continue;
                    }
                    tracing::debug!(conn = self.conn_id, "Server closed, restarting from resolve");
                    stream.close().await;
                    return CycleEnd::Restart;
                }
                Ok(Err(e)) => {
                    tracing::warn!(conn = self.conn_id, error = %e, "Response read failed");
                    callback(Response::default());
                    stream.close().await;
                    return CycleEnd::Finished;
                }
                Err(_) => {
                    tracing::warn!(conn = self.conn_id, "Response read timed out");
                    callback(Response::default());
                    stream.close().await;
                    return CycleEnd::Finished;
                }
            }
        }
    }
}

/// Read a full response off the stream. A TLS peer dropping the link
/// without close_notify surfaces as `UnexpectedEof`; with headers in
/// hand the accumulated response stands as a success.
async fn read_response(stream: &mut Stream) -> Result<Response, ResponseError> {
    let mut parser = ResponseParser::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let (res, returned) = stream.read(buf).await;
        buf = returned;
        match res {
            Ok(0) => {
                parser.finish_on_eof()?;
                return Ok(parser.into_response());
            }
            Ok(n) => {
                if parser.advance(&buf[..n])? {
                    return Ok(parser.into_response());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && parser.have_headers() => {
                return Ok(parser.into_response());
            }
            Err(e) => return Err(ResponseError::Io(e)),
        }
    }
}

/// Idle-phase peer watch. A keep-alive server sends nothing between
/// cycles, so EOF, an error, or any stray byte ends the connection.
async fn idle_watch(stream: &mut Stream) -> io::Result<usize> {
    let (res, _) = stream.read(vec![0u8; 1]).await;
    res
}

/// Resolve host:port via std's blocking resolver, IPv4 candidates
/// first. Blocking is acceptable here: resolution happens only when a
/// pool slot is (re)filled, never on the keep-alive hot path.
fn resolve_addrs(host: &str, port: u16) -> Vec<SocketAddr> {
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return vec![SocketAddr::new(ip, port)];
    }
    use std::net::ToSocketAddrs;
    let all: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(iter) => iter.collect(),
        Err(_) => return vec![],
    };
    let mut sorted: Vec<SocketAddr> = all.iter().copied().filter(|a| a.is_ipv4()).collect();
    sorted.extend(all.iter().copied().filter(|a| a.is_ipv6()));
    sorted
}

async fn connect_any(candidates: &[SocketAddr]) -> Option<TcpStream> {
    for addr in candidates {
        match TcpStream::connect(*addr).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "Connect candidate failed, trying next");
            }
        }
    }
    None
}
