//! Connection lifecycle: the per-server task that pumps lines
//! between a transport and the engine.
//!
//! The engine itself is synchronous; this module confines all of one
//! server's protocol mutation to a single task, taking the lock only
//! for synchronous work and never holding it across an await.
//! Reconnect policy stays with the embedder (`Prefs::reconnect_delay`
//! is provided for it); one call here is one connection attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use slirc_wire::LineCodec;

use crate::engine::Engine;
use crate::error::CoreError;
use crate::server::ServerId;

/// How long to park when the outbound queue is empty and nothing
/// arrives. Purely a wakeup bound, not a protocol timeout.
const IDLE_TICK: Duration = Duration::from_secs(30);

/// A line-framed, bidirectional connection. TCP/TLS/proxy plumbing
/// lives behind this seam, outside the core.
#[async_trait]
pub trait Transport: Send {
    /// Next inbound line; `None` when the peer closed the stream.
    async fn next_line(&mut self) -> Option<Result<String, CoreError>>;
    /// Write one line (terminator added by the framing layer).
    async fn send_line(&mut self, line: &str) -> Result<(), CoreError>;
}

/// [`Transport`] over any async byte stream using the IRC line codec.
pub struct FramedTransport<S> {
    inner: Framed<S, LineCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> FramedTransport<S> {
    /// Frame an established stream.
    pub fn new(stream: S) -> Self {
        FramedTransport {
            inner: Framed::new(stream, LineCodec::new()),
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for FramedTransport<S> {
    async fn next_line(&mut self) -> Option<Result<String, CoreError>> {
        self.inner
            .next()
            .await
            .map(|r| r.map_err(|e| CoreError::Transport(e.to_string())))
    }

    async fn send_line(&mut self, line: &str) -> Result<(), CoreError> {
        self.inner
            .send(line.to_string())
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))
    }
}

/// Drive one connection attempt to completion.
///
/// Starts registration, then pumps: inbound lines go to
/// [`Engine::inline`], outbound lines drain from the throttle queue
/// as their deadlines pass. Returns when the peer closes (Ok) or the
/// transport fails (Err); either way the engine state is left
/// disconnected with a final QUIT flushed best-effort.
pub async fn run_connection<T: Transport>(
    engine: Arc<Mutex<Engine>>,
    server: ServerId,
    mut transport: T,
) -> Result<(), CoreError> {
    engine.lock().start_login(server);

    let result = loop {
        let (ready, deadline) = {
            let mut e = engine.lock();
            let now = Instant::now();
            let mut ready = Vec::new();
            while let Some(line) = e.pop_outbound(server, now) {
                ready.push(line);
            }
            (ready, e.outbound_deadline(server))
        };
        let mut send_err = None;
        for line in &ready {
            if let Err(err) = transport.send_line(line).await {
                send_err = Some(err);
                break;
            }
        }
        if let Some(err) = send_err {
            break Err(err);
        }

        let park = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_TICK)
            .min(IDLE_TICK);

        tokio::select! {
            inbound = transport.next_line() => match inbound {
                Some(Ok(line)) => engine.lock().inline(server, &line),
                Some(Err(err)) => break Err(err),
                None => break Ok(()),
            },
            _ = tokio::time::sleep(park) => {}
        }
    };

    let reason = match &result {
        Ok(()) => "connection closed".to_string(),
        Err(e) => e.to_string(),
    };
    debug!(server = server.0, %reason, "connection ended");
    let final_lines = {
        let mut e = engine.lock();
        e.disconnect(server, &reason);
        e.drain_outbound(server)
    };
    for line in &final_lines {
        if transport.send_line(line).await.is_err() {
            warn!(server = server.0, "final flush failed");
            break;
        }
    }
    result
}
