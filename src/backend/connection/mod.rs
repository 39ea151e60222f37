/**
 * Connection Pumps
 *
 * A connection is one duplex transport bound to one hub member. It runs
 * two pumps:
 *
 * - **ingress** (on the caller's task): reads frames under the idle
 *   timeout, decodes them and submits messages to the hub
 * - **egress** (spawned): drains the member's outbound queue into the
 *   transport and sends keep-alive pings
 *
 * Either pump ending brings the other one down. Ingress exit drops the
 * `MembershipGuard`, the hub removes the member and the closed queue stops
 * egress. Egress exit drops a oneshot sender that ingress is selecting on.
 */

mod egress;
mod ingress;
pub mod transport;
pub mod websocket;

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::backend::collaborators::{MentionExtractor, MessageStore};
use crate::backend::hub::{ConnectionId, Hub, HubError, Member};
use crate::shared::{ConnectionConfig, Identity};

pub use transport::{Frame, FrameSink, FrameSource, Transport, TransportError};
pub use websocket::WsTransport;

/// Everything a connection needs besides its transport and identity
#[derive(Clone)]
pub struct ConnectionContext {
    pub hub: Hub,
    pub store: Arc<dyn MessageStore>,
    pub extractor: Arc<dyn MentionExtractor>,
    pub config: ConnectionConfig,
}

/// Why a connection ended
#[derive(Debug)]
pub enum ExitReason {
    /// Close frame or end of stream from the peer
    PeerClosed,
    /// Nothing received within the idle timeout
    IdleTimeout,
    ReadError(TransportError),
    WriteError(TransportError),
    /// The outbound queue was closed by the hub (eviction or shutdown)
    QueueClosed,
    /// Egress stopped and its result was not available
    EgressClosed,
    /// The hub stopped before or while the connection was running
    HubClosed,
}

/// Unregisters its member from the hub when dropped
///
/// Unregistration is a plain channel send, so it also runs when the
/// connection future is cancelled mid-await.
pub struct MembershipGuard {
    hub: Hub,
    id: ConnectionId,
}

impl MembershipGuard {
    pub fn new(hub: Hub, id: ConnectionId) -> Self {
        Self { hub, id }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for MembershipGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Run a connection to completion
///
/// Registers `identity` with the hub (history replay is delivered through
/// the already running egress pump), then reads frames until any exit
/// condition. Returns once both pumps have stopped and the member has been
/// unregistered.
///
/// # Arguments
/// * `transport` - the upgraded duplex transport
/// * `identity` - who is connecting
/// * `ctx` - hub handle, collaborators and timing configuration
pub async fn serve_connection<T: Transport>(transport: T, identity: Identity, ctx: ConnectionContext) -> ExitReason {
    let (member, outbound) = Member::new(identity.clone(), ctx.hub.outbound_capacity());
    let id = member.id();
    let (sink, mut source) = transport.split();

    let (done_tx, done_rx) = oneshot::channel();
    let egress = tokio::spawn(egress::run(sink, outbound, ctx.config.clone(), id, done_tx));

    tracing::info!(
        "[Conn] Client connected: {} ({}) conn={}",
        identity.display_name,
        identity.user_id,
        id
    );

    let guard = MembershipGuard::new(ctx.hub.clone(), id);
    let mut reason = match ctx.hub.register(member).await {
        Ok(true) => ingress::run(&mut source, &ctx, id, &identity, done_rx).await,
        Ok(false) => ExitReason::QueueClosed,
        Err(HubError::Closed) => ExitReason::HubClosed,
    };
    drop(guard);

    match egress.await {
        Ok(Err(e)) => {
            if matches!(reason, ExitReason::EgressClosed) {
                reason = ExitReason::WriteError(e);
            } else {
                tracing::debug!("[Conn] conn={} egress ended with {}", id, e);
            }
        }
        Ok(Ok(())) => {
            if matches!(reason, ExitReason::EgressClosed) {
                reason = ExitReason::QueueClosed;
            }
        }
        Err(e) => tracing::error!("[Conn] conn={} egress task failed: {}", id, e),
    }

    tracing::info!(
        "[Conn] Client disconnected: {} conn={} reason={:?}",
        identity.display_name,
        id,
        reason
    );
    reason
}
