//! Ingress pump: transport -> hub.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time;

use super::transport::{Frame, FrameSource};
use super::{ConnectionContext, ExitReason};
use crate::backend::collaborators::MessageStore;
use crate::backend::hub::{ConnectionId, HubError};
use crate::shared::{ClientFrame, Identity, Message};

/// Read frames until the peer leaves, goes quiet, or the egress pump exits
pub(crate) async fn run<S: FrameSource>(
    source: &mut S,
    ctx: &ConnectionContext,
    id: ConnectionId,
    identity: &Identity,
    mut egress_done: oneshot::Receiver<()>,
) -> ExitReason {
    let idle = ctx.config.idle_timeout();

    loop {
        let next = tokio::select! {
            biased;

            _ = &mut egress_done => return ExitReason::EgressClosed,
            next = time::timeout(idle, source.receive()) => next,
        };

        let frame = match next {
            Err(_) => return ExitReason::IdleTimeout,
            Ok(None) => return ExitReason::PeerClosed,
            Ok(Some(Err(e))) => return ExitReason::ReadError(e),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Frame::Text(text) => {
                if let Err(HubError::Closed) = handle_text(ctx, id, identity, &text).await {
                    return ExitReason::HubClosed;
                }
            }
            // Keep-alive only; the deadline is already refreshed.
            Frame::Ping | Frame::Pong => {}
            Frame::Close => return ExitReason::PeerClosed,
        }
    }
}

async fn handle_text(ctx: &ConnectionContext, id: ConnectionId, identity: &Identity, text: &str) -> Result<(), HubError> {
    if text.len() > ctx.config.max_frame_bytes {
        tracing::warn!(
            "[Conn] conn={} discarded {} byte frame (limit {})",
            id,
            text.len(),
            ctx.config.max_frame_bytes
        );
        return Ok(());
    }

    let frame = match ClientFrame::decode(text, ctx.config.max_content_len) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("[Conn] conn={} discarded frame from {}: {}", id, identity.display_name, e);
            return Ok(());
        }
    };

    match frame {
        ClientFrame::Content { content, topic } => {
            let mentions = ctx.extractor.extract(&content);
            let message = Message::new(identity.display_name.clone(), content, mentions);
            tracing::info!(
                "[Conn] Timeline event: User {} sent a message (mentions={:?})",
                identity.display_name,
                message.mentions()
            );
            spawn_persist(Arc::clone(&ctx.store), message.clone(), identity.clone());

            match topic {
                Some(topic) => ctx.hub.broadcast_to_topic(topic, message).await,
                None => ctx.hub.broadcast(message).await,
            }
        }
        ClientFrame::Subscribe { topic } => ctx.hub.subscribe(id, topic),
        ClientFrame::Unsubscribe { topic } => ctx.hub.unsubscribe(id, topic),
    }
}

fn spawn_persist(store: Arc<dyn MessageStore>, message: Message, sender: Identity) {
    tokio::spawn(async move {
        if let Err(e) = store.persist(&message, &sender, message.mentions()).await {
            tracing::warn!("[Store] Failed to persist message {}: {}", message.id(), e);
        }
    });
}
