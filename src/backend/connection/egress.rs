//! Egress pump: outbound queue -> transport.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::transport::{Frame, FrameSink, TransportError};
use crate::backend::hub::ConnectionId;
use crate::shared::{ConnectionConfig, Message};

/// Drain the outbound queue into `sink` until the queue closes or a write fails
///
/// Queued messages take priority over the keep-alive ping, so a ping is only
/// written while the queue is empty. `_done` is dropped on return, which
/// tells the ingress side the egress pump is gone.
pub(crate) async fn run<K: FrameSink>(
    mut sink: K,
    mut outbound: mpsc::Receiver<Message>,
    config: ConnectionConfig,
    id: ConnectionId,
    _done: oneshot::Sender<()>,
) -> Result<(), TransportError> {
    let write_timeout = config.write_timeout();
    let mut ping = time::interval_at(Instant::now() + config.ping_interval(), config.ping_interval());
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            message = outbound.recv() => match message {
                Some(message) => {
                    let text = match message.to_frame() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("[Conn] conn={} failed to serialize message {}: {}", id, message.id(), e);
                            continue;
                        }
                    };
                    write(&mut sink, Frame::Text(text), write_timeout).await?;
                }
                None => {
                    tracing::debug!("[Conn] conn={} outbound queue closed, sending close frame", id);
                    if let Err(e) = write(&mut sink, Frame::Close, write_timeout).await {
                        tracing::debug!("[Conn] conn={} close frame not delivered: {}", id, e);
                    }
                    if let Ok(Err(e)) = time::timeout(write_timeout, sink.close()).await {
                        tracing::debug!("[Conn] conn={} close failed: {}", id, e);
                    }
                    return Ok(());
                }
            },
            _ = ping.tick() => {
                write(&mut sink, Frame::Ping, write_timeout).await?;
            }
        }
    }
}

async fn write<K: FrameSink>(sink: &mut K, frame: Frame, limit: std::time::Duration) -> Result<(), TransportError> {
    match time::timeout(limit, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit)),
    }
}
