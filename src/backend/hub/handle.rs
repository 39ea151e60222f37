/**
 * Hub Handle and Control Loop
 *
 * `Hub::spawn` starts the control loop and returns a cheap, cloneable
 * handle. The loop stops on `shutdown()` or once every handle is dropped;
 * either way the hub state is dropped with it, which closes every
 * remaining outbound queue.
 */

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::command::{MembershipCommand, PublishCommand};
use super::state::{HubState, HubStats, Member, RegisterOutcome};
use super::ConnectionId;
use crate::shared::{HubConfig, Identity, Message};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Hub is not running")]
    Closed,
}

/// Handle to a running hub
#[derive(Clone, Debug)]
pub struct Hub {
    membership: mpsc::UnboundedSender<MembershipCommand>,
    publish: mpsc::Sender<PublishCommand>,
    outbound_capacity: usize,
}

impl Hub {
    /// Start a hub control loop on the current runtime
    ///
    /// # Returns
    /// The handle and the loop's `JoinHandle`, which completes after
    /// `shutdown()` or when all handles are gone.
    ///
    /// # Example
    /// ```rust,no_run
    /// use crm_relay::backend::hub::Hub;
    /// use crm_relay::shared::{HubConfig, Message};
    ///
    /// # async fn run() -> Result<(), crm_relay::backend::hub::HubError> {
    /// let (hub, task) = Hub::spawn(&HubConfig::default());
    /// hub.broadcast(Message::new("Alice", "hello", Vec::new())).await?;
    /// hub.shutdown();
    /// task.await.ok();
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(config: &HubConfig) -> (Self, JoinHandle<()>) {
        let (membership, membership_rx) = mpsc::unbounded_channel();
        let (publish, publish_rx) = mpsc::channel(config.command_buffer.max(1));
        let state = HubState::new(config);

        let task = tokio::spawn(run(state, membership_rx, publish_rx));
        tracing::info!(
            "[Hub] Started (outbound_capacity={}, history_limit={:?})",
            config.outbound_capacity,
            config.history_limit
        );

        let hub = Self {
            membership,
            publish,
            outbound_capacity: config.outbound_capacity,
        };
        (hub, task)
    }

    /// Capacity used for outbound queues created by `connect`
    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Register a member and wait until history has been replayed to it
    ///
    /// Returns `Ok(false)` if the member was evicted during replay.
    pub async fn register(&self, member: Member) -> Result<bool, HubError> {
        let (ack, rx) = oneshot::channel();
        self.membership
            .send(MembershipCommand::Register { member, ack: Some(ack) })
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Create a member for `identity` and register it
    ///
    /// # Returns
    /// The connection id and the receiving end of its outbound queue. The
    /// queue may already be closed if replay overflowed it.
    pub async fn connect(&self, identity: Identity) -> Result<(ConnectionId, mpsc::Receiver<Message>), HubError> {
        let (member, rx) = Member::new(identity, self.outbound_capacity);
        let id = member.id();
        self.register(member).await?;
        Ok((id, rx))
    }

    /// Remove a member; safe to call from `Drop` and more than once
    pub fn unregister(&self, id: ConnectionId) {
        if self.membership.send(MembershipCommand::Unregister(id)).is_err() {
            tracing::debug!("[Hub] Unregister for conn={} after hub stopped", id);
        }
    }

    pub fn subscribe(&self, id: ConnectionId, topic: impl Into<String>) -> Result<(), HubError> {
        self.membership
            .send(MembershipCommand::Subscribe { id, topic: topic.into() })
            .map_err(|_| HubError::Closed)
    }

    pub fn unsubscribe(&self, id: ConnectionId, topic: impl Into<String>) -> Result<(), HubError> {
        self.membership
            .send(MembershipCommand::Unsubscribe { id, topic: topic.into() })
            .map_err(|_| HubError::Closed)
    }

    /// Queue a message for fan-out to every member
    ///
    /// Waits only for room in the publish channel, never for delivery.
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.publish
            .send(PublishCommand::Broadcast(message))
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Queue a message for the subscribers of one topic
    pub async fn broadcast_to_topic(&self, topic: impl Into<String>, message: Message) -> Result<(), HubError> {
        self.publish
            .send(PublishCommand::BroadcastToTopic {
                topic: topic.into(),
                message,
            })
            .await
            .map_err(|_| HubError::Closed)
    }

    /// Counters as of every publish sent before this call
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();
        self.publish
            .send(PublishCommand::Stats(tx))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Snapshot of the replay history
    pub async fn history(&self) -> Result<Vec<Message>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.publish
            .send(PublishCommand::History(tx))
            .await
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Stop the control loop and close every outbound queue
    pub fn shutdown(&self) {
        let _ = self.membership.send(MembershipCommand::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.membership.is_closed()
    }
}

async fn run(
    mut state: HubState,
    mut membership: mpsc::UnboundedReceiver<MembershipCommand>,
    mut publish: mpsc::Receiver<PublishCommand>,
) {
    loop {
        tokio::select! {
            biased;

            command = membership.recv() => match command {
                Some(MembershipCommand::Shutdown) | None => break,
                Some(command) => apply_membership(&mut state, command),
            },
            command = publish.recv() => match command {
                Some(command) => apply_publish(&mut state, command),
                None => break,
            },
        }
    }

    let stats = state.stats();
    tracing::info!(
        "[Hub] Stopped, closing {} connection(s) ({} evicted over lifetime)",
        stats.connections,
        stats.evictions
    );
}

fn apply_membership(state: &mut HubState, command: MembershipCommand) {
    match command {
        MembershipCommand::Register { member, ack } => {
            let accepted = !matches!(state.register(member), RegisterOutcome::Evicted);
            if let Some(ack) = ack {
                let _ = ack.send(accepted);
            }
        }
        MembershipCommand::Unregister(id) => {
            state.unregister(id);
        }
        MembershipCommand::Subscribe { id, topic } => {
            state.subscribe(id, &topic);
        }
        MembershipCommand::Unsubscribe { id, topic } => {
            state.unsubscribe(id, &topic);
        }
        MembershipCommand::Shutdown => {}
    }
}

fn apply_publish(state: &mut HubState, command: PublishCommand) {
    match command {
        PublishCommand::Broadcast(message) => {
            tracing::debug!(
                "[Hub] Broadcast from {} mentions={:?}",
                message.sender(),
                message.mentions()
            );
            state.broadcast(message);
        }
        PublishCommand::BroadcastToTopic { topic, message } => {
            tracing::debug!("[Hub] Broadcast from {} to room {}", message.sender(), topic);
            state.broadcast_to_topic(&topic, message);
        }
        PublishCommand::Stats(reply) => {
            let _ = reply.send(state.stats());
        }
        PublishCommand::History(reply) => {
            let _ = reply.send(state.history());
        }
    }
}
