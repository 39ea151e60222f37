//! In-memory transport for driving connections from tests

use std::time::Duration;

use async_trait::async_trait;
use crm_relay::backend::connection::{Frame, FrameSink, FrameSource, Transport, TransportError};
use crm_relay::shared::Message;
use tokio::sync::mpsc;

/// Server side of an in-memory duplex channel
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<Frame>,
    stall_writes: bool,
}

/// Client side: what the test uses to talk to the connection
pub struct TestPeer {
    to_server: Option<mpsc::UnboundedSender<Frame>>,
    pub from_server: mpsc::UnboundedReceiver<Frame>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, TestPeer) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        let transport = Self {
            inbound,
            outbound,
            stall_writes: false,
        };
        let peer = TestPeer {
            to_server: Some(to_server),
            from_server,
        };
        (transport, peer)
    }

    /// Writes never complete, like a peer that stopped reading its socket
    pub fn stalled() -> (Self, TestPeer) {
        let (mut transport, peer) = Self::pair();
        transport.stall_writes = true;
        (transport, peer)
    }
}

pub struct ChannelSource {
    inbound: mpsc::UnboundedReceiver<Frame>,
}

pub struct ChannelSink {
    outbound: mpsc::UnboundedSender<Frame>,
    stall_writes: bool,
}

impl Transport for ChannelTransport {
    type Sink = ChannelSink;
    type Source = ChannelSource;

    fn split(self) -> (ChannelSink, ChannelSource) {
        (
            ChannelSink {
                outbound: self.outbound,
                stall_writes: self.stall_writes,
            },
            ChannelSource { inbound: self.inbound },
        )
    }
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if self.stall_writes {
            std::future::pending::<()>().await;
        }
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl TestPeer {
    pub fn send_text(&self, text: &str) {
        if let Some(tx) = &self.to_server {
            tx.send(Frame::Text(text.to_string())).unwrap();
        }
    }

    pub fn send(&self, frame: Frame) {
        if let Some(tx) = &self.to_server {
            tx.send(frame).unwrap();
        }
    }

    /// End of stream from the client side
    pub fn hang_up(&mut self) {
        self.to_server = None;
    }

    /// Refuse further frames from the server, so its writes fail
    pub fn stop_reading(&mut self) {
        self.from_server.close();
    }

    /// Next frame other than a keep-alive ping
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), self.from_server.recv())
                .await
                .expect("timed out waiting for a frame")?;
            if frame != Frame::Ping {
                return Some(frame);
            }
        }
    }

    /// Next frame, which must be a text frame
    pub async fn next_text(&mut self) -> String {
        match self.next_frame().await {
            Some(Frame::Text(text)) => text,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    pub async fn next_message(&mut self) -> Message {
        serde_json::from_str(&self.next_text().await).unwrap()
    }
}
