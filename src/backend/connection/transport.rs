//! Transport Abstraction
//!
//! A connection only needs a way to read frames and a way to write them.
//! `Transport::split` hands those two halves to the ingress and egress
//! pumps, which then run independently.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A frame as seen by the pumps, independent of the underlying protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Ping,
    Pong,
    Close,
}

/// Failures of the underlying transport; all of them end the connection
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Transport closed")]
    Closed,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Inbound half of a transport
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame; `None` once the peer has gone away
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Outbound half of a transport
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Flush and close the outbound direction
    async fn close(&mut self) -> Result<(), TransportError>;
}

pub trait Transport: Send {
    type Sink: FrameSink + 'static;
    type Source: FrameSource + 'static;

    fn split(self) -> (Self::Sink, Self::Source);
}
