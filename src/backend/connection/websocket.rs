//! axum WebSocket adapter
//!
//! Wraps `axum::extract::ws::WebSocket` as a `Transport`. Pings from the
//! peer are answered by the WebSocket implementation itself; they are still
//! surfaced as `Frame::Ping` so the idle deadline is refreshed.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use super::transport::{Frame, FrameSink, FrameSource, Transport, TransportError};

pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl Transport for WsTransport {
    type Sink = WsSink;
    type Source = WsSource;

    fn split(self) -> (WsSink, WsSource) {
        let (sink, stream) = self.socket.split();
        (WsSink { inner: sink }, WsSource { inner: stream })
    }
}

pub struct WsSink {
    inner: SplitSink<WebSocket, WsMessage>,
}

pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.inner.next().await? {
                Ok(message) => message,
                Err(err) => return Some(Err(TransportError::Read(err.to_string()))),
            };
            if let Some(frame) = frame_from_message(message) {
                return Some(Ok(frame));
            }
        }
    }
}

/// Map a WebSocket message to a frame; `None` for undecodable binary payloads
///
/// Binary payloads are accepted when they are valid UTF-8 and discarded
/// like any other malformed frame otherwise.
fn frame_from_message(message: WsMessage) -> Option<Frame> {
    let frame = match message {
        WsMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
        WsMessage::Binary(data) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Frame::Text(text),
            Err(e) => {
                tracing::warn!("[Conn] Discarded {} byte binary frame: {}", data.len(), e);
                return None;
            }
        },
        WsMessage::Ping(_) => Frame::Ping,
        WsMessage::Pong(_) => Frame::Pong,
        WsMessage::Close(_) => Frame::Close,
    };
    Some(frame)
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => WsMessage::Text(text.into()),
            Frame::Ping => WsMessage::Ping(Bytes::new()),
            Frame::Pong => WsMessage::Pong(Bytes::new()),
            Frame::Close => WsMessage::Close(None),
        };
        self.inner
            .send(message)
            .await
            .map_err(|err| TransportError::Write(err.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner
            .close()
            .await
            .map_err(|err| TransportError::Write(err.to_string()))
    }
}
