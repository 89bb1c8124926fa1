//! Websocket transport binding
//!
//! Text frames carry resize events and binary frames carry terminal data.
//! Ping frames are answered by tungstenite itself; both ping and pong are
//! swallowed here so callers only ever see application messages.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::error::{TransportError, CLOSE_NO_STATUS};
use crate::traits::{ControlFrame, MessageSink, MessageSource};
use wx_protocol::MessageTag;

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::AlreadyClosed
            }
            tungstenite::Error::Io(e) => Self::Io(e),
            other => Self::Websocket(other.to_string()),
        }
    }
}

/// Sending half of a websocket connection
pub struct WsSink<S> {
    inner: SplitSink<WebSocketStream<S>, Message>,
}

/// Receiving half of a websocket connection
pub struct WsSource<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

/// Split an established websocket into transport halves
pub fn split<S>(stream: WebSocketStream<S>) -> (WsSink<S>, WsSource<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, source) = stream.split();
    (WsSink { inner: sink }, WsSource { inner: source })
}

fn close_error(frame: Option<CloseFrame>) -> TransportError {
    match frame {
        Some(frame) => TransportError::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned(),
        },
        None => TransportError::Closed {
            code: CLOSE_NO_STATUS,
            reason: String::new(),
        },
    }
}

#[async_trait]
impl<S> MessageSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<(MessageTag, Bytes), TransportError> {
        loop {
            let message = match self.inner.next().await {
                Some(message) => message?,
                None => return Err(TransportError::AlreadyClosed),
            };

            match message {
                Message::Binary(data) => return Ok((MessageTag::Binary, data)),
                Message::Text(text) => {
                    return Ok((
                        MessageTag::Text,
                        Bytes::copy_from_slice(text.as_str().as_bytes()),
                    ))
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(frame) => return Err(close_error(frame)),
                Message::Frame(frame) => {
                    let opcode = u8::from(frame.header().opcode);
                    return Ok((MessageTag::Other(opcode), Bytes::new()));
                }
            }
        }
    }
}

#[async_trait]
impl<S> MessageSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, tag: MessageTag, payload: Bytes) -> Result<(), TransportError> {
        let message = match tag {
            MessageTag::Binary => Message::Binary(payload),
            MessageTag::Text => {
                let text = String::from_utf8(payload.to_vec())
                    .map_err(|_| TransportError::InvalidPayload { tag })?;
                Message::text(text)
            }
            MessageTag::Other(_) => return Err(TransportError::InvalidPayload { tag }),
        };

        self.inner.send(message).await?;
        Ok(())
    }

    async fn send_control(&mut self, frame: ControlFrame) -> Result<(), TransportError> {
        let message = match frame {
            ControlFrame::Ping(data) => Message::Ping(data),
            ControlFrame::Close { code, reason } => Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            })),
        };

        self.inner.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close().await?;
        Ok(())
    }
}
