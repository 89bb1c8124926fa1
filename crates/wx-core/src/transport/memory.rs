//! In-memory transport halves
//!
//! [`scripted`] yields a source whose messages and failures are pushed by the
//! test, and [`recording`] yields a sink whose writes are kept in a shared
//! journal. Neither touches the network.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::traits::{ControlFrame, MessageSink, MessageSource};
use wx_protocol::MessageTag;

type Scripted = Result<(MessageTag, Bytes), TransportError>;

/// Feeds a [`ScriptedSource`]
#[derive(Debug, Clone)]
pub struct Script {
    tx: mpsc::UnboundedSender<Scripted>,
}

impl Script {
    /// Queue one inbound message
    pub fn message(&self, tag: MessageTag, payload: impl Into<Bytes>) {
        let _ = self.tx.send(Ok((tag, payload.into())));
    }

    /// Queue a binary (DATA) message
    pub fn binary(&self, payload: impl Into<Bytes>) {
        self.message(MessageTag::Binary, payload);
    }

    /// Queue a text (RESIZE) message
    pub fn text(&self, payload: impl Into<Bytes>) {
        self.message(MessageTag::Text, payload);
    }

    /// Queue a receive failure
    pub fn error(&self, err: TransportError) {
        let _ = self.tx.send(Err(err));
    }

    /// Queue a close frame from the peer
    pub fn close(&self, code: u16, reason: &str) {
        self.error(TransportError::Closed {
            code,
            reason: reason.to_string(),
        });
    }
}

/// Source replaying whatever its [`Script`] pushes
///
/// Blocks while the script is empty; once every script handle is dropped and
/// the queue is drained it reports [`TransportError::AlreadyClosed`].
#[derive(Debug)]
pub struct ScriptedSource {
    rx: mpsc::UnboundedReceiver<Scripted>,
}

/// Create a scripted source and its feeding handle
pub fn scripted() -> (Script, ScriptedSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Script { tx }, ScriptedSource { rx })
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn recv(&mut self) -> Result<(MessageTag, Bytes), TransportError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(TransportError::AlreadyClosed),
        }
    }
}

/// Something written to a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// Application message
    Message(MessageTag, Bytes),
    /// Control frame
    Control(ControlFrame),
    /// Connection closed
    Close,
}

#[derive(Debug, Default)]
struct JournalState {
    events: Vec<SinkEvent>,
    fail_messages: bool,
    fail_control: bool,
    stall_messages: bool,
    stall_control: bool,
    stall_close: bool,
}

/// Shared view of everything a [`RecordingSink`] wrote
#[derive(Debug, Clone, Default)]
pub struct SinkJournal {
    state: Arc<Mutex<JournalState>>,
}

impl SinkJournal {
    fn lock(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything written so far, in order
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().events.clone()
    }

    /// Application messages written so far
    pub fn messages(&self) -> Vec<(MessageTag, Bytes)> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Message(tag, payload) => Some((*tag, payload.clone())),
                _ => None,
            })
            .collect()
    }

    /// Control frames written so far
    pub fn controls(&self) -> Vec<ControlFrame> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Control(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of pings written so far
    pub fn ping_count(&self) -> usize {
        self.controls()
            .iter()
            .filter(|frame| matches!(frame, ControlFrame::Ping(_)))
            .count()
    }

    /// Number of times the connection was closed
    pub fn close_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, SinkEvent::Close))
            .count()
    }

    /// Make message writes fail
    pub fn fail_messages(&self, fail: bool) {
        self.lock().fail_messages = fail;
    }

    /// Make control writes fail
    pub fn fail_control(&self, fail: bool) {
        self.lock().fail_control = fail;
    }

    /// Make message writes never complete
    pub fn stall_messages(&self, stall: bool) {
        self.lock().stall_messages = stall;
    }

    /// Make control writes never complete
    pub fn stall_control(&self, stall: bool) {
        self.lock().stall_control = stall;
    }

    /// Make closing never complete (the close is still recorded)
    pub fn stall_close(&self, stall: bool) {
        self.lock().stall_close = stall;
    }
}

/// Sink that records writes into a [`SinkJournal`]
#[derive(Debug)]
pub struct RecordingSink {
    journal: SinkJournal,
    closed: bool,
}

/// Create a recording sink and its journal
pub fn recording() -> (SinkJournal, RecordingSink) {
    let journal = SinkJournal::default();
    let sink = RecordingSink {
        journal: journal.clone(),
        closed: false,
    };
    (journal, sink)
}

fn broken_pipe() -> TransportError {
    TransportError::Io(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "recording sink set to fail",
    ))
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&mut self, tag: MessageTag, payload: Bytes) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::AlreadyClosed);
        }
        let stall = {
            let mut state = self.journal.lock();
            if state.fail_messages {
                return Err(broken_pipe());
            }
            if !state.stall_messages {
                state.events.push(SinkEvent::Message(tag, payload));
            }
            state.stall_messages
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn send_control(&mut self, frame: ControlFrame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::AlreadyClosed);
        }
        let stall = {
            let mut state = self.journal.lock();
            if state.fail_control {
                return Err(broken_pipe());
            }
            if !state.stall_control {
                state.events.push(SinkEvent::Control(frame));
            }
            state.stall_control
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        let stall = {
            let mut state = self.journal.lock();
            state.events.push(SinkEvent::Close);
            state.stall_close
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
