//! Interactive client session
//!
//! [`ClientSession::run`] holds the terminal in raw mode and drives four
//! tasks until the first of them reports an outcome:
//!
//! - sender: writes queued frames to the connection, in queue order
//! - size monitor: queues a RESIZE frame for every terminal size sample
//! - output flush: copies every inbound message to the terminal
//! - input scan: queues a DATA frame for every key unit typed
//!
//! The remaining tasks are aborted once the outcome is observed and their
//! results are discarded.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use wx_core::{MessageSink, MessageSource, SessionError, Terminal, TerminalSizeQueue};
use wx_protocol::{encode_size, Frame};

use crate::input::InputScanner;

/// Depth of the outbound frame queue; producers wait while it is full
const OUTBOUND_QUEUE_CAPACITY: usize = 1;

/// First-outcome-wins reporting shared by the session tasks
#[derive(Clone)]
struct OutcomeSlot {
    tx: mpsc::Sender<SessionError>,
}

impl OutcomeSlot {
    fn report(&self, err: SessionError) {
        if let Err(e) = self.tx.try_send(err) {
            tracing::trace!("Outcome already reported, dropping: {}", e.into_inner());
        }
    }
}

/// A terminal bound to one multiplexed connection
pub struct ClientSession<T> {
    sink: Box<dyn MessageSink>,
    source: Box<dyn MessageSource>,
    terminal: T,
}

impl<T: Terminal> ClientSession<T> {
    /// Create a session over the two halves of a connection
    pub fn new(
        sink: impl MessageSink + 'static,
        source: impl MessageSource + 'static,
        terminal: T,
    ) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
            terminal,
        }
    }

    /// Run the session until the first outcome
    ///
    /// Raw mode is restored before this returns, whichever task ended the
    /// session. A close notification from the remote side is a clean end and
    /// yields `Ok(())`.
    pub async fn run(self) -> Result<(), SessionError> {
        let Self {
            sink,
            source,
            mut terminal,
        } = self;

        let _raw = terminal.raw_mode()?;
        let sizes = terminal.monitor_size(terminal.size());
        let (input, output) = terminal.into_io();

        let (outcome_tx, mut outcome_rx) = mpsc::channel(1);
        let outcome = OutcomeSlot { tx: outcome_tx };
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        let tasks: [JoinHandle<()>; 4] = [
            tokio::spawn(send_loop(sink, outbound_rx, outcome.clone())),
            tokio::spawn(monitor_size_loop(sizes, outbound_tx.clone(), outcome.clone())),
            tokio::spawn(flush_output_loop(source, output, outcome.clone())),
            tokio::spawn(scan_input_loop(input, outbound_tx, outcome)),
        ];

        let result = outcome_rx.recv().await;
        for task in &tasks {
            task.abort();
        }

        match result {
            None => Ok(()),
            Some(err) if err.is_remote_close() => {
                tracing::debug!("Silencing remote close: {}", err);
                Ok(())
            }
            Some(err) => {
                tracing::debug!("Client session ended with: {}", err);
                Err(err)
            }
        }
    }
}

async fn send_loop(
    mut sink: Box<dyn MessageSink>,
    mut outbound: mpsc::Receiver<Frame>,
    outcome: OutcomeSlot,
) {
    tracing::debug!("Send task started");

    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send_frame(frame).await {
            tracing::debug!("Send task returned with write error: {}", e);
            outcome.report(e.into());
            return;
        }
    }

    tracing::debug!("Send task returned");
}

async fn monitor_size_loop(
    sizes: Option<Box<dyn TerminalSizeQueue>>,
    outbound: mpsc::Sender<Frame>,
    outcome: OutcomeSlot,
) {
    let Some(sizes) = sizes else {
        tracing::debug!("No terminal present, not monitoring size");
        return;
    };

    tracing::debug!("Size monitor task started");

    while let Some(size) = sizes.next().await {
        let payload = match encode_size(size) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Size monitor task returned with encode error: {}", e);
                outcome.report(e.into());
                return;
            }
        };

        tracing::debug!("Sending terminal size {}x{}", size.width, size.height);
        if outbound.send(Frame::resize(payload)).await.is_err() {
            return;
        }
    }

    tracing::debug!("Size monitor task returned, monitor stopped");
    outcome.report(SessionError::SizeMonitorStopped);
}

async fn flush_output_loop<W>(
    mut source: Box<dyn MessageSource>,
    mut output: W,
    outcome: OutcomeSlot,
) where
    W: AsyncWrite + Unpin,
{
    tracing::debug!("Output flush task started");

    loop {
        let (_, payload) = match source.recv().await {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Output flush task returned with read error: {}", e);
                outcome.report(e.into());
                return;
            }
        };

        let written = match output.write_all(&payload).await {
            Ok(()) => output.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::debug!("Output flush task returned with write error: {}", e);
            outcome.report(e.into());
            return;
        }
    }
}

async fn scan_input_loop<R>(input: R, outbound: mpsc::Sender<Frame>, outcome: OutcomeSlot)
where
    R: AsyncRead + Unpin,
{
    tracing::debug!("Input scan task started");

    let mut scanner = InputScanner::new(input);
    loop {
        match scanner.next_unit().await {
            Ok(unit) => {
                tracing::trace!("Scanned input: {}", unit.escape_ascii());
                if outbound.send(Frame::data(unit)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("Input scan task returned with read error: {}", e);
                outcome.report(e.into());
                return;
            }
        }
    }
}
