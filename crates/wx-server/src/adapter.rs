//! Stream adapter over a wsexec connection
//!
//! One reader (the exec stdin pump) calls [`StreamAdapter::read`], any number
//! of writers call [`StreamAdapter::write`], the exec resize handler pulls
//! from [`StreamAdapter::next_size`] and a single task runs
//! [`StreamAdapter::keepalive`] for the lifetime of the connection.
//!
//! Teardown is funnelled through one bounded outcome queue. Whoever observes
//! the end first (the reader, or the embedder via [`StreamAdapter::close`])
//! reports it; the keepalive loop consumes the first report, sends a close
//! frame when one is owed and closes the transport exactly once. Closing
//! also releases a blocked reader or writer, so a peer that went silent
//! cannot pin the connection.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use bytes::{Buf, Bytes};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use wx_core::config::ServerConfig;
use wx_core::error::CLOSE_NORMAL;
use wx_core::{
    ControlFrame, MessageSink, MessageSource, SessionError, TerminalSizeQueue, TransportError,
};
use wx_protocol::{decode_size, Frame, FrameKind, TerminalSize, END_OF_TRANSMISSION};

use crate::record::Recorder;

/// Room for the reader's report plus one from the embedder
const OUTCOME_QUEUE_CAPACITY: usize = 2;

const PING_PAYLOAD: &[u8] = b"ping";

/// Longest reason a websocket close frame can carry
const MAX_CLOSE_REASON: usize = 123;

struct ReadState {
    source: Box<dyn MessageSource>,
    /// Unread tail of the last DATA frame
    pending: Bytes,
    /// The inbound stream has ended; further reads return 0
    finished: bool,
}

impl ReadState {
    fn drain_into(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        n
    }
}

/// Exec-facing view of one multiplexed connection
pub struct StreamAdapter {
    config: ServerConfig,
    sink: Mutex<Box<dyn MessageSink>>,
    reader: Mutex<ReadState>,
    latest_size: StdMutex<Option<TerminalSize>>,
    size_ready: Notify,
    outcome_tx: mpsc::Sender<Option<SessionError>>,
    outcome_rx: Mutex<mpsc::Receiver<Option<SessionError>>>,
    closed: AtomicBool,
    /// Fired once the transport is torn down
    teardown: CancellationToken,
    recorder: Recorder,
}

impl StreamAdapter {
    /// Wrap a connection with the default keepalive timings
    pub fn new(sink: impl MessageSink + 'static, source: impl MessageSource + 'static) -> Self {
        Self::with_config(sink, source, ServerConfig::default())
    }

    /// Wrap a connection with explicit keepalive timings
    pub fn with_config(
        sink: impl MessageSink + 'static,
        source: impl MessageSource + 'static,
        config: ServerConfig,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_QUEUE_CAPACITY);
        Self {
            config,
            sink: Mutex::new(Box::new(sink)),
            reader: Mutex::new(ReadState {
                source: Box::new(source),
                pending: Bytes::new(),
                finished: false,
            }),
            latest_size: StdMutex::new(None),
            size_ready: Notify::new(),
            outcome_tx,
            outcome_rx: Mutex::new(outcome_rx),
            closed: AtomicBool::new(false),
            teardown: CancellationToken::new(),
            recorder: Recorder::default(),
        }
    }

    /// Record every inbound DATA frame to `writer`
    pub fn with_debug_input(mut self, writer: impl Write + Send + 'static) -> Self {
        self.recorder.set_input(writer);
        self
    }

    /// Record all process output to `writer`
    pub fn with_debug_output(mut self, writer: impl Write + Send + 'static) -> Self {
        self.recorder.set_output(writer);
        self
    }

    /// Read process input
    ///
    /// Blocks until DATA arrives and copies as much of it as fits; the rest
    /// is returned by the following reads. RESIZE frames met on the way are
    /// published to [`next_size`](Self::next_size) and never surface here.
    ///
    /// Returns 0 once the peer closed normally, the connection is gone or
    /// the keepalive loop tore the transport down.
    /// Any other failure yields a single [`END_OF_TRANSMISSION`] byte so the
    /// remote shell sees end of input, is reported to the keepalive loop,
    /// and every later read returns 0.
    pub async fn read(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let mut state = self.reader.lock().await;
        if !state.pending.is_empty() {
            return state.drain_into(buf);
        }
        if state.finished {
            return 0;
        }

        let failure = loop {
            let received = tokio::select! {
                biased;
                _ = self.teardown.cancelled() => Err(TransportError::AlreadyClosed),
                received = state.source.recv() => received,
            };
            let (tag, payload) = match received {
                Ok(message) => message,
                Err(e) => break SessionError::from(e),
            };

            match FrameKind::from_tag(tag) {
                Ok(FrameKind::Data) => {
                    if payload.is_empty() {
                        trace!("Skipping empty data frame");
                        continue;
                    }
                    self.recorder.record_input(&payload);
                    state.pending = payload;
                    return state.drain_into(buf);
                }
                Ok(FrameKind::Resize) => match decode_size(&payload) {
                    Ok(size) => {
                        debug!("Remote terminal resized to {}x{}", size.width, size.height);
                        self.publish_size(size);
                    }
                    Err(e) => break e.into(),
                },
                Err(e) => break e.into(),
            }
        };

        state.finished = true;
        drop(state);
        self.finish_read(failure, buf)
    }

    fn finish_read(&self, failure: SessionError, buf: &mut [u8]) -> usize {
        let clean = matches!(
            &failure,
            SessionError::Transport(e) if e.is_normal_close() || e.is_already_closed()
        );
        if clean {
            debug!("Input stream ended: {}", failure);
            self.report(None);
            return 0;
        }

        if failure.is_remote_close() {
            debug!("Remote closed abnormally: {}", failure);
        } else {
            warn!("Input stream failed: {}", failure);
        }
        debug!("Ending remote input with EOT");
        buf[0] = END_OF_TRANSMISSION;
        self.report(Some(failure));
        1
    }

    /// Write process output as one DATA frame
    ///
    /// The returned count is always `buf.len()`, even when the send failed.
    /// After teardown every write fails with [`TransportError::AlreadyClosed`].
    pub async fn write(&self, buf: &[u8]) -> (usize, Result<(), TransportError>) {
        let frame = Frame::data(Bytes::copy_from_slice(buf));
        let result = tokio::select! {
            biased;
            _ = self.teardown.cancelled() => Err(TransportError::AlreadyClosed),
            result = async {
                let mut sink = self.sink.lock().await;
                sink.send_frame(frame).await
            } => result,
        };
        if let Err(e) = &result {
            debug!("Output write failed: {}", e);
        }
        self.recorder.record_output(buf);
        (buf.len(), result)
    }

    /// Wait for the next remote terminal size
    ///
    /// Only the most recent size is kept; sizes superseded before anyone
    /// asked are dropped.
    pub async fn next_size(&self) -> TerminalSize {
        loop {
            if let Some(size) = self.take_size() {
                return size;
            }
            self.size_ready.notified().await;
        }
    }

    fn publish_size(&self, size: TerminalSize) {
        let mut latest = self
            .latest_size
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if latest.replace(size).is_some() {
            trace!("Dropping superseded terminal size");
        }
        drop(latest);
        self.size_ready.notify_one();
    }

    fn take_size(&self) -> Option<TerminalSize> {
        self.latest_size
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Report the exec outcome and start teardown
    ///
    /// Never blocks. Only the first outcome reaching the keepalive loop
    /// counts; a report that finds the queue full is dropped.
    pub fn close(&self, outcome: Option<SessionError>) {
        debug!(
            "Closing stream: {}",
            outcome
                .as_ref()
                .map_or_else(|| "clean exit".to_string(), ToString::to_string)
        );
        self.report(outcome);
    }

    fn report(&self, outcome: Option<SessionError>) {
        if self.outcome_tx.try_send(outcome).is_err() {
            trace!("Outcome queue full, dropping report");
        }
    }

    /// Keep the connection alive until an outcome is reported
    ///
    /// Pings the peer every `ping_interval`. A failed or stalled ping ends
    /// the loop with that error. Otherwise the first reported outcome ends
    /// it: a close frame carrying the error text is sent unless the outcome
    /// is clean or the peer already closed. The transport is closed on every
    /// exit path.
    pub async fn keepalive(&self) -> Result<(), SessionError> {
        let mut outcomes = self.outcome_rx.lock().await;
        let mut ticker = time::interval_at(
            Instant::now() + self.config.ping_interval,
            self.config.ping_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.ping().await {
                        warn!("Keepalive ping failed: {}", e);
                        break Err(e.into());
                    }
                }
                outcome = outcomes.recv() => {
                    let outcome = outcome.flatten();
                    if let Some(err) = &outcome {
                        self.send_close_frame(err).await;
                    }
                    break outcome.map_or(Ok(()), Err);
                }
            }
        };
        drop(outcomes);

        self.close_transport().await;
        result
    }

    async fn ping(&self) -> Result<(), TransportError> {
        trace!("Sending keepalive ping");
        let mut sink = self.sink.lock().await;
        time::timeout(
            self.config.ping_timeout,
            sink.send_control(ControlFrame::Ping(Bytes::from_static(PING_PAYLOAD))),
        )
        .await
        .map_err(|_| TransportError::Timeout("ping"))?
    }

    async fn send_close_frame(&self, err: &SessionError) {
        if err.is_remote_close() {
            debug!("Peer already closed, no close frame owed");
            return;
        }

        debug!("Sending close frame: {}", err);
        let frame = ControlFrame::Close {
            code: CLOSE_NORMAL,
            reason: close_reason(err),
        };
        let mut sink = self.sink.lock().await;
        match time::timeout(self.config.close_timeout, sink.send_control(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to send close frame: {}", e),
            Err(_) => warn!("Timed out sending close frame"),
        }
    }

    async fn close_transport(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Release readers and writers before touching the sink, a stalled
        // writer may be holding its lock
        self.teardown.cancel();

        let closing = async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        };
        match time::timeout(self.config.close_timeout, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error closing transport: {}", e),
            Err(_) => warn!("Timed out closing transport"),
        }
    }
}

#[async_trait]
impl TerminalSizeQueue for StreamAdapter {
    async fn next(&self) -> Option<TerminalSize> {
        Some(self.next_size().await)
    }
}

fn close_reason(err: &SessionError) -> String {
    let mut reason = err.to_string();
    if reason.len() > MAX_CLOSE_REASON {
        let mut end = MAX_CLOSE_REASON;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    use wx_core::transport::memory::{recording, scripted, Script, SinkEvent, SinkJournal};
    use wx_protocol::{MessageTag, ProtocolError};

    fn adapter() -> (Script, SinkJournal, Arc<StreamAdapter>) {
        let (script, source) = scripted();
        let (journal, sink) = recording();
        (script, journal, Arc::new(StreamAdapter::new(sink, source)))
    }

    fn close_frames(journal: &SinkJournal) -> Vec<(u16, String)> {
        journal
            .controls()
            .into_iter()
            .filter_map(|frame| match frame {
                ControlFrame::Close { code, reason } => Some((code, reason)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_read_returns_data_and_publishes_resize() {
        let (script, _journal, adapter) = adapter();
        script.text(&br#"{"Width":80,"Height":24}"#[..]);
        script.binary(&b"ab"[..]);

        let mut buf = [0u8; 16];
        let n = adapter.read(&mut buf).await;
        assert_eq!(&buf[..n], b"ab");
        assert_eq!(adapter.next_size().await, TerminalSize::new(80, 24));
    }

    #[tokio::test]
    async fn test_read_keeps_leftover_payload() {
        let (script, _journal, adapter) = adapter();
        script.binary(&b"hello world"[..]);

        let mut buf = [0u8; 4];
        let mut collected = Vec::new();
        for _ in 0..3 {
            let n = adapter.read(&mut buf).await;
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test]
    async fn test_read_skips_empty_data() {
        let (script, _journal, adapter) = adapter();
        script.binary(Bytes::new());
        script.binary(&b"x"[..]);

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 1);
        assert_eq!(buf[0], b'x');
    }

    #[tokio::test]
    async fn test_normal_close_is_end_of_stream() {
        let (script, journal, adapter) = adapter();
        script.close(CLOSE_NORMAL, "");

        let mut buf = [0xffu8; 4];
        assert_eq!(adapter.read(&mut buf).await, 0);
        assert_eq!(buf, [0xff; 4]);
        assert_eq!(adapter.read(&mut buf).await, 0);

        assert!(adapter.keepalive().await.is_ok());
        assert!(close_frames(&journal).is_empty());
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_connection_is_end_of_stream() {
        let (script, journal, adapter) = adapter();
        drop(script);

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 0);
        assert!(adapter.keepalive().await.is_ok());
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_yields_eot_once() {
        let (script, journal, adapter) = adapter();
        script.error(TransportError::Io(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        )));

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 1);
        assert_eq!(buf[0], END_OF_TRANSMISSION);
        assert_eq!(adapter.read(&mut buf).await, 0);

        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Io(_))));

        let frames = close_frames(&journal);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, CLOSE_NORMAL);
        assert!(frames[0].1.contains("reset"));
        assert_eq!(journal.events().last(), Some(&SinkEvent::Close));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_abnormal_remote_close_sends_no_close_frame() {
        let (script, journal, adapter) = adapter();
        script.close(1011, "internal error");

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 1);
        assert_eq!(buf[0], END_OF_TRANSMISSION);

        let err = adapter.keepalive().await.unwrap_err();
        assert!(err.is_remote_close());
        assert!(close_frames(&journal).is_empty());
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_message_type_is_protocol_error() {
        let (script, journal, adapter) = adapter();
        script.message(MessageTag::Other(0x3), &b"??"[..]);

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 1);
        assert_eq!(buf[0], END_OF_TRANSMISSION);

        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::UnexpectedMessageType(MessageTag::Other(0x3)))
        ));
        assert_eq!(close_frames(&journal).len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_resize_ends_stream() {
        let (script, _journal, adapter) = adapter();
        script.text(&b"{not json"[..]);

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 1);
        assert_eq!(buf[0], END_OF_TRANSMISSION);
        assert!(matches!(
            adapter.keepalive().await,
            Err(SessionError::Protocol(ProtocolError::MalformedSize(_)))
        ));
    }

    #[tokio::test]
    async fn test_write_sends_data_frame() {
        let (_script, journal, adapter) = adapter();
        let (n, result) = adapter.write(b"out").await;
        assert_eq!(n, 3);
        assert!(result.is_ok());
        assert_eq!(
            journal.messages(),
            vec![(MessageTag::Binary, Bytes::from_static(b"out"))]
        );
    }

    #[tokio::test]
    async fn test_write_failure_still_reports_full_length() {
        let (_script, journal, adapter) = adapter();
        journal.fail_messages(true);
        let (n, result) = adapter.write(b"lost").await;
        assert_eq!(n, 4);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_latest_size_wins() {
        let (script, _journal, adapter) = adapter();
        script.text(&br#"{"Width":80,"Height":24}"#[..]);
        script.text(&br#"{"Width":132,"Height":43}"#[..]);
        script.binary(&b"x"[..]);

        let mut buf = [0u8; 4];
        adapter.read(&mut buf).await;
        assert_eq!(adapter.next_size().await, TerminalSize::new(132, 43));
        assert!(
            time::timeout(Duration::from_millis(20), adapter.next_size())
                .await
                .is_err(),
            "superseded size must not be delivered"
        );
    }

    #[tokio::test]
    async fn test_next_size_waits_for_resize() {
        let (script, _journal, adapter) = adapter();
        let waiter = tokio::spawn({
            let adapter = adapter.clone();
            async move { TerminalSizeQueue::next(adapter.as_ref()).await }
        });

        script.text(&br#"{"Width":100,"Height":30}"#[..]);
        script.binary(&b"x"[..]);
        let mut buf = [0u8; 4];
        adapter.read(&mut buf).await;

        assert_eq!(waiter.await.unwrap(), Some(TerminalSize::new(100, 30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_every_interval() {
        let (_script, journal, adapter) = adapter();
        let task = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.keepalive().await }
        });

        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(journal.ping_count(), 3);
        assert!(journal.controls().iter().all(|frame| {
            matches!(frame, ControlFrame::Ping(payload) if payload.as_ref() == PING_PAYLOAD)
        }));

        adapter.close(None);
        assert!(task.await.unwrap().is_ok());
        assert!(close_frames(&journal).is_empty());
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ping_ends_keepalive() {
        let (_script, journal, adapter) = adapter();
        journal.fail_control(true);

        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(TransportError::Io(_))));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_ping_times_out() {
        let (_script, journal, adapter) = adapter();
        journal.stall_control(true);

        let started = Instant::now();
        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Timeout("ping"))
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_exec_failure_sends_close_frame_with_reason() {
        let (_script, journal, adapter) = adapter();
        adapter.close(Some(SessionError::Exec("command not found".to_string())));

        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(err, SessionError::Exec(_)));

        let frames = close_frames(&journal);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, CLOSE_NORMAL);
        assert!(frames[0].1.ends_with("command not found"));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_close_frame_is_bounded() {
        let (_script, journal, adapter) = adapter();
        journal.stall_control(true);
        adapter.close(Some(SessionError::Exec("boom".to_string())));

        let started = Instant::now();
        assert!(adapter.keepalive().await.is_err());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test]
    async fn test_first_outcome_wins() {
        let (_script, journal, adapter) = adapter();
        adapter.close(None);
        adapter.close(Some(SessionError::Exec("late".to_string())));
        adapter.close(Some(SessionError::Exec("dropped".to_string())));

        assert!(adapter.keepalive().await.is_ok());
        assert!(close_frames(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_transport_closes_once() {
        let (_script, journal, adapter) = adapter();
        adapter.close_transport().await;
        adapter.close_transport().await;
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_transport_close_is_bounded() {
        let (_script, journal, adapter) = adapter();
        journal.stall_close(true);
        adapter.close(None);

        let started = Instant::now();
        assert!(adapter.keepalive().await.is_ok());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_is_torn_down() {
        let (_script, journal, adapter) = adapter();
        journal.stall_control(true);
        journal.stall_close(true);

        let reader = tokio::spawn({
            let adapter = adapter.clone();
            async move {
                let mut buf = [0u8; 4];
                adapter.read(&mut buf).await
            }
        });

        let started = Instant::now();
        let err = adapter.keepalive().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Timeout("ping"))
        ));
        // interval, then ping timeout, then close timeout
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));

        assert_eq!(reader.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_teardown_releases_blocked_read() {
        let (_script, journal, adapter) = adapter();
        let reader = tokio::spawn({
            let adapter = adapter.clone();
            async move {
                let mut buf = [0xffu8; 4];
                let n = adapter.read(&mut buf).await;
                (n, buf)
            }
        });
        tokio::task::yield_now().await;

        adapter.close(Some(SessionError::Exec("done".to_string())));
        assert!(adapter.keepalive().await.is_err());

        let (n, buf) = time::timeout(Duration::from_secs(5), reader)
            .await
            .expect("read should end once the transport is closed")
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(buf, [0xff; 4]);

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).await, 0);
        assert_eq!(journal.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_releases_stalled_write() {
        let (_script, journal, adapter) = adapter();
        journal.stall_messages(true);

        let writer = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.write(b"stuck").await }
        });
        tokio::task::yield_now().await;

        adapter.close(None);
        assert!(adapter.keepalive().await.is_ok());

        let (n, result) = writer.await.unwrap();
        assert_eq!(n, 5);
        assert!(result.unwrap_err().is_already_closed());
        assert_eq!(journal.close_count(), 1);

        let (_, result) = adapter.write(b"late").await;
        assert!(result.unwrap_err().is_already_closed());
    }

    #[test]
    fn test_close_reason_is_truncated_on_char_boundary() {
        let err = SessionError::Exec("é".repeat(100));
        let reason = close_reason(&err);
        assert!(reason.len() <= MAX_CLOSE_REASON);
        assert!(reason.starts_with("exec stream failed: "));
    }

    #[tokio::test]
    async fn test_debug_recorders() {
        #[derive(Clone, Default)]
        struct Shared(Arc<StdMutex<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (script, source) = scripted();
        let (_journal, sink) = recording();
        let input = Shared::default();
        let output = Shared::default();
        let adapter = StreamAdapter::new(sink, source)
            .with_debug_input(input.clone())
            .with_debug_output(output.clone());

        script.binary(&b"ls\r"[..]);
        let mut buf = [0u8; 8];
        adapter.read(&mut buf).await;
        adapter.write(b"file\r\n").await.1.unwrap();

        assert_eq!(&input.0.lock().unwrap()[..], b"\"ls\\r\"\n");
        assert_eq!(&output.0.lock().unwrap()[..], b"file\r\n");
    }
}
