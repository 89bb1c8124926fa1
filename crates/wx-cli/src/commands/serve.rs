//! `wsexec serve`: run a shell for every websocket connection

use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use portable_pty::{Child, ChildKiller, ExitStatus};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use wx_core::config::ServeConfig;
use wx_core::transport::ws;
use wx_core::SessionError;
use wx_protocol::TerminalSize;
use wx_server::StreamAdapter;

use crate::output::print_success;
use crate::pty::{PtyResizer, PtyShell};

const INPUT_BUFFER_SIZE: usize = 4096;
const OUTPUT_CHUNK_SIZE: usize = 4096;
const OUTPUT_QUEUE_CAPACITY: usize = 32;

/// How long output written just before the shell exited may still drain
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Bind the configured address and serve until cancelled
pub async fn serve_command(config: ServeConfig, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    print_success(&format!("Listening on ws://{}", listener.local_addr()?));

    serve(listener, Arc::new(config), cancel).await
}

/// Accept connections on `listener` until `cancel` fires
///
/// Open connections are torn down when the loop stops.
pub async fn serve(
    listener: TcpListener,
    config: Arc<ServeConfig>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Shutting down, dropping {} connection(s)", connections.len());
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                tracing::info!("Connection from {}", peer);
                let config = config.clone();
                connections.spawn(async move {
                    match serve_connection(stream, config).await {
                        Ok(()) => tracing::info!("Connection from {} closed", peer),
                        Err(e) => tracing::warn!("Connection from {} failed: {:#}", peer, e),
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
    Ok(())
}

fn build_adapter(
    sink: ws::WsSink<TcpStream>,
    source: ws::WsSource<TcpStream>,
    config: &ServeConfig,
) -> Result<StreamAdapter> {
    let mut adapter = StreamAdapter::with_config(sink, source, config.adapter.clone());
    if let Some(path) = &config.debug_input {
        let file = File::create(path)
            .with_context(|| format!("Failed to create input record {:?}", path))?;
        adapter = adapter.with_debug_input(file);
    }
    if let Some(path) = &config.debug_output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output record {:?}", path))?;
        adapter = adapter.with_debug_output(file);
    }
    Ok(adapter)
}

async fn serve_connection(stream: TcpStream, config: Arc<ServeConfig>) -> Result<()> {
    let websocket = tokio_tungstenite::accept_async(stream)
        .await
        .context("Websocket handshake failed")?;
    let (sink, source) = ws::split(websocket);
    let adapter = Arc::new(build_adapter(sink, source, &config)?);

    let keepalive = tokio::spawn({
        let adapter = adapter.clone();
        async move { adapter.keepalive().await }
    });

    let outcome = run_shell(&adapter, &config).await;
    if let Err(e) = &outcome {
        tracing::debug!("Shell ended with error: {:#}", e);
    }
    adapter.close(outcome.err().map(|e| SessionError::Exec(format!("{:#}", e))));

    match keepalive.await.context("Keepalive task failed")? {
        Err(e) if !e.is_remote_close() => Err(e.into()),
        _ => Ok(()),
    }
}

/// Run one shell wired to the adapter until either side goes away
async fn run_shell(adapter: &Arc<StreamAdapter>, config: &ServeConfig) -> Result<()> {
    let PtyShell {
        mut child,
        reader,
        writer,
        resizer,
    } = PtyShell::spawn(config.shell.as_deref(), &config.env, TerminalSize::default())?;
    let mut killer = child.clone_killer();

    let mut input = tokio::spawn(pump_input(adapter.clone(), writer));
    let mut output = tokio::spawn(pump_output(adapter.clone(), reader));
    let resize = tokio::spawn(pump_resize(adapter.clone(), resizer));
    let mut wait = tokio::task::spawn_blocking(move || child.wait());

    let outcome = tokio::select! {
        status = &mut wait => {
            // Flush what the shell printed on its way out
            let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut output).await;
            exit_outcome(status)
        }
        finished = &mut input => joined(finished),
    };

    input.abort();
    output.abort();
    resize.abort();
    if let Err(e) = killer.kill() {
        tracing::trace!("Shell already gone: {}", e);
    }
    outcome
}

fn exit_outcome(status: Result<io::Result<ExitStatus>, JoinError>) -> Result<()> {
    let status = status
        .context("Shell wait task failed")?
        .context("Failed to wait for shell")?;
    tracing::info!("Shell exited with code {}", status.exit_code());
    if status.success() {
        Ok(())
    } else {
        anyhow::bail!("shell exited with code {}", status.exit_code())
    }
}

fn joined(finished: Result<Result<()>, JoinError>) -> Result<()> {
    finished.context("Stream pump task failed")?
}

/// Remote keystrokes into the PTY
async fn pump_input(adapter: Arc<StreamAdapter>, mut writer: Box<dyn Write + Send>) -> Result<()> {
    let mut buf = vec![0u8; INPUT_BUFFER_SIZE];
    loop {
        let n = adapter.read(&mut buf).await;
        if n == 0 {
            tracing::debug!("Remote input ended");
            return Ok(());
        }

        let data = buf[..n].to_vec();
        writer = tokio::task::spawn_blocking(move || -> io::Result<_> {
            writer.write_all(&data)?;
            writer.flush()?;
            Ok(writer)
        })
        .await
        .context("PTY writer task failed")?
        .context("Failed to write to PTY")?;
    }
}

/// PTY output back to the remote terminal
///
/// A failed send does not end the session. The reader and the keepalive
/// loop notice a dead connection, and the PTY keeps being drained until
/// the shell goes away.
async fn pump_output(adapter: Arc<StreamAdapter>, mut reader: Box<dyn Read + Send>) {
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(OUTPUT_QUEUE_CAPACITY);

    // portable-pty readers block, so they get their own thread
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; OUTPUT_CHUNK_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    // EIO once the shell has exited
                    tracing::debug!("PTY read ended: {}", e);
                    break;
                }
            }
        }
    });

    let mut failures = 0usize;
    while let Some(chunk) = rx.recv().await {
        let (_, result) = adapter.write(&chunk).await;
        if let Err(e) = result {
            if failures == 0 {
                tracing::warn!("Failed to send shell output: {}", e);
            } else {
                tracing::trace!("Failed to send shell output: {}", e);
            }
            failures += 1;
        }
    }
    if failures > 0 {
        tracing::debug!("Dropped {} chunk(s) of shell output", failures);
    }
}

/// Remote window sizes onto the PTY
async fn pump_resize(adapter: Arc<StreamAdapter>, resizer: PtyResizer) {
    loop {
        let size = adapter.next_size().await;
        if let Err(e) = resizer.resize(size) {
            tracing::warn!("{:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use wx_core::transport::memory;

    /// Hands out fixed chunks, then end of file
    struct Chunks(VecDeque<&'static [u8]>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_keeps_draining_after_send_failure() {
        let (_script, source) = memory::scripted();
        let (journal, sink) = memory::recording();
        journal.fail_messages(true);
        let record = Shared::default();
        let adapter =
            Arc::new(StreamAdapter::new(sink, source).with_debug_output(record.clone()));

        let reader = Chunks(VecDeque::from([&b"one"[..], &b"two"[..]]));
        tokio::time::timeout(Duration::from_secs(5), pump_output(adapter, Box::new(reader)))
            .await
            .expect("output pump should finish at end of file");

        assert_eq!(record.0.lock().unwrap().as_slice(), b"onetwo");
        assert!(journal.messages().is_empty());
    }
}
