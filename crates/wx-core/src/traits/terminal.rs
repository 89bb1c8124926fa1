//! Terminal collaborator traits

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, Mutex};

use wx_protocol::TerminalSize;

/// A source of terminal size changes
#[async_trait]
pub trait TerminalSizeQueue: Send + Sync {
    /// Wait for the next size
    ///
    /// Returns `None` once no further sizes will ever be produced.
    async fn next(&self) -> Option<TerminalSize>;
}

#[async_trait]
impl<T: TerminalSizeQueue + ?Sized> TerminalSizeQueue for Arc<T> {
    async fn next(&self) -> Option<TerminalSize> {
        (**self).next().await
    }
}

#[async_trait]
impl<T: TerminalSizeQueue + ?Sized> TerminalSizeQueue for Box<T> {
    async fn next(&self) -> Option<TerminalSize> {
        (**self).next().await
    }
}

/// Size queue fed from a channel; ends when every sender is dropped
#[derive(Debug)]
pub struct SizeMonitor {
    rx: Mutex<mpsc::Receiver<TerminalSize>>,
}

impl SizeMonitor {
    /// Create a monitor and the sender that feeds it
    pub fn channel(capacity: usize) -> (mpsc::Sender<TerminalSize>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl TerminalSizeQueue for SizeMonitor {
    async fn next(&self) -> Option<TerminalSize> {
        self.rx.lock().await.recv().await
    }
}

/// An interactive terminal bound to one client session
pub trait Terminal: Send + 'static {
    /// Restores the terminal's previous settings when dropped
    type Guard: Send;
    /// Keyboard input
    type Input: AsyncRead + Send + Unpin + 'static;
    /// Screen output
    type Output: AsyncWrite + Send + Unpin + 'static;

    /// Put the terminal into raw mode for the lifetime of the returned guard
    fn raw_mode(&mut self) -> io::Result<Self::Guard>;

    /// Current size, if this is a real terminal
    fn size(&self) -> Option<TerminalSize>;

    /// Start sampling size changes, beginning with `initial`
    ///
    /// Returns `None` when there is no terminal to monitor.
    fn monitor_size(
        &mut self,
        initial: Option<TerminalSize>,
    ) -> Option<Box<dyn TerminalSizeQueue>>;

    /// Split into the input and output byte streams
    fn into_io(self) -> (Self::Input, Self::Output);
}
