//! Process stdin/stdout as a [`Terminal`]

use std::io::{self, IsTerminal};

use crossterm::terminal;
use tokio::io::{Stdin, Stdout};

use wx_core::{SizeMonitor, Terminal, TerminalSizeQueue};
use wx_protocol::TerminalSize;

/// Restores cooked mode when dropped
pub struct RawModeGuard {
    enabled: bool,
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = terminal::disable_raw_mode() {
                tracing::warn!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}

/// The controlling terminal of this process
///
/// When stdin is not a terminal (piped input), raw mode is a no-op and no
/// size is reported or monitored.
pub struct StdTerminal {
    is_tty: bool,
}

impl StdTerminal {
    /// Bind to stdin/stdout
    pub fn new() -> Self {
        Self {
            is_tty: io::stdin().is_terminal(),
        }
    }
}

impl Default for StdTerminal {
    fn default() -> Self {
        Self::new()
    }
}

fn current_size() -> io::Result<TerminalSize> {
    let (cols, rows) = terminal::size()?;
    Ok(TerminalSize::new(cols, rows))
}

impl Terminal for StdTerminal {
    type Guard = RawModeGuard;
    type Input = Stdin;
    type Output = Stdout;

    fn raw_mode(&mut self) -> io::Result<RawModeGuard> {
        if self.is_tty {
            terminal::enable_raw_mode()?;
        }
        Ok(RawModeGuard {
            enabled: self.is_tty,
        })
    }

    fn size(&self) -> Option<TerminalSize> {
        if !self.is_tty {
            return None;
        }
        current_size().ok()
    }

    #[cfg(unix)]
    fn monitor_size(
        &mut self,
        initial: Option<TerminalSize>,
    ) -> Option<Box<dyn TerminalSizeQueue>> {
        use tokio::signal::unix::{signal, SignalKind};

        if !self.is_tty {
            return None;
        }

        let mut winch = match signal(SignalKind::window_change()) {
            Ok(winch) => winch,
            Err(e) => {
                tracing::warn!("Cannot watch for window size changes: {}", e);
                return None;
            }
        };

        let (tx, monitor) = SizeMonitor::channel(1);
        tokio::spawn(async move {
            let mut last = initial;
            if let Some(size) = initial {
                if tx.send(size).await.is_err() {
                    return;
                }
            }

            while winch.recv().await.is_some() {
                // Dropping the sender stops the monitor
                let size = match current_size() {
                    Ok(size) => size,
                    Err(e) => {
                        tracing::warn!("Failed to query terminal size: {}", e);
                        return;
                    }
                };
                if last == Some(size) {
                    continue;
                }
                last = Some(size);
                if tx.send(size).await.is_err() {
                    return;
                }
            }
        });

        Some(Box::new(monitor))
    }

    #[cfg(not(unix))]
    fn monitor_size(
        &mut self,
        _initial: Option<TerminalSize>,
    ) -> Option<Box<dyn TerminalSizeQueue>> {
        None
    }

    fn into_io(self) -> (Stdin, Stdout) {
        (tokio::io::stdin(), tokio::io::stdout())
    }
}
