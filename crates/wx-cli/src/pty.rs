//! Shell processes on a pseudo-terminal
//!
//! Thin wrapper over portable-pty that spawns one shell and hands its
//! blocking reader, writer and child handle to the caller.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

use wx_protocol::TerminalSize;

#[cfg(windows)]
const FALLBACK_SHELL: &str = "cmd.exe";
#[cfg(not(windows))]
const FALLBACK_SHELL: &str = "/bin/sh";

/// Pick the shell to run
///
/// An explicit request wins, then the login shell, then the platform
/// default. Absolute paths must exist.
pub fn resolve_shell(requested: Option<&str>, login_shell: Option<&str>) -> Result<String> {
    let shell = requested
        .or(login_shell)
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or(FALLBACK_SHELL);

    let path = Path::new(shell);
    if path.is_absolute() && !path.exists() {
        anyhow::bail!("Shell '{}' does not exist", shell);
    }
    Ok(shell.to_string())
}

fn pty_size(size: TerminalSize) -> PtySize {
    PtySize {
        rows: size.height,
        cols: size.width,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Resizes the PTY a shell runs on
#[derive(Clone)]
pub struct PtyResizer {
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
}

impl PtyResizer {
    pub fn resize(&self, size: TerminalSize) -> Result<()> {
        tracing::debug!("Resizing PTY to {}x{}", size.width, size.height);
        self.master
            .lock()
            .map_err(|_| anyhow::anyhow!("PTY master lock poisoned"))?
            .resize(pty_size(size))
            .context("Failed to resize PTY")
    }
}

/// A shell running on its own PTY
pub struct PtyShell {
    /// The shell process
    pub child: Box<dyn Child + Send + Sync>,
    /// Output of the shell
    pub reader: Box<dyn Read + Send>,
    /// Input to the shell
    pub writer: Box<dyn Write + Send>,
    pub resizer: PtyResizer,
}

impl PtyShell {
    /// Open a PTY of `size` and spawn a shell on it
    pub fn spawn(
        shell: Option<&str>,
        env: &[(String, String)],
        size: TerminalSize,
    ) -> Result<Self> {
        let login_shell = std::env::var("SHELL").ok();
        let shell = resolve_shell(shell, login_shell.as_deref())?;

        let pair = native_pty_system()
            .openpty(pty_size(size))
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&shell);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn shell: {}", shell))?;
        // Only the child may hold the slave, or reads never see EOF
        drop(pair.slave);

        tracing::info!("Spawned {} with PID {:?}", shell, child.process_id());

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        Ok(Self {
            child,
            reader,
            writer,
            resizer: PtyResizer {
                master: Arc::new(Mutex::new(pair.master)),
            },
        })
    }
}
