//! Status lines for the CLI
//!
//! Everything goes to stderr so stdout stays free for session output and
//! `config show`.

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

fn status(color: Color, marker: &str, msg: &str) {
    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(color),
        Print(marker),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a success message
pub fn print_success(msg: &str) {
    status(Color::Green, "✓ ", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    status(Color::Red, "✗ ", msg);
}

/// Print an informational message
pub fn print_info(msg: &str) {
    status(Color::Blue, "→ ", msg);
}
