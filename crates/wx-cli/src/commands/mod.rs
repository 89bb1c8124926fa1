//! CLI command implementations

mod config;
mod connect;
mod serve;

pub use config::{config_init, config_path, config_show, load_effective_config};
pub use connect::connect_command;
pub use serve::{serve, serve_command};
