//! wx-server: Exec-facing side of a wsexec connection
//!
//! A [`StreamAdapter`] presents one multiplexed connection as the three
//! primitives a remote-exec streaming API consumes: a blocking reader
//! (process stdin), a writer (process stdout/stderr) and a source of
//! terminal size changes. Its keepalive loop pings the peer and owns the
//! connection teardown.

pub mod adapter;
pub mod record;

pub use adapter::StreamAdapter;
pub use record::Recorder;
