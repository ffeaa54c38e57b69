//! Demux Stdin - split a captured multiplexed stream.
//!
//! This example demonstrates:
//! - Wrapping any reader as a connection with `ReadOnly`
//! - Consuming frames with a closure
//! - Cancelling from a Ctrl-C handler
//!
//! # Running
//!
//! ```sh
//! curl --unix-socket /var/run/docker.sock \
//!     "http://localhost/containers/web/logs?stdout=1&stderr=1" \
//!     | cargo run --example demux_stdin
//! ```
//!
//! Pass `--tty` when the container was created with a terminal.

use std::io::Write;

use engine_stream::consumer::{ConsumerResult, FnConsumer};
use engine_stream::endpoint::output_driver;
use engine_stream::{Frame, ReadOnly, StreamConfig, StreamType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tty = std::env::args().any(|arg| arg == "--tty");

    let consumer = FnConsumer::new(|frame: Frame| -> ConsumerResult {
        match frame.stream_type() {
            StreamType::Stderr => std::io::stderr().write_all(frame.payload())?,
            _ => std::io::stdout().write_all(frame.payload())?,
        }
        Ok(())
    });

    let conn = ReadOnly::new(tokio::io::stdin());
    let handle = output_driver("container_logs", conn, tty, StreamConfig::new()).spawn(consumer);

    // Cancel on Ctrl-C
    let cancellable = handle.cancellable().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancellable.cancel();
        }
    });

    let outcome = handle.join().await?;
    eprintln!("stream ended: {:?}", outcome);

    Ok(())
}
