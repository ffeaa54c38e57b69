//! Endpoint entry points - one per streaming engine call.
//!
//! The caller opens the connection, writes the request and reads the response
//! head; these functions take over the body. The framing of log, attach and
//! exec output depends on whether the container has a terminal, which the
//! caller must pass in.
//!
//! | Endpoint | Elements | Decoding |
//! |----------|----------|----------|
//! | [`container_logs`], [`container_attach`], [`exec_start`] | [`Frame`] | multiplexed, or raw with `tty` |
//! | [`container_stats`] | `T: DeserializeOwned` | JSON values |
//! | [`system_events`] | `T: DeserializeOwned` | JSON values |

use serde::de::DeserializeOwned;

use crate::codec::{DecodeMode, Decoder, JsonObjectDecoder, RawDecoder};
use crate::config::StreamConfig;
use crate::consumer::StreamConsumer;
use crate::error::{Result, StreamOutcome};
use crate::protocol::{Frame, FrameBuffer};
use crate::session::StreamDriver;
use crate::transport::Connection;

/// Options for log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogsOptions {
    /// The container was created with a terminal.
    pub tty: bool,
}

impl LogsOptions {
    /// Options for a container with or without a terminal.
    pub fn tty(tty: bool) -> Self {
        Self { tty }
    }

    /// Decode mode for this output.
    pub fn mode(&self) -> DecodeMode {
        DecodeMode::for_output(self.tty)
    }
}

/// Options for attach output. Same framing as logs.
pub type AttachOptions = LogsOptions;

/// Options for exec output. Same framing as logs.
pub type ExecStartOptions = LogsOptions;

/// Options for resource usage samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsOptions {
    /// Keep sampling. When `false` the session ends after the first sample.
    pub stream: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { stream: true }
    }
}

impl StatsOptions {
    /// A single sample, then end-of-stream.
    pub fn one_shot() -> Self {
        Self { stream: false }
    }
}

/// Decoder for container output: multiplexed or raw.
#[derive(Debug)]
pub enum OutputDecoder {
    /// Headers separate stdout and stderr.
    Multiplexed(FrameBuffer),
    /// Terminal output, passed through.
    Raw(RawDecoder),
}

impl OutputDecoder {
    /// Pick the decoder for a container with or without a terminal.
    pub fn for_output(tty: bool, config: &StreamConfig) -> Self {
        match DecodeMode::for_output(tty) {
            DecodeMode::Raw => OutputDecoder::Raw(RawDecoder::with_chunk_size(config.raw_chunk_size)),
            _ => OutputDecoder::Multiplexed(FrameBuffer::with_max_payload(config.max_payload_size)),
        }
    }
}

impl Decoder for OutputDecoder {
    type Item = Frame;

    fn mode(&self) -> DecodeMode {
        match self {
            OutputDecoder::Multiplexed(_) => DecodeMode::Multiplexed,
            OutputDecoder::Raw(_) => DecodeMode::Raw,
        }
    }

    fn decode_into(&mut self, data: &[u8], out: &mut Vec<Frame>) -> Result<()> {
        match self {
            OutputDecoder::Multiplexed(buffer) => buffer.push_into(data, out),
            OutputDecoder::Raw(raw) => raw.decode_into(data, out),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            OutputDecoder::Multiplexed(buffer) => buffer.finish(),
            OutputDecoder::Raw(raw) => raw.finish(),
        }
    }
}

/// Build a driver for container output without running it.
///
/// Use this with [`StreamDriver::spawn`] to cancel from another task.
pub fn output_driver<C>(
    endpoint: &'static str,
    conn: C,
    tty: bool,
    config: StreamConfig,
) -> StreamDriver<C, OutputDecoder>
where
    C: Connection,
{
    let decoder = OutputDecoder::for_output(tty, &config);
    let config = scoped(config, endpoint, decoder.mode());
    StreamDriver::new(conn, decoder, config)
}

/// Build a driver for a JSON-value stream without running it.
pub fn json_driver<C, T>(
    endpoint: &'static str,
    conn: C,
    config: StreamConfig,
) -> StreamDriver<C, JsonObjectDecoder<T>>
where
    C: Connection,
    T: DeserializeOwned + Send,
{
    let decoder = JsonObjectDecoder::with_max_pending(config.max_payload_size as usize);
    let config = scoped(config, endpoint, DecodeMode::Json);
    StreamDriver::new(conn, decoder, config)
}

/// Stream container logs.
pub async fn container_logs<C, S>(
    conn: C,
    options: LogsOptions,
    consumer: S,
    config: StreamConfig,
) -> Result<StreamOutcome>
where
    C: Connection,
    S: StreamConsumer<Frame>,
{
    output_driver("container_logs", conn, options.tty, config)
        .run(consumer)
        .await
}

/// Stream the output of an attached container.
pub async fn container_attach<C, S>(
    conn: C,
    options: AttachOptions,
    consumer: S,
    config: StreamConfig,
) -> Result<StreamOutcome>
where
    C: Connection,
    S: StreamConsumer<Frame>,
{
    output_driver("container_attach", conn, options.tty, config)
        .run(consumer)
        .await
}

/// Stream the output of a started exec instance.
pub async fn exec_start<C, S>(
    conn: C,
    options: ExecStartOptions,
    consumer: S,
    config: StreamConfig,
) -> Result<StreamOutcome>
where
    C: Connection,
    S: StreamConsumer<Frame>,
{
    output_driver("exec_start", conn, options.tty, config)
        .run(consumer)
        .await
}

/// Stream resource usage samples of a container.
///
/// With `stream: false` the session ends after the first sample.
pub async fn container_stats<C, T, S>(
    conn: C,
    options: StatsOptions,
    consumer: S,
    mut config: StreamConfig,
) -> Result<StreamOutcome>
where
    C: Connection,
    T: DeserializeOwned + Send,
    S: StreamConsumer<T>,
{
    if !options.stream {
        config.element_limit = Some(1);
    }
    json_driver::<C, T>("container_stats", conn, config)
        .run(consumer)
        .await
}

/// Stream engine events.
pub async fn system_events<C, T, S>(conn: C, consumer: S, config: StreamConfig) -> Result<StreamOutcome>
where
    C: Connection,
    T: DeserializeOwned + Send,
    S: StreamConsumer<T>,
{
    json_driver::<C, T>("system_events", conn, config)
        .run(consumer)
        .await
}

/// Give the session a span naming the endpoint, unless the caller set one.
fn scoped(mut config: StreamConfig, endpoint: &'static str, mode: DecodeMode) -> StreamConfig {
    if config.span.is_none() {
        config.span = Some(tracing::debug_span!(
            "engine_stream",
            endpoint,
            mode = mode.as_str()
        ));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::CollectingConsumer;
    use crate::protocol::{build_frame, StreamType};
    use crate::transport::ReadOnly;
    use serde::Deserialize;
    use serde_json::Value;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_output_decoder_follows_tty() {
        let config = StreamConfig::new();
        assert_eq!(OutputDecoder::for_output(true, &config).mode(), DecodeMode::Raw);
        assert_eq!(
            OutputDecoder::for_output(false, &config).mode(),
            DecodeMode::Multiplexed
        );
        assert_eq!(LogsOptions::tty(true).mode(), DecodeMode::Raw);
        assert_eq!(LogsOptions::default().mode(), DecodeMode::Multiplexed);
    }

    #[test]
    fn test_stats_options_default_streams() {
        assert!(StatsOptions::default().stream);
        assert!(!StatsOptions::one_shot().stream);
    }

    #[test]
    fn test_endpoint_span_is_set() {
        let config = scoped(StreamConfig::new(), "system_events", DecodeMode::Json);
        assert!(config.span.is_some());

        let driver = output_driver("container_logs", ReadOnly::new(&b""[..]), false, StreamConfig::new());
        assert!(driver.config().span.is_some());
    }

    #[tokio::test]
    async fn test_logs_multiplexed() {
        let mut bytes = build_frame(StreamType::Stdout, b"starting\n");
        bytes.extend(build_frame(StreamType::Stderr, b"warning\n"));
        let conn = ReadOnly::new(&bytes[..]);
        let mut consumer = CollectingConsumer::new();

        let outcome = container_logs(conn, LogsOptions::default(), &mut consumer, StreamConfig::new())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::EndOfStream);
        let frames = consumer.elements();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_stdout());
        assert_eq!(frames[0].payload(), b"starting\n");
        assert!(frames[1].is_stderr());
    }

    #[tokio::test]
    async fn test_logs_tty_passes_headers_through() {
        let bytes = build_frame(StreamType::Stdout, b"x");
        let conn = ReadOnly::new(&bytes[..]);
        let mut consumer = CollectingConsumer::new();

        container_logs(conn, LogsOptions::tty(true), &mut consumer, StreamConfig::new())
            .await
            .unwrap();

        let frames = consumer.elements();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_raw());
        assert_eq!(frames[0].payload(), &bytes[..]);
    }

    #[tokio::test]
    async fn test_exec_start_honors_raw_chunk_size() {
        let conn = ReadOnly::new(&b"abcdef"[..]);
        let mut consumer = CollectingConsumer::new();
        let config = StreamConfig::new().raw_chunk_size(4);

        exec_start(conn, ExecStartOptions::tty(true), &mut consumer, config)
            .await
            .unwrap();

        let payloads: Vec<&[u8]> = consumer.elements().iter().map(|f| f.payload()).collect();
        assert_eq!(payloads, vec![&b"abcd"[..], &b"ef"[..]]);
    }

    #[tokio::test]
    async fn test_attach_rejects_oversized_frame() {
        let bytes = build_frame(StreamType::Stdout, b"0123456789");
        let conn = ReadOnly::new(&bytes[..]);
        let config = StreamConfig::new().max_payload_size(4);

        let err = container_attach(conn, AttachOptions::default(), CollectingConsumer::new(), config)
            .await
            .unwrap_err();

        assert!(err.is_protocol_violation());
    }

    #[tokio::test]
    async fn test_one_shot_stats_ends_after_first_sample() {
        let (client, mut server) = tokio::io::duplex(1024);
        server
            .write_all(b"{\"read\":\"t1\",\"cpu\":10}\n{\"read\":\"t2\",\"cpu\":11}\n")
            .await
            .unwrap();
        let mut consumer = CollectingConsumer::<Value>::new();

        // The server never closes; the limit ends the session
        let outcome = container_stats::<_, Value, _>(client, StatsOptions::one_shot(), &mut consumer, StreamConfig::new())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::EndOfStream);
        assert_eq!(consumer.elements().len(), 1);
        assert_eq!(consumer.elements()[0]["read"], "t1");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Event {
        #[serde(rename = "Type")]
        kind: String,
        #[serde(rename = "Action")]
        action: String,
    }

    #[tokio::test]
    async fn test_system_events_typed() {
        let body = concat!(
            "{\"Type\":\"container\",\"Action\":\"start\"}\n",
            "{\"Type\":\"network\",\"Action\":\"connect\"}\n"
        );
        let conn = ReadOnly::new(body.as_bytes());
        let mut consumer = CollectingConsumer::<Event>::new();

        let outcome = system_events::<_, Event, _>(conn, &mut consumer, StreamConfig::new())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::EndOfStream);
        assert_eq!(consumer.elements().len(), 2);
        assert_eq!(consumer.elements()[1].action, "connect");
    }
}
