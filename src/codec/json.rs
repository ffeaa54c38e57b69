//! JSON-object decoder for stats and event streams.
//!
//! The engine writes one JSON value per sample or event, separated by
//! newlines. Values may be split across reads in any way; incomplete input is
//! kept until more bytes arrive.

use std::marker::PhantomData;

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DecodeMode, Decoder};
use crate::error::{Result, StreamError};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;

/// Tracks bracket depth over bytes already seen, so a value is parsed only
/// once it is complete.
#[derive(Debug, Default)]
struct Scanner {
    /// Bytes of the buffer already scanned.
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Scan the unseen tail of `buf`. Returns the end of the last position at
    /// top level, or 0 if the new bytes are all inside a value.
    fn scan(&mut self, buf: &[u8]) -> usize {
        let mut boundary = 0;
        for (i, &b) in buf.iter().enumerate().skip(self.scanned) {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else {
                match b {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
            }

            if self.depth == 0 && !self.in_string {
                boundary = i + 1;
            }
        }
        self.scanned = buf.len();
        boundary
    }
}

/// Incremental decoder for a whitespace-separated sequence of JSON values.
///
/// Each byte is scanned once; a value is handed to `serde_json` only after its
/// closing bracket arrived. A bare number at the very end of the buffered
/// input is taken as complete. Engine streams only carry objects, so this
/// never splits a value.
pub struct JsonObjectDecoder<T = Value> {
    buffer: BytesMut,
    scanner: Scanner,
    max_pending: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonObjectDecoder<T>
where
    T: DeserializeOwned,
{
    /// Create a decoder that buffers at most 1GB of an unfinished value.
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PAYLOAD_SIZE as usize)
    }

    /// Create a decoder with a custom limit on an unfinished value.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanner: Scanner::default(),
            max_pending,
            _marker: PhantomData,
        }
    }

    /// Number of buffered, not yet decoded bytes.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn only_whitespace(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

impl<T> Default for JsonObjectDecoder<T>
where
    T: DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Decoder for JsonObjectDecoder<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    fn mode(&self) -> DecodeMode {
        DecodeMode::Json
    }

    fn decode_into(&mut self, data: &[u8], out: &mut Vec<T>) -> Result<()> {
        self.buffer.extend_from_slice(data);

        let boundary = self.scanner.scan(&self.buffer);
        let mut consumed = 0;
        if boundary > 0 {
            let mut values =
                serde_json::Deserializer::from_slice(&self.buffer[..boundary]).into_iter::<T>();
            loop {
                match values.next() {
                    Some(Ok(value)) => {
                        out.push(value);
                        consumed = values.byte_offset();
                    }
                    // Value continues in a later read
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => return Err(StreamError::Json(e)),
                    None => break,
                }
            }
        }

        let _ = self.buffer.split_to(consumed);
        self.scanner.scanned -= consumed;
        if self.only_whitespace() {
            self.buffer.clear();
            self.scanner.scanned = 0;
        }

        if self.buffer.len() > self.max_pending {
            return Err(StreamError::PayloadTooLarge {
                size: u32::try_from(self.buffer.len()).unwrap_or(u32::MAX),
                max: u32::try_from(self.max_pending).unwrap_or(u32::MAX),
            });
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.only_whitespace() {
            Ok(())
        } else {
            Err(StreamError::Truncated {
                buffered: self.buffer.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Event {
        #[serde(rename = "Type")]
        kind: String,
        #[serde(rename = "Action")]
        action: String,
    }

    #[test]
    fn test_newline_delimited_values() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        let values = decoder.decode(b"{\"a\":1}\n{\"a\":2}\n").unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["a"], 1);
        assert_eq!(values[1]["a"], 2);
        assert_eq!(decoder.pending(), 0);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_concatenated_without_separator() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        let values = decoder.decode(b"{\"a\":1}{\"a\":2}").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_value_split_across_reads() {
        let mut decoder = JsonObjectDecoder::<Event>::new();
        let input = br#"{"Type":"image","Action":"delete"}"#;

        let mut events = Vec::new();
        for chunk in input.chunks(5) {
            events.extend(decoder.decode(chunk).unwrap());
        }

        assert_eq!(
            events,
            vec![Event {
                kind: "image".to_string(),
                action: "delete".to_string(),
            }]
        );
    }

    #[test]
    fn test_split_inside_string_with_escapes() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        assert!(decoder.decode(br#"{"msg":"a \"quo"#).unwrap().is_empty());
        let values = decoder.decode(br#"ted\" word"}"#).unwrap();
        assert_eq!(values[0]["msg"], "a \"quoted\" word");
    }

    #[test]
    fn test_invalid_json_is_error() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        let err = decoder.decode(b"{\"a\":1}\n{]").unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let mut decoder = JsonObjectDecoder::<Event>::new();
        assert!(decoder.decode(b"{\"Type\":\"image\"}\n").is_err());
    }

    #[test]
    fn test_truncated_value_at_finish() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        decoder.decode(b"{\"cpu_stats\":{").unwrap();

        assert!(matches!(
            decoder.finish(),
            Err(StreamError::Truncated { buffered: 14 })
        ));
    }

    #[test]
    fn test_trailing_whitespace_is_clean() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        decoder.decode(b"{}\r\n  \n").unwrap();
        assert_eq!(decoder.pending(), 0);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_partial_value_is_not_reparsed() {
        let mut decoder = JsonObjectDecoder::<Value>::new();
        // Brackets inside strings do not close the value
        assert!(decoder.decode(br#"{"s":"}{]","n":["#).unwrap().is_empty());
        assert_eq!(decoder.scanner.depth, 2);
        assert_eq!(decoder.scanner.scanned, decoder.pending());

        assert!(decoder.decode(b"1,2]").unwrap().is_empty());
        assert_eq!(decoder.scanner.depth, 1);

        let values = decoder.decode(b"}\n").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["s"], "}{]");
        assert_eq!(decoder.pending(), 0);
        assert_eq!(decoder.scanner.scanned, 0);
    }

    #[test]
    fn test_large_value_in_small_reads() {
        let items: Vec<String> = (0..2000).map(|i| format!("\"item-{}\"", i)).collect();
        let body = format!("{{\"items\":[{}]}}\n{{\"tail\":true}}\n", items.join(","));

        let mut decoder = JsonObjectDecoder::<Value>::new();
        let mut values = Vec::new();
        for chunk in body.as_bytes().chunks(3) {
            values.extend(decoder.decode(chunk).unwrap());
        }

        assert_eq!(values.len(), 2);
        assert_eq!(values[0]["items"].as_array().unwrap().len(), 2000);
        assert_eq!(values[1]["tail"], true);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_pending_limit() {
        let mut decoder = JsonObjectDecoder::<Value>::with_max_pending(8);
        let err = decoder.decode(b"{\"long_unfinished\":").unwrap_err();
        assert!(matches!(err, StreamError::PayloadTooLarge { max: 8, .. }));
    }
}
