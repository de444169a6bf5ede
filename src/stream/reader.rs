//! Incremental NDJSON reader over an HTTP response body
//!
//! [`EventStream`] spawns a task that pulls byte chunks, splits them into
//! complete lines with [`LineSplitter`], decodes each line and forwards
//! the resulting [`StreamEvent`]s over a channel. Events arrive in the
//! order their terminating newlines appeared in the body.
//!
//! Lines that fail both decodings are dropped. Each drop is logged,
//! counted on the stream, and reported to the metrics facade as
//! `tripplanner_stream_lines_dropped_total`.

use std::fmt::Display;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use metrics::increment_counter;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{decode_line, StreamEvent};

/// Longest prefix of a dropped line written to the log
const DROPPED_LINE_PREVIEW: usize = 120;

/// Splits a byte stream into newline-terminated lines
///
/// Bytes are buffered until a `\n` arrives, so a line (or a multi-byte
/// UTF-8 character) split across chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    /// Create an empty splitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the newline
    ///
    /// # Examples
    ///
    /// ```
    /// use tripplanner::stream::LineSplitter;
    ///
    /// let mut splitter = LineSplitter::new();
    /// assert!(splitter.push(b"{\"event\":").is_empty());
    /// assert_eq!(splitter.push(b"\"done\"}\nrest"), vec!["{\"event\":\"done\"}".to_string()]);
    /// assert_eq!(splitter.pending(), 4);
    /// ```
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(text.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Number of buffered bytes not yet terminated by a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Async stream of decoded chat events
///
/// Created from a response body with [`EventStream::from_byte_stream`].
/// The stream ends when the body ends or the transport fails.
pub struct EventStream {
    inner: UnboundedReceiverStream<StreamEvent>,
    dropped: Arc<AtomicUsize>,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("dropped", &self.dropped_lines())
            .finish()
    }
}

impl EventStream {
    /// Start reading `byte_stream` in a background task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_byte_stream<S, E>(byte_stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let dropped = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&dropped);

        tokio::spawn(async move {
            read_event_stream(byte_stream, tx, counter).await;
        });

        Self {
            inner: UnboundedReceiverStream::new(rx),
            dropped,
        }
    }

    /// Stream that yields the given events and then ends
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            // The receiver is alive here, send cannot fail.
            let _ = tx.send(event);
        }
        Self {
            inner: UnboundedReceiverStream::new(rx),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Lines dropped so far because neither decoding accepted them
    pub fn dropped_lines(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Read `byte_stream` to completion, sending decoded events to `tx`
///
/// Stops early if the receiver is gone, even while the transport is idle,
/// or if the transport reports an error.
/// A trailing fragment without a newline is discarded.
pub async fn read_event_stream<S, E>(
    byte_stream: S,
    tx: mpsc::UnboundedSender<StreamEvent>,
    dropped: Arc<AtomicUsize>,
) where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let mut splitter = LineSplitter::new();

    tokio::pin!(byte_stream);

    loop {
        let chunk_result = tokio::select! {
            next = byte_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = tx.closed() => {
                tracing::debug!("Stream consumer went away, stopping reader");
                return;
            }
        };
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Chat stream interrupted: {}", e);
                break;
            }
        };

        for line in splitter.push(&chunk) {
            if line.trim().is_empty() {
                continue;
            }
            match decode_line(&line) {
                Some(event) => {
                    tracing::debug!("Stream event: {:?}", event);
                    if tx.send(event).is_err() {
                        tracing::debug!("Stream consumer went away, stopping reader");
                        return;
                    }
                }
                None => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    increment_counter!("tripplanner_stream_lines_dropped_total");
                    let preview: String = line.chars().take(DROPPED_LINE_PREVIEW).collect();
                    tracing::warn!("Dropping undecodable stream line: {}", preview);
                }
            }
        }
    }

    if splitter.pending() > 0 {
        tracing::debug!(
            "Discarding {} trailing bytes without a newline",
            splitter.pending()
        );
    }
}
