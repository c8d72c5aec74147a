//! Server-Sent Events framing shared by every provider adapter.
//!
//! [`parse_sse_frames`] turns raw SSE text into frames, an [`SseDecoder`]
//! turns each frame into provider-neutral [`StreamEvent`]s, and
//! [`SseStream`] drives both over an HTTP byte stream with an idle timeout.
//! Decoders only produce `TextDelta` and `Error`; the stream itself emits
//! `Start` first and a `Done` carrying the accumulated text when the body
//! ends cleanly.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{Future, Stream};
use pin_project_lite::pin_project;
use tokio::time::{Instant, Sleep};

use battle_core::errors::GatewayError;
use battle_core::stream::StreamEvent;

pub const SSE_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// One dispatched SSE event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Parse raw SSE text into frames. Multiple `data:` lines are joined with
/// `\n`; comment lines are skipped; a trailing frame without a blank line
/// is still dispatched.
pub fn parse_sse_frames(raw: &str) -> Vec<SseFrame> {
    let mut frames = Vec::new();
    let mut event: Option<String> = None;
    let mut data: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            flush(&mut frames, &mut event, &mut data);
        } else if line.starts_with(':') {
            continue;
        } else if let Some(value) = field_value(line, "event") {
            event = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            data.push(value);
        }
    }
    flush(&mut frames, &mut event, &mut data);

    frames
}

fn flush(frames: &mut Vec<SseFrame>, event: &mut Option<String>, data: &mut Vec<&str>) {
    if event.is_some() || !data.is_empty() {
        frames.push(SseFrame {
            event: event.take(),
            data: data.join("\n"),
        });
        data.clear();
    }
}

fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Provider-specific translation of SSE frames.
pub trait SseDecoder: Send {
    fn decode(&mut self, frame: &SseFrame) -> Vec<StreamEvent>;
}

pin_project! {
    /// Wraps a byte stream from reqwest and yields [`StreamEvent`]s.
    /// If no data arrives within the idle duration, emits an error and ends.
    pub struct SseStream<S, D> {
        #[pin]
        inner: S,
        #[pin]
        idle_deadline: Sleep,
        idle_duration: Duration,
        decoder: D,
        buffer: BytesMut,
        pending: VecDeque<StreamEvent>,
        text: String,
        started: bool,
        exhausted: bool,
        finished: bool,
    }
}

impl<S, D, E> SseStream<S, D>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    D: SseDecoder,
{
    pub fn new(inner: S, decoder: D) -> Self {
        Self::with_idle_timeout(inner, decoder, SSE_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(inner: S, decoder: D, idle_timeout: Duration) -> Self {
        Self {
            inner,
            idle_deadline: tokio::time::sleep(idle_timeout),
            idle_duration: idle_timeout,
            decoder,
            buffer: BytesMut::with_capacity(8192),
            pending: VecDeque::new(),
            text: String::new(),
            started: false,
            exhausted: false,
            finished: false,
        }
    }
}

fn decode_block<D: SseDecoder>(decoder: &mut D, block: &[u8], pending: &mut VecDeque<StreamEvent>) {
    let raw = String::from_utf8_lossy(block);
    for frame in parse_sse_frames(&raw) {
        pending.extend(decoder.decode(&frame));
    }
}

impl<S, D, E> Stream for SseStream<S, D>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
    D: SseDecoder,
{
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if !*this.started {
            *this.started = true;
            return Poll::Ready(Some(StreamEvent::Start));
        }

        loop {
            if let Some(event) = this.pending.pop_front() {
                match &event {
                    StreamEvent::TextDelta { delta } => this.text.push_str(delta),
                    StreamEvent::Error { .. } | StreamEvent::Done { .. } => {
                        *this.finished = true;
                        this.pending.clear();
                    }
                    StreamEvent::Start => continue,
                }
                return Poll::Ready(Some(event));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            if *this.exhausted {
                *this.finished = true;
                return Poll::Ready(Some(StreamEvent::Done {
                    text: std::mem::take(this.text),
                }));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let deadline = Instant::now() + *this.idle_duration;
                    this.idle_deadline.as_mut().reset(deadline);

                    this.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                    while let Some(pos) = this.buffer.windows(2).position(|w| w == b"\n\n") {
                        let block = this.buffer.split_to(pos + 2);
                        decode_block(&mut *this.decoder, &block, &mut *this.pending);
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.pending.push_back(StreamEvent::Error {
                        error: GatewayError::StreamInterrupted(e.to_string()),
                    });
                }
                Poll::Ready(None) => {
                    if !this.buffer.is_empty() {
                        let rest = this.buffer.split();
                        decode_block(&mut *this.decoder, &rest, &mut *this.pending);
                    }
                    *this.exhausted = true;
                }
                Poll::Pending => {
                    if this.idle_deadline.as_mut().poll(cx).is_ready() {
                        this.pending.push_back(StreamEvent::Error {
                            error: GatewayError::StreamInterrupted(format!(
                                "idle timeout after {}s",
                                this.idle_duration.as_secs()
                            )),
                        });
                        continue;
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}
