//! Reader for `text/event-stream` response bodies.
//!
//! Streaming bodies never end on their own, so `axum-test` cannot be used to
//! read them. Drive the router with `tower::ServiceExt::oneshot` and wrap the
//! response body in [`SseFrames`] instead.

use std::time::Duration;

use axum::body::{Body, BodyDataStream};
use bytes::BytesMut;
use futures::StreamExt;

/// How long [`SseFrames::next_data`] waits before giving up.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Splits an SSE body into `data:` payloads.
///
/// Dropping the reader drops the body, which is what the server sees as a
/// client disconnect.
pub struct SseFrames {
    body: BodyDataStream,
    buf: BytesMut,
}

impl SseFrames {
    pub fn new(body: Body) -> Self {
        Self {
            body: body.into_data_stream(),
            buf: BytesMut::new(),
        }
    }

    /// Next frame's `data:` value, or `None` if the body ended, errored or
    /// produced nothing within [`DEFAULT_FRAME_TIMEOUT`].
    pub async fn next_data(&mut self) -> Option<String> {
        self.next_data_within(DEFAULT_FRAME_TIMEOUT).await
    }

    pub async fn next_data_within(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.read_frame())
            .await
            .ok()
            .flatten()
    }

    async fn read_frame(&mut self) -> Option<String> {
        loop {
            if let Some(end) = find_frame_end(&self.buf) {
                let frame = self.buf.split_to(end + 2);
                let text = String::from_utf8_lossy(&frame[..end]).into_owned();
                if let Some(data) = data_lines(&text) {
                    return Some(data);
                }
                // Comment or keep-alive frame; keep reading.
                continue;
            }
            let chunk = self.body.next().await?.ok()?;
            self.buf.extend_from_slice(&chunk);
        }
    }
}

fn find_frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Joins the `data:` lines of one frame the way an EventSource client does.
fn data_lines(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
