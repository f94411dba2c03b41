//! A bounded FIFO byte queue used to decouple the async writer's producer
//! (header/payload/descriptor emission) from the task draining bytes to the
//! underlying `AsyncWrite`.
//!
//! `write` suspends the producer once the backlog reaches the configured
//! high-water mark, `read` drains whatever is queued and wakes a suspended
//! writer, and `abort` propagates a terminal error to whichever side is
//! waiting.

use crate::error::{Result, SZipError};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug)]
enum BufferState {
    Open,
    Ended,
    Aborted(String),
}

struct Inner {
    queue: VecDeque<u8>,
    state: BufferState,
    written: u64,
}

/// A bounded byte queue with `Notify`-based backpressure.
///
/// `high_water_mark` bounds how many bytes may sit in the queue before
/// `write` starts waiting for `read` to drain it; it does not bound the
/// total volume that can ever pass through the buffer.
pub struct BoundedBuffer {
    inner: Mutex<Inner>,
    high_water_mark: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl BoundedBuffer {
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                state: BufferState::Open,
                written: 0,
            }),
            high_water_mark: high_water_mark.max(1),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Append `data` to the queue, waiting for space whenever the backlog
    /// has reached `high_water_mark`. Returns `BufferAborted` if `abort` was
    /// called or the consumer dropped its end via `end`.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut offset = 0;
        while offset < data.len() {
            let wrote = {
                let mut inner = self.inner.lock().unwrap();
                match &inner.state {
                    BufferState::Aborted(msg) => return Err(SZipError::BufferAborted(msg.clone())),
                    BufferState::Ended => {
                        return Err(SZipError::BufferAborted(
                            "buffer was closed while a writer was still producing".to_string(),
                        ))
                    }
                    BufferState::Open => {}
                }
                if inner.queue.len() >= self.high_water_mark {
                    0
                } else {
                    let room = self.high_water_mark - inner.queue.len();
                    let chunk = &data[offset..(offset + room).min(data.len())];
                    inner.queue.extend(chunk.iter().copied());
                    inner.written += chunk.len() as u64;
                    self.not_empty.notify_one();
                    chunk.len()
                }
            };
            if wrote == 0 {
                self.not_full.notified().await;
            } else {
                offset += wrote;
            }
        }
        Ok(())
    }

    /// Drain up to `max_len` queued bytes. Returns an empty vector once `end`
    /// has been called and the queue is empty; waits otherwise. Propagates
    /// `BufferAborted` if `abort` was called.
    pub async fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if let BufferState::Aborted(msg) = &inner.state {
                    return Err(SZipError::BufferAborted(msg.clone()));
                }
                if !inner.queue.is_empty() {
                    let take = max_len.min(inner.queue.len());
                    let chunk: Vec<u8> = inner.queue.drain(..take).collect();
                    self.not_full.notify_one();
                    return Ok(chunk);
                }
                if matches!(inner.state, BufferState::Ended) {
                    return Ok(Vec::new());
                }
            }
            self.not_empty.notified().await;
        }
    }

    /// Signal that no more data will be written; pending and future `read`
    /// calls drain the remaining backlog and then return empty.
    pub fn end(&self) {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.state, BufferState::Open) {
            inner.state = BufferState::Ended;
        }
        drop(inner);
        self.not_empty.notify_waiters();
    }

    /// Abort the buffer with `reason`; every pending and future `read`/`write`
    /// call fails with `SZipError::BufferAborted`.
    pub fn abort(&self, reason: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = BufferState::Aborted(reason.into());
        drop(inner);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Total bytes ever accepted by `write`, regardless of how much has been
    /// drained since.
    pub fn written(&self) -> u64 {
        self.inner.lock().unwrap().written
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, BufferState::Aborted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let buf = BoundedBuffer::new(1024);
        buf.write(b"hello world").await.unwrap();
        let read = buf.read(1024).await.unwrap();
        assert_eq!(read, b"hello world");
        assert_eq!(buf.written(), 11);
    }

    #[tokio::test]
    async fn end_drains_then_returns_empty() {
        let buf = BoundedBuffer::new(16);
        buf.write(b"abc").await.unwrap();
        buf.end();
        assert_eq!(buf.read(16).await.unwrap(), b"abc");
        assert_eq!(buf.read(16).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn write_blocks_until_drained_past_high_water_mark() {
        let buf = Arc::new(BoundedBuffer::new(4));
        let writer_buf = buf.clone();
        let writer = tokio::spawn(async move {
            writer_buf.write(b"abcdefgh").await.unwrap();
            writer_buf.end();
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let first = buf.read(4).await.unwrap();
        assert_eq!(first, b"abcd");
        let second = buf.read(4).await.unwrap();
        assert_eq!(second, b"efgh");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn abort_propagates_to_both_ends() {
        let buf = Arc::new(BoundedBuffer::new(4));
        buf.abort("disk full");
        assert!(buf.write(b"x").await.is_err());
        assert!(buf.read(4).await.is_err());
        assert!(buf.is_aborted());
    }
}
