//! Latest-only frame hand-off between a camera source and a code decoder.
//!
//! The producer never waits: publishing overwrites any frame the decoder has
//! not picked up yet, so decoding always works on the newest image.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A raw image from the capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Capture timestamp (Unix ms)
    pub captured_at: i64,
}

/// Extracts code text from a frame. Runs on a blocking thread.
pub trait CodeDecoder: Send + Sync + 'static {
    fn decode(&self, frame: &Frame) -> Option<String>;
}

/// A code found in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub text: String,
    pub captured_at: i64,
}

pub struct FramePipeline {
    tx: watch::Sender<Option<Arc<Frame>>>,
}

impl FramePipeline {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Offer a frame, replacing any frame still waiting to be decoded.
    pub fn publish(&self, frame: Frame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    /// Run `decoder` over published frames and forward hits to `events`.
    ///
    /// The task ends when the pipeline is dropped or `events` is closed.
    pub fn spawn_decoder<D: CodeDecoder>(
        &self,
        decoder: Arc<D>,
        events: mpsc::Sender<DecodedCode>,
    ) -> JoinHandle<()> {
        let mut frames = self.tx.subscribe();
        tokio::spawn(async move {
            while frames.changed().await.is_ok() {
                let Some(frame) = frames.borrow_and_update().clone() else {
                    continue;
                };

                let decoder = Arc::clone(&decoder);
                let captured_at = frame.captured_at;
                let decoded = match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await
                {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        tracing::warn!("Frame decoder panicked: {error}");
                        continue;
                    }
                };

                if let Some(text) = decoded {
                    tracing::trace!(code = %text, "Code decoded");
                    if events.send(DecodedCode { text, captured_at }).await.is_err() {
                        break;
                    }
                }
            }
        })
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new()
    }
}
