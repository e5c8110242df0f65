//! Synthesis on a worker thread
//!
//! The worker owns the orchestrator for the duration of the call and hands
//! chunks over a bounded channel, so it never runs more than one clause ahead
//! of the consumer.

use std::sync::mpsc::{sync_channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

use super::{AudioChunk, CancellationToken, SynthesisOrchestrator, SynthesisStats};
use crate::config::SynthesisConfig;
use crate::core::error::{Result, TtsError};
use crate::inference::VoiceRuntime;
use crate::text::engine::PhonemeEngine;

/// Start a synthesis call on its own thread.
///
/// The orchestrator is returned by [`StreamHandle::finish`].
pub fn spawn_synthesis<E, R>(
    mut orchestrator: SynthesisOrchestrator<E, R>,
    text: impl Into<String>,
    config: SynthesisConfig,
) -> StreamHandle<E, R>
where
    E: PhonemeEngine + 'static,
    R: VoiceRuntime + 'static,
{
    let text = text.into();
    let (sender, receiver) = sync_channel::<Result<AudioChunk>>(1);
    let cancel = CancellationToken::new();
    let stats = Arc::new(Mutex::new(SynthesisStats::default()));

    let worker_cancel = cancel.clone();
    let worker_stats = Arc::clone(&stats);
    let worker = thread::spawn(move || {
        match orchestrator.synthesize_with_cancel(&text, &config, worker_cancel.clone()) {
            Ok(mut stream) => {
                while let Some(item) = stream.next() {
                    if let Ok(mut shared) = worker_stats.lock() {
                        *shared = stream.stats().clone();
                    }
                    if sender.send(item).is_err() {
                        // Receiver dropped
                        debug!("Stream handle dropped, stopping synthesis");
                        worker_cancel.cancel();
                        break;
                    }
                }
            }
            Err(e) => {
                let _ = sender.send(Err(e));
            }
        }
        orchestrator
    });

    StreamHandle {
        receiver,
        stats,
        cancel,
        worker: Some(worker),
        finished: false,
    }
}

/// Handle for a synthesis call running on a worker thread
pub struct StreamHandle<E: PhonemeEngine, R: VoiceRuntime> {
    receiver: Receiver<Result<AudioChunk>>,
    stats: Arc<Mutex<SynthesisStats>>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<SynthesisOrchestrator<E, R>>>,
    finished: bool,
}

impl<E: PhonemeEngine, R: VoiceRuntime> StreamHandle<E, R> {
    fn observe(&mut self, item: &Result<AudioChunk>) {
        match item {
            Ok(chunk) if chunk.is_last => self.finished = true,
            Ok(_) => {}
            Err(_) => self.finished = true,
        }
    }

    /// Get next chunk (blocking)
    pub fn next_chunk(&mut self) -> Option<Result<AudioChunk>> {
        if self.finished {
            return None;
        }

        match self.receiver.recv() {
            Ok(item) => {
                self.observe(&item);
                Some(item)
            }
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }

    /// Try to get next chunk (non-blocking)
    pub fn try_next_chunk(&mut self) -> Option<Result<AudioChunk>> {
        if self.finished {
            return None;
        }

        match self.receiver.try_recv() {
            Ok(item) => {
                self.observe(&item);
                Some(item)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                None
            }
        }
    }

    /// Stop at the next clause boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the call statistics
    pub fn stats(&self) -> SynthesisStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// No more chunks will be delivered
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the worker and take the orchestrator back.
    ///
    /// An unfinished call is cancelled and its remaining chunks discarded.
    pub fn finish(mut self) -> Result<SynthesisOrchestrator<E, R>> {
        if !self.finished {
            self.cancel.cancel();
        }
        while self.receiver.recv().is_ok() {}
        self.finished = true;

        let worker = self
            .worker
            .take()
            .ok_or_else(|| TtsError::internal("StreamHandle::finish", "Synthesis worker already joined"))?;
        worker.join().map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            TtsError::internal("synthesis worker", format!("Synthesis worker panicked: {}", reason))
        })
    }
}

impl<E: PhonemeEngine, R: VoiceRuntime> Drop for StreamHandle<E, R> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel.cancel();
        }
    }
}

impl<E: PhonemeEngine, R: VoiceRuntime> IntoIterator for StreamHandle<E, R> {
    type Item = Result<AudioChunk>;
    type IntoIter = StreamIterator<E, R>;

    fn into_iter(self) -> Self::IntoIter {
        StreamIterator { handle: self }
    }
}

/// Iterator over a [`StreamHandle`]
pub struct StreamIterator<E: PhonemeEngine, R: VoiceRuntime> {
    handle: StreamHandle<E, R>,
}

impl<E: PhonemeEngine, R: VoiceRuntime> StreamIterator<E, R> {
    pub fn handle(&self) -> &StreamHandle<E, R> {
        &self.handle
    }

    /// See [`StreamHandle::finish`]
    pub fn finish(self) -> Result<SynthesisOrchestrator<E, R>> {
        self.handle.finish()
    }
}

impl<E: PhonemeEngine, R: VoiceRuntime> Iterator for StreamIterator<E, R> {
    type Item = Result<AudioChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.handle.next_chunk()
    }
}
