//! Streaming engine: capture feed, analysis worker and event fan-out.
//!
//! The capture side owns a [`CaptureFeed`] and copies samples into pooled
//! buffers without blocking or allocating. One analysis worker thread owns
//! the [`MotilitySession`], consumes buffers in arrival order, and publishes
//! every [`SessionEvent`] on a `tokio` broadcast channel. Stopping the engine
//! drains the queue, force-closes any open candidate, and hands back the
//! complete [`SessionReport`], so a subscriber that lagged loses nothing.
//!
//! Samples the capture side drops are carried to the worker as a gap in
//! front of the next queued buffer and analyzed as silence, keeping event
//! timestamps on the capture clock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::PopError;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audio::buffer_pool::{BufferPool, CaptureChannels, WorkerChannels};
use crate::config::AppConfig;
use crate::error::{log_audio_error, AudioError, MotilityError};
use crate::session::{MotilitySession, SessionEvent, SessionReport};

/// Capacity of the event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Worker poll interval while the data queue is empty
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Capture-side handle; move it into the audio callback or feeder thread
pub struct CaptureFeed {
    channels: CaptureChannels,
    buffer_capacity: usize,
    dropped_samples: Arc<AtomicU64>,
    /// Dropped samples not yet attached to a queued buffer
    pending_gap: u64,
}

impl CaptureFeed {
    /// Queue samples for analysis, in order
    ///
    /// Samples are split into pooled buffers of `bufferSize`. A push of at
    /// most `bufferSize` samples is all-or-nothing.
    ///
    /// # Returns
    /// * `Err(AudioError::BufferPoolExhausted)` - the worker is behind; the
    ///   samples not yet queued were dropped
    pub fn push(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        let mut queued = 0;
        for chunk in samples.chunks(self.buffer_capacity) {
            let mut buffer = match self.channels.pool_consumer.pop() {
                Ok(buffer) => buffer,
                Err(_) => return Err(self.record_drop(samples.len() - queued)),
            };
            buffer.fill(chunk, self.pending_gap);
            if self.channels.data_producer.push(buffer).is_err() {
                return Err(self.record_drop(samples.len() - queued));
            }
            self.pending_gap = 0;
            queued += chunk.len();
        }
        Ok(())
    }

    /// Empty buffers ready for `push`
    ///
    /// A feeder that must not lose samples waits for this to be non-zero
    /// before pushing at most `buffer_capacity()` samples.
    pub fn free_buffers(&self) -> usize {
        self.channels.pool_consumer.slots()
    }

    /// Total samples dropped because the pool was exhausted
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    fn record_drop(&mut self, dropped: usize) -> AudioError {
        self.pending_gap += dropped as u64;
        self.dropped_samples
            .fetch_add(dropped as u64, Ordering::Relaxed);
        AudioError::BufferPoolExhausted {
            dropped_samples: dropped,
        }
    }
}

/// Owns the running analysis worker
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    events_tx: broadcast::Sender<SessionEvent>,
    worker: Option<JoinHandle<SessionReport>>,
    dropped_samples: Arc<AtomicU64>,
    sample_rate: u32,
}

impl EngineHandle {
    /// Validate `config`, build a session and start the worker
    ///
    /// # Returns
    /// The engine handle plus the capture feed that drives it
    pub fn start(
        config: AppConfig,
        sample_rate: u32,
    ) -> Result<(EngineHandle, CaptureFeed), MotilityError> {
        let buffer_capacity = config.audio.buffer_size;
        let buffer_count = config.audio.buffer_pool_size;
        let session = MotilitySession::new(config, sample_rate)?;
        let (capture, worker_channels) = BufferPool::new(buffer_count, buffer_capacity)?;

        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));
        let dropped_samples = Arc::new(AtomicU64::new(0));

        let worker = AnalysisWorker {
            session,
            channels: worker_channels,
            running: Arc::clone(&running),
            events_tx: events_tx.clone(),
            dropped_samples: Arc::clone(&dropped_samples),
            gap_accounted: 0,
        };
        let join = thread::Builder::new()
            .name("motility-analysis".to_string())
            .spawn(move || worker.run())
            .map_err(|err| AudioError::WorkerFailed {
                reason: format!("failed to spawn analysis thread: {}", err),
            })?;

        info!(
            "[Engine] started at {} Hz ({} buffers x {} samples)",
            sample_rate, buffer_count, buffer_capacity
        );

        Ok((
            EngineHandle {
                running,
                events_tx,
                worker: Some(join),
                dropped_samples: Arc::clone(&dropped_samples),
                sample_rate,
            },
            CaptureFeed {
                channels: capture,
                buffer_capacity,
                dropped_samples,
                pending_gap: 0,
            },
        ))
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples the capture side could not queue
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    /// Stop capture processing and wait for the session outcome
    ///
    /// Buffers already queued are analyzed before the session stops. The
    /// report holds every classified event whether or not a subscriber kept
    /// up with the broadcast.
    pub fn stop(mut self) -> Result<SessionReport, AudioError> {
        self.running.store(false, Ordering::SeqCst);
        let join = self.worker.take().ok_or_else(|| AudioError::WorkerFailed {
            reason: "analysis worker already joined".to_string(),
        })?;
        join.join().map_err(|_| {
            let err = AudioError::WorkerFailed {
                reason: "analysis worker panicked".to_string(),
            };
            log_audio_error(&err, "EngineHandle::stop");
            err
        })
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.worker.take() {
            let _ = join.join();
        }
    }
}

struct AnalysisWorker {
    session: MotilitySession,
    channels: WorkerChannels,
    running: Arc<AtomicBool>,
    events_tx: broadcast::Sender<SessionEvent>,
    dropped_samples: Arc<AtomicU64>,
    /// Dropped samples already handed to the session
    gap_accounted: u64,
}

impl AnalysisWorker {
    fn run(mut self) -> SessionReport {
        info!("[AnalysisWorker] starting analysis loop");

        loop {
            let mut buffer = match self.channels.data_consumer.pop() {
                Ok(buffer) => buffer,
                Err(PopError::Empty) => {
                    // Exit only once the queue is drained
                    if !self.running.load(Ordering::SeqCst) {
                        debug!("[AnalysisWorker] stop requested and queue empty, exiting");
                        break;
                    }
                    thread::sleep(IDLE_POLL);
                    continue;
                }
            };

            self.fill_gap(buffer.gap_before);
            match self.session.ingest(&buffer.samples) {
                Ok(events) => self.publish(events),
                Err(err) => log_audio_error(&err, "AnalysisWorker::run"),
            }

            buffer.clear();
            if self.channels.pool_producer.push(buffer).is_err() {
                warn!("[AnalysisWorker] pool queue full, dropping buffer");
            }
        }

        // Drops after the last queued buffer never reached a gap field
        let trailing = self
            .dropped_samples
            .load(Ordering::Relaxed)
            .saturating_sub(self.gap_accounted);
        self.fill_gap(trailing);

        let (events, analytics) = self.session.stop();
        self.publish(events);
        info!(
            "[AnalysisWorker] finished: {} accepted events, motility index {}, {} samples lost",
            analytics.accepted_event_count,
            analytics.motility_index,
            self.session.lost_sample_count()
        );
        SessionReport::from_session(&self.session, analytics)
    }

    fn fill_gap(&mut self, samples: u64) {
        if samples == 0 {
            return;
        }
        self.gap_accounted += samples;
        match self.session.fill_gap(samples as usize) {
            Ok(events) => self.publish(events),
            Err(err) => log_audio_error(&err, "AnalysisWorker::fill_gap"),
        }
    }

    fn publish(&self, events: Vec<SessionEvent>) {
        for event in events {
            // No subscribers is not an error
            let _ = self.events_tx.send(event);
        }
    }
}
