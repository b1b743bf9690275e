// WindowEnergyExtractor - fixed 100 ms RMS windows over a sample stream
//
// Samples arrive in arbitrarily sized buffers; the extractor carries the
// incomplete tail of each buffer over to the next call so that windows are
// always exactly `samples_per_window` long and timestamps never drift.

use serde::{Deserialize, Serialize};

use crate::analysis::features::{ms_to_samples, rms, samples_to_ms};
use crate::error::AudioError;

/// Duration of one energy window
pub const WINDOW_DURATION_MS: u64 = 100;

/// One 100 ms window of filtered audio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioWindow {
    /// Start of the window relative to the extractor's origin
    pub start_time_ms: u64,
    pub rms: f64,
}

#[derive(Debug)]
pub struct WindowEnergyExtractor {
    sample_rate: u32,
    samples_per_window: usize,
    pending: Vec<f32>,
    samples_consumed: u64,
}

impl WindowEnergyExtractor {
    /// Create an extractor for `sample_rate`
    ///
    /// # Returns
    /// * `Err(AudioError::InvalidSampleRate)` - rate too low for a non-empty window
    pub fn new(sample_rate: u32) -> Result<Self, AudioError> {
        let samples_per_window = ms_to_samples(WINDOW_DURATION_MS as f64, sample_rate);
        if samples_per_window == 0 {
            return Err(AudioError::InvalidSampleRate { sample_rate });
        }
        Ok(Self {
            sample_rate,
            samples_per_window,
            pending: Vec::with_capacity(samples_per_window),
            samples_consumed: 0,
        })
    }

    pub fn samples_per_window(&self) -> usize {
        self.samples_per_window
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples received but not yet part of a complete window
    pub fn pending(&self) -> &[f32] {
        &self.pending
    }

    /// Time covered by every sample received so far, including `pending()`
    pub fn elapsed_ms(&self) -> u64 {
        samples_to_ms(
            self.samples_consumed + self.pending.len() as u64,
            self.sample_rate,
        )
    }

    /// Time covered by complete windows only
    pub fn windowed_ms(&self) -> u64 {
        samples_to_ms(self.samples_consumed, self.sample_rate)
    }

    /// Feed samples; `on_window` is called once per completed window, in
    /// order, with the window and the exact samples it covers.
    pub fn process<F>(&mut self, samples: &[f32], mut on_window: F)
    where
        F: FnMut(AudioWindow, &[f32]),
    {
        let mut rest = samples;

        if !self.pending.is_empty() {
            let needed = self.samples_per_window - self.pending.len();
            let take = needed.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() < self.samples_per_window {
                return;
            }
            let window = self.make_window(&self.pending);
            on_window(window, &self.pending);
            self.samples_consumed += self.samples_per_window as u64;
            self.pending.clear();
        }

        let mut chunks = rest.chunks_exact(self.samples_per_window);
        for chunk in chunks.by_ref() {
            let window = self.make_window(chunk);
            on_window(window, chunk);
            self.samples_consumed += self.samples_per_window as u64;
        }
        self.pending.extend_from_slice(chunks.remainder());
    }

    /// Drop any partial window and restart the clock at zero
    pub fn reset(&mut self) {
        self.pending.clear();
        self.samples_consumed = 0;
    }

    /// Take the partial window without emitting it
    pub fn take_pending(&mut self) -> Vec<f32> {
        let tail = std::mem::take(&mut self.pending);
        self.samples_consumed += tail.len() as u64;
        self.pending = Vec::with_capacity(self.samples_per_window);
        tail
    }

    fn make_window(&self, samples: &[f32]) -> AudioWindow {
        AudioWindow {
            start_time_ms: samples_to_ms(self.samples_consumed, self.sample_rate),
            rms: rms(samples),
        }
    }
}
