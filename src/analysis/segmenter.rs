// EventSegmenter - Idle/InEvent state machine over 100 ms energy windows
//
// One window at a time, no look-ahead. A window whose RMS is above the
// adaptive threshold opens (or extends) a candidate; the first window back
// under the threshold closes it. Candidates are therefore strictly ordered
// and never overlap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::features::samples_to_ms;
use crate::audio::window::AudioWindow;
use crate::config::SegmentationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterState {
    Idle,
    InEvent,
}

/// Why a candidate was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Energy fell back under the threshold
    BelowThreshold,
    /// Hit the hard candidate length cap
    MaxDuration,
    /// Session stopped while the candidate was open
    Stopped,
}

/// A span of filtered audio between an upward and a downward crossing
#[derive(Debug, Clone, PartialEq)]
pub struct EventCandidate {
    pub start_time_ms: u64,
    /// Unset while the candidate is open
    pub end_time_ms: Option<u64>,
    /// Filtered samples captured while over threshold
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub close_reason: Option<CloseReason>,
}

impl EventCandidate {
    pub fn new(start_time_ms: u64, sample_rate: u32) -> Self {
        Self {
            start_time_ms,
            end_time_ms: None,
            samples: Vec::new(),
            sample_rate,
            close_reason: None,
        }
    }

    /// Build an already-closed candidate (replay and tests)
    pub fn closed(start_time_ms: u64, end_time_ms: u64, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            start_time_ms,
            end_time_ms: Some(end_time_ms.max(start_time_ms)),
            samples,
            sample_rate,
            close_reason: Some(CloseReason::BelowThreshold),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time_ms.is_none()
    }

    /// `end - start` once closed
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time_ms
            .map(|end| end.saturating_sub(self.start_time_ms))
    }

    /// Duration implied by the captured samples
    pub fn captured_ms(&self) -> u64 {
        samples_to_ms(self.samples.len() as u64, self.sample_rate)
    }

    fn close(&mut self, end_time_ms: u64, reason: CloseReason) {
        self.end_time_ms = Some(end_time_ms.max(self.start_time_ms));
        self.close_reason = Some(reason);
    }
}

pub struct EventSegmenter {
    threshold: f64,
    max_candidate_duration_ms: u64,
    sample_rate: u32,
    open: Option<EventCandidate>,
}

impl EventSegmenter {
    /// # Arguments
    /// * `threshold` - adaptive threshold from the calibration profile
    /// * `config` - segmentation limits
    /// * `sample_rate` - rate of the filtered samples handed to `process_window`
    pub fn new(threshold: f64, config: &SegmentationConfig, sample_rate: u32) -> Self {
        Self {
            threshold,
            max_candidate_duration_ms: config.max_candidate_duration_ms,
            sample_rate,
            open: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn state(&self) -> SegmenterState {
        if self.open.is_some() {
            SegmenterState::InEvent
        } else {
            SegmenterState::Idle
        }
    }

    /// The open candidate, if any
    pub fn current(&self) -> Option<&EventCandidate> {
        self.open.as_ref()
    }

    /// Advance the machine by one window
    ///
    /// # Arguments
    /// * `window` - timestamp and RMS of the window
    /// * `samples` - the filtered samples the window covers
    ///
    /// # Returns
    /// The candidate completed by this window, if any
    pub fn process_window(&mut self, window: &AudioWindow, samples: &[f32]) -> Option<EventCandidate> {
        let over = window.rms > self.threshold;

        if !over {
            return self.take_closed(window.start_time_ms, CloseReason::BelowThreshold);
        }

        match self.open.as_mut() {
            Some(candidate) => candidate.samples.extend_from_slice(samples),
            None => {
                debug!(
                    "[Segmenter] open at {} ms (rms {:.5} > {:.5})",
                    window.start_time_ms, window.rms, self.threshold
                );
                let mut candidate = EventCandidate::new(window.start_time_ms, self.sample_rate);
                candidate.samples.extend_from_slice(samples);
                self.open = Some(candidate);
            }
        }
        self.close_if_capped(window, samples.len())
    }

    /// Close the open candidate at `end_time_ms`, appending `trailing`
    /// samples that never formed a complete window
    pub fn force_close(&mut self, end_time_ms: u64, trailing: &[f32]) -> Option<EventCandidate> {
        if let Some(candidate) = self.open.as_mut() {
            candidate.samples.extend_from_slice(trailing);
        }
        self.take_closed(end_time_ms, CloseReason::Stopped)
    }

    /// Drop any open candidate without emitting it
    pub fn reset(&mut self) {
        self.open = None;
    }

    fn close_if_capped(&mut self, window: &AudioWindow, window_len: usize) -> Option<EventCandidate> {
        let window_end = window.start_time_ms + samples_to_ms(window_len as u64, self.sample_rate);
        let start = self.open.as_ref()?.start_time_ms;
        if window_end.saturating_sub(start) >= self.max_candidate_duration_ms {
            debug!("[Segmenter] candidate from {} ms hit the length cap", start);
            self.take_closed(window_end, CloseReason::MaxDuration)
        } else {
            None
        }
    }

    fn take_closed(&mut self, end_time_ms: u64, reason: CloseReason) -> Option<EventCandidate> {
        let mut candidate = self.open.take()?;
        candidate.close(end_time_ms, reason);
        debug!(
            "[Segmenter] closed {}..{} ms ({:?})",
            candidate.start_time_ms, end_time_ms, reason
        );
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;
    const WINDOW: usize = 800;

    fn segmenter() -> EventSegmenter {
        EventSegmenter::new(0.1, &SegmentationConfig::default(), RATE)
    }

    fn feed(seg: &mut EventSegmenter, levels: &[f64]) -> Vec<EventCandidate> {
        levels
            .iter()
            .enumerate()
            .filter_map(|(i, &rms)| {
                let window = AudioWindow {
                    start_time_ms: i as u64 * 100,
                    rms,
                };
                seg.process_window(&window, &vec![rms as f32; WINDOW])
            })
            .collect()
    }

    #[test]
    fn test_single_excursion_becomes_one_candidate() {
        let mut seg = segmenter();
        let out = feed(&mut seg, &[0.01, 0.01, 0.5, 0.6, 0.5, 0.4, 0.01, 0.01]);

        assert_eq!(out.len(), 1);
        let candidate = &out[0];
        assert_eq!(candidate.start_time_ms, 200);
        assert_eq!(candidate.end_time_ms, Some(600));
        assert_eq!(candidate.duration_ms(), Some(400));
        assert_eq!(candidate.samples.len(), 4 * WINDOW);
        assert_eq!(candidate.close_reason, Some(CloseReason::BelowThreshold));
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_threshold_equality_is_not_over() {
        let mut seg = segmenter();
        let out = feed(&mut seg, &[0.1, 0.1, 0.1]);
        assert!(out.is_empty());
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn test_back_to_back_crossings_are_two_candidates() {
        let mut seg = segmenter();
        let out = feed(&mut seg, &[0.5, 0.5, 0.01, 0.5, 0.01]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].end_time_ms, Some(200));
        assert_eq!(out[1].start_time_ms, 300);
        assert!(out[0].end_time_ms.unwrap() <= out[1].start_time_ms);
    }

    #[test]
    fn test_open_candidate_stays_in_event() {
        let mut seg = segmenter();
        let out = feed(&mut seg, &[0.01, 0.5, 0.5]);
        assert!(out.is_empty());
        assert_eq!(seg.state(), SegmenterState::InEvent);
        assert!(seg.current().map(|c| c.is_open()).unwrap_or(false));
    }

    #[test]
    fn test_force_close_keeps_trailing_samples() {
        let mut seg = segmenter();
        feed(&mut seg, &[0.5, 0.5]);

        let candidate = seg.force_close(250, &[0.5; 400]).unwrap();
        assert_eq!(candidate.start_time_ms, 0);
        assert_eq!(candidate.end_time_ms, Some(250));
        assert_eq!(candidate.samples.len(), 2 * WINDOW + 400);
        assert_eq!(candidate.close_reason, Some(CloseReason::Stopped));
        assert!(seg.force_close(300, &[]).is_none());
    }

    #[test]
    fn test_max_duration_cap_closes_candidate() {
        let config = SegmentationConfig {
            max_candidate_duration_ms: 500,
        };
        let mut seg = EventSegmenter::new(0.1, &config, RATE);
        let out = feed(&mut seg, &[0.5; 7]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_time_ms, 0);
        assert_eq!(out[0].end_time_ms, Some(500));
        assert_eq!(out[0].close_reason, Some(CloseReason::MaxDuration));
        // Windows 6 and 7 opened a fresh candidate
        assert_eq!(seg.current().map(|c| c.start_time_ms), Some(500));
    }
}
