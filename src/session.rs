// MotilitySession - one recording, owned end to end
//
// A session owns every piece of mutable pipeline state: filter chain, window
// extractor, calibrator, calibration profile, segmenter, classifier, quality
// assessor and aggregator. Nothing is shared between sessions. Callers push
// raw sample buffers through `ingest` and receive the ordered events each
// buffer produced; `stop` flushes the open candidate and yields Analytics.
//
// Phases:
// 1. Calibrating: filtered windows feed the noise floor calibrator only
// 2. Monitoring: filter reset, windows feed quality + segmentation
// 3. Stopped: analytics frozen, further ingestion rejected

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::aggregator::{Analytics, SessionAggregator};
use crate::analysis::classifier::{ClassifiedEvent, EventClassifier};
use crate::analysis::quality::{QualityReading, SignalQualityAssessor};
use crate::analysis::segmenter::{EventCandidate, EventSegmenter};
use crate::audio::filter::BandLimitingFilter;
use crate::audio::window::WindowEnergyExtractor;
use crate::calibration::{CalibrationProfile, CalibrationProgress, NoiseFloorCalibrator};
use crate::config::AppConfig;
use crate::error::{log_audio_error, AudioError, ConfigError, MotilityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Calibrating,
    Monitoring,
    Stopped,
}

/// Incremental output of a session, in processing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    CalibrationProgress(CalibrationProgress),
    CalibrationComplete(CalibrationProfile),
    Quality(QualityReading),
    Classified(ClassifiedEvent),
}

/// Stages that only exist once a calibration profile does
struct Monitor {
    segmenter: EventSegmenter,
    assessor: SignalQualityAssessor,
}

pub struct MotilitySession {
    config: AppConfig,
    sample_rate: u32,
    phase: SessionPhase,
    filter: BandLimitingFilter,
    extractor: WindowEnergyExtractor,
    calibrator: NoiseFloorCalibrator,
    profile: Option<CalibrationProfile>,
    monitor: Option<Monitor>,
    classifier: EventClassifier,
    aggregator: SessionAggregator,
    raw: Vec<f32>,
    filtered: Vec<f32>,
    sanitized_samples: u64,
    lost_samples: u64,
    analytics: Option<Analytics>,
}

impl MotilitySession {
    /// Build a session for audio at `sample_rate`
    ///
    /// # Returns
    /// * `Err(ConfigError)` - invalid configuration or a band the sample
    ///   rate cannot represent
    pub fn new(config: AppConfig, sample_rate: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        config.validate_band(sample_rate)?;

        let filter = BandLimitingFilter::new(sample_rate, &config.filter)?;
        let extractor =
            WindowEnergyExtractor::new(sample_rate).map_err(|err| ConfigError::InvalidValue {
                field: "sampleRate",
                reason: err.to_string(),
            })?;
        let calibrator =
            NoiseFloorCalibrator::new(config.calibration.clone(), config.quality.clone());
        let classifier = EventClassifier::new(config.classifier.clone());
        let aggregator = SessionAggregator::new(config.aggregation.clone());

        info!(
            "[Session] created at {} Hz, calibrating for {:.1} s ({} windows)",
            sample_rate,
            config.calibration.anf_calibration_duration_seconds,
            calibrator.windows_needed()
        );

        Ok(Self {
            config,
            sample_rate,
            phase: SessionPhase::Calibrating,
            filter,
            extractor,
            calibrator,
            profile: None,
            monitor: None,
            classifier,
            aggregator,
            raw: Vec::new(),
            filtered: Vec::new(),
            sanitized_samples: 0,
            lost_samples: 0,
            analytics: None,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    pub fn calibration_progress(&self) -> CalibrationProgress {
        self.calibrator.progress()
    }

    /// Every classified event so far, in time order
    pub fn events(&self) -> &[ClassifiedEvent] {
        self.aggregator.events()
    }

    /// Milliseconds of audio received since monitoring began
    pub fn monitoring_elapsed_ms(&self) -> u64 {
        match self.phase {
            SessionPhase::Calibrating => 0,
            _ => self.extractor.elapsed_ms(),
        }
    }

    /// Number of NaN/inf samples replaced by silence
    pub fn sanitized_sample_count(&self) -> u64 {
        self.sanitized_samples
    }

    /// Samples reported lost upstream via `fill_gap`
    pub fn lost_sample_count(&self) -> u64 {
        self.lost_samples
    }

    /// Account for `count` samples lost before they reached the session
    ///
    /// While monitoring the gap is processed as silence, so event timestamps
    /// and the recording duration stay on the capture clock. Calibration
    /// only measures audio it actually received; a gap there is logged and
    /// counted.
    ///
    /// # Returns
    /// The events the silence produced, or `Err(AudioError::SessionStopped)`
    pub fn fill_gap(&mut self, count: usize) -> Result<Vec<SessionEvent>, AudioError> {
        if self.phase == SessionPhase::Stopped {
            return Err(AudioError::SessionStopped);
        }
        let mut events = Vec::new();
        if count == 0 {
            return Ok(events);
        }
        self.lost_samples += count as u64;

        if self.phase == SessionPhase::Calibrating {
            warn!(
                "[Session] {} samples lost during calibration ({} total)",
                count, self.lost_samples
            );
            return Ok(events);
        }

        warn!(
            "[Session] filling {} lost samples with silence at {} ms ({} total)",
            count,
            self.monitoring_elapsed_ms(),
            self.lost_samples
        );
        let silence = vec![0.0f32; count.min(self.extractor.samples_per_window().max(1))];
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(silence.len());
            self.process_monitoring(&silence[..take], &mut events);
            remaining -= take;
        }
        Ok(events)
    }

    /// Push one buffer of raw samples through the pipeline
    ///
    /// # Returns
    /// The events this buffer produced, in order, or
    /// `Err(AudioError::SessionStopped)` once the session has been stopped.
    pub fn ingest(&mut self, samples: &[f32]) -> Result<Vec<SessionEvent>, AudioError> {
        if self.phase == SessionPhase::Stopped {
            return Err(AudioError::SessionStopped);
        }

        self.sanitize(samples);
        let raw = std::mem::take(&mut self.raw);
        let mut events = Vec::new();

        let mut offset = 0;
        if self.phase == SessionPhase::Calibrating {
            offset = self.calibrate(&raw, &mut events);
        }
        if self.phase == SessionPhase::Monitoring && offset < raw.len() {
            self.process_monitoring(&raw[offset..], &mut events);
        }

        self.raw = raw;
        Ok(events)
    }

    /// Stop the session, classifying any in-flight candidate
    ///
    /// Safe in every phase and idempotent: later calls return no events and
    /// the same analytics.
    pub fn stop(&mut self) -> (Vec<SessionEvent>, Analytics) {
        if let Some(analytics) = &self.analytics {
            return (Vec::new(), analytics.clone());
        }

        let mut events = Vec::new();
        let duration_ms = if self.phase == SessionPhase::Monitoring {
            let trailing = self.extractor.take_pending();
            let end_ms = self.extractor.elapsed_ms();
            let flushed = self
                .monitor
                .as_mut()
                .and_then(|m| m.segmenter.force_close(end_ms, &trailing));
            if let Some(candidate) = flushed {
                debug!("[Session] force-closed candidate at {} ms", end_ms);
                events.push(SessionEvent::Classified(self.classify(&candidate)));
            }
            end_ms
        } else {
            0
        };

        let analytics = self.aggregator.finalize(duration_ms);
        info!(
            "[Session] stopped after {} ms of monitoring ({} events)",
            duration_ms,
            self.aggregator.events().len()
        );
        self.phase = SessionPhase::Stopped;
        self.analytics = Some(analytics.clone());
        (events, analytics)
    }

    /// Discard the profile, events and monitoring progress and calibrate
    /// again from the next sample
    pub fn retry_calibration(&mut self) {
        info!("[Session] calibration retry requested");
        self.filter.reset();
        self.extractor.reset();
        self.calibrator.reset();
        self.profile = None;
        self.monitor = None;
        self.aggregator.reset();
        self.analytics = None;
        self.phase = SessionPhase::Calibrating;
    }

    fn sanitize(&mut self, samples: &[f32]) {
        let mut replaced = 0u64;
        self.raw.clear();
        self.raw.extend(samples.iter().map(|&s| {
            if s.is_finite() {
                s
            } else {
                replaced += 1;
                0.0
            }
        }));
        if replaced > 0 {
            self.sanitized_samples += replaced;
            warn!(
                "[Session] replaced {} non-finite samples with silence ({} total)",
                replaced, self.sanitized_samples
            );
        }
    }

    /// Feed calibration windows; returns how many samples of `raw` it used
    fn calibrate(&mut self, raw: &[f32], events: &mut Vec<SessionEvent>) -> usize {
        let before = self.calibrator.progress();

        let take = self.calibration_samples_remaining().min(raw.len());
        let Self {
            filter,
            extractor,
            calibrator,
            filtered,
            ..
        } = self;
        filter.process(&raw[..take], filtered);
        extractor.process(&filtered[..], |window, _| {
            calibrator.add_window(window.rms);
        });

        let progress = self.calibrator.progress();
        if progress != before {
            events.push(SessionEvent::CalibrationProgress(progress));
        }
        if self.calibrator.is_complete() {
            self.finish_calibration(events);
        }
        take
    }

    fn calibration_samples_remaining(&self) -> usize {
        let per_window = self.extractor.samples_per_window();
        let remaining_windows = self
            .calibrator
            .windows_needed()
            .saturating_sub(self.calibrator.progress().windows_collected);
        (remaining_windows * per_window).saturating_sub(self.extractor.pending().len())
    }

    fn finish_calibration(&mut self, events: &mut Vec<SessionEvent>) {
        let profile = self.calibrator.finalize();
        if profile.low_confidence {
            warn!(
                "[Session] low-confidence calibration ({} windows, tier {})",
                profile.window_count,
                profile.quality_tier.display_name()
            );
        }
        info!(
            "[Session] calibration complete: noise {:.5} ± {:.5}, threshold {:.5}, SNR {:.1} dB ({})",
            profile.noise_mean,
            profile.noise_std_dev,
            profile.adaptive_threshold,
            profile.estimated_snr_db,
            profile.quality_tier.display_name()
        );

        // Settled calibration state must not leak into segmentation
        self.filter.reset();
        self.extractor.reset();

        self.monitor = Some(Monitor {
            segmenter: EventSegmenter::new(
                profile.adaptive_threshold,
                &self.config.segmentation,
                self.sample_rate,
            ),
            assessor: SignalQualityAssessor::new(&profile, self.config.quality.clone()),
        });
        self.profile = Some(profile.clone());
        self.phase = SessionPhase::Monitoring;
        events.push(SessionEvent::CalibrationComplete(profile));
    }

    fn process_monitoring(&mut self, raw: &[f32], events: &mut Vec<SessionEvent>) {
        let Self {
            filter,
            extractor,
            monitor,
            classifier,
            aggregator,
            filtered,
            ..
        } = self;
        let Some(monitor) = monitor.as_mut() else {
            return;
        };

        filter.process(raw, filtered);
        extractor.process(&filtered[..], |window, samples| {
            events.push(SessionEvent::Quality(monitor.assessor.assess(&window)));
            if let Some(candidate) = monitor.segmenter.process_window(&window, samples) {
                let event = classifier.classify(&candidate);
                log_classified(&event);
                aggregator.record(event.clone());
                events.push(SessionEvent::Classified(event));
            }
        });
    }

    fn classify(&mut self, candidate: &EventCandidate) -> ClassifiedEvent {
        let event = self.classifier.classify(candidate);
        log_classified(&event);
        self.aggregator.record(event.clone());
        event
    }
}

fn log_classified(event: &ClassifiedEvent) {
    if event.accepted {
        info!(
            "[Session] accepted {} ms event at {} ms (peak {:.4})",
            event.duration_ms, event.start_time_ms, event.peak_rms
        );
    } else {
        debug!(
            "[Session] rejected event at {} ms: {}",
            event.start_time_ms, event.reason
        );
    }
}

/// Outcome of analyzing a complete recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub sample_rate: u32,
    pub calibration: Option<CalibrationProfile>,
    pub analytics: Analytics,
    pub events: Vec<ClassifiedEvent>,
    pub sanitized_samples: u64,
    pub lost_samples: u64,
}

impl SessionReport {
    /// Collect the outcome of a stopped session
    pub(crate) fn from_session(session: &MotilitySession, analytics: Analytics) -> Self {
        Self {
            sample_rate: session.sample_rate(),
            calibration: session.profile().cloned(),
            analytics,
            events: session.events().to_vec(),
            sanitized_samples: session.sanitized_sample_count(),
            lost_samples: session.lost_sample_count(),
        }
    }
}

/// Run a whole in-memory recording through a fresh session
///
/// Samples are ingested in `config.audio.buffer_size` chunks, as a live
/// capture would deliver them.
pub fn analyze_recording(
    config: &AppConfig,
    sample_rate: u32,
    samples: &[f32],
) -> Result<SessionReport, MotilityError> {
    let mut session = MotilitySession::new(config.clone(), sample_rate)?;
    for chunk in samples.chunks(config.audio.buffer_size.max(1)) {
        if let Err(err) = session.ingest(chunk) {
            log_audio_error(&err, "analyze_recording");
            return Err(err.into());
        }
    }
    let (_, analytics) = session.stop();

    Ok(SessionReport::from_session(&session, analytics))
}
