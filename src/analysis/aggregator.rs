// SessionAggregator - end-of-recording analytics
//
// Collects every ClassifiedEvent of a session in arrival order and, once the
// recording is over, reduces the accepted ones to the session Analytics
// record. Rejected events only feed the rejection breakdown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::classifier::{ClassifiedEvent, EventClass};
use crate::config::AggregationConfig;

/// Number of equal-duration activity timeline buckets
pub const TIMELINE_BUCKETS: usize = 10;

const EVENT_RATE_WEIGHT: f64 = 0.7;
const ACTIVE_TIME_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub events_per_minute: f64,
    pub total_active_seconds: f64,
    pub total_quiet_seconds: f64,
    /// Percent (0-100) of each bucket covered by accepted events
    pub activity_timeline: [f64; TIMELINE_BUCKETS],
    /// 0-100 blend of normalized event rate and active-time fraction
    pub motility_index: u8,
    pub recording_duration_seconds: f64,
    pub accepted_event_count: usize,
    pub rejected_event_count: usize,
    /// Rejected event count per classification
    pub rejection_breakdown: BTreeMap<EventClass, usize>,
}

impl Analytics {
    /// Analytics of a recording with no events
    pub fn empty(recording_duration_ms: u64) -> Self {
        summarize(&[], recording_duration_ms, &AggregationConfig::default())
    }

    pub fn has_activity(&self) -> bool {
        self.accepted_event_count > 0
    }
}

pub struct SessionAggregator {
    config: AggregationConfig,
    events: Vec<ClassifiedEvent>,
}

impl SessionAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, event: ClassifiedEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ClassifiedEvent] {
        &self.events
    }

    pub fn accepted_count(&self) -> usize {
        self.events.iter().filter(|e| e.accepted).count()
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Reduce the recorded events over `recording_duration_ms`
    pub fn finalize(&self, recording_duration_ms: u64) -> Analytics {
        let analytics = summarize(&self.events, recording_duration_ms, &self.config);
        info!(
            "[Aggregator] {} accepted / {} rejected over {:.1} s, motility index {}",
            analytics.accepted_event_count,
            analytics.rejected_event_count,
            analytics.recording_duration_seconds,
            analytics.motility_index
        );
        analytics
    }
}

/// Pure reduction of a session's events into `Analytics`
///
/// Zero accepted events or a zero-length recording yields zeros, never NaN.
pub fn summarize(
    events: &[ClassifiedEvent],
    recording_duration_ms: u64,
    config: &AggregationConfig,
) -> Analytics {
    let duration_ms = recording_duration_ms as f64;
    let recording_duration_seconds = duration_ms / 1000.0;

    let mut rejection_breakdown = BTreeMap::new();
    let mut accepted_spans = Vec::new();
    for event in events {
        if event.accepted {
            let start = (event.start_time_ms as f64).min(duration_ms);
            let end = (event.end_time_ms as f64).clamp(start, duration_ms);
            accepted_spans.push((start, end));
        } else {
            *rejection_breakdown.entry(event.classification).or_insert(0) += 1;
        }
    }
    let accepted_event_count = accepted_spans.len();
    let rejected_event_count = events.len() - accepted_event_count;

    let active_ms: f64 = accepted_spans.iter().map(|(s, e)| e - s).sum::<f64>().min(duration_ms);
    let total_active_seconds = active_ms / 1000.0;
    let total_quiet_seconds = (recording_duration_seconds - total_active_seconds).max(0.0);

    let events_per_minute = if recording_duration_seconds > 0.0 {
        accepted_event_count as f64 / (recording_duration_seconds / 60.0)
    } else {
        0.0
    };

    let mut activity_timeline = [0.0; TIMELINE_BUCKETS];
    if duration_ms > 0.0 {
        let bucket_ms = duration_ms / TIMELINE_BUCKETS as f64;
        for (i, bucket) in activity_timeline.iter_mut().enumerate() {
            let lo = i as f64 * bucket_ms;
            let hi = lo + bucket_ms;
            let covered: f64 = accepted_spans
                .iter()
                .map(|&(s, e)| (e.min(hi) - s.max(lo)).max(0.0))
                .sum();
            *bucket = (covered / bucket_ms * 100.0).clamp(0.0, 100.0);
        }
    }

    let active_percent = if duration_ms > 0.0 {
        active_ms / duration_ms * 100.0
    } else {
        0.0
    };
    let motility_index = motility_index(events_per_minute, active_percent, config);

    Analytics {
        events_per_minute,
        total_active_seconds,
        total_quiet_seconds,
        activity_timeline,
        motility_index,
        recording_duration_seconds,
        accepted_event_count,
        rejected_event_count,
        rejection_breakdown,
    }
}

/// `round(normalizedRate * 0.7 + activePercent * 0.3)`, clamped to 0..=100
///
/// The event rate is normalized against `referenceEventsPerMinute` and
/// capped at 100.
pub fn motility_index(events_per_minute: f64, active_percent: f64, config: &AggregationConfig) -> u8 {
    let normalized_rate = if config.reference_events_per_minute > 0.0 && events_per_minute.is_finite() {
        (events_per_minute.max(0.0) / config.reference_events_per_minute).min(1.0) * 100.0
    } else {
        0.0
    };
    let score = normalized_rate * EVENT_RATE_WEIGHT + active_percent.clamp(0.0, 100.0) * ACTIVE_TIME_WEIGHT;
    if score.is_finite() {
        score.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}
