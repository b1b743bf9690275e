// Analysis module - event detection, classification and session metrics
//
// Pipeline stages downstream of the band-limiting filter and the window
// energy extractor:
// - EventSegmenter: Idle/InEvent state machine producing EventCandidates
// - EventClassifier: transient → duration → stationarity → burst fingerprint
// - SignalQualityAssessor: per-window SNR and quality tier for the operator
// - SessionAggregator: Analytics at the end of a recording
//
// `features` holds the shared energy statistics all of the above use.

pub mod aggregator;
pub mod classifier;
pub mod features;
pub mod quality;
pub mod segmenter;

pub use aggregator::{Analytics, SessionAggregator};
pub use classifier::{ClassifiedEvent, EventClass, EventClassifier, EventMetrics};
pub use quality::{QualityReading, QualityTier, SignalQualityAssessor};
pub use segmenter::{CloseReason, EventCandidate, EventSegmenter, SegmenterState};
