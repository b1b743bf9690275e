// Calibration module - ambient noise floor measurement
//
// This module provides two components:
// 1. NoiseFloorCalibrator: collects window RMS values during the quiet prefix
// 2. CalibrationProfile: immutable noise statistics and adaptive threshold
//
// The calibration workflow:
// 1. Create NoiseFloorCalibrator
// 2. Feed one RMS value per 100 ms of filtered audio until complete
// 3. Finalize into a CalibrationProfile (re-created wholesale on retry)

pub mod procedure;
pub mod profile;

pub use procedure::{calibrate, CalibrationProgress, NoiseFloorCalibrator};
pub use profile::CalibrationProfile;
