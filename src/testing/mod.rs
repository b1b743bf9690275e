//! Synthetic signal harness.
//!
//! Deterministic generators for calibration noise, gut-like bursts, taps and
//! stationary tones. Used by the unit tests, the integration tests in
//! `tests/`, and the `synth` subcommand of `motility_cli` so that every
//! scenario can be reproduced from a seed without a microphone.

pub mod signals;

pub use signals::{
    render_scenario, render_scenario_with_events, InjectedEvent, SyntheticScenario,
};
