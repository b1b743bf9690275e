// MicrophoneCapture - default cpal input device feeding a CaptureFeed
//
// Only the first channel of an f32 input stream is used. The callback
// copies into a scratch buffer reserved up front and hands it to the feed;
// samples the feed cannot queue are counted there, never retried.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::engine::CaptureFeed;
use crate::error::AudioError;

/// Scratch capacity reserved for one callback's worth of mono samples
const SCRATCH_CAPACITY: usize = 8192;

fn default_input() -> Result<(cpal::Device, cpal::SupportedStreamConfig), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::HardwareError {
            details: "No default input device found".to_string(),
        })?;
    let config = device
        .default_input_config()
        .map_err(|e| AudioError::HardwareError {
            details: format!("Failed to get default input config: {:?}", e),
        })?;
    Ok((device, config))
}

/// Live input stream; capture stops when this is dropped
pub struct MicrophoneCapture {
    stream: cpal::Stream,
    sample_rate: u32,
}

impl MicrophoneCapture {
    /// Sample rate the default input device will deliver
    pub fn default_sample_rate() -> Result<u32, AudioError> {
        let (_, config) = default_input()?;
        Ok(config.sample_rate().0)
    }

    /// Open the default input device and start streaming into `feed`
    ///
    /// # Returns
    /// * `Err(AudioError::UnsupportedFormat)` - device is not f32
    /// * `Err(AudioError::HardwareError)` - no device or stream failure
    pub fn start(mut feed: CaptureFeed) -> Result<Self, AudioError> {
        let (device, config) = default_input()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat {
                reason: format!(
                    "input format {:?}, only F32 is supported",
                    config.sample_format()
                ),
            });
        }

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels_count = (stream_config.channels as usize).max(1);
        let sample_rate = stream_config.sample_rate.0;
        let mut scratch: Vec<f32> = Vec::with_capacity(SCRATCH_CAPACITY);

        let err_fn = |err| tracing::error!("[MicrophoneCapture] input stream error: {}", err);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    if channels_count == 1 {
                        scratch.extend_from_slice(data);
                    } else {
                        // De-interleave: take first channel
                        scratch.extend(data.chunks(channels_count).map(|frame| frame[0]));
                    }
                    // Drops are counted by the feed
                    let _ = feed.push(&scratch);
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::HardwareError {
                details: format!("Input stream open failed: {:?}", e),
            })?;

        stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Input start failed: {}", e),
        })?;

        tracing::info!(
            "[MicrophoneCapture] streaming {} channel(s) at {} Hz, using channel 0",
            channels_count,
            sample_rate
        );

        Ok(Self {
            stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Pause the stream without releasing the device
    pub fn pause(&self) -> Result<(), AudioError> {
        self.stream.pause().map_err(|e| AudioError::HardwareError {
            details: format!("Input pause failed: {}", e),
        })
    }
}
