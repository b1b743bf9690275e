// BufferPool - lock-free buffer pool with dual SPSC queues
//
// Links the capture side (microphone callback, file reader, test feeder) to
// the analysis worker without allocating or locking on the capture side.
//
// Architecture:
// - DATA_QUEUE: capture side pushes filled buffers, worker consumes
// - POOL_QUEUE: worker returns emptied buffers, capture side recycles
//
// Buffer flow:
// 1. Capture pops an empty buffer from POOL_QUEUE
// 2. Capture copies samples into it, noting any samples dropped since the
//    previous queued buffer
// 3. Capture pushes it to DATA_QUEUE
// 4. Worker pops it from DATA_QUEUE and runs the session on it
// 5. Worker clears it and pushes it back to POOL_QUEUE

use rtrb::{Consumer, Producer};

use crate::error::AudioError;

/// Pooled buffer of f32 samples
///
/// Buffers travel empty with their capacity reserved; `samples.len()` is the
/// number of valid samples while a buffer sits in the data queue.
#[derive(Debug, Default)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    /// Samples the capture side dropped right before this buffer
    pub gap_before: u64,
}

impl AudioBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            gap_before: 0,
        }
    }

    /// Fill from `samples`, reusing the reserved capacity
    pub fn fill(&mut self, samples: &[f32], gap_before: u64) {
        self.samples.clear();
        self.samples.extend_from_slice(samples);
        self.gap_before = gap_before;
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.gap_before = 0;
    }
}

/// Capture-side ends of the two queues
pub struct CaptureChannels {
    /// Sends filled buffers to the worker
    pub data_producer: Producer<AudioBuffer>,
    /// Receives empty buffers from the worker
    pub pool_consumer: Consumer<AudioBuffer>,
}

/// Worker-side ends of the two queues
pub struct WorkerChannels {
    /// Receives filled buffers from capture
    pub data_consumer: Consumer<AudioBuffer>,
    /// Returns emptied buffers to capture
    pub pool_producer: Producer<AudioBuffer>,
}

/// Lock-free buffer pool using dual SPSC ring buffers
///
/// All buffers are allocated up front, so neither side allocates while
/// streaming.
///
/// # Example
/// ```ignore
/// let (mut capture, mut worker) = BufferPool::new(16, 2048)?;
///
/// // Capture side:
/// if let Ok(mut buffer) = capture.pool_consumer.pop() {
///     buffer.fill(&samples, 0);
///     capture.data_producer.push(buffer).ok();
/// }
///
/// // Worker side:
/// if let Ok(mut buffer) = worker.data_consumer.pop() {
///     session.ingest(&buffer.samples)?;
///     buffer.clear();
///     worker.pool_producer.push(buffer).ok();
/// }
/// ```
pub struct BufferPool;

impl BufferPool {
    /// Create the queues and pre-allocate `buffer_count` buffers
    ///
    /// # Arguments
    /// * `buffer_count` - Number of buffers in flight (bufferPoolSize)
    /// * `buffer_capacity` - Samples per buffer (bufferSize)
    ///
    /// # Returns
    /// * `Err(AudioError::WorkerFailed)` - zero count or capacity
    #[allow(clippy::new_ret_no_self)]
    pub fn new(
        buffer_count: usize,
        buffer_capacity: usize,
    ) -> Result<(CaptureChannels, WorkerChannels), AudioError> {
        if buffer_count == 0 || buffer_capacity == 0 {
            return Err(AudioError::WorkerFailed {
                reason: format!(
                    "buffer pool needs a non-zero count and capacity (got {} x {})",
                    buffer_count, buffer_capacity
                ),
            });
        }

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        for _ in 0..buffer_count {
            pool_producer
                .push(AudioBuffer::with_capacity(buffer_capacity))
                .map_err(|_| AudioError::WorkerFailed {
                    reason: "pool queue full during initialization".to_string(),
                })?;
        }

        Ok((
            CaptureChannels {
                data_producer,
                pool_consumer,
            },
            WorkerChannels {
                data_consumer,
                pool_producer,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_creation() {
        let (mut capture, mut worker) = BufferPool::new(16, 2048).unwrap();

        let mut available_buffers = 0;
        while let Ok(buffer) = capture.pool_consumer.pop() {
            assert!(buffer.samples.is_empty());
            assert!(buffer.samples.capacity() >= 2048);
            assert_eq!(buffer.gap_before, 0);
            available_buffers += 1;
        }
        assert_eq!(available_buffers, 16, "Expected 16 buffers in pool queue");

        assert!(
            worker.data_consumer.pop().is_err(),
            "Data queue should be empty initially"
        );
    }

    #[test]
    fn test_buffer_circulation() {
        let (mut capture, mut worker) = BufferPool::new(2, 512).unwrap();

        for i in 0..2 {
            let mut buffer = capture.pool_consumer.pop().unwrap();
            buffer.fill(&[i as f32; 10], i);
            capture.data_producer.push(buffer).unwrap();
        }
        assert!(
            capture.pool_consumer.pop().is_err(),
            "Pool should be exhausted"
        );

        for i in 0..2 {
            let mut buffer = worker.data_consumer.pop().unwrap();
            assert_eq!(buffer.samples.len(), 10);
            assert_eq!(buffer.samples[0], i as f32, "Buffers arrive in order");
            assert_eq!(buffer.gap_before, i);
            buffer.clear();
            assert_eq!(buffer.gap_before, 0);
            worker.pool_producer.push(buffer).unwrap();
        }

        assert!(capture.pool_consumer.pop().is_ok());
        assert!(capture.pool_consumer.pop().is_ok());
        assert!(capture.pool_consumer.pop().is_err());
    }

    #[test]
    fn test_fill_reuses_capacity() {
        let mut buffer = AudioBuffer::with_capacity(64);
        let reserved = buffer.samples.as_ptr();
        buffer.fill(&[0.5; 64], 128);
        assert_eq!(buffer.samples.as_ptr(), reserved);
        assert_eq!(buffer.gap_before, 128);
        buffer.fill(&[0.25; 8], 0);
        assert_eq!(buffer.samples, vec![0.25; 8]);
        assert_eq!(buffer.gap_before, 0);
    }

    #[test]
    fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CaptureChannels>();
        assert_send::<WorkerChannels>();
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(matches!(
            BufferPool::new(0, 1024),
            Err(AudioError::WorkerFailed { .. })
        ));
        assert!(BufferPool::new(16, 0).is_err());
    }
}
