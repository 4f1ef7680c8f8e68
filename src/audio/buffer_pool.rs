// Lock-free capture buffer pool with dual SPSC queues
//
// The capture callback must never allocate or lock. All sample buffers are
// allocated up front and circulate between the capture thread and the
// analysis thread through two rtrb ring buffers:
//
//   data queue: capture pushes filled buffers, analysis pops them
//   pool queue: analysis returns drained buffers, capture recycles them
//
// Construction splits the pool into the two thread-side halves, so each
// thread owns exactly the endpoints it may touch and the SPSC contract is
// enforced by ownership rather than discipline.

use rtrb::{Consumer, Producer, RingBuffer};

/// Capture buffer: pre-allocated f32 samples.
pub type SampleBuffer = Vec<f32>;

/// Endpoints owned by the capture callback thread.
pub struct CaptureChannels {
    /// Recycled empty buffers to fill with incoming samples
    pub pool_consumer: Consumer<SampleBuffer>,
    /// Filled buffers handed to the analysis thread
    pub data_producer: Producer<SampleBuffer>,
}

/// Endpoints owned by the analysis thread.
pub struct AnalysisChannels {
    /// Filled buffers arriving from the capture thread
    pub data_consumer: Consumer<SampleBuffer>,
    /// Drained buffers returned for recycling
    pub pool_producer: Producer<SampleBuffer>,
}

/// Allocate `buffer_count` buffers of `buffer_size` samples and return the
/// two thread-side halves. This is the only allocation point; after it, the
/// hot path is push/pop on wait-free queues.
///
/// # Panics
/// Panics if either dimension is zero.
pub fn split_pool(buffer_count: usize, buffer_size: usize) -> (CaptureChannels, AnalysisChannels) {
    assert!(buffer_count > 0, "buffer_count must be greater than 0");
    assert!(buffer_size > 0, "buffer_size must be greater than 0");

    let (mut pool_producer, pool_consumer) = RingBuffer::new(buffer_count);
    let (data_producer, data_consumer) = RingBuffer::new(buffer_count);

    for _ in 0..buffer_count {
        pool_producer
            .push(vec![0.0_f32; buffer_size])
            .expect("pool queue sized to hold every pre-allocated buffer");
    }

    (
        CaptureChannels {
            pool_consumer,
            data_producer,
        },
        AnalysisChannels {
            data_consumer,
            pool_producer,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_buffers_start_in_pool() {
        let (mut capture, mut analysis) = split_pool(16, 2048);

        let mut available = 0;
        while capture.pool_consumer.pop().is_ok() {
            available += 1;
        }
        assert_eq!(available, 16);
        assert!(analysis.data_consumer.pop().is_err());
    }

    #[test]
    fn test_buffers_preallocated_to_size() {
        let (mut capture, _analysis) = split_pool(1, 2048);
        let buffer = capture.pool_consumer.pop().unwrap();
        assert_eq!(buffer.len(), 2048);
        assert_eq!(buffer.capacity(), 2048);
    }

    #[test]
    fn test_buffer_circulation() {
        let (mut capture, mut analysis) = split_pool(4, 1024);

        // Capture side: pop an empty buffer, fill, hand off
        let mut buffer = capture.pool_consumer.pop().unwrap();
        buffer[0] = 1.0;
        capture.data_producer.push(buffer).unwrap();

        // Analysis side: pop, read, recycle
        let buffer = analysis.data_consumer.pop().unwrap();
        assert_eq!(buffer[0], 1.0);
        analysis.pool_producer.push(buffer).unwrap();

        // Recycled buffer is available to capture again
        let buffer = capture.pool_consumer.pop().unwrap();
        assert_eq!(buffer.len(), 1024);
    }

    #[test]
    fn test_pool_exhaustion_is_observable() {
        let (mut capture, mut analysis) = split_pool(2, 512);

        for i in 0..2 {
            let mut buffer = capture.pool_consumer.pop().unwrap();
            buffer[0] = i as f32;
            capture.data_producer.push(buffer).unwrap();
        }

        // Analysis has not drained yet: capture sees an empty pool and must
        // drop samples rather than block or allocate
        assert!(capture.pool_consumer.pop().is_err());

        for i in 0..2 {
            let buffer = analysis.data_consumer.pop().unwrap();
            assert_eq!(buffer[0], i as f32);
            analysis.pool_producer.push(buffer).unwrap();
        }

        assert!(capture.pool_consumer.pop().is_ok());
    }

    #[test]
    fn test_halves_are_send() {
        fn assert_send<T: Send>() {}
        // Each half moves to its thread once; rtrb endpoints are Send but
        // deliberately not Sync
        assert_send::<CaptureChannels>();
        assert_send::<AnalysisChannels>();
    }

    #[test]
    #[should_panic(expected = "buffer_count must be greater than 0")]
    fn test_zero_buffer_count_panics() {
        split_pool(0, 1024);
    }

    #[test]
    #[should_panic(expected = "buffer_size must be greater than 0")]
    fn test_zero_buffer_size_panics() {
        split_pool(16, 0);
    }
}
