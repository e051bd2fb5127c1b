//! Timing generators.

use chrono::Utc;
use rand::Rng;

/// Lower bound of generated span latencies (1 ms).
pub const MIN_LATENCY_NS: u64 = 1_000_000;

/// Upper bound of generated span latencies (50 ms).
pub const MAX_LATENCY_NS: u64 = 50_000_000;

/// Current wall-clock time in nanoseconds since the Unix epoch.
///
/// This is NOT deterministic - each call returns the current time.
/// Saturates to 0 for times outside the range `i64` nanoseconds can express.
pub fn generate_start_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .unwrap_or(0)
}

/// Random span latency between [`MIN_LATENCY_NS`] and [`MAX_LATENCY_NS`].
pub fn generate_latency_ns<R: Rng>(rng: &mut R) -> u64 {
    rng.gen_range(MIN_LATENCY_NS..=MAX_LATENCY_NS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_start_ns_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(generate_start_ns() > 1_577_836_800_000_000_000);
    }

    #[test]
    fn test_latency_in_range_and_deterministic() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        let latency = generate_latency_ns(&mut rng1);
        assert!((MIN_LATENCY_NS..=MAX_LATENCY_NS).contains(&latency));
        assert_eq!(latency, generate_latency_ns(&mut rng2));
    }
}
