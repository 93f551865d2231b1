use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One durable traffic-log row. The payload is an opaque blob from the
/// pipeline's point of view; only the rewrite rule ever looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLog {
    pub id: i64,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

/// Update-queue item: a reference to a row whose durable payload still has
/// to be brought in line with the rewrite rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateIntent {
    pub id: i64,
}

/// Closed interval of known record ids, snapshotted once at preload time.
/// New rows inserted after preload are not visible to sampling until the
/// process restarts and preloads again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min_id: i64,
    pub max_id: i64,
}

impl IdRange {
    pub fn new(min_id: i64, max_id: i64) -> Self {
        Self { min_id, max_id }
    }

    /// Draw an id uniformly from the interval. A degenerate interval
    /// (max <= min) always yields `min_id`.
    pub fn sample(&self) -> i64 {
        if self.max_id <= self.min_id {
            return self.min_id;
        }
        rand::rng().random_range(self.min_id..=self.max_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_stays_inside_the_interval() {
        let range = IdRange::new(3, 9);
        for _ in 0..200 {
            let id = range.sample();
            assert!((3..=9).contains(&id));
        }
    }

    #[test]
    fn degenerate_interval_samples_min() {
        assert_eq!(IdRange::new(5, 5).sample(), 5);
        assert_eq!(IdRange::new(7, 2).sample(), 7);
    }
}
