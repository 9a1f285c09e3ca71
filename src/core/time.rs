//! Scan cycle timing utilities

use std::collections::VecDeque;
use std::time::Duration;

/// Number of recent cycles kept for rolling statistics
const HISTORY_LEN: usize = 64;

/// Rolling statistics over the most recent scan cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CycleStats {
    /// Average cycle duration in milliseconds
    pub avg_ms: f32,
    /// Fastest cycle in the window
    pub min_ms: f32,
    /// Slowest cycle in the window
    pub max_ms: f32,
    /// Duration of the most recent cycle
    pub last_ms: f32,
    /// Total cycles recorded since creation
    pub cycle_count: u64,
}

/// Tracks how long each scan cycle takes
#[derive(Debug)]
pub struct CycleTimer {
    last: Duration,
    cycle_count: u64,
    history: VecDeque<Duration>,
}

impl CycleTimer {
    /// Create a new cycle timer
    pub fn new() -> Self {
        Self {
            last: Duration::ZERO,
            cycle_count: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Record one cycle's duration
    pub fn record(&mut self, elapsed: Duration) {
        self.last = elapsed;
        self.cycle_count += 1;
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(elapsed);
    }

    /// Rolling statistics over the retained history
    pub fn stats(&self) -> CycleStats {
        if self.history.is_empty() {
            return CycleStats::default();
        }

        let mut total = 0.0f32;
        let mut min_ms = f32::INFINITY;
        let mut max_ms = 0.0f32;
        for elapsed in &self.history {
            let ms = elapsed.as_secs_f32() * 1000.0;
            total += ms;
            min_ms = min_ms.min(ms);
            max_ms = max_ms.max(ms);
        }

        CycleStats {
            avg_ms: total / self.history.len() as f32,
            min_ms,
            max_ms,
            last_ms: self.last.as_secs_f32() * 1000.0,
            cycle_count: self.cycle_count,
        }
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new()
    }
}
