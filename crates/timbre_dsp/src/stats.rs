//! Processing counters

use std::time::{Duration, Instant};

use serde::Serialize;

/// Call count and accumulated wall time of a processing component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub processing_count: u64,
    pub samples_processed: u64,
    pub total_time: Duration,
}

impl ProcessingStats {
    pub fn record(&mut self, started: Instant, samples: usize) {
        self.processing_count += 1;
        self.samples_processed += samples as u64;
        self.total_time += started.elapsed();
    }

    pub fn average_time(&self) -> Duration {
        if self.processing_count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.processing_count as u32
        }
    }
}
