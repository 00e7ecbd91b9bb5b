//! Per-request performance accounting.
//!
//! Counters accumulate while the loop runs and are folded into a summary
//! at termination. The summary is descriptive only and never feeds back
//! into generation behavior.

use std::time::Instant;

use serde::Serialize;

/// Running totals for one generation request.
#[derive(Debug)]
pub struct GenerationStats {
    started: Instant,
    iterations: usize,
    matched_total: usize,
}

impl GenerationStats {
    /// Start the clock for a new request.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            iterations: 0,
            matched_total: 0,
        }
    }

    /// Record one verify/accept iteration.
    ///
    /// `matched_count` is the number of draft tokens confirmed this
    /// iteration; the guaranteed bonus token is accounted implicitly.
    pub fn record_jump(&mut self, matched_count: usize) {
        self.iterations += 1;
        self.matched_total += matched_count;
    }

    /// Iterations recorded so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Tokens appended so far (matches plus one bonus per iteration).
    pub fn tokens_generated(&self) -> usize {
        self.matched_total + self.iterations
    }

    /// Fold the totals into a summary.
    pub fn finalize(&self) -> StatsSummary {
        // Floor at 1ms so a degenerate fast path cannot divide by zero.
        let elapsed = self.started.elapsed().as_secs_f64().max(1e-3);
        let tokens = self.tokens_generated();

        let avg_tokens_per_jump = if self.iterations == 0 {
            0.0
        } else {
            tokens as f64 / self.iterations as f64
        };

        StatsSummary {
            tokens_per_second: tokens as f64 / elapsed,
            avg_tokens_per_jump,
            latency_ms: elapsed * 1000.0,
            iterations: self.iterations,
            tokens_generated: tokens,
        }
    }
}

/// Summary metrics returned with the final text.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    /// Generated tokens per second of wall-clock time.
    pub tokens_per_second: f64,
    /// Average tokens accepted per verify/accept iteration.
    /// At least 1.0 whenever an iteration ran, since every iteration
    /// contributes the bonus token.
    pub avg_tokens_per_jump: f64,
    /// Total request latency in milliseconds.
    pub latency_ms: f64,
    /// Verify/accept iterations executed.
    pub iterations: usize,
    /// Tokens generated beyond the prompt.
    pub tokens_generated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_accounting() {
        let mut stats = GenerationStats::start();
        stats.record_jump(3);
        stats.record_jump(0);
        stats.record_jump(2);

        assert_eq!(stats.iterations(), 3);
        assert_eq!(stats.tokens_generated(), 8);

        let summary = stats.finalize();
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.tokens_generated, 8);
        assert!((summary.avg_tokens_per_jump - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_avg_is_at_least_one_per_iteration() {
        let mut stats = GenerationStats::start();
        for _ in 0..10 {
            stats.record_jump(0);
        }
        let summary = stats.finalize();
        assert!(summary.avg_tokens_per_jump >= 1.0);
    }

    #[test]
    fn test_no_iterations_yields_zeroes() {
        let summary = GenerationStats::start().finalize();
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.tokens_generated, 0);
        assert_eq!(summary.avg_tokens_per_jump, 0.0);
        assert_eq!(summary.tokens_per_second, 0.0);
    }

    #[test]
    fn test_latency_is_positive() {
        let summary = GenerationStats::start().finalize();
        assert!(summary.latency_ms >= 1.0);
    }
}
