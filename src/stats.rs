//! Performance statistics collection for `--stats` output.

use std::time::{Duration, Instant};

/// Collects phase timings and solve counters.
///
/// The driver holds an `Option<Stats>` created when `--stats` is passed
/// and records into it in place. Zero cost when `None` — no timing
/// calls, no counter increments.
pub struct Stats {
    total_start: Instant,
    phases: Vec<(&'static str, Duration)>,
    pub outer_iterations: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            phases: Vec::new(),
            outer_iterations: 0,
        }
    }

    /// Record a completed phase with its duration.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        self.phases.push((name, duration));
    }

    /// Time a closure and record it as a phase.
    pub fn time_phase<T>(&mut self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.add_phase(name, start.elapsed());
        out
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        let total = self.total_start.elapsed();
        eprintln!();
        eprintln!("=== poisson2d performance stats ===");
        for (name, dur) in &self.phases {
            eprintln!("  {:<24} {:>8.3}s", name, dur.as_secs_f64());
        }
        if self.outer_iterations > 0 {
            eprintln!("  Outer iterations:       {}", self.outer_iterations);
        }
        eprintln!("  Total:                  {:>8.3}s", total.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_phase_returns_closure_result() {
        let mut stats = Stats::new();
        let v = stats.time_phase("solve", || 41 + 1);
        assert_eq!(v, 42);
        assert_eq!(stats.phases.len(), 1);
        assert_eq!(stats.phases[0].0, "solve");
    }
}
