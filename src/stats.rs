use std::time::Instant;

use tracing::info;

/// Link counters, kept by the link manager and read out for telemetry.
#[derive(Debug, Clone)]
pub struct Stats {
    pub connects: u64,
    pub reconnects: u64,
    pub retries: u64,
    pub writes: u64,
    pub bytes: u64,
    pub failures: u64,
    t0: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            connects: 0,
            reconnects: 0,
            retries: 0,
            writes: 0,
            bytes: 0,
            failures: 0,
            t0: Instant::now(),
        }
    }
    pub fn add_write(&mut self, n: usize) {
        self.writes += 1;
        self.bytes += n as u64;
    }
    pub fn inc_connect(&mut self) {
        self.connects += 1;
    }
    pub fn inc_reconnect(&mut self) {
        self.reconnects += 1;
    }
    pub fn inc_retry(&mut self) {
        self.retries += 1;
    }
    pub fn inc_failure(&mut self) {
        self.failures += 1;
    }

    pub fn log(&self) {
        let dur = self.t0.elapsed().as_secs_f64().max(1e-3);
        info!(
            connects = self.connects,
            reconnects = self.reconnects,
            retries = self.retries,
            writes = self.writes,
            bytes = self.bytes,
            failures = self.failures,
            "link stats over {:.1}s ({:.1} cmd/s)",
            dur,
            self.writes as f64 / dur
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_writes_and_bytes() {
        let mut s = Stats::new();
        s.add_write(1);
        s.add_write(1);
        s.inc_retry();
        s.inc_failure();
        assert_eq!(s.writes, 2);
        assert_eq!(s.bytes, 2);
        assert_eq!(s.retries, 1);
        assert_eq!(s.failures, 1);
        assert_eq!(s.connects, 0);
    }
}
