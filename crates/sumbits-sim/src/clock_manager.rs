//! Single-domain clock source
//!
//! Tracks the `clk` level, elapsed time and the number of rising edges. The
//! clock starts low at time zero and each level change takes half a period,
//! so the first rising edge lands at `period_ps / 2`. The testbench drives
//! one full period per pipeline cycle.

#[derive(Debug, Clone)]
pub struct ClockManager {
    name: String,
    period_ps: u64,
    high: bool,
    time_ps: u64,
    rising_edges: u64,
}

impl ClockManager {
    pub fn new(name: impl Into<String>, period_ps: u64) -> Self {
        ClockManager {
            name: name.into(),
            period_ps,
            high: false,
            time_ps: 0,
            rising_edges: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period_ps(&self) -> u64 {
        self.period_ps
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    fn half_period(&mut self) {
        self.time_ps += self.period_ps / 2;
        self.high = !self.high;
    }

    /// Advance to the next rising edge and return the edge count.
    ///
    /// A clock left high is first driven through its low phase.
    pub fn next_rising_edge(&mut self) -> u64 {
        if self.high {
            self.half_period();
        }
        self.half_period();
        self.rising_edges += 1;
        self.rising_edges
    }

    /// Drive the clock low again after a rising edge
    pub fn finish_cycle(&mut self) {
        if self.high {
            self.half_period();
        }
    }

    pub fn time_ps(&self) -> u64 {
        self.time_ps
    }

    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }

    pub fn reset(&mut self) {
        self.high = false;
        self.time_ps = 0;
        self.rising_edges = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_edge_at_half_period() {
        let mut clock = ClockManager::new("clk", 10_000);
        assert!(!clock.is_high());
        assert_eq!(clock.next_rising_edge(), 1);
        assert!(clock.is_high());
        assert_eq!(clock.time_ps(), 5_000);
    }

    #[test]
    fn test_full_cycles_advance_time() {
        let mut clock = ClockManager::new("clk", 10_000);
        assert_eq!(clock.next_rising_edge(), 1);
        clock.finish_cycle();
        assert_eq!(clock.next_rising_edge(), 2);
        clock.finish_cycle();
        assert_eq!(clock.time_ps(), 20_000);
        assert!(!clock.is_high());
    }

    #[test]
    fn test_back_to_back_edges_pass_through_low() {
        let mut clock = ClockManager::new("clk", 10_000);
        clock.next_rising_edge();
        assert_eq!(clock.next_rising_edge(), 2);
        assert_eq!(clock.time_ps(), 15_000);
    }

    #[test]
    fn test_reset() {
        let mut clock = ClockManager::new("clk", 10_000);
        clock.next_rising_edge();
        clock.reset();
        assert_eq!(clock.time_ps(), 0);
        assert_eq!(clock.rising_edges(), 0);
        assert!(!clock.is_high());
        assert_eq!(clock.name(), "clk");
        assert_eq!(clock.period_ps(), 10_000);
    }
}
