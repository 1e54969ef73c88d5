//! Synchronous register stage
//!
//! A register is updated in two phases: `next` computes what it will hold
//! after the clock edge from the pre-edge values of its sources, and
//! `commit` stores it. The pipeline evaluates every register before
//! committing any of them.

use serde::{Deserialize, Serialize};

/// Register state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterState {
    /// Held at zero by reset
    Reset,
    /// Capturing its combinational input every edge
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterStage {
    width: usize,
    mask: u64,
    value: u64,
    state: RegisterState,
}

impl RegisterStage {
    /// A register of `width` bits, starting in reset.
    ///
    /// # Panics
    ///
    /// Panics unless `1 <= width <= 64`.
    pub fn new(width: usize) -> Self {
        assert!(
            (1..=64).contains(&width),
            "register width {} out of range",
            width
        );
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        RegisterStage {
            width,
            mask,
            value: 0,
            state: RegisterState::Reset,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn state(&self) -> RegisterState {
        self.state
    }

    /// Value this register captures on the next edge
    pub fn next(&self, reset: bool, next_value: u64) -> u64 {
        if reset {
            0
        } else {
            debug_assert!(
                next_value <= self.mask,
                "{} overflows a {}-bit register",
                next_value,
                self.width
            );
            next_value & self.mask
        }
    }

    /// Store a value produced by `next`
    pub fn commit(&mut self, reset: bool, value: u64) {
        self.value = value;
        self.state = if reset {
            RegisterState::Reset
        } else {
            RegisterState::Running
        };
    }

    /// Evaluate and commit in one step, for registers with no peers
    pub fn tick(&mut self, reset: bool, next_value: u64) -> u64 {
        let value = self.next(reset, next_value);
        self.commit(reset, value);
        value
    }

    /// Force the register to zero outside of a clock edge
    pub fn clear(&mut self) {
        self.commit(true, 0);
    }

    pub(crate) fn restore(&mut self, value: u64, state: RegisterState) {
        self.value = value & self.mask;
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_reset() {
        let reg = RegisterStage::new(3);
        assert_eq!(reg.value(), 0);
        assert_eq!(reg.state(), RegisterState::Reset);
    }

    #[test]
    fn test_captures_when_running() {
        let mut reg = RegisterStage::new(3);
        assert_eq!(reg.tick(false, 5), 5);
        assert_eq!(reg.state(), RegisterState::Running);
    }

    #[test]
    fn test_reset_overrides_next_value() {
        let mut reg = RegisterStage::new(3);
        reg.tick(false, 7);
        assert_eq!(reg.tick(true, 6), 0);
        assert_eq!(reg.state(), RegisterState::Reset);
    }

    #[test]
    fn test_next_does_not_mutate() {
        let mut reg = RegisterStage::new(4);
        reg.tick(false, 9);
        assert_eq!(reg.next(false, 3), 3);
        assert_eq!(reg.value(), 9);
    }

    #[test]
    fn test_full_width_register() {
        let mut reg = RegisterStage::new(64);
        assert_eq!(reg.tick(false, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_clear() {
        let mut reg = RegisterStage::new(2);
        reg.tick(false, 2);
        reg.clear();
        assert_eq!(reg.value(), 0);
        assert_eq!(reg.state(), RegisterState::Reset);
    }

    #[test]
    #[should_panic]
    fn test_zero_width_panics() {
        let _ = RegisterStage::new(0);
    }
}
