//! Count-up animation for statistic counters
//!
//! The displayed value climbs by `ceil(target / speed)` every tick and stops
//! exactly on the target.

/// Higher is slower (more ticks to reach the target)
pub const COUNTER_SPEED: u64 = 200;
/// Milliseconds between increments
pub const COUNTER_TICK_MS: u32 = 20;
/// Fraction of the element that must be on screen to start
pub const VISIBILITY_THRESHOLD: f64 = 0.5;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterTick {
    /// Show this value and schedule another tick
    Continue(u64),
    /// Show this value; the animation is over
    Done(u64),
}

impl CounterTick {
    pub fn value(&self) -> u64 {
        match *self {
            CounterTick::Continue(v) | CounterTick::Done(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    value: u64,
    target: u64,
    step: u64,
}

impl Counter {
    /// Start at `start` (capped at the target)
    pub fn new(start: u64, target: u64, speed: u64) -> Self {
        Self {
            value: start.min(target),
            target,
            step: target.div_ceil(speed.max(1)),
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.value >= self.target
    }

    /// Move one step toward the target
    pub fn tick(&mut self) -> CounterTick {
        if self.value < self.target {
            self.value = self.value.saturating_add(self.step).min(self.target);
        }
        if self.is_done() {
            CounterTick::Done(self.value)
        } else {
            CounterTick::Continue(self.value)
        }
    }
}

/// Parse a `data-target` attribute. Accepts integers and non-negative decimals
/// (rounded); anything else is rejected.
pub fn parse_target(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v.round() as u64),
        _ => None,
    }
}

/// Parse the element's current text as the starting value (0 if not numeric)
pub fn parse_start(text: &str) -> u64 {
    let digits: String = text.chars().filter(|c| !matches!(c, ',' | ' ')).collect();
    digits.trim().parse().unwrap_or(0)
}
