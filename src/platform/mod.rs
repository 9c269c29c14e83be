//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame ticks (requestAnimationFrame on web, a stepped clock for headless runs)
//! - Event subscriptions and timers (web only)

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Whether a frame loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Anything driven once per display frame
pub trait FrameHandler {
    /// `now_ms` is a monotonic timestamp in milliseconds
    fn on_frame(&mut self, now_ms: f64) -> LoopControl;
}

/// How a `pagehide` leaves the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageExit {
    /// Unloading for good
    Discarded,
    /// Frozen in the back/forward cache; may be shown again
    Cached,
}

impl PageExit {
    /// From `PageTransitionEvent.persisted`
    pub fn from_persisted(persisted: bool) -> Self {
        if persisted {
            PageExit::Cached
        } else {
            PageExit::Discarded
        }
    }

    /// A cached page keeps its loop and subscriptions, which resume on `pageshow`
    pub fn releases_resources(self) -> bool {
        self == PageExit::Discarded
    }
}

/// Fixed-step clock for driving frames without a display
#[derive(Debug, Clone)]
pub struct SteppedClock {
    pub now_ms: f64,
    pub step_ms: f64,
}

impl SteppedClock {
    pub fn new(start_ms: f64, step_ms: f64) -> Self {
        Self {
            now_ms: start_ms,
            step_ms,
        }
    }

    /// 60 Hz starting at zero
    pub fn sixty_hz() -> Self {
        Self::new(0.0, 1000.0 / 60.0)
    }

    /// Run up to `frames` frames; returns how many ran
    pub fn run<H: FrameHandler + ?Sized>(&mut self, handler: &mut H, frames: usize) -> usize {
        for i in 0..frames {
            self.now_ms += self.step_ms;
            if handler.on_frame(self.now_ms) == LoopControl::Stop {
                return i + 1;
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        stamps: Vec<f64>,
        stop_after: usize,
    }

    impl FrameHandler for Recorder {
        fn on_frame(&mut self, now_ms: f64) -> LoopControl {
            self.stamps.push(now_ms);
            if self.stamps.len() >= self.stop_after {
                LoopControl::Stop
            } else {
                LoopControl::Continue
            }
        }
    }

    #[test]
    fn test_stepped_clock_runs_and_stops() {
        let mut clock = SteppedClock::new(100.0, 10.0);
        let mut rec = Recorder {
            stamps: Vec::new(),
            stop_after: 3,
        };
        assert_eq!(clock.run(&mut rec, 10), 3);
        assert_eq!(rec.stamps, vec![110.0, 120.0, 130.0]);
        assert_eq!(clock.now_ms, 130.0);
    }

    #[test]
    fn test_only_discarded_pages_release() {
        assert_eq!(PageExit::from_persisted(true), PageExit::Cached);
        assert!(!PageExit::from_persisted(true).releases_resources());
        assert!(PageExit::from_persisted(false).releases_resources());
    }
}
