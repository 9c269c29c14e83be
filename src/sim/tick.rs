//! Per-frame simulation step
//!
//! Driven by frame timestamps rather than a fixed timestep: arc speeds are
//! expressed per second, so each frame advances by the elapsed time.

use super::arc::ArcStep;
use super::state::{GlobeEvent, GlobeState};

/// Input for a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Frame timestamp in milliseconds (monotonic)
    pub now_ms: f64,
    /// Page is in the foreground
    pub visible: bool,
}

impl FrameInput {
    pub fn visible(now_ms: f64) -> Self {
        Self {
            now_ms,
            visible: true,
        }
    }

    pub fn hidden(now_ms: f64) -> Self {
        Self {
            now_ms,
            visible: false,
        }
    }
}

/// Fixed-interval arc spawn timer.
///
/// Fires when the page is visible and more than `interval_ms` has passed since
/// the last spawn. Hidden frames are skipped outright, so nothing queues up
/// while the page is in the background.
#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    pub interval_ms: f64,
    pub last_spawn_ms: f64,
    /// Hidden frames that arrived after the interval had elapsed
    pub skipped_hidden: u64,
}

impl Spawner {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_spawn_ms: 0.0,
            skipped_hidden: 0,
        }
    }

    /// Whether to spawn on this frame; records the spawn time if so
    pub fn poll(&mut self, now_ms: f64, visible: bool) -> bool {
        if now_ms - self.last_spawn_ms <= self.interval_ms {
            return false;
        }
        if !visible {
            self.skipped_hidden += 1;
            return false;
        }
        self.last_spawn_ms = now_ms;
        true
    }
}

/// Advance the globe by one frame. Returns the elapsed time in seconds.
///
/// Order: maybe spawn one arc, then advance every active arc (including a
/// freshly spawned one) and drop the ones that finished erasing.
pub fn tick(state: &mut GlobeState, input: &FrameInput) -> f32 {
    let dt = match state.last_frame_ms {
        Some(last) => ((input.now_ms - last) / 1000.0).max(0.0) as f32,
        None => 0.0,
    };
    state.last_frame_ms = Some(input.now_ms);
    state.frame_count += 1;

    if state.spawner.poll(input.now_ms, input.visible) {
        state.spawn_random_arc();
    }

    let timing = state.timing;
    let mut removed = Vec::new();
    state.arcs.retain_mut(|arc| {
        match arc.advance(dt, timing.segment_rate, timing.dwell_secs) {
            ArcStep::Finished => {
                removed.push(arc.id);
                false
            }
            _ => true,
        }
    });
    state
        .events
        .extend(removed.into_iter().map(GlobeEvent::ArcRemoved));

    dt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::arc::ArcPhase;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn run_frames(state: &mut GlobeState, start_ms: f64, frames: usize, visible: bool) -> f64 {
        let mut now = start_ms;
        for _ in 0..frames {
            now += FRAME_MS;
            tick(state, &FrameInput { now_ms: now, visible });
        }
        now
    }

    fn spawned(events: &[GlobeEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GlobeEvent::ArcSpawned(_)))
            .count()
    }

    #[test]
    fn test_spawner_interval_is_strict() {
        let mut spawner = Spawner::new(500.0);
        assert!(!spawner.poll(500.0, true));
        assert!(spawner.poll(500.5, true));
        assert!(!spawner.poll(1000.5, true));
        assert!(spawner.poll(1000.75, true));
    }

    #[test]
    fn test_hidden_page_spawns_nothing() {
        let mut spawner = Spawner::new(500.0);
        assert!(spawner.poll(600.0, true));

        // Hidden for 2000 ms of frames
        let mut now = 600.0;
        while now < 2600.0 {
            now += FRAME_MS;
            assert!(!spawner.poll(now, false));
        }
        // Every hidden frame past the 500 ms mark counts, not just one per interval
        assert!(spawner.skipped_hidden > 1);

        // Visible again: exactly one spawn, no backlog
        now += FRAME_MS;
        assert!(spawner.poll(now, true));
        assert!(!spawner.poll(now + FRAME_MS, true));
    }

    #[test]
    fn test_hidden_window_in_full_tick() {
        let mut state = GlobeState::new(1, &Settings::default());
        let now = run_frames(&mut state, 0.0, 60, true);
        let before = spawned(&state.drain_events());
        assert!(before >= 1);

        let now = run_frames(&mut state, now, 120, false);
        assert_eq!(spawned(&state.drain_events()), 0);

        run_frames(&mut state, now, 1, true);
        assert_eq!(spawned(&state.drain_events()), 1);
    }

    #[test]
    fn test_arcs_keep_moving_while_hidden() {
        let mut state = GlobeState::new(2, &Settings::default());
        tick(&mut state, &FrameInput::visible(1000.0));
        assert_eq!(state.arcs.len(), 1);
        let grow_before = state.arcs[0].grow;

        tick(&mut state, &FrameInput::hidden(1100.0));
        assert!(state.arcs[0].grow > grow_before);
        assert_eq!(state.arcs.len(), 1);
    }

    #[test]
    fn test_first_frame_has_zero_dt() {
        let mut state = GlobeState::new(4, &Settings::default());
        let dt = tick(&mut state, &FrameInput::visible(5000.0));
        assert_eq!(dt, 0.0);
        let dt = tick(&mut state, &FrameInput::visible(5100.0));
        assert!((dt - 0.1).abs() < 1e-6);
        // Clock going backwards never rewinds arcs
        assert_eq!(tick(&mut state, &FrameInput::visible(5050.0)), 0.0);
    }

    #[test]
    fn test_arc_full_lifecycle_removed_once() {
        let mut settings = Settings::default();
        // Only the first spawn matters here
        settings.arc_spawn_interval_ms = 1.0e9;
        let mut state = GlobeState::new(8, &settings);
        state.spawner.last_spawn_ms = -2.0e9;

        tick(&mut state, &FrameInput::visible(0.0));
        let id = state.arcs[0].id;
        let mut saw_full = false;
        let mut saw_erasing = false;
        let mut removed = 0;
        let mut now = 0.0;

        for _ in 0..600 {
            now += FRAME_MS;
            tick(&mut state, &FrameInput::visible(now));
            if let Some(arc) = state.arc(id) {
                saw_full |= matches!(arc.phase, ArcPhase::Full { .. });
                saw_erasing |= matches!(arc.phase, ArcPhase::Erasing { .. });
            }
            removed += state
                .drain_events()
                .iter()
                .filter(|e| **e == GlobeEvent::ArcRemoved(id))
                .count();
        }

        assert!(saw_full && saw_erasing);
        assert_eq!(removed, 1);
        assert!(state.arcs.is_empty());
    }

    #[test]
    fn test_steady_state_arc_count() {
        // ~1.28 s grow + 0.5 s dwell + ~1.28 s erase, one spawn per 0.5 s
        let mut state = GlobeState::new(21, &Settings::default());
        run_frames(&mut state, 0.0, 60 * 20, true);
        let n = state.arcs.len();
        assert!((5..=8).contains(&n), "{n} active arcs");
    }

    #[test]
    fn test_zero_segment_rate_override_still_retires_arcs() {
        let settings = Settings::from_json(r#"{"arc_segment_rate": 0.0}"#).unwrap();
        let mut state = GlobeState::new(13, &settings);
        assert!(state.timing.segment_rate > 0.0);

        run_frames(&mut state, 0.0, 60 * 60, true);
        let removed = state
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GlobeEvent::ArcRemoved(_)))
            .count();
        assert!(removed > 90, "{removed} arcs retired");
        assert!(state.arcs.len() <= 8, "{} active arcs", state.arcs.len());
    }

    #[test]
    fn test_timing_ignores_non_positive_rate() {
        let mut settings = Settings::default();
        settings.arc_segment_rate = -5.0;
        settings.arc_dwell_secs = f32::NAN;
        let timing = crate::sim::state::ArcTiming::from(&settings);
        assert_eq!(timing.segment_rate, crate::consts::ARC_SEGMENT_RATE);
        assert_eq!(timing.dwell_secs, 0.0);
    }
}
