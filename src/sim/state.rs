//! Globe simulation state
//!
//! Everything the frame loop mutates lives here: the active arc list, the
//! land dots (once the mask has loaded), the spawn timer and the RNG.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arc::{Arc, ArcColors, ArcId, BezierPath};
use super::land::{LandDots, LandMask, sample_land_dots};
use super::tick::Spawner;
use crate::consts::*;
use crate::settings::Settings;
use crate::{hsl_to_rgb, lat_lon_to_vec3, srgb_to_linear};

/// Something the renderer (or a log) should react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobeEvent {
    ArcSpawned(ArcId),
    /// Arc finished erasing and left the active set
    ArcRemoved(ArcId),
    DotsPlaced { count: usize, attempts: usize },
}

/// Arc timing, copied out of [`Settings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcTiming {
    pub segments: u32,
    pub segment_rate: f32,
    pub dwell_secs: f32,
}

impl From<&Settings> for ArcTiming {
    fn from(settings: &Settings) -> Self {
        let segment_rate = if settings.arc_segment_rate.is_finite() && settings.arc_segment_rate > 0.0 {
            settings.arc_segment_rate
        } else {
            ARC_SEGMENT_RATE
        };
        Self {
            segments: settings.arc_segments.max(1),
            segment_rate,
            dwell_secs: settings.arc_dwell_secs.max(0.0),
        }
    }
}

/// Complete visualization state
#[derive(Debug)]
pub struct GlobeState {
    /// Active arcs in spawn order
    pub arcs: Vec<Arc>,
    /// `None` until the land mask has been processed
    pub land_dots: Option<LandDots>,
    pub spawner: Spawner,
    pub timing: ArcTiming,
    /// Timestamp of the previous frame (ms)
    pub last_frame_ms: Option<f64>,
    /// Frames processed
    pub frame_count: u64,
    /// Events since the last drain
    pub events: Vec<GlobeEvent>,
    rng: Pcg32,
    next_arc_id: ArcId,
    target_dots: usize,
}

impl GlobeState {
    pub fn new(seed: u64, settings: &Settings) -> Self {
        Self {
            arcs: Vec::new(),
            land_dots: None,
            spawner: Spawner::new(settings.arc_spawn_interval_ms),
            timing: ArcTiming::from(settings),
            last_frame_ms: None,
            frame_count: 0,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_arc_id: 1,
            target_dots: settings.effective_target_dots(),
        }
    }

    /// Get next arc ID
    pub fn next_arc_id(&mut self) -> ArcId {
        let id = self.next_arc_id;
        self.next_arc_id += 1;
        id
    }

    /// Sample land dots from a loaded mask. Replaces any previous set.
    pub fn place_land_dots(&mut self, mask: &LandMask) -> &LandDots {
        let dots = sample_land_dots(
            mask,
            &mut self.rng,
            self.target_dots,
            ATTEMPTS_PER_DOT,
            RADIUS + DOT_LIFT,
        );
        self.events.push(GlobeEvent::DotsPlaced {
            count: dots.len(),
            attempts: dots.attempts,
        });
        self.land_dots.insert(dots)
    }

    /// Spawn an arc between two random locations
    pub fn spawn_random_arc(&mut self) -> ArcId {
        let (lat1, lon1) = self.random_lat_lon();
        let (lat2, lon2) = self.random_lat_lon();
        self.spawn_arc(lat1, lon1, lat2, lon2)
    }

    /// Spawn an arc between two lat/lon pairs (degrees)
    pub fn spawn_arc(&mut self, lat1: f32, lon1: f32, lat2: f32, lon2: f32) -> ArcId {
        let start = lat_lon_to_vec3(lat1, lon1, RADIUS + ARC_LIFT);
        let end = lat_lon_to_vec3(lat2, lon2, RADIUS + ARC_LIFT);
        let colors = self.random_arc_colors();
        let id = self.next_arc_id();

        self.arcs.push(Arc::new(
            id,
            BezierPath::lifted(start, end),
            colors,
            self.timing.segments,
        ));
        self.events.push(GlobeEvent::ArcSpawned(id));
        id
    }

    /// Look up an active arc
    pub fn arc(&self, id: ArcId) -> Option<&Arc> {
        self.arcs.iter().find(|a| a.id == id)
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GlobeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Latitude uniform in [-90, 90], longitude uniform in [-180, 180)
    fn random_lat_lon(&mut self) -> (f32, f32) {
        let lat = self.rng.random::<f32>() * 180.0 - 90.0;
        let lon = self.rng.random::<f32>() * 360.0 - 180.0;
        (lat, lon)
    }

    /// Saturated pastel gradient: one hue, slightly darker toward the end
    fn random_arc_colors(&mut self) -> ArcColors {
        let hue = self.rng.random::<f32>();
        let saturation = 0.8 + self.rng.random::<f32>() * 0.2;
        let light_start = 0.7 + self.rng.random::<f32>() * 0.2;
        let light_end = 0.6 + self.rng.random::<f32>() * 0.2;
        ArcColors {
            start: srgb_to_linear(hsl_to_rgb(hue, saturation, light_start)),
            end: srgb_to_linear(hsl_to_rgb(hue, saturation, light_end)),
        }
    }
}
