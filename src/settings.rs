//! Globe settings and quality presets
//!
//! Defaults reproduce the stock page. A page can override any field with a
//! JSON object in the canvas element's `data-settings` attribute; missing
//! fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::widgets::carousel::CarouselConfig;
use crate::widgets::counter::{COUNTER_SPEED, COUNTER_TICK_MS};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Globe tessellation (width and height segments)
    pub fn sphere_segments(&self) -> u32 {
        match self {
            QualityPreset::Low => 24,
            QualityPreset::Medium => 48,
            QualityPreset::High => 64,
        }
    }

    /// Cap on devicePixelRatio for the backing surface
    pub fn max_pixel_ratio(&self) -> f64 {
        match self {
            QualityPreset::Low => 1.0,
            QualityPreset::Medium => 1.5,
            QualityPreset::High => 2.0,
        }
    }

    /// Fraction of the configured land dots to place
    pub fn dot_fraction(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.5,
            QualityPreset::Medium => 1.0,
            QualityPreset::High => 1.0,
        }
    }
}

/// Globe and page widget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Land dots ===
    /// Equirectangular land/ocean texture
    pub land_map_url: String,
    /// Dots to place before the quality fraction is applied
    pub target_dots: usize,

    // === Arcs ===
    /// Milliseconds between spawns while visible
    pub arc_spawn_interval_ms: f64,
    /// Grow/erase speed, segments per second
    pub arc_segment_rate: f32,
    /// Seconds fully drawn before erasing
    pub arc_dwell_secs: f32,
    /// Line segments per arc
    pub arc_segments: u32,

    // === Camera ===
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,

    // === Counters ===
    /// Counter step is ceil(target / counter_speed)
    pub counter_speed: u64,
    pub counter_tick_ms: u32,

    // === Carousel ===
    pub carousel: CarouselConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::High,

            land_map_url: LAND_MAP_URL.to_string(),
            target_dots: TARGET_DOTS,

            arc_spawn_interval_ms: ARC_SPAWN_INTERVAL_MS,
            arc_segment_rate: ARC_SEGMENT_RATE,
            arc_dwell_secs: ARC_DWELL_SECS,
            arc_segments: ARC_SEGMENTS,

            auto_rotate: true,
            auto_rotate_speed: AUTO_ROTATE_SPEED,

            counter_speed: COUNTER_SPEED,
            counter_tick_ms: COUNTER_TICK_MS,

            carousel: CarouselConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Parse a (possibly partial) JSON override
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::validated)
    }

    /// Replace values the frame loop cannot run with by their defaults.
    ///
    /// A non-positive segment rate would leave every arc growing forever.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !(self.arc_segment_rate.is_finite() && self.arc_segment_rate > 0.0) {
            log::warn!("arc_segment_rate {} must be positive", self.arc_segment_rate);
            self.arc_segment_rate = defaults.arc_segment_rate;
        }
        if !(self.arc_spawn_interval_ms.is_finite() && self.arc_spawn_interval_ms >= 0.0) {
            log::warn!("arc_spawn_interval_ms {} is invalid", self.arc_spawn_interval_ms);
            self.arc_spawn_interval_ms = defaults.arc_spawn_interval_ms;
        }
        if !(self.arc_dwell_secs.is_finite() && self.arc_dwell_secs >= 0.0) {
            log::warn!("arc_dwell_secs {} is invalid", self.arc_dwell_secs);
            self.arc_dwell_secs = defaults.arc_dwell_secs;
        }
        if !self.auto_rotate_speed.is_finite() {
            self.auto_rotate_speed = defaults.auto_rotate_speed;
        }
        self.arc_segments = self.arc_segments.max(1);
        self.counter_speed = self.counter_speed.max(1);
        self.counter_tick_ms = self.counter_tick_ms.max(1);
        self
    }

    /// Land dots actually placed for the current preset
    pub fn effective_target_dots(&self) -> usize {
        (self.target_dots as f32 * self.quality.dot_fraction()).round() as usize
    }

    /// Settings from an optional JSON attribute value, falling back to defaults
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some(json) if !json.trim().is_empty() => match Self::from_json(json) {
                Ok(settings) => {
                    log::info!("Loaded settings overrides ({})", settings.quality.as_str());
                    settings
                }
                Err(e) => {
                    log::warn!("Ignoring invalid data-settings: {}", e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Attribute holding the JSON overrides
    pub const ATTRIBUTE: &'static str = "data-settings";

    /// Load settings from an element's `data-settings` attribute (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load(element: &web_sys::Element) -> Self {
        Self::from_attribute(element.get_attribute(Self::ATTRIBUTE).as_deref())
    }
}
