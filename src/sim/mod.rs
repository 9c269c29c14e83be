//! Globe simulation module
//!
//! All animation logic lives here. This module must stay pure:
//! - Time comes in through `FrameInput`, never from a clock
//! - Seeded RNG only
//! - No rendering or platform dependencies

pub mod arc;
pub mod land;
pub mod state;
pub mod tick;

pub use arc::{Arc, ArcColors, ArcId, ArcPhase, ArcStep, BezierPath};
pub use land::{LandDot, LandDots, LandMask, MaskError, is_land_color, sample_land_dots};
pub use state::{ArcTiming, GlobeEvent, GlobeState};
pub use tick::{FrameInput, Spawner, tick};
