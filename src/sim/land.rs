//! Land dot placement over an equirectangular land/ocean raster
//!
//! Dots are sampled uniformly over the sphere, not over image pixels:
//! - longitude uniform in [-180, 180)
//! - latitude = asin(u), u uniform in [-1, 1] (equal-area)
//!
//! Each sample is projected into the raster and kept if its color looks like land.

use std::fmt;

use glam::Vec3;
use rand::Rng;

use crate::lat_lon_to_vec3;

/// Red must exceed blue by more than this to count as land
const LAND_RED_MARGIN: i16 = 10;
/// Green must exceed blue by more than this to count as land
const LAND_GREEN_MARGIN: i16 = 5;

/// Why a raster was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// Width or height is zero
    Empty,
    /// Pixel buffer length doesn't match `width * height * 4`
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::Empty => write!(f, "land mask has no pixels"),
            MaskError::SizeMismatch { expected, actual } => write!(
                f,
                "land mask buffer is {actual} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for MaskError {}

/// RGBA8 equirectangular raster, row 0 at the north pole
#[derive(Debug, Clone)]
pub struct LandMask {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl LandMask {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty);
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(MaskError::SizeMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Single-color raster (handy for tests and the headless preview)
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, MaskError> {
        let pixels = width as usize * height as usize;
        let rgba = (0..pixels)
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        Self::from_rgba(width, height, rgba)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel coordinates for a lat/lon pair, clamped to the raster
    pub fn pixel_for(&self, lat: f32, lon: f32) -> (u32, u32) {
        let u = (lon + 180.0) / 360.0;
        let v = 1.0 - (lat + 90.0) / 180.0;
        let x = ((u * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((v * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        (x as u32, y as u32)
    }

    /// RGB at a pixel
    #[inline]
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2]]
    }

    /// Coarse land test: warm/green pixels are land, blue ones are ocean.
    /// Clouds and ice are classified however their color falls.
    pub fn is_land(&self, lat: f32, lon: f32) -> bool {
        let (x, y) = self.pixel_for(lat, lon);
        is_land_color(self.rgb_at(x, y))
    }
}

/// The color heuristic on its own
#[inline]
pub fn is_land_color([r, g, b]: [u8; 3]) -> bool {
    let (r, g, b) = (r as i16, g as i16, b as i16);
    r > b + LAND_RED_MARGIN && g > b + LAND_GREEN_MARGIN
}

/// A placed land dot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandDot {
    pub lat: f32,
    pub lon: f32,
    pub position: Vec3,
}

/// Immutable land point cloud
#[derive(Debug, Clone, Default)]
pub struct LandDots {
    dots: Vec<LandDot>,
    /// Samples drawn to produce this set
    pub attempts: usize,
}

impl LandDots {
    pub fn as_slice(&self) -> &[LandDot] {
        &self.dots
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.dots.iter().map(|d| d.position)
    }
}

/// Uniform-area random point, (lat, lon) in degrees
pub fn random_surface_lat_lon<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    let lon = rng.random::<f32>() * 360.0 - 180.0;
    let u = rng.random::<f32>() * 2.0 - 1.0;
    let lat = u.asin().to_degrees();
    (lat, lon)
}

/// Rejection-sample up to `target` land dots on a sphere of `radius`.
///
/// Stops after `target * attempts_per_dot` samples even if few (or no) samples
/// hit land, so an all-ocean raster still terminates.
pub fn sample_land_dots<R: Rng + ?Sized>(
    mask: &LandMask,
    rng: &mut R,
    target: usize,
    attempts_per_dot: usize,
    radius: f32,
) -> LandDots {
    let budget = target.saturating_mul(attempts_per_dot);
    let mut dots = Vec::with_capacity(target);
    let mut attempts = 0;

    while dots.len() < target && attempts < budget {
        attempts += 1;
        let (lat, lon) = random_surface_lat_lon(rng);
        if !mask.is_land(lat, lon) {
            continue;
        }
        dots.push(LandDot {
            lat,
            lon,
            position: lat_lon_to_vec3(lat, lon, radius),
        });
    }

    if dots.len() < target {
        log::debug!(
            "Land sampling budget exhausted: {} of {} dots after {} attempts",
            dots.len(),
            target,
            attempts
        );
    }

    LandDots { dots, attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const LAND: [u8; 3] = [120, 100, 40];
    const OCEAN: [u8; 3] = [10, 30, 120];

    /// Western hemisphere land, eastern hemisphere ocean
    fn half_land_mask() -> LandMask {
        let (w, h) = (64u32, 32u32);
        let mut rgba = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                let c = if x < w / 2 { LAND } else { OCEAN };
                rgba.extend_from_slice(&[c[0], c[1], c[2], 255]);
            }
        }
        LandMask::from_rgba(w, h, rgba).unwrap()
    }

    #[test]
    fn test_land_color_heuristic() {
        assert!(is_land_color(LAND));
        assert!(!is_land_color(OCEAN));
        // Margins are strict
        assert!(!is_land_color([110, 105, 100]));
        assert!(is_land_color([111, 106, 100]));
        // White clouds read as ocean
        assert!(!is_land_color([250, 250, 250]));
    }

    #[test]
    fn test_mask_rejects_bad_buffers() {
        assert_eq!(LandMask::from_rgba(0, 4, vec![]).unwrap_err(), MaskError::Empty);
        assert_eq!(
            LandMask::from_rgba(2, 2, vec![0; 15]).unwrap_err(),
            MaskError::SizeMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_pixel_mapping_clamps() {
        let mask = half_land_mask();
        assert_eq!(mask.pixel_for(90.0, -180.0), (0, 0));
        assert_eq!(mask.pixel_for(-90.0, 180.0), (63, 31));
        assert_eq!(mask.pixel_for(0.0, 0.0), (32, 16));
    }

    #[test]
    fn test_half_land_dots_in_west() {
        let mask = half_land_mask();
        let mut rng = Pcg32::seed_from_u64(7);
        let dots = sample_land_dots(&mask, &mut rng, 500, 10, 5.0);
        assert_eq!(dots.len(), 500);
        assert!(dots.as_slice().iter().all(|d| d.lon < 0.0));
    }

    #[test]
    fn test_all_ocean_terminates_at_budget() {
        let mask = LandMask::solid(16, 8, OCEAN).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        let dots = sample_land_dots(&mask, &mut rng, 1000, 10, 5.0);
        assert!(dots.is_empty());
        assert_eq!(dots.attempts, 10_000);
    }

    #[test]
    fn test_latitudes_are_equal_area() {
        // With uniform-area sampling about half of all samples land within
        // +-30 degrees latitude (sin 30 = 0.5)
        let mut rng = Pcg32::seed_from_u64(42);
        let n = 20_000;
        let tropical = (0..n)
            .filter(|_| random_surface_lat_lon(&mut rng).0.abs() < 30.0)
            .count();
        let frac = tropical as f32 / n as f32;
        assert!((frac - 0.5).abs() < 0.02, "fraction {frac}");
    }

    proptest! {
        #[test]
        fn prop_dots_on_surface(seed in any::<u64>(), target in 1usize..400) {
            let mask = half_land_mask();
            let mut rng = Pcg32::seed_from_u64(seed);
            let radius = 5.001;
            let dots = sample_land_dots(&mask, &mut rng, target, 10, radius);

            prop_assert!(dots.len() <= target);
            prop_assert!(dots.attempts <= target * 10);
            for d in dots.as_slice() {
                prop_assert!((-90.0..=90.0).contains(&d.lat));
                prop_assert!((-180.0..180.0).contains(&d.lon));
                prop_assert!((d.position.length() - radius).abs() < 1e-3);
            }
        }
    }
}
