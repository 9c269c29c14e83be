//! Arcglobe - decorative landmass globe for the web
//!
//! Core modules:
//! - `sim`: Land dot sampling, arc lifecycle and spawn scheduling (pure, seeded)
//! - `camera`: Auto-rotating orbit camera
//! - `renderer`: WebGPU rendering pipeline
//! - `platform`: Frame clock and browser event plumbing
//! - `widgets`: Counter animation and logo carousel
//! - `settings`: Tunable constants and quality presets

pub mod camera;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod widgets;

pub use camera::OrbitCamera;
pub use settings::{QualityPreset, Settings};

use glam::Vec3;

/// Globe configuration constants
pub mod consts {
    /// Globe sphere radius (world units)
    pub const RADIUS: f32 = 5.0;
    /// Land dots lift slightly off the surface to avoid z-fighting
    pub const DOT_LIFT: f32 = 0.001;
    /// Arc endpoints sit a bit higher than the dots
    pub const ARC_LIFT: f32 = 0.02;
    /// Control point distance as a multiple of the radius (1.2 = low, 2.0 = tall)
    pub const ARC_HEIGHT: f32 = 1.6;

    /// Target number of land dots
    pub const TARGET_DOTS: usize = 10_000;
    /// Sampling attempts allowed per target dot
    pub const ATTEMPTS_PER_DOT: usize = 10;

    /// Line segments per arc path
    pub const ARC_SEGMENTS: u32 = 128;
    /// Grow/erase speed in path segments per second
    pub const ARC_SEGMENT_RATE: f32 = 100.0;
    /// Seconds an arc stays fully drawn before erasing
    pub const ARC_DWELL_SECS: f32 = 0.5;
    /// Milliseconds between arc spawns while the page is visible
    pub const ARC_SPAWN_INTERVAL_MS: f64 = 500.0;

    /// Spark marker radius
    pub const SPARK_RADIUS: f32 = 0.06;
    /// Endpoint marker radius
    pub const ENDPOINT_RADIUS: f32 = 0.05;

    /// Camera defaults
    pub const CAMERA_FOV_DEG: f32 = 50.0;
    pub const CAMERA_NEAR: f32 = 0.1;
    pub const CAMERA_FAR: f32 = 1000.0;
    pub const CAMERA_DISTANCE: f32 = 15.0;
    pub const AUTO_ROTATE_SPEED: f32 = 3.0;

    /// Globe material
    pub const GLOBE_COLOR: u32 = 0x1a73e8;
    pub const GLOBE_OPACITY: f32 = 0.9;
    pub const GLOBE_SHININESS: f32 = 5.0;
    pub const AMBIENT_INTENSITY: f32 = 0.25;
    pub const LIGHT_INTENSITY: f32 = 0.35;
    pub const LIGHT_POSITION: [f32; 3] = [5.0, 3.0, 2.0];

    /// Default equirectangular land/ocean texture
    pub const LAND_MAP_URL: &str =
        "https://threejs.org/examples/textures/land_ocean_ice_cloud_2048.jpg";
}

/// Wrap a longitude in degrees to [-180, 180)
#[inline]
pub fn normalize_longitude(mut lon: f32) -> f32 {
    while lon >= 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

/// Convert latitude/longitude (degrees) to a point on a sphere of radius `r`.
///
/// Longitude -180 maps to -x, 0 to +x, +90 latitude to +y. This matches the
/// orientation of an equirectangular texture wrapped on a default UV sphere.
#[inline]
pub fn lat_lon_to_vec3(lat: f32, lon: f32, r: f32) -> Vec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    Vec3::new(
        -r * phi.sin() * theta.cos(),
        r * phi.cos(),
        r * phi.sin() * theta.sin(),
    )
}

/// Convert a point on the sphere back to (latitude, longitude) in degrees
#[inline]
pub fn vec3_to_lat_lon(p: Vec3) -> (f32, f32) {
    let r = p.length();
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let lat = 90.0 - (p.y / r).clamp(-1.0, 1.0).acos().to_degrees();
    let theta = p.z.atan2(-p.x);
    (lat, normalize_longitude(theta.to_degrees() - 180.0))
}

/// Unpack a 0xRRGGBB color into normalized sRGB components
#[inline]
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// HSL (all components in [0, 1]) to sRGB
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return [l, l, l];
    }
    let high = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let low = 2.0 * l - high;
    let channel = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            low + (high - low) * 6.0 * t
        } else if t < 0.5 {
            high
        } else if t < 2.0 / 3.0 {
            low + (high - low) * 6.0 * (2.0 / 3.0 - t)
        } else {
            low
        }
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// sRGB transfer function inverse, per channel
#[inline]
pub fn srgb_to_linear(c: [f32; 3]) -> [f32; 3] {
    c.map(|v| {
        if v < 0.04045 {
            v * 0.0773993808
        } else {
            (v * 0.9478672986 + 0.0521327014).powf(2.4)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsl_primaries() {
        let close = |a: [f32; 3], b: [f32; 3]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5);
        assert!(close(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
        assert!(close(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
        assert!(close(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), [0.0, 0.0, 1.0]));
        assert!(close(hsl_to_rgb(0.4, 0.0, 0.7), [0.7, 0.7, 0.7]));
    }

    #[test]
    fn test_srgb_to_linear_endpoints() {
        assert_eq!(srgb_to_linear([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        let white = srgb_to_linear([1.0, 1.0, 1.0]);
        assert!(white.iter().all(|v| (v - 1.0).abs() < 1e-5));
        let mid = srgb_to_linear([0.5, 0.5, 0.5])[0];
        assert!((mid - 0.214).abs() < 1e-3);
    }

    #[test]
    fn test_lat_lon_axes() {
        let north = lat_lon_to_vec3(90.0, 0.0, 1.0);
        assert!((north - Vec3::Y).length() < 1e-5);

        let prime = lat_lon_to_vec3(0.0, 0.0, 1.0);
        assert!((prime - Vec3::X).length() < 1e-5);

        let antimeridian = lat_lon_to_vec3(0.0, -180.0, 1.0);
        assert!((antimeridian - Vec3::NEG_X).length() < 1e-5);

        let east = lat_lon_to_vec3(0.0, 90.0, 2.0);
        assert!((east - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_lat_lon_inverse() {
        for &(lat, lon) in &[(10.0, 20.0), (-45.0, -170.0), (60.0, 179.0), (0.0, -90.0)] {
            let (lat2, lon2) = vec3_to_lat_lon(lat_lon_to_vec3(lat, lon, 5.0));
            assert!((lat - lat2).abs() < 1e-3, "lat {lat} -> {lat2}");
            assert!((lon - lon2).abs() < 1e-3, "lon {lon} -> {lon2}");
        }
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(180.0), -180.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
        assert_eq!(normalize_longitude(45.0), 45.0);
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb(0xff0000), [1.0, 0.0, 0.0]);
        let c = hex_to_rgb(0x1a73e8);
        assert!((c[2] - 232.0 / 255.0).abs() < 1e-6);
    }
}
