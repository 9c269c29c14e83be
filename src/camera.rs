//! Orbit camera around the globe
//!
//! Spherical coordinates around a fixed target. Auto-rotates while idle,
//! pointer drags rotate the view. Zoom and pan are disabled.

use glam::{Mat4, Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use crate::consts::*;

/// Keeps the camera off the poles so `look_at` stays well defined
const POLAR_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Angle around the Y axis, 0 looks down -Z from +Z
    pub azimuth: f32,
    /// Angle from +Y
    pub polar: f32,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    pub auto_rotate: bool,
    /// 1.0 is one revolution per minute
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    /// Element height in CSS pixels, drag deltas scale against it
    viewport_height: f32,
    /// Last pointer position while dragging
    drag: Option<Vec2>,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: CAMERA_DISTANCE,
            azimuth: 0.0,
            polar: PI / 2.0,
            fov_y_deg: CAMERA_FOV_DEG,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            aspect,
            auto_rotate: true,
            auto_rotate_speed: AUTO_ROTATE_SPEED,
            rotate_speed: 1.0,
            viewport_height: 1.0,
            drag: None,
        }
    }

    /// Track the canvas layout size (CSS pixels)
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        let width = width.max(1.0);
        let height = height.max(1.0);
        self.aspect = width / height;
        self.viewport_height = height;
    }

    pub fn pointer_down(&mut self, pos: Vec2) {
        self.drag = Some(pos);
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        let Some(last) = self.drag else {
            return;
        };
        let delta = pos - last;
        let per_pixel = TAU * self.rotate_speed / self.viewport_height;
        self.rotate_left(delta.x * per_pixel);
        self.rotate_up(delta.y * per_pixel);
        self.drag = Some(pos);
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Auto-rotation in radians per second
    pub fn auto_rotate_rate(&self) -> f32 {
        TAU / 60.0 * self.auto_rotate_speed
    }

    /// Advance auto-rotation by `dt` seconds (paused while dragging)
    pub fn update(&mut self, dt: f32) {
        if self.auto_rotate && self.drag.is_none() {
            self.rotate_left(self.auto_rotate_rate() * dt.max(0.0));
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.azimuth = (self.azimuth - angle).rem_euclid(TAU);
    }

    fn rotate_up(&mut self, angle: f32) {
        self.polar = (self.polar - angle).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    /// Camera position in world space
    pub fn eye(&self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.target + self.distance * Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Projection with a [0, 1] depth range
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_eye() {
        let cam = OrbitCamera::new(1.5);
        assert!((cam.eye() - Vec3::new(0.0, 0.0, 15.0)).length() < 1e-4);
    }

    #[test]
    fn test_auto_rotate_revolution() {
        // Speed 3 is one revolution every 20 seconds
        let mut cam = OrbitCamera::new(1.0);
        let mut total = 0.0;
        for _ in 0..600 {
            let before = cam.azimuth;
            cam.update(1.0 / 60.0);
            total += (before - cam.azimuth).rem_euclid(TAU);
        }
        assert!((total - PI).abs() < 1e-3, "rotated {total}");
    }

    #[test]
    fn test_drag_pauses_auto_rotate() {
        let mut cam = OrbitCamera::new(1.0);
        cam.pointer_down(Vec2::new(10.0, 10.0));
        cam.update(1.0);
        assert_eq!(cam.azimuth, 0.0);
        cam.pointer_up();
        cam.update(1.0);
        assert!(cam.azimuth != 0.0);
    }

    #[test]
    fn test_drag_rotates_by_viewport_fraction() {
        let mut cam = OrbitCamera::new(1.0);
        cam.set_viewport(800.0, 400.0);
        cam.pointer_down(Vec2::new(100.0, 100.0));
        // A quarter of the height horizontally is a quarter turn
        cam.pointer_move(Vec2::new(200.0, 100.0));
        assert!((cam.azimuth - (TAU - PI / 2.0)).abs() < 1e-4);
        assert!((cam.polar - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_polar_clamped() {
        let mut cam = OrbitCamera::new(1.0);
        cam.set_viewport(100.0, 100.0);
        cam.pointer_down(Vec2::ZERO);
        cam.pointer_move(Vec2::new(0.0, 500.0));
        assert!(cam.polar > 0.0);
        assert!(cam.eye().is_finite());
        // Moves without a press are ignored
        cam.pointer_up();
        let polar = cam.polar;
        cam.pointer_move(Vec2::new(0.0, -500.0));
        assert_eq!(cam.polar, polar);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut cam = OrbitCamera::new(1.0);
        cam.set_viewport(1200.0, 600.0);
        assert_eq!(cam.aspect, 2.0);
        cam.set_viewport(0.0, 0.0);
        assert_eq!(cam.aspect, 1.0);
    }
}
