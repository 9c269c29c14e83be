//! Animated arcs between two points on the globe
//!
//! An arc is a quadratic Bezier from `start` to `end` through a control point
//! lifted above the midpoint. Its lifecycle:
//!
//! ```text
//! Growing --(grow reaches segments)--> Full --(wait > dwell)--> Erasing --(remain = 0)--> removed
//! ```
//!
//! Growth and erasure are measured in path segments, advanced by
//! `segment_rate * dt`, so speed doesn't depend on frame rate.

use glam::Vec3;

use crate::consts::{ARC_HEIGHT, RADIUS};

/// Arc-length lookup resolution
const ARC_LENGTH_DIVISIONS: usize = 200;

/// Curves shorter than this (relative to the start point's distance from the
/// origin, at least 1) are treated as a single point
const DEGENERATE_LENGTH: f32 = 1e-4;

/// Quadratic Bezier curve with an arc-length table for constant-speed travel
#[derive(Debug, Clone)]
pub struct BezierPath {
    pub start: Vec3,
    pub control: Vec3,
    pub end: Vec3,
    /// Cumulative length at `i / ARC_LENGTH_DIVISIONS`
    lengths: Vec<f32>,
}

impl BezierPath {
    pub fn new(start: Vec3, control: Vec3, end: Vec3) -> Self {
        let mut path = Self {
            start,
            control,
            end,
            lengths: Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1),
        };
        let mut total = 0.0;
        let mut prev = start;
        path.lengths.push(0.0);
        for i in 1..=ARC_LENGTH_DIVISIONS {
            let p = path.point(i as f32 / ARC_LENGTH_DIVISIONS as f32);
            total += p.distance(prev);
            path.lengths.push(total);
            prev = p;
        }
        path
    }

    /// Path between two surface points, bulging outward.
    ///
    /// The control point is the chord midpoint pushed out to
    /// `RADIUS * ARC_HEIGHT`. Antipodal endpoints give a zero midpoint, which
    /// is kept as-is and pulls the curve through the center.
    pub fn lifted(start: Vec3, end: Vec3) -> Self {
        let mid = (start + end) * 0.5;
        let control = mid.normalize_or_zero() * RADIUS * ARC_HEIGHT;
        Self::new(start, control, end)
    }

    /// Point at curve parameter `t` in [0, 1]
    #[inline]
    pub fn point(&self, t: f32) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let s = 1.0 - t;
        self.start * (s * s) + self.control * (2.0 * s * t) + self.end * (t * t)
    }

    /// Approximate length of the whole curve
    #[inline]
    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Length is lost in float rounding; arc-length lookups fall back to `t = u`
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.length() <= DEGENERATE_LENGTH * self.start.length().max(1.0)
    }

    /// Map a fraction of arc length `u` to the curve parameter `t`
    pub fn u_to_t(&self, u: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        let total = self.length();
        if self.is_degenerate() {
            return u;
        }
        let target = u * total;
        let last = self.lengths.len() - 1;
        // First index whose cumulative length reaches the target
        let i = self.lengths.partition_point(|&l| l < target).min(last);
        if i == 0 {
            return 0.0;
        }
        let before = self.lengths[i - 1];
        let after = self.lengths[i];
        let span = after - before;
        let frac = if span > 0.0 { (target - before) / span } else { 0.0 };
        ((i - 1) as f32 + frac) / last as f32
    }

    /// Point at arc-length fraction `u`
    #[inline]
    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// `segments + 1` points at uniform parameter steps
    pub fn points(&self, segments: u32) -> Vec<Vec3> {
        let n = segments.max(1);
        (0..=n).map(|i| self.point(i as f32 / n as f32)).collect()
    }
}

/// Unique arc identifier within a session
pub type ArcId = u32;

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcPhase {
    /// Drawing from the start toward the end
    Growing,
    /// Fully drawn, holding for the dwell duration
    Full { wait: f32 },
    /// Disappearing from the start; `erased` segments are gone
    Erasing { erased: f32 },
}

/// What a single update did to the arc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcStep {
    Continue,
    BecameFull,
    StartedErasing,
    /// Nothing left to draw; the owner must drop the arc
    Finished,
}

/// Two-stop vertex gradient in linear RGB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcColors {
    pub start: [f32; 3],
    pub end: [f32; 3],
}

impl ArcColors {
    /// Color of vertex `i` out of `segments + 1`
    pub fn at(&self, i: u32, segments: u32) -> [f32; 3] {
        let t = i as f32 / segments.max(1) as f32;
        [
            self.start[0] + (self.end[0] - self.start[0]) * t,
            self.start[1] + (self.end[1] - self.start[1]) * t,
            self.start[2] + (self.end[2] - self.start[2]) * t,
        ]
    }
}

/// One animated connection
#[derive(Debug, Clone)]
pub struct Arc {
    pub id: ArcId,
    pub path: BezierPath,
    /// Line vertices, `segments + 1` of them
    pub points: Vec<Vec3>,
    pub colors: ArcColors,
    pub segments: u32,
    pub phase: ArcPhase,
    /// Segments drawn so far while growing
    pub grow: f32,
    /// Leading marker; frozen once erasing begins
    pub spark: Vec3,
}

impl Arc {
    pub fn new(id: ArcId, path: BezierPath, colors: ArcColors, segments: u32) -> Self {
        let segments = segments.max(1);
        let points = path.points(segments);
        let spark = path.start;
        Self {
            id,
            path,
            points,
            colors,
            segments,
            phase: ArcPhase::Growing,
            grow: 0.0,
            spark,
        }
    }

    #[inline]
    pub fn start(&self) -> Vec3 {
        self.path.start
    }

    #[inline]
    pub fn end(&self) -> Vec3 {
        self.path.end
    }

    /// Advance by `dt` seconds. At most one phase transition per call.
    pub fn advance(&mut self, dt: f32, segment_rate: f32, dwell: f32) -> ArcStep {
        let dt = dt.max(0.0);
        let full = self.segments as f32;

        match self.phase {
            ArcPhase::Growing => {
                self.grow += segment_rate * dt;
                let step = if self.grow >= full {
                    self.grow = full;
                    self.phase = ArcPhase::Full { wait: 0.0 };
                    ArcStep::BecameFull
                } else {
                    ArcStep::Continue
                };
                self.spark = self.path.point_at(self.grow / full);
                step
            }
            ArcPhase::Full { wait } => {
                let wait = wait + dt;
                self.spark = self.path.point_at(1.0);
                if wait > dwell {
                    self.phase = ArcPhase::Erasing { erased: 0.0 };
                    ArcStep::StartedErasing
                } else {
                    self.phase = ArcPhase::Full { wait };
                    ArcStep::Continue
                }
            }
            ArcPhase::Erasing { erased } => {
                let erased = erased + segment_rate * dt;
                self.phase = ArcPhase::Erasing { erased };
                if self.remaining_segments() == 0 {
                    ArcStep::Finished
                } else {
                    ArcStep::Continue
                }
            }
        }
    }

    /// Whole segments still visible while erasing
    pub fn remaining_segments(&self) -> u32 {
        match self.phase {
            ArcPhase::Erasing { erased } => {
                self.segments.saturating_sub(erased.floor() as u32)
            }
            ArcPhase::Growing => self.grow.floor() as u32,
            ArcPhase::Full { .. } => self.segments,
        }
    }

    /// Visible span in continuous segment units `(from, to)`.
    ///
    /// Growing extends `to` from 0; erasing pulls `from` toward the end while
    /// `to` stays anchored at the destination.
    pub fn visible_span(&self) -> (f32, f32) {
        let full = self.segments as f32;
        match self.phase {
            ArcPhase::Growing => (0.0, self.grow),
            ArcPhase::Full { .. } => (0.0, full),
            ArcPhase::Erasing { erased } => (erased.min(full), full),
        }
    }

    /// Visible length as a fraction of the whole path
    pub fn visible_fraction(&self) -> f32 {
        let (from, to) = self.visible_span();
        (to - from) / self.segments as f32
    }

    /// Vertex range for a line strip over `points`
    pub fn draw_range(&self) -> std::ops::Range<u32> {
        let (first, segments) = match self.phase {
            ArcPhase::Growing => (0, self.grow.floor() as u32),
            ArcPhase::Full { .. } => (0, self.segments),
            ArcPhase::Erasing { .. } => {
                let remain = self.remaining_segments();
                (self.segments - remain, remain)
            }
        };
        if segments == 0 {
            return first..first;
        }
        first..first + segments + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{ARC_DWELL_SECS, ARC_SEGMENT_RATE, ARC_SEGMENTS};
    use crate::lat_lon_to_vec3;

    fn test_arc() -> Arc {
        let start = lat_lon_to_vec3(10.0, -40.0, 5.02);
        let end = lat_lon_to_vec3(35.0, 60.0, 5.02);
        let colors = ArcColors {
            start: [1.0, 0.0, 0.0],
            end: [0.0, 0.0, 1.0],
        };
        Arc::new(1, BezierPath::lifted(start, end), colors, ARC_SEGMENTS)
    }

    fn step(arc: &mut Arc, dt: f32) -> ArcStep {
        arc.advance(dt, ARC_SEGMENT_RATE, ARC_DWELL_SECS)
    }

    #[test]
    fn test_bezier_endpoints_and_lift() {
        let arc = test_arc();
        assert!((arc.path.point(0.0) - arc.start()).length() < 1e-5);
        assert!((arc.path.point(1.0) - arc.end()).length() < 1e-5);
        assert!((arc.path.control.length() - RADIUS * ARC_HEIGHT).abs() < 1e-4);
        // Midpoint bulges above the surface
        assert!(arc.path.point(0.5).length() > 5.02);
        assert_eq!(arc.points.len(), ARC_SEGMENTS as usize + 1);
    }

    #[test]
    fn test_arc_length_mapping() {
        let arc = test_arc();
        assert_eq!(arc.path.u_to_t(0.0), 0.0);
        assert!((arc.path.u_to_t(1.0) - 1.0).abs() < 1e-4);
        // Monotonic
        let mut prev = -1.0;
        for i in 0..=50 {
            let t = arc.path.u_to_t(i as f32 / 50.0);
            assert!(t > prev);
            prev = t;
        }
        // Half the arc length lands near the middle of a symmetric curve
        let half = arc.path.point_at(0.5);
        let d_start = arc.start().distance(half);
        let d_end = arc.end().distance(half);
        assert!((d_start - d_end).abs() < 0.05);
    }

    #[test]
    fn test_degenerate_path() {
        let p = lat_lon_to_vec3(0.0, 0.0, 5.0);
        let path = BezierPath::new(p, p, p);
        // Rounding leaves a tiny nonzero length on the surface of the globe
        assert!(path.length() < 1e-3);
        assert!(path.is_degenerate());
        assert_eq!(path.u_to_t(0.3), 0.3);
        assert_eq!(path.u_to_t(1.5), 1.0);
        assert!((path.point_at(0.7) - p).length() < 1e-5);

        let short = BezierPath::lifted(p, lat_lon_to_vec3(0.0, 1.0, 5.0));
        assert!(!short.is_degenerate());
    }

    #[test]
    fn test_growing_strictly_increases_then_full() {
        let mut arc = test_arc();
        let mut prev_end = arc.visible_span().1;
        let mut frames = 0;
        loop {
            let s = step(&mut arc, 1.0 / 60.0);
            frames += 1;
            let end = arc.visible_span().1;
            assert!(end > prev_end, "frame {frames}: {end} <= {prev_end}");
            prev_end = end;
            if s == ArcStep::BecameFull {
                break;
            }
            assert_eq!(arc.phase, ArcPhase::Growing);
            assert!(frames < 1000);
        }
        assert_eq!(prev_end, ARC_SEGMENTS as f32);
        assert!(matches!(arc.phase, ArcPhase::Full { .. }));
        assert!((arc.spark - arc.end()).length() < 1e-3);
        assert_eq!(arc.draw_range(), 0..ARC_SEGMENTS + 1);
    }

    #[test]
    fn test_spark_tracks_leading_point() {
        let mut arc = test_arc();
        step(&mut arc, 0.5); // 50 of 128 segments
        let expected = arc.path.point_at(50.0 / 128.0);
        assert!((arc.spark - expected).length() < 1e-4);
        assert_eq!(arc.draw_range(), 0..51);
    }

    #[test]
    fn test_full_waits_for_dwell() {
        let mut arc = test_arc();
        step(&mut arc, 2.0);
        assert!(matches!(arc.phase, ArcPhase::Full { .. }));

        // Exactly the dwell duration is not enough
        assert_eq!(step(&mut arc, 0.25), ArcStep::Continue);
        assert_eq!(step(&mut arc, 0.25), ArcStep::Continue);
        assert!(matches!(arc.phase, ArcPhase::Full { wait } if wait == 0.5));

        assert_eq!(step(&mut arc, 0.001), ArcStep::StartedErasing);
        assert_eq!(arc.phase, ArcPhase::Erasing { erased: 0.0 });
    }

    #[test]
    fn test_one_transition_per_frame() {
        let mut arc = test_arc();
        // A huge frame only completes growth
        assert_eq!(step(&mut arc, 100.0), ArcStep::BecameFull);
        assert_eq!(arc.phase, ArcPhase::Full { wait: 0.0 });
        assert_eq!(step(&mut arc, 100.0), ArcStep::StartedErasing);
        assert_eq!(arc.phase, ArcPhase::Erasing { erased: 0.0 });
        assert_eq!(step(&mut arc, 100.0), ArcStep::Finished);
    }

    #[test]
    fn test_erasing_shrinks_from_start_and_freezes_spark() {
        let mut arc = test_arc();
        step(&mut arc, 2.0);
        step(&mut arc, 0.6);
        assert!(matches!(arc.phase, ArcPhase::Erasing { .. }));
        let frozen = arc.spark;

        let mut prev_len = arc.visible_fraction();
        let mut finished = false;
        for _ in 0..1000 {
            let s = step(&mut arc, 1.0 / 60.0);
            let (from, to) = arc.visible_span();
            assert_eq!(to, ARC_SEGMENTS as f32);
            assert!(arc.visible_fraction() < prev_len);
            prev_len = arc.visible_fraction();
            assert_eq!(arc.spark, frozen);
            if s == ArcStep::Finished {
                assert_eq!(arc.remaining_segments(), 0);
                assert!(from >= ARC_SEGMENTS as f32);
                finished = true;
                break;
            }
            let range = arc.draw_range();
            assert_eq!(range.end, ARC_SEGMENTS + 1);
        }
        assert!(finished);
        assert!(arc.draw_range().is_empty());
    }

    #[test]
    fn test_color_gradient() {
        let arc = test_arc();
        assert_eq!(arc.colors.at(0, ARC_SEGMENTS), [1.0, 0.0, 0.0]);
        assert_eq!(arc.colors.at(ARC_SEGMENTS, ARC_SEGMENTS), [0.0, 0.0, 1.0]);
        let mid = arc.colors.at(ARC_SEGMENTS / 2, ARC_SEGMENTS);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }
}
