//! Geometry generation for the globe scene

use std::f32::consts::{PI, TAU};

use super::vertex::{ColorVertex, MarkerInstance, MeshVertex, colors};
use crate::consts::{ENDPOINT_RADIUS, SPARK_RADIUS};
use crate::sim::{Arc, LandDots};
use crate::srgb_to_linear;

/// Indexed mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

/// Latitude/longitude sphere centered on the origin.
///
/// Rings run from the north pole (+Y) down; the pole rows emit a single
/// triangle per quad. Front faces wind counter-clockwise seen from outside.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        let theta = v * PI;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let phi = u * TAU;
            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(MeshVertex {
                position: normal.map(|c| c * radius),
                normal,
            });
        }
    }

    let row = ws + 1;
    let mut indices = Vec::with_capacity((6 * ws * (hs - 1)) as usize);
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Mesh { vertices, indices }
}

/// Point-list vertices for the land dots
pub fn land_dot_vertices(dots: &LandDots) -> Vec<ColorVertex> {
    let color = srgb_to_linear(colors::LAND_DOT);
    dots.positions()
        .map(|p| ColorVertex::new(p.to_array(), color))
        .collect()
}

/// Line-strip vertices for an arc with its gradient
pub fn arc_line_vertices(arc: &Arc) -> Vec<ColorVertex> {
    arc.points
        .iter()
        .enumerate()
        .map(|(i, p)| ColorVertex::new(p.to_array(), arc.colors.at(i as u32, arc.segments)))
        .collect()
}

/// Spark plus both endpoint markers for every arc
pub fn marker_instances(arcs: &[Arc]) -> Vec<MarkerInstance> {
    let white = srgb_to_linear(colors::SPARK);
    let mut instances = Vec::with_capacity(arcs.len() * 3);
    for arc in arcs {
        instances.push(MarkerInstance {
            offset: arc.spark.to_array(),
            scale: SPARK_RADIUS,
            color: white,
        });
        for endpoint in [arc.start(), arc.end()] {
            instances.push(MarkerInstance {
                offset: endpoint.to_array(),
                scale: ENDPOINT_RADIUS,
                color: white,
            });
        }
    }
    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::{GlobeState, LandMask};

    #[test]
    fn test_sphere_counts() {
        let mesh = uv_sphere(5.0, 64, 64);
        assert_eq!(mesh.vertices.len(), 65 * 65);
        assert_eq!(mesh.indices.len(), 6 * 64 * 63);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = uv_sphere(2.0, 16, 8);
        for v in &mesh.vertices {
            let p = glam::Vec3::from_array(v.position);
            let n = glam::Vec3::from_array(v.normal);
            assert!((p.length() - 2.0).abs() < 1e-5);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((p / 2.0 - n).length() < 1e-5);
        }
        // North pole first
        assert!((mesh.vertices[0].position[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_faces_outward() {
        let mesh = uv_sphere(1.0, 12, 6);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| glam::Vec3::from_array(mesh.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn test_markers_three_per_arc() {
        let mut state = GlobeState::new(3, &Settings::default());
        state.spawn_arc(0.0, 0.0, 20.0, 40.0);
        state.spawn_arc(-10.0, 100.0, 50.0, -60.0);
        let markers = marker_instances(&state.arcs);
        assert_eq!(markers.len(), 6);
        assert_eq!(markers[0].scale, SPARK_RADIUS);
        assert_eq!(markers[1].offset, state.arcs[0].start().to_array());
        assert_eq!(markers[2].offset, state.arcs[0].end().to_array());
    }

    #[test]
    fn test_arc_line_gradient() {
        let mut state = GlobeState::new(5, &Settings::default());
        state.spawn_arc(0.0, 0.0, 0.0, 90.0);
        let arc = &state.arcs[0];
        let verts = arc_line_vertices(arc);
        assert_eq!(verts.len(), arc.segments as usize + 1);
        assert_eq!(verts[0].color, arc.colors.start);
        let last = verts[arc.segments as usize].color;
        for (got, want) in last.iter().zip(arc.colors.end) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_land_dot_vertices() {
        let mask = LandMask::solid(8, 4, [200, 150, 50]).unwrap();
        let settings = Settings {
            target_dots: 50,
            ..Settings::default()
        };
        let mut state = GlobeState::new(9, &settings);
        let count = state.place_land_dots(&mask).len();
        let dots = state.land_dots.as_ref().unwrap();
        assert_eq!(land_dot_vertices(dots).len(), count);
    }
}
