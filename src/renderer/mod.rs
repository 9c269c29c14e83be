//! WebGPU rendering module
//!
//! Land dots as points, arcs as line strips, sparks and endpoints as
//! instanced spheres, and a translucent lit globe on top.

pub mod pipeline;
pub mod registry;
pub mod shapes;
pub mod vertex;

pub use pipeline::GlobeRenderState;
