//! deferred-ngin
//!
//! A small deferred-shading renderer. Scenes of textured meshes are first
//! rasterized into a G-buffer (world position, normal, albedo, specular,
//! emissive, reflection), then lit in screen space with an unbounded number of
//! lights accumulated in batches, and finally composited, or shown as a debug
//! mosaic of every intermediate target.
//!
//! High-level modules
//! - `camera`: camera model, projection variants and the free-fly controller
//! - `config`: renderer options and their environment overrides
//! - `context`: device, queue and surface setup (windowed or headless)
//! - `data_structures`: meshes, materials, instances, lights and the scene
//! - `error`: the crate's error type
//! - `flow`: windowed host loop driving a user scene
//! - `pipelines`: the passes, their command plans and the binding tracker
//! - `renderer`: frame orchestration
//! - `resources`: loading textures from disk
//! - `shader`: WGSL compile, link and reflection

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod renderer;
pub mod resources;
pub mod shader;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;
