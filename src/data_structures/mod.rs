//! Renderer data model: scene contents and the GPU resources behind them.
//!
//! - `dirty` is the memoization cell behind lazily derived values
//! - `texture` holds sampled textures, resizable attachments and readback
//! - `model` builds meshes with per-triangle tangent space
//! - `shapes` provides unit primitives
//! - `material` describes surfaces and their uniform block
//! - `instance` places meshes in the world
//! - `light` defines light variants and their wire format
//! - `scene` ties instances, materials and lights together

pub mod dirty;
pub mod instance;
pub mod light;
pub mod material;
pub mod model;
pub mod scene;
pub mod shapes;
pub mod texture;
