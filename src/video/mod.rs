//! A stateless-looking rendering context over a stateful native API.
//!
//! Everything bound on the native context is mirrored in a `ContextStateCache`
//! (see the `cache` module). The `Context` owns the cache, the backend it drives
//! and a registry of every created resource, and turns `DrawCall`s into the
//! minimal sequence of native binds followed by one native draw.

pub mod assets;
pub mod backends;
pub mod cache;
pub mod context;
pub mod errors;
pub mod settings;

/// Vertex-buffer slots.
pub const MAX_VERTEX_BUFFERS: usize = 8;
/// Constant-buffer slots per shader stage.
pub const MAX_CONSTANT_BUFFERS: usize = 8;
/// Shader-resource slots per shader stage.
pub const MAX_SHADER_RESOURCES: usize = 8;
/// Sampler slots per shader stage.
pub const MAX_SAMPLERS: usize = 8;
/// Render-target slots, not counting the depth-stencil target.
pub const MAX_RENDER_TARGETS: usize = 8;
/// Number of programmable stages with their own binding tables.
pub const NUM_STAGES: usize = 2;

/// Constant-buffer slot the implicit uniform buffer of a stage is bound to.
pub const GLOBAL_UNIFORMS_SLOT: usize = 0;

pub mod prelude {
    pub use super::assets::prelude::*;
    pub use super::backends::headless::HeadlessBackend;
    pub use super::backends::record::{NativeCall, RecordingBackend};
    pub use super::backends::Backend;
    pub use super::cache::ContextStateCache;
    pub use super::context::{Context, FrameStatistics};
    pub use super::settings::ContextParams;
}
