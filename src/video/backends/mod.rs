//! The backend of the context, which should be responsible for only one thing:
//! emitting native calls.
//!
//! Every decision (what changed, which slots to coalesce, which reads to unbind
//! first) is made once in the state cache; a backend only translates the final
//! calls. The binding leaves can not fail: invalid native state is reported by
//! the next call that returns a `Result`, typically the draw.
//!
//! A second native API plugs in by implementing `Backend` for its device
//! context; `NativeHandle` is wide enough to carry pointers of a COM-style API.

pub mod headless;
pub mod record;

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

use super::assets::prelude::*;

use crate::errors::*;

/// The native-call leaves of one context.
///
/// # Safety
///
/// All methods are unsafe since they drive a native context: implementors may
/// require that context to be current on the calling thread.
pub trait Backend {
    unsafe fn create_buffer(
        &mut self,
        params: &BufferParams,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle>;

    unsafe fn delete_buffer(&mut self, buffer: NativeHandle) -> Result<()>;

    /// Makes `buffer` writable by the CPU. Might block, unless `mode` is
    /// `WriteDiscard` or `WriteNoOverwrite` on a well-behaved driver.
    unsafe fn map_buffer(&mut self, buffer: NativeHandle, mode: MapMode) -> Result<()>;

    /// Copies `bytes` into the mapped `buffer` at byte `offset`.
    unsafe fn write_mapped(
        &mut self,
        buffer: NativeHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()>;

    unsafe fn unmap_buffer(&mut self, buffer: NativeHandle) -> Result<()>;

    unsafe fn create_texture(
        &mut self,
        params: &TextureParams,
        data: Option<&[u8]>,
    ) -> Result<TextureViews>;

    unsafe fn delete_texture(&mut self, views: TextureViews) -> Result<()>;

    unsafe fn create_sampler(&mut self, params: &SamplerParams) -> Result<NativeHandle>;

    unsafe fn delete_sampler(&mut self, sampler: NativeHandle) -> Result<()>;

    unsafe fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<NativeHandle>;

    unsafe fn delete_shader(&mut self, shader: NativeHandle) -> Result<()>;

    unsafe fn create_input_layout(&mut self, params: &InputLayoutParams) -> Result<NativeHandle>;

    unsafe fn delete_input_layout(&mut self, layout: NativeHandle) -> Result<()>;

    unsafe fn create_raster_state(&mut self, desc: &RasterDesc) -> Result<NativeHandle>;

    unsafe fn create_depth_stencil_state(&mut self, desc: &DepthStencilDesc)
        -> Result<NativeHandle>;

    unsafe fn create_blend_state(&mut self, desc: &BlendDesc) -> Result<NativeHandle>;

    /// Releases a rasterizer, depth-stencil or blend state object.
    unsafe fn delete_state(&mut self, state: NativeHandle) -> Result<()>;

    /// Binds `buffers` to the vertex-buffer slots `[start, start + buffers.len())`.
    unsafe fn bind_vertex_buffers(&mut self, start: usize, buffers: &[VertexBufferBinding]);

    unsafe fn bind_index_buffer(&mut self, buffer: Option<&IndexBufferBinding>);

    unsafe fn bind_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start: usize,
        buffers: &[Option<Bound>],
    );

    unsafe fn bind_shader_resources(
        &mut self,
        stage: ShaderStage,
        start: usize,
        views: &[Option<Bound>],
    );

    unsafe fn bind_samplers(&mut self, stage: ShaderStage, start: usize, samplers: &[Option<Bound>]);

    /// Replaces the whole output-merger binding: every render-target slot and
    /// the depth-stencil target.
    unsafe fn bind_render_targets(&mut self, targets: &[Option<Bound>], depth_stencil: Option<Bound>);

    unsafe fn bind_input_layout(&mut self, layout: Option<Bound>);

    unsafe fn bind_shader(&mut self, stage: ShaderStage, shader: Option<Bound>);

    unsafe fn bind_raster_state(&mut self, state: Option<Bound>);

    unsafe fn bind_depth_stencil_state(&mut self, state: Option<Bound>);

    unsafe fn bind_blend_state(&mut self, state: Option<Bound>);

    unsafe fn set_viewport(&mut self, viewport: Viewport);

    unsafe fn set_scissor(&mut self, scissor: ScissorRect);

    unsafe fn set_topology(&mut self, topology: PrimitiveTopology);

    unsafe fn clear_render_target(&mut self, target: Bound, color: [f32; 4]) -> Result<()>;

    unsafe fn clear_depth_stencil(&mut self, target: Bound, depth: f32) -> Result<()>;

    unsafe fn create_query(&mut self, kind: QueryKind) -> Result<NativeHandle>;

    unsafe fn delete_query(&mut self, query: NativeHandle) -> Result<()>;

    unsafe fn begin_query(&mut self, query: NativeHandle, kind: QueryKind) -> Result<()>;

    unsafe fn end_query(&mut self, query: NativeHandle, kind: QueryKind) -> Result<()>;

    /// The result of an ended query, or `None` while it is not available yet.
    /// Never blocks.
    unsafe fn query_result(&mut self, query: NativeHandle) -> Result<Option<u64>>;

    unsafe fn draw(&mut self, vertices: u32, start_vertex: u32, instances: u32) -> Result<()>;

    unsafe fn draw_indexed(
        &mut self,
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    ) -> Result<()>;
}
