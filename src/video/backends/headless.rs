use super::super::assets::prelude::*;
use super::Backend;

use crate::errors::*;

/// A backend that accepts everything and draws nothing. Native names are
/// still unique so bound values stay distinguishable.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        HeadlessBackend { next: 0 }
    }

    fn alloc(&mut self) -> NativeHandle {
        self.next += 1;
        NativeHandle(self.next)
    }
}

impl Backend for HeadlessBackend {
    unsafe fn create_buffer(&mut self, _: &BufferParams, _: Option<&[u8]>) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_buffer(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn map_buffer(&mut self, _: NativeHandle, _: MapMode) -> Result<()> {
        Ok(())
    }

    unsafe fn write_mapped(&mut self, _: NativeHandle, _: usize, _: &[u8]) -> Result<()> {
        Ok(())
    }

    unsafe fn unmap_buffer(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn create_texture(
        &mut self,
        params: &TextureParams,
        _: Option<&[u8]>,
    ) -> Result<TextureViews> {
        let name = self.alloc();
        let usage = params.usage;
        Ok(TextureViews {
            shader_resource: if usage.shader_resource { Some(name) } else { None },
            render_target: if usage.render_target { Some(name) } else { None },
            depth_stencil: if usage.depth_stencil { Some(name) } else { None },
        })
    }

    unsafe fn delete_texture(&mut self, _: TextureViews) -> Result<()> {
        Ok(())
    }

    unsafe fn create_sampler(&mut self, _: &SamplerParams) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_sampler(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn create_shader(&mut self, _: ShaderStage, _: &str) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_shader(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn create_input_layout(&mut self, _: &InputLayoutParams) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_input_layout(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn create_raster_state(&mut self, _: &RasterDesc) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn create_depth_stencil_state(&mut self, _: &DepthStencilDesc) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn create_blend_state(&mut self, _: &BlendDesc) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_state(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn bind_vertex_buffers(&mut self, _: usize, _: &[VertexBufferBinding]) {}

    unsafe fn bind_index_buffer(&mut self, _: Option<&IndexBufferBinding>) {}

    unsafe fn bind_constant_buffers(&mut self, _: ShaderStage, _: usize, _: &[Option<Bound>]) {}

    unsafe fn bind_shader_resources(&mut self, _: ShaderStage, _: usize, _: &[Option<Bound>]) {}

    unsafe fn bind_samplers(&mut self, _: ShaderStage, _: usize, _: &[Option<Bound>]) {}

    unsafe fn bind_render_targets(&mut self, _: &[Option<Bound>], _: Option<Bound>) {}

    unsafe fn bind_input_layout(&mut self, _: Option<Bound>) {}

    unsafe fn bind_shader(&mut self, _: ShaderStage, _: Option<Bound>) {}

    unsafe fn bind_raster_state(&mut self, _: Option<Bound>) {}

    unsafe fn bind_depth_stencil_state(&mut self, _: Option<Bound>) {}

    unsafe fn bind_blend_state(&mut self, _: Option<Bound>) {}

    unsafe fn set_viewport(&mut self, _: Viewport) {}

    unsafe fn set_scissor(&mut self, _: ScissorRect) {}

    unsafe fn set_topology(&mut self, _: PrimitiveTopology) {}

    unsafe fn clear_render_target(&mut self, _: Bound, _: [f32; 4]) -> Result<()> {
        Ok(())
    }

    unsafe fn clear_depth_stencil(&mut self, _: Bound, _: f32) -> Result<()> {
        Ok(())
    }

    unsafe fn create_query(&mut self, _: QueryKind) -> Result<NativeHandle> {
        Ok(self.alloc())
    }

    unsafe fn delete_query(&mut self, _: NativeHandle) -> Result<()> {
        Ok(())
    }

    unsafe fn begin_query(&mut self, _: NativeHandle, _: QueryKind) -> Result<()> {
        Ok(())
    }

    unsafe fn end_query(&mut self, _: NativeHandle, _: QueryKind) -> Result<()> {
        Ok(())
    }

    unsafe fn query_result(&mut self, _: NativeHandle) -> Result<Option<u64>> {
        Ok(Some(0))
    }

    unsafe fn draw(&mut self, _: u32, _: u32, _: u32) -> Result<()> {
        Ok(())
    }

    unsafe fn draw_indexed(&mut self, _: u32, _: u32, _: i32, _: u32) -> Result<()> {
        Ok(())
    }
}
