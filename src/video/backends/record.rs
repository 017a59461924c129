//! A backend that records every native call it receives.
//!
//! Nothing is drawn. The command log tells exactly which native calls the state
//! cache decided to emit, and CPU shadows of buffer contents tell what a shader
//! would have read. Creation can be made to fail on demand.

use std::collections::HashMap;

use super::super::assets::prelude::*;
use super::Backend;

use crate::errors::*;

/// One native call, with native names in place of the bound values.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    CreateBuffer(NativeHandle),
    DeleteBuffer(NativeHandle),
    MapBuffer(NativeHandle, MapMode),
    WriteMapped {
        buffer: NativeHandle,
        offset: usize,
        len: usize,
    },
    UnmapBuffer(NativeHandle),
    CreateTexture(TextureViews),
    DeleteTexture(TextureViews),
    CreateSampler(NativeHandle),
    DeleteSampler(NativeHandle),
    CreateShader(ShaderStage, NativeHandle),
    DeleteShader(NativeHandle),
    CreateInputLayout(NativeHandle),
    DeleteInputLayout(NativeHandle),
    CreateState(NativeHandle),
    DeleteState(NativeHandle),
    CreateQuery(QueryKind, NativeHandle),
    DeleteQuery(NativeHandle),
    BeginQuery(NativeHandle),
    EndQuery(NativeHandle),
    QueryResult(NativeHandle),

    BindVertexBuffers {
        start: usize,
        buffers: Vec<Option<NativeHandle>>,
        strides: Vec<u32>,
        offsets: Vec<u32>,
    },
    BindIndexBuffer(Option<(NativeHandle, IndexFormat, u32)>),
    BindConstantBuffers {
        stage: ShaderStage,
        start: usize,
        buffers: Vec<Option<NativeHandle>>,
    },
    BindShaderResources {
        stage: ShaderStage,
        start: usize,
        views: Vec<Option<NativeHandle>>,
    },
    BindSamplers {
        stage: ShaderStage,
        start: usize,
        samplers: Vec<Option<NativeHandle>>,
    },
    BindRenderTargets {
        targets: Vec<Option<NativeHandle>>,
        depth_stencil: Option<NativeHandle>,
    },
    BindInputLayout(Option<NativeHandle>),
    BindShader(ShaderStage, Option<NativeHandle>),
    BindRasterState(Option<NativeHandle>),
    BindDepthStencilState(Option<NativeHandle>),
    BindBlendState(Option<NativeHandle>),
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    SetTopology(PrimitiveTopology),

    ClearRenderTarget(NativeHandle, [f32; 4]),
    ClearDepthStencil(NativeHandle, f32),
    Draw {
        vertices: u32,
        start_vertex: u32,
        instances: u32,
    },
    DrawIndexed {
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    },
}

impl NativeCall {
    /// Returns true for calls that change pipeline bindings or state.
    pub fn is_state_change(&self) -> bool {
        match *self {
            NativeCall::BindVertexBuffers { .. }
            | NativeCall::BindIndexBuffer(_)
            | NativeCall::BindConstantBuffers { .. }
            | NativeCall::BindShaderResources { .. }
            | NativeCall::BindSamplers { .. }
            | NativeCall::BindRenderTargets { .. }
            | NativeCall::BindInputLayout(_)
            | NativeCall::BindShader(_, _)
            | NativeCall::BindRasterState(_)
            | NativeCall::BindDepthStencilState(_)
            | NativeCall::BindBlendState(_)
            | NativeCall::SetViewport(_)
            | NativeCall::SetScissor(_)
            | NativeCall::SetTopology(_) => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_draw(&self) -> bool {
        match *self {
            NativeCall::Draw { .. } | NativeCall::DrawIndexed { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct ShadowBuffer {
    bytes: Vec<u8>,
    mapped: bool,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<NativeCall>,
    buffers: HashMap<NativeHandle, ShadowBuffer>,
    queries: HashMap<NativeHandle, QueryState>,
    query_result: Option<u64>,
    next: u64,
    fail_creation: bool,
}

fn natives(values: &[Option<Bound>]) -> Vec<Option<NativeHandle>> {
    values.iter().map(|v| v.map(|v| v.native)).collect()
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend::default()
    }

    /// Every call received so far, oldest first.
    #[inline]
    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    /// Drains the command log.
    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        ::std::mem::replace(&mut self.calls, Vec::new())
    }

    /// Number of state-changing calls received so far.
    pub fn state_changes(&self) -> usize {
        self.calls.iter().filter(|v| v.is_state_change()).count()
    }

    /// CPU shadow of the contents of `buffer`.
    pub fn buffer_contents(&self, buffer: NativeHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|v| &v.bytes[..])
    }

    /// The value every ended query reports from now on. `None`, the default,
    /// keeps them pending.
    pub fn set_query_result(&mut self, result: Option<u64>) {
        self.query_result = result;
    }

    /// Makes every following `create_*` call fail.
    pub fn set_fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    fn record(&mut self, call: NativeCall) {
        trace!("[REC] {:?}", call);
        self.calls.push(call);
    }

    fn alloc(&mut self) -> Result<NativeHandle> {
        if self.fail_creation {
            bail!("[REC] Native object creation failed on demand.");
        }

        self.next += 1;
        Ok(NativeHandle(self.next))
    }

    fn query(&mut self, query: NativeHandle) -> Result<&mut QueryState> {
        self.queries
            .get_mut(&query)
            .ok_or_else(|| format_err!("[REC] Query {} does not exist.", query))
    }

    fn shadow(&mut self, buffer: NativeHandle) -> Result<&mut ShadowBuffer> {
        self.buffers
            .get_mut(&buffer)
            .ok_or_else(|| format_err!("[REC] Buffer {} does not exist.", buffer))
    }
}

impl Backend for RecordingBackend {
    unsafe fn create_buffer(
        &mut self,
        params: &BufferParams,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle> {
        let native = self.alloc()?;
        let mut bytes = vec![0; params.size];
        if let Some(data) = data {
            let len = data.len().min(bytes.len());
            bytes[..len].copy_from_slice(&data[..len]);
        }

        self.buffers.insert(
            native,
            ShadowBuffer {
                bytes,
                mapped: false,
            },
        );

        self.record(NativeCall::CreateBuffer(native));
        Ok(native)
    }

    unsafe fn delete_buffer(&mut self, buffer: NativeHandle) -> Result<()> {
        if self.shadow(buffer)?.mapped {
            bail!("[REC] Buffer {} is deleted while mapped.", buffer);
        }

        self.buffers.remove(&buffer);
        self.record(NativeCall::DeleteBuffer(buffer));
        Ok(())
    }

    unsafe fn map_buffer(&mut self, buffer: NativeHandle, mode: MapMode) -> Result<()> {
        let shadow = self.shadow(buffer)?;
        if shadow.mapped {
            bail!("[REC] Buffer {} is mapped twice.", buffer);
        }

        shadow.mapped = true;
        if mode == MapMode::WriteDiscard {
            shadow.bytes.iter_mut().for_each(|v| *v = 0);
        }

        self.record(NativeCall::MapBuffer(buffer, mode));
        Ok(())
    }

    unsafe fn write_mapped(
        &mut self,
        buffer: NativeHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        let shadow = self.shadow(buffer)?;
        if !shadow.mapped {
            bail!("[REC] Buffer {} is written while unmapped.", buffer);
        }

        let end = match offset.checked_add(bytes.len()) {
            Some(end) if end <= shadow.bytes.len() => end,
            _ => bail!(
                "[REC] Writing {} bytes at {} overflows buffer {}.",
                bytes.len(),
                offset,
                buffer
            ),
        };

        shadow.bytes[offset..end].copy_from_slice(bytes);
        self.record(NativeCall::WriteMapped {
            buffer,
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    unsafe fn unmap_buffer(&mut self, buffer: NativeHandle) -> Result<()> {
        let shadow = self.shadow(buffer)?;
        if !shadow.mapped {
            bail!("[REC] Buffer {} is not mapped.", buffer);
        }

        shadow.mapped = false;
        self.record(NativeCall::UnmapBuffer(buffer));
        Ok(())
    }

    unsafe fn create_texture(
        &mut self,
        params: &TextureParams,
        _: Option<&[u8]>,
    ) -> Result<TextureViews> {
        let mut views = TextureViews::default();
        if params.usage.shader_resource {
            views.shader_resource = Some(self.alloc()?);
        }

        if params.usage.render_target {
            views.render_target = Some(self.alloc()?);
        }

        if params.usage.depth_stencil {
            views.depth_stencil = Some(self.alloc()?);
        }

        self.record(NativeCall::CreateTexture(views));
        Ok(views)
    }

    unsafe fn delete_texture(&mut self, views: TextureViews) -> Result<()> {
        self.record(NativeCall::DeleteTexture(views));
        Ok(())
    }

    unsafe fn create_sampler(&mut self, _: &SamplerParams) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.record(NativeCall::CreateSampler(native));
        Ok(native)
    }

    unsafe fn delete_sampler(&mut self, sampler: NativeHandle) -> Result<()> {
        self.record(NativeCall::DeleteSampler(sampler));
        Ok(())
    }

    unsafe fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<NativeHandle> {
        if source.is_empty() {
            bail!("[REC] Empty {:?} shader source.", stage);
        }

        let native = self.alloc()?;
        self.record(NativeCall::CreateShader(stage, native));
        Ok(native)
    }

    unsafe fn delete_shader(&mut self, shader: NativeHandle) -> Result<()> {
        self.record(NativeCall::DeleteShader(shader));
        Ok(())
    }

    unsafe fn create_input_layout(&mut self, _: &InputLayoutParams) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.record(NativeCall::CreateInputLayout(native));
        Ok(native)
    }

    unsafe fn delete_input_layout(&mut self, layout: NativeHandle) -> Result<()> {
        self.record(NativeCall::DeleteInputLayout(layout));
        Ok(())
    }

    unsafe fn create_raster_state(&mut self, _: &RasterDesc) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.record(NativeCall::CreateState(native));
        Ok(native)
    }

    unsafe fn create_depth_stencil_state(&mut self, _: &DepthStencilDesc) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.record(NativeCall::CreateState(native));
        Ok(native)
    }

    unsafe fn create_blend_state(&mut self, _: &BlendDesc) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.record(NativeCall::CreateState(native));
        Ok(native)
    }

    unsafe fn delete_state(&mut self, state: NativeHandle) -> Result<()> {
        self.record(NativeCall::DeleteState(state));
        Ok(())
    }

    unsafe fn bind_vertex_buffers(&mut self, start: usize, buffers: &[VertexBufferBinding]) {
        self.record(NativeCall::BindVertexBuffers {
            start,
            buffers: buffers.iter().map(|v| v.buffer.map(|b| b.native)).collect(),
            strides: buffers.iter().map(|v| v.stride).collect(),
            offsets: buffers.iter().map(|v| v.offset).collect(),
        });
    }

    unsafe fn bind_index_buffer(&mut self, buffer: Option<&IndexBufferBinding>) {
        let v = buffer.map(|v| (v.buffer.native, v.format, v.offset));
        self.record(NativeCall::BindIndexBuffer(v));
    }

    unsafe fn bind_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start: usize,
        buffers: &[Option<Bound>],
    ) {
        self.record(NativeCall::BindConstantBuffers {
            stage,
            start,
            buffers: natives(buffers),
        });
    }

    unsafe fn bind_shader_resources(
        &mut self,
        stage: ShaderStage,
        start: usize,
        views: &[Option<Bound>],
    ) {
        self.record(NativeCall::BindShaderResources {
            stage,
            start,
            views: natives(views),
        });
    }

    unsafe fn bind_samplers(&mut self, stage: ShaderStage, start: usize, samplers: &[Option<Bound>]) {
        self.record(NativeCall::BindSamplers {
            stage,
            start,
            samplers: natives(samplers),
        });
    }

    unsafe fn bind_render_targets(&mut self, targets: &[Option<Bound>], depth_stencil: Option<Bound>) {
        self.record(NativeCall::BindRenderTargets {
            targets: natives(targets),
            depth_stencil: depth_stencil.map(|v| v.native),
        });
    }

    unsafe fn bind_input_layout(&mut self, layout: Option<Bound>) {
        self.record(NativeCall::BindInputLayout(layout.map(|v| v.native)));
    }

    unsafe fn bind_shader(&mut self, stage: ShaderStage, shader: Option<Bound>) {
        self.record(NativeCall::BindShader(stage, shader.map(|v| v.native)));
    }

    unsafe fn bind_raster_state(&mut self, state: Option<Bound>) {
        self.record(NativeCall::BindRasterState(state.map(|v| v.native)));
    }

    unsafe fn bind_depth_stencil_state(&mut self, state: Option<Bound>) {
        self.record(NativeCall::BindDepthStencilState(state.map(|v| v.native)));
    }

    unsafe fn bind_blend_state(&mut self, state: Option<Bound>) {
        self.record(NativeCall::BindBlendState(state.map(|v| v.native)));
    }

    unsafe fn set_viewport(&mut self, viewport: Viewport) {
        self.record(NativeCall::SetViewport(viewport));
    }

    unsafe fn set_scissor(&mut self, scissor: ScissorRect) {
        self.record(NativeCall::SetScissor(scissor));
    }

    unsafe fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.record(NativeCall::SetTopology(topology));
    }

    unsafe fn clear_render_target(&mut self, target: Bound, color: [f32; 4]) -> Result<()> {
        self.record(NativeCall::ClearRenderTarget(target.native, color));
        Ok(())
    }

    unsafe fn clear_depth_stencil(&mut self, target: Bound, depth: f32) -> Result<()> {
        self.record(NativeCall::ClearDepthStencil(target.native, depth));
        Ok(())
    }

    unsafe fn create_query(&mut self, kind: QueryKind) -> Result<NativeHandle> {
        let native = self.alloc()?;
        self.queries.insert(native, QueryState::Idle);
        self.record(NativeCall::CreateQuery(kind, native));
        Ok(native)
    }

    unsafe fn delete_query(&mut self, query: NativeHandle) -> Result<()> {
        if *self.query(query)? == QueryState::Active {
            bail!("[REC] Query {} is deleted while active.", query);
        }

        self.queries.remove(&query);
        self.record(NativeCall::DeleteQuery(query));
        Ok(())
    }

    unsafe fn begin_query(&mut self, query: NativeHandle, _: QueryKind) -> Result<()> {
        let state = self.query(query)?;
        if *state == QueryState::Active {
            bail!("[REC] Query {} is already active.", query);
        }

        *state = QueryState::Active;
        self.record(NativeCall::BeginQuery(query));
        Ok(())
    }

    unsafe fn end_query(&mut self, query: NativeHandle, _: QueryKind) -> Result<()> {
        let state = self.query(query)?;
        if *state != QueryState::Active {
            bail!("[REC] Query {} is not active.", query);
        }

        *state = QueryState::Ended;
        self.record(NativeCall::EndQuery(query));
        Ok(())
    }

    unsafe fn query_result(&mut self, query: NativeHandle) -> Result<Option<u64>> {
        if *self.query(query)? != QueryState::Ended {
            bail!("[REC] Query {} has not ended.", query);
        }

        self.record(NativeCall::QueryResult(query));
        Ok(self.query_result)
    }

    unsafe fn draw(&mut self, vertices: u32, start_vertex: u32, instances: u32) -> Result<()> {
        self.record(NativeCall::Draw {
            vertices,
            start_vertex,
            instances,
        });
        Ok(())
    }

    unsafe fn draw_indexed(
        &mut self,
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    ) -> Result<()> {
        self.record(NativeCall::DrawIndexed {
            indices,
            start_index,
            base_vertex,
            instances,
        });
        Ok(())
    }
}
