//! The pipeline state cache.
//!
//! `ContextStateCache` mirrors everything bound on one native context and owns
//! the backend driving it. Each setter diffs the request against the mirror and
//! only talks to the backend if something changed:
//!
//! * Single-slot setters go through `update_if_different` and emit at most one
//!   native call.
//! * Range setters emit one native multi-bind per maximal run of changed slots
//!   (see `coalesce`), fed from the cached table so every run is contiguous.
//! * Render-target binds first force-unbind every shader-resource slot that
//!   reads one of the new targets (see `hazard`).
//! * Destruction notifications clear every slot referencing the destroyed
//!   resource (see `unbind`).
//!
//! The cache also tracks which buffers are mapped. A mapped buffer can not be
//! bound, unbound or destroyed; trying to is reported as `Error::BufferMapped`
//! and leaves both the cache and the native context untouched.
//!
//! The cache is meant for exactly one thread driving one native context.

pub mod coalesce;
pub mod diff;
pub mod hazard;
pub mod slots;
pub mod unbind;

use smallvec::SmallVec;

use self::diff::update_if_different;
use self::slots::{check_unmapped, ContextState};
use super::assets::prelude::*;
use super::backends::Backend;
use super::errors::{Error, Result};
use super::settings::ContextParams;

pub struct ContextStateCache<B: Backend> {
    backend: B,
    state: ContextState,
    mapped: SmallVec<[ResourceId; 4]>,
    warn_on_hazard: bool,
}

impl<B: Backend> ContextStateCache<B> {
    pub fn new(backend: B, params: &ContextParams) -> Self {
        ContextStateCache {
            backend,
            state: ContextState::default(),
            mapped: SmallVec::new(),
            warn_on_hazard: params.warn_on_hazard,
        }
    }

    /// The state as last committed to the native context.
    #[inline]
    pub fn state(&self) -> &ContextState {
        &self.state
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend, for resource creation and inspection.
    /// Binding anything through it behind the cache's back breaks the cache.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn is_mapped(&self, resource: ResourceId) -> bool {
        self.mapped.contains(&resource)
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) -> bool {
        let changed = update_if_different(&mut self.state.topology, Some(topology));
        if changed {
            unsafe { self.backend.set_topology(topology) };
        }

        changed
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        let changed = update_if_different(&mut self.state.viewport, Some(viewport));
        if changed {
            unsafe { self.backend.set_viewport(viewport) };
        }

        changed
    }

    pub fn set_scissor(&mut self, scissor: ScissorRect) -> bool {
        let changed = update_if_different(&mut self.state.scissor, Some(scissor));
        if changed {
            unsafe { self.backend.set_scissor(scissor) };
        }

        changed
    }

    pub fn set_input_layout(&mut self, layout: Option<Bound>) -> bool {
        let changed = update_if_different(&mut self.state.input_layout, layout);
        if changed {
            unsafe { self.backend.bind_input_layout(layout) };
        }

        changed
    }

    pub fn set_shader(&mut self, stage: ShaderStage, shader: Option<Bound>) -> bool {
        let changed = update_if_different(&mut self.state.shaders[stage.index()], shader);
        if changed {
            unsafe { self.backend.bind_shader(stage, shader) };
        }

        changed
    }

    pub fn set_raster_state(&mut self, state: Option<Bound>) -> bool {
        let changed = update_if_different(&mut self.state.raster_state, state);
        if changed {
            unsafe { self.backend.bind_raster_state(state) };
        }

        changed
    }

    pub fn set_depth_stencil_state(&mut self, state: Option<Bound>) -> bool {
        let changed = update_if_different(&mut self.state.depth_stencil_state, state);
        if changed {
            unsafe { self.backend.bind_depth_stencil_state(state) };
        }

        changed
    }

    pub fn set_blend_state(&mut self, state: Option<Bound>) -> bool {
        let changed = update_if_different(&mut self.state.blend_state, state);
        if changed {
            unsafe { self.backend.bind_blend_state(state) };
        }

        changed
    }

    pub fn set_index_buffer(&mut self, buffer: Option<IndexBufferBinding>) -> Result<()> {
        if self.state.index_buffer != buffer {
            let current = self.state.index_buffer.map(|v| v.buffer);
            for v in current.into_iter().chain(buffer.map(|v| v.buffer)) {
                if self.is_mapped(v.resource) {
                    return Err(Error::BufferMapped(v.resource));
                }
            }
        }

        self.commit_index_buffer(buffer);
        Ok(())
    }

    pub fn set_vertex_buffers(&mut self, start: usize, buffers: &[VertexBufferBinding]) -> Result<()> {
        let table = &self.state.vertex_buffers;
        table.check_range(start, buffers.len())?;
        check_unmapped(&self.mapped, table.run(start..start + buffers.len()), buffers)?;

        self.commit_vertex_buffers(start, buffers);
        Ok(())
    }

    pub fn set_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start: usize,
        buffers: &[Option<Bound>],
    ) -> Result<()> {
        let table = &self.state.constant_buffers[stage.index()];
        table.check_range(start, buffers.len())?;
        check_unmapped(&self.mapped, table.run(start..start + buffers.len()), buffers)?;

        self.commit_constant_buffers(stage, start, buffers);
        Ok(())
    }

    pub fn set_samplers(
        &mut self,
        stage: ShaderStage,
        start: usize,
        samplers: &[Option<Bound>],
    ) -> Result<()> {
        self.state.samplers[stage.index()].check_range(start, samplers.len())?;
        self.commit_samplers(stage, start, samplers);
        Ok(())
    }

    /// Maps `buffer` for CPU writes. It can not be bound, unbound or destroyed
    /// until `unmap_buffer`.
    pub fn map_buffer(&mut self, buffer: Bound, mode: MapMode) -> Result<()> {
        if self.is_mapped(buffer.resource) {
            return Err(Error::BufferMapped(buffer.resource));
        }

        unsafe { self.backend.map_buffer(buffer.native, mode)? };
        self.mapped.push(buffer.resource);
        Ok(())
    }

    pub fn write_mapped(&mut self, buffer: Bound, offset: usize, bytes: &[u8]) -> Result<()> {
        if !self.is_mapped(buffer.resource) {
            return Err(Error::BufferNotMapped(buffer.resource));
        }

        unsafe { self.backend.write_mapped(buffer.native, offset, bytes)? };
        Ok(())
    }

    pub fn unmap_buffer(&mut self, buffer: Bound) -> Result<()> {
        let index = self
            .mapped
            .iter()
            .position(|&v| v == buffer.resource)
            .ok_or(Error::BufferNotMapped(buffer.resource))?;

        unsafe { self.backend.unmap_buffer(buffer.native)? };
        self.mapped.remove(index);
        Ok(())
    }

    /// Unbinds everything, leaving the cache as if freshly created. Mapped
    /// buffers are expected to be unmapped first.
    pub fn reset(&mut self) {
        let empty = ContextState::default();

        self.commit_vertex_buffers(0, empty.vertex_buffers.as_slice());
        self.commit_index_buffer(None);
        for &stage in ShaderStage::ALL.iter() {
            let i = stage.index();
            self.commit_constant_buffers(stage, 0, empty.constant_buffers[i].as_slice());
            self.commit_shader_resources(stage, 0, empty.shader_resources[i].as_slice());
            self.commit_samplers(stage, 0, empty.samplers[i].as_slice());
            self.set_shader(stage, None);
        }

        if self.state.render_targets.as_slice() != empty.render_targets.as_slice()
            || self.state.depth_stencil.is_some()
        {
            self.commit_render_targets(empty.render_targets.as_slice(), None);
        }

        self.set_input_layout(None);
        self.set_raster_state(None);
        self.set_depth_stencil_state(None);
        self.set_blend_state(None);

        self.state.viewport = None;
        self.state.scissor = None;
        self.state.topology = None;
        self.mapped.clear();
    }

    fn commit_index_buffer(&mut self, buffer: Option<IndexBufferBinding>) {
        if update_if_different(&mut self.state.index_buffer, buffer) {
            unsafe { self.backend.bind_index_buffer(buffer.as_ref()) };
        }
    }

    fn commit_vertex_buffers(&mut self, start: usize, buffers: &[VertexBufferBinding]) {
        let table = &mut self.state.vertex_buffers;
        for run in table.update_range(start, buffers) {
            unsafe { self.backend.bind_vertex_buffers(run.start, table.run(run)) };
        }
    }

    fn commit_constant_buffers(&mut self, stage: ShaderStage, start: usize, buffers: &[Option<Bound>]) {
        let table = &mut self.state.constant_buffers[stage.index()];
        for run in table.update_range(start, buffers) {
            unsafe {
                self.backend
                    .bind_constant_buffers(stage, run.start, table.run(run))
            };
        }
    }

    fn commit_samplers(&mut self, stage: ShaderStage, start: usize, samplers: &[Option<Bound>]) {
        let table = &mut self.state.samplers[stage.index()];
        for run in table.update_range(start, samplers) {
            unsafe { self.backend.bind_samplers(stage, run.start, table.run(run)) };
        }
    }
}
