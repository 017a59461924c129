//! Unbind-on-destroy.
//!
//! A resource about to be destroyed is first removed from every slot that can
//! hold it, with the matching native unbind calls. These notifications must run
//! before the native object is released so no unbind ever names a dead object.

use super::ContextStateCache;
use crate::video::assets::holds;
use crate::video::assets::prelude::*;
use crate::video::backends::Backend;
use crate::video::errors::{Error, Result};
use crate::video::MAX_RENDER_TARGETS;

impl<B: Backend> ContextStateCache<B> {
    /// Clears vertex-buffer, index-buffer and constant-buffer slots holding
    /// `buffer`. Fails and changes nothing if the buffer is mapped.
    pub fn on_buffer_destroyed(&mut self, buffer: ResourceId) -> Result<()> {
        if self.is_mapped(buffer) {
            return Err(Error::BufferMapped(buffer));
        }

        if let Some(desired) = self.state.vertex_buffers.without(buffer) {
            self.commit_vertex_buffers(0, &desired);
        }

        if self.state.index_buffer.map(|v| v.buffer.resource) == Some(buffer) {
            self.commit_index_buffer(None);
        }

        for &stage in ShaderStage::ALL.iter() {
            if let Some(desired) = self.state.constant_buffers[stage.index()].without(buffer) {
                self.commit_constant_buffers(stage, 0, &desired);
            }
        }

        Ok(())
    }

    /// Clears shader-resource slots of every stage, render-target slots and the
    /// depth-stencil slot holding any view of `texture`.
    pub fn on_texture_views_destroyed(&mut self, texture: ResourceId) {
        for &stage in ShaderStage::ALL.iter() {
            if let Some(desired) = self.state.shader_resources[stage.index()].without(texture) {
                self.commit_shader_resources(stage, 0, &desired);
            }
        }

        let targets = self.state.render_targets.without(texture);
        if targets.is_some() || holds(&self.state.depth_stencil, texture) {
            let mut desired = [None; MAX_RENDER_TARGETS];
            match targets {
                Some(v) => desired.copy_from_slice(&v),
                None => desired.copy_from_slice(self.state.render_targets.as_slice()),
            }

            let depth_stencil = self.state.depth_stencil.filter(|v| v.resource != texture);
            self.commit_render_targets(&desired, depth_stencil);
        }
    }

    pub fn on_input_layout_destroyed(&mut self, layout: ResourceId) {
        if holds(&self.state.input_layout, layout) {
            self.set_input_layout(None);
        }
    }

    pub fn on_sampler_destroyed(&mut self, sampler: ResourceId) {
        for &stage in ShaderStage::ALL.iter() {
            if let Some(desired) = self.state.samplers[stage.index()].without(sampler) {
                self.commit_samplers(stage, 0, &desired);
            }
        }
    }

    pub fn on_shader_destroyed(&mut self, shader: ResourceId) {
        for &stage in ShaderStage::ALL.iter() {
            if holds(&self.state.shaders[stage.index()], shader) {
                self.set_shader(stage, None);
            }
        }
    }

    /// Clears the rasterizer, depth-stencil or blend state slot holding `state`.
    pub fn on_state_object_destroyed(&mut self, state: ResourceId) {
        if holds(&self.state.raster_state, state) {
            self.set_raster_state(None);
        }

        if holds(&self.state.depth_stencil_state, state) {
            self.set_depth_stencil_state(None);
        }

        if holds(&self.state.blend_state, state) {
            self.set_blend_state(None);
        }
    }
}
