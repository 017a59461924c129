use std::ops::Range;

use super::coalesce::{self, Runs};
use super::diff;
use crate::video::assets::holds;
use crate::video::assets::prelude::*;
use crate::video::errors::{Error, Result};
use crate::video::{
    MAX_CONSTANT_BUFFERS, MAX_RENDER_TARGETS, MAX_SAMPLERS, MAX_SHADER_RESOURCES,
    MAX_VERTEX_BUFFERS, NUM_STAGES,
};

/// A value one slot of a `SlotTable` can hold.
pub trait SlotValue: Clone + Default + PartialEq {
    /// The bound resource, if any.
    fn bound(&self) -> Option<Bound>;
}

impl SlotValue for Option<Bound> {
    #[inline]
    fn bound(&self) -> Option<Bound> {
        *self
    }
}

impl SlotValue for VertexBufferBinding {
    #[inline]
    fn bound(&self) -> Option<Bound> {
        self.buffer
    }
}

/// A fixed-capacity binding table indexed by slot number.
#[derive(Debug, Clone)]
pub struct SlotTable<T: SlotValue> {
    slots: Vec<T>,
}

impl<T: SlotValue> SlotTable<T> {
    pub fn new(capacity: usize) -> Self {
        SlotTable {
            slots: vec![T::default(); capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    #[inline]
    pub fn run(&self, run: Range<usize>) -> &[T] {
        &self.slots[run]
    }

    /// Checks that `[start, start + count)` lies inside the table.
    pub fn check_range(&self, start: usize, count: usize) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= self.slots.len() => Ok(()),
            _ => Err(Error::SlotOutOfRange {
                start,
                count,
                capacity: self.slots.len(),
            }),
        }
    }

    #[inline]
    pub fn update_if_different(&mut self, slot: usize, value: T) -> bool {
        diff::update_if_different(&mut self.slots[slot], value)
    }

    /// Applies `values` from `start` on and returns the runs of changed slots.
    #[inline]
    pub fn update_range(&mut self, start: usize, values: &[T]) -> Runs {
        coalesce::diff_runs(&mut self.slots, start, values)
    }

    /// The whole table with every slot holding `resource` cleared, or `None`
    /// if no slot holds it.
    pub fn without(&self, resource: ResourceId) -> Option<Vec<T>> {
        self.without_any(&[resource])
    }

    /// Like `without`, for any of `resources`.
    pub fn without_any(&self, resources: &[ResourceId]) -> Option<Vec<T>> {
        let mut desired = None;
        for (i, v) in self.slots.iter().enumerate() {
            if let Some(b) = v.bound() {
                if resources.contains(&b.resource) {
                    desired.get_or_insert_with(|| self.slots.clone())[i] = T::default();
                }
            }
        }

        desired
    }

    /// Returns true if any slot holds `resource`.
    pub fn holds(&self, resource: ResourceId) -> bool {
        self.slots
            .iter()
            .any(|v| v.bound().map(|b| b.resource) == Some(resource))
    }
}

/// Fails with `BufferMapped` if a slot that is about to change holds, or is
/// about to hold, one of the `mapped` buffers.
pub fn check_unmapped<T: SlotValue>(mapped: &[ResourceId], current: &[T], values: &[T]) -> Result<()> {
    if mapped.is_empty() {
        return Ok(());
    }

    for (cur, new) in current.iter().zip(values) {
        if cur == new {
            continue;
        }

        for v in cur.bound().into_iter().chain(new.bound()) {
            if mapped.contains(&v.resource) {
                return Err(Error::BufferMapped(v.resource));
            }
        }
    }

    Ok(())
}

/// The full mutable pipeline state of one native context, as last committed.
///
/// It is only ever changed by `ContextStateCache`.
#[derive(Debug, Clone)]
pub struct ContextState {
    pub(super) vertex_buffers: SlotTable<VertexBufferBinding>,
    pub(super) index_buffer: Option<IndexBufferBinding>,
    pub(super) constant_buffers: [SlotTable<Option<Bound>>; NUM_STAGES],
    pub(super) shader_resources: [SlotTable<Option<Bound>>; NUM_STAGES],
    pub(super) samplers: [SlotTable<Option<Bound>>; NUM_STAGES],
    pub(super) render_targets: SlotTable<Option<Bound>>,
    pub(super) depth_stencil: Option<Bound>,
    pub(super) input_layout: Option<Bound>,
    pub(super) shaders: [Option<Bound>; NUM_STAGES],
    pub(super) raster_state: Option<Bound>,
    pub(super) depth_stencil_state: Option<Bound>,
    pub(super) blend_state: Option<Bound>,
    pub(super) viewport: Option<Viewport>,
    pub(super) scissor: Option<ScissorRect>,
    pub(super) topology: Option<PrimitiveTopology>,
}

impl Default for ContextState {
    fn default() -> Self {
        ContextState {
            vertex_buffers: SlotTable::new(MAX_VERTEX_BUFFERS),
            index_buffer: None,
            constant_buffers: [
                SlotTable::new(MAX_CONSTANT_BUFFERS),
                SlotTable::new(MAX_CONSTANT_BUFFERS),
            ],
            shader_resources: [
                SlotTable::new(MAX_SHADER_RESOURCES),
                SlotTable::new(MAX_SHADER_RESOURCES),
            ],
            samplers: [SlotTable::new(MAX_SAMPLERS), SlotTable::new(MAX_SAMPLERS)],
            render_targets: SlotTable::new(MAX_RENDER_TARGETS),
            depth_stencil: None,
            input_layout: None,
            shaders: [None; NUM_STAGES],
            raster_state: None,
            depth_stencil_state: None,
            blend_state: None,
            viewport: None,
            scissor: None,
            topology: None,
        }
    }
}

impl ContextState {
    #[inline]
    pub fn vertex_buffers(&self) -> &[VertexBufferBinding] {
        self.vertex_buffers.as_slice()
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<&IndexBufferBinding> {
        self.index_buffer.as_ref()
    }

    #[inline]
    pub fn constant_buffers(&self, stage: ShaderStage) -> &[Option<Bound>] {
        self.constant_buffers[stage.index()].as_slice()
    }

    #[inline]
    pub fn shader_resources(&self, stage: ShaderStage) -> &[Option<Bound>] {
        self.shader_resources[stage.index()].as_slice()
    }

    #[inline]
    pub fn samplers(&self, stage: ShaderStage) -> &[Option<Bound>] {
        self.samplers[stage.index()].as_slice()
    }

    #[inline]
    pub fn render_targets(&self) -> &[Option<Bound>] {
        self.render_targets.as_slice()
    }

    #[inline]
    pub fn depth_stencil(&self) -> Option<Bound> {
        self.depth_stencil
    }

    #[inline]
    pub fn input_layout(&self) -> Option<Bound> {
        self.input_layout
    }

    #[inline]
    pub fn shader(&self, stage: ShaderStage) -> Option<Bound> {
        self.shaders[stage.index()]
    }

    #[inline]
    pub fn raster_state(&self) -> Option<Bound> {
        self.raster_state
    }

    #[inline]
    pub fn depth_stencil_state(&self) -> Option<Bound> {
        self.depth_stencil_state
    }

    #[inline]
    pub fn blend_state(&self) -> Option<Bound> {
        self.blend_state
    }

    #[inline]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    #[inline]
    pub fn scissor(&self) -> Option<ScissorRect> {
        self.scissor
    }

    #[inline]
    pub fn topology(&self) -> Option<PrimitiveTopology> {
        self.topology
    }

    /// Returns true if `resource` is bound as render target or depth-stencil.
    pub fn is_write_bound(&self, resource: ResourceId) -> bool {
        self.render_targets.holds(resource) || holds(&self.depth_stencil, resource)
    }

    /// Returns true if `resource` is bound as shader resource in any stage.
    pub fn is_read_bound(&self, resource: ResourceId) -> bool {
        self.shader_resources.iter().any(|t| t.holds(resource))
    }

    /// Returns true if any slot of any kind references `resource`.
    pub fn references(&self, resource: ResourceId) -> bool {
        self.vertex_buffers.holds(resource)
            || self.index_buffer.map(|v| v.buffer.resource) == Some(resource)
            || self.constant_buffers.iter().any(|t| t.holds(resource))
            || self.is_read_bound(resource)
            || self.samplers.iter().any(|t| t.holds(resource))
            || self.is_write_bound(resource)
            || holds(&self.input_layout, resource)
            || self.shaders.iter().any(|v| holds(v, resource))
            || holds(&self.raster_state, resource)
            || holds(&self.depth_stencil_state, resource)
            || holds(&self.blend_state, resource)
    }
}
