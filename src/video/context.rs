//! The immediate rendering context.
//!
//! A `Context` owns the resource registry and a `ContextStateCache` driving one
//! backend. Resources are addressed by generational handles; deleting one first
//! tells the cache to unbind it everywhere and only then releases the native
//! object.
//!
//! `execute_draw_call` validates a `DrawCall` completely before touching the
//! native context, so a malformed draw fails without a single native call.
//! Numeric uniforms are written into an implicit uniform buffer per shader stage
//! which gets bound to constant-buffer slot `GLOBAL_UNIFORMS_SLOT`.

use std::mem;

use cgmath::Vector2;
use smallvec::SmallVec;

use super::assets::prelude::*;
use super::backends::Backend;
use super::cache::ContextStateCache;
use super::errors::{Error, Result};
use super::settings::ContextParams;
use super::{
    GLOBAL_UNIFORMS_SLOT, MAX_CONSTANT_BUFFERS, MAX_RENDER_TARGETS, MAX_SAMPLERS,
    MAX_SHADER_RESOURCES, MAX_VERTEX_BUFFERS, NUM_STAGES,
};
use crate::utils::handle::HandleLike;
use crate::utils::object_pool::ObjectPool;

/// A registered object with a single native name.
#[derive(Debug, Clone, Copy)]
pub struct NativeObject<H, P> {
    pub handle: H,
    pub params: P,
    pub native: NativeHandle,
}

impl<H, P> BindableResource for NativeObject<H, P>
where
    H: Copy + Into<ResourceId>,
{
    #[inline]
    fn resource_id(&self) -> ResourceId {
        self.handle.into()
    }

    #[inline]
    fn native(&self) -> NativeHandle {
        self.native
    }
}

pub type BufferObject = NativeObject<BufferHandle, BufferParams>;
pub type SamplerObject = NativeObject<SamplerHandle, SamplerParams>;
pub type ShaderObject = NativeObject<ShaderHandle, ShaderStage>;
pub type InputLayoutObject = NativeObject<InputLayoutHandle, InputLayoutParams>;
pub type RasterStateObject = NativeObject<RasterStateHandle, RasterDesc>;
pub type DepthStencilStateObject = NativeObject<DepthStencilStateHandle, DepthStencilDesc>;
pub type BlendStateObject = NativeObject<BlendStateHandle, BlendDesc>;

#[derive(Debug, Clone, Copy)]
pub struct TextureObject {
    pub handle: TextureHandle,
    pub params: TextureParams,
    pub views: TextureViews,
}

impl TextureObject {
    #[inline]
    fn view(&self, native: Option<NativeHandle>) -> Option<Bound> {
        native.map(|v| Bound::new(self.handle.into(), v))
    }

    #[inline]
    pub fn shader_resource(&self) -> Option<Bound> {
        self.view(self.views.shader_resource)
    }

    #[inline]
    pub fn render_target(&self) -> Option<Bound> {
        self.view(self.views.render_target)
    }

    #[inline]
    pub fn depth_stencil(&self) -> Option<Bound> {
        self.view(self.views.depth_stencil)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramObject {
    pub vs: ShaderHandle,
    pub ps: ShaderHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryObject {
    pub handle: QueryHandle,
    pub kind: QueryKind,
    pub native: NativeHandle,
    pub state: QueryState,
}

#[derive(Debug, Clone)]
pub struct FrameTargetObject {
    pub params: FrameTargetParams,
    pub dimensions: Vector2<u32>,
}

/// Per-frame counters, reset by `Context::advance`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatistics {
    pub draw_calls: u32,
    pub primitives: u64,
}

struct Defaults {
    raster: RasterStateHandle,
    depth_stencil: DepthStencilStateHandle,
    blend: BlendStateHandle,
}

type Numerics = SmallVec<[(usize, UniformValue); 8]>;

/// Everything a validated draw call binds, resolved to bound values.
struct DrawPlan {
    targets: [Option<Bound>; MAX_RENDER_TARGETS],
    depth_stencil: Option<Bound>,
    shaders: [Option<Bound>; NUM_STAGES],
    numerics: [Numerics; NUM_STAGES],
    constant_buffers: [[Option<Bound>; MAX_CONSTANT_BUFFERS]; NUM_STAGES],
    shader_resources: [[Option<Bound>; MAX_SHADER_RESOURCES]; NUM_STAGES],
    samplers: [[Option<Bound>; MAX_SAMPLERS]; NUM_STAGES],
    input_layout: Option<Bound>,
    vertex_buffers: [VertexBufferBinding; MAX_VERTEX_BUFFERS],
    index_buffer: Option<IndexBufferBinding>,
    raster: Bound,
    depth_stencil_state: Bound,
    blend: Bound,
    scissor: Option<ScissorRect>,
    viewport: Viewport,
    topology: PrimitiveTopology,
    exec: DrawExec,
}

pub struct Context<B: Backend> {
    params: ContextParams,
    cache: ContextStateCache<B>,

    buffers: ObjectPool<BufferHandle, BufferObject>,
    textures: ObjectPool<TextureHandle, TextureObject>,
    samplers: ObjectPool<SamplerHandle, SamplerObject>,
    shaders: ObjectPool<ShaderHandle, ShaderObject>,
    programs: ObjectPool<ProgramHandle, ProgramObject>,
    input_layouts: ObjectPool<InputLayoutHandle, InputLayoutObject>,
    raster_states: ObjectPool<RasterStateHandle, RasterStateObject>,
    depth_stencil_states: ObjectPool<DepthStencilStateHandle, DepthStencilStateObject>,
    blend_states: ObjectPool<BlendStateHandle, BlendStateObject>,
    frame_targets: ObjectPool<FrameTargetHandle, FrameTargetObject>,
    queries: ObjectPool<QueryHandle, QueryObject>,

    defaults: Defaults,
    globals: [Option<BufferHandle>; NUM_STAGES],
    stats: FrameStatistics,
}

impl<B: Backend> Context<B> {
    /// Creates a context driving `backend`, along with its default state objects
    /// and implicit uniform buffers.
    pub fn new(backend: B, params: ContextParams) -> crate::errors::Result<Self> {
        params.validate()?;

        let mut cache = ContextStateCache::new(backend, &params);
        let mut raster_states = ObjectPool::new();
        let mut depth_stencil_states = ObjectPool::new();
        let mut blend_states = ObjectPool::new();
        let mut buffers = ObjectPool::new();

        let defaults = unsafe {
            let backend = cache.backend_mut();

            let desc = RasterDesc::default();
            let native = backend.create_raster_state(&desc)?;
            let raster = raster_states.create_with(|handle| NativeObject {
                handle,
                params: desc,
                native,
            });

            let desc = DepthStencilDesc::default();
            let native = backend.create_depth_stencil_state(&desc)?;
            let depth_stencil = depth_stencil_states.create_with(|handle| NativeObject {
                handle,
                params: desc,
                native,
            });

            let desc = BlendDesc::default();
            let native = backend.create_blend_state(&desc)?;
            let blend = blend_states.create_with(|handle| NativeObject {
                handle,
                params: desc,
                native,
            });

            Defaults {
                raster,
                depth_stencil,
                blend,
            }
        };

        let mut globals = [None; NUM_STAGES];
        if params.global_uniforms_size > 0 {
            let desc = BufferParams::new(
                BufferKind::Constant,
                BufferUsage::Dynamic,
                params.global_uniforms_size,
            );

            for v in globals.iter_mut() {
                let native = unsafe { cache.backend_mut().create_buffer(&desc, None)? };
                *v = Some(buffers.create_with(|handle| NativeObject {
                    handle,
                    params: desc,
                    native,
                }));
            }
        }

        info!("Context created with {:?}.", params);

        Ok(Context {
            params,
            cache,
            buffers,
            textures: ObjectPool::new(),
            samplers: ObjectPool::new(),
            shaders: ObjectPool::new(),
            programs: ObjectPool::new(),
            input_layouts: ObjectPool::new(),
            raster_states,
            depth_stencil_states,
            blend_states,
            frame_targets: ObjectPool::new(),
            queries: ObjectPool::new(),
            defaults,
            globals,
            stats: FrameStatistics::default(),
        })
    }

    #[inline]
    pub fn params(&self) -> &ContextParams {
        &self.params
    }

    #[inline]
    pub fn cache(&self) -> &ContextStateCache<B> {
        &self.cache
    }

    #[inline]
    pub fn backend(&self) -> &B {
        self.cache.backend()
    }

    /// Mutable access to the backend. Binding anything through it behind the
    /// cache's back breaks the cache.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        self.cache.backend_mut()
    }

    /// Statistics of the current frame so far.
    #[inline]
    pub fn statistics(&self) -> FrameStatistics {
        self.stats
    }

    /// Ends the current frame, returning and resetting its statistics.
    pub fn advance(&mut self) -> FrameStatistics {
        mem::replace(&mut self.stats, FrameStatistics::default())
    }

    #[inline]
    pub fn default_raster_state(&self) -> RasterStateHandle {
        self.defaults.raster
    }

    #[inline]
    pub fn default_depth_stencil_state(&self) -> DepthStencilStateHandle {
        self.defaults.depth_stencil
    }

    #[inline]
    pub fn default_blend_state(&self) -> BlendStateHandle {
        self.defaults.blend
    }

    /// The implicit uniform buffer numeric uniforms of `stage` are written to.
    #[inline]
    pub fn global_uniforms(&self, stage: ShaderStage) -> Option<BufferHandle> {
        self.globals[stage.index()]
    }

    #[inline]
    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferObject> {
        self.buffers.get(handle)
    }

    #[inline]
    pub fn texture(&self, handle: TextureHandle) -> Option<&TextureObject> {
        self.textures.get(handle)
    }

    #[inline]
    pub fn sampler(&self, handle: SamplerHandle) -> Option<&SamplerObject> {
        self.samplers.get(handle)
    }

    #[inline]
    pub fn shader(&self, handle: ShaderHandle) -> Option<&ShaderObject> {
        self.shaders.get(handle)
    }

    #[inline]
    pub fn input_layout(&self, handle: InputLayoutHandle) -> Option<&InputLayoutObject> {
        self.input_layouts.get(handle)
    }

    #[inline]
    pub fn frame_target(&self, handle: FrameTargetHandle) -> Option<&FrameTargetObject> {
        self.frame_targets.get(handle)
    }

    #[inline]
    pub fn query(&self, handle: QueryHandle) -> Option<&QueryObject> {
        self.queries.get(handle)
    }

    pub fn create_buffer(&mut self, params: BufferParams, data: Option<&[u8]>) -> Result<BufferHandle> {
        params.validate(data)?;

        let native = unsafe { self.cache.backend_mut().create_buffer(&params, data)? };
        Ok(self.buffers.create_with(|handle| NativeObject {
            handle,
            params,
            native,
        }))
    }

    /// Deletes a buffer, unbinding it everywhere first. Mapped buffers can not be
    /// deleted.
    pub fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if self.globals.contains(&Some(handle)) {
            return Err(Error::InvalidUsage(
                "implicit uniform buffers are owned by the context".into(),
            ));
        }

        let native = self
            .buffers
            .get(handle)
            .ok_or(Error::BufferHandleInvalid(handle))?
            .native;

        self.cache.on_buffer_destroyed(handle.into())?;
        unsafe { self.cache.backend_mut().delete_buffer(native)? };
        self.buffers.free(handle);
        Ok(())
    }

    /// Maps a dynamic buffer for CPU writes.
    pub fn map_buffer(&mut self, handle: BufferHandle, mode: MapMode) -> Result<()> {
        let buffer = self.buffers.get(handle).ok_or(Error::BufferHandleInvalid(handle))?;
        if buffer.params.usage != BufferUsage::Dynamic {
            return Err(Error::InvalidUsage(format!("{} is not dynamic", handle)));
        }

        let bound = buffer.bound();
        self.cache.map_buffer(bound, mode)
    }

    /// Writes `bytes` at byte `offset` of a mapped buffer.
    pub fn write_buffer(&mut self, handle: BufferHandle, offset: usize, bytes: &[u8]) -> Result<()> {
        let buffer = self.buffers.get(handle).ok_or(Error::BufferHandleInvalid(handle))?;
        if offset
            .checked_add(bytes.len())
            .map_or(true, |end| end > buffer.params.size)
        {
            return Err(Error::OutOfBounds {
                offset,
                len: bytes.len(),
                size: buffer.params.size,
            });
        }

        let bound = buffer.bound();
        self.cache.write_mapped(bound, offset, bytes)
    }

    pub fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        let bound = self
            .buffers
            .get(handle)
            .ok_or(Error::BufferHandleInvalid(handle))?
            .bound();

        self.cache.unmap_buffer(bound)
    }

    pub fn create_texture(&mut self, params: TextureParams, data: Option<&[u8]>) -> Result<TextureHandle> {
        params.validate(data)?;

        let views = unsafe { self.cache.backend_mut().create_texture(&params, data)? };
        Ok(self.textures.create_with(|handle| TextureObject {
            handle,
            params,
            views,
        }))
    }

    /// Deletes a texture, unbinding all its views everywhere first. Frame targets
    /// attaching it become unusable.
    pub fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let views = self
            .textures
            .get(handle)
            .ok_or(Error::TextureHandleInvalid(handle))?
            .views;

        self.cache.on_texture_views_destroyed(handle.into());
        unsafe { self.cache.backend_mut().delete_texture(views)? };
        self.textures.free(handle);
        Ok(())
    }

    pub fn create_sampler(&mut self, params: SamplerParams) -> Result<SamplerHandle> {
        let native = unsafe { self.cache.backend_mut().create_sampler(&params)? };
        Ok(self.samplers.create_with(|handle| NativeObject {
            handle,
            params,
            native,
        }))
    }

    /// Returns a sampler with equal `params`, creating one only if none exists
    /// yet. The handle is shared by every requester, so deleting it affects all
    /// of them.
    pub fn request_sampler(&mut self, params: SamplerParams) -> Result<SamplerHandle> {
        match find_params(&self.samplers, &params) {
            Some(handle) => Ok(handle),
            None => self.create_sampler(params),
        }
    }

    pub fn delete_sampler(&mut self, handle: SamplerHandle) -> Result<()> {
        let native = self
            .samplers
            .get(handle)
            .ok_or(Error::SamplerHandleInvalid(handle))?
            .native;

        self.cache.on_sampler_destroyed(handle.into());
        unsafe { self.cache.backend_mut().delete_sampler(native)? };
        self.samplers.free(handle);
        Ok(())
    }

    pub fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle> {
        let native = unsafe { self.cache.backend_mut().create_shader(stage, source)? };
        Ok(self.shaders.create_with(|handle| NativeObject {
            handle,
            params: stage,
            native,
        }))
    }

    pub fn delete_shader(&mut self, handle: ShaderHandle) -> Result<()> {
        let native = self
            .shaders
            .get(handle)
            .ok_or(Error::ShaderHandleInvalid(handle))?
            .native;

        self.cache.on_shader_destroyed(handle.into());
        unsafe { self.cache.backend_mut().delete_shader(native)? };
        self.shaders.free(handle);
        Ok(())
    }

    /// Pairs a vertex and a pixel shader into a program draw calls refer to.
    pub fn create_program(&mut self, vs: ShaderHandle, ps: ShaderHandle) -> Result<ProgramHandle> {
        for &(handle, stage) in &[(vs, ShaderStage::Vertex), (ps, ShaderStage::Pixel)] {
            let shader = self.shaders.get(handle).ok_or(Error::ShaderHandleInvalid(handle))?;
            if shader.params != stage {
                return Err(Error::InvalidUsage(format!(
                    "{} is a {:?} shader, expected {:?}",
                    handle, shader.params, stage
                )));
            }
        }

        Ok(self.programs.create(ProgramObject { vs, ps }))
    }

    /// Deletes a program. Its shaders stay alive.
    pub fn delete_program(&mut self, handle: ProgramHandle) -> Result<()> {
        self.programs
            .free(handle)
            .map(|_| ())
            .ok_or(Error::ProgramHandleInvalid(handle))
    }

    pub fn create_input_layout(&mut self, params: InputLayoutParams) -> Result<InputLayoutHandle> {
        params.validate()?;

        let native = unsafe { self.cache.backend_mut().create_input_layout(&params)? };
        Ok(self.input_layouts.create_with(|handle| NativeObject {
            handle,
            params,
            native,
        }))
    }

    pub fn delete_input_layout(&mut self, handle: InputLayoutHandle) -> Result<()> {
        let native = self
            .input_layouts
            .get(handle)
            .ok_or(Error::InputLayoutHandleInvalid(handle))?
            .native;

        self.cache.on_input_layout_destroyed(handle.into());
        unsafe { self.cache.backend_mut().delete_input_layout(native)? };
        self.input_layouts.free(handle);
        Ok(())
    }

    pub fn create_raster_state(&mut self, desc: RasterDesc) -> Result<RasterStateHandle> {
        let native = unsafe { self.cache.backend_mut().create_raster_state(&desc)? };
        Ok(self.raster_states.create_with(|handle| NativeObject {
            handle,
            params: desc,
            native,
        }))
    }

    pub fn create_depth_stencil_state(
        &mut self,
        desc: DepthStencilDesc,
    ) -> Result<DepthStencilStateHandle> {
        let native = unsafe { self.cache.backend_mut().create_depth_stencil_state(&desc)? };
        Ok(self.depth_stencil_states.create_with(|handle| NativeObject {
            handle,
            params: desc,
            native,
        }))
    }

    pub fn create_blend_state(&mut self, desc: BlendDesc) -> Result<BlendStateHandle> {
        let native = unsafe { self.cache.backend_mut().create_blend_state(&desc)? };
        Ok(self.blend_states.create_with(|handle| NativeObject {
            handle,
            params: desc,
            native,
        }))
    }

    /// Returns a rasterizer state with an equal descriptor, creating one only if
    /// none exists yet. Requesting the default descriptor returns the default
    /// state. Equal descriptors thus share one handle and switching between them
    /// costs no native call.
    pub fn request_raster_state(&mut self, desc: RasterDesc) -> Result<RasterStateHandle> {
        match find_params(&self.raster_states, &desc) {
            Some(handle) => Ok(handle),
            None => self.create_raster_state(desc),
        }
    }

    pub fn request_depth_stencil_state(
        &mut self,
        desc: DepthStencilDesc,
    ) -> Result<DepthStencilStateHandle> {
        match find_params(&self.depth_stencil_states, &desc) {
            Some(handle) => Ok(handle),
            None => self.create_depth_stencil_state(desc),
        }
    }

    pub fn request_blend_state(&mut self, desc: BlendDesc) -> Result<BlendStateHandle> {
        match find_params(&self.blend_states, &desc) {
            Some(handle) => Ok(handle),
            None => self.create_blend_state(desc),
        }
    }

    pub fn delete_raster_state(&mut self, handle: RasterStateHandle) -> Result<()> {
        if handle == self.defaults.raster {
            return Err(Error::InvalidUsage("default states are owned by the context".into()));
        }

        let native = self
            .raster_states
            .get(handle)
            .ok_or(Error::RasterStateHandleInvalid(handle))?
            .native;

        self.delete_state(handle.into(), native)?;
        self.raster_states.free(handle);
        Ok(())
    }

    pub fn delete_depth_stencil_state(&mut self, handle: DepthStencilStateHandle) -> Result<()> {
        if handle == self.defaults.depth_stencil {
            return Err(Error::InvalidUsage("default states are owned by the context".into()));
        }

        let native = self
            .depth_stencil_states
            .get(handle)
            .ok_or(Error::DepthStencilStateHandleInvalid(handle))?
            .native;

        self.delete_state(handle.into(), native)?;
        self.depth_stencil_states.free(handle);
        Ok(())
    }

    pub fn delete_blend_state(&mut self, handle: BlendStateHandle) -> Result<()> {
        if handle == self.defaults.blend {
            return Err(Error::InvalidUsage("default states are owned by the context".into()));
        }

        let native = self
            .blend_states
            .get(handle)
            .ok_or(Error::BlendStateHandleInvalid(handle))?
            .native;

        self.delete_state(handle.into(), native)?;
        self.blend_states.free(handle);
        Ok(())
    }

    fn delete_state(&mut self, resource: ResourceId, native: NativeHandle) -> Result<()> {
        self.cache.on_state_object_destroyed(resource);
        unsafe { self.cache.backend_mut().delete_state(native)? };
        Ok(())
    }

    /// Creates a frame target. Every attachment must be alive, bindable for its
    /// slot kind, and share the same dimensions.
    pub fn create_frame_target(&mut self, params: FrameTargetParams) -> Result<FrameTargetHandle> {
        params.validate()?;

        let mut dimensions = None;
        let attachments = params
            .colors
            .iter()
            .filter_map(|v| v.map(|v| (v, false)))
            .chain(params.depth_stencil.map(|v| (v, true)));

        for (handle, depth) in attachments {
            let texture = self
                .textures
                .get(handle)
                .ok_or(Error::TextureHandleInvalid(handle))?;

            if depth && !texture.params.usage.depth_stencil {
                return Err(Error::FrameTargetInvalid(format!(
                    "{} can not be bound as depth-stencil",
                    handle
                )));
            }

            if !depth && !texture.params.usage.render_target {
                return Err(Error::FrameTargetInvalid(format!(
                    "{} can not be bound as render target",
                    handle
                )));
            }

            match dimensions {
                None => dimensions = Some(texture.params.dimensions),
                Some(d) if d != texture.params.dimensions => {
                    return Err(Error::FrameTargetInvalid(format!(
                        "attachments differ in size, {:?} and {:?}",
                        d, texture.params.dimensions
                    )));
                }
                _ => {}
            }
        }

        let dimensions = dimensions.ok_or_else(|| {
            Error::FrameTargetInvalid("at least one attachment is required".into())
        })?;

        Ok(self.frame_targets.create(FrameTargetObject { params, dimensions }))
    }

    /// Deletes a frame target. Its attachments stay alive, and stay bound until
    /// another frame target replaces them.
    pub fn delete_frame_target(&mut self, handle: FrameTargetHandle) -> Result<()> {
        self.frame_targets
            .free(handle)
            .map(|_| ())
            .ok_or(Error::FrameTargetHandleInvalid(handle))
    }

    pub fn create_query(&mut self, kind: QueryKind) -> Result<QueryHandle> {
        let native = unsafe { self.cache.backend_mut().create_query(kind)? };
        Ok(self.queries.create_with(|handle| QueryObject {
            handle,
            kind,
            native,
            state: QueryState::Idle,
        }))
    }

    /// Deletes a query. Active queries must be ended first.
    pub fn delete_query(&mut self, handle: QueryHandle) -> Result<()> {
        let query = *self.queries.get(handle).ok_or(Error::QueryHandleInvalid(handle))?;
        if query.state == QueryState::Active {
            return Err(Error::InvalidUsage(format!("{} is active", handle)));
        }

        unsafe { self.cache.backend_mut().delete_query(query.native)? };
        self.queries.free(handle);
        Ok(())
    }

    /// Starts counting into `handle`, discarding any previous result. Only one
    /// query of each kind can be active at a time.
    pub fn begin_query(&mut self, handle: QueryHandle) -> Result<()> {
        let query = *self.queries.get(handle).ok_or(Error::QueryHandleInvalid(handle))?;

        let busy = self
            .queries
            .keys()
            .filter_map(|h| self.queries.get(h))
            .any(|v| v.kind == query.kind && v.state == QueryState::Active);

        if busy {
            return Err(Error::InvalidUsage(format!(
                "a {:?} query is active already",
                query.kind
            )));
        }

        unsafe { self.cache.backend_mut().begin_query(query.native, query.kind)? };
        self.set_query_state(handle, QueryState::Active);
        Ok(())
    }

    pub fn end_query(&mut self, handle: QueryHandle) -> Result<()> {
        let query = *self.queries.get(handle).ok_or(Error::QueryHandleInvalid(handle))?;
        if query.state != QueryState::Active {
            return Err(Error::InvalidUsage(format!("{} is not active", handle)));
        }

        unsafe { self.cache.backend_mut().end_query(query.native, query.kind)? };
        self.set_query_state(handle, QueryState::Ended);
        Ok(())
    }

    /// Polls the result of an ended query. `None` means the GPU has not
    /// produced it yet.
    pub fn query_result(&mut self, handle: QueryHandle) -> Result<Option<u64>> {
        let query = *self.queries.get(handle).ok_or(Error::QueryHandleInvalid(handle))?;
        if query.state != QueryState::Ended {
            return Err(Error::InvalidUsage(format!("{} has not ended", handle)));
        }

        Ok(unsafe { self.cache.backend_mut().query_result(query.native)? })
    }

    #[inline]
    pub fn is_query_ready(&mut self, handle: QueryHandle) -> Result<bool> {
        self.query_result(handle).map(|v| v.is_some())
    }

    fn set_query_state(&mut self, handle: QueryHandle, state: QueryState) {
        if let Some(v) = self.queries.get_mut(handle) {
            v.state = state;
        }
    }

    /// Clears the color attachment `slot` of `target` to `color`, or all of them
    /// if `slot` is `None`.
    pub fn clear_color(
        &mut self,
        target: FrameTargetHandle,
        slot: Option<usize>,
        color: [f32; 4],
    ) -> Result<()> {
        let ft = self
            .frame_targets
            .get(target)
            .ok_or(Error::FrameTargetHandleInvalid(target))?;

        let mut views: SmallVec<[Bound; MAX_RENDER_TARGETS]> = SmallVec::new();
        match slot {
            Some(i) if i >= MAX_RENDER_TARGETS => {
                return Err(Error::SlotOutOfRange {
                    start: i,
                    count: 1,
                    capacity: MAX_RENDER_TARGETS,
                });
            }
            Some(i) => {
                let handle = ft.params.colors.get(i).cloned().and_then(|v| v).ok_or_else(|| {
                    Error::InvalidUsage(format!("{} has no color attachment {}", target, i))
                })?;

                views.push(self.render_target_view(handle)?);
            }
            None => {
                for handle in ft.params.colors.iter().filter_map(|v| *v) {
                    views.push(self.render_target_view(handle)?);
                }
            }
        }

        for v in views {
            unsafe { self.cache.backend_mut().clear_render_target(v, color)? };
        }

        Ok(())
    }

    /// Clears the depth-stencil attachment of `target` to `depth`.
    pub fn clear_depth(&mut self, target: FrameTargetHandle, depth: f32) -> Result<()> {
        let ft = self
            .frame_targets
            .get(target)
            .ok_or(Error::FrameTargetHandleInvalid(target))?;

        let handle = ft.params.depth_stencil.ok_or_else(|| {
            Error::InvalidUsage(format!("{} has no depth-stencil attachment", target))
        })?;

        let view = self.depth_stencil_view(handle)?;
        unsafe { self.cache.backend_mut().clear_depth_stencil(view, depth)? };
        Ok(())
    }

    /// Draws `dc` into `target`.
    ///
    /// The viewport defaults to the full extent of `target`. A scissor rect is
    /// required if the rasterizer state enables scissoring, and ignored
    /// otherwise. Nothing reaches the native context unless the whole draw call
    /// is valid.
    pub fn execute_draw_call(
        &mut self,
        dc: &DrawCall,
        target: FrameTargetHandle,
        viewport: Option<Viewport>,
        scissor: Option<ScissorRect>,
    ) -> Result<()> {
        let plan = self.plan(dc, target, viewport, scissor)?;

        self.cache.set_render_targets(&plan.targets, plan.depth_stencil)?;

        for &stage in ShaderStage::ALL.iter() {
            self.cache.set_shader(stage, plan.shaders[stage.index()]);
        }

        for &stage in ShaderStage::ALL.iter() {
            let numerics = &plan.numerics[stage.index()];
            if numerics.is_empty() {
                continue;
            }

            let buffer = self.global_uniforms_bound(stage)?;
            self.cache.map_buffer(buffer, MapMode::WriteDiscard)?;
            for &(offset, ref value) in numerics.iter() {
                self.cache.write_mapped(buffer, offset, &value.to_bytes())?;
            }

            self.cache.unmap_buffer(buffer)?;
        }

        for &stage in ShaderStage::ALL.iter() {
            let i = stage.index();
            self.cache.set_constant_buffers(stage, 0, &plan.constant_buffers[i])?;
            self.cache.set_shader_resources(stage, 0, &plan.shader_resources[i])?;
            self.cache.set_samplers(stage, 0, &plan.samplers[i])?;
        }

        self.cache.set_input_layout(plan.input_layout);
        self.cache.set_vertex_buffers(0, &plan.vertex_buffers)?;
        self.cache.set_index_buffer(plan.index_buffer)?;

        self.cache.set_raster_state(Some(plan.raster));
        self.cache.set_depth_stencil_state(Some(plan.depth_stencil_state));
        self.cache.set_blend_state(Some(plan.blend));
        if let Some(scissor) = plan.scissor {
            self.cache.set_scissor(scissor);
        }

        self.cache.set_viewport(plan.viewport);
        self.cache.set_topology(plan.topology);

        unsafe {
            let backend = self.cache.backend_mut();
            match plan.exec {
                DrawExec::Linear {
                    vertices,
                    start_vertex,
                    instances,
                } => backend.draw(vertices, start_vertex, instances)?,
                DrawExec::Indexed {
                    indices,
                    start_index,
                    base_vertex,
                    instances,
                } => backend.draw_indexed(indices, start_index, base_vertex, instances)?,
            }
        }

        let primitives = plan.topology.primitives_for(plan.exec.count());
        let primitives = u64::from(primitives) * u64::from(plan.exec.instances());
        self.stats.draw_calls = self.stats.draw_calls.saturating_add(1);
        self.stats.primitives = self.stats.primitives.saturating_add(primitives);
        Ok(())
    }

    fn plan(
        &self,
        dc: &DrawCall,
        target: FrameTargetHandle,
        viewport: Option<Viewport>,
        scissor: Option<ScissorRect>,
    ) -> Result<DrawPlan> {
        let program = dc.program.ok_or(Error::MissingProgram)?;
        let program = *self
            .programs
            .get(program)
            .ok_or(Error::ProgramHandleInvalid(program))?;

        let exec = dc.exec.ok_or(Error::MissingDrawParams)?;
        let topology = dc.state.topology.ok_or(Error::MissingTopology)?;

        let raster = dc.state.raster.unwrap_or(self.defaults.raster);
        let raster = self
            .raster_states
            .get(raster)
            .ok_or(Error::RasterStateHandleInvalid(raster))?;

        let scissor = if raster.params.scissor {
            Some(scissor.ok_or(Error::MissingScissor)?)
        } else {
            None
        };

        let depth_stencil_state = dc.state.depth_stencil.unwrap_or(self.defaults.depth_stencil);
        let depth_stencil_state = self
            .depth_stencil_states
            .get(depth_stencil_state)
            .ok_or(Error::DepthStencilStateHandleInvalid(depth_stencil_state))?
            .bound();

        let blend = dc.state.blend.unwrap_or(self.defaults.blend);
        let blend = self
            .blend_states
            .get(blend)
            .ok_or(Error::BlendStateHandleInvalid(blend))?
            .bound();

        // Frame target.
        let ft = self
            .frame_targets
            .get(target)
            .ok_or(Error::FrameTargetHandleInvalid(target))?;

        let mut targets = [None; MAX_RENDER_TARGETS];
        for (i, v) in ft.params.colors.iter().enumerate() {
            if let Some(handle) = *v {
                targets[i] = Some(self.render_target_view(handle)?);
            }
        }

        let depth_stencil = match ft.params.depth_stencil {
            Some(handle) => Some(self.depth_stencil_view(handle)?),
            None => None,
        };

        let viewport =
            viewport.unwrap_or_else(|| Viewport::full(ft.dimensions.x, ft.dimensions.y));

        // Shaders.
        let mut shaders = [None; NUM_STAGES];
        for &(handle, stage) in &[
            (program.vs, ShaderStage::Vertex),
            (program.ps, ShaderStage::Pixel),
        ] {
            let shader = self
                .shaders
                .get(handle)
                .ok_or(Error::ShaderHandleInvalid(handle))?;

            shaders[stage.index()] = Some(shader.bound());
        }

        // Uniforms.
        let mut numerics: [Numerics; NUM_STAGES] = [Numerics::new(), Numerics::new()];
        let mut constant_buffers = [[None; MAX_CONSTANT_BUFFERS]; NUM_STAGES];
        let mut shader_resources = [[None; MAX_SHADER_RESOURCES]; NUM_STAGES];
        let mut samplers = [[None; MAX_SAMPLERS]; NUM_STAGES];

        for uniform in &dc.uniforms {
            let i = uniform.stage().index();
            match *uniform {
                BoundUniform::Numeric {
                    stage,
                    byte_offset,
                    value,
                } => {
                    if self.globals[i].is_none() {
                        return Err(Error::NoGlobalUniformBuffer(stage));
                    }

                    let offset = byte_offset as usize;
                    let end = offset.saturating_add(value.size());
                    if end > self.params.global_uniforms_size {
                        return Err(Error::UniformOutOfBounds {
                            stage,
                            offset,
                            end,
                            size: self.params.global_uniforms_size,
                        });
                    }

                    numerics[i].push((offset, value));
                }
                BoundUniform::ConstantBuffer {
                    slot, buffer, ..
                } => {
                    let slot = check_slot(slot, MAX_CONSTANT_BUFFERS)?;
                    let bound = self.unmapped_buffer(buffer)?;
                    constant_buffers[i][slot] = Some(bound);
                }
                BoundUniform::Texture { slot, texture, .. } => {
                    let slot = check_slot(slot, MAX_SHADER_RESOURCES)?;
                    shader_resources[i][slot] = Some(self.shader_resource_view(texture)?);
                }
                BoundUniform::Sampler { slot, sampler, .. } => {
                    let slot = check_slot(slot, MAX_SAMPLERS)?;
                    samplers[i][slot] = Some(self.sampler_bound(sampler)?);
                }
                BoundUniform::TextureArray {
                    slot, ref textures, ..
                } => {
                    let start = check_run(slot, textures.len(), MAX_SHADER_RESOURCES)?;
                    for (v, texture) in shader_resources[i][start..].iter_mut().zip(textures) {
                        *v = match *texture {
                            Some(texture) => Some(self.shader_resource_view(texture)?),
                            None => None,
                        };
                    }
                }
                BoundUniform::SamplerArray {
                    slot,
                    samplers: ref handles,
                    ..
                } => {
                    let start = check_run(slot, handles.len(), MAX_SAMPLERS)?;
                    for (v, sampler) in samplers[i][start..].iter_mut().zip(handles) {
                        *v = match *sampler {
                            Some(sampler) => Some(self.sampler_bound(sampler)?),
                            None => None,
                        };
                    }
                }
            }
        }

        for &stage in ShaderStage::ALL.iter() {
            let i = stage.index();
            if numerics[i].is_empty() {
                continue;
            }

            if constant_buffers[i][GLOBAL_UNIFORMS_SLOT].is_some() {
                return Err(Error::InvalidUsage(format!(
                    "constant buffer slot {} of {:?} stage is taken by numeric uniforms",
                    GLOBAL_UNIFORMS_SLOT, stage
                )));
            }

            constant_buffers[i][GLOBAL_UNIFORMS_SLOT] = Some(self.global_uniforms_bound(stage)?);
        }

        // Vertex input.
        let input_layout = match dc.state.input_layout {
            Some(handle) => Some(
                self.input_layouts
                    .get(handle)
                    .ok_or(Error::InputLayoutHandleInvalid(handle))?
                    .bound(),
            ),
            None => None,
        };

        if dc.state.vertex_buffers.len() > MAX_VERTEX_BUFFERS {
            return Err(Error::SlotOutOfRange {
                start: 0,
                count: dc.state.vertex_buffers.len(),
                capacity: MAX_VERTEX_BUFFERS,
            });
        }

        let mut vertex_buffers = [VertexBufferBinding::default(); MAX_VERTEX_BUFFERS];
        for (i, v) in dc.state.vertex_buffers.iter().enumerate() {
            if let Some(stream) = *v {
                let bound = self.unmapped_buffer(stream.buffer)?;
                vertex_buffers[i] = VertexBufferBinding::new(bound, stream.stride, stream.offset);
            }
        }

        let index_buffer = match dc.state.index_buffer {
            Some(stream) => {
                let format = match stream.format {
                    Some(format) => format,
                    None if self.params.strict_index_format => {
                        return Err(Error::MissingIndexFormat)
                    }
                    None => IndexFormat::U32,
                };

                Some(IndexBufferBinding {
                    buffer: self.unmapped_buffer(stream.buffer)?,
                    format,
                    offset: stream.offset,
                })
            }
            None => None,
        };

        if let DrawExec::Indexed { .. } = exec {
            if index_buffer.is_none() {
                return Err(Error::MissingIndexBuffer);
            }
        }

        Ok(DrawPlan {
            targets,
            depth_stencil,
            shaders,
            numerics,
            constant_buffers,
            shader_resources,
            samplers,
            input_layout,
            vertex_buffers,
            index_buffer,
            raster: raster.bound(),
            depth_stencil_state,
            blend,
            scissor,
            viewport,
            topology,
            exec,
        })
    }

    fn render_target_view(&self, handle: TextureHandle) -> Result<Bound> {
        let texture = self
            .textures
            .get(handle)
            .ok_or(Error::TextureHandleInvalid(handle))?;

        texture
            .render_target()
            .ok_or_else(|| Error::FrameTargetInvalid(format!("{} has no render-target view", handle)))
    }

    fn depth_stencil_view(&self, handle: TextureHandle) -> Result<Bound> {
        let texture = self
            .textures
            .get(handle)
            .ok_or(Error::TextureHandleInvalid(handle))?;

        texture
            .depth_stencil()
            .ok_or_else(|| Error::FrameTargetInvalid(format!("{} has no depth-stencil view", handle)))
    }

    fn shader_resource_view(&self, handle: TextureHandle) -> Result<Bound> {
        let texture = self
            .textures
            .get(handle)
            .ok_or(Error::TextureHandleInvalid(handle))?;

        texture.shader_resource().ok_or_else(|| {
            Error::InvalidUsage(format!("{} can not be read by shaders", handle))
        })
    }

    fn sampler_bound(&self, handle: SamplerHandle) -> Result<Bound> {
        self.samplers
            .get(handle)
            .map(|v| v.bound())
            .ok_or(Error::SamplerHandleInvalid(handle))
    }

    fn unmapped_buffer(&self, handle: BufferHandle) -> Result<Bound> {
        let bound = self
            .buffers
            .get(handle)
            .ok_or(Error::BufferHandleInvalid(handle))?
            .bound();

        if self.cache.is_mapped(bound.resource) {
            return Err(Error::BufferMapped(bound.resource));
        }

        Ok(bound)
    }

    fn global_uniforms_bound(&self, stage: ShaderStage) -> Result<Bound> {
        let handle = self.globals[stage.index()].ok_or(Error::NoGlobalUniformBuffer(stage))?;
        self.unmapped_buffer(handle)
    }
}

fn find_params<H, P>(pool: &ObjectPool<H, NativeObject<H, P>>, params: &P) -> Option<H>
where
    H: HandleLike,
    P: PartialEq,
{
    pool.keys()
        .find(|&h| pool.get(h).map_or(false, |v| v.params == *params))
}

/// Checks that `count` consecutive slots from `slot` fit, returning the start.
fn check_run(slot: u32, count: usize, capacity: usize) -> Result<usize> {
    let start = slot as usize;
    match start.checked_add(count) {
        Some(end) if end <= capacity => Ok(start),
        _ => Err(Error::SlotOutOfRange {
            start,
            count,
            capacity,
        }),
    }
}

fn check_slot(slot: u32, capacity: usize) -> Result<usize> {
    let slot = slot as usize;
    if slot < capacity {
        Ok(slot)
    } else {
        Err(Error::SlotOutOfRange {
            start: slot,
            count: 1,
            capacity,
        })
    }
}

impl<B: Backend> Drop for Context<B> {
    fn drop(&mut self) {
        let mapped: Vec<Bound> = self
            .buffers
            .keys()
            .filter_map(|h| self.buffers.get(h))
            .map(|v| v.bound())
            .filter(|v| self.cache.is_mapped(v.resource))
            .collect();

        for v in mapped {
            if let Err(err) = self.cache.unmap_buffer(v) {
                warn!("Failed to unmap {} on context drop: {}", v.resource, err);
            }
        }

        self.cache.reset();

        let backend = self.cache.backend_mut();
        let mut results = Vec::new();
        unsafe {
            for h in self.buffers.keys() {
                if let Some(v) = self.buffers.get(h) {
                    results.push(backend.delete_buffer(v.native));
                }
            }

            for h in self.textures.keys() {
                if let Some(v) = self.textures.get(h) {
                    results.push(backend.delete_texture(v.views));
                }
            }

            for h in self.samplers.keys() {
                if let Some(v) = self.samplers.get(h) {
                    results.push(backend.delete_sampler(v.native));
                }
            }

            for h in self.shaders.keys() {
                if let Some(v) = self.shaders.get(h) {
                    results.push(backend.delete_shader(v.native));
                }
            }

            for h in self.input_layouts.keys() {
                if let Some(v) = self.input_layouts.get(h) {
                    results.push(backend.delete_input_layout(v.native));
                }
            }

            let raster_states = &self.raster_states;
            let depth_stencil_states = &self.depth_stencil_states;
            let blend_states = &self.blend_states;
            let states = raster_states
                .keys()
                .filter_map(|h| raster_states.get(h).map(|v| v.native))
                .chain(
                    depth_stencil_states
                        .keys()
                        .filter_map(|h| depth_stencil_states.get(h).map(|v| v.native)),
                )
                .chain(
                    blend_states
                        .keys()
                        .filter_map(|h| blend_states.get(h).map(|v| v.native)),
                );

            for v in states {
                results.push(backend.delete_state(v));
            }

            for h in self.queries.keys() {
                if let Some(v) = self.queries.get(h) {
                    if v.state == QueryState::Active {
                        results.push(backend.end_query(v.native, v.kind));
                    }

                    results.push(backend.delete_query(v.native));
                }
            }
        }

        for err in results.into_iter().filter_map(|v| v.err()) {
            warn!("Failed to release native object on context drop: {}", err);
        }

        info!("Context dropped.");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::video::backends::record::{NativeCall, RecordingBackend};

    struct Scene {
        ctx: Context<RecordingBackend>,
        target: FrameTargetHandle,
        color: TextureHandle,
        program: ProgramHandle,
    }

    fn scene() -> Scene {
        let mut ctx = Context::new(RecordingBackend::new(), ContextParams::default()).unwrap();

        let mut params = TextureParams::default();
        params.usage = TextureUsage::render_target();
        params.dimensions = Vector2::new(64, 32);
        let color = ctx.create_texture(params, None).unwrap();

        let target = ctx
            .create_frame_target(FrameTargetParams::new().with_color(0, color))
            .unwrap();

        let vs = ctx.create_shader(ShaderStage::Vertex, "vs").unwrap();
        let ps = ctx.create_shader(ShaderStage::Pixel, "ps").unwrap();
        let program = ctx.create_program(vs, ps).unwrap();

        ctx.backend_mut().take_calls();
        Scene {
            ctx,
            target,
            color,
            program,
        }
    }

    fn triangles(program: ProgramHandle) -> DrawCall {
        let mut dc = DrawCall::new(program);
        dc.set_topology(PrimitiveTopology::TriangleList).draw(3, 0, 1);
        dc
    }

    #[test]
    fn invalid_draws_issue_nothing() {
        let mut s = scene();

        let dc = DrawCall::default();
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::MissingProgram) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut dc = DrawCall::new(s.program);
        dc.draw(3, 0, 1);
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::MissingTopology) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut desc = RasterDesc::default();
        desc.scissor = true;
        let raster = s.ctx.create_raster_state(desc).unwrap();
        s.ctx.backend_mut().take_calls();

        let mut dc = triangles(s.program);
        dc.set_raster_state(raster);
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::MissingScissor) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut dc = triangles(s.program);
        dc.draw_indexed(3, 0, 0, 1);
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::MissingIndexBuffer) => {}
            other => panic!("unexpected {:?}", other),
        }

        assert!(s.ctx.backend().calls().is_empty());
        assert_eq!(s.ctx.statistics(), FrameStatistics::default());
    }

    #[test]
    fn repeated_draw_only_draws() {
        let mut s = scene();
        let dc = triangles(s.program);

        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();
        let calls = s.ctx.backend_mut().take_calls();
        assert!(calls.contains(&NativeCall::SetViewport(Viewport::full(64, 32))));
        assert_eq!(calls.last(), Some(&NativeCall::Draw {
            vertices: 3,
            start_vertex: 0,
            instances: 1,
        }));

        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();
        assert_eq!(
            s.ctx.backend().calls(),
            &[NativeCall::Draw {
                vertices: 3,
                start_vertex: 0,
                instances: 1,
            }]
        );
    }

    #[test]
    fn numeric_uniforms_fill_the_implicit_buffer() {
        let mut s = scene();
        let mut dc = triangles(s.program);
        dc.set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Pixel,
            byte_offset: 16,
            value: UniformValue::F32(1.5),
        });

        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();

        let global = s.ctx.global_uniforms(ShaderStage::Pixel).unwrap();
        let native = s.ctx.buffer(global).unwrap().native;
        let bytes = s.ctx.backend().buffer_contents(native).unwrap();
        assert_eq!(&bytes[16..20], &1.5f32.to_ne_bytes());
        assert!(bytes[..16].iter().all(|&v| v == 0));

        let bound = s.ctx.cache().state().constant_buffers(ShaderStage::Pixel)[GLOBAL_UNIFORMS_SLOT];
        assert_eq!(bound.map(|v| v.native), Some(native));
        assert_eq!(s.ctx.cache().state().constant_buffers(ShaderStage::Vertex)[0], None);

        let mut dc = triangles(s.program);
        dc.set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Vertex,
            byte_offset: 4094,
            value: UniformValue::F32(0.0),
        });

        s.ctx.backend_mut().take_calls();
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::UniformOutOfBounds { end, size, .. }) => {
                assert_eq!(end, 4098);
                assert_eq!(size, 4096);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(s.ctx.backend().calls().is_empty());
    }

    #[test]
    fn explicit_buffer_in_global_slot_conflicts_with_numerics() {
        let mut s = scene();
        let params = BufferParams::new(BufferKind::Constant, BufferUsage::Dynamic, 64);
        let cb = s.ctx.create_buffer(params, None).unwrap();

        let mut dc = triangles(s.program);
        dc.set_uniform(BoundUniform::ConstantBuffer {
            stage: ShaderStage::Vertex,
            slot: GLOBAL_UNIFORMS_SLOT as u32,
            buffer: cb,
        });

        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();

        dc.set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Vertex,
            byte_offset: 0,
            value: UniformValue::I32(7),
        });

        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::InvalidUsage(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn statistics_advance_per_frame() {
        let mut s = scene();
        let mut dc = DrawCall::new(s.program);
        dc.set_topology(PrimitiveTopology::TriangleList).draw(9, 0, 2);
        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();

        dc.set_topology(PrimitiveTopology::TriangleStrip).draw(5, 0, 1);
        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();

        let stats = s.ctx.advance();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.primitives, 6 + 3);
        assert_eq!(s.ctx.statistics(), FrameStatistics::default());
    }

    #[test]
    fn owned_objects_can_not_be_deleted() {
        let mut s = scene();
        let raster = s.ctx.default_raster_state();
        let global = s.ctx.global_uniforms(ShaderStage::Vertex).unwrap();

        assert!(s.ctx.delete_raster_state(raster).is_err());
        assert!(s.ctx.delete_buffer(global).is_err());
        assert!(s.ctx.backend().calls().is_empty());
    }

    #[test]
    fn deleting_an_attachment_unbinds_it() {
        let mut s = scene();
        s.ctx.execute_draw_call(&triangles(s.program), s.target, None, None).unwrap();
        assert!(s.ctx.cache().state().is_write_bound(ResourceId::Texture(s.color)));
        s.ctx.backend_mut().take_calls();

        s.ctx.delete_texture(s.color).unwrap();
        let calls = s.ctx.backend_mut().take_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].is_state_change());
        match calls[1] {
            NativeCall::DeleteTexture(_) => {}
            ref other => panic!("unexpected {:?}", other),
        }

        match s.ctx.execute_draw_call(&triangles(s.program), s.target, None, None) {
            Err(Error::TextureHandleInvalid(h)) => assert_eq!(h, s.color),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn frame_target_attachments_must_agree() {
        let mut s = scene();
        let mut params = TextureParams::default();
        params.usage = TextureUsage::render_target();
        params.dimensions = Vector2::new(8, 8);
        let small = s.ctx.create_texture(params, None).unwrap();

        let ft = FrameTargetParams::new().with_color(0, s.color).with_color(1, small);
        assert!(s.ctx.create_frame_target(ft).is_err());

        let ft = FrameTargetParams::new().with_depth_stencil(small);
        assert!(s.ctx.create_frame_target(ft).is_err());
    }

    #[test]
    fn mapped_buffers_block_draws() {
        let mut s = scene();
        let params = BufferParams::new(BufferKind::Vertex, BufferUsage::Dynamic, 48);
        let vb = s.ctx.create_buffer(params, None).unwrap();
        s.ctx.map_buffer(vb, MapMode::WriteDiscard).unwrap();
        s.ctx.write_buffer(vb, 0, &[1; 48]).unwrap();
        assert!(s.ctx.write_buffer(vb, 1, &[1; 48]).is_err());

        let mut dc = triangles(s.program);
        dc.set_vertex_buffer(0, vb, 12, 0);
        s.ctx.backend_mut().take_calls();
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::BufferMapped(r)) => assert_eq!(r, ResourceId::Buffer(vb)),
            other => panic!("unexpected {:?}", other),
        }

        assert!(s.ctx.backend().calls().is_empty());
        s.ctx.unmap_buffer(vb).unwrap();
        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();
        assert_eq!(s.ctx.statistics().draw_calls, 1);
    }

    #[test]
    fn writes_past_the_address_space_are_refused() {
        let mut s = scene();
        let params = BufferParams::new(BufferKind::Constant, BufferUsage::Dynamic, 16);
        let cb = s.ctx.create_buffer(params, None).unwrap();
        s.ctx.map_buffer(cb, MapMode::WriteDiscard).unwrap();
        s.ctx.backend_mut().take_calls();

        match s.ctx.write_buffer(cb, usize::max_value(), &[1, 2]) {
            Err(Error::OutOfBounds { offset, len, size }) => {
                assert_eq!(offset, usize::max_value());
                assert_eq!(len, 2);
                assert_eq!(size, 16);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(s.ctx.backend().calls().is_empty());
        s.ctx.unmap_buffer(cb).unwrap();
    }

    #[test]
    fn equal_descriptors_share_one_state() {
        let mut s = scene();
        let mut desc = RasterDesc::default();
        desc.scissor = true;

        let a = s.ctx.request_raster_state(desc).unwrap();
        let b = s.ctx.request_raster_state(desc).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            s.ctx.request_raster_state(RasterDesc::default()).unwrap(),
            s.ctx.default_raster_state()
        );

        let creates = s
            .ctx
            .backend()
            .calls()
            .iter()
            .filter(|v| match **v {
                NativeCall::CreateState(_) => true,
                _ => false,
            })
            .count();
        assert_eq!(creates, 1);

        let sampler = SamplerParams {
            filter: TextureFilter::Nearest,
            ..SamplerParams::default()
        };
        let x = s.ctx.request_sampler(sampler).unwrap();
        assert_eq!(s.ctx.request_sampler(sampler).unwrap(), x);
        assert_ne!(s.ctx.request_sampler(SamplerParams::default()).unwrap(), x);

        let scissor = ScissorRect {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
        };

        let mut dc = triangles(s.program);
        dc.set_raster_state(a);
        s.ctx.execute_draw_call(&dc, s.target, None, Some(scissor)).unwrap();
        s.ctx.backend_mut().take_calls();

        let mut dc = triangles(s.program);
        dc.set_raster_state(s.ctx.request_raster_state(desc).unwrap());
        s.ctx.execute_draw_call(&dc, s.target, None, Some(scissor)).unwrap();
        assert!(s.ctx.backend().calls().iter().all(|v| !v.is_state_change()));
        assert_eq!(s.ctx.backend().calls().len(), 1);
    }

    #[test]
    fn texture_arrays_bind_as_one_run() {
        let mut s = scene();
        let mut params = TextureParams::default();
        params.dimensions = Vector2::new(4, 4);

        let textures: Vec<TextureHandle> = (0..3)
            .map(|_| s.ctx.create_texture(params, None).unwrap())
            .collect();
        let natives: Vec<Option<NativeHandle>> = textures
            .iter()
            .map(|&v| s.ctx.texture(v).unwrap().views.shader_resource)
            .collect();
        let sampler = s.ctx.request_sampler(SamplerParams::default()).unwrap();
        s.ctx.backend_mut().take_calls();

        let mut dc = triangles(s.program);
        dc.set_uniform(BoundUniform::TextureArray {
            stage: ShaderStage::Pixel,
            slot: 1,
            textures: textures.iter().map(|&v| Some(v)).collect(),
        });
        dc.set_uniform(BoundUniform::SamplerArray {
            stage: ShaderStage::Pixel,
            slot: 0,
            samplers: [Some(sampler), None, Some(sampler)].iter().cloned().collect(),
        });
        s.ctx.execute_draw_call(&dc, s.target, None, None).unwrap();

        let calls = s.ctx.backend_mut().take_calls();
        let views: Vec<_> = calls
            .iter()
            .filter(|v| match **v {
                NativeCall::BindShaderResources { .. } => true,
                _ => false,
            })
            .collect();
        assert_eq!(
            views,
            vec![&NativeCall::BindShaderResources {
                stage: ShaderStage::Pixel,
                start: 1,
                views: natives,
            }]
        );

        let native = s.ctx.sampler(sampler).unwrap().native;
        assert!(calls.contains(&NativeCall::BindSamplers {
            stage: ShaderStage::Pixel,
            start: 0,
            samplers: vec![Some(native), None, Some(native)],
        }));

        let mut dc = triangles(s.program);
        dc.set_uniform(BoundUniform::TextureArray {
            stage: ShaderStage::Pixel,
            slot: (MAX_SHADER_RESOURCES - 2) as u32,
            textures: textures.iter().map(|&v| Some(v)).collect(),
        });
        match s.ctx.execute_draw_call(&dc, s.target, None, None) {
            Err(Error::SlotOutOfRange { start, count, capacity }) => {
                assert_eq!(start, MAX_SHADER_RESOURCES - 2);
                assert_eq!(count, 3);
                assert_eq!(capacity, MAX_SHADER_RESOURCES);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(s.ctx.backend().calls().is_empty());
    }

    #[test]
    fn queries_follow_their_lifecycle() {
        let mut s = scene();
        let q = s.ctx.create_query(QueryKind::SamplesPassed).unwrap();
        let other = s.ctx.create_query(QueryKind::SamplesPassed).unwrap();
        let any = s.ctx.create_query(QueryKind::AnySamplesPassed).unwrap();

        assert!(s.ctx.end_query(q).is_err());
        assert!(s.ctx.query_result(q).is_err());

        s.ctx.begin_query(q).unwrap();
        assert!(s.ctx.begin_query(other).is_err());
        s.ctx.begin_query(any).unwrap();
        assert!(s.ctx.delete_query(q).is_err());

        s.ctx.execute_draw_call(&triangles(s.program), s.target, None, None).unwrap();
        s.ctx.end_query(q).unwrap();
        s.ctx.end_query(any).unwrap();
        assert_eq!(s.ctx.query(q).unwrap().state, QueryState::Ended);

        assert!(!s.ctx.is_query_ready(q).unwrap());
        s.ctx.backend_mut().set_query_result(Some(128));
        assert_eq!(s.ctx.query_result(q).unwrap(), Some(128));

        s.ctx.delete_query(q).unwrap();
        match s.ctx.begin_query(q) {
            Err(Error::QueryHandleInvalid(h)) => assert_eq!(h, q),
            other => panic!("unexpected {:?}", other),
        }
    }
}
