use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

use gl;
use gl::types::*;
use smallvec::SmallVec;

use crate::errors::*;
use crate::video::assets::prelude::*;
use crate::video::backends::Backend;
use crate::video::{MAX_CONSTANT_BUFFERS, MAX_RENDER_TARGETS, MAX_SAMPLERS, MAX_SHADER_RESOURCES};

use super::capabilities::Capabilities;
use super::types;

#[derive(Debug)]
struct GLBuffer {
    size: usize,
    mapped: Option<*mut u8>,
}

#[derive(Debug, Clone, Copy)]
enum GLState {
    Raster(RasterDesc),
    DepthStencil(DepthStencilDesc),
    Blend(BlendDesc),
}

/// A `Backend` over an OpenGL 4.5 core context.
///
/// Buffers, textures, samplers and shaders are GL objects and their names are
/// the native handles. Shaders are separable programs attached to one program
/// pipeline. Input layouts and state objects have no GL counterpart; they are
/// kept as descriptors and applied onto the single vertex array and the fixed
/// function state when bound.
///
/// Slot `s` of a per-stage table maps to the GL binding unit
/// `stage.index() * 8 + s`; shaders are expected to declare their bindings
/// accordingly.
pub struct GLBackend {
    capabilities: Capabilities,
    vao: GLuint,
    pipeline: GLuint,
    framebuffer: GLuint,

    buffers: HashMap<GLuint, GLBuffer>,
    textures: HashMap<GLuint, TextureFormat>,
    layouts: HashMap<NativeHandle, InputLayoutParams>,
    states: HashMap<NativeHandle, GLState>,
    next: u64,

    enabled_attributes: SmallVec<[GLuint; 16]>,
    index: Option<(IndexFormat, u32)>,
    topology: GLenum,
}

impl GLBackend {
    /// Creates a backend over the current context. The GL functions must have
    /// been loaded already, see `gl::load_with`.
    pub unsafe fn new() -> Result<Self> {
        let capabilities = Capabilities::parse()?;
        info!("GLBackend {:#?}", capabilities);
        capabilities.check()?;

        let mut vao = 0;
        gl::CreateVertexArrays(1, &mut vao);
        gl::BindVertexArray(vao);

        let mut pipeline = 0;
        gl::CreateProgramPipelines(1, &mut pipeline);
        gl::BindProgramPipeline(pipeline);

        let mut framebuffer = 0;
        gl::CreateFramebuffers(1, &mut framebuffer);
        check()?;

        Ok(GLBackend {
            capabilities,
            vao,
            pipeline,
            framebuffer,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            layouts: HashMap::new(),
            states: HashMap::new(),
            next: 0,
            enabled_attributes: SmallVec::new(),
            index: None,
            topology: gl::TRIANGLES,
        })
    }

    #[inline]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn alloc(&mut self) -> NativeHandle {
        self.next += 1;
        NativeHandle(self.next)
    }

    unsafe fn apply_raster(&self, desc: &RasterDesc) {
        match desc.cull {
            CullMode::None => gl::Disable(gl::CULL_FACE),
            CullMode::Front => {
                gl::Enable(gl::CULL_FACE);
                gl::CullFace(gl::FRONT);
            }
            CullMode::Back => {
                gl::Enable(gl::CULL_FACE);
                gl::CullFace(gl::BACK);
            }
        }

        gl::FrontFace(if desc.back_face_ccw { gl::CW } else { gl::CCW });

        let fill = match desc.fill {
            FillMode::Solid => gl::FILL,
            FillMode::Wireframe => gl::LINE,
        };
        gl::PolygonMode(gl::FRONT_AND_BACK, fill);

        if desc.scissor {
            gl::Enable(gl::SCISSOR_TEST);
        } else {
            gl::Disable(gl::SCISSOR_TEST);
        }
    }

    unsafe fn apply_depth_stencil(&self, desc: &DepthStencilDesc) {
        if desc.depth_test {
            gl::Enable(gl::DEPTH_TEST);
            gl::DepthFunc(desc.comparison.into());
        } else {
            gl::Disable(gl::DEPTH_TEST);
        }

        gl::DepthMask(if desc.depth_write { gl::TRUE } else { gl::FALSE });
    }

    unsafe fn apply_blend(&self, desc: &BlendDesc) {
        if desc.enabled {
            gl::Enable(gl::BLEND);
            gl::BlendFuncSeparate(
                desc.src.into(),
                desc.dst.into(),
                desc.src_alpha.into(),
                desc.dst_alpha.into(),
            );
            gl::BlendEquationSeparate(desc.equation.into(), desc.equation_alpha.into());
        } else {
            gl::Disable(gl::BLEND);
        }
    }

    fn state(&self, state: Option<Bound>) -> Option<GLState> {
        let state = state?;
        let v = self.states.get(&state.native).cloned();
        if v.is_none() {
            warn!("[GL] State object {} is unknown.", state.native);
        }

        v
    }

    fn texture_format(&self, texture: Bound) -> Result<(GLuint, TextureFormat)> {
        let name = texture.native.raw() as GLuint;
        let format = self
            .textures
            .get(&name)
            .cloned()
            .ok_or_else(|| format_err!("[GL] Texture {} is unknown.", texture.native))?;

        Ok((name, format))
    }
}

impl Drop for GLBackend {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteFramebuffers(1, &self.framebuffer);
            gl::DeleteProgramPipelines(1, &self.pipeline);
            gl::DeleteVertexArrays(1, &self.vao);
            if let Err(err) = check() {
                warn!("{}", err);
            }
        }
    }
}

#[inline]
fn names(values: &[Option<Bound>]) -> SmallVec<[GLuint; 8]> {
    values
        .iter()
        .map(|v| v.map(|v| v.native.raw() as GLuint).unwrap_or(0))
        .collect()
}

#[inline]
fn unit(stage: ShaderStage, capacity: usize, start: usize) -> GLuint {
    (stage.index() * capacity + start) as GLuint
}

impl Backend for GLBackend {
    unsafe fn create_buffer(
        &mut self,
        params: &BufferParams,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle> {
        let mut id = 0;
        gl::CreateBuffers(1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to create buffer.");
        }

        gl::NamedBufferData(id, params.size as GLsizeiptr, ptr::null(), params.usage.into());
        if let Some(bytes) = data {
            if !bytes.is_empty() {
                gl::NamedBufferSubData(
                    id,
                    0,
                    bytes.len() as GLsizeiptr,
                    bytes.as_ptr() as *const c_void,
                );
            }
        }

        check()?;
        self.buffers.insert(
            id,
            GLBuffer {
                size: params.size,
                mapped: None,
            },
        );

        Ok(NativeHandle(u64::from(id)))
    }

    unsafe fn delete_buffer(&mut self, buffer: NativeHandle) -> Result<()> {
        let id = buffer.raw() as GLuint;
        match self.buffers.remove(&id) {
            Some(GLBuffer {
                mapped: Some(_), ..
            }) => {
                gl::UnmapNamedBuffer(id);
                warn!("[GL] Buffer {} is deleted while mapped.", buffer);
            }
            Some(_) => {}
            None => bail!("[GL] Buffer {} is unknown.", buffer),
        }

        gl::DeleteBuffers(1, &id);
        check()
    }

    unsafe fn map_buffer(&mut self, buffer: NativeHandle, mode: MapMode) -> Result<()> {
        let id = buffer.raw() as GLuint;
        let v = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| format_err!("[GL] Buffer {} is unknown.", buffer))?;

        if v.mapped.is_some() {
            bail!("[GL] Buffer {} is mapped twice.", buffer);
        }

        let p = gl::MapNamedBufferRange(id, 0, v.size as GLsizeiptr, mode.into());
        check()?;
        if p.is_null() {
            bail!("[GL] Failed to map buffer {}.", buffer);
        }

        v.mapped = Some(p as *mut u8);
        Ok(())
    }

    unsafe fn write_mapped(
        &mut self,
        buffer: NativeHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<()> {
        let v = self
            .buffers
            .get(&(buffer.raw() as GLuint))
            .ok_or_else(|| format_err!("[GL] Buffer {} is unknown.", buffer))?;

        let p = v
            .mapped
            .ok_or_else(|| format_err!("[GL] Buffer {} is written while unmapped.", buffer))?;

        if offset.checked_add(bytes.len()).map_or(true, |end| end > v.size) {
            bail!(
                "[GL] Writing {} bytes at {} overflows buffer {} of {} bytes.",
                bytes.len(),
                offset,
                buffer,
                v.size
            );
        }

        ptr::copy_nonoverlapping(bytes.as_ptr(), p.add(offset), bytes.len());
        Ok(())
    }

    unsafe fn unmap_buffer(&mut self, buffer: NativeHandle) -> Result<()> {
        let id = buffer.raw() as GLuint;
        let v = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| format_err!("[GL] Buffer {} is unknown.", buffer))?;

        if v.mapped.take().is_none() {
            bail!("[GL] Buffer {} is not mapped.", buffer);
        }

        if gl::UnmapNamedBuffer(id) == gl::FALSE {
            warn!("[GL] Contents of buffer {} got corrupted while mapped.", buffer);
        }

        check()
    }

    unsafe fn create_texture(
        &mut self,
        params: &TextureParams,
        data: Option<&[u8]>,
    ) -> Result<TextureViews> {
        let mut id = 0;
        gl::CreateTextures(gl::TEXTURE_2D, 1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to create texture.");
        }

        let (internal, format, tp) = types::texture_format(params.format);
        let (w, h) = (params.dimensions.x as GLsizei, params.dimensions.y as GLsizei);
        gl::TextureStorage2D(id, 1, internal, w, h);
        gl::TextureParameteri(id, gl::TEXTURE_MAX_LEVEL, 0);

        if let Some(bytes) = data {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TextureSubImage2D(id, 0, 0, 0, w, h, format, tp, bytes.as_ptr() as *const c_void);
        }

        check()?;
        self.textures.insert(id, params.format);

        let name = NativeHandle(u64::from(id));
        let usage = params.usage;
        Ok(TextureViews {
            shader_resource: if usage.shader_resource { Some(name) } else { None },
            render_target: if usage.render_target { Some(name) } else { None },
            depth_stencil: if usage.depth_stencil { Some(name) } else { None },
        })
    }

    unsafe fn delete_texture(&mut self, views: TextureViews) -> Result<()> {
        let name = views
            .shader_resource
            .or(views.render_target)
            .or(views.depth_stencil)
            .ok_or_else(|| format_err!("[GL] Texture without views."))?;

        let id = name.raw() as GLuint;
        if self.textures.remove(&id).is_none() {
            bail!("[GL] Texture {} is unknown.", name);
        }

        gl::DeleteTextures(1, &id);
        check()
    }

    unsafe fn create_sampler(&mut self, params: &SamplerParams) -> Result<NativeHandle> {
        let mut id = 0;
        gl::CreateSamplers(1, &mut id);

        let wrap: GLenum = params.wrap.into();
        let filter: GLenum = params.filter.into();
        gl::SamplerParameteri(id, gl::TEXTURE_WRAP_S, wrap as GLint);
        gl::SamplerParameteri(id, gl::TEXTURE_WRAP_T, wrap as GLint);
        gl::SamplerParameteri(id, gl::TEXTURE_MIN_FILTER, filter as GLint);
        gl::SamplerParameteri(id, gl::TEXTURE_MAG_FILTER, filter as GLint);

        check()?;
        Ok(NativeHandle(u64::from(id)))
    }

    unsafe fn delete_sampler(&mut self, sampler: NativeHandle) -> Result<()> {
        let id = sampler.raw() as GLuint;
        gl::DeleteSamplers(1, &id);
        check()
    }

    unsafe fn create_shader(&mut self, stage: ShaderStage, source: &str) -> Result<NativeHandle> {
        let src = CString::new(source.as_bytes())
            .map_err(|_| format_err!("[GL] {:?} shader source contains NUL.", stage))?;

        let program = gl::CreateShaderProgramv(stage.into(), 1, &src.as_ptr());
        if program == 0 {
            check()?;
            bail!("[GL] Failed to create {:?} shader.", stage);
        }

        let mut status = GLint::from(gl::FALSE);
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

        if status != GLint::from(gl::TRUE) {
            let mut len = 0;
            gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);
            let mut buf = vec![0u8; len.max(1) as usize];
            gl::GetProgramInfoLog(
                program,
                len,
                ptr::null_mut(),
                buf.as_mut_ptr() as *mut GLchar,
            );

            gl::DeleteProgram(program);
            let log = String::from_utf8_lossy(&buf);
            bail!("[GL] {:?} shader failed to build.\n{}", stage, log.trim_end_matches('\0'));
        }

        Ok(NativeHandle(u64::from(program)))
    }

    unsafe fn delete_shader(&mut self, shader: NativeHandle) -> Result<()> {
        gl::DeleteProgram(shader.raw() as GLuint);
        check()
    }

    unsafe fn create_input_layout(&mut self, params: &InputLayoutParams) -> Result<NativeHandle> {
        let native = self.alloc();
        self.layouts.insert(native, params.clone());
        Ok(native)
    }

    unsafe fn delete_input_layout(&mut self, layout: NativeHandle) -> Result<()> {
        match self.layouts.remove(&layout) {
            Some(_) => Ok(()),
            None => bail!("[GL] Input layout {} is unknown.", layout),
        }
    }

    unsafe fn create_raster_state(&mut self, desc: &RasterDesc) -> Result<NativeHandle> {
        let native = self.alloc();
        self.states.insert(native, GLState::Raster(*desc));
        Ok(native)
    }

    unsafe fn create_depth_stencil_state(
        &mut self,
        desc: &DepthStencilDesc,
    ) -> Result<NativeHandle> {
        let native = self.alloc();
        self.states.insert(native, GLState::DepthStencil(*desc));
        Ok(native)
    }

    unsafe fn create_blend_state(&mut self, desc: &BlendDesc) -> Result<NativeHandle> {
        let native = self.alloc();
        self.states.insert(native, GLState::Blend(*desc));
        Ok(native)
    }

    unsafe fn delete_state(&mut self, state: NativeHandle) -> Result<()> {
        match self.states.remove(&state) {
            Some(_) => Ok(()),
            None => bail!("[GL] State object {} is unknown.", state),
        }
    }

    unsafe fn bind_vertex_buffers(&mut self, start: usize, buffers: &[VertexBufferBinding]) {
        trace!("[GL] VertexArrayVertexBuffers [{}, {}).", start, start + buffers.len());
        let mut ids: SmallVec<[GLuint; 8]> = SmallVec::new();
        let mut offsets: SmallVec<[GLintptr; 8]> = SmallVec::new();
        let mut strides: SmallVec<[GLsizei; 8]> = SmallVec::new();

        for v in buffers {
            ids.push(v.buffer.map(|b| b.native.raw() as GLuint).unwrap_or(0));
            offsets.push(v.offset as GLintptr);
            strides.push(v.stride as GLsizei);
        }

        gl::VertexArrayVertexBuffers(
            self.vao,
            start as GLuint,
            buffers.len() as GLsizei,
            ids.as_ptr(),
            offsets.as_ptr(),
            strides.as_ptr(),
        );
    }

    unsafe fn bind_index_buffer(&mut self, buffer: Option<&IndexBufferBinding>) {
        match buffer {
            Some(v) => {
                gl::VertexArrayElementBuffer(self.vao, v.buffer.native.raw() as GLuint);
                self.index = Some((v.format, v.offset));
            }
            None => {
                gl::VertexArrayElementBuffer(self.vao, 0);
                self.index = None;
            }
        }
    }

    unsafe fn bind_constant_buffers(
        &mut self,
        stage: ShaderStage,
        start: usize,
        buffers: &[Option<Bound>],
    ) {
        let ids = names(buffers);
        trace!("[GL] BindBuffersBase {:?} {} {:?}.", stage, start, ids);
        gl::BindBuffersBase(
            gl::UNIFORM_BUFFER,
            unit(stage, MAX_CONSTANT_BUFFERS, start),
            ids.len() as GLsizei,
            ids.as_ptr(),
        );
    }

    unsafe fn bind_shader_resources(
        &mut self,
        stage: ShaderStage,
        start: usize,
        views: &[Option<Bound>],
    ) {
        let ids = names(views);
        trace!("[GL] BindTextures {:?} {} {:?}.", stage, start, ids);
        gl::BindTextures(
            unit(stage, MAX_SHADER_RESOURCES, start),
            ids.len() as GLsizei,
            ids.as_ptr(),
        );
    }

    unsafe fn bind_samplers(&mut self, stage: ShaderStage, start: usize, samplers: &[Option<Bound>]) {
        let ids = names(samplers);
        trace!("[GL] BindSamplers {:?} {} {:?}.", stage, start, ids);
        gl::BindSamplers(
            unit(stage, MAX_SAMPLERS, start),
            ids.len() as GLsizei,
            ids.as_ptr(),
        );
    }

    unsafe fn bind_render_targets(&mut self, targets: &[Option<Bound>], depth_stencil: Option<Bound>) {
        trace!("[GL] Framebuffer {:?} {:?}.", names(targets), depth_stencil);
        if targets.iter().all(|v| v.is_none()) && depth_stencil.is_none() {
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, 0);
            return;
        }

        let fbo = self.framebuffer;
        let mut draws: SmallVec<[GLenum; MAX_RENDER_TARGETS]> = SmallVec::new();
        for (i, v) in targets.iter().enumerate() {
            let attachment = gl::COLOR_ATTACHMENT0 + i as GLenum;
            let id = v.map(|v| v.native.raw() as GLuint).unwrap_or(0);
            gl::NamedFramebufferTexture(fbo, attachment, id, 0);
            draws.push(if id == 0 { gl::NONE } else { attachment });
        }

        gl::NamedFramebufferDrawBuffers(fbo, draws.len() as GLsizei, draws.as_ptr());

        gl::NamedFramebufferTexture(fbo, gl::DEPTH_STENCIL_ATTACHMENT, 0, 0);
        if let Some(v) = depth_stencil {
            match self.texture_format(v) {
                Ok((id, format)) => {
                    gl::NamedFramebufferTexture(fbo, types::depth_attachment(format), id, 0)
                }
                Err(err) => warn!("{}", err),
            }
        }

        let status = gl::CheckNamedFramebufferStatus(fbo, gl::DRAW_FRAMEBUFFER);
        if status != gl::FRAMEBUFFER_COMPLETE {
            warn!("[GL] Framebuffer is incomplete, status {:#x}.", status);
        }

        gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, fbo);
    }

    unsafe fn bind_input_layout(&mut self, layout: Option<Bound>) {
        for &location in &self.enabled_attributes {
            gl::DisableVertexArrayAttrib(self.vao, location);
        }

        self.enabled_attributes.clear();

        let params = match layout {
            Some(v) => match self.layouts.get(&v.native) {
                Some(params) => params,
                None => {
                    warn!("[GL] Input layout {} is unknown.", v.native);
                    return;
                }
            },
            None => return,
        };

        for v in &params.elements {
            let (size, tp, normalized, integer) = types::vertex_format(v.format);
            if integer {
                gl::VertexArrayAttribIFormat(self.vao, v.location, size, tp, v.byte_offset);
            } else {
                gl::VertexArrayAttribFormat(
                    self.vao,
                    v.location,
                    size,
                    tp,
                    normalized,
                    v.byte_offset,
                );
            }

            gl::VertexArrayAttribBinding(self.vao, v.location, v.buffer_slot);
            gl::VertexArrayBindingDivisor(self.vao, v.buffer_slot, v.per_instance as GLuint);
            gl::EnableVertexArrayAttrib(self.vao, v.location);
            self.enabled_attributes.push(v.location);
        }
    }

    unsafe fn bind_shader(&mut self, stage: ShaderStage, shader: Option<Bound>) {
        let program = shader.map(|v| v.native.raw() as GLuint).unwrap_or(0);
        trace!("[GL] UseProgramStages {:?} {}.", stage, program);
        gl::UseProgramStages(self.pipeline, types::stage_bit(stage), program);
    }

    unsafe fn bind_raster_state(&mut self, state: Option<Bound>) {
        match self.state(state) {
            Some(GLState::Raster(desc)) => self.apply_raster(&desc),
            _ => self.apply_raster(&RasterDesc::default()),
        }
    }

    unsafe fn bind_depth_stencil_state(&mut self, state: Option<Bound>) {
        match self.state(state) {
            Some(GLState::DepthStencil(desc)) => self.apply_depth_stencil(&desc),
            _ => self.apply_depth_stencil(&DepthStencilDesc::default()),
        }
    }

    unsafe fn bind_blend_state(&mut self, state: Option<Bound>) {
        match self.state(state) {
            Some(GLState::Blend(desc)) => self.apply_blend(&desc),
            _ => self.apply_blend(&BlendDesc::default()),
        }
    }

    unsafe fn set_viewport(&mut self, viewport: Viewport) {
        gl::ViewportIndexedf(0, viewport.x, viewport.y, viewport.width, viewport.height);
        gl::DepthRangef(viewport.min_depth, viewport.max_depth);
    }

    unsafe fn set_scissor(&mut self, scissor: ScissorRect) {
        gl::Scissor(
            scissor.x,
            scissor.y,
            scissor.width as GLsizei,
            scissor.height as GLsizei,
        );
    }

    unsafe fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology.into();
    }

    unsafe fn clear_render_target(&mut self, target: Bound, color: [f32; 4]) -> Result<()> {
        let (id, _) = self.texture_format(target)?;
        gl::ClearTexImage(id, 0, gl::RGBA, gl::FLOAT, color.as_ptr() as *const c_void);
        check()
    }

    unsafe fn clear_depth_stencil(&mut self, target: Bound, depth: f32) -> Result<()> {
        let (id, format) = self.texture_format(target)?;
        if format.has_stencil() {
            let value: [u32; 2] = [depth.to_bits(), 0];
            gl::ClearTexImage(
                id,
                0,
                gl::DEPTH_STENCIL,
                gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
                value.as_ptr() as *const c_void,
            );
        } else {
            gl::ClearTexImage(
                id,
                0,
                gl::DEPTH_COMPONENT,
                gl::FLOAT,
                &depth as *const f32 as *const c_void,
            );
        }

        check()
    }

    unsafe fn create_query(&mut self, kind: QueryKind) -> Result<NativeHandle> {
        let mut id = 0;
        gl::CreateQueries(kind.into(), 1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to create query.");
        }

        check()?;
        Ok(NativeHandle(u64::from(id)))
    }

    unsafe fn delete_query(&mut self, query: NativeHandle) -> Result<()> {
        let id = query.raw() as GLuint;
        gl::DeleteQueries(1, &id);
        check()
    }

    unsafe fn begin_query(&mut self, query: NativeHandle, kind: QueryKind) -> Result<()> {
        trace!("[GL] BeginQuery {:?} {}.", kind, query);
        gl::BeginQuery(kind.into(), query.raw() as GLuint);
        check()
    }

    unsafe fn end_query(&mut self, query: NativeHandle, kind: QueryKind) -> Result<()> {
        trace!("[GL] EndQuery {:?} {}.", kind, query);
        gl::EndQuery(kind.into());
        check()
    }

    unsafe fn query_result(&mut self, query: NativeHandle) -> Result<Option<u64>> {
        let id = query.raw() as GLuint;

        let mut available = 0;
        gl::GetQueryObjectiv(id, gl::QUERY_RESULT_AVAILABLE, &mut available);
        if available == 0 {
            check()?;
            return Ok(None);
        }

        let mut result: GLuint64 = 0;
        gl::GetQueryObjectui64v(id, gl::QUERY_RESULT, &mut result);
        check()?;
        Ok(Some(result))
    }

    unsafe fn draw(&mut self, vertices: u32, start_vertex: u32, instances: u32) -> Result<()> {
        trace!("[GL] DrawArraysInstanced {} {} {}.", vertices, start_vertex, instances);
        gl::DrawArraysInstanced(
            self.topology,
            start_vertex as GLint,
            vertices as GLsizei,
            instances as GLsizei,
        );

        check()
    }

    unsafe fn draw_indexed(
        &mut self,
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    ) -> Result<()> {
        let (format, offset) = self
            .index
            .ok_or_else(|| format_err!("[GL] Indexed draw without an index buffer."))?;

        let offset = offset as usize + start_index as usize * format.stride();
        trace!(
            "[GL] DrawElementsInstancedBaseVertex {} {} {} {}.",
            indices,
            offset,
            base_vertex,
            instances
        );
        gl::DrawElementsInstancedBaseVertex(
            self.topology,
            indices as GLsizei,
            format.into(),
            offset as *const c_void,
            instances as GLsizei,
            base_vertex,
        );

        check()
    }
}

unsafe fn check() -> Result<()> {
    let err = match gl::GetError() {
        gl::NO_ERROR => return Ok(()),
        gl::INVALID_ENUM => "An unacceptable value is specified for an enumerated argument.",
        gl::INVALID_VALUE => "A numeric argument is out of range.",
        gl::INVALID_OPERATION => "The specified operation is not allowed in the current state.",
        gl::INVALID_FRAMEBUFFER_OPERATION => {
            "The command is trying to render to or read from the framebuffer while the \
             currently bound framebuffer is not framebuffer complete."
        }
        gl::OUT_OF_MEMORY => "There is not enough memory left to execute the command.",
        _ => "Oops, Unknown OpenGL error.",
    };

    error!("[GL] {}", err);
    bail!("[GL] {}", err)
}
