//! An opaque description of everything one draw needs: program, vertex input,
//! bound uniforms, state objects and draw parameters.

use cgmath::{Matrix4, Vector2, Vector3, Vector4};
use smallvec::SmallVec;

use super::buffer::IndexFormat;
use super::shader::ShaderStage;
use super::state::PrimitiveTopology;
use super::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, InputLayoutHandle, ProgramHandle,
    RasterStateHandle, SamplerHandle, TextureHandle,
};

/// A numeric uniform value. Values are written tightly packed as native-endian
/// 32-bit words; matrices are column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    Vector2(Vector2<f32>),
    Vector3(Vector3<f32>),
    Vector4(Vector4<f32>),
    Matrix4(Matrix4<f32>),
}

impl UniformValue {
    /// Size in bytes.
    pub fn size(&self) -> usize {
        match *self {
            UniformValue::F32(_) | UniformValue::I32(_) => 4,
            UniformValue::Vector2(_) => 8,
            UniformValue::Vector3(_) => 12,
            UniformValue::Vector4(_) => 16,
            UniformValue::Matrix4(_) => 64,
        }
    }

    pub fn to_bytes(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();
        let mut push = |v: f32| bytes.extend_from_slice(&v.to_ne_bytes());

        match *self {
            UniformValue::F32(v) => push(v),
            UniformValue::I32(v) => push(f32::from_bits(v as u32)),
            UniformValue::Vector2(v) => {
                let v: &[f32; 2] = v.as_ref();
                v.iter().for_each(|&c| push(c));
            }
            UniformValue::Vector3(v) => {
                let v: &[f32; 3] = v.as_ref();
                v.iter().for_each(|&c| push(c));
            }
            UniformValue::Vector4(v) => {
                let v: &[f32; 4] = v.as_ref();
                v.iter().for_each(|&c| push(c));
            }
            UniformValue::Matrix4(m) => {
                let m: &[[f32; 4]; 4] = m.as_ref();
                m.iter().flat_map(|c| c.iter()).for_each(|&c| push(c));
            }
        }

        bytes
    }
}

/// Handles of a texture or sampler array. `None` entries bind null.
pub type UniformArray<H> = SmallVec<[Option<H>; 4]>;

/// A uniform bound by a draw call, tagged with where it goes.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundUniform {
    /// Written into the implicit uniform buffer of `stage` at `byte_offset`.
    Numeric {
        stage: ShaderStage,
        byte_offset: u32,
        value: UniformValue,
    },
    ConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: BufferHandle,
    },
    Texture {
        stage: ShaderStage,
        slot: u32,
        texture: TextureHandle,
    },
    Sampler {
        stage: ShaderStage,
        slot: u32,
        sampler: SamplerHandle,
    },
    /// Consecutive shader-resource slots starting at `slot`.
    TextureArray {
        stage: ShaderStage,
        slot: u32,
        textures: UniformArray<TextureHandle>,
    },
    /// Consecutive sampler slots starting at `slot`.
    SamplerArray {
        stage: ShaderStage,
        slot: u32,
        samplers: UniformArray<SamplerHandle>,
    },
}

impl BoundUniform {
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        match *self {
            BoundUniform::Numeric { stage, .. }
            | BoundUniform::ConstantBuffer { stage, .. }
            | BoundUniform::Texture { stage, .. }
            | BoundUniform::Sampler { stage, .. }
            | BoundUniform::TextureArray { stage, .. }
            | BoundUniform::SamplerArray { stage, .. } => stage,
        }
    }
}

/// A vertex buffer with the stride and byte offset it is read at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    pub buffer: BufferHandle,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStream {
    pub buffer: BufferHandle,
    /// May be omitted only when the context is not strict about index formats.
    pub format: Option<IndexFormat>,
    pub offset: u32,
}

/// Pipeline state besides program and uniforms. State objects left as `None`
/// fall back to the context's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateGroup {
    /// Slot `i` of the vector goes to vertex-buffer slot `i`.
    pub vertex_buffers: SmallVec<[Option<VertexStream>; 4]>,
    pub input_layout: Option<InputLayoutHandle>,
    pub index_buffer: Option<IndexStream>,
    pub topology: Option<PrimitiveTopology>,
    pub raster: Option<RasterStateHandle>,
    pub depth_stencil: Option<DepthStencilStateHandle>,
    pub blend: Option<BlendStateHandle>,
}

/// Draw parameters. An instance count other than 1 issues an instanced draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawExec {
    Linear {
        vertices: u32,
        start_vertex: u32,
        instances: u32,
    },
    Indexed {
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    },
}

impl DrawExec {
    /// Vertices, or indices for indexed draws.
    #[inline]
    pub fn count(&self) -> u32 {
        match *self {
            DrawExec::Linear { vertices, .. } => vertices,
            DrawExec::Indexed { indices, .. } => indices,
        }
    }

    #[inline]
    pub fn instances(&self) -> u32 {
        match *self {
            DrawExec::Linear { instances, .. } | DrawExec::Indexed { instances, .. } => instances,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawCall {
    pub program: Option<ProgramHandle>,
    pub state: StateGroup,
    pub uniforms: Vec<BoundUniform>,
    pub exec: Option<DrawExec>,
}

impl DrawCall {
    pub fn new(program: ProgramHandle) -> Self {
        DrawCall {
            program: Some(program),
            ..DrawCall::default()
        }
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) -> &mut Self {
        self.state.topology = Some(topology);
        self
    }

    pub fn set_input_layout(&mut self, layout: InputLayoutHandle) -> &mut Self {
        self.state.input_layout = Some(layout);
        self
    }

    pub fn set_vertex_buffer(
        &mut self,
        slot: usize,
        buffer: BufferHandle,
        stride: u32,
        offset: u32,
    ) -> &mut Self {
        let vbs = &mut self.state.vertex_buffers;
        if vbs.len() <= slot {
            vbs.resize(slot + 1, None);
        }

        vbs[slot] = Some(VertexStream {
            buffer,
            stride,
            offset,
        });
        self
    }

    pub fn set_index_buffer(
        &mut self,
        buffer: BufferHandle,
        format: IndexFormat,
        offset: u32,
    ) -> &mut Self {
        self.state.index_buffer = Some(IndexStream {
            buffer,
            format: Some(format),
            offset,
        });
        self
    }

    pub fn set_raster_state(&mut self, state: RasterStateHandle) -> &mut Self {
        self.state.raster = Some(state);
        self
    }

    pub fn set_depth_stencil_state(&mut self, state: DepthStencilStateHandle) -> &mut Self {
        self.state.depth_stencil = Some(state);
        self
    }

    pub fn set_blend_state(&mut self, state: BlendStateHandle) -> &mut Self {
        self.state.blend = Some(state);
        self
    }

    pub fn set_uniform(&mut self, uniform: BoundUniform) -> &mut Self {
        self.uniforms.push(uniform);
        self
    }

    pub fn draw(&mut self, vertices: u32, start_vertex: u32, instances: u32) -> &mut Self {
        self.exec = Some(DrawExec::Linear {
            vertices,
            start_vertex,
            instances,
        });
        self
    }

    pub fn draw_indexed(
        &mut self,
        indices: u32,
        start_index: u32,
        base_vertex: i32,
        instances: u32,
    ) -> &mut Self {
        self.exec = Some(DrawExec::Indexed {
            indices,
            start_index,
            base_vertex,
            instances,
        });
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uniform_bytes() {
        let v = UniformValue::Vector3(Vector3::new(1.0, 2.0, 3.0));
        let bytes = v.to_bytes();
        assert_eq!(bytes.len(), v.size());
        assert_eq!(&bytes[4..8], &2.0f32.to_ne_bytes());

        let m = UniformValue::Matrix4(Matrix4::from_scale(2.0));
        let bytes = m.to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[0..4], &2.0f32.to_ne_bytes());
        assert_eq!(&bytes[60..64], &1.0f32.to_ne_bytes());

        let i = UniformValue::I32(-7);
        assert_eq!(&i.to_bytes()[..], &(-7i32).to_ne_bytes());
    }

    #[test]
    fn builder() {
        let mut dc = DrawCall::default();
        dc.set_vertex_buffer(2, BufferHandle::default(), 12, 0)
            .set_topology(PrimitiveTopology::LineList)
            .draw(4, 0, 1);

        assert_eq!(dc.state.vertex_buffers.len(), 3);
        assert!(dc.state.vertex_buffers[0].is_none());
        assert_eq!(dc.exec.map(|v| v.count()), Some(4));
        assert!(dc.program.is_none());
    }
}
