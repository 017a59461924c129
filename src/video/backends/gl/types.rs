use gl;
use gl::types::*;

use super::super::super::assets::prelude::*;

impl From<BufferUsage> for GLenum {
    fn from(usage: BufferUsage) -> Self {
        match usage {
            BufferUsage::Immutable => gl::STATIC_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
        }
    }
}

impl From<MapMode> for GLbitfield {
    fn from(mode: MapMode) -> Self {
        match mode {
            MapMode::WriteDiscard => gl::MAP_WRITE_BIT | gl::MAP_INVALIDATE_BUFFER_BIT,
            MapMode::WriteNoOverwrite => gl::MAP_WRITE_BIT | gl::MAP_UNSYNCHRONIZED_BIT,
        }
    }
}

impl From<Comparison> for GLenum {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Never => gl::NEVER,
            Comparison::Less => gl::LESS,
            Comparison::LessOrEqual => gl::LEQUAL,
            Comparison::Greater => gl::GREATER,
            Comparison::GreaterOrEqual => gl::GEQUAL,
            Comparison::Equal => gl::EQUAL,
            Comparison::NotEqual => gl::NOTEQUAL,
            Comparison::Always => gl::ALWAYS,
        }
    }
}

impl From<Equation> for GLenum {
    fn from(eq: Equation) -> Self {
        match eq {
            Equation::Add => gl::FUNC_ADD,
            Equation::Subtract => gl::FUNC_SUBTRACT,
            Equation::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
            Equation::Min => gl::MIN,
            Equation::Max => gl::MAX,
        }
    }
}

impl From<BlendFactor> for GLenum {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => gl::ZERO,
            BlendFactor::One => gl::ONE,
            BlendFactor::SourceColor => gl::SRC_COLOR,
            BlendFactor::OneMinusSourceColor => gl::ONE_MINUS_SRC_COLOR,
            BlendFactor::SourceAlpha => gl::SRC_ALPHA,
            BlendFactor::OneMinusSourceAlpha => gl::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DestinationColor => gl::DST_COLOR,
            BlendFactor::OneMinusDestinationColor => gl::ONE_MINUS_DST_COLOR,
            BlendFactor::DestinationAlpha => gl::DST_ALPHA,
            BlendFactor::OneMinusDestinationAlpha => gl::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl From<PrimitiveTopology> for GLenum {
    fn from(topology: PrimitiveTopology) -> Self {
        match topology {
            PrimitiveTopology::PointList => gl::POINTS,
            PrimitiveTopology::LineList => gl::LINES,
            PrimitiveTopology::LineStrip => gl::LINE_STRIP,
            PrimitiveTopology::TriangleList => gl::TRIANGLES,
            PrimitiveTopology::TriangleStrip => gl::TRIANGLE_STRIP,
        }
    }
}

impl From<IndexFormat> for GLenum {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => gl::UNSIGNED_SHORT,
            IndexFormat::U32 => gl::UNSIGNED_INT,
        }
    }
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Repeat => gl::REPEAT,
            TextureWrap::Mirror => gl::MIRRORED_REPEAT,
            TextureWrap::Clamp => gl::CLAMP_TO_EDGE,
        }
    }
}

impl From<TextureFilter> for GLenum {
    fn from(filter: TextureFilter) -> Self {
        match filter {
            TextureFilter::Nearest => gl::NEAREST,
            TextureFilter::Linear => gl::LINEAR,
        }
    }
}

impl From<ShaderStage> for GLenum {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Pixel => gl::FRAGMENT_SHADER,
        }
    }
}

impl From<QueryKind> for GLenum {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::SamplesPassed => gl::SAMPLES_PASSED,
            QueryKind::AnySamplesPassed => gl::ANY_SAMPLES_PASSED,
        }
    }
}

/// The bit of `stage` in a program pipeline.
pub fn stage_bit(stage: ShaderStage) -> GLbitfield {
    match stage {
        ShaderStage::Vertex => gl::VERTEX_SHADER_BIT,
        ShaderStage::Pixel => gl::FRAGMENT_SHADER_BIT,
    }
}

/// Component count, component type, normalization and whether the attribute
/// is fetched as integer.
pub fn vertex_format(format: VertexFormat) -> (GLint, GLenum, GLboolean, bool) {
    match format {
        VertexFormat::Float1 => (1, gl::FLOAT, gl::FALSE, false),
        VertexFormat::Float2 => (2, gl::FLOAT, gl::FALSE, false),
        VertexFormat::Float3 => (3, gl::FLOAT, gl::FALSE, false),
        VertexFormat::Float4 => (4, gl::FLOAT, gl::FALSE, false),
        VertexFormat::UByte4Norm => (4, gl::UNSIGNED_BYTE, gl::TRUE, false),
        VertexFormat::Int1 => (1, gl::INT, gl::FALSE, true),
    }
}

/// Internal format, pixel format and pixel type.
pub fn texture_format(format: TextureFormat) -> (GLenum, GLenum, GLenum) {
    match format {
        TextureFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
        TextureFormat::RGBA8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        TextureFormat::RGBA16F => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
        TextureFormat::R32F => (gl::R32F, gl::RED, gl::FLOAT),
        TextureFormat::RGBA32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
        TextureFormat::Depth24Stencil8 => (
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
        ),
        TextureFormat::Depth32F => (gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT),
    }
}

/// The framebuffer attachment point of a depth format.
pub fn depth_attachment(format: TextureFormat) -> GLenum {
    if format.has_stencil() {
        gl::DEPTH_STENCIL_ATTACHMENT
    } else {
        gl::DEPTH_ATTACHMENT
    }
}
