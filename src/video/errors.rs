use super::assets::prelude::*;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
    #[fail(display = "{} is invalid.", _0)]
    BufferHandleInvalid(BufferHandle),
    #[fail(display = "{} is invalid.", _0)]
    TextureHandleInvalid(TextureHandle),
    #[fail(display = "{} is invalid.", _0)]
    SamplerHandleInvalid(SamplerHandle),
    #[fail(display = "{} is invalid.", _0)]
    ShaderHandleInvalid(ShaderHandle),
    #[fail(display = "{} is invalid.", _0)]
    ProgramHandleInvalid(ProgramHandle),
    #[fail(display = "{} is invalid.", _0)]
    InputLayoutHandleInvalid(InputLayoutHandle),
    #[fail(display = "{} is invalid.", _0)]
    RasterStateHandleInvalid(RasterStateHandle),
    #[fail(display = "{} is invalid.", _0)]
    DepthStencilStateHandleInvalid(DepthStencilStateHandle),
    #[fail(display = "{} is invalid.", _0)]
    BlendStateHandleInvalid(BlendStateHandle),
    #[fail(display = "{} is invalid.", _0)]
    FrameTargetHandleInvalid(FrameTargetHandle),
    #[fail(display = "{} is invalid.", _0)]
    QueryHandleInvalid(QueryHandle),
    #[fail(display = "Draw call has no shading program attached.")]
    MissingProgram,
    #[fail(display = "Rasterizer enables scissoring but no scissor rect is given.")]
    MissingScissor,
    #[fail(display = "Draw call has no draw parameters.")]
    MissingDrawParams,
    #[fail(display = "Draw call has no primitive topology.")]
    MissingTopology,
    #[fail(display = "Indexed draw without an index buffer.")]
    MissingIndexBuffer,
    #[fail(display = "Index buffer without an index format.")]
    MissingIndexFormat,
    #[fail(display = "{} is mapped.", _0)]
    BufferMapped(ResourceId),
    #[fail(display = "{} is not mapped.", _0)]
    BufferNotMapped(ResourceId),
    #[fail(
        display = "Slots [{}, {}+{}) exceed the capacity {}.",
        start, start, count, capacity
    )]
    SlotOutOfRange {
        start: usize,
        count: usize,
        capacity: usize,
    },
    #[fail(
        display = "Writing {} bytes at {} overflows a region of {} bytes.",
        len, offset, size
    )]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[fail(
        display = "Numeric uniform at [{}, {}) does not fit the {:?} uniform buffer of {} bytes.",
        offset, end, stage, size
    )]
    UniformOutOfBounds {
        stage: ShaderStage,
        offset: usize,
        end: usize,
        size: usize,
    },
    #[fail(display = "Context has no implicit uniform buffer for {:?} stage.", _0)]
    NoGlobalUniformBuffer(ShaderStage),
    #[fail(display = "Invalid usage: {}.", _0)]
    InvalidUsage(String),
    #[fail(display = "Invalid frame target: {}.", _0)]
    FrameTargetInvalid(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<failure::Error> for Error {
    fn from(err: failure::Error) -> Error {
        Error::Backend(format!("{}", err))
    }
}
