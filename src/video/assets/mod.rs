//! Descriptors and handles of every object the pipeline can bind.

pub mod buffer;
pub mod drawcall;
pub mod frame_target;
pub mod query;
pub mod shader;
pub mod state;
pub mod texture;

use std::fmt;

impl_handle!(BufferHandle);
impl_handle!(TextureHandle);
impl_handle!(SamplerHandle);
impl_handle!(ShaderHandle);
impl_handle!(ProgramHandle);
impl_handle!(InputLayoutHandle);
impl_handle!(RasterStateHandle);
impl_handle!(DepthStencilStateHandle);
impl_handle!(BlendStateHandle);
impl_handle!(FrameTargetHandle);
impl_handle!(QueryHandle);

/// The underlying resource a bound value wraps.
///
/// Two views of one texture (say a shader-resource view and a render-target view)
/// are different bound values but share the same `ResourceId`. Hazard resolution
/// and unbind-on-destroy match on this identity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    Sampler(SamplerHandle),
    Shader(ShaderHandle),
    InputLayout(InputLayoutHandle),
    RasterState(RasterStateHandle),
    DepthStencilState(DepthStencilStateHandle),
    BlendState(BlendStateHandle),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ResourceId::Buffer(h) => write!(f, "{}", h),
            ResourceId::Texture(h) => write!(f, "{}", h),
            ResourceId::Sampler(h) => write!(f, "{}", h),
            ResourceId::Shader(h) => write!(f, "{}", h),
            ResourceId::InputLayout(h) => write!(f, "{}", h),
            ResourceId::RasterState(h) => write!(f, "{}", h),
            ResourceId::DepthStencilState(h) => write!(f, "{}", h),
            ResourceId::BlendState(h) => write!(f, "{}", h),
        }
    }
}

macro_rules! impl_resource_id {
    ($($handle:ident => $variant:ident),* $(,)*) => {
        $(
            impl From<$handle> for ResourceId {
                #[inline]
                fn from(handle: $handle) -> Self {
                    ResourceId::$variant(handle)
                }
            }
        )*
    };
}

impl_resource_id! {
    BufferHandle => Buffer,
    TextureHandle => Texture,
    SamplerHandle => Sampler,
    ShaderHandle => Shader,
    InputLayoutHandle => InputLayout,
    RasterStateHandle => RasterState,
    DepthStencilStateHandle => DepthStencilState,
    BlendStateHandle => BlendState,
}

/// An opaque native object name handed out by a backend (GL object names, or
/// pointers of a COM-style API).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The capability every bindable value exposes to the state cache.
pub trait BindableResource {
    /// The underlying resource this value wraps.
    fn resource_id(&self) -> ResourceId;

    /// The native name that goes into a bind call.
    fn native(&self) -> NativeHandle;

    #[inline]
    fn bound(&self) -> Bound {
        Bound {
            resource: self.resource_id(),
            native: self.native(),
        }
    }
}

/// A value stored in one slot of the state cache. Equality is handle equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    pub resource: ResourceId,
    pub native: NativeHandle,
}

impl Bound {
    #[inline]
    pub fn new(resource: ResourceId, native: NativeHandle) -> Self {
        Bound { resource, native }
    }
}

impl BindableResource for Bound {
    #[inline]
    fn resource_id(&self) -> ResourceId {
        self.resource
    }

    #[inline]
    fn native(&self) -> NativeHandle {
        self.native
    }

    #[inline]
    fn bound(&self) -> Bound {
        *self
    }
}

/// Returns true if `slot` holds a value wrapping `resource`.
#[inline]
pub(crate) fn holds(slot: &Option<Bound>, resource: ResourceId) -> bool {
    match *slot {
        Some(ref v) => v.resource_id() == resource,
        None => false,
    }
}

pub mod prelude {
    pub use super::buffer::{
        BufferKind, BufferParams, BufferUsage, IndexBufferBinding, IndexFormat, MapMode,
        VertexBufferBinding,
    };
    pub use super::drawcall::{
        BoundUniform, DrawCall, DrawExec, IndexStream, StateGroup, UniformArray, UniformValue,
        VertexStream,
    };
    pub use super::frame_target::FrameTargetParams;
    pub use super::query::{QueryKind, QueryState};
    pub use super::shader::{InputLayoutParams, ShaderStage, VertexElement, VertexFormat};
    pub use super::state::{
        BlendDesc, BlendFactor, Comparison, CullMode, DepthStencilDesc, Equation, FillMode,
        PrimitiveTopology, RasterDesc, ScissorRect, Viewport,
    };
    pub use super::texture::{
        SamplerParams, TextureFilter, TextureFormat, TextureParams, TextureUsage, TextureViews,
        TextureWrap,
    };
    pub use super::{
        BindableResource, BlendStateHandle, Bound, BufferHandle, DepthStencilStateHandle,
        FrameTargetHandle, InputLayoutHandle, NativeHandle, ProgramHandle, QueryHandle,
        RasterStateHandle, ResourceId, SamplerHandle, ShaderHandle, TextureHandle,
    };
}
