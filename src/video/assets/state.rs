//! Fixed-function state: rasterizer, depth-stencil and blend descriptors,
//! viewport, scissor and primitive topology.

use serde::{Deserialize, Serialize};

/// Specify whether front- or back-facing polygons can be culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterDesc {
    /// Counter-clockwise winding is the back face.
    pub back_face_ccw: bool,
    pub cull: CullMode,
    pub fill: FillMode,
    /// Enables the scissor test. Draws then require a scissor rect.
    pub scissor: bool,
}

impl Default for RasterDesc {
    fn default() -> Self {
        RasterDesc {
            back_face_ccw: false,
            cull: CullMode::Back,
            fill: FillMode::Solid,
            scissor: false,
        }
    }
}

/// A pixel-wise comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Never,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub comparison: Comparison,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        DepthStencilDesc {
            depth_test: true,
            depth_write: true,
            comparison: Comparison::Less,
        }
    }
}

/// Specifies how incoming RGBA values (source) and the RGBA in framebuffer
/// (destination) are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Equation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendDesc {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub equation: Equation,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub equation_alpha: Equation,
}

impl Default for BlendDesc {
    fn default() -> Self {
        BlendDesc {
            enabled: false,
            src: BlendFactor::One,
            dst: BlendFactor::Zero,
            equation: Equation::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            equation_alpha: Equation::Add,
        }
    }
}

impl BlendDesc {
    /// Classic `src * a + dst * (1 - a)` blending.
    pub fn alpha() -> Self {
        BlendDesc {
            enabled: true,
            src: BlendFactor::SourceAlpha,
            dst: BlendFactor::OneMinusSourceAlpha,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::OneMinusSourceAlpha,
            ..BlendDesc::default()
        }
    }
}

/// The viewport transform, in pixels of the bound frame target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `width` x `height` pixels with the full depth range.
    pub fn full(width: u32, height: u32) -> Self {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in pixels. Only honored when the rasterizer enables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Number of primitives `count` vertices (or indices) assemble into.
    pub fn primitives_for(self, count: u32) -> u32 {
        match self {
            PrimitiveTopology::PointList => count,
            PrimitiveTopology::LineList => count / 2,
            PrimitiveTopology::LineStrip => count.saturating_sub(1),
            PrimitiveTopology::TriangleList => count / 3,
            PrimitiveTopology::TriangleStrip => count.saturating_sub(2),
        }
    }
}
