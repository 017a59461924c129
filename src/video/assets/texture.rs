//! 2D textures and samplers. A texture is the source of a texture access from a
//! shader, and can be the attachment of a frame target.

use cgmath::Vector2;
use serde::{Deserialize, Serialize};

use super::NativeHandle;
use crate::video::errors::{Error, Result};

/// The parameters of a texture object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureParams {
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub dimensions: Vector2<u32>,
}

impl Default for TextureParams {
    fn default() -> Self {
        TextureParams {
            format: TextureFormat::RGBA8,
            usage: TextureUsage::default(),
            dimensions: Vector2::new(0, 0),
        }
    }
}

impl TextureParams {
    pub fn validate(&self, data: Option<&[u8]>) -> Result<()> {
        if self.dimensions.x == 0 || self.dimensions.y == 0 {
            return Err(Error::InvalidUsage("texture of zero extent".into()));
        }

        if self.format.is_depth() {
            if self.usage.render_target {
                return Err(Error::InvalidUsage(
                    "depth formats can not be bound as render target".into(),
                ));
            }
        } else if self.usage.depth_stencil {
            return Err(Error::InvalidUsage(format!(
                "{:?} can not be bound as depth-stencil",
                self.format
            )));
        }

        if !self.usage.shader_resource && !self.usage.render_target && !self.usage.depth_stencil {
            return Err(Error::InvalidUsage("texture must be bindable somewhere".into()));
        }

        if let Some(bytes) = data {
            let size = self.format.size() * self.dimensions.x as usize * self.dimensions.y as usize;
            if bytes.len() > size {
                return Err(Error::OutOfBounds {
                    offset: 0,
                    len: bytes.len(),
                    size,
                });
            }
        }

        Ok(())
    }
}

/// Where a texture can be bound. Every set flag gets its own native view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureUsage {
    pub shader_resource: bool,
    pub render_target: bool,
    pub depth_stencil: bool,
}

impl Default for TextureUsage {
    fn default() -> Self {
        TextureUsage {
            shader_resource: true,
            render_target: false,
            depth_stencil: false,
        }
    }
}

impl TextureUsage {
    pub fn render_target() -> Self {
        TextureUsage {
            shader_resource: true,
            render_target: true,
            depth_stencil: false,
        }
    }

    pub fn depth_stencil() -> Self {
        TextureUsage {
            shader_resource: false,
            render_target: false,
            depth_stencil: true,
        }
    }
}

/// List of all the supported texel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    R8,
    RGBA8,
    RGBA16F,
    R32F,
    RGBA32F,
    Depth24Stencil8,
    Depth32F,
}

impl TextureFormat {
    /// Returns the size in bytes of a texel.
    pub fn size(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::RGBA8
            | TextureFormat::R32F
            | TextureFormat::Depth24Stencil8
            | TextureFormat::Depth32F => 4,
            TextureFormat::RGBA16F => 8,
            TextureFormat::RGBA32F => 16,
        }
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        self == TextureFormat::Depth24Stencil8 || self == TextureFormat::Depth32F
    }

    #[inline]
    pub fn has_stencil(self) -> bool {
        self == TextureFormat::Depth24Stencil8
    }
}

/// The native views of one texture. A backend may hand out one name for all of
/// them (OpenGL) or one object per view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextureViews {
    pub shader_resource: Option<NativeHandle>,
    pub render_target: Option<NativeHandle>,
    pub depth_stencil: Option<NativeHandle>,
}

/// Specify how the texture is used whenever the pixel being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Sets the wrap parameter for texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerParams {
    pub filter: TextureFilter,
    pub wrap: TextureWrap,
}

impl Default for SamplerParams {
    fn default() -> Self {
        SamplerParams {
            filter: TextureFilter::Linear,
            wrap: TextureWrap::Clamp,
        }
    }
}
