//! Shader stages and vertex input layouts.

use serde::{Deserialize, Serialize};

use crate::video::errors::{Error, Result};
use crate::video::MAX_VERTEX_BUFFERS;

/// Programmable stages the cache keeps per-stage tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Pixel];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
        }
    }
}

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    UByte4Norm,
    Int1,
}

impl VertexFormat {
    /// Size in bytes.
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float1 | VertexFormat::UByte4Norm | VertexFormat::Int1 => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
        }
    }
}

/// One attribute of an input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexElement {
    /// Attribute location in the vertex shader.
    pub location: u32,
    pub format: VertexFormat,
    /// Vertex-buffer slot the attribute is fetched from.
    pub buffer_slot: u32,
    pub byte_offset: u32,
    /// Advance once per instance instead of once per vertex.
    pub per_instance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLayoutParams {
    pub elements: Vec<VertexElement>,
}

impl InputLayoutParams {
    pub fn new() -> Self {
        InputLayoutParams::default()
    }

    pub fn with(
        mut self,
        location: u32,
        format: VertexFormat,
        buffer_slot: u32,
        byte_offset: u32,
    ) -> Self {
        self.elements.push(VertexElement {
            location,
            format,
            buffer_slot,
            byte_offset,
            per_instance: false,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (i, v) in self.elements.iter().enumerate() {
            if v.buffer_slot as usize >= MAX_VERTEX_BUFFERS {
                return Err(Error::SlotOutOfRange {
                    start: v.buffer_slot as usize,
                    count: 1,
                    capacity: MAX_VERTEX_BUFFERS,
                });
            }

            if self.elements[..i].iter().any(|w| w.location == v.location) {
                return Err(Error::InvalidUsage(format!(
                    "attribute location {} is declared twice",
                    v.location
                )));
            }
        }

        Ok(())
    }
}
