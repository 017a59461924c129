//! GPU buffers and the per-slot values the cache keeps for vertex and index
//! buffer bindings.

use serde::{Deserialize, Serialize};

use super::Bound;
use crate::video::errors::{Error, Result};

/// What a buffer is going to be bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant,
}

/// Hint abouts the intended update strategy of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Initialized with data and never changed later.
    Immutable,
    /// Written by the CPU through `map`/`unmap`, usually once per frame.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferParams {
    pub kind: BufferKind,
    pub usage: BufferUsage,
    /// Size in bytes.
    pub size: usize,
}

impl BufferParams {
    pub fn new(kind: BufferKind, usage: BufferUsage, size: usize) -> Self {
        BufferParams { kind, usage, size }
    }

    pub fn validate(&self, data: Option<&[u8]>) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidUsage("buffer of zero size".into()));
        }

        match data {
            Some(bytes) if bytes.len() > self.size => Err(Error::OutOfBounds {
                offset: 0,
                len: bytes.len(),
                size: self.size,
            }),
            None if self.usage == BufferUsage::Immutable => Err(Error::InvalidUsage(
                "immutable buffer must be created with initial data".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// How the CPU is going to access a mapped buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// Previous contents are discarded; the driver may hand out fresh memory
    /// instead of waiting for the GPU.
    WriteDiscard,
    /// Writes that promise not to touch regions the GPU may still read.
    WriteNoOverwrite,
}

/// The format of indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// One vertex-buffer slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub buffer: Option<Bound>,
    pub stride: u32,
    pub offset: u32,
}

impl VertexBufferBinding {
    pub fn new(buffer: Bound, stride: u32, offset: u32) -> Self {
        VertexBufferBinding {
            buffer: Some(buffer),
            stride,
            offset,
        }
    }
}

/// The index-buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferBinding {
    pub buffer: Bound,
    pub format: IndexFormat,
    pub offset: u32,
}
