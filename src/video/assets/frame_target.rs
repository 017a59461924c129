//! A frame target is a set of texture attachments draws write into.

use super::TextureHandle;
use crate::video::errors::{Error, Result};
use crate::video::MAX_RENDER_TARGETS;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTargetParams {
    /// Color attachments, slot `i` of the vector goes to render-target slot `i`.
    pub colors: Vec<Option<TextureHandle>>,
    pub depth_stencil: Option<TextureHandle>,
}

impl FrameTargetParams {
    pub fn new() -> Self {
        FrameTargetParams::default()
    }

    /// Attaches `texture` to the render-target `slot`.
    pub fn with_color(mut self, slot: usize, texture: TextureHandle) -> Self {
        if self.colors.len() <= slot {
            self.colors.resize(slot + 1, None);
        }

        self.colors[slot] = Some(texture);
        self
    }

    pub fn with_depth_stencil(mut self, texture: TextureHandle) -> Self {
        self.depth_stencil = Some(texture);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.colors.len() > MAX_RENDER_TARGETS {
            return Err(Error::SlotOutOfRange {
                start: 0,
                count: self.colors.len(),
                capacity: MAX_RENDER_TARGETS,
            });
        }

        if self.colors.iter().all(|v| v.is_none()) && self.depth_stencil.is_none() {
            return Err(Error::FrameTargetInvalid(
                "at least one attachment is required".into(),
            ));
        }

        for (i, v) in self.colors.iter().enumerate() {
            if let Some(texture) = *v {
                if self.colors[..i].contains(&Some(texture)) {
                    return Err(Error::FrameTargetInvalid(format!(
                        "{} is attached twice",
                        texture
                    )));
                }
            }
        }

        Ok(())
    }
}
