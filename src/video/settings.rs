//! Parameters of a rendering context.

use serde::{Deserialize, Serialize};

use crate::errors::*;

/// A structure containing configuration data of one `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextParams {
    /// Byte size of the implicit uniform buffer each shader stage writes its
    /// numeric uniforms into. A size of 0 disables numeric uniforms.
    pub global_uniforms_size: usize,
    /// Logs a warning whenever a read/write hazard gets resolved.
    pub warn_on_hazard: bool,
    /// Rejects index buffers given without an explicit index format. Otherwise
    /// 32-bit indices are assumed.
    pub strict_index_format: bool,
}

impl Default for ContextParams {
    fn default() -> Self {
        ContextParams {
            global_uniforms_size: 4096,
            warn_on_hazard: cfg!(debug_assertions),
            strict_index_format: true,
        }
    }
}

impl ContextParams {
    /// Loads parameters from a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: ContextParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.global_uniforms_size % 16 != 0 {
            bail!(
                "The size of implicit uniform buffers must be a multiple of 16, got {}.",
                self.global_uniforms_size
            );
        }

        Ok(())
    }
}
