pub use crate::errors::*;
pub use crate::utils::prelude::*;
pub use crate::video::prelude::*;
pub use cgmath::Vector2;
