//! The OpenGL 4.5 backend.

pub mod backend;
pub mod capabilities;
pub mod types;

pub use self::backend::GLBackend;

use std::os::raw::c_void;

use gl;

use crate::errors::*;

impl GLBackend {
    /// Loads the GL functions with `loader` and creates a backend over the
    /// current context. With glutin this is
    /// `GLBackend::load(|s| window.get_proc_address(s) as *const _)`.
    pub unsafe fn load<F>(loader: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self::new()
    }
}
