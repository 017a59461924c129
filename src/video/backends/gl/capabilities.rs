use std::cmp;
use std::ffi;

use gl;
use gl::types::*;

use crate::errors::*;
use crate::video::{
    MAX_CONSTANT_BUFFERS, MAX_RENDER_TARGETS, MAX_SAMPLERS, MAX_SHADER_RESOURCES,
    MAX_VERTEX_BUFFERS, NUM_STAGES,
};

/// Describes the OpenGL context profile.
#[derive(Debug, Copy, Clone)]
pub enum Profile {
    /// The context uses only future-compatible functions and definitions.
    Core,
    /// The context includes all immediate mode functions and definitions.
    Compatibility,
}

/// Describes a version.
///
/// A version can only be compared to another version if they belong to the same API.
/// For example, both `Version::GL(3, 0) >= Version::ES(3, 0)` and `Version::ES(3, 0) >=
/// Version::GL(3, 0)` return `false`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    /// Regular OpenGL.
    GL(u8, u8),
    /// OpenGL embedded system.
    ES(u8, u8),
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<cmp::Ordering> {
        let (es1, major1, minor1) = match *self {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        let (es2, major2, minor2) = match *other {
            Version::GL(major, minor) => (false, major, minor),
            Version::ES(major, minor) => (true, major, minor),
        };

        if es1 != es2 {
            None
        } else {
            match major1.cmp(&major2) {
                cmp::Ordering::Equal => Some(minor1.cmp(&minor2)),
                v => Some(v),
            }
        }
    }
}

impl Version {
    /// Parses a `GL_VERSION` string, like `4.5.0 NVIDIA 390.77` or
    /// `OpenGL ES 3.2 Mesa 18.0.5`.
    pub fn from_str(desc: &str) -> Result<Version> {
        let (es, desc) = if desc.starts_with("OpenGL ES ") {
            (true, &desc[10..])
        } else if desc.starts_with("OpenGL ES-") {
            (true, &desc[13..])
        } else {
            (false, desc)
        };

        let desc = desc
            .split(' ')
            .next()
            .ok_or_else(|| format_err!("[GL] Version string {:?} is unformaled.", desc))?;

        let mut iter = desc.split('.');
        let mut next = || -> Result<u8> {
            iter.next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| format_err!("[GL] Version string {:?} is unformaled.", desc))
        };

        let major = next()?;
        let minor = next()?;

        if es {
            Ok(Version::ES(major, minor))
        } else {
            Ok(Version::GL(major, minor))
        }
    }

    /// Obtains the OpenGL version of the current context using the loaded functions.
    ///
    /// # Unsafe
    ///
    /// You must ensure that the functions belong to the current context, otherwise you will get
    /// an undefined behavior.
    pub unsafe fn parse() -> Result<Version> {
        Version::from_str(&parse_str(gl::VERSION)?)
    }
}

macro_rules! extensions {
    ($($string:expr => $field:ident,)+) => {
        /// Contains data about the list of extensions.
        #[derive(Debug, Clone, Copy, Default)]
        pub struct Extensions {
            $(
                pub $field: bool,
            )+
        }

        impl Extensions {
            /// Returns the list of extensions supported by the current context.
            pub unsafe fn parse() -> Result<Extensions> {
                let mut extensions = Extensions::default();

                let mut num = 0;
                gl::GetIntegerv(gl::NUM_EXTENSIONS, &mut num);
                for i in 0..num {
                    let ext = gl::GetStringi(gl::EXTENSIONS, i as GLuint);
                    if ext.is_null() {
                        bail!("[GL] Extension {} is null.", i);
                    }

                    match ffi::CStr::from_ptr(ext as *const _).to_str() {
                        $(
                            Ok($string) => extensions.$field = true,
                        )+
                        _ => (),
                    }
                }

                Ok(extensions)
            }
        }
    }
}

extensions! {
    "GL_ARB_direct_state_access" => gl_arb_direct_state_access,
    "GL_ARB_multi_bind" => gl_arb_multi_bind,
    "GL_ARB_separate_shader_objects" => gl_arb_separate_shader_objects,
    "GL_ARB_vertex_attrib_binding" => gl_arb_vertex_attrib_binding,
    "GL_ARB_clear_texture" => gl_arb_clear_texture,
    "GL_ARB_texture_storage" => gl_arb_texture_storage,
}

/// Represents the capabilities of the context.
///
/// Contrary to the state, these values never change.
#[derive(Debug)]
pub struct Capabilities {
    /// Returns a version or release number. Vendor-specific information may follow the version
    /// number.
    pub version: Version,

    /// The company responsible for this GL implementation.
    pub vendor: String,

    /// The list of OpenGL extensions support by this implementation.
    pub extensions: Extensions,

    /// The name of the renderer.
    pub renderer: String,

    /// The OpenGL context profile if available.
    pub profile: Option<Profile>,

    /// The context is in debug mode.
    pub debug: bool,

    /// Number of available buffer bind points for `GL_UNIFORM_BUFFER`.
    pub max_uniform_buffer_bindings: u32,

    /// Number of texture (and sampler) units.
    pub max_combined_texture_image_units: u32,

    /// Maximum number of color attachment bind points.
    pub max_color_attachments: u32,

    /// Maximum number of vertex buffer binding points of a vertex array.
    pub max_vertex_attrib_bindings: u32,
}

impl Capabilities {
    pub unsafe fn parse() -> Result<Capabilities> {
        let version = Version::parse()?;
        let extensions = Extensions::parse()?;

        let flags = integer(gl::CONTEXT_FLAGS) as GLenum;
        let mask = integer(gl::CONTEXT_PROFILE_MASK) as GLenum;
        let profile = if (mask & gl::CONTEXT_COMPATIBILITY_PROFILE_BIT) != 0 {
            Some(Profile::Compatibility)
        } else if (mask & gl::CONTEXT_CORE_PROFILE_BIT) != 0 {
            Some(Profile::Core)
        } else {
            None
        };

        Ok(Capabilities {
            version,
            extensions,
            vendor: parse_str(gl::VENDOR)?,
            renderer: parse_str(gl::RENDERER)?,
            profile,
            debug: (flags & gl::CONTEXT_FLAG_DEBUG_BIT) != 0,
            max_uniform_buffer_bindings: integer(gl::MAX_UNIFORM_BUFFER_BINDINGS) as u32,
            max_combined_texture_image_units: integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS)
                as u32,
            max_color_attachments: integer(gl::MAX_COLOR_ATTACHMENTS) as u32,
            max_vertex_attrib_bindings: integer(gl::MAX_VERTEX_ATTRIB_BINDINGS) as u32,
        })
    }

    /// Checks that the context offers everything the backend calls into: direct
    /// state access, multi-bind, separable programs and enough binding points for
    /// the per-stage slot tables.
    pub fn check(&self) -> Result<()> {
        let exts = &self.extensions;
        if self.version < Version::GL(4, 5)
            && !(exts.gl_arb_direct_state_access
                && exts.gl_arb_multi_bind
                && exts.gl_arb_separate_shader_objects
                && exts.gl_arb_vertex_attrib_binding
                && exts.gl_arb_clear_texture
                && exts.gl_arb_texture_storage)
        {
            bail!(
                "The OpenGL implementation {:?} does not support direct state access and multi-bind.",
                self.version
            );
        }

        let units = (NUM_STAGES * MAX_SHADER_RESOURCES.max(MAX_SAMPLERS)) as u32;
        if self.max_combined_texture_image_units < units {
            bail!(
                "The OpenGL implementation supports {} texture units, {} are required.",
                self.max_combined_texture_image_units,
                units
            );
        }

        let bindings = (NUM_STAGES * MAX_CONSTANT_BUFFERS) as u32;
        if self.max_uniform_buffer_bindings < bindings {
            bail!(
                "The OpenGL implementation supports {} uniform buffer bindings, {} are required.",
                self.max_uniform_buffer_bindings,
                bindings
            );
        }

        if self.max_color_attachments < MAX_RENDER_TARGETS as u32 {
            bail!(
                "The OpenGL implementation supports {} color attachments, {} are required.",
                self.max_color_attachments,
                MAX_RENDER_TARGETS
            );
        }

        if self.max_vertex_attrib_bindings < MAX_VERTEX_BUFFERS as u32 {
            bail!(
                "The OpenGL implementation supports {} vertex buffer bindings, {} are required.",
                self.max_vertex_attrib_bindings,
                MAX_VERTEX_BUFFERS
            );
        }

        Ok(())
    }
}

#[inline]
unsafe fn integer(name: GLenum) -> GLint {
    let mut val = 0;
    gl::GetIntegerv(name, &mut val);
    val
}

unsafe fn parse_str(id: GLenum) -> Result<String> {
    let s = gl::GetString(id);
    if s.is_null() {
        bail!("[GL] String of {} is null.", id);
    }

    ffi::CStr::from_ptr(s as *const _)
        .to_str()
        .map(|v| v.to_owned())
        .map_err(|_| format_err!("[GL] String of {} is unformaled.", id))
}
