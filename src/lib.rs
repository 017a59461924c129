//! # What is This?
//!
//! `gpucache` is a cross-backend rendering context built around a GPU pipeline
//! state cache. The cache remembers everything currently bound on one native
//! context (buffers, textures, samplers, render targets, shaders, state objects,
//! viewport and scissor) and only talks to the driver when a requested binding
//! actually differs from the bound one.
//!
//! On top of the plain diff it keeps a few invariants that are easy to break by
//! hand:
//!
//! * Range binds are coalesced into one native multi-bind per contiguous run of
//!   changed slots.
//! * A texture is never bound for reading and writing at the same time. Binding
//!   it as a render target force-unbinds every shader-resource slot holding it.
//! * Destroying a resource eagerly clears every slot that references it.
//! * A mapped buffer can not be rebound, unbound or destroyed until unmapped.
//!
//! The `video::context::Context` drives the cache from opaque `DrawCall`s and
//! owns the resource registry. Backends implement the `video::backends::Backend`
//! trait; an OpenGL 4.5, a headless and a recording backend ship with the crate.

#[macro_use]
extern crate log;
#[macro_use]
extern crate failure;
extern crate serde;
extern crate serde_json;
extern crate smallvec;
pub extern crate cgmath;
#[cfg(not(target_arch = "wasm32"))]
extern crate gl;

pub mod errors;
#[macro_use]
pub mod utils;
pub mod video;

pub mod prelude;
