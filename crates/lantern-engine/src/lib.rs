//! Lantern engine crate.
//!
//! Window runtime, GPU device and the helper layers a small model viewer is
//! built from: input, timing, matrices, orbit camera, profiler, shader and
//! model loading, fonts and the renderers.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod text;

pub mod math;
pub mod camera;
pub mod profile;
pub mod model;
pub mod shader;
