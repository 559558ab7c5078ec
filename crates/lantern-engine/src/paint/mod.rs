//! Color representation shared by renderers and the runtime clear pass.

pub mod color;

pub use color::Color;
