//! GPU rendering subsystem.
//!
//! Each renderer owns its GPU resources and creates its pipelines from the
//! [`RenderCtx`] passed to its constructor. Buffers that depend on the amount
//! of work grow on demand.
//!
//! Convention:
//! - 3D passes draw into the scene attachments (multisampled when enabled)
//!   and resolve into the surface.
//! - Overlays draw on the resolved surface in logical pixels (top-left
//!   origin, +Y down) and convert to NDC using a viewport uniform.

mod common;
mod ctx;
mod model;
mod text;

pub use ctx::{RenderCtx, RenderTarget};
pub use model::{missing_bindings, GpuModel, ModelRenderer, MODEL_BINDINGS};
pub use text::TextOverlay;
