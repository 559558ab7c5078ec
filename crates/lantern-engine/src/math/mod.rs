//! Matrix helpers for the fixed render pipeline.

mod matrix_stack;

pub use matrix_stack::{DrawMatrices, MatrixKind, MatrixStack, StackUnderflow};
