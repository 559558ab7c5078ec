//! Frame profiler.
//!
//! `Profiler::scope` opens a named section; the returned guard closes it.
//! `dump_levels` renders the section tree as text for the on-screen overlay.

mod profiler;

pub use profiler::{ProfileScope, Profiler};
