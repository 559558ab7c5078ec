//! Font loading, text layout and overlay sentences.

mod font_system;
mod layout;
mod sentence;

pub use font_system::{FontId, FontLoadError, FontSystem};
pub use layout::{fixed_cell_origin, FontStyle, PlacedGlyph, TextLayout};
pub use sentence::{QueuedSentence, SentenceId, Sentences};
