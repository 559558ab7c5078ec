use std::path::Path;

/// Error returned by [`FontSystem::load_font`] and [`FontSystem::load_font_file`].
#[derive(Debug, thiserror::Error)]
pub enum FontLoadError {
    #[error("failed to read font file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("font parse error: {0}")]
    Parse(String),
}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Owns the loaded fonts.
///
/// Fonts are immutable after loading. The system is passed to the text
/// overlay each frame so new glyphs can be rasterized on demand.
#[derive(Default)]
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError::Parse(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    /// Reads a font file from disk and stores it.
    pub fn load_font_file(&mut self, path: impl AsRef<Path>) -> Result<FontId, FontLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FontLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_font(&bytes)
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Distance between consecutive baselines at `size` pixels.
    pub fn line_height(&self, id: FontId, size: f32) -> f32 {
        self.get(id)
            .and_then(|f| f.horizontal_line_metrics(size))
            .map_or(size * 1.2, |m| m.new_line_size)
    }

    /// Cell width used by fixed-width layout: the advance of `M` at `size`.
    pub fn cell_width(&self, id: FontId, size: f32) -> f32 {
        self.get(id)
            .map_or(size * 0.6, |f| f.metrics('M', size).advance_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let mut fonts = FontSystem::new();
        assert!(matches!(fonts.load_font(b"not a font"), Err(FontLoadError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut fonts = FontSystem::new();
        let err = fonts.load_font_file("no/such/font.ttf").unwrap_err();
        assert!(matches!(err, FontLoadError::Io { .. }));
        assert!(err.to_string().contains("no/such/font.ttf"));
    }

    #[test]
    fn unknown_font_uses_size_based_fallbacks() {
        let fonts = FontSystem::new();
        assert!((fonts.line_height(FontId(3), 10.0) - 12.0).abs() < 1e-4);
        assert!((fonts.cell_width(FontId(3), 10.0) - 6.0).abs() < 1e-4);
    }
}
