use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};

use crate::paint::Color;

use super::{FontId, FontSystem};

/// Appearance of overlay text.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FontStyle {
    pub font: FontId,
    pub size: f32,
    pub color: Color,
    /// Lay glyphs out on a monospace grid instead of using the font's advances.
    pub fixed: bool,
}

impl FontStyle {
    pub const DEFAULT_SIZE: f32 = 16.0;
    pub const DEFAULT_COLOR: Color = Color::rgba(1.0, 0.5, 0.25, 1.0);

    pub fn new(font: FontId) -> Self {
        Self {
            font,
            size: Self::DEFAULT_SIZE,
            color: Self::DEFAULT_COLOR,
            fixed: false,
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_fixed(mut self, fixed: bool) -> Self {
        self.fixed = fixed;
        self
    }
}

/// A glyph bitmap placed in logical pixels (top-left origin, +Y down).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlacedGlyph {
    pub key: GlyphRasterConfig,
    pub x: f32,
    pub y: f32,
    pub width: usize,
    pub height: usize,
}

/// Top-left corner of the monospace cell at `(column, line)`.
pub fn fixed_cell_origin(
    origin: (f32, f32),
    column: usize,
    line: usize,
    cell_width: f32,
    line_height: f32,
) -> (f32, f32) {
    (
        origin.0 + column as f32 * cell_width,
        origin.1 + line as f32 * line_height,
    )
}

/// Lays out text with fontdue, one row per `\n`.
pub struct TextLayout {
    layout: Layout<()>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            layout: Layout::new(CoordinateSystem::PositiveYDown),
        }
    }
}

impl TextLayout {
    /// Appends the glyphs of `text` at `(x, y)` to `out`. Whitespace and
    /// empty glyphs are skipped.
    pub fn layout(
        &mut self,
        fonts: &FontSystem,
        style: &FontStyle,
        x: f32,
        y: f32,
        text: &str,
        out: &mut Vec<PlacedGlyph>,
    ) {
        let Some(font) = fonts.get(style.font) else {
            log::warn!("TextLayout: unknown FontId {:?}, skipping", style.font);
            return;
        };

        if style.fixed {
            self.layout_fixed(fonts, font, style, x, y, text, out);
            return;
        }

        self.layout.reset(&LayoutSettings {
            x,
            y,
            ..LayoutSettings::default()
        });
        self.layout.append(&[font], &TextStyle::new(text, style.size, 0));

        out.extend(
            self.layout
                .glyphs()
                .iter()
                .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
                .map(|g| PlacedGlyph {
                    key: g.key,
                    x: g.x,
                    y: g.y,
                    width: g.width,
                    height: g.height,
                }),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn layout_fixed(
        &self,
        fonts: &FontSystem,
        font: &fontdue::Font,
        style: &FontStyle,
        x: f32,
        y: f32,
        text: &str,
        out: &mut Vec<PlacedGlyph>,
    ) {
        let cell = fonts.cell_width(style.font, style.size);
        let line_height = fonts.line_height(style.font, style.size);
        let ascent = font
            .horizontal_line_metrics(style.size)
            .map_or(style.size, |m| m.ascent);

        for (line_no, line) in text.split('\n').enumerate() {
            for (column, ch) in line.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let glyph_index = font.lookup_glyph_index(ch);
                let metrics = font.metrics_indexed(glyph_index, style.size);
                if metrics.width == 0 || metrics.height == 0 {
                    continue;
                }

                let (cx, cy) = fixed_cell_origin((x, y), column, line_no, cell, line_height);
                let baseline = cy + ascent;
                out.push(PlacedGlyph {
                    key: GlyphRasterConfig {
                        glyph_index,
                        px: style.size,
                        font_hash: font.file_hash(),
                    },
                    x: (cx + metrics.xmin as f32).round(),
                    y: (baseline - metrics.height as f32 - metrics.ymin as f32).round(),
                    width: metrics.width,
                    height: metrics.height,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_defaults() {
        let style = FontStyle::new(FontId(0));
        assert_eq!(style.color, Color::rgba(1.0, 0.5, 0.25, 1.0));
        assert_eq!(style.size, 16.0);
        assert!(!style.fixed);
    }

    #[test]
    fn style_builders() {
        let style = FontStyle::new(FontId(0))
            .with_size(12.0)
            .with_fixed(true)
            .with_color(Color::BLACK);
        assert_eq!(style.size, 12.0);
        assert!(style.fixed);
        assert_eq!(style.color, Color::BLACK);
    }

    #[test]
    fn fixed_cells_advance_by_column_and_line() {
        assert_eq!(fixed_cell_origin((10.0, 30.0), 0, 0, 8.0, 18.0), (10.0, 30.0));
        assert_eq!(fixed_cell_origin((10.0, 30.0), 3, 0, 8.0, 18.0), (34.0, 30.0));
        assert_eq!(fixed_cell_origin((10.0, 30.0), 2, 2, 8.0, 18.0), (26.0, 66.0));
    }

    const MONO: &[u8] = include_bytes!("../../../lantern-viewer/fonts/DejaVuSansMono.ttf");

    fn mono() -> (FontSystem, FontStyle) {
        let mut fonts = FontSystem::new();
        let id = fonts.load_font(MONO).unwrap();
        (fonts, FontStyle::new(id).with_size(14.0).with_fixed(true))
    }

    #[test]
    fn fixed_layout_uses_monospace_cells() {
        let (fonts, style) = mono();
        let cell = fonts.cell_width(style.font, style.size);
        let mut layout = TextLayout::default();
        let mut out = Vec::new();
        layout.layout(&fonts, &style, 10.0, 10.0, "H H", &mut out);

        // The space is skipped but still advances the cursor.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, out[1].key);
        assert!((out[1].x - out[0].x - 2.0 * cell).abs() <= 1.0);
        assert_eq!(out[0].y, out[1].y);
    }

    #[test]
    fn fixed_layout_sits_glyphs_on_the_baseline() {
        let (fonts, style) = mono();
        let mut layout = TextLayout::default();
        let mut out = Vec::new();
        layout.layout(&fonts, &style, 0.0, 0.0, "Hx", &mut out);

        // Both glyphs rest on the baseline, so their bottoms line up while the
        // taller capital starts higher.
        let bottom = |g: &PlacedGlyph| g.y + g.height as f32;
        assert!((bottom(&out[0]) - bottom(&out[1])).abs() <= 1.0);
        assert!(out[0].y < out[1].y);
        assert!(out[0].y >= 0.0);
    }

    #[test]
    fn fixed_layout_starts_a_row_per_newline() {
        let (fonts, style) = mono();
        let line_height = fonts.line_height(style.font, style.size);
        let mut layout = TextLayout::default();
        let mut out = Vec::new();
        layout.layout(&fonts, &style, 10.0, 30.0, "Frame\nFrame", &mut out);

        assert_eq!(out.len(), 10);
        assert_eq!(out[0].x, out[5].x);
        assert!((out[5].y - out[0].y - line_height).abs() <= 1.0);
    }

    #[test]
    fn proportional_layout_advances_left_to_right() {
        let (fonts, style) = mono();
        let style = style.with_fixed(false);
        let mut layout = TextLayout::default();
        let mut out = Vec::new();
        layout.layout(&fonts, &style, 10.0, 10.0, "FPS 60", &mut out);

        assert_eq!(out.len(), 5);
        assert!(out.windows(2).all(|w| w[1].x > w[0].x));
        assert!(out.iter().all(|g| g.x >= 10.0 && g.y >= 10.0));
    }

    #[test]
    fn unknown_font_produces_no_glyphs() {
        let fonts = FontSystem::new();
        let mut layout = TextLayout::default();
        let mut out = Vec::new();
        layout.layout(&fonts, &FontStyle::new(FontId(3)), 0.0, 0.0, "abc", &mut out);
        assert!(out.is_empty());
    }
}
