/// Linear straight-alpha RGBA color.
///
/// Shaders that blend (the text overlay) premultiply on upload via
/// [`Color::premultiplied`]; clear colors are passed as-is.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Components clamped to `[0, 1]` with RGB multiplied by alpha.
    #[inline]
    pub fn premultiplied(self) -> [f32; 4] {
        let a = self.a.clamp(0.0, 1.0);
        [
            self.r.clamp(0.0, 1.0) * a,
            self.g.clamp(0.0, 1.0) * a,
            self.b.clamp(0.0, 1.0) * a,
            a,
        ]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiplied_scales_rgb_by_alpha() {
        let c = Color::rgba(1.0, 0.5, 0.25, 0.5).premultiplied();
        assert_eq!(c, [0.5, 0.25, 0.125, 0.5]);
    }

    #[test]
    fn premultiplied_clamps_out_of_range() {
        let c = Color::rgba(2.0, -1.0, 0.5, 3.0).premultiplied();
        assert_eq!(c, [1.0, 0.0, 0.5, 1.0]);
    }
}
