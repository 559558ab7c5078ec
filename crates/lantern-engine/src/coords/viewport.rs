/// Viewport size in logical pixels.
///
/// The text overlay uses this as the basis for converting logical px
/// positions to NDC; the 3D projection only needs its aspect ratio.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height, with a zero height treated as one.
    #[inline]
    pub fn aspect(self) -> f32 {
        self.width / self.height.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_of_regular_viewport() {
        assert_eq!(Viewport::new(640.0, 320.0).aspect(), 2.0);
    }

    #[test]
    fn zero_height_is_treated_as_one() {
        assert_eq!(Viewport::new(640.0, 0.0).aspect(), 640.0);
    }
}
