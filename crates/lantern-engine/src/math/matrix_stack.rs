use glam::{Mat3, Mat4, Vec3};

/// Matrix slot addressed by [`MatrixStack`] operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MatrixKind {
    Projection,
    View,
    Model,
}

impl MatrixKind {
    const ALL: [MatrixKind; 3] = [MatrixKind::Projection, MatrixKind::View, MatrixKind::Model];

    fn index(self) -> usize {
        match self {
            MatrixKind::Projection => 0,
            MatrixKind::View => 1,
            MatrixKind::Model => 2,
        }
    }
}

/// Returned by [`MatrixStack::pop`] when the slot has nothing pushed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("matrix stack underflow on {0:?}")]
pub struct StackUnderflow(pub MatrixKind);

/// Matrices derived from the current stack state for one draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawMatrices {
    pub proj_view_model: Mat4,
    pub view_model: Mat4,
    /// Inverse transpose of the upper 3x3 of `view_model`.
    pub normal: Mat3,
}

/// Projection, view and model matrices, each with its own push/pop stack.
///
/// Operations post-multiply the current matrix, so a `translate` followed by
/// a `rotate` rotates the geometry first and then moves it.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    current: [Mat4; 3],
    saved: [Vec<Mat4>; 3],
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            current: [Mat4::IDENTITY; 3],
            saved: [Vec::new(), Vec::new(), Vec::new()],
        }
    }

    pub fn get(&self, kind: MatrixKind) -> Mat4 {
        self.current[kind.index()]
    }

    pub fn set(&mut self, kind: MatrixKind, m: Mat4) {
        self.current[kind.index()] = m;
    }

    pub fn load_identity(&mut self, kind: MatrixKind) {
        self.set(kind, Mat4::IDENTITY);
    }

    /// Saves the current matrix of `kind`.
    pub fn push(&mut self, kind: MatrixKind) {
        let m = self.get(kind);
        self.saved[kind.index()].push(m);
    }

    /// Restores the most recently pushed matrix of `kind`.
    pub fn pop(&mut self, kind: MatrixKind) -> Result<(), StackUnderflow> {
        let m = self.saved[kind.index()].pop().ok_or(StackUnderflow(kind))?;
        self.set(kind, m);
        Ok(())
    }

    /// Number of pushed matrices across all slots.
    pub fn depth(&self) -> usize {
        MatrixKind::ALL.iter().map(|k| self.saved[k.index()].len()).sum()
    }

    pub fn multiply(&mut self, kind: MatrixKind, m: Mat4) {
        let i = kind.index();
        self.current[i] *= m;
    }

    pub fn translate(&mut self, kind: MatrixKind, x: f32, y: f32, z: f32) {
        self.multiply(kind, Mat4::from_translation(Vec3::new(x, y, z)));
    }

    /// Rotates by `degrees` around `axis`. A zero axis leaves the matrix untouched.
    pub fn rotate(&mut self, kind: MatrixKind, degrees: f32, axis: Vec3) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.multiply(kind, Mat4::from_axis_angle(axis, degrees.to_radians()));
    }

    pub fn scale(&mut self, kind: MatrixKind, x: f32, y: f32, z: f32) {
        self.multiply(kind, Mat4::from_scale(Vec3::new(x, y, z)));
    }

    /// Multiplies the view matrix by a right-handed look-at transform.
    pub fn look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.multiply(MatrixKind::View, Mat4::look_at_rh(eye, center, up));
    }

    /// Multiplies the projection matrix by a perspective transform.
    ///
    /// `fov_y_degrees` is the vertical field of view. Depth maps to `[0, 1]`,
    /// which is what wgpu expects.
    pub fn perspective(&mut self, fov_y_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.multiply(
            MatrixKind::Projection,
            Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
        );
    }

    /// Computes the per-draw matrices from the current state.
    pub fn draw_matrices(&self) -> DrawMatrices {
        let view_model = self.get(MatrixKind::View) * self.get(MatrixKind::Model);
        let proj_view_model = self.get(MatrixKind::Projection) * view_model;
        let normal = Mat3::from_mat4(view_model).inverse().transpose();
        DrawMatrices {
            proj_view_model,
            view_model,
            normal,
        }
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn push_pop_restores_model() {
        let mut s = MatrixStack::new();
        s.translate(MatrixKind::Model, 1.0, 0.0, 0.0);
        let before = s.get(MatrixKind::Model);

        s.push(MatrixKind::Model);
        s.translate(MatrixKind::Model, 0.0, 5.0, 0.0);
        assert_ne!(s.get(MatrixKind::Model), before);
        assert_eq!(s.depth(), 1);

        s.pop(MatrixKind::Model).unwrap();
        assert_eq!(s.get(MatrixKind::Model), before);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn pop_without_push_is_an_error() {
        let mut s = MatrixStack::new();
        assert_eq!(s.pop(MatrixKind::View), Err(StackUnderflow(MatrixKind::View)));
    }

    #[test]
    fn slots_are_independent() {
        let mut s = MatrixStack::new();
        s.push(MatrixKind::Model);
        assert!(s.pop(MatrixKind::Projection).is_err());
        assert!(s.pop(MatrixKind::Model).is_ok());
    }

    #[test]
    fn operations_post_multiply() {
        let mut s = MatrixStack::new();
        s.translate(MatrixKind::Model, 2.0, 0.0, 0.0);
        s.scale(MatrixKind::Model, 3.0, 3.0, 3.0);
        let p = s.get(MatrixKind::Model).transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(p, Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn rotate_uses_degrees_and_ignores_zero_axis() {
        let mut s = MatrixStack::new();
        s.rotate(MatrixKind::Model, 90.0, Vec3::Y);
        let p = s.get(MatrixKind::Model).transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(0.0, 0.0, -1.0)));

        let before = s.get(MatrixKind::Model);
        s.rotate(MatrixKind::Model, 45.0, Vec3::ZERO);
        assert_eq!(s.get(MatrixKind::Model), before);
    }

    #[test]
    fn look_at_moves_eye_to_origin() {
        let mut s = MatrixStack::new();
        s.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let origin = s.get(MatrixKind::View).transform_point3(Vec3::ZERO);
        assert!(approx(origin, Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let mut s = MatrixStack::new();
        s.perspective(53.13, 16.0 / 9.0, 0.1, 10000.0);
        let proj = s.get(MatrixKind::Projection);

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10000.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let mut s = MatrixStack::new();
        s.scale(MatrixKind::Model, 2.0, 1.0, 1.0);
        let m = s.draw_matrices();
        let n = m.normal * Vec3::X;
        assert!(approx(n, Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn draw_matrices_compose_projection_view_model() {
        let mut s = MatrixStack::new();
        s.perspective(60.0, 1.0, 0.1, 100.0);
        s.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        s.translate(MatrixKind::Model, 1.0, 2.0, 3.0);

        let m = s.draw_matrices();
        let expected = s.get(MatrixKind::Projection)
            * s.get(MatrixKind::View)
            * s.get(MatrixKind::Model);
        assert!(m.proj_view_model.abs_diff_eq(expected, 1e-4));
    }
}
