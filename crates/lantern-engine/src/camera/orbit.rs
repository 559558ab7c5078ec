use glam::Vec3;

use crate::input::MouseButton;

/// What a mouse drag currently controls.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Tracking {
    #[default]
    None,
    Orbit,
    Zoom,
}

/// Camera orbiting the origin in spherical coordinates.
///
/// `alpha` is the yaw around +Y and `beta` the pitch, both in degrees; `r` is
/// the distance to the origin. Pitch stays inside `[-MAX_PITCH, MAX_PITCH]`
/// and the distance never drops below `MIN_DISTANCE`.
///
/// A drag is previewed while the button is held (`drag_to`) and committed on
/// release (`end_drag`); the committed angles are only changed by the commit.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    alpha: f32,
    beta: f32,
    r: f32,
    eye: Vec3,

    tracking: Tracking,
    start: (f32, f32),
}

impl OrbitCamera {
    pub const MAX_PITCH: f32 = 85.0;
    pub const MIN_DISTANCE: f32 = 0.1;

    /// Distance change per zoom step and per pixel of right-button drag.
    pub const ZOOM_STEP: f32 = 0.1;
    pub const DRAG_ZOOM_PER_PIXEL: f32 = 0.01;

    pub fn new(alpha: f32, beta: f32, r: f32) -> Self {
        let beta = clamp_pitch(beta);
        let r = clamp_distance(r);
        Self {
            alpha,
            beta,
            r,
            eye: spherical_to_cartesian(alpha, beta, r),
            tracking: Tracking::None,
            start: (0.0, 0.0),
        }
    }

    /// Eye position, including any drag preview in progress.
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn distance(&self) -> f32 {
        self.r
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Starts tracking a drag. Left orbits, right zooms.
    pub fn begin_drag(&mut self, button: MouseButton, x: f32, y: f32) {
        self.start = (x, y);
        self.tracking = match button {
            MouseButton::Left => Tracking::Orbit,
            MouseButton::Right => Tracking::Zoom,
            _ => self.tracking,
        };
    }

    /// Previews the drag at pointer position `(x, y)`.
    pub fn drag_to(&mut self, x: f32, y: f32) {
        let (alpha, beta, r) = self.dragged(x, y);
        if self.tracking != Tracking::None {
            self.eye = spherical_to_cartesian(alpha, beta, r);
        }
    }

    /// Commits the drag ending at `(x, y)` and stops tracking.
    pub fn end_drag(&mut self, x: f32, y: f32) {
        let (alpha, beta, r) = self.dragged(x, y);
        self.alpha = alpha;
        self.beta = beta;
        self.r = r;
        self.tracking = Tracking::None;
        self.update_eye();
    }

    /// Changes the distance by `delta`.
    pub fn zoom_by(&mut self, delta: f32) {
        self.r = clamp_distance(self.r + delta);
        self.update_eye();
    }

    fn dragged(&self, x: f32, y: f32) -> (f32, f32, f32) {
        let dx = x - self.start.0;
        let dy = y - self.start.1;
        match self.tracking {
            Tracking::Orbit => (self.alpha - dx, clamp_pitch(self.beta + dy), self.r),
            Tracking::Zoom => (
                self.alpha,
                self.beta,
                clamp_distance(self.r + dy * Self::DRAG_ZOOM_PER_PIXEL),
            ),
            Tracking::None => (self.alpha, self.beta, self.r),
        }
    }

    fn update_eye(&mut self) {
        self.eye = spherical_to_cartesian(self.alpha, self.beta, self.r);
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 5.0)
    }
}

/// Converts yaw/pitch in degrees and a radius to a point around the origin.
pub fn spherical_to_cartesian(alpha: f32, beta: f32, r: f32) -> Vec3 {
    let (sa, ca) = alpha.to_radians().sin_cos();
    let (sb, cb) = beta.to_radians().sin_cos();
    Vec3::new(r * sa * cb, r * sb, r * ca * cb)
}

fn clamp_pitch(beta: f32) -> f32 {
    beta.clamp(-OrbitCamera::MAX_PITCH, OrbitCamera::MAX_PITCH)
}

fn clamp_distance(r: f32) -> f32 {
    r.max(OrbitCamera::MIN_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn default_eye_is_on_positive_z() {
        let cam = OrbitCamera::default();
        assert!(approx(cam.eye(), Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn spherical_axes() {
        assert!(approx(spherical_to_cartesian(90.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 0.0)));
        assert!(approx(spherical_to_cartesian(0.0, 90.0, 2.0), Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn orbit_preview_does_not_commit() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag(MouseButton::Left, 100.0, 100.0);
        cam.drag_to(70.0, 100.0);

        assert_eq!(cam.alpha(), 0.0);
        assert!(approx(cam.eye(), spherical_to_cartesian(30.0, 0.0, 5.0)));
        assert_eq!(cam.tracking(), Tracking::Orbit);
    }

    #[test]
    fn orbit_release_commits_deltas() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag(MouseButton::Left, 10.0, 10.0);
        cam.end_drag(30.0, 25.0);

        assert_eq!(cam.alpha(), -20.0);
        assert_eq!(cam.beta(), 15.0);
        assert_eq!(cam.tracking(), Tracking::None);
    }

    #[test]
    fn pitch_is_clamped_in_preview_and_commit() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag(MouseButton::Left, 0.0, 0.0);
        cam.drag_to(0.0, 500.0);
        assert!(approx(cam.eye(), spherical_to_cartesian(0.0, 85.0, 5.0)));

        cam.end_drag(0.0, -500.0);
        assert_eq!(cam.beta(), -85.0);
    }

    #[test]
    fn right_drag_zooms() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag(MouseButton::Right, 0.0, 0.0);
        cam.drag_to(0.0, 100.0);
        assert!((cam.eye().length() - 6.0).abs() < 1e-4);
        assert_eq!(cam.distance(), 5.0);

        cam.end_drag(0.0, 100.0);
        assert!((cam.distance() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn middle_button_does_not_track() {
        let mut cam = OrbitCamera::default();
        cam.begin_drag(MouseButton::Middle, 0.0, 0.0);
        cam.drag_to(50.0, 50.0);
        assert_eq!(cam.tracking(), Tracking::None);
        assert!(approx(cam.eye(), Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn distance_never_reaches_target() {
        let mut cam = OrbitCamera::default();
        for _ in 0..100 {
            cam.zoom_by(-OrbitCamera::ZOOM_STEP);
        }
        assert_eq!(cam.distance(), OrbitCamera::MIN_DISTANCE);
        assert!(cam.eye().length() > 0.0);
    }
}
