//! Orbit camera driven by mouse drags, the wheel and zoom keys.

mod orbit;

pub use orbit::{spherical_to_cartesian, OrbitCamera, Tracking};
