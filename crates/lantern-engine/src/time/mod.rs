//! Time subsystem.
//!
//! - one `FrameClock` per window, ticked once per presented frame
//! - `FpsCounter` turns the clock's elapsed time into a once-per-second rate

mod fps;
mod frame_clock;

pub use fps::{FpsCounter, FpsSample};
pub use frame_clock::{FrameClock, FrameTime};
