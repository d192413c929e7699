//! Root motion recording for debugging tools.
//!
//! With the `dev_tools` feature the recorder keeps the per-update action graph and a bounded
//! trajectory history. Without it, [`RootMotionRecorder`] is a zero-sized type whose
//! recording calls compile to nothing.

#[cfg(feature = "dev_tools")]
mod recorder;
#[cfg(feature = "dev_tools")]
pub use recorder::*;

#[cfg(not(feature = "dev_tools"))]
mod disabled;
#[cfg(not(feature = "dev_tools"))]
pub use disabled::*;
