mod clip_error;
mod definition_error;
mod skeleton_error;

pub use clip_error::*;
pub use definition_error::*;
pub use skeleton_error::*;
