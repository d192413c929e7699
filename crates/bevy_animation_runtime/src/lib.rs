//! # Bevy Animation Runtime
//!
//! Runtime building blocks for evaluating animation graphs on [Bevy](https://bevyengine.org/)
//! characters:
//! - [`Skeleton`], an immutable bone hierarchy whose bones are addressed by index, parents
//!   before children, with named bone masks.
//! - [`Pose`], per-bone local transforms bound to a shared skeleton, with an optional cache of
//!   model space transforms.
//! - [`AnimationClip`], quantized keyframe tracks that can be sampled as a whole pose or one
//!   bone at a time.
//! - [`GraphContext`], the per-character state a graph evaluation reads: the previous pose,
//!   delta time, world transform, a pool of transient bone masks and the sampled events.
//! - [`RootMotionRecorder`], which records how root motion was produced during an update for
//!   debugging tools. Disabling the `dev_tools` feature turns it into a zero-sized no-op.
//!
//! Skeletons and clips are usually defined in RON:
//! ```ron
//! (
//!     bones: [
//!         (name: "root"),
//!         (name: "spine", parent: Some("root"), transform: (translation: (0.0, 1.0, 0.0))),
//!     ],
//!     bone_masks: [
//!         (name: "upper_body", weights: { "spine": 1.0 }),
//!     ],
//! )
//! ```
//! ```ignore
//! let skeleton = Arc::new(Skeleton::from_ron_str(skeleton_source)?);
//! let clip = AnimationClip::from_ron_str(skeleton.clone(), clip_source)?;
//!
//! let mut pose = Pose::new(skeleton, PoseInitialState::ReferencePose);
//! clip.pose(clip.frame_time(0.5), &mut pose);
//! pose.calculate_global_transforms();
//! ```

pub mod animation_clip;
pub mod bone_mask;
pub mod context;
#[cfg(feature = "dev_tools")]
pub mod debug_draw;
pub mod errors;
pub mod interpolation;
pub mod pose;
pub mod root_motion;
pub mod skeleton;
pub mod utils;

pub mod prelude {
    use super::*;
    pub use animation_clip::{AnimationClip, FrameTime, RawAnimation, RawTrack, RootMotionData};
    pub use bone_mask::{BoneMask, BoneMaskId, BoneMaskPool};
    pub use context::*;
    pub use errors::*;
    pub use interpolation::{additive::AdditiveInterpolator, linear::*};
    pub use pose::{Pose, PoseInitialState, PoseState};
    pub use root_motion::RootMotionRecorder;
    pub use skeleton::Skeleton;
}

pub use prelude::*;
