use thiserror::Error;

use super::{ClipError, SkeletonError};

/// Errors produced while turning a RON definition into a runtime resource
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Could not parse RON: {0}")]
    RonSpannedError(#[from] ron::error::SpannedError),
    #[error("Bone {bone:?} names unknown parent {parent:?}")]
    UnknownParent { bone: String, parent: String },
    #[error("Bone mask {mask:?} refers to unknown bone {bone:?}")]
    UnknownMaskBone { mask: String, bone: String },
    #[error("Clip has a track for unknown bone {0:?}")]
    UnknownTrackBone(String),
    #[error("Invalid skeleton: {0}")]
    Skeleton(#[from] SkeletonError),
    #[error("Invalid clip: {0}")]
    Clip(#[from] ClipError),
}
