use thiserror::Error;

/// Reasons a bone hierarchy is rejected before it can be used for sampling.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SkeletonError {
    #[error("A skeleton needs at least one bone")]
    Empty,
    #[error("Mismatched bone data: {bone_ids} ids, {parents} parents, {transforms} transforms")]
    MismatchedLengths {
        bone_ids: usize,
        parents: usize,
        transforms: usize,
    },
    #[error("Bone 0 must be the root, but it has parent {0}")]
    RootHasParent(usize),
    #[error("Bone {0} has no parent, only bone 0 may be a root")]
    MultipleRoots(usize),
    #[error("Bone {bone} has parent {parent}, parents must precede their children")]
    ParentAfterChild { bone: usize, parent: usize },
    #[error("Bone name {0:?} is used more than once")]
    DuplicateBoneId(String),
    #[error("Bone mask {name:?} has {weights} weights for {bones} bones")]
    BoneMaskLength {
        name: String,
        weights: usize,
        bones: usize,
    },
}

pub type SkeletonResult<T> = Result<T, SkeletonError>;
