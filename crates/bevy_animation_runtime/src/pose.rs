use std::sync::Arc;

use bevy::{
    math::{Quat, Vec3},
    reflect::Reflect,
    transform::components::Transform,
};

use crate::skeleton::Skeleton;

/// How the local transforms of a [`Pose`] were last populated.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoseState {
    #[default]
    Unset,
    ReferencePose,
    ZeroPose,
    Pose,
    /// Local transforms are deltas to be applied on top of a base pose. Not renderable on its
    /// own.
    AdditivePose,
}

/// What a pose is reset to.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoseInitialState {
    #[default]
    ReferencePose,
    ZeroPose,
}

/// Per-bone local transforms bound to a [`Skeleton`], with an optional cache of model space
/// transforms.
///
/// The skeleton is shared, a pose never decides when it is dropped.
#[derive(Clone, Debug)]
pub struct Pose {
    skeleton: Arc<Skeleton>,
    local_transforms: Vec<Transform>,
    global_transforms: Vec<Transform>,
    state: PoseState,
}

impl Pose {
    pub fn new(skeleton: Arc<Skeleton>, initial_state: PoseInitialState) -> Self {
        let mut pose = Self {
            local_transforms: Vec::with_capacity(skeleton.num_bones()),
            global_transforms: Vec::new(),
            state: PoseState::Unset,
            skeleton,
        };
        pose.reset(initial_state, false);
        pose
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn num_bones(&self) -> usize {
        self.local_transforms.len()
    }

    pub fn state(&self) -> PoseState {
        self.state
    }

    pub fn set_state(&mut self, state: PoseState) {
        self.state = state;
    }

    pub fn is_pose_set(&self) -> bool {
        self.state != PoseState::Unset
    }

    pub fn is_reference_pose(&self) -> bool {
        self.state == PoseState::ReferencePose
    }

    pub fn is_zero_pose(&self) -> bool {
        self.state == PoseState::ZeroPose
    }

    pub fn is_additive_pose(&self) -> bool {
        self.state == PoseState::AdditivePose
    }

    /// Whether both poses are bound to the same skeleton instance.
    pub fn shares_skeleton(&self, other: &Pose) -> bool {
        Arc::ptr_eq(&self.skeleton, &other.skeleton)
    }

    pub fn reset(&mut self, initial_state: PoseInitialState, calculate_global_pose: bool) {
        self.local_transforms.clear();
        match initial_state {
            PoseInitialState::ReferencePose => {
                self.local_transforms
                    .extend_from_slice(self.skeleton.local_reference_pose());
                self.state = PoseState::ReferencePose;
            }
            PoseInitialState::ZeroPose => {
                self.local_transforms
                    .resize(self.skeleton.num_bones(), Transform::IDENTITY);
                self.state = PoseState::ZeroPose;
            }
        }

        if calculate_global_pose {
            self.calculate_global_transforms();
        } else {
            self.global_transforms.clear();
        }
    }

    pub fn copy_from(&mut self, other: &Pose) {
        assert!(self.shares_skeleton(other));
        self.local_transforms.clone_from(&other.local_transforms);
        self.global_transforms.clone_from(&other.global_transforms);
        self.state = other.state;
    }

    pub fn local_transform(&self, bone_index: usize) -> &Transform {
        &self.local_transforms[bone_index]
    }

    pub fn local_transforms(&self) -> &[Transform] {
        &self.local_transforms
    }

    /// Mutable access to all local transforms. Drops any cached global transforms.
    pub fn local_transforms_mut(&mut self) -> &mut [Transform] {
        self.global_transforms.clear();
        &mut self.local_transforms
    }

    pub fn set_transform(&mut self, bone_index: usize, transform: Transform) {
        self.local_transforms_mut()[bone_index] = transform;
    }

    pub fn set_rotation(&mut self, bone_index: usize, rotation: Quat) {
        self.local_transforms_mut()[bone_index].rotation = rotation;
    }

    pub fn set_translation(&mut self, bone_index: usize, translation: Vec3) {
        self.local_transforms_mut()[bone_index].translation = translation;
    }

    pub fn set_scale(&mut self, bone_index: usize, scale: Vec3) {
        self.local_transforms_mut()[bone_index].scale = scale;
    }

    pub fn has_global_transforms(&self) -> bool {
        !self.global_transforms.is_empty()
    }

    pub fn global_transforms(&self) -> &[Transform] {
        &self.global_transforms
    }

    pub fn clear_global_transforms(&mut self) {
        self.global_transforms.clear();
    }

    /// Computes and caches the model space transform of every bone.
    pub fn calculate_global_transforms(&mut self) {
        let parents = self.skeleton.parent_indices();

        self.global_transforms.clear();
        self.global_transforms.reserve(self.local_transforms.len());
        self.global_transforms.push(self.local_transforms[0]);

        for bone in 1..self.local_transforms.len() {
            let parent = parents[bone].expect("Only the root has no parent");
            let global = self.global_transforms[parent] * self.local_transforms[bone];
            self.global_transforms.push(global);
        }
    }

    /// Model space transform of a single bone.
    ///
    /// Uses the cache when present, otherwise walks the bone's ancestor chain without caching
    /// anything. The walk costs the depth of the bone, not the size of the skeleton.
    pub fn global_transform(&self, bone_index: usize) -> Transform {
        assert!(bone_index < self.local_transforms.len());

        if self.has_global_transforms() {
            return self.global_transforms[bone_index];
        }

        let mut chain = Vec::new();
        self.skeleton.ancestor_chain(bone_index, &mut chain);

        let mut ancestors = chain.iter().rev();
        let root = *ancestors.next().expect("Chain contains at least the bone");
        ancestors.fold(self.local_transforms[root], |global, bone| {
            global * self.local_transforms[*bone]
        })
    }
}
