pub mod serial;

use std::{collections::HashSet, fmt::Debug};

use bevy::transform::components::Transform;
use indexmap::IndexMap;

use crate::{
    bone_mask::BoneMask,
    errors::{SkeletonError, SkeletonResult},
};

/// Immutable bone hierarchy.
///
/// A bone's index is its identity everywhere in this crate. Parents always precede their
/// children, so a single forward pass over the bones visits every parent before any of its
/// descendants.
#[derive(Clone)]
pub struct Skeleton {
    bone_ids: Vec<String>,
    parent_indices: Vec<Option<usize>>,
    local_reference_pose: Vec<Transform>,
    global_reference_pose: Vec<Transform>,
    bone_masks: IndexMap<String, BoneMask>,
}

impl Skeleton {
    /// Validates the hierarchy and computes the global reference pose.
    pub fn new(
        bone_ids: Vec<String>,
        parent_indices: Vec<Option<usize>>,
        local_reference_pose: Vec<Transform>,
        bone_masks: IndexMap<String, BoneMask>,
    ) -> SkeletonResult<Self> {
        if bone_ids.is_empty() {
            return Err(SkeletonError::Empty);
        }

        if bone_ids.len() != parent_indices.len() || bone_ids.len() != local_reference_pose.len() {
            return Err(SkeletonError::MismatchedLengths {
                bone_ids: bone_ids.len(),
                parents: parent_indices.len(),
                transforms: local_reference_pose.len(),
            });
        }

        for (bone, parent) in parent_indices.iter().enumerate() {
            match (bone, *parent) {
                (0, Some(parent)) => return Err(SkeletonError::RootHasParent(parent)),
                (0, None) => {}
                (bone, None) => return Err(SkeletonError::MultipleRoots(bone)),
                (bone, Some(parent)) if parent >= bone => {
                    return Err(SkeletonError::ParentAfterChild { bone, parent });
                }
                _ => {}
            }
        }

        let mut seen = HashSet::with_capacity(bone_ids.len());
        for id in &bone_ids {
            if !seen.insert(id.as_str()) {
                return Err(SkeletonError::DuplicateBoneId(id.clone()));
            }
        }

        for (name, mask) in &bone_masks {
            if mask.num_weights() != bone_ids.len() {
                return Err(SkeletonError::BoneMaskLength {
                    name: name.clone(),
                    weights: mask.num_weights(),
                    bones: bone_ids.len(),
                });
            }
        }

        let mut global_reference_pose = Vec::with_capacity(local_reference_pose.len());
        global_reference_pose.push(local_reference_pose[0]);
        for bone in 1..local_reference_pose.len() {
            let parent = parent_indices[bone].expect("Validated above");
            let global = global_reference_pose[parent] * local_reference_pose[bone];
            global_reference_pose.push(global);
        }

        Ok(Self {
            bone_ids,
            parent_indices,
            local_reference_pose,
            global_reference_pose,
            bone_masks,
        })
    }

    pub fn num_bones(&self) -> usize {
        self.bone_ids.len()
    }

    pub fn is_valid_bone_index(&self, bone_index: usize) -> bool {
        bone_index < self.bone_ids.len()
    }

    pub fn bone_id(&self, bone_index: usize) -> &str {
        &self.bone_ids[bone_index]
    }

    pub fn bone_ids(&self) -> &[String] {
        &self.bone_ids
    }

    pub fn bone_index(&self, bone_id: &str) -> Option<usize> {
        self.bone_ids.iter().position(|id| id == bone_id)
    }

    /// Returns `None` for the root.
    ///
    /// ### Panics
    /// Panics if `bone_index` is out of range.
    pub fn parent_bone_index(&self, bone_index: usize) -> Option<usize> {
        assert!(self.is_valid_bone_index(bone_index));
        self.parent_indices[bone_index]
    }

    pub fn parent_indices(&self) -> &[Option<usize>] {
        &self.parent_indices
    }

    /// First bone whose parent is `parent`, or `None` for leaf bones.
    pub fn first_child_bone_index(&self, parent: usize) -> Option<usize> {
        assert!(self.is_valid_bone_index(parent));
        (parent + 1..self.num_bones()).find(|bone| self.parent_indices[*bone] == Some(parent))
    }

    /// Whether `parent` is a (possibly indirect) ancestor of `child`.
    pub fn is_child_bone_of(&self, parent: usize, child: usize) -> bool {
        assert!(self.is_valid_bone_index(parent));
        assert!(self.is_valid_bone_index(child));

        let mut current = self.parent_indices[child];
        while let Some(bone) = current {
            if bone == parent {
                return true;
            }
            current = self.parent_indices[bone];
        }
        false
    }

    pub fn are_bones_in_the_same_hierarchy(&self, a: usize, b: usize) -> bool {
        a == b || self.is_child_bone_of(a, b) || self.is_child_bone_of(b, a)
    }

    /// Fills `chain` with `bone_index` followed by each of its ancestors up to the root.
    pub(crate) fn ancestor_chain(&self, bone_index: usize, chain: &mut Vec<usize>) {
        chain.clear();
        let mut current = Some(bone_index);
        while let Some(bone) = current {
            chain.push(bone);
            current = self.parent_indices[bone];
        }
    }

    pub fn local_reference_pose(&self) -> &[Transform] {
        &self.local_reference_pose
    }

    pub fn global_reference_pose(&self) -> &[Transform] {
        &self.global_reference_pose
    }

    /// Model space transform of a bone in the reference pose, composed from its local
    /// transform and those of all its ancestors.
    pub fn bone_model_space_transform(&self, bone_index: usize) -> Transform {
        assert!(self.is_valid_bone_index(bone_index));

        let mut chain = Vec::new();
        self.ancestor_chain(bone_index, &mut chain);

        let mut ancestors = chain.iter().rev();
        let root = *ancestors.next().expect("Chain contains at least the bone");
        ancestors.fold(self.local_reference_pose[root], |model, bone| {
            model * self.local_reference_pose[*bone]
        })
    }

    pub fn num_bone_masks(&self) -> usize {
        self.bone_masks.len()
    }

    pub fn bone_mask_index(&self, name: &str) -> Option<usize> {
        self.bone_masks.get_index_of(name)
    }

    pub fn bone_mask(&self, name: &str) -> Option<&BoneMask> {
        self.bone_masks.get(name)
    }

    pub fn bone_mask_by_index(&self, mask_index: usize) -> &BoneMask {
        &self.bone_masks[mask_index]
    }

    fn indent(f: &mut std::fmt::Formatter<'_>, level: u32) -> std::fmt::Result {
        if level == 0 {
            return Ok(());
        }
        for _ in 0..(level - 1) {
            write!(f, "┃ ")?;
        }
        write!(f, "┣━")?;
        Ok(())
    }

    fn fmt_level(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        level: u32,
        bone: usize,
    ) -> std::fmt::Result {
        Self::indent(f, level)?;
        writeln!(f, "🦴 {:?} [{bone}]", self.bone_ids[bone])?;

        let mut child = self.first_child_bone_index(bone);
        while let Some(current) = child {
            self.fmt_level(f, level + 1, current)?;
            child = (current + 1..self.num_bones())
                .find(|other| self.parent_indices[*other] == Some(bone));
        }
        Ok(())
    }
}

impl Debug for Skeleton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Skeleton hierarchy:")?;
        self.fmt_level(f, 0, 0)
    }
}
