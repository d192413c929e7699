use bevy::{
    log::warn, platform::collections::HashMap, reflect::Reflect, transform::components::Transform,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Skeleton;
use crate::{bone_mask::BoneMask, errors::DefinitionError, utils::transform::TransformSerial};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SkeletonSerial {
    /// Bones in hierarchy order, parents first
    pub bones: Vec<BoneSerial>,
    #[serde(default)]
    pub bone_masks: Vec<BoneMaskSerial>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BoneSerial {
    pub name: String,
    /// Name of the parent bone. Only the root has none.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: TransformSerial,
}

#[derive(Reflect, Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum BoneMaskType {
    /// Bones missing from the weights map get weight zero
    #[default]
    Positive,
    /// Bones missing from the weights map get weight one
    Negative,
}

impl BoneMaskType {
    pub fn default_weight(&self) -> f32 {
        match self {
            BoneMaskType::Positive => 0.,
            BoneMaskType::Negative => 1.,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BoneMaskSerial {
    pub name: String,
    #[serde(default)]
    pub weights: HashMap<String, f32>,
    #[serde(default)]
    pub base: BoneMaskType,
}

impl SkeletonSerial {
    pub fn build(&self) -> Result<Skeleton, DefinitionError> {
        let bone_indices: HashMap<&str, usize> = self
            .bones
            .iter()
            .enumerate()
            .map(|(index, bone)| (bone.name.as_str(), index))
            .collect();

        let parent_indices = self
            .bones
            .iter()
            .map(|bone| {
                bone.parent
                    .as_ref()
                    .map(|parent| {
                        bone_indices.get(parent.as_str()).copied().ok_or_else(|| {
                            DefinitionError::UnknownParent {
                                bone: bone.name.clone(),
                                parent: parent.clone(),
                            }
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut bone_masks = IndexMap::with_capacity(self.bone_masks.len());
        for mask in &self.bone_masks {
            let mut weights = vec![mask.base.default_weight(); self.bones.len()];
            for (bone, weight) in &mask.weights {
                let index = bone_indices.get(bone.as_str()).copied().ok_or_else(|| {
                    DefinitionError::UnknownMaskBone {
                        mask: mask.name.clone(),
                        bone: bone.clone(),
                    }
                })?;
                if !(0.0..=1.0).contains(weight) {
                    warn!(
                        "Bone mask {:?} weight {weight} for {bone:?} is outside [0, 1], clamping",
                        mask.name
                    );
                }
                weights[index] = weight.clamp(0., 1.);
            }
            if bone_masks
                .insert(mask.name.clone(), BoneMask::from_weights(weights))
                .is_some()
            {
                warn!(
                    "Bone mask {:?} is defined twice, keeping the last one",
                    mask.name
                );
            }
        }

        Ok(Skeleton::new(
            self.bones.iter().map(|bone| bone.name.clone()).collect(),
            parent_indices,
            self.bones
                .iter()
                .map(|bone| Transform::from(bone.transform))
                .collect(),
            bone_masks,
        )?)
    }
}

impl Skeleton {
    /// Parses and builds a skeleton from a RON [`SkeletonSerial`].
    pub fn from_ron_str(source: &str) -> Result<Self, DefinitionError> {
        let serial: SkeletonSerial = ron::de::from_str(source)?;
        serial.build()
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec3;

    use super::*;
    use crate::errors::SkeletonError;

    const HUMANOID: &str = r#"(
        bones: [
            (name: "root"),
            (name: "spine", parent: Some("root"), transform: (translation: (0.0, 1.0, 0.0))),
            (name: "head", parent: Some("spine"), transform: (translation: (0.0, 0.5, 0.0))),
            (name: "hip", parent: Some("root"), transform: (translation: (0.2, 0.0, 0.0))),
        ],
        bone_masks: [
            (name: "upper_body", weights: { "spine": 1.0, "head": 1.0 }),
            (name: "no_head", weights: { "head": 0.0 }, base: Negative),
        ],
    )"#;

    #[test]
    fn builds_skeleton_from_ron() {
        let skeleton = Skeleton::from_ron_str(HUMANOID).unwrap();

        assert_eq!(skeleton.num_bones(), 4);
        assert_eq!(skeleton.parent_bone_index(2), Some(1));
        assert_eq!(skeleton.parent_bone_index(3), Some(0));
        assert_eq!(
            skeleton.global_reference_pose()[2].translation,
            Vec3::new(0., 1.5, 0.)
        );

        assert_eq!(skeleton.num_bone_masks(), 2);
        assert_eq!(
            skeleton.bone_mask("upper_body").unwrap().weights(),
            &[0., 1., 1., 0.]
        );
        assert_eq!(
            skeleton.bone_mask("no_head").unwrap().weights(),
            &[1., 1., 0., 1.]
        );
    }

    #[test]
    fn reports_unknown_names() {
        const UNKNOWN_PARENT: &str = r#"(
            bones: [(name: "root"), (name: "arm", parent: Some("torso"))],
        )"#;
        const UNKNOWN_MASK_BONE: &str = r#"(
            bones: [(name: "root")],
            bone_masks: [(name: "m", weights: { "tail": 1.0 })],
        )"#;

        let err = Skeleton::from_ron_str(UNKNOWN_PARENT).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::UnknownParent { ref bone, ref parent }
                if bone == "arm" && parent == "torso"
        ));

        let err = Skeleton::from_ron_str(UNKNOWN_MASK_BONE).unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownMaskBone { .. }));
    }

    #[test]
    fn forwards_hierarchy_errors() {
        const CHILD_BEFORE_PARENT: &str = r#"(
            bones: [
                (name: "root"),
                (name: "arm", parent: Some("hand")),
                (name: "hand", parent: Some("root")),
            ],
        )"#;

        let err = Skeleton::from_ron_str(CHILD_BEFORE_PARENT).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Skeleton(SkeletonError::ParentAfterChild { bone: 1, parent: 2 })
        ));

        assert!(matches!(
            Skeleton::from_ron_str("(bones: [(name: \"root\",)"),
            Err(DefinitionError::RonSpannedError(_))
        ));
    }
}
