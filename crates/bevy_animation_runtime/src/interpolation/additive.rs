use bevy::prelude::*;

use crate::{
    bone_mask::BoneMask,
    pose::{Pose, PoseState},
};

/// Applies an additive (delta) pose on top of a base pose.
///
/// An identity delta leaves the base untouched: translation is added, rotation and scale are
/// multiplied in.
pub struct AdditiveInterpolator<'a> {
    pub bone_mask: Option<&'a BoneMask>,
}

impl AdditiveInterpolator<'_> {
    pub fn interpolate_pose(&self, base: &mut Pose, overlay: &Pose, f: f32) {
        assert!(base.shares_skeleton(overlay));
        assert!(
            overlay.is_additive_pose(),
            "Only additive poses can be layered additively"
        );

        let base_transforms = base.local_transforms_mut();
        for (bone, (base_transform, delta)) in base_transforms
            .iter_mut()
            .zip(overlay.local_transforms())
            .enumerate()
        {
            let weight = f * self.bone_mask.map_or(1., |mask| mask.weight(bone));
            if weight == 0. {
                continue;
            }
            *base_transform = additive_blend(base_transform, delta, weight);
        }

        if !base.is_additive_pose() {
            base.set_state(PoseState::Pose);
        }
    }
}

fn additive_blend(base: &Transform, delta: &Transform, alpha: f32) -> Transform {
    Transform {
        translation: base.translation + alpha * delta.translation,
        rotation: base.rotation.slerp(delta.rotation * base.rotation, alpha),
        scale: base.scale * Vec3::ONE.lerp(delta.scale, alpha),
    }
}
