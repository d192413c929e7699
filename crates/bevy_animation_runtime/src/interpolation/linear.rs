use bevy::prelude::*;

use crate::{bone_mask::BoneMask, pose::Pose};

pub trait InterpolateLinear {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self;
}

impl InterpolateLinear for Vec3 {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.lerp(*other, f)
    }
}

impl InterpolateLinear for Quat {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        self.slerp(*other, f)
    }
}

impl InterpolateLinear for Transform {
    fn interpolate_linear(&self, other: &Self, f: f32) -> Self {
        Transform {
            translation: self.translation.interpolate_linear(&other.translation, f),
            rotation: self.rotation.interpolate_linear(&other.rotation, f),
            scale: self.scale.interpolate_linear(&other.scale, f),
        }
    }
}

/// Blends an overlay pose into a base pose, optionally restricted by a bone mask.
pub struct LinearInterpolator<'a> {
    pub bone_mask: Option<&'a BoneMask>,
}

impl LinearInterpolator<'_> {
    /// `f == 0` keeps `base`, `f == 1` replaces it with `overlay` (for bones with full mask
    /// weight).
    pub fn interpolate_pose(&self, base: &mut Pose, overlay: &Pose, f: f32) {
        assert!(base.shares_skeleton(overlay));
        if let Some(mask) = self.bone_mask {
            assert_eq!(mask.num_weights(), base.num_bones());
        }

        let overlay_state = overlay.state();
        let base_transforms = base.local_transforms_mut();
        for (bone, (base_transform, overlay_transform)) in base_transforms
            .iter_mut()
            .zip(overlay.local_transforms())
            .enumerate()
        {
            let weight = f * self.bone_mask.map_or(1., |mask| mask.weight(bone));
            if weight == 0. {
                continue;
            }
            *base_transform = base_transform.interpolate_linear(overlay_transform, weight);
        }

        if f == 1. && self.bone_mask.is_none() {
            base.set_state(overlay_state);
        } else if base.is_reference_pose() || base.is_zero_pose() {
            base.set_state(crate::pose::PoseState::Pose);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        pose::{PoseInitialState, PoseState},
        skeleton::tests::test_skeleton,
    };

    #[test]
    fn masked_blend_only_touches_weighted_bones() {
        let skeleton = Arc::new(test_skeleton());
        let mut base = Pose::new(skeleton.clone(), PoseInitialState::ZeroPose);
        let mut overlay = Pose::new(skeleton.clone(), PoseInitialState::ZeroPose);
        for bone in 0..overlay.num_bones() {
            overlay.set_translation(bone, Vec3::X * 2.);
        }
        overlay.set_state(PoseState::Pose);

        let mask = skeleton.bone_mask("upper_body").unwrap();
        LinearInterpolator {
            bone_mask: Some(mask),
        }
        .interpolate_pose(&mut base, &overlay, 0.5);

        assert_eq!(base.local_transform(0).translation, Vec3::ZERO);
        assert_eq!(base.local_transform(1).translation, Vec3::X);
        assert_eq!(base.local_transform(2).translation, Vec3::X);
        assert_eq!(base.local_transform(4).translation, Vec3::ZERO);
        assert_eq!(base.state(), PoseState::Pose);
    }

    #[test]
    fn full_blend_takes_overlay() {
        let skeleton = Arc::new(test_skeleton());
        let mut base = Pose::new(skeleton.clone(), PoseInitialState::ZeroPose);
        let overlay = Pose::new(skeleton, PoseInitialState::ReferencePose);

        LinearInterpolator { bone_mask: None }.interpolate_pose(&mut base, &overlay, 1.);

        for bone in 0..base.num_bones() {
            let expected = overlay.local_transform(bone);
            let blended = base.local_transform(bone);
            assert!(blended.translation.abs_diff_eq(expected.translation, 1e-6));
            assert!(blended.rotation.abs_diff_eq(expected.rotation, 1e-6));
        }
        assert!(base.is_reference_pose());
    }
}
