use bevy::transform::components::Transform;

use super::FrameTime;
use crate::{interpolation::linear::InterpolateLinear, utils::transform::inverse_transform};

/// Character root transform for every frame of a clip, in character space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootMotionData {
    transforms: Vec<Transform>,
}

impl RootMotionData {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn num_frames(&self) -> usize {
        self.transforms.len()
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Root transform at `frame_time`, or the identity if the clip has no root motion.
    pub fn transform(&self, frame_time: FrameTime) -> Transform {
        if self.transforms.is_empty() {
            return Transform::IDENTITY;
        }

        let from = frame_time.frame_index() as usize;
        if frame_time.is_exactly_at_key_frame() {
            return self.transforms[from];
        }
        if frame_time.percentage_through() >= 1. {
            return self.transforms[from + 1];
        }

        self.transforms[from]
            .interpolate_linear(&self.transforms[from + 1], frame_time.percentage_through())
    }

    /// Motion of the root between two times, expressed relative to the root at `from`.
    ///
    /// When `to` precedes `from` the clip is assumed to have looped: the delta to the end of
    /// the clip is followed by the delta from its start to `to`.
    pub fn delta(&self, from: FrameTime, to: FrameTime) -> Transform {
        if self.transforms.is_empty() {
            return Transform::IDENTITY;
        }

        if to >= from {
            return relative(&self.transform(from), &self.transform(to));
        }

        let first = self.transforms[0];
        let last = self.transforms[self.transforms.len() - 1];
        let pre_loop = relative(&self.transform(from), &last);
        let post_loop = relative(&first, &self.transform(to));
        pre_loop * post_loop
    }

    /// Delta from the first to the last frame.
    pub fn total_delta(&self) -> Transform {
        match (self.transforms.first(), self.transforms.last()) {
            (Some(first), Some(last)) => relative(first, last),
            _ => Transform::IDENTITY,
        }
    }

    /// Average speed of the root over a clip lasting `duration` seconds.
    pub fn average_linear_speed(&self, duration: f32) -> f32 {
        if duration <= 0. {
            return 0.;
        }
        self.total_delta().translation.length() / duration
    }
}

fn relative(from: &Transform, to: &Transform) -> Transform {
    inverse_transform(from) * *to
}

#[cfg(test)]
mod tests {
    use bevy::math::{Quat, Vec3};

    use super::*;

    fn walk_forward() -> RootMotionData {
        RootMotionData::new(
            (0..5)
                .map(|i| Transform::from_xyz(0., 0., i as f32))
                .collect(),
        )
    }

    #[test]
    fn forward_delta() {
        let root_motion = walk_forward();
        let delta = root_motion.delta(FrameTime::from_frame(1), FrameTime::new(3, 0.5));
        assert!(delta.translation.abs_diff_eq(Vec3::new(0., 0., 2.5), 1e-6));
        assert_eq!(root_motion.total_delta().translation, Vec3::new(0., 0., 4.));
        assert_eq!(root_motion.average_linear_speed(2.), 2.);
    }

    #[test]
    fn looping_delta_wraps_around() {
        let root_motion = walk_forward();
        let delta = root_motion.delta(FrameTime::from_frame(3), FrameTime::from_frame(1));
        // 3 -> 4 before the loop, 0 -> 1 after it
        assert!(delta.translation.abs_diff_eq(Vec3::new(0., 0., 2.), 1e-6));
    }

    #[test]
    fn delta_is_expressed_in_the_starting_frame() {
        let root_motion = RootMotionData::new(vec![
            Transform::from_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
            Transform::from_xyz(1., 0., 0.)
                .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        ]);
        let delta = root_motion.total_delta();
        // World +X is local +Z after a quarter turn around Y
        assert!(delta.translation.abs_diff_eq(Vec3::new(0., 0., 1.), 1e-6));
    }

    #[test]
    fn empty_track_has_no_motion() {
        let root_motion = RootMotionData::default();
        assert_eq!(
            root_motion.delta(FrameTime::from_frame(0), FrameTime::from_frame(3)),
            Transform::IDENTITY
        );
    }
}
