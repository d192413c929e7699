//! Decides which segments visualize a pose or a root motion trajectory, and draws them with
//! gizmos.

use bevy::{color::LinearRgba, gizmos::gizmos::Gizmos, math::Vec3, transform::components::Transform};

use crate::{
    pose::Pose,
    root_motion::{RootMotionDebugMode, RootMotionRecorder},
};

/// World space `(parent, child)` joint positions, one per non-root bone.
pub fn pose_bone_segments(pose: &Pose, world_transform: Transform) -> Vec<(Vec3, Vec3)> {
    let parents = pose.skeleton().parent_indices();
    let position = |bone: usize| world_transform * pose.global_transform(bone).translation;

    (1..pose.num_bones())
        .filter_map(|bone| {
            let parent = parents[bone]?;
            Some((position(parent), position(bone)))
        })
        .collect()
}

pub fn draw_pose(gizmos: &mut Gizmos, pose: &Pose, world_transform: Transform, color: LinearRgba) {
    for (start, end) in pose_bone_segments(pose, world_transform) {
        bone_gizmo(gizmos, start, end, color);
    }
}

/// Root motion segments, split into the expected and actual trajectories.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootMotionSegments {
    pub expected: Vec<(Vec3, Vec3)>,
    pub actual: Vec<(Vec3, Vec3)>,
}

pub fn root_motion_segments(recorder: &RootMotionRecorder) -> RootMotionSegments {
    let mut segments = RootMotionSegments::default();

    match recorder.debug_mode() {
        RootMotionDebugMode::Off => {}
        RootMotionDebugMode::DrawRoot => {
            let root = recorder.end_world_transform();
            let tip = root.translation + root.forward() * AXIS_LENGTH;
            segments.actual.push((root.translation, tip));
        }
        RootMotionDebugMode::DrawRecordedRootMotion
        | RootMotionDebugMode::DrawRecordedRootMotionAdvanced => {
            let recorded: Vec<_> = recorder.recorded_root_transforms().collect();
            for pair in recorded.windows(2) {
                segments
                    .actual
                    .push((pair[0].actual.translation, pair[1].actual.translation));
            }

            // Every recorded update also shows where root motion alone would have led
            if recorder.debug_mode() == RootMotionDebugMode::DrawRecordedRootMotionAdvanced {
                for pair in recorded.windows(2) {
                    segments
                        .expected
                        .push((pair[0].actual.translation, pair[1].expected.translation));
                }
            }
        }
    }

    segments
}

pub fn draw_root_motion(
    gizmos: &mut Gizmos,
    recorder: &RootMotionRecorder,
    color_expected: LinearRgba,
    color_actual: LinearRgba,
) {
    let segments = root_motion_segments(recorder);
    for (start, end) in segments.expected {
        gizmos.line(start, end, color_expected);
    }
    for (start, end) in segments.actual {
        gizmos.line(start, end, color_actual);
    }
}

const AXIS_LENGTH: f32 = 0.5;

fn bone_gizmo(gizmos: &mut Gizmos, start: Vec3, end: Vec3, color: LinearRgba) {
    if start == end {
        return;
    }

    const BONE_CENTER_RATIO: f32 = 0.3;
    const BONE_RADIUS: f32 = 0.05;

    let start_to_end = end - start;
    let waist = start + start_to_end * BONE_CENTER_RATIO;
    let (u, v) = start_to_end.normalize().any_orthonormal_pair();
    let corners = [u, v, -u, -v].map(|axis| waist + axis * BONE_RADIUS);

    for (i, corner) in corners.iter().enumerate() {
        gizmos.line(start, *corner, color);
        gizmos.line(*corner, corners[(i + 1) % corners.len()], color);
        gizmos.line(*corner, end, color);
    }
}
