use bevy::transform::components::Transform;

/// Recorder stand-in used when `dev_tools` is disabled. Every call is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct RootMotionRecorder;

impl RootMotionRecorder {
    #[inline(always)]
    pub fn start_character_update(&mut self, _world_transform: Transform) {}

    #[inline(always)]
    pub fn record_sampling(&mut self, _node_index: i16, _root_motion_delta: Transform) -> usize {
        0
    }

    #[inline(always)]
    pub fn record_modification(
        &mut self,
        _node_index: i16,
        _root_motion_delta: Transform,
    ) -> usize {
        0
    }

    #[inline(always)]
    pub fn record_blend(
        &mut self,
        _node_index: i16,
        _source_0: usize,
        _source_1: usize,
        _root_motion_delta: Transform,
    ) -> usize {
        0
    }

    #[inline(always)]
    pub fn end_character_update(&mut self, _world_transform: Transform) {}
}
