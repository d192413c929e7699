use bevy::{reflect::Reflect, transform::components::Transform};

/// Number of updates kept in the recorded trajectory.
pub const RECORDED_ROOT_TRANSFORM_CAPACITY: usize = 500;

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RootMotionDebugMode {
    #[default]
    Off,
    DrawRoot,
    DrawRecordedRootMotion,
    DrawRecordedRootMotionAdvanced,
}

impl RootMotionDebugMode {
    pub fn records_trajectory(&self) -> bool {
        *self != RootMotionDebugMode::Off
    }
}

#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootMotionAction {
    Sample,
    Modification,
    Blend,
}

/// One root motion contribution of the current update.
///
/// Dependencies always point at earlier actions, so the actions of one update form a DAG
/// whose sinks are the most recent actions.
#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct RecordedAction {
    pub node_index: i16,
    pub action: RootMotionAction,
    pub root_motion_delta: Transform,
    pub dependencies: [Option<usize>; 2],
}

/// World transform predicted by the recorded root motion, next to the one actually reached.
#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct RecordedRootTransform {
    pub expected: Transform,
    pub actual: Transform,
}

#[derive(Clone, Debug)]
pub struct RootMotionRecorder {
    debug_mode: RootMotionDebugMode,
    recorded_actions: Vec<RecordedAction>,
    start_world_transform: Transform,
    end_world_transform: Transform,
    recorded_root_transforms: Vec<RecordedRootTransform>,
    /// Slot overwritten by the next recorded root transform once the buffer is full
    next_write_index: usize,
}

impl Default for RootMotionRecorder {
    fn default() -> Self {
        Self {
            debug_mode: RootMotionDebugMode::Off,
            recorded_actions: Vec::new(),
            start_world_transform: Transform::IDENTITY,
            end_world_transform: Transform::IDENTITY,
            recorded_root_transforms: Vec::with_capacity(RECORDED_ROOT_TRANSFORM_CAPACITY),
            next_write_index: 0,
        }
    }
}

impl RootMotionRecorder {
    pub fn debug_mode(&self) -> RootMotionDebugMode {
        self.debug_mode
    }

    pub fn set_debug_mode(&mut self, debug_mode: RootMotionDebugMode) {
        self.debug_mode = debug_mode;
    }

    /// Drops recorded actions and the recorded trajectory. The debug mode is kept.
    pub fn reset(&mut self) {
        self.recorded_actions.clear();
        self.recorded_root_transforms.clear();
        self.next_write_index = 0;
        self.start_world_transform = Transform::IDENTITY;
        self.end_world_transform = Transform::IDENTITY;
    }

    pub fn start_character_update(&mut self, world_transform: Transform) {
        self.start_world_transform = world_transform;
        self.recorded_actions.clear();
    }

    pub fn record_sampling(&mut self, node_index: i16, root_motion_delta: Transform) -> usize {
        self.push_action(RecordedAction {
            node_index,
            action: RootMotionAction::Sample,
            root_motion_delta,
            dependencies: [None, None],
        })
    }

    /// Records a modification of whatever action was recorded last.
    pub fn record_modification(&mut self, node_index: i16, root_motion_delta: Transform) -> usize {
        assert!(
            !self.recorded_actions.is_empty(),
            "A modification needs a previously recorded action"
        );
        let previous = self.recorded_actions.len() - 1;
        self.push_action(RecordedAction {
            node_index,
            action: RootMotionAction::Modification,
            root_motion_delta,
            dependencies: [Some(previous), None],
        })
    }

    /// Records a blend of two earlier actions. Sources must be given in recording order;
    /// blending an action with itself keeps a single dependency.
    pub fn record_blend(
        &mut self,
        node_index: i16,
        source_0: usize,
        source_1: usize,
        root_motion_delta: Transform,
    ) -> usize {
        let num_recorded = self.recorded_actions.len();
        assert!(
            source_0 < num_recorded && source_1 < num_recorded,
            "Blend sources must be recorded before the blend"
        );

        let dependencies = if source_0 == source_1 {
            [Some(source_0), None]
        } else {
            assert!(
                source_1 > source_0,
                "Blend sources must be recorded in increasing order"
            );
            [Some(source_0), Some(source_1)]
        };

        self.push_action(RecordedAction {
            node_index,
            action: RootMotionAction::Blend,
            root_motion_delta,
            dependencies,
        })
    }

    pub fn end_character_update(&mut self, world_transform: Transform) {
        self.end_world_transform = world_transform;

        if !self.debug_mode.records_trajectory() {
            return;
        }

        let expected = match self.recorded_actions.last() {
            Some(last) => self.start_world_transform * last.root_motion_delta,
            None => world_transform,
        };
        let recorded = RecordedRootTransform {
            expected,
            actual: world_transform,
        };

        if self.recorded_root_transforms.len() < RECORDED_ROOT_TRANSFORM_CAPACITY {
            self.recorded_root_transforms.push(recorded);
        } else {
            self.recorded_root_transforms[self.next_write_index] = recorded;
        }
        self.next_write_index = (self.next_write_index + 1) % RECORDED_ROOT_TRANSFORM_CAPACITY;
    }

    pub fn recorded_actions(&self) -> &[RecordedAction] {
        &self.recorded_actions
    }

    pub fn start_world_transform(&self) -> Transform {
        self.start_world_transform
    }

    pub fn end_world_transform(&self) -> Transform {
        self.end_world_transform
    }

    pub fn num_recorded_root_transforms(&self) -> usize {
        self.recorded_root_transforms.len()
    }

    /// Recorded trajectory, oldest first.
    pub fn recorded_root_transforms(&self) -> impl Iterator<Item = &RecordedRootTransform> {
        let split = if self.recorded_root_transforms.len() < RECORDED_ROOT_TRANSFORM_CAPACITY {
            0
        } else {
            self.next_write_index
        };
        let (newest, oldest) = self.recorded_root_transforms.split_at(split);
        oldest.iter().chain(newest)
    }

    fn push_action(&mut self, action: RecordedAction) -> usize {
        self.recorded_actions.push(action);
        self.recorded_actions.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::{Quat, Vec3};

    use super::*;

    fn recording() -> RootMotionRecorder {
        let mut recorder = RootMotionRecorder::default();
        recorder.set_debug_mode(RootMotionDebugMode::DrawRecordedRootMotion);
        recorder
    }

    #[test]
    fn expected_transform_applies_last_delta() {
        let mut recorder = recording();
        let start = Transform::from_xyz(0., 0., 5.).with_rotation(Quat::from_rotation_y(0.5));
        let sample_delta = Transform::from_xyz(0., 0., 1.);
        let modification_delta = Transform::from_xyz(0.5, 0., 1.);

        recorder.start_character_update(start);
        let sample = recorder.record_sampling(3, sample_delta);
        let modification = recorder.record_modification(4, modification_delta);
        let end = Transform::from_xyz(1., 0., 6.);
        recorder.end_character_update(end);

        assert_eq!(sample, 0);
        assert_eq!(modification, 1);
        assert_eq!(recorder.recorded_actions()[1].dependencies, [Some(0), None]);

        let recorded: Vec<_> = recorder.recorded_root_transforms().collect();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].expected, start * modification_delta);
        assert_eq!(recorded[0].actual, end);
        assert_eq!(recorder.start_world_transform(), start);
        assert_eq!(recorder.end_world_transform(), end);
    }

    #[test]
    fn empty_update_records_actual_transform() {
        let mut recorder = recording();
        let world = Transform::from_xyz(2., 0., 0.);
        recorder.start_character_update(Transform::IDENTITY);
        recorder.end_character_update(world);

        let recorded = recorder.recorded_root_transforms().next().unwrap();
        assert_eq!(recorded.expected, world);
        assert_eq!(recorded.actual, world);
    }

    #[test]
    fn actions_form_a_dag() {
        let mut recorder = recording();
        recorder.start_character_update(Transform::IDENTITY);
        let a = recorder.record_sampling(0, Transform::IDENTITY);
        let b = recorder.record_sampling(1, Transform::IDENTITY);
        let modified = recorder.record_modification(2, Transform::IDENTITY);
        let blend = recorder.record_blend(3, a, modified, Transform::IDENTITY);
        let self_blend = recorder.record_blend(4, blend, blend, Transform::IDENTITY);

        let actions = recorder.recorded_actions();
        assert_eq!(actions[modified].dependencies, [Some(b), None]);
        assert_eq!(actions[blend].dependencies, [Some(a), Some(modified)]);
        assert_eq!(actions[self_blend].dependencies, [Some(blend), None]);
        for (index, action) in actions.iter().enumerate() {
            assert!(action.dependencies.iter().flatten().all(|dep| *dep < index));
        }

        // A new update starts a new graph
        recorder.start_character_update(Transform::IDENTITY);
        assert!(recorder.recorded_actions().is_empty());
    }

    #[test]
    #[should_panic(expected = "increasing order")]
    fn blend_sources_out_of_order_panic() {
        let mut recorder = recording();
        recorder.start_character_update(Transform::IDENTITY);
        let a = recorder.record_sampling(0, Transform::IDENTITY);
        let b = recorder.record_sampling(1, Transform::IDENTITY);
        recorder.record_blend(2, b, a, Transform::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "recorded before the blend")]
    fn blend_with_unrecorded_source_panics() {
        let mut recorder = recording();
        recorder.start_character_update(Transform::IDENTITY);
        let a = recorder.record_sampling(0, Transform::IDENTITY);
        recorder.record_blend(1, a, a + 1, Transform::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "previously recorded action")]
    fn modification_without_source_panics() {
        let mut recorder = recording();
        recorder.start_character_update(Transform::IDENTITY);
        recorder.record_modification(0, Transform::IDENTITY);
    }

    #[test]
    fn trajectory_wraps_around_oldest_first() {
        let mut recorder = recording();
        let capacity = recorder.recorded_root_transforms.capacity();
        let extra = 7;
        for update in 0..RECORDED_ROOT_TRANSFORM_CAPACITY + extra {
            recorder.start_character_update(Transform::IDENTITY);
            recorder.end_character_update(Transform::from_xyz(update as f32, 0., 0.));
        }

        assert_eq!(
            recorder.num_recorded_root_transforms(),
            RECORDED_ROOT_TRANSFORM_CAPACITY
        );
        assert_eq!(recorder.recorded_root_transforms.capacity(), capacity);

        let xs: Vec<f32> = recorder
            .recorded_root_transforms()
            .map(|recorded| recorded.actual.translation.x)
            .collect();
        let expected: Vec<f32> = (extra..RECORDED_ROOT_TRANSFORM_CAPACITY + extra)
            .map(|update| update as f32)
            .collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn off_mode_records_no_trajectory() {
        let mut recorder = RootMotionRecorder::default();
        recorder.start_character_update(Transform::IDENTITY);
        recorder.record_sampling(0, Transform::from_translation(Vec3::X));
        recorder.end_character_update(Transform::from_translation(Vec3::X));

        assert_eq!(recorder.num_recorded_root_transforms(), 0);
        assert_eq!(recorder.recorded_actions().len(), 1);

        recorder.set_debug_mode(RootMotionDebugMode::DrawRoot);
        recorder.end_character_update(Transform::IDENTITY);
        recorder.reset();
        assert_eq!(recorder.num_recorded_root_transforms(), 0);
        assert_eq!(recorder.debug_mode(), RootMotionDebugMode::DrawRoot);
    }
}
