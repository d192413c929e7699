use std::sync::Arc;

use bevy::{
    ecs::entity::Entity, log::debug, reflect::Reflect, tasks::TaskPool,
    transform::components::Transform,
};
use uuid::Uuid;

use super::SampledEventsBuffer;
use crate::{
    bone_mask::BoneMaskPool, pose::Pose, root_motion::RootMotionRecorder, skeleton::Skeleton,
    utils::transform::inverse_transform,
};

/// Opaque handle to the physics scene a character lives in. Nothing here looks inside it.
#[derive(Reflect, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysicsSceneHandle(pub Entity);

/// References a context borrows between `initialize` and `shutdown`.
struct ContextBindings<'a> {
    user_id: Uuid,
    task_pool: &'a TaskPool,
    previous_pose: &'a mut Pose,
    root_motion_recorder: &'a mut RootMotionRecorder,
    bone_mask_pool: BoneMaskPool,
}

/// Per character evaluation state of an animation graph.
///
/// A context is initialized once, updated at the start of every frame and shut down before
/// being dropped or rebound. It owns nothing it points to: the previous pose, the task pool
/// and the recorder belong to the caller and must outlive the binding. The bone mask pool
/// and the sampled events are owned and recycled every update.
///
/// Calling an accessor of bound data on an uninitialized context panics.
pub struct GraphContext<'a> {
    bindings: Option<ContextBindings<'a>>,
    delta_time: f32,
    update_id: u32,
    world_transform: Transform,
    world_transform_inverse: Transform,
    physics_scene: Option<PhysicsSceneHandle>,
    sampled_events: SampledEventsBuffer,
    #[cfg(feature = "dev_tools")]
    active_nodes: Vec<i16>,
}

impl Default for GraphContext<'_> {
    fn default() -> Self {
        Self {
            bindings: None,
            delta_time: 0.,
            update_id: 0,
            world_transform: Transform::IDENTITY,
            world_transform_inverse: Transform::IDENTITY,
            physics_scene: None,
            sampled_events: SampledEventsBuffer::default(),
            #[cfg(feature = "dev_tools")]
            active_nodes: Vec::new(),
        }
    }
}

impl<'a> GraphContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the context to a character. The bone mask pool is sized for the skeleton of
    /// `previous_pose`.
    ///
    /// ### Panics
    /// Panics if the context is already initialized or `user_id` is nil.
    pub fn initialize(
        &mut self,
        user_id: Uuid,
        task_pool: &'a TaskPool,
        previous_pose: &'a mut Pose,
        root_motion_recorder: &'a mut RootMotionRecorder,
    ) {
        assert!(
            !self.is_initialized(),
            "Graph context is already initialized"
        );
        assert!(!user_id.is_nil(), "Graph context needs a non-nil user id");

        let num_bones = previous_pose.num_bones();
        debug!("Initializing graph context for {user_id} ({num_bones} bones)");

        self.bindings = Some(ContextBindings {
            user_id,
            task_pool,
            previous_pose,
            root_motion_recorder,
            bone_mask_pool: BoneMaskPool::new(num_bones),
        });
        self.delta_time = 0.;
        self.update_id = 0;
        self.world_transform = Transform::IDENTITY;
        self.world_transform_inverse = Transform::IDENTITY;
        self.physics_scene = None;
        self.sampled_events.clear();
    }

    /// Prepares the context for one graph evaluation. Bone masks acquired during the
    /// previous update become invalid.
    ///
    /// ### Panics
    /// Panics if the context is not initialized or the previous pose has no global
    /// transforms.
    pub fn update(
        &mut self,
        delta_time: f32,
        world_transform: Transform,
        physics_scene: Option<PhysicsSceneHandle>,
    ) {
        let bindings = self.bindings_mut();
        assert!(
            bindings.previous_pose.has_global_transforms(),
            "Previous pose must have its global transforms calculated before an update"
        );
        bindings.bone_mask_pool.reset();

        self.delta_time = delta_time;
        self.world_transform = world_transform;
        self.world_transform_inverse = inverse_transform(&world_transform);
        self.physics_scene = physics_scene;
        self.update_id = self.update_id.wrapping_add(1);
        self.sampled_events.clear();

        #[cfg(feature = "dev_tools")]
        self.active_nodes.clear();
    }

    /// Releases the bone mask pool and every binding.
    ///
    /// ### Panics
    /// Panics if the context is not initialized.
    pub fn shutdown(&mut self) {
        let bindings = self
            .bindings
            .take()
            .unwrap_or_else(|| panic!("Cannot shut down an uninitialized graph context"));
        debug!(
            "Shutting down graph context for {} after {} updates",
            bindings.user_id, self.update_id
        );

        self.physics_scene = None;
        self.sampled_events.clear();
        #[cfg(feature = "dev_tools")]
        self.active_nodes.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.bindings.is_some()
    }

    pub fn user_id(&self) -> Uuid {
        self.bindings().user_id
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        self.bindings().previous_pose.skeleton()
    }

    /// Pose produced by the previous update.
    pub fn previous_pose(&self) -> &Pose {
        &*self.bindings().previous_pose
    }

    pub fn previous_pose_mut(&mut self) -> &mut Pose {
        &mut *self.bindings_mut().previous_pose
    }

    pub fn task_pool(&self) -> &'a TaskPool {
        self.bindings().task_pool
    }

    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Number of updates since initialization.
    pub fn update_id(&self) -> u32 {
        self.update_id
    }

    pub fn world_transform(&self) -> Transform {
        self.world_transform
    }

    pub fn world_transform_inverse(&self) -> Transform {
        self.world_transform_inverse
    }

    pub fn physics_scene(&self) -> Option<PhysicsSceneHandle> {
        self.physics_scene
    }

    pub fn bone_mask_pool(&self) -> &BoneMaskPool {
        &self.bindings().bone_mask_pool
    }

    pub fn bone_mask_pool_mut(&mut self) -> &mut BoneMaskPool {
        &mut self.bindings_mut().bone_mask_pool
    }

    pub fn sampled_events(&self) -> &SampledEventsBuffer {
        &self.sampled_events
    }

    pub fn sampled_events_mut(&mut self) -> &mut SampledEventsBuffer {
        &mut self.sampled_events
    }

    pub fn root_motion_recorder(&self) -> &RootMotionRecorder {
        &*self.bindings().root_motion_recorder
    }

    pub fn root_motion_recorder_mut(&mut self) -> &mut RootMotionRecorder {
        &mut *self.bindings_mut().root_motion_recorder
    }

    /// Marks a graph node as evaluated during this update.
    #[cfg(feature = "dev_tools")]
    pub fn track_active_node(&mut self, node_index: i16) {
        self.active_nodes.push(node_index);
    }

    /// Nodes evaluated during this update, in evaluation order.
    #[cfg(feature = "dev_tools")]
    pub fn active_nodes(&self) -> &[i16] {
        &self.active_nodes
    }

    fn bindings(&self) -> &ContextBindings<'a> {
        self.bindings
            .as_ref()
            .unwrap_or_else(|| panic!("Graph context is not initialized"))
    }

    fn bindings_mut(&mut self) -> &mut ContextBindings<'a> {
        self.bindings
            .as_mut()
            .unwrap_or_else(|| panic!("Graph context is not initialized"))
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::{Quat, Vec3};

    use super::*;
    use crate::{context::AnimationEvent, pose::PoseInitialState, skeleton::tests::test_skeleton};

    fn evaluated_pose() -> Pose {
        let mut pose = Pose::new(Arc::new(test_skeleton()), PoseInitialState::ReferencePose);
        pose.calculate_global_transforms();
        pose
    }

    fn user() -> Uuid {
        Uuid::from_u128(0x1234)
    }

    #[test]
    fn lifecycle() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        assert!(!context.is_initialized());

        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        assert!(context.is_initialized());
        assert_eq!(context.user_id(), user());
        assert_eq!(context.bone_mask_pool().num_bones(), 5);
        assert!(Arc::ptr_eq(context.skeleton(), context.previous_pose().skeleton()));

        let world = Transform::from_xyz(1., 2., 3.).with_rotation(Quat::from_rotation_y(1.));
        let physics_scene = PhysicsSceneHandle(Entity::PLACEHOLDER);
        context.update(1. / 60., world, Some(physics_scene));
        assert_eq!(context.update_id(), 1);
        assert_eq!(context.delta_time(), 1. / 60.);
        assert_eq!(context.world_transform(), world);
        assert_eq!(context.physics_scene(), Some(physics_scene));
        let round_trip = context.world_transform() * context.world_transform_inverse();
        assert!(round_trip.translation.abs_diff_eq(Vec3::ZERO, 1e-5));

        context.update(1. / 60., world, None);
        assert_eq!(context.update_id(), 2);
        assert_eq!(context.physics_scene(), None);

        context.shutdown();
        assert!(!context.is_initialized());
    }

    #[test]
    fn update_recycles_transient_state() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        context.update(0.1, Transform::IDENTITY, None);

        let mask = context.bone_mask_pool_mut().acquire(1.);
        assert_eq!(context.bone_mask_pool().get(mask).weight(4), 1.);
        context
            .sampled_events_mut()
            .emplace(2, AnimationEvent::StringId("step".into()), 0.5);
        context
            .root_motion_recorder_mut()
            .start_character_update(Transform::IDENTITY);
        context
            .root_motion_recorder_mut()
            .record_sampling(2, Transform::from_xyz(0., 0., 1.));

        context.update(0.1, Transform::IDENTITY, None);
        assert_eq!(context.bone_mask_pool().num_acquired(), 0);
        assert!(context.sampled_events().is_empty());
        context.shutdown();
    }

    #[cfg(feature = "dev_tools")]
    #[test]
    fn active_nodes_reset_every_update() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        context.update(0.1, Transform::IDENTITY, None);
        context.track_active_node(0);
        context.track_active_node(3);
        assert_eq!(context.active_nodes(), &[0, 3]);
        assert_eq!(context.root_motion_recorder().recorded_actions().len(), 0);

        context.update(0.1, Transform::IDENTITY, None);
        assert!(context.active_nodes().is_empty());
    }

    #[test]
    fn previous_pose_is_writable() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        {
            let mut context = GraphContext::new();
            context.initialize(user(), &task_pool, &mut pose, &mut recorder);
            context
                .previous_pose_mut()
                .set_translation(1, Vec3::new(0., 2., 0.));
            context.shutdown();
        }

        assert_eq!(pose.local_transform(1).translation, Vec3::new(0., 2., 0.));
    }

    #[test]
    #[should_panic(expected = "already initialized")]
    fn double_initialize_panics() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut other_pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();
        let mut other_recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        context.initialize(user(), &task_pool, &mut other_pose, &mut other_recorder);
    }

    #[test]
    #[should_panic(expected = "non-nil user id")]
    fn nil_user_id_panics() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        GraphContext::new().initialize(Uuid::nil(), &task_pool, &mut pose, &mut recorder);
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn update_before_initialize_panics() {
        GraphContext::new().update(0.1, Transform::IDENTITY, None);
    }

    #[test]
    #[should_panic(expected = "global transforms")]
    fn update_without_global_transforms_panics() {
        let task_pool = TaskPool::new();
        let mut pose = Pose::new(Arc::new(test_skeleton()), PoseInitialState::ReferencePose);
        let mut recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        context.update(0.1, Transform::IDENTITY, None);
    }

    #[test]
    #[should_panic(expected = "uninitialized")]
    fn double_shutdown_panics() {
        let task_pool = TaskPool::new();
        let mut pose = evaluated_pose();
        let mut recorder = RootMotionRecorder::default();

        let mut context = GraphContext::new();
        context.initialize(user(), &task_pool, &mut pose, &mut recorder);
        context.shutdown();
        context.shutdown();
    }
}
