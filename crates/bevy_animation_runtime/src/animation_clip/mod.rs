pub mod compression;
mod frame_time;
mod root_motion_data;
pub mod serial;

pub use frame_time::FrameTime;
pub use root_motion_data::RootMotionData;

use std::sync::Arc;

use bevy::{math::Vec3, transform::components::Transform};

use crate::{
    errors::{ClipError, ClipResult},
    interpolation::linear::InterpolateLinear,
    pose::{Pose, PoseState},
    skeleton::Skeleton,
};
use compression::{
    EncodedFloatRange, KEY_SIZE, TrackCompressionSettings, TrackFlags, decode_rotation,
    encode_rotation, encode_vec3,
};

/// Uncompressed keys of one bone, one transform per frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTrack {
    pub keys: Vec<Transform>,
}

/// Uncompressed clip, the input of [`AnimationClip::compress`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAnimation {
    pub frame_rate: f32,
    /// One track per skeleton bone, in bone order
    pub tracks: Vec<RawTrack>,
    /// Either empty or one root transform per frame
    pub root_motion: Vec<Transform>,
    pub is_additive: bool,
}

/// Compressed animation data for one skeleton.
///
/// Immutable once built. Sampling the same time always decodes the same bits, whichever
/// sampling method is used.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    skeleton: Arc<Skeleton>,
    num_frames: u32,
    frame_rate: f32,
    track_compression_settings: Vec<TrackCompressionSettings>,
    compressed_pose_data: Vec<u16>,
    root_motion: RootMotionData,
    is_additive: bool,
}

impl AnimationClip {
    /// Quantizes raw keyframes into the compressed track layout. Channels whose keys never
    /// change are stored once.
    pub fn compress(skeleton: Arc<Skeleton>, raw: &RawAnimation) -> ClipResult<Self> {
        if !(raw.frame_rate.is_finite() && raw.frame_rate > 0.) {
            return Err(ClipError::InvalidFrameRate(raw.frame_rate));
        }
        if raw.tracks.len() != skeleton.num_bones() {
            return Err(ClipError::TrackCountMismatch {
                tracks: raw.tracks.len(),
                bones: skeleton.num_bones(),
            });
        }

        let num_frames = raw.tracks[0].keys.len();
        if num_frames == 0 {
            return Err(ClipError::NoFrames);
        }
        for (bone, track) in raw.tracks.iter().enumerate() {
            if track.keys.len() != num_frames {
                return Err(ClipError::TrackLength {
                    bone,
                    keys: track.keys.len(),
                    expected: num_frames,
                });
            }
        }
        if !raw.root_motion.is_empty() && raw.root_motion.len() != num_frames {
            return Err(ClipError::RootMotionLength {
                keys: raw.root_motion.len(),
                expected: num_frames,
            });
        }

        let mut track_compression_settings = Vec::with_capacity(raw.tracks.len());
        let mut compressed_pose_data = Vec::new();

        for track in &raw.tracks {
            let track_start_index = u32::try_from(compressed_pose_data.len())
                .map_err(|_| ClipError::TooMuchData)?;
            let mut settings = TrackCompressionSettings {
                track_start_index,
                ..Default::default()
            };

            let rotations: Vec<[u16; 3]> = track
                .keys
                .iter()
                .map(|t| encode_rotation(t.rotation))
                .collect();
            if rotations.iter().all(|key| *key == rotations[0]) {
                settings.flags |= TrackFlags::IS_ROTATION_STATIC;
                compressed_pose_data.extend_from_slice(&rotations[0]);
            } else {
                compressed_pose_data.extend(rotations.iter().flatten());
            }

            let translations: Vec<Vec3> = track.keys.iter().map(|t| t.translation).collect();
            let (ranges, is_static) = quantization_ranges(&translations);
            settings.translation_range = ranges;
            if is_static {
                settings.flags |= TrackFlags::IS_TRANSLATION_STATIC;
            }
            push_vec3_channel(&mut compressed_pose_data, &translations, &ranges, is_static);

            let scales: Vec<Vec3> = track.keys.iter().map(|t| t.scale).collect();
            let (ranges, is_static) = quantization_ranges(&scales);
            settings.scale_range = ranges;
            if is_static {
                settings.flags |= TrackFlags::IS_SCALE_STATIC;
            }
            push_vec3_channel(&mut compressed_pose_data, &scales, &ranges, is_static);

            track_compression_settings.push(settings);
        }

        Ok(Self {
            skeleton,
            num_frames: num_frames as u32,
            frame_rate: raw.frame_rate,
            track_compression_settings,
            compressed_pose_data,
            root_motion: RootMotionData::new(raw.root_motion.clone()),
            is_additive: raw.is_additive,
        })
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn num_frames(&self) -> u32 {
        self.num_frames
    }

    pub fn is_single_frame(&self) -> bool {
        self.num_frames == 1
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Playback length in seconds, with every frame lasting `1 / frame_rate`.
    ///
    /// Sampling spreads percentages over the `num_frames - 1` intervals between keys, so the
    /// last key is reached at `percentage_through == 1` and held until the clip ends.
    pub fn duration(&self) -> f32 {
        self.num_frames as f32 / self.frame_rate
    }

    pub fn is_additive(&self) -> bool {
        self.is_additive
    }

    pub fn root_motion(&self) -> &RootMotionData {
        &self.root_motion
    }

    pub fn track_compression_settings(&self) -> &[TrackCompressionSettings] {
        &self.track_compression_settings
    }

    pub fn compressed_pose_data(&self) -> &[u16] {
        &self.compressed_pose_data
    }

    /// Structural checks sampling relies on. Sampling never re-checks these, so callers must
    /// check once after loading.
    pub fn is_valid(&self) -> bool {
        if self.num_frames == 0
            || self.track_compression_settings.len() != self.skeleton.num_bones()
        {
            return false;
        }

        if !self.root_motion.is_empty()
            && self.root_motion.num_frames() != self.num_frames as usize
        {
            return false;
        }

        let mut expected_start = 0;
        for settings in &self.track_compression_settings {
            if settings.track_start_index as usize != expected_start {
                return false;
            }
            expected_start += settings.track_size(self.num_frames as usize);
        }
        expected_start == self.compressed_pose_data.len()
    }

    /// Maps a playback percentage onto a frame time. The end of the clip maps onto the last
    /// key frame, never past it.
    pub fn frame_time(&self, percentage_through: f32) -> FrameTime {
        let percentage_through = percentage_through.clamp(0., 1.);
        let last_frame = self.num_frames - 1;

        if last_frame == 0 || percentage_through == 0. {
            return FrameTime::from_frame(0);
        }
        if percentage_through == 1. {
            return FrameTime::from_frame(last_frame);
        }

        let frame = percentage_through * last_frame as f32;
        let frame_index = (frame.floor() as u32).min(last_frame);
        let blend = if frame_index == last_frame {
            0.
        } else {
            (frame - frame_index as f32).clamp(0., 1.)
        };
        FrameTime::new(frame_index, blend)
    }

    /// Seconds from the start of the clip to `frame_time`.
    pub fn time(&self, frame_time: FrameTime) -> f32 {
        frame_time.as_float() / self.frame_rate
    }

    pub fn percentage_through(&self, frame_time: FrameTime) -> f32 {
        if self.is_single_frame() {
            return 0.;
        }
        frame_time.as_float() / (self.num_frames - 1) as f32
    }

    /// Decodes every bone track into `out_pose`, scanning the compressed buffer once.
    ///
    /// ### Panics
    /// Panics if `out_pose` is bound to a different skeleton or `frame_time` lies outside the
    /// clip.
    pub fn pose(&self, frame_time: FrameTime, out_pose: &mut Pose) {
        assert!(
            Arc::ptr_eq(out_pose.skeleton(), &self.skeleton),
            "Pose and clip are bound to different skeletons"
        );
        self.check_frame_time(frame_time);

        let mut data = self.compressed_pose_data.as_slice();
        let transforms = out_pose.local_transforms_mut();
        for (bone, settings) in self.track_compression_settings.iter().enumerate() {
            debug_assert_eq!(
                self.compressed_pose_data.len() - data.len(),
                settings.track_start_index as usize
            );
            let (transform, rest) = self.sample_track(data, settings, frame_time);
            transforms[bone] = transform;
            data = rest;
        }

        out_pose.set_state(if self.is_additive {
            PoseState::AdditivePose
        } else {
            PoseState::Pose
        });
    }

    /// Decodes a single bone's local transform without touching other tracks.
    pub fn local_space_transform(&self, bone_index: usize, frame_time: FrameTime) -> Transform {
        self.check_frame_time(frame_time);
        self.decode_bone(bone_index, frame_time)
    }

    /// Decodes the model space transform of a single bone from its ancestor chain, root
    /// first.
    pub fn global_space_transform(&self, bone_index: usize, frame_time: FrameTime) -> Transform {
        assert!(self.skeleton.is_valid_bone_index(bone_index));
        self.check_frame_time(frame_time);

        let mut chain = Vec::new();
        self.skeleton.ancestor_chain(bone_index, &mut chain);

        let mut ancestors = chain.iter().rev();
        let root = *ancestors.next().expect("Chain contains at least the bone");
        ancestors.fold(self.decode_bone(root, frame_time), |global, bone| {
            global * self.decode_bone(*bone, frame_time)
        })
    }

    /// Root motion between two times of this clip.
    pub fn root_motion_delta(&self, from: FrameTime, to: FrameTime) -> Transform {
        self.root_motion.delta(from, to)
    }

    fn check_frame_time(&self, frame_time: FrameTime) {
        assert!(frame_time.frame_index() < self.num_frames);
        assert!(
            frame_time.is_exactly_at_key_frame() || frame_time.frame_index() + 1 < self.num_frames,
            "Cannot interpolate past the last frame"
        );
    }

    fn decode_bone(&self, bone_index: usize, frame_time: FrameTime) -> Transform {
        let settings = &self.track_compression_settings[bone_index];
        let track = &self.compressed_pose_data[settings.track_start_index as usize..];
        self.sample_track(track, settings, frame_time).0
    }

    /// Samples the track at the start of `data`, returning the transform and the data
    /// following the track.
    fn sample_track<'d>(
        &self,
        data: &'d [u16],
        settings: &TrackCompressionSettings,
        frame_time: FrameTime,
    ) -> (Transform, &'d [u16]) {
        let mut cursor = TrackCursor {
            data,
            num_frames: self.num_frames as usize,
        };
        let rotation = cursor.channel(settings.is_rotation_static());
        let translation = cursor.channel(settings.is_translation_static());
        let scale = cursor.channel(settings.is_scale_static());

        let frame = frame_time.frame_index() as usize;
        let blend = frame_time.percentage_through();

        let transform = if frame_time.is_exactly_at_key_frame() {
            decode_key(settings, &rotation, &translation, &scale, frame)
        } else if blend >= 1. {
            decode_key(settings, &rotation, &translation, &scale, frame + 1)
        } else {
            Transform {
                rotation: rotation.interpolate(frame, blend, decode_rotation),
                translation: translation
                    .interpolate(frame, blend, |key| settings.decode_translation(key)),
                scale: scale.interpolate(frame, blend, |key| settings.decode_scale(key)),
            }
        };

        (transform, cursor.data)
    }
}

fn decode_key(
    settings: &TrackCompressionSettings,
    rotation: &Channel,
    translation: &Channel,
    scale: &Channel,
    frame: usize,
) -> Transform {
    Transform {
        rotation: decode_rotation(rotation.key(frame)),
        translation: settings.decode_translation(translation.key(frame)),
        scale: settings.decode_scale(scale.key(frame)),
    }
}

struct TrackCursor<'d> {
    data: &'d [u16],
    num_frames: usize,
}

impl<'d> TrackCursor<'d> {
    fn channel(&mut self, is_static: bool) -> Channel<'d> {
        let len = if is_static {
            KEY_SIZE
        } else {
            KEY_SIZE * self.num_frames
        };
        let (keys, rest) = self.data.split_at(len);
        self.data = rest;
        Channel { keys, is_static }
    }
}

struct Channel<'d> {
    keys: &'d [u16],
    is_static: bool,
}

impl Channel<'_> {
    fn key(&self, frame: usize) -> &[u16] {
        if self.is_static {
            &self.keys[..KEY_SIZE]
        } else {
            &self.keys[frame * KEY_SIZE..(frame + 1) * KEY_SIZE]
        }
    }

    fn interpolate<T: InterpolateLinear>(
        &self,
        frame: usize,
        blend: f32,
        decode: impl Fn(&[u16]) -> T,
    ) -> T {
        let from = decode(self.key(frame));
        if self.is_static {
            return from;
        }
        from.interpolate_linear(&decode(self.key(frame + 1)), blend)
    }
}

fn quantization_ranges(values: &[Vec3]) -> ([EncodedFloatRange; 3], bool) {
    let min = values.iter().copied().fold(Vec3::INFINITY, Vec3::min);
    let max = values.iter().copied().fold(Vec3::NEG_INFINITY, Vec3::max);
    let ranges = [
        EncodedFloatRange::from_min_max(min.x, max.x),
        EncodedFloatRange::from_min_max(min.y, max.y),
        EncodedFloatRange::from_min_max(min.z, max.z),
    ];
    let is_static = ranges.iter().all(|range| range.range_length == 0.);
    (ranges, is_static)
}

fn push_vec3_channel(
    data: &mut Vec<u16>,
    values: &[Vec3],
    ranges: &[EncodedFloatRange; 3],
    is_static: bool,
) {
    if is_static {
        data.extend_from_slice(&encode_vec3(values[0], ranges));
    } else {
        data.extend(values.iter().flat_map(|value| encode_vec3(*value, ranges)));
    }
}

/// Builds a clip holding `skeleton`'s reference pose for `num_frames` frames.
pub fn reference_pose_clip(
    skeleton: Arc<Skeleton>,
    num_frames: usize,
    frame_rate: f32,
) -> ClipResult<AnimationClip> {
    let raw = RawAnimation {
        frame_rate,
        tracks: skeleton
            .local_reference_pose()
            .iter()
            .map(|transform| RawTrack {
                keys: vec![*transform; num_frames],
            })
            .collect(),
        root_motion: Vec::new(),
        is_additive: false,
    };
    AnimationClip::compress(skeleton, &raw)
}
