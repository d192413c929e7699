use std::sync::Arc;

use bevy::{log::warn, transform::components::Transform};
use serde::{Deserialize, Serialize};

use super::{AnimationClip, RawAnimation, RawTrack};
use crate::{errors::DefinitionError, skeleton::Skeleton, utils::transform::TransformSerial};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AnimationClipSerial {
    pub frame_rate: f32,
    #[serde(default)]
    pub additive: bool,
    pub tracks: Vec<RawTrackSerial>,
    #[serde(default)]
    pub root_motion: Option<Vec<TransformSerial>>,
}

/// Keys of one bone, one per frame.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RawTrackSerial {
    pub bone: String,
    pub keys: Vec<TransformSerial>,
}

impl AnimationClipSerial {
    /// Builds a clip for `skeleton`. Bones without a track hold their reference pose for the
    /// whole clip.
    pub fn build(&self, skeleton: Arc<Skeleton>) -> Result<AnimationClip, DefinitionError> {
        let num_frames = self
            .tracks
            .first()
            .map(|track| track.keys.len())
            .or_else(|| self.root_motion.as_ref().map(Vec::len))
            .unwrap_or(1);

        let mut tracks: Vec<Option<RawTrack>> = vec![None; skeleton.num_bones()];
        for track in &self.tracks {
            let bone = skeleton
                .bone_index(&track.bone)
                .ok_or_else(|| DefinitionError::UnknownTrackBone(track.bone.clone()))?;
            if tracks[bone].is_some() {
                warn!(
                    "Bone {:?} has more than one track, keeping the last one",
                    track.bone
                );
            }
            tracks[bone] = Some(RawTrack {
                keys: track.keys.iter().copied().map(Transform::from).collect(),
            });
        }

        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(bone, track)| {
                track.unwrap_or_else(|| {
                    if !self.additive {
                        warn!(
                            "Bone {:?} has no track, holding its reference pose",
                            skeleton.bone_id(bone)
                        );
                    }
                    let key = if self.additive {
                        Transform::IDENTITY
                    } else {
                        skeleton.local_reference_pose()[bone]
                    };
                    RawTrack {
                        keys: vec![key; num_frames],
                    }
                })
            })
            .collect();

        let raw = RawAnimation {
            frame_rate: self.frame_rate,
            tracks,
            root_motion: self
                .root_motion
                .iter()
                .flatten()
                .copied()
                .map(Transform::from)
                .collect(),
            is_additive: self.additive,
        };

        Ok(AnimationClip::compress(skeleton, &raw)?)
    }
}

impl AnimationClip {
    /// Parses a RON [`AnimationClipSerial`] and compresses it for `skeleton`.
    pub fn from_ron_str(skeleton: Arc<Skeleton>, source: &str) -> Result<Self, DefinitionError> {
        let serial: AnimationClipSerial = ron::de::from_str(source)?;
        serial.build(skeleton)
    }
}
