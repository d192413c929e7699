//! Quantized track encoding.
//!
//! Every bone owns one contiguous track in the clip's `u16` buffer, laid out in bone order:
//!
//! ```text
//! [rotation keys][translation keys][scale keys]
//! ```
//!
//! Each key is three words. A channel flagged static stores a single key, otherwise it stores
//! one key per frame. Rotations use a "smallest three" encoding, translation and scale
//! components are quantized over a per-track [`EncodedFloatRange`].

use std::f32::consts::FRAC_1_SQRT_2;

use bevy::{
    math::{Quat, Vec3},
    reflect::Reflect,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Words per encoded key, for every channel.
pub const KEY_SIZE: usize = 3;

const QUANTIZED_FLOAT_MAX: f32 = u16::MAX as f32;
/// Quantized value that decodes to exactly zero for rotation components.
const ROTATION_ZERO: u16 = 16383;
const ROTATION_MAX: u16 = 2 * ROTATION_ZERO;
const ROTATION_VALUE_MASK: u16 = 0x7FFF;

/// `[range_start, range_start + range_length]`, mapped onto the full `u16` range.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedFloatRange {
    pub range_start: f32,
    pub range_length: f32,
}

impl EncodedFloatRange {
    pub fn from_min_max(min: f32, max: f32) -> Self {
        Self {
            range_start: min,
            range_length: max - min,
        }
    }

    pub fn encode(&self, value: f32) -> u16 {
        if self.range_length == 0. {
            return 0;
        }
        let normalized = ((value - self.range_start) / self.range_length).clamp(0., 1.);
        (normalized * QUANTIZED_FLOAT_MAX).round() as u16
    }

    pub fn decode(&self, value: u16) -> f32 {
        self.range_start + (value as f32 / QUANTIZED_FLOAT_MAX) * self.range_length
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TrackFlags: u8 {
        const IS_ROTATION_STATIC = 1;
        const IS_TRANSLATION_STATIC = 1 << 1;
        const IS_SCALE_STATIC = 1 << 2;
    }
}

/// Decoding parameters of a single bone track.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackCompressionSettings {
    pub translation_range: [EncodedFloatRange; 3],
    pub scale_range: [EncodedFloatRange; 3],
    /// Offset of the track's first word in the clip's compressed buffer
    pub track_start_index: u32,
    pub flags: TrackFlags,
}

impl TrackCompressionSettings {
    pub fn is_rotation_static(&self) -> bool {
        self.flags.contains(TrackFlags::IS_ROTATION_STATIC)
    }

    pub fn is_translation_static(&self) -> bool {
        self.flags.contains(TrackFlags::IS_TRANSLATION_STATIC)
    }

    pub fn is_scale_static(&self) -> bool {
        self.flags.contains(TrackFlags::IS_SCALE_STATIC)
    }

    /// Number of words this track occupies for a clip of `num_frames` frames.
    pub fn track_size(&self, num_frames: usize) -> usize {
        let channel = |is_static: bool| {
            if is_static {
                KEY_SIZE
            } else {
                KEY_SIZE * num_frames
            }
        };
        channel(self.is_rotation_static())
            + channel(self.is_translation_static())
            + channel(self.is_scale_static())
    }

    pub fn decode_translation(&self, key: &[u16]) -> Vec3 {
        decode_vec3(key, &self.translation_range)
    }

    pub fn decode_scale(&self, key: &[u16]) -> Vec3 {
        decode_vec3(key, &self.scale_range)
    }
}

fn decode_vec3(key: &[u16], ranges: &[EncodedFloatRange; 3]) -> Vec3 {
    Vec3::new(
        ranges[0].decode(key[0]),
        ranges[1].decode(key[1]),
        ranges[2].decode(key[2]),
    )
}

pub(crate) fn encode_vec3(value: Vec3, ranges: &[EncodedFloatRange; 3]) -> [u16; 3] {
    [
        ranges[0].encode(value.x),
        ranges[1].encode(value.y),
        ranges[2].encode(value.z),
    ]
}

fn encode_rotation_component(value: f32) -> u16 {
    let normalized = (value / FRAC_1_SQRT_2).clamp(-1., 1.);
    (ROTATION_ZERO as f32 + (normalized * ROTATION_ZERO as f32).round()) as u16
}

fn decode_rotation_component(value: u16) -> f32 {
    let value = (value & ROTATION_VALUE_MASK).min(ROTATION_MAX);
    (value as f32 - ROTATION_ZERO as f32) / ROTATION_ZERO as f32 * FRAC_1_SQRT_2
}

/// Drops the largest component of the (normalized) quaternion and quantizes the other three
/// to 15 bits. The dropped component's index lives in the top bit of the first two words.
pub fn encode_rotation(rotation: Quat) -> [u16; 3] {
    let mut components = rotation.normalize().to_array();

    let largest = components
        .iter()
        .enumerate()
        .fold(0, |largest, (i, c)| {
            if c.abs() > components[largest].abs() {
                i
            } else {
                largest
            }
        });

    if components[largest] < 0. {
        for c in &mut components {
            *c = -*c;
        }
    }

    let mut encoded = [0u16; 3];
    let mut slot = 0;
    for (i, c) in components.iter().enumerate() {
        if i == largest {
            continue;
        }
        encoded[slot] = encode_rotation_component(*c);
        slot += 1;
    }

    encoded[0] |= ((largest as u16 >> 1) & 1) << 15;
    encoded[1] |= (largest as u16 & 1) << 15;
    encoded
}

pub fn decode_rotation(key: &[u16]) -> Quat {
    let largest = (((key[0] >> 15) << 1) | (key[1] >> 15)) as usize;
    let small = [
        decode_rotation_component(key[0]),
        decode_rotation_component(key[1]),
        decode_rotation_component(key[2]),
    ];

    let remaining = 1. - small.iter().map(|c| c * c).sum::<f32>();
    let mut components = [0.; 4];
    let mut slot = 0;
    for (i, c) in components.iter_mut().enumerate() {
        if i == largest {
            *c = remaining.max(0.).sqrt();
        } else {
            *c = small[slot];
            slot += 1;
        }
    }

    Quat::from_array(components).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rotation_is_exact() {
        let encoded = encode_rotation(Quat::IDENTITY);
        assert_eq!(encoded[2], ROTATION_ZERO);
        assert_eq!(decode_rotation(&encoded), Quat::IDENTITY);
    }

    #[test]
    fn rotation_within_quantization_error() {
        let rotations = [
            Quat::from_rotation_x(0.3),
            Quat::from_rotation_y(-2.9),
            Quat::from_euler(bevy::math::EulerRot::XYZ, 1.0, -0.5, 2.5),
            Quat::from_xyzw(-0.5, 0.5, -0.5, 0.5),
        ];

        for rotation in rotations {
            let decoded = decode_rotation(&encode_rotation(rotation));
            // q and -q are the same rotation
            assert!(
                decoded.dot(rotation).abs() > 0.99999,
                "{rotation:?} -> {decoded:?}"
            );
        }
    }

    #[test]
    fn float_range_endpoints_are_exact() {
        let range = EncodedFloatRange::from_min_max(0., 1.);
        assert_eq!(range.decode(range.encode(0.)), 0.);
        assert_eq!(range.decode(range.encode(1.)), 1.);
        assert_eq!(range.encode(2.), u16::MAX);

        let constant = EncodedFloatRange::from_min_max(4.5, 4.5);
        assert_eq!(constant.decode(constant.encode(4.5)), 4.5);
    }

    #[test]
    fn track_size_counts_static_channels_once() {
        let settings = TrackCompressionSettings {
            flags: TrackFlags::IS_ROTATION_STATIC | TrackFlags::IS_SCALE_STATIC,
            ..Default::default()
        };
        assert_eq!(settings.track_size(10), 3 + 30 + 3);
        assert_eq!(TrackCompressionSettings::default().track_size(2), 18);
    }
}
