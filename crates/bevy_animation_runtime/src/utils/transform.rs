use bevy::{
    math::{Mat4, Quat, Vec3},
    transform::components::Transform,
};
use serde::{Deserialize, Serialize};

/// Inverse of a transform, so that `transform * inverse_transform(transform)` is the identity
/// (up to precision). Non-uniform scale combined with rotation cannot always be represented
/// exactly by a `Transform`; the closest decomposition is returned in that case.
pub fn inverse_transform(transform: &Transform) -> Transform {
    if transform.scale == Vec3::ONE {
        let rotation = transform.rotation.inverse();
        return Transform {
            translation: rotation * -transform.translation,
            rotation,
            scale: Vec3::ONE,
        };
    }

    Transform::from_matrix(
        Mat4::from_scale_rotation_translation(
            transform.scale,
            transform.rotation,
            transform.translation,
        )
        .inverse(),
    )
}

/// Transform with plain array fields, as written in RON definitions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct TransformSerial {
    pub translation: [f32; 3],
    /// Quaternion as `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for TransformSerial {
    fn default() -> Self {
        Self::from(Transform::IDENTITY)
    }
}

impl From<TransformSerial> for Transform {
    fn from(value: TransformSerial) -> Self {
        Transform {
            translation: Vec3::from_array(value.translation),
            rotation: Quat::from_array(value.rotation).normalize(),
            scale: Vec3::from_array(value.scale),
        }
    }
}

impl From<Transform> for TransformSerial {
    fn from(value: Transform) -> Self {
        Self {
            translation: value.translation.to_array(),
            rotation: value.rotation.to_array(),
            scale: value.scale.to_array(),
        }
    }
}
