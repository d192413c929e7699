mod pool;

pub use pool::{BoneMaskId, BoneMaskPool};

use bevy::reflect::Reflect;

/// Per-bone blend weights, one entry per bone of the skeleton the mask was built for.
///
/// A weight of `0.0` leaves the base pose untouched for that bone, `1.0` fully applies
/// whatever is being blended in.
#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct BoneMask {
    weights: Vec<f32>,
}

impl BoneMask {
    pub fn new(num_bones: usize, fixed_weight: f32) -> Self {
        assert!((0.0..=1.0).contains(&fixed_weight));
        Self {
            weights: vec![fixed_weight; num_bones],
        }
    }

    pub fn from_weights(weights: Vec<f32>) -> Self {
        Self { weights }
    }

    pub fn num_weights(&self) -> usize {
        self.weights.len()
    }

    pub fn weight(&self, bone_index: usize) -> f32 {
        self.weights[bone_index]
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn set_weight(&mut self, bone_index: usize, weight: f32) {
        assert!((0.0..=1.0).contains(&weight));
        self.weights[bone_index] = weight;
    }

    /// Every weight lies in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.weights.iter().all(|w| (0.0..=1.0).contains(w))
    }

    pub fn reset_weights(&mut self, fixed_weight: f32) {
        assert!((0.0..=1.0).contains(&fixed_weight));
        self.weights.fill(fixed_weight);
    }

    pub fn copy_from(&mut self, other: &BoneMask) {
        assert_eq!(self.weights.len(), other.weights.len());
        self.weights.copy_from_slice(&other.weights);
    }

    pub fn scale_weights(&mut self, scale: f32) {
        assert!((0.0..=1.0).contains(&scale));
        for weight in &mut self.weights {
            *weight *= scale;
        }
    }

    /// Per-bone product of both masks.
    pub fn combine(&mut self, other: &BoneMask) {
        assert_eq!(self.weights.len(), other.weights.len());
        for (weight, other_weight) in self.weights.iter_mut().zip(&other.weights) {
            *weight *= other_weight;
        }
    }

    /// Moves weights from `source` towards this mask; `blend_weight == 1` keeps this mask.
    pub fn blend_from(&mut self, source: &BoneMask, blend_weight: f32) {
        assert_eq!(self.weights.len(), source.weights.len());
        for (weight, source_weight) in self.weights.iter_mut().zip(&source.weights) {
            *weight = lerp(*source_weight, *weight, blend_weight);
        }
    }

    /// Moves this mask towards `target`; `blend_weight == 1` yields `target`.
    pub fn blend_to(&mut self, target: &BoneMask, blend_weight: f32) {
        assert_eq!(self.weights.len(), target.weights.len());
        for (weight, target_weight) in self.weights.iter_mut().zip(&target.weights) {
            *weight = lerp(*weight, *target_weight, blend_weight);
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
