use bevy::log::trace;

use super::BoneMask;

const INITIAL_POOL_SIZE: usize = 6;

/// Handle to a mask handed out by a [`BoneMaskPool`].
///
/// Only valid until the next [`BoneMaskPool::reset`]; the pool checks the generation on every
/// access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoneMaskId {
    index: u32,
    generation: u32,
}

impl BoneMaskId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Arena of transient bone masks owned by a single graph context.
#[derive(Debug)]
pub struct BoneMaskPool {
    masks: Vec<BoneMask>,
    num_bones: usize,
    first_free: usize,
    generation: u32,
}

impl BoneMaskPool {
    pub fn new(num_bones: usize) -> Self {
        Self {
            masks: (0..INITIAL_POOL_SIZE)
                .map(|_| BoneMask::new(num_bones, 0.0))
                .collect(),
            num_bones,
            first_free: 0,
            generation: 0,
        }
    }

    pub fn num_bones(&self) -> usize {
        self.num_bones
    }

    /// Number of masks allocated, handed out or not.
    pub fn capacity(&self) -> usize {
        self.masks.len()
    }

    pub fn num_acquired(&self) -> usize {
        self.first_free
    }

    /// Hands out the next free mask with every weight set to `initial_weight`.
    pub fn acquire(&mut self, initial_weight: f32) -> BoneMaskId {
        if self.first_free == self.masks.len() {
            let new_len = self.masks.len().max(1) * 2;
            trace!(
                "Growing bone mask pool from {} to {new_len}",
                self.masks.len()
            );
            let num_bones = self.num_bones;
            self.masks
                .resize_with(new_len, || BoneMask::new(num_bones, 0.0));
        }

        let index = self.first_free;
        self.first_free += 1;
        self.masks[index].reset_weights(initial_weight);

        BoneMaskId {
            index: index as u32,
            generation: self.generation,
        }
    }

    pub fn get(&self, id: BoneMaskId) -> &BoneMask {
        self.check(id);
        &self.masks[id.index()]
    }

    pub fn get_mut(&mut self, id: BoneMaskId) -> &mut BoneMask {
        self.check(id);
        &mut self.masks[id.index()]
    }

    /// Mutable access to two distinct masks at once, e.g. to combine one into the other.
    pub fn get_pair_mut(&mut self, a: BoneMaskId, b: BoneMaskId) -> (&mut BoneMask, &mut BoneMask) {
        self.check(a);
        self.check(b);
        assert_ne!(a.index, b.index, "Cannot borrow the same bone mask twice");

        if a.index() < b.index() {
            let (left, right) = self.masks.split_at_mut(b.index());
            (&mut left[a.index()], &mut right[0])
        } else {
            let (left, right) = self.masks.split_at_mut(a.index());
            (&mut right[0], &mut left[b.index()])
        }
    }

    /// Returns every mask to the pool. Ids handed out before this call become invalid.
    pub fn reset(&mut self) {
        self.first_free = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn check(&self, id: BoneMaskId) {
        assert_eq!(
            id.generation, self.generation,
            "Bone mask id used after its pool was reset"
        );
        assert!(id.index() < self.first_free);
    }
}
