use bevy::reflect::Reflect;

/// A position within a clip: a key frame index plus the blend weight towards the next key.
///
/// Ordering is lexicographic, so later times compare greater.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct FrameTime {
    frame_index: u32,
    percentage_through: f32,
}

impl FrameTime {
    pub fn new(frame_index: u32, percentage_through: f32) -> Self {
        assert!(
            (0. ..=1.).contains(&percentage_through),
            "Frame blend weight must lie in [0, 1], got {percentage_through}"
        );
        Self {
            frame_index,
            percentage_through,
        }
    }

    pub fn from_frame(frame_index: u32) -> Self {
        Self {
            frame_index,
            percentage_through: 0.,
        }
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn percentage_through(&self) -> f32 {
        self.percentage_through
    }

    /// No interpolation is needed to sample this time.
    pub fn is_exactly_at_key_frame(&self) -> bool {
        self.percentage_through == 0.
    }

    pub fn lower_bound_frame(&self) -> u32 {
        self.frame_index
    }

    pub fn upper_bound_frame(&self) -> u32 {
        if self.is_exactly_at_key_frame() {
            self.frame_index
        } else {
            self.frame_index + 1
        }
    }

    pub fn nearest_frame(&self) -> u32 {
        if self.percentage_through >= 0.5 {
            self.frame_index + 1
        } else {
            self.frame_index
        }
    }

    /// Fractional frame number.
    pub fn as_float(&self) -> f32 {
        self.frame_index as f32 + self.percentage_through
    }
}
