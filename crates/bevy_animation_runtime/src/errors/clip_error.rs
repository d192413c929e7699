use thiserror::Error;

/// Problems found while building a compressed clip from raw keyframes.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClipError {
    #[error("Clip has {tracks} tracks but the skeleton has {bones} bones")]
    TrackCountMismatch { tracks: usize, bones: usize },
    #[error("A clip needs at least one frame")]
    NoFrames,
    #[error("Track for bone {bone} has {keys} keys, expected {expected}")]
    TrackLength {
        bone: usize,
        keys: usize,
        expected: usize,
    },
    #[error("Root motion track has {keys} keys, expected {expected}")]
    RootMotionLength { keys: usize, expected: usize },
    #[error("Frame rate must be positive and finite, got {0}")]
    InvalidFrameRate(f32),
    #[error("Compressed data exceeds the addressable track range")]
    TooMuchData,
}

pub type ClipResult<T> = Result<T, ClipError>;
