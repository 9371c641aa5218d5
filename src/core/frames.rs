//! Frame data exchanged with the blending engine.
//!
//! Frame payloads are opaque: the blending engine produces them already
//! encoded for the device and the core only counts and times them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::types::GroupNumber;

/// One encoded animation frame and how long it stays on display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Device-ready frame bytes.
    pub payload: Vec<u8>,
    /// Display time in milliseconds.
    pub display_time_ms: u32,
}

impl Frame {
    /// Build a frame.
    pub fn new(payload: Vec<u8>, display_time_ms: u32) -> Self {
        Self {
            payload,
            display_time_ms,
        }
    }
}

/// Bounded unit of frames sized for an on-device queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendedChunk {
    /// Identifier assigned by the blending engine.
    pub id: u64,
    /// Frames in playback order.
    pub frames: Vec<Frame>,
}

impl BlendedChunk {
    /// Build a chunk.
    pub fn new(id: u64, frames: Vec<Frame>) -> Self {
        Self { id, frames }
    }

    /// Number of frames in the chunk.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// An empty chunk means every layer has finished.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Complete light sequence for devices without an on-device queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSequence {
    /// Frames in playback order.
    pub frames: Vec<Frame>,
}

impl LightSequence {
    /// Build a sequence.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Number of frames in the sequence.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Sum of every frame's display time.
    pub fn total_display_time(&self) -> Duration {
        Duration::from_millis(
            self.frames
                .iter()
                .map(|f| u64::from(f.display_time_ms))
                .sum(),
        )
    }

    /// No frames or no display time.
    pub fn is_empty(&self) -> bool {
        self.total_display_time().is_zero()
    }
}

/// Blending engine compositing the active animation layers of each group.
///
/// Implementations return empty chunks/sequences once no content remains.
pub trait FrameBlender: Send + Sync {
    /// Whether any content layer is active on `group`.
    fn has_active_layers(&self, group: GroupNumber) -> bool;

    /// Next chunk of the blended stream.
    fn next_chunk(&self, group: GroupNumber) -> BlendedChunk;

    /// Re-blend of the chunk currently playing, which has `frame_count` frames.
    fn reblend_chunk(&self, group: GroupNumber, frame_count: usize) -> BlendedChunk;

    /// Full sequence built from scratch.
    fn full_sequence(&self, group: GroupNumber) -> LightSequence;

    /// Full sequence continuing the one currently playing, which has
    /// `frame_count` frames.
    fn continue_sequence(&self, group: GroupNumber, frame_count: usize) -> LightSequence;
}
