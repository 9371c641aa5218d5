//! Per-group playback scheduling.
//!
//! A scheduler turns the blending engine's continuously updated content for
//! one device group into discrete device updates. Two variants exist:
//!
//! - [`ChunkScheduler`]: devices with an on-device frame queue. The device
//!   asks for more data through queue-empty notifications.
//! - [`LegacyScheduler`]: devices without a queue. A per-group actor keeps
//!   the host-side deadline and resends content when it expires.
//!
//! Both follow the same state machine: `Idle` (no active frame count) to
//! `Playing` (active frame count > 0) and back to `Idle` once the blended
//! content is exhausted. Continuing playback requires the new content to have
//! the same frame count as the content already playing; otherwise the update
//! is skipped with a warning.

mod chunk;
mod legacy;

use std::sync::Arc;

use async_trait::async_trait;

pub use chunk::ChunkScheduler;
pub use legacy::LegacyScheduler;

use crate::core::error::LightsError;

/// Result of one scheduling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Content was sent to the device.
    Sent {
        /// Frames in the content sent.
        frame_count: usize,
    },
    /// No content remains; the group is idle.
    Idle,
    /// Continuation rejected because its frame count differs from the content
    /// playing. Nothing was sent.
    Skipped {
        /// Frame count of the content playing.
        active: usize,
        /// Frame count of the rejected content.
        offered: usize,
    },
    /// Content was sent but dropped by the device layer (not owned).
    Dropped,
}

/// Coarse state of a group's playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing is playing.
    Idle,
    /// Content with this many frames is playing.
    Playing(usize),
}

/// Contract shared by both scheduler variants.
#[async_trait]
pub trait PlaybackScheduler: Send + Sync {
    /// React to a change of the group's blended content.
    ///
    /// `restart` starts the content from frame zero; otherwise the device is
    /// assumed mid-playback and the content only continues when its frame
    /// count matches.
    async fn update_device(&self, restart: bool) -> Result<PlaybackOutcome, LightsError>;

    /// Stop scheduling. Idempotent; no timer work happens after it returns.
    async fn shutdown(&self);

    /// Frame count of the content believed to be playing; 0 when idle.
    fn active_frame_count(&self) -> usize;

    /// Current state derived from the active frame count.
    fn state(&self) -> PlaybackState {
        match self.active_frame_count() {
            0 => PlaybackState::Idle,
            n => PlaybackState::Playing(n),
        }
    }
}

/// Scheduler attached to one device group.
#[derive(Clone)]
pub enum GroupPlayback {
    /// Queue-driven scheduler for streaming devices.
    Chunked(Arc<ChunkScheduler>),
    /// Timer-driven scheduler for legacy devices.
    Legacy(Arc<LegacyScheduler>),
}

impl GroupPlayback {
    /// Borrow as the shared contract.
    pub fn as_scheduler(&self) -> &dyn PlaybackScheduler {
        match self {
            Self::Chunked(s) => s.as_ref(),
            Self::Legacy(s) => s.as_ref(),
        }
    }
}

impl std::fmt::Debug for GroupPlayback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chunked(s) => f
                .debug_tuple("Chunked")
                .field(&s.active_frame_count())
                .finish(),
            Self::Legacy(s) => f
                .debug_tuple("Legacy")
                .field(&s.active_frame_count())
                .finish(),
        }
    }
}
