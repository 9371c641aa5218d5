//! Queue-driven scheduler for devices with an on-device frame queue.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{PlaybackOutcome, PlaybackScheduler};
use crate::core::channel::{SharedChannel, StreamMode};
use crate::core::error::{DeviceError, LightsError};
use crate::core::frames::{BlendedChunk, FrameBlender};
use crate::util::types::GroupNumber;

#[derive(Debug, Default)]
struct ChunkState {
    active_frame_count: usize,
    last_chunk_id: Option<u64>,
    shut_down: bool,
}

/// Chunk scheduler for one group of a streaming device.
///
/// The group lock is held across the outbound push, so an external update
/// and a queue-empty notification arriving on the device callback thread are
/// forwarded strictly one after the other.
pub struct ChunkScheduler {
    feature: String,
    group: GroupNumber,
    channel: SharedChannel,
    blender: Arc<dyn FrameBlender>,
    state: Mutex<ChunkState>,
}

impl ChunkScheduler {
    /// Create an idle scheduler.
    pub fn new(
        feature: &str,
        group: GroupNumber,
        channel: SharedChannel,
        blender: Arc<dyn FrameBlender>,
    ) -> Self {
        Self {
            feature: feature.to_string(),
            group,
            channel,
            blender,
            state: Mutex::new(ChunkState::default()),
        }
    }

    /// Identifier of the last chunk pushed.
    pub fn last_chunk_id(&self) -> Option<u64> {
        self.state.lock().last_chunk_id
    }

    /// Synchronous form of [`PlaybackScheduler::update_device`].
    pub fn update(&self, restart: bool) -> Result<PlaybackOutcome, LightsError> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(self.shut_down_error());
        }
        if !self.blender.has_active_layers(self.group) {
            state.active_frame_count = 0;
            return Ok(PlaybackOutcome::Idle);
        }

        let chunk = if restart {
            self.blender.next_chunk(self.group)
        } else {
            self.blender
                .reblend_chunk(self.group, state.active_frame_count)
        };
        if chunk.is_empty() {
            debug!(feature = %self.feature, group = self.group, "blended content finished");
            state.active_frame_count = 0;
            return Ok(PlaybackOutcome::Idle);
        }

        if !restart && chunk.frame_count() != state.active_frame_count {
            warn!(
                feature = %self.feature,
                group = self.group,
                active = state.active_frame_count,
                offered = chunk.frame_count(),
                "continuation frame count mismatch, update skipped"
            );
            return Ok(PlaybackOutcome::Skipped {
                active: state.active_frame_count,
                offered: chunk.frame_count(),
            });
        }

        let mode = if restart {
            StreamMode::Restart
        } else {
            StreamMode::Continue
        };
        self.push(&mut state, &chunk, mode)
    }

    /// The device drained its queue for this group; feed the next chunk.
    pub fn on_queue_empty(&self) -> Result<PlaybackOutcome, LightsError> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Ok(PlaybackOutcome::Idle);
        }
        if !self.blender.has_active_layers(self.group) {
            state.active_frame_count = 0;
            return Ok(PlaybackOutcome::Idle);
        }

        let chunk = self.blender.next_chunk(self.group);
        if chunk.is_empty() {
            state.active_frame_count = 0;
            return Ok(PlaybackOutcome::Idle);
        }
        self.push(&mut state, &chunk, StreamMode::Queue)
    }

    fn push(
        &self,
        state: &mut ChunkState,
        chunk: &BlendedChunk,
        mode: StreamMode,
    ) -> Result<PlaybackOutcome, LightsError> {
        state.active_frame_count = chunk.frame_count();
        state.last_chunk_id = Some(chunk.id);

        match self
            .channel
            .stream_chunk(&self.feature, self.group, chunk, mode)
        {
            Ok(()) => {
                debug!(
                    feature = %self.feature,
                    group = self.group,
                    chunk = chunk.id,
                    frames = chunk.frame_count(),
                    ?mode,
                    "pushed chunk"
                );
                Ok(PlaybackOutcome::Sent {
                    frame_count: chunk.frame_count(),
                })
            }
            Err(DeviceError::NotOwned) => {
                debug!(feature = %self.feature, group = self.group, "chunk dropped, device not owned");
                Ok(PlaybackOutcome::Dropped)
            }
            Err(e) => Err(LightsError::device(&self.feature, e)),
        }
    }

    fn shut_down_error(&self) -> LightsError {
        LightsError::SchedulerShutdown {
            feature: self.feature.clone(),
            group: self.group,
        }
    }
}

#[async_trait]
impl PlaybackScheduler for ChunkScheduler {
    async fn update_device(&self, restart: bool) -> Result<PlaybackOutcome, LightsError> {
        self.update(restart)
    }

    async fn shutdown(&self) {
        let mut state = self.state.lock();
        if !state.shut_down {
            state.shut_down = true;
            state.active_frame_count = 0;
            debug!(feature = %self.feature, group = self.group, "chunk scheduler shut down");
        }
    }

    fn active_frame_count(&self) -> usize {
        self.state.lock().active_frame_count
    }
}
