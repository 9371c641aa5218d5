//! Shared fakes for integration tests: broker, raw channel and blender.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use cabinet_lights::core::{
    AcquireResponse, BitwiseControl, BlendedChunk, DeviceError, FailureReason, FeatureDescription,
    Frame, FrameBlender, LightChannel, LightSequence, MonochromeLevels, ResourceBroker, RgbColors,
    SequenceMode, StreamMode,
};
use cabinet_lights::util::{DeviceKind, GroupNumber, Priority};

/// Broker fake: features are connected with a group count and may be held by
/// another client.
#[derive(Default)]
pub struct FakeBroker {
    connected: Mutex<HashMap<String, u8>>,
    foreign: Mutex<HashMap<String, FailureReason>>,
    grant_without_description: Mutex<bool>,
    pub requests: Mutex<Vec<(DeviceKind, String, Priority)>>,
    pub releases: Mutex<Vec<String>>,
}

impl FakeBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect(&self, feature: &str, groups: u8) {
        self.connected.lock().insert(feature.to_string(), groups);
    }

    pub fn disconnect(&self, feature: &str) {
        self.connected.lock().remove(feature);
    }

    pub fn hold_elsewhere(&self, feature: &str, reason: FailureReason) {
        self.foreign.lock().insert(feature.to_string(), reason);
    }

    pub fn free(&self, feature: &str) {
        self.foreign.lock().remove(feature);
    }

    pub fn grant_without_description(&self, on: bool) {
        *self.grant_without_description.lock() = on;
    }

    pub fn request_count(&self, feature: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(_, f, _)| f == feature)
            .count()
    }
}

impl ResourceBroker for FakeBroker {
    fn request_acquire(&self, kind: DeviceKind, feature: &str, priority: Priority) -> AcquireResponse {
        self.requests
            .lock()
            .push((kind, feature.to_string(), priority));
        if let Some(reason) = self.foreign.lock().get(feature) {
            return AcquireResponse::Denied(reason.clone());
        }
        if *self.grant_without_description.lock() || self.connected.lock().contains_key(feature) {
            AcquireResponse::Granted
        } else {
            AcquireResponse::Denied(FailureReason::DeviceAbsent)
        }
    }

    fn release(&self, _kind: DeviceKind, feature: &str) {
        self.releases.lock().push(feature.to_string());
    }

    fn feature_description(&self, feature: &str) -> Option<FeatureDescription> {
        self.connected
            .lock()
            .get(feature)
            .map(|&groups| FeatureDescription::new(groups))
    }
}

/// One call seen by the recording channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub feature: String,
    pub group: GroupNumber,
    pub op: &'static str,
    pub frames: usize,
}

/// Raw channel fake recording every call, with per-(feature, group) error
/// injection.
#[derive(Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<(String, GroupNumber), DeviceError>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, feature: &str, group: GroupNumber, error: DeviceError) {
        self.failures
            .lock()
            .insert((feature.to_string(), group), error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn groups_for(&self, feature: &str) -> Vec<GroupNumber> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.feature == feature)
            .map(|c| c.group)
            .collect()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|c| c.op).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(
        &self,
        feature: &str,
        group: GroupNumber,
        op: &'static str,
        frames: usize,
    ) -> Result<(), DeviceError> {
        self.calls.lock().push(Call {
            feature: feature.to_string(),
            group,
            op,
            frames,
        });
        match self.failures.lock().get(&(feature.to_string(), group)) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl LightChannel for RecordingChannel {
    fn turn_off_group(&self, feature: &str, group: GroupNumber, _: Duration) -> Result<(), DeviceError> {
        self.record(feature, group, "turn_off", 0)
    }

    fn control_lights_monochrome(
        &self,
        feature: &str,
        group: GroupNumber,
        _: &MonochromeLevels,
        _: Duration,
    ) -> Result<(), DeviceError> {
        self.record(feature, group, "monochrome", 0)
    }

    fn control_lights_rgb(
        &self,
        feature: &str,
        group: GroupNumber,
        _: &RgbColors,
        _: Duration,
    ) -> Result<(), DeviceError> {
        self.record(feature, group, "rgb", 0)
    }

    fn start_sequence(
        &self,
        feature: &str,
        group: GroupNumber,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<(), DeviceError> {
        let op = match mode {
            SequenceMode::Restart => "sequence_restart",
            SequenceMode::Continue => "sequence_continue",
        };
        self.record(feature, group, op, sequence.frame_count())
    }

    fn bitwise_light_control(
        &self,
        feature: &str,
        group: GroupNumber,
        _: BitwiseControl,
    ) -> Result<(), DeviceError> {
        self.record(feature, group, "bitwise", 0)
    }

    fn stream_chunk(
        &self,
        feature: &str,
        group: GroupNumber,
        chunk: &BlendedChunk,
        mode: StreamMode,
    ) -> Result<(), DeviceError> {
        let op = match mode {
            StreamMode::Restart => "chunk_restart",
            StreamMode::Continue => "chunk_continue",
            StreamMode::Queue => "chunk_queue",
        };
        self.record(feature, group, op, chunk.frame_count())
    }

    fn is_sequence_running(&self, _: &str, _: GroupNumber) -> Result<bool, DeviceError> {
        Ok(false)
    }

    fn intensity(&self, _: &str) -> Result<u8, DeviceError> {
        Ok(100)
    }

    fn set_intensity(&self, _: &str, _: u8) -> Result<(), DeviceError> {
        Ok(())
    }
}

/// Build `count` frames of `ms` each.
pub fn frames(count: usize, ms: u32) -> Vec<Frame> {
    (0..count).map(|i| Frame::new(vec![i as u8], ms)).collect()
}

/// Blender fake driven by scripted chunk and sequence sizes.
#[derive(Default)]
pub struct ScriptedBlender {
    active: Mutex<bool>,
    chunks: Mutex<VecDeque<usize>>,
    reblend: Mutex<Option<usize>>,
    sequences: Mutex<VecDeque<(usize, u32)>>,
    continuation: Mutex<Option<(usize, u32)>>,
    next_id: Mutex<u64>,
}

impl ScriptedBlender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_active(&self, active: bool) {
        *self.active.lock() = active;
    }

    /// Queue chunk sizes returned by `next_chunk`; 0 is an empty chunk.
    pub fn push_chunks(&self, sizes: &[usize]) {
        self.chunks.lock().extend(sizes.iter().copied());
    }

    pub fn set_reblend(&self, size: usize) {
        *self.reblend.lock() = Some(size);
    }

    /// Queue full sequences `(frames, ms per frame)`; 0 frames is empty.
    pub fn push_sequences(&self, sequences: &[(usize, u32)]) {
        self.sequences.lock().extend(sequences.iter().copied());
    }

    pub fn set_continuation(&self, frames: usize, ms: u32) {
        *self.continuation.lock() = Some((frames, ms));
    }

    fn chunk(&self, size: usize) -> BlendedChunk {
        let mut id = self.next_id.lock();
        *id += 1;
        BlendedChunk::new(*id, frames(size, 10))
    }
}

impl FrameBlender for ScriptedBlender {
    fn has_active_layers(&self, _group: GroupNumber) -> bool {
        *self.active.lock()
    }

    fn next_chunk(&self, _group: GroupNumber) -> BlendedChunk {
        let size = self.chunks.lock().pop_front().unwrap_or(0);
        self.chunk(size)
    }

    fn reblend_chunk(&self, _group: GroupNumber, frame_count: usize) -> BlendedChunk {
        let size = self.reblend.lock().unwrap_or(frame_count);
        self.chunk(size)
    }

    fn full_sequence(&self, _group: GroupNumber) -> LightSequence {
        let (count, ms) = self.sequences.lock().pop_front().unwrap_or((0, 0));
        LightSequence::new(frames(count, ms))
    }

    fn continue_sequence(&self, _group: GroupNumber, frame_count: usize) -> LightSequence {
        let (count, ms) = self.continuation.lock().unwrap_or((frame_count, 100));
        LightSequence::new(frames(count, ms))
    }
}
