//! Logical light-device handles and the shared feature directory.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::core::catalog::{Capability, CapabilitySet, DeviceVariant, HardwareType};
use crate::core::channel::{
    BitwiseControl, LightChannel, MonochromeLevels, RgbColors, SequenceMode, SharedChannel,
};
use crate::core::error::{DeviceError, LightsError};
use crate::core::frames::{FrameBlender, LightSequence};
use crate::core::playback::{ChunkScheduler, GroupPlayback, LegacyScheduler, PlaybackOutcome};
use crate::runtime::Spawn;
use crate::util::types::{GroupNumber, Rgb, ALL_GROUPS};

/// Group layout of a connected device, as reported by the resource broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescription {
    group_count: u8,
}

impl FeatureDescription {
    /// Build a description.
    pub const fn new(group_count: u8) -> Self {
        Self { group_count }
    }

    /// Number of light groups on the device.
    pub const fn group_count(&self) -> u8 {
        self.group_count
    }
}

/// Why a device is not acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Another client holds the device.
    OwnedByOtherClient,
    /// The device is not connected.
    DeviceAbsent,
    /// This client released the device.
    Released,
    /// The broker revoked ownership in favour of a higher priority client.
    Preempted,
    /// Any other broker-supplied reason.
    Other(String),
}

/// Acquisition state of a device handle.
///
/// An acquired handle always holds the latest feature description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Not owned by this client.
    Unacquired {
        /// Latest description, if the device was seen connected.
        description: Option<FeatureDescription>,
        /// Why the last acquisition attempt failed or ownership was lost.
        reason: Option<FailureReason>,
    },
    /// Exclusively owned by this client.
    Acquired(FeatureDescription),
}

impl AcquisitionState {
    fn description(&self) -> Option<FeatureDescription> {
        match self {
            Self::Unacquired { description, .. } => *description,
            Self::Acquired(description) => Some(*description),
        }
    }
}

#[derive(Debug)]
struct DeviceState {
    acquisition: AcquisitionState,
    has_content: bool,
}

struct DeviceInner {
    feature: String,
    hardware_type: Option<HardwareType>,
    variant: Option<DeviceVariant>,
    channel: SharedChannel,
    state: Mutex<DeviceState>,
    playback: Mutex<BTreeMap<GroupNumber, GroupPlayback>>,
}

/// One logical light device.
///
/// Cloning is cheap and clones refer to the same device.
#[derive(Clone)]
pub struct DeviceHandle {
    inner: Arc<DeviceInner>,
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("feature", &self.inner.feature)
            .field("hardware_type", &self.inner.hardware_type)
            .field("variant", &self.inner.variant)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl DeviceHandle {
    /// Build a handle for a requested hardware type.
    pub fn new(
        feature: &str,
        hardware_type: Option<HardwareType>,
        variant: DeviceVariant,
        description: Option<FeatureDescription>,
        channel: SharedChannel,
    ) -> Self {
        Self::build(feature, hardware_type, Some(variant), description, channel)
    }

    /// Build a handle for a connected device nobody has requested yet.
    pub fn free(
        feature: &str,
        description: Option<FeatureDescription>,
        channel: SharedChannel,
    ) -> Self {
        Self::build(feature, None, None, description, channel)
    }

    fn build(
        feature: &str,
        hardware_type: Option<HardwareType>,
        variant: Option<DeviceVariant>,
        description: Option<FeatureDescription>,
        channel: SharedChannel,
    ) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                feature: feature.to_string(),
                hardware_type,
                variant,
                channel,
                state: Mutex::new(DeviceState {
                    acquisition: AcquisitionState::Unacquired {
                        description,
                        reason: None,
                    },
                    has_content: false,
                }),
                playback: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Whether both handles refer to the same device instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Feature name addressing the device.
    pub fn feature_name(&self) -> &str {
        &self.inner.feature
    }

    /// Requested hardware type; `None` for free devices.
    pub fn hardware_type(&self) -> Option<HardwareType> {
        self.inner.hardware_type
    }

    /// Whether no client has requested this device yet.
    pub fn is_free(&self) -> bool {
        self.inner.hardware_type.is_none()
    }

    /// Device variant; `None` for free devices.
    pub fn variant(&self) -> Option<DeviceVariant> {
        self.inner.variant
    }

    /// Capabilities of the device. Free devices report none.
    pub fn capabilities(&self) -> CapabilitySet {
        self.inner
            .variant
            .map(DeviceVariant::capabilities)
            .unwrap_or_default()
    }

    /// Current acquisition state.
    pub fn acquisition(&self) -> AcquisitionState {
        self.inner.state.lock().acquisition.clone()
    }

    /// Whether this client owns the device.
    pub fn is_acquired(&self) -> bool {
        matches!(
            self.inner.state.lock().acquisition,
            AcquisitionState::Acquired(_)
        )
    }

    /// Why the device is not acquired, if known.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match &self.inner.state.lock().acquisition {
            AcquisitionState::Unacquired { reason, .. } => reason.clone(),
            AcquisitionState::Acquired(_) => None,
        }
    }

    /// Latest feature description.
    pub fn description(&self) -> Option<FeatureDescription> {
        self.inner.state.lock().acquisition.description()
    }

    /// Number of groups, 0 until the device has been seen connected.
    pub fn group_count(&self) -> u8 {
        self.description().map_or(0, |d| d.group_count())
    }

    /// Whether a client-originated command has been sent.
    pub fn has_content(&self) -> bool {
        self.inner.state.lock().has_content
    }

    /// Mark acquired. Returns `true` when the handle was not acquired before.
    pub(crate) fn mark_acquired(&self, description: FeatureDescription) -> bool {
        let mut state = self.inner.state.lock();
        let was_acquired = matches!(state.acquisition, AcquisitionState::Acquired(_));
        state.acquisition = AcquisitionState::Acquired(description);
        !was_acquired
    }

    /// Mark unacquired, replacing the description wholesale.
    pub(crate) fn mark_unacquired(
        &self,
        reason: Option<FailureReason>,
        description: Option<FeatureDescription>,
    ) {
        self.inner.state.lock().acquisition = AcquisitionState::Unacquired {
            description,
            reason,
        };
    }

    /// Swap in a fresh description, keeping the acquisition flag when it is
    /// still backed by a description.
    pub(crate) fn refresh_description(&self, description: Option<FeatureDescription>) {
        let mut state = self.inner.state.lock();
        let next = match (&state.acquisition, description) {
            (AcquisitionState::Acquired(_), Some(d)) => AcquisitionState::Acquired(d),
            (AcquisitionState::Acquired(_), None) => AcquisitionState::Unacquired {
                description: None,
                reason: Some(FailureReason::DeviceAbsent),
            },
            (AcquisitionState::Unacquired { reason, .. }, d) => AcquisitionState::Unacquired {
                description: d,
                reason: reason.clone(),
            },
        };
        state.acquisition = next;
    }

    /// Take over the acquisition state and content flag of a free-device
    /// record for the same feature.
    pub(crate) fn adopt_state(&self, previous: &Self) {
        let (acquisition, has_content) = {
            let prev = previous.inner.state.lock();
            (prev.acquisition.clone(), prev.has_content)
        };
        let mut state = self.inner.state.lock();
        state.acquisition = acquisition;
        state.has_content |= has_content;
    }

    fn mark_content(&self) {
        self.inner.state.lock().has_content = true;
    }

    fn send<F>(&self, op: F) -> Result<(), LightsError>
    where
        F: FnOnce(&dyn LightChannel, &str) -> Result<(), DeviceError>,
    {
        let feature = self.feature_name();
        match op(self.inner.channel.as_ref(), feature) {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient() => {
                tracing::debug!(feature = %feature, error = %e, "dropped light command");
                Ok(())
            }
            Err(e) => Err(LightsError::device(feature, e)),
        }
    }

    /// Turn a group off.
    pub fn turn_off(&self, group: GroupNumber, transition: Duration) -> Result<(), LightsError> {
        self.mark_content();
        self.send(|c, f| c.turn_off_group(f, group, transition))
    }

    /// Set monochrome levels on a group.
    pub fn set_monochrome(
        &self,
        group: GroupNumber,
        levels: &MonochromeLevels,
        transition: Duration,
    ) -> Result<(), LightsError> {
        self.mark_content();
        self.send(|c, f| c.control_lights_monochrome(f, group, levels, transition))
    }

    /// Set colors on a group.
    pub fn set_rgb(
        &self,
        group: GroupNumber,
        colors: &RgbColors,
        transition: Duration,
    ) -> Result<(), LightsError> {
        self.mark_content();
        self.send(|c, f| c.control_lights_rgb(f, group, colors, transition))
    }

    /// Start a sequence on a group.
    pub fn start_sequence(
        &self,
        group: GroupNumber,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<(), LightsError> {
        self.mark_content();
        self.send(|c, f| c.start_sequence(f, group, sequence, mode))
    }

    /// Switch individual lights of a group on or off.
    pub fn bitwise_control(
        &self,
        group: GroupNumber,
        control: BitwiseControl,
    ) -> Result<(), LightsError> {
        self.mark_content();
        self.send(|c, f| c.bitwise_light_control(f, group, control))
    }

    /// Paint an ambient color over every group. Does not count as content, so
    /// the device stays blank.
    pub fn apply_ambient(&self, color: Rgb) -> Result<(), LightsError> {
        self.send(|c, f| {
            c.control_lights_rgb(f, ALL_GROUPS, &RgbColors::Uniform(color), Duration::ZERO)
        })
    }

    /// Whether a sequence is still running on a group.
    pub fn is_sequence_running(&self, group: GroupNumber) -> Result<bool, LightsError> {
        self.inner
            .channel
            .is_sequence_running(self.feature_name(), group)
            .map_err(|e| LightsError::device(self.feature_name(), e))
    }

    /// Current intensity.
    pub fn intensity(&self) -> Result<u8, LightsError> {
        self.inner
            .channel
            .intensity(self.feature_name())
            .map_err(|e| LightsError::device(self.feature_name(), e))
    }

    /// Set intensity.
    pub fn set_intensity(&self, level: u8) -> Result<(), LightsError> {
        self.send(|c, f| c.set_intensity(f, level))
    }

    /// Attach a playback scheduler to `group`, fed by `blender`.
    ///
    /// Streaming devices get a chunk scheduler, everything else a legacy
    /// scheduler whose actor is started on `spawner`. A group keeps the first
    /// scheduler attached to it.
    pub fn attach_playback<S: Spawn>(
        &self,
        group: GroupNumber,
        blender: Arc<dyn FrameBlender>,
        spawner: &S,
    ) -> GroupPlayback {
        let mut playback = self.inner.playback.lock();
        if let Some(existing) = playback.get(&group) {
            return existing.clone();
        }

        let channel = Arc::clone(&self.inner.channel);
        let scheduler = if self.capabilities().contains(Capability::StreamingChunked) {
            GroupPlayback::Chunked(Arc::new(ChunkScheduler::new(
                self.feature_name(),
                group,
                channel,
                blender,
            )))
        } else {
            GroupPlayback::Legacy(Arc::new(LegacyScheduler::spawn(
                spawner,
                self.feature_name(),
                group,
                channel,
                blender,
            )))
        };
        tracing::debug!(feature = %self.feature_name(), group, "attached playback scheduler");
        playback.insert(group, scheduler.clone());
        scheduler
    }

    /// Scheduler attached to `group`.
    pub fn playback(&self, group: GroupNumber) -> Option<GroupPlayback> {
        self.inner.playback.lock().get(&group).cloned()
    }

    /// Tell the group's scheduler that blended content changed.
    pub async fn update_playback(
        &self,
        group: GroupNumber,
        restart: bool,
    ) -> Result<PlaybackOutcome, LightsError> {
        let outcome = match self.playback(group) {
            Some(scheduler) => scheduler.as_scheduler().update_device(restart).await?,
            None => PlaybackOutcome::Idle,
        };
        self.note_outcome(outcome);
        Ok(outcome)
    }

    /// Forward a queue-empty notification from the device.
    pub fn notify_queue_empty(&self, group: GroupNumber) -> Result<PlaybackOutcome, LightsError> {
        let outcome = match self.playback(group) {
            Some(GroupPlayback::Chunked(scheduler)) => scheduler.on_queue_empty()?,
            _ => PlaybackOutcome::Idle,
        };
        self.note_outcome(outcome);
        Ok(outcome)
    }

    fn note_outcome(&self, outcome: PlaybackOutcome) {
        if matches!(outcome, PlaybackOutcome::Sent { .. }) {
            self.mark_content();
        }
    }

    /// Restart every attached scheduler from fresh content. Called after the
    /// device is (re)acquired; recorded commands are replayed first.
    pub(crate) fn restart_playback(&self) {
        let schedulers: Vec<(GroupNumber, GroupPlayback)> = self
            .inner
            .playback
            .lock()
            .iter()
            .map(|(group, scheduler)| (*group, scheduler.clone()))
            .collect();
        for (group, scheduler) in schedulers {
            match scheduler {
                GroupPlayback::Chunked(chunk) => match chunk.update(true) {
                    Ok(outcome) => self.note_outcome(outcome),
                    Err(e) => tracing::warn!(
                        feature = %self.feature_name(),
                        group,
                        error = %e,
                        "playback restart failed"
                    ),
                },
                GroupPlayback::Legacy(legacy) => legacy.request_restart(),
            }
        }
    }

    /// Shut down every attached scheduler.
    pub async fn shutdown_playback(&self) {
        let schedulers: Vec<GroupPlayback> = {
            let mut playback = self.inner.playback.lock();
            std::mem::take(&mut *playback).into_values().collect()
        };
        for scheduler in schedulers {
            scheduler.as_scheduler().shutdown().await;
        }
    }

    /// Serializable view of the handle.
    pub fn snapshot(&self) -> DeviceSnapshot {
        let state = self.inner.state.lock();
        let (acquired, failure_reason) = match &state.acquisition {
            AcquisitionState::Acquired(_) => (true, None),
            AcquisitionState::Unacquired { reason, .. } => (false, reason.clone()),
        };
        DeviceSnapshot {
            feature: self.inner.feature.clone(),
            hardware_type: self.inner.hardware_type,
            acquired,
            failure_reason,
            has_content: state.has_content,
            group_count: state.acquisition.description().map_or(0, |d| d.group_count()),
        }
    }
}

/// Diagnostic snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Feature name.
    pub feature: String,
    /// Requested hardware type; `None` for free devices.
    pub hardware_type: Option<HardwareType>,
    /// Whether this client owns the device.
    pub acquired: bool,
    /// Last failure reason.
    pub failure_reason: Option<FailureReason>,
    /// Whether client content has been sent.
    pub has_content: bool,
    /// Group count from the latest description.
    pub group_count: u8,
}

#[derive(Default)]
struct DirectoryTables {
    by_feature: HashMap<String, DeviceHandle>,
    order: Vec<String>,
}

/// Feature-name table shared between the registry and the recovery
/// decorator. Only the registry inserts.
#[derive(Clone, Default)]
pub struct DeviceDirectory {
    tables: Arc<RwLock<DirectoryTables>>,
}

impl DeviceDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle addressed by `feature`.
    pub fn get(&self, feature: &str) -> Option<DeviceHandle> {
        self.tables.read().by_feature.get(feature).cloned()
    }

    /// Whether `feature` is currently acquired by this client.
    pub fn is_acquired(&self, feature: &str) -> bool {
        self.get(feature).is_some_and(|h| h.is_acquired())
    }

    /// Every handle, in the order their features were first seen.
    pub fn handles(&self) -> Vec<DeviceHandle> {
        let tables = self.tables.read();
        tables
            .order
            .iter()
            .filter_map(|f| tables.by_feature.get(f).cloned())
            .collect()
    }

    /// Number of known features.
    pub fn len(&self) -> usize {
        self.tables.read().by_feature.len()
    }

    /// Whether no feature is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the handle for its feature.
    pub(crate) fn insert(&self, handle: DeviceHandle) {
        let mut tables = self.tables.write();
        let feature = handle.feature_name().to_string();
        if tables.by_feature.insert(feature.clone(), handle).is_none() {
            tables.order.push(feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frames::BlendedChunk;

    struct NullChannel;

    impl LightChannel for NullChannel {
        fn turn_off_group(&self, _: &str, _: GroupNumber, _: Duration) -> Result<(), DeviceError> {
            Err(DeviceError::NotOwned)
        }
        fn control_lights_monochrome(
            &self,
            _: &str,
            _: GroupNumber,
            _: &MonochromeLevels,
            _: Duration,
        ) -> Result<(), DeviceError> {
            Err(DeviceError::InvalidGroup(9))
        }
        fn control_lights_rgb(
            &self,
            _: &str,
            _: GroupNumber,
            _: &RgbColors,
            _: Duration,
        ) -> Result<(), DeviceError> {
            Ok(())
        }
        fn start_sequence(
            &self,
            _: &str,
            _: GroupNumber,
            _: &LightSequence,
            _: SequenceMode,
        ) -> Result<(), DeviceError> {
            Ok(())
        }
        fn bitwise_light_control(
            &self,
            _: &str,
            _: GroupNumber,
            _: BitwiseControl,
        ) -> Result<(), DeviceError> {
            Ok(())
        }
        fn stream_chunk(
            &self,
            _: &str,
            _: GroupNumber,
            _: &BlendedChunk,
            _: crate::core::channel::StreamMode,
        ) -> Result<(), DeviceError> {
            Ok(())
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

    fn handle() -> DeviceHandle {
        DeviceHandle::new(
            "TopperLights",
            Some(HardwareType::Topper),
            DeviceVariant::IndividuallyAddressable,
            None,
            Arc::new(NullChannel),
        )
    }

    #[test]
    fn test_lost_description_drops_acquisition() {
        let h = handle();
        assert!(h.mark_acquired(FeatureDescription::new(4)));
        assert!(!h.mark_acquired(FeatureDescription::new(4)));
        h.refresh_description(None);
        assert!(!h.is_acquired());
        assert_eq!(h.failure_reason(), Some(FailureReason::DeviceAbsent));
    }

    #[test]
    fn test_transient_errors_are_dropped_and_structural_errors_raised() {
        let h = handle();
        assert!(h.turn_off(1, Duration::ZERO).is_ok());
        assert!(h.has_content());
        let err = h
            .set_monochrome(1, &MonochromeLevels::Uniform(10), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            LightsError::Device {
                source: DeviceError::InvalidGroup(9),
                ..
            }
        ));
    }

    #[test]
    fn test_ambient_keeps_device_blank() {
        let h = handle();
        h.apply_ambient(Rgb::new(0, 0, 40)).unwrap();
        assert!(!h.has_content());
    }

    #[test]
    fn test_directory_keeps_first_seen_order() {
        let dir = DeviceDirectory::new();
        let a = DeviceHandle::free("B", None, Arc::new(NullChannel));
        let b = DeviceHandle::free("A", None, Arc::new(NullChannel));
        dir.insert(a);
        dir.insert(b);
        dir.insert(DeviceHandle::free("B", None, Arc::new(NullChannel)));
        let order: Vec<_> = dir
            .handles()
            .iter()
            .map(|h| h.feature_name().to_string())
            .collect();
        assert_eq!(order, vec!["B", "A"]);
    }
}
