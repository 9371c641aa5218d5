//! Command recording and replay over the raw light channel.
//!
//! [`RecoveryDecorator`] sits between device handles and the raw channel. It
//! remembers the last command issued to every `(feature, group)` and reissues
//! them when the feature is (re)acquired, so a device taken away by another
//! client comes back showing what this client last asked for.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::LightsConfig;
use crate::core::broker::AcquisitionListener;
use crate::core::channel::{
    BitwiseControl, LightChannel, MonochromeLevels, RgbColors, SequenceMode, StreamMode,
};
use crate::core::device::DeviceDirectory;
use crate::core::error::{DeviceError, LightsError};
use crate::core::frames::{BlendedChunk, LightSequence};
use crate::util::types::{GroupNumber, ALL_GROUPS};

/// Last command issued to one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRecord {
    /// `turn_off_group`.
    TurnOff {
        /// Fade time.
        transition: Duration,
    },
    /// `control_lights_monochrome`.
    Monochrome {
        /// Levels sent.
        levels: MonochromeLevels,
        /// Fade time.
        transition: Duration,
    },
    /// `control_lights_rgb`.
    Rgb {
        /// Colors sent.
        colors: RgbColors,
        /// Fade time.
        transition: Duration,
    },
    /// `start_sequence`.
    Sequence {
        /// Sequence sent.
        sequence: LightSequence,
        /// Start mode of the original call.
        mode: SequenceMode,
    },
    /// `bitwise_light_control`.
    Bitwise {
        /// Mask and state sent.
        control: BitwiseControl,
    },
}

impl CommandRecord {
    /// Issue this command on `channel`.
    pub fn issue(
        &self,
        channel: &dyn LightChannel,
        feature: &str,
        group: GroupNumber,
    ) -> Result<(), DeviceError> {
        match self {
            Self::TurnOff { transition } => channel.turn_off_group(feature, group, *transition),
            Self::Monochrome { levels, transition } => {
                channel.control_lights_monochrome(feature, group, levels, *transition)
            }
            Self::Rgb { colors, transition } => {
                channel.control_lights_rgb(feature, group, colors, *transition)
            }
            Self::Sequence { sequence, mode } => {
                channel.start_sequence(feature, group, sequence, *mode)
            }
            Self::Bitwise { control } => channel.bitwise_light_control(feature, group, *control),
        }
    }

    /// Short operation name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TurnOff { .. } => "turn_off_group",
            Self::Monochrome { .. } => "control_lights_monochrome",
            Self::Rgb { .. } => "control_lights_rgb",
            Self::Sequence { .. } => "start_sequence",
            Self::Bitwise { .. } => "bitwise_light_control",
        }
    }
}

type RecordSet = Arc<Mutex<BTreeMap<GroupNumber, CommandRecord>>>;

/// Recording proxy over a raw [`LightChannel`].
pub struct RecoveryDecorator<C: LightChannel> {
    inner: C,
    directory: DeviceDirectory,
    config: LightsConfig,
    records: Mutex<HashMap<String, RecordSet>>,
}

impl<C: LightChannel> RecoveryDecorator<C> {
    /// Wrap `inner`. Ownership is read from `directory`, which the registry
    /// keeps up to date.
    pub fn new(inner: C, directory: DeviceDirectory, config: &LightsConfig) -> Self {
        Self {
            inner,
            directory,
            config: config.clone(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Wrapped channel.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn record_set(&self, feature: &str) -> RecordSet {
        let mut records = self.records.lock();
        if let Some(set) = records.get(feature) {
            return Arc::clone(set);
        }
        let set = RecordSet::default();
        records.insert(feature.to_string(), Arc::clone(&set));
        set
    }

    fn existing_record_set(&self, feature: &str) -> Option<RecordSet> {
        self.records.lock().get(feature).cloned()
    }

    /// Record `record` for `(feature, group)` and forward it when the feature
    /// is owned. The feature's record lock is held across the forward so a
    /// concurrent replay cannot interleave.
    fn record_and_forward(
        &self,
        feature: &str,
        group: GroupNumber,
        record: CommandRecord,
    ) -> Result<(), DeviceError> {
        let set = self.record_set(feature);
        let mut groups = set.lock();
        if group == ALL_GROUPS {
            groups.clear();
        }
        groups.insert(group, record);
        let Some(record) = groups.get(&group) else {
            return Ok(());
        };

        if !self.directory.is_acquired(feature) {
            debug!(feature, group, op = record.name(), "device not owned, command recorded only");
            return Ok(());
        }
        record.issue(&self.inner, feature, group)
    }

    /// Reissue every recorded command of `feature`, highest group first.
    ///
    /// Returns the number of commands the device accepted. Not-owned errors
    /// are skipped; an invalid group aborts the replay unless the feature's
    /// group count changes at runtime.
    pub fn recover_device(&self, feature: &str) -> Result<usize, LightsError> {
        let Some(set) = self.existing_record_set(feature) else {
            debug!(feature, "nothing recorded, nothing to recover");
            return Ok(0);
        };
        let groups = set.lock();
        let mut replayed = 0;

        for (&group, record) in groups.iter().rev() {
            match record.issue(&self.inner, feature, group) {
                Ok(()) => replayed += 1,
                Err(DeviceError::NotOwned) => {
                    debug!(feature, group, op = record.name(), "replay dropped, device not owned");
                }
                Err(DeviceError::InvalidGroup(g)) if self.config.has_dynamic_groups(feature) => {
                    debug!(feature, group = g, "replay skipped, group no longer exists");
                }
                Err(source @ DeviceError::InvalidGroup(_)) => {
                    error!(feature, group, error = %source, "replay hit a stale group");
                    return Err(LightsError::Recovery {
                        feature: feature.to_string(),
                        group,
                        source,
                    });
                }
                Err(e) => {
                    warn!(feature, group, op = record.name(), error = %e, "replay command failed");
                }
            }
        }
        info!(feature, replayed, recorded = groups.len(), "device recovered");
        Ok(replayed)
    }

    /// Groups with a recorded command, ascending.
    pub fn recorded_groups(&self, feature: &str) -> Vec<GroupNumber> {
        self.existing_record_set(feature)
            .map(|set| set.lock().keys().copied().collect())
            .unwrap_or_default()
    }

    /// Recorded command for one group.
    pub fn recorded(&self, feature: &str, group: GroupNumber) -> Option<CommandRecord> {
        self.existing_record_set(feature)
            .and_then(|set| set.lock().get(&group).cloned())
    }

    /// Drop every record of `feature`.
    pub fn forget(&self, feature: &str) {
        if self.records.lock().remove(feature).is_some() {
            debug!(feature, "recorded commands forgotten");
        }
    }
}

impl<C: LightChannel> LightChannel for RecoveryDecorator<C> {
    fn turn_off_group(
        &self,
        feature: &str,
        group: GroupNumber,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        self.record_and_forward(feature, group, CommandRecord::TurnOff { transition })
    }

    fn control_lights_monochrome(
        &self,
        feature: &str,
        group: GroupNumber,
        levels: &MonochromeLevels,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        self.record_and_forward(
            feature,
            group,
            CommandRecord::Monochrome {
                levels: levels.clone(),
                transition,
            },
        )
    }

    fn control_lights_rgb(
        &self,
        feature: &str,
        group: GroupNumber,
        colors: &RgbColors,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        self.record_and_forward(
            feature,
            group,
            CommandRecord::Rgb {
                colors: colors.clone(),
                transition,
            },
        )
    }

    fn start_sequence(
        &self,
        feature: &str,
        group: GroupNumber,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<(), DeviceError> {
        self.record_and_forward(
            feature,
            group,
            CommandRecord::Sequence {
                sequence: sequence.clone(),
                mode,
            },
        )
    }

    fn bitwise_light_control(
        &self,
        feature: &str,
        group: GroupNumber,
        control: BitwiseControl,
    ) -> Result<(), DeviceError> {
        self.record_and_forward(feature, group, CommandRecord::Bitwise { control })
    }

    fn stream_chunk(
        &self,
        feature: &str,
        group: GroupNumber,
        chunk: &BlendedChunk,
        mode: StreamMode,
    ) -> Result<(), DeviceError> {
        self.inner.stream_chunk(feature, group, chunk, mode)
    }

    fn is_sequence_running(&self, feature: &str, group: GroupNumber) -> Result<bool, DeviceError> {
        self.inner.is_sequence_running(feature, group)
    }

    fn intensity(&self, feature: &str) -> Result<u8, DeviceError> {
        self.inner.intensity(feature)
    }

    fn set_intensity(&self, feature: &str, level: u8) -> Result<(), DeviceError> {
        self.inner.set_intensity(feature, level)
    }
}

impl<C: LightChannel> AcquisitionListener for RecoveryDecorator<C> {
    fn device_acquired(&self, feature: &str) -> Result<(), LightsError> {
        self.recover_device(feature).map(|_| ())
    }
}
