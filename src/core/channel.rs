//! Raw device communication interface.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::DeviceError;
use crate::core::frames::{BlendedChunk, LightSequence};
use crate::util::types::{GroupNumber, Rgb};

/// Monochrome intensity levels for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonochromeLevels {
    /// One level for every light in the group.
    Uniform(u8),
    /// One level per light, in light order.
    PerLight(Vec<u8>),
}

/// Colors for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RgbColors {
    /// One color for every light in the group.
    Uniform(Rgb),
    /// One color per light, in light order.
    PerLight(Vec<Rgb>),
}

/// Per-light on/off control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitwiseControl {
    /// Lights affected by this command.
    pub mask: u64,
    /// New on/off state for the masked lights.
    pub state: u64,
}

/// How a sequence relates to what the device is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceMode {
    /// Start from the first frame.
    Restart,
    /// Continue at the device's current frame index.
    Continue,
}

/// How a streamed chunk is placed in the device's frame queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamMode {
    /// Flush the queue and start the chunk from its first frame.
    Restart,
    /// Replace the chunk in flight, keeping the lock-step frame index.
    Continue,
    /// Append after the queued frames.
    Queue,
}

/// Command and query surface of the raw communication layer.
///
/// Mutating calls are recorded by the recovery decorator; `stream_chunk` and
/// the queries are forwarded untouched.
pub trait LightChannel: Send + Sync {
    /// Turn every light of a group off, fading over `transition`.
    fn turn_off_group(
        &self,
        feature: &str,
        group: GroupNumber,
        transition: Duration,
    ) -> Result<(), DeviceError>;

    /// Set monochrome intensity levels.
    fn control_lights_monochrome(
        &self,
        feature: &str,
        group: GroupNumber,
        levels: &MonochromeLevels,
        transition: Duration,
    ) -> Result<(), DeviceError>;

    /// Set colors.
    fn control_lights_rgb(
        &self,
        feature: &str,
        group: GroupNumber,
        colors: &RgbColors,
        transition: Duration,
    ) -> Result<(), DeviceError>;

    /// Start a host-timed light sequence.
    fn start_sequence(
        &self,
        feature: &str,
        group: GroupNumber,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<(), DeviceError>;

    /// Switch individual lights on or off.
    fn bitwise_light_control(
        &self,
        feature: &str,
        group: GroupNumber,
        control: BitwiseControl,
    ) -> Result<(), DeviceError>;

    /// Push a chunk into the device's frame queue.
    fn stream_chunk(
        &self,
        feature: &str,
        group: GroupNumber,
        chunk: &BlendedChunk,
        mode: StreamMode,
    ) -> Result<(), DeviceError>;

    /// Whether a sequence is still running on a group.
    fn is_sequence_running(&self, feature: &str, group: GroupNumber) -> Result<bool, DeviceError>;

    /// Current device intensity (0-100).
    fn intensity(&self, feature: &str) -> Result<u8, DeviceError>;

    /// Set device intensity (0-100).
    fn set_intensity(&self, feature: &str, level: u8) -> Result<(), DeviceError>;
}

/// Shared handle to a communication channel.
pub type SharedChannel = Arc<dyn LightChannel>;

impl<T: LightChannel + ?Sized> LightChannel for Arc<T> {
    fn turn_off_group(
        &self,
        feature: &str,
        group: GroupNumber,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        (**self).turn_off_group(feature, group, transition)
    }

    fn control_lights_monochrome(
        &self,
        feature: &str,
        group: GroupNumber,
        levels: &MonochromeLevels,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        (**self).control_lights_monochrome(feature, group, levels, transition)
    }

    fn control_lights_rgb(
        &self,
        feature: &str,
        group: GroupNumber,
        colors: &RgbColors,
        transition: Duration,
    ) -> Result<(), DeviceError> {
        (**self).control_lights_rgb(feature, group, colors, transition)
    }

    fn start_sequence(
        &self,
        feature: &str,
        group: GroupNumber,
        sequence: &LightSequence,
        mode: SequenceMode,
    ) -> Result<(), DeviceError> {
        (**self).start_sequence(feature, group, sequence, mode)
    }

    fn bitwise_light_control(
        &self,
        feature: &str,
        group: GroupNumber,
        control: BitwiseControl,
    ) -> Result<(), DeviceError> {
        (**self).bitwise_light_control(feature, group, control)
    }

    fn stream_chunk(
        &self,
        feature: &str,
        group: GroupNumber,
        chunk: &BlendedChunk,
        mode: StreamMode,
    ) -> Result<(), DeviceError> {
        (**self).stream_chunk(feature, group, chunk, mode)
    }

    fn is_sequence_running(&self, feature: &str, group: GroupNumber) -> Result<bool, DeviceError> {
        (**self).is_sequence_running(feature, group)
    }

    fn intensity(&self, feature: &str) -> Result<u8, DeviceError> {
        (**self).intensity(feature)
    }

    fn set_intensity(&self, feature: &str, level: u8) -> Result<(), DeviceError> {
        (**self).set_intensity(feature, level)
    }
}
