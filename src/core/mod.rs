//! Device registry, playback scheduling and command recovery.

pub mod broker;
pub mod catalog;
pub mod channel;
pub mod device;
pub mod error;
pub mod frames;
pub mod playback;
pub mod recovery;
pub mod registry;

pub use broker::{AcquireResponse, AcquisitionListener, ConnectivityEvent, ResourceBroker};
pub use catalog::{
    Capability, CapabilitySet, DeviceFactory, DeviceVariant, HardwareCatalog, HardwareDescriptor,
    HardwareType,
};
pub use channel::{
    BitwiseControl, LightChannel, MonochromeLevels, RgbColors, SequenceMode, SharedChannel,
    StreamMode,
};
pub use device::{
    AcquisitionState, DeviceDirectory, DeviceHandle, DeviceSnapshot, FailureReason,
    FeatureDescription,
};
pub use error::{AppResult, DeviceError, LightsError};
pub use frames::{BlendedChunk, Frame, FrameBlender, LightSequence};
pub use playback::{
    ChunkScheduler, GroupPlayback, LegacyScheduler, PlaybackOutcome, PlaybackScheduler,
    PlaybackState,
};
pub use recovery::{CommandRecord, RecoveryDecorator};
pub use registry::DeviceRegistry;
