//! Error types for the lighting core.

use thiserror::Error;

use crate::core::catalog::{Capability, HardwareType};
use crate::util::types::GroupNumber;

/// Error categories reported by the raw device communication layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// This client does not currently own the device.
    #[error("client does not own the device")]
    NotOwned,
    /// The addressed group does not exist on the device.
    #[error("invalid group {0}")]
    InvalidGroup(GroupNumber),
    /// The cabinet is in a tilt state and rejects light traffic.
    #[error("cabinet is tilted")]
    Tilt,
    /// The command parameters were rejected by the driver.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Unclassified driver failure.
    #[error("driver error: {0}")]
    Unknown(String),
}

impl DeviceError {
    /// Errors that are expected to clear on their own and are dropped at the
    /// outbound call site.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotOwned | Self::Tilt | Self::Unknown(_))
    }
}

/// Errors produced by the lighting core.
#[derive(Debug, Error)]
pub enum LightsError {
    /// No catalog descriptor exists for the requested hardware type.
    #[error("unknown hardware type {0:?}")]
    UnknownHardwareType(HardwareType),
    /// The registered device cannot provide the requested capability.
    #[error("{hardware_type:?} does not support {requested:?}")]
    CapabilityMismatch {
        /// Hardware type that was requested.
        hardware_type: HardwareType,
        /// Capability the caller needs.
        requested: Capability,
    },
    /// The coupled feature of the requested device is already registered.
    #[error("{feature} is coupled with already registered {coupled}")]
    CoupledConflict {
        /// Feature that was requested.
        feature: String,
        /// Coupled feature that is already registered.
        coupled: String,
    },
    /// Static catalog or configuration data is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A device command failed.
    #[error("device error on {feature}: {source}")]
    Device {
        /// Feature the command targeted.
        feature: String,
        /// Underlying device error.
        #[source]
        source: DeviceError,
    },
    /// Replaying recorded commands hit an error that signals a stale topology.
    #[error("recovery of {feature} group {group} failed: {source}")]
    Recovery {
        /// Feature being recovered.
        feature: String,
        /// Group of the record that failed.
        group: GroupNumber,
        /// Underlying device error.
        #[source]
        source: DeviceError,
    },
    /// A playback scheduler was used after shutdown.
    #[error("playback scheduler for {feature} group {group} is shut down")]
    SchedulerShutdown {
        /// Feature the scheduler drives.
        feature: String,
        /// Group the scheduler drives.
        group: GroupNumber,
    },
    /// The connectivity event dispatcher is no longer running.
    #[error("connectivity event channel closed")]
    EventChannelClosed,
}

impl LightsError {
    /// Wrap a device error with the feature it came from.
    pub fn device(feature: impl Into<String>, source: DeviceError) -> Self {
        Self::Device {
            feature: feature.into(),
            source,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
