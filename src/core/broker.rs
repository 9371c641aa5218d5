//! Resource broker interface and connectivity events.

use crate::core::device::{FailureReason, FeatureDescription};
use crate::core::error::LightsError;
use crate::util::types::{DeviceKind, Priority};

/// Broker reply to an acquisition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireResponse {
    /// Exclusive ownership granted.
    Granted,
    /// Ownership refused.
    Denied(FailureReason),
}

/// Cabinet resource broker mediating exclusive device ownership.
pub trait ResourceBroker: Send + Sync {
    /// Request exclusive ownership of a device.
    fn request_acquire(&self, kind: DeviceKind, feature: &str, priority: Priority)
        -> AcquireResponse;

    /// Give ownership back.
    fn release(&self, kind: DeviceKind, feature: &str);

    /// Group layout of a connected device; `None` when not connected.
    fn feature_description(&self, feature: &str) -> Option<FeatureDescription>;
}

/// Connectivity change reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The device was plugged in.
    Connected {
        /// Feature name.
        feature: String,
    },
    /// This client gained ownership.
    Acquired {
        /// Feature name.
        feature: String,
    },
    /// This client lost ownership.
    Released {
        /// Feature name.
        feature: String,
        /// Why ownership was lost.
        reason: FailureReason,
    },
    /// The device was unplugged.
    Removed {
        /// Feature name.
        feature: String,
    },
}

impl ConnectivityEvent {
    /// Feature the event is about.
    pub fn feature(&self) -> &str {
        match self {
            Self::Connected { feature }
            | Self::Acquired { feature }
            | Self::Released { feature, .. }
            | Self::Removed { feature } => feature,
        }
    }
}

/// Notified whenever a device becomes acquired by this client.
pub trait AcquisitionListener: Send + Sync {
    /// `feature` was just acquired.
    fn device_acquired(&self, feature: &str) -> Result<(), LightsError>;
}
