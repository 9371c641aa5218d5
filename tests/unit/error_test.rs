//! Tests for error types

use std::error::Error as _;

use cabinet_lights::core::{Capability, DeviceError, HardwareType, LightsError};

#[test]
fn test_device_error_display() {
    assert_eq!(format!("{}", DeviceError::NotOwned), "client does not own the device");
    assert_eq!(format!("{}", DeviceError::InvalidGroup(4)), "invalid group 4");
}

#[test]
fn test_capability_mismatch_error() {
    let err = LightsError::CapabilityMismatch {
        hardware_type: HardwareType::ButtonDeck,
        requested: Capability::StreamingChunked,
    };
    assert_eq!(format!("{}", err), "ButtonDeck does not support StreamingChunked");
}

#[test]
fn test_coupled_conflict_error() {
    let err = LightsError::CoupledConflict {
        feature: "HaloStream".into(),
        coupled: "HaloLights".into(),
    };
    assert_eq!(
        format!("{}", err),
        "HaloStream is coupled with already registered HaloLights"
    );
}

#[test]
fn test_device_error_is_the_source() {
    let err = LightsError::device("TopperLights", DeviceError::Tilt);
    assert_eq!(format!("{}", err), "device error on TopperLights: cabinet is tilted");
    let source = err.source().expect("source");
    assert_eq!(source.to_string(), "cabinet is tilted");
}

#[test]
fn test_recovery_error() {
    let err = LightsError::Recovery {
        feature: "TopperLights".into(),
        group: 7,
        source: DeviceError::InvalidGroup(7),
    };
    assert_eq!(
        format!("{}", err),
        "recovery of TopperLights group 7 failed: invalid group 7"
    );
}

#[test]
fn test_anyhow_wrapping() {
    let result: cabinet_lights::core::AppResult<()> =
        Err(LightsError::EventChannelClosed.into());
    assert_eq!(
        result.unwrap_err().to_string(),
        "connectivity event channel closed"
    );
}
