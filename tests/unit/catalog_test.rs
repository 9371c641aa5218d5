//! Tests for the hardware catalog

use cabinet_lights::core::{
    Capability, CapabilitySet, DeviceHandle, DeviceVariant, FeatureDescription, HardwareCatalog,
    HardwareDescriptor, HardwareType, LightsError, SharedChannel,
};

fn plain(
    hardware_type: HardwareType,
    feature: &str,
    description: Option<FeatureDescription>,
    channel: SharedChannel,
) -> DeviceHandle {
    DeviceHandle::new(
        feature,
        Some(hardware_type),
        DeviceVariant::GroupColorOnly,
        description,
        channel,
    )
}

fn descriptor(
    hardware_type: HardwareType,
    feature: &'static str,
    coupled: Option<&'static str>,
) -> HardwareDescriptor {
    HardwareDescriptor {
        hardware_type,
        feature_name: feature,
        coupled_feature_name: coupled,
        streaming: false,
        factory: plain,
    }
}

#[test]
fn test_standard_catalog_couplings() {
    let catalog = HardwareCatalog::standard();
    assert_eq!(catalog.coupled_feature("HaloLights"), Some("HaloStream"));
    assert_eq!(catalog.coupled_feature("HaloStream"), Some("HaloLights"));
    assert_eq!(catalog.coupled_feature("TopperLights"), None);
    assert_eq!(
        catalog.get(HardwareType::EdgeLighting).map(|d| d.feature_name),
        Some("EdgeLights")
    );
}

#[test]
fn test_asymmetric_coupling_is_rejected() {
    let result = HardwareCatalog::new(vec![
        descriptor(HardwareType::Halo, "HaloLights", Some("HaloStream")),
        descriptor(HardwareType::StreamingHalo, "HaloStream", None),
    ]);
    assert!(matches!(result, Err(LightsError::Configuration(_))));
}

#[test]
fn test_duplicate_type_is_rejected() {
    let result = HardwareCatalog::new(vec![
        descriptor(HardwareType::Topper, "TopperLights", None),
        descriptor(HardwareType::Topper, "OtherTopper", None),
    ]);
    assert!(matches!(result, Err(LightsError::Configuration(_))));
}

#[test]
fn test_variants_widen_capabilities() {
    let streaming = DeviceVariant::StreamingChunked.capabilities();
    assert!(streaming.contains(Capability::GroupColor));
    assert!(streaming.contains(Capability::IndividuallyAddressable));
    let group_only = DeviceVariant::GroupColorOnly.capabilities();
    assert!(!group_only.contains(Capability::IndividuallyAddressable));
    assert_eq!(group_only, CapabilitySet::of(&[Capability::GroupColor]));
}

