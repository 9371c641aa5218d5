//! Static hardware catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::channel::SharedChannel;
use crate::core::device::{DeviceHandle, FeatureDescription};
use crate::core::error::LightsError;
use crate::util::types::DeviceKind;

/// Hardware types a game can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HardwareType {
    /// Lights behind the button deck.
    ButtonDeck,
    /// Topper light bars.
    Topper,
    /// Cabinet edge lighting.
    EdgeLighting,
    /// Halo ring addressed through the legacy peripheral interface.
    Halo,
    /// Halo ring addressed through its streaming interface.
    StreamingHalo,
    /// Reel backlight addressed through the legacy peripheral interface.
    ReelBacklight,
    /// Reel backlight addressed through its streaming interface.
    StreamingReelBacklight,
}

/// One capability a device may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Whole groups can be colored.
    GroupColor,
    /// Each light can be addressed on its own.
    IndividuallyAddressable,
    /// Frames can be streamed into an on-device queue.
    StreamingChunked,
}

impl Capability {
    const fn bit(self) -> u8 {
        match self {
            Self::GroupColor => 0b001,
            Self::IndividuallyAddressable => 0b010,
            Self::StreamingChunked => 0b100,
        }
    }
}

/// Set of capabilities offered by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// Build a set from capabilities.
    pub fn of(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |bits, c| bits | c.bit()))
    }

    /// Whether `capability` is in the set.
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

/// Closed set of device variants. Each variant widens the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceVariant {
    /// Whole-group colors only.
    GroupColorOnly,
    /// Group colors plus per-light control.
    IndividuallyAddressable,
    /// Per-light control plus chunk streaming.
    StreamingChunked,
}

impl DeviceVariant {
    /// Capabilities offered by the variant.
    pub fn capabilities(self) -> CapabilitySet {
        match self {
            Self::GroupColorOnly => CapabilitySet::of(&[Capability::GroupColor]),
            Self::IndividuallyAddressable => CapabilitySet::of(&[
                Capability::GroupColor,
                Capability::IndividuallyAddressable,
            ]),
            Self::StreamingChunked => CapabilitySet::of(&[
                Capability::GroupColor,
                Capability::IndividuallyAddressable,
                Capability::StreamingChunked,
            ]),
        }
    }
}

/// Builds a device handle for a descriptor.
pub type DeviceFactory =
    fn(HardwareType, &str, Option<FeatureDescription>, SharedChannel) -> DeviceHandle;

/// Immutable description of one requestable hardware type.
#[derive(Debug, Clone)]
pub struct HardwareDescriptor {
    /// Hardware type this descriptor answers.
    pub hardware_type: HardwareType,
    /// Feature name used to address the device.
    pub feature_name: &'static str,
    /// Second feature name reaching the same physical device.
    pub coupled_feature_name: Option<&'static str>,
    /// Whether the device has an on-device frame queue.
    pub streaming: bool,
    /// Handle factory.
    pub factory: DeviceFactory,
}

impl HardwareDescriptor {
    /// Broker device class for this descriptor.
    pub const fn device_kind(&self) -> DeviceKind {
        if self.streaming {
            DeviceKind::StreamingLight
        } else {
            DeviceKind::PeripheralLight
        }
    }
}

fn group_color_device(
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

fn addressable_device(
    hardware_type: HardwareType,
    feature: &str,
    description: Option<FeatureDescription>,
    channel: SharedChannel,
) -> DeviceHandle {
    DeviceHandle::new(
        feature,
        Some(hardware_type),
        DeviceVariant::IndividuallyAddressable,
        description,
        channel,
    )
}

fn streaming_device(
    hardware_type: HardwareType,
    feature: &str,
    description: Option<FeatureDescription>,
    channel: SharedChannel,
) -> DeviceHandle {
    DeviceHandle::new(
        feature,
        Some(hardware_type),
        DeviceVariant::StreamingChunked,
        description,
        channel,
    )
}

/// Lookup table of hardware descriptors.
#[derive(Debug, Clone)]
pub struct HardwareCatalog {
    descriptors: HashMap<HardwareType, HardwareDescriptor>,
}

impl HardwareCatalog {
    /// Build a catalog, rejecting duplicate hardware types and asymmetric
    /// couplings.
    pub fn new(descriptors: Vec<HardwareDescriptor>) -> Result<Self, LightsError> {
        let mut by_type = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let hardware_type = descriptor.hardware_type;
            if by_type.insert(hardware_type, descriptor).is_some() {
                return Err(LightsError::Configuration(format!(
                    "duplicate descriptor for {hardware_type:?}"
                )));
            }
        }

        let catalog = Self {
            descriptors: by_type,
        };
        for descriptor in catalog.descriptors.values() {
            let Some(coupled) = descriptor.coupled_feature_name else {
                continue;
            };
            let partner = catalog.by_feature(coupled).ok_or_else(|| {
                LightsError::Configuration(format!(
                    "{} is coupled with unknown feature {coupled}",
                    descriptor.feature_name
                ))
            })?;
            if partner.coupled_feature_name != Some(descriptor.feature_name) {
                return Err(LightsError::Configuration(format!(
                    "coupling {} -> {coupled} is not symmetric",
                    descriptor.feature_name
                )));
            }
        }
        Ok(catalog)
    }

    /// Catalog of the standard cabinet peripherals.
    pub fn standard() -> Self {
        let descriptors = vec![
            HardwareDescriptor {
                hardware_type: HardwareType::ButtonDeck,
                feature_name: "ButtonLights",
                coupled_feature_name: None,
                streaming: false,
                factory: group_color_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::Topper,
                feature_name: "TopperLights",
                coupled_feature_name: None,
                streaming: false,
                factory: addressable_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::EdgeLighting,
                feature_name: "EdgeLights",
                coupled_feature_name: None,
                streaming: true,
                factory: streaming_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::Halo,
                feature_name: "HaloLights",
                coupled_feature_name: Some("HaloStream"),
                streaming: false,
                factory: addressable_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::StreamingHalo,
                feature_name: "HaloStream",
                coupled_feature_name: Some("HaloLights"),
                streaming: true,
                factory: streaming_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::ReelBacklight,
                feature_name: "ReelBacklightLights",
                coupled_feature_name: Some("ReelBacklightStream"),
                streaming: false,
                factory: addressable_device,
            },
            HardwareDescriptor {
                hardware_type: HardwareType::StreamingReelBacklight,
                feature_name: "ReelBacklightStream",
                coupled_feature_name: Some("ReelBacklightLights"),
                streaming: true,
                factory: streaming_device,
            },
        ];
        Self {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.hardware_type, d))
                .collect(),
        }
    }

    /// Descriptor for a hardware type.
    pub fn get(&self, hardware_type: HardwareType) -> Option<&HardwareDescriptor> {
        self.descriptors.get(&hardware_type)
    }

    /// Descriptor addressed by `feature`.
    pub fn by_feature(&self, feature: &str) -> Option<&HardwareDescriptor> {
        self.descriptors
            .values()
            .find(|d| d.feature_name == feature)
    }

    /// Coupled partner feature of `feature`, if any.
    pub fn coupled_feature(&self, feature: &str) -> Option<&'static str> {
        self.by_feature(feature)
            .and_then(|d| d.coupled_feature_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_symmetric() {
        let standard = HardwareCatalog::standard();
        let rebuilt = HardwareCatalog::new(standard.descriptors.into_values().collect());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_asymmetric_coupling_rejected() {
        let mut descriptors: Vec<_> = HardwareCatalog::standard()
            .descriptors
            .into_values()
            .collect();
        for d in &mut descriptors {
            if d.hardware_type == HardwareType::StreamingHalo {
                d.coupled_feature_name = None;
            }
        }
        assert!(matches!(
            HardwareCatalog::new(descriptors),
            Err(LightsError::Configuration(_))
        ));
    }

    #[test]
    fn test_variant_capabilities_widen() {
        let group = DeviceVariant::GroupColorOnly.capabilities();
        let streaming = DeviceVariant::StreamingChunked.capabilities();
        assert!(group.contains(Capability::GroupColor));
        assert!(!group.contains(Capability::IndividuallyAddressable));
        assert!(streaming.contains(Capability::GroupColor));
        assert!(streaming.contains(Capability::IndividuallyAddressable));
        assert!(streaming.contains(Capability::StreamingChunked));
    }
}
