//! Shared identifiers and small value types.

use serde::{Deserialize, Serialize};

/// Number of a light group on a device.
pub type GroupNumber = u8;

/// Group sentinel addressing every group of a device at once.
///
/// It is numerically the highest group value, which the recovery replay order
/// relies on.
pub const ALL_GROUPS: GroupNumber = 0xFF;

/// Client priority used when requesting exclusive device ownership.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background clients (attract mode, diagnostics).
    Low,
    /// Regular game content.
    #[default]
    Normal,
    /// Content that should win over regular game content.
    High,
    /// Operator menus and tilt handling.
    Critical,
}

/// Device class used when talking to the resource broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Peripheral light driven with discrete commands and host-side timing.
    PeripheralLight,
    /// Light with an on-device frame queue fed by streamed chunks.
    StreamingLight,
}

/// 24-bit color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Rgb {
    /// Black (all channels off).
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Build a color from its channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}
