//! # Cabinet Lights
//!
//! Lighting core for a gaming cabinet: it owns the cabinet's peripheral light
//! devices on behalf of one client, keeps them showing what that client asked
//! for across ownership changes, and paces animated content onto them.
//!
//! ## Components
//!
//! - **Device registry** ([`core::DeviceRegistry`]): one handle per requested
//!   hardware type, exclusive acquisition through a [`core::ResourceBroker`],
//!   coupled-device conflict checks, free (unrequested) devices and blank
//!   device discovery for ambient lighting.
//! - **Playback schedulers** ([`core::playback`]): turn the blending engine's
//!   content for one group into device updates, either as chunks fed to an
//!   on-device queue or as host-timed sequences for older devices.
//! - **Recovery decorator** ([`core::RecoveryDecorator`]): records the last
//!   command per group and replays it, highest group first, whenever the
//!   device is acquired again.
//!
//! ## Assembly
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cabinet_lights::builders::LightingSystemBuilder;
//! use cabinet_lights::config::LightsConfig;
//! use cabinet_lights::core::{Capability, HardwareType};
//!
//! let system = LightingSystemBuilder::new(LightsConfig::from_env()?)
//!     .with_broker(Arc::new(my_broker))
//!     .with_channel(my_channel)
//!     .build()?;
//!
//! let topper = system
//!     .registry()
//!     .get_or_create(HardwareType::Topper, Capability::IndividuallyAddressable, false)?;
//! system.events().send(event_from_broker)?;
//! system.shutdown().await;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Device registry, playback scheduling and command recovery.
pub mod core;
/// Configuration model.
pub mod config;
/// Builders assembling the lighting core.
#[cfg(not(target_arch = "wasm32"))]
pub mod builders;
/// Runtime adapters: task spawning and event dispatch.
pub mod runtime;
/// Shared utilities.
pub mod util;
