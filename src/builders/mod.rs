//! Builders to assemble the lighting core from configuration.

pub mod system_builder;

pub use system_builder::{LightingSystem, LightingSystemBuilder};
