//! Configuration models for the lighting core.

pub mod lights;

pub use lights::LightsConfig;
